// Edit ledger: durable, team-scoped record of manual roster overrides.
//
// The ledger outlives any particular fetch. Disconnecting from the league
// platform clears the snapshot but leaves the ledger alone, so a reconnect
// restores the user's ordering and injury flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Group;
use crate::store::{SharedStore, StoreError, EDITS_KEY};

/// Reserved sub-key inside a team's edit map holding the bench boundaries.
pub const BENCH_STARTS_KEY: &str = "__benchStarts";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("player id `{0}` is reserved")]
    ReservedPlayerId(String),
}

/// A partial override for one player. Absent fields mean "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injured: Option<bool>,
}

impl PlayerEdit {
    /// Patch recording a player's rank within `group`.
    pub fn ranked(group: Group, order: u32) -> Self {
        PlayerEdit {
            group: Some(group),
            order: Some(order),
            injured: None,
        }
    }

    /// Patch recording a player's injury flag. The group rides along so the
    /// entry still matches the player's group on the next reconciliation.
    pub fn injury(group: Group, injured: bool) -> Self {
        PlayerEdit {
            group: Some(group),
            order: None,
            injured: Some(injured),
        }
    }

    /// Shallow field-wise merge: fields present in `patch` overwrite,
    /// absent ones are kept.
    pub fn merge(&mut self, patch: &PlayerEdit) {
        if patch.group.is_some() {
            self.group = patch.group;
        }
        if patch.order.is_some() {
            self.order = patch.order;
        }
        if patch.injured.is_some() {
            self.injured = patch.injured;
        }
    }
}

/// Everything the ledger knows about one team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamEdits {
    #[serde(
        rename = "__benchStarts",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub bench_starts: BTreeMap<Group, u32>,
    /// Player id -> override.
    #[serde(flatten)]
    pub players: BTreeMap<String, PlayerEdit>,
}

/// Whole-ledger document: team id -> edits.
pub type LedgerDoc = BTreeMap<String, TeamEdits>;

/// Handle to the ledger blob in a key-value store. Every write persists the
/// whole ledger in a single `set`.
#[derive(Clone)]
pub struct EditLedger {
    store: SharedStore,
}

impl EditLedger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Read the full ledger. A missing, unreadable or corrupt blob reads as
    /// an empty ledger.
    pub fn load(&self) -> LedgerDoc {
        let raw = match self.store.get(EDITS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LedgerDoc::new(),
            Err(e) => {
                warn!("failed to read edit ledger, treating as empty: {}", e);
                return LedgerDoc::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("edit ledger is corrupt, treating as empty: {}", e);
                LedgerDoc::new()
            }
        }
    }

    fn save(&self, doc: &LedgerDoc) -> Result<(), LedgerError> {
        let json = serde_json::to_string(doc).map_err(|source| StoreError::Encode {
            key: EDITS_KEY.to_string(),
            source,
        })?;
        self.store.set(EDITS_KEY, &json)?;
        Ok(())
    }

    /// Edits for one team; empty when the team is unknown.
    pub fn team_edits(&self, team_id: &str) -> TeamEdits {
        self.load().remove(team_id).unwrap_or_default()
    }

    pub fn player_edit(&self, team_id: &str, player_id: &str) -> Option<PlayerEdit> {
        self.team_edits(team_id).players.remove(player_id)
    }

    /// Merge `patch` onto the entry for `(team_id, player_id)` and persist.
    pub fn set_player_edit(
        &self,
        team_id: &str,
        player_id: &str,
        patch: PlayerEdit,
    ) -> Result<(), LedgerError> {
        self.set_player_edits(team_id, [(player_id.to_string(), patch)])
    }

    /// Merge several patches for one team and persist them in one write.
    /// Either every patch lands or none does.
    pub fn set_player_edits<I>(&self, team_id: &str, patches: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = (String, PlayerEdit)>,
    {
        let patches: Vec<(String, PlayerEdit)> = patches.into_iter().collect();
        if let Some((id, _)) = patches.iter().find(|(id, _)| id == BENCH_STARTS_KEY) {
            return Err(LedgerError::ReservedPlayerId(id.clone()));
        }

        let mut doc = self.load();
        let team = doc.entry(team_id.to_string()).or_default();
        for (player_id, patch) in &patches {
            team.players.entry(player_id.clone()).or_default().merge(patch);
        }
        self.save(&doc)?;
        debug!("ledger: {} patch(es) saved for team {}", patches.len(), team_id);
        Ok(())
    }

    pub fn bench_starts(&self, team_id: &str) -> BTreeMap<Group, u32> {
        self.team_edits(team_id).bench_starts
    }

    pub fn bench_start(&self, team_id: &str, group: Group) -> Option<u32> {
        self.bench_starts(team_id).get(&group).copied()
    }

    /// Set (or with `None`, clear) the starter/bench boundary for a group.
    pub fn set_bench_start(
        &self,
        team_id: &str,
        group: Group,
        index: Option<u32>,
    ) -> Result<(), LedgerError> {
        let mut doc = self.load();
        let team = doc.entry(team_id.to_string()).or_default();
        match index {
            Some(idx) => {
                team.bench_starts.insert(group, idx);
            }
            None => {
                team.bench_starts.remove(&group);
            }
        }
        self.save(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn ledger() -> (EditLedger, SharedStore) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        (EditLedger::new(store.clone()), store)
    }

    #[test]
    fn unknown_team_has_no_edits() {
        let (ledger, _) = ledger();
        let edits = ledger.team_edits("nope");
        assert!(edits.players.is_empty());
        assert!(edits.bench_starts.is_empty());
    }

    #[test]
    fn set_player_edit_merges_fieldwise() {
        let (ledger, _) = ledger();
        ledger
            .set_player_edit("t1", "p1", PlayerEdit::ranked(Group::RunningBack, 2))
            .unwrap();
        ledger
            .set_player_edit("t1", "p1", PlayerEdit::injury(Group::RunningBack, true))
            .unwrap();

        let edit = ledger.player_edit("t1", "p1").unwrap();
        assert_eq!(edit.group, Some(Group::RunningBack));
        assert_eq!(edit.order, Some(2));
        assert_eq!(edit.injured, Some(true));
    }

    #[test]
    fn patch_fields_overwrite_previous_values() {
        let (ledger, _) = ledger();
        ledger
            .set_player_edit("t1", "p1", PlayerEdit::ranked(Group::RunningBack, 2))
            .unwrap();
        ledger
            .set_player_edit("t1", "p1", PlayerEdit::ranked(Group::WideReceiver, 5))
            .unwrap();

        let edit = ledger.player_edit("t1", "p1").unwrap();
        assert_eq!(edit.group, Some(Group::WideReceiver));
        assert_eq!(edit.order, Some(5));
        assert_eq!(edit.injured, None);
    }

    #[test]
    fn corrupt_blob_reads_as_empty() {
        let (ledger, store) = ledger();
        store.set(EDITS_KEY, "{not json").unwrap();
        assert!(ledger.load().is_empty());
        assert!(ledger.team_edits("t1").players.is_empty());

        // A write after corruption starts from a clean ledger.
        ledger
            .set_player_edit("t1", "p1", PlayerEdit::ranked(Group::Quarterback, 1))
            .unwrap();
        assert_eq!(ledger.player_edit("t1", "p1").unwrap().order, Some(1));
    }

    #[test]
    fn bench_starts_do_not_collide_with_players() {
        let (ledger, store) = ledger();
        ledger
            .set_player_edit("t1", "p1", PlayerEdit::ranked(Group::WideReceiver, 1))
            .unwrap();
        ledger.set_bench_start("t1", Group::WideReceiver, Some(3)).unwrap();

        assert_eq!(ledger.bench_start("t1", Group::WideReceiver), Some(3));
        assert_eq!(ledger.bench_start("t1", Group::RunningBack), None);
        let edits = ledger.team_edits("t1");
        assert_eq!(edits.players.len(), 1);
        assert!(edits.players.contains_key("p1"));

        let raw = store.get(EDITS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["t1"]["__benchStarts"]["WR"], 3);
        assert_eq!(value["t1"]["p1"]["order"], 1);
    }

    #[test]
    fn clearing_bench_start_removes_entry() {
        let (ledger, _) = ledger();
        ledger.set_bench_start("t1", Group::TightEnd, Some(2)).unwrap();
        ledger.set_bench_start("t1", Group::TightEnd, None).unwrap();
        assert_eq!(ledger.bench_start("t1", Group::TightEnd), None);
    }

    #[test]
    fn reserved_player_id_is_rejected() {
        let (ledger, _) = ledger();
        let err = ledger
            .set_player_edit("t1", BENCH_STARTS_KEY, PlayerEdit::ranked(Group::Quarterback, 1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReservedPlayerId(_)));
        assert!(ledger.load().is_empty());
    }

    #[test]
    fn reads_ledger_written_by_browser_app() {
        let (ledger, store) = ledger();
        store
            .set(
                EDITS_KEY,
                r#"{"sleeper:9":{"sleeper-player:1":{"group":"QB","order":2},
                    "sleeper-player:2":{"group":"RB","injured":true},
                    "__benchStarts":{"RB":2}}}"#,
            )
            .unwrap();

        let edits = ledger.team_edits("sleeper:9");
        assert_eq!(edits.players.len(), 2);
        assert_eq!(
            edits.players["sleeper-player:1"],
            PlayerEdit::ranked(Group::Quarterback, 2)
        );
        assert_eq!(edits.players["sleeper-player:2"].injured, Some(true));
        assert_eq!(edits.bench_starts.get(&Group::RunningBack), Some(&2));
    }

    #[test]
    fn batch_patches_land_in_one_write() {
        let (ledger, _) = ledger();
        ledger
            .set_player_edits(
                "t1",
                vec![
                    ("a".to_string(), PlayerEdit::ranked(Group::Quarterback, 2)),
                    ("b".to_string(), PlayerEdit::ranked(Group::Quarterback, 1)),
                ],
            )
            .unwrap();
        let edits = ledger.team_edits("t1");
        assert_eq!(edits.players["a"].order, Some(2));
        assert_eq!(edits.players["b"].order, Some(1));
    }
}
