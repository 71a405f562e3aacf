// Reconciliation engine: merge freshly fetched teams with the saved snapshot
// and the edit ledger into the roster the user sees.
//
// The external source is authoritative for membership (which teams, which
// players, which group each player is in). Saved state and the ledger only
// contribute per-player `order` and `injured` values.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::ledger::{EditLedger, LedgerDoc, PlayerEdit};
use crate::model::{Group, Team};

/// Read access to ledger-layer overrides for a team.
pub trait EditSource {
    /// Player id -> override for `team_id`. Empty when the team is unknown.
    fn player_edits(&self, team_id: &str) -> BTreeMap<String, PlayerEdit>;
}

impl EditSource for EditLedger {
    fn player_edits(&self, team_id: &str) -> BTreeMap<String, PlayerEdit> {
        self.team_edits(team_id).players
    }
}

impl EditSource for LedgerDoc {
    fn player_edits(&self, team_id: &str) -> BTreeMap<String, PlayerEdit> {
        self.get(team_id).map(|t| t.players.clone()).unwrap_or_default()
    }
}

/// Reconcile every fresh team against its saved counterpart (matched by id)
/// and the ledger. Saved teams with no fresh counterpart are dropped.
pub fn reconcile_teams<E: EditSource + ?Sized>(
    fresh: Vec<Team>,
    saved: &[Team],
    edits: &E,
) -> Vec<Team> {
    let saved_by_id: HashMap<&str, &Team> = saved.iter().map(|t| (t.id.as_str(), t)).collect();

    fresh
        .into_iter()
        .map(|team| {
            let saved_team = saved_by_id.get(team.id.as_str()).copied();
            let ledger_layer = edits.player_edits(&team.id);
            reconcile_team(team, saved_team, &ledger_layer)
        })
        .collect()
}

/// Reconcile one fresh team.
///
/// Per player the effective patch is the ledger entry if present, else the
/// snapshot entry. `injured` from the patch always applies; `order` applies
/// only when the patch's group matches the player's fresh group. Players
/// left unranked are appended after the highest rank in their group, in
/// fetch order.
///
/// Orders in the result are not guaranteed unique within a group. An
/// injury-only ledger entry hides that player's snapshot order, so the
/// player keeps its fetched rank while group-mates take theirs from the
/// snapshot. Display sorting keeps tied players in fetch order;
/// `Team::validate` would reject such a result.
pub fn reconcile_team(
    fresh: Team,
    saved: Option<&Team>,
    ledger_layer: &BTreeMap<String, PlayerEdit>,
) -> Team {
    let snapshot_layer: HashMap<&str, PlayerEdit> = saved
        .map(|t| {
            t.players
                .iter()
                .map(|p| {
                    (
                        p.id.as_str(),
                        PlayerEdit {
                            group: Some(p.group),
                            order: p.order,
                            injured: Some(p.injured),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    // Next free rank per group, seeded from the fetched (pre-patch) orders.
    let mut max_order: HashMap<Group, u32> = HashMap::new();
    for p in &fresh.players {
        if let Some(o) = p.order {
            let slot = max_order.entry(p.group).or_insert(0);
            *slot = (*slot).max(o);
        }
    }

    let team_id = fresh.id.clone();
    let mut players = fresh.players;

    for p in players.iter_mut() {
        let patch = ledger_layer
            .get(&p.id)
            .or_else(|| snapshot_layer.get(p.id.as_str()));
        let Some(patch) = patch else {
            continue;
        };

        if let Some(injured) = patch.injured {
            p.injured = injured;
        }

        match (patch.group, patch.order) {
            (Some(group), Some(order)) if group == p.group => {
                p.order = Some(order);
            }
            (Some(group), Some(_)) => {
                debug!(
                    "team {}: ignoring stale order for {} (saved group {}, now {})",
                    team_id, p.id, group, p.group
                );
            }
            _ => {}
        }
    }

    // Patched ranks can exceed the fetched ones; appended players still go
    // below every existing rank.
    for p in &players {
        if let Some(o) = p.order {
            let slot = max_order.entry(p.group).or_insert(0);
            *slot = (*slot).max(o);
        }
    }

    for p in players.iter_mut().filter(|p| p.order.is_none()) {
        let next = max_order.entry(p.group).or_insert(0);
        *next += 1;
        p.order = Some(*next);
    }

    Team { players, ..fresh }
}
