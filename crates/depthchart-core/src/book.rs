// RosterBook: the in-memory roster plus the two stores that back it.
//
// Every mutation goes through here so the snapshot is rewritten before the
// caller sees the new state.

use std::collections::BTreeMap;

use tracing::info;

use crate::ledger::EditLedger;
use crate::model::{AppState, Group, Player, Team};
use crate::mutator::{self, MutateError};
use crate::reconcile::reconcile_teams;
use crate::snapshot::SnapshotStore;
use crate::store::{SharedStore, StoreError};

pub struct RosterBook {
    state: AppState,
    ledger: EditLedger,
    snapshot: SnapshotStore,
}

impl RosterBook {
    /// Open a book over `store`, restoring the last saved state if any.
    pub fn open(store: SharedStore) -> Self {
        let snapshot = SnapshotStore::new(store.clone());
        let state = snapshot.load().unwrap_or_default();
        info!("roster book opened with {} saved team(s)", state.teams.len());
        RosterBook {
            state,
            ledger: EditLedger::new(store),
            snapshot,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn teams(&self) -> &[Team] {
        &self.state.teams
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.state.team(team_id)
    }

    pub fn ledger(&self) -> &EditLedger {
        &self.ledger
    }

    /// Merge freshly fetched teams into the book. The ledger is read now,
    /// so edits made while the fetch was in flight are honored.
    pub fn apply_fresh(&mut self, fresh: Vec<Team>) -> Result<&[Team], StoreError> {
        let next = AppState {
            teams: reconcile_teams(fresh, &self.state.teams, &self.ledger),
        };
        self.snapshot.save(&next)?;
        info!("applied {} fresh team(s)", next.teams.len());
        self.state = next;
        Ok(&self.state.teams)
    }

    pub fn reorder_group(
        &mut self,
        team_id: &str,
        group: Group,
        new_list: Vec<Player>,
    ) -> Result<&Team, MutateError> {
        let team = self.require_team(team_id)?;
        let next = mutator::reorder_group(team, group, new_list, &self.ledger)?;
        self.replace_team(next)
    }

    pub fn reorder_group_by_ids<S: AsRef<str>>(
        &mut self,
        team_id: &str,
        group: Group,
        ids: &[S],
    ) -> Result<&Team, MutateError> {
        let team = self.require_team(team_id)?;
        let next = mutator::reorder_group_by_ids(team, group, ids, &self.ledger)?;
        self.replace_team(next)
    }

    /// Flip a player's injury flag. Returns the new flag value.
    pub fn toggle_injured(&mut self, team_id: &str, player_id: &str) -> Result<bool, MutateError> {
        let team = self.require_team(team_id)?;
        let (next, injured) = mutator::toggle_injured(team, player_id, &self.ledger)?;
        self.replace_team(next)?;
        Ok(injured)
    }

    pub fn bench_starts(&self, team_id: &str) -> BTreeMap<Group, u32> {
        self.ledger.bench_starts(team_id)
    }

    pub fn bench_start(&self, team_id: &str, group: Group) -> Option<u32> {
        self.ledger.bench_start(team_id, group)
    }

    /// Set or clear the index of the first bench player in `group`.
    pub fn set_bench_start(
        &mut self,
        team_id: &str,
        group: Group,
        index: Option<u32>,
    ) -> Result<(), MutateError> {
        let team = self.require_team(team_id)?;
        if group == Group::Taxi || team.is_best_ball {
            return Err(MutateError::BenchSplitDisabled {
                team_id: team_id.to_string(),
                group,
            });
        }
        if let Some(idx) = index {
            let len = team.group_len(group);
            if idx as usize > len {
                return Err(MutateError::BenchStartOutOfRange {
                    team_id: team_id.to_string(),
                    group,
                    index: idx,
                    len,
                });
            }
        }
        self.ledger.set_bench_start(team_id, group, index)?;
        Ok(())
    }

    /// Forget the displayed teams and the saved snapshot. The ledger stays.
    pub fn clear_snapshot(&mut self) -> Result<(), StoreError> {
        self.state = AppState::default();
        self.snapshot.clear()
    }

    fn require_team(&self, team_id: &str) -> Result<&Team, MutateError> {
        self.state
            .team(team_id)
            .ok_or_else(|| MutateError::UnknownTeam(team_id.to_string()))
    }

    fn replace_team(&mut self, next: Team) -> Result<&Team, MutateError> {
        let idx = self
            .state
            .teams
            .iter()
            .position(|t| t.id == next.id)
            .ok_or_else(|| MutateError::UnknownTeam(next.id.clone()))?;
        let mut state = self.state.clone();
        state.teams[idx] = next;
        // Memory only moves once the snapshot has been written.
        self.snapshot.save(&state)?;
        self.state = state;
        Ok(&self.state.teams[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PlayerEdit;
    use crate::store::{KeyValueStore, MemoryStore, SNAPSHOT_KEY};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Memory store whose snapshot writes can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_snapshot: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == SNAPSHOT_KEY && self.fail_snapshot.load(Ordering::SeqCst) {
                return Err(StoreError::Poisoned);
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn player(id: &str, group: Group, order: Option<u32>) -> Player {
        Player {
            id: id.to_string(),
            name: id.to_string(),
            age: String::new(),
            nfl_team: String::new(),
            group,
            order,
            injured: false,
        }
    }

    fn fetched() -> Vec<Team> {
        let mut t = Team::new("T1", "League", "Team");
        t.players = vec![
            player("A", Group::Quarterback, Some(1)),
            player("B", Group::Quarterback, Some(2)),
            player("C", Group::Quarterback, Some(3)),
            player("X", Group::Taxi, Some(1)),
        ];
        vec![t]
    }

    fn qb_order(book: &RosterBook) -> Vec<String> {
        book.team("T1")
            .unwrap()
            .players_in_group(Group::Quarterback)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    #[test]
    fn reorder_is_written_to_ledger_and_snapshot() {
        let store = MemoryStore::shared();
        let mut book = RosterBook::open(store.clone());
        book.apply_fresh(fetched()).unwrap();

        book.reorder_group_by_ids("T1", Group::Quarterback, &["C", "A", "B"])
            .unwrap();

        assert_eq!(
            book.ledger().player_edit("T1", "A"),
            Some(PlayerEdit::ranked(Group::Quarterback, 2))
        );
        let reopened = RosterBook::open(store);
        assert_eq!(qb_order(&reopened), vec!["C", "A", "B"]);
    }

    #[test]
    fn ledger_survives_disconnect_and_reconnect() {
        let store = MemoryStore::shared();
        let mut book = RosterBook::open(store.clone());
        book.apply_fresh(fetched()).unwrap();
        book.reorder_group_by_ids("T1", Group::Quarterback, &["B", "C", "A"])
            .unwrap();
        book.toggle_injured("T1", "C").unwrap();

        book.clear_snapshot().unwrap();
        assert!(book.teams().is_empty());

        let mut book = RosterBook::open(store);
        assert!(book.teams().is_empty());
        book.apply_fresh(fetched()).unwrap();

        assert_eq!(qb_order(&book), vec!["B", "C", "A"]);
        assert!(book.team("T1").unwrap().player("C").unwrap().injured);
    }

    #[test]
    fn refresh_keeps_user_order_over_fetched_order() {
        let mut book = RosterBook::open(MemoryStore::shared());
        book.apply_fresh(fetched()).unwrap();
        book.reorder_group_by_ids("T1", Group::Quarterback, &["C", "B", "A"])
            .unwrap();

        book.apply_fresh(fetched()).unwrap();
        assert_eq!(qb_order(&book), vec!["C", "B", "A"]);
    }

    #[test]
    fn unknown_team_is_rejected() {
        let mut book = RosterBook::open(MemoryStore::shared());
        let err = book.toggle_injured("nope", "A").unwrap_err();
        assert!(matches!(err, MutateError::UnknownTeam(_)));
    }

    #[test]
    fn bench_start_rules() {
        let mut book = RosterBook::open(MemoryStore::shared());
        book.apply_fresh(fetched()).unwrap();

        book.set_bench_start("T1", Group::Quarterback, Some(2)).unwrap();
        assert_eq!(book.bench_start("T1", Group::Quarterback), Some(2));

        assert!(matches!(
            book.set_bench_start("T1", Group::Quarterback, Some(4)),
            Err(MutateError::BenchStartOutOfRange { len: 3, .. })
        ));
        assert!(matches!(
            book.set_bench_start("T1", Group::Taxi, Some(1)),
            Err(MutateError::BenchSplitDisabled { .. })
        ));

        book.set_bench_start("T1", Group::Quarterback, None).unwrap();
        assert!(book.bench_starts("T1").is_empty());
    }

    #[test]
    fn best_ball_teams_have_no_bench_split() {
        let mut teams = fetched();
        teams[0].is_best_ball = true;
        let mut book = RosterBook::open(MemoryStore::shared());
        book.apply_fresh(teams).unwrap();

        assert!(matches!(
            book.set_bench_start("T1", Group::Quarterback, Some(1)),
            Err(MutateError::BenchSplitDisabled { .. })
        ));
    }

    #[test]
    fn failed_snapshot_write_leaves_memory_untouched() {
        let store = Arc::new(FlakyStore::default());
        let mut book = RosterBook::open(store.clone());
        book.apply_fresh(fetched()).unwrap();

        store.fail_snapshot.store(true, Ordering::SeqCst);
        let err = book
            .reorder_group_by_ids("T1", Group::Quarterback, &["C", "A", "B"])
            .unwrap_err();
        assert!(matches!(err, MutateError::Store(_)));
        assert_eq!(qb_order(&book), vec!["A", "B", "C"]);

        assert!(book.toggle_injured("T1", "A").is_err());
        assert!(!book.team("T1").unwrap().player("A").unwrap().injured);

        let mut changed = fetched();
        changed[0].players.pop();
        assert!(book.apply_fresh(changed).is_err());
        assert_eq!(book.team("T1").unwrap().players.len(), 4);

        // Memory still matches what a reopen would restore.
        store.fail_snapshot.store(false, Ordering::SeqCst);
        let reopened = RosterBook::open(store);
        assert_eq!(reopened.state(), book.state());
    }
}
