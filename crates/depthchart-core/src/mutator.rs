// Group order mutator: apply a user's in-group reorder or injury toggle to a
// team and write the override through to the edit ledger.

use std::collections::HashSet;

use thiserror::Error;
use tracing::info;

use crate::ledger::{EditLedger, LedgerError, PlayerEdit};
use crate::model::{Group, Player, Team};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MutateError {
    #[error("unknown team `{0}`")]
    UnknownTeam(String),

    #[error("team {team_id}: unknown player `{player_id}`")]
    UnknownPlayer { team_id: String, player_id: String },

    #[error("team {team_id}: new {group} order must list exactly the current {group} players ({detail})")]
    PlayerSetMismatch {
        team_id: String,
        group: Group,
        detail: String,
    },

    #[error("team {team_id}: bench split is not available for {group}")]
    BenchSplitDisabled { team_id: String, group: Group },

    #[error("team {team_id}: bench start {index} is past the end of {group} ({len} players)")]
    BenchStartOutOfRange {
        team_id: String,
        group: Group,
        index: u32,
        len: usize,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reorder the members of `group` to match `new_list`.
///
/// `new_list` must hold exactly the team's current `group` members. Orders are
/// renumbered `1..=n` by list position and one `{group, order}` patch per
/// player is written to the ledger in a single write. The returned team has
/// the other groups untouched, with the renumbered group appended after them.
pub fn reorder_group(
    team: &Team,
    group: Group,
    new_list: Vec<Player>,
    ledger: &EditLedger,
) -> Result<Team, MutateError> {
    check_same_members(team, group, &new_list)?;

    let renumbered: Vec<Player> = new_list
        .into_iter()
        .enumerate()
        .map(|(idx, p)| Player {
            group,
            order: Some(idx as u32 + 1),
            ..p
        })
        .collect();

    ledger.set_player_edits(
        &team.id,
        renumbered
            .iter()
            .map(|p| (p.id.clone(), PlayerEdit::ranked(group, p.order.unwrap_or_default()))),
    )?;

    let mut players: Vec<Player> = team
        .players
        .iter()
        .filter(|p| p.group != group)
        .cloned()
        .collect();
    let moved = renumbered.len();
    players.extend(renumbered);

    info!("team {}: {} order saved ({} players)", team.id, group, moved);

    Ok(Team {
        players,
        ..team.clone()
    })
}

/// Reorder `group` given only the player ids in their new order.
pub fn reorder_group_by_ids<S: AsRef<str>>(
    team: &Team,
    group: Group,
    ids: &[S],
    ledger: &EditLedger,
) -> Result<Team, MutateError> {
    let mut list = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.as_ref();
        let player = team
            .players
            .iter()
            .find(|p| p.id == id && p.group == group)
            .ok_or_else(|| MutateError::PlayerSetMismatch {
                team_id: team.id.clone(),
                group,
                detail: format!("`{id}` is not in {group}"),
            })?;
        list.push(player.clone());
    }
    reorder_group(team, group, list, ledger)
}

/// Flip a player's injury flag and record it in the ledger. Returns the
/// updated team and the new flag value.
pub fn toggle_injured(
    team: &Team,
    player_id: &str,
    ledger: &EditLedger,
) -> Result<(Team, bool), MutateError> {
    let current = team.player(player_id).ok_or_else(|| MutateError::UnknownPlayer {
        team_id: team.id.clone(),
        player_id: player_id.to_string(),
    })?;
    let injured = !current.injured;

    ledger.set_player_edit(&team.id, player_id, PlayerEdit::injury(current.group, injured))?;

    let mut next = team.clone();
    if let Some(p) = next.players.iter_mut().find(|p| p.id == player_id) {
        p.injured = injured;
    }
    info!(
        "team {}: {} marked {}",
        team.id,
        player_id,
        if injured { "injured" } else { "healthy" }
    );
    Ok((next, injured))
}

fn check_same_members(team: &Team, group: Group, new_list: &[Player]) -> Result<(), MutateError> {
    let mismatch = |detail: String| MutateError::PlayerSetMismatch {
        team_id: team.id.clone(),
        group,
        detail,
    };

    let current: HashSet<&str> = team
        .players
        .iter()
        .filter(|p| p.group == group)
        .map(|p| p.id.as_str())
        .collect();

    let mut proposed = HashSet::new();
    for p in new_list {
        if !proposed.insert(p.id.as_str()) {
            return Err(mismatch(format!("`{}` is listed twice", p.id)));
        }
        if !current.contains(p.id.as_str()) {
            return Err(mismatch(format!("`{}` is not in {group}", p.id)));
        }
    }
    if proposed.len() != current.len() {
        return Err(mismatch(format!(
            "expected {} players, got {}",
            current.len(),
            proposed.len()
        )));
    }
    Ok(())
}
