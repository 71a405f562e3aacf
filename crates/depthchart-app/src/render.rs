// Plain-text views of a team: summary header, group lists, picks, and the
// whole-roster overview.

use std::collections::BTreeMap;
use std::fmt::Write;

use depthchart_core::model::{Group, Player, Team};

use crate::session::{visible_tabs, Tab};

const EMPTY: &str = "—";

/// Slot label for the player at `index` (0-based) within `group`.
pub fn slot_label(group: Group, index: usize) -> String {
    match group {
        Group::Taxi => format!("TX{}", index + 1),
        g => format!("{}{}", g.as_str(), index + 1),
    }
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        EMPTY
    } else {
        s
    }
}

fn player_line(out: &mut String, group: Group, index: usize, p: &Player) {
    let _ = write!(
        out,
        "  {:<5} {}  {} • {}",
        slot_label(group, index),
        p.name,
        or_dash(&p.nfl_team),
        or_dash(&p.age)
    );
    if p.injured {
        out.push_str("  [INJ]");
    }
    out.push('\n');
}

/// Whether the starters/bench divider applies to `group` on `team`.
pub fn bench_split_enabled(team: &Team, group: Group) -> bool {
    group != Group::Taxi && !team.is_best_ball
}

/// Header block: names, settings pills, per-group counts, pick counts.
pub fn summary(team: &Team) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} — {}", team.league_name, team.name);
    if !team.settings_pills.is_empty() {
        let _ = writeln!(out, "{}", team.settings_pills.join(" · "));
    }

    let counts: Vec<String> = visible_tabs(Some(team))
        .into_iter()
        .filter_map(|tab| match tab {
            Tab::Group(g) => Some(format!("{} {}", g, team.group_len(g))),
            _ => None,
        })
        .collect();
    let _ = writeln!(out, "{}", counts.join(" · "));

    let picks: Vec<String> = team
        .picks_by_year
        .iter()
        .map(|(year, labels)| format!("{} Picks: {}", year, labels.len()))
        .collect();
    if !picks.is_empty() {
        let _ = writeln!(out, "{}", picks.join(" · "));
    }
    out
}

/// Ranked list for one group. `bench_start` draws a "Bench" divider before
/// that index, clamped to the list length.
pub fn group_view(team: &Team, group: Group, bench_start: Option<u32>) -> String {
    let players = team.players_in_group(group);
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", group, players.len());

    if players.is_empty() {
        out.push_str("  No players in this group.\n");
        return out;
    }

    let divider = bench_start
        .filter(|_| bench_split_enabled(team, group))
        .map(|idx| (idx as usize).min(players.len()));

    for (i, p) in players.iter().enumerate() {
        if divider == Some(i) {
            out.push_str("  ---- Bench ----\n");
        }
        player_line(&mut out, group, i, p);
    }
    if divider == Some(players.len()) {
        out.push_str("  ---- Bench ----\n");
    }
    out
}

/// Picks grouped by season in ascending year order.
pub fn picks_view(team: &Team) -> String {
    let mut out = String::new();
    for (year, labels) in &team.picks_by_year {
        let _ = writeln!(out, "{} Picks", year);
        if labels.is_empty() {
            let _ = writeln!(out, "  {}", EMPTY);
        } else {
            for label in labels {
                let _ = writeln!(out, "  • {}", label);
            }
        }
    }
    out
}

/// Every visible group as a read-only card, followed by the picks.
pub fn roster_view(team: &Team) -> String {
    let mut out = String::new();
    for tab in visible_tabs(Some(team)) {
        let Tab::Group(group) = tab else {
            continue;
        };
        let players = team.players_in_group(group);
        let _ = writeln!(out, "{} · {} total", group, players.len());
        if players.is_empty() {
            out.push_str("  None\n");
        }
        for (i, p) in players.iter().enumerate() {
            player_line(&mut out, group, i, p);
        }
        out.push('\n');
    }
    out.push_str(&picks_view(team));
    out
}

/// Render `tab` for `team`.
pub fn tab_view(team: &Team, tab: Tab, bench_starts: &BTreeMap<Group, u32>) -> String {
    match tab {
        Tab::Group(g) => group_view(team, g, bench_starts.get(&g).copied()),
        Tab::Picks => picks_view(team),
        Tab::Roster => roster_view(team),
    }
}

/// One line per team, marking the active one.
pub fn team_list(teams: &[Team], active_id: Option<&str>) -> String {
    if teams.is_empty() {
        return "No teams loaded.\n".to_string();
    }
    let mut out = String::new();
    for t in teams {
        let marker = if Some(t.id.as_str()) == active_id { '*' } else { ' ' };
        let _ = writeln!(out, "{} {}  {} — {}", marker, t.id, t.league_name, t.name);
    }
    out
}
