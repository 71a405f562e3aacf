// Roster entities: teams, players, position groups, and pick labels.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Position groups
// ---------------------------------------------------------------------------

/// The bucket a player is ranked within. Each group is ordered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "DEF")]
    Defense,
    /// Roster-reserve (taxi squad) bucket.
    #[serde(rename = "TAXI")]
    Taxi,
}

impl Group {
    /// All groups in display order.
    pub const ALL: [Group; 6] = [
        Group::Quarterback,
        Group::RunningBack,
        Group::WideReceiver,
        Group::TightEnd,
        Group::Defense,
        Group::Taxi,
    ];

    /// Map an upstream position string to its group.
    ///
    /// Only QB, RB, WR, TE and DEF are mapped. Kickers and anything else
    /// return `None` and are left out of the roster entirely.
    pub fn from_position(pos: &str) -> Option<Self> {
        match pos.trim().to_uppercase().as_str() {
            "QB" => Some(Group::Quarterback),
            "RB" => Some(Group::RunningBack),
            "WR" => Some(Group::WideReceiver),
            "TE" => Some(Group::TightEnd),
            "DEF" => Some(Group::Defense),
            _ => None,
        }
    }

    /// Parse a group label, including the taxi bucket (`TAXI` or `TX`).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "TAXI" | "TX" => Some(Group::Taxi),
            other => Group::from_position(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Quarterback => "QB",
            Group::RunningBack => "RB",
            Group::WideReceiver => "WR",
            Group::TightEnd => "TE",
            Group::Defense => "DEF",
            Group::Taxi => "TAXI",
        }
    }

    /// Deterministic ordering index for display and CSV sorting.
    pub fn sort_order(&self) -> u8 {
        match self {
            Group::Quarterback => 0,
            Group::RunningBack => 1,
            Group::WideReceiver => 2,
            Group::TightEnd => 3,
            Group::Defense => 4,
            Group::Taxi => 5,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ranking helpers
// ---------------------------------------------------------------------------

/// Compare two ranks. Ranked players come first in ascending order; unranked
/// (`None`) players sort after every ranked one and compare equal to each
/// other so a stable sort keeps them in fetch order.
pub fn rank_cmp(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A rostered player. `order` is the 1-based rank within `group`; `None`
/// means the player has not been ranked yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub nfl_team: String,
    pub group: Group,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub injured: bool,
}

/// Parameters a value provider needs to price this league's players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationParams {
    pub is_dynasty: bool,
    pub num_qbs: u32,
    pub num_teams: u32,
    pub ppr: f64,
}

/// Where a team came from on the external platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRef {
    pub platform: String,
    pub league_id: String,
    pub user_id: String,
    #[serde(default)]
    pub valuation: Option<ValuationParams>,
}

/// One of the user's teams, with its players and owned draft picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Stable reconciliation key (e.g. `sleeper:<league id>`).
    pub id: String,
    #[serde(default)]
    pub league_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub players: Vec<Player>,
    /// Pick labels keyed by four-digit season.
    #[serde(default)]
    pub picks_by_year: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub settings_pills: Vec<String>,
    #[serde(default)]
    pub is_best_ball: bool,
    #[serde(default)]
    pub external: Option<ExternalRef>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("team {team_id}: player {player_id} appears more than once")]
    DuplicatePlayer { team_id: String, player_id: String },

    #[error("team {team_id}: order {order} is used more than once in {group}")]
    DuplicateOrder {
        team_id: String,
        group: Group,
        order: u32,
    },
}

impl Team {
    /// Create an empty team with the given identity.
    pub fn new(id: impl Into<String>, league_name: impl Into<String>, name: impl Into<String>) -> Self {
        Team {
            id: id.into(),
            league_name: league_name.into(),
            name: name.into(),
            players: Vec::new(),
            picks_by_year: BTreeMap::new(),
            settings_pills: Vec::new(),
            is_best_ball: false,
            external: None,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Members of `group` sorted by rank, unranked last in their current order.
    pub fn players_in_group(&self, group: Group) -> Vec<&Player> {
        let mut members: Vec<&Player> = self.players.iter().filter(|p| p.group == group).collect();
        members.sort_by(|a, b| rank_cmp(a.order, b.order));
        members
    }

    pub fn group_len(&self, group: Group) -> usize {
        self.players.iter().filter(|p| p.group == group).count()
    }

    /// Highest ranked order in `group`, or 0 when nobody in it is ranked.
    pub fn max_order(&self, group: Group) -> u32 {
        self.players
            .iter()
            .filter(|p| p.group == group)
            .filter_map(|p| p.order)
            .max()
            .unwrap_or(0)
    }

    /// Make sure every season in `years` has an entry, so views never have to
    /// special-case a missing year.
    pub fn ensure_pick_years(&mut self, years: &[String]) {
        for year in years {
            self.picks_by_year.entry(year.clone()).or_default();
        }
    }

    /// Check the roster invariants: unique player ids, and unique orders
    /// within each group.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen_ids = HashSet::new();
        let mut seen_orders: HashMap<Group, HashSet<u32>> = HashMap::new();

        for p in &self.players {
            if !seen_ids.insert(p.id.as_str()) {
                return Err(ModelError::DuplicatePlayer {
                    team_id: self.id.clone(),
                    player_id: p.id.clone(),
                });
            }
            if let Some(order) = p.order {
                if !seen_orders.entry(p.group).or_default().insert(order) {
                    return Err(ModelError::DuplicateOrder {
                        team_id: self.id.clone(),
                        group: p.group,
                        order,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Full application state: every team currently shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub teams: Vec<Team>,
}

impl AppState {
    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }
}

// ---------------------------------------------------------------------------
// Pick labels
// ---------------------------------------------------------------------------

/// Best-effort round number for a pick label.
///
/// Understands slot labels (`"1.03"` -> 1) and ordinal labels (`"2nd"`,
/// `"3rd via Bob"` -> 2, 3). Anything else returns `None`.
pub fn pick_round(label: &str) -> Option<u32> {
    let label = label.trim();
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let rest = label[digits.len()..].to_ascii_lowercase();
    let recognized = rest.is_empty()
        || rest.starts_with('.')
        || ["st", "nd", "rd", "th"].iter().any(|s| rest.starts_with(s));
    if !recognized {
        return None;
    }
    digits.parse().ok()
}
