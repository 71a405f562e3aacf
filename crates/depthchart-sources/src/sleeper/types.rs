// Sleeper API response shapes. Only the fields the adapter reads are
// declared; everything else is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Entry of `/user/<id>/leagues/nfl/<season>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeagueSummary {
    pub league_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct League {
    #[serde(default)]
    pub total_rosters: Option<u32>,
    #[serde(default)]
    pub roster_positions: Option<Vec<String>>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub scoring_settings: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Roster {
    pub roster_id: u32,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub co_owners: Option<Vec<String>>,
    #[serde(default)]
    pub starters: Option<Vec<String>>,
    #[serde(default)]
    pub taxi: Option<Vec<String>>,
    #[serde(default)]
    pub players: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl Roster {
    /// True if `user_id` owns or co-owns this roster.
    pub fn has_user(&self, user_id: &str) -> bool {
        if self.owner_id.as_deref() == Some(user_id) {
            return true;
        }
        self.co_owners
            .as_ref()
            .is_some_and(|co| co.iter().any(|c| c == user_id))
    }
}

/// Entry of `/league/<id>/traded_picks`. `roster_id` is the roster the pick
/// originally belonged to; `owner_id` is the roster holding it now.
#[derive(Debug, Clone, Deserialize)]
pub struct TradedPick {
    pub season: String,
    pub round: u32,
    pub roster_id: u32,
    pub owner_id: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftSummary {
    pub draft_id: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub draft_type: Option<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Draft {
    /// User id -> draft slot. Empty until the commissioner sets the order.
    #[serde(default)]
    pub draft_order: Option<HashMap<String, u32>>,
}

/// One entry of the `/players/nfl` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleeperPlayer {
    pub player_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Player id -> player.
pub type PlayersDict = HashMap<String, SleeperPlayer>;

/// Numeric reading of a loosely typed JSON value: numbers, numeric strings
/// and booleans. Anything else is `None`.
pub fn num(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Trimmed non-empty string at `key` in a metadata map.
pub fn meta_str<'a>(meta: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    meta?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
