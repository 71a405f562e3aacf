// Players dictionary cache. The dictionary is large and changes slowly, so
// it is kept in the key-value store and refetched only once it is older
// than the configured max age.

use chrono::{DateTime, Duration, Utc};
use depthchart_core::source::SourceError;
use depthchart_core::store::{SharedStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::client::SleeperClient;
use super::types::PlayersDict;

pub const PLAYERS_CACHE_KEY: &str = "ddc.sleeper.players";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedPlayers {
    updated_at: DateTime<Utc>,
    players: PlayersDict,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedPlayersRef<'a> {
    updated_at: DateTime<Utc>,
    players: &'a PlayersDict,
}

pub struct PlayersCache {
    store: SharedStore,
    max_age: Duration,
}

impl PlayersCache {
    pub fn new(store: SharedStore, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// The cached dictionary, if present, readable and younger than the max
    /// age at `now`.
    pub fn load_fresh(&self, now: DateTime<Utc>) -> Option<PlayersDict> {
        let raw = match self.store.get(PLAYERS_CACHE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("failed to read players cache: {}", e);
                return None;
            }
        };
        let cached: CachedPlayers = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                warn!("players cache is corrupt, refetching: {}", e);
                return None;
            }
        };
        if now - cached.updated_at < self.max_age {
            Some(cached.players)
        } else {
            None
        }
    }

    pub fn save(&self, players: &PlayersDict, now: DateTime<Utc>) -> Result<(), StoreError> {
        let cached = CachedPlayersRef {
            updated_at: now,
            players,
        };
        let json = serde_json::to_string(&cached).map_err(|source| StoreError::Encode {
            key: PLAYERS_CACHE_KEY.to_string(),
            source,
        })?;
        self.store.set(PLAYERS_CACHE_KEY, &json)
    }

    /// Cached dictionary when fresh, otherwise fetch and cache it. A failed
    /// cache write is logged and the fetched dictionary is still returned.
    pub async fn get_or_fetch(&self, client: &SleeperClient) -> Result<PlayersDict, SourceError> {
        let now = Utc::now();
        if let Some(players) = self.load_fresh(now) {
            return Ok(players);
        }

        let players = client.players().await?;
        info!("fetched {} players from Sleeper", players.len());
        if let Err(e) = self.save(&players, now) {
            warn!("failed to cache players dictionary: {}", e);
        }
        Ok(players)
    }
}
