// Thin JSON client for the public Sleeper API.
//
// Every request carries a cache-busting `t=<millis>` parameter and no-cache
// headers so a refresh always sees the league as it is right now.

use chrono::Utc;
use depthchart_core::source::SourceError;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Draft, DraftSummary, League, LeagueSummary, PlayersDict, Roster, TradedPick, User};

pub const DEFAULT_BASE_URL: &str = "https://api.sleeper.app/v1";

pub struct SleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up a user by username. Sleeper answers `null` for unknown names.
    pub async fn user(&self, username: &str) -> Result<Option<User>, SourceError> {
        self.get_json(&["user", username]).await
    }

    pub async fn user_leagues(&self, user_id: &str, season: &str) -> Result<Vec<LeagueSummary>, SourceError> {
        let leagues: Option<Vec<LeagueSummary>> = self
            .get_json(&["user", user_id, "leagues", "nfl", season])
            .await?;
        Ok(leagues.unwrap_or_default())
    }

    pub async fn league(&self, league_id: &str) -> Result<League, SourceError> {
        self.get_json(&["league", league_id]).await
    }

    pub async fn league_users(&self, league_id: &str) -> Result<Vec<User>, SourceError> {
        self.get_json(&["league", league_id, "users"]).await
    }

    pub async fn league_rosters(&self, league_id: &str) -> Result<Vec<Roster>, SourceError> {
        self.get_json(&["league", league_id, "rosters"]).await
    }

    pub async fn traded_picks(&self, league_id: &str) -> Result<Vec<TradedPick>, SourceError> {
        self.get_json(&["league", league_id, "traded_picks"]).await
    }

    pub async fn league_drafts(&self, league_id: &str) -> Result<Vec<DraftSummary>, SourceError> {
        self.get_json(&["league", league_id, "drafts"]).await
    }

    pub async fn draft(&self, draft_id: &str) -> Result<Draft, SourceError> {
        self.get_json(&["draft", draft_id]).await
    }

    /// The full NFL players dictionary (several megabytes). Callers should
    /// go through the players cache instead.
    pub async fn players(&self) -> Result<PlayersDict, SourceError> {
        self.get_json(&["players", "nfl"]).await
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let invalid = |message: String| SourceError::Request {
            url: self.base_url.clone(),
            message,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, SourceError> {
        let endpoint = self.endpoint(segments)?;
        let url = endpoint.to_string();
        let millis = Utc::now().timestamp_millis();
        debug!("GET {}?t={}", url, millis);

        let request_err = |e: reqwest::Error| SourceError::Request {
            url: url.clone(),
            message: e.to_string(),
        };

        let resp = self
            .http
            .get(endpoint)
            .query(&[("t", millis)])
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(request_err)?;

        let status = resp.status();
        let body = resp.text().await.map_err(request_err)?;
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            url,
            message: e.to_string(),
        })
    }
}
