// Sleeper league source: fetches every league the user plays in and turns
// the user's roster in each into a `Team`.

pub mod adapter;
pub mod client;
pub mod players;
pub mod types;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, Duration, Utc};
use depthchart_core::model::Team;
use depthchart_core::source::{SourceError, TeamSource};
use depthchart_core::store::SharedStore;
use tracing::{debug, info, warn};

use self::adapter::LeagueBundle;
use self::client::SleeperClient;
use self::players::PlayersCache;
use self::types::{League, LeagueSummary, PlayersDict, Roster};

pub use self::client::DEFAULT_BASE_URL;

/// Knobs for the Sleeper source.
#[derive(Debug, Clone)]
pub struct SleeperOptions {
    pub base_url: String,
    /// NFL season whose leagues are loaded (e.g. "2026").
    pub season: String,
    /// Seasons to list picks for. The first one gets slot labels when the
    /// rookie draft order is known.
    pub pick_years: Vec<String>,
    pub players_cache_max_age: Duration,
    /// Rookie draft rounds assumed when the league does not say.
    pub default_rookie_rounds: u32,
}

impl Default for SleeperOptions {
    fn default() -> Self {
        let season = Utc::now().year();
        SleeperOptions {
            base_url: DEFAULT_BASE_URL.to_string(),
            season: season.to_string(),
            pick_years: default_pick_years(season),
            players_cache_max_age: Duration::days(7),
            default_rookie_rounds: 5,
        }
    }
}

/// The season and the two after it.
pub fn default_pick_years(season: i32) -> Vec<String> {
    (season..season + 3).map(|y| y.to_string()).collect()
}

pub struct SleeperSource {
    client: SleeperClient,
    players: PlayersCache,
    username: String,
    options: SleeperOptions,
}

impl SleeperSource {
    pub fn new(store: SharedStore, username: impl Into<String>, options: SleeperOptions) -> Self {
        SleeperSource {
            client: SleeperClient::new(options.base_url.clone()),
            players: PlayersCache::new(store, options.players_cache_max_age),
            username: username.into().trim().to_string(),
            options,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    async fn fetch_league(
        &self,
        summary: &LeagueSummary,
        user_id: &str,
        players: &PlayersDict,
    ) -> Result<Option<Team>, SourceError> {
        let id = summary.league_id.as_str();
        let (league, users, rosters, traded_picks) = tokio::try_join!(
            self.client.league(id),
            self.client.league_users(id),
            self.client.league_rosters(id),
            self.client.traded_picks(id),
        )?;

        if !rosters.iter().any(|r| r.has_user(user_id)) {
            debug!("league {}: user has no roster, skipping", id);
            return Ok(None);
        }

        let slots = self.rookie_slots(id, &league, &rosters).await;
        let bundle = LeagueBundle {
            summary,
            league: &league,
            users: &users,
            rosters: &rosters,
            traded_picks: &traded_picks,
            slots: slots.as_ref(),
        };
        Ok(adapter::build_team(
            &bundle,
            user_id,
            players,
            &self.options.pick_years,
            self.options.default_rookie_rounds,
        ))
    }

    /// Draft slots for the first pick year. Any failure here only costs the
    /// slot labels, so errors are logged and swallowed.
    async fn rookie_slots(&self, league_id: &str, league: &League, rosters: &[Roster]) -> Option<HashMap<u32, u32>> {
        let season = self.options.pick_years.first()?;
        let rounds = adapter::rookie_rounds(league, self.options.default_rookie_rounds);

        let drafts = match self.client.league_drafts(league_id).await {
            Ok(d) => d,
            Err(e) => {
                warn!("league {}: could not load drafts: {}", league_id, e);
                return None;
            }
        };
        let summary = adapter::select_rookie_draft(&drafts, season, rounds)?;
        let draft = match self.client.draft(&summary.draft_id).await {
            Ok(d) => d,
            Err(e) => {
                warn!("league {}: could not load draft {}: {}", league_id, summary.draft_id, e);
                return None;
            }
        };
        adapter::slot_map(&draft, rosters, league.total_rosters)
    }
}

#[async_trait]
impl TeamSource for SleeperSource {
    fn name(&self) -> &str {
        adapter::PLATFORM
    }

    async fn fetch_teams(&self) -> Result<Vec<Team>, SourceError> {
        if self.username.is_empty() {
            return Ok(Vec::new());
        }

        let user = self
            .client
            .user(&self.username)
            .await?
            .ok_or_else(|| SourceError::UnknownUser(self.username.clone()))?;
        let leagues = self.client.user_leagues(&user.user_id, &self.options.season).await?;
        let players = self.players.get_or_fetch(&self.client).await?;

        let mut teams = Vec::with_capacity(leagues.len());
        for summary in &leagues {
            if let Some(team) = self.fetch_league(summary, &user.user_id, &players).await? {
                teams.push(team);
            }
        }

        info!(
            "sleeper: {} team(s) across {} league(s) for {}",
            teams.len(),
            leagues.len(),
            self.username
        );
        Ok(teams)
    }
}
