// Session: the roster book plus everything around it that the front end
// needs (Sleeper username, view preferences, fetch generations).

use std::fmt;

use anyhow::Context;
use depthchart_core::book::RosterBook;
use depthchart_core::model::{Group, Team};
use depthchart_core::source::{SourceError, TeamSource};
use depthchart_core::store::SharedStore;
use depthchart_sources::{SleeperOptions, SleeperSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Storage key for the connected Sleeper username (plain string).
pub const USERNAME_KEY: &str = "ddc.sleeper.username";
/// Storage key for the view preferences blob.
pub const UI_PREFS_KEY: &str = "ddc.ui";

pub const LOAD_FAILED_MESSAGE: &str =
    "Couldn't Load Sleeper Leagues. Check Username and Try Again.";

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// One tab of the team view: a position group, the picks list, or the
/// whole-roster overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Group(Group),
    Picks,
    Roster,
}

impl Tab {
    pub const DEFAULT: Tab = Tab::Group(Group::Quarterback);

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "PICKS" => Some(Tab::Picks),
            "ROSTER" => Some(Tab::Roster),
            other => Group::parse(other).map(Tab::Group),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Group(g) => g.as_str(),
            Tab::Picks => "PICKS",
            Tab::Roster => "ROSTER",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tabs shown for `team`: QB, RB, WR, TE, then DEF only when the team has a
/// defense, TAXI unless best ball, then PICKS and ROSTER.
pub fn visible_tabs(team: Option<&Team>) -> Vec<Tab> {
    let mut tabs = vec![
        Tab::Group(Group::Quarterback),
        Tab::Group(Group::RunningBack),
        Tab::Group(Group::WideReceiver),
        Tab::Group(Group::TightEnd),
    ];
    if team.is_some_and(|t| t.group_len(Group::Defense) > 0) {
        tabs.push(Tab::Group(Group::Defense));
    }
    if !team.is_some_and(|t| t.is_best_ball) {
        tabs.push(Tab::Group(Group::Taxi));
    }
    tabs.push(Tab::Picks);
    tabs.push(Tab::Roster);
    tabs
}

// ---------------------------------------------------------------------------
// View preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab: Option<String>,
}

impl UiPrefs {
    fn merge(&mut self, patch: UiPrefs) {
        if patch.active_team_id.is_some() {
            self.active_team_id = patch.active_team_id;
        }
        if patch.active_tab.is_some() {
            self.active_tab = patch.active_tab;
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Result of handing a finished fetch to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The teams were reconciled and are now displayed.
    Applied { teams: usize },
    /// A newer fetch or a disconnect happened meanwhile; nothing changed.
    Stale,
}

pub struct Session {
    store: SharedStore,
    book: RosterBook,
    options: SleeperOptions,
    /// Bumped whenever a fetch starts or the user disconnects. Completions
    /// carrying an older value are dropped.
    generation: u64,
}

impl Session {
    pub fn open(store: SharedStore, options: SleeperOptions) -> Self {
        Session {
            book: RosterBook::open(store.clone()),
            store,
            options,
            generation: 0,
        }
    }

    pub fn book(&self) -> &RosterBook {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut RosterBook {
        &mut self.book
    }

    pub fn options(&self) -> &SleeperOptions {
        &self.options
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Saved Sleeper username, if any. Storage failures read as "not
    /// connected".
    pub fn username(&self) -> Option<String> {
        match self.store.get(USERNAME_KEY) {
            Ok(Some(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!("could not read saved username: {}", e);
                None
            }
        }
    }

    /// Remember `username` and drop the displayed teams so the next fetch
    /// starts clean. Local edits are kept.
    pub fn connect(&mut self, username: &str) -> anyhow::Result<String> {
        let username = username.trim();
        if username.is_empty() {
            anyhow::bail!("username must not be empty");
        }
        self.store
            .set(USERNAME_KEY, username)
            .context("failed to save username")?;
        self.book.clear_snapshot().context("failed to clear saved teams")?;
        info!("connected as {}", username);
        Ok(username.to_string())
    }

    /// Forget the username and the displayed teams. Any fetch still in
    /// flight becomes stale. Local edits are kept.
    pub fn disconnect(&mut self) -> anyhow::Result<()> {
        self.generation += 1;
        self.store
            .remove(USERNAME_KEY)
            .context("failed to clear username")?;
        self.book.clear_snapshot().context("failed to clear saved teams")?;
        info!("disconnected (generation {})", self.generation);
        Ok(())
    }

    /// Source for the saved username, or `None` when not connected.
    pub fn sleeper_source(&self) -> Option<SleeperSource> {
        let username = self.username()?;
        Some(SleeperSource::new(self.store.clone(), username, self.options.clone()))
    }

    /// Start a fetch and return the generation its completion must carry.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        debug!("fetch started (generation {})", self.generation);
        self.generation
    }

    /// Apply a finished fetch. Stale completions are dropped before their
    /// result is looked at; failures leave the displayed teams untouched.
    pub fn complete_fetch(
        &mut self,
        generation: u64,
        result: Result<Vec<Team>, SourceError>,
    ) -> anyhow::Result<FetchOutcome> {
        if generation != self.generation {
            debug!(
                "discarding stale fetch (fetch gen: {}, current gen: {})",
                generation, self.generation
            );
            return Ok(FetchOutcome::Stale);
        }

        let mut fresh = result.context(LOAD_FAILED_MESSAGE)?;
        for team in &mut fresh {
            team.ensure_pick_years(&self.options.pick_years);
        }
        let teams = self
            .book
            .apply_fresh(fresh)
            .context("failed to save teams")?
            .len();
        Ok(FetchOutcome::Applied { teams })
    }

    /// Fetch from `source` and apply the result in one step.
    pub async fn refresh(&mut self, source: &dyn TeamSource) -> anyhow::Result<FetchOutcome> {
        let generation = self.begin_fetch();
        info!("refreshing from {}", source.name());
        let result = source.fetch_teams().await;
        self.complete_fetch(generation, result)
    }

    // --- view preferences ---

    /// Saved preferences; a missing or corrupt blob reads as empty.
    pub fn prefs(&self) -> UiPrefs {
        let raw = match self.store.get(UI_PREFS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return UiPrefs::default(),
            Err(e) => {
                warn!("could not read view preferences: {}", e);
                return UiPrefs::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("ignoring corrupt view preferences: {}", e);
            UiPrefs::default()
        })
    }

    /// Merge `patch` over the saved preferences.
    pub fn save_prefs(&self, patch: UiPrefs) -> anyhow::Result<()> {
        let mut prefs = self.prefs();
        prefs.merge(patch);
        let json = serde_json::to_string(&prefs).context("failed to encode view preferences")?;
        self.store
            .set(UI_PREFS_KEY, &json)
            .context("failed to save view preferences")?;
        Ok(())
    }

    /// The preferred team when it is still present, else the first team.
    pub fn active_team(&self) -> Option<&Team> {
        let teams = self.book.teams();
        self.prefs()
            .active_team_id
            .and_then(|id| teams.iter().find(|t| t.id == id))
            .or_else(|| teams.first())
    }

    pub fn select_team(&self, team_id: &str) -> anyhow::Result<&Team> {
        let team = self
            .book
            .team(team_id)
            .with_context(|| format!("unknown team {team_id}"))?;
        self.save_prefs(UiPrefs {
            active_team_id: Some(team.id.clone()),
            active_tab: None,
        })?;
        Ok(team)
    }

    /// The preferred tab when it is visible for the active team, else the
    /// first visible tab.
    pub fn active_tab(&self) -> Tab {
        let tabs = visible_tabs(self.active_team());
        let preferred = self
            .prefs()
            .active_tab
            .as_deref()
            .and_then(Tab::parse)
            .unwrap_or(Tab::DEFAULT);
        if tabs.contains(&preferred) {
            preferred
        } else {
            tabs.first().copied().unwrap_or(Tab::DEFAULT)
        }
    }

    pub fn select_tab(&self, tab: Tab) -> anyhow::Result<()> {
        self.save_prefs(UiPrefs {
            active_team_id: None,
            active_tab: Some(tab.as_str().to_string()),
        })
    }
}
