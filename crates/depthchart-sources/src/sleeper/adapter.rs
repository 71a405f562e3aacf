// Sleeper league -> Team conversion. Everything here is pure: the source
// gathers the API responses and hands them over in a `LeagueBundle`.

use std::collections::{HashMap, HashSet};

use depthchart_core::model::{ExternalRef, Group, Player, Team, ValuationParams};
use serde_json::Value;

use super::types::{num, meta_str, Draft, DraftSummary, League, LeagueSummary, PlayersDict, Roster, SleeperPlayer, TradedPick, User};

pub const PLATFORM: &str = "sleeper";

/// Rookie draft rounds above this are assumed to describe a startup draft.
const MAX_ROOKIE_ROUNDS: u32 = 10;

/// Roster slots that do not count as starters.
const NON_STARTER_SLOTS: [&str; 4] = ["BN", "IR", "RES", "TAXI"];

/// Everything fetched for one league.
pub struct LeagueBundle<'a> {
    pub summary: &'a LeagueSummary,
    pub league: &'a League,
    pub users: &'a [User],
    pub rosters: &'a [Roster],
    pub traded_picks: &'a [TradedPick],
    /// Roster id -> rookie draft slot for the first pick year, when known.
    pub slots: Option<&'a HashMap<u32, u32>>,
}

pub fn team_id(league_id: &str) -> String {
    format!("sleeper:{league_id}")
}

pub fn player_id(sleeper_id: &str) -> String {
    format!("sleeper-player:{sleeper_id}")
}

/// Build the user's team for one league, or `None` when the user has no
/// roster in it.
pub fn build_team(
    bundle: &LeagueBundle<'_>,
    user_id: &str,
    players: &PlayersDict,
    pick_years: &[String],
    default_rookie_rounds: u32,
) -> Option<Team> {
    let my_roster = bundle.rosters.iter().find(|r| r.has_user(user_id))?;
    let users_by_id: HashMap<&str, &User> = bundle.users.iter().map(|u| (u.user_id.as_str(), u)).collect();
    let league = bundle.league;

    let roster_names: HashMap<u32, String> = bundle
        .rosters
        .iter()
        .map(|r| {
            let user = r.owner_id.as_deref().and_then(|id| users_by_id.get(id)).copied();
            let name = user
                .and_then(user_label)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Roster {}", r.roster_id));
            (r.roster_id, name)
        })
        .collect();

    let picks_by_year = build_picks_by_year(&PickInputs {
        years: pick_years,
        rounds: rookie_rounds(league, default_rookie_rounds),
        traded_picks: bundle.traded_picks,
        my_roster_id: my_roster.roster_id,
        roster_names: &roster_names,
        slots: bundle.slots,
    });

    let mut team = Team::new(
        team_id(&bundle.summary.league_id),
        bundle
            .summary
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Sleeper League"),
        team_name(my_roster, &users_by_id),
    );
    team.players = roster_players(my_roster, players);
    team.picks_by_year = picks_by_year;
    team.settings_pills = settings_pills(league);
    team.is_best_ball = is_best_ball(league);
    team.external = Some(ExternalRef {
        platform: PLATFORM.to_string(),
        league_id: bundle.summary.league_id.clone(),
        user_id: user_id.to_string(),
        valuation: Some(valuation_params(league)),
    });
    Some(team)
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Ordered player rows for a roster: starters in lineup order, then taxi,
/// then the remaining bench. Starter and bench ranks share a per-group
/// counter; taxi has its own.
pub fn roster_players(roster: &Roster, dict: &PlayersDict) -> Vec<Player> {
    let starters = roster.starters.as_deref().unwrap_or_default();
    let taxi = roster.taxi.as_deref().unwrap_or_default();
    let all = roster.players.as_deref().unwrap_or_default();

    let mut rows = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut counters: HashMap<Group, u32> = HashMap::new();

    for pid in starters {
        let Some((p, group)) = lookup(dict, pid) else { continue };
        if !seen.insert(pid.as_str()) {
            continue;
        }
        let order = counters.entry(group).or_insert(0);
        *order += 1;
        rows.push(player_row(p, group, *order));
    }

    let mut taxi_order = 0;
    for pid in taxi {
        let Some((p, _)) = lookup(dict, pid) else { continue };
        if !seen.insert(pid.as_str()) {
            continue;
        }
        taxi_order += 1;
        rows.push(player_row(p, Group::Taxi, taxi_order));
    }

    for pid in all {
        let Some((p, group)) = lookup(dict, pid) else { continue };
        if !seen.insert(pid.as_str()) {
            continue;
        }
        let order = counters.entry(group).or_insert(0);
        *order += 1;
        rows.push(player_row(p, group, *order));
    }

    rows
}

/// Dictionary entry plus its group, for positions the roster tracks.
fn lookup<'a>(dict: &'a PlayersDict, pid: &str) -> Option<(&'a SleeperPlayer, Group)> {
    if pid.is_empty() {
        return None;
    }
    let p = dict.get(pid)?;
    let group = Group::from_position(p.position.as_deref().unwrap_or_default())?;
    Some((p, group))
}

fn player_row(p: &SleeperPlayer, group: Group, order: u32) -> Player {
    Player {
        id: player_id(&p.player_id),
        name: display_name(p),
        age: age_label(p.age.as_ref()),
        nfl_team: p.team.clone().unwrap_or_default(),
        group,
        order: Some(order),
        injured: false,
    }
}

fn display_name(p: &SleeperPlayer) -> String {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(full) = non_empty(&p.full_name) {
        return full;
    }
    let joined: Vec<String> = [non_empty(&p.first_name), non_empty(&p.last_name)]
        .into_iter()
        .flatten()
        .collect();
    if !joined.is_empty() {
        return joined.join(" ");
    }
    "Unknown".to_string()
}

fn age_label(age: Option<&Value>) -> String {
    match age {
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(0), _) => String::new(),
            (Some(v), _) => v.to_string(),
            (None, Some(f)) if f > 0.0 => f.to_string(),
            _ => String::new(),
        },
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Team naming
// ---------------------------------------------------------------------------

fn user_label(user: &User) -> Option<&str> {
    [user.display_name.as_deref(), user.username.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

/// Owner's team name, else the roster's, else the owner's display name or
/// username, else "Team".
pub fn team_name(roster: &Roster, users_by_id: &HashMap<&str, &User>) -> String {
    let owner = roster.owner_id.as_deref().and_then(|id| users_by_id.get(id)).copied();

    if let Some(name) = owner.and_then(|u| meta_str(u.metadata.as_ref(), "team_name")) {
        return name.to_string();
    }
    if let Some(name) = meta_str(roster.metadata.as_ref(), "team_name") {
        return name.to_string();
    }
    owner.and_then(user_label).unwrap_or("Team").to_string()
}

// ---------------------------------------------------------------------------
// League settings
// ---------------------------------------------------------------------------

fn roster_positions(league: &League) -> &[String] {
    league.roster_positions.as_deref().unwrap_or_default()
}

pub fn is_superflex(league: &League) -> bool {
    roster_positions(league).iter().any(|s| s == "SUPER_FLEX")
}

pub fn is_two_qb(league: &League) -> bool {
    roster_positions(league).iter().filter(|s| *s == "QB").count() >= 2
}

pub fn is_best_ball(league: &League) -> bool {
    num(league.settings.get("best_ball")).is_some_and(|v| v != 0.0)
}

fn scoring(league: &League, key: &str) -> Option<f64> {
    num(league.scoring_settings.get(key))
}

fn ppr_label(league: &League) -> Option<&'static str> {
    match scoring(league, "rec")? {
        r if r == 1.0 => Some("PPR"),
        r if r == 0.5 => Some("0.5 PPR"),
        r if r == 0.0 => Some("No PPR"),
        _ => None,
    }
}

/// Extra points per TE reception, from either a TE-specific reception value
/// or an explicit TE bonus.
fn te_premium(league: &League) -> Option<f64> {
    let base = scoring(league, "rec")?;
    if let Some(rec_te) = scoring(league, "rec_te") {
        if rec_te > base {
            return Some(rec_te - base);
        }
    }
    scoring(league, "bonus_rec_te").filter(|b| *b > 0.0)
}

enum FirstDown {
    Same(f64),
    Split { rush: Option<f64>, rec: Option<f64> },
}

fn first_down_points(league: &League) -> Option<FirstDown> {
    let either = |a: &str, b: &str| scoring(league, a).or_else(|| scoring(league, b)).filter(|v| *v > 0.0);
    let rush = either("rush_fd", "first_down_rush");
    let rec = either("rec_fd", "first_down_rec");

    match (rush, rec) {
        (None, None) => None,
        (Some(r), Some(c)) if r == c => Some(FirstDown::Same(r)),
        (rush, rec) => Some(FirstDown::Split { rush, rec }),
    }
}

fn starter_count(league: &League) -> Option<usize> {
    let slots = league.roster_positions.as_ref()?;
    Some(
        slots
            .iter()
            .filter(|s| !NON_STARTER_SLOTS.contains(&s.to_ascii_uppercase().as_str()))
            .count(),
    )
}

/// Short league-format labels shown next to the team name.
pub fn settings_pills(league: &League) -> Vec<String> {
    let mut pills = Vec::new();

    if let Some(n) = league.total_rosters {
        pills.push(format!("{n}T"));
    }

    pills.push(
        if is_superflex(league) {
            "SF"
        } else if is_two_qb(league) {
            "2QB"
        } else {
            "1QB"
        }
        .to_string(),
    );

    if is_best_ball(league) {
        pills.push("BB".to_string());
    }
    if let Some(label) = ppr_label(league) {
        pills.push(label.to_string());
    }
    if let Some(tep) = te_premium(league).filter(|t| *t > 0.0) {
        pills.push(format!("{tep} TEP"));
    }
    match first_down_points(league) {
        Some(FirstDown::Same(v)) => pills.push(format!("{v} PPFD")),
        Some(FirstDown::Split { rush, rec }) => {
            let mut parts = Vec::new();
            if let Some(r) = rush {
                parts.push(format!("R {r}"));
            }
            if let Some(c) = rec {
                parts.push(format!("REC {c}"));
            }
            pills.push(format!("PPFD ({})", parts.join(", ")));
        }
        None => {}
    }
    if scoring(league, "pass_td") == Some(6.0) {
        pills.push("6 PT Pass TD".to_string());
    }
    if let Some(n) = starter_count(league) {
        pills.push(format!("Start {n}"));
    }

    pills
}

pub fn valuation_params(league: &League) -> ValuationParams {
    ValuationParams {
        is_dynasty: true,
        num_qbs: if is_superflex(league) || is_two_qb(league) { 2 } else { 1 },
        num_teams: league.total_rosters.unwrap_or(12),
        ppr: scoring(league, "rec").unwrap_or(1.0),
    }
}

/// Rounds in the league's rookie draft. Values over 10 describe a startup
/// draft and are ignored.
pub fn rookie_rounds(league: &League, default_rounds: u32) -> u32 {
    ["rookie_draft_rounds", "draft_rounds"]
        .iter()
        .filter_map(|key| num(league.settings.get(*key)))
        .find(|v| *v > 0.0 && *v <= MAX_ROOKIE_ROUNDS as f64)
        .map(|v| v as u32)
        .unwrap_or(default_rounds)
}

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// The season's rookie draft: one explicitly typed as rookie, else one short
/// enough to be a rookie draft.
pub fn select_rookie_draft<'a>(
    drafts: &'a [DraftSummary],
    season: &str,
    rookie_rounds: u32,
) -> Option<&'a DraftSummary> {
    let in_season: Vec<&DraftSummary> = drafts.iter().filter(|d| d.season == season).collect();
    let max_rounds = MAX_ROOKIE_ROUNDS.max(rookie_rounds) as f64;

    in_season
        .iter()
        .find(|d| d.draft_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("rookie")))
        .or_else(|| {
            in_season.iter().find(|d| {
                num(d.settings.get("rounds")).is_some_and(|r| r > 0.0 && r <= max_rounds)
            })
        })
        .copied()
}

/// Roster id -> draft slot, from the draft's user order. Only trusted when
/// it covers at least 80% of the league.
pub fn slot_map(draft: &Draft, rosters: &[Roster], total_rosters: Option<u32>) -> Option<HashMap<u32, u32>> {
    let order = draft.draft_order.as_ref().filter(|o| !o.is_empty())?;

    let map: HashMap<u32, u32> = rosters
        .iter()
        .filter_map(|r| {
            let owner = r.owner_id.as_deref()?;
            order.get(owner).map(|slot| (r.roster_id, *slot))
        })
        .collect();

    let total = total_rosters.filter(|t| *t > 0).unwrap_or(rosters.len() as u32);
    let needed = (total as usize * 4) / 5;
    (map.len() >= needed).then_some(map)
}

struct PickInputs<'a> {
    years: &'a [String],
    rounds: u32,
    traded_picks: &'a [TradedPick],
    my_roster_id: u32,
    roster_names: &'a HashMap<u32, String>,
    slots: Option<&'a HashMap<u32, u32>>,
}

/// Pick identity: season, round, original roster.
type PickKey = (String, u32, u32);

/// Picks the user currently owns, per year. Own picks are listed first by
/// round, followed by acquired picks in the order Sleeper reports trades.
fn build_picks_by_year(inputs: &PickInputs<'_>) -> std::collections::BTreeMap<String, Vec<String>> {
    let me = inputs.my_roster_id;

    // Insertion-ordered pick key -> current owner.
    let mut keys: Vec<PickKey> = Vec::new();
    let mut owner: HashMap<PickKey, u32> = HashMap::new();
    let mut set_owner = |key: PickKey, roster: u32, keys: &mut Vec<PickKey>| {
        if owner.insert(key.clone(), roster).is_none() {
            keys.push(key);
        }
    };

    for year in inputs.years {
        for round in 1..=inputs.rounds {
            set_owner((year.clone(), round, me), me, &mut keys);
        }
    }
    for pick in inputs.traded_picks {
        if !inputs.years.contains(&pick.season) || pick.round < 1 || pick.round > inputs.rounds {
            continue;
        }
        set_owner((pick.season.clone(), pick.round, pick.roster_id), pick.owner_id, &mut keys);
    }

    let slot_year = inputs.years.first();
    let mut out: std::collections::BTreeMap<String, Vec<String>> =
        inputs.years.iter().map(|y| (y.clone(), Vec::new())).collect();

    for key in &keys {
        if owner.get(key) != Some(&me) {
            continue;
        }
        let (year, round, original) = key;
        let slot = inputs
            .slots
            .filter(|_| Some(year) == slot_year)
            .and_then(|slots| slots.get(original));
        let label = match slot {
            Some(slot) => format!("{round}.{slot:02}"),
            None => future_pick_label(*round, *original, me, inputs.roster_names),
        };
        if let Some(list) = out.get_mut(year) {
            list.push(label);
        }
    }
    out
}

fn future_pick_label(round: u32, original: u32, me: u32, names: &HashMap<u32, String>) -> String {
    let base = ordinal(round);
    if original == me {
        return base;
    }
    let via = names
        .get(&original)
        .cloned()
        .unwrap_or_else(|| format!("Roster {original}"));
    format!("{base} via {via}")
}

fn ordinal(round: u32) -> String {
    match round {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        n => format!("{n}th"),
    }
}
