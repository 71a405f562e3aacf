// CSV depth chart import and the blank template generator.
//
// Expected columns: League Name, Team Name, Pos, Name, Age, Team, followed by
// one "<YYYY> Picks" column per season. `Pos` holds a slot label such as
// `QB3` (group QB, rank 3) or `TX` for a taxi player.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use depthchart_core::model::{rank_cmp, Group, Player, Team};
use depthchart_core::source::{SourceError, TeamSource};
use thiserror::Error;
use tracing::{info, warn};

const LEAGUE_PLACEHOLDER: &str = "League Name";
const TEAM_PLACEHOLDER: &str = "Team Name";
const PICKS_SUFFIX: &str = " Picks";

/// Template slot counts per position label.
const TEMPLATE_SLOTS: [(&str, u32); 6] = [("QB", 5), ("RB", 12), ("WR", 12), ("TE", 5), ("DEF", 2), ("TX", 5)];

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("failed to write CSV: {0}")]
    Write(std::io::Error),
}

struct Columns {
    league: Option<usize>,
    team: Option<usize>,
    pos: usize,
    name: usize,
    age: Option<usize>,
    nfl_team: Option<usize>,
    /// (season, column index)
    picks: Vec<(String, usize)>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CsvImportError> {
        let find = |label: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(label));

        let picks = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| pick_year(h).map(|year| (year, idx)))
            .collect();

        Ok(Columns {
            league: find("League Name"),
            team: find("Team Name"),
            pos: find("Pos").ok_or(CsvImportError::MissingColumn("Pos"))?,
            name: find("Name").ok_or(CsvImportError::MissingColumn("Name"))?,
            age: find("Age"),
            nfl_team: find("Team"),
            picks,
        })
    }
}

/// `"2026 Picks"` -> `"2026"`.
fn pick_year(header: &str) -> Option<String> {
    let year = header.trim().strip_suffix(PICKS_SUFFIX)?.trim();
    (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then(|| year.to_string())
}

/// A parsed `Pos` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ranked(Group, Option<u32>),
    Taxi,
}

fn parse_slot(raw: &str) -> Option<Slot> {
    let label = raw.trim().to_ascii_uppercase();
    if label == "TX" {
        return Some(Slot::Taxi);
    }
    let split = label.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = label.split_at(split);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let group = Group::from_position(prefix)?;
    let order = digits.parse::<u32>().ok().filter(|o| *o > 0);
    Some(Slot::Ranked(group, order))
}

/// Split a picks cell on `, ; / |`.
fn split_picks(cell: &str) -> impl Iterator<Item = String> + '_ {
    cell.split([',', ';', '/', '|'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Lowercase, alphanumerics kept, everything else collapsed to `-`.
fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn is_placeholder(value: &str, placeholder: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(placeholder)
}

/// Parse a depth chart CSV into a single team.
pub fn parse_depth_chart<R: Read>(rdr: R) -> Result<Team, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let cols = Columns::from_headers(reader.headers()?)?;

    let cell = |record: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i)).unwrap_or_default().trim().to_string()
    };

    let mut league_name: Option<String> = None;
    let mut team_name: Option<String> = None;
    let mut picks_by_year: BTreeMap<String, Vec<String>> =
        cols.picks.iter().map(|(y, _)| (y.clone(), Vec::new())).collect();
    let mut players: Vec<Player> = Vec::new();
    let mut taxi_counter = 0;
    let mut used_orders: HashSet<(Group, u32)> = HashSet::new();
    let mut id_counts: HashMap<String, u32> = HashMap::new();

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed CSV row {}: {}", line + 2, e);
                continue;
            }
        };

        // Picks count on every row, player or not.
        for (year, idx) in &cols.picks {
            let raw = cell(&record, Some(*idx));
            if let Some(list) = picks_by_year.get_mut(year) {
                list.extend(split_picks(&raw));
            }
        }

        let league = cell(&record, cols.league);
        if league_name.is_none() && !is_placeholder(&league, LEAGUE_PLACEHOLDER) {
            league_name = Some(league);
        }
        let team = cell(&record, cols.team);
        if team_name.is_none() && !is_placeholder(&team, TEAM_PLACEHOLDER) {
            team_name = Some(team);
        }

        let Some(slot) = parse_slot(&cell(&record, Some(cols.pos))) else {
            continue;
        };
        let name = cell(&record, Some(cols.name));
        if name.is_empty() {
            continue;
        }

        let (group, order) = match slot {
            Slot::Taxi => {
                taxi_counter += 1;
                (Group::Taxi, Some(taxi_counter))
            }
            Slot::Ranked(group, Some(order)) if !used_orders.insert((group, order)) => {
                warn!("slot {}{} is used twice, leaving {} unranked", group, order, name);
                (group, None)
            }
            Slot::Ranked(group, order) => (group, order),
        };

        let base_id = format!("csv-player:{}", slug(&name));
        let seen = id_counts.entry(base_id.clone()).or_insert(0);
        *seen += 1;
        let id = if *seen == 1 { base_id } else { format!("{base_id}-{seen}") };

        players.push(Player {
            id,
            name,
            age: cell(&record, cols.age),
            nfl_team: cell(&record, cols.nfl_team),
            group,
            order,
            injured: false,
        });
    }

    players.sort_by(|a, b| {
        a.group
            .sort_order()
            .cmp(&b.group.sort_order())
            .then_with(|| rank_cmp(a.order, b.order))
    });

    let league_name = league_name.unwrap_or_else(|| LEAGUE_PLACEHOLDER.to_string());
    let team_name = team_name.unwrap_or_else(|| TEAM_PLACEHOLDER.to_string());
    let mut team = Team::new(
        format!("csv:{}:{}", slug(&league_name), slug(&team_name)),
        league_name,
        team_name,
    );
    team.players = players;
    team.picks_by_year = picks_by_year;
    Ok(team)
}

/// Parse a depth chart CSV file.
pub fn load_depth_chart(path: &Path) -> Result<Team, CsvImportError> {
    let file = std::fs::File::open(path).map_err(|e| CsvImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_depth_chart(file)
}

/// Blank template: header, a hint row showing where league and team names
/// go, then empty slots for every position.
pub fn template_csv(years: &[String]) -> Result<String, CsvImportError> {
    let mut header = vec!["League Name".to_string(), "Team Name".to_string()];
    header.extend(["Pos", "Name", "Age", "Team"].map(String::from));
    header.extend(years.iter().map(|y| format!("{y}{PICKS_SUFFIX}")));

    let blanks = vec![""; 3 + years.len()];
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&header)?;

    let mut hint = vec![LEAGUE_PLACEHOLDER, TEAM_PLACEHOLDER, "QB1"];
    hint.extend(&blanks);
    writer.write_record(&hint)?;

    for (prefix, count) in TEMPLATE_SLOTS {
        for i in 1..=count {
            let slot = format!("{prefix}{i}");
            let mut row = vec!["", "", slot.as_str()];
            row.extend(&blanks);
            writer.write_record(&row)?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| CsvImportError::Write(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| CsvImportError::Write(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// A CSV file as a team source.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TeamSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch_teams(&self) -> Result<Vec<Team>, SourceError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            SourceError::Import(format!("failed to read file {}: {}", self.path.display(), e))
        })?;
        let team = parse_depth_chart(bytes.as_slice()).map_err(|e| SourceError::Import(e.to_string()))?;
        info!(
            "imported {} players for {} from {}",
            team.players.len(),
            team.name,
            self.path.display()
        );
        Ok(vec![team])
    }
}
