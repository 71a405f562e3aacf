// Command dispatch and the interactive event loop.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use depthchart_core::model::{Group, Team};
use depthchart_core::source::{SourceError, TeamSource};
use depthchart_sources::csv_import::template_csv;
use depthchart_sources::CsvSource;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::render;
use crate::session::{FetchOutcome, Session, Tab};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Everything the user can ask for, from the command line or the shell.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Connect to Sleeper as USERNAME and load its leagues
    Connect { username: String },
    /// Forget the Sleeper username; local ordering is kept
    Disconnect,
    /// Reload leagues for the connected username
    Refresh,
    /// Load a depth chart from a CSV file
    Import { file: PathBuf },
    /// Write the blank CSV template to FILE, or print it
    Template { file: Option<PathBuf> },
    /// List loaded teams
    Teams,
    /// Show a team's summary and one tab (QB, RB, WR, TE, DEF, TAXI, PICKS, ROSTER)
    Show {
        #[arg(long)]
        team: Option<String>,
        #[arg(long = "group", value_parser = parse_tab)]
        tab: Option<Tab>,
    },
    /// Show a team's draft picks
    Picks {
        #[arg(long)]
        team: Option<String>,
    },
    /// Set the order of a group by listing every player id in it
    Reorder {
        team: String,
        #[arg(value_parser = parse_group)]
        group: Group,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Toggle a player's injured flag
    Injured { team: String, player: String },
    /// Mark where the bench starts in a group; omit INDEX to clear
    Bench {
        team: String,
        #[arg(value_parser = parse_group)]
        group: Group,
        index: Option<u32>,
    },
    /// Interactive shell
    Shell,
    #[command(hide = true, alias = "exit")]
    Quit,
}

fn parse_tab(s: &str) -> Result<Tab, String> {
    Tab::parse(s).ok_or_else(|| format!("unknown tab `{s}`"))
}

fn parse_group(s: &str) -> Result<Group, String> {
    Group::parse(s).ok_or_else(|| format!("unknown group `{s}`"))
}

/// One line typed into the shell.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, name = "depthchart", disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// Parse a shell line. Help requests and mistakes come back as the text to
/// show the user.
pub fn parse_line(line: &str) -> Result<Command, String> {
    ShellLine::try_parse_from(line.split_whitespace())
        .map(|l| l.command)
        .map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What a command needs after its synchronous part ran.
pub enum Step {
    Done(String),
    /// Load teams from `source`; `note` is shown before the result.
    Fetch {
        source: Box<dyn TeamSource>,
        note: String,
    },
    Quit,
}

/// Run the synchronous part of `cmd` against the session.
pub fn apply(session: &mut Session, cmd: Command) -> anyhow::Result<Step> {
    match cmd {
        Command::Connect { username } => {
            let username = session.connect(&username)?;
            let source = session
                .sleeper_source()
                .context("username was not saved")?;
            Ok(Step::Fetch {
                source: Box::new(source),
                note: format!("Connected to Sleeper as {username}"),
            })
        }
        Command::Disconnect => {
            session.disconnect()?;
            Ok(Step::Done(
                "Disconnected from Sleeper (Local Order Preserved)".into(),
            ))
        }
        Command::Refresh => {
            let source = session.sleeper_source().context(
                "not connected to Sleeper; use `connect <username>` or `import <file>`",
            )?;
            let note = format!("Refreshing leagues for {}", source.username());
            Ok(Step::Fetch {
                source: Box::new(source),
                note,
            })
        }
        Command::Import { file } => Ok(Step::Fetch {
            note: format!("Importing {}", file.display()),
            source: Box::new(CsvSource::new(file)),
        }),
        Command::Template { file } => {
            let csv = template_csv(&session.options().pick_years)?;
            match file {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    Ok(Step::Done(format!("Template written to {}", path.display())))
                }
                None => Ok(Step::Done(csv)),
            }
        }
        Command::Teams => {
            let active = session.active_team().map(|t| t.id.clone());
            Ok(Step::Done(render::team_list(
                session.book().teams(),
                active.as_deref(),
            )))
        }
        Command::Show { team, tab } => {
            if let Some(id) = team {
                session.select_team(&id)?;
            }
            if let Some(tab) = tab {
                session.select_tab(tab)?;
            }
            let team = session.active_team().context("no teams loaded")?;
            let tab = session.active_tab();
            let bench = session.book().bench_starts(&team.id);
            Ok(Step::Done(format!(
                "{}\n[{}]\n{}",
                render::summary(team),
                tab,
                render::tab_view(team, tab, &bench)
            )))
        }
        Command::Picks { team } => {
            let team = resolve_team(session, team.as_deref())?;
            Ok(Step::Done(render::picks_view(team)))
        }
        Command::Reorder { team, group, ids } => {
            session.book_mut().reorder_group_by_ids(&team, group, &ids)?;
            let bench = session.book().bench_start(&team, group);
            let team = resolve_team(session, Some(team.as_str()))?;
            Ok(Step::Done(format!(
                "{} Order Saved\n{}",
                group,
                render::group_view(team, group, bench)
            )))
        }
        Command::Injured { team, player } => {
            let injured = session.book_mut().toggle_injured(&team, &player)?;
            Ok(Step::Done(
                if injured { "Marked Injured" } else { "Marked Healthy" }.into(),
            ))
        }
        Command::Bench { team, group, index } => {
            session.book_mut().set_bench_start(&team, group, index)?;
            let team = resolve_team(session, Some(team.as_str()))?;
            let note = match index {
                Some(i) => format!("{group} bench starts at {i}"),
                None => format!("{group} bench split cleared"),
            };
            Ok(Step::Done(format!(
                "{note}\n{}",
                render::group_view(team, group, index)
            )))
        }
        Command::Shell => Ok(Step::Done("Already in the shell.".into())),
        Command::Quit => Ok(Step::Quit),
    }
}

fn resolve_team<'a>(session: &'a Session, team_id: Option<&str>) -> anyhow::Result<&'a Team> {
    match team_id {
        Some(id) => session
            .book()
            .team(id)
            .with_context(|| format!("unknown team {id}")),
        None => session.active_team().context("no teams loaded"),
    }
}

fn describe(session: &Session, outcome: FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Applied { teams } => {
            let mut text = format!("Loaded {teams} team(s)");
            if let Some(team) = session.active_team() {
                text.push('\n');
                text.push_str(&render::summary(team));
            }
            text
        }
        FetchOutcome::Stale => "Superseded by a newer request".into(),
    }
}

/// Run one command to completion, awaiting any fetch inline.
pub async fn execute(session: &mut Session, cmd: Command) -> anyhow::Result<String> {
    match apply(session, cmd)? {
        Step::Done(text) => Ok(text),
        Step::Quit => Ok(String::new()),
        Step::Fetch { source, note } => {
            let outcome = session.refresh(source.as_ref()).await?;
            Ok(format!("{note}\n{}", describe(session, outcome)))
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// A finished background fetch, tagged with the generation it started under.
pub struct FetchDone {
    pub generation: u64,
    pub result: Result<Vec<Team>, SourceError>,
}

fn spawn_fetch(session: &mut Session, source: Box<dyn TeamSource>, fetch_tx: mpsc::Sender<FetchDone>) {
    let generation = session.begin_fetch();
    tokio::spawn(async move {
        let result = source.fetch_teams().await;
        if fetch_tx.send(FetchDone { generation, result }).await.is_err() {
            warn!("fetch {} finished after the event loop stopped", generation);
        }
    });
}

/// Run the interactive loop.
///
/// Listens with `tokio::select!` on:
/// 1. Shell lines from `line_rx`
/// 2. Completions of fetches this loop spawned
///
/// Everything meant for the user goes through `out_tx`. Fetches run in the
/// background, so the shell stays responsive while leagues load; a
/// completion that arrives after a disconnect or a newer fetch is dropped.
pub async fn run(
    mut session: Session,
    mut line_rx: mpsc::Receiver<String>,
    out_tx: mpsc::Sender<String>,
) -> anyhow::Result<()> {
    info!("Shell event loop started");
    let (fetch_tx, mut fetch_rx) = mpsc::channel::<FetchDone>(8);

    // Pick up where the last session left off.
    if let Some(source) = session.sleeper_source() {
        let _ = out_tx
            .send(format!("Refreshing leagues for {}", source.username()))
            .await;
        spawn_fetch(&mut session, Box::new(source), fetch_tx.clone());
    }

    loop {
        tokio::select! {
            // Typed commands are handled before any completion that is
            // ready at the same time.
            biased;

            // --- Shell input ---
            line = line_rx.recv() => {
                let Some(line) = line else {
                    info!("Input closed, shutting down");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let cmd = match parse_line(&line) {
                    Ok(cmd) => cmd,
                    Err(text) => {
                        let _ = out_tx.send(text).await;
                        continue;
                    }
                };
                match apply(&mut session, cmd) {
                    Ok(Step::Done(text)) => {
                        let _ = out_tx.send(text).await;
                    }
                    Ok(Step::Fetch { source, note }) => {
                        let _ = out_tx.send(format!("{note}...")).await;
                        spawn_fetch(&mut session, source, fetch_tx.clone());
                    }
                    Ok(Step::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Err(e) => {
                        warn!("command failed: {:#}", e);
                        let _ = out_tx.send(format!("Error: {e:#}")).await;
                    }
                }
            }

            // --- Fetch completions ---
            Some(done) = fetch_rx.recv() => {
                match session.complete_fetch(done.generation, done.result) {
                    Ok(FetchOutcome::Stale) => {}
                    Ok(outcome) => {
                        let _ = out_tx.send(describe(&session, outcome)).await;
                    }
                    Err(e) => {
                        error!("fetch failed: {:#}", e);
                        let _ = out_tx.send(format!("{e}")).await;
                    }
                }
            }
        }
    }

    info!("Shell event loop exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shell_lines() {
        assert_eq!(
            parse_line("connect alice").unwrap(),
            Command::Connect {
                username: "alice".into()
            }
        );
        assert_eq!(
            parse_line("show --team T1 --group picks").unwrap(),
            Command::Show {
                team: Some("T1".into()),
                tab: Some(Tab::Picks),
            }
        );
        assert_eq!(
            parse_line("reorder T1 qb p2 p1").unwrap(),
            Command::Reorder {
                team: "T1".into(),
                group: Group::Quarterback,
                ids: vec!["p2".into(), "p1".into()],
            }
        );
        assert_eq!(
            parse_line("bench T1 RB").unwrap(),
            Command::Bench {
                team: "T1".into(),
                group: Group::RunningBack,
                index: None,
            }
        );
        assert_eq!(parse_line("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_shell_lines() {
        assert!(parse_line("reorder T1 K p1").unwrap_err().contains("unknown group"));
        assert!(parse_line("reorder T1 QB").is_err());
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("help").unwrap_err().contains("connect"));
    }
}
