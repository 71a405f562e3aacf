// End-to-end tests for command dispatch and the shell event loop, driven
// through CSV imports so no network is needed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use depthchart_app::app::{self, parse_line, Command};
use depthchart_app::session::{Session, USERNAME_KEY};
use depthchart_core::model::Group;
use depthchart_core::store::{MemoryStore, SharedStore, SqliteStore};
use depthchart_sources::SleeperOptions;
use tokio::sync::mpsc;

const CSV: &str = "\
League Name,Team Name,Pos,Name,Age,Team,2026 Picks
Dynasty Bros,Sharks,QB1,Josh Allen,29,BUF,1.03
,,QB2,Jalen Hurts,27,PHI,2nd
,,QB3,Bo Nix,25,DEN,
,,RB1,Bijan Robinson,23,ATL,
,,TX,Rookie Guy,21,NYJ,
";

fn write_csv(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("depthchart_app_{name}_{}.csv", std::process::id()));
    std::fs::write(&path, CSV).unwrap();
    path
}

fn options() -> SleeperOptions {
    SleeperOptions {
        base_url: "http://127.0.0.1:9".into(),
        season: "2026".into(),
        pick_years: vec!["2026".into(), "2027".into()],
        ..SleeperOptions::default()
    }
}

fn cmd(line: &str) -> Command {
    parse_line(line).unwrap()
}

const TEAM: &str = "csv:dynasty-bros:sharks";

fn qb_ids(session: &Session) -> Vec<String> {
    session
        .book()
        .team(TEAM)
        .unwrap()
        .players_in_group(Group::Quarterback)
        .into_iter()
        .map(|p| p.id.clone())
        .collect()
}

#[tokio::test]
async fn import_reorder_and_reopen() {
    let path = write_csv("reopen");
    let db = std::env::temp_dir().join(format!("depthchart_app_reopen_{}.db", std::process::id()));
    let _ = std::fs::remove_file(&db);
    let store: SharedStore = Arc::new(SqliteStore::open(&db.to_string_lossy()).unwrap());

    let mut session = Session::open(store.clone(), options());
    let out = app::execute(&mut session, Command::Import { file: path.clone() })
        .await
        .unwrap();
    assert!(out.contains("Loaded 1 team(s)"));
    assert!(out.contains("Dynasty Bros — Sharks"));

    let team = session.book().team(TEAM).unwrap();
    assert_eq!(team.picks_by_year["2026"], vec!["1.03", "2nd"]);
    assert!(team.picks_by_year["2027"].is_empty());

    let out = app::execute(
        &mut session,
        cmd(&format!(
            "reorder {TEAM} QB csv-player:bo-nix csv-player:josh-allen csv-player:jalen-hurts"
        )),
    )
    .await
    .unwrap();
    assert!(out.starts_with("QB Order Saved"));

    let out = app::execute(&mut session, cmd(&format!("injured {TEAM} csv-player:jalen-hurts")))
        .await
        .unwrap();
    assert_eq!(out, "Marked Injured");

    drop(session);
    let reopened = Session::open(store, options());
    assert_eq!(
        qb_ids(&reopened),
        vec!["csv-player:bo-nix", "csv-player:josh-allen", "csv-player:jalen-hurts"]
    );
    assert!(reopened.book().team(TEAM).unwrap().player("csv-player:jalen-hurts").unwrap().injured);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&db);
}

#[tokio::test]
async fn disconnect_keeps_local_order() {
    let path = write_csv("disconnect");
    let store = MemoryStore::shared();
    let mut session = Session::open(store.clone(), options());
    store.set(USERNAME_KEY, "alice").unwrap();

    app::execute(&mut session, Command::Import { file: path.clone() })
        .await
        .unwrap();
    app::execute(
        &mut session,
        cmd(&format!(
            "reorder {TEAM} QB csv-player:jalen-hurts csv-player:bo-nix csv-player:josh-allen"
        )),
    )
    .await
    .unwrap();

    let out = app::execute(&mut session, Command::Disconnect).await.unwrap();
    assert_eq!(out, "Disconnected from Sleeper (Local Order Preserved)");
    assert!(session.book().teams().is_empty());
    assert_eq!(session.username(), None);
    assert!(app::execute(&mut session, Command::Refresh).await.is_err());

    app::execute(&mut session, Command::Import { file: path.clone() })
        .await
        .unwrap();
    assert_eq!(
        qb_ids(&session),
        vec!["csv-player:jalen-hurts", "csv-player:bo-nix", "csv-player:josh-allen"]
    );

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn show_bench_and_picks() {
    let path = write_csv("show");
    let mut session = Session::open(MemoryStore::shared(), options());
    app::execute(&mut session, Command::Import { file: path.clone() })
        .await
        .unwrap();

    let out = app::execute(&mut session, cmd(&format!("bench {TEAM} QB 2")))
        .await
        .unwrap();
    assert!(out.starts_with("QB bench starts at 2"));

    let out = app::execute(&mut session, cmd("show --group qb")).await.unwrap();
    assert!(out.contains("[QB]"));
    let lines: Vec<&str> = out.lines().collect();
    let divider = lines.iter().position(|l| l.contains("Bench")).unwrap();
    assert!(lines[divider - 1].contains("Jalen Hurts"));
    assert!(lines[divider + 1].contains("Bo Nix"));

    assert!(app::execute(&mut session, cmd(&format!("bench {TEAM} TAXI 0")))
        .await
        .is_err());

    let out = app::execute(&mut session, cmd("picks")).await.unwrap();
    assert_eq!(out, "2026 Picks\n  • 1.03\n  • 2nd\n2027 Picks\n  —\n");

    // The last shown tab is remembered.
    let out = app::execute(&mut session, cmd("show")).await.unwrap();
    assert!(out.contains("[QB]"));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn template_command_writes_file() {
    let path = std::env::temp_dir().join(format!("depthchart_app_template_{}.csv", std::process::id()));
    let mut session = Session::open(MemoryStore::shared(), options());

    let out = app::execute(&mut session, Command::Template { file: Some(path.clone()) })
        .await
        .unwrap();
    assert!(out.starts_with("Template written to"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("League Name,Team Name,Pos,Name,Age,Team,2026 Picks,2027 Picks"));

    let _ = std::fs::remove_file(&path);
}

async fn recv(out_rx: &mut mpsc::Receiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
        .await
        .expect("timed out waiting for output")
        .expect("output channel closed")
}

#[tokio::test]
async fn shell_loop_runs_fetches_in_background() {
    let path = write_csv("shell");
    let session = Session::open(MemoryStore::shared(), options());
    let (line_tx, line_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    let handle = tokio::spawn(app::run(session, line_rx, out_tx));

    line_tx.send(format!("import {}", path.display())).await.unwrap();
    assert!(recv(&mut out_rx).await.starts_with("Importing"));
    assert!(recv(&mut out_rx).await.starts_with("Loaded 1 team(s)"));

    line_tx.send("teams".to_string()).await.unwrap();
    assert_eq!(recv(&mut out_rx).await, format!("* {TEAM}  Dynasty Bros — Sharks\n"));

    line_tx.send("reorder nope QB a".to_string()).await.unwrap();
    assert!(recv(&mut out_rx).await.starts_with("Error: unknown team"));

    line_tx.send("quit".to_string()).await.unwrap();
    handle.await.unwrap().unwrap();

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn shell_drops_fetch_that_finishes_after_disconnect() {
    let path = write_csv("stale");
    let session = Session::open(MemoryStore::shared(), options());
    let (line_tx, line_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    let handle = tokio::spawn(app::run(session, line_rx, out_tx));

    // Both lines are queued before the loop sees either, so the import's
    // completion can only arrive after the disconnect bumped the generation.
    line_tx.send(format!("import {}", path.display())).await.unwrap();
    line_tx.send("disconnect".to_string()).await.unwrap();
    line_tx.send("teams".to_string()).await.unwrap();

    assert!(recv(&mut out_rx).await.starts_with("Importing"));
    assert_eq!(
        recv(&mut out_rx).await,
        "Disconnected from Sleeper (Local Order Preserved)"
    );
    assert_eq!(recv(&mut out_rx).await, "No teams loaded.\n");

    line_tx.send("quit".to_string()).await.unwrap();
    handle.await.unwrap().unwrap();

    let _ = std::fs::remove_file(&path);
}
