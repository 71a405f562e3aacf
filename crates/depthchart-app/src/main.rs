// depthchart entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Load config (writing the default file on first run)
// 3. Initialize tracing (log to file, not terminal)
// 4. Open the key-value store and the session
// 5. Run one command, or the interactive shell
//    (stdin thread -> app loop -> printer task)

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use depthchart_app::app::{self, Command};
use depthchart_app::config::{self, Config};
use depthchart_app::session::Session;
use depthchart_core::store::SqliteStore;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "depthchart", about = "Fantasy football depth chart organizer")]
struct Args {
    /// Directory holding `config/` (defaults to the current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse arguments
    let args = Args::parse();

    // 2. Load config
    let config = match &args.base_dir {
        Some(base) => {
            config::ensure_config_file(base).context("failed to initialize configuration")?;
            config::load_config_from(base)
        }
        None => config::load_config(),
    }
    .context("failed to load configuration")?;

    // 3. Initialize tracing
    init_tracing(&config)?;
    info!("depthchart starting up");

    // 4. Open storage
    let db_path = config.db_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let store = SqliteStore::open(&db_path.to_string_lossy())
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    info!("Database opened at {}", db_path.display());

    let mut session = Session::open(Arc::new(store), config.sleeper_options());

    // 5. Dispatch
    match args.command {
        Command::Shell => run_shell(session).await?,
        cmd => {
            let output = app::execute(&mut session, cmd).await?;
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
        }
    }

    info!("depthchart shut down cleanly");
    Ok(())
}

async fn run_shell(session: Session) -> anyhow::Result<()> {
    let (line_tx, line_rx) = mpsc::channel::<String>(64);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    // Plain thread: a blocked stdin read must not keep the runtime alive
    // after `quit`.
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            println!("{}", text.trim_end());
        }
    });

    println!("depthchart shell. Type `help` for commands, `quit` to leave.");
    let result = app::run(session, line_rx, out_tx).await;

    // The loop dropped its sender, so the printer drains and stops.
    let _ = printer.await;
    result
}

/// Initialize tracing to log to a file under the configured directory.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join(&config.logging.dir);
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("depthchart.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
