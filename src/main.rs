use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use caseboard::remote::StoreClient;
use caseboard::sync::{SyncEngine, SyncOptions};

#[derive(Parser)]
#[command(name = "caseboard")]
#[command(about = "Inline test case editor with debounced write-back", long_about = None)]
struct Cli {
    /// Base URL of the record store
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Quiescence period before an edit is written back, in milliseconds
    #[arg(long, default_value_t = 1000)]
    debounce_ms: u64,
}

fn main() {
    // Quiet by default; RUST_LOG opens it up. Log lines share the terminal
    // with the TUI, so only errors are worth the noise unasked.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "error".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;

    // Engine construction captures the runtime handle, so edits applied from
    // the UI thread can still arm timers on it.
    let (engine, fetch_err) = runtime.block_on(async {
        let store = Arc::new(StoreClient::new(&cli.url)?);
        let engine = SyncEngine::new(
            store,
            SyncOptions {
                debounce: Duration::from_millis(cli.debounce_ms),
            },
        );

        // A failed bulk read is reported, not retried: the editor opens
        // with an empty table.
        let fetch_err = engine.load().await.err().map(|err| format!("{:#}", err));
        anyhow::Ok((engine, fetch_err))
    })?;

    caseboard::tui_shell::run(engine, fetch_err)
}
