//! Reference record store for caseboard.
//!
//! In-memory collection of test cases hydrated from a JSON file on disk and
//! persisted atomically after every mutation, so a dev server survives
//! restarts. No auth surface.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use clap::Parser;
use tokio::sync::RwLock;

use caseboard::model::{RecordId, TestCase, TestCaseUpdate};

#[derive(Parser, Debug)]
#[command(name = "caseboard-server")]
#[command(about = "Reference test case store", long_about = None)]
struct Args {
    /// Listen address (use port 0 for an ephemeral port)
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// Write the bound address to this file once listening
    #[arg(long)]
    addr_file: Option<PathBuf>,

    /// Directory holding testcases.json
    #[arg(long, default_value = "./caseboard-data")]
    data_dir: PathBuf,

    /// JSON file of test cases to seed an empty store with
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    data_dir: PathBuf,
    cases: Arc<RwLock<Vec<TestCase>>>,
}

fn store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("testcases.json")
}

fn load_cases_from_disk(data_dir: &Path) -> Result<Vec<TestCase>> {
    let path = store_path(data_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(&path).context("read testcases.json")?;
    let cases: Vec<TestCase> = serde_json::from_slice(&bytes).context("parse testcases.json")?;
    Ok(cases)
}

fn persist_cases(data_dir: &Path, cases: &[TestCase]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(cases).context("serialize test cases")?;
    write_atomic(&store_path(data_dir), &bytes).context("write testcases.json")?;
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("create parent directories")?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    std::fs::write(&tmp, bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caseboard_server=info".into()),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("create data dir {}", args.data_dir.display()))?;

    let mut cases = load_cases_from_disk(&args.data_dir).context("load test cases")?;

    if cases.is_empty()
        && let Some(seed) = &args.seed
    {
        let bytes = std::fs::read(seed)
            .with_context(|| format!("read seed file {}", seed.display()))?;
        cases = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse seed file {}", seed.display()))?;
        persist_cases(&args.data_dir, &cases).context("persist seeded test cases")?;
    }

    let state = AppState {
        data_dir: args.data_dir,
        cases: Arc::new(RwLock::new(cases)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/testcases", get(list_cases).post(create_case))
        .route("/testcases/:id", put(update_case))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;

    let local_addr = listener.local_addr().context("read listener local addr")?;
    eprintln!("caseboard-server listening on {}", local_addr);

    if let Some(addr_file) = &args.addr_file {
        std::fs::write(addr_file, local_addr.to_string())
            .with_context(|| format!("write addr file {}", addr_file.display()))?;
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_cases(State(state): State<AppState>) -> Json<Vec<TestCase>> {
    let cases = state.cases.read().await;
    Json(cases.clone())
}

async fn create_case(
    State(state): State<AppState>,
    Json(body): Json<TestCaseUpdate>,
) -> Response {
    let mut cases = state.cases.write().await;

    // Store-assigned numeric-string ids, one past the largest existing.
    let next_id = cases
        .iter()
        .filter_map(|c| c.id.as_str().parse::<u64>().ok())
        .max()
        .map_or(1, |n| n + 1);

    let case = TestCase {
        id: RecordId(next_id.to_string()),
        test_case_name: body.test_case_name,
        description: body.description,
        status: body.status,
        estimate_time: body.estimate_time,
        module: body.module,
        priority: body.priority,
        last_updated: body.last_updated,
    };
    cases.push(case.clone());

    if let Err(err) = persist_cases(&state.data_dir, &cases) {
        return internal_error(err);
    }
    (StatusCode::CREATED, Json(case)).into_response()
}

async fn update_case(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<TestCaseUpdate>,
) -> Response {
    let mut cases = state.cases.write().await;

    let Some(case) = cases.iter_mut().find(|c| c.id.as_str() == id) else {
        return not_found();
    };

    case.test_case_name = body.test_case_name;
    case.description = body.description;
    case.status = body.status;
    case.estimate_time = body.estimate_time;
    case.module = body.module;
    case.priority = body.priority;
    case.last_updated = body.last_updated;
    let updated = case.clone();

    if let Err(err) = persist_cases(&state.data_dir, &cases) {
        return internal_error(err);
    }
    Json(updated).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "test case not found"})),
    )
        .into_response()
}

fn internal_error(err: anyhow::Error) -> Response {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": err.to_string()})),
    )
        .into_response()
}
