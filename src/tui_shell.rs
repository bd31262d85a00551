//! Editable-table terminal UI over the sync engine.

use anyhow::Result;

mod app;
mod input;
mod render;

use crate::sync::SyncEngine;

/// Run the editor until the user quits. `fetch_err` carries a failed bulk
/// read; the table starts empty and the error is shown in the status line.
pub fn run(engine: SyncEngine, fetch_err: Option<String>) -> Result<()> {
    app::run(engine, fetch_err)
}
