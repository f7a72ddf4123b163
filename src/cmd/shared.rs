/*!
shared.rs - shared helpers for subcommands.

Focus:
  - Session: options + catalog resolved from the global flags
  - load_session: read both files (JSON or YAML), falling back to defaults
  - block_on: run one async operation on a fresh Tokio runtime
  - error_json: machine-readable failure payload for `--json` paths
*/

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use termroute::catalog::InMemoryCatalog;
use termroute::config::TerminalOptions;
use termroute::error::TermError;
use termroute::parse::CommandParser;

/* ---- Session ---- */

/// Everything a subcommand needs: effective options and the command catalog.
#[derive(Debug, Clone)]
pub struct Session {
    pub options: TerminalOptions,
    pub catalog: Arc<InMemoryCatalog>,
    pub catalog_path: Option<PathBuf>,
}

impl Session {
    pub fn parser(&self) -> CommandParser {
        CommandParser::new(&self.options, self.catalog.clone())
    }
}

/// Load options (defaults when `config` is absent) and the catalog (empty
/// when `catalog` is absent).
pub fn load_session(config: Option<&Path>, catalog: Option<&Path>) -> Result<Session> {
    let options = match config {
        Some(path) => TerminalOptions::load(path)
            .with_context(|| format!("Failed to load options: {}", path.display()))?,
        None => TerminalOptions::default(),
    };
    options.validate().context("Invalid options")?;

    let commands = match catalog {
        Some(path) => InMemoryCatalog::load(path, options.text_handler())
            .with_context(|| format!("Failed to load catalog: {}", path.display()))?,
        None => InMemoryCatalog::new(Vec::new(), options.text_handler())?,
    };
    debug!(commands = commands.len(), "session loaded");

    Ok(Session {
        options,
        catalog: Arc::new(commands),
        catalog_path: catalog.map(Path::to_path_buf),
    })
}

/* ---- Runtime ---- */

/// Create a Tokio runtime and drive `fut` to completion.
pub fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    Ok(rt.block_on(fut))
}

/* ---- Output ---- */

/// `{"status":"error", ...}`; core errors also carry their `code`.
pub fn error_json(err: &anyhow::Error) -> serde_json::Value {
    match err.downcast_ref::<TermError>() {
        Some(term) => term.to_json(),
        None => serde_json::json!({ "status": "error", "error": format!("{err:#}") }),
    }
}

/// Print the JSON failure payload when `json` is set, then hand the error back
/// so the process exits non-zero.
pub fn fail<T>(err: anyhow::Error, json: bool) -> Result<T> {
    if json {
        println!("{}", error_json(&err));
    }
    Err(err)
}
