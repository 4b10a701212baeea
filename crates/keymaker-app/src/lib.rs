//! Keymaker headless driver
//!
//! Loads an engine configuration, replays a scripted input session through
//! every engine component and reports the signals they produced.

mod error;
mod script;
mod session;

pub use error::{AppError, AppResult};
pub use script::{FRAME_MS, Script, Step};
pub use session::{KEY_ID, LOCK_ID, Session, SessionReport, run};

use clap::Parser;
use keymaker_core::{CompletionFlag, EngineConfig, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command line options.
#[derive(Debug, Clone, Default, PartialEq, Parser)]
#[command(name = "keymaker")]
#[command(about = "Replay a scripted session through the Keymaker engine")]
pub struct Options {
    /// Engine configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input script file (JSON); the built-in demo runs when omitted
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Keep the completion flag in the platform store instead of memory
    #[arg(long)]
    pub persist: bool,
}

fn read(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config(path: Option<&Path>) -> AppResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&read(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

pub fn load_script(path: Option<&Path>) -> AppResult<Script> {
    match path {
        Some(path) => Script::from_json(&read(path)?),
        None => Ok(Script::demo()),
    }
}

/// Run the driver and return the report as pretty JSON.
pub fn execute(options: &Options) -> AppResult<String> {
    let config = load_config(options.config.as_deref())?;
    let script = load_script(options.script.as_deref())?;
    let flag = if options.persist {
        CompletionFlag::platform()
    } else {
        CompletionFlag::new(Arc::new(MemoryStore::new()))
    };

    let report = run(&config, &script, flag);
    serde_json::to_string_pretty(&report).map_err(AppError::Report)
}
