//! Error and diagnostic types for the join pipeline.
//!
//! Fatal problems abort the whole run as a [`JoinError`]. Recoverable problems
//! are collected as [`Diagnostic`]s and reported alongside the run summary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const DIAG_PATTERN_MISMATCH: &str = "PATTERN_MISMATCH";
pub const DIAG_CYCLE_DETECTED: &str = "CYCLE_DETECTED";

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

pub type JoinResult<T> = Result<T, JoinError>;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unable to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("circular internal dependency: {}", format_chain(chain))]
    CycleDetected { chain: Vec<PathBuf> },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl JoinError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        JoinError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// A non-fatal finding; processing continues after one is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub file: String,
}

impl Diagnostic {
    pub fn new(code: &str, message: &str, file: &Path) -> Self {
        Diagnostic {
            code: code.to_string(),
            message: message.to_string(),
            file: file.display().to_string(),
        }
    }
}
