/*============================================================
  Project: copr-mirror
  Module: copr_mirror::error
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Centralise copr-mirror error types to provide consistent
    diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts never include copr-cli credentials; only
    command lines, URLs and paths are exposed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate fatal failures and
    consolidate exit codes for the binary entry point. Build
    failures reported by copr-cli are not errors; the driver
    records them and maps them to exit status 1.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Established shared error definitions.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - Stable exit codes for schedulers
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for copr-mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Enumerates high-level error domains surfaced by copr-mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Malformed verrel `{raw}`: {reason}")]
    Parse { raw: String, reason: String },
    #[error("Source artifact {url} is not reachable: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Copr: {0}")]
    Hosting(String),
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Interrupted before any build was submitted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MirrorError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }

    fn status(&self) -> u8 {
        match self {
            MirrorError::CommandMissing { .. } => 10,
            MirrorError::CommandFailure { .. } => 11,
            MirrorError::Parse { .. } => 20,
            MirrorError::Config(_) => 21,
            MirrorError::Fetch { .. } => 30,
            MirrorError::Hosting(_) => 31,
            MirrorError::Network(_) => 32,
            MirrorError::Serialization(_) => 33,
            MirrorError::Filesystem(_) => 40,
            MirrorError::Io(_) => 41,
            MirrorError::Interrupted => 130,
        }
    }

    pub(crate) fn parse(raw: &str, reason: impl Into<String>) -> Self {
        MirrorError::Parse {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}
