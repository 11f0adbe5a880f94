//! Error type shared by every stage of a sync run.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration file {} not found", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Invalid configuration in {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Unknown time zone {0:?}")]
    UnknownTimeZone(String),

    #[error("{command} failed with {status}: {stderr}")]
    ExternalTool {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Cannot create Toggl entry ({status}): {body}")]
    Upload { status: u16, body: String },

    #[error("Checkpoint {} contains an invalid timestamp {value:?}", path.display())]
    CorruptCheckpoint { path: PathBuf, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
