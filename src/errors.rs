// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only configuration loading and registry bookkeeping surface these errors
//! to callers. Everything that goes wrong inside a job worker is folded into
//! the job's own state (`status = failed` plus an error line in its output).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output stream error: {0}")]
    Stream(String),

    #[error("job already registered: {0}")]
    DuplicateJob(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobError>;
