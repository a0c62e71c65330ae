use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CovidError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid freshness policy: {0} (expected \"window\", \"calendar-day\" or {{\"window_hours\": N}})")]
    InvalidFreshness(String),

    #[error("invalid start date: {0} (expected YYYY-MM-DD)")]
    InvalidStartDate(String),

    #[error("download failed: {0}")]
    Http(String),

    #[error("server returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("country \"{country}\" or state \"{state}\" not found in file {file}")]
    #[diagnostic(help("run with --list to see every available state and country"))]
    RegionNotFound {
        state: String,
        country: String,
        file: String,
    },

    #[error("no column for start date {date} in {file}")]
    MissingStartDate { date: String, file: String },

    #[error("malformed row at {file}:{line}: expected at least {expected} columns, found {found}")]
    MalformedRow {
        file: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("invalid value {value:?} at {file}:{line}, column {column}")]
    InvalidValue {
        file: String,
        line: u64,
        column: usize,
        value: String,
    },

    #[error("failed to read CSV {file}: {message}")]
    Csv { file: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to render chart: {0}")]
    Render(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("chart viewer failed: {0}")]
    Viewer(String),
}
