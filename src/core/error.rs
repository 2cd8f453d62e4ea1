use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("{path}: {message}")]
    MalformedStimuli { path: PathBuf, message: String },

    #[error("{path}: missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{what}: expected {expected} rows, found {found}")]
    Misaligned {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("display: {0}")]
    Display(String),

    /// ESCAPE (or a window close) during any polling loop. Not a failure: the
    /// front-end maps it to the abort exit code without retrying anything.
    #[error("session aborted by operator")]
    Aborted,
}

impl ExperimentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
