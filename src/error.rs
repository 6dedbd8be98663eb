use crate::core::conflicts::Conflict;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SafenixError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration document not found at: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error at '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    StdIoError(#[from] std::io::Error),

    /// The document could not be scanned; nothing else may run against it
    #[error("Malformed document at line {line}, column {column}: {detail}")]
    MalformedDocument {
        offset: usize,
        line: usize,
        column: usize,
        detail: String,
    },

    #[error("No block to edit: {0}")]
    BlockNotFound(String),

    #[error("Unsupported edit: {0}")]
    UnsupportedEditShape(String),

    #[error("Edit blocked by {} conflict(s): {}", .0.len(), describe_conflicts(.0))]
    Conflict(Vec<Conflict>),

    /// Post-mutation balance check failed; the mutation was discarded
    #[error("Edit would produce unbalanced text at line {line}, column {column}: {detail}")]
    UnbalancedDelimiters {
        offset: usize,
        line: usize,
        column: usize,
        detail: String,
    },

    #[error("Unknown template: '{0}'")]
    UnknownTemplate(String),

    #[error("Template '{template}' requires parameter '{parameter}'")]
    MissingRequiredParameter { template: String, parameter: String },

    #[error("Template '{template}' has no parameter '{parameter}'")]
    UnknownParameter { template: String, parameter: String },

    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Template '{template}' left placeholder '@{placeholder}@' unresolved")]
    UnresolvedPlaceholder {
        template: String,
        placeholder: String,
    },

    /// Another process holds the document lock
    #[error("Another {} process is editing {}.\nLock file: {}", crate::project_identity::BINARY_NAME, .target.display(), .lock_path.display())]
    LockContention { target: PathBuf, lock_path: PathBuf },

    #[error("Operation interrupted by user")]
    Interrupted,

    #[error("KDL parse error: {0}")]
    KdlError(#[from] kdl::KdlError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    YamlError(#[from] serde_yml::Error),

    /// Backup operation error
    #[error("Backup operation failed: {0}")]
    BackupError(String),

    /// Path resolution or validation error
    #[error("Path error: {0}")]
    PathError(String),

    #[error("{0}")]
    Other(String),
}

impl SafenixError {
    /// Errors that leave the document untouched and can be retried after the
    /// caller changes its request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SafenixError::Conflict(_) | SafenixError::LockContention { .. })
    }
}

fn describe_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SafenixError>;
