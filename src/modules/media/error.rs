//! Failure taxonomy for media jobs.

use std::fmt;

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by an object storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("upload failed for {key}: {message}")]
    UploadFailed { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn upload_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UploadFailed {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the external probe/encoder tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {exit_code:?}: {stderr}")]
    Exit {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("unreadable output from {tool}: {output:?}")]
    Output { tool: String, output: String },
}

/// Stable classification used in logs and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceNotFound,
    InvalidDuration,
    ToolFailed,
    EmptyOutput,
    Cancelled,
    Storage,
    Publish,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceNotFound => "source_not_found",
            ErrorKind::InvalidDuration => "invalid_duration",
            ErrorKind::ToolFailed => "tool_failed",
            ErrorKind::EmptyOutput => "empty_output",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Storage => "storage",
            ErrorKind::Publish => "publish",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source object {key} is missing or empty")]
    SourceNotFound { key: String },

    #[error("invalid duration: {reason}")]
    InvalidDuration { reason: String },

    #[error("{tool} failed with exit code {exit_code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("encoder produced no output in {dir}")]
    EmptyOutput { dir: String },

    #[error("job cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to publish completion event: {0}")]
    Publish(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::SourceNotFound { .. } => ErrorKind::SourceNotFound,
            PipelineError::InvalidDuration { .. } => ErrorKind::InvalidDuration,
            PipelineError::ToolFailed { .. } => ErrorKind::ToolFailed,
            PipelineError::EmptyOutput { .. } => ErrorKind::EmptyOutput,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::Storage(_) => ErrorKind::Storage,
            PipelineError::Publish(_) => ErrorKind::Publish,
            PipelineError::Io(_) => ErrorKind::Io,
        }
    }

    /// Transient failures may succeed on redelivery; the rest never will.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Storage(StorageError::NotFound { .. }) => false,
            PipelineError::Storage(_) | PipelineError::Publish(_) | PipelineError::Io(_) => true,
            _ => false,
        }
    }
}

impl From<ToolError> for PipelineError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Spawn { tool, source } => PipelineError::ToolFailed {
                tool,
                exit_code: None,
                stderr: source.to_string(),
            },
            ToolError::Exit {
                tool,
                exit_code,
                stderr,
            } => PipelineError::ToolFailed {
                tool,
                exit_code,
                stderr,
            },
            ToolError::Output { tool, output } => PipelineError::ToolFailed {
                tool,
                exit_code: None,
                stderr: format!("unreadable output: {output:?}"),
            },
        }
    }
}

/// A failed job, always tagged with the source object it was processing.
#[derive(Debug, Error)]
#[error("processing {file_key} failed ({}): {source}", .source.kind())]
pub struct JobError {
    pub file_key: String,
    #[source]
    pub source: PipelineError,
}

impl JobError {
    pub fn new(file_key: impl Into<String>, source: PipelineError) -> Self {
        Self {
            file_key: file_key.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}
