use std::fmt;
use std::path::PathBuf;

use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    Cache,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Cache => write!(f, "cache error"),
        }
    }
}

/// Everything that can abort a pipeline run. There is no partial success.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("No articles downloaded; please check {source_url}")]
    EmptyContent { source_url: String },
    #[error("{program} exited with {code:?}")]
    ImageTransform { program: String, code: Option<i32> },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("document conversion produced no {expected:?} (exit code {code:?})")]
    ConversionFailed { code: Option<i32>, expected: PathBuf },
    #[error("render error: {0}")]
    Render(String),
    #[error("invalid issue manifest: {0}")]
    Manifest(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
