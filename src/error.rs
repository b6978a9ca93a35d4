use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ApolloError {
    #[error("invalid organism name: {0:?}")]
    InvalidOrganism(String),

    #[error("no apolloConfig.yaml found (pass --config or create one in the current directory)")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse YAML config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("the Apollo password must be set in the ApolloPass environment variable")]
    MissingPassword,

    #[error("directory for logfile does not exist: {0}")]
    InvalidLogPath(PathBuf),

    #[error("GFF3 parse error at line {line}: {message}")]
    GffParse { line: usize, message: String },

    #[error("feature graph snapshot error: {0}")]
    GraphSnapshot(String),

    #[error("annotation for {0} could not be retrieved and no local copy exists")]
    AnnotationUnavailable(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

/// The three ways a single remote call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Protocol { status: Option<u16> },
    Connection,
    Timeout,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Protocol { status: Some(status) } => {
                write!(f, "protocol failure (status {status})")
            }
            TransportErrorKind::Protocol { status: None } => write!(f, "protocol failure"),
            TransportErrorKind::Connection => write!(f, "connection failure"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} for {url}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub url: String,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }
}
