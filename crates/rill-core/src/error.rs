use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rill operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to resolve package '{package}': {reason}")]
    Resolution {
        package: String,
        reason: ResolutionReason,
    },

    #[error("Parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Why a bare package name could not be turned into an entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionReason {
    /// No `package.json` at the expected location.
    ManifestMissing(PathBuf),
    /// `package.json` exists but is not valid JSON.
    ManifestInvalid(String),
    /// The manifest declares no `module` entry.
    NoEsmEntry,
}

impl std::fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManifestMissing(path) => write!(f, "no manifest at {}", path.display()),
            Self::ManifestInvalid(msg) => write!(f, "invalid manifest: {msg}"),
            Self::NoEsmEntry => f.write_str("manifest declares no \"module\" entry"),
        }
    }
}

impl Error {
    /// Build a parse error for `file`.
    #[must_use]
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// HTTP status code this error maps to at the request boundary.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Resolution {
                reason: ResolutionReason::ManifestMissing(_),
                ..
            } => 404,
            Self::BadRequest(_) => 400,
            _ => 500,
        }
    }
}

/// Result alias used across rill-core.
pub type Result<T> = std::result::Result<T, Error>;
