#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TVDB API error: {reason} ({status})")]
    Api { status: u16, reason: String },

    #[error("Authentication failed, possible bad api key: {0}")]
    AuthFailed(String),

    #[error("TVDB unavailable: {0}")]
    Unavailable(String),

    #[error("Show not found: {0}")]
    ShowNotFound(String),

    #[error("Missing series name, can't index in language: {language}")]
    ShowNotFoundInLanguage { language: String },

    #[error("Show incomplete: {0}")]
    ShowIncomplete(String),

    #[error("Indexer error: {0}")]
    Indexer(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// How a failed remote call is treated by the fallback controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad credentials. Never retried against the mirror.
    AuthFailed,
    ApiUnavailable,
    ApiError,
    TransportError,
}

impl Error {
    pub fn api(status: u16, reason: impl Into<String>) -> Self {
        Error::Api {
            status,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Error::AuthFailed(_) | Error::Api { status: 401, .. } => FailureKind::AuthFailed,
            Error::Network(_) | Error::Io(_) => FailureKind::TransportError,
            Error::Unavailable(_) | Error::Json(_) | Error::ShowIncomplete(_) => {
                FailureKind::ApiUnavailable
            }
            _ => FailureKind::ApiError,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.kind() == FailureKind::AuthFailed
    }

    /// Rewrites a 401 from the API into [`Error::AuthFailed`], leaving
    /// everything else untouched.
    pub(crate) fn into_auth_failure(self) -> Self {
        match self {
            Error::Api {
                status: 401,
                reason,
            } => Error::AuthFailed(format!("{} (401)", reason)),
            other => other,
        }
    }
}
