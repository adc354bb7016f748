use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential available for account '{account}'")]
    Missing { account: String },

    #[error("access token is not a decodable JWT: {reason}")]
    InvalidToken { reason: String },

    #[error("cached access token for '{account}' expired at epoch second {expired_at}")]
    Expired { account: String, expired_at: u64 },

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse token store JSON at {path}: {source}")]
    StoreParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize token store for {path}: {source}")]
    StoreSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CredentialError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }
}
