//! Error type shared by the credential store, the persistence adapter and the
//! session wrapper.

use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::passwords::HashError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a credential for service {0} already exists")]
    DuplicateService(String),

    #[error("no credential stored for service {0}")]
    ServiceNotFound(String),

    #[error("incorrect secret for service {0}")]
    AuthenticationFailed(String),

    #[error("stored hash for service {service} is corrupt")]
    MalformedHash {
        service: String,
        #[source]
        source: HashError,
    },

    #[error("hashing failed: {0}")]
    HashingFailed(#[source] HashError),

    #[error("invalid record for service {service:?}: {reason}")]
    InvalidRecord { service: String, reason: String },

    #[error("credential store at {path} is corrupt; refusing to replace it")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("credential store I/O failed at {path}")]
    PersistenceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize credential store")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    /// Outcomes a user can retry past (wrong secret, unknown service, taken
    /// name). Callers log these at `warn`; everything else at `error`.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::DuplicateService(_) | Self::ServiceNotFound(_) | Self::AuthenticationFailed(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
