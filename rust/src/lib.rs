//! Local credential store that keeps only Argon2id hashes of service secrets.
//! The store lives in memory during a session and is written to a flat JSON
//! file at explicit session boundaries.

pub mod config;
pub mod crypto;
pub mod error;
pub mod persistence;
pub mod session;
pub mod store;

pub use crypto::passwords::{HashEngine, HashError, HashParams};
pub use error::{StoreError, StoreResult};
pub use session::Session;
pub use store::{CredentialMap, CredentialStore};
