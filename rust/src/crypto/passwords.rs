//! Secret hashing built around Argon2id.
//! Every stored hash is a PHC string that carries its own algorithm, version,
//! cost parameters and salt, so verification never consults the engine's
//! current configuration.

use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use serde::Deserialize;
use thiserror::Error;

/// Tuned Argon2id parameters for an interactive desktop store.
/// - memory_cost: 19 MiB keeps GPU cracking expensive
/// - time_cost: 3 iterations for interactive latency without sacrificing safety
/// - parallelism: 1 lane to keep resource usage predictable
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

/// Largest secret accepted for hashing, in bytes.
pub const MAX_SECRET_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("secret must not be empty")]
    EmptySecret,
    #[error("secret is {len} bytes; the maximum is {max}")]
    InputTooLong { len: usize, max: usize },
    #[error("malformed hash: {0}")]
    MalformedHash(String),
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("argon2 failure: {0}")]
    Backend(String),
}

/// Cost settings applied to newly produced hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct HashParams {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_cost_kib: MEMORY_COST_KIB,
            time_cost: TIME_COST,
            parallelism: PARALLELISM,
        }
    }
}

/// One-way transform of secrets into self-describing Argon2id hashes.
#[derive(Debug, Clone)]
pub struct HashEngine {
    params: Params,
}

impl HashEngine {
    /// Builds an engine, rejecting parameters Argon2 cannot run with.
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        let params = Params::new(params.memory_cost_kib, params.time_cost, params.parallelism, None)
            .map_err(|e| HashError::InvalidParams(format!("{e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a secret with a freshly generated salt and returns the PHC string.
    /// Two calls with the same secret never return the same string.
    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        check_length(secret)?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError::Backend(format!("{e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a candidate against a stored hash using the parameters and salt
    /// embedded in that hash. `Ok(false)` means the candidate is wrong; an
    /// unparseable hash is reported as `MalformedHash`.
    pub fn verify(&self, hash: &str, candidate: &str) -> Result<bool, HashError> {
        let parsed = parse(hash)?;
        // Secrets outside the hashable range are never stored, so they can never match.
        if check_length(candidate).is_err() {
            return Ok(false);
        }

        // The stored hash's own params override the engine's.
        match self.argon2().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::MalformedHash(format!("{e}"))),
        }
    }

    /// Parses a hash without verifying anything against it.
    pub fn check_format(hash: &str) -> Result<(), HashError> {
        parse(hash).map(|_| ())
    }
}

impl Default for HashEngine {
    fn default() -> Self {
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None).unwrap_or_default();
        Self { params }
    }
}

fn check_length(secret: &str) -> Result<(), HashError> {
    if secret.is_empty() {
        return Err(HashError::EmptySecret);
    }
    if secret.len() > MAX_SECRET_LEN {
        return Err(HashError::InputTooLong {
            len: secret.len(),
            max: MAX_SECRET_LEN,
        });
    }
    Ok(())
}

fn parse(hash: &str) -> Result<PasswordHash<'_>, HashError> {
    let parsed = PasswordHash::new(hash).map_err(|e| HashError::MalformedHash(format!("{e}")))?;
    Algorithm::try_from(parsed.algorithm).map_err(|e| HashError::MalformedHash(format!("{e}")))?;
    if parsed.hash.is_none() || parsed.salt.is_none() {
        return Err(HashError::MalformedHash("missing salt or digest".to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
pub(crate) fn test_engine() -> HashEngine {
    HashEngine::new(HashParams {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    })
    .expect("test params are valid")
}
