//! In-memory credential store keyed by service name.
//!
//! The store only ever holds Argon2id hashes. Service names are matched
//! exactly (case-sensitive, untrimmed); trimming user input is the caller's
//! job. Every operation holds the store lock for its whole duration, hashing
//! included, so uniqueness checks and inserts can never interleave.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::crypto::passwords::{HashEngine, HashError};
use crate::error::{StoreError, StoreResult};

/// Service name to stored hash, ordered by service name.
pub type CredentialMap = BTreeMap<String, String>;

#[derive(Debug, Default)]
pub struct CredentialStore {
    engine: HashEngine,
    records: Mutex<CredentialMap>,
}

impl CredentialStore {
    pub fn new(engine: HashEngine) -> Self {
        Self {
            engine,
            records: Mutex::new(CredentialMap::new()),
        }
    }

    pub fn engine(&self) -> &HashEngine {
        &self.engine
    }

    // Every mutation is a single insert, remove or swap, so a poisoned map is
    // still consistent.
    fn records(&self) -> MutexGuard<'_, CredentialMap> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hashes `secret` and stores it under `service`. Never overwrites.
    pub fn add(&self, service: &str, secret: &str) -> StoreResult<()> {
        check_service(service)?;
        let mut records = self.records();
        let slot = match records.entry(service.to_string()) {
            Entry::Occupied(_) => {
                warn!(service, "refusing to overwrite existing credential");
                return Err(StoreError::DuplicateService(service.to_string()));
            }
            Entry::Vacant(slot) => slot,
        };
        let hash = self.engine.hash(secret).map_err(StoreError::HashingFailed)?;
        slot.insert(hash);
        debug!(service, "credential added");
        Ok(())
    }

    /// Verifies `secret` and, on success, returns the stored hash.
    pub fn get(&self, service: &str, secret: &str) -> StoreResult<String> {
        let records = self.records();
        let stored = lookup(&records, service)?;
        if self.check(service, stored, secret)? {
            Ok(stored.clone())
        } else {
            Err(StoreError::AuthenticationFailed(service.to_string()))
        }
    }

    /// Verifies `secret` without returning anything from the record.
    /// `Ok(false)` means the secret is wrong.
    pub fn verify(&self, service: &str, secret: &str) -> StoreResult<bool> {
        let records = self.records();
        let stored = lookup(&records, service)?;
        self.check(service, stored, secret)
    }

    /// Returns the stored hash without any verification.
    pub fn export(&self, service: &str) -> StoreResult<String> {
        let records = self.records();
        lookup(&records, service).cloned()
    }

    /// Replaces the hash of an existing credential with a hash of `new_secret`.
    pub fn update(&self, service: &str, new_secret: &str) -> StoreResult<()> {
        let mut records = self.records();
        let stored = records
            .get_mut(service)
            .ok_or_else(|| StoreError::ServiceNotFound(service.to_string()))?;
        *stored = self.engine.hash(new_secret).map_err(StoreError::HashingFailed)?;
        debug!(service, "credential updated");
        Ok(())
    }

    pub fn remove(&self, service: &str) -> StoreResult<()> {
        match self.records().remove(service) {
            Some(_) => {
                debug!(service, "credential removed");
                Ok(())
            }
            None => Err(StoreError::ServiceNotFound(service.to_string())),
        }
    }

    pub fn contains(&self, service: &str) -> bool {
        self.records().contains_key(service)
    }

    /// Stored service names in sorted order.
    pub fn services(&self) -> Vec<String> {
        self.records().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Copies out every (service, hash) pair for persistence.
    pub fn snapshot(&self) -> CredentialMap {
        self.records().clone()
    }

    /// Replaces the whole mapping. Every record is validated first; if any is
    /// rejected the current mapping is left untouched.
    pub fn restore(&self, mapping: CredentialMap) -> StoreResult<()> {
        for (service, hash) in &mapping {
            check_service(service)?;
            HashEngine::check_format(hash).map_err(|e| StoreError::InvalidRecord {
                service: service.clone(),
                reason: format!("{e}"),
            })?;
        }

        let count = mapping.len();
        *self.records() = mapping;
        debug!(count, "credential store restored");
        Ok(())
    }

    fn check(&self, service: &str, stored: &str, secret: &str) -> StoreResult<bool> {
        match self.engine.verify(stored, secret) {
            Ok(matched) => {
                if !matched {
                    warn!(service, "secret verification failed");
                }
                Ok(matched)
            }
            Err(e @ HashError::MalformedHash(_)) => Err(StoreError::MalformedHash {
                service: service.to_string(),
                source: e,
            }),
            Err(e) => Err(StoreError::HashingFailed(e)),
        }
    }
}

// `add` and `restore` must agree, or a saved store could never be reopened.
fn check_service(service: &str) -> StoreResult<()> {
    if service.is_empty() {
        return Err(StoreError::InvalidRecord {
            service: service.to_string(),
            reason: "empty service name".to_string(),
        });
    }
    Ok(())
}

fn lookup<'a>(records: &'a CredentialMap, service: &str) -> StoreResult<&'a String> {
    records
        .get(service)
        .ok_or_else(|| StoreError::ServiceNotFound(service.to_string()))
}
