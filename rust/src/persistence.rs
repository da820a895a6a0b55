//! JSON file persistence for the credential mapping.
//!
//! The file is a flat object of service name to hash string. Saves go through a
//! temp file in the same directory followed by a rename, so a crash mid-write
//! leaves the previous store intact.

use std::collections::btree_map::Entry;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::{StoreError, StoreResult};
use crate::store::CredentialMap;

/// On-disk form of the mapping. A service named twice is a parse error rather
/// than a silent last-one-wins.
struct StoreFile(CredentialMap);

impl<'de> Deserialize<'de> for StoreFile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StoreFileVisitor;

        impl<'de> Visitor<'de> for StoreFileVisitor {
            type Value = StoreFile;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object of service names to hash strings")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut mapping = CredentialMap::new();
                while let Some((service, hash)) = map.next_entry::<String, String>()? {
                    match mapping.entry(service) {
                        Entry::Occupied(slot) => {
                            return Err(de::Error::custom(format_args!(
                                "service {:?} appears more than once",
                                slot.key()
                            )));
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(hash);
                        }
                    }
                }
                Ok(StoreFile(mapping))
            }
        }

        deserializer.deserialize_map(StoreFileVisitor)
    }
}

/// Reads the mapping stored at `path`.
///
/// A missing file is not an error: an empty store file is created and an empty
/// mapping returned. Content that does not parse is reported as
/// `CorruptStore` and the file is left as it is.
pub fn load(path: impl AsRef<Path>) -> StoreResult<CredentialMap> {
    let path = path.as_ref();
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no credential store found; creating an empty one");
            let empty = CredentialMap::new();
            save(&empty, path)?;
            return Ok(empty);
        }
        Err(source) => {
            error!(path = %path.display(), %source, "failed to read credential store");
            return Err(StoreError::PersistenceIo {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let StoreFile(mapping) = serde_json::from_slice(&raw).map_err(|source| {
        error!(path = %path.display(), %source, "credential store does not parse");
        StoreError::CorruptStore {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(path = %path.display(), count = mapping.len(), "credential store loaded");
    Ok(mapping)
}

/// Writes `mapping` to `path` atomically. Keys are written in sorted order so
/// unchanged data always serializes to the same bytes.
pub fn save(mapping: &CredentialMap, path: impl AsRef<Path>) -> StoreResult<()> {
    let path = path.as_ref();
    let mut encoded = serde_json::to_vec_pretty(mapping).map_err(StoreError::Serialize)?;
    encoded.push(b'\n');

    let io_err = |source: std::io::Error| {
        error!(path = %path.display(), %source, "failed to write credential store");
        StoreError::PersistenceIo {
            path: path.to_path_buf(),
            source,
        }
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    // Dropping the temp file on any early return deletes it.
    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp.write_all(&encoded).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    info!(path = %path.display(), count = mapping.len(), "credential store saved");
    Ok(())
}
