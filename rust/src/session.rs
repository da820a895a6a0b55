//! Session boundary around a credential store file.
//!
//! Opening a session loads the file before any mutation is possible; closing
//! it writes the store back. A session dropped without `close` still saves,
//! so early returns do not lose credentials added during the session.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::crypto::passwords::HashEngine;
use crate::error::StoreResult;
use crate::persistence;
use crate::store::CredentialStore;

#[derive(Debug)]
pub struct Session {
    store: CredentialStore,
    path: PathBuf,
    closed: bool,
}

impl Session {
    /// Loads the store at `path`, creating an empty file if none exists.
    /// A corrupt file aborts the open and is left on disk untouched.
    pub fn open(path: impl Into<PathBuf>, engine: HashEngine) -> StoreResult<Self> {
        let path = path.into();
        let mapping = persistence::load(&path)?;
        let store = CredentialStore::new(engine);
        store.restore(mapping)?;
        debug!(path = %path.display(), "session opened");
        Ok(Self {
            store,
            path,
            closed: false,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current state to disk without ending the session.
    pub fn checkpoint(&self) -> StoreResult<()> {
        persistence::save(&self.store.snapshot(), &self.path)
    }

    /// Saves and ends the session.
    pub fn close(mut self) -> StoreResult<()> {
        self.closed = true;
        self.checkpoint()?;
        debug!(path = %self.path.display(), "session closed");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed || std::thread::panicking() {
            return;
        }
        if let Err(err) = self.checkpoint() {
            error!(path = %self.path.display(), %err, "failed to save credential store on drop");
        }
    }
}
