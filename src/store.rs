use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use linetable::Table;
use tracing::debug;

use crate::channel::Channel;
use crate::dataset::Dataset;
use crate::error::PersistError;
use crate::source::Source;

/// Where the [`Dataset`] lives between operations.
pub trait Store {
    /// Held for the whole of a mutation. Released on drop.
    type Lock;

    /// Blocks until no other writer, in this process or another, is active.
    fn lock(&self) -> Result<Self::Lock, PersistError>;

    /// Returns an empty dataset when nothing has been saved yet.
    fn load(&self) -> Result<Dataset, PersistError>;

    fn save(&self, dataset: &Dataset) -> Result<(), PersistError>;
}

/// Two JSONL tables, `sources/` and `channels/`, under one directory.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

const LOCK_FILE: &str = ".lock";

/// An exclusive advisory lock on a store directory.
pub struct StoreLock {
    _file: File,
}

impl JsonlStore {
    fn acquire(&self) -> anyhow::Result<StoreLock> {
        fs::create_dir_all(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        let path = self.path.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.lock()
            .with_context(|| format!("failed to lock {}", path.display()))?;
        Ok(StoreLock { _file: file })
    }
}

impl Store for JsonlStore {
    type Lock = StoreLock;

    fn lock(&self) -> Result<StoreLock, PersistError> {
        self.acquire()
            .map_err(|e| PersistError::new("failed to lock store", &e))
    }

    fn load(&self) -> Result<Dataset, PersistError> {
        let sources = Table::<Source>::load(&self.path)
            .map_err(|e| PersistError::new("failed to load sources", &e))?;
        let channels = Table::<Channel>::load(&self.path)
            .map_err(|e| PersistError::new("failed to load channels", &e))?;
        Ok(Dataset {
            sources: sources.into_items(),
            channels: channels.into_items(),
        })
    }

    fn save(&self, dataset: &Dataset) -> Result<(), PersistError> {
        Table::with_rows(&self.path, dataset.channels.clone())
            .save()
            .map_err(|e| PersistError::new("failed to save channels", &e))?;
        Table::with_rows(&self.path, dataset.sources.clone())
            .save()
            .map_err(|e| PersistError::new("failed to save sources", &e))?;
        debug!(
            sources = dataset.sources.len(),
            channels = dataset.channels.len(),
            "saved dataset"
        );
        Ok(())
    }
}
