use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::PersistError;

/// Receives each freshly generated playlist.
pub trait OutputSink {
    fn write(&self, playlist: &str) -> Result<(), PersistError>;
}

/// The merged playlist on disk. Replaced atomically so players never read a
/// partial file.
pub struct PlaylistFile {
    path: PathBuf,
}

impl PlaylistFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn replace(&self, playlist: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, playlist).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl OutputSink for PlaylistFile {
    fn write(&self, playlist: &str) -> Result<(), PersistError> {
        self.replace(playlist)
            .map_err(|e| PersistError::new("failed to write playlist", &e))
    }
}
