//! Directory-backed provider: an object-store stand-in that downloads (copies) each attachment
//! into a staged temp file, the way a remote store is staged to local disk before archiving.

use anyhow::Result;
use log::{debug, trace};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::AttachmentProvider;
use crate::Attachment;
use crate::error::FetchError;
use crate::pipeline::CancelToken;
use crate::utils::{prepare_staging_dir, remove_staging_dir_if_empty, stage_to_temp};

#[derive(Debug)]
pub struct DirectoryProvider {
    root: PathBuf,
    staging_dir: PathBuf,
}

impl DirectoryProvider {
    /// `root` holds the attachments, keyed by relative path. `staging_dir` is created if missing.
    pub fn new(root: &Path, staging_dir: &Path) -> Result<Self> {
        let staging_dir = prepare_staging_dir(staging_dir)?;
        Ok(Self {
            root: root.to_path_buf(),
            staging_dir,
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Resolve `key` under root. Keys that are absolute or climb out of root resolve to nothing.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        (!escapes).then(|| self.root.join(rel))
    }
}

impl AttachmentProvider for DirectoryProvider {
    fn fetch(&self, key: &str, cancel: &CancelToken) -> Result<Attachment, FetchError> {
        let path = self
            .resolve(key)
            .ok_or_else(|| FetchError::NotFound(key.to_string()))?;
        let mut src = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound(key.to_string()),
            _ => FetchError::io(key, e),
        })?;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled(key.to_string()));
        }
        let (staged, length) =
            stage_to_temp(&self.staging_dir, &mut src).map_err(|e| FetchError::io(key, e))?;
        trace!("staged {} ({} bytes) at {}", key, length, staged.path().display());
        Ok(Attachment::new(length, staged))
    }

    fn shutdown(&self) {
        debug!("Releasing staging directory {}", self.staging_dir.display());
        remove_staging_dir_if_empty(&self.staging_dir);
    }
}
