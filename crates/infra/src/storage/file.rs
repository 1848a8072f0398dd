//! JSON-file key-value storage
//!
//! One file per key under a root directory. Writes go to a sibling temp file
//! that is flushed with `sync_all` and then renamed over the target, so a
//! crash leaves either the old blob or the new one, never a torn write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fieldsync_core::KeyValueStorage;
use fieldsync_domain::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::errors::InfraError;

const FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> std::result::Result<PathBuf, InfraError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

fn validate_key(key: &str) -> std::result::Result<(), InfraError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(InfraError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));

        fs::create_dir_all(&self.root).await.map_err(InfraError::from)?;

        let mut file = fs::File::create(&tmp).await.map_err(InfraError::from)?;
        file.write_all(value.as_bytes()).await.map_err(InfraError::from)?;
        file.sync_all().await.map_err(InfraError::from)?;
        drop(file);

        fs::rename(&tmp, &path).await.map_err(InfraError::from)?;
        debug!(path = %path.display(), "Blob written");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}
