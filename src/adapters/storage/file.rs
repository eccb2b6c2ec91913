use crate::adapters::storage::SecureStore;
use crate::error::Result;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Stores each key as `{dir}/{key}.json`, readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileSecureStore {
    dir: PathBuf,
}

impl FileSecureStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("invalid storage key: {key:?}")).into());
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(err, skip(self, value), fields(dir = %self.dir.display()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = path.with_extension("json.tmp");
        remove_if_present(&tmp).await?;
        let written = match write_private(&tmp, value).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = remove_if_present(&tmp).await {
                tracing::warn!(error = %cleanup, "Could not remove temporary session file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    #[tracing::instrument(err, skip(self), fields(dir = %self.dir.display()))]
    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        Ok(remove_if_present(&path).await?)
    }
}

/// Creates `path` owner-only from the start; it must not exist yet.
async fn write_private(path: &Path, value: &str) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(value.as_bytes()).await?;
    file.sync_all().await
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
