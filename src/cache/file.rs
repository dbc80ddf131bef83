use super::DurableCache;
use crate::domain::CacheEntry;
use crate::errors::ApiResult;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable cache layer keeping one `<key>.json` file per entry.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (and create if needed) a cache directory.
    pub async fn open(dir: impl AsRef<Path>) -> ApiResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Bytes outside `[A-Za-z0-9_-]` become `%xx`, so distinct keys map to distinct files.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut safe = String::with_capacity(key.len());
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                safe.push(b as char);
            } else {
                safe.push_str(&format!("%{:02x}", b));
            }
        }
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl DurableCache for FileCache {
    async fn get(&self, key: &str) -> ApiResult<Option<CacheEntry<Value>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, entry: &CacheEntry<Value>) -> ApiResult<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec(entry)?;
        // Write-then-rename so readers never see a half-written entry.
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
