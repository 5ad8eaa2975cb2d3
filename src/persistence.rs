//! Data persistence helpers for WagerBot
//!
//! Sessions and points are kept as small JSON documents. Writes go to a
//! sibling temp file that is renamed over the target, so a crash never leaves
//! a half written document behind.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::Result;

/// Owns the data directory the file-backed stores live in
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    data_dir: PathBuf,
}

impl PersistenceManager {
    /// Create a new persistence manager, creating the directory if needed
    pub async fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        if !fs::try_exists(&data_dir).await? {
            fs::create_dir_all(&data_dir).await?;
            tracing::info!(path = %data_dir.display(), "Created data directory");
        }

        Ok(Self { data_dir })
    }

    /// Path of a file inside the data directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Load a JSON document; a missing file yields `None`
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replace a JSON document atomically
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, &bytes).await?;
    fs::rename(&tmp, path).await?;
    tracing::trace!(path = %path.display(), bytes = bytes.len(), "Wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let manager = PersistenceManager::new(dir.path().join("data")).await.unwrap();
        let path = manager.file("doc.json");

        let missing: Option<BTreeMap<String, i64>> = read_json(&path).await.unwrap();
        assert!(missing.is_none());

        let mut doc = BTreeMap::new();
        doc.insert("alice".to_string(), 5i64);
        write_json_atomic(&path, &doc).await.unwrap();

        let loaded: BTreeMap<String, i64> = read_json(&path).await.unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(!manager.file("doc.json.tmp").exists());
    }
}
