use super::{FragmentStore, StoreError};
use crate::context::ObjectId;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Directory-backed store.
///
/// Layout is `<root>/<hex bucket>/<hex sha1 of object name>/<key>`. Object
/// names may contain `/` and run to 1024 bytes, so each one maps to a
/// fixed 40-character directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        info!("File store opened at {}", root.display());
        Ok(Self { root })
    }

    fn object_dir(&self, object: &ObjectId) -> PathBuf {
        self.root
            .join(hex::encode(&object.bucket))
            .join(hex::encode(Sha1::digest(object.name.as_bytes())))
    }

    fn key_path(&self, object: &ObjectId, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::Unavailable(format!(
                "key {:?} cannot be stored as a file",
                key
            )));
        }
        Ok(self.object_dir(object).join(key))
    }
}

impl FragmentStore for FileStore {
    async fn put(&self, object: &ObjectId, key: &str, value: Bytes) -> Result<(), StoreError> {
        let path = self.key_path(object, key)?;
        let dir = self.object_dir(object);
        fs::create_dir_all(&dir).await?;

        // Write aside then rename, so readers never see a partial value
        let tmp = dir.join(format!(
            ".{}.{}.{}",
            key,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let mut guard = TempFile::new(tmp);
        let mut file = fs::File::create(guard.path()).await?;
        file.write_all(&value).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(guard.path(), &path).await?;
        guard.persisted();

        debug!("Stored {} for {} at {:?} ({} bytes)", key, object, path, value.len());
        Ok(())
    }

    async fn get_by_keys(
        &self,
        object: &ObjectId,
        keys: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Bytes>, StoreError> {
        let mut found = BTreeMap::new();
        for key in keys {
            let path = self.key_path(object, key)?;
            match fs::read(&path).await {
                Ok(data) => {
                    found.insert(key.clone(), Bytes::from(data));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(found)
    }
}

/// Removes a write-aside file unless it was renamed into place, including
/// when the `put` future is dropped part way through
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = std::fs::remove_file(&self.path) {
                if err.kind() != ErrorKind::NotFound {
                    warn!("Leaving temporary file {:?}: {}", self.path, err);
                }
            }
        }
    }
}
