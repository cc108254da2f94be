mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::context::ObjectId;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use thiserror::Error;

/// Side-channel key that holds an object's encoded info dictionary
pub const TORRENT_KEY: &str = "rgw.torrent";

/// Failure reported by a backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value attributes attached to stored objects.
///
/// Writes of a single key must be atomic: a reader sees either the previous
/// value or the complete new one. Concurrent writers to the same key resolve
/// as last-writer-wins.
pub trait FragmentStore {
    fn put(
        &self,
        object: &ObjectId,
        key: &str,
        value: Bytes,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch the requested keys. Keys with no value are left out of the map.
    fn get_by_keys(
        &self,
        object: &ObjectId,
        keys: &BTreeSet<String>,
    ) -> impl Future<Output = Result<BTreeMap<String, Bytes>, StoreError>> + Send;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A store whose every call fails
    pub(crate) struct UnavailableStore;

    impl FragmentStore for UnavailableStore {
        async fn put(&self, _: &ObjectId, _: &str, _: Bytes) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("backend offline".to_string()))
        }

        async fn get_by_keys(
            &self,
            _: &ObjectId,
            _: &BTreeSet<String>,
        ) -> Result<BTreeMap<String, Bytes>, StoreError> {
            Err(StoreError::Unavailable("backend offline".to_string()))
        }
    }
}
