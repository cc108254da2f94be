use super::{FragmentStore, StoreError};
use crate::context::ObjectId;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

/// In-process store, one attribute map per object
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectId, BTreeMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every attribute of an object, as deleting the object would
    pub async fn remove_object(&self, object: &ObjectId) -> bool {
        self.objects.write().await.remove(object).is_some()
    }
}

impl FragmentStore for MemoryStore {
    async fn put(&self, object: &ObjectId, key: &str, value: Bytes) -> Result<(), StoreError> {
        debug!("memory store: set {} on {} ({} bytes)", key, object, value.len());
        self.objects
            .write()
            .await
            .entry(object.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get_by_keys(
        &self,
        object: &ObjectId,
        keys: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Bytes>, StoreError> {
        let objects = self.objects.read().await;
        let found = objects
            .get(object)
            .map(|attrs| {
                attrs
                    .iter()
                    .filter(|(key, _)| keys.contains(*key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        let obj = ObjectId::new("b", "o");
        assert_ok!(store.put(&obj, "k1", Bytes::from_static(b"v1")).await);
        assert_ok!(store.put(&obj, "k2", Bytes::from_static(b"v2")).await);

        let got = assert_ok!(store.get_by_keys(&obj, &keys(&["k1", "missing"])).await);
        assert_eq!(got.len(), 1);
        assert_eq!(&got["k1"][..], b"v1");
    }

    #[tokio::test]
    async fn test_last_writer_wins_and_remove() {
        let store = MemoryStore::new();
        let obj = ObjectId::new("b", "o");
        assert_ok!(store.put(&obj, "k", Bytes::from_static(b"old")).await);
        assert_ok!(store.put(&obj, "k", Bytes::from_static(b"new")).await);
        let got = assert_ok!(store.get_by_keys(&obj, &keys(&["k"])).await);
        assert_eq!(&got["k"][..], b"new");

        assert!(store.remove_object(&obj).await);
        let got = assert_ok!(store.get_by_keys(&obj, &keys(&["k"])).await);
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_object_is_empty() {
        let store = MemoryStore::new();
        let got = assert_ok!(
            store
                .get_by_keys(&ObjectId::new("b", "nothing"), &keys(&["k"]))
                .await
        );
        assert!(got.is_empty());
    }
}
