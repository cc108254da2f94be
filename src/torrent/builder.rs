use super::config::TorrentConfig;
use super::info::InfoFragment;
use super::piece::PieceHasher;
use crate::context::ObjectId;
use crate::error::{Result, SeedError};
use crate::storage::{FragmentStore, TORRENT_KEY};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a builder is in its write session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Idle,
    Accumulating,
    Finalized,
}

/// Collects an object's bytes while it is written and, once the write is
/// complete, hashes them and persists the info dictionary next to the object.
///
/// One builder serves one write session. Chunks must be fed in order from a
/// single caller.
pub struct TorrentBuilder<S> {
    config: TorrentConfig,
    object: ObjectId,
    store: Arc<S>,
    state: BuilderState,
    chunks: Vec<Bytes>,
    total_length: u64,
}

impl<S: FragmentStore> TorrentBuilder<S> {
    pub fn new(config: TorrentConfig, object: ObjectId, store: Arc<S>) -> Self {
        Self {
            config,
            object,
            store,
            state: BuilderState::Idle,
            chunks: Vec::new(),
            total_length: 0,
        }
    }

    /// Begin a write session, discarding anything accumulated before
    pub fn start(&mut self) {
        if self.state != BuilderState::Idle {
            debug!("Restarting torrent session for {}", self.object);
        }
        self.chunks.clear();
        self.total_length = 0;
        self.state = BuilderState::Accumulating;
    }

    /// Keep a chunk of object data for hashing at finalize
    pub fn accept(&mut self, chunk: impl Into<Bytes>) -> Result<()> {
        self.expect_accumulating("accept")?;

        let chunk = chunk.into();
        self.total_length += chunk.len() as u64;
        debug!(
            "Accepted {} bytes for {} ({} total)",
            chunk.len(),
            self.object,
            self.total_length
        );
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Hash the accumulated content and persist the encoded info dictionary.
    ///
    /// The fragment is written with a single `put`. If that fails the builder
    /// stays in `Accumulating` with its data intact, and nothing was stored.
    pub async fn finalize(&mut self) -> Result<InfoFragment> {
        self.expect_accumulating("finalize")?;

        let mut hasher = PieceHasher::new(self.config.piece_length())?;
        for chunk in &self.chunks {
            hasher.update(chunk);
        }

        let fragment = InfoFragment {
            name: self.object.name.clone(),
            length: self.total_length,
            piece_length: self.config.piece_length(),
            pieces: hasher.finish(),
        };
        let encoded = fragment.encode()?;

        info!(
            "Hashed {} bytes of {} into {} pieces",
            fragment.length,
            self.object,
            fragment.pieces.len()
        );

        self.store
            .put(&self.object, TORRENT_KEY, encoded)
            .await
            .map_err(SeedError::StoreWrite)?;

        info!("Torrent metadata stored for {}", self.object);

        self.chunks = Vec::new();
        self.state = BuilderState::Finalized;
        Ok(fragment)
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Bytes accepted so far in this session
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    fn expect_accumulating(&self, op: &str) -> Result<()> {
        if self.state != BuilderState::Accumulating {
            return Err(SeedError::InvalidState(format!(
                "{} called on {} while {:?}",
                op, self.object, self.state
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::UnavailableStore;
    use crate::storage::MemoryStore;
    use crate::torrent::config::TorrentSettings;
    use crate::torrent::piece::PieceHash;
    use std::collections::BTreeSet;
    use tokio_test::{assert_err, assert_ok};

    fn config(piece_length: u64) -> TorrentConfig {
        assert_ok!(TorrentConfig::new(piece_length))
    }

    async fn stored_fragment(store: &MemoryStore, object: &ObjectId) -> Option<Bytes> {
        let keys: BTreeSet<String> = [TORRENT_KEY.to_string()].into();
        let mut found = assert_ok!(store.get_by_keys(object, &keys).await);
        found.remove(TORRENT_KEY)
    }

    #[tokio::test]
    async fn test_pieces_span_write_boundaries() {
        let store = Arc::new(MemoryStore::new());
        let object = ObjectId::new("bucket", "letters.txt");
        let mut builder = TorrentBuilder::new(config(4), object.clone(), store.clone());

        builder.start();
        assert_ok!(builder.accept(&b"ABCDEF"[..]));
        assert_ok!(builder.accept(&b"GHIJ"[..]));
        let fragment = assert_ok!(builder.finalize().await);

        assert_eq!(fragment.name, "letters.txt");
        assert_eq!(fragment.length, 10);
        let expected: Vec<PieceHash> = [&b"ABCD"[..], &b"EFGH"[..], &b"IJ"[..]]
            .iter()
            .map(|p| PieceHash::of(p))
            .collect();
        assert_eq!(fragment.pieces.iter().copied().collect::<Vec<_>>(), expected);

        let stored = stored_fragment(&store, &object).await;
        assert_eq!(stored, Some(assert_ok!(fragment.encode())));
        assert_eq!(builder.state(), BuilderState::Finalized);
    }

    #[tokio::test]
    async fn test_empty_object() {
        let store = Arc::new(MemoryStore::new());
        let object = ObjectId::new("bucket", "empty");
        let mut builder = TorrentBuilder::new(config(16), object.clone(), store.clone());

        builder.start();
        assert_ok!(builder.accept(Bytes::new()));
        let fragment = assert_ok!(builder.finalize().await);

        assert_eq!(fragment.length, 0);
        assert!(fragment.pieces.is_empty());
        assert!(stored_fragment(&store, &object).await.is_some());
    }

    #[tokio::test]
    async fn test_operations_outside_session_rejected() {
        let store = Arc::new(MemoryStore::new());
        let object = ObjectId::new("bucket", "o");
        let mut builder = TorrentBuilder::new(config(4), object.clone(), store.clone());

        assert!(matches!(
            builder.accept(&b"early"[..]),
            Err(SeedError::InvalidState(_))
        ));
        assert_err!(builder.finalize().await);

        builder.start();
        assert_ok!(builder.finalize().await);
        assert_err!(builder.accept(&b"late"[..]));
        assert_err!(builder.finalize().await);
    }

    #[tokio::test]
    async fn test_scheme_less_tracker_does_not_block_hashing() {
        let settings = TorrentSettings {
            piece_length: 4,
            tracker: "tracker.local".to_string(),
            ..Default::default()
        };
        let config = assert_ok!(TorrentConfig::from_settings(&settings));
        let store = Arc::new(MemoryStore::new());
        let object = ObjectId::new("bucket", "o");
        let mut builder = TorrentBuilder::new(config, object.clone(), store.clone());

        builder.start();
        assert_ok!(builder.accept(&b"ABCDEF"[..]));
        let fragment = assert_ok!(builder.finalize().await);
        assert_eq!(fragment.pieces.len(), 2);
        assert!(stored_fragment(&store, &object).await.is_some());
    }

    #[tokio::test]
    async fn test_start_resets_session() {
        let store = Arc::new(MemoryStore::new());
        let object = ObjectId::new("bucket", "o");
        let mut builder = TorrentBuilder::new(config(4), object, store);

        builder.start();
        assert_ok!(builder.accept(&b"discarded"[..]));
        builder.start();
        assert_eq!(builder.total_length(), 0);
        assert_ok!(builder.accept(&b"kept"[..]));

        let fragment = assert_ok!(builder.finalize().await);
        assert_eq!(fragment.length, 4);
        assert_eq!(fragment.pieces.get(0), Some(&PieceHash::of(b"kept")));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_and_keeps_data() {
        let store = Arc::new(UnavailableStore);
        let mut builder = TorrentBuilder::new(config(4), ObjectId::new("b", "o"), store);

        builder.start();
        assert_ok!(builder.accept(&b"payload"[..]));
        let err = assert_err!(builder.finalize().await);

        assert!(matches!(err, SeedError::StoreWrite(_)));
        assert_eq!(builder.state(), BuilderState::Accumulating);
        assert_eq!(builder.total_length(), 7);
    }

    #[tokio::test]
    async fn test_parallel_sessions_for_different_objects() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let object = ObjectId::new("bucket", format!("obj-{}", i));
                    let mut builder = TorrentBuilder::new(config(3), object, store);
                    builder.start();
                    for _ in 0..=i {
                        builder.accept(vec![i; 5])?;
                    }
                    builder.finalize().await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let fragment = assert_ok!(assert_ok!(handle.await));
            assert_eq!(fragment.length, 5 * (i as u64 + 1));
            let object = ObjectId::new("bucket", fragment.name.clone());
            let stored = stored_fragment(&store, &object).await;
            assert_eq!(stored, Some(assert_ok!(fragment.encode())));
        }
    }
}
