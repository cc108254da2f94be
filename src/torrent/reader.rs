use super::config::TorrentConfig;
use super::metainfo::MetaInfoFields;
use crate::bencode::Encoder;
use crate::context::{Clock, ObjectId, SystemClock};
use crate::error::{Result, SeedError};
use crate::storage::{FragmentStore, TORRENT_KEY};
use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serves `.torrent` documents for objects whose info dictionary was stored
/// by a `TorrentBuilder`.
///
/// Tracker, comment and encoding come from the configuration passed to each
/// call, so changing them takes effect without re-hashing anything.
pub struct TorrentReader<S, C = SystemClock> {
    store: Arc<S>,
    clock: C,
}

impl<S: FragmentStore> TorrentReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: FragmentStore, C: Clock> TorrentReader<S, C> {
    pub fn with_clock(store: Arc<S>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Build the complete bencoded metainfo document for `object`.
    ///
    /// Returns `SeedError::NotFound` when the object has no stored info
    /// dictionary, and `SeedError::StoreRead` when the store itself fails.
    pub async fn get_torrent(&self, config: &TorrentConfig, object: &ObjectId) -> Result<Bytes> {
        let mut encoder = Encoder::new();
        encoder.begin_dict();
        MetaInfoFields::from_config(config, self.clock.now_unix()).write_to(&mut encoder)?;

        let keys: BTreeSet<String> = [TORRENT_KEY.to_string()].into();
        let fragment = self
            .store
            .get_by_keys(object, &keys)
            .await
            .map_err(SeedError::StoreRead)?
            .remove(TORRENT_KEY)
            .ok_or_else(|| {
                warn!("No torrent metadata stored for {}", object);
                SeedError::NotFound {
                    bucket: object.bucket.clone(),
                    object: object.name.clone(),
                }
            })?;

        if fragment.first() != Some(&b'd') || fragment.last() != Some(&b'e') {
            return Err(SeedError::InvalidTorrent(format!(
                "stored metadata for {} is not a dictionary",
                object
            )));
        }
        debug!("Fetched {} byte info dictionary for {}", fragment.len(), object);

        encoder.write_string("info").write_raw(&fragment);
        encoder.end_dict()?;
        let document = encoder.finish()?.freeze();

        info!("Built {} byte torrent for {}", document.len(), object);
        Ok(document)
    }
}
