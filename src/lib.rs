//! Generates BitTorrent metainfo documents for objects in an object store.
//!
//! Writing an object feeds its bytes through a [`torrent::TorrentBuilder`],
//! which hashes them into pieces and stores the encoded info dictionary in a
//! side-channel of the object ([`storage::FragmentStore`]). Reading a torrent
//! goes through a [`torrent::TorrentReader`], which rebuilds the tracker and
//! descriptive fields from current configuration and splices in the stored
//! info dictionary.

pub mod bencode;
pub mod context;
pub mod error;
pub mod storage;
pub mod torrent;

pub use context::{Clock, FixedClock, ObjectId, SystemClock};
pub use error::{Result, SeedError};
pub use storage::{FileStore, FragmentStore, MemoryStore, StoreError, TORRENT_KEY};
pub use torrent::{
    InfoFragment, MetaInfoDocument, TorrentBuilder, TorrentConfig, TorrentReader,
    TorrentSettings,
};
