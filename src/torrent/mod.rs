mod builder;
mod config;
mod info;
mod metainfo;
mod piece;
mod reader;

pub use builder::{BuilderState, TorrentBuilder};
pub use config::{parse_tracker_list, TorrentConfig, TorrentSettings, DEFAULT_PIECE_LENGTH};
pub use info::{info_hash_of, InfoFragment};
pub use metainfo::{raw_info_hash, MetaInfoDocument, MetaInfoFields};
pub use piece::{piece_count, PieceDigestSet, PieceHash, PieceHasher, DIGEST_SIZE};
pub use reader::TorrentReader;

use crate::error::Result;
use std::path::Path;
use tokio::fs;

/// Load and parse a .torrent file
pub async fn load_torrent_file<P: AsRef<Path>>(path: P) -> Result<(MetaInfoDocument, [u8; 20])> {
    let data = fs::read(path).await?;
    let document = MetaInfoDocument::from_bytes(&data)?;
    let info_hash = raw_info_hash(&data)?;
    Ok((document, info_hash))
}
