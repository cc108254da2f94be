use super::piece::{piece_count, PieceDigestSet, DIGEST_SIZE};
use crate::bencode::{decode, BencodeValue, Encoder};
use crate::error::{Result, SeedError};
use bytes::{BufMut, Bytes};
use sha1::{Digest, Sha1};

/// The hash-bearing part of a torrent: the single-file `info` dictionary.
///
/// This is what gets persisted next to the object. Everything else in a
/// metainfo document is derived from configuration at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoFragment {
    /// Suggested file name, the object name
    pub name: String,
    /// Object size in bytes
    pub length: u64,
    /// Number of bytes in each piece
    pub piece_length: u64,
    /// SHA1 of every piece, in content order
    pub pieces: PieceDigestSet,
}

impl InfoFragment {
    /// Write the info dictionary, `d` through its closing `e`.
    ///
    /// Keys are written in canonical order: length, name, piece length, pieces.
    pub fn write_to<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.begin_dict();
        encoder.write_key_value("length", &self.length)?;
        encoder.write_key_value("name", self.name.as_str())?;
        encoder.write_key_value("piece length", &self.piece_length)?;
        encoder.write_key_value("pieces", self.pieces.to_bytes().as_slice())?;
        encoder.end_dict()?;
        Ok(())
    }

    /// Encode as a standalone dictionary, ready to be stored and later
    /// appended after an `info` key
    pub fn encode(&self) -> Result<Bytes> {
        let mut encoder = Encoder::new();
        self.write_to(&mut encoder)?;
        Ok(encoder.finish()?.freeze())
    }

    /// Parse a stored fragment
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::from_bencode(&decode(data)?)
    }

    pub fn from_bencode(value: &BencodeValue) -> Result<Self> {
        let dict = value
            .as_dict()
            .ok_or_else(|| SeedError::InvalidTorrent("Info must be a dict".to_string()))?;

        let name = dict
            .get(b"name".as_ref())
            .and_then(|v| v.as_str())
            .ok_or_else(|| SeedError::InvalidTorrent("Missing 'name' field".to_string()))?
            .to_string();

        let length = dict
            .get(b"length".as_ref())
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SeedError::InvalidTorrent("Missing 'length' field".to_string()))?;

        let piece_length = dict
            .get(b"piece length".as_ref())
            .and_then(|v| v.as_u64())
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                SeedError::InvalidTorrent("Missing 'piece length' field".to_string())
            })?;

        let pieces_bytes = dict
            .get(b"pieces".as_ref())
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| SeedError::InvalidTorrent("Missing 'pieces' field".to_string()))?;
        let pieces = PieceDigestSet::from_bytes(pieces_bytes)?;

        let expected = piece_count(length, piece_length);
        if pieces.len() as u64 != expected {
            return Err(SeedError::InvalidTorrent(format!(
                "{} piece hashes for {} bytes at {} bytes per piece, expected {}",
                pieces.len(),
                length,
                piece_length,
                expected
            )));
        }

        Ok(Self {
            name,
            length,
            piece_length,
            pieces,
        })
    }

    /// Size of the `pieces` string
    pub fn pieces_len(&self) -> usize {
        self.pieces.len() * DIGEST_SIZE
    }

    /// SHA1 of the encoded info dictionary
    pub fn info_hash(&self) -> Result<[u8; 20]> {
        Ok(info_hash_of(&self.encode()?))
    }
}

/// SHA1 over raw, already-encoded info dictionary bytes
pub fn info_hash_of(raw_info: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(raw_info);
    let hash = hasher.finalize();

    let mut result = [0u8; 20];
    result.copy_from_slice(&hash);
    result
}
