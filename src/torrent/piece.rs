use crate::error::{Result, SeedError};
use sha1::{Digest, Sha1};
use std::fmt;
use tracing::debug;

/// Size of a SHA1 piece digest
pub const DIGEST_SIZE: usize = 20;

/// A 20-byte SHA1 hash of one piece
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceHash([u8; DIGEST_SIZE]);

impl PieceHash {
    /// Hash a complete piece in one go
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self::finalize(hasher)
    }

    fn finalize(hasher: Sha1) -> Self {
        let mut hash = [0u8; DIGEST_SIZE];
        hash.copy_from_slice(&hasher.finalize());
        Self(hash)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let hash: [u8; DIGEST_SIZE] = slice.try_into().map_err(|_| {
            SeedError::InvalidTorrent("Piece hash must be 20 bytes".to_string())
        })?;
        Ok(Self(hash))
    }
}

impl AsRef<[u8]> for PieceHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PieceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PieceHash({})", hex::encode(self.0))
    }
}

/// Piece digests of an object, in content order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceDigestSet {
    hashes: Vec<PieceHash>,
}

impl PieceDigestSet {
    /// Split concatenated SHA1 hashes, as found in a `pieces` string
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() % DIGEST_SIZE != 0 {
            return Err(SeedError::InvalidTorrent(
                "Pieces length must be multiple of 20".to_string(),
            ));
        }

        let hashes = data
            .chunks_exact(DIGEST_SIZE)
            .map(PieceHash::from_slice)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { hashes })
    }

    /// Concatenated digests, the value of a `pieces` string
    pub fn to_bytes(&self) -> Vec<u8> {
        self.hashes.iter().flat_map(|h| h.0).collect()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PieceHash> {
        self.hashes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PieceHash> {
        self.hashes.iter()
    }
}

/// Number of pieces needed to cover `total_length` bytes
pub fn piece_count(total_length: u64, piece_length: u64) -> u64 {
    total_length.div_ceil(piece_length)
}

/// Streaming piece hasher.
///
/// Piece boundaries follow the cumulative offset of everything fed so far,
/// so a piece that straddles two `update` calls is hashed as one piece.
pub struct PieceHasher {
    piece_length: u64,
    /// Bytes fed into `current` since the last digest
    filled: u64,
    current: Sha1,
    digests: Vec<PieceHash>,
}

impl PieceHasher {
    pub fn new(piece_length: u64) -> Result<Self> {
        if piece_length == 0 {
            return Err(SeedError::Configuration(
                "piece length must be positive".to_string(),
            ));
        }

        Ok(Self {
            piece_length,
            filled: 0,
            current: Sha1::new(),
            digests: Vec::new(),
        })
    }

    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let room = self.piece_length - self.filled;
            let take = room.min(data.len() as u64) as usize;

            self.current.update(&data[..take]);
            self.filled += take as u64;
            data = &data[take..];

            if self.filled == self.piece_length {
                self.flush();
            }
        }
    }

    /// Digest any trailing partial piece and return all digests
    pub fn finish(mut self) -> PieceDigestSet {
        if self.filled > 0 {
            self.flush();
        }
        PieceDigestSet {
            hashes: self.digests,
        }
    }

    fn flush(&mut self) {
        let hash = PieceHash::finalize(std::mem::replace(&mut self.current, Sha1::new()));
        debug!(
            "Piece {} hashed ({} bytes): {}",
            self.digests.len(),
            self.filled,
            hex::encode(hash.0)
        );
        self.digests.push(hash);
        self.filled = 0;
    }
}

impl fmt::Debug for PieceHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PieceHasher")
            .field("piece_length", &self.piece_length)
            .field("filled", &self.filled)
            .field("pieces", &self.digests.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tokio_test::{assert_err, assert_ok};

    fn hash_chunks(piece_length: u64, chunks: &[&[u8]]) -> PieceDigestSet {
        let mut hasher = assert_ok!(PieceHasher::new(piece_length));
        for chunk in chunks {
            hasher.update(chunk);
        }
        hasher.finish()
    }

    #[test]
    fn test_zero_piece_length_rejected() {
        let err = assert_err!(PieceHasher::new(0));
        assert!(matches!(err, SeedError::Configuration(_)));
    }

    #[test]
    fn test_piece_straddling_chunks() {
        let digests = hash_chunks(4, &[b"ABCDEF", b"GHIJ"]);
        assert_eq!(digests.len(), 3);
        assert_eq!(digests.get(0), Some(&PieceHash::of(b"ABCD")));
        assert_eq!(digests.get(1), Some(&PieceHash::of(b"EFGH")));
        assert_eq!(digests.get(2), Some(&PieceHash::of(b"IJ")));
    }

    #[test]
    fn test_exact_multiple_has_no_short_piece() {
        let digests = hash_chunks(4, &[b"ABCDEFGH"]);
        assert_eq!(digests.len(), 2);
        assert_eq!(digests.get(1), Some(&PieceHash::of(b"EFGH")));
    }

    #[test]
    fn test_empty_stream() {
        assert!(hash_chunks(4, &[]).is_empty());
        assert!(hash_chunks(4, &[b"", b""]).is_empty());
    }

    #[test]
    fn test_piece_larger_than_content() {
        let digests = hash_chunks(1 << 20, &[b"tiny", b" object"]);
        assert_eq!(digests.len(), 1);
        assert_eq!(digests.get(0), Some(&PieceHash::of(b"tiny object")));
    }

    #[test]
    fn test_random_chunking_matches_single_write() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let len = rng.gen_range(0..2_000usize);
            let piece_length = rng.gen_range(1..300u64);
            let content: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

            let whole = hash_chunks(piece_length, &[&content]);
            assert_eq!(whole.len() as u64, piece_count(len as u64, piece_length));

            let mut chunks = Vec::new();
            let mut rest = &content[..];
            while !rest.is_empty() {
                let cut = rng.gen_range(0..=rest.len().min(400));
                let (head, tail) = rest.split_at(cut);
                chunks.push(head);
                rest = tail;
            }
            assert_eq!(hash_chunks(piece_length, &chunks), whole);
        }
    }

    #[test]
    fn test_pieces_bytes_roundtrip() {
        let digests = hash_chunks(3, &[b"abcdefg"]);
        let raw = digests.to_bytes();
        assert_eq!(raw.len(), 3 * DIGEST_SIZE);
        assert_eq!(assert_ok!(PieceDigestSet::from_bytes(&raw)), digests);
        assert_err!(PieceDigestSet::from_bytes(&raw[1..]));
    }
}
