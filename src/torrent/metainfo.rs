use super::config::TorrentConfig;
use super::info::{info_hash_of, InfoFragment};
use crate::bencode::{decode, raw_dict_value, BencodeValue, Encoder};
use crate::error::{Result, SeedError};
use bytes::{BufMut, Bytes};

/// Top-level metainfo fields other than `info`.
///
/// These are cheap to produce and depend on current configuration, so they
/// are rebuilt for every request instead of being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInfoFields {
    /// URL of the primary tracker
    pub announce: Option<String>,
    /// Tracker tiers, one tracker per tier
    pub announce_list: Vec<Vec<String>>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    /// Unix seconds
    pub creation_date: i64,
    pub encoding: Option<String>,
}

impl MetaInfoFields {
    pub fn from_config(config: &TorrentConfig, creation_date: i64) -> Self {
        let trackers = config.trackers();

        Self {
            announce: trackers.first().map(|t| t.to_string()),
            announce_list: trackers.iter().map(|t| vec![t.to_string()]).collect(),
            comment: config.comment().map(String::from),
            created_by: config.created_by().map(String::from),
            creation_date,
            encoding: config.encoding().map(String::from),
        }
    }

    /// Write every key that sorts before `info`, in canonical order.
    ///
    /// The caller owns the surrounding dictionary and writes `info` itself.
    pub fn write_to<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        if let Some(announce) = &self.announce {
            encoder.write_key_value("announce", announce)?;
        }

        if !self.announce_list.is_empty() {
            encoder.write_string("announce-list").begin_list();
            for tier in &self.announce_list {
                encoder.begin_list();
                for url in tier {
                    encoder.write_string(url);
                }
                encoder.end_list()?;
            }
            encoder.end_list()?;
        }

        if let Some(comment) = &self.comment {
            encoder.write_key_value("comment", comment)?;
        }
        if let Some(created_by) = &self.created_by {
            encoder.write_key_value("created by", created_by)?;
        }
        encoder.write_key_value("creation date", &self.creation_date)?;
        if let Some(encoding) = &self.encoding {
            encoder.write_key_value("encoding", encoding)?;
        }

        Ok(())
    }

    fn from_bencode(value: &BencodeValue) -> Result<Self> {
        let optional_str = |key: &[u8], name: &str| -> Result<Option<String>> {
            match value.dict_get(key) {
                None => Ok(None),
                Some(v) => v
                    .as_str()
                    .map(|s| Some(s.to_string()))
                    .ok_or_else(|| SeedError::InvalidTorrent(format!("Invalid '{}' field", name))),
            }
        };

        let announce_list = match value.dict_get(b"announce-list") {
            None => Vec::new(),
            Some(list) => list
                .as_list()
                .ok_or_else(|| {
                    SeedError::InvalidTorrent("Invalid 'announce-list' field".to_string())
                })?
                .iter()
                .map(|tier| {
                    tier.as_list()
                        .ok_or_else(|| {
                            SeedError::InvalidTorrent("Tracker tier must be a list".to_string())
                        })?
                        .iter()
                        .map(|url| {
                            url.as_str().map(String::from).ok_or_else(|| {
                                SeedError::InvalidTorrent("Invalid tracker URL".to_string())
                            })
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let creation_date = value
            .dict_get(b"creation date")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| {
                SeedError::InvalidTorrent("Missing 'creation date' field".to_string())
            })?;

        Ok(Self {
            announce: optional_str(&b"announce"[..], "announce")?,
            announce_list,
            comment: optional_str(&b"comment"[..], "comment")?,
            created_by: optional_str(&b"created by"[..], "created by")?,
            creation_date,
            encoding: optional_str(&b"encoding"[..], "encoding")?,
        })
    }
}

/// A complete single-file metainfo document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInfoDocument {
    pub fields: MetaInfoFields,
    pub info: InfoFragment,
}

impl MetaInfoDocument {
    pub fn new(config: &TorrentConfig, creation_date: i64, info: InfoFragment) -> Self {
        Self {
            fields: MetaInfoFields::from_config(config, creation_date),
            info,
        }
    }

    pub fn encode(&self) -> Result<Bytes> {
        let mut encoder = Encoder::new();
        encoder.begin_dict();
        self.fields.write_to(&mut encoder)?;
        encoder.write_string("info");
        self.info.write_to(&mut encoder)?;
        encoder.end_dict()?;
        Ok(encoder.finish()?.freeze())
    }

    /// Parse a `.torrent` document
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let value = decode(data)?;
        if value.as_dict().is_none() {
            return Err(SeedError::InvalidTorrent("Torrent must be a dict".to_string()));
        }

        let info = value
            .dict_get(b"info")
            .ok_or_else(|| SeedError::InvalidTorrent("Missing 'info' field".to_string()))?;

        Ok(Self {
            fields: MetaInfoFields::from_bencode(&value)?,
            info: InfoFragment::from_bencode(info)?,
        })
    }

    /// Info hash of this document's info dictionary
    pub fn info_hash(&self) -> Result<[u8; 20]> {
        self.info.info_hash()
    }
}

/// Info hash taken over the `info` dictionary exactly as it appears in `data`
pub fn raw_info_hash(data: &[u8]) -> Result<[u8; 20]> {
    let raw_info = raw_dict_value(data, b"info")?
        .ok_or_else(|| SeedError::InvalidTorrent("Info dict not found".to_string()))?;
    Ok(info_hash_of(raw_info))
}
