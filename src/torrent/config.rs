use crate::error::{Result, SeedError};
use tracing::warn;
use url::Url;

/// Default bytes per piece (512 KiB)
pub const DEFAULT_PIECE_LENGTH: u64 = 512 * 1024;

/// Torrent settings as they come out of process configuration.
///
/// `tracker` is a comma-separated list of announce URLs. Empty strings mean
/// "not set".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSettings {
    pub piece_length: u64,
    pub tracker: String,
    pub origin: String,
    pub comment: String,
    pub created_by: String,
    pub encoding: String,
}

impl Default for TorrentSettings {
    fn default() -> Self {
        Self {
            piece_length: DEFAULT_PIECE_LENGTH,
            tracker: String::new(),
            origin: String::new(),
            comment: String::new(),
            created_by: String::new(),
            encoding: String::new(),
        }
    }
}

/// Validated, read-only snapshot of the torrent settings for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentConfig {
    piece_length: u64,
    tracker_list: Vec<String>,
    origin: Option<String>,
    comment: Option<String>,
    created_by: Option<String>,
    encoding: Option<String>,
}

impl TorrentConfig {
    pub fn new(piece_length: u64) -> Result<Self> {
        if piece_length == 0 {
            warn!("Rejecting torrent configuration with zero piece length");
            return Err(SeedError::Configuration(
                "piece length must be positive".to_string(),
            ));
        }

        Ok(Self {
            piece_length,
            tracker_list: Vec::new(),
            origin: None,
            comment: None,
            created_by: None,
            encoding: None,
        })
    }

    pub fn from_settings(settings: &TorrentSettings) -> Result<Self> {
        let mut config = Self::new(settings.piece_length)?
            .with_comment(&settings.comment)
            .with_created_by(&settings.created_by)
            .with_encoding(&settings.encoding);

        for tracker in parse_tracker_list(&settings.tracker) {
            config = config.with_tracker(tracker);
        }
        Ok(config.with_origin(&settings.origin))
    }

    /// Append a tracker. Any non-empty string is kept as given.
    pub fn with_tracker(mut self, url: impl Into<String>) -> Self {
        if let Some(url) = non_empty(url.into()) {
            check_url("tracker", &url);
            self.tracker_list.push(url);
        }
        self
    }

    pub fn with_origin(mut self, url: impl Into<String>) -> Self {
        self.origin = non_empty(url.into());
        if let Some(origin) = &self.origin {
            check_url("origin", origin);
        }
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = non_empty(comment.into());
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = non_empty(created_by.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = non_empty(encoding.into());
        self
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    /// Configured trackers, or the origin alone when none are configured
    pub fn trackers(&self) -> Vec<&str> {
        if self.tracker_list.is_empty() {
            return self.origin.as_deref().into_iter().collect();
        }
        self.tracker_list.iter().map(String::as_str).collect()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

impl Default for TorrentConfig {
    fn default() -> Self {
        Self {
            piece_length: DEFAULT_PIECE_LENGTH,
            tracker_list: Vec::new(),
            origin: None,
            comment: None,
            created_by: None,
            encoding: None,
        }
    }
}

/// Split a comma-separated tracker setting, dropping blank entries
pub fn parse_tracker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Trackers are announced verbatim; a value that is not a URL is only logged
fn check_url(what: &str, raw: &str) {
    if let Err(err) = Url::parse(raw) {
        warn!("Configured {} {:?} is not a valid URL: {}", what, raw, err);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
