// Common data models for the download core

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::errors::DownloadError;

/// What a URL points at, decided by its textual form alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlKind {
    /// One video page
    Single,
    /// A playlist page
    Playlist,
    /// A channel page (may itself contain playlists)
    Channel,
}

/// Opaque external reference to a single item, playlist, or channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentIdentifier(pub String);

impl ContentIdentifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify without any network call
    pub fn kind(&self) -> UrlKind {
        if self.0.contains("/playlist?") {
            UrlKind::Playlist
        } else if self.0.contains("/channel/") || self.0.contains("/@") {
            UrlKind::Channel
        } else {
            UrlKind::Single
        }
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requested media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Video resolution labels, ordered lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    P144,
    P240,
    P360,
    P480,
    P720,
    P1080,
    P1440,
    P2160,
}

impl Resolution {
    /// Map a pixel height reported by the catalog onto a label
    pub fn from_height(height: u32) -> Option<Self> {
        match height {
            144 => Some(Self::P144),
            240 => Some(Self::P240),
            360 => Some(Self::P360),
            480 => Some(Self::P480),
            720 => Some(Self::P720),
            1080 => Some(Self::P1080),
            1440 => Some(Self::P1440),
            2160 => Some(Self::P2160),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::P144 => "144p",
            Self::P240 => "240p",
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::P1440 => "1440p",
            Self::P2160 => "2160p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Resolution {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "144p" => Ok(Self::P144),
            "240p" => Ok(Self::P240),
            "360p" => Ok(Self::P360),
            "480p" => Ok(Self::P480),
            "720p" => Ok(Self::P720),
            "1080p" => Ok(Self::P1080),
            "1440p" => Ok(Self::P1440),
            "2160p" => Ok(Self::P2160),
            other => Err(DownloadError::Parse(format!(
                "unknown resolution '{}'",
                other
            ))),
        }
    }
}

/// How a variant packages its tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// One stream carrying both video and audio
    Progressive,
    /// Video track only, needs a separate audio variant
    VideoOnly,
    /// Audio track only
    AudioOnly,
}

/// One fetchable encoded stream for a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    /// Catalog format ID (e.g. "137", "140")
    pub format_id: String,
    pub kind: StreamKind,
    /// File extension / container tag (mp4, webm, m4a, ...)
    pub container: String,
    /// Resolution label, video variants only
    pub resolution: Option<Resolution>,
    /// Audio bitrate in kbps, audio-carrying variants only
    pub abr_kbps: Option<u32>,
    /// Declared transfer size; advisory, used for progress totals
    pub byte_size: Option<u64>,
    /// Opaque fetch handle
    pub url: String,
}

/// User intent, fully specified before any catalog lookup
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub media_kind: MediaKind,
    pub container: String,
    /// Ignored for Audio requests: best available bitrate is always used
    pub resolution: Resolution,
}

impl Default for DownloadRequest {
    fn default() -> Self {
        Self {
            media_kind: MediaKind::Video,
            container: "mp4".to_string(),
            resolution: Resolution::P720,
        }
    }
}

/// Item metadata resolved by the catalog, variants in listing order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub variants: Vec<VariantDescriptor>,
}

/// Per-identifier outcome of a batch run
#[derive(Debug)]
pub struct ItemOutcome {
    pub identifier: ContentIdentifier,
    /// Known once the catalog resolved; None when resolution itself failed
    pub title: Option<String>,
    pub result: Result<PathBuf, DownloadError>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes in input order, never mutated after the batch finishes
#[derive(Debug, Default)]
pub struct BatchResult {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
