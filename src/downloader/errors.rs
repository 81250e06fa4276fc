// Error types for the download core

use std::fmt;

#[derive(Debug, Clone)]
pub enum DownloadError {
    /// Identifier unreachable, or content removed/private
    NotFound(String),

    /// No variant of the requested kind exists at all
    Unavailable(String),

    /// Network or IO fault while streaming a variant
    Transfer(String),

    /// Muxing facility missing, or exited non-zero
    Merge(String),

    /// yt-dlp binary not found in system
    ToolNotFound(String),

    /// Failed to parse catalog JSON output
    Parse(String),

    /// URL rejected before any network call
    InvalidUrl(String),

    /// Request rejected before any network call (bad container/kind combination)
    InvalidRequest(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Content not found: {}", msg),
            Self::Unavailable(msg) => write!(f, "No matching variant: {}", msg),
            Self::Transfer(msg) => write!(f, "Transfer failed: {}", msg),
            Self::Merge(msg) => write!(f, "Merge failed: {}", msg),
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

// Classify raw subprocess stderr into an error kind
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        // Removed/private/region-locked content
        if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("404")
            || lower.contains("does not exist")
            || lower.contains("not available")
        {
            return Self::NotFound(s);
        }

        // Network faults
        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("network")
        {
            return Self::Transfer(s);
        }

        // Missing external tools
        if lower.contains("no such file") || lower.contains("command not found") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("json") || lower.contains("parse") {
            return Self::Parse(s);
        }

        if lower.contains("unsupported url") || lower.contains("invalid url") {
            return Self::InvalidUrl(s);
        }

        Self::NotFound(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unavailable_content_as_not_found() {
        let err = DownloadError::from("ERROR: Video unavailable".to_string());
        assert!(matches!(err, DownloadError::NotFound(_)));
    }

    #[test]
    fn classifies_timeouts_as_transfer() {
        let err = DownloadError::from("read timed out".to_string());
        assert!(matches!(err, DownloadError::Transfer(_)));
    }

    #[test]
    fn classifies_missing_binary_as_tool_not_found() {
        let err = DownloadError::from("sh: yt-dlp: command not found".to_string());
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }
}
