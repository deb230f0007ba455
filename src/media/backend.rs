use super::{errors::BackendError, types::MediaInfo};
use async_trait::async_trait;
use std::path::PathBuf;

/// Client identity the backend presents to the video site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProfile {
    Default,
    /// Used once after the default client hits a bot challenge.
    Alternate,
}

/// What to fetch and where the backend should put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Format selector, e.g. `137+bestaudio` or `18`.
    pub selector: String,
    /// Output path template; the backend fills in `%(ext)s`.
    pub output_template: PathBuf,
    /// Container to remux into when the selector combines two streams.
    pub merge_container: Option<String>,
    /// Client identity that last succeeded for this URL.
    pub profile: ClientProfile,
}

#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Human-readable name of the backend
    fn name(&self) -> &'static str;

    /// Fetch metadata and the available formats for `url`
    async fn fetch_info(&self, url: &str, profile: ClientProfile)
        -> Result<MediaInfo, BackendError>;

    /// Download (and merge, if asked to) into `request.output_template`
    async fn download(&self, url: &str, request: &DownloadRequest) -> Result<(), BackendError>;

    /// Test if this backend and its helpers are usable on the system
    async fn test_availability(&self) -> bool;
}
