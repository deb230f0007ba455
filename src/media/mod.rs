mod backend;
mod errors;
mod formats;
#[cfg(test)]
pub mod testing;
mod types;
mod ytdlp;

pub use backend::{DownloadRequest, MediaBackend};
pub use errors::{user_message, BackendError};
pub use formats::extract_formats;
pub use types::{ExtractedFormats, FormatDescriptor};
pub use ytdlp::YtDlpBackend;

use backend::ClientProfile;
use tracing::{info, warn};
use types::MediaInfo;

/// Fetches info for `url`. A bot challenge gets exactly one more attempt
/// with the alternate client profile; every other failure is returned as is.
/// Also returns the profile that succeeded so later calls can reuse it.
pub async fn lookup_info(
    backend: &dyn MediaBackend,
    url: &str,
) -> Result<(MediaInfo, ClientProfile), BackendError> {
    match backend.fetch_info(url, ClientProfile::Default).await {
        Ok(info) => Ok((info, ClientProfile::Default)),
        Err(e) if e.is_bot_challenge() => {
            warn!(
                "{} hit a bot challenge for {}, retrying once with the alternate client",
                backend.name(),
                url
            );
            let info = backend.fetch_info(url, ClientProfile::Alternate).await?;
            info!("Alternate client succeeded for {}", url);
            Ok((info, ClientProfile::Alternate))
        }
        Err(e) => Err(e),
    }
}
