//! Server-side download: fetch the chosen format (merging in audio when the
//! format is video-only) into a scratch directory and hand the finished file
//! over for streaming.

mod scratch;
mod stream;

pub use scratch::ScratchDir;
pub use stream::ScratchFile;

use crate::config::DownloadConfig;
use crate::media::{lookup_info, BackendError, DownloadRequest, FormatDescriptor, MediaBackend};
use crate::utils::{sanitize_filename, strip_extension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// File stem the backend writes to; it picks the extension itself.
const OUTPUT_STEM: &str = "download_temp";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("could not create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("format lookup failed: {0}")]
    Lookup(#[source] BackendError),

    #[error("Format ID {0} not found for URL.")]
    FormatNotFound(String),

    #[error("download failed: {source}")]
    Backend {
        #[source]
        source: BackendError,
        merge: bool,
    },

    #[error("no file matching 'download_temp.*' in {0}")]
    OutputMissing(PathBuf),

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("prepared file could not be opened: {0}")]
    Open(#[source] std::io::Error),
}

/// A caller's download request, as received.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub format_id: String,
    pub requested_name: String,
}

/// How a format gets fetched: merge decision, output extension and the
/// backend format selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub merge: bool,
    pub extension: String,
    pub selector: String,
}

impl DownloadPlan {
    pub fn for_format(format: &FormatDescriptor, format_id: &str, merge_container: &str) -> Self {
        // Video-only streams always get best audio muxed in, in the merge
        // container, whatever their native extension.
        if format.is_video_only() {
            Self {
                merge: true,
                extension: merge_container.to_string(),
                selector: format!("{}+bestaudio", format_id),
            }
        } else {
            Self {
                merge: false,
                extension: format.ext.clone().unwrap_or_else(|| "mp4".to_string()),
                selector: format_id.to_string(),
            }
        }
    }
}

/// A finished file inside its scratch directory, ready to stream.
#[derive(Debug)]
pub struct PreparedDownload {
    pub path: PathBuf,
    pub filename: String,
    pub plan: DownloadPlan,
    scratch: ScratchDir,
}

impl PreparedDownload {
    /// Opens the file for streaming. The returned reader owns the scratch
    /// directory, which is removed once the reader is dropped.
    pub async fn open(self) -> Result<(ScratchFile, u64), DownloadError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(DownloadError::Open)?;
        let len = file
            .metadata()
            .await
            .map_err(DownloadError::Open)?
            .len();
        Ok((ScratchFile::new(file, self.scratch), len))
    }
}

pub fn final_filename(requested_name: &str, extension: &str) -> String {
    format!(
        "{}.{}",
        sanitize_filename(strip_extension(requested_name)),
        extension
    )
}

/// Runs the whole download for `job`. Any error drops the scratch directory
/// before returning, so nothing is left behind on disk.
pub async fn prepare_download(
    backend: &dyn MediaBackend,
    settings: &DownloadConfig,
    job: &DownloadJob,
) -> Result<PreparedDownload, DownloadError> {
    let scratch = ScratchDir::create_in(&settings.scratch_root()).map_err(DownloadError::Scratch)?;

    let (info, profile) = lookup_info(backend, &job.url)
        .await
        .map_err(DownloadError::Lookup)?;
    let format = info
        .find_format(&job.format_id)
        .ok_or_else(|| DownloadError::FormatNotFound(job.format_id.clone()))?;

    let plan = DownloadPlan::for_format(&format, &job.format_id, &settings.merge_container);
    if plan.merge {
        info!(
            "Format {} is video-only. Will merge with best audio into .{}",
            job.format_id, plan.extension
        );
    } else {
        info!(
            "Format {} has audio or is audio-only. Direct download of .{}",
            job.format_id, plan.extension
        );
    }

    let filename = final_filename(&job.requested_name, &plan.extension);
    let request = DownloadRequest {
        selector: plan.selector.clone(),
        output_template: scratch.path().join(format!("{}.%(ext)s", OUTPUT_STEM)),
        merge_container: plan.merge.then(|| plan.extension.clone()),
        profile,
    };

    backend
        .download(&job.url, &request)
        .await
        .map_err(|source| {
            error!("{} download/merge failed: {}", backend.name(), source);
            DownloadError::Backend {
                source,
                merge: plan.merge,
            }
        })?;

    let produced = locate_output(scratch.path())
        .await
        .ok_or_else(|| DownloadError::OutputMissing(scratch.path().to_path_buf()))?;
    info!("Found temporary file: {}", produced.display());

    let path = scratch.path().join(&filename);
    tokio::fs::rename(&produced, &path)
        .await
        .map_err(|source| DownloadError::Rename {
            from: produced.clone(),
            to: path.clone(),
            source,
        })?;
    info!("Renamed temp file to final path: {}", path.display());

    Ok(PreparedDownload {
        path,
        filename,
        plan,
        scratch,
    })
}

/// Finds the backend's output file. Exactly one is expected; with more, the
/// first by name wins.
async fn locate_output(dir: &Path) -> Option<PathBuf> {
    let prefix = format!("{}.", OUTPUT_STEM);
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Could not list temp dir {}: {}", dir.display(), e);
            return None;
        }
    };

    let mut matches = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error while listing temp dir {}: {}", dir.display(), e);
                break;
            }
        };
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && entry.file_name().to_string_lossy().starts_with(&prefix) {
            matches.push(entry.path());
        }
    }
    matches.sort();

    if matches.len() > 1 {
        warn!(
            "Expected one output file in {}, found {}: {:?}",
            dir.display(),
            matches.len(),
            matches
        );
    }
    matches.into_iter().next()
}
