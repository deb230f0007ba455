//! Scriptable in-process backend for tests.

pub use super::backend::ClientProfile;

use super::{
    backend::{DownloadRequest, MediaBackend},
    errors::BackendError,
    types::MediaInfo,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

/// What the fake does when asked to download.
#[derive(Debug, Clone)]
pub enum FakeDownload {
    /// Write `download_temp.<ext>` with the given contents.
    Produce { ext: String, contents: Vec<u8> },
    /// Report a backend failure with this stderr.
    Fail(String),
    /// Report success without writing anything.
    NoOutput,
    /// Write the output, then occupy `final_name` with a non-empty
    /// directory so the rename onto it fails.
    BlockRename { ext: String, final_name: String },
}

pub struct FakeBackend {
    info: Mutex<VecDeque<Result<Value, String>>>,
    download: FakeDownload,
    info_calls: Mutex<Vec<ClientProfile>>,
    download_calls: Mutex<Vec<DownloadRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            info: Mutex::new(VecDeque::new()),
            download: FakeDownload::Produce {
                ext: "mp4".to_string(),
                contents: b"fake media".to_vec(),
            },
            info_calls: Mutex::new(Vec::new()),
            download_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_info(self, info: Value) -> Self {
        self.info.lock().unwrap().push_back(Ok(info));
        self
    }

    pub fn push_info_error(self, stderr: &str) -> Self {
        self.info.lock().unwrap().push_back(Err(stderr.to_string()));
        self
    }

    pub fn with_download(mut self, download: FakeDownload) -> Self {
        self.download = download;
        self
    }

    pub fn info_calls(&self) -> Vec<ClientProfile> {
        self.info_calls.lock().unwrap().clone()
    }

    pub fn download_calls(&self) -> Vec<DownloadRequest> {
        self.download_calls.lock().unwrap().clone()
    }
}

fn resolve_template(request: &DownloadRequest, ext: &str) -> PathBuf {
    PathBuf::from(
        request
            .output_template
            .to_string_lossy()
            .replace("%(ext)s", ext),
    )
}

#[async_trait]
impl MediaBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_info(
        &self,
        _url: &str,
        profile: ClientProfile,
    ) -> Result<MediaInfo, BackendError> {
        self.info_calls.lock().unwrap().push(profile);
        let next = self.info.lock().unwrap().pop_front();
        match next {
            Some(Ok(value)) => Ok(serde_json::from_value(value)?),
            Some(Err(stderr)) => Err(BackendError::Failed(stderr)),
            None => Err(BackendError::Failed("no scripted info left".to_string())),
        }
    }

    async fn download(&self, _url: &str, request: &DownloadRequest) -> Result<(), BackendError> {
        self.download_calls.lock().unwrap().push(request.clone());

        let write = |ext: &str, contents: &[u8]| {
            std::fs::write(resolve_template(request, ext), contents)
                .map_err(|e| BackendError::Failed(e.to_string()))
        };

        match &self.download {
            FakeDownload::Produce { ext, contents } => write(ext, contents),
            FakeDownload::Fail(stderr) => Err(BackendError::Failed(stderr.clone())),
            FakeDownload::NoOutput => Ok(()),
            FakeDownload::BlockRename { ext, final_name } => {
                write(ext, b"fake media")?;
                let parent = request
                    .output_template
                    .parent()
                    .ok_or_else(|| BackendError::Failed("template has no parent".into()))?;
                let blocker = parent.join(final_name);
                std::fs::create_dir(&blocker)
                    .and_then(|_| std::fs::write(blocker.join("occupied"), b"x"))
                    .map_err(|e| BackendError::Failed(e.to_string()))
            }
        }
    }

    async fn test_availability(&self) -> bool {
        true
    }
}
