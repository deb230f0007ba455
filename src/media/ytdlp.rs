use super::{
    backend::{ClientProfile, DownloadRequest, MediaBackend},
    errors::BackendError,
    types::MediaInfo,
};
use crate::config::BackendConfig;
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct YtDlpBackend {
    config: BackendConfig,
}

impl YtDlpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn profile_args(&self, profile: ClientProfile) -> Vec<OsString> {
        match profile {
            ClientProfile::Default => Vec::new(),
            ClientProfile::Alternate => vec![
                "--extractor-args".into(),
                format!("youtube:player_client={}", self.config.alternate_player_client).into(),
            ],
        }
    }

    fn info_args(&self, url: &str, profile: ClientProfile) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--dump-single-json".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--skip-download".into(),
        ];
        args.extend(self.profile_args(profile));
        args.push("--".into());
        args.push(url.into());
        args
    }

    fn download_args(&self, url: &str, request: &DownloadRequest) -> Vec<OsString> {
        let retries = self.config.fragment_retries.to_string();
        let mut args: Vec<OsString> = vec![
            "--format".into(),
            request.selector.clone().into(),
            "--output".into(),
            request.output_template.clone().into_os_string(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--no-progress".into(),
            "--socket-timeout".into(),
            self.config.socket_timeout_secs.to_string().into(),
            "--retries".into(),
            retries.clone().into(),
            "--fragment-retries".into(),
            retries.into(),
        ];
        if let Some(container) = &request.merge_container {
            args.push("--merge-output-format".into());
            args.push(container.into());
        }
        args.extend(self.profile_args(request.profile));
        args.push("--".into());
        args.push(url.into());
        args
    }

    async fn run(&self, args: Vec<OsString>, deadline: Duration) -> Result<Output, BackendError> {
        debug!("Running {} {:?}", self.config.binary, args);
        let launch_error = |source: std::io::Error| BackendError::Launch {
            binary: self.config.binary.clone(),
            source,
        };

        let mut command = Command::new(&self.config.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own group, so ffmpeg children can be killed along with yt-dlp.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(launch_error)?;
        let mut group = ProcessGroup::new(child.id());

        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!("{} timed out after {:?}, killing it", self.config.binary, deadline);
                BackendError::TimedOut(deadline)
            })?
            .map_err(launch_error)?;
        group.disarm();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.config.binary, output.status)
            } else {
                stderr
            };
            return Err(BackendError::Failed(message));
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_info(
        &self,
        url: &str,
        profile: ClientProfile,
    ) -> Result<MediaInfo, BackendError> {
        debug!("Extracting metadata with yt-dlp ({:?} client) for: {}", profile, url);

        let output = self
            .run(self.info_args(url, profile), self.config.info_timeout())
            .await?;
        let info: MediaInfo = serde_json::from_slice(&output.stdout)?;

        debug!(
            "yt-dlp returned {} formats for {}",
            info.formats.len(),
            url
        );
        Ok(info)
    }

    async fn download(&self, url: &str, request: &DownloadRequest) -> Result<(), BackendError> {
        info!(
            "Downloading {} with selector '{}' to {}",
            url,
            request.selector,
            request.output_template.display()
        );

        self.run(self.download_args(url, request), self.config.download_timeout())
            .await?;
        Ok(())
    }

    async fn test_availability(&self) -> bool {
        let yt_dlp_available = match probe(&self.config.binary, "--version").await {
            Ok(version) => {
                info!("✅ yt-dlp is available, version: {}", version);
                true
            }
            Err(e) => {
                warn!("❌ yt-dlp not usable: {}", e);
                false
            }
        };

        // ffmpeg is needed to merge video-only formats with audio
        let ffmpeg_available = match probe("ffmpeg", "-version").await {
            Ok(version) => {
                info!("✅ ffmpeg is available: {}", version);
                true
            }
            Err(e) => {
                warn!("❌ ffmpeg not usable: {} (required for video merging)", e);
                false
            }
        };

        if yt_dlp_available && !ffmpeg_available {
            warn!("⚠️  Downloads will work but video-only formats cannot be merged with audio");
        }

        yt_dlp_available
    }
}

/// Kills the whole process group of a running backend when dropped, unless
/// the process was seen to exit. `kill_on_drop` only reaches the direct child.
struct ProcessGroup {
    pid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!("Killed process group {}", pid),
        Err(e) => debug!("Process group {} not killed: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Runs `binary flag` and returns the first line of its output.
async fn probe(binary: &str, flag: &str) -> Result<String, String> {
    let output = Command::new(binary)
        .arg(flag)
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(format!("{} {} exited with {}", binary, flag, output.status));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("unknown")
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn backend() -> YtDlpBackend {
        YtDlpBackend::new(BackendConfig::default())
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_info_args() {
        let args = strings(&backend().info_args("https://youtu.be/abc", ClientProfile::Default));
        assert_eq!(
            args,
            vec![
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--skip-download",
                "--",
                "https://youtu.be/abc"
            ]
        );
    }

    #[test]
    fn test_alternate_profile_adds_player_client() {
        let args = strings(&backend().info_args("https://youtu.be/abc", ClientProfile::Alternate));
        let idx = args.iter().position(|a| a == "--extractor-args").unwrap();
        assert_eq!(args[idx + 1], "youtube:player_client=tv,web_safari");
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
    }

    #[test]
    fn test_download_args_with_merge() {
        let request = DownloadRequest {
            selector: "137+bestaudio".to_string(),
            output_template: PathBuf::from("/tmp/job/download_temp.%(ext)s"),
            merge_container: Some("mkv".to_string()),
            profile: ClientProfile::Default,
        };
        let args = strings(&backend().download_args("https://youtu.be/abc", &request));

        let value_of = |flag: &str| {
            let idx = args.iter().position(|a| a == flag).unwrap();
            args[idx + 1].clone()
        };
        assert_eq!(value_of("--format"), "137+bestaudio");
        assert_eq!(value_of("--output"), "/tmp/job/download_temp.%(ext)s");
        assert_eq!(value_of("--merge-output-format"), "mkv");
        assert_eq!(value_of("--socket-timeout"), "60");
        assert_eq!(value_of("--fragment-retries"), "3");
        assert!(!args.contains(&"--extractor-args".to_string()));
    }

    #[test]
    fn test_download_args_without_merge() {
        let request = DownloadRequest {
            selector: "18".to_string(),
            output_template: PathBuf::from("/tmp/job/download_temp.%(ext)s"),
            merge_container: None,
            profile: ClientProfile::Alternate,
        };
        let args = strings(&backend().download_args("https://youtu.be/abc", &request));
        assert!(!args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"--extractor-args".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let backend = YtDlpBackend::new(BackendConfig {
            binary: "/nonexistent/yt-dlp-binary".to_string(),
            ..Default::default()
        });
        let err = backend
            .fetch_info("https://youtu.be/abc", ClientProfile::Default)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Launch { .. }));
        assert!(!err.is_content_error());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_backend_children() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("child-survived");
        let script = dir.path().join("fake-yt-dlp");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\n(sleep 2; touch '{}') &\nsleep 30\n",
                marker.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = YtDlpBackend::new(BackendConfig {
            binary: script.to_string_lossy().into_owned(),
            info_timeout_secs: 1,
            ..Default::default()
        });
        let err = backend
            .fetch_info("https://youtu.be/abc", ClientProfile::Default)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::TimedOut(_)));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists(), "background child outlived the timeout");
    }

    #[tokio::test]
    #[ignore = "Requires yt-dlp and network access"]
    async fn test_fetch_info_live() {
        let info = backend()
            .fetch_info("https://www.youtube.com/watch?v=jNQXAC9IVRw", ClientProfile::Default)
            .await
            .unwrap();
        assert!(!info.formats.is_empty());
    }
}
