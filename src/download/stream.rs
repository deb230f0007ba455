use super::ScratchDir;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// A file being streamed out of its scratch directory. The directory lives as
/// long as the reader, so it goes away when the response body is finished or
/// abandoned.
#[derive(Debug)]
pub struct ScratchFile {
    // Field order matters: the file is closed before the directory is removed.
    file: File,
    scratch: ScratchDir,
}

impl ScratchFile {
    pub fn new(file: File, scratch: ScratchDir) -> Self {
        Self { file, scratch }
    }

    pub fn scratch_path(&self) -> &std::path::Path {
        self.scratch.path()
    }
}

impl AsyncRead for ScratchFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}
