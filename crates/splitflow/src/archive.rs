//! Remote met archive client.
//!
//! The archive is an anonymous FTP server. The trait is the seam the
//! catalog builder and reconciler are written against; tests substitute an
//! in-memory archive.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use suppaftp::FtpStream;
use tracing::{debug, info};

/// Remote archive operations the pipeline needs: enumerate the configured
/// directory and fetch one file.
pub trait ArchiveClient {
    /// Raw directory-listing lines for the archive directory.
    fn list(&mut self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Fetch `remote_name` from the archive directory into `dest`.
    fn retrieve(
        &mut self,
        remote_name: &str,
        dest: &Path,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Anonymous FTP client for the met archive.
///
/// A fresh connection is made per operation, matching the sequential
/// one-file-at-a-time transfer model; the read timeout turns a stalled
/// transfer into a per-file error instead of a pipeline hang.
pub struct FtpArchive {
    host: String,
    dir: String,
    timeout: Duration,
}

impl FtpArchive {
    pub fn new(host: impl Into<String>, dir: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            dir: dir.into(),
            timeout,
        }
    }

    fn connect(&self) -> Result<FtpStream> {
        let addr = if self.host.contains(':') {
            self.host.clone()
        } else {
            format!("{}:21", self.host)
        };
        let mut ftp = FtpStream::connect(addr.as_str())
            .with_context(|| format!("Failed to connect to archive {addr}"))?;
        ftp.get_ref()
            .set_read_timeout(Some(self.timeout))
            .context("Failed to set archive read timeout")?;
        ftp.login("anonymous", "")
            .context("Anonymous login to archive failed")?;
        ftp.cwd(&self.dir)
            .with_context(|| format!("Failed to change to archive directory {}", self.dir))?;
        debug!(host = %self.host, dir = %self.dir, "connected to archive");
        Ok(ftp)
    }
}

impl ArchiveClient for FtpArchive {
    async fn list(&mut self) -> Result<Vec<String>> {
        let mut ftp = self.connect()?;
        let lines = ftp
            .list(None)
            .with_context(|| format!("Failed to list archive directory {}", self.dir))?;
        let _ = ftp.quit();
        info!(entries = lines.len(), dir = %self.dir, "listed archive directory");
        Ok(lines)
    }

    async fn retrieve(&mut self, remote_name: &str, dest: &Path) -> Result<()> {
        let mut ftp = self.connect()?;
        let buffer = ftp
            .retr_as_buffer(remote_name)
            .with_context(|| format!("Failed to retrieve {remote_name}"))?;
        let _ = ftp.quit();

        // Write to a sibling temp path first so a torn transfer never poses
        // as a cached file.
        let tmp = dest.with_extension("part");
        {
            let mut out = std::fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            out.write_all(buffer.get_ref())
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
        }
        std::fs::rename(&tmp, dest)
            .with_context(|| format!("Failed to move {} into place", dest.display()))?;

        info!(file = remote_name, dest = %dest.display(), "retrieved met file");
        Ok(())
    }
}
