//! Remote uploader collaborator.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backuper_core::config::UploadConfig;

use crate::error::UploadError;

/// Transfers finished local files to the remote store.
pub trait Uploader {
    fn upload(&self, files: &[PathBuf]) -> Result<(), UploadError>;
}

/// HTTP `PUT <url>/<file name>` per file, streamed from disk.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpUploader {
    pub fn from_config(cfg: &UploadConfig) -> Self {
        Self {
            base_url: cfg.url.clone(),
            token: cfg.token.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    pub(crate) fn target_url(&self, file: &Path) -> String {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }

    fn put(&self, file: &Path) -> Result<(), UploadError> {
        let url = self.target_url(file);
        let body = File::open(file).map_err(|e| UploadError::Io {
            path: file.to_path_buf(),
            source: e,
        })?;
        let len = body
            .metadata()
            .map_err(|e| UploadError::Io {
                path: file.to_path_buf(),
                source: e,
            })?
            .len();

        let mut request = ureq::put(&url)
            .timeout(self.timeout)
            .set("Content-Type", "application/x-tar")
            .set("Content-Length", &len.to_string());
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        tracing::info!(%url, bytes = len, "uploading");
        match request.send(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(UploadError::Rejected { url, status }),
            Err(err) => Err(UploadError::Transport {
                url,
                message: err.to_string(),
            }),
        }
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, files: &[PathBuf]) -> Result<(), UploadError> {
        for file in files {
            self.put(file)?;
        }
        Ok(())
    }
}

/// Used when no remote store is configured: the bundle stays local.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipUpload;

impl Uploader for SkipUpload {
    fn upload(&self, files: &[PathBuf]) -> Result<(), UploadError> {
        for file in files {
            tracing::info!(path = %file.display(), "upload not configured; keeping local copy only");
        }
        Ok(())
    }
}
