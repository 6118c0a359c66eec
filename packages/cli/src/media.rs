//! Filesystem-backed uploads for headless runs

use async_trait::async_trait;
use blockpad_editor::{ImageSource, ResourceRef, UploadError, Uploader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// "Uploads" images by copying them into a media directory
#[derive(Debug)]
pub struct FsUploader {
    media_dir: PathBuf,
    unnamed: AtomicUsize,
}

impl FsUploader {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            unnamed: AtomicUsize::new(0),
        }
    }

    fn payload_name(&self, name: &Option<String>, mime_type: &str) -> String {
        match name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                let n = self.unnamed.fetch_add(1, Ordering::SeqCst);
                let ext = mime_type.rsplit('/').next().unwrap_or("bin");
                format!("pasted-{}.{}", n, ext)
            }
        }
    }
}

#[async_trait]
impl Uploader for FsUploader {
    async fn upload(&self, source: &ImageSource) -> Result<ResourceRef, UploadError> {
        tokio::fs::create_dir_all(&self.media_dir)
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let file_name = match source {
            ImageSource::File { path } => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| UploadError::Read(format!("{} has no file name", path.display())))?;
                tokio::fs::copy(path, self.media_dir.join(&file_name))
                    .await
                    .map_err(|e| UploadError::Read(format!("{}: {}", path.display(), e)))?;
                file_name
            }
            ImageSource::Payload {
                name,
                mime_type,
                data,
            } => {
                if data.is_empty() {
                    return Err(UploadError::Rejected("empty image payload".to_string()));
                }
                let file_name = self.payload_name(name, mime_type);
                tokio::fs::write(self.media_dir.join(&file_name), data)
                    .await
                    .map_err(|e| UploadError::Transport(e.to_string()))?;
                file_name
            }
        };

        tracing::debug!(file = %file_name, "stored image");
        Ok(format!("media/{}", file_name))
    }
}
