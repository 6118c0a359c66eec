//! # Image Uploads
//!
//! Uploading runs off the editing loop. Each inserted image produces an
//! [`UploadRequest`]; the [`UploadCoordinator`] runs it on a tokio task and
//! hands the result back as an [`UploadPatch`]. Patches are committed by the
//! session between events and only ever touch `resource_ref` and
//! `upload_status` of the block they name.

use crate::block::{BlockId, ImageSource, ResourceRef};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Failed to read image: {0}")]
    Read(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Upload transport failed: {0}")]
    Transport(String),
}

/// Upload collaborator
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, source: &ImageSource) -> Result<ResourceRef, UploadError>;
}

/// Image waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub block_id: BlockId,
    pub source: ImageSource,
}

/// Single-field write-back for an image block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPatch {
    pub block_id: BlockId,
    pub outcome: Result<ResourceRef, UploadError>,
}

/// Runs uploads concurrently and collects their patches
pub struct UploadCoordinator {
    uploader: Arc<dyn Uploader>,
    sender: mpsc::Sender<UploadPatch>,
    receiver: mpsc::Receiver<UploadPatch>,
    in_flight: usize,
}

impl UploadCoordinator {
    pub fn new(uploader: Arc<dyn Uploader>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            uploader,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Start an upload on the current tokio runtime
    pub fn submit(&mut self, request: UploadRequest) {
        let uploader = Arc::clone(&self.uploader);
        let sender = self.sender.clone();
        self.in_flight += 1;

        tracing::info!(block = %request.block_id, "upload started");
        tokio::spawn(async move {
            let UploadRequest { block_id, source } = request;

            // A panicking uploader still reports back, as a failed upload
            let upload = tokio::spawn(async move { uploader.upload(&source).await });
            let outcome = match upload.await {
                Ok(outcome) => outcome,
                Err(e) => Err(UploadError::Transport(format!("upload task failed: {}", e))),
            };

            if let Err(e) = &outcome {
                tracing::warn!(block = %block_id, error = %e, "upload failed");
            }
            // Receiver dropped means the session is gone
            let _ = sender.send(UploadPatch { block_id, outcome }).await;
        });
    }

    pub fn submit_all(&mut self, requests: impl IntoIterator<Item = UploadRequest>) {
        for request in requests {
            self.submit(request);
        }
    }

    /// Finished upload, if one is ready
    pub fn try_next(&mut self) -> Option<UploadPatch> {
        let patch = self.receiver.try_recv().ok()?;
        self.in_flight -= 1;
        Some(patch)
    }

    /// Wait for the next finished upload; `None` when nothing is in flight
    pub async fn next(&mut self) -> Option<UploadPatch> {
        if self.in_flight == 0 {
            return None;
        }
        let patch = self.receiver.recv().await?;
        self.in_flight -= 1;
        Some(patch)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
