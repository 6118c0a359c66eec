//! Uploads running alongside editing

use async_trait::async_trait;
use blockpad_editor::{
    Block, EditSession, EditorConfig, ImageSource, InputEvent, Key, MemorySurface, RenderAdapter,
    ResourceRef, UploadCoordinator, UploadError, UploadStatus, Uploader,
};
use std::sync::Arc;
use std::time::Duration;

/// Uploads files, rejects anything whose name contains "broken"
struct FakeStore {
    delay: Duration,
}

#[async_trait]
impl Uploader for FakeStore {
    async fn upload(&self, source: &ImageSource) -> Result<ResourceRef, UploadError> {
        tokio::time::sleep(self.delay).await;
        match source {
            ImageSource::File { path } if path.to_string_lossy().contains("broken") => {
                Err(UploadError::Transport("connection reset".to_string()))
            }
            ImageSource::File { path } => Ok(format!("cdn://{}", path.display())),
            ImageSource::Payload { name, .. } => Ok(format!("cdn://{}", name.clone().unwrap_or_default())),
        }
    }
}

/// Crashes mid-upload
struct CrashingStore;

#[async_trait]
impl Uploader for CrashingStore {
    async fn upload(&self, _source: &ImageSource) -> Result<ResourceRef, UploadError> {
        panic!("store crashed")
    }
}

fn coordinator(delay_ms: u64) -> UploadCoordinator {
    UploadCoordinator::new(
        Arc::new(FakeStore {
            delay: Duration::from_millis(delay_ms),
        }),
        8,
    )
}

#[tokio::test]
async fn test_upload_completes_without_reordering() {
    let mut session = EditSession::new(&EditorConfig::default());
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    let first = session.document().blocks()[0].id();
    session.focus(first, 0);

    session.dispatch(&InputEvent::paste_image(ImageSource::file("/tmp/a.png")), &mut surface);
    let image_id = session.document().blocks()[1].id();

    let mut uploads = coordinator(5);
    uploads.submit_all(session.take_upload_requests());

    // Keep editing while the upload is in flight
    session.dispatch(&InputEvent::key(Key::Enter), &mut surface);
    let order_before: Vec<_> = session.document().blocks().iter().map(Block::id).collect();

    let committed = session.finish_uploads(&mut uploads).await;

    assert_eq!(committed, 1);
    let order_after: Vec<_> = session.document().blocks().iter().map(Block::id).collect();
    assert_eq!(order_before, order_after);

    let image = session.document().image(image_id).unwrap();
    assert_eq!(image.upload_status, UploadStatus::Done);
    assert_eq!(image.resource_ref.as_deref(), Some("cdn:///tmp/a.png"));
}

#[tokio::test]
async fn test_failed_upload_keeps_block_for_retry() {
    let mut session = EditSession::new(&EditorConfig::default());
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    let first = session.document().blocks()[0].id();
    session.focus(first, 0);

    session.dispatch(&InputEvent::drop_image(ImageSource::file("/tmp/broken.png")), &mut surface);
    let image_id = session.document().blocks()[1].id();

    let mut uploads = coordinator(1);
    session.finish_uploads(&mut uploads).await;

    let image = session.document().image(image_id).unwrap();
    assert_eq!(image.upload_status, UploadStatus::Failed);
    assert!(image.preview_uri.starts_with("file://"));
    assert_eq!(session.document().len(), 3);

    session.retry_upload(image_id).unwrap();
    assert_eq!(uploads.in_flight(), 0);
    session.finish_uploads(&mut uploads).await;
    assert_eq!(
        session.document().image(image_id).unwrap().upload_status,
        UploadStatus::Failed
    );
}

#[tokio::test]
async fn test_upload_for_deleted_image_is_dropped() {
    let mut session = EditSession::new(&EditorConfig::default());
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    let first = session.document().blocks()[0].id();
    session.focus(first, 0);

    session.dispatch(&InputEvent::paste_image(ImageSource::file("/tmp/a.png")), &mut surface);
    let image_id = session.document().blocks()[1].id();

    let mut uploads = coordinator(10);
    uploads.submit_all(session.take_upload_requests());
    session.dispatch(&InputEvent::RemoveRequested { block_id: image_id }, &mut surface);

    let committed = session.finish_uploads(&mut uploads).await;

    assert_eq!(committed, 0);
    assert!(session.document().get(image_id).is_none());
    assert!(session.document().blocks().iter().all(Block::is_text));
}

#[tokio::test]
async fn test_pump_commits_only_finished_uploads() {
    let mut session = EditSession::new(&EditorConfig::default());
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    let first = session.document().blocks()[0].id();
    session.focus(first, 0);
    session.dispatch(&InputEvent::paste_image(ImageSource::file("/tmp/slow.png")), &mut surface);

    let mut uploads = coordinator(50);
    assert_eq!(session.pump_uploads(&mut uploads), 0);
    assert_eq!(uploads.in_flight(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.pump_uploads(&mut uploads), 1);
    assert_eq!(uploads.in_flight(), 0);
}

#[tokio::test]
async fn test_crashed_upload_marks_image_failed() {
    let mut session = EditSession::new(&EditorConfig::default());
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    let first = session.document().blocks()[0].id();
    session.focus(first, 0);

    session.dispatch(&InputEvent::paste_image(ImageSource::file("/tmp/a.png")), &mut surface);
    let image_id = session.document().blocks()[1].id();

    let mut uploads = UploadCoordinator::new(Arc::new(CrashingStore), 8);
    let committed = tokio::time::timeout(Duration::from_secs(2), session.finish_uploads(&mut uploads))
        .await
        .expect("uploads never settled");

    assert_eq!(committed, 1);
    assert_eq!(
        session.document().image(image_id).unwrap().upload_status,
        UploadStatus::Failed
    );
    assert!(session.retry_upload(image_id).is_ok());
}
