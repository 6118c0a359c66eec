//! # Edit Session Management
//!
//! An EditSession is the single owner of one document being edited. It
//! ties together the interpreter, the pipeline and the render adapter:
//!
//! ```text
//! event → interpret → commit (apply + normalize + notify) → caret → adapter
//! ```
//!
//! Each event is fully committed before the next one is looked at. Upload
//! results arrive out of band and are committed between events.

use crate::block::{Block, BlockId, ImageSource};
use crate::caret::{CaretPlacement, PendingCaret};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::errors::EditorError;
use crate::input::InputEvent;
use crate::interpreter::{EditorState, Interpretation, Interpreter};
use crate::mutations::{Mutation, MutationError, MutationResult};
use crate::pipeline::Pipeline;
use crate::post_effects::PostEffectEngine;
use crate::render::RenderAdapter;
use crate::upload::{UploadCoordinator, UploadPatch, UploadRequest};
use std::collections::{HashMap, HashSet};

/// How an event was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// A mutation was committed
    Committed { version: u64 },

    /// The mutation turned out to be a no-op
    Unchanged { reason: String },

    /// Left to the text surface
    Delegated,

    /// Image command confirmed; waiting for a file
    AwaitingImage,

    /// Image request dismissed; caret returned to the block
    Refocused,

    Ignored,

    /// The request addressed a block that cannot take it
    Rejected(MutationError),
}

/// Single edit session over one document
pub struct EditSession {
    pipeline: Pipeline,
    interpreter: Interpreter,
    state: EditorState,
    pending_caret: PendingCaret,

    /// Images waiting for an upload to be started
    upload_queue: Vec<UploadRequest>,

    /// Sources of images whose upload has not succeeded yet, kept for retries
    sources: HashMap<BlockId, ImageSource>,
}

impl EditSession {
    /// Create a session over a fresh document
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_document(Document::with_effects(PostEffectEngine::from_config(config)), config)
    }

    /// Create a session over an existing document
    pub fn with_document(document: Document, config: &EditorConfig) -> Self {
        Self {
            pipeline: Pipeline::new(document),
            interpreter: Interpreter::from_config(config),
            state: EditorState::Idle,
            pending_caret: PendingCaret::new(),
            upload_queue: Vec::new(),
            sources: HashMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        self.pipeline.document()
    }

    /// Ordered, id-stable snapshot for persistence
    pub fn get_document(&self) -> Vec<Block> {
        self.pipeline.document().get_document()
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Register a listener fired after every committed change
    pub fn on_change(&mut self, listener: impl FnMut(&[Block]) + 'static) {
        self.pipeline.on_change(listener);
    }

    /// The user put the caret into a block
    pub fn focus(&mut self, block_id: BlockId, offset: usize) {
        if self.document().text(block_id).is_some() {
            self.state = EditorState::Editing { block_id, offset };
        }
    }

    /// Focus left the editor
    pub fn blur(&mut self) {
        self.state = EditorState::Idle;
    }

    /// Interpret and commit one event
    ///
    /// The caret instruction produced by the pass is held until
    /// [`flush_caret`](Self::flush_caret) or [`take_pending_caret`](Self::take_pending_caret).
    pub fn handle_event<A: RenderAdapter + ?Sized>(&mut self, event: &InputEvent, adapter: &A) -> Handled {
        self.refresh_state(adapter);

        let interpretation = self
            .interpreter
            .interpret(self.pipeline.document().store(), &self.state, event);

        match interpretation {
            Interpretation::Apply(mutation) => self.commit(mutation),
            Interpretation::Delegate => Handled::Delegated,
            Interpretation::Ignore => Handled::Ignored,
            Interpretation::RequestImage(block_id) => {
                match self.commit(Mutation::ClearText { block_id }) {
                    Handled::Committed { .. } => {
                        self.state = EditorState::AwaitingImage { block_id };
                        Handled::AwaitingImage
                    }
                    other => other,
                }
            }
            Interpretation::CancelImageRequest(block_id) => {
                self.state = EditorState::Editing { block_id, offset: 0 };
                self.pending_caret.set(CaretPlacement::start_of(block_id));
                Handled::Refocused
            }
        }
    }

    /// Handle an event, repaint, and place the caret
    pub fn dispatch<A: RenderAdapter + ?Sized>(&mut self, event: &InputEvent, adapter: &mut A) -> Handled {
        let version = self.document().version;
        let handled = self.handle_event(event, adapter);
        if self.document().version != version {
            adapter.sync(self.pipeline.document().blocks());
        }
        self.flush_caret(adapter);
        handled
    }

    /// Hand the pending caret instruction to the adapter, once
    pub fn flush_caret<A: RenderAdapter + ?Sized>(&mut self, adapter: &mut A) -> Option<CaretPlacement> {
        let caret = self.pending_caret.take()?;
        adapter.focus(caret.block_id, caret.offset);
        Some(caret)
    }

    /// Consume the pending caret instruction without an adapter
    pub fn take_pending_caret(&mut self) -> Option<CaretPlacement> {
        self.pending_caret.take()
    }

    /// Uploads to start; each request is handed out once
    pub fn take_upload_requests(&mut self) -> Vec<UploadRequest> {
        std::mem::take(&mut self.upload_queue)
    }

    /// Commit an upload result
    pub fn apply_upload_patch(&mut self, patch: &UploadPatch) -> bool {
        let applied = self.pipeline.commit_upload(patch);
        if applied && patch.outcome.is_ok() {
            self.sources.remove(&patch.block_id);
        }
        applied
    }

    /// Re-queue a failed upload
    pub fn retry_upload(&mut self, block_id: BlockId) -> Result<(), EditorError> {
        let source = self
            .sources
            .get(&block_id)
            .cloned()
            .ok_or(EditorError::UploadNotRetryable(block_id))?;

        if !self.pipeline.document_mut().mark_upload_pending(block_id) {
            return Err(EditorError::UploadNotRetryable(block_id));
        }
        self.pipeline.notify();

        tracing::info!(block = %block_id, "retrying upload");
        self.upload_queue.push(UploadRequest { block_id, source });
        Ok(())
    }

    /// Start queued uploads and commit any that already finished
    pub fn pump_uploads(&mut self, coordinator: &mut UploadCoordinator) -> usize {
        coordinator.submit_all(self.take_upload_requests());

        let mut committed = 0;
        while let Some(patch) = coordinator.try_next() {
            if self.apply_upload_patch(&patch) {
                committed += 1;
            }
        }
        committed
    }

    /// Start queued uploads and wait for every one in flight
    pub async fn finish_uploads(&mut self, coordinator: &mut UploadCoordinator) -> usize {
        coordinator.submit_all(self.take_upload_requests());

        let mut committed = 0;
        while let Some(patch) = coordinator.next().await {
            if self.apply_upload_patch(&patch) {
                committed += 1;
            }
        }
        committed
    }

    /// Apply a mutation directly, outside of event interpretation
    pub fn apply(&mut self, mutation: Mutation) -> Handled {
        self.commit(mutation)
    }

    fn commit(&mut self, mutation: Mutation) -> Handled {
        let source = match &mutation {
            Mutation::InsertImage { image, .. } => Some(image.clone()),
            _ => None,
        };

        match self.pipeline.commit(mutation) {
            Ok(MutationResult::Applied {
                version,
                caret,
                inserted_image,
            }) => {
                if let Some(caret) = caret {
                    self.pending_caret.set(caret);
                    self.state = EditorState::Editing {
                        block_id: caret.block_id,
                        offset: caret.offset,
                    };
                }
                if let (Some(block_id), Some(source)) = (inserted_image, source) {
                    self.sources.insert(block_id, source.clone());
                    self.upload_queue.push(UploadRequest { block_id, source });
                }
                self.drop_stale_focus();
                Handled::Committed { version }
            }
            Ok(MutationResult::Noop { reason, .. }) => Handled::Unchanged { reason },
            Err(e) => {
                tracing::warn!(error = %e, "mutation rejected");
                Handled::Rejected(e)
            }
        }
    }

    /// Pick up the caret offset the surface currently reports
    fn refresh_state<A: RenderAdapter + ?Sized>(&mut self, adapter: &A) {
        self.drop_stale_focus();
        if let EditorState::Editing { block_id, offset } = self.state {
            let offset = adapter.caret_offset(block_id).unwrap_or(offset);
            self.state = EditorState::Editing { block_id, offset };
        }
    }

    fn drop_stale_focus(&mut self) {
        if let Some(id) = self.state.focused_block() {
            if self.document().get(id).is_none() {
                self.state = EditorState::Idle;
            }
        }
        if self.sources.is_empty() {
            return;
        }
        let live: HashSet<BlockId> = self.pipeline.document().blocks().iter().map(Block::id).collect();
        self.sources.retain(|id, _| live.contains(id));
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("pipeline", &self.pipeline)
            .field("state", &self.state)
            .field("pending_caret", &self.pending_caret)
            .field("queued_uploads", &self.upload_queue.len())
            .finish()
    }
}
