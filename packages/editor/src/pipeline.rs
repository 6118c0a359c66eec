//! # Editing Pipeline
//!
//! One mutation pass: Apply → Normalize → Notify
//!
//! The Pipeline manages:
//! - Applying mutations to the document
//! - The invariant pass (inside [`Document::apply`])
//! - Firing change listeners with the normalized snapshot
//!
//! Passes never overlap. The next mutation is only applied after the
//! previous one has been committed and announced.

use crate::block::Block;
use crate::document::Document;
use crate::mutations::{Mutation, MutationError, MutationResult};
use crate::upload::UploadPatch;

type ChangeListener = Box<dyn FnMut(&[Block])>;

/// Manages the full mutate → announce pipeline
pub struct Pipeline {
    document: Document,
    listeners: Vec<ChangeListener>,
}

impl Pipeline {
    /// Create pipeline for document
    pub fn new(document: Document) -> Self {
        Self {
            document,
            listeners: Vec::new(),
        }
    }

    /// Register a listener fired after every committed change
    pub fn on_change(&mut self, listener: impl FnMut(&[Block]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Apply a mutation and announce the result
    ///
    /// No-ops and errors leave the document untouched and fire nothing.
    pub fn commit(&mut self, mutation: Mutation) -> Result<MutationResult, MutationError> {
        let result = self.document.apply(mutation)?;
        if !result.is_noop() {
            self.notify();
        }
        Ok(result)
    }

    /// Commit an upload result; structure is left alone
    pub fn commit_upload(&mut self, patch: &UploadPatch) -> bool {
        let applied = self.document.apply_upload_patch(patch);
        if applied {
            self.notify();
        }
        applied
    }

    /// Get current document
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub(crate) fn notify(&mut self) {
        let blocks = self.document.blocks();
        for listener in &mut self.listeners {
            listener(blocks);
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("document", &self.document)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
