//! # Blockpad Editor
//!
//! Editing engine for documents made of interleaved text and image blocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ input: key / paste / drop / picker events   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ interpreter: event → mutation intent        │
//! │  - Enter splits, Backspace merges/clears    │
//! │  - Image payloads insert after focus        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ mutations + post_effects                    │
//! │  - Split / merge / insert / remove          │
//! │  - at least one text block                  │
//! │  - every image followed by text             │
//! │  - Caret instruction returned, not applied  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ render adapter: repaint + place caret once  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Uploads of inserted images run on tokio tasks and are written back by
//! block id, never through the structural mutation path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockpad_editor::{EditSession, EditorConfig, InputEvent, Key, MemorySurface};
//!
//! let mut session = EditSession::new(&EditorConfig::default());
//! let mut surface = MemorySurface::new();
//! surface.sync(session.document().blocks());
//!
//! let first = session.document().blocks()[0].id();
//! session.focus(first, 0);
//! session.dispatch(&InputEvent::key(Key::Enter), &mut surface);
//!
//! let snapshot = session.get_document();
//! ```

mod block;
mod caret;
mod config;
mod document;
mod errors;
mod input;
mod interpreter;
mod mutations;
mod pipeline;
mod post_effects;
mod render;
mod session;
mod upload;

pub use block::{Block, BlockId, ImageBlock, ImageSource, ResourceRef, TextBlock, UploadStatus};
pub use caret::{CaretPlacement, PendingCaret};
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use document::{BlockStore, Document};
pub use errors::EditorError;
pub use input::{InputEvent, Key, Modifiers, Payload};
pub use interpreter::{EditorState, Interpretation, Interpreter};
pub use mutations::{Mutation, MutationError, MutationOutcome, MutationResult};
pub use pipeline::Pipeline;
pub use post_effects::{
    ensure_minimum_text, ensure_text_after_images, merge_text_seam, EnsureMinimumText,
    EnsureTextAfterImages, PostEffect, PostEffectEngine, TextSeam,
};
pub use render::{MemorySurface, RenderAdapter, SurfaceRegistry, TextSurface};
pub use session::{EditSession, Handled};
pub use upload::{UploadCoordinator, UploadError, UploadPatch, UploadRequest, Uploader};
