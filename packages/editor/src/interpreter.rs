//! # Input Event Interpreter
//!
//! Maps raw editing events onto mutations. The interpreter only reads the
//! document; committing is the session's job.
//!
//! ## Backspace
//!
//! | caret | block | predecessor | result |
//! |---|---|---|---|
//! | > 0 | text | any | delegated to the surface |
//! | 0 | sole text block | none | content cleared, block kept |
//! | 0 | first of many | none | ignored |
//! | 0 | text | text | merge with previous |
//! | 0 | non-empty text | image | content cleared |
//! | 0 | empty text | image | image removed |
//!
//! ## Paste / drop
//!
//! An image payload always becomes "insert image after the focused block",
//! wherever the caret is inside that block. Text payloads are left to the
//! surface.

use crate::block::{Block, BlockId, ImageSource};
use crate::config::EditorConfig;
use crate::document::BlockStore;
use crate::input::{InputEvent, Key, Payload};
use crate::mutations::Mutation;

/// Where editing currently happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Nothing focused
    Idle,

    /// Caret inside a text block
    Editing { block_id: BlockId, offset: usize },

    /// The image command was confirmed; waiting for the picker
    AwaitingImage { block_id: BlockId },
}

impl EditorState {
    pub fn focused_block(&self) -> Option<BlockId> {
        match self {
            EditorState::Idle => None,
            EditorState::Editing { block_id, .. } | EditorState::AwaitingImage { block_id } => {
                Some(*block_id)
            }
        }
    }
}

/// What to do with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Commit this mutation
    Apply(Mutation),

    /// Let the text surface handle it (typing, in-block deletion, text paste)
    Delegate,

    /// Clear the command text and wait for the picker
    RequestImage(BlockId),

    /// Picker dismissed
    CancelImageRequest(BlockId),

    /// Nothing to do
    Ignore,
}

#[derive(Debug, Clone)]
pub struct Interpreter {
    image_command: String,
}

impl Interpreter {
    pub fn new(image_command: impl Into<String>) -> Self {
        Self {
            image_command: image_command.into(),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.image_command.clone())
    }

    pub fn image_command(&self) -> &str {
        &self.image_command
    }

    pub fn interpret(&self, store: &BlockStore, state: &EditorState, event: &InputEvent) -> Interpretation {
        match event {
            InputEvent::KeyDown { key, modifiers } => match (state, key) {
                (_, Key::Other) => Interpretation::Delegate,
                (EditorState::Editing { block_id, offset }, Key::Enter) => {
                    if modifiers.shift {
                        Interpretation::Delegate
                    } else {
                        self.interpret_enter(store, *block_id, *offset)
                    }
                }
                (EditorState::Editing { block_id, offset }, Key::Backspace) => {
                    interpret_backspace(store, *block_id, *offset)
                }
                _ => Interpretation::Ignore,
            },

            InputEvent::Paste { payload } | InputEvent::Drop { payload } => match payload {
                Payload::Image { image } => insert_after_focus(store, state, image),
                Payload::Text { .. } => Interpretation::Delegate,
            },

            InputEvent::TextChanged { block_id, content } => Interpretation::Apply(Mutation::UpdateText {
                block_id: *block_id,
                content: content.clone(),
            }),

            InputEvent::ImageChosen { image } => insert_after_focus(store, state, image),

            InputEvent::ImageChoiceCancelled => match state {
                EditorState::AwaitingImage { block_id } => Interpretation::CancelImageRequest(*block_id),
                _ => Interpretation::Ignore,
            },

            InputEvent::RemoveRequested { block_id } => {
                Interpretation::Apply(Mutation::RemoveBlock { block_id: *block_id })
            }
        }
    }

    fn interpret_enter(&self, store: &BlockStore, block_id: BlockId, offset: usize) -> Interpretation {
        let Some(text) = store.get(block_id).and_then(Block::as_text) else {
            return Interpretation::Ignore;
        };

        if !self.image_command.is_empty() && text.content.trim() == self.image_command {
            return Interpretation::RequestImage(block_id);
        }

        Interpretation::Apply(Mutation::SplitText { block_id, offset })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

fn interpret_backspace(store: &BlockStore, block_id: BlockId, offset: usize) -> Interpretation {
    if offset > 0 {
        return Interpretation::Delegate;
    }

    let Some(index) = store.index_of(block_id) else {
        return Interpretation::Ignore;
    };
    let Some(current) = store.at(index).and_then(Block::as_text) else {
        return Interpretation::Ignore;
    };

    if index == 0 {
        return if store.len() == 1 && !current.is_empty() {
            Interpretation::Apply(Mutation::ClearText { block_id })
        } else {
            Interpretation::Ignore
        };
    }

    match store.at(index - 1) {
        Some(Block::Text(_)) => Interpretation::Apply(Mutation::MergeWithPrevious { block_id }),
        Some(Block::Image(_)) if !current.is_empty() => {
            Interpretation::Apply(Mutation::ClearText { block_id })
        }
        Some(Block::Image(_)) => Interpretation::Apply(Mutation::RemoveImageBefore { block_id }),
        None => Interpretation::Ignore,
    }
}

/// Insert after the focused block, or at the end when nothing has focus
fn insert_after_focus(store: &BlockStore, state: &EditorState, image: &ImageSource) -> Interpretation {
    let after = state
        .focused_block()
        .filter(|id| store.get(*id).is_some())
        .or_else(|| store.blocks().last().map(Block::id));

    match after {
        Some(after) => Interpretation::Apply(Mutation::InsertImage {
            after,
            image: image.clone(),
        }),
        None => Interpretation::Ignore,
    }
}
