//! # Block Mutations
//!
//! Structural editing operations on a [`BlockStore`].
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each mutation is one discrete editing operation
//! 2. **Addressed by id**: positions shift, ids do not
//! 3. **Forgiving**: out-of-range offsets are clamped and impossible requests
//!    become no-ops, so the surface always stays renderable
//! 4. **Pure**: a mutation never touches the surface; it reports where the
//!    caret should go and leaves placement to the render layer
//!
//! ## Mutation Semantics
//!
//! ### SplitText
//! - Truncates the block at the caret and moves the tail into a new block
//! - Caret lands at offset 0 of the new block
//!
//! ### MergeWithPrevious
//! - Appends the block to its preceding text block and removes it
//! - Caret lands at the join point
//! - No-op on the first block or after an image
//!
//! ### InsertImage
//! - Inserts a pending image after the target, followed by a text block
//! - Caret lands at offset 0 of that text block
//!
//! ### RemoveBlock
//! - Removes any block; the caret moves to the nearest surviving text block
//! - Removing an image between two text blocks reports them as a [`TextSeam`]
//!
//! A request aimed at a block of the wrong kind is a no-op. Only unknown ids
//! are errors.

use crate::block::{Block, BlockId, ImageBlock, ImageSource, TextBlock};
use crate::caret::CaretPlacement;
use crate::document::BlockStore;
use crate::post_effects::{ensure_minimum_text, ensure_text_after_images, TextSeam};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discrete editing operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Mutation {
    /// Split a text block at a char offset
    #[serde(rename_all = "camelCase")]
    SplitText { block_id: BlockId, offset: usize },

    /// Merge a text block into the text block before it
    #[serde(rename_all = "camelCase")]
    MergeWithPrevious { block_id: BlockId },

    /// Insert an image after a block
    InsertImage { after: BlockId, image: ImageSource },

    /// Remove a block of either kind
    #[serde(rename_all = "camelCase")]
    RemoveBlock { block_id: BlockId },

    /// Empty a text block in place
    #[serde(rename_all = "camelCase")]
    ClearText { block_id: BlockId },

    /// Remove the image directly before a text block
    #[serde(rename_all = "camelCase")]
    RemoveImageBefore { block_id: BlockId },

    /// Replace the content of a text block (atomic replacement)
    #[serde(rename_all = "camelCase")]
    UpdateText { block_id: BlockId, content: String },

    #[serde(rename_all = "camelCase")]
    SetCaption { block_id: BlockId, caption: String },

    #[serde(rename_all = "camelCase")]
    SetAltText { block_id: BlockId, alt_text: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),
}

/// What the engine did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Changed {
        caret: Option<CaretPlacement>,
        inserted_image: Option<BlockId>,
        seam: Option<TextSeam>,
    },
    Noop {
        reason: String,
    },
}

impl MutationOutcome {
    fn changed(caret: Option<CaretPlacement>) -> Self {
        MutationOutcome::Changed {
            caret,
            inserted_image: None,
            seam: None,
        }
    }

    fn noop(reason: impl Into<String>) -> Self {
        MutationOutcome::Noop {
            reason: reason.into(),
        }
    }
}

/// Result of applying a mutation to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationResult {
    /// Mutation was applied and the document normalized
    Applied {
        version: u64,
        caret: Option<CaretPlacement>,
        inserted_image: Option<BlockId>,
    },
    /// Mutation had no effect (first block, wrong neighbour, etc.)
    Noop { version: u64, reason: String },
}

impl MutationResult {
    pub fn version(&self) -> u64 {
        match self {
            MutationResult::Applied { version, .. } | MutationResult::Noop { version, .. } => {
                *version
            }
        }
    }

    pub fn caret(&self) -> Option<CaretPlacement> {
        match self {
            MutationResult::Applied { caret, .. } => *caret,
            MutationResult::Noop { .. } => None,
        }
    }

    pub fn inserted_image(&self) -> Option<BlockId> {
        match self {
            MutationResult::Applied { inserted_image, .. } => *inserted_image,
            MutationResult::Noop { .. } => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, MutationResult::Noop { .. })
    }
}

impl Mutation {
    /// Debug name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SplitText { .. } => "split_text",
            Mutation::MergeWithPrevious { .. } => "merge_with_previous",
            Mutation::InsertImage { .. } => "insert_image",
            Mutation::RemoveBlock { .. } => "remove_block",
            Mutation::ClearText { .. } => "clear_text",
            Mutation::RemoveImageBefore { .. } => "remove_image_before",
            Mutation::UpdateText { .. } => "update_text",
            Mutation::SetCaption { .. } => "set_caption",
            Mutation::SetAltText { .. } => "set_alt_text",
        }
    }

    /// Block the mutation is addressed to
    pub fn target(&self) -> BlockId {
        match self {
            Mutation::InsertImage { after, .. } => *after,
            Mutation::SplitText { block_id, .. }
            | Mutation::MergeWithPrevious { block_id }
            | Mutation::RemoveBlock { block_id }
            | Mutation::ClearText { block_id }
            | Mutation::RemoveImageBefore { block_id }
            | Mutation::UpdateText { block_id, .. }
            | Mutation::SetCaption { block_id, .. }
            | Mutation::SetAltText { block_id, .. } => *block_id,
        }
    }

    /// Apply to the store. Invariants are re-established by the caller.
    pub fn apply(&self, store: &mut BlockStore) -> Result<MutationOutcome, MutationError> {
        match self {
            Mutation::SplitText { block_id, offset } => Self::apply_split(store, *block_id, *offset),

            Mutation::MergeWithPrevious { block_id } => Self::apply_merge(store, *block_id),

            Mutation::InsertImage { after, image } => Self::apply_insert_image(store, *after, image),

            Mutation::RemoveBlock { block_id } => Self::apply_remove(store, *block_id),

            Mutation::ClearText { block_id } => {
                let Some(text) = Self::text_mut(store, *block_id)? else {
                    return Ok(MutationOutcome::noop("block is not text"));
                };
                if text.is_empty() {
                    return Ok(MutationOutcome::noop("already empty"));
                }
                text.content.clear();
                Ok(MutationOutcome::changed(Some(CaretPlacement::start_of(*block_id))))
            }

            Mutation::RemoveImageBefore { block_id } => {
                Self::apply_remove_image_before(store, *block_id)
            }

            Mutation::UpdateText { block_id, content } => {
                let Some(text) = Self::text_mut(store, *block_id)? else {
                    return Ok(MutationOutcome::noop("block is not text"));
                };
                if text.content == *content {
                    return Ok(MutationOutcome::noop("content unchanged"));
                }
                text.content = content.clone();
                Ok(MutationOutcome::changed(None))
            }

            Mutation::SetCaption { block_id, caption } => {
                let Some(image) = Self::image_mut(store, *block_id)? else {
                    return Ok(MutationOutcome::noop("block is not an image"));
                };
                image.caption = caption.clone();
                Ok(MutationOutcome::changed(None))
            }

            Mutation::SetAltText { block_id, alt_text } => {
                let Some(image) = Self::image_mut(store, *block_id)? else {
                    return Ok(MutationOutcome::noop("block is not an image"));
                };
                image.alt_text = alt_text.clone();
                Ok(MutationOutcome::changed(None))
            }
        }
    }

    fn apply_split(
        store: &mut BlockStore,
        block_id: BlockId,
        offset: usize,
    ) -> Result<MutationOutcome, MutationError> {
        let index = Self::index(store, block_id)?;
        if !store.at(index).is_some_and(Block::is_text) {
            return Ok(MutationOutcome::noop("block is not text"));
        }
        let new_id = store.allocate_id();

        let Some(text) = Self::text_mut(store, block_id)? else {
            return Ok(MutationOutcome::noop("block is not text"));
        };
        let len = text.len();
        if offset > len {
            tracing::warn!(block = %block_id, offset, len, "split offset clamped");
        }
        let tail = text.split_off(offset.min(len));

        store.insert(index + 1, Block::Text(TextBlock::new(new_id, tail)));
        Ok(MutationOutcome::changed(Some(CaretPlacement::start_of(new_id))))
    }

    fn apply_merge(store: &mut BlockStore, block_id: BlockId) -> Result<MutationOutcome, MutationError> {
        let index = Self::index(store, block_id)?;
        if !store.at(index).is_some_and(Block::is_text) {
            return Ok(MutationOutcome::noop("block is not text"));
        }

        if index == 0 {
            return Ok(MutationOutcome::noop("first block has no predecessor"));
        }
        if !store.at(index - 1).is_some_and(Block::is_text) {
            return Ok(MutationOutcome::noop("previous block is not text"));
        }

        let Some(Block::Text(current)) = store.remove(index) else {
            return Ok(MutationOutcome::noop("block is not text"));
        };
        let Some(previous) = store.at_mut(index - 1).and_then(Block::as_text_mut) else {
            return Ok(MutationOutcome::noop("previous block is not text"));
        };

        let join = previous.len();
        previous.content.push_str(&current.content);
        Ok(MutationOutcome::changed(Some(CaretPlacement::new(previous.id, join))))
    }

    fn apply_insert_image(
        store: &mut BlockStore,
        after: BlockId,
        source: &ImageSource,
    ) -> Result<MutationOutcome, MutationError> {
        let mut index = Self::index(store, after)?;

        // Never split an image from its companion text
        if store.at(index).is_some_and(Block::is_image)
            && store.at(index + 1).is_some_and(Block::is_text)
        {
            index += 1;
        }

        let image_id = store.allocate_id();
        store.insert(index + 1, Block::Image(ImageBlock::pending(image_id, source)));

        let follower = match store.at(index + 2) {
            Some(block) if block.is_text() => block.id(),
            _ => {
                let block = store.new_text();
                let id = block.id();
                store.insert(index + 2, block);
                id
            }
        };

        Ok(MutationOutcome::Changed {
            caret: Some(CaretPlacement::start_of(follower)),
            inserted_image: Some(image_id),
            seam: None,
        })
    }

    fn apply_remove(store: &mut BlockStore, block_id: BlockId) -> Result<MutationOutcome, MutationError> {
        let index = Self::index(store, block_id)?;
        let removed = store.remove(index);
        let seam = match removed {
            Some(Block::Image(_)) if index > 0 => text_seam(store, index - 1),
            _ => None,
        };

        if let Some(caret) = ensure_minimum_text(store) {
            return Ok(MutationOutcome::changed(Some(caret)));
        }
        ensure_text_after_images(store);

        Ok(MutationOutcome::Changed {
            caret: nearest_text(store, index),
            inserted_image: None,
            seam,
        })
    }

    fn apply_remove_image_before(
        store: &mut BlockStore,
        block_id: BlockId,
    ) -> Result<MutationOutcome, MutationError> {
        let index = Self::index(store, block_id)?;
        let Some(is_empty) = Self::text_mut(store, block_id)?.map(|text| text.is_empty()) else {
            return Ok(MutationOutcome::noop("block is not text"));
        };

        if index == 0 || !store.at(index - 1).is_some_and(Block::is_image) {
            return Ok(MutationOutcome::noop("previous block is not an image"));
        }

        store.remove(index - 1);
        let index = index - 1;

        // The empty block was the image's companion; fold it into the text before
        if is_empty && index > 0 {
            if let Some(previous) = store.at(index - 1).and_then(Block::as_text) {
                let caret = CaretPlacement::new(previous.id, previous.len());
                store.remove(index);
                return Ok(MutationOutcome::changed(Some(caret)));
            }
        }

        let seam = if index > 0 { text_seam(store, index - 1) } else { None };
        Ok(MutationOutcome::Changed {
            caret: Some(CaretPlacement::start_of(block_id)),
            inserted_image: None,
            seam,
        })
    }

    fn index(store: &BlockStore, block_id: BlockId) -> Result<usize, MutationError> {
        store
            .index_of(block_id)
            .ok_or(MutationError::BlockNotFound(block_id))
    }

    /// `None` when the block exists but is an image
    fn text_mut(store: &mut BlockStore, block_id: BlockId) -> Result<Option<&mut TextBlock>, MutationError> {
        Ok(store
            .get_mut(block_id)
            .ok_or(MutationError::BlockNotFound(block_id))?
            .as_text_mut())
    }

    /// `None` when the block exists but is text
    fn image_mut(store: &mut BlockStore, block_id: BlockId) -> Result<Option<&mut ImageBlock>, MutationError> {
        Ok(store
            .get_mut(block_id)
            .ok_or(MutationError::BlockNotFound(block_id))?
            .as_image_mut())
    }
}

/// Text blocks at `index` and `index + 1`, if both are text
fn text_seam(store: &BlockStore, index: usize) -> Option<TextSeam> {
    let before = store.at(index).filter(|b| b.is_text())?;
    let after = store.at(index + 1).filter(|b| b.is_text())?;
    Some(TextSeam {
        before: before.id(),
        after: after.id(),
    })
}

/// Nearest text block to a removed position.
///
/// Prefers blocks at or before `index`, scanning backwards; falls back to
/// the first text block after it. A block before the removed slot gets the
/// caret at its end, anything else at its start.
fn nearest_text(store: &BlockStore, index: usize) -> Option<CaretPlacement> {
    let blocks = store.blocks();
    let start = index.min(blocks.len().checked_sub(1)?);

    let before = (0..=start)
        .rev()
        .find_map(|i| blocks[i].as_text().map(|text| (i, text)));
    let found = before.or_else(|| {
        blocks
            .iter()
            .enumerate()
            .skip(start + 1)
            .find_map(|(i, b)| b.as_text().map(|text| (i, text)))
    })?;

    let (i, text) = found;
    let offset = if i < index { text.len() } else { 0 };
    Some(CaretPlacement::new(text.id, offset))
}
