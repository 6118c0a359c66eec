//! # Post-Effect System
//!
//! Every mutation is followed by a normalization pass that keeps the
//! document structurally valid:
//!
//! - **Minimum text**: the document always contains at least one text block
//! - **Text after images**: every image is immediately followed by a text block
//!
//! Callers never see a violation as an error; the pass simply repairs it.
//!
//! Post-effects are:
//! - **Idempotent**: running a pass twice changes nothing the second time
//! - **Local**: they only add blocks, never reorder existing ones
//! - **Caret-aware**: a repair that invalidates the caret re-targets it
//!
//! With `mergeAdjacentText` enabled, removing an image between two text
//! blocks also folds those two blocks together. That fold is scoped to the
//! [`TextSeam`] the removal reports; other adjacent text blocks are left alone.

use crate::block::{Block, BlockId};
use crate::caret::CaretPlacement;
use crate::config::EditorConfig;
use crate::document::BlockStore;

/// Repair pass run after a mutation
pub trait PostEffect: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Repair the store in place and return where the caret should go
    fn run(&self, store: &mut BlockStore, caret: Option<CaretPlacement>) -> Option<CaretPlacement>;
}

/// Replace a text-less document with a single empty text block.
///
/// Returns a caret request for the new block when it had to act.
pub fn ensure_minimum_text(store: &mut BlockStore) -> Option<CaretPlacement> {
    if store.blocks().iter().any(Block::is_text) {
        return None;
    }

    store.clear();
    let block = store.new_text();
    let caret = CaretPlacement::start_of(block.id());
    store.push(block);
    Some(caret)
}

/// Insert an empty text block after every image that lacks one.
///
/// Returns the number of blocks inserted.
pub fn ensure_text_after_images(store: &mut BlockStore) -> usize {
    let mut inserted = 0;
    let mut i = 0;

    while i < store.len() {
        let needs_text = store.at(i).is_some_and(Block::is_image)
            && !store.at(i + 1).is_some_and(Block::is_text);

        if needs_text {
            let block = store.new_text();
            store.insert(i + 1, block);
            inserted += 1;
        }
        i += 1;
    }

    inserted
}

/// Keeps at least one text block in the document
#[derive(Debug)]
pub struct EnsureMinimumText;

impl PostEffect for EnsureMinimumText {
    fn name(&self) -> &'static str {
        "ensure_minimum_text"
    }

    fn run(&self, store: &mut BlockStore, caret: Option<CaretPlacement>) -> Option<CaretPlacement> {
        ensure_minimum_text(store).or(caret)
    }
}

/// Gives every image a text block right after it
#[derive(Debug)]
pub struct EnsureTextAfterImages;

impl PostEffect for EnsureTextAfterImages {
    fn name(&self) -> &'static str {
        "ensure_text_after_images"
    }

    fn run(&self, store: &mut BlockStore, caret: Option<CaretPlacement>) -> Option<CaretPlacement> {
        let inserted = ensure_text_after_images(store);
        if inserted > 0 {
            tracing::debug!(inserted, "inserted text blocks after images");
        }
        caret
    }
}

/// Two text blocks left side by side when the image between them was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSeam {
    pub before: BlockId,
    pub after: BlockId,
}

/// Fold the block after a seam into the block before it.
///
/// Acts only while both blocks are still adjacent text blocks. A caret in
/// the folded block moves to the same spot in the surviving one.
pub fn merge_text_seam(
    store: &mut BlockStore,
    seam: TextSeam,
    caret: Option<CaretPlacement>,
) -> Option<CaretPlacement> {
    let Some(index) = store.index_of(seam.before) else {
        return caret;
    };
    let adjacent = store.at(index).is_some_and(Block::is_text)
        && store
            .at(index + 1)
            .is_some_and(|b| b.is_text() && b.id() == seam.after);
    if !adjacent {
        return caret;
    }

    let Some(Block::Text(tail)) = store.remove(index + 1) else {
        return caret;
    };
    let Some(head) = store.at_mut(index).and_then(Block::as_text_mut) else {
        return caret;
    };
    let join = head.len();
    head.content.push_str(&tail.content);
    tracing::debug!(before = %seam.before, after = %seam.after, "merged text across removed image");

    match caret {
        Some(c) if c.block_id == tail.id => Some(CaretPlacement::new(head.id, join + c.offset)),
        other => other,
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,

    /// Fold text blocks that an image removal left adjacent
    merge_seams: bool,
}

impl PostEffectEngine {
    /// Create engine with the two structural effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(EnsureMinimumText), Box::new(EnsureTextAfterImages)],
            merge_seams: false,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            merge_seams: config.merge_adjacent_text,
            ..Self::new()
        }
    }

    pub fn push(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    pub fn effect_names(&self) -> Vec<&'static str> {
        self.effects.iter().map(|e| e.name()).collect()
    }

    pub fn merges_seams(&self) -> bool {
        self.merge_seams
    }

    /// Close the seam a removed image left behind, when configured to
    pub fn close_seam(
        &self,
        store: &mut BlockStore,
        seam: Option<TextSeam>,
        caret: Option<CaretPlacement>,
    ) -> Option<CaretPlacement> {
        match seam {
            Some(seam) if self.merge_seams => merge_text_seam(store, seam, caret),
            _ => caret,
        }
    }

    /// Run every effect in order, threading the caret through
    pub fn normalize(
        &self,
        store: &mut BlockStore,
        caret: Option<CaretPlacement>,
    ) -> Option<CaretPlacement> {
        self.effects
            .iter()
            .fold(caret, |caret, effect| effect.run(store, caret))
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
