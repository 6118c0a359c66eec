//! # Document Handle
//!
//! A Document is the ordered sequence of blocks being edited, plus the
//! bookkeeping needed to mutate it safely.
//!
//! - [`BlockStore`] owns the blocks and hands out ids. Ids are never reused,
//!   so a stale id can only ever miss, never hit the wrong block.
//! - [`Document`] wraps the store with a version counter and the invariant
//!   pass that runs after every mutation.
//!
//! ## Lifecycle
//!
//! ```text
//! new / from_blocks → apply(mutation) → normalize → snapshot
//!        ↓                  ↓               ↓           ↓
//!   [Text("")]       engine + caret    structure   Vec<Block>
//! ```

use crate::block::{Block, BlockId, ImageBlock, TextBlock, UploadStatus};
use crate::caret::CaretPlacement;
use crate::mutations::{Mutation, MutationError, MutationOutcome, MutationResult};
use crate::post_effects::PostEffectEngine;
use crate::upload::UploadPatch;

/// Ordered blocks plus id allocation
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStore {
    blocks: Vec<Block>,
    next_id: u64,
}

impl BlockStore {
    /// Empty store. Not a valid document until normalized.
    pub fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            next_id: 1,
        }
    }

    /// Adopt persisted blocks, seeding id allocation past the highest id seen
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let next_id = blocks.iter().map(|b| b.id().0).max().map_or(1, |max| max + 1);
        Self { blocks, next_id }
    }

    pub fn allocate_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Allocate an id and wrap it in an empty text block
    pub fn new_text(&mut self) -> Block {
        Block::Text(TextBlock::empty(self.allocate_id()))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    pub fn at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    /// Insert at `index`, clamped to the end
    pub fn insert(&mut self, index: usize, block: Block) {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn remove(&mut self, index: usize) -> Option<Block> {
        (index < self.blocks.len()).then(|| self.blocks.remove(index))
    }

    /// Drop every block; only the invariant pass uses this
    pub(crate) fn clear(&mut self) {
        self.blocks.clear();
    }
}

/// Editable block document
#[derive(Debug)]
pub struct Document {
    /// Current version number (increments on each committed change)
    pub version: u64,

    store: BlockStore,

    effects: PostEffectEngine,
}

impl Document {
    /// Fresh document: a single empty text block
    pub fn new() -> Self {
        Self::with_effects(PostEffectEngine::new())
    }

    pub fn with_effects(effects: PostEffectEngine) -> Self {
        Self::from_store(BlockStore::empty(), effects)
    }

    /// Load persisted blocks, repairing their structure before first use
    pub fn from_blocks(blocks: Vec<Block>, effects: PostEffectEngine) -> Self {
        Self::from_store(BlockStore::from_blocks(blocks), effects)
    }

    fn from_store(mut store: BlockStore, effects: PostEffectEngine) -> Self {
        effects.normalize(&mut store, None);
        Self {
            version: 0,
            store,
            effects,
        }
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn blocks(&self) -> &[Block] {
        self.store.blocks()
    }

    /// Ordered, id-stable snapshot for persistence
    pub fn get_document(&self) -> Vec<Block> {
        self.store.blocks().to_vec()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.store.get(id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.store.index_of(id)
    }

    pub fn text(&self, id: BlockId) -> Option<&TextBlock> {
        self.store.get(id).and_then(Block::as_text)
    }

    pub fn image(&self, id: BlockId) -> Option<&ImageBlock> {
        self.store.get(id).and_then(Block::as_image)
    }

    /// Apply a mutation, then run the invariant pass
    ///
    /// No-ops leave the version untouched. When the invariant pass has to
    /// recreate a text block, its caret request wins over the mutation's.
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, MutationError> {
        match mutation.apply(&mut self.store)? {
            MutationOutcome::Noop { reason } => {
                tracing::warn!(mutation = mutation.name(), %reason, "mutation had no effect");
                Ok(MutationResult::Noop {
                    version: self.version,
                    reason,
                })
            }
            MutationOutcome::Changed {
                caret,
                inserted_image,
                seam,
            } => {
                let caret = self.effects.normalize(&mut self.store, caret);
                let caret = self.effects.close_seam(&mut self.store, seam, caret);

                self.version += 1;
                tracing::debug!(
                    mutation = mutation.name(),
                    version = self.version,
                    blocks = self.store.len(),
                    "mutation committed"
                );
                Ok(MutationResult::Applied {
                    version: self.version,
                    caret,
                    inserted_image,
                })
            }
        }
    }

    /// Write back an upload result without touching structure
    ///
    /// Returns `false` when the block no longer exists or is not an image.
    pub fn apply_upload_patch(&mut self, patch: &UploadPatch) -> bool {
        let Some(image) = self.store.get_mut(patch.block_id).and_then(Block::as_image_mut) else {
            tracing::debug!(block = %patch.block_id, "dropping upload patch for missing image");
            return false;
        };

        match &patch.outcome {
            Ok(resource_ref) => {
                image.resource_ref = Some(resource_ref.clone());
                image.upload_status = UploadStatus::Done;
            }
            Err(_) => {
                image.upload_status = UploadStatus::Failed;
            }
        }
        self.version += 1;
        true
    }

    /// Flip a failed image back to pending ahead of a retry
    pub(crate) fn mark_upload_pending(&mut self, id: BlockId) -> bool {
        match self.store.get_mut(id).and_then(Block::as_image_mut) {
            Some(image) if image.upload_status == UploadStatus::Failed => {
                image.upload_status = UploadStatus::Pending;
                self.version += 1;
                true
            }
            _ => false,
        }
    }

    /// First text block, used to focus a freshly loaded document
    pub fn first_text(&self) -> Option<CaretPlacement> {
        self.store
            .blocks()
            .iter()
            .find(|b| b.is_text())
            .map(|b| CaretPlacement::start_of(b.id()))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
