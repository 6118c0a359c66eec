//! # Render Adapter Seam
//!
//! The render layer owns the editable surfaces. The engine only needs two
//! things from it: the caret offset inside a block, and a way to put the
//! caret somewhere.
//!
//! Surfaces are reached through a [`SurfaceRegistry`], a by-id lookup owned
//! by the adapter. Blocks never hold handles to their surfaces.

use crate::block::{Block, BlockId};
use crate::caret::CaretPlacement;
use std::collections::HashMap;

/// Editable surface the engine drives
pub trait RenderAdapter {
    /// Current caret offset inside a block, if that block has focus
    fn caret_offset(&self, block_id: BlockId) -> Option<usize>;

    /// Move focus and caret
    fn focus(&mut self, block_id: BlockId, offset: usize);

    /// Document changed; reconcile surfaces with the new block list
    fn sync(&mut self, _blocks: &[Block]) {}
}

/// Back-references from block ids to surface handles
#[derive(Debug)]
pub struct SurfaceRegistry<H> {
    handles: HashMap<BlockId, H>,
}

impl<H> SurfaceRegistry<H> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Register a handle, returning the one it replaced
    pub fn register(&mut self, id: BlockId, handle: H) -> Option<H> {
        self.handles.insert(id, handle)
    }

    pub fn unregister(&mut self, id: BlockId) -> Option<H> {
        self.handles.remove(&id)
    }

    pub fn get(&self, id: BlockId) -> Option<&H> {
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut H> {
        self.handles.get_mut(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drop handles whose block is gone; create missing ones with `make`
    pub fn reconcile(&mut self, blocks: &[Block], mut make: impl FnMut(&Block) -> Option<H>) {
        self.handles
            .retain(|id, _| blocks.iter().any(|b| b.id() == *id));

        for block in blocks {
            if !self.handles.contains_key(&block.id()) {
                if let Some(handle) = make(block) {
                    self.handles.insert(block.id(), handle);
                }
            }
        }
    }
}

impl<H> Default for SurfaceRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Headless stand-in for a text surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSurface {
    pub content: String,
    pub caret: usize,
}

/// In-memory adapter, used by tests and the CLI
#[derive(Debug, Default)]
pub struct MemorySurface {
    surfaces: SurfaceRegistry<TextSurface>,
    focused: Option<BlockId>,
    focus_log: Vec<CaretPlacement>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<CaretPlacement> {
        let id = self.focused?;
        let surface = self.surfaces.get(id)?;
        Some(CaretPlacement::new(id, surface.caret))
    }

    /// Every `focus` call received, in order
    pub fn focus_log(&self) -> &[CaretPlacement] {
        &self.focus_log
    }

    pub fn surface(&self, id: BlockId) -> Option<&TextSurface> {
        self.surfaces.get(id)
    }

    /// Move the caret the way a user click or arrow key would
    pub fn place_caret(&mut self, block_id: BlockId, offset: usize) {
        if let Some(surface) = self.surfaces.get_mut(block_id) {
            surface.caret = offset.min(surface.content.chars().count());
            self.focused = Some(block_id);
        }
    }

    /// Type at the caret; returns the new content for the engine to commit
    pub fn type_text(&mut self, text: &str) -> Option<(BlockId, String)> {
        let id = self.focused?;
        let surface = self.surfaces.get_mut(id)?;

        let at = crate::block::byte_index(&surface.content, surface.caret);
        surface.content.insert_str(at, text);
        surface.caret += text.chars().count();
        Some((id, surface.content.clone()))
    }

    /// Delete the char before the caret, as a surface does for in-block Backspace
    pub fn delete_backward(&mut self) -> Option<(BlockId, String)> {
        let id = self.focused?;
        let surface = self.surfaces.get_mut(id)?;
        if surface.caret == 0 {
            return None;
        }

        let start = crate::block::byte_index(&surface.content, surface.caret - 1);
        let end = crate::block::byte_index(&surface.content, surface.caret);
        surface.content.replace_range(start..end, "");
        surface.caret -= 1;
        Some((id, surface.content.clone()))
    }
}

impl RenderAdapter for MemorySurface {
    fn caret_offset(&self, block_id: BlockId) -> Option<usize> {
        if self.focused != Some(block_id) {
            return None;
        }
        self.surfaces.get(block_id).map(|s| s.caret)
    }

    fn focus(&mut self, block_id: BlockId, offset: usize) {
        self.focus_log.push(CaretPlacement::new(block_id, offset));
        self.place_caret(block_id, offset);
    }

    fn sync(&mut self, blocks: &[Block]) {
        self.surfaces.reconcile(blocks, |block| {
            block.as_text().map(|text| TextSurface {
                content: text.content.clone(),
                caret: 0,
            })
        });

        for block in blocks {
            if let (Some(text), Some(surface)) = (block.as_text(), self.surfaces.get_mut(block.id())) {
                if surface.content != text.content {
                    surface.content = text.content.clone();
                    surface.caret = surface.caret.min(text.len());
                }
            }
        }

        if self.focused.is_some_and(|id| !self.surfaces.contains(id)) {
            self.focused = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_reconcile_drops_removed_blocks() {
        let mut registry: SurfaceRegistry<u32> = SurfaceRegistry::new();
        registry.register(BlockId(1), 10);
        registry.register(BlockId(9), 90);

        registry.reconcile(&[Block::text(BlockId(1), ""), Block::text(BlockId(2), "")], |b| {
            Some(b.id().0 as u32 * 10)
        });

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(BlockId(2)), Some(&20));
        assert!(!registry.contains(BlockId(9)));
    }

    #[test]
    fn test_caret_offset_only_for_focused_block() {
        let mut surface = MemorySurface::new();
        surface.sync(&[Block::text(BlockId(1), "abc"), Block::text(BlockId(2), "de")]);
        surface.focus(BlockId(2), 1);

        assert_eq!(surface.caret_offset(BlockId(2)), Some(1));
        assert_eq!(surface.caret_offset(BlockId(1)), None);
        assert_eq!(surface.focus_log(), &[CaretPlacement::new(BlockId(2), 1)]);
    }

    #[test]
    fn test_type_and_delete_at_caret() {
        let mut surface = MemorySurface::new();
        surface.sync(&[Block::text(BlockId(1), "ac")]);
        surface.place_caret(BlockId(1), 1);

        assert_eq!(surface.type_text("b"), Some((BlockId(1), "abc".to_string())));
        assert_eq!(surface.delete_backward(), Some((BlockId(1), "ac".to_string())));
        assert_eq!(surface.caret_offset(BlockId(1)), Some(1));
    }

    #[test]
    fn test_sync_clears_focus_of_removed_block() {
        let mut surface = MemorySurface::new();
        surface.sync(&[Block::text(BlockId(1), "")]);
        surface.focus(BlockId(1), 0);

        surface.sync(&[Block::text(BlockId(2), "")]);
        assert!(surface.focused().is_none());
    }
}
