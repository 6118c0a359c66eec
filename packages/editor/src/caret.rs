//! # Caret Placement
//!
//! Mutations never move the caret themselves. They return a
//! [`CaretPlacement`] alongside the new store, and the render layer consumes
//! it exactly once, usually on the next paint.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};

/// Where the caret should land after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaretPlacement {
    pub block_id: BlockId,
    pub offset: usize,
}

impl CaretPlacement {
    pub fn new(block_id: BlockId, offset: usize) -> Self {
        Self { block_id, offset }
    }

    pub fn start_of(block_id: BlockId) -> Self {
        Self::new(block_id, 0)
    }
}

/// Take-once slot for the caret instruction of the last committed pass
#[derive(Debug, Default)]
pub struct PendingCaret {
    slot: Option<CaretPlacement>,
}

impl PendingCaret {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any instruction not yet consumed
    pub fn set(&mut self, placement: CaretPlacement) {
        self.slot = Some(placement);
    }

    pub fn peek(&self) -> Option<&CaretPlacement> {
        self.slot.as_ref()
    }

    /// Consume the instruction; a second call returns `None`
    pub fn take(&mut self) -> Option<CaretPlacement> {
        self.slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}
