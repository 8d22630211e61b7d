//! Block identifiers and the block-count ceiling.

use crate::core::errors::{BuildResult, DecompileError};
use uuid::Uuid;

/// Sentinel id of the synthetic "on start" wrapper block.
pub const ON_START_ID: &str = "on-start";

/// Per-call generator for function, argument and workspace-comment ids.
/// Ids depend only on emission order, so repeated runs agree.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: usize,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}_{}", prefix, self.counter)
    }

    /// Random id for a statement recorded in the source map.
    pub fn source_map_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Running block count checked against `maxBlocks`.
#[derive(Debug, Clone)]
pub struct BlockGuard {
    count: usize,
    limit: usize,
}

impl BlockGuard {
    pub fn new(limit: usize) -> Self {
        Self { count: 0, limit }
    }

    /// Counts one emitted block; fails as soon as the ceiling is exceeded.
    pub fn count_block(&mut self) -> BuildResult<()> {
        self.count += 1;
        if self.count > self.limit {
            return Err(DecompileError::TooLarge { limit: self.limit });
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Rolls the count back to a snapshot taken before a discarded subtree.
    pub fn restore(&mut self, count: usize) {
        self.count = count.min(self.count);
    }
}
