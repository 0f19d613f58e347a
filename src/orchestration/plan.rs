//! Batch planning: split the tile sequence into ordered, disjoint groups.

use crate::error::{GridExportError, Result};
use crate::models::Tile;

/// Split `items` into consecutive groups of `batch_size`; the last group may be
/// smaller. Order is preserved and every item appears exactly once.
pub fn partition<T>(items: Vec<T>, batch_size: usize) -> Result<Vec<Vec<T>>> {
    if batch_size == 0 {
        return Err(GridExportError::ValidationError(
            "batch size must be at least 1".to_string(),
        ));
    }

    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

/// Ordered batches computed once at run start and consumed sequentially
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    batch_size: usize,
    batches: Vec<Vec<Tile>>,
}

impl BatchPlan {
    pub fn partition(tiles: Vec<Tile>, batch_size: usize) -> Result<Self> {
        Ok(Self {
            batch_size,
            batches: partition(tiles, batch_size)?,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batches(&self) -> &[Vec<Tile>] {
        &self.batches
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn tile_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Tiles in processing order
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.batches.iter().flatten()
    }
}
