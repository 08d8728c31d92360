//! Page cache register tracking
//!
//! The chip holds exactly one page in its cache register. A read of that page
//! can skip the array load as long as nothing has overwritten the register
//! since. The tracker remembers which row, if any, is known to be loaded.

use crate::geometry::Geometry;

/// Which row the on-die cache register holds, if known
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCache {
    row: Option<u32>,
}

impl PageCache {
    /// Create a tracker with nothing cached
    pub const fn new() -> Self {
        Self { row: None }
    }

    /// Check if `row` is known to be in the cache register
    pub fn is_row_cached(&self, row: u32) -> bool {
        self.row == Some(row)
    }

    /// Record that `row` was loaded successfully
    pub fn mark_cached(&mut self, row: u32) {
        self.row = Some(row);
    }

    /// Forget the cached row
    pub fn invalidate(&mut self) {
        self.row = None;
    }

    /// The cached row, if any
    pub fn cached_row(&self) -> Option<u32> {
        self.row
    }

    /// Forget the cached row if it lies in `block`
    pub fn invalidate_block(&mut self, geometry: &Geometry, block: u32) {
        if let Some(row) = self.row {
            if geometry.block_of(row) == block {
                self.row = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_invalidate() {
        let mut cache = PageCache::new();
        assert!(!cache.is_row_cached(0));
        assert_eq!(cache.cached_row(), None);

        cache.mark_cached(5);
        assert!(cache.is_row_cached(5));
        assert!(!cache.is_row_cached(6));

        cache.mark_cached(6);
        assert!(!cache.is_row_cached(5));
        assert_eq!(cache.cached_row(), Some(6));

        cache.invalidate();
        assert!(!cache.is_row_cached(6));
    }

    #[test]
    fn test_invalidate_block() {
        let g = Geometry::REFERENCE;
        let mut cache = PageCache::new();

        cache.mark_cached(300);
        cache.invalidate_block(&g, 1);
        assert_eq!(cache.cached_row(), Some(300));

        cache.invalidate_block(&g, 2);
        assert_eq!(cache.cached_row(), None);
    }
}
