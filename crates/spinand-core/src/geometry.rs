//! Device geometry and address bounds checking
//!
//! A row address is the concatenation of a block index and a page index
//! inside that block. The driver only range-checks rows and serializes them
//! as 3 bytes; the block/page split is exposed here for callers.

use crate::error::{Error, Result};
use crate::spi::AddressWidth;

/// Largest page (data + spare area) the driver can frame in one transaction
pub const MAX_PAGE_SIZE: usize = 4096 + 256;

/// Physical layout of a SPI NAND device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct Geometry {
    /// Page size in bytes, spare area included
    pub page_size: u16,
    /// Pages per erase block
    pub pages_per_block: u32,
    /// Number of erase blocks
    pub block_count: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::REFERENCE
    }
}

impl Geometry {
    /// 2 Gbit part: 2112-byte pages, 128 pages per block, 2048 blocks
    pub const REFERENCE: Geometry = Geometry::new(2112, 128, 2048);

    /// Create a geometry
    pub const fn new(page_size: u16, pages_per_block: u32, block_count: u32) -> Self {
        Self {
            page_size,
            pages_per_block,
            block_count,
        }
    }

    /// Total number of addressable rows (pages)
    pub const fn row_count(&self) -> u32 {
        self.pages_per_block.saturating_mul(self.block_count)
    }

    /// Check that the driver can address this geometry
    ///
    /// Rows must fit the 3-byte row address and pages must fit one frame.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.pages_per_block == 0 || self.block_count == 0 {
            return Err(Error::InvalidConfig);
        }
        if self.page_size as usize > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig);
        }
        let rows = (self.pages_per_block as u64) * (self.block_count as u64);
        if rows > AddressWidth::ThreeByte.max_value() as u64 + 1 {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }

    /// Check that `row` exists
    pub fn check_row(&self, row: u32) -> Result<()> {
        if row >= self.row_count() {
            return Err(Error::OutOfBounds);
        }
        Ok(())
    }

    /// Check a page access of `len` bytes starting at `column` in `row`
    ///
    /// The access must end strictly inside the page: `column + len` has to be
    /// less than the page size.
    pub fn check_access(&self, row: u32, column: u16, len: usize) -> Result<()> {
        let end = (column as usize).checked_add(len).ok_or(Error::OutOfBounds)?;
        if end >= self.page_size as usize {
            return Err(Error::OutOfBounds);
        }
        self.check_row(row)
    }

    /// Block index of a row
    pub const fn block_of(&self, row: u32) -> u32 {
        row / self.pages_per_block
    }

    /// Page index of a row inside its block
    pub const fn page_in_block(&self, row: u32) -> u32 {
        row % self.pages_per_block
    }

    /// First row of a block
    pub const fn first_row_of_block(&self, block: u32) -> u32 {
        block * self.pages_per_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_geometry() {
        let g = Geometry::default();
        assert_eq!(g.page_size, 2112);
        assert_eq!(g.row_count(), 262_144);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_check_access() {
        let g = Geometry::REFERENCE;
        assert!(g.check_access(5, 0, 16).is_ok());
        assert!(g.check_access(262_143, 2095, 16).is_ok());
        // Ending exactly at the page size is rejected
        assert_eq!(g.check_access(5, 2096, 16), Err(Error::OutOfBounds));
        assert_eq!(g.check_access(5, 2100, 16), Err(Error::OutOfBounds));
        assert_eq!(g.check_access(262_144, 0, 1), Err(Error::OutOfBounds));
        assert_eq!(g.check_access(0, 0, usize::MAX), Err(Error::OutOfBounds));
    }

    #[test]
    fn test_block_split() {
        let g = Geometry::REFERENCE;
        assert_eq!(g.block_of(300), 2);
        assert_eq!(g.page_in_block(300), 44);
        assert_eq!(g.first_row_of_block(2), 256);
    }

    #[test]
    fn test_validate_rejects_unaddressable() {
        assert_eq!(Geometry::new(0, 64, 1024).validate(), Err(Error::InvalidConfig));
        assert_eq!(Geometry::new(2112, 0, 1024).validate(), Err(Error::InvalidConfig));
        assert_eq!(
            Geometry::new(8192 + 448, 64, 1024).validate(),
            Err(Error::InvalidConfig)
        );
        assert_eq!(
            Geometry::new(2112, 256, 65536 * 2).validate(),
            Err(Error::InvalidConfig)
        );
        assert!(Geometry::new(4352, 64, 2048).validate().is_ok());
    }
}
