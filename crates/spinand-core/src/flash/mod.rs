//! Page-level flash operations
//!
//! This module provides the [`SpiNand`] driver, which turns page read,
//! program and erase requests into command sequences, and the tracker for
//! the chip's on-die page cache register.

mod cache;
mod nand;

pub use cache::PageCache;
pub use nand::SpiNand;
