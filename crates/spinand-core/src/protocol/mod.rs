//! Protocol implementations
//!
//! This module contains the SPI NAND command sequences and the status
//! poller. Each function performs exactly the exchanges it names; cache
//! tracking and error mapping live in [`crate::flash`].

mod spinand;

pub use spinand::*;
