//! SPI NAND command structures
//!
//! This module provides the opcode table, address widths and the
//! [`NandCommand`] frame builder used by the protocol layer.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::{NandCommand, MAX_HEADER_LEN};
pub use opcodes::*;
