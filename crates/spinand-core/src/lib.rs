//! spinand-core - Command-level driver for SPI NAND flash
//!
//! This crate translates page-granular read, program and erase requests into
//! the native command protocol of a serial NAND chip. It tracks the chip's
//! single on-die page cache register so repeated reads of the same page skip
//! the array load, and it polls the status register to detect completion,
//! erase/program failures and uncorrectable ECC results.
//!
//! The physical bus is not part of this crate. Callers provide it through the
//! [`transport::SpiTransport`] trait: one chip-select-bracketed write-then-read
//! exchange plus delay primitives.
//!
//! # Features
//!
//! - `is_sync` (default) - Compile the driver as blocking code
//! - `std` - Enable standard library support (includes `alloc`, TOML config)
//! - `alloc` - Enable heap allocation for boxed transports
//!
//! # Example
//!
//! ```ignore
//! use spinand_core::{flash::SpiNand, DriverConfig};
//!
//! let mut nand = SpiNand::new(transport, DriverConfig::default())?;
//! let id = nand.init()?;
//! println!("Found {:02X} {:02X}", id.manufacturer, id.device);
//!
//! nand.page_write(5, 0, &[0xAA; 16])?;
//! let mut buf = [0u8; 16];
//! nand.page_read(5, 0, &mut buf)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod config;
pub mod error;
pub mod flash;
pub mod geometry;
pub mod protocol;
pub mod spi;
pub mod status;
pub mod transport;

pub use config::{DriverConfig, PollPolicy};
pub use error::{error_to_string, Error, Result};
pub use flash::SpiNand;
pub use geometry::Geometry;
pub use protocol::DeviceId;
pub use status::{EccStatus, Status};
pub use transport::SpiTransport;
