//! SPI NAND opcodes and feature register addresses
//!
//! Values follow the common SPI NAND command set (Micron MT29F, GigaDevice
//! GD5F, Winbond W25N and compatible parts).

// ============================================================================
// Identification and reset
// ============================================================================

/// Read ID - followed by one dummy byte, returns manufacturer and device ID
pub const READ_ID: u8 = 0x9F;
/// Reset - aborts any operation and reloads power-on defaults
pub const RESET: u8 = 0xFF;

// ============================================================================
// Feature registers
// ============================================================================

/// Get Feature - followed by the register address, returns one byte
pub const GET_FEATURE: u8 = 0x0F;
/// Set Feature - followed by the register address and the new value
pub const SET_FEATURE: u8 = 0x1F;

/// Block lock (protection) register
pub const FEATURE_LOCK: u8 = 0xA0;
/// Configuration register (ECC enable, OTP access, ...)
pub const FEATURE_CONFIG: u8 = 0xB0;
/// Status register
pub const FEATURE_STATUS: u8 = 0xC0;

/// Lock register value that clears protection for all blocks
pub const LOCK_NONE: u8 = 0x00;

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before every program execute and block erase
pub const WRITE_ENABLE: u8 = 0x06;
/// Write Disable - clears the write enable latch
pub const WRITE_DISABLE: u8 = 0x04;

// ============================================================================
// Read
// ============================================================================

/// Page Read - load a page from the array into the cache register
pub const READ_CELL_TO_CACHE: u8 = 0x13;
/// Read From Cache - 2 column bytes and one dummy byte, then data
pub const READ_FROM_CACHE: u8 = 0x03;

// ============================================================================
// Program
// ============================================================================

/// Program Load - resets the cache register to 0xFF, then loads data
pub const PROGRAM_LOAD: u8 = 0x02;
/// Program Load Random Data - loads data without resetting the cache register
pub const PROGRAM_LOAD_RANDOM: u8 = 0x84;
/// Program Execute - commit the cache register to the addressed page
pub const PROGRAM_EXECUTE: u8 = 0x10;

// ============================================================================
// Erase
// ============================================================================

/// Block Erase - erase the block containing the addressed row
pub const BLOCK_ERASE: u8 = 0xD8;
