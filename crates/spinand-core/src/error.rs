//! Error types for spinand-core
//!
//! This module provides a no_std compatible error type. Every kind carries a
//! stable negative code so C-style callers and logs can refer to failures by
//! number; see [`Error::code`] and [`error_to_string`].

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Device errors
    /// Device identifier does not match the configured part
    UnknownDevice,
    /// Uncorrectable ECC result after a cache load or program (bad block)
    BadBlock,

    // Request errors
    /// Column + length or row address exceeds the device geometry
    OutOfBounds,

    // Operation errors
    /// Erase-fail bit set after a block erase
    EraseFailed,
    /// Program-fail bit set after a program execute
    ProgramFailed,
    /// Device kept reporting operation-in-progress past the poll limit
    Timeout,

    // Setup errors
    /// Geometry or poll policy cannot be used by this driver
    InvalidConfig,

    // Transport errors
    /// The SPI exchange itself failed
    TransferFailed,
}

impl Error {
    /// Every error kind, in code order
    pub const ALL: [Error; 8] = [
        Error::UnknownDevice,
        Error::BadBlock,
        Error::OutOfBounds,
        Error::EraseFailed,
        Error::ProgramFailed,
        Error::Timeout,
        Error::InvalidConfig,
        Error::TransferFailed,
    ];

    /// Stable negative error code
    ///
    /// Success values (byte counts) are non-negative, so one `i32` can carry
    /// either outcome across an FFI or logging boundary.
    pub const fn code(&self) -> i32 {
        match self {
            Self::UnknownDevice => -3,
            Self::BadBlock => -5,
            Self::OutOfBounds => -6,
            Self::EraseFailed => -7,
            Self::ProgramFailed => -8,
            Self::Timeout => -9,
            Self::InvalidConfig => -10,
            Self::TransferFailed => -100,
        }
    }

    /// Look up the error kind for a code
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Short static description
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownDevice => "unknown device",
            Self::BadBlock => "uncorrectable ECC error (bad block)",
            Self::OutOfBounds => "request exceeds page bounds",
            Self::EraseFailed => "block erase hardware error",
            Self::ProgramFailed => "page program hardware error",
            Self::Timeout => "device not responding",
            Self::InvalidConfig => "invalid driver configuration",
            Self::TransferFailed => "SPI transfer failed",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Codes kept free for states an owned driver cannot reach
///
/// No operation returns them, but they stay described so logs carrying the
/// full numbering still decode.
const RESERVED_CODES: [(i32, &str); 3] = [
    (-1, "driver not initialized"),
    (-2, "driver already initialized"),
    (-4, "device is read-only"),
];

/// Describe a driver return code
///
/// Non-negative values are byte counts or success and map to `"OK"`.
pub fn error_to_string(code: i32) -> &'static str {
    if code >= 0 {
        return "OK";
    }
    if let Some(e) = Error::from_code(code) {
        return e.as_str();
    }
    RESERVED_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("unknown error", |(_, desc)| *desc)
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
