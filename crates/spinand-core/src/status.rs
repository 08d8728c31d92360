//! Status register decoding
//!
//! | Bit | Name   | Description                              |
//! | --- | ------ | ---------------------------------------- |
//! | 0   | OIP    | Operation in progress                    |
//! | 1   | WEL    | Write enable latch                       |
//! | 2   | E_FAIL | Last block erase failed                  |
//! | 3   | P_FAIL | Last program execute failed              |
//! | 4-5 | ECC    | ECC result of the last page read/program |

use bitflags::bitflags;

bitflags! {
    /// Status register (feature address 0xC0)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Operation in progress
        const OIP    = 0b0000_0001;
        /// Write enable latch
        const WEL    = 0b0000_0010;
        /// Erase failure
        const E_FAIL = 0b0000_0100;
        /// Program failure
        const P_FAIL = 0b0000_1000;
        /// ECC result, low bit
        const ECC0   = 0b0001_0000;
        /// ECC result, high bit
        const ECC1   = 0b0010_0000;

        /// Both ECC bits
        const ECC = Self::ECC0.bits() | Self::ECC1.bits();
    }
}

impl Status {
    /// Wrap a raw status byte, keeping bits this driver does not name
    pub const fn from_raw(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Check if the chip is still executing a command
    pub fn is_busy(&self) -> bool {
        self.contains(Status::OIP)
    }

    /// Check if the write enable latch is set
    pub fn is_write_enabled(&self) -> bool {
        self.contains(Status::WEL)
    }

    /// Check if the last erase failed
    pub fn erase_failed(&self) -> bool {
        self.contains(Status::E_FAIL)
    }

    /// Check if the last program failed
    pub fn program_failed(&self) -> bool {
        self.contains(Status::P_FAIL)
    }

    /// Decode the ECC field
    pub fn ecc(&self) -> EccStatus {
        EccStatus::from_field((self.bits() & Status::ECC.bits()) >> 4)
    }
}

/// ECC result of the last page read or program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EccStatus {
    /// No bit errors
    NoErrors,
    /// Bit errors detected and corrected
    Corrected,
    /// Bit errors corrected, count at or above the refresh threshold
    CorrectedAtThreshold,
    /// More errors than the ECC engine can correct
    Uncorrectable,
}

impl EccStatus {
    /// Decode the 2-bit ECC field (already shifted down to bits 1..0)
    pub const fn from_field(field: u8) -> Self {
        match field & 0b11 {
            0b00 => Self::NoErrors,
            0b01 => Self::Corrected,
            0b10 => Self::CorrectedAtThreshold,
            _ => Self::Uncorrectable,
        }
    }

    /// Check if the data is lost
    pub const fn is_uncorrectable(&self) -> bool {
        matches!(self, Self::Uncorrectable)
    }

    /// Check if bit errors were found but fixed
    pub const fn is_corrected(&self) -> bool {
        matches!(self, Self::Corrected | Self::CorrectedAtThreshold)
    }
}
