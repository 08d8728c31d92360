//! Address width types

/// Address width for SPI NAND commands
///
/// Each phase is serialized big-endian, most significant byte first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 1-byte feature register address
    OneByte,
    /// 2-byte column (byte offset inside a page)
    TwoByte,
    /// 3-byte row (block + page index)
    ThreeByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::OneByte => 1,
            Self::TwoByte => 2,
            Self::ThreeByte => 3,
        }
    }

    /// Returns the largest value representable in this width
    pub const fn max_value(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::OneByte => 0xFF,
            Self::TwoByte => 0xFFFF,
            Self::ThreeByte => 0xFF_FFFF,
        }
    }

    /// Encode an address into bytes
    ///
    /// Bits above the width are dropped; callers range-check first.
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        match self {
            Self::None => {}
            Self::OneByte => {
                buf[0] = address as u8;
            }
            Self::TwoByte => {
                buf[0] = (address >> 8) as u8;
                buf[1] = address as u8;
            }
            Self::ThreeByte => {
                buf[0] = (address >> 16) as u8;
                buf[1] = (address >> 8) as u8;
                buf[2] = address as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_big_endian() {
        let mut buf = [0u8; 3];
        AddressWidth::ThreeByte.encode(0x03_FFFF, &mut buf);
        assert_eq!(buf, [0x03, 0xFF, 0xFF]);

        let mut buf = [0u8; 2];
        AddressWidth::TwoByte.encode(2100, &mut buf);
        assert_eq!(buf, [0x08, 0x34]);

        let mut buf = [0u8; 1];
        AddressWidth::OneByte.encode(0xC0, &mut buf);
        assert_eq!(buf, [0xC0]);
    }

    #[test]
    fn test_bytes() {
        assert_eq!(AddressWidth::None.bytes(), 0);
        assert_eq!(AddressWidth::ThreeByte.bytes(), 3);
        assert_eq!(AddressWidth::ThreeByte.max_value(), 0xFF_FFFF);
    }
}
