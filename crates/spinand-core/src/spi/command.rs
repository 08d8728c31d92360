//! SPI NAND command structure

use super::{opcodes, AddressWidth};

/// Longest command header: opcode + 3 address bytes, or opcode + 2 column
/// bytes + 1 dummy byte
pub const MAX_HEADER_LEN: usize = 4;

/// A single SPI NAND transaction
///
/// Designed to avoid allocation - uses slices for data.
/// The lifetime parameter `'a` ties the command to the buffers it references.
///
/// On the wire a command is `opcode`, then the address phase, then
/// `dummy_bytes` zero bytes, then `write_data`. The read phase follows in the
/// same chip-select window and fills `read_buf`.
pub struct NandCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address, feature register or column (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of dummy bytes after the address phase
    pub dummy_bytes: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> NandCommand<'a> {
    /// Create a simple command with no address or data (e.g., RESET, WREN)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a Read ID command (one dummy byte, then the ID bytes)
    pub fn read_id(buf: &'a mut [u8]) -> Self {
        Self {
            opcode: opcodes::READ_ID,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 1,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a Get Feature command for the given register
    pub fn get_feature(register: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode: opcodes::GET_FEATURE,
            address: Some(register as u32),
            address_width: AddressWidth::OneByte,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a Set Feature command writing `value` to the given register
    pub fn set_feature(register: u8, value: &'a [u8]) -> Self {
        Self {
            opcode: opcodes::SET_FEATURE,
            address: Some(register as u32),
            address_width: AddressWidth::OneByte,
            dummy_bytes: 0,
            write_data: value,
            read_buf: &mut [],
        }
    }

    /// Create a row-addressed command (page read, program execute, erase)
    pub fn row(opcode: u8, row: u32) -> Self {
        Self {
            opcode,
            address: Some(row),
            address_width: AddressWidth::ThreeByte,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a column-addressed load into the cache register
    pub fn program_load(opcode: u8, column: u16, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(column as u32),
            address_width: AddressWidth::TwoByte,
            dummy_bytes: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create a Read From Cache command starting at `column`
    pub fn read_from_cache(column: u16, buf: &'a mut [u8]) -> Self {
        Self {
            opcode: opcodes::READ_FROM_CACHE,
            address: Some(column as u32),
            address_width: AddressWidth::TwoByte,
            dummy_bytes: 1,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Number of bytes before `write_data`: opcode, address and dummy bytes
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + self.dummy_bytes as usize
    }

    /// Number of bytes clocked out: header plus write data
    pub fn write_len(&self) -> usize {
        self.header_len() + self.write_data.len()
    }

    /// Serialize the header into `buf`, returning the number of bytes used
    ///
    /// `buf` must hold at least [`header_len`](Self::header_len) bytes.
    pub fn encode_header(&self, buf: &mut [u8]) -> usize {
        buf[0] = self.opcode;
        let addr_len = self.address_width.bytes() as usize;
        self.address_width
            .encode(self.address.unwrap_or(0), &mut buf[1..1 + addr_len]);
        let end = self.header_len();
        for byte in &mut buf[1 + addr_len..end] {
            *byte = 0;
        }
        end
    }
}
