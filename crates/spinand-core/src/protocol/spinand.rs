//! SPI NAND protocol implementation
//!
//! This module implements the SPI NAND command sequences shared by the
//! common parts of this family (Micron, GigaDevice, Winbond, ...).
//!
//! Uses `maybe_async` to support both sync and async modes:
//! - With `is_sync` feature: blocking/synchronous
//! - Without `is_sync` feature: async (for Embassy, tokio)
//!
//! Every command is framed into a stack buffer sized for the longest header
//! plus a full page, so no buffer is shared between transactions.

use core::fmt;

use crate::config::PollPolicy;
use crate::error::{Error, Result};
use crate::geometry::MAX_PAGE_SIZE;
use crate::spi::{opcodes, NandCommand, MAX_HEADER_LEN};
use crate::status::Status;
use crate::transport::SpiTransport;
use heapless::Vec;
use maybe_async::maybe_async;

/// Capacity of a command frame: longest header plus a full page
pub const FRAME_CAPACITY: usize = MAX_HEADER_LEN + MAX_PAGE_SIZE;

/// Manufacturer and device identifier returned by Read ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId {
    /// JEDEC manufacturer ID
    pub manufacturer: u8,
    /// Device ID
    pub device: u8,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.manufacturer, self.device)
    }
}

/// Frame a command and run it as one transport exchange
///
/// Transport failures of any kind are reported as [`Error::TransferFailed`].
#[maybe_async]
pub async fn execute<T: SpiTransport + ?Sized>(
    transport: &mut T,
    cmd: &mut NandCommand<'_>,
) -> Result<()> {
    let opcode = cmd.opcode;
    let mut frame: Vec<u8, FRAME_CAPACITY> = Vec::new();
    frame
        .resize(cmd.header_len(), 0)
        .map_err(|_| Error::InvalidConfig)?;
    cmd.encode_header(&mut frame);
    frame
        .extend_from_slice(cmd.write_data)
        .map_err(|_| Error::InvalidConfig)?;

    transport
        .exchange(&frame, cmd.read_buf)
        .await
        .map_err(|e| {
            log::debug!("spinand: opcode 0x{:02X} transfer failed: {}", opcode, e);
            Error::TransferFailed
        })
}

/// Read the manufacturer and device identifier
#[maybe_async]
pub async fn read_id<T: SpiTransport + ?Sized>(transport: &mut T) -> Result<DeviceId> {
    let mut buf = [0u8; 2];
    let mut cmd = NandCommand::read_id(&mut buf);
    execute(transport, &mut cmd).await?;

    Ok(DeviceId {
        manufacturer: buf[0],
        device: buf[1],
    })
}

/// Send the Reset command
#[maybe_async]
pub async fn reset<T: SpiTransport + ?Sized>(transport: &mut T) -> Result<()> {
    let mut cmd = NandCommand::simple(opcodes::RESET);
    execute(transport, &mut cmd).await
}

/// Read a feature register
#[maybe_async]
pub async fn get_feature<T: SpiTransport + ?Sized>(transport: &mut T, register: u8) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = NandCommand::get_feature(register, &mut buf);
    execute(transport, &mut cmd).await?;
    Ok(buf[0])
}

/// Write a feature register
#[maybe_async]
pub async fn set_feature<T: SpiTransport + ?Sized>(
    transport: &mut T,
    register: u8,
    value: u8,
) -> Result<()> {
    let data = [value];
    let mut cmd = NandCommand::set_feature(register, &data);
    execute(transport, &mut cmd).await
}

/// Read the status register once, without waiting
#[maybe_async]
pub async fn read_status_once<T: SpiTransport + ?Sized>(transport: &mut T) -> Result<Status> {
    let raw = get_feature(transport, opcodes::FEATURE_STATUS).await?;
    Ok(Status::from_raw(raw))
}

/// Send the Write Enable command
///
/// The latch clears itself after every program execute and block erase.
#[maybe_async]
pub async fn write_enable<T: SpiTransport + ?Sized>(transport: &mut T) -> Result<()> {
    let mut cmd = NandCommand::simple(opcodes::WRITE_ENABLE);
    execute(transport, &mut cmd).await
}

/// Send the Write Disable command
#[maybe_async]
pub async fn write_disable<T: SpiTransport + ?Sized>(transport: &mut T) -> Result<()> {
    let mut cmd = NandCommand::simple(opcodes::WRITE_DISABLE);
    execute(transport, &mut cmd).await
}

/// Load a page from the array into the cache register
///
/// The chip is busy until the load finishes; follow with [`wait_ready`].
#[maybe_async]
pub async fn read_cell_to_cache<T: SpiTransport + ?Sized>(transport: &mut T, row: u32) -> Result<()> {
    let mut cmd = NandCommand::row(opcodes::READ_CELL_TO_CACHE, row);
    execute(transport, &mut cmd).await
}

/// Read `buf.len()` bytes from the cache register starting at `column`
#[maybe_async]
pub async fn read_from_cache<T: SpiTransport + ?Sized>(
    transport: &mut T,
    column: u16,
    buf: &mut [u8],
) -> Result<()> {
    let mut cmd = NandCommand::read_from_cache(column, buf);
    execute(transport, &mut cmd).await
}

/// Reset the cache register to 0xFF and load `data` at `column`
#[maybe_async]
pub async fn program_load<T: SpiTransport + ?Sized>(
    transport: &mut T,
    column: u16,
    data: &[u8],
) -> Result<()> {
    let mut cmd = NandCommand::program_load(opcodes::PROGRAM_LOAD, column, data);
    execute(transport, &mut cmd).await
}

/// Load `data` at `column` keeping the rest of the cache register
#[maybe_async]
pub async fn program_load_random<T: SpiTransport + ?Sized>(
    transport: &mut T,
    column: u16,
    data: &[u8],
) -> Result<()> {
    let mut cmd = NandCommand::program_load(opcodes::PROGRAM_LOAD_RANDOM, column, data);
    execute(transport, &mut cmd).await
}

/// Commit the cache register to `row`
///
/// Requires the write enable latch. Follow with [`wait_ready`].
#[maybe_async]
pub async fn program_execute<T: SpiTransport + ?Sized>(transport: &mut T, row: u32) -> Result<()> {
    let mut cmd = NandCommand::row(opcodes::PROGRAM_EXECUTE, row);
    execute(transport, &mut cmd).await
}

/// Erase the block containing `row`
///
/// Requires the write enable latch. Follow with [`wait_ready`].
#[maybe_async]
pub async fn block_erase<T: SpiTransport + ?Sized>(transport: &mut T, row: u32) -> Result<()> {
    let mut cmd = NandCommand::row(opcodes::BLOCK_ERASE, row);
    execute(transport, &mut cmd).await
}

/// Wait for the OIP (Operation In Progress) bit to clear
///
/// Reads the status register at least once. While OIP is set, sleeps
/// `policy.interval_us` and reads again, up to `policy.max_polls` reads in
/// total. Returns the first status with OIP clear; the caller decodes the
/// fail and ECC bits.
///
/// # Errors
/// * `Timeout` - OIP was still set after the last allowed read
/// * `TransferFailed` - A status read failed
#[maybe_async]
pub async fn wait_ready<T: SpiTransport + ?Sized>(
    transport: &mut T,
    policy: &PollPolicy,
) -> Result<Status> {
    let max_polls = core::cmp::max(policy.max_polls, 1);

    for poll in 0..max_polls {
        let status = read_status_once(transport).await?;
        if !status.is_busy() {
            log::trace!("spinand: ready after {} poll(s), status 0x{:02X}", poll + 1, status.bits());
            return Ok(status);
        }
        if poll + 1 < max_polls {
            transport.delay_us(policy.interval_us).await;
        }
    }

    log::warn!(
        "spinand: device still busy after {} polls ({} us)",
        max_polls,
        policy.budget_us()
    );
    Err(Error::Timeout)
}
