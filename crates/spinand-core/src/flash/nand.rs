//! SPI NAND driver
//!
//! [`SpiNand`] owns a transport and the driver state (configuration and
//! page cache tracker). Every operation takes `&mut self`, so operations on
//! one chip never interleave. Callers sharing a chip across threads wrap the
//! whole driver in a lock.

use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::flash::cache::PageCache;
use crate::geometry::Geometry;
use crate::protocol::{self, DeviceId};
use crate::spi::opcodes;
use crate::status::{EccStatus, Status};
use crate::transport::SpiTransport;
use maybe_async::maybe_async;

/// Command-level driver for one SPI NAND chip
///
/// # Example
///
/// ```ignore
/// use spinand_core::{flash::SpiNand, DriverConfig};
///
/// let mut nand = SpiNand::new(transport, DriverConfig::default())?;
/// nand.init()?;
///
/// assert_eq!(nand.page_write(5, 0, &[0xAA; 16])?, 16);
/// let mut buf = [0u8; 16];
/// nand.page_read(5, 0, &mut buf)?;
/// ```
pub struct SpiNand<T: SpiTransport> {
    transport: T,
    config: DriverConfig,
    cache: PageCache,
}

impl<T: SpiTransport> SpiNand<T> {
    /// Create a driver for the chip behind `transport`
    ///
    /// No bus traffic happens until [`init`](Self::init).
    ///
    /// # Errors
    /// * `InvalidConfig` - The geometry or poll policy cannot be used
    pub fn new(transport: T, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            cache: PageCache::new(),
        })
    }

    /// Bring the chip into a usable state
    ///
    /// Configures chip select, reads the identifier, resets the chip, clears
    /// all block protection and sets the write enable latch.
    ///
    /// # Errors
    /// * `UnknownDevice` - The identifier differs from `expected_id`
    /// * `Timeout` - The chip stayed busy after reset
    /// * `TransferFailed` - An exchange failed
    #[maybe_async]
    pub async fn init(&mut self) -> Result<DeviceId> {
        self.transport.configure_chip_select()?;

        let id = protocol::read_id(&mut self.transport).await?;
        log::info!(
            "spinand: found device (manufacturer 0x{:02X}, device 0x{:02X})",
            id.manufacturer,
            id.device
        );

        if let Some(expected) = self.config.expected_id {
            if id != expected {
                log::warn!("spinand: expected device {}, found {}", expected, id);
                return Err(Error::UnknownDevice);
            }
        }

        self.reset_and_unlock().await?;
        self.write_enable().await?;
        Ok(id)
    }

    /// Reset the chip and clear all block protection bits
    #[maybe_async]
    pub async fn reset_and_unlock(&mut self) -> Result<()> {
        // The reset clears the cache register
        self.cache.invalidate();

        protocol::reset(&mut self.transport).await?;
        self.transport.delay_ms(self.config.reset_delay_ms).await;
        protocol::wait_ready(&mut self.transport, &self.config.poll).await?;

        protocol::set_feature(&mut self.transport, opcodes::FEATURE_LOCK, opcodes::LOCK_NONE)
            .await?;
        log::debug!("spinand: reset done, block protection cleared");
        Ok(())
    }

    /// Set the write enable latch
    #[maybe_async]
    pub async fn write_enable(&mut self) -> Result<()> {
        protocol::write_enable(&mut self.transport).await
    }

    /// Clear the write enable latch
    #[maybe_async]
    pub async fn write_disable(&mut self) -> Result<()> {
        protocol::write_disable(&mut self.transport).await
    }

    /// Wait until the chip is idle and return its status
    ///
    /// The returned status never has OIP set.
    ///
    /// # Errors
    /// * `Timeout` - OIP stayed set for the whole poll budget
    #[maybe_async]
    pub async fn read_status(&mut self) -> Result<Status> {
        protocol::wait_ready(&mut self.transport, &self.config.poll).await
    }

    /// Read a raw feature register
    #[maybe_async]
    pub async fn get_feature(&mut self, register: u8) -> Result<u8> {
        protocol::get_feature(&mut self.transport, register).await
    }

    /// Write a raw feature register
    #[maybe_async]
    pub async fn set_feature(&mut self, register: u8, value: u8) -> Result<()> {
        protocol::set_feature(&mut self.transport, register, value).await
    }

    /// Read the manufacturer and device identifier
    #[maybe_async]
    pub async fn read_id(&mut self) -> Result<DeviceId> {
        protocol::read_id(&mut self.transport).await
    }

    /// Read `buf.len()` bytes of page `row` starting at `column`
    ///
    /// The array load is skipped when `row` is already in the cache register.
    /// Returns the number of bytes read.
    ///
    /// # Errors
    /// * `OutOfBounds` - `column + buf.len()` reaches the page size or `row`
    ///   does not exist; nothing is sent to the chip
    /// * `BadBlock` - The page has an uncorrectable ECC error
    /// * `Timeout` - The array load did not finish
    /// * `TransferFailed` - An exchange failed
    #[maybe_async]
    pub async fn page_read(&mut self, row: u32, column: u16, buf: &mut [u8]) -> Result<usize> {
        self.config.geometry.check_access(row, column, buf.len())?;

        if self.cache.is_row_cached(row) {
            log::trace!("spinand: row {} already in cache", row);
        } else {
            self.load_row(row).await?;
        }

        protocol::read_from_cache(&mut self.transport, column, buf).await?;
        Ok(buf.len())
    }

    /// Program `data` into page `row` starting at `column`
    ///
    /// The cache register is reset to 0xFF before `data` is loaded, so the
    /// rest of the page is programmed as erased. Returns the number of bytes
    /// written.
    ///
    /// # Errors
    /// * `OutOfBounds` - `column + data.len()` reaches the page size or `row`
    ///   does not exist; nothing is sent to the chip
    /// * `BadBlock` - The chip reported an uncorrectable ECC result
    /// * `ProgramFailed` - The chip reported a program failure
    /// * `Timeout` - The program did not finish
    /// * `TransferFailed` - An exchange failed
    #[maybe_async]
    pub async fn page_write(&mut self, row: u32, column: u16, data: &[u8]) -> Result<usize> {
        self.program(row, column, data, false).await
    }

    /// Program `data` into page `row` keeping the rest of the cache register
    ///
    /// Used for read-modify-write: load a page with [`page_read`](Self::page_read),
    /// then patch part of it. Errors as for [`page_write`](Self::page_write).
    #[maybe_async]
    pub async fn page_write_random(
        &mut self,
        row: u32,
        column: u16,
        data: &[u8],
    ) -> Result<usize> {
        self.program(row, column, data, true).await
    }

    /// Erase the block containing `row`
    ///
    /// # Errors
    /// * `OutOfBounds` - `row` does not exist; nothing is sent to the chip
    /// * `EraseFailed` - The chip reported an erase failure
    /// * `Timeout` - The erase did not finish
    /// * `TransferFailed` - An exchange failed
    #[maybe_async]
    pub async fn block_erase(&mut self, row: u32) -> Result<()> {
        self.config.geometry.check_row(row)?;
        let block = self.config.geometry.block_of(row);

        protocol::write_enable(&mut self.transport).await?;
        log::debug!("spinand: erasing block {} (row {})", block, row);
        protocol::block_erase(&mut self.transport, row).await?;
        self.cache.invalidate_block(&self.config.geometry, block);

        let status = protocol::wait_ready(&mut self.transport, &self.config.poll).await?;
        if status.erase_failed() {
            log::warn!("spinand: erase of block {} failed", block);
            return Err(Error::EraseFailed);
        }
        Ok(())
    }

    /// Load `row` into the cache register and check its ECC result
    #[maybe_async]
    async fn load_row(&mut self, row: u32) -> Result<()> {
        // The register content is unknown until the load succeeds
        self.cache.invalidate();

        log::debug!("spinand: loading row {} into cache", row);
        protocol::read_cell_to_cache(&mut self.transport, row).await?;
        let status = protocol::wait_ready(&mut self.transport, &self.config.poll).await?;

        match status.ecc() {
            EccStatus::Uncorrectable => {
                log::warn!("spinand: uncorrectable ECC error in row {}", row);
                return Err(Error::BadBlock);
            }
            ecc if ecc.is_corrected() => {
                log::warn!(
                    "spinand: row {} read with corrected bit errors ({:?})",
                    row,
                    ecc
                );
            }
            _ => {}
        }

        self.cache.mark_cached(row);
        Ok(())
    }

    #[maybe_async]
    async fn program(
        &mut self,
        row: u32,
        column: u16,
        data: &[u8],
        random: bool,
    ) -> Result<usize> {
        self.config.geometry.check_access(row, column, data.len())?;

        // The latch clears after every program execute
        protocol::write_enable(&mut self.transport).await?;

        self.cache.invalidate();
        log::debug!(
            "spinand: programming {} bytes at row {} column {}",
            data.len(),
            row,
            column
        );
        if random {
            protocol::program_load_random(&mut self.transport, column, data).await?;
        } else {
            protocol::program_load(&mut self.transport, column, data).await?;
        }
        protocol::program_execute(&mut self.transport, row).await?;

        let status = protocol::wait_ready(&mut self.transport, &self.config.poll).await?;
        if status.ecc().is_uncorrectable() {
            log::warn!("spinand: uncorrectable ECC result programming row {}", row);
            return Err(Error::BadBlock);
        }
        if status.program_failed() {
            log::warn!("spinand: program of row {} failed", row);
            return Err(Error::ProgramFailed);
        }
        Ok(data.len())
    }

    /// Device geometry
    pub fn geometry(&self) -> &Geometry {
        &self.config.geometry
    }

    /// Page size in bytes, spare area included
    pub fn page_size(&self) -> u16 {
        self.config.geometry.page_size
    }

    /// Pages per erase block
    pub fn pages_per_block(&self) -> u32 {
        self.config.geometry.pages_per_block
    }

    /// Number of erase blocks
    pub fn block_count(&self) -> u32 {
        self.config.geometry.block_count
    }

    /// Number of addressable rows
    pub fn row_count(&self) -> u32 {
        self.config.geometry.row_count()
    }

    /// Row currently known to be in the cache register
    pub fn cached_row(&self) -> Option<u32> {
        self.cache.cached_row()
    }

    /// Driver configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Get a reference to the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    ///
    /// Exchanges sent directly can change the cache register; the tracker
    /// is invalidated to stay correct.
    pub fn transport_mut(&mut self) -> &mut T {
        self.cache.invalidate();
        &mut self.transport
    }

    /// Consume the driver and return the transport
    pub fn release(self) -> T {
        self.transport
    }
}

#[cfg(all(test, feature = "is_sync"))]
mod tests {
    use super::*;
    use crate::config::PollPolicy;
    use crate::transport::mock::MockTransport;
    use std::vec;

    fn nand() -> SpiNand<MockTransport> {
        let config = DriverConfig::default().with_poll(PollPolicy {
            interval_us: 10,
            max_polls: 8,
        });
        SpiNand::new(MockTransport::new(), config).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = DriverConfig::default().with_geometry(Geometry::new(0, 64, 1024));
        assert!(matches!(
            SpiNand::new(MockTransport::new(), config),
            Err(Error::InvalidConfig)
        ));
    }

    #[test]
    fn test_init_sequence() {
        let mut nand = nand();
        let id = nand.init().unwrap();
        assert_eq!(id.manufacturer, 0x2C);

        let t = nand.transport();
        assert!(t.cs_configured);
        assert_eq!(
            t.opcodes(),
            vec![
                opcodes::READ_ID,
                opcodes::RESET,
                opcodes::GET_FEATURE,
                opcodes::SET_FEATURE,
                opcodes::WRITE_ENABLE
            ]
        );
        assert_eq!(t.frames[3], vec![0x1F, 0xA0, 0x00]);
        // Reset settling delay
        assert_eq!(t.delayed_us, 7_000);
    }

    #[test]
    fn test_init_rejects_unexpected_id() {
        let config = DriverConfig::default().with_expected_id(DeviceId {
            manufacturer: 0xC8,
            device: 0x51,
        });
        let mut nand = SpiNand::new(MockTransport::new(), config).unwrap();
        assert_eq!(nand.init(), Err(Error::UnknownDevice));
        assert_eq!(nand.transport().opcodes(), vec![opcodes::READ_ID]);
    }

    #[test]
    fn test_page_read_cache_hit() {
        let mut nand = nand();
        let mut buf = [0u8; 16];

        assert_eq!(nand.page_read(5, 0, &mut buf), Ok(16));
        assert_eq!(nand.cached_row(), Some(5));
        assert_eq!(nand.page_read(5, 32, &mut buf), Ok(16));

        let t = nand.transport();
        assert_eq!(
            t.opcodes(),
            vec![
                opcodes::READ_CELL_TO_CACHE,
                opcodes::GET_FEATURE,
                opcodes::READ_FROM_CACHE,
                opcodes::READ_FROM_CACHE
            ]
        );
        assert_eq!(t.frames[0], vec![0x13, 0x00, 0x00, 0x05]);
        assert_eq!(t.frames[3], vec![0x03, 0x00, 0x20, 0x00]);
        assert_eq!(buf, [0xFF; 16]);
    }

    #[test]
    fn test_page_read_other_row_reloads() {
        let mut nand = nand();
        let mut buf = [0u8; 4];
        nand.page_read(5, 0, &mut buf).unwrap();
        nand.page_read(6, 0, &mut buf).unwrap();
        assert_eq!(nand.transport().count(opcodes::READ_CELL_TO_CACHE), 2);
        assert_eq!(nand.cached_row(), Some(6));
    }

    #[test]
    fn test_page_read_out_of_bounds_sends_nothing() {
        let mut nand = nand();
        let mut buf = [0u8; 16];
        assert_eq!(nand.page_read(5, 2100, &mut buf), Err(Error::OutOfBounds));
        assert_eq!(nand.page_read(262_144, 0, &mut buf), Err(Error::OutOfBounds));
        assert!(nand.transport().frames.is_empty());
    }

    #[test]
    fn test_page_read_uncorrectable() {
        let mut nand = nand();
        nand.transport_mut().queue_status(&[0x01, 0x30]);
        let mut buf = [0u8; 4];
        assert_eq!(nand.page_read(9, 0, &mut buf), Err(Error::BadBlock));
        assert_eq!(nand.cached_row(), None);
        assert_eq!(nand.transport().count(opcodes::READ_FROM_CACHE), 0);
    }

    #[test]
    fn test_page_read_corrected_is_ok() {
        let mut nand = nand();
        nand.transport_mut().queue_status(&[0x10]);
        let mut buf = [0u8; 4];
        assert_eq!(nand.page_read(9, 0, &mut buf), Ok(4));
        assert_eq!(nand.cached_row(), Some(9));
    }

    #[test]
    fn test_page_read_transfer_failure_leaves_cache_empty() {
        let mut nand = nand();
        nand.transport_mut().fail_opcode = Some(opcodes::READ_CELL_TO_CACHE);
        let mut buf = [0u8; 4];
        assert_eq!(nand.page_read(9, 0, &mut buf), Err(Error::TransferFailed));
        assert_eq!(nand.cached_row(), None);
    }

    #[test]
    fn test_page_write_sequence() {
        let mut nand = nand();
        assert_eq!(nand.page_write(5, 0, &[0xAA; 16]), Ok(16));

        let t = nand.transport();
        assert_eq!(
            t.opcodes(),
            vec![
                opcodes::WRITE_ENABLE,
                opcodes::PROGRAM_LOAD,
                opcodes::PROGRAM_EXECUTE,
                opcodes::GET_FEATURE
            ]
        );
        let mut load = vec![0x02, 0x00, 0x00];
        load.extend_from_slice(&[0xAA; 16]);
        assert_eq!(t.frames[1], load);
        assert_eq!(t.frames[2], vec![0x10, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn test_page_write_random_keeps_register() {
        let mut nand = nand();
        assert_eq!(nand.page_write_random(5, 0x100, &[1, 2]), Ok(2));
        assert_eq!(nand.transport().frames[1], vec![0x84, 0x01, 0x00, 1, 2]);
    }

    #[test]
    fn test_page_write_invalidates_cache() {
        let mut nand = nand();
        let mut buf = [0u8; 4];
        nand.page_read(5, 0, &mut buf).unwrap();
        nand.page_write(5, 0, &[0x55; 4]).unwrap();
        assert_eq!(nand.cached_row(), None);
        nand.page_read(5, 0, &mut buf).unwrap();
        assert_eq!(nand.transport().count(opcodes::READ_CELL_TO_CACHE), 2);
    }

    #[test]
    fn test_page_write_other_row_invalidates_cache() {
        let mut nand = nand();
        let mut buf = [0u8; 4];
        nand.page_read(10, 0, &mut buf).unwrap();
        nand.page_write(99, 0, &[0x55; 4]).unwrap();
        assert_eq!(nand.cached_row(), None);

        nand.page_read(10, 0, &mut buf).unwrap();
        assert_eq!(nand.transport().count(opcodes::READ_CELL_TO_CACHE), 2);
        assert_eq!(nand.cached_row(), Some(10));
    }

    #[test]
    fn test_page_write_failures() {
        let mut nand = nand();
        nand.transport_mut().queue_status(&[0x08]);
        assert_eq!(nand.page_write(5, 0, &[0]), Err(Error::ProgramFailed));

        nand.transport_mut().queue_status(&[0x30]);
        assert_eq!(nand.page_write(5, 0, &[0]), Err(Error::BadBlock));
    }

    #[test]
    fn test_page_write_out_of_bounds_sends_nothing() {
        let mut nand = nand();
        assert_eq!(nand.page_write(262_144, 0, &[0x00]), Err(Error::OutOfBounds));
        assert_eq!(nand.page_write(0, 2111, &[0x00]), Err(Error::OutOfBounds));
        assert!(nand.transport().frames.is_empty());
    }

    #[test]
    fn test_write_enable_before_every_program() {
        let mut nand = nand();
        nand.page_write(1, 0, &[1]).unwrap();
        nand.page_write(2, 0, &[2]).unwrap();
        nand.block_erase(0).unwrap();

        let ops = nand.transport().opcodes();
        for (i, op) in ops.iter().enumerate() {
            if *op == opcodes::PROGRAM_LOAD || *op == opcodes::BLOCK_ERASE {
                assert_eq!(ops[i - 1], opcodes::WRITE_ENABLE);
            }
        }
        assert_eq!(nand.transport().count(opcodes::WRITE_ENABLE), 3);
    }

    #[test]
    fn test_block_erase() {
        let mut nand = nand();
        let mut buf = [0u8; 4];
        nand.page_read(300, 0, &mut buf).unwrap();

        nand.block_erase(256).unwrap();
        assert_eq!(nand.cached_row(), None);

        let t = nand.transport();
        assert_eq!(t.frames[3], vec![opcodes::WRITE_ENABLE]);
        assert_eq!(t.frames[4], vec![0xD8, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_block_erase_keeps_other_block_cached() {
        let mut nand = nand();
        let mut buf = [0u8; 4];
        nand.page_read(5, 0, &mut buf).unwrap();
        nand.block_erase(256).unwrap();
        assert_eq!(nand.cached_row(), Some(5));
    }

    #[test]
    fn test_block_erase_failure() {
        let mut nand = nand();
        nand.transport_mut().queue_status(&[0x01, 0x04]);
        assert_eq!(nand.block_erase(128), Err(Error::EraseFailed));
        assert_eq!(nand.block_erase(262_144), Err(Error::OutOfBounds));
    }

    #[test]
    fn test_read_status_timeout() {
        let mut nand = nand();
        nand.transport_mut().idle_status = 0x01;
        assert_eq!(nand.read_status(), Err(Error::Timeout));
        assert_eq!(nand.transport().count(opcodes::GET_FEATURE), 8);
    }

    #[test]
    fn test_geometry_accessors() {
        let nand = nand();
        assert_eq!(nand.page_size(), 2112);
        assert_eq!(nand.pages_per_block(), 128);
        assert_eq!(nand.block_count(), 2048);
        assert_eq!(nand.row_count(), 262_144);
        assert_eq!(nand.geometry(), &Geometry::REFERENCE);
    }
}
