//! Transport trait definitions
//!
//! The driver never touches the bus directly. Board support code implements
//! [`SpiTransport`] on top of whatever SPI peripheral and chip-select pin it
//! has, and hands it to [`SpiNand`](crate::flash::SpiNand).
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - With the `is_sync` feature (default), traits are blocking
//! - Without it, traits are async (suitable for Embassy, tokio)

use crate::error::Result;
use maybe_async::maybe_async;

/// SPI transport trait (sync or async depending on `is_sync` feature)
///
/// One call to [`exchange`](SpiTransport::exchange) is one transaction:
/// chip select is asserted, `write` is clocked out, `read.len()` further
/// bytes are clocked in, and chip select is released. No other transfer may
/// be interleaved inside that window.
///
/// ## Example
///
/// ```ignore
/// impl<SPI: SpiBus, CS: OutputPin> SpiTransport for Board<SPI, CS> {
///     fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
///         self.cs.set_low().map_err(|_| Error::TransferFailed)?;
///         let res = self.spi.write(write).and_then(|_| self.spi.read(read));
///         self.cs.set_high().map_err(|_| Error::TransferFailed)?;
///         res.map_err(|_| Error::TransferFailed)
///     }
///
///     fn delay_us(&mut self, us: u32) {
///         self.delay.delay_us(us);
///     }
/// }
/// ```
#[maybe_async(AFIT)]
pub trait SpiTransport {
    /// Execute one chip-select-bracketed write-then-read transaction
    ///
    /// Implementations should report bus failures as
    /// [`Error::TransferFailed`](crate::Error::TransferFailed).
    async fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<()>;

    /// Delay for the specified number of microseconds
    async fn delay_us(&mut self, us: u32);

    /// Delay for the specified number of milliseconds
    async fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000)).await
    }

    /// Configure the chip-select pin as an output and drive it inactive
    ///
    /// Called once from [`SpiNand::init`](crate::flash::SpiNand::init).
    fn configure_chip_select(&mut self) -> Result<()> {
        Ok(())
    }
}

// Blanket impl for boxed transports to allow trait objects (sync mode only)
// In async mode, traits with async fn are not object-safe
#[cfg(all(feature = "alloc", feature = "is_sync"))]
impl SpiTransport for alloc::boxed::Box<dyn SpiTransport + Send> {
    fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).exchange(write, read)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn configure_chip_select(&mut self) -> Result<()> {
        (**self).configure_chip_select()
    }
}
