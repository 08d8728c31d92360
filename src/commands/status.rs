//! Status command implementation

use spinand_core::spi::opcodes;
use spinand_core::{SpiNand, SpiTransport};

/// Show the status, lock and configuration registers
pub fn run_status<T: SpiTransport>(
    nand: &mut SpiNand<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = nand.read_status()?;
    let lock = nand.get_feature(opcodes::FEATURE_LOCK)?;
    let config = nand.get_feature(opcodes::FEATURE_CONFIG)?;

    println!("Status register:  0x{:02X}", status.bits());
    println!("  Busy:           {}", status.is_busy());
    println!("  Write enabled:  {}", status.is_write_enabled());
    println!("  Erase failed:   {}", status.erase_failed());
    println!("  Program failed: {}", status.program_failed());
    println!("  ECC:            {:?}", status.ecc());
    println!("Lock register:    0x{:02X}", lock);
    println!("Config register:  0x{:02X}", config);

    Ok(())
}
