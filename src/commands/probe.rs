//! Probe command implementation

use spinand_core::{DeviceId, SpiNand, SpiTransport};

/// Show the identifier and geometry of an initialized chip
pub fn run_probe<T: SpiTransport>(nand: &SpiNand<T>, id: DeviceId) {
    let g = nand.geometry();
    let data_size = g.row_count() as u64 * g.page_size as u64;

    println!("Found SPI NAND chip:");
    println!("  ID:              {}", id);
    println!("  Page size:       {} bytes", g.page_size);
    println!("  Pages per block: {}", g.pages_per_block);
    println!("  Blocks:          {}", g.block_count);
    println!("  Rows:            {}", g.row_count());
    println!(
        "  Raw size:        {} bytes ({} MiB)",
        data_size,
        data_size / (1024 * 1024)
    );
}
