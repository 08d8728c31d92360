//! Erase command implementation

use spinand_core::{Error, SpiNand, SpiTransport};

/// Erase `count` blocks starting at `first_block`
///
/// Blocks that report an erase failure are listed and skipped; the command
/// fails if any block could not be erased.
pub fn run_erase<T: SpiTransport>(
    nand: &mut SpiNand<T>,
    first_block: u32,
    count: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let end = first_block
        .checked_add(count)
        .filter(|&end| end <= nand.block_count())
        .ok_or(Error::OutOfBounds)?;

    let mut failed = Vec::new();
    for block in first_block..end {
        let row = nand.geometry().first_row_of_block(block);
        match nand.block_erase(row) {
            Ok(()) => log::debug!("Erased block {}", block),
            Err(Error::EraseFailed) => {
                log::warn!("Block {} failed to erase", block);
                failed.push(block);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("Erased {} of {} block(s)", count as usize - failed.len(), count);
    if !failed.is_empty() {
        println!("Bad blocks: {:?}", failed);
        return Err(Error::EraseFailed.into());
    }
    Ok(())
}
