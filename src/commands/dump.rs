//! Dump command implementation

use indicatif::{ProgressBar, ProgressStyle};
use spinand_core::{Error, SpiNand, SpiTransport};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Read whole blocks into `output`, one raw page (data + spare) per row
///
/// A read must end strictly inside the page, so the last byte of every page
/// is written as 0xFF. Pages with uncorrectable ECC errors are written as
/// 0xFF and reported.
pub fn run_dump<T: SpiTransport>(
    nand: &mut SpiNand<T>,
    output: &Path,
    first_block: u32,
    count: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = *nand.geometry();
    let count = count.unwrap_or_else(|| geometry.block_count.saturating_sub(first_block));
    let end = first_block
        .checked_add(count)
        .filter(|&end| end <= geometry.block_count)
        .ok_or(Error::OutOfBounds)?;

    let page_size = geometry.page_size as usize;
    let first_row = geometry.first_row_of_block(first_block);
    let last_row = geometry.first_row_of_block(end);
    let total = (last_row - first_row) as u64 * page_size as u64;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut writer = BufWriter::new(File::create(output)?);
    let mut page = vec![0xFFu8; page_size];
    let mut bad_rows = Vec::new();

    for row in first_row..last_row {
        page.fill(0xFF);
        match nand.page_read(row, 0, &mut page[..page_size - 1]) {
            Ok(_) => {}
            Err(Error::BadBlock) => {
                log::warn!("Uncorrectable ECC error in row {}", row);
                page.fill(0xFF);
                bad_rows.push(row);
            }
            Err(e) => {
                pb.abandon();
                return Err(e.into());
            }
        }
        writer.write_all(&page)?;
        pb.inc(page_size as u64);
    }

    writer.flush()?;
    pb.finish_with_message("Dump complete");

    println!("Wrote {} bytes to {:?}", total, output);
    if !bad_rows.is_empty() {
        println!("{} page(s) with uncorrectable errors: {:?}", bad_rows.len(), bad_rows);
    }
    Ok(())
}
