//! Page read and write commands

use spinand_core::{SpiNand, SpiTransport};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Read `length` bytes of `row` starting at `column`
///
/// Writes the bytes to `output`, or prints a hex dump if no file is given.
pub fn run_read<T: SpiTransport>(
    nand: &mut SpiNand<T>,
    row: u32,
    column: u16,
    length: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = vec![0u8; length];
    let n = nand.page_read(row, column, &mut buf)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&buf[..n])?;
            println!("Wrote {} bytes to {:?}", n, path);
        }
        None => print_hex_dump(column as usize, &buf[..n]),
    }

    Ok(())
}

/// Program the contents of `input` into `row` starting at `column`
pub fn run_write<T: SpiTransport>(
    nand: &mut SpiNand<T>,
    row: u32,
    column: u16,
    input: &Path,
    random: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut data = Vec::new();
    File::open(input)?.read_to_end(&mut data)?;

    let n = if random {
        nand.page_write_random(row, column, &data)?
    } else {
        nand.page_write(row, column, &data)?
    };

    println!("Programmed {} bytes at row {} column {}", n, row, column);
    Ok(())
}

/// Format one hex dump line: offset, hex bytes, ASCII
fn hex_dump_line(offset: usize, chunk: &[u8]) -> String {
    let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
    let ascii: String = chunk
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect();
    format!("{:04X}: {:<47}  {}", offset, hex.join(" "), ascii)
}

fn print_hex_dump(start: usize, data: &[u8]) {
    for (i, chunk) in data.chunks(16).enumerate() {
        println!("{}", hex_dump_line(start + i * 16, chunk));
    }
}
