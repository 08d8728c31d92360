//! CLI argument parsing

use crate::backend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    backend::parse_hex_u32(s)
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let value = backend::parse_hex_u32(s)?;
    u16::try_from(value).map_err(|_| format!("Value out of range: {}", value))
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use [available: {}]",
        backend::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spinand")]
#[command(author, version, about = "SPI NAND flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Driver configuration file (TOML: geometry, poll policy, expected id)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the chip and show its identifier and geometry
    Probe {
        /// Backend to use
        #[arg(short, long, default_value = "dummy", help = backend_help())]
        backend: String,
    },

    /// Show the status and feature registers
    Status {
        /// Backend to use
        #[arg(short, long, default_value = "dummy", help = backend_help())]
        backend: String,
    },

    /// Read part of a page
    Read {
        /// Backend to use
        #[arg(short, long, default_value = "dummy", help = backend_help())]
        backend: String,

        /// Row (page) address
        #[arg(short, long, value_parser = parse_hex_u32)]
        row: u32,

        /// Byte offset inside the page
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u16)]
        column: u16,

        /// Number of bytes to read
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,

        /// Output file (hex dump to stdout if not given)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Program a file into part of a page
    Write {
        /// Backend to use
        #[arg(short, long, default_value = "dummy", help = backend_help())]
        backend: String,

        /// Row (page) address
        #[arg(short, long, value_parser = parse_hex_u32)]
        row: u32,

        /// Byte offset inside the page
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u16)]
        column: u16,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Keep the rest of the cache register instead of padding with 0xFF
        #[arg(long)]
        random: bool,
    },

    /// Erase blocks
    Erase {
        /// Backend to use
        #[arg(short, long, default_value = "dummy", help = backend_help())]
        backend: String,

        /// First block to erase
        #[arg(long, value_parser = parse_hex_u32)]
        block: u32,

        /// Number of blocks to erase
        #[arg(long, default_value = "1", value_parser = parse_hex_u32)]
        count: u32,
    },

    /// Read whole blocks to a file
    Dump {
        /// Backend to use
        #[arg(short, long, default_value = "dummy", help = backend_help())]
        backend: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First block to read
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        block: u32,

        /// Number of blocks to read (default: to the end of the chip)
        #[arg(long, value_parser = parse_hex_u32)]
        count: Option<u32>,
    },

    /// List driver error codes
    Errors,

    /// List available backends
    ListBackends,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16("0x834"), Ok(0x834));
        assert!(parse_hex_u16("70000").is_err());
    }

    #[test]
    fn test_parse_read() {
        let cli = Cli::parse_from([
            "spinand", "-v", "read", "-r", "5", "-c", "0x10", "-l", "16",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Read {
                backend,
                row,
                column,
                length,
                output,
            } => {
                assert_eq!(backend, "dummy");
                assert_eq!(row, 5);
                assert_eq!(column, 0x10);
                assert_eq!(length, 16);
                assert!(output.is_none());
            }
            _ => panic!("expected read command"),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
