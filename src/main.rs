//! spinand - A command-line tool for SPI NAND flash chips
//!
//! # Architecture
//!
//! The tool is a thin shell around `spinand-core`:
//! - A **backend** provides the SPI transport (one chip-select-bracketed
//!   exchange per command), selected with `-b name[:key=value,...]`
//! - The **driver** (`SpiNand`) owns the transport and turns page reads,
//!   programs and block erases into SPI NAND command sequences
//!
//! Every command initializes the chip first (identifier, reset, unlock), so
//! the same command implementations work with any backend.

mod backend;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use spinand_core::{DeviceId, DriverConfig, SpiNand, SpiTransport};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load driver configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Probe { backend } => {
            let (nand, id) = open_nand(&backend, config)?;
            commands::run_probe(&nand, id);
            Ok(())
        }
        Commands::Status { backend } => {
            let (mut nand, _) = open_nand(&backend, config)?;
            commands::run_status(&mut nand)
        }
        Commands::Read {
            backend,
            row,
            column,
            length,
            output,
        } => {
            let (mut nand, _) = open_nand(&backend, config)?;
            commands::run_read(&mut nand, row, column, length as usize, output.as_deref())
        }
        Commands::Write {
            backend,
            row,
            column,
            input,
            random,
        } => {
            let (mut nand, _) = open_nand(&backend, config)?;
            commands::run_write(&mut nand, row, column, &input, random)
        }
        Commands::Erase {
            backend,
            block,
            count,
        } => {
            let (mut nand, _) = open_nand(&backend, config)?;
            commands::run_erase(&mut nand, block, count)
        }
        Commands::Dump {
            backend,
            output,
            block,
            count,
        } => {
            let (mut nand, _) = open_nand(&backend, config)?;
            commands::run_dump(&mut nand, &output, block, count)
        }
        Commands::Errors => {
            commands::list_errors();
            Ok(())
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
    }
}

/// Load the driver configuration, falling back to the reference part
fn load_config(path: Option<&Path>) -> Result<DriverConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = DriverConfig::from_toml_file(path)?;
            log::info!("Loaded driver configuration from {:?}", path);
            Ok(config)
        }
        None => Ok(DriverConfig::default()),
    }
}

/// Open a backend and bring the chip up
fn open_nand(
    spec: &str,
    config: DriverConfig,
) -> Result<(SpiNand<Box<dyn SpiTransport + Send>>, DeviceId), Box<dyn std::error::Error>> {
    let transport = backend::open_backend(spec, &config)?;
    let mut nand = SpiNand::new(transport, config)?;
    let id = nand.init()?;
    Ok((nand, id))
}
