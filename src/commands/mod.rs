//! CLI command implementations
//!
//! Every command works on an initialized [`SpiNand`](spinand_core::SpiNand)
//! driver, whatever backend it talks through.

mod dump;
mod erase;
mod errors;
mod page;
mod probe;
mod status;

pub use dump::run_dump;
pub use erase::run_erase;
pub use errors::list_errors;
pub use page::{run_read, run_write};
pub use probe::run_probe;
pub use status::run_status;

use crate::backend;

/// Print the backends compiled into this binary
pub fn list_backends() {
    let backends = backend::available_backends();
    if backends.is_empty() {
        println!("No backends available (recompile with backend features enabled)");
        return;
    }

    println!("Available backends:");
    for b in &backends {
        println!("  {:12} - {}", b.name, b.description);
    }
}
