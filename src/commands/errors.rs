//! Error code listing

use spinand_core::{error_to_string, Error};

/// Print every driver error code with its description
pub fn list_errors() {
    println!("{:>6}  {}", 0, error_to_string(0));
    for e in Error::ALL {
        println!("{:>6}  {}", e.code(), error_to_string(e.code()));
    }
}
