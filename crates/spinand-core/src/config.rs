//! Driver configuration
//!
//! [`DriverConfig`] defaults to the reference 2 Gbit part. With the `std`
//! feature it can also be loaded from TOML:
//!
//! ```toml
//! reset_delay_ms = 7
//! expected_id = { manufacturer = 0x2C, device = 0x24 }
//!
//! [geometry]
//! page_size = 2112
//! pages_per_block = 64
//! block_count = 2048
//!
//! [poll]
//! interval_us = 115
//! max_polls = 20000
//! ```

use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::protocol::DeviceId;

/// Typical page read latency of the reference part, in microseconds
pub const DEFAULT_POLL_INTERVAL_US: u32 = 115;

/// Poll limit: about 2.3 s at the default interval, well above the
/// worst-case block erase time
pub const DEFAULT_MAX_POLLS: u32 = 20_000;

/// Settling time after a reset command, in milliseconds
pub const DEFAULT_RESET_DELAY_MS: u32 = 7;

/// How the status poller waits for operation-in-progress to clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct PollPolicy {
    /// Delay between status reads, in microseconds
    pub interval_us: u32,
    /// Status reads before giving up with [`Error::Timeout`]
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_us: DEFAULT_POLL_INTERVAL_US,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

impl PollPolicy {
    /// Worst-case time spent sleeping before a timeout, in microseconds
    ///
    /// The poller does not sleep after its last read.
    pub fn budget_us(&self) -> u64 {
        self.interval_us as u64 * (self.max_polls as u64).saturating_sub(1)
    }
}

/// Configuration for a [`SpiNand`](crate::flash::SpiNand) driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct DriverConfig {
    /// Device geometry
    pub geometry: Geometry,
    /// Status polling policy
    pub poll: PollPolicy,
    /// Delay after reset before the first status poll, in milliseconds
    pub reset_delay_ms: u32,
    /// Identifier `init` must read back, if set
    pub expected_id: Option<DeviceId>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new(Geometry::REFERENCE)
    }
}

impl DriverConfig {
    /// Create a configuration for the given geometry
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            poll: PollPolicy::default(),
            reset_delay_ms: DEFAULT_RESET_DELAY_MS,
            expected_id: None,
        }
    }

    /// Set the geometry
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the poll policy
    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Set the reset settling delay
    pub fn with_reset_delay_ms(mut self, ms: u32) -> Self {
        self.reset_delay_ms = ms;
        self
    }

    /// Require `init` to find this identifier
    pub fn with_expected_id(mut self, id: DeviceId) -> Self {
        self.expected_id = Some(id);
        self
    }

    /// Check that the driver can operate with this configuration
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        if self.poll.max_polls == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
mod toml_config {
    use super::DriverConfig;
    use std::path::Path;
    use std::string::{String, ToString};

    /// Error loading a TOML driver configuration
    #[derive(Debug)]
    pub enum ConfigError {
        /// The file could not be read
        Io(std::io::Error),
        /// The file is not a valid configuration
        Parse(String),
        /// The configuration parsed but cannot be used
        Invalid(crate::error::Error),
    }

    impl core::fmt::Display for ConfigError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                Self::Io(e) => write!(f, "failed to read config: {}", e),
                Self::Parse(msg) => write!(f, "failed to parse config: {}", msg),
                Self::Invalid(e) => write!(f, "invalid config: {}", e),
            }
        }
    }

    impl std::error::Error for ConfigError {}

    impl DriverConfig {
        /// Parse a configuration from a TOML string
        ///
        /// Missing fields keep their defaults.
        pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
            let config: DriverConfig =
                toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.validate().map_err(ConfigError::Invalid)?;
            Ok(config)
        }

        /// Load a configuration from a TOML file
        pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            Self::from_toml_str(&content)
        }
    }
}

#[cfg(feature = "std")]
pub use toml_config::ConfigError;
