//! Backend registration and dispatch
//!
//! A backend is the SPI transport the driver talks through. Backends are
//! selected with a string of the form `name[:key=value,...]`, e.g.
//! `dummy:image=flash.bin,busy=3`.

use std::collections::HashMap;
use std::path::PathBuf;

use spinand_core::transport::SpiTransport;
use spinand_core::DriverConfig;
use thiserror::Error;

/// Backend selection and setup errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Parameter without `=`
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidFormat(String),

    /// No backend with this name is compiled in
    #[error("Unknown backend: '{0}' [available: {1}]")]
    UnknownBackend(String, String),

    /// Parameter the backend does not understand
    #[error("Unknown parameter '{key}' for backend '{backend}'")]
    UnknownParameter { backend: String, key: String },

    /// Parameter value that cannot be parsed
    #[error("Invalid value '{value}' for parameter '{key}'")]
    InvalidValue { key: String, value: String },

    /// Failed to read or write a backing file
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Information about a backend
pub struct BackendInfo {
    /// Name used in the backend string
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "In-memory SPI NAND emulator (image=<file>,busy=<polls>,id=<hex>)",
    });

    backends
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parsed backend string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendParams {
    /// Backend name
    pub name: String,
    /// Key/value options
    pub params: HashMap<String, String>,
}

impl BackendParams {
    /// Check that only the given keys are present
    #[cfg_attr(not(feature = "dummy"), allow(dead_code))]
    fn check_keys(&self, allowed: &[&str]) -> Result<()> {
        match self.params.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(BackendError::UnknownParameter {
                backend: self.name.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Parse a backend string into name and parameters
///
/// Format: `name` or `name:key1=value1,key2=value2`
pub fn parse_backend_params(s: &str) -> Result<BackendParams> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            match opt.split_once('=') {
                Some((key, value)) => {
                    params.insert(key.to_string(), value.to_string());
                }
                None => return Err(BackendError::InvalidFormat(opt.to_string())),
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> std::result::Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Open the transport described by `spec`
///
/// The driver configuration supplies the geometry emulated backends use.
pub fn open_backend(
    spec: &str,
    config: &DriverConfig,
) -> Result<Box<dyn SpiTransport + Send>> {
    let params = parse_backend_params(spec)?;
    log::debug!("Opening backend '{}' with {:?}", params.name, params.params);

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => dummy::open(&params, config),
        _ => {
            let _ = config;
            Err(BackendError::UnknownBackend(
                params.name.clone(),
                backend_names_short(),
            ))
        }
    }
}

#[cfg(feature = "dummy")]
mod dummy {
    use super::{parse_hex_u32, BackendError, BackendParams, Result};
    use spinand_core::protocol::DeviceId;
    use spinand_core::transport::SpiTransport;
    use spinand_core::DriverConfig;
    use spinand_dummy::{DummyConfig, DummyNand};
    use std::path::PathBuf;

    /// Dummy chip whose array is loaded from and saved back to a file
    pub struct ImageBackedDummy {
        nand: DummyNand,
        path: PathBuf,
    }

    impl ImageBackedDummy {
        fn save(&self) -> std::io::Result<()> {
            std::fs::write(&self.path, self.nand.image())
        }
    }

    impl SpiTransport for ImageBackedDummy {
        fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> spinand_core::Result<()> {
            self.nand.exchange(write, read)
        }

        fn delay_us(&mut self, us: u32) {
            self.nand.delay_us(us)
        }
    }

    impl Drop for ImageBackedDummy {
        fn drop(&mut self) {
            match self.save() {
                Ok(()) => log::debug!("Saved dummy image to {}", self.path.display()),
                Err(e) => log::error!("Failed to save dummy image to {}: {}", self.path.display(), e),
            }
        }
    }

    fn parse_value(key: &str, value: &str) -> Result<u32> {
        parse_hex_u32(value).map_err(|_| BackendError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub(super) fn dummy_config(params: &BackendParams, config: &DriverConfig) -> Result<DummyConfig> {
        params.check_keys(&["image", "busy", "id"])?;

        let mut dummy = DummyConfig {
            geometry: config.geometry,
            ..DummyConfig::default()
        };

        if let Some(busy) = params.params.get("busy") {
            dummy.busy_polls = parse_value("busy", busy)?;
        }

        if let Some(id) = params.params.get("id") {
            let raw = parse_value("id", id)?;
            if raw > 0xFFFF {
                return Err(BackendError::InvalidValue {
                    key: "id".to_string(),
                    value: id.clone(),
                });
            }
            dummy.id = DeviceId {
                manufacturer: (raw >> 8) as u8,
                device: raw as u8,
            };
        }

        Ok(dummy)
    }

    pub(super) fn open(
        params: &BackendParams,
        config: &DriverConfig,
    ) -> Result<Box<dyn SpiTransport + Send>> {
        let dummy = dummy_config(params, config)?;

        let path = match params.params.get("image") {
            Some(path) => PathBuf::from(path),
            None => return Ok(Box::new(DummyNand::new(dummy))),
        };

        let nand = if path.exists() {
            let image = std::fs::read(&path).map_err(|source| BackendError::Io {
                path: path.clone(),
                source,
            })?;
            log::info!("Loaded {} bytes from {}", image.len(), path.display());
            DummyNand::with_image(dummy, &image)
        } else {
            log::info!("{} does not exist, starting with an erased chip", path.display());
            DummyNand::new(dummy)
        };

        Ok(Box::new(ImageBackedDummy { nand, path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let params = parse_backend_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());

        let params = parse_backend_params("dummy:image=flash.bin,busy=3").unwrap();
        assert_eq!(params.name, "dummy");
        assert_eq!(params.params.get("image").map(String::as_str), Some("flash.bin"));
        assert_eq!(params.params.get("busy").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_parse_backend_params_invalid() {
        assert!(matches!(
            parse_backend_params("dummy:image"),
            Err(BackendError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x2C24"), Ok(0x2C24));
        assert_eq!(parse_hex_u32("262143"), Ok(262_143));
        assert!(parse_hex_u32("zz").is_err());
    }

    #[test]
    fn test_unknown_backend() {
        let config = DriverConfig::default();
        assert!(matches!(
            open_backend("ch341a", &config),
            Err(BackendError::UnknownBackend(..))
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_params() {
        let config = DriverConfig::default();
        let params = parse_backend_params("dummy:busy=4,id=0xC851").unwrap();
        let dummy = dummy::dummy_config(&params, &config).unwrap();
        assert_eq!(dummy.busy_polls, 4);
        assert_eq!(dummy.id.manufacturer, 0xC8);
        assert_eq!(dummy.id.device, 0x51);

        let params = parse_backend_params("dummy:speed=10").unwrap();
        assert!(matches!(
            dummy::dummy_config(&params, &config),
            Err(BackendError::UnknownParameter { .. })
        ));

        let params = parse_backend_params("dummy:id=0x12345").unwrap();
        assert!(matches!(
            dummy::dummy_config(&params, &config),
            Err(BackendError::InvalidValue { .. })
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_image_persists() {
        use spinand_core::flash::SpiNand;
        use spinand_core::Geometry;

        let path = std::env::temp_dir().join(format!("spinand-test-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let spec = format!("dummy:image={}", path.display());
        let config = DriverConfig::new(Geometry::new(2112, 4, 4));

        {
            let transport = open_backend(&spec, &config).unwrap();
            let mut nand = SpiNand::new(transport, config).unwrap();
            nand.init().unwrap();
            nand.page_write(1, 0, &[0x12, 0x34]).unwrap();
        }

        let image = std::fs::read(&path).unwrap();
        assert_eq!(image.len(), 2 * 2112);
        assert_eq!(&image[2112..2114], &[0x12, 0x34]);

        {
            let transport = open_backend(&spec, &config).unwrap();
            let mut nand = SpiNand::new(transport, config).unwrap();
            nand.init().unwrap();
            let mut buf = [0u8; 2];
            nand.page_read(1, 0, &mut buf).unwrap();
            assert_eq!(buf, [0x12, 0x34]);
        }

        let _ = std::fs::remove_file(&path);
    }
}
