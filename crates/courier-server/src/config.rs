//! Server configuration.

use std::net::SocketAddr;
use std::path::Path;

use courier_proto::WireFormat;
use serde::{Deserialize, Serialize};

/// Configuration for the remoting HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the endpoint binds to.
    pub bind_addr: SocketAddr,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Wire format assumed when a request carries no content type.
    pub default_format: WireFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8077)),
            max_body_bytes: 4 * 1024 * 1024,
            default_format: WireFormat::Binary,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML or JSON file, selected by extension.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: ServerConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: ServerConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8077)));
        assert_eq!(config.max_body_bytes, 4 * 1024 * 1024);
        assert_eq!(config.default_format, WireFormat::Binary);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "bind_addr = \"127.0.0.1:9000\"\nmax_body_bytes = 1024\ndefault_format = \"json\""
        )
        .unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.default_format, WireFormat::Json);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            file,
            "{{\"bind_addr\":\"0.0.0.0:8078\",\"max_body_bytes\":2048,\"default_format\":\"binary\"}}"
        )
        .unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8078)));
        assert_eq!(config.default_format, WireFormat::Binary);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }
}
