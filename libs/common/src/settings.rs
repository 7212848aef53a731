//! Per-service runtime settings loaded with the `config` crate

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the service binds to
    pub bind_addr: String,
}

impl ServerConfig {
    /// Load settings from `<PREFIX>_*` environment variables
    ///
    /// # Environment Variables
    /// - `<PREFIX>_BIND_ADDR`: listener address (default: `default_bind_addr`)
    pub fn from_env(prefix: &str, default_bind_addr: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", default_bind_addr)?
            .add_source(Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_config_default() {
        unsafe {
            std::env::remove_var("FAIRTEST_BIND_ADDR");
        }

        let config = ServerConfig::from_env("FAIRTEST", "0.0.0.0:3001").unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    #[serial]
    fn test_server_config_override() {
        unsafe {
            std::env::set_var("FAIRTEST_BIND_ADDR", "127.0.0.1:9000");
        }

        let config = ServerConfig::from_env("FAIRTEST", "0.0.0.0:3001").unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");

        unsafe {
            std::env::remove_var("FAIRTEST_BIND_ADDR");
        }
    }
}
