use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

/// HTTP server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Bind address in `host:port` form
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("SERVER_HOST", "0.0.0.0"),
            port: env_parse_or("SERVER_PORT", 3000)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        temp_env::with_vars_unset(["SERVER_HOST", "SERVER_PORT"], || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.port, 3000);
            assert_eq!(config.addr(), "0.0.0.0:3000");
        });
    }

    #[test]
    fn test_server_config_from_env() {
        temp_env::with_vars(
            [("SERVER_HOST", Some("127.0.0.1")), ("SERVER_PORT", Some("8080"))],
            || {
                let config = ServerConfig::from_env().unwrap();
                assert_eq!(config.addr(), "127.0.0.1:8080");
            },
        );
    }

    #[test]
    fn test_server_config_invalid_port() {
        temp_env::with_var("SERVER_PORT", Some("not-a-port"), || {
            assert!(ServerConfig::from_env().is_err());
        });
    }
}
