use crate::auth::AuthConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the content hub backend and session client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1337,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL; login is refused when unset
    pub backend_url: Option<String>,
    pub provider: String,
    pub store_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            provider: crate::auth::providers::feedforward::PROVIDER_NAME.to_string(),
            store_path: PathBuf::from(".contenthub/session.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `CONTENTHUB_` variables.
    ///
    /// Common settings have flat names (`CONTENTHUB_PORT`,
    /// `CONTENTHUB_JWT_SECRET`, ...). Any field can also be set with a
    /// nested key using a double underscore, e.g. `CONTENTHUB_AUTH__JWT_EXPIRES_IN`.
    /// Nested keys win over flat ones, which win over the file.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        let config = figment
            .merge(flat_env())
            .merge(Env::prefixed("CONTENTHUB_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Configuration for tests: fixed secret, loopback host
    pub fn test_config_with_port(port: u16) -> Self {
        let mut config = Self::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.auth.jwt_secret = "test-jwt-secret-that-is-long-enough!".to_string();
        config
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Flat `CONTENTHUB_*` names and the config key each one sets
const FLAT_ENV_KEYS: &[(&str, &str)] = &[
    ("host", "server.host"),
    ("port", "server.port"),
    ("frontend_url", "server.frontend_url"),
    ("jwt_secret", "auth.jwt_secret"),
    ("feedforward_origin", "auth.feedforward_origin"),
    ("callback_url", "auth.callback_url"),
    ("backend_url", "client.backend_url"),
    ("log_level", "logging.level"),
];

fn flat_env() -> Env {
    let names: Vec<&str> = FLAT_ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::prefixed("CONTENTHUB_").only(&names).map(|key| {
        FLAT_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
            .unwrap_or_else(|| key.as_str().into())
    })
}
