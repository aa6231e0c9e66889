use std::{
    env,
    net::{IpAddr, Ipv6Addr},
    path::PathBuf,
};

pub const DEFAULT_PORT: u16 = 3100;
/// `::`, which also takes IPv4 clients where the host allows dual-stack.
pub const DEFAULT_HOST: IpAddr = IpAddr::V6(Ipv6Addr::UNSPECIFIED);

#[derive(Clone, Debug)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_path: PathBuf,
}

impl Config {
    pub fn new(port: u16, log_path: impl Into<PathBuf>) -> Self {
        Config {
            host: DEFAULT_HOST,
            port,
            log_path: log_path.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let host = match env::var("HOST") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidHost(raw))?,
            Err(_) => DEFAULT_HOST,
        };

        let log_path = env::var_os("SLEEP_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_log_path);

        Ok(Config {
            host,
            port,
            log_path,
        })
    }
}

/// `logs/sleep.log` beside the executable, or beside the working directory
/// when the executable location is unknown.
pub fn default_log_path() -> PathBuf {
    let base = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_default();
    base.join("logs").join("sleep.log")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),

    #[error("invalid HOST value {0:?}")]
    InvalidHost(String),
}
