use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::anyhow;
use tracing::info;

pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub legacy_db: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            host: try_load("KZATTEND_HOST", "0.0.0.0")?,
            port: try_load("KZATTEND_PORT", &DEFAULT_PORT.to_string())?,
            data_dir: try_load("KZATTEND_DATA_DIR", "data")?,
            legacy_db: try_load("KZATTEND_LEGACY_DB", "db.json")?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
