use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres is used when set; otherwise cases live in a local JSON file.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let max_connections = match present("SUPPORT_TRIAGE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SUPPORT_TRIAGE_MAX_CONNECTIONS must be a number, got {raw:?}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url: present("DATABASE_URL"),
            data_dir: present("SUPPORT_TRIAGE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            max_connections,
        })
    }
}
