use std::path::PathBuf;

pub const DATA_PATH_ENV: &str = "JMC_DATA_PATH";
pub const BIND_ENV: &str = "JMC_BIND";

const DEFAULT_DATA_PATH: &str = "data.json";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Settings read from the environment, with `.env` loaded first if present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_path: PathBuf,
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(DATA_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            config.bind = bind;
        }
        config
    }
}
