//! Runtime settings read from the environment (and `.env` via dotenv).

use std::path::PathBuf;

/// Default file used by `save`/`load` without an argument.
pub const DEFAULT_SAVE_FILE: &str = "subnets.json";
/// Default log4rs configuration file.
pub const DEFAULT_LOG_CONFIG: &str = "log4rs.yml";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `SUBNETS_SAVE_FILE`
    pub save_file: PathBuf,
    /// `SUBNETS_LOG_CONFIG`
    pub log_config: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            save_file: PathBuf::from(DEFAULT_SAVE_FILE),
            log_config: PathBuf::from(DEFAULT_LOG_CONFIG),
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    pub fn from_env() -> Config {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };
        Config {
            save_file: get("SUBNETS_SAVE_FILE", defaults.save_file),
            log_config: get("SUBNETS_LOG_CONFIG", defaults.log_config),
        }
    }
}
