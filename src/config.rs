use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const STORE_ENV: &str = "CHANMERGE_STORE";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_OUTPUT: &str = "playlist.m3u";

/// Settings from `<store>/config.toml`. Every key is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    output: Option<PathBuf>,
    fetch_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("chanmerge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store_dir: PathBuf,
    /// Where the merged playlist is written.
    pub output: PathBuf,
    pub fetch: FetchConfig,
}

impl Config {
    /// Reads `config.toml` from the store directory if there is one.
    pub fn load(store_dir: PathBuf) -> anyhow::Result<Self> {
        let path = store_dir.join(CONFIG_FILE);
        let file = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<FileConfig>(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        Ok(Self::resolve(store_dir, file))
    }

    fn resolve(store_dir: PathBuf, file: FileConfig) -> Self {
        let defaults = FetchConfig::default();
        let output = match file.output {
            Some(p) if p.is_absolute() => p,
            Some(p) => store_dir.join(p),
            None => store_dir.join(DEFAULT_OUTPUT),
        };
        Self {
            output,
            fetch: FetchConfig {
                timeout: file
                    .fetch_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
                user_agent: file.user_agent.unwrap_or(defaults.user_agent),
            },
            store_dir,
        }
    }
}

/// `--store` wins, then `CHANMERGE_STORE`, then the platform data directory.
pub fn store_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    std::env::var_os(STORE_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::data_dir().map(|d| d.join("chanmerge")))
        .unwrap_or_else(|| PathBuf::from("."))
}
