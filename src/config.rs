use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagram::DiagramTheme;
use crate::{dlog_debug, Error, Result};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which visual theme the diagram renderer is initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSetting {
    /// Derive from the terminal (`COLORFGBG`) once at startup.
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeSetting {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::Config(format!("unknown theme '{}'", other))),
        }
    }

    /// Resolve to a concrete theme. `colorfgbg` is the raw `COLORFGBG`
    /// value ("fg;bg"); background colours 0-6 and 8 are dark.
    pub fn resolve(self, colorfgbg: Option<&str>) -> DiagramTheme {
        match self {
            Self::Light => DiagramTheme::Default,
            Self::Dark => DiagramTheme::Dark,
            Self::Auto => {
                let bg = colorfgbg
                    .and_then(|v| v.rsplit(';').next())
                    .and_then(|bg| bg.trim().parse::<u8>().ok());
                match bg {
                    Some(0..=6) | Some(8) => DiagramTheme::Dark,
                    Some(_) => DiagramTheme::Default,
                    None => DiagramTheme::Dark,
                }
            }
        }
    }
}

/// What to do with a fetch trigger while the same fetch is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Every trigger fetches; the last completion wins.
    #[default]
    Overlap,
    /// Triggers are dropped while a fetch of the same kind is in flight.
    Coalesce,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    /// Read tasks and templates from a local directory instead of HTTP.
    pub data_dir: Option<String>,
    #[serde(default)]
    pub theme: ThemeSetting,
    #[serde(default)]
    pub fetch_policy: FetchPolicy,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskdeck"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.toml"))
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn effective_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_deref().map(expand_tilde)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Resolve the diagram theme from the environment. Called once.
    pub fn diagram_theme(&self) -> DiagramTheme {
        let colorfgbg = std::env::var("COLORFGBG").ok();
        self.theme.resolve(colorfgbg.as_deref())
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        dlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            dlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        dlog_debug!(
            "Config loaded: base_url={:?} data_dir={:?} theme={:?} fetch_policy={:?}",
            config.base_url,
            config.data_dir,
            config.theme,
            config.fetch_policy
        );
        Ok(config)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
