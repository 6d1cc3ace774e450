use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::terminal;

pub const DEFAULT_TERM: &str = "alacritty";
pub const DEFAULT_RATIO: f64 = 0.35;
pub const DEFAULT_TITLE: &str = "quickterm";
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
const FALLBACK_SHELL: &str = "/bin/sh";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error(
        "unsupported terminal '{0}' (supported: {list})",
        list = terminal::supported_names().join(", ")
    )]
    UnsupportedTerminal(String),

    #[error("unsupported position '{0}' (expected 'top' or 'bottom')")]
    UnsupportedPosition(String),

    #[error("ratio {0} must be a finite number greater than 0")]
    InvalidRatio(f64),
}

/// Edge of the workspace the terminal is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Top,
    Bottom,
}

impl FromStr for Position {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Position::Top),
            "bottom" => Ok(Position::Bottom),
            other => Err(ConfigError::UnsupportedPosition(other.to_string())),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Top => write!(f, "top"),
            Position::Bottom => write!(f, "bottom"),
        }
    }
}

/// Configuration as it appears on disk. Empty strings and a zero ratio count as unset.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub term: String,

    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(default)]
    pub ratio: f64,

    /// Pop out position, 'top' or 'bottom'
    #[serde(default)]
    pub pos: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default)]
    pub settle_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub term: String,
    pub extra_args: Vec<String>,
    pub ratio: f64,
    pub position: Position,
    pub title: String,
    pub shell: Option<String>,
    pub settle_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            extra_args: Vec::new(),
            ratio: DEFAULT_RATIO,
            position: Position::Top,
            title: DEFAULT_TITLE.to_string(),
            shell: None,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl TryFrom<ConfigFile> for Config {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let term = if file.term.is_empty() {
            DEFAULT_TERM.to_string()
        } else {
            file.term
        };

        let position = if file.pos.is_empty() {
            Position::Top
        } else {
            file.pos.parse()?
        };

        let ratio = if file.ratio == 0.0 {
            DEFAULT_RATIO
        } else {
            file.ratio
        };

        let config = Config {
            term,
            extra_args: file.extra_args,
            ratio,
            position,
            title: file
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            shell: file.shell.filter(|s| !s.is_empty()),
            settle_delay_ms: file.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
        };

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Load configuration from `path`, or from the default locations when none is given.
    ///
    /// An explicit path must exist. Without one, the candidates from
    /// [`Config::default_candidates`] are tried in order and the defaults are used
    /// if none exists.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(&Self::resolve_path(path)).await,
            None => match dirs::config_dir() {
                Some(dir) => Self::load_from_dir(&dir).await,
                None => {
                    info!("📄 No config directory, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Load the first existing default candidate below `config_dir`
    pub async fn load_from_dir(config_dir: &Path) -> Result<Self> {
        match Self::find_default_file(config_dir).await {
            Some(path) => Self::load_file(&path).await,
            None => {
                info!("📄 No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    async fn load_file(path: &Path) -> Result<Self> {
        info!("📄 Reading config from: {}", path.display());
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::parse_for_path(path, &content)?;
        debug!(
            "📋 Config loaded: term={} ratio={} pos={}",
            config.term, config.ratio, config.position
        );
        Ok(config)
    }

    /// Expand `~` and make the path absolute when it exists
    pub fn resolve_path(path: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());
        std::fs::canonicalize(&expanded).unwrap_or(expanded)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.try_into()
    }

    pub fn parse_json(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(content)?;
        file.try_into()
    }

    fn parse_for_path(path: &Path, content: &str) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(content),
            _ => Self::parse_toml(content),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !terminal::is_supported(&self.term) {
            return Err(ConfigError::UnsupportedTerminal(self.term.clone()));
        }
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(ConfigError::InvalidRatio(self.ratio));
        }
        Ok(())
    }

    /// Shell for in-place mode: configured value, then `$SHELL`, then `/bin/sh`.
    pub fn resolve_shell(&self) -> String {
        Self::pick_shell(self.shell.as_deref(), std::env::var("SHELL").ok())
    }

    fn pick_shell(configured: Option<&str>, env_shell: Option<String>) -> String {
        configured
            .map(str::to_string)
            .or(env_shell.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| FALLBACK_SHELL.to_string())
    }

    /// Config files looked up below `config_dir`, in priority order. The last
    /// one is where the i3-go-quickterm JSON config used to live.
    pub fn default_candidates(config_dir: &Path) -> Vec<PathBuf> {
        vec![
            config_dir.join("quickterm").join("config.toml"),
            config_dir.join("quickterm").join("config.json"),
            config_dir.join("i3-go-quickterm").join("config.json"),
        ]
    }

    async fn find_default_file(config_dir: &Path) -> Option<PathBuf> {
        for candidate in Self::default_candidates(config_dir) {
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
            debug!("No config at {}", candidate.display());
        }
        None
    }
}
