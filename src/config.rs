//! Configuration loading and management
//!
//! Settings live in a TOML file. Lookup order: `--config`, then
//! `$KIOSK_CONFIG`, then `$HOME/.config/kiosk-daemon/config.toml`. Only the
//! last one may be missing; every section falls back to its defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "KIOSK_CONFIG";

/// Shortest tick period, whatever the configured frame rate
const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// Daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub phrases: PhraseConfig,
    #[serde(default)]
    pub speech: ProgramConfig,
    #[serde(default)]
    pub recognition: ProgramConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub vision: VisionConfig,

    /// File the settings came from; `None` means built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Logging and loop pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Camera frames (ticks) per second
    pub frame_rate: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frame_rate: 15.0,
        }
    }
}

/// Speech exchange tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Seconds to wait for a recognition result
    pub recognition_timeout_secs: u64,
    /// Length of the `Z` relay test pulse, in ticks
    pub relay_pulse_ticks: u32,
    /// Spoken once at start-up when non-empty
    pub greeting: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            recognition_timeout_secs: 15,
            relay_pulse_ticks: 10,
            greeting: String::new(),
        }
    }
}

/// Scripted phrase source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    pub path: PathBuf,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("phrases.txt"),
        }
    }
}

/// External program backing a speech worker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
}

/// Serial relay controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub enabled: bool,
    pub port: PathBuf,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: PathBuf::from("/dev/ttyUSB0"),
        }
    }
}

/// Camera and detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Require eyes inside a detected face
    pub eyes: bool,
    /// Require a grin inside a detected face
    pub grin: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            eyes: true,
            grin: false,
            width: 640,
            height: 480,
        }
    }
}

impl Config {
    /// Load configuration, honoring an explicit path if given
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok();
        let home = std::env::var("HOME").ok();

        match resolve_path(explicit, env_path, home) {
            Some(ConfigPath::Required(path)) => Self::load_from(&path),
            Some(ConfigPath::Optional(path)) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.source = Some(path.to_owned());
        Ok(config)
    }

    /// Time between ticks, never below one millisecond
    ///
    /// Non-finite or non-positive rates fall back to the default rate.
    pub fn frame_period(&self) -> Duration {
        let rate = self.general.frame_rate;
        let rate = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            GeneralConfig::default().frame_rate
        };
        Duration::from_secs_f64(1.0 / rate).max(MIN_FRAME_PERIOD)
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange.recognition_timeout_secs)
    }
}

/// Where to look for the config file
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigPath {
    /// Named explicitly; must exist
    Required(PathBuf),
    /// Conventional location; may be absent
    Optional(PathBuf),
}

fn resolve_path(
    explicit: Option<&Path>,
    env_path: Option<String>,
    home: Option<String>,
) -> Option<ConfigPath> {
    if let Some(path) = explicit {
        return Some(ConfigPath::Required(path.to_owned()));
    }
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(ConfigPath::Required(PathBuf::from(path)));
    }
    home.map(|home| {
        ConfigPath::Optional(
            PathBuf::from(home)
                .join(".config")
                .join("kiosk-daemon")
                .join("config.toml"),
        )
    })
}
