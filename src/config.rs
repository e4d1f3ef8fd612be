use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Context as _;

use crate::error::{ArtwallError, ArtwallResult};

/// User configuration, deserialized from a JSON or TOML file.
///
/// Unknown top-level keys are ignored; every field has a default so an empty
/// document is a valid (if useless) config.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Composite order for rendered layers. Empty means declaration order.
    pub blender: Vec<LayerId>,
    pub log_level: LogLevel,

    /// Shell command that applies the finished wallpaper. `{0}`, `{out}` and
    /// `{output}` expand to the output file path; live variables are also
    /// available.
    pub set_command: String,
    /// Shell command that restores the default wallpaper.
    pub reset_command: String,

    /// Shell command printing `WIDTHxHEIGHT` of the biggest screen.
    pub screen_resolution_command: String,

    pub layers: Vec<Layer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blender: Vec::new(),
            log_level: LogLevel::Info,
            set_command: r#"feh --bg-fill "{0}""#.to_string(),
            reset_command: "nitrogen --restore".to_string(),
            screen_resolution_command:
                "xrandr | grep '*' | cut -d' ' -f4 | sort --human-numeric-sort --reverse | head -n 1"
                    .to_string(),
            layers: Vec::new(),
        }
    }
}

/// A named sub-pipeline whose output is one intermediate bitmap.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub name: LayerId,
    pub processors: Vec<ProcessorCall>,
}

/// One step of a layer: a processor name plus raw (pre-substitution) args.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProcessorCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<BTreeMap<String, serde_json::Value>>,
}

/// Layer names may be strings or bare integers in the config file.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LayerId {
    Index(i64),
    Name(String),
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Index(n) => write!(f, "{n}"),
            LayerId::Name(s) => f.write_str(s),
        }
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        LayerId::Name(s.to_string())
    }
}

impl From<i64> for LayerId {
    fn from(n: i64) -> Self {
        LayerId::Index(n)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> ArtwallResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match ext {
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            other => Err(ArtwallError::config(format!(
                "unknown config format '{other}'. Supported formats: json, toml"
            ))),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> ArtwallResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        match format {
            ConfigFormat::Json => serde_json::from_str(&raw)
                .map_err(|e| ArtwallError::config(format!("malformed json config: {e}"))),
            ConfigFormat::Toml => toml::from_str(&raw)
                .map_err(|e| ArtwallError::config(format!("malformed toml config: {e}"))),
        }
    }

    pub fn save(&self, path: &Path) -> ArtwallResult<()> {
        let format = ConfigFormat::from_path(path)?;
        let raw = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ArtwallError::config(format!("serialize config: {e}")))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ArtwallError::config(format!("serialize config: {e}")))?,
        };
        std::fs::write(path, raw).with_context(|| format!("write config '{}'", path.display()))?;
        Ok(())
    }
}
