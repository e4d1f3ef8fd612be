use std::path::PathBuf;

use anyhow::Context as _;
use image::RgbaImage;

use crate::config::Config;
use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::{ProcessorFn, ProcessorRegistry};
use crate::template::VarSet;
use crate::vars::{ProviderFn, ProviderRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

/// Track metadata as reported over MPRIS. Everything is optional; players
/// differ wildly in what they fill in.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackMetadata {
    pub track_id: Option<String>,
    pub art_url: Option<String>,
    pub album: Option<String>,
    pub artists: Option<Vec<String>>,
    pub title: Option<String>,
    pub track_number: Option<i64>,
    pub url: Option<String>,
}

/// Process-wide mutable state: configuration, screen, last-seen track,
/// images, registries and the live variable set.
///
/// The context is owned by the event loop; pipeline runs borrow it
/// read-only, so reload and processing never overlap.
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    pub screen: Screen,
    pub metadata: TrackMetadata,
    pub last_status: String,
    pub src_image: Option<RgbaImage>,
    pub previous_image: Option<RgbaImage>,
    /// Re-read config and screen size on every track change.
    pub reload_on_track: bool,
    processors: ProcessorRegistry,
    providers: ProviderRegistry,
    pub variables: VarSet,
}

impl Context {
    /// Build a context from a config file and probe the screen.
    pub fn new(config_path: PathBuf) -> ArtwallResult<Self> {
        let mut ctx = Self::with_config(Config::default(), Screen::default());
        ctx.config_path = config_path;
        ctx.reload()?;
        Ok(ctx)
    }

    /// Build a context around an in-memory config, skipping file and screen
    /// probing. Registries still carry all built-ins.
    pub fn with_config(config: Config, screen: Screen) -> Self {
        Self {
            config_path: PathBuf::new(),
            config,
            screen,
            metadata: TrackMetadata::default(),
            last_status: String::new(),
            src_image: None,
            previous_image: None,
            reload_on_track: false,
            processors: ProcessorRegistry::with_builtins(),
            providers: ProviderRegistry::with_builtins(),
            variables: VarSet::new(),
        }
    }

    /// Full reload: config file, then screen size.
    pub fn reload(&mut self) -> ArtwallResult<()> {
        self.reload_config()?;
        self.reload_screen_size()?;
        Ok(())
    }

    pub fn reload_config(&mut self) -> ArtwallResult<()> {
        self.config = Config::load(&self.config_path)?;
        Ok(())
    }

    /// Re-probe the biggest screen via the configured shell command. On
    /// failure the previous dimensions stay in place.
    pub fn reload_screen_size(&mut self) -> ArtwallResult<()> {
        tracing::debug!("updating screen resolution");
        self.screen = probe_screen(&self.config.screen_resolution_command)?;
        Ok(())
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.processors
    }

    pub fn register_processor(
        &mut self,
        name: impl Into<String>,
        f: ProcessorFn,
    ) -> ArtwallResult<()> {
        self.processors.register(name, f)
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        f: ProviderFn,
    ) -> ArtwallResult<()> {
        self.providers.register(name, f)
    }

    /// Rebuild the live variable set from all providers, in registration
    /// order with later-wins merging. Fail-fast: any provider error leaves
    /// the previous set untouched.
    pub fn update_variables(&mut self) -> ArtwallResult<()> {
        let mut fresh = VarSet::new();
        for (name, provider) in self.providers.iter() {
            tracing::debug!(provider = name, "updating variables");
            let value = provider(self)?;
            let serde_json::Value::Object(map) = value else {
                return Err(ArtwallError::config(format!(
                    "variable provider '{name}' must return an object"
                )));
            };
            for (key, val) in map {
                fresh.insert(key, val);
            }
        }
        self.variables = fresh;
        Ok(())
    }
}

fn probe_screen(command: &str) -> ArtwallResult<Screen> {
    let output = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .output()
        .context("run screen resolution command")?;
    if !output.status.success() {
        return Err(ArtwallError::resource(format!(
            "screen resolution command exited with {}",
            output.status
        )));
    }
    parse_screen_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_screen_output(raw: &str) -> ArtwallResult<Screen> {
    let line = raw.lines().next().unwrap_or_default().trim();
    let parsed = line.split_once('x').and_then(|(w, h)| {
        Some(Screen {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    });
    parsed.ok_or_else(|| {
        ArtwallError::resource(format!("can't parse screen resolution from '{line}'"))
    })
}
