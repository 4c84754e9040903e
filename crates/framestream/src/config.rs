use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::present::PresentMode;
use crate::reader::MIN_POOL_SIZE;

/// Where decoding happens on ticks without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Hand the time to the decode thread; present the previous pixels.
    Async,
    /// Decode on the ticking thread before presenting.
    Sync,
}

/// Presentation mode preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentPreference {
    /// Callback hand-off when the backend supports it, else direct copy.
    Auto,
    DirectCopy,
    CallbackHandOff,
}

impl PresentPreference {
    pub fn resolve(self, supports_callback: bool) -> PresentMode {
        match self {
            PresentPreference::Auto if supports_callback => PresentMode::CallbackHandOff,
            PresentPreference::CallbackHandOff if supports_callback => PresentMode::CallbackHandOff,
            PresentPreference::CallbackHandOff => {
                log::warn!("Backend cannot service callbacks, falling back to direct copy");
                PresentMode::DirectCopy
            }
            PresentPreference::Auto | PresentPreference::DirectCopy => PresentMode::DirectCopy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub version: u32,
    /// Frame buffers per stream; bounds lookahead depth.
    pub pool_size: usize,
    pub decode_mode: DecodeMode,
    pub present_mode: PresentPreference,
    pub looping: bool,
    pub speed: f64,
    /// Ticks per second the reader assumes when stepping after a restart.
    pub nominal_tick_rate: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            pool_size: 4,
            decode_mode: DecodeMode::Async,
            present_mode: PresentPreference::Auto,
            looping: true,
            speed: 1.0,
            nominal_tick_rate: 60.0,
        }
    }
}

impl PlayerConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("framestream").join("player.json"))
    }

    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring player config: {e:#}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config.validated())
    }

    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            return;
        };
        if let Err(e) = self.save_to(&path) {
            log::warn!("Failed to save player config: {e:#}");
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Clamp out-of-range values.
    pub fn validated(mut self) -> Self {
        if self.pool_size < MIN_POOL_SIZE {
            log::warn!(
                "pool_size {} too small, using {MIN_POOL_SIZE}",
                self.pool_size
            );
            self.pool_size = MIN_POOL_SIZE;
        }
        if !(self.nominal_tick_rate.is_finite() && self.nominal_tick_rate > 0.0) {
            log::warn!(
                "nominal_tick_rate {} invalid, using 60",
                self.nominal_tick_rate
            );
            self.nominal_tick_rate = 60.0;
        }
        if !self.speed.is_finite() {
            self.speed = 1.0;
        }
        self
    }
}
