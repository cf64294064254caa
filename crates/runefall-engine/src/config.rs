//! Runner configuration.
//!
//! Timing, run length, seeding and logging for the headless runner.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "runefall.toml";

/// Runner configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Timing ===
    /// Physics step length in seconds
    pub fixed_dt: f32,
    /// Largest frame delta fed to the simulation
    pub max_frame_dt: f32,
    /// Simulated frames per second
    pub target_fps: u32,
    /// Pace frames against the wall clock instead of running flat out
    pub realtime: bool,

    // === Run ===
    /// Simulated seconds to run (0 = until the fight ends)
    pub duration_secs: f32,
    /// RNG seed (None = random)
    pub seed: Option<u64>,
    /// Combat tuning RON file (None = built-in defaults)
    pub tuning_path: Option<PathBuf>,

    // === Logging ===
    /// Default tracing filter directive
    pub log_filter: String,
    /// Emit log lines and events as JSON
    pub json_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_frame_dt: 0.25,
            target_fps: 60,
            realtime: false,

            duration_secs: 30.0,
            seed: None,
            tuning_path: None,

            log_filter: "runefall=info".to_string(),
            json_events: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `runefall.toml` in the working directory.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut config = match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        return Self::default();
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                return Self::default();
            },
        };

        config.validate();
        config
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        if !self.fixed_dt.is_finite() {
            self.fixed_dt = 1.0 / 60.0;
        }
        self.fixed_dt = self.fixed_dt.clamp(0.001, 0.1);
        if !self.max_frame_dt.is_finite() {
            self.max_frame_dt = 0.25;
        }
        self.max_frame_dt = self.max_frame_dt.clamp(self.fixed_dt, 1.0);
        self.target_fps = self.target_fps.clamp(10, 240);

        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            self.duration_secs = 0.0;
        }
        if self.log_filter.trim().is_empty() {
            self.log_filter = "runefall=info".to_string();
        }
    }

    /// Simulated frame delta.
    #[must_use]
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }
}
