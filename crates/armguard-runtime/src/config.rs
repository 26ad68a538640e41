//! Runtime configuration – reads/writes `~/.armguard/config.toml`.
//!
//! Every field defaults to the compiled-in safety parameters, so a missing
//! file, an empty file and a partial file are all valid.
//!
//! ```toml
//! control_frequency_hz = 500
//! max_consecutive_faults = 3
//!
//! [safety]
//! force_limits = [12.0, 12.0, 12.0]
//! min_safe_distance = 3.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use armguard_geometry::ProximityGuard;
use armguard_kernel::{SafetyLimits, SafetyMonitor};
use armguard_types::ArmError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::control_loop::{DEFAULT_FREQUENCY_HZ, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};

/// Consecutive failed cycles tolerated before an emergency stop.
pub const DEFAULT_MAX_CONSECUTIVE_FAULTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control-cycle frequency, 1–10000 Hz.
    #[serde(default = "default_control_frequency_hz")]
    pub control_frequency_hz: u32,

    /// Failed cycles in a row that escalate to an emergency stop.  0 disables
    /// escalation.
    #[serde(default = "default_max_consecutive_faults")]
    pub max_consecutive_faults: u32,

    #[serde(default)]
    pub safety: SafetyLimits,
}

fn default_control_frequency_hz() -> u32 {
    DEFAULT_FREQUENCY_HZ
}
fn default_max_consecutive_faults() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_FAULTS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_frequency_hz: default_control_frequency_hz(),
            max_consecutive_faults: default_max_consecutive_faults(),
            safety: SafetyLimits::default(),
        }
    }
}

impl Config {
    /// Reject values the runtime cannot run with.
    ///
    /// `min_safe_distance > warning_distance` only produces a warning: the
    /// ordering is left to whoever writes the file.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidConfig`] for a frequency outside 1–10000 Hz or
    /// malformed limit tables.
    pub fn validate(&self) -> Result<(), ArmError> {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&self.control_frequency_hz) {
            return Err(ArmError::InvalidConfig(format!(
                "control_frequency_hz {} outside {MIN_FREQUENCY_HZ}..={MAX_FREQUENCY_HZ}",
                self.control_frequency_hz
            )));
        }
        self.safety.validate()?;
        if self.safety.min_safe_distance > self.safety.warning_distance {
            warn!(
                min_safe_mm = self.safety.min_safe_distance,
                warning_mm = self.safety.warning_distance,
                "min_safe_distance exceeds warning_distance; warnings will never fire"
            );
        }
        Ok(())
    }

    /// A monitor enforcing `self.safety`.
    pub fn build_monitor(&self) -> Result<SafetyMonitor, ArmError> {
        SafetyMonitor::new(self.safety.clone())
    }

    /// A proximity guard with the configured margins.
    pub fn build_guard(&self) -> ProximityGuard {
        ProximityGuard::new(self.safety.min_safe_distance, self.safety.warning_distance)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// File I/O
// ────────────────────────────────────────────────────────────────────────────

/// Return the path to `~/.armguard/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armguard").join("config.toml")
}

/// Load from the default path.  `Ok(None)` if the file does not exist.
pub fn load() -> Result<Option<Config>, ConfigError> {
    load_from(&config_path())
}

/// Load from `path`, then apply environment overrides.
pub fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ARMGUARD_*` environment overrides.  Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `ARMGUARD_CONTROL_HZ` | `control_frequency_hz` |
/// | `ARMGUARD_MAX_FORCE` | every entry of `safety.force_limits` |
/// | `ARMGUARD_MIN_SAFE_DISTANCE` | `safety.min_safe_distance` |
/// | `ARMGUARD_WARNING_DISTANCE` | `safety.warning_distance` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ARMGUARD_CONTROL_HZ")
        && let Ok(hz) = v.parse::<u32>()
    {
        cfg.control_frequency_hz = hz;
    }
    if let Ok(v) = std::env::var("ARMGUARD_MAX_FORCE")
        && let Ok(force) = v.parse::<f64>()
    {
        cfg.safety.force_limits.fill(force);
    }
    if let Ok(v) = std::env::var("ARMGUARD_MIN_SAFE_DISTANCE")
        && let Ok(d) = v.parse::<f64>()
    {
        cfg.safety.min_safe_distance = d;
    }
    if let Ok(v) = std::env::var("ARMGUARD_WARNING_DISTANCE")
        && let Ok(d) = v.parse::<f64>()
    {
        cfg.safety.warning_distance = d;
    }
}

/// Save to the default path, creating `~/.armguard/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

/// Save to `path`.  On Unix the directory is 0o700 and the file 0o600.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let io_err = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(io_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(io_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(io_err)?;
    Ok(())
}
