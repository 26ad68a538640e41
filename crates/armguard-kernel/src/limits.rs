//! Configured safety limits and their compiled-in defaults.

use armguard_types::{ArmError, JOINT_COUNT};
use serde::{Deserialize, Serialize};

/// Per-axis instrument force ceiling (N).
pub const MAX_FORCE_NEWTONS: f64 = 15.0;
/// Per-axis velocity ceiling (mm/s).
pub const MAX_VELOCITY_MM_PER_SEC: f64 = 50.0;
pub const MIN_SAFE_DISTANCE_MM: f64 = 2.0;
pub const WARNING_DISTANCE_MM: f64 = 5.0;
/// Event-log retention before FIFO eviction.
pub const MAX_SAFETY_EVENTS: usize = 10_000;
/// Number of force / velocity axes measured at the instrument.
pub const INSTRUMENT_AXES: usize = 3;

/// Joint travel in degrees, base to wrist.
const DEFAULT_JOINT_LIMITS_DEG: [[f64; 2]; JOINT_COUNT] = [
    [-180.0, 180.0],
    [-90.0, 90.0],
    [-120.0, 120.0],
    [-150.0, 150.0],
    [-180.0, 180.0],
    [-180.0, 180.0],
];

/// Everything the monitor checks against.
///
/// `min_safe_distance ≤ warning_distance` is expected but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// `[lo, hi]` per joint, degrees.
    #[serde(default = "default_joint_limits")]
    pub joint_limits: Vec<[f64; 2]>,

    /// Per-axis force ceiling (N).
    #[serde(default = "default_force_limits")]
    pub force_limits: Vec<f64>,

    /// Per-axis velocity ceiling (mm/s), compared against `|v|`.
    #[serde(default = "default_velocity_limits")]
    pub velocity_limits: Vec<f64>,

    #[serde(default = "default_min_safe_distance")]
    pub min_safe_distance: f64,

    #[serde(default = "default_warning_distance")]
    pub warning_distance: f64,

    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

fn default_joint_limits() -> Vec<[f64; 2]> {
    DEFAULT_JOINT_LIMITS_DEG.to_vec()
}
fn default_force_limits() -> Vec<f64> {
    vec![MAX_FORCE_NEWTONS; INSTRUMENT_AXES]
}
fn default_velocity_limits() -> Vec<f64> {
    vec![MAX_VELOCITY_MM_PER_SEC; INSTRUMENT_AXES]
}
fn default_min_safe_distance() -> f64 {
    MIN_SAFE_DISTANCE_MM
}
fn default_warning_distance() -> f64 {
    WARNING_DISTANCE_MM
}
fn default_event_log_capacity() -> usize {
    MAX_SAFETY_EVENTS
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            joint_limits: default_joint_limits(),
            force_limits: default_force_limits(),
            velocity_limits: default_velocity_limits(),
            min_safe_distance: default_min_safe_distance(),
            warning_distance: default_warning_distance(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

impl SafetyLimits {
    /// Joint limits as the flat `lo, hi, lo, hi, …` sequence.
    pub fn flattened_joint_limits(&self) -> Vec<f64> {
        self.joint_limits.iter().flatten().copied().collect()
    }

    /// Check `positions` (degrees) against the joint table without recording
    /// anything.  Joints are checked in order and the first breach wins.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidInput`] on a count mismatch, [`ArmError::JointLimit`]
    /// for the first joint outside its `[lo, hi]` pair.  NaN is never inside.
    pub fn check_joint_positions(&self, positions: &[f64]) -> Result<(), ArmError> {
        if positions.len() != self.joint_limits.len() {
            return Err(ArmError::InvalidInput {
                expected: self.joint_limits.len(),
                actual: positions.len(),
            });
        }
        for (joint, (&value, &[min, max])) in positions.iter().zip(&self.joint_limits).enumerate() {
            if !(min..=max).contains(&value) {
                return Err(ArmError::JointLimit {
                    joint,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Check table shapes and values.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidConfig`] for a joint table without exactly one
    /// pair per joint, an empty ceiling table, a non-finite value, a joint
    /// pair with `lo > hi`, a non-positive force or velocity ceiling, a
    /// negative distance or a zero log capacity.
    pub fn validate(&self) -> Result<(), ArmError> {
        if self.joint_limits.len() != JOINT_COUNT {
            return Err(ArmError::InvalidConfig(format!(
                "joint limit table has {} pairs, expected {JOINT_COUNT}",
                self.joint_limits.len()
            )));
        }
        for (joint, &[lo, hi]) in self.joint_limits.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(ArmError::InvalidConfig(format!(
                    "joint {joint} limits [{lo}, {hi}] are not an ordered finite pair"
                )));
            }
        }
        check_ceilings("force", &self.force_limits)?;
        check_ceilings("velocity", &self.velocity_limits)?;
        for (name, value) in [
            ("min_safe_distance", self.min_safe_distance),
            ("warning_distance", self.warning_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ArmError::InvalidConfig(format!("{name} {value} must be ≥ 0")));
            }
        }
        if self.event_log_capacity == 0 {
            return Err(ArmError::InvalidConfig("event_log_capacity must be ≥ 1".into()));
        }
        Ok(())
    }
}

fn check_ceilings(name: &str, limits: &[f64]) -> Result<(), ArmError> {
    if limits.is_empty() {
        return Err(ArmError::InvalidConfig(format!("{name} limit table is empty")));
    }
    if let Some(bad) = limits.iter().find(|l| !l.is_finite() || **l <= 0.0) {
        return Err(ArmError::InvalidConfig(format!(
            "{name} limit {bad} must be finite and positive"
        )));
    }
    Ok(())
}
