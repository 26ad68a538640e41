//! [`ProximityGuard`] – distance-based collision checks.
//!
//! Obstacles are bare 3-D points supplied per call; nothing is persisted.
//! Two thresholds drive every check:
//!
//! | Clearance `d` | Outcome |
//! |---|---|
//! | `d < min_safe_distance` | collision – scanning stops |
//! | `min_safe_distance ≤ d < warning_distance` | warning logged, scanning continues |
//! | `d ≥ warning_distance` | clear |
//!
//! The ordering `min_safe_distance ≤ warning_distance` is the caller's
//! responsibility; [`ProximityGuard::set_safety_margins`] stores whatever it
//! is given.
//!
//! # Example
//!
//! ```rust
//! use armguard_geometry::{ProximityGuard, Vec3};
//!
//! let guard = ProximityGuard::default(); // 2 mm / 5 mm
//! let tip = Vec3::new(0.0, 0.0, 0.0);
//!
//! assert!(guard.check_instrument_collision(&tip, &[Vec3::new(1.0, 0.0, 0.0)]));
//! assert!(!guard.check_instrument_collision(&tip, &[Vec3::new(10.0, 0.0, 0.0)]));
//! ```

use tracing::{error, info, warn};

use crate::chain::Vec3;

/// Default minimum clearance (mm).
pub const DEFAULT_MIN_SAFE_DISTANCE: f64 = 2.0;
/// Default warning clearance (mm).
pub const DEFAULT_WARNING_DISTANCE: f64 = 5.0;

/// Result of scanning a point against a set of obstacles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
    /// No obstacle inside the warning band.
    Clear,
    /// Closest obstacle inside the warning band but outside the safe margin.
    Warning { distance: f64 },
    /// First obstacle found inside the safe margin.
    Collision { distance: f64 },
}

impl Proximity {
    pub fn is_collision(&self) -> bool {
        matches!(self, Proximity::Collision { .. })
    }
}

/// Instrument and self-collision checker.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityGuard {
    min_safe_distance: f64,
    warning_distance: f64,
}

impl Default for ProximityGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAFE_DISTANCE, DEFAULT_WARNING_DISTANCE)
    }
}

impl ProximityGuard {
    pub fn new(min_safe_distance: f64, warning_distance: f64) -> Self {
        Self {
            min_safe_distance,
            warning_distance,
        }
    }

    /// Replace both thresholds.  No ordering check is made between them.
    pub fn set_safety_margins(&mut self, min_safe: f64, warning: f64) {
        self.min_safe_distance = min_safe;
        self.warning_distance = warning;
        info!(
            min_safe_mm = min_safe,
            warning_mm = warning,
            "proximity margins updated"
        );
    }

    pub fn min_safe_distance(&self) -> f64 {
        self.min_safe_distance
    }

    pub fn warning_distance(&self) -> f64 {
        self.warning_distance
    }

    /// Scan `obstacles` in order against `tip`.
    ///
    /// Returns [`Proximity::Collision`] for the first obstacle closer than
    /// the safe margin.  Obstacles in the warning band each emit a warning
    /// and the scan continues; the closest of them is reported when no
    /// collision is found.
    pub fn assess(&self, tip: &Vec3, obstacles: &[Vec3]) -> Proximity {
        let mut closest_warning: Option<f64> = None;
        for (index, obstacle) in obstacles.iter().enumerate() {
            let distance = (tip - obstacle).norm();
            if distance < self.min_safe_distance {
                error!(obstacle = index, distance_mm = distance, "instrument collision detected");
                return Proximity::Collision { distance };
            } else if distance < self.warning_distance {
                warn!(obstacle = index, distance_mm = distance, "instrument proximity warning");
                closest_warning = Some(closest_warning.map_or(distance, |d| d.min(distance)));
            }
        }
        match closest_warning {
            Some(distance) => Proximity::Warning { distance },
            None => Proximity::Clear,
        }
    }

    /// `true` when any obstacle is closer to `tip` than the safe margin.
    pub fn check_instrument_collision(&self, tip: &Vec3, obstacles: &[Vec3]) -> bool {
        self.assess(tip, obstacles).is_collision()
    }

    /// Pairwise check over link positions.  Adjacent entries are skipped
    /// (consecutive links are always close); every pair at index distance
    /// ≥ 2 must stay at least twice the safe margin apart.
    pub fn check_self_collision(&self, joint_positions: &[Vec3]) -> bool {
        self.self_collision_distance(joint_positions).is_some()
    }

    /// Distance of the first violating link pair found by
    /// [`check_self_collision`][Self::check_self_collision], if any.
    pub fn self_collision_distance(&self, joint_positions: &[Vec3]) -> Option<f64> {
        let threshold = self.min_safe_distance * 2.0;
        for (i, a) in joint_positions.iter().enumerate() {
            for (j, b) in joint_positions.iter().enumerate().skip(i + 2) {
                let distance = (a - b).norm();
                if distance < threshold {
                    warn!(link_a = i, link_b = j, distance_mm = distance, "self-collision risk");
                    return Some(distance);
                }
            }
        }
        None
    }

    /// Minimum Euclidean distance from `point` to any obstacle, or
    /// `f64::INFINITY` when there are none.
    pub fn calculate_minimum_distance(&self, point: &Vec3, obstacles: &[Vec3]) -> f64 {
        obstacles
            .iter()
            .map(|o| (point - o).norm())
            .fold(f64::INFINITY, f64::min)
    }
}
