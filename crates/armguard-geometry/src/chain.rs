//! Six-link kinematic chain.
//!
//! The manipulator geometry is a fixed table of standard Denavit-Hartenberg
//! links.  [`KinematicChain::forward_kinematics`] composes the per-link
//! homogeneous transforms from an identity base; the inverse direction is an
//! analytical, position-only solve over the two dominant link lengths.
//!
//! Two limitations are deliberate and surfaced as constants rather than
//! hidden in the code paths:
//!
//! - [`ORIENTATION_DEFAULTS`] – the inverse solve never computes the wrist
//!   joints; it always returns this fixed roll/pitch/yaw triple.
//! - [`JACOBIAN_IS_PLACEHOLDER`] – [`KinematicChain::calculate_jacobian`]
//!   returns the 6×6 identity, not a derived velocity mapping.
//!
//! # Example
//!
//! ```rust
//! use armguard_geometry::chain::{KinematicChain, Vec3};
//!
//! let chain = KinematicChain::default();
//!
//! let tip = chain.forward_kinematics(&[0.0; 6]).unwrap();
//! assert!(tip.iter().all(|c| c.is_finite()));
//!
//! assert!(chain.is_reachable(&Vec3::new(300.0, 200.0, 100.0)));
//! assert!(!chain.is_reachable(&Vec3::new(10_000.0, 10_000.0, 10_000.0)));
//! ```

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use armguard_types::{ArmError, JOINT_COUNT, JointConfiguration};
use nalgebra::{Matrix4, Matrix6, Vector3};

/// A point or displacement in the base frame, in millimetres.
pub type Vec3 = Vector3<f64>;

/// Wrist roll / pitch / yaw returned by every inverse solve.
pub const ORIENTATION_DEFAULTS: [f64; 3] = [0.0, FRAC_PI_2, 0.0];

/// `true` while [`KinematicChain::calculate_jacobian`] is an identity stub.
pub const JACOBIAN_IS_PLACEHOLDER: bool = true;

// ────────────────────────────────────────────────────────────────────────────
// DH link
// ────────────────────────────────────────────────────────────────────────────

/// One link of the chain in standard DH convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhLink {
    /// Fixed offset added to the commanded joint angle (radians).
    pub theta_offset: f64,
    /// Link twist α (radians).
    pub alpha: f64,
    /// Link length a (mm).
    pub a: f64,
    /// Link offset d (mm).
    pub d: f64,
}

impl DhLink {
    pub const fn new(theta_offset: f64, alpha: f64, a: f64, d: f64) -> Self {
        Self {
            theta_offset,
            alpha,
            a,
            d,
        }
    }

    /// Homogeneous transform from the previous frame to this link's frame
    /// for commanded joint angle `q`.
    pub fn transform(&self, q: f64) -> Matrix4<f64> {
        let theta = q + self.theta_offset;
        let (st, ct) = theta.sin_cos();
        let (sa, ca) = self.alpha.sin_cos();
        #[rustfmt::skip]
        let t = Matrix4::new(
            ct,  -st * ca,  st * sa, self.a * ct,
            st,   ct * ca, -ct * sa, self.a * st,
            0.0,  sa,       ca,      self.d,
            0.0,  0.0,      0.0,     1.0,
        );
        t
    }

    /// Largest translational extent of the link.
    fn extent(&self) -> f64 {
        self.a.abs().max(self.d.abs())
    }
}

/// Default manipulator geometry (mm / rad).
pub const DEFAULT_DH_TABLE: [DhLink; JOINT_COUNT] = [
    DhLink::new(0.0, FRAC_PI_2, 0.0, 150.0),
    DhLink::new(0.0, -FRAC_PI_2, 250.0, 0.0),
    DhLink::new(0.0, FRAC_PI_2, 0.0, 180.0),
    DhLink::new(0.0, -FRAC_PI_2, 0.0, 0.0),
    DhLink::new(0.0, FRAC_PI_2, 0.0, 100.0),
    DhLink::new(0.0, 0.0, 0.0, 50.0),
];

/// Wrap `angle` into (−π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

// ────────────────────────────────────────────────────────────────────────────
// KinematicChain
// ────────────────────────────────────────────────────────────────────────────

/// Immutable six-link geometry with position-level kinematics.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    links: [DhLink; JOINT_COUNT],
    base: Matrix4<f64>,
}

impl Default for KinematicChain {
    fn default() -> Self {
        Self::new(DEFAULT_DH_TABLE)
    }
}

impl KinematicChain {
    /// Build a chain from a DH table, rooted at an identity base.
    pub fn new(links: [DhLink; JOINT_COUNT]) -> Self {
        Self {
            links,
            base: Matrix4::identity(),
        }
    }

    pub fn links(&self) -> &[DhLink; JOINT_COUNT] {
        &self.links
    }

    /// End-effector position for `angles` (radians).
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidInput`] unless exactly six angles are supplied.
    pub fn forward_kinematics(&self, angles: &[f64]) -> Result<Vec3, ArmError> {
        let frames = self.frames(angles)?;
        Ok(translation(&frames[JOINT_COUNT]))
    }

    /// Origins of the base frame and of every link frame, base first
    /// (seven points).  The last entry equals the forward-kinematics result.
    pub fn joint_origins(&self, angles: &[f64]) -> Result<Vec<Vec3>, ArmError> {
        Ok(self.frames(angles)?.iter().map(translation).collect())
    }

    fn frames(&self, angles: &[f64]) -> Result<Vec<Matrix4<f64>>, ArmError> {
        if angles.len() != JOINT_COUNT {
            return Err(ArmError::InvalidInput {
                expected: JOINT_COUNT,
                actual: angles.len(),
            });
        }
        let mut frames = Vec::with_capacity(JOINT_COUNT + 1);
        let mut t = self.base;
        frames.push(t);
        for (link, &q) in self.links.iter().zip(angles) {
            t *= link.transform(q);
            frames.push(t);
        }
        Ok(frames)
    }

    /// The two largest link extents, larger first.  These are the upper-arm
    /// and forearm lengths used by the planar inverse solve.
    pub fn dominant_lengths(&self) -> (f64, f64) {
        let mut extents = self.links.map(|l| l.extent());
        extents.sort_by(|a, b| b.total_cmp(a));
        (extents[0], extents[1])
    }

    /// Solve the positioning joints for `target` (mm, base frame).
    ///
    /// Joint 1 is the base yaw towards the target; joints 2 and 3 come from
    /// the law of cosines on the planar two-link arm formed by
    /// [`dominant_lengths`][Self::dominant_lengths].  Joints 4–6 are always
    /// [`ORIENTATION_DEFAULTS`].  Every angle is normalised into (−π, π].
    ///
    /// # Errors
    ///
    /// [`ArmError::Unreachable`] when the cosine ratio falls outside
    /// [−1, 1] (or is not a number).
    pub fn inverse_kinematics(&self, target: &Vec3) -> Result<JointConfiguration, ArmError> {
        let (l1, l2) = self.dominant_lengths();
        let (x, y, z) = (target.x, target.y, target.z);

        let r = x.hypot(y);
        let ratio = (r * r + z * z - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
        if !(-1.0..=1.0).contains(&ratio) {
            return Err(ArmError::Unreachable { x, y, z, ratio });
        }

        let q1 = y.atan2(x);
        let q3 = (1.0 - ratio * ratio).sqrt().atan2(ratio);
        let q2 = z.atan2(r) - (l2 * q3.sin()).atan2(l1 + l2 * q3.cos());

        let [roll, pitch, yaw] = ORIENTATION_DEFAULTS;
        let angles = [q1, q2, q3, roll, pitch, yaw].map(normalize_angle);
        Ok(JointConfiguration(angles))
    }

    /// Velocity Jacobian.  Always the 6×6 identity, see
    /// [`JACOBIAN_IS_PLACEHOLDER`].
    pub fn calculate_jacobian(&self, _angles: &[f64]) -> Matrix6<f64> {
        Matrix6::identity()
    }

    /// `true` iff no angle is NaN or infinite.
    pub fn validate_solution(angles: &[f64]) -> bool {
        angles.iter().all(|a| a.is_finite())
    }

    /// `true` iff the inverse solve succeeds and its result validates.
    /// Failures are reported as `false`, never propagated.
    pub fn is_reachable(&self, target: &Vec3) -> bool {
        self.inverse_kinematics(target)
            .map(|solution| Self::validate_solution(solution.as_slice()))
            .unwrap_or(false)
    }
}

fn translation(t: &Matrix4<f64>) -> Vec3 {
    Vec3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // ------------------------------------------------------------------ forward

    #[test]
    fn forward_kinematics_at_zero_is_finite() {
        let chain = KinematicChain::default();
        let tip = chain.forward_kinematics(&[0.0; 6]).unwrap();
        assert!(tip.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn forward_kinematics_at_zero_matches_hand_computed_pose() {
        let chain = KinematicChain::default();
        let tip = chain.forward_kinematics(&[0.0; 6]).unwrap();
        assert!(approx(tip.x, 250.0), "x = {}", tip.x);
        assert!(approx(tip.y, -50.0), "y = {}", tip.y);
        assert!(approx(tip.z, 430.0), "z = {}", tip.z);
    }

    #[test]
    fn base_yaw_rotates_tip_about_z() {
        let chain = KinematicChain::default();
        let tip = chain
            .forward_kinematics(&[FRAC_PI_2, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        // (250, -50) rotated by +90° about z.
        assert!(approx(tip.x, 50.0));
        assert!(approx(tip.y, 250.0));
        assert!(approx(tip.z, 430.0));
    }

    #[test]
    fn forward_kinematics_rejects_wrong_joint_count() {
        let chain = KinematicChain::default();
        assert_eq!(
            chain.forward_kinematics(&[0.0; 5]),
            Err(ArmError::InvalidInput {
                expected: 6,
                actual: 5
            })
        );
        assert!(chain.forward_kinematics(&[0.0; 7]).is_err());
    }

    #[test]
    fn joint_origins_end_at_tip() {
        let chain = KinematicChain::default();
        let angles = [0.3, -0.2, 0.5, 0.1, 0.4, -0.6];
        let origins = chain.joint_origins(&angles).unwrap();
        assert_eq!(origins.len(), 7);
        assert_eq!(origins[0], Vec3::zeros());
        let tip = chain.forward_kinematics(&angles).unwrap();
        assert!((origins[6] - tip).norm() < EPS);
    }

    // ------------------------------------------------------------------ inverse

    #[test]
    fn dominant_lengths_are_upper_arm_and_forearm() {
        assert_eq!(KinematicChain::default().dominant_lengths(), (250.0, 180.0));
    }

    #[test]
    fn inverse_kinematics_reachable_target() {
        let chain = KinematicChain::default();
        let solution = chain
            .inverse_kinematics(&Vec3::new(300.0, 200.0, 100.0))
            .unwrap();
        assert!(KinematicChain::validate_solution(solution.as_slice()));
        assert_eq!(&solution.0[3..], &ORIENTATION_DEFAULTS);
        for a in solution.0 {
            assert!(a > -PI && a <= PI);
        }
    }

    #[test]
    fn inverse_kinematics_satisfies_planar_two_link_geometry() {
        let chain = KinematicChain::default();
        let (l1, l2) = chain.dominant_lengths();
        let target = Vec3::new(300.0, 200.0, 100.0);
        let q = chain.inverse_kinematics(&target).unwrap().0;

        assert!(approx(q[0], target.y.atan2(target.x)));
        let r = l1 * q[1].cos() + l2 * (q[1] + q[2]).cos();
        let z = l1 * q[1].sin() + l2 * (q[1] + q[2]).sin();
        assert!(approx(r, target.x.hypot(target.y)), "r = {r}");
        assert!(approx(z, target.z), "z = {z}");
    }

    #[test]
    fn inverse_kinematics_outside_annulus_is_unreachable() {
        let chain = KinematicChain::default();
        let far = Vec3::new(10_000.0, 10_000.0, 10_000.0);
        assert!(matches!(
            chain.inverse_kinematics(&far),
            Err(ArmError::Unreachable { .. })
        ));
        assert!(!chain.is_reachable(&far));
    }

    #[test]
    fn annulus_edges() {
        let chain = KinematicChain::default();
        // Outer radius is 250 + 180 = 430, inner radius 250 - 180 = 70.
        assert!(chain.is_reachable(&Vec3::new(429.0, 0.0, 0.0)));
        assert!(!chain.is_reachable(&Vec3::new(431.0, 0.0, 0.0)));
        assert!(chain.is_reachable(&Vec3::new(71.0, 0.0, 0.0)));
        assert!(!chain.is_reachable(&Vec3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn non_finite_target_is_unreachable_not_a_panic() {
        let chain = KinematicChain::default();
        assert!(!chain.is_reachable(&Vec3::new(f64::NAN, 0.0, 0.0)));
        assert!(!chain.is_reachable(&Vec3::new(f64::INFINITY, 0.0, 0.0)));
    }

    // ------------------------------------------------------------------ helpers

    #[test]
    fn normalize_angle_wraps_into_half_open_interval() {
        assert!((normalize_angle(3.0 * FRAC_PI_2) + FRAC_PI_2).abs() < EPS);
        assert!((normalize_angle(-PI) - PI).abs() < EPS);
        assert!((normalize_angle(PI) - PI).abs() < EPS);
        assert!((normalize_angle(5.0 * TAU + 0.25) - 0.25).abs() < 1e-9);
        assert!(normalize_angle(0.0).abs() < EPS);
    }

    #[test]
    fn validate_solution_rejects_nan_and_infinity() {
        assert!(KinematicChain::validate_solution(&[0.0; 6]));
        assert!(!KinematicChain::validate_solution(&[0.0, f64::NAN, 0.0, 0.0, 0.0, 0.0]));
        assert!(!KinematicChain::validate_solution(&[f64::NEG_INFINITY, 0.0, 0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn jacobian_is_flagged_identity() {
        assert!(JACOBIAN_IS_PLACEHOLDER);
        let j = KinematicChain::default().calculate_jacobian(&[0.1; 6]);
        assert_eq!(j, Matrix6::identity());
    }
}
