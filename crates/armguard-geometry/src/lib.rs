//! `armguard-geometry` – Kinematics & proximity layer.
//!
//! Pure geometry for the six-link manipulator: no shared state, no I/O.
//! Every query here is safe to call concurrently from any thread.
//!
//! # Modules
//!
//! - [`chain`] – [`KinematicChain`][chain::KinematicChain]: fixed
//!   Denavit-Hartenberg geometry with forward kinematics, an analytical
//!   position-only inverse solve, reachability and the (placeholder)
//!   Jacobian.
//! - [`proximity`] – [`ProximityGuard`][proximity::ProximityGuard]:
//!   distance-based instrument and self-collision checks against a
//!   min-safe / warning margin pair.

pub mod chain;
pub mod proximity;

pub use chain::{
    DEFAULT_DH_TABLE, DhLink, JACOBIAN_IS_PLACEHOLDER, KinematicChain, ORIENTATION_DEFAULTS, Vec3,
    normalize_angle,
};
pub use proximity::{Proximity, ProximityGuard};
