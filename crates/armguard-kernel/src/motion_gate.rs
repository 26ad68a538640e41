//! [`MotionGate`] – single interception point between a Cartesian target and
//! the actuation boundary.
//!
//! Before a planned target is handed to a [`JointActuator`] it must pass
//! through [`MotionGate::authorize`].  The checks run in order and the first
//! failure is returned:
//!
//! 1. **Interlock** – an engaged emergency stop rejects everything with
//!    [`ArmError::EmergencyStopEngaged`].
//! 2. **Inverse kinematics** – [`ArmError::Unreachable`] outside the
//!    reachable annulus.
//! 3. **Joint limits** – the solution, in degrees, against the monitor's
//!    joint table.  Read-only: a planned breach is rejected with
//!    [`ArmError::JointLimit`], it does not engage the emergency stop.
//! 4. **Instrument proximity** – the forward-kinematics tip of the solution
//!    against the supplied obstacles ([`ArmError::CollisionRisk`]).
//! 5. **Self-collision** – pairwise over the solution's link origins
//!    ([`ArmError::CollisionRisk`]).
//!
//! [`JointActuator`]: armguard_hal::JointActuator
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use armguard_geometry::{KinematicChain, ProximityGuard, Vec3};
//! use armguard_kernel::{MotionGate, SafetyMonitor};
//!
//! let monitor = Arc::new(SafetyMonitor::default());
//! let gate = MotionGate::new(KinematicChain::default(), ProximityGuard::default(), Arc::clone(&monitor));
//!
//! assert!(gate.authorize(&Vec3::new(300.0, 200.0, 100.0), &[]).is_ok());
//!
//! monitor.trigger_emergency_stop("operator");
//! assert!(gate.authorize(&Vec3::new(300.0, 200.0, 100.0), &[]).is_err());
//! ```

use std::sync::Arc;

use armguard_geometry::{KinematicChain, Proximity, ProximityGuard, Vec3};
use armguard_types::{ArmError, JointConfiguration};
use tracing::{debug, warn};

use crate::safety_monitor::SafetyMonitor;

/// Resolves and vets motion targets.  Never changes monitor state.
pub struct MotionGate {
    chain: KinematicChain,
    guard: ProximityGuard,
    monitor: Arc<SafetyMonitor>,
}

impl MotionGate {
    pub fn new(chain: KinematicChain, guard: ProximityGuard, monitor: Arc<SafetyMonitor>) -> Self {
        Self {
            chain,
            guard,
            monitor,
        }
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn guard(&self) -> &ProximityGuard {
        &self.guard
    }

    /// Margins are reconfigured through here.
    pub fn guard_mut(&mut self) -> &mut ProximityGuard {
        &mut self.guard
    }

    pub fn monitor(&self) -> &Arc<SafetyMonitor> {
        &self.monitor
    }

    /// Resolve `target` (mm) to a joint configuration that is safe to
    /// dispatch.
    ///
    /// # Errors
    ///
    /// The first failing check, in the order listed in the module docs.
    pub fn authorize(
        &self,
        target: &Vec3,
        obstacles: &[Vec3],
    ) -> Result<JointConfiguration, ArmError> {
        let emergency = self.monitor.emergency_state();
        if emergency.engaged {
            warn!(reason = %emergency.last_reason, "motion rejected: emergency stop engaged");
            return Err(ArmError::EmergencyStopEngaged {
                reason: emergency.last_reason,
            });
        }

        let solution = self.chain.inverse_kinematics(target)?;

        self.monitor
            .limits()
            .check_joint_positions(&solution.to_degrees())
            .inspect_err(|e| warn!(error = %e, "motion rejected: planned joint limit breach"))?;

        let origins = self.chain.joint_origins(solution.as_slice())?;
        // The last origin is the forward-kinematics tip.
        if let Some(tip) = origins.last()
            && let Proximity::Collision { distance } = self.guard.assess(tip, obstacles)
        {
            return Err(ArmError::CollisionRisk { distance });
        }
        if let Some(distance) = self.guard.self_collision_distance(&origins) {
            return Err(ArmError::CollisionRisk { distance });
        }

        debug!(target = ?(target.x, target.y, target.z), joints = ?solution.0, "motion authorized");
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate_with(guard: ProximityGuard) -> (MotionGate, Arc<SafetyMonitor>) {
        let monitor = Arc::new(SafetyMonitor::default());
        let gate = MotionGate::new(KinematicChain::default(), guard, Arc::clone(&monitor));
        (gate, monitor)
    }

    fn reachable() -> Vec3 {
        Vec3::new(300.0, 200.0, 100.0)
    }

    #[test]
    fn reachable_target_within_limits_is_authorized() {
        let (gate, monitor) = gate_with(ProximityGuard::default());
        let solution = gate.authorize(&reachable(), &[]).unwrap();
        assert!(KinematicChain::validate_solution(solution.as_slice()));
        assert_eq!(monitor.event_count(), 0);
    }

    #[test]
    fn engaged_interlock_rejects_with_reason() {
        let (gate, monitor) = gate_with(ProximityGuard::default());
        monitor.trigger_emergency_stop("operator");
        assert_eq!(
            gate.authorize(&reachable(), &[]),
            Err(ArmError::EmergencyStopEngaged {
                reason: "operator".into()
            })
        );
    }

    #[test]
    fn unreachable_target_is_rejected() {
        let (gate, _) = gate_with(ProximityGuard::default());
        assert!(matches!(
            gate.authorize(&Vec3::new(1000.0, 0.0, 0.0), &[]),
            Err(ArmError::Unreachable { .. })
        ));
    }

    #[test]
    fn planned_joint_breach_is_rejected_without_emergency_stop() {
        let (gate, monitor) = gate_with(ProximityGuard::default());
        // Close to the inner edge of the annulus the elbow folds past 120°.
        let err = gate.authorize(&Vec3::new(202.0, 0.0, 0.0), &[]).unwrap_err();
        assert!(matches!(err, ArmError::JointLimit { joint: 2, .. }));
        assert!(!monitor.is_emergency_stop_engaged());
        assert_eq!(monitor.event_count(), 0);
    }

    #[test]
    fn obstacle_at_planned_tip_is_rejected() {
        let (gate, _) = gate_with(ProximityGuard::default());
        let solution = gate.chain().inverse_kinematics(&reachable()).unwrap();
        let tip = gate.chain().forward_kinematics(solution.as_slice()).unwrap();
        let obstacle = tip + Vec3::new(1.0, 0.0, 0.0);
        assert!(matches!(
            gate.authorize(&reachable(), &[obstacle]),
            Err(ArmError::CollisionRisk { .. })
        ));
        // Far obstacles are fine.
        let far = tip + Vec3::new(50.0, 0.0, 0.0);
        assert!(gate.authorize(&reachable(), &[far]).is_ok());
    }

    #[test]
    fn wide_margins_trip_self_collision() {
        // Wrist origins sit 100 mm apart: inside 2 × 60 mm.
        let (gate, _) = gate_with(ProximityGuard::new(60.0, 60.0));
        assert!(matches!(
            gate.authorize(&reachable(), &[]),
            Err(ArmError::CollisionRisk { .. })
        ));
    }

    #[test]
    fn guard_margins_are_reconfigurable() {
        let (mut gate, _) = gate_with(ProximityGuard::new(60.0, 60.0));
        gate.guard_mut().set_safety_margins(2.0, 5.0);
        assert_eq!(gate.guard().min_safe_distance(), 2.0);
        assert!(gate.authorize(&reachable(), &[]).is_ok());
    }
}
