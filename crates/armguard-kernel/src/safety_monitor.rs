//! [`SafetyMonitor`] – the safety interlock.
//!
//! Validates sensed joint positions, instrument forces, velocities and
//! obstacle clearances against the configured [`SafetyLimits`], and owns the
//! emergency-stop state machine:
//!
//! ```text
//!   OPERATIONAL ──trigger_emergency_stop──▶ EMERGENCY_STOP
//!        ▲                                        │
//!        └────────resume_normal_operation─────────┘
//! ```
//!
//! Joint-limit breaches are fail-closed and engage the emergency stop.
//! Force, velocity and proximity breaches are fail-open here: they are
//! reported through the return value and the event log, and the caller
//! decides whether repeated failures warrant a stop.
//!
//! All state (emergency flag, limits, event log, brake) sits behind a
//! single lock.  Every public method takes it exactly once, so concurrent
//! callers from the control cycle and the command boundary serialise.  The
//! optional fault handler is always invoked after the lock is released.
//!
//! # Example
//!
//! ```rust
//! use armguard_kernel::SafetyMonitor;
//!
//! let monitor = SafetyMonitor::default();
//! assert!(monitor.validate_joint_position(&[0.0; 6]));
//!
//! // 200° on the base joint is outside [-180, 180]: fail-closed.
//! assert!(!monitor.validate_joint_position(&[200.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
//! assert!(monitor.is_emergency_stop_engaged());
//!
//! monitor.resume_normal_operation();
//! assert!(!monitor.is_emergency_stop_engaged());
//! assert!(monitor.calculate_overall_safety_score() < 100.0);
//! ```

use armguard_hal::EmergencyBrake;
use armguard_types::ArmError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::event_log::{EventLog, SafetyEvent, SafetyEventKind};
use crate::limits::SafetyLimits;

/// Adjacent-axis force delta (N) above which a rapid change is recorded.
pub const RAPID_FORCE_CHANGE_N: f64 = 5.0;
/// Number of events the safety score is computed over.
pub const SCORE_WINDOW: usize = 100;
const SCORE_PER_SEVERITY: f64 = 0.5;

/// Reason recorded when a joint leaves its travel range.
pub const JOINT_LIMIT_EXCEEDED: &str = "JOINT_LIMIT_EXCEEDED";

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// The two states of the interlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorMode {
    Operational,
    EmergencyStopped,
}

impl MonitorMode {
    /// Text recorded as the robot-state snapshot of each event.
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorMode::Operational => "OPERATIONAL",
            MonitorMode::EmergencyStopped => "EMERGENCY_STOP",
        }
    }
}

/// Emergency-stop flag plus the reason it was last engaged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyState {
    pub engaged: bool,
    /// Kept across a resume so operators can see what last stopped the arm.
    pub last_reason: String,
    /// Times the stop has been engaged since construction.  Never reset.
    #[serde(default)]
    pub engagements: u64,
}

/// External error channel for faults that cannot be returned to a caller,
/// such as a hardware stop that did not confirm.
pub type FaultHandler = Box<dyn Fn(&ArmError) + Send + Sync>;

// ────────────────────────────────────────────────────────────────────────────
// Internal state
// ────────────────────────────────────────────────────────────────────────────

struct MonitorState {
    emergency: EmergencyState,
    limits: SafetyLimits,
    log: EventLog,
    brake: Option<Box<dyn EmergencyBrake>>,
}

impl MonitorState {
    fn mode(&self) -> MonitorMode {
        if self.emergency.engaged {
            MonitorMode::EmergencyStopped
        } else {
            MonitorMode::Operational
        }
    }

    fn record(&mut self, kind: SafetyEventKind, value: f64) -> u64 {
        let state = self.mode().as_str();
        self.log.push(kind, value, state)
    }

    /// Engage the interlock, then the brake.  Returns the brake fault, if
    /// any, for the caller to report once the lock is dropped.
    fn engage(&mut self, reason: &str) -> Option<ArmError> {
        self.emergency.engaged = true;
        self.emergency.last_reason = reason.to_string();
        self.emergency.engagements += 1;
        self.record(SafetyEventKind::EmergencyStopTriggered, 0.0);
        error!(reason, "EMERGENCY STOP engaged");

        let brake = self.brake.as_mut()?;
        match brake.engage() {
            Ok(()) => None,
            Err(fault) => {
                error!(
                    brake = brake.id(),
                    error = %fault,
                    "hardware stop failed; interlock stays engaged"
                );
                self.record(SafetyEventKind::HardwareStopFailed, 0.0);
                Some(fault)
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SafetyMonitor
// ────────────────────────────────────────────────────────────────────────────

/// Central validator and emergency-stop owner.  Share it as
/// `Arc<SafetyMonitor>`; every method takes `&self`.
pub struct SafetyMonitor {
    state: Mutex<MonitorState>,
    fault_handler: Option<FaultHandler>,
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::from_valid_limits(SafetyLimits::default())
    }
}

impl SafetyMonitor {
    /// Create a monitor in the OPERATIONAL state.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidConfig`] when `limits` fails
    /// [`SafetyLimits::validate`].
    pub fn new(limits: SafetyLimits) -> Result<Self, ArmError> {
        limits.validate()?;
        Ok(Self::from_valid_limits(limits))
    }

    fn from_valid_limits(limits: SafetyLimits) -> Self {
        info!(
            joints = limits.joint_limits.len(),
            force_axes = limits.force_limits.len(),
            velocity_axes = limits.velocity_limits.len(),
            event_capacity = limits.event_log_capacity,
            "safety monitor initialised"
        );
        Self {
            state: Mutex::new(MonitorState {
                emergency: EmergencyState::default(),
                log: EventLog::new(limits.event_log_capacity),
                limits,
                brake: None,
            }),
            fault_handler: None,
        }
    }

    /// Attach the hardware stop line engaged on every emergency stop.
    pub fn with_emergency_brake(mut self, brake: impl EmergencyBrake + 'static) -> Self {
        self.state.get_mut().brake = Some(Box::new(brake));
        self
    }

    /// Attach the external error channel.
    pub fn with_fault_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ArmError) + Send + Sync + 'static,
    {
        self.fault_handler = Some(Box::new(handler));
        self
    }

    fn report(&self, fault: Option<ArmError>) {
        if let Some(fault) = fault
            && let Some(handler) = &self.fault_handler
        {
            handler(&fault);
        }
    }

    // ── Validation ──────────────────────────────────────────────────────────

    /// Check joint positions (degrees) against the joint table.
    ///
    /// A count mismatch logs `INVALID_JOINT_DATA` and returns `false` without
    /// touching the interlock.  The first joint outside its range engages the
    /// emergency stop, logs `JOINT_SAFETY_VIOLATION` with the offending value
    /// and returns `false`; later joints are not examined.
    pub fn validate_joint_position(&self, positions: &[f64]) -> bool {
        let fault = {
            let mut st = self.state.lock();
            match st.limits.check_joint_positions(positions) {
                Ok(()) => return true,
                Err(ArmError::JointLimit { joint, value, min, max }) => {
                    warn!(joint, value, min, max, "joint outside travel range");
                    let fault = st.engage(JOINT_LIMIT_EXCEEDED);
                    st.record(SafetyEventKind::JointSafetyViolation, value);
                    fault
                }
                Err(e) => {
                    warn!(error = %e, "rejecting joint data");
                    st.record(SafetyEventKind::InvalidJointData, positions.len() as f64);
                    return false;
                }
            }
        };
        self.report(fault);
        false
    }

    /// Check per-axis forces (N).  Fail-open: never engages the interlock.
    ///
    /// The first axis over its ceiling gets a force reduction, an
    /// `EXCESSIVE_FORCE` event and an immediate `false`.  An axis that passes
    /// is then compared with its predecessor, and a jump above
    /// [`RAPID_FORCE_CHANGE_N`] is recorded for information only.
    pub fn validate_force_readings(&self, forces: &[f64]) -> bool {
        let mut st = self.state.lock();
        if forces.len() != st.limits.force_limits.len() {
            warn!(
                expected = st.limits.force_limits.len(),
                actual = forces.len(),
                "rejecting force data"
            );
            st.record(SafetyEventKind::InvalidForceData, forces.len() as f64);
            return false;
        }

        for axis in 0..forces.len() {
            let force = forces[axis];
            let limit = st.limits.force_limits[axis];
            if force > limit || force.is_nan() {
                warn!(axis, force, limit, "excessive instrument force");
                st.record(SafetyEventKind::ForceReductionApplied, force);
                st.record(SafetyEventKind::ExcessiveForce, force);
                return false;
            }
            if axis > 0 {
                let delta = (force - forces[axis - 1]).abs();
                if delta > RAPID_FORCE_CHANGE_N {
                    st.record(SafetyEventKind::RapidForceChange, delta);
                }
            }
        }
        true
    }

    /// Check per-axis velocities (mm/s) by magnitude.  Fail-open.
    pub fn validate_velocity(&self, velocities: &[f64]) -> bool {
        let mut st = self.state.lock();
        if velocities.len() != st.limits.velocity_limits.len() {
            warn!(
                expected = st.limits.velocity_limits.len(),
                actual = velocities.len(),
                "rejecting velocity data"
            );
            st.record(SafetyEventKind::InvalidVelocityData, velocities.len() as f64);
            return false;
        }

        for (axis, (&v, &limit)) in velocities.iter().zip(&st.limits.velocity_limits).enumerate() {
            if v.abs() > limit || v.is_nan() {
                warn!(axis, velocity = v, limit, "excessive velocity");
                st.record(SafetyEventKind::ExcessiveVelocity, v);
                return false;
            }
        }
        true
    }

    /// `true` on the first obstacle closer to `position` than the configured
    /// minimum safe distance.  Obstacles whose dimensionality differs from
    /// `position` are skipped.  Fail-open.
    pub fn check_collision_risk<P: AsRef<[f64]>>(&self, position: &[f64], obstacles: &[P]) -> bool {
        let mut st = self.state.lock();
        let min_safe = st.limits.min_safe_distance;
        for obstacle in obstacles {
            let obstacle = obstacle.as_ref();
            if obstacle.len() != position.len() {
                continue;
            }
            let distance = position
                .iter()
                .zip(obstacle)
                .map(|(p, o)| (p - o) * (p - o))
                .sum::<f64>()
                .sqrt();
            if distance < min_safe {
                warn!(distance_mm = distance, min_safe_mm = min_safe, "collision imminent");
                st.record(SafetyEventKind::CollisionImminent, distance);
                return true;
            }
        }
        false
    }

    // ── State machine ───────────────────────────────────────────────────────

    /// Engage the interlock and the hardware stop.
    ///
    /// A brake failure is logged as `HARDWARE_STOP_FAILED` and passed to the
    /// fault handler; the interlock is never rolled back.
    pub fn trigger_emergency_stop(&self, reason: &str) {
        let fault = self.state.lock().engage(reason);
        self.report(fault);
    }

    /// Record a force reduction.  No state-machine effect.
    pub fn trigger_force_reduction(&self, current: f64, max: f64) {
        warn!(current, max, "force reduction applied");
        self.state
            .lock()
            .record(SafetyEventKind::ForceReductionApplied, current);
    }

    /// Release the interlock.
    pub fn resume_normal_operation(&self) {
        let mut st = self.state.lock();
        st.emergency.engaged = false;
        st.record(SafetyEventKind::NormalOperationResumed, 0.0);
        info!(last_reason = %st.emergency.last_reason, "normal operation resumed");
    }

    // ── Event log & score ───────────────────────────────────────────────────

    /// Append an event and return its sequence number.
    pub fn log_safety_event(&self, kind: SafetyEventKind, value: f64) -> u64 {
        self.state.lock().record(kind, value)
    }

    /// Up to `count` events from the front of the retention queue, i.e. the
    /// oldest still resident, not the most recently logged.
    pub fn recent_safety_events(&self, count: usize) -> Vec<SafetyEvent> {
        self.state.lock().log.oldest(count).cloned().collect()
    }

    /// `max(0, 100 − Σ severity × 0.5)` over the same window
    /// [`recent_safety_events`][Self::recent_safety_events] returns for
    /// [`SCORE_WINDOW`].  100 on an empty log.
    pub fn calculate_overall_safety_score(&self) -> f64 {
        let st = self.state.lock();
        let penalty: f64 = st
            .log
            .oldest(SCORE_WINDOW)
            .map(|e| f64::from(e.severity) * SCORE_PER_SEVERITY)
            .sum();
        (100.0 - penalty).max(0.0)
    }

    /// Every resident event logged after `sequence`.  Pass 0 for all.
    pub fn events_since(&self, sequence: u64) -> Vec<SafetyEvent> {
        self.state.lock().log.since(sequence)
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().log.len()
    }

    // ── Reconfiguration ─────────────────────────────────────────────────────

    /// Set every force axis ceiling to `value` (N).
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidConfig`] for a non-finite or non-positive value.
    pub fn adjust_force_limit(&self, value: f64) -> Result<(), ArmError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ArmError::InvalidConfig(format!(
                "force limit {value} must be finite and positive"
            )));
        }
        let mut st = self.state.lock();
        st.limits.force_limits.fill(value);
        st.record(SafetyEventKind::ForceLimitAdjusted, value);
        info!(force_limit_n = value, "force limit adjusted");
        Ok(())
    }

    /// Replace the whole limit set.  The event log is resized to the new
    /// capacity, evicting its oldest events if needed.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidConfig`] when `limits` fails validation; the
    /// current limits are kept.
    pub fn set_limits(&self, limits: SafetyLimits) -> Result<(), ArmError> {
        limits.validate()?;
        let mut st = self.state.lock();
        st.log.set_capacity(limits.event_log_capacity);
        st.limits = limits;
        st.record(SafetyEventKind::LimitsReconfigured, 0.0);
        info!("safety limits reconfigured");
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn limits(&self) -> SafetyLimits {
        self.state.lock().limits.clone()
    }

    pub fn emergency_state(&self) -> EmergencyState {
        self.state.lock().emergency.clone()
    }

    pub fn is_emergency_stop_engaged(&self) -> bool {
        self.state.lock().emergency.engaged
    }

    /// Monotonic count of emergency-stop engagements.  A change between two
    /// reads means a stop happened in between, even if it was already resumed.
    pub fn engagement_count(&self) -> u64 {
        self.state.lock().emergency.engagements
    }

    pub fn mode(&self) -> MonitorMode {
        self.state.lock().mode()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use armguard_hal::sim::SimBrake;

    use super::*;

    fn kinds(monitor: &SafetyMonitor) -> Vec<SafetyEventKind> {
        monitor.events_since(0).into_iter().map(|e| e.kind).collect()
    }

    // ------------------------------------------------------------------ joints

    #[test]
    fn wrong_joint_count_is_rejected_without_state_change() {
        let monitor = SafetyMonitor::default();
        assert!(!monitor.validate_joint_position(&[0.0; 5]));
        assert!(!monitor.validate_joint_position(&[0.0; 7]));
        assert!(!monitor.is_emergency_stop_engaged());
        assert_eq!(
            kinds(&monitor),
            vec![SafetyEventKind::InvalidJointData, SafetyEventKind::InvalidJointData]
        );
    }

    #[test]
    fn positions_within_bounds_pass_silently() {
        let monitor = SafetyMonitor::default();
        assert!(monitor.validate_joint_position(&[10.0, -45.0, 100.0, 150.0, -180.0, 0.0]));
        assert_eq!(monitor.event_count(), 0);
        assert_eq!(monitor.mode(), MonitorMode::Operational);
    }

    #[test]
    fn joint_over_limit_engages_emergency_stop() {
        let monitor = SafetyMonitor::default();
        assert!(!monitor.validate_joint_position(&[200.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(monitor.is_emergency_stop_engaged());
        assert_eq!(monitor.emergency_state().last_reason, JOINT_LIMIT_EXCEEDED);

        let events = monitor.events_since(0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, SafetyEventKind::EmergencyStopTriggered);
        assert_eq!(events[1].kind, SafetyEventKind::JointSafetyViolation);
        assert_eq!(events[1].value, 200.0);
        assert_eq!(events[1].robot_state, "EMERGENCY_STOP");
    }

    #[test]
    fn only_first_violating_joint_is_reported() {
        let monitor = SafetyMonitor::default();
        assert!(!monitor.validate_joint_position(&[0.0, 95.0, 130.0, 0.0, 0.0, 0.0]));
        let violations: Vec<_> = monitor
            .events_since(0)
            .into_iter()
            .filter(|e| e.kind == SafetyEventKind::JointSafetyViolation)
            .collect();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].value, 95.0);
    }

    // ------------------------------------------------------------------ forces

    #[test]
    fn excessive_force_is_fail_open() {
        let monitor = SafetyMonitor::default();
        assert!(!monitor.validate_force_readings(&[20.0, 5.0, 5.0]));
        assert!(!monitor.is_emergency_stop_engaged());
        assert_eq!(
            kinds(&monitor),
            vec![SafetyEventKind::ForceReductionApplied, SafetyEventKind::ExcessiveForce]
        );
    }

    #[test]
    fn forces_within_limits_pass() {
        let monitor = SafetyMonitor::default();
        assert!(monitor.validate_force_readings(&[2.0, 3.0, 4.0]));
        assert_eq!(monitor.event_count(), 0);
    }

    #[test]
    fn rapid_force_change_is_informational() {
        let monitor = SafetyMonitor::default();
        assert!(monitor.validate_force_readings(&[1.0, 12.0, 12.0]));
        let events = monitor.events_since(0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SafetyEventKind::RapidForceChange);
        assert_eq!(events[0].value, 11.0);
    }

    #[test]
    fn force_scan_stops_at_first_excessive_axis() {
        let monitor = SafetyMonitor::default();
        // Axis 1 is over the limit; axis 2 is never examined.
        assert!(!monitor.validate_force_readings(&[1.0, 16.0, 40.0]));
        assert_eq!(
            kinds(&monitor),
            vec![SafetyEventKind::ForceReductionApplied, SafetyEventKind::ExcessiveForce]
        );
    }

    #[test]
    fn force_length_mismatch_and_nan_are_rejected() {
        let monitor = SafetyMonitor::default();
        assert!(!monitor.validate_force_readings(&[1.0, 1.0]));
        assert!(!monitor.validate_force_readings(&[1.0, f64::NAN, 1.0]));
        let kinds = kinds(&monitor);
        assert_eq!(kinds[0], SafetyEventKind::InvalidForceData);
        assert!(kinds.contains(&SafetyEventKind::ExcessiveForce));
    }

    // ------------------------------------------------------------------ velocity

    #[test]
    fn velocity_is_checked_by_magnitude() {
        let monitor = SafetyMonitor::default();
        assert!(monitor.validate_velocity(&[49.0, -49.0, 0.0]));
        assert!(!monitor.validate_velocity(&[0.0, -60.0, 0.0]));
        assert!(!monitor.is_emergency_stop_engaged());
        let events = monitor.events_since(0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SafetyEventKind::ExcessiveVelocity);
        assert_eq!(events[0].value, -60.0);
    }

    #[test]
    fn velocity_length_mismatch_is_rejected() {
        let monitor = SafetyMonitor::default();
        assert!(!monitor.validate_velocity(&[1.0; 4]));
        assert_eq!(kinds(&monitor), vec![SafetyEventKind::InvalidVelocityData]);
    }

    // ------------------------------------------------------------------ collision

    #[test]
    fn collision_risk_skips_mismatched_obstacles() {
        let monitor = SafetyMonitor::default();
        let position = [0.0, 0.0, 0.0];
        let obstacles: Vec<Vec<f64>> = vec![vec![0.5, 0.0], vec![10.0, 0.0, 0.0]];
        assert!(!monitor.check_collision_risk(&position, &obstacles));

        let obstacles = [[10.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
        assert!(monitor.check_collision_risk(&position, &obstacles));
        let events = monitor.events_since(0);
        assert_eq!(events[0].kind, SafetyEventKind::CollisionImminent);
        assert!((events[0].value - 2f64.sqrt()).abs() < 1e-12);
        assert!(!monitor.is_emergency_stop_engaged());
    }

    // ------------------------------------------------------------------ state machine

    #[test]
    fn trigger_then_resume_releases_interlock() {
        let monitor = SafetyMonitor::default();
        monitor.trigger_emergency_stop("operator");
        assert!(monitor.is_emergency_stop_engaged());
        assert_eq!(monitor.mode(), MonitorMode::EmergencyStopped);

        monitor.resume_normal_operation();
        assert!(!monitor.is_emergency_stop_engaged());
        assert_eq!(monitor.emergency_state().last_reason, "operator");
        assert_eq!(
            kinds(&monitor),
            vec![
                SafetyEventKind::EmergencyStopTriggered,
                SafetyEventKind::NormalOperationResumed
            ]
        );
    }

    #[test]
    fn engagement_count_survives_resume() {
        let monitor = SafetyMonitor::default();
        assert_eq!(monitor.engagement_count(), 0);
        monitor.trigger_emergency_stop("operator");
        monitor.resume_normal_operation();
        assert_eq!(monitor.engagement_count(), 1);
        monitor.trigger_emergency_stop("operator");
        monitor.trigger_emergency_stop("operator");
        assert_eq!(monitor.engagement_count(), 3);
        assert_eq!(monitor.emergency_state().engagements, 3);
    }

    #[test]
    fn brake_is_engaged_on_emergency_stop() {
        let brake = SimBrake::new("stop_line");
        let handle = brake.handle();
        let monitor = SafetyMonitor::default().with_emergency_brake(brake);
        monitor.trigger_emergency_stop("operator");
        assert_eq!(handle.engagements(), 1);
    }

    #[test]
    fn failing_brake_reports_fault_but_stays_engaged() {
        let faults = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let monitor = SafetyMonitor::default()
            .with_emergency_brake(SimBrake::failing("stop_line"))
            .with_fault_handler(move |e| sink.lock().push(e.clone()));

        monitor.trigger_emergency_stop("operator");

        assert!(monitor.is_emergency_stop_engaged());
        assert_eq!(faults.lock().len(), 1);
        assert!(matches!(
            &faults.lock()[0],
            ArmError::HardwareFault { component, .. } if component == "stop_line"
        ));
        assert_eq!(
            kinds(&monitor),
            vec![
                SafetyEventKind::EmergencyStopTriggered,
                SafetyEventKind::HardwareStopFailed
            ]
        );
    }

    #[test]
    fn fault_handler_may_reenter_monitor() {
        let slot: Arc<parking_lot::Mutex<Option<Arc<SafetyMonitor>>>> = Arc::default();
        let seen = Arc::clone(&slot);
        let monitor = Arc::new(
            SafetyMonitor::default()
                .with_emergency_brake(SimBrake::failing("stop_line"))
                .with_fault_handler(move |_| {
                    if let Some(m) = seen.lock().as_ref() {
                        assert!(m.is_emergency_stop_engaged());
                    }
                }),
        );
        *slot.lock() = Some(Arc::clone(&monitor));
        monitor.validate_joint_position(&[0.0, 0.0, 0.0, 0.0, 0.0, 999.0]);
        assert!(monitor.is_emergency_stop_engaged());
        slot.lock().take();
    }

    #[test]
    fn force_reduction_has_no_state_effect() {
        let monitor = SafetyMonitor::default();
        monitor.trigger_force_reduction(18.0, 15.0);
        assert!(!monitor.is_emergency_stop_engaged());
        assert_eq!(kinds(&monitor), vec![SafetyEventKind::ForceReductionApplied]);
    }

    // ------------------------------------------------------------------ score & log

    #[test]
    fn score_starts_at_100_and_decreases() {
        let monitor = SafetyMonitor::default();
        assert_eq!(monitor.calculate_overall_safety_score(), 100.0);
        monitor.validate_velocity(&[99.0, 0.0, 0.0]);
        assert_eq!(monitor.calculate_overall_safety_score(), 98.5);
        monitor.trigger_emergency_stop("test");
        assert_eq!(monitor.calculate_overall_safety_score(), 96.0);
    }

    #[test]
    fn score_is_clamped_at_zero_over_window() {
        let monitor = SafetyMonitor::default();
        for _ in 0..150 {
            monitor.log_safety_event(SafetyEventKind::EmergencyStopTriggered, 0.0);
        }
        // 100 events × 5 × 0.5 = 250 > 100.
        assert_eq!(monitor.calculate_overall_safety_score(), 0.0);
    }

    #[test]
    fn recent_events_come_from_front_of_queue() {
        let monitor = SafetyMonitor::default();
        for i in 0..5 {
            monitor.log_safety_event(SafetyEventKind::ExcessiveVelocity, i as f64);
        }
        let values: Vec<f64> = monitor.recent_safety_events(2).iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0.0, 1.0]);
        assert_eq!(monitor.event_count(), 5);
    }

    #[test]
    fn events_since_tracks_sequence() {
        let monitor = SafetyMonitor::default();
        let first = monitor.log_safety_event(SafetyEventKind::ExcessiveForce, 1.0);
        monitor.log_safety_event(SafetyEventKind::ExcessiveForce, 2.0);
        let newer = monitor.events_since(first);
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].value, 2.0);
    }

    // ------------------------------------------------------------------ reconfiguration

    #[test]
    fn adjust_force_limit_applies_to_every_axis() {
        let monitor = SafetyMonitor::default();
        monitor.adjust_force_limit(25.0).unwrap();
        assert_eq!(monitor.limits().force_limits, vec![25.0; 3]);
        assert!(monitor.validate_force_readings(&[20.0, 20.0, 20.0]));
        assert_eq!(kinds(&monitor), vec![SafetyEventKind::ForceLimitAdjusted]);

        assert!(monitor.adjust_force_limit(0.0).is_err());
        assert!(monitor.adjust_force_limit(f64::INFINITY).is_err());
        assert_eq!(monitor.limits().force_limits, vec![25.0; 3]);
    }

    #[test]
    fn set_limits_validates_and_resizes_log() {
        let monitor = SafetyMonitor::default();
        for _ in 0..10 {
            monitor.log_safety_event(SafetyEventKind::RapidForceChange, 6.0);
        }
        let limits = SafetyLimits {
            event_log_capacity: 4,
            ..SafetyLimits::default()
        };
        monitor.set_limits(limits).unwrap();
        assert_eq!(monitor.event_count(), 4);
        assert_eq!(
            monitor.events_since(0).last().map(|e| e.kind),
            Some(SafetyEventKind::LimitsReconfigured)
        );

        let bad = SafetyLimits {
            force_limits: vec![],
            ..SafetyLimits::default()
        };
        assert!(monitor.set_limits(bad).is_err());
        assert_eq!(monitor.limits().event_log_capacity, 4);
    }

    #[test]
    fn new_rejects_invalid_limits() {
        let limits = SafetyLimits {
            joint_limits: vec![],
            ..SafetyLimits::default()
        };
        assert!(SafetyMonitor::new(limits).is_err());
    }

    #[test]
    fn short_joint_table_is_rejected_up_front() {
        let mut limits = SafetyLimits::default();
        limits.joint_limits.pop();
        assert!(SafetyMonitor::new(limits.clone()).is_err());

        let monitor = SafetyMonitor::default();
        assert!(monitor.set_limits(limits).is_err());
        assert!(monitor.validate_joint_position(&[0.0; 6]));
    }

    #[test]
    fn log_capacity_bounds_event_count() {
        let limits = SafetyLimits {
            event_log_capacity: 3,
            ..SafetyLimits::default()
        };
        let monitor = SafetyMonitor::new(limits).unwrap();
        for _ in 0..10 {
            monitor.validate_velocity(&[100.0, 0.0, 0.0]);
        }
        assert_eq!(monitor.event_count(), 3);
    }

    // ------------------------------------------------------------------ concurrency

    #[test]
    fn concurrent_callers_serialise() {
        let monitor = Arc::new(SafetyMonitor::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let m = Arc::clone(&monitor);
                thread::spawn(move || {
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            m.validate_velocity(&[60.0, 0.0, 0.0]);
                        } else {
                            m.trigger_emergency_stop("stress");
                            m.resume_normal_operation();
                        }
                        let _ = m.calculate_overall_safety_score();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 2 × 100 velocity events + 2 × 100 × (trigger + resume).
        assert_eq!(monitor.event_count(), 600);
        let sequences: Vec<u64> = monitor.events_since(0).iter().map(|e| e.sequence).collect();
        assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));
    }
}
