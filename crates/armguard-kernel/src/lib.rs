//! `armguard-kernel` – Safety interlock.
//!
//! The part of the stack that does not plan or move anything; it enforces
//! limits and owns the emergency-stop state.
//!
//! # Modules
//!
//! - [`limits`] – [`SafetyLimits`][limits::SafetyLimits]: joint, force,
//!   velocity and proximity limits with their compiled-in defaults.
//! - [`event_log`] – [`EventLog`][event_log::EventLog]: bounded FIFO of
//!   immutable [`SafetyEvent`][event_log::SafetyEvent]s with an explicit
//!   event-kind → severity table.
//! - [`safety_monitor`] – [`SafetyMonitor`][safety_monitor::SafetyMonitor]:
//!   validates sensed data, owns the OPERATIONAL / EMERGENCY_STOPPED state
//!   machine, the event log and the derived safety score.  All access is
//!   serialised behind one lock.
//! - [`motion_gate`] – [`MotionGate`][motion_gate::MotionGate]: the single
//!   interception point a Cartesian target passes through before it may be
//!   dispatched.  Combines the interlock, inverse kinematics, joint limits
//!   and proximity checks in one call.

pub mod event_log;
pub mod limits;
pub mod motion_gate;
pub mod safety_monitor;

pub use event_log::{EventLog, SafetyEvent, SafetyEventKind};
pub use limits::SafetyLimits;
pub use motion_gate::MotionGate;
pub use safety_monitor::{EmergencyState, FaultHandler, MonitorMode, SafetyMonitor};
