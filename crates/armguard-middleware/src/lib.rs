//! `armguard-middleware` – Command and telemetry boundary.
//!
//! Connects the safety core to the outside world without owning any
//! transport.
//!
//! # Modules
//!
//! - [`bus`] – [`SafetyBus`][bus::SafetyBus]: typed broadcast lanes for
//!   telemetry snapshots and alerts, plus a lossless operator command queue.
//! - [`command_router`] – [`CommandRouter`][command_router::CommandRouter]:
//!   applies `EMERGENCY_STOP`, `RESUME_OPERATION`, `FORCE_LIMIT_ADJUST` and
//!   `STATUS_CHECK` to a [`SafetyMonitor`][armguard_kernel::SafetyMonitor].
//! - [`alerts`] – [`AlertFeed`][alerts::AlertFeed]: converts newly logged
//!   safety events into operator alerts.

pub mod alerts;
pub mod bus;
pub mod command_router;

pub use alerts::{AlertFeed, alert_for};
pub use bus::{BusReceiver, CommandQueue, SafetyBus};
pub use command_router::{CommandOutcome, CommandRouter, MonitorStatus};
