//! `armguard-runtime` – The control cycle.
//!
//! Owns the thread that keeps the interlock alive: sensor acquisition,
//! safety evaluation and command dispatch at a fixed frequency.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]:
//!   fixed-frequency executor with overrun tracking and a blocking stop.
//! - [`safety_cycle`] – [`SafetyCycle`][safety_cycle::SafetyCycle]: the
//!   cycle body wiring sensors, monitor, proximity guard and actuator.
//! - [`board`] – [`TelemetryBoard`][board::TelemetryBoard] and
//!   [`TargetSlot`][board::TargetSlot]: handles shared with the cycle.
//! - [`config`] – `~/.armguard/config.toml` loading and validation.
//! - [`telemetry`] – `tracing` subscriber and OTLP exporter setup.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use armguard_hal::{SimArm, SimSensor};
//! use armguard_runtime::{config::Config, ControlLoop, SafetyCycle};
//!
//! let cfg = Config::default();
//! cfg.validate().expect("defaults are valid");
//! let monitor = Arc::new(cfg.build_monitor().expect("defaults are valid"));
//!
//! let cycle = SafetyCycle::new(SimSensor::nominal(), SimArm::new("arm"), monitor, cfg.build_guard())
//!     .with_max_consecutive_faults(cfg.max_consecutive_faults);
//! let board = cycle.board();
//!
//! let mut control = ControlLoop::new(cycle);
//! control.set_control_frequency(cfg.control_frequency_hz);
//! control.start();
//! std::thread::sleep(std::time::Duration::from_millis(5));
//! control.stop();
//!
//! assert!(board.snapshot().safety_ok);
//! ```

pub mod board;
pub mod config;
pub mod control_loop;
pub mod safety_cycle;
pub mod telemetry;

pub use board::{TargetSlot, TelemetryBoard};
pub use control_loop::{ControlLoop, CycleHandler};
pub use safety_cycle::SafetyCycle;
