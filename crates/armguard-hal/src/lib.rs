//! `armguard-hal` – Actuation boundary.
//!
//! The safety core never talks to hardware directly.  It reads a
//! [`SensorFrame`] through [`SensorSource`], dispatches approved joint
//! targets through [`JointActuator`], and cuts power through
//! [`EmergencyBrake`].  Drivers implement these traits; the [`sim`] module
//! provides in-process stand-ins for tests and headless runs.

pub mod actuator;
pub mod sensor;
pub mod sim;

pub use actuator::{EmergencyBrake, JointActuator};
pub use sensor::{SensorFrame, SensorSource};
pub use sim::{SimArm, SimBrake, SimSensor};
