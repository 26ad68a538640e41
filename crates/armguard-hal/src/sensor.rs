//! Sensor acquisition boundary.

use armguard_types::ArmError;

/// One coherent snapshot of everything the safety cycle checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFrame {
    /// Joint encoder readings in degrees, base to wrist.
    pub joint_positions: Vec<f64>,
    /// Instrument Cartesian velocity per axis (mm/s).
    pub instrument_velocities: Vec<f64>,
    /// Instrument force per axis (N).
    pub forces: Vec<f64>,
    /// Instrument tip in the base frame (mm).
    pub instrument_tip: [f64; 3],
    /// Obstacle points in the base frame (mm).
    pub obstacles: Vec<[f64; 3]>,
}

/// A source of [`SensorFrame`]s, typically an encoder/force-torque bridge.
pub trait SensorSource: Send {
    /// Stable identifier used in logs, e.g. `"ft_sensor_bridge"`.
    fn id(&self) -> &str;

    /// Acquire the latest frame.
    ///
    /// # Errors
    ///
    /// [`ArmError::HardwareFault`] when the device cannot be read.
    fn read(&mut self) -> Result<SensorFrame, ArmError>;
}
