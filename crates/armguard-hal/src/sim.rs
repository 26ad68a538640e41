//! In-process simulated drivers for CI and headless runs.
//!
//! Each simulated driver hands out a cloneable handle sharing its state, so a
//! test can move the driver into a control loop and still inspect or steer
//! it from the outside.
//!
//! # Example
//!
//! ```rust
//! use armguard_hal::sim::{SimArm, SimSensor};
//! use armguard_hal::{JointActuator, SensorSource};
//! use armguard_types::JointConfiguration;
//!
//! let mut sensor = SimSensor::nominal();
//! let frame = sensor.read().expect("sim sensor must read");
//! assert_eq!(frame.joint_positions.len(), 6);
//!
//! let mut arm = SimArm::new("arm");
//! let record = arm.record();
//! arm.command(&JointConfiguration::zeros()).unwrap();
//! assert_eq!(record.commands().len(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use armguard_types::{ArmError, JointConfiguration};
use parking_lot::Mutex;
use tracing::debug;

use crate::actuator::{EmergencyBrake, JointActuator};
use crate::sensor::{SensorFrame, SensorSource};

/// A frame well inside every default limit: all joints at zero, light
/// contact force, slow motion, no obstacles.
pub fn nominal_frame() -> SensorFrame {
    SensorFrame {
        joint_positions: vec![0.0; 6],
        instrument_velocities: vec![5.0, 5.0, 5.0],
        forces: vec![2.0, 2.0, 2.0],
        instrument_tip: [300.0, 0.0, 200.0],
        obstacles: Vec::new(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensor
// ────────────────────────────────────────────────────────────────────────────

/// Shared, steerable state behind a [`SimSensor`].
#[derive(Clone)]
pub struct SimSensorHandle {
    frame: Arc<Mutex<Option<SensorFrame>>>,
    reads: Arc<AtomicU64>,
}

impl SimSensorHandle {
    /// Replace the frame returned by subsequent reads.
    pub fn set_frame(&self, frame: SensorFrame) {
        *self.frame.lock() = Some(frame);
    }

    /// Make subsequent reads fail until a frame is set again.
    pub fn disconnect(&self) {
        *self.frame.lock() = None;
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

/// Simulated sensor bridge returning whatever frame its handle holds.
pub struct SimSensor {
    id: String,
    handle: SimSensorHandle,
}

impl SimSensor {
    pub fn new(id: impl Into<String>, frame: SensorFrame) -> Self {
        Self {
            id: id.into(),
            handle: SimSensorHandle {
                frame: Arc::new(Mutex::new(Some(frame))),
                reads: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    /// A sensor reporting [`nominal_frame`].
    pub fn nominal() -> Self {
        Self::new("sim_sensor", nominal_frame())
    }

    pub fn handle(&self) -> SimSensorHandle {
        self.handle.clone()
    }
}

impl SensorSource for SimSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn read(&mut self) -> Result<SensorFrame, ArmError> {
        self.handle.reads.fetch_add(1, Ordering::Relaxed);
        self.handle
            .frame
            .lock()
            .clone()
            .ok_or_else(|| ArmError::HardwareFault {
                component: self.id.clone(),
                details: "sensor disconnected".to_string(),
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Arm
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ArmRecord {
    commands: Vec<JointConfiguration>,
    holds: u64,
}

/// Read-only view of what a [`SimArm`] has been asked to do.
#[derive(Clone, Default)]
pub struct SimArmRecord(Arc<Mutex<ArmRecord>>);

impl SimArmRecord {
    pub fn commands(&self) -> Vec<JointConfiguration> {
        self.0.lock().commands.clone()
    }

    pub fn holds(&self) -> u64 {
        self.0.lock().holds
    }
}

/// Simulated arm controller.  Records every command and hold; always succeeds.
pub struct SimArm {
    id: String,
    record: SimArmRecord,
}

impl SimArm {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record: SimArmRecord::default(),
        }
    }

    pub fn record(&self) -> SimArmRecord {
        self.record.clone()
    }
}

impl JointActuator for SimArm {
    fn id(&self) -> &str {
        &self.id
    }

    fn command(&mut self, target: &JointConfiguration) -> Result<(), ArmError> {
        debug!(arm = %self.id, target = ?target.0, "sim arm command");
        self.record.0.lock().commands.push(*target);
        Ok(())
    }

    fn hold(&mut self) -> Result<(), ArmError> {
        self.record.0.lock().holds += 1;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Brake
// ────────────────────────────────────────────────────────────────────────────

/// Shared counters behind a [`SimBrake`].
#[derive(Clone, Default)]
pub struct SimBrakeHandle {
    engagements: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl SimBrakeHandle {
    /// Number of engage attempts, successful or not.
    pub fn engagements(&self) -> u64 {
        self.engagements.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

/// Simulated stop line.  Counts engagements; can be told to fail.
pub struct SimBrake {
    id: String,
    handle: SimBrakeHandle,
}

impl SimBrake {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: SimBrakeHandle::default(),
        }
    }

    /// A brake whose every engagement reports a hardware fault.
    pub fn failing(id: impl Into<String>) -> Self {
        let brake = Self::new(id);
        brake.handle.set_failing(true);
        brake
    }

    pub fn handle(&self) -> SimBrakeHandle {
        self.handle.clone()
    }
}

impl EmergencyBrake for SimBrake {
    fn id(&self) -> &str {
        &self.id
    }

    fn engage(&mut self) -> Result<(), ArmError> {
        self.handle.engagements.fetch_add(1, Ordering::SeqCst);
        if self.handle.failing.load(Ordering::SeqCst) {
            return Err(ArmError::HardwareFault {
                component: self.id.clone(),
                details: "stop line did not confirm".to_string(),
            });
        }
        Ok(())
    }
}
