use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of joints on the manipulator.  Three positioning joints followed by
/// three orientation joints.
pub const JOINT_COUNT: usize = 6;

/// A full set of joint angles in radians, ordered base to wrist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointConfiguration(pub [f64; JOINT_COUNT]);

impl JointConfiguration {
    /// All joints at zero.
    pub fn zeros() -> Self {
        Self([0.0; JOINT_COUNT])
    }

    /// Build from a slice, failing with [`ArmError::InvalidInput`] unless it
    /// holds exactly [`JOINT_COUNT`] values.
    pub fn from_slice(angles: &[f64]) -> Result<Self, ArmError> {
        let arr: [f64; JOINT_COUNT] = angles.try_into().map_err(|_| ArmError::InvalidInput {
            expected: JOINT_COUNT,
            actual: angles.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The same configuration expressed in degrees, the unit the safety
    /// monitor's joint limits use.
    pub fn to_degrees(&self) -> [f64; JOINT_COUNT] {
        self.0.map(f64::to_degrees)
    }
}

/// Operator command types understood by the command boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    EmergencyStop,
    ResumeOperation,
    ForceLimitAdjust,
    StatusCheck,
    /// Anything else.  Reported, never acted upon.
    Unknown(String),
}

impl CommandKind {
    /// Map the wire label to a command kind.  Matching is exact.
    pub fn parse(label: &str) -> Self {
        match label {
            "EMERGENCY_STOP" => Self::EmergencyStop,
            "RESUME_OPERATION" => Self::ResumeOperation,
            "FORCE_LIMIT_ADJUST" => Self::ForceLimitAdjust,
            "STATUS_CHECK" => Self::StatusCheck,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A decoded operator command as delivered by the messaging layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlCommand {
    pub timestamp: DateTime<Utc>,
    /// e.g. `"EMERGENCY_STOP"`
    pub command_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub value: f64,
}

impl ControlCommand {
    pub fn new(command_type: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            command_type: command_type.into(),
            reason: String::new(),
            value: 0.0,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::parse(&self.command_type)
    }
}

/// Periodic robot state snapshot read by the telemetry publisher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub timestamp: Option<DateTime<Utc>>,
    /// Degrees.
    pub joint_positions: Vec<f64>,
    /// Instrument Cartesian velocity per axis (mm/s).
    pub instrument_velocities: Vec<f64>,
    /// Newtons, per axis.
    pub force_readings: Vec<f64>,
    /// `true` when the last cycle passed every safety check.
    pub safety_ok: bool,
    pub collision_risk: bool,
    pub emergency_stop: bool,
    pub procedure_phase: String,
    /// Seconds since the procedure phase was last set.
    pub procedure_duration: f64,
    pub safety_score: f64,
    pub cycle_count: u64,
}

/// Alert severity as exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Operator-facing alert derived from a safety event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub alert_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    /// Originating component, e.g. `"joint_monitor"`.
    pub component: String,
    pub recommended_action: String,
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmError {
    #[error("Invalid input: expected {expected} values, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    #[error("Target ({x}, {y}, {z}) unreachable: law-of-cosines ratio {ratio} outside [-1, 1]")]
    Unreachable { x: f64, y: f64, z: f64, ratio: f64 },

    #[error("Joint {joint} at {value} outside [{min}, {max}]")]
    JointLimit {
        joint: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Collision risk: clearance {distance} below safety margin")]
    CollisionRisk { distance: f64 },

    #[error("Emergency stop engaged: {reason}")]
    EmergencyStopEngaged { reason: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_configuration_rejects_wrong_length() {
        let err = JointConfiguration::from_slice(&[0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            ArmError::InvalidInput {
                expected: 6,
                actual: 5
            }
        );
        assert!(JointConfiguration::from_slice(&[0.0; 6]).is_ok());
    }

    #[test]
    fn joint_configuration_to_degrees() {
        let cfg = JointConfiguration([
            std::f64::consts::PI,
            0.0,
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_2,
            0.0,
        ]);
        let deg = cfg.to_degrees();
        assert!((deg[0] - 180.0).abs() < 1e-9);
        assert!((deg[4] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn command_kind_parsing() {
        assert_eq!(CommandKind::parse("EMERGENCY_STOP"), CommandKind::EmergencyStop);
        assert_eq!(CommandKind::parse("RESUME_OPERATION"), CommandKind::ResumeOperation);
        assert_eq!(CommandKind::parse("FORCE_LIMIT_ADJUST"), CommandKind::ForceLimitAdjust);
        assert_eq!(CommandKind::parse("STATUS_CHECK"), CommandKind::StatusCheck);
        assert_eq!(
            CommandKind::parse("emergency_stop"),
            CommandKind::Unknown("emergency_stop".to_string())
        );
    }

    #[test]
    fn control_command_decodes_with_missing_optional_fields() {
        let json = r#"{"timestamp":"2024-01-01T00:00:00Z","command_type":"STATUS_CHECK"}"#;
        let cmd: ControlCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.kind(), CommandKind::StatusCheck);
        assert!(cmd.reason.is_empty());
        assert_eq!(cmd.value, 0.0);
    }

    #[test]
    fn alert_severity_orders_by_urgency() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }

    #[test]
    fn arm_error_display() {
        let err = ArmError::HardwareFault {
            component: "brake".to_string(),
            details: "relay stuck".to_string(),
        };
        assert!(err.to_string().contains("brake"));

        let err = ArmError::Unreachable {
            x: 1000.0,
            y: 0.0,
            z: 0.0,
            ratio: 5.0,
        };
        assert!(err.to_string().contains("unreachable"));
    }
}
