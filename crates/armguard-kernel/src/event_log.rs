//! Bounded, auditable safety event log.
//!
//! Events are immutable once recorded and retained in arrival order until the
//! log exceeds its capacity, at which point the oldest event is evicted.
//! Nothing else ever drops an event.
//!
//! Severity is a two-level scheme driven by an explicit table on
//! [`SafetyEventKind`]: the emergency class scores 5, everything else 3.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const EMERGENCY_SEVERITY: u8 = 5;
const STANDARD_SEVERITY: u8 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Event kinds
// ────────────────────────────────────────────────────────────────────────────

/// Every event type the monitor can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyEventKind {
    InvalidJointData,
    JointSafetyViolation,
    InvalidForceData,
    ExcessiveForce,
    ForceReductionApplied,
    RapidForceChange,
    InvalidVelocityData,
    ExcessiveVelocity,
    CollisionImminent,
    EmergencyStopTriggered,
    HardwareStopFailed,
    NormalOperationResumed,
    ForceLimitAdjusted,
    LimitsReconfigured,
}

impl SafetyEventKind {
    pub const ALL: [SafetyEventKind; 14] = [
        Self::InvalidJointData,
        Self::JointSafetyViolation,
        Self::InvalidForceData,
        Self::ExcessiveForce,
        Self::ForceReductionApplied,
        Self::RapidForceChange,
        Self::InvalidVelocityData,
        Self::ExcessiveVelocity,
        Self::CollisionImminent,
        Self::EmergencyStopTriggered,
        Self::HardwareStopFailed,
        Self::NormalOperationResumed,
        Self::ForceLimitAdjusted,
        Self::LimitsReconfigured,
    ];

    /// Audit label, e.g. `"EXCESSIVE_FORCE"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidJointData => "INVALID_JOINT_DATA",
            Self::JointSafetyViolation => "JOINT_SAFETY_VIOLATION",
            Self::InvalidForceData => "INVALID_FORCE_DATA",
            Self::ExcessiveForce => "EXCESSIVE_FORCE",
            Self::ForceReductionApplied => "FORCE_REDUCTION_APPLIED",
            Self::RapidForceChange => "RAPID_FORCE_CHANGE",
            Self::InvalidVelocityData => "INVALID_VELOCITY_DATA",
            Self::ExcessiveVelocity => "EXCESSIVE_VELOCITY",
            Self::CollisionImminent => "COLLISION_IMMINENT",
            Self::EmergencyStopTriggered => "EMERGENCY_STOP_TRIGGERED",
            Self::HardwareStopFailed => "HARDWARE_STOP_FAILED",
            Self::NormalOperationResumed => "NORMAL_OPERATION_RESUMED",
            Self::ForceLimitAdjusted => "FORCE_LIMIT_ADJUSTED",
            Self::LimitsReconfigured => "LIMITS_RECONFIGURED",
        }
    }

    pub fn is_emergency_class(&self) -> bool {
        matches!(self, Self::EmergencyStopTriggered | Self::HardwareStopFailed)
    }

    /// 1–5, 5 being most critical.
    pub fn severity(&self) -> u8 {
        if self.is_emergency_class() {
            EMERGENCY_SEVERITY
        } else {
            STANDARD_SEVERITY
        }
    }
}

impl std::fmt::Display for SafetyEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Events
// ────────────────────────────────────────────────────────────────────────────

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyEvent {
    /// Strictly increasing across the life of a log, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: SafetyEventKind,
    /// The offending reading, delta, count or distance; 0 when not applicable.
    pub value: f64,
    /// Monitor mode at the moment of recording, e.g. `"OPERATIONAL"`.
    pub robot_state: String,
    pub severity: u8,
}

// ────────────────────────────────────────────────────────────────────────────
// EventLog
// ────────────────────────────────────────────────────────────────────────────

/// Fixed-capacity FIFO of [`SafetyEvent`]s.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<SafetyEvent>,
    capacity: usize,
    next_sequence: u64,
}

impl EventLog {
    /// Create an empty log.  A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 1,
        }
    }

    /// Record an event and return its sequence number.  Evicts the oldest
    /// event when the log grows past capacity.
    pub fn push(&mut self, kind: SafetyEventKind, value: f64, robot_state: &str) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push_back(SafetyEvent {
            sequence,
            timestamp: Utc::now(),
            kind,
            value,
            robot_state: robot_state.to_string(),
            severity: kind.severity(),
        });
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
        sequence
    }

    /// The `count` oldest resident events, front of the queue first.
    pub fn oldest(&self, count: usize) -> impl Iterator<Item = &SafetyEvent> {
        self.events.iter().take(count)
    }

    /// Every resident event with a sequence number above `sequence`.
    pub fn since(&self, sequence: u64) -> Vec<SafetyEvent> {
        self.events
            .iter()
            .filter(|e| e.sequence > sequence)
            .cloned()
            .collect()
    }

    /// Change capacity, evicting from the front if the log is now over it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
