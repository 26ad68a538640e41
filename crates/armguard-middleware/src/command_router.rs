//! [`CommandRouter`] – maps decoded operator commands onto the monitor's
//! state-machine and reconfiguration entry points.
//!
//! | Command | Effect |
//! |---|---|
//! | `EMERGENCY_STOP` | [`SafetyMonitor::trigger_emergency_stop`] with the command's reason |
//! | `RESUME_OPERATION` | [`SafetyMonitor::resume_normal_operation`] |
//! | `FORCE_LIMIT_ADJUST` | [`SafetyMonitor::adjust_force_limit`] with the command's value |
//! | `STATUS_CHECK` | read-only [`MonitorStatus`] |
//! | anything else | logged and ignored |

use std::sync::Arc;

use armguard_kernel::SafetyMonitor;
use armguard_types::{ArmError, CommandKind, ControlCommand};
use tracing::{info, warn};

use crate::bus::CommandQueue;

/// Reason used when an emergency-stop command carries none.
const OPERATOR_STOP_REASON: &str = "OPERATOR_COMMAND";

/// Read-only summary returned for `STATUS_CHECK`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub emergency_engaged: bool,
    pub last_reason: String,
    pub safety_score: f64,
    pub event_count: usize,
}

/// What routing a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    EmergencyStopEngaged,
    Resumed,
    ForceLimitAdjusted(f64),
    /// The monitor refused the command.
    Rejected(ArmError),
    Status(MonitorStatus),
    /// Unrecognised command type.
    Ignored(String),
}

pub struct CommandRouter {
    monitor: Arc<SafetyMonitor>,
}

impl CommandRouter {
    pub fn new(monitor: Arc<SafetyMonitor>) -> Self {
        Self { monitor }
    }

    pub fn route(&self, command: &ControlCommand) -> CommandOutcome {
        match command.kind() {
            CommandKind::EmergencyStop => {
                let reason = if command.reason.is_empty() {
                    OPERATOR_STOP_REASON
                } else {
                    command.reason.as_str()
                };
                info!(reason, "emergency stop commanded");
                self.monitor.trigger_emergency_stop(reason);
                CommandOutcome::EmergencyStopEngaged
            }
            CommandKind::ResumeOperation => {
                info!("resume commanded");
                self.monitor.resume_normal_operation();
                CommandOutcome::Resumed
            }
            CommandKind::ForceLimitAdjust => match self.monitor.adjust_force_limit(command.value) {
                Ok(()) => CommandOutcome::ForceLimitAdjusted(command.value),
                Err(e) => {
                    warn!(value = command.value, error = %e, "force limit adjustment rejected");
                    CommandOutcome::Rejected(e)
                }
            },
            CommandKind::StatusCheck => CommandOutcome::Status(self.status()),
            CommandKind::Unknown(kind) => {
                warn!(command_type = %kind, "unknown command type ignored");
                CommandOutcome::Ignored(kind)
            }
        }
    }

    /// Route every command currently queued on `commands`, in order.
    pub fn drain(&self, commands: &mut CommandQueue) -> Vec<CommandOutcome> {
        commands.drain().iter().map(|c| self.route(c)).collect()
    }

    pub fn status(&self) -> MonitorStatus {
        let emergency = self.monitor.emergency_state();
        MonitorStatus {
            emergency_engaged: emergency.engaged,
            last_reason: emergency.last_reason,
            safety_score: self.monitor.calculate_overall_safety_score(),
            event_count: self.monitor.event_count(),
        }
    }
}
