//! [`AlertFeed`] – turns safety events into operator alerts.
//!
//! The feed keeps a cursor into the monitor's event log.  Each
//! [`poll`][AlertFeed::poll] converts every event logged since the previous
//! poll into one [`SafetyAlert`], using a fixed table from event kind to
//! originating component and recommended action.  Events evicted from the
//! log before they were polled are not recovered.

use std::sync::Arc;

use armguard_kernel::{SafetyEvent, SafetyEventKind, SafetyMonitor};
use armguard_types::{AlertSeverity, SafetyAlert};
use uuid::Uuid;

use crate::bus::SafetyBus;

/// Originating component and recommended action for each event kind.
fn routing(kind: SafetyEventKind) -> (&'static str, &'static str) {
    use SafetyEventKind::*;
    match kind {
        InvalidJointData => ("joint_monitor", "Check joint encoder data stream"),
        JointSafetyViolation => (
            "joint_monitor",
            "Verify joint positions and inspect encoders before resuming",
        ),
        InvalidForceData => ("force_monitor", "Check force sensor data stream"),
        ExcessiveForce => ("force_monitor", "Reduce applied force immediately"),
        ForceReductionApplied => ("force_monitor", "Confirm force has dropped below limit"),
        RapidForceChange => ("force_monitor", "Check for sudden tissue contact or instrument slip"),
        InvalidVelocityData => ("motion_controller", "Check velocity feedback stream"),
        ExcessiveVelocity => ("motion_controller", "Reduce commanded velocity"),
        CollisionImminent => ("collision_detector", "Retract instrument from obstacle"),
        EmergencyStopTriggered => ("safety_system", "Assess situation before resuming operation"),
        HardwareStopFailed => (
            "safety_system",
            "Hardware stop unconfirmed: use manual stop and inspect stop line",
        ),
        NormalOperationResumed => ("safety_system", "None"),
        ForceLimitAdjusted => ("force_monitor", "Confirm new force limit suits procedure phase"),
        LimitsReconfigured => ("configuration", "Review new safety limits"),
    }
}

fn severity(event: &SafetyEvent) -> AlertSeverity {
    if event.severity >= 5 {
        AlertSeverity::Critical
    } else if event.kind == SafetyEventKind::NormalOperationResumed {
        AlertSeverity::Info
    } else {
        AlertSeverity::Warning
    }
}

/// Build the alert for a single event.
pub fn alert_for(event: &SafetyEvent) -> SafetyAlert {
    let (component, action) = routing(event.kind);
    SafetyAlert {
        alert_id: Uuid::new_v4(),
        timestamp: event.timestamp,
        severity: severity(event),
        message: format!("{} (value {}, state {})", event.kind, event.value, event.robot_state),
        component: component.to_string(),
        recommended_action: action.to_string(),
    }
}

/// Cursor-based alert source over a monitor's event log.
pub struct AlertFeed {
    monitor: Arc<SafetyMonitor>,
    cursor: u64,
}

impl AlertFeed {
    /// Start from the beginning of the log.
    pub fn new(monitor: Arc<SafetyMonitor>) -> Self {
        Self { monitor, cursor: 0 }
    }

    /// Alerts for every event logged since the last poll, oldest first.
    pub fn poll(&mut self) -> Vec<SafetyAlert> {
        let events = self.monitor.events_since(self.cursor);
        if let Some(last) = events.last() {
            self.cursor = last.sequence;
        }
        events.iter().map(alert_for).collect()
    }

    /// Poll and publish each alert on `bus`.  Returns the number of alerts.
    pub fn publish(&mut self, bus: &SafetyBus) -> usize {
        let alerts = self.poll();
        let count = alerts.len();
        for alert in alerts {
            bus.publish_alert(alert);
        }
        count
    }

    /// Sequence number of the last event turned into an alert.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_returns_only_new_events() {
        let monitor = Arc::new(SafetyMonitor::default());
        let mut feed = AlertFeed::new(Arc::clone(&monitor));
        assert!(feed.poll().is_empty());

        monitor.validate_force_readings(&[20.0, 5.0, 5.0]);
        let alerts = feed.poll();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1].component, "force_monitor");
        assert_eq!(alerts[1].recommended_action, "Reduce applied force immediately");
        assert!(alerts[1].message.starts_with("EXCESSIVE_FORCE"));
        assert!(feed.poll().is_empty());
        assert_eq!(feed.cursor(), 2);
    }

    #[test]
    fn emergency_class_is_critical() {
        let monitor = Arc::new(SafetyMonitor::default());
        let mut feed = AlertFeed::new(Arc::clone(&monitor));
        monitor.trigger_emergency_stop("operator");
        monitor.validate_velocity(&[70.0, 0.0, 0.0]);

        let alerts = feed.poll();
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].component, "safety_system");
        assert_eq!(alerts[1].severity, AlertSeverity::Warning);
        assert_ne!(alerts[0].alert_id, alerts[1].alert_id);
    }

    #[test]
    fn resume_is_informational() {
        let monitor = Arc::new(SafetyMonitor::default());
        let mut feed = AlertFeed::new(Arc::clone(&monitor));
        monitor.trigger_emergency_stop("operator");
        monitor.resume_normal_operation();

        let severities: Vec<_> = feed.poll().iter().map(|a| a.severity).collect();
        assert_eq!(severities, vec![AlertSeverity::Critical, AlertSeverity::Info]);
    }

    #[test]
    fn every_kind_has_a_route() {
        for kind in SafetyEventKind::ALL {
            let (component, action) = routing(kind);
            assert!(!component.is_empty() && !action.is_empty(), "{kind}");
        }
    }

    #[test]
    fn publish_forwards_alerts_to_bus() {
        let monitor = Arc::new(SafetyMonitor::default());
        let bus = SafetyBus::default();
        let mut rx = bus.subscribe_alerts();
        let mut feed = AlertFeed::new(Arc::clone(&monitor));

        monitor.check_collision_risk(&[0.0, 0.0, 0.0], &[[0.5, 0.0, 0.0]]);
        assert_eq!(feed.publish(&bus), 1);
        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.component, "collision_detector");
    }
}
