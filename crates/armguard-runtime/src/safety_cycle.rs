//! [`SafetyCycle`] – the production [`CycleHandler`].
//!
//! Each cycle:
//!
//! 1. **read_sensors** – applies any operator commands waiting on the bus,
//!    then reads one [`SensorFrame`].
//! 2. **perform_safety_checks** – joint, force, velocity and proximity
//!    checks against the [`SafetyMonitor`] and [`ProximityGuard`]; escalates
//!    to an emergency stop after too many failed cycles in a row; refreshes
//!    the [`TelemetryBoard`].
//! 3. **send_commands** – while the interlock is engaged the arm is told to
//!    hold and any pending target is discarded; otherwise the pending target,
//!    if any, is dispatched.  Snapshot and new alerts are published.
//!
//! A failed sensor read counts as a failed cycle.

use std::sync::Arc;

use armguard_geometry::{ProximityGuard, Vec3};
use armguard_hal::{JointActuator, SensorFrame, SensorSource};
use armguard_kernel::SafetyMonitor;
use armguard_middleware::{AlertFeed, CommandQueue, CommandRouter, SafetyBus};
use chrono::Utc;
use tracing::{error, warn};

use crate::board::{TargetSlot, TelemetryBoard};
use crate::config::DEFAULT_MAX_CONSECUTIVE_FAULTS;
use crate::control_loop::CycleHandler;

/// Emergency-stop reason used when failed cycles pile up.
pub const REPEATED_SAFETY_FAULTS: &str = "REPEATED_SAFETY_FAULTS";

struct BusLink {
    bus: SafetyBus,
    /// `None` when another consumer already took the bus's command queue.
    commands: Option<CommandQueue>,
    router: CommandRouter,
    alerts: AlertFeed,
}

pub struct SafetyCycle {
    sensor: Box<dyn SensorSource>,
    actuator: Box<dyn JointActuator>,
    monitor: Arc<SafetyMonitor>,
    guard: ProximityGuard,
    targets: TargetSlot,
    board: TelemetryBoard,
    link: Option<BusLink>,

    frame: Option<SensorFrame>,
    consecutive_faults: u32,
    max_consecutive_faults: u32,
    cycles: u64,
}

impl SafetyCycle {
    pub fn new(
        sensor: impl SensorSource + 'static,
        actuator: impl JointActuator + 'static,
        monitor: Arc<SafetyMonitor>,
        guard: ProximityGuard,
    ) -> Self {
        Self {
            sensor: Box::new(sensor),
            actuator: Box::new(actuator),
            monitor,
            guard,
            targets: TargetSlot::default(),
            board: TelemetryBoard::default(),
            link: None,
            frame: None,
            consecutive_faults: 0,
            max_consecutive_faults: DEFAULT_MAX_CONSECUTIVE_FAULTS,
            cycles: 0,
        }
    }

    /// 0 disables escalation.
    pub fn with_max_consecutive_faults(mut self, max: u32) -> Self {
        self.max_consecutive_faults = max;
        self
    }

    /// Take operator commands from `bus` and publish snapshots and alerts on
    /// it.  Commands already queued on the bus are applied on the first
    /// cycle.
    pub fn with_bus(mut self, bus: SafetyBus) -> Self {
        let commands = bus.take_command_queue();
        if commands.is_none() {
            warn!("command queue already taken; operator commands will not reach this cycle");
        }
        self.link = Some(BusLink {
            commands,
            router: CommandRouter::new(Arc::clone(&self.monitor)),
            alerts: AlertFeed::new(Arc::clone(&self.monitor)),
            bus,
        });
        self
    }

    /// Handle for queuing approved targets.
    pub fn targets(&self) -> TargetSlot {
        self.targets.clone()
    }

    /// Handle for reading snapshots and setting the procedure phase.
    pub fn board(&self) -> TelemetryBoard {
        self.board.clone()
    }

    pub fn set_procedure_phase(&self, phase: impl Into<String>) {
        self.board.set_procedure_phase(phase);
    }

    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    fn record_outcome(&mut self, ok: bool) {
        if ok {
            self.consecutive_faults = 0;
            return;
        }
        self.consecutive_faults += 1;
        if self.max_consecutive_faults > 0
            && self.consecutive_faults >= self.max_consecutive_faults
        {
            if !self.monitor.is_emergency_stop_engaged() {
                error!(
                    faults = self.consecutive_faults,
                    "repeated safety faults; engaging emergency stop"
                );
                self.monitor.trigger_emergency_stop(REPEATED_SAFETY_FAULTS);
            }
            self.consecutive_faults = 0;
        }
    }
}

impl CycleHandler for SafetyCycle {
    fn read_sensors(&mut self) {
        if let Some(link) = self.link.as_mut()
            && let Some(commands) = link.commands.as_mut()
        {
            link.router.drain(commands);
        }
        self.frame = match self.sensor.read() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(sensor = self.sensor.id(), error = %e, "sensor read failed");
                None
            }
        };
    }

    fn perform_safety_checks(&mut self) {
        self.cycles += 1;
        let Some(frame) = self.frame.take() else {
            self.record_outcome(false);
            let (engaged, score, cycles) = (
                self.monitor.is_emergency_stop_engaged(),
                self.monitor.calculate_overall_safety_score(),
                self.cycles,
            );
            self.board.update(|s| {
                s.timestamp = Some(Utc::now());
                s.safety_ok = false;
                s.emergency_stop = engaged;
                s.safety_score = score;
                s.cycle_count = cycles;
            });
            return;
        };

        let joints_ok = self.monitor.validate_joint_position(&frame.joint_positions);
        let forces_ok = self.monitor.validate_force_readings(&frame.forces);
        let velocity_ok = self.monitor.validate_velocity(&frame.instrument_velocities);

        let tip = Vec3::from(frame.instrument_tip);
        let obstacles: Vec<Vec3> = frame.obstacles.iter().copied().map(Vec3::from).collect();
        let guard_collision = self.guard.check_instrument_collision(&tip, &obstacles);
        let monitor_collision = self
            .monitor
            .check_collision_risk(&frame.instrument_tip, &frame.obstacles);
        let collision_risk = guard_collision || monitor_collision;

        let ok = joints_ok && forces_ok && velocity_ok && !collision_risk;
        self.record_outcome(ok);

        let engaged = self.monitor.is_emergency_stop_engaged();
        let score = self.monitor.calculate_overall_safety_score();
        let cycles = self.cycles;
        self.board.update(|s| {
            s.timestamp = Some(Utc::now());
            s.joint_positions = frame.joint_positions;
            s.instrument_velocities = frame.instrument_velocities;
            s.force_readings = frame.forces;
            s.safety_ok = ok;
            s.collision_risk = collision_risk;
            s.emergency_stop = engaged;
            s.safety_score = score;
            s.cycle_count = cycles;
        });
    }

    fn send_commands(&mut self) {
        if self.monitor.is_emergency_stop_engaged() {
            if self.targets.pending().is_some() {
                warn!("discarding pending target: emergency stop engaged");
                self.targets.clear();
            }
            if let Err(e) = self.actuator.hold() {
                error!(actuator = self.actuator.id(), error = %e, "hold command failed");
            }
        } else if let Some(target) = self.targets.take_current(self.monitor.engagement_count())
            && let Err(e) = self.actuator.command(&target)
        {
            error!(actuator = self.actuator.id(), error = %e, "joint command failed");
        }

        if let Some(link) = self.link.as_mut() {
            link.bus.publish_snapshot(self.board.snapshot());
            link.alerts.publish(&link.bus);
        }
    }
}
