//! Shared handles between the control cycle and the rest of the process.
//!
//! - [`TelemetryBoard`] – latest [`TelemetrySnapshot`], written once per
//!   cycle, read by publishers at their own rate.
//! - [`TargetSlot`] – the next approved joint target awaiting dispatch.

use std::sync::Arc;
use std::time::Instant;

use armguard_geometry::Vec3;
use armguard_kernel::MotionGate;
use armguard_types::{ArmError, JointConfiguration, TelemetrySnapshot};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

// ────────────────────────────────────────────────────────────────────────────
// TelemetryBoard
// ────────────────────────────────────────────────────────────────────────────

struct BoardState {
    snapshot: TelemetrySnapshot,
    phase_started: Instant,
}

/// Latest robot state snapshot.  Clones share the same board.
#[derive(Clone)]
pub struct TelemetryBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl Default for TelemetryBoard {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BoardState {
                snapshot: TelemetrySnapshot {
                    safety_ok: true,
                    safety_score: 100.0,
                    procedure_phase: "IDLE".to_string(),
                    ..TelemetrySnapshot::default()
                },
                phase_started: Instant::now(),
            })),
        }
    }
}

impl TelemetryBoard {
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.read().snapshot.clone()
    }

    /// Start a new procedure phase; its duration restarts from zero.
    pub fn set_procedure_phase(&self, phase: impl Into<String>) {
        let phase = phase.into();
        let mut state = self.inner.write();
        info!(from = %state.snapshot.procedure_phase, to = %phase, "procedure phase changed");
        state.snapshot.procedure_phase = phase;
        state.snapshot.procedure_duration = 0.0;
        state.phase_started = Instant::now();
    }

    /// Apply `update` under the write lock.  The procedure duration is
    /// refreshed first.
    pub(crate) fn update(&self, update: impl FnOnce(&mut TelemetrySnapshot)) {
        let mut state = self.inner.write();
        state.snapshot.procedure_duration = state.phase_started.elapsed().as_secs_f64();
        update(&mut state.snapshot);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TargetSlot
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct PendingTarget {
    solution: JointConfiguration,
    /// Monitor engagement count read before the target was vetted.
    engagements: u64,
}

/// One pending joint target.  A newer submission replaces an older one that
/// has not been dispatched yet.  A target approved before an emergency stop
/// is never dispatched after it, even once the stop has been resumed.
#[derive(Clone, Default)]
pub struct TargetSlot {
    pending: Arc<Mutex<Option<PendingTarget>>>,
}

impl TargetSlot {
    /// Vet `target` through `gate` and queue the solution for dispatch.
    ///
    /// # Errors
    ///
    /// Whatever [`MotionGate::authorize`] rejects the target with; the slot
    /// is left untouched.
    pub fn submit(
        &self,
        gate: &MotionGate,
        target: &Vec3,
        obstacles: &[Vec3],
    ) -> Result<JointConfiguration, ArmError> {
        let engagements = gate.monitor().engagement_count();
        let solution = gate.authorize(target, obstacles)?;
        *self.pending.lock() = Some(PendingTarget { solution, engagements });
        Ok(solution)
    }

    /// Take the pending target unless an emergency stop has been engaged
    /// since it was approved.  A stale target is dropped.
    pub(crate) fn take_current(&self, engagements: u64) -> Option<JointConfiguration> {
        let pending = self.pending.lock().take()?;
        if pending.engagements != engagements {
            warn!(
                approved_at = pending.engagements,
                now = engagements,
                "discarding target approved before an emergency stop"
            );
            return None;
        }
        Some(pending.solution)
    }

    /// Drop the pending target, if any.
    pub fn clear(&self) {
        self.pending.lock().take();
    }

    pub fn pending(&self) -> Option<JointConfiguration> {
        self.pending.lock().map(|p| p.solution)
    }
}
