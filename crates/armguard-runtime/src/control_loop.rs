//! [`ControlLoop`] – fixed-frequency cyclic executor.
//!
//! One dedicated OS thread runs the cycle body
//! (read sensors → safety checks → send commands) at the configured
//! frequency.  The owning thread starts, stops and retunes it.
//!
//! Timing: after each cycle the remainder of the period is slept with
//! [`spin_sleep`] for low jitter.  A cycle that overruns its period is
//! logged and the next one starts immediately; there is no catch-up and no
//! frame skipping.  The cycle counter advances on every iteration,
//! overruns included.
//!
//! Cancellation is checked once at the top of each iteration, so
//! [`ControlLoop::stop`] returns at most one cycle late.
//!
//! # Example
//!
//! ```rust
//! use armguard_runtime::{ControlLoop, CycleHandler};
//!
//! struct Idle;
//! impl CycleHandler for Idle {
//!     fn read_sensors(&mut self) {}
//!     fn perform_safety_checks(&mut self) {}
//!     fn send_commands(&mut self) {}
//! }
//!
//! let mut control = ControlLoop::new(Idle);
//! control.start();
//! std::thread::sleep(std::time::Duration::from_millis(5));
//! control.stop();
//! assert!(control.cycle_count() > 0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use spin_sleep::SpinSleeper;
use tracing::{debug, error, info, warn};

pub const DEFAULT_FREQUENCY_HZ: u32 = 1000;
pub const MIN_FREQUENCY_HZ: u32 = 1;
pub const MAX_FREQUENCY_HZ: u32 = 10_000;

const PROGRESS_LOG_INTERVAL: u64 = 1000;
const THREAD_NAME: &str = "armguard-control";

// ────────────────────────────────────────────────────────────────────────────
// Cycle body
// ────────────────────────────────────────────────────────────────────────────

/// The three steps of one control cycle, called in order on the loop thread.
pub trait CycleHandler: Send {
    fn read_sensors(&mut self);
    fn perform_safety_checks(&mut self);
    fn send_commands(&mut self);
}

type SharedHandler = Arc<Mutex<Box<dyn CycleHandler>>>;

struct LoopState {
    running: AtomicBool,
    frequency_hz: AtomicU32,
    cycle_count: AtomicU64,
    overrun_count: AtomicU64,
}

impl LoopState {
    fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frequency_hz.load(Ordering::Relaxed)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ────────────────────────────────────────────────────────────────────────────

/// NOT_RUNNING until [`start`][Self::start], RUNNING until
/// [`stop`][Self::stop].  Dropping a running loop stops it.
pub struct ControlLoop {
    handler: SharedHandler,
    state: Arc<LoopState>,
    worker: Option<JoinHandle<()>>,
}

impl ControlLoop {
    /// A stopped loop at [`DEFAULT_FREQUENCY_HZ`].
    pub fn new(handler: impl CycleHandler + 'static) -> Self {
        Self {
            handler: Arc::new(Mutex::new(Box::new(handler))),
            state: Arc::new(LoopState {
                running: AtomicBool::new(false),
                frequency_hz: AtomicU32::new(DEFAULT_FREQUENCY_HZ),
                cycle_count: AtomicU64::new(0),
                overrun_count: AtomicU64::new(0),
            }),
            worker: None,
        }
    }

    /// Spawn the loop thread.  A no-op, with a warning, when already running.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("control loop already running");
            return;
        }
        // A stop issued from the loop thread leaves its worker to be reaped.
        if let Some(previous) = self.worker.take() {
            Self::join(previous);
        }
        self.state.running.store(true, Ordering::Release);

        let state = Arc::clone(&self.state);
        let handler = Arc::clone(&self.handler);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(&state, &handler));
        match spawned {
            Ok(worker) => {
                info!(frequency_hz = self.frequency(), "control loop started");
                self.worker = Some(worker);
            }
            Err(e) => {
                self.state.running.store(false, Ordering::Release);
                error!(error = %e, "failed to spawn control loop thread");
            }
        }
    }

    /// Signal the loop to exit and block until its thread has terminated.
    ///
    /// Called from the loop thread itself (e.g. from inside a cycle handler)
    /// this only signals; joining there would deadlock.
    pub fn stop(&mut self) {
        let was_running = self.state.running.swap(false, Ordering::AcqRel);
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            warn!("stop() called from the control thread; signalling only");
            self.worker = Some(worker);
            return;
        }
        Self::join(worker);
        if was_running {
            info!(
                cycles = self.cycle_count(),
                overruns = self.overrun_count(),
                "control loop stopped"
            );
        }
    }

    fn join(worker: JoinHandle<()>) {
        if worker.join().is_err() {
            error!("control loop thread panicked");
        }
    }

    /// Accept 1–10000 Hz.  Anything else is rejected with a warning and the
    /// current frequency is kept.  Takes effect from the next cycle.
    pub fn set_control_frequency(&self, frequency_hz: u32) -> bool {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz) {
            warn!(
                requested_hz = frequency_hz,
                current_hz = self.frequency(),
                "control frequency rejected"
            );
            return false;
        }
        self.state.frequency_hz.store(frequency_hz, Ordering::Relaxed);
        info!(frequency_hz, "control frequency set");
        true
    }

    pub fn frequency(&self) -> u32 {
        self.state.frequency_hz.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn cycle_count(&self) -> u64 {
        self.state.cycle_count.load(Ordering::Acquire)
    }

    /// Cycles that took longer than their period.
    pub fn overrun_count(&self) -> u64 {
        self.state.overrun_count.load(Ordering::Acquire)
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(state: &LoopState, handler: &Mutex<Box<dyn CycleHandler>>) {
    let sleeper = SpinSleeper::default();
    while state.running.load(Ordering::Acquire) {
        let period = state.period();
        let started = Instant::now();
        {
            let mut h = handler.lock();
            h.read_sensors();
            h.perform_safety_checks();
            h.send_commands();
        }
        let elapsed = started.elapsed();
        let cycle = state.cycle_count.fetch_add(1, Ordering::AcqRel) + 1;

        if elapsed < period {
            sleeper.sleep(period - elapsed);
        } else {
            state.overrun_count.fetch_add(1, Ordering::AcqRel);
            warn!(
                cycle,
                elapsed_us = elapsed.as_micros() as u64,
                period_us = period.as_micros() as u64,
                "control cycle timing violation"
            );
        }

        if cycle % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                cycle,
                overruns = state.overrun_count.load(Ordering::Relaxed),
                "control loop progress"
            );
        }
    }
}
