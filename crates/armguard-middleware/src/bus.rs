//! In-process, typed publish/subscribe bus for the safety core's three
//! boundary streams.
//!
//! The outbound lanes use [`tokio::sync::broadcast`] channels so every
//! subscriber sees every message and a slow subscriber never blocks the
//! control cycle.  The command lane is an unbounded [`tokio::sync::mpsc`]
//! queue with a single consumer: commands are never overwritten, so an
//! `EMERGENCY_STOP` cannot be pushed out by later traffic.  Publishing is
//! synchronous and needs no runtime; receivers may poll or await.
//!
//! | Lane | Payload | Direction | Delivery |
//! |---|---|---|---|
//! | telemetry | [`TelemetrySnapshot`] | core → publisher | broadcast, lossy |
//! | alerts | [`SafetyAlert`] | core → operators | broadcast, lossy |
//! | commands | [`ControlCommand`] | operators → core | queued, lossless |
//!
//! Transport (sockets, DDS, …) lives outside this crate; an adapter only has
//! to bridge these lanes.

use std::sync::Arc;

use armguard_types::{ControlCommand, SafetyAlert, TelemetrySnapshot};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

/// Messages buffered per broadcast lane before slow subscribers start
/// lagging.
const DEFAULT_CAPACITY: usize = 256;

/// Shared bus.  Clones share the same channels.
#[derive(Clone, Debug)]
pub struct SafetyBus {
    telemetry: broadcast::Sender<TelemetrySnapshot>,
    alerts: broadcast::Sender<SafetyAlert>,
    commands: mpsc::UnboundedSender<ControlCommand>,
    /// Handed out once by [`SafetyBus::take_command_queue`].
    command_queue: Arc<Mutex<Option<CommandQueue>>>,
}

impl Default for SafetyBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SafetyBus {
    /// `capacity` applies to the telemetry and alert lanes independently.
    /// The command lane is unbounded.
    pub fn new(capacity: usize) -> Self {
        let (telemetry, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        let (commands, receiver) = mpsc::unbounded_channel();
        Self {
            telemetry,
            alerts,
            commands,
            command_queue: Arc::new(Mutex::new(Some(CommandQueue { receiver }))),
        }
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    /// Returns the number of subscribers handed the snapshot.  Zero
    /// subscribers is a normal condition.
    pub fn publish_snapshot(&self, snapshot: TelemetrySnapshot) -> usize {
        self.telemetry.send(snapshot).unwrap_or(0)
    }

    pub fn publish_alert(&self, alert: SafetyAlert) -> usize {
        self.alerts.send(alert).unwrap_or(0)
    }

    /// Queue an operator command for the command router.  Commands sent
    /// before the queue is taken are kept for its consumer.  Returns `false`
    /// once the consumer has been dropped.
    pub fn send_command(&self, command: ControlCommand) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(mpsc::error::SendError(command)) => {
                warn!(
                    command_type = %command.command_type,
                    "command queue closed; command dropped"
                );
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Subscribing
    // -----------------------------------------------------------------------

    pub fn subscribe_telemetry(&self) -> BusReceiver<TelemetrySnapshot> {
        BusReceiver::new("telemetry", self.telemetry.subscribe())
    }

    pub fn subscribe_alerts(&self) -> BusReceiver<SafetyAlert> {
        BusReceiver::new("alerts", self.alerts.subscribe())
    }

    /// The single consumer end of the command lane.  `None` after the first
    /// call on any clone of this bus.
    pub fn take_command_queue(&self) -> Option<CommandQueue> {
        self.command_queue.lock().take()
    }
}

// ---------------------------------------------------------------------------
// Command queue
// ---------------------------------------------------------------------------

/// Consumer end of the command lane.  Delivers every command in send order.
#[derive(Debug)]
pub struct CommandQueue {
    receiver: mpsc::UnboundedReceiver<ControlCommand>,
}

impl CommandQueue {
    /// Next queued command, or `None` when nothing is waiting or every bus
    /// handle is gone.
    pub fn try_recv(&mut self) -> Option<ControlCommand> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next command.  `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<ControlCommand> {
        self.receiver.recv().await
    }

    /// Everything currently queued.
    pub fn drain(&mut self) -> Vec<ControlCommand> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Receiver bound to one broadcast lane.  Lag is logged and skipped rather
/// than surfaced, so callers only ever see messages or the end of the stream.
pub struct BusReceiver<T> {
    lane: &'static str,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> BusReceiver<T> {
    fn new(lane: &'static str, receiver: broadcast::Receiver<T>) -> Self {
        Self { lane, receiver }
    }

    /// Next buffered message, or `None` when nothing is waiting or the bus
    /// has shut down.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => return Some(msg),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(lane = self.lane, skipped, "bus subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next message.  `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(lane = self.lane, skipped, "bus subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Everything currently buffered.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn lane(&self) -> &'static str {
        self.lane
    }
}
