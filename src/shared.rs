//! Shared state and messages for the concurrent parts of the client.
//!
//! The autopilot's two loops share exactly two pieces of mutable state: the
//! running flag and the bound vessel id. Everything else (vessel poses,
//! terrain) is owned by the dispatcher and reached only through the event
//! channel, so the loops can never race each other on a vessel record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Granularity of interruptible sleeps. A stop request lands within one
/// slice, not one full step delay.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// State of one autopilot session, shared between the two loops and the
/// controller that owns their join handles.
#[derive(Debug)]
pub struct SessionState {
    /// Cleared to request cooperative shutdown of both loops.
    running: AtomicBool,

    /// Id of the vessel the session is bound to. Empty while idle.
    vessel_id: RwLock<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            vessel_id: RwLock::new(String::new()),
        }
    }

    /// Bind a vessel and mark the session running.
    pub fn bind(&self, vessel_id: &str) {
        if let Ok(mut guard) = self.vessel_id.write() {
            *guard = vessel_id.to_string();
        }
        self.running.store(true, Ordering::Release);
    }

    pub fn vessel_id(&self) -> String {
        self.vessel_id
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request cooperative shutdown. Safe to call from within either loop.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `total`, waking early if the session stops. Returns `false`
/// when the stop request was observed.
pub fn sleep_interruptible(state: &SessionState, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if !state.is_running() {
            return false;
        }
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
    state.is_running()
}

/// Message types flowing through the dispatcher channel.
pub mod messages {
    use crate::chart::{Position, SectorPatch};
    use crate::compass::Heading;

    /// Everything the single-consumer dispatcher reacts to: proposed state
    /// updates from the background loops and actions from the operator.
    #[derive(Debug)]
    pub enum Event {
        /// A loop observed a new pose for a vessel.
        VesselMoved {
            vessel_id: String,
            position: Position,
            heading: Option<Heading>,
        },
        /// A loop received terrain updates.
        ChartUpdated(Vec<SectorPatch>),
        /// The autopilot session ended on its own.
        SessionStopped { reason: String },
        /// A loop hit a non-fatal failure worth surfacing.
        LoopError { message: String },
        /// An operator action.
        Action(Action),
        /// Tear down the dispatcher.
        Shutdown,
    }

    /// Operator actions, applied by the dispatcher one at a time.
    #[derive(Debug)]
    pub enum Action {
        Launch {
            name: String,
            position: Position,
            heading: Heading,
        },
        Select(String),
        Navigate(Heading),
        Radar,
        Scan,
        Route,
        Exit,
        StartAutopilot,
        StopAutopilot,
    }
}
