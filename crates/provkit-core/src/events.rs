//! Event system for UI decoupling.
//!
//! The session worker never touches UI state. Everything an operator needs
//! to see is emitted as an immutable `SessionEvent`; CLI/TUI/GUI front-ends
//! subscribe through a `SessionObserver`.

use std::fmt;
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use std::time::Duration;

use thiserror::Error;

use crate::hid::Hid;
use crate::protocol::{EncodeError, ErrorCode, FrameError, ResponseError};
use crate::transport::TransportError;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Phases of one provisioning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    Connecting,
    Requesting,
    Validating,
    Recording,
    Provisioning,
    Cooldown,
    Stopped,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "Idle"),
            CyclePhase::Connecting => write!(f, "Connecting"),
            CyclePhase::Requesting => write!(f, "Requesting"),
            CyclePhase::Validating => write!(f, "Validating"),
            CyclePhase::Recording => write!(f, "Recording"),
            CyclePhase::Provisioning => write!(f, "Provisioning"),
            CyclePhase::Cooldown => write!(f, "Cooldown"),
            CyclePhase::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Why a cycle did not reach its goal.
///
/// Faults (`Transport`, `Frame`, `Encode`) are kept apart from device
/// answers (`Rejected`) so callers can match instead of parsing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleFailure {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("{0}")]
    Rejected(#[from] ResponseError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CycleFailure {
    /// Device status code, when the device reported one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            CycleFailure::Rejected(e) => e.error_code(),
            _ => None,
        }
    }
}

impl From<TransportError> for CycleFailure {
    fn from(e: TransportError) -> Self {
        CycleFailure::Transport(e.to_string())
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New HID recorded or every component provisioned.
    Completed(Hid),
    /// HID already completed this run.
    Duplicate(Hid),
    /// No license known for the device.
    NoLicense(Hid),
    /// Some components failed; the device stays eligible.
    Incomplete { hid: Hid, failed: usize },
    Failed(CycleFailure),
}

impl CycleOutcome {
    /// Whether the cycle moves the run forward.
    pub fn is_progress(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }

    /// Whether the cycle counts against the no-progress limit.
    pub fn counts_as_no_progress(&self) -> bool {
        !matches!(self, CycleOutcome::Completed(_) | CycleOutcome::NoLicense(_))
    }
}

/// Terminal reason of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Cancelled from outside the worker.
    User,
    /// Too many cycles without progress.
    RetryLimit { cycles: u32 },
    /// Too long since the last progress.
    InactivityTimeout { idle: Duration },
    /// The worker panicked.
    Crashed(String),
}

impl StopReason {
    pub fn kind(&self) -> &'static str {
        match self {
            StopReason::User => "user",
            StopReason::RetryLimit { .. } => "retry_limit",
            StopReason::InactivityTimeout { .. } => "inactivity_timeout",
            StopReason::Crashed(_) => "crashed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::User => write!(f, "stopped by user"),
            StopReason::RetryLimit { cycles } => {
                write!(f, "{} cycles without progress", cycles)
            }
            StopReason::InactivityTimeout { idle } => {
                write!(f, "no progress for {}s", idle.as_secs())
            }
            StopReason::Crashed(msg) => write!(f, "worker crashed: {}", msg),
        }
    }
}

/// Read-only view of the session counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: CyclePhase,
    pub cycles: u64,
    pub completed: usize,
    pub duplicates: u64,
    pub failed_cycles: u64,
    pub licenses_written: u64,
    pub licenses_failed: u64,
    pub no_progress: u32,
    pub since_progress: Duration,
    pub last_hid: Option<Hid>,
}

/// Events emitted by the provisioning session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new cycle is opening the link.
    Connecting { cycle: u64, endpoint: String },
    ConnectFailed { error: String },
    Connected { endpoint: String },
    PhaseChanged { from: CyclePhase, to: CyclePhase },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// Raw bytes on the link.
    Packet {
        direction: PacketDirection,
        length: usize,
        data: Option<Vec<u8>>,
    },
    /// A valid HID not yet completed this run. In collect mode it has been
    /// recorded; in provision mode the directory lookup follows.
    HidSuccess { hid: Hid },
    /// The device was already handled this run; swap it.
    HidDuplicate { hid: Hid },
    HidFail { failure: CycleFailure },
    NoLicense { hid: Hid },
    LicenseComponentResult {
        hid: Hid,
        component_id: u16,
        result: Result<(), CycleFailure>,
    },
    /// Every component of the device was written.
    DeviceProvisioned { hid: Hid, components: usize },
    /// Some components failed; `skipped` were not attempted this cycle.
    DeviceIncomplete {
        hid: Hid,
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
    CycleFinished {
        outcome: CycleOutcome,
        snapshot: SessionSnapshot,
    },
    /// Terminal event of a run.
    Stopped {
        reason: StopReason,
        snapshot: Option<SessionSnapshot>,
    },
}

impl SessionEvent {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Connecting { .. } => "connecting",
            SessionEvent::ConnectFailed { .. } => "connect_failed",
            SessionEvent::Connected { .. } => "connected",
            SessionEvent::PhaseChanged { .. } => "phase_changed",
            SessionEvent::Log { .. } => "log",
            SessionEvent::Packet { .. } => "packet",
            SessionEvent::HidSuccess { .. } => "hid_success",
            SessionEvent::HidDuplicate { .. } => "hid_duplicate",
            SessionEvent::HidFail { .. } => "hid_fail",
            SessionEvent::NoLicense { .. } => "no_license",
            SessionEvent::LicenseComponentResult { .. } => "license_component_result",
            SessionEvent::DeviceProvisioned { .. } => "device_provisioned",
            SessionEvent::DeviceIncomplete { .. } => "device_incomplete",
            SessionEvent::CycleFinished { .. } => "cycle_finished",
            SessionEvent::Stopped { .. } => "stopped",
        }
    }
}

/// Link direction of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Host -> Device
    Rx, // Device -> Host
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving session events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait SessionObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &SessionEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Forwards every event over a channel.
///
/// A disconnected receiver is ignored; the run goes on without a listener.
pub struct ChannelObserver {
    tx: Sender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_event(&self, event: &SessionEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Buffers events in memory.
#[derive(Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Kinds of all events so far, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|e| e.iter().map(SessionEvent::kind).collect())
            .unwrap_or_default()
    }
}

impl SessionObserver for CollectingObserver {
    fn on_event(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connecting { cycle, endpoint } => {
                tracing::debug!(cycle, endpoint = %endpoint, "Connecting");
            }
            SessionEvent::ConnectFailed { error } => {
                tracing::warn!("Connect failed: {}", error);
            }
            SessionEvent::Connected { endpoint } => {
                tracing::debug!(endpoint = %endpoint, "Connected");
            }
            SessionEvent::PhaseChanged { from, to } => {
                tracing::trace!(from = %from, to = %to, "Phase changed");
            }
            SessionEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            SessionEvent::Packet {
                direction, length, ..
            } => {
                tracing::trace!(dir = %direction, len = length, "Serial packet");
            }
            SessionEvent::HidSuccess { hid } => {
                tracing::info!(hid = %hid, "HID collected");
            }
            SessionEvent::HidDuplicate { hid } => {
                tracing::warn!(hid = %hid, "Device already done this run, please swap device");
            }
            SessionEvent::HidFail { failure } => match failure.error_code() {
                Some(code) => tracing::warn!(code = %code, "HID request failed: {}", failure),
                None => tracing::warn!("HID request failed: {}", failure),
            },
            SessionEvent::NoLicense { hid } => {
                tracing::warn!(hid = %hid, "No license found for device");
            }
            SessionEvent::LicenseComponentResult {
                hid,
                component_id,
                result,
            } => match result {
                Ok(()) => tracing::info!(
                    hid = %hid,
                    component = %format!("{:04X}", component_id),
                    "License written"
                ),
                Err(e) => tracing::error!(
                    hid = %hid,
                    component = %format!("{:04X}", component_id),
                    "License write failed: {}",
                    e
                ),
            },
            SessionEvent::DeviceProvisioned { hid, components } => {
                tracing::info!(hid = %hid, components, "Device provisioned");
            }
            SessionEvent::DeviceIncomplete {
                hid,
                succeeded,
                failed,
                skipped,
            } => {
                tracing::warn!(hid = %hid, succeeded, failed, skipped, "Device partially provisioned");
            }
            SessionEvent::CycleFinished { snapshot, .. } => {
                tracing::debug!(
                    cycles = snapshot.cycles,
                    completed = snapshot.completed,
                    no_progress = snapshot.no_progress,
                    "Cycle finished"
                );
            }
            SessionEvent::Stopped { reason, snapshot } => {
                let completed = snapshot.as_ref().map(|s| s.completed).unwrap_or(0);
                match reason {
                    StopReason::User => tracing::info!(completed, "Session stopped: {}", reason),
                    StopReason::Crashed(_) => tracing::error!(completed, "Session stopped: {}", reason),
                    _ => tracing::warn!(completed, "Session stopped: {}", reason),
                }
            }
        }
    }
}
