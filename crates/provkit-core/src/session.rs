//! Provisioning session - high-level orchestrator for batch runs.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cancel::CancelToken;
use crate::directory::Directory;
use crate::events::{
    CycleFailure, CycleOutcome, CyclePhase, PacketDirection, SessionEvent, SessionObserver,
    SessionSnapshot, StopReason, TracingObserver,
};
use crate::hid::Hid;
use crate::protocol::{
    Frame, build_hid_request, build_license_clean_request, validate_clean_response,
    validate_hid_response,
};
use crate::recorder::{HidRecorder, NullRecorder};
use crate::state::{CycleContext, CycleTask, SessionState, StopLimits, run_cycle};
use crate::transport::{Connector, ReadPolicy, RetryPolicy, Transport, TransportError};

/// Configuration for a provisioning session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cycles without progress before the run stops.
    pub max_no_progress: u32,
    /// Seconds without progress before the run stops.
    pub inactivity_timeout_secs: u64,
    /// Pause after a cycle that reached a device decision.
    pub cooldown_ms: u64,
    /// Pause after a failed connect or cycle.
    pub failure_pause_ms: u64,
    /// Pause after a duplicate device, giving the operator time to swap.
    pub duplicate_cooldown_ms: u64,
    pub read_polls: u32,
    pub read_poll_interval_ms: u64,
    pub open_retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_no_progress: 5,
            inactivity_timeout_secs: 30,
            cooldown_ms: 3000,
            failure_pause_ms: 1000,
            duplicate_cooldown_ms: 3000,
            read_polls: 20,
            read_poll_interval_ms: 100,
            open_retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn limits(&self) -> StopLimits {
        StopLimits {
            max_no_progress: self.max_no_progress,
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
        }
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            polls: self.read_polls,
            interval: Duration::from_millis(self.read_poll_interval_ms),
        }
    }

    /// Pause before the next connect.
    pub fn cooldown_for(&self, outcome: &CycleOutcome) -> Duration {
        let ms = match outcome {
            CycleOutcome::Duplicate(_) => self.duplicate_cooldown_ms,
            CycleOutcome::Failed(_) => self.failure_pause_ms,
            _ => self.cooldown_ms,
        };
        Duration::from_millis(ms)
    }
}

/// What a run does with each device.
#[derive(Debug, Clone)]
pub enum SessionMode {
    /// Read and record HIDs.
    CollectHid,
    /// Write the licenses the directory holds for each device.
    ProvisionLicense(Arc<Directory>),
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            SessionMode::CollectHid => "collect",
            SessionMode::ProvisionLicense(_) => "provision",
        }
    }
}

/// Provisioning session - drives connect/request/act/disconnect cycles
/// until cancelled or a hard stop triggers.
pub struct ProvisionSession<C: Connector, O: SessionObserver> {
    connector: C,
    mode: SessionMode,
    config: SessionConfig,
    observer: Arc<O>,
    recorder: Box<dyn HidRecorder>,
    cancel: CancelToken,
    state: SessionState,
}

impl<C: Connector> ProvisionSession<C, TracingObserver> {
    /// Create a new session with default tracing observer.
    pub fn new(connector: C, mode: SessionMode, config: SessionConfig) -> Self {
        Self::with_observer(connector, mode, config, Arc::new(TracingObserver))
    }
}

impl<C: Connector, O: SessionObserver> ProvisionSession<C, O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(connector: C, mode: SessionMode, config: SessionConfig, observer: Arc<O>) -> Self {
        Self {
            connector,
            mode,
            config,
            observer,
            recorder: Box::new(NullRecorder),
            cancel: CancelToken::new(),
            state: SessionState::new(),
        }
    }

    /// Storage for HIDs collected in `CollectHid` mode.
    pub fn with_recorder(mut self, recorder: impl HidRecorder + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    fn emit(&self, event: SessionEvent) {
        self.observer.on_event(&event);
    }

    fn goto(&mut self, phase: CyclePhase) {
        let from = self.state.goto(phase);
        if from != phase {
            self.emit(SessionEvent::PhaseChanged { from, to: phase });
        }
    }

    /// Run cycles until a hard stop. Blocks the calling thread.
    #[instrument(skip(self), fields(mode = self.mode.name(), endpoint = %self.connector.endpoint()))]
    pub fn run(&mut self) -> StopReason {
        let limits = self.config.limits();
        let read_policy = self.config.read_policy();
        self.state.reset();
        info!("Session started");

        loop {
            self.goto(CyclePhase::Connecting);
            if let Some(reason) = self.state.check_hard_stop(&limits, &self.cancel) {
                return self.stop(reason);
            }

            self.emit(SessionEvent::Connecting {
                cycle: self.state.cycles + 1,
                endpoint: self.connector.endpoint(),
            });
            let mut transport = match self.connector.connect() {
                Ok(t) => t,
                Err(e) => {
                    self.emit(SessionEvent::ConnectFailed {
                        error: e.to_string(),
                    });
                    self.goto(CyclePhase::Cooldown);
                    self.cancel
                        .sleep(Duration::from_millis(self.config.failure_pause_ms));
                    continue;
                }
            };
            self.emit(SessionEvent::Connected {
                endpoint: self.connector.endpoint(),
            });

            let outcome = {
                let mut link = ObservableTransport {
                    inner: &mut transport,
                    observer: self.observer.as_ref(),
                };
                let task = match &self.mode {
                    SessionMode::CollectHid => CycleTask::Collect(self.recorder.as_mut()),
                    SessionMode::ProvisionLicense(directory) => CycleTask::Provision(directory),
                };
                let mut ctx = CycleContext {
                    transport: &mut link,
                    observer: self.observer.as_ref(),
                    state: &mut self.state,
                    read_policy,
                    cancel: &self.cancel,
                };
                run_cycle(&mut ctx, task)
            };
            transport.close();

            self.state.apply(&outcome);
            self.goto(CyclePhase::Cooldown);
            self.emit(SessionEvent::CycleFinished {
                outcome: outcome.clone(),
                snapshot: self.state.snapshot(),
            });
            self.cancel.sleep(self.config.cooldown_for(&outcome));
        }
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.goto(CyclePhase::Stopped);
        self.emit(SessionEvent::Stopped {
            reason: reason.clone(),
            snapshot: Some(self.state.snapshot()),
        });
        reason
    }
}

impl<C, O> ProvisionSession<C, O>
where
    C: Connector + 'static,
    O: SessionObserver + 'static,
{
    /// Run on a dedicated worker thread.
    ///
    /// A panic inside the worker is reported as `StopReason::Crashed`, both
    /// through the observer and from `SessionHandle::join`.
    pub fn spawn(self) -> io::Result<SessionHandle> {
        let cancel = self.cancel.clone();
        let observer = Arc::clone(&self.observer);
        let thread = thread::Builder::new()
            .name("provkit-session".into())
            .spawn(move || {
                let mut session = self;
                match panic::catch_unwind(AssertUnwindSafe(|| session.run())) {
                    Ok(reason) => reason,
                    Err(payload) => {
                        let reason = StopReason::Crashed(panic_message(payload.as_ref()));
                        observer.on_event(&SessionEvent::Stopped {
                            reason: reason.clone(),
                            snapshot: None,
                        });
                        reason
                    }
                }
            })?;
        Ok(SessionHandle { cancel, thread })
    }
}

/// Start a run on its own worker thread.
pub fn start<C, O>(
    connector: C,
    mode: SessionMode,
    config: SessionConfig,
    observer: Arc<O>,
) -> io::Result<SessionHandle>
where
    C: Connector + 'static,
    O: SessionObserver + 'static,
{
    ProvisionSession::with_observer(connector, mode, config, observer).spawn()
}

/// Owner side of a spawned session.
pub struct SessionHandle {
    cancel: CancelToken,
    thread: JoinHandle<StopReason>,
}

impl SessionHandle {
    /// Ask the worker to stop. Takes effect at the next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and return why it stopped.
    pub fn join(self) -> StopReason {
        self.thread
            .join()
            .unwrap_or_else(|payload| StopReason::Crashed(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// One-shot operations
// ============================================================================

/// Open the link, request the HID once, close. The connection test.
pub fn probe<C: Connector>(connector: &mut C, policy: &ReadPolicy) -> Result<Hid, CycleFailure> {
    let frame = one_shot(connector, &build_hid_request(), policy)?;
    Ok(validate_hid_response(&frame)?)
}

/// Erase the license of one component.
pub fn clean_license<C: Connector>(
    connector: &mut C,
    component_id: u16,
    policy: &ReadPolicy,
) -> Result<(), CycleFailure> {
    let frame = one_shot(connector, &build_license_clean_request(component_id), policy)?;
    Ok(validate_clean_response(&frame, component_id)?)
}

fn one_shot<C: Connector>(connector: &mut C, request: &[u8], policy: &ReadPolicy) -> Result<Frame, CycleFailure> {
    let mut transport = connector.connect()?;
    let result = transport
        .write(request)
        .and_then(|_| transport.read_reply(policy, &CancelToken::new()));
    transport.close();
    Ok(Frame::decode(&result?)?)
}

/// Transport wrapper that emits packet events.
struct ObservableTransport<'a, T: Transport, O: SessionObserver + ?Sized> {
    inner: &'a mut T,
    observer: &'a O,
}

impl<'a, T: Transport, O: SessionObserver + ?Sized> Transport for ObservableTransport<'a, T, O> {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let res = self.inner.write(data);
        if res.is_ok() {
            self.observer.on_event(&SessionEvent::Packet {
                direction: PacketDirection::Tx,
                length: data.len(),
                data: Some(data.iter().take(32).cloned().collect()),
            });
        }
        res
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let res = self.inner.read_available();
        if let Ok(data) = &res
            && !data.is_empty()
        {
            self.observer.on_event(&SessionEvent::Packet {
                direction: PacketDirection::Rx,
                length: data.len(),
                data: Some(data.iter().take(32).cloned().collect()),
            });
        }
        res
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;
    use crate::directory::DirectoryRow;
    use crate::events::CollectingObserver;
    use crate::protocol::{
        CMD_HID_REQUEST, CMD_HID_RESPONSE, CMD_LICENSE_CLEAN_RESPONSE, CMD_LICENSE_PUT_REQUEST,
        CMD_LICENSE_PUT_RESPONSE, CMD_RESET_RESPONSE, ErrorCode, ResponseError,
    };
    use crate::transport::MockConnector;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            max_no_progress: 5,
            inactivity_timeout_secs: 60,
            cooldown_ms: 0,
            failure_pause_ms: 0,
            duplicate_cooldown_ms: 0,
            read_polls: 3,
            read_poll_interval_ms: 1,
            open_retry: RetryPolicy::once(),
        }
    }

    fn hid_reply(hid: &[u8]) -> Vec<u8> {
        Frame::new(CMD_HID_RESPONSE, 0, hid.to_vec()).encode().unwrap()
    }

    fn count(observer: &CollectingObserver, kind: &str) -> usize {
        observer.kinds().iter().filter(|k| **k == kind).count()
    }

    #[test]
    fn test_retry_limit_stops_after_exactly_max_cycles() {
        let connector = MockConnector::with_responder(|_| {
            Some(Frame::new(CMD_RESET_RESPONSE, 0, vec![]).encode().unwrap())
        });
        let probe = connector.clone();
        let observer = Arc::new(CollectingObserver::new());
        let mut session =
            ProvisionSession::with_observer(connector, SessionMode::CollectHid, fast_config(), observer.clone());

        let reason = session.run();
        assert_eq!(reason, StopReason::RetryLimit { cycles: 5 });
        assert_eq!(probe.open_count(), 5);
        assert_eq!(count(&observer, "hid_fail"), 5);
        assert_eq!(observer.kinds().last(), Some(&"stopped"));
    }

    #[test]
    fn test_collect_suppresses_duplicates() {
        let connector = MockConnector::with_responder(|_| Some(hid_reply(&[0xAB, 0xCD])));
        let observer = Arc::new(CollectingObserver::new());
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let mut session =
            ProvisionSession::with_observer(connector, SessionMode::CollectHid, fast_config(), observer.clone())
                .with_recorder(move |hid: &Hid| -> anyhow::Result<()> {
                    sink.lock().unwrap().push(hid.clone());
                    Ok(())
                });

        let reason = session.run();
        assert_eq!(reason, StopReason::RetryLimit { cycles: 5 });
        assert_eq!(*recorded.lock().unwrap(), vec![Hid::new("ABCD")]);
        assert_eq!(count(&observer, "hid_success"), 1);
        assert_eq!(count(&observer, "hid_duplicate"), 5);

        let snap = session.snapshot();
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.duplicates, 5);
        assert_eq!(snap.cycles, 6);
    }

    #[test]
    fn test_duplicates_run_into_inactivity_timeout() {
        let connector = MockConnector::with_responder(|_| Some(hid_reply(&[0xAB, 0xCD])));
        let observer = Arc::new(CollectingObserver::new());
        let config = SessionConfig {
            max_no_progress: 20,
            inactivity_timeout_secs: 1,
            duplicate_cooldown_ms: 250,
            ..fast_config()
        };
        let mut session = ProvisionSession::with_observer(connector, SessionMode::CollectHid, config, observer.clone());

        assert!(matches!(
            session.run(),
            StopReason::InactivityTimeout { .. }
        ));
        assert_eq!(count(&observer, "hid_success"), 1);
        assert!(count(&observer, "hid_duplicate") >= 2);
    }

    #[test]
    fn test_partial_failure_keeps_device_retryable() {
        let directory = Directory::load(vec![
            DirectoryRow::new("AA55", "03E8", "01"),
            DirectoryRow::new("AA55", "03E9", "02"),
        ])
        .unwrap();

        let mut second_component_calls = 0;
        let connector = MockConnector::with_responder(move |req| {
            let frame = Frame::decode(req).ok()?;
            let reply = match frame.command {
                CMD_HID_REQUEST => return Some(hid_reply(&[0xAA, 0x55])),
                CMD_LICENSE_PUT_REQUEST if frame.component_id == 0x03E9 => {
                    second_component_calls += 1;
                    if second_component_calls == 1 { 0x06 } else { 0x00 }
                }
                CMD_LICENSE_PUT_REQUEST => 0x00,
                _ => return None,
            };
            Frame::new(CMD_LICENSE_PUT_RESPONSE, frame.component_id, vec![reply])
                .encode()
                .ok()
        });
        let probe = connector.clone();
        let observer = Arc::new(CollectingObserver::new());
        let mut session = ProvisionSession::with_observer(
            connector,
            SessionMode::ProvisionLicense(Arc::new(directory)),
            fast_config(),
            observer.clone(),
        );

        let reason = session.run();
        assert_eq!(reason, StopReason::RetryLimit { cycles: 5 });
        assert_eq!(count(&observer, "device_incomplete"), 1);
        assert_eq!(count(&observer, "device_provisioned"), 1);

        let puts_for_second = probe
            .writes()
            .iter()
            .filter_map(|w| Frame::decode(w).ok())
            .filter(|f| f.command == CMD_LICENSE_PUT_REQUEST && f.component_id == 0x03E9)
            .count();
        assert_eq!(puts_for_second, 2);

        let snap = session.snapshot();
        assert_eq!(snap.licenses_written, 3);
        assert_eq!(snap.licenses_failed, 1);
    }

    #[test]
    fn test_no_license_does_not_count_toward_limit() {
        let directory = Directory::load(vec![DirectoryRow::new("01", "1", "01")]).unwrap();
        let mut requests = 0;
        let connector = MockConnector::with_responder(move |_| {
            requests += 1;
            if requests <= 3 {
                Some(hid_reply(&[0xDE, 0xAD]))
            } else {
                Frame::new(CMD_RESET_RESPONSE, 0, vec![]).encode().ok()
            }
        });
        let probe = connector.clone();
        let observer = Arc::new(CollectingObserver::new());
        let config = SessionConfig {
            max_no_progress: 1,
            ..fast_config()
        };
        let mut session = ProvisionSession::with_observer(
            connector,
            SessionMode::ProvisionLicense(Arc::new(directory)),
            config,
            observer.clone(),
        );

        assert_eq!(session.run(), StopReason::RetryLimit { cycles: 1 });
        assert_eq!(probe.open_count(), 4);
        assert_eq!(count(&observer, "no_license"), 3);
        assert!(probe.writes().iter().all(|w| w == &build_hid_request()));
    }

    #[test]
    fn test_connect_failures_do_not_count_toward_limit() {
        let connector = MockConnector::with_responder(|_| Some(hid_reply(&[0x12, 0x34])));
        connector.fail_next_opens(7);
        let probe = connector.clone();
        let observer = Arc::new(CollectingObserver::new());
        let session =
            ProvisionSession::with_observer(connector, SessionMode::CollectHid, fast_config(), observer.clone());
        let cancel = session.cancel_token();
        let mut session = session.with_recorder(move |_: &Hid| -> anyhow::Result<()> {
            cancel.cancel();
            Ok(())
        });

        assert_eq!(session.run(), StopReason::User);
        assert_eq!(probe.open_count(), 8);
        assert_eq!(count(&observer, "connect_failed"), 7);
        assert_eq!(count(&observer, "hid_success"), 1);
    }

    #[test]
    fn test_inactivity_timeout_while_device_absent() {
        let connector = MockConnector::new();
        connector.fail_next_opens(u32::MAX);
        let observer = Arc::new(CollectingObserver::new());
        let config = SessionConfig {
            inactivity_timeout_secs: 0,
            failure_pause_ms: 5,
            ..fast_config()
        };
        let mut session = ProvisionSession::with_observer(connector, SessionMode::CollectHid, config, observer.clone());

        assert!(matches!(
            session.run(),
            StopReason::InactivityTimeout { .. }
        ));
        match observer.events().last() {
            Some(SessionEvent::Stopped {
                reason: StopReason::InactivityTimeout { .. },
                snapshot: Some(_),
            }) => {}
            other => panic!("unexpected last event: {:?}", other),
        }
    }

    #[test]
    fn test_cancel_interrupts_cooldown() {
        let connector = MockConnector::new();
        connector.fail_next_opens(u32::MAX);
        let observer = Arc::new(CollectingObserver::new());
        let config = SessionConfig {
            failure_pause_ms: 60_000,
            ..fast_config()
        };
        let handle = start(connector, SessionMode::CollectHid, config, observer.clone()).unwrap();

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        handle.cancel();
        assert_eq!(handle.join(), StopReason::User);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(observer.kinds().last(), Some(&"stopped"));
    }

    #[test]
    fn test_worker_crash_is_observable() {
        let connector = MockConnector::with_responder(|_| Some(hid_reply(&[0x01, 0x02])));
        let observer = Arc::new(CollectingObserver::new());
        let handle = ProvisionSession::with_observer(connector, SessionMode::CollectHid, fast_config(), observer.clone())
            .with_recorder(|_: &Hid| -> anyhow::Result<()> { panic!("recorder exploded") })
            .spawn()
            .unwrap();

        assert_eq!(handle.join(), StopReason::Crashed("recorder exploded".into()));
        match observer.events().last() {
            Some(SessionEvent::Stopped {
                reason: StopReason::Crashed(msg),
                snapshot: None,
            }) => assert_eq!(msg, "recorder exploded"),
            other => panic!("unexpected last event: {:?}", other),
        }
    }

    #[test]
    fn test_packets_are_observed() {
        let connector = MockConnector::with_responder(|_| Some(hid_reply(&[0xAB, 0xCD])));
        let observer = Arc::new(CollectingObserver::new());
        let config = SessionConfig {
            max_no_progress: 1,
            ..fast_config()
        };
        let mut session = ProvisionSession::with_observer(connector, SessionMode::CollectHid, config, observer.clone());
        session.run();

        let tx = observer
            .events()
            .into_iter()
            .find_map(|e| match e {
                SessionEvent::Packet {
                    direction: PacketDirection::Tx,
                    data,
                    ..
                } => data,
                _ => None,
            })
            .unwrap();
        assert_eq!(tx, build_hid_request());
    }

    #[test]
    fn test_probe_and_clean() {
        let mut connector = MockConnector::new();
        let policy = fast_config().read_policy();

        connector.queue_reply(&hid_reply(&[0x54, 0x00, 0x49]));
        assert_eq!(probe(&mut connector, &policy).unwrap(), Hid::new("540049"));

        connector.queue_frame(&Frame::new(CMD_LICENSE_CLEAN_RESPONSE, 0x03E8, vec![0x00]));
        assert!(clean_license(&mut connector, 0x03E8, &policy).is_ok());

        connector.queue_frame(&Frame::new(CMD_LICENSE_CLEAN_RESPONSE, 0x03E8, vec![0x0F]));
        assert_eq!(
            clean_license(&mut connector, 0x03E8, &policy),
            Err(CycleFailure::Rejected(ResponseError::Device(ErrorCode::FlashEraseFail)))
        );

        connector.queue_frame(&Frame::new(CMD_LICENSE_CLEAN_RESPONSE, 0x03E9, vec![0x00]));
        assert_eq!(
            clean_license(&mut connector, 0x03E8, &policy),
            Err(CycleFailure::Rejected(ResponseError::ComponentMismatch {
                expected: 0x03E8,
                actual: 0x03E9
            }))
        );

        assert!(matches!(
            probe(&mut connector, &policy),
            Err(CycleFailure::Transport(_))
        ));
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("provkit-session-{}.toml", std::process::id()));
        let config = SessionConfig {
            max_no_progress: 9,
            ..SessionConfig::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = SessionConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);

        let partial: SessionConfig = toml::from_str("cooldown_ms = 10").unwrap();
        assert_eq!(partial.cooldown_ms, 10);
        assert_eq!(partial.max_no_progress, 5);
    }
}
