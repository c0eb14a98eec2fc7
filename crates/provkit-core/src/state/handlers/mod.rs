//! Cycle handlers - what happens between connect and disconnect.
//!
//! This module is split into submodules by mode:
//! - `collect`: record new HIDs
//! - `provision`: push per-component licenses

mod collect;
mod provision;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::directory::Directory;
use crate::events::{
    CycleFailure, CycleOutcome, CyclePhase, LogLevel, SessionEvent, SessionObserver,
};
use crate::hid::Hid;
use crate::protocol::{Frame, build_hid_request, validate_hid_response};
use crate::recorder::HidRecorder;
use crate::state::machine::SessionState;
use crate::transport::{ReadPolicy, Transport};

pub use collect::handle_collect;
pub use provision::handle_provision;

/// Mode-specific work for one cycle.
pub enum CycleTask<'a> {
    Collect(&'a mut dyn HidRecorder),
    Provision(&'a Directory),
}

/// Handler context containing all resources of one cycle.
pub struct CycleContext<'a, T: Transport, O: SessionObserver + ?Sized> {
    pub transport: &'a mut T,
    pub observer: &'a O,
    pub state: &'a mut SessionState,
    pub read_policy: ReadPolicy,
    pub cancel: &'a CancelToken,
}

impl<'a, T: Transport, O: SessionObserver + ?Sized> CycleContext<'a, T, O> {
    pub(crate) fn emit(&self, event: SessionEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(SessionEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub(crate) fn goto(&mut self, phase: CyclePhase) {
        let from = self.state.goto(phase);
        if from != phase {
            self.emit(SessionEvent::PhaseChanged { from, to: phase });
        }
    }

    /// One strict request/response exchange.
    pub(crate) fn exchange(&mut self, request: &[u8]) -> Result<Frame, CycleFailure> {
        self.transport.write(request)?;
        let reply = self.transport.read_reply(&self.read_policy, self.cancel)?;
        let frame = Frame::decode(&reply)?;
        debug!(frame = %frame, "Reply decoded");
        Ok(frame)
    }

    /// Request the device HID and validate the answer.
    pub(crate) fn request_hid(&mut self) -> Result<Hid, CycleFailure> {
        self.goto(CyclePhase::Requesting);
        let frame = self.exchange(&build_hid_request())?;
        self.goto(CyclePhase::Validating);
        Ok(validate_hid_response(&frame)?)
    }
}

/// Run one cycle on an open transport.
///
/// Never fails: every error ends up in the returned outcome and in an event.
pub fn run_cycle<T, O>(ctx: &mut CycleContext<'_, T, O>, task: CycleTask<'_>) -> CycleOutcome
where
    T: Transport,
    O: SessionObserver + ?Sized,
{
    let hid = match ctx.request_hid() {
        Ok(hid) => hid,
        Err(failure) => {
            ctx.emit(SessionEvent::HidFail {
                failure: failure.clone(),
            });
            return CycleOutcome::Failed(failure);
        }
    };

    if ctx.state.is_completed(&hid) {
        ctx.emit(SessionEvent::HidDuplicate { hid: hid.clone() });
        return CycleOutcome::Duplicate(hid);
    }

    match task {
        CycleTask::Collect(recorder) => handle_collect(ctx, hid, recorder),
        CycleTask::Provision(directory) => handle_provision(ctx, hid, directory),
    }
}
