//! HID collection.

use super::CycleContext;
use crate::events::{CycleFailure, CycleOutcome, CyclePhase, SessionEvent, SessionObserver};
use crate::hid::Hid;
use crate::recorder::HidRecorder;
use crate::transport::Transport;

/// Persist a new HID. A recorder error fails the cycle.
pub fn handle_collect<T, O>(
    ctx: &mut CycleContext<'_, T, O>,
    hid: Hid,
    recorder: &mut dyn HidRecorder,
) -> CycleOutcome
where
    T: Transport,
    O: SessionObserver + ?Sized,
{
    ctx.goto(CyclePhase::Recording);

    if let Err(e) = recorder.record(&hid) {
        let failure = CycleFailure::Storage(format!("{:#}", e));
        ctx.emit(SessionEvent::HidFail {
            failure: failure.clone(),
        });
        return CycleOutcome::Failed(failure);
    }

    ctx.emit(SessionEvent::HidSuccess { hid: hid.clone() });
    CycleOutcome::Completed(hid)
}
