//! License provisioning.

use super::CycleContext;
use crate::directory::{ComponentLicense, Directory};
use crate::events::{CycleFailure, CycleOutcome, CyclePhase, LogLevel, SessionEvent, SessionObserver};
use crate::hid::Hid;
use crate::protocol::{ResponseError, build_license_put_request, validate_put_response};
use crate::transport::Transport;

/// Push every license of `hid`, strictly in directory order.
///
/// The device counts as done only when every component succeeded. A fault
/// that leaves a reply unaccounted for ends the push; later components are
/// left for a future cycle.
pub fn handle_provision<T, O>(
    ctx: &mut CycleContext<'_, T, O>,
    hid: Hid,
    directory: &Directory,
) -> CycleOutcome
where
    T: Transport,
    O: SessionObserver + ?Sized,
{
    ctx.emit(SessionEvent::HidSuccess { hid: hid.clone() });

    let licenses = directory.lookup(&hid);
    if licenses.is_empty() {
        ctx.emit(SessionEvent::NoLicense { hid: hid.clone() });
        return CycleOutcome::NoLicense(hid);
    }

    ctx.goto(CyclePhase::Provisioning);
    let mut succeeded = 0;
    let mut failed = 0;
    let mut pending = licenses.iter();
    for license in pending.by_ref() {
        let result = put_license(ctx, license);
        let stop = matches!(&result, Err(f) if out_of_step(f));
        match &result {
            Ok(()) => {
                succeeded += 1;
                ctx.state.licenses_written += 1;
            }
            Err(_) => {
                failed += 1;
                ctx.state.licenses_failed += 1;
            }
        }
        ctx.emit(SessionEvent::LicenseComponentResult {
            hid: hid.clone(),
            component_id: license.component_id,
            result,
        });
        if stop {
            break;
        }
    }

    let skipped: Vec<u16> = pending.map(|l| l.component_id).collect();
    if !skipped.is_empty() {
        ctx.log(
            LogLevel::Warn,
            format!(
                "Link out of step, not attempted: {}",
                skipped
                    .iter()
                    .map(|id| format!("{:04X}", id))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );
    }

    if failed == 0 {
        ctx.emit(SessionEvent::DeviceProvisioned {
            hid: hid.clone(),
            components: succeeded,
        });
        CycleOutcome::Completed(hid)
    } else {
        ctx.emit(SessionEvent::DeviceIncomplete {
            hid: hid.clone(),
            succeeded,
            failed,
            skipped: skipped.len(),
        });
        CycleOutcome::Incomplete {
            hid,
            failed: failed + skipped.len(),
        }
    }
}

/// Whether a reply may still be in flight or was matched to the wrong request.
///
/// A device status (`Rejected(Device(..))`) is a clean answer; the next
/// component can go out on the same link.
fn out_of_step(failure: &CycleFailure) -> bool {
    match failure {
        CycleFailure::Transport(_) | CycleFailure::Frame(_) => true,
        CycleFailure::Rejected(e) => matches!(
            e,
            ResponseError::Reset
                | ResponseError::UnexpectedCommand { .. }
                | ResponseError::ComponentMismatch { .. }
        ),
        CycleFailure::Encode(_) | CycleFailure::Storage(_) => false,
    }
}

fn put_license<T, O>(ctx: &mut CycleContext<'_, T, O>, license: &ComponentLicense) -> Result<(), CycleFailure>
where
    T: Transport,
    O: SessionObserver + ?Sized,
{
    ctx.log(
        LogLevel::Debug,
        format!(
            "Writing component {:04X} ({} bytes)",
            license.component_id,
            license.license.len()
        ),
    );
    let request = build_license_put_request(license.component_id, &license.license)?;
    let reply = ctx.exchange(&request)?;
    validate_put_response(&reply, license.component_id)?;
    Ok(())
}
