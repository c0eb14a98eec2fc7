//! Storage collaborator for collected HIDs.

use anyhow::Result;

use crate::hid::Hid;

/// Persists each newly collected HID.
///
/// An error fails the cycle and leaves the HID eligible for collection again.
pub trait HidRecorder: Send {
    fn record(&mut self, hid: &Hid) -> Result<()>;
}

impl<F> HidRecorder for F
where
    F: FnMut(&Hid) -> Result<()> + Send,
{
    fn record(&mut self, hid: &Hid) -> Result<()> {
        self(hid)
    }
}

/// Discards HIDs.
pub struct NullRecorder;

impl HidRecorder for NullRecorder {
    fn record(&mut self, _hid: &Hid) -> Result<()> {
        Ok(())
    }
}

/// Keeps HIDs in memory, in collection order.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    pub hids: Vec<Hid>,
}

impl HidRecorder for MemoryRecorder {
    fn record(&mut self, hid: &Hid) -> Result<()> {
        self.hids.push(hid.clone());
        Ok(())
    }
}
