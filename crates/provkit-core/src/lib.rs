//! provkit-core: license provisioning over a serial link.
//!
//! This crate implements the binary frame protocol spoken by the device
//! firmware and the session loop that collects device HIDs or writes
//! per-component licenses in batch.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Frame codec, command/status vocabulary, response checks
//! - **Transport**: Serial link abstraction (serialport, mock), bounded retry
//! - **Directory**: HID to license lookup table
//! - **State**: Session state and per-mode cycle handlers
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: High-level orchestrator and one-shot operations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use provkit_core::directory::Directory;
//! use provkit_core::session::{ProvisionSession, SessionConfig, SessionMode};
//! use provkit_core::transport::{SerialConfig, SerialConnector};
//!
//! let directory = Directory::load_file("licenses.toml").expect("bad directory");
//! let connector = SerialConnector::new(SerialConfig::new("/dev/ttyUSB0", 115_200));
//! let mut session = ProvisionSession::new(
//!     connector,
//!     SessionMode::ProvisionLicense(Arc::new(directory)),
//!     SessionConfig::default(),
//! );
//! let reason = session.run();
//! println!("stopped: {}", reason);
//! ```

pub mod cancel;
pub mod config;
pub mod convert;
pub mod directory;
pub mod events;
pub mod hid;
pub mod protocol;
pub mod recorder;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use config::ToolConfig;
pub use directory::{Directory, DirectoryError, DirectoryRow, DirectoryStats, LicenseSet};
pub use events::{
    ChannelObserver, CollectingObserver, CycleFailure, CycleOutcome, CyclePhase, LogLevel,
    NullObserver, SessionEvent, SessionObserver, SessionSnapshot, StopReason, TracingObserver,
};
pub use hid::Hid;
pub use protocol::{Command, ErrorCode, Frame, FrameError, ResponseError};
pub use recorder::{HidRecorder, MemoryRecorder, NullRecorder};
pub use session::{
    ProvisionSession, SessionConfig, SessionHandle, SessionMode, clean_license, probe, start,
};
pub use transport::{
    Connector, MockConnector, SerialConfig, SerialConnector, Transport, TransportError, list_ports,
};
