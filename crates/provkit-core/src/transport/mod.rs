//! Transport layer module.

pub mod mock;
pub mod retry;
pub mod serial;
pub mod traits;

pub use mock::{MockConnector, MockTransport};
pub use retry::{RetryPolicy, with_retry};
pub use serial::{
    DataBits, FlowControl, Parity, PortInfo, SerialConfig, SerialConnector, SerialTransport,
    StopBits, list_ports,
};
pub use traits::{Connector, ReadPolicy, Transport, TransportError};
