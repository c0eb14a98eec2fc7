//! serialport-based transport implementation.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, instrument};

use super::retry::{RetryPolicy, with_retry};
use super::traits::{Connector, Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    Mark,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowControl {
    #[default]
    None,
    RtsCts,
    XonXoff,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("data bits must be 5-8, got {}", other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(value: DataBits) -> Self {
        match value {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("stop bits must be 1 or 2, got {}", other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Platform device name (`/dev/ttyUSB0`, `COM3`).
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Per-call blocking limit for writes and reads.
    pub io_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115_200,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
            io_timeout_ms: 2000,
        }
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Default::default()
        }
    }

    fn builder(&self) -> Result<serialport::SerialPortBuilder, TransportError> {
        let data_bits = match self.data_bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        };
        let parity = match self.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Mark | Parity::Space => {
                return Err(TransportError::Unsupported(format!(
                    "{:?} parity is not available on this backend",
                    self.parity
                )));
            }
        };
        let stop_bits = match self.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        };
        let flow_control = match self.flow_control {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::RtsCts => serialport::FlowControl::Hardware,
            FlowControl::XonXoff => serialport::FlowControl::Software,
        };

        Ok(serialport::new(self.port.as_str(), self.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(self.io_timeout_ms)))
    }
}

/// Serial port transport.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    write_retry: RetryPolicy,
}

impl SerialTransport {
    /// Open the port once, without retry.
    #[instrument(level = "info", skip(config), fields(port = %config.port, baud = config.baud_rate))]
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = config
            .builder()?
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: config.port.clone(),
                message: e.to_string(),
            })?;

        info!("Serial port opened");
        Ok(Self {
            port: Some(port),
            name: config.port.clone(),
            write_retry: RetryPolicy::once(),
        })
    }

    pub fn with_write_retry(mut self, policy: RetryPolicy) -> Self {
        self.write_retry = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    #[instrument(skip(self, data), fields(port = %self.name, len = data.len()))]
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;
        // stale bytes would be read as the answer to this request
        port.clear(ClearBuffer::Input)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        with_retry(&self.write_retry, "serial write", || {
            port.write_all(data)
                .and_then(|_| port.flush())
                .map_err(|e| TransportError::WriteFailed(e.to_string()))
        })?;
        debug!(bytes_written = data.len(), "Write complete");
        Ok(data.len())
    }

    #[instrument(level = "trace", skip(self), fields(port = %self.name))]
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;
        let pending = port
            .bytes_to_read()
            .map_err(|e| TransportError::ReadFailed(e.to_string()))? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; pending];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                debug!(bytes_read = n, "Read complete");
                Ok(buf)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(TransportError::ReadFailed(e.to_string())),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.name, "Serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Opens the configured serial port with bounded retry.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
    open_retry: RetryPolicy,
    write_retry: RetryPolicy,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            open_retry: RetryPolicy::default(),
            write_retry: RetryPolicy::once(),
        }
    }

    pub fn with_open_retry(mut self, policy: RetryPolicy) -> Self {
        self.open_retry = policy;
        self
    }

    pub fn with_write_retry(mut self, policy: RetryPolicy) -> Self {
        self.write_retry = policy;
        self
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn connect(&mut self) -> Result<SerialTransport, TransportError> {
        let transport = with_retry(&self.open_retry, "serial open", || {
            SerialTransport::open(&self.config)
        })?;
        Ok(transport.with_write_retry(self.write_retry.clone()))
    }

    fn endpoint(&self) -> String {
        self.config.port.clone()
    }
}

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

/// Enumerate serial ports.
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = serialport::available_ports()
        .map_err(|e| TransportError::OpenFailed {
            port: "*".into(),
            message: e.to_string(),
        })?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => format!(
                    "USB {:04X}:{:04X} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                ),
                serialport::SerialPortType::PciPort => "PCI".into(),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".into(),
                serialport::SerialPortType::Unknown => "Unknown".into(),
            };
            PortInfo {
                name: p.port_name,
                kind: kind.trim_end().to_string(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_line_settings() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(u8::from(config.data_bits), 8);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(u8::from(config.stop_bits), 1);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_line_settings_from_toml() {
        let config: SerialConfig = toml::from_str(
            r#"
            port = "/dev/ttyUSB0"
            baud_rate = 9600
            data_bits = 7
            parity = "even"
            flow_control = "rts-cts"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Seven);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.flow_control, FlowControl::RtsCts);
    }

    #[test]
    fn test_rejects_invalid_data_bits() {
        assert!(toml::from_str::<SerialConfig>("data_bits = 9").is_err());
        assert!(toml::from_str::<SerialConfig>("stop_bits = 3").is_err());
    }

    #[test]
    fn test_mark_parity_unsupported() {
        let config = SerialConfig {
            parity: Parity::Mark,
            ..SerialConfig::new("/dev/null", 9600)
        };
        assert!(matches!(
            config.builder(),
            Err(TransportError::Unsupported(_))
        ));
    }

    #[test]
    fn test_closed_transport_refuses_io() {
        let mut transport = SerialTransport {
            port: None,
            name: "closed".into(),
            write_retry: RetryPolicy::once(),
        };
        assert!(!transport.is_open());
        assert!(matches!(
            transport.read_available(),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.write(&[0x5A]),
            Err(TransportError::NotOpen)
        ));
        transport.close();
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig::new("/dev/provkit-does-not-exist", 9600);
        assert!(matches!(
            SerialTransport::open(&config),
            Err(TransportError::OpenFailed { .. })
        ));
    }
}
