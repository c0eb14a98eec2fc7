//! Tool configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;
use crate::transport::{RetryPolicy, SerialConfig, SerialConnector};

/// Everything a provisioning station needs, as one TOML document.
///
/// ```toml
/// [serial]
/// port = "/dev/ttyUSB0"
/// baud_rate = 115200
///
/// [session]
/// max_no_progress = 5
/// inactivity_timeout_secs = 30
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub serial: SerialConfig,
    pub session: SessionConfig,
    /// Retry applied to each serial write.
    pub write_retry: RetryPolicy,
}

impl ToolConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: ToolConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serial connector honouring the configured retry policies.
    pub fn connector(&self) -> SerialConnector {
        SerialConnector::new(self.serial.clone())
            .with_open_retry(self.session.open_retry.clone())
            .with_write_retry(self.write_retry.clone())
    }
}
