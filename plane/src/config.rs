use plane_traits::{AxisMapping, PlaneError};
use serde::{Deserialize, Serialize};
use serial_attitude::{LinkOptions, SerialSettings, DEFAULT_BAUD_RATE, DEFAULT_MAX_LINE_LEN};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Viewer settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub settle_ms: u64,
    pub poll_ms: u64,
    pub tick_ms: u64,
    pub max_line_len: usize,
    pub mapping: AxisMapping,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 1000,
            settle_ms: 2000,
            poll_ms: 10,
            tick_ms: 20,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            mapping: AxisMapping::default(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Serial port; defaults to the first one found
    #[arg(short, long)]
    pub port: Option<String>,

    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// Output sources for pitch,roll,yaw; prefix with '-' to invert, e.g. roll,-pitch,yaw
    #[arg(short, long)]
    pub mapping: Option<AxisMapping>,

    /// Delay after opening the port before it is used
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Reader sleep when no bytes are waiting
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Longest unterminated line kept before it is dropped
    #[arg(long)]
    pub max_line_len: Option<usize>,
}

impl ViewerConfig {
    pub fn from_toml(text: &str) -> Result<Self, PlaneError> {
        toml::from_str(text).map_err(|e| PlaneError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, PlaneError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PlaneError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        info!(?path, "Loaded config");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(mapping) = overrides.mapping {
            self.mapping = mapping;
        }
        if let Some(settle_ms) = overrides.settle_ms {
            self.settle_ms = settle_ms;
        }
        if let Some(poll_ms) = overrides.poll_ms {
            self.poll_ms = poll_ms;
        }
        if let Some(max_line_len) = overrides.max_line_len {
            self.max_line_len = max_line_len;
        }
    }

    pub fn serial_settings(&self, port: &str) -> SerialSettings {
        SerialSettings {
            port: port.to_string(),
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.timeout_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    pub fn link_options(&self) -> LinkOptions {
        LinkOptions {
            poll_interval: Duration::from_millis(self.poll_ms),
            max_line_len: self.max_line_len,
            ..LinkOptions::default()
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plane_traits::{Channel, Inversion};

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(ViewerConfig::from_toml("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn reads_partial_file() {
        let config = ViewerConfig::from_toml(
            r#"
            port = "/dev/ttyUSB1"
            settle_ms = 0

            [mapping]
            yaw = "pitch"
            invert = "YAW"
            "#,
        )
        .unwrap();

        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.settle_ms, 0);
        assert_eq!(config.mapping.yaw, Channel::Pitch);
        assert_eq!(config.mapping.pitch, Channel::Pitch);
        assert_eq!(config.mapping.invert, Inversion::YAW);
    }

    #[test]
    fn rejects_unknown_channel() {
        let err = ViewerConfig::from_toml("[mapping]\npitch = \"heading\"").unwrap_err();
        assert!(matches!(err, PlaneError::Config(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = ViewerConfig::from_toml("port = \"COM4\"\nbaud_rate = 9600").unwrap();
        config.apply(Overrides {
            baud_rate: Some(115200),
            mapping: Some("roll,pitch,-yaw".parse().unwrap()),
            ..Overrides::default()
        });

        assert_eq!(config.port.as_deref(), Some("COM4"));
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.mapping.pitch, Channel::Roll);
        assert_eq!(config.mapping.invert, Inversion::YAW);
    }

    #[test]
    fn builds_transport_settings() {
        let config = ViewerConfig::default();
        let settings = config.serial_settings("/dev/ttyACM0");
        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert_eq!(config.link_options().poll_interval, Duration::from_millis(10));
    }
}
