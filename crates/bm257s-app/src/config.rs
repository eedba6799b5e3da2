use anyhow::{Context, Result};
use bm257s_core::SerialConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings read from `<config dir>/bm257s/config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub read_timeout_ms: Option<u64>,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bm257s").join("config.json"))
    }

    /// Loads the file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Values in `overrides` win over values in `self`.
    pub fn merged(self, overrides: AppConfig) -> Self {
        Self {
            port: overrides.port.or(self.port),
            baud_rate: overrides.baud_rate.or(self.baud_rate),
            read_timeout_ms: overrides.read_timeout_ms.or(self.read_timeout_ms),
        }
    }

    pub fn serial_config(&self) -> SerialConfig {
        let mut cfg = SerialConfig::default();
        if let Some(port) = &self.port {
            cfg.port_name = port.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            cfg.baud_rate = baud_rate;
        }
        if let Some(ms) = self.read_timeout_ms {
            cfg.read_timeout = Duration::from_millis(ms);
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "port": "COM3" }"#).unwrap();
        assert_eq!(cfg.port.as_deref(), Some("COM3"));
        assert_eq!(cfg.baud_rate, None);
    }

    #[test]
    fn test_overrides_win() {
        let file = AppConfig {
            port: Some("/dev/ttyUSB1".into()),
            baud_rate: Some(19200),
            read_timeout_ms: None,
        };
        let flags = AppConfig {
            port: Some("/dev/ttyACM0".into()),
            ..Default::default()
        };
        let cfg = file.merged(flags).serial_config();
        assert_eq!(cfg.port_name, "/dev/ttyACM0");
        assert_eq!(cfg.baud_rate, 19200);
        assert_eq!(cfg.read_timeout, SerialConfig::default().read_timeout);
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("bm257s-no-such-dir").join("config.json");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }
}
