use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::bluetooth::{
    DEFAULT_DISCOVERY_TIMEOUT_MS, DEFAULT_PAIRING_TIMEOUT_MS, DEFAULT_UUID_FETCH_TIMEOUT_MS,
    SecurityMode, TextEncoding,
};
use crate::utils::ensure_directory_exists;

const CONFIG_FILE_NAME: &str = "bluetooth_config.json";

/// Session core settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a discovery session may run before it fails with a timeout
    pub discovery_timeout_ms: u64,
    /// How long to wait for the bond confirmation after a pairing request
    pub pairing_timeout_ms: u64,
    /// How long to wait for the service records of a device
    pub uuid_fetch_timeout_ms: u64,
    /// Encoding used for text writes that don't name one
    pub default_encoding: TextEncoding,
    /// Socket flavour used when connect is not given one
    pub default_security_mode: SecurityMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            discovery_timeout_ms: DEFAULT_DISCOVERY_TIMEOUT_MS,
            pairing_timeout_ms: DEFAULT_PAIRING_TIMEOUT_MS,
            uuid_fetch_timeout_ms: DEFAULT_UUID_FETCH_TIMEOUT_MS,
            default_encoding: TextEncoding::default(),
            default_security_mode: SecurityMode::default(),
        }
    }
}

impl BridgeConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_millis(self.pairing_timeout_ms)
    }

    pub fn uuid_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.uuid_fetch_timeout_ms)
    }

    /// Loads the config from `config_dir`, falling back to defaults when the file is missing.
    pub async fn load_config(config_dir: &Path) -> Result<Self> {
        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !file_path.exists() {
            warn!(
                "Bluetooth config file not found at {:?}, using default.",
                file_path_str
            );
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(&file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Bluetooth config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the current config into `config_dir`.
    pub async fn save_config(&self, config_dir: &Path) -> Result<()> {
        ensure_directory_exists(config_dir).await?;

        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize bluetooth config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(&file_path, config_json).await?;
        info!("Bluetooth config saved to {:?}", file_path_str);
        Ok(())
    }
}
