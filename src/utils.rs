use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use log::{info, error};
use regex::Regex;
use tokio::fs;

use crate::core::bluetooth::BridgeError;

static MAC_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})$")
        .expect("MAC address pattern is valid")
});

/// Asynchronously ensures that a directory exists, creating it if it does not.
/// This function is idempotent.
pub async fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        if let Err(e) = fs::create_dir_all(path).await {
            error!("Failed to create directory at {:?}: {}", path, e);
            return Err(e.into());
        }
        info!("Created directory at: {:?}", path);
    }
    Ok(())
}

/// Normalizes a MAC address to upper-case, colon separated form.
pub fn normalize_address(address: &str) -> Result<String, BridgeError> {
    let captures = MAC_ADDRESS
        .captures(address.trim())
        .ok_or_else(|| BridgeError::InvalidArgument(format!("not a Bluetooth address: {address:?}")))?;
    let octets: Vec<String> = captures
        .iter()
        .skip(1)
        .flatten()
        .map(|octet| octet.as_str().to_uppercase())
        .collect();
    Ok(octets.join(":"))
}
