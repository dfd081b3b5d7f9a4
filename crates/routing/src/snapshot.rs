//! Snapshot persistence and content hashing of installed configs.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::coordinator::SubscriberResult;
use crate::error::Result;
use crate::schema::Config;

/// Low 48 bits of the SHA-256 digest of `data`, as a gauge-friendly float.
/// 48 bits fit an f64 mantissa exactly.
pub fn content_hash(data: &[u8]) -> f64 {
    let digest = Sha256::digest(data);
    let mut bytes = [0u8; 8];
    bytes[..6].copy_from_slice(&digest[..6]);
    u64::from_le_bytes(bytes) as f64
}

/// Write `config.original()` to `path` atomically (temp file + rename).
pub fn write_snapshot(path: &Path, config: &Config) -> Result<()> {
    let body = if config.original().is_empty() {
        serde_json::to_string(config)?
    } else {
        config.original().to_string()
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp_path, &body)?;
    fs::rename(&tmp_path, path)?;

    info!(path = %path.display(), bytes = body.len(), "wrote config snapshot");
    Ok(())
}

/// Subscriber that persists every installed config to `path`.
pub fn snapshot_subscriber(path: PathBuf) -> impl Fn(&Config) -> SubscriberResult + Send + Sync + 'static {
    move |config: &Config| write_snapshot(&path, config).map_err(Into::into)
}
