//! Atomic write primitives
//!
//! Uses temp→rename so readers never observe a partial object

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Suffix of in-flight temp files; listings skip them.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Atomically write bytes to a file
///
/// Creates missing parent directories. The temp file lives next to the
/// target so the rename stays on one filesystem.
pub async fn atomic_write(target_path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(target_path);
    if let Err(e) = fs::write(&temp_path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, target_path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(())
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}{}", name, uuid::Uuid::new_v4(), TEMP_SUFFIX))
}
