//! Atomic file replacement
//!
//! Content goes to a sibling temporary file which gets its mode set and is
//! then renamed over the destination, so readers see the old file or the
//! new one, never a partial write.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use zonepop_core::{Error, Result};

/// Replace `path` with `contents`, leaving the file with `mode`
///
/// On any failure the temporary file is removed and `path` is untouched.
pub async fn write_atomic(path: &Path, contents: &str, mode: u32) -> Result<()> {
    let temp_path = temp_path(path);
    let written = match write_temp(&temp_path, contents, mode).await {
        Ok(()) => fs::rename(&temp_path, path).await.map_err(|e| {
            io_error(&format!("Failed to rename {} to", temp_path.display()), path, e)
        }),
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        discard(&temp_path).await;
        return Err(e);
    }

    tracing::trace!(path = %path.display(), "File written");
    Ok(())
}

async fn write_temp(temp_path: &Path, contents: &str, mode: u32) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| io_error("Failed to create temp file", temp_path, e))?;

    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| io_error("Failed to write to temp file", temp_path, e))?;

    file.flush()
        .await
        .map_err(|e| io_error("Failed to flush temp file", temp_path, e))?;
    drop(file);

    set_mode(temp_path, mode).await
}

async fn discard(temp_path: &Path) {
    match fs::remove_file(temp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| io_error("Failed to set permissions on", path, e))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Sibling temp path: `hosts` becomes `hosts.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(context: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("{context} {}: {e}", path.display()),
    ))
}
