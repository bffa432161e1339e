use chrono::NaiveDateTime;
use motion_snap_common::config::{Resolution, SnapshotConfig};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::camera::{Camera, CaptureError};
use crate::keys::snapshot_file_name;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot {path} failed: {source}")]
    Capture {
        path: String,
        #[source]
        source: CaptureError,
    },
}

/// Takes full-resolution stills when motion is detected.
///
/// The remote directory is preferred, but only while it is a writable
/// directory; otherwise the local directory is used. The check runs on every
/// trigger so a network mount that comes and goes is picked up without a
/// restart.
pub struct SnapshotSink {
    resolution: Resolution,
    local_dir: Option<PathBuf>,
    remote_dir: Option<PathBuf>,
}

impl SnapshotSink {
    pub fn new(resolution: Resolution, local_dir: Option<PathBuf>, remote_dir: Option<PathBuf>) -> Self {
        Self {
            resolution,
            local_dir,
            remote_dir,
        }
    }

    /// Returns `None` when no full resolution is configured (snapshots off).
    pub fn from_config(config: &SnapshotConfig) -> Option<Self> {
        let resolution = config.full_resolution()?;
        Some(Self::new(
            resolution,
            config.local_dir.clone(),
            config.remote_dir.clone(),
        ))
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Where the next snapshot would be written.
    pub fn destination(&self) -> Option<&Path> {
        choose_destination(self.remote_dir.as_deref(), self.local_dir.as_deref())
    }

    /// Capture a snapshot named after `at`. Returns the written path, or
    /// `None` when neither directory is available.
    pub async fn trigger<C: Camera>(
        &self,
        camera: &C,
        at: NaiveDateTime,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        let Some(dir) = self.destination() else {
            return Ok(None);
        };

        let path = dir.join(snapshot_file_name(at));
        info!(path = %path.display(), resolution = %self.resolution, "saving snapshot");

        camera
            .capture_to_file(self.resolution, &path)
            .await
            .map_err(|source| SnapshotError::Capture {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Some(path))
    }
}

/// Remote if it is currently a writable directory, else local.
pub fn choose_destination<'a>(remote: Option<&'a Path>, local: Option<&'a Path>) -> Option<&'a Path> {
    match remote {
        Some(dir) if is_writable_dir(dir) => Some(dir),
        Some(dir) => {
            debug!(remote = %dir.display(), "remote snapshot dir unavailable, falling back to local");
            local
        }
        None => local,
    }
}

/// Asks the kernel whether this process may create files in `path`, so
/// ownership, ACLs and read-only mounts are all taken into account.
fn is_writable_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}
