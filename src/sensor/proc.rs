// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linux sensors reading the proc filesystem.
//!
//! - Camera: a process holds an open descriptor on a V4L2 node
//!   (`/dev/video*`), found through `/proc/<pid>/fd`.
//! - Microphone: an ALSA capture substream is running, as reported by
//!   `/proc/asound/card*/pcm*c/sub*/status`.
//!
//! A missing proc root (no procfs on this platform) reports
//! [`SensorError::Unavailable`]; other read failures report
//! [`SensorError::Io`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SensorError;
use crate::sensor::SensorSource;

const DEFAULT_PROC_ROOT: &str = "/proc";
const VIDEO_DEVICE_PREFIX: &str = "/dev/video";
const RUNNING_STATE: &str = "state: RUNNING";

/// Sensor source backed by `/proc`.
///
/// # Examples
///
/// ```no_run
/// use awsiot_media_device::sensor::{ProcSensors, SensorSource};
///
/// let sensors = ProcSensors::new();
/// let camera = sensors.is_camera_active()?;
/// let microphone = sensors.is_microphone_active()?;
/// println!("camera={camera} microphone={microphone}");
/// # Ok::<(), awsiot_media_device::error::SensorError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ProcSensors {
    proc_root: PathBuf,
}

impl Default for ProcSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcSensors {
    /// Creates sensors reading the system `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_proc_root(DEFAULT_PROC_ROOT)
    }

    /// Creates sensors reading a proc tree mounted elsewhere.
    #[must_use]
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: root.into(),
        }
    }

    fn asound_root(&self) -> PathBuf {
        self.proc_root.join("asound")
    }
}

impl SensorSource for ProcSensors {
    fn is_camera_active(&self) -> Result<bool, SensorError> {
        if !self.proc_root.exists() {
            return Err(SensorError::Unavailable(format!(
                "no proc filesystem at {}",
                self.proc_root.display()
            )));
        }

        let entries = read_dir(&self.proc_root)?;

        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_str().is_some_and(is_numeric) {
                continue;
            }

            // Processes may exit or belong to other users; both are skipped.
            let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
                continue;
            };

            for fd in fds.flatten() {
                if let Ok(target) = fs::read_link(fd.path())
                    && target.to_string_lossy().starts_with(VIDEO_DEVICE_PREFIX)
                {
                    tracing::trace!(
                        pid = %name.to_string_lossy(),
                        device = %target.display(),
                        "Camera in use"
                    );
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn is_microphone_active(&self) -> Result<bool, SensorError> {
        let asound = self.asound_root();
        if !asound.exists() {
            tracing::trace!(path = %asound.display(), "No ALSA interface, microphone unavailable");
            return Ok(false);
        }

        for card in read_dir(&asound)?.flatten() {
            if !card
                .file_name()
                .to_str()
                .and_then(|n| n.strip_prefix("card"))
                .is_some_and(is_numeric)
            {
                continue;
            }

            let Ok(pcms) = fs::read_dir(card.path()) else {
                continue;
            };

            for pcm in pcms.flatten() {
                let is_capture = pcm
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with("pcm") && n.ends_with('c'));
                if is_capture && capture_running(&pcm.path()) {
                    tracing::trace!(pcm = %pcm.path().display(), "Microphone in use");
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

/// Returns whether any substream of a capture PCM is running.
fn capture_running(pcm: &Path) -> bool {
    let Ok(subs) = fs::read_dir(pcm) else {
        return false;
    };

    subs.flatten()
        .filter(|sub| sub.file_name().to_string_lossy().starts_with("sub"))
        .filter_map(|sub| fs::read_to_string(sub.path().join("status")).ok())
        .any(|status| status.lines().any(|line| line.trim() == RUNNING_STATE))
}

fn read_dir(path: &Path) -> Result<fs::ReadDir, SensorError> {
    fs::read_dir(path).map_err(|source| SensorError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
