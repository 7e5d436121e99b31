//! Detection of demo files another process still has open.
//!
//! The engine keeps a demo open for writing until the match ends. Parsing
//! it earlier would cache a partial game, so the worker asks a
//! [`FileUseProbe`] first and skips files that are in use.

use std::path::Path;
use std::sync::Arc;

/// Answers whether some process has a file open.
pub trait FileUseProbe: Send + Sync {
    /// Whether `path` is open in any process.
    fn is_in_use(&self, path: &Path) -> bool;
}

/// A probe that never reports a file in use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverInUse;

impl FileUseProbe for NeverInUse {
    fn is_in_use(&self, _path: &Path) -> bool {
        false
    }
}

/// The probe for the current platform.
///
/// Linux scans `/proc/*/fd`; Windows tries an exclusive open. Elsewhere
/// files are never reported in use.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProbe;

impl FileUseProbe for SystemProbe {
    fn is_in_use(&self, path: &Path) -> bool {
        platform::is_in_use(path)
    }
}

/// The default probe, shared.
pub fn system_probe() -> Arc<dyn FileUseProbe> {
    Arc::new(SystemProbe)
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs;
    use std::path::Path;

    pub(super) fn is_in_use(path: &Path) -> bool {
        let Ok(target) = fs::canonicalize(path) else {
            return false;
        };
        let Ok(procs) = fs::read_dir("/proc") else {
            return false;
        };
        for proc_entry in procs.flatten() {
            let is_pid = proc_entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.bytes().all(|b| b.is_ascii_digit()));
            if !is_pid {
                continue;
            }
            // Processes we may not inspect are skipped.
            let Ok(fds) = fs::read_dir(proc_entry.path().join("fd")) else {
                continue;
            };
            for fd in fds.flatten() {
                if fs::read_link(fd.path()).is_ok_and(|link| link == target) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(windows)]
mod platform {
    use std::fs::OpenOptions;
    use std::os::windows::fs::OpenOptionsExt;
    use std::path::Path;

    const ERROR_SHARING_VIOLATION: i32 = 32;

    pub(super) fn is_in_use(path: &Path) -> bool {
        match OpenOptions::new().read(true).share_mode(0).open(path) {
            Ok(_) => false,
            Err(e) => e.raw_os_error() == Some(ERROR_SHARING_VIOLATION),
        }
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod platform {
    use std::path::Path;

    pub(super) fn is_in_use(_path: &Path) -> bool {
        false
    }
}
