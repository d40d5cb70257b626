//! Single-instance guard
//!
//! The lock file is created with `create_new` (O_EXCL), so acquiring it is
//! atomic: two concurrently starting processes cannot both win. A leftover
//! file from a crashed run is detected by probing the recorded PID and
//! taken over. The guard removes the file on drop, giving clean shutdowns
//! an empty slate.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::{AppError, AppResult};

/// Holds the lock file for the lifetime of the process.
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Acquire the lock file, failing if another live instance holds it.
    pub fn acquire(path: &str) -> AppResult<Self> {
        let path = PathBuf::from(path);
        let pid = std::process::id();

        match try_create(&path, pid) {
            Ok(()) => {
                log::info!("Instance lock acquired: {} (pid {})", path.display(), pid);
                return Ok(Self { path, pid });
            }
            Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => {
                return Err(AppError::Io(e));
            }
            Err(_) => {}
        }

        // Lock file exists; decide whether its owner is still alive.
        match read_pid(&path) {
            Some(owner) if process_alive(owner) => Err(AppError::AlreadyRunning(owner)),
            other => {
                match other {
                    Some(owner) => log::warn!("Stale lock file {} (dead pid {}), taking over", path.display(), owner),
                    None => log::warn!("Unreadable lock file {}, taking over", path.display()),
                }
                fs::remove_file(&path)?;
                try_create(&path, pid)?;
                log::info!("Instance lock acquired after takeover: {} (pid {})", path.display(), pid);
                Ok(Self { path, pid })
            }
        }
    }

    /// PID recorded in the lock file (this process).
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

fn try_create(path: &Path, pid: u32) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", pid)?;
    Ok(())
}

/// Reads the PID stored in a lock file, if it parses.
pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Best-effort liveness probe for a recorded PID.
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

/// Without /proc the probe cannot tell; assume the owner is alive so we
/// never kill a healthy instance's lock.
#[cfg(not(target_os = "linux"))]
pub fn process_alive(_pid: u32) -> bool {
    true
}

/// Reports the running/not-running state shown on the dashboard.
pub fn status(path: &str) -> InstanceStatus {
    let path = Path::new(path);
    if !path.exists() {
        return InstanceStatus::NotRunning;
    }
    match read_pid(path) {
        Some(pid) if process_alive(pid) => InstanceStatus::Running(pid),
        Some(pid) => InstanceStatus::Dead(pid),
        None => InstanceStatus::NotRunning,
    }
}

/// Observable bot process state, derived from the lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Running(u32),
    Dead(u32),
    NotRunning,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_and_drop_removes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bot.pid");
        let path_str = path.to_str().unwrap();

        {
            let lock = InstanceLock::acquire(path_str).unwrap();
            assert!(path.exists());
            assert_eq!(read_pid(&path), Some(lock.pid()));
        }
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_fails_while_owner_is_alive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bot.pid");
        let path_str = path.to_str().unwrap();

        let _lock = InstanceLock::acquire(path_str).unwrap();
        // Our own PID is recorded and obviously alive.
        match InstanceLock::acquire(path_str) {
            Err(AppError::AlreadyRunning(pid)) => assert_eq!(pid, std::process::id()),
            other => panic!("expected AlreadyRunning, got {:?}", other.map(|l| l.pid())),
        }
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bot.pid");
        // PID 0 never names a real process we could race with.
        fs::write(&path, "0\n").unwrap();

        let lock = InstanceLock::acquire(path.to_str().unwrap());
        // On Linux /proc/0 does not exist, so takeover must succeed.
        #[cfg(target_os = "linux")]
        assert!(lock.is_ok());
        drop(lock);
    }

    #[test]
    fn status_reflects_lock_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bot.pid");
        let path_str = path.to_str().unwrap();

        assert_eq!(status(path_str), InstanceStatus::NotRunning);
        let _lock = InstanceLock::acquire(path_str).unwrap();
        assert_eq!(status(path_str), InstanceStatus::Running(std::process::id()));
    }
}
