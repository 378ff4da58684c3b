//! =============================================================================
//! INSTANCE_LOCK.RS - Instance unique du picker
//! INSTANCE_LOCK.RS - Single picker instance
//! =============================================================================
//!
//! Two files in the shared temporary directory:
//! - `cpicker.lock`: flock(2)-locked while an instance runs, holds its pid
//! - `cpicker.timestamp`: epoch seconds (float) of the last clean release
//!
//! A launch less than `DEBOUNCE` after the last release is rejected without
//! opening the lock file. Window managers repeat the shortcut and the second
//! launch would otherwise win the lock the moment the first one exits.

use crate::config::{DEBOUNCE, LOCK_FILE_NAME, TIMESTAMP_FILE_NAME};
use crate::errors::LockRejected;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Emplacement et paramètres du verrou
/// Lock location and parameters
#[derive(Clone, Debug)]
pub struct InstanceLock {
    lock_path: PathBuf,
    timestamp_path: PathBuf,
    debounce: Duration,
}

impl InstanceLock {
    /// Lock files inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            lock_path: dir.join(LOCK_FILE_NAME),
            timestamp_path: dir.join(TIMESTAMP_FILE_NAME),
            debounce: DEBOUNCE,
        }
    }

    /// Lock files in the system temporary directory (`/tmp`)
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Acquiert le verrou / Acquires the lock
    pub fn acquire(&self) -> Result<InstanceGuard, LockRejected> {
        self.acquire_at(SystemTime::now())
    }

    /// Acquires the lock as if the current time were `now`
    pub fn acquire_at(&self, now: SystemTime) -> Result<InstanceGuard, LockRejected> {
        // Vérifie si une instance vient de se terminer (anti-rebond)
        // Check whether an instance just exited (debounce)
        if let Some(last_release) = self.last_release() {
            // A timestamp from the future (clock step) is ignored
            if let Ok(elapsed) = now.duration_since(last_release) {
                if elapsed < self.debounce {
                    return Err(LockRejected::Debounced {
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
            }
        }

        // Pas de troncature avant d'avoir le verrou: le pid du détenteur reste lisible
        // No truncation before holding the lock: the holder's pid stays readable
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(LockRejected::Unavailable)?;

        // SAFETY: flock only reads the descriptor, which `file` keeps open.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(code) if code == libc::EWOULDBLOCK => Err(LockRejected::AlreadyRunning),
                _ => Err(LockRejected::Unavailable(err)),
            };
        }

        if let Err(err) = write_pid(&mut file) {
            warn!(path = %self.lock_path.display(), %err, "could not write pid to lock file");
        }
        debug!(path = %self.lock_path.display(), "instance lock acquired");

        Ok(InstanceGuard {
            file: Some(file),
            lock_path: self.lock_path.clone(),
            timestamp_path: self.timestamp_path.clone(),
        })
    }

    /// Moment de la dernière libération, si lisible
    /// Time of the last release, if readable
    fn last_release(&self) -> Option<SystemTime> {
        let content = fs::read_to_string(&self.timestamp_path).ok()?;
        let secs: f64 = content.trim().parse().ok()?;
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        UNIX_EPOCH.checked_add(Duration::from_secs_f64(secs))
    }
}

/// Verrou détenu; libéré à la destruction
/// Held lock; released on drop
///
/// Dropping the guard writes the release timestamp, unlocks and removes the
/// lock file. This runs on normal return, early `?` return and unwinding.
#[derive(Debug)]
pub struct InstanceGuard {
    file: Option<File>,
    lock_path: PathBuf,
    timestamp_path: PathBuf,
}

impl InstanceGuard {
    /// Releases now instead of at the end of the scope
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };

        // Enregistre l'heure pour empêcher une relance immédiate
        // Record the time to prevent an immediate relaunch
        if let Err(err) = write_timestamp(&self.timestamp_path, SystemTime::now()) {
            warn!(path = %self.timestamp_path.display(), %err, "could not write release timestamp");
        }

        // SAFETY: the descriptor is still open, `file` is dropped right after.
        unsafe {
            libc::flock(file.as_raw_fd(), libc::LOCK_UN);
        }
        drop(file);

        match fs::remove_file(&self.lock_path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.lock_path.display(), %err, "could not remove lock file"),
        }
        debug!("instance lock released");
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

fn write_pid(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

fn write_timestamp(path: &Path, at: SystemTime) -> io::Result<()> {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    fs::write(path, format!("{secs}\n"))
}

// =============================================================================
// TESTS
// =============================================================================
