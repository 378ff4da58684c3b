//! =============================================================================
//! CLIPBOARD.RS - Presse-papiers et notifications
//! CLIPBOARD.RS - Clipboard and notifications
//! =============================================================================
//!
//! Both go through external programs. `xclip` keeps owning the X selection
//! after the picker exits; `notify-send` is fire-and-forget.

use crate::common::SampledColor;
use crate::config::{
    CLIPBOARD_PROGRAM, CLIPBOARD_TIMEOUT, NOTIFY_ICON, NOTIFY_PROGRAM, NOTIFY_TIMEOUT_MS,
    NOTIFY_TITLE,
};
use crate::errors::{ClipboardError, NotificationError};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

// =============================================================================
// PRESSE-PAPIERS
// CLIPBOARD
// =============================================================================

/// Destination du texte copié / Copied text destination
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Copie via `xclip -selection clipboard`
/// Copy through `xclip -selection clipboard`
pub struct Xclip {
    program: &'static str,
    timeout: Duration,
}

impl Default for Xclip {
    fn default() -> Self {
        Self {
            program: CLIPBOARD_PROGRAM,
            timeout: CLIPBOARD_TIMEOUT,
        }
    }
}

impl ClipboardSink for Xclip {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        // Vérifie que xclip est disponible / Check that xclip is available
        if find_in_path(self.program).is_none() {
            return Err(ClipboardError::NotInstalled {
                program: self.program,
            });
        }

        let mut child = Command::new(self.program)
            .args(["-selection", "clipboard"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // Stdin dropped after the write: xclip sees EOF and forks into the background
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        match child.wait_timeout(self.timeout)? {
            Some(status) if status.success() => {
                debug!(program = self.program, text, "copied to clipboard");
                Ok(())
            }
            Some(status) => Err(ClipboardError::Failed {
                program: self.program,
                status,
            }),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ClipboardError::TimedOut {
                    program: self.program,
                })
            }
        }
    }
}

/// Cherche un exécutable dans le PATH / Looks up an executable in PATH
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Notification de bureau transitoire / Transient desktop notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub icon: &'static str,
    pub timeout_ms: u32,
    pub title: String,
    pub body: String,
}

impl Notification {
    /// "Color Copied" avec le code hex et les valeurs RGB
    /// "Color Copied" with the hex code and RGB values
    pub fn color_copied(color: &SampledColor) -> Self {
        Self {
            icon: NOTIFY_ICON,
            timeout_ms: NOTIFY_TIMEOUT_MS,
            title: NOTIFY_TITLE.to_string(),
            body: format!("{}\nRGB({}, {}, {})", color.hex, color.r, color.g, color.b),
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Lance `notify-send` sans attendre / Spawns `notify-send` without waiting
#[derive(Default)]
pub struct NotifySend;

impl Notifier for NotifySend {
    fn notify(&mut self, n: &Notification) -> Result<(), NotificationError> {
        let timeout = n.timeout_ms.to_string();
        Command::new(NOTIFY_PROGRAM)
            .args(["-i", n.icon, "-t", timeout.as_str(), n.title.as_str(), n.body.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_copied_notification() {
        let n = Notification::color_copied(&SampledColor::new(58, 127, 189));
        assert_eq!(n.title, "Color Copied");
        assert_eq!(n.body, "#3A7FBD\nRGB(58, 127, 189)");
        assert_eq!(n.icon, "color-select");
        assert_eq!(n.timeout_ms, 2000);
    }

    #[test]
    fn test_missing_program_is_not_installed() {
        let mut clip = Xclip {
            program: "cpicker-test-no-such-clipboard-tool",
            timeout: CLIPBOARD_TIMEOUT,
        };
        let err = clip.set_text("#000000").unwrap_err();
        assert!(matches!(err, ClipboardError::NotInstalled { .. }));
    }

    /// Script exécutable temporaire / Temporary executable script
    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> &'static str {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-xclip");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Box::leak(path.to_string_lossy().into_owned().into_boxed_str())
    }

    #[cfg(unix)]
    #[test]
    fn test_text_reaches_program_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("selection");
        let mut clip = Xclip {
            program: script(dir.path(), &format!("cat > '{}'", out.display())),
            timeout: CLIPBOARD_TIMEOUT,
        };
        clip.set_text("#3A7FBD").unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "#3A7FBD");
    }

    #[cfg(unix)]
    #[test]
    fn test_hanging_program_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut clip = Xclip {
            program: script(dir.path(), "exec sleep 5"),
            timeout: Duration::from_millis(100),
        };
        let started = std::time::Instant::now();
        let err = clip.set_text("#000000").unwrap_err();
        assert!(matches!(err, ClipboardError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut clip = Xclip {
            program: script(dir.path(), "cat > /dev/null; exit 3"),
            timeout: CLIPBOARD_TIMEOUT,
        };
        let err = clip.set_text("#000000").unwrap_err();
        assert!(matches!(err, ClipboardError::Failed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_path_finds_shell() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("cpicker-test-no-such-program").is_none());
    }
}
