//! Error types for the color picker
//!
//! One enum per failure domain. Only `LaunchError` is fatal; every other
//! failure degrades locally (skip the tick, report and close, or ignore).

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Hex parsing errors
/// Erreurs d'analyse hexadécimale
// Only produced by `from_hex`, which the picker never calls
#[allow(dead_code)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color '{0}': expected 6 hex digits")]
    InvalidFormat(String),
}

/// Screen capture errors; the caller skips the tick and keeps its last sample
/// Erreurs de capture; l'appelant saute le tick et garde le dernier échantillon
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Could not reach the display server
    #[error("display unavailable: {0}")]
    DisplayUnavailable(String),

    /// Requested region has no area
    #[error("capture region too small: {width}x{height}")]
    RegionTooSmall { width: i32, height: i32 },

    /// Pixel layout we do not decode
    #[error("unsupported pixel format: depth {depth}, {bits_per_pixel} bits per pixel")]
    CodecMismatch { depth: u8, bits_per_pixel: u8 },

    /// Image data shorter than the requested region
    #[error("truncated image data: expected {expected} bytes, got {actual}")]
    ShortImage { expected: usize, actual: usize },

    /// Request sent but the server answered with an error
    #[error("capture request failed: {0}")]
    Request(String),
}

/// Clipboard errors; reported on the console, the overlay still closes
/// Erreurs du presse-papiers; affichées dans la console
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("{program} not found. Please install {program}: sudo apt install {program}")]
    NotInstalled { program: &'static str },

    #[error("{program} timed out")]
    TimedOut { program: &'static str },

    #[error("{program} exited with {status}")]
    Failed {
        program: &'static str,
        status: ExitStatus,
    },

    #[error("copying to clipboard failed: {0}")]
    Io(#[from] io::Error),
}

/// Notification errors; always swallowed by the caller
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("could not start notifier: {0}")]
    Spawn(#[from] io::Error),
}

/// Window surface errors (overlay, magnifier)
/// Erreurs des surfaces (overlay, loupe)
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("window request failed: {0}")]
    Request(String),

    #[error("no usable font among {0:?}")]
    NoFont(&'static [&'static str]),
}

/// Why the single-instance lock was not taken
///
/// Not an error for the user: every variant leads to a silent exit with
/// status 0. The variants stay distinct so both races can be told apart.
#[derive(Debug, Error)]
pub enum LockRejected {
    /// A previous instance released less than the debounce window ago
    #[error("previous instance exited {elapsed_ms} ms ago")]
    Debounced { elapsed_ms: u64 },

    /// Another process holds the lock
    #[error("another instance holds the lock")]
    AlreadyRunning,

    /// The lock file could not be opened
    #[error("lock file unavailable: {0}")]
    Unavailable(#[source] io::Error),
}

/// Fatal startup errors; printed to stderr, exit status 1
/// Erreurs fatales au lancement; affichées sur stderr, code de sortie 1
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("cannot open display: {0}")]
    Display(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("unsupported platform")]
    UnsupportedPlatform,
}
