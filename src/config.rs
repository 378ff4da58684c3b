//! Configuration constants shared across the picker
//!
//! These values control the appearance and behavior of the color picker.
//! Ces valeurs contrôlent l'apparence et le comportement du color picker.

use std::time::Duration;

// =============================================================================
// CAPTURE ET LOUPE
// CAPTURE AND MAGNIFIER
// =============================================================================

/// Number of screen pixels captured on each side (21×21)
/// Must be ODD to have a single center pixel for the highlight
pub const SOURCE_SIZE: i32 = 21;

/// Each source pixel is drawn as a ZOOM_FACTOR × ZOOM_FACTOR block
pub const ZOOM_FACTOR: i32 = 10;

/// Side of the magnified view in pixels (21 source pixels at 10x zoom)
/// Côté de la vue agrandie en pixels
pub const MAGNIFIER_SIZE: i32 = SOURCE_SIZE * ZOOM_FACTOR;

/// Height of the color information panel below the magnified view
/// Hauteur du panneau d'information sous la vue agrandie
pub const INFO_PANEL_HEIGHT: i32 = 80;

/// Distance between the cursor and the magnifier window
/// Distance entre le curseur et la fenêtre de la loupe
pub const MAGNIFIER_OFFSET: i32 = 30;

/// Side of the color swatch in the info panel
pub const SWATCH_SIZE: i32 = 30;

/// Margin around the swatch and the RGB readout
pub const SWATCH_MARGIN: i32 = 10;

// =============================================================================
// COULEURS DU THÈME (R, G, B, alpha)
// THEME COLORS (R, G, B, alpha)
// =============================================================================

/// Center pixel border / Bordure du pixel central
pub const THEME_BLUE: [u8; 4] = [0, 150, 255, 200];

/// Info panel background / Fond du panneau d'information
pub const DARK_BG: [u8; 4] = [40, 40, 40, 240];

/// Text and swatch border / Texte et bordure de l'échantillon
pub const WHITE_TEXT: [u8; 4] = [255, 255, 255, 255];

/// Grid lines in the magnifier / Lignes de la grille
pub const SUBTLE_GRID: [u8; 4] = [255, 255, 255, 60];

/// X core fonts tried in order for the hex code (large, bold, monospace)
/// Polices X essayées dans l'ordre pour le code hexadécimal
pub const HEX_FONTS: &[&str] = &[
    "-misc-fixed-bold-r-normal--18-*-*-*-*-*-iso8859-1",
    "9x15bold",
    "fixed",
];

/// X core fonts tried in order for the RGB readout (small, monospace)
pub const RGB_FONTS: &[&str] = &[
    "-misc-fixed-medium-r-normal--13-*-*-*-*-*-iso8859-1",
    "7x13",
    "fixed",
];

// =============================================================================
// MINUTERIES
// TIMERS
// =============================================================================

/// Capture/update period (30 ms ≈ 33 FPS)
/// Période de capture/mise à jour
pub const CAPTURE_INTERVAL: Duration = Duration::from_millis(30);

/// Longest wait for one capture (connection or GetImage reply) before the
/// display counts as hung and the tick is skipped
/// Attente maximale d'une capture avant de sauter le tick
pub const CAPTURE_TIMEOUT: Duration = Duration::from_millis(250);

/// Keyboard state poll period for shortcut-hold mode
/// Période d'interrogation du clavier pour le mode maintien du raccourci
pub const KEY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on how long the event loop sleeps between two X event polls
pub const MAX_EVENT_WAIT: Duration = Duration::from_millis(5);

/// Keyboard grab attempts at startup; the shortcut daemon may still hold the keyboard
pub const KEYBOARD_GRAB_ATTEMPTS: u32 = 20;

/// Delay between two keyboard grab attempts
pub const KEYBOARD_GRAB_RETRY: Duration = Duration::from_millis(10);

// =============================================================================
// RACCOURCI MAINTENU (keysyms X11)
// HELD SHORTCUT (X11 keysyms)
// =============================================================================

/// Super + Shift + C; each slot is satisfied by any of its keysyms
/// Chaque touche du raccourci est satisfaite par l'un de ses keysyms
pub const HOLD_COMBO: [&[u32]; 3] = [
    &[0xffeb, 0xffec], // Super_L, Super_R
    &[0xffe1, 0xffe2], // Shift_L, Shift_R
    &[0x0063, 0x0043], // c, C
];

/// Escape keysym / Keysym de la touche Échap
pub const KEYSYM_ESCAPE: u32 = 0xff1b;

// =============================================================================
// INSTANCE UNIQUE
// SINGLE INSTANCE
// =============================================================================

/// Relaunches within this window after a release are rejected
/// Les relances dans cette fenêtre après une libération sont rejetées
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Lock file holding the owner pid, in the shared temporary directory
pub const LOCK_FILE_NAME: &str = "cpicker.lock";

/// Last-release timestamp (float epoch seconds), in the shared temporary directory
pub const TIMESTAMP_FILE_NAME: &str = "cpicker.timestamp";

// =============================================================================
// PRESSE-PAPIERS ET NOTIFICATIONS
// CLIPBOARD AND NOTIFICATIONS
// =============================================================================

/// External clipboard utility / Utilitaire de presse-papiers externe
pub const CLIPBOARD_PROGRAM: &str = "xclip";

/// Longest wait for the clipboard utility to take the text
pub const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(1);

/// External notifier / Notificateur externe
pub const NOTIFY_PROGRAM: &str = "notify-send";

pub const NOTIFY_ICON: &str = "color-select";
pub const NOTIFY_TIMEOUT_MS: u32 = 2000;
pub const NOTIFY_TITLE: &str = "Color Copied";

// =============================================================================
// JOURNALISATION
// LOGGING
// =============================================================================

/// Environment variable holding the tracing filter (e.g. `CPICKER_LOG=debug`)
pub const LOG_ENV: &str = "CPICKER_LOG";

/// Filter used when LOG_ENV is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "warn";
