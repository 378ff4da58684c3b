//! =============================================================================
//! cPicker - Application principale
//! cPicker - Main application
//! =============================================================================
//!
//! Cette application affiche un overlay plein écran qui échantillonne la couleur
//! sous le curseur et une loupe avec le code hexadécimal.
//!
//! This application shows a fullscreen overlay sampling the color under the
//! cursor, with a magnifier and the hex color value.
//!
//! # Contrôles / Controls
//! - Souris / Mouse: Déplacer pour choisir / Move to pick a color
//! - Clic gauche / Left click: Copier et quitter / Copy and exit
//! - Clic droit, ESC / Right click, ESC: Quitter / Exit
//! - Relâcher Super+Shift+C / Release Super+Shift+C: Copier et quitter / Copy and exit
//!
//! Tant que Super+Shift+C figure dans la table du clavier, relâcher une autre
//! touche ne copie pas: seuls le clic et le raccourci valident.
//! While Super+Shift+C is in the keymap, releasing any other key does not
//! copy: only a click or the shortcut commits. Without it, any key release
//! except ESC copies and exits.

use clap::{ArgAction, Parser};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// =============================================================================
// MODULES
// =============================================================================

/// Configuration partagée (constantes)
/// Shared configuration (constants)
mod config;

/// Types d'erreurs / Error types
mod errors;

/// Couleur échantillonnée et conversions hex
/// Sampled color and hex conversions
mod common;

mod capture;
mod clipboard;
mod magnifier;
mod overlay;

/// Verrou d'instance unique / Single-instance lock
#[cfg(unix)]
mod instance_lock;

/// Implémentation Linux (X11)
/// Linux implementation (X11)
#[cfg(target_os = "linux")]
mod linux;

use config::{DEFAULT_LOG_FILTER, LOG_ENV};
use errors::LaunchError;

// =============================================================================
// LIGNE DE COMMANDE
// COMMAND LINE
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "cpicker",
    version,
    about = "cPicker - Lightweight Linux color picker tool",
    disable_version_flag = true
)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Launch color picker overlay (default action)
    #[arg(long)]
    ui: bool,
}

/// Journalisation sur stderr, filtrée par CPICKER_LOG
/// Logging to stderr, filtered by CPICKER_LOG
fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// =============================================================================
// LANCEMENT
// LAUNCH
// =============================================================================

/// Lance l'overlay sous le verrou d'instance unique
/// Launches the overlay under the single-instance lock
#[cfg(target_os = "linux")]
fn launch_picker() -> Result<(), LaunchError> {
    let lock = instance_lock::InstanceLock::in_temp_dir();
    let guard = match lock.acquire() {
        Ok(guard) => guard,
        Err(reason) => {
            // Sortie silencieuse (code 0) / Silent exit (status 0)
            tracing::debug!(%reason, path = %lock.lock_path().display(), "launch rejected");
            eprintln!("cPicker is already running.");
            return Ok(());
        }
    };

    let result = linux::run();
    guard.release();
    result
}

#[cfg(not(target_os = "linux"))]
fn launch_picker() -> Result<(), LaunchError> {
    Err(LaunchError::UnsupportedPlatform)
}

// =============================================================================
// POINT D'ENTRÉE
// ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    // Sans argument ou avec --ui: même action
    // No argument or --ui: same action
    let cli = Cli::parse();
    init_logging();
    tracing::debug!(ui = cli.ui, "starting");

    match launch_picker() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error launching cPicker: {err}");
            ExitCode::FAILURE
        }
    }
}
