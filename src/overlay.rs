//! =============================================================================
//! OVERLAY.RS - Contrôleur de l'overlay plein écran
//! OVERLAY.RS - Fullscreen overlay controller
//! =============================================================================
//!
//! Owns the input-capturing surface, the periodic capture cycle and the
//! commit/cancel state machine:
//!
//! ```text
//! Starting -> Active -> Committing -> Closed
//!                    \-> Cancelling -/
//! ```
//!
//! # Flux d'exécution / Execution flow
//! 1. `start` shows the overlay and the magnifier and arms the timers
//! 2. The platform loop feeds typed events to `dispatch`
//! 3. Each capture tick samples the pixel under the cursor
//! 4. A click, a key release or the end of the held shortcut commits
//!
//! Everything runs on the event loop thread; once `Closed`, every event is
//! ignored.

use crate::capture::{RegionCapture, ScreenSize};
use crate::clipboard::{ClipboardSink, Notification, Notifier};
use crate::common::SampledColor;
use crate::config::{CAPTURE_INTERVAL, KEY_POLL_INTERVAL, SOURCE_SIZE};
use crate::errors::{LaunchError, SurfaceError};
use crate::magnifier::{Magnifier, MagnifierSurface};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// ÉVÉNEMENTS
// EVENTS
// =============================================================================

/// Bouton de la souris / Mouse button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Other(u8),
}

/// Touche relâchée / Released key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Any other key, by keysym
    Other(u32),
}

/// Événements typés distribués par la boucle
/// Typed events dispatched by the loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    PointerMove { x: i32, y: i32 },
    PointerUp(MouseButton),
    KeyUp(Key),
    TickCapture,
    TickKeyPoll,
}

/// Phase du contrôleur / Controller phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Active,
    Committing,
    Cancelling,
    Closed,
}

// =============================================================================
// COLLABORATEURS
// COLLABORATORS
// =============================================================================

/// Surface plein écran transparente qui capture les entrées
/// Transparent fullscreen surface capturing input
pub trait OverlaySurface {
    fn show(&mut self) -> Result<(), SurfaceError>;
    fn close(&mut self) -> Result<(), SurfaceError>;
}

/// Observation de l'état des touches du raccourci
/// Observation of the shortcut keys' state
///
/// Chosen once at start. When unavailable, any key release (except Escape)
/// commits instead.
pub trait KeyHoldObserver {
    fn is_available(&self) -> bool;

    /// Down state of each combo key, `None` when this poll failed
    fn combo_state(&mut self) -> Option<[bool; 3]>;

    fn release(&mut self) {}
}

/// Aucune observation possible / No observation possible
pub struct KeyHoldUnavailable;

impl KeyHoldObserver for KeyHoldUnavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn combo_state(&mut self) -> Option<[bool; 3]> {
        None
    }
}

/// Tout ce que le contrôleur compose / Everything the controller composes
pub struct PickerParts {
    pub capture: RegionCapture,
    pub magnifier: Box<dyn MagnifierSurface>,
    pub overlay: Box<dyn OverlaySurface>,
    pub clipboard: Box<dyn ClipboardSink>,
    pub notifier: Box<dyn Notifier>,
    pub key_hold: Box<dyn KeyHoldObserver>,
}

// =============================================================================
// MINUTERIES ET RACCOURCI
// TIMERS AND SHORTCUT
// =============================================================================

/// Déclencheur périodique / Periodic trigger
#[derive(Debug)]
struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    fn stop(&mut self) {
        self.next = None;
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// True when due; schedules the next firing without piling up missed ones
    fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                let mut following = next + self.period;
                if following <= now {
                    following = now + self.period;
                }
                self.next = Some(following);
                true
            }
            _ => false,
        }
    }
}

/// Suivi du raccourci maintenu / Held shortcut tracking
#[derive(Debug, Default)]
struct ComboTracker {
    seen_held: bool,
}

impl ComboTracker {
    /// Returns true on the first poll that sees a key released after the
    /// whole combo was held together
    fn observe(&mut self, keys: [bool; 3]) -> bool {
        if keys.iter().all(|&down| down) {
            if !self.seen_held {
                debug!("shortcut held");
            }
            self.seen_held = true;
            return false;
        }
        self.seen_held
    }
}

// =============================================================================
// CONTRÔLEUR
// CONTROLLER
// =============================================================================

pub struct PickerOverlay {
    phase: Phase,
    cursor: (i32, i32),
    color: SampledColor,
    capture: RegionCapture,
    capture_failures: u32,
    magnifier: Magnifier,
    overlay: Box<dyn OverlaySurface>,
    clipboard: Box<dyn ClipboardSink>,
    notifier: Box<dyn Notifier>,
    key_hold: Box<dyn KeyHoldObserver>,
    combo: ComboTracker,
    capture_timer: Ticker,
    key_timer: Ticker,
}

impl PickerOverlay {
    /// Affiche l'overlay et la loupe, démarre les minuteries
    /// Shows the overlay and the magnifier, starts the timers
    pub fn start(parts: PickerParts, screen: ScreenSize, now: Instant) -> Result<Self, LaunchError> {
        let mut picker = Self {
            phase: Phase::Starting,
            // Position initiale: centre de l'écran / Initial position: screen center
            cursor: screen.center(),
            color: SampledColor::default(),
            capture: parts.capture,
            capture_failures: 0,
            magnifier: Magnifier::new(parts.magnifier, screen),
            overlay: parts.overlay,
            clipboard: parts.clipboard,
            notifier: parts.notifier,
            key_hold: parts.key_hold,
            combo: ComboTracker::default(),
            capture_timer: Ticker::new(CAPTURE_INTERVAL),
            key_timer: Ticker::new(KEY_POLL_INTERVAL),
        };

        if let Err(err) = picker.show_surfaces() {
            picker.close();
            return Err(err.into());
        }

        picker.capture_timer.start(now);
        if picker.key_hold.is_available() {
            picker.key_timer.start(now);
        } else {
            info!("shortcut hold not observable, any key release commits");
        }

        picker.phase = Phase::Active;
        info!(width = screen.width, height = screen.height, "picker active");
        Ok(picker)
    }

    fn show_surfaces(&mut self) -> Result<(), SurfaceError> {
        self.overlay.show()?;
        self.magnifier.show()?;
        let (x, y) = self.cursor;
        self.magnifier.position_near_cursor(x, y)?;
        self.magnifier.repaint()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Dernière couleur échantillonnée / Last sampled color
    pub fn color(&self) -> &SampledColor {
        &self.color
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }

    /// Distribue un événement / Dispatches an event
    pub fn dispatch(&mut self, event: Event) {
        if self.phase != Phase::Active {
            return;
        }
        match event {
            Event::PointerMove { x, y } => self.on_pointer_move(x, y),
            Event::PointerUp(button) => self.on_pointer_up(button),
            Event::KeyUp(key) => self.on_key_up(key),
            Event::TickCapture => self.on_capture_tick(),
            Event::TickKeyPoll => self.on_key_poll(),
        }
    }

    /// Timer events due at `now`, in firing order
    pub fn due_events(&mut self, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();
        if self.capture_timer.poll(now) {
            events.push(Event::TickCapture);
        }
        if self.key_timer.poll(now) {
            events.push(Event::TickKeyPoll);
        }
        events
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.capture_timer.next, self.key_timer.next]
            .into_iter()
            .flatten()
            .min()
    }

    /// Redessine la loupe (exposition de la fenêtre) / Redraws the magnifier (window exposed)
    pub fn redraw(&mut self) {
        if self.phase != Phase::Active {
            return;
        }
        if let Err(err) = self.magnifier.repaint() {
            warn!(%err, "magnifier redraw failed");
        }
    }

    // -------------------------------------------------------------------------
    // Gestionnaires / Handlers
    // -------------------------------------------------------------------------

    /// Appliqué au prochain tick, pas de capture immédiate
    /// Applied on the next tick, no immediate capture
    fn on_pointer_move(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    fn on_pointer_up(&mut self, button: MouseButton) {
        match button {
            MouseButton::Primary => self.commit(),
            // Clic droit: fermer sans copier / Right click: close without copying
            MouseButton::Secondary => self.cancel(),
            MouseButton::Other(_) => {}
        }
    }

    fn on_key_up(&mut self, key: Key) {
        match key {
            // Échap: fermer sans copier / Escape: close without copying
            Key::Escape => self.cancel(),
            Key::Other(_) if !self.key_hold.is_available() => self.commit(),
            Key::Other(keysym) => debug!(keysym, "key release ignored while the shortcut is watched"),
        }
    }

    /// Capture 21×21 pixels autour du curseur et met à jour la loupe
    /// Captures 21×21 pixels around the cursor and updates the magnifier
    fn on_capture_tick(&mut self) {
        let half = SOURCE_SIZE / 2;
        let (x, y) = self.cursor;

        let frame = match self
            .capture
            .capture_region(x - half, y - half, SOURCE_SIZE, SOURCE_SIZE)
        {
            Ok(frame) => frame,
            Err(err) => {
                // Garde l'échantillon précédent / Keep the previous sample
                if self.capture_failures == 0 {
                    warn!(%err, "screen capture failed, keeping previous color");
                } else {
                    debug!(%err, failures = self.capture_failures + 1, "screen capture failed");
                }
                self.capture_failures += 1;
                return;
            }
        };
        self.capture_failures = 0;

        // Couleur du pixel central / Center pixel color
        let Some(center) = frame.center() else {
            return;
        };
        self.color = SampledColor::from(center);

        self.magnifier.update_source(frame);
        self.magnifier.set_color(self.color.clone());
        if let Err(err) = self
            .magnifier
            .position_near_cursor(x, y)
            .and_then(|()| self.magnifier.repaint())
        {
            warn!(%err, "magnifier update failed");
        }
    }

    fn on_key_poll(&mut self) {
        let Some(keys) = self.key_hold.combo_state() else {
            return;
        };
        if self.combo.observe(keys) {
            debug!("shortcut released");
            self.commit();
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Copie la couleur et ferme / Copies the color and closes
    fn commit(&mut self) {
        self.phase = Phase::Committing;
        let color = self.color.clone();

        match self.clipboard.set_text(&color.hex) {
            Ok(()) => {
                info!(hex = %color.hex, "color copied");
                // Notification optionnelle / Optional notification
                if let Err(err) = self.notifier.notify(&Notification::color_copied(&color)) {
                    debug!(%err, "notification not shown");
                }
            }
            Err(err) => {
                eprintln!("Error: {err}");
                warn!(%err, "clipboard copy failed");
            }
        }

        self.close();
    }

    fn cancel(&mut self) {
        self.phase = Phase::Cancelling;
        debug!("picker cancelled");
        self.close();
    }

    /// Arrête tout et ferme les fenêtres; sans effet si déjà fermé
    /// Stops everything and closes the windows; no-op when already closed
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }

        self.capture_timer.stop();
        self.key_timer.stop();
        self.key_hold.release();

        if let Err(err) = self.magnifier.close() {
            warn!(%err, "closing magnifier failed");
        }
        if let Err(err) = self.overlay.close() {
            warn!(%err, "closing overlay failed");
        }
        self.capture.release();

        self.phase = Phase::Closed;
        debug!("picker closed");
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureBackend, CaptureRect, PixelBuffer};
    use crate::errors::{CaptureError, ClipboardError, NotificationError};
    use crate::magnifier::RenderedView;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FULL_HD: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    /// Journal partagé des appels aux faux collaborateurs
    /// Shared log of calls to the fake collaborators
    #[derive(Default)]
    struct Record {
        grabs: Vec<CaptureRect>,
        connects: u32,
        fail_capture: bool,
        screen_color: [u8; 3],
        clipboard: Vec<String>,
        clipboard_fails: bool,
        notifications: Vec<Notification>,
        notify_fails: bool,
        moves: Vec<(i32, i32)>,
        presents: Vec<RenderedView>,
        magnifier_closes: u32,
        overlay_shows: u32,
        overlay_closes: u32,
        combo: Vec<[bool; 3]>,
        key_hold_released: bool,
    }

    type Shared = Rc<RefCell<Record>>;

    struct FakeScreen(Shared);

    impl CaptureBackend for FakeScreen {
        fn screen_size(&self) -> ScreenSize {
            FULL_HD
        }

        fn grab(&mut self, rect: CaptureRect) -> Result<PixelBuffer, CaptureError> {
            let mut rec = self.0.borrow_mut();
            if rec.fail_capture {
                return Err(CaptureError::Request("BadMatch".into()));
            }
            rec.grabs.push(rect);
            Ok(PixelBuffer::solid(
                rect.width as usize,
                rect.height as usize,
                rec.screen_color,
            ))
        }
    }

    struct FakeMagnifier(Shared);

    impl MagnifierSurface for FakeMagnifier {
        fn show(&mut self) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn move_to(&mut self, x: i32, y: i32) -> Result<(), SurfaceError> {
            self.0.borrow_mut().moves.push((x, y));
            Ok(())
        }

        fn present(&mut self, view: &RenderedView) -> Result<(), SurfaceError> {
            self.0.borrow_mut().presents.push(view.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), SurfaceError> {
            self.0.borrow_mut().magnifier_closes += 1;
            Ok(())
        }
    }

    struct FakeOverlay(Shared);

    impl OverlaySurface for FakeOverlay {
        fn show(&mut self) -> Result<(), SurfaceError> {
            self.0.borrow_mut().overlay_shows += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<(), SurfaceError> {
            self.0.borrow_mut().overlay_closes += 1;
            Ok(())
        }
    }

    struct FakeClipboard(Shared);

    impl ClipboardSink for FakeClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            let mut rec = self.0.borrow_mut();
            if rec.clipboard_fails {
                return Err(ClipboardError::NotInstalled { program: "xclip" });
            }
            rec.clipboard.push(text.to_string());
            Ok(())
        }
    }

    struct FakeNotifier(Shared);

    impl Notifier for FakeNotifier {
        fn notify(&mut self, n: &Notification) -> Result<(), NotificationError> {
            let mut rec = self.0.borrow_mut();
            if rec.notify_fails {
                return Err(NotificationError::Spawn(std::io::ErrorKind::NotFound.into()));
            }
            rec.notifications.push(n.clone());
            Ok(())
        }
    }

    /// Clavier scripté: chaque sondage consomme un état
    /// Scripted keyboard: each poll consumes one state
    struct FakeKeyHold(Shared);

    impl KeyHoldObserver for FakeKeyHold {
        fn is_available(&self) -> bool {
            true
        }

        fn combo_state(&mut self) -> Option<[bool; 3]> {
            let mut rec = self.0.borrow_mut();
            if rec.combo.is_empty() {
                None
            } else {
                Some(rec.combo.remove(0))
            }
        }

        fn release(&mut self) {
            self.0.borrow_mut().key_hold_released = true;
        }
    }

    fn start_picker(rec: &Shared, key_hold: bool) -> PickerOverlay {
        let screen = Rc::clone(rec);
        let capture = RegionCapture::new(move || {
            screen.borrow_mut().connects += 1;
            Ok(Box::new(FakeScreen(Rc::clone(&screen))) as Box<dyn CaptureBackend>)
        });
        let key_hold: Box<dyn KeyHoldObserver> = if key_hold {
            Box::new(FakeKeyHold(Rc::clone(rec)))
        } else {
            Box::new(KeyHoldUnavailable)
        };
        let parts = PickerParts {
            capture,
            magnifier: Box::new(FakeMagnifier(Rc::clone(rec))),
            overlay: Box::new(FakeOverlay(Rc::clone(rec))),
            clipboard: Box::new(FakeClipboard(Rc::clone(rec))),
            notifier: Box::new(FakeNotifier(Rc::clone(rec))),
            key_hold,
        };
        PickerOverlay::start(parts, FULL_HD, Instant::now()).unwrap()
    }

    fn record(color: [u8; 3]) -> Shared {
        Rc::new(RefCell::new(Record {
            screen_color: color,
            ..Record::default()
        }))
    }

    #[test]
    fn test_start_shows_surfaces_at_screen_center() {
        let rec = record([0, 0, 0]);
        let picker = start_picker(&rec, false);

        assert_eq!(picker.phase(), Phase::Active);
        assert_eq!(picker.cursor(), (960, 540));
        assert_eq!(rec.borrow().overlay_shows, 1);
        assert_eq!(rec.borrow().moves, vec![(960 - 240, 570)]);
        // Connexion de capture ouverte au premier tick seulement
        // Capture connection opened on the first tick only
        assert_eq!(rec.borrow().connects, 0);
    }

    #[test]
    fn test_tick_then_click_copies_center_color() {
        let rec = record([58, 127, 189]);
        let mut picker = start_picker(&rec, false);

        picker.dispatch(Event::TickCapture);
        assert_eq!(picker.color().hex, "#3A7FBD");

        picker.dispatch(Event::PointerUp(MouseButton::Primary));
        let rec = rec.borrow();
        assert_eq!(rec.clipboard, vec!["#3A7FBD".to_string()]);
        assert_eq!(rec.notifications.len(), 1);
        assert_eq!(rec.notifications[0].body, "#3A7FBD\nRGB(58, 127, 189)");
        assert_eq!(picker.phase(), Phase::Closed);
    }

    #[test]
    fn test_capture_is_centered_on_cursor() {
        let rec = record([1, 2, 3]);
        let mut picker = start_picker(&rec, false);

        picker.dispatch(Event::PointerMove { x: 400, y: 300 });
        // Pas de capture synchrone / No synchronous capture
        assert!(rec.borrow().grabs.is_empty());

        picker.dispatch(Event::TickCapture);
        let grab = rec.borrow().grabs[0];
        assert_eq!((grab.x, grab.y, grab.width, grab.height), (390, 290, 21, 21));
        assert_eq!(rec.borrow().moves.last(), Some(&(400 - 240, 330)));
    }

    #[test]
    fn test_magnifier_moves_only_when_placement_changes() {
        let rec = record([1, 2, 3]);
        let mut picker = start_picker(&rec, false);

        picker.dispatch(Event::PointerMove { x: 400, y: 300 });
        picker.dispatch(Event::TickCapture);
        let moves = rec.borrow().moves.len();

        picker.dispatch(Event::TickCapture);
        assert_eq!(rec.borrow().moves.len(), moves);

        picker.dispatch(Event::PointerMove { x: 410, y: 300 });
        picker.dispatch(Event::TickCapture);
        assert_eq!(rec.borrow().moves.len(), moves + 1);
    }

    #[test]
    fn test_capture_near_edge_is_clamped() {
        let rec = record([1, 2, 3]);
        let mut picker = start_picker(&rec, false);

        picker.dispatch(Event::PointerMove { x: 2, y: 1079 });
        picker.dispatch(Event::TickCapture);
        let grab = rec.borrow().grabs[0];
        assert_eq!((grab.x, grab.y), (0, 1059));
    }

    #[test]
    fn test_capture_failure_keeps_previous_sample() {
        let rec = record([10, 20, 30]);
        let mut picker = start_picker(&rec, false);

        picker.dispatch(Event::TickCapture);
        let presents = rec.borrow().presents.len();

        {
            let mut r = rec.borrow_mut();
            r.fail_capture = true;
            r.screen_color = [200, 200, 200];
        }
        picker.dispatch(Event::TickCapture);

        assert_eq!(picker.color().rgb(), [10, 20, 30]);
        assert_eq!(rec.borrow().presents.len(), presents);
        assert_eq!(picker.phase(), Phase::Active);
    }

    #[test]
    fn test_magnifier_receives_frame_and_color() {
        let rec = record([58, 127, 189]);
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::TickCapture);

        let rec = rec.borrow();
        let view = rec.presents.last().unwrap();
        assert_eq!(view.texts[0].text, "#3A7FBD");
        assert_eq!(view.canvas.pixel(55, 55), Some([58, 127, 189]));
    }

    #[test]
    fn test_escape_cancels_without_copying() {
        let rec = record([58, 127, 189]);
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::TickCapture);
        picker.dispatch(Event::KeyUp(Key::Escape));

        assert_eq!(picker.phase(), Phase::Closed);
        assert!(rec.borrow().clipboard.is_empty());
        assert!(rec.borrow().notifications.is_empty());
    }

    #[test]
    fn test_secondary_click_cancels() {
        let rec = record([58, 127, 189]);
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::PointerUp(MouseButton::Other(2)));
        assert_eq!(picker.phase(), Phase::Active);

        picker.dispatch(Event::PointerUp(MouseButton::Secondary));
        assert_eq!(picker.phase(), Phase::Closed);
        assert!(rec.borrow().clipboard.is_empty());
    }

    #[test]
    fn test_any_key_release_commits_without_key_hold() {
        let rec = record([0, 150, 255]);
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::TickCapture);
        picker.dispatch(Event::KeyUp(Key::Other(0x63)));

        assert_eq!(rec.borrow().clipboard, vec!["#0096FF".to_string()]);
        assert!(picker.is_closed());
    }

    #[test]
    fn test_held_shortcut_release_commits() {
        let rec = record([0, 150, 255]);
        let mut picker = start_picker(&rec, true);
        picker.dispatch(Event::TickCapture);

        // Les relâchements ordinaires sont ignorés / Plain releases are ignored
        picker.dispatch(Event::KeyUp(Key::Other(0x61)));
        assert_eq!(picker.phase(), Phase::Active);

        rec.borrow_mut().combo = vec![
            [true, true, false],
            [true, true, true],
            [true, true, true],
            [true, false, true],
        ];
        for _ in 0..3 {
            picker.dispatch(Event::TickKeyPoll);
            assert_eq!(picker.phase(), Phase::Active);
        }
        picker.dispatch(Event::TickKeyPoll);

        assert!(picker.is_closed());
        assert_eq!(rec.borrow().clipboard, vec!["#0096FF".to_string()]);
        assert!(rec.borrow().key_hold_released);
    }

    #[test]
    fn test_partial_combo_never_commits() {
        let rec = record([0, 0, 0]);
        let mut picker = start_picker(&rec, true);
        rec.borrow_mut().combo = vec![[true, false, false], [false, false, false], [true, true, false]];
        for _ in 0..4 {
            picker.dispatch(Event::TickKeyPoll);
        }
        assert_eq!(picker.phase(), Phase::Active);
    }

    #[test]
    fn test_escape_still_cancels_with_key_hold() {
        let rec = record([0, 0, 0]);
        let mut picker = start_picker(&rec, true);
        picker.dispatch(Event::KeyUp(Key::Escape));
        assert!(picker.is_closed());
        assert!(rec.borrow().clipboard.is_empty());
    }

    #[test]
    fn test_clipboard_failure_still_closes_without_notification() {
        let rec = record([58, 127, 189]);
        rec.borrow_mut().clipboard_fails = true;
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::TickCapture);
        picker.dispatch(Event::PointerUp(MouseButton::Primary));

        assert!(picker.is_closed());
        assert!(rec.borrow().notifications.is_empty());
    }

    #[test]
    fn test_notification_failure_is_swallowed() {
        let rec = record([58, 127, 189]);
        rec.borrow_mut().notify_fails = true;
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::TickCapture);
        picker.dispatch(Event::PointerUp(MouseButton::Primary));

        assert!(picker.is_closed());
        assert_eq!(rec.borrow().clipboard, vec!["#3A7FBD".to_string()]);
    }

    #[test]
    fn test_close_is_idempotent_and_releases_everything() {
        let rec = record([1, 1, 1]);
        let mut picker = start_picker(&rec, false);
        picker.dispatch(Event::TickCapture);
        assert_eq!(rec.borrow().connects, 1);

        picker.close();
        picker.close();
        assert_eq!(rec.borrow().magnifier_closes, 1);
        assert_eq!(rec.borrow().overlay_closes, 1);
        assert_eq!(picker.next_deadline(), None);

        // Les événements après fermeture sont ignorés
        // Events after close are ignored
        picker.dispatch(Event::TickCapture);
        picker.dispatch(Event::PointerUp(MouseButton::Primary));
        assert_eq!(rec.borrow().grabs.len(), 1);
        assert!(rec.borrow().clipboard.is_empty());
    }

    #[test]
    fn test_timers_fire_on_schedule() {
        let rec = record([0, 0, 0]);
        let t0 = Instant::now();
        let parts = PickerParts {
            capture: RegionCapture::new({
                let rec = Rc::clone(&rec);
                move || Ok(Box::new(FakeScreen(Rc::clone(&rec))) as Box<dyn CaptureBackend>)
            }),
            magnifier: Box::new(FakeMagnifier(Rc::clone(&rec))),
            overlay: Box::new(FakeOverlay(Rc::clone(&rec))),
            clipboard: Box::new(FakeClipboard(Rc::clone(&rec))),
            notifier: Box::new(FakeNotifier(Rc::clone(&rec))),
            key_hold: Box::new(FakeKeyHold(Rc::clone(&rec))),
        };
        let mut picker = PickerOverlay::start(parts, FULL_HD, t0).unwrap();

        assert_eq!(picker.next_deadline(), Some(t0 + CAPTURE_INTERVAL));
        assert!(picker.due_events(t0 + Duration::from_millis(10)).is_empty());
        assert_eq!(
            picker.due_events(t0 + Duration::from_millis(30)),
            vec![Event::TickCapture]
        );
        assert_eq!(
            picker.due_events(t0 + Duration::from_millis(50)),
            vec![Event::TickKeyPoll]
        );
        assert_eq!(
            picker.due_events(t0 + Duration::from_millis(60)),
            vec![Event::TickCapture]
        );
    }

    #[test]
    fn test_key_poll_timer_off_without_key_hold() {
        let rec = record([0, 0, 0]);
        let mut picker = start_picker(&rec, false);
        let later = Instant::now() + Duration::from_millis(200);
        assert_eq!(picker.due_events(later), vec![Event::TickCapture]);
    }

    #[test]
    fn test_ticker_skips_missed_periods() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(30));
        ticker.start(t0);
        assert!(ticker.poll(t0 + Duration::from_millis(200)));
        assert!(!ticker.poll(t0 + Duration::from_millis(210)));
        assert!(ticker.poll(t0 + Duration::from_millis(230)));
        ticker.stop();
        assert!(!ticker.is_running());
    }
}
