//! =============================================================================
//! LINUX.RS - Implémentation X11 du picker
//! LINUX.RS - X11 implementation of the picker
//! =============================================================================
//!
//! Built on the pure Rust X11 protocol bindings (`x11rb`):
//! - GetImage on the root window for screen capture (own connection, on the
//!   capture worker thread, every reply bounded by `CAPTURE_TIMEOUT`)
//! - InputOnly override-redirect window + pointer/keyboard grabs for the overlay
//! - InputOutput override-redirect window, PutImage and ImageText8 for the magnifier
//! - QueryKeymap for the held shortcut
//!
//! The event loop runs on the main thread: drain X events, fire due timers,
//! sleep until the next deadline.
//!
//! While Super+Shift+C is present in the keymap the held-shortcut mode is
//! active: releasing the shortcut commits, other key releases are ignored
//! (Escape still cancels). Otherwise any key release commits.

use crate::capture::{
    decode_bgrx, encode_bgrx, BoundedCapture, CaptureBackend, CaptureRect, PixelBuffer,
    RegionCapture, ScreenSize,
};
use crate::clipboard::{NotifySend, Xclip};
use crate::config::{
    CAPTURE_TIMEOUT, HEX_FONTS, HOLD_COMBO, KEYBOARD_GRAB_ATTEMPTS, KEYBOARD_GRAB_RETRY,
    KEYSYM_ESCAPE, MAX_EVENT_WAIT, RGB_FONTS,
};
use crate::errors::{CaptureError, LaunchError, SurfaceError};
use crate::magnifier::{MagnifierSurface, RenderedView, TextStyle, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::overlay::{
    Event, Key, KeyHoldObserver, KeyHoldUnavailable, MouseButton, OverlaySurface, PickerOverlay,
    PickerParts,
};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{
    ChangeGCAux, ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask,
    GrabMode, GrabStatus, ImageFormat, ImageOrder, Setup, StackMode, WindowClass,
};
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME, NONE};

/// Glyphe réticule de la police curseur / Crosshair glyph of the cursor font
const XC_CROSSHAIR: u16 = 34;

/// PutImage request header, in bytes
const PUT_IMAGE_HEADER: usize = 24;

/// Set by SIGINT/SIGTERM/SIGHUP, polled by the event loop
static STOP: AtomicBool = AtomicBool::new(false);

// =============================================================================
// CONVERSIONS D'ERREURS
// ERROR CONVERSIONS
// =============================================================================

impl From<ConnectError> for CaptureError {
    fn from(err: ConnectError) -> Self {
        CaptureError::DisplayUnavailable(err.to_string())
    }
}

impl From<ConnectionError> for CaptureError {
    fn from(err: ConnectionError) -> Self {
        CaptureError::DisplayUnavailable(err.to_string())
    }
}

impl From<ReplyError> for CaptureError {
    fn from(err: ReplyError) -> Self {
        CaptureError::Request(err.to_string())
    }
}

impl From<ConnectionError> for SurfaceError {
    fn from(err: ConnectionError) -> Self {
        SurfaceError::Request(err.to_string())
    }
}

impl From<ReplyError> for SurfaceError {
    fn from(err: ReplyError) -> Self {
        SurfaceError::Request(err.to_string())
    }
}

impl From<ReplyOrIdError> for SurfaceError {
    fn from(err: ReplyOrIdError) -> Self {
        SurfaceError::Request(err.to_string())
    }
}

impl From<ConnectError> for LaunchError {
    fn from(err: ConnectError) -> Self {
        LaunchError::Display(err.to_string())
    }
}

impl From<ConnectionError> for LaunchError {
    fn from(err: ConnectionError) -> Self {
        LaunchError::Display(err.to_string())
    }
}

impl From<ReplyError> for LaunchError {
    fn from(err: ReplyError) -> Self {
        LaunchError::Display(err.to_string())
    }
}

// =============================================================================
// ÉCRAN ET FORMAT DES PIXELS
// SCREEN AND PIXEL FORMAT
// =============================================================================

/// Propriétés de la fenêtre racine / Root window properties
#[derive(Clone, Copy, Debug)]
struct RootInfo {
    root: u32,
    depth: u8,
    visual: u32,
    black_pixel: u32,
    width: u16,
    height: u16,
}

impl RootInfo {
    fn of(conn: &RustConnection, screen_num: usize) -> Result<Self, LaunchError> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| LaunchError::Display(format!("no screen {screen_num}")))?;
        Ok(Self {
            root: screen.root,
            depth: screen.root_depth,
            visual: screen.root_visual,
            black_pixel: screen.black_pixel,
            width: screen.width_in_pixels,
            height: screen.height_in_pixels,
        })
    }

    fn size(&self) -> ScreenSize {
        ScreenSize::new(self.width.into(), self.height.into())
    }
}

/// Vérifie que les images ZPixmap de cette profondeur sont en BGRX 32 bits
/// Checks that ZPixmap images of this depth are 32-bit BGRX
fn check_bgrx_format(setup: &Setup, depth: u8) -> Result<(), CaptureError> {
    let bits_per_pixel = setup
        .pixmap_formats
        .iter()
        .find(|format| format.depth == depth)
        .map_or(0, |format| format.bits_per_pixel);

    if depth < 24 || bits_per_pixel != 32 || setup.image_byte_order != ImageOrder::LSB_FIRST {
        return Err(CaptureError::CodecMismatch {
            depth,
            bits_per_pixel,
        });
    }
    Ok(())
}

/// Valeur de pixel TrueColor 24 bits / 24-bit TrueColor pixel value
fn pixel_value([r, g, b]: [u8; 3]) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

// =============================================================================
// CAPTURE
// =============================================================================

/// Connexion dédiée à la capture (GetImage sur la racine)
/// Dedicated capture connection (GetImage on the root)
pub struct X11Capture {
    conn: RustConnection,
    root: u32,
    screen: ScreenSize,
}

impl X11Capture {
    /// Ouvre la connexion de capture / Opens the capture connection
    pub fn open() -> Result<Self, CaptureError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let screen = conn.setup().roots.get(screen_num).ok_or_else(|| {
            CaptureError::DisplayUnavailable(format!("no screen {screen_num}"))
        })?;
        let root = screen.root;
        let depth = screen.root_depth;
        let size = ScreenSize::new(screen.width_in_pixels.into(), screen.height_in_pixels.into());

        check_bgrx_format(conn.setup(), depth)?;
        debug!(width = size.width, height = size.height, depth, "capture connection ready");

        Ok(Self {
            conn,
            root,
            screen: size,
        })
    }
}

impl CaptureBackend for X11Capture {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn grab(&mut self, rect: CaptureRect) -> Result<PixelBuffer, CaptureError> {
        let reply = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                self.root,
                rect.x as i16,
                rect.y as i16,
                rect.width as u16,
                rect.height as u16,
                !0,
            )?
            .reply()?;
        decode_bgrx(&reply.data, rect.width as usize, rect.height as usize)
    }
}

// =============================================================================
// OVERLAY
// =============================================================================

/// Fenêtre plein écran invisible qui capture les entrées
/// Invisible fullscreen window capturing input
struct X11Overlay {
    conn: Rc<RustConnection>,
    window: u32,
    cursor: u32,
    closed: bool,
}

impl X11Overlay {
    fn create(conn: Rc<RustConnection>, root: RootInfo) -> Result<Self, SurfaceError> {
        let cursor = crosshair_cursor(&conn)?;
        let window = conn.generate_id()?;
        let aux = CreateWindowAux::new()
            .override_redirect(1u32)
            .cursor(cursor)
            .event_mask(
                EventMask::POINTER_MOTION
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::KEY_PRESS
                    | EventMask::KEY_RELEASE,
            );
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root.root,
            0,
            0,
            root.width,
            root.height,
            0,
            WindowClass::INPUT_ONLY,
            COPY_FROM_PARENT,
            &aux,
        )?;

        Ok(Self {
            conn,
            window,
            cursor,
            closed: false,
        })
    }

    /// Grabs pointer and keyboard, retrying while another client holds them
    fn grab_input(&self) -> Result<(), SurfaceError> {
        let mut pointer = false;
        let mut keyboard = false;

        for attempt in 0..KEYBOARD_GRAB_ATTEMPTS {
            if !pointer {
                let reply = self
                    .conn
                    .grab_pointer(
                        false,
                        self.window,
                        EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                        NONE,
                        self.cursor,
                        CURRENT_TIME,
                    )?
                    .reply()?;
                pointer = reply.status == GrabStatus::SUCCESS;
            }
            if !keyboard {
                let reply = self
                    .conn
                    .grab_keyboard(false, self.window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
                    .reply()?;
                keyboard = reply.status == GrabStatus::SUCCESS;
            }
            if pointer && keyboard {
                debug!(attempt, "input grabbed");
                return Ok(());
            }
            thread::sleep(KEYBOARD_GRAB_RETRY);
        }

        warn!(pointer, keyboard, "input grab incomplete");
        Ok(())
    }
}

impl OverlaySurface for X11Overlay {
    fn show(&mut self) -> Result<(), SurfaceError> {
        self.conn.map_window(self.window)?;
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.flush()?;
        self.grab_input()
    }

    fn close(&mut self) -> Result<(), SurfaceError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        self.conn.destroy_window(self.window)?;
        self.conn.free_cursor(self.cursor)?;
        self.conn.flush()?;
        Ok(())
    }
}

/// Curseur en croix de la police "cursor" / Crosshair cursor from the "cursor" font
fn crosshair_cursor(conn: &RustConnection) -> Result<u32, SurfaceError> {
    let font = conn.generate_id()?;
    conn.open_font(font, b"cursor")?;
    let cursor = conn.generate_id()?;
    conn.create_glyph_cursor(
        cursor,
        font,
        font,
        XC_CROSSHAIR,
        XC_CROSSHAIR + 1,
        0,
        0,
        0,
        0xffff,
        0xffff,
        0xffff,
    )?;
    conn.close_font(font)?;
    Ok(cursor)
}

// =============================================================================
// LOUPE
// MAGNIFIER
// =============================================================================

/// Fenêtre flottante de la loupe / Floating magnifier window
struct X11Magnifier {
    conn: Rc<RustConnection>,
    window: u32,
    gc: u32,
    hex_font: u32,
    rgb_font: u32,
    depth: u8,
    closed: bool,
}

impl X11Magnifier {
    fn create(conn: Rc<RustConnection>, root: RootInfo) -> Result<Self, SurfaceError> {
        let window = conn.generate_id()?;
        let aux = CreateWindowAux::new()
            .override_redirect(1u32)
            .background_pixel(root.black_pixel)
            .event_mask(EventMask::EXPOSURE);
        conn.create_window(
            root.depth,
            window,
            root.root,
            0,
            0,
            WINDOW_WIDTH as u16,
            WINDOW_HEIGHT as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            root.visual,
            &aux,
        )?;

        let hex_font = open_first_font(&conn, HEX_FONTS)?;
        let rgb_font = open_first_font(&conn, RGB_FONTS)?;

        let gc = conn.generate_id()?;
        conn.create_gc(
            gc,
            window,
            &CreateGCAux::new().graphics_exposures(0u32).font(rgb_font),
        )?;

        Ok(Self {
            conn,
            window,
            gc,
            hex_font,
            rgb_font,
            depth: root.depth,
            closed: false,
        })
    }

    fn font_for(&self, style: TextStyle) -> u32 {
        match style {
            TextStyle::Hex => self.hex_font,
            TextStyle::Rgb => self.rgb_font,
        }
    }
}

impl MagnifierSurface for X11Magnifier {
    fn show(&mut self) -> Result<(), SurfaceError> {
        self.conn.map_window(self.window)?;
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), SurfaceError> {
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().x(x).y(y).stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn present(&mut self, view: &RenderedView) -> Result<(), SurfaceError> {
        if self.closed {
            return Ok(());
        }
        let canvas = &view.canvas;
        let width = canvas.width();

        // Envoi par bandes sous la taille maximale d'une requête
        // Sent in bands below the maximum request size
        let band = band_rows(self.conn.maximum_request_bytes(), width);

        let mut y = 0;
        while y < canvas.height() {
            let rows = band.min(canvas.height() - y);
            let data = encode_bgrx(canvas.rows(y, rows));
            self.conn.put_image(
                ImageFormat::Z_PIXMAP,
                self.window,
                self.gc,
                width as u16,
                rows as u16,
                0,
                y as i16,
                0,
                self.depth,
                &data,
            )?;
            y += rows;
        }

        let foreground = pixel_value(view.text_color);
        let background = pixel_value(view.text_background);
        for text in &view.texts {
            self.conn.change_gc(
                self.gc,
                &ChangeGCAux::new()
                    .font(self.font_for(text.style))
                    .foreground(foreground)
                    .background(background),
            )?;
            self.conn.image_text8(
                self.window,
                self.gc,
                text.x as i16,
                text.y as i16,
                text.text.as_bytes(),
            )?;
        }

        self.conn.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SurfaceError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.conn.free_gc(self.gc)?;
        self.conn.close_font(self.hex_font)?;
        self.conn.close_font(self.rgb_font)?;
        self.conn.destroy_window(self.window)?;
        self.conn.flush()?;
        Ok(())
    }
}

/// Rows of `width` BGRX pixels that fit in one PutImage request, at least one
fn band_rows(maximum_request_bytes: usize, width: i32) -> i32 {
    let row_bytes = (width.max(1) as usize) * 4;
    let budget = maximum_request_bytes.saturating_sub(PUT_IMAGE_HEADER);
    i32::try_from(budget / row_bytes).unwrap_or(i32::MAX).max(1)
}

/// Ouvre la première police disponible / Opens the first available font
fn open_first_font(
    conn: &RustConnection,
    names: &'static [&'static str],
) -> Result<u32, SurfaceError> {
    for &name in names {
        let font = conn.generate_id()?;
        match conn.open_font(font, name.as_bytes())?.check() {
            Ok(()) => {
                debug!(font = name, "font opened");
                return Ok(font);
            }
            Err(ReplyError::X11Error(err)) => {
                debug!(font = name, kind = ?err.error_kind, "font unavailable");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(SurfaceError::NoFont(names))
}

// =============================================================================
// CLAVIER
// KEYBOARD
// =============================================================================

/// Table keycode → keysyms du serveur / Server keycode → keysyms table
#[derive(Debug)]
struct Keymap {
    min_keycode: u8,
    per_keycode: u8,
    keysyms: Vec<u32>,
}

impl Keymap {
    fn load(conn: &RustConnection) -> Result<Self, ReplyError> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max.saturating_sub(min).saturating_add(1))?
            .reply()?;
        Ok(Self {
            min_keycode: min,
            per_keycode: reply.keysyms_per_keycode,
            keysyms: reply.keysyms,
        })
    }

    /// Keysym sans modificateur / Unshifted keysym
    fn keysym(&self, keycode: u8) -> Option<u32> {
        let offset = keycode.checked_sub(self.min_keycode)? as usize;
        self.keysyms
            .get(offset * self.per_keycode as usize)
            .copied()
            .filter(|&keysym| keysym != 0)
    }

    /// Every keycode producing one of `keysyms` at any level
    fn keycodes_for(&self, keysyms: &[u32]) -> Vec<u8> {
        let per = self.per_keycode.max(1) as usize;
        self.keysyms
            .chunks(per)
            .enumerate()
            .filter(|(_, levels)| levels.iter().any(|sym| keysyms.contains(sym)))
            .filter_map(|(offset, _)| u8::try_from(offset + self.min_keycode as usize).ok())
            .collect()
    }

    fn key(&self, keycode: u8) -> Key {
        match self.keysym(keycode) {
            Some(KEYSYM_ESCAPE) => Key::Escape,
            Some(keysym) => Key::Other(keysym),
            None => Key::Other(0),
        }
    }
}

/// Raccourci observé par QueryKeymap / Shortcut observed through QueryKeymap
struct X11KeyHold {
    conn: Rc<RustConnection>,
    slots: [Vec<u8>; 3],
}

impl X11KeyHold {
    /// `None` when a combo key has no keycode in the current keymap
    fn detect(conn: Rc<RustConnection>, keymap: &Keymap) -> Option<Self> {
        let slots = HOLD_COMBO.map(|keysyms| keymap.keycodes_for(keysyms));
        if slots.iter().any(Vec::is_empty) {
            return None;
        }
        Some(Self { conn, slots })
    }
}

impl KeyHoldObserver for X11KeyHold {
    fn is_available(&self) -> bool {
        true
    }

    fn combo_state(&mut self) -> Option<[bool; 3]> {
        let reply = match self.conn.query_keymap() {
            Ok(cookie) => cookie.reply(),
            Err(err) => Err(err.into()),
        };
        match reply {
            Ok(reply) => Some(combo_down(&reply.keys, &self.slots)),
            Err(err) => {
                debug!(%err, "keymap query failed");
                None
            }
        }
    }
}

/// État de chaque touche du raccourci d'après le bitmap QueryKeymap
/// Down state of each shortcut key from the QueryKeymap bitmap
fn combo_down(keys: &[u8; 32], slots: &[Vec<u8>; 3]) -> [bool; 3] {
    let is_down = |keycode: u8| keys[keycode as usize / 8] & (1 << (keycode % 8)) != 0;
    slots
        .each_ref()
        .map(|slot| slot.iter().any(|&keycode| is_down(keycode)))
}

fn mouse_button(detail: u8) -> MouseButton {
    match detail {
        1 => MouseButton::Primary,
        3 => MouseButton::Secondary,
        other => MouseButton::Other(other),
    }
}

// =============================================================================
// BOUCLE D'ÉVÉNEMENTS
// EVENT LOOP
// =============================================================================

extern "C" fn on_signal(_signal: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int);
    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
        // SAFETY: the handler only stores to an atomic.
        unsafe {
            libc::signal(signal, handler as libc::sighandler_t);
        }
    }
}

/// Événement X traduit / Translated X event
enum Incoming {
    Picker(Event),
    Redraw,
}

fn translate(event: &XEvent, keymap: &Keymap) -> Option<Incoming> {
    match event {
        XEvent::MotionNotify(e) => Some(Incoming::Picker(Event::PointerMove {
            x: e.root_x.into(),
            y: e.root_y.into(),
        })),
        XEvent::ButtonRelease(e) => Some(Incoming::Picker(Event::PointerUp(mouse_button(e.detail)))),
        XEvent::KeyRelease(e) => Some(Incoming::Picker(Event::KeyUp(keymap.key(e.detail)))),
        XEvent::Expose(e) if e.count == 0 => Some(Incoming::Redraw),
        XEvent::Error(err) => {
            warn!(kind = ?err.error_kind, "X11 error");
            None
        }
        _ => None,
    }
}

fn pointer_position(conn: &RustConnection, root: u32) -> Option<(i32, i32)> {
    let reply = conn.query_pointer(root).ok()?.reply().ok()?;
    Some((reply.root_x.into(), reply.root_y.into()))
}

fn event_loop(
    conn: &RustConnection,
    keymap: &Keymap,
    picker: &mut PickerOverlay,
) -> Result<(), LaunchError> {
    while !picker.is_closed() {
        if STOP.load(Ordering::SeqCst) {
            info!("signal received, closing");
            break;
        }

        while let Some(event) = conn.poll_for_event()? {
            match translate(&event, keymap) {
                Some(Incoming::Picker(event)) => picker.dispatch(event),
                Some(Incoming::Redraw) => picker.redraw(),
                None => {}
            }
            if picker.is_closed() {
                return Ok(());
            }
        }

        for event in picker.due_events(Instant::now()) {
            picker.dispatch(event);
        }
        conn.flush()?;

        // Attente jusqu'à la prochaine échéance, bornée
        // Wait until the next deadline, bounded
        let wait = picker.next_deadline().map_or(MAX_EVENT_WAIT, |deadline| {
            deadline
                .saturating_duration_since(Instant::now())
                .min(MAX_EVENT_WAIT)
        });
        thread::sleep(wait);
    }
    Ok(())
}

/// Lance le picker sur Linux (X11) / Runs the picker on Linux (X11)
pub fn run() -> Result<(), LaunchError> {
    install_signal_handlers();

    let (conn, screen_num) = x11rb::connect(None)?;
    let conn = Rc::new(conn);
    let root = RootInfo::of(&conn, screen_num)?;
    check_bgrx_format(conn.setup(), root.depth)
        .map_err(|err| LaunchError::Display(err.to_string()))?;
    info!(width = root.width, height = root.height, depth = root.depth, "display opened");

    let keymap = Keymap::load(&conn)?;
    let key_hold: Box<dyn KeyHoldObserver> = match X11KeyHold::detect(Rc::clone(&conn), &keymap) {
        Some(observer) => Box::new(observer),
        None => {
            info!("shortcut keys missing from the keymap");
            Box::new(KeyHoldUnavailable)
        }
    };

    let parts = PickerParts {
        capture: RegionCapture::new(|| {
            let bounded = BoundedCapture::spawn(X11Capture::open, CAPTURE_TIMEOUT)?;
            Ok(Box::new(bounded) as Box<dyn CaptureBackend>)
        }),
        overlay: Box::new(X11Overlay::create(Rc::clone(&conn), root)?),
        magnifier: Box::new(X11Magnifier::create(Rc::clone(&conn), root)?),
        clipboard: Box::new(Xclip::default()),
        notifier: Box::new(NotifySend),
        key_hold,
    };

    let mut picker = PickerOverlay::start(parts, root.size(), Instant::now())?;
    if let Some((x, y)) = pointer_position(&conn, root.root) {
        picker.dispatch(Event::PointerMove { x, y });
    }

    let result = event_loop(&conn, &keymap, &mut picker);
    debug!(
        phase = ?picker.phase(),
        cursor = ?picker.cursor(),
        color = %picker.color().hex,
        "event loop finished"
    );
    picker.close();
    if let Err(err) = conn.flush() {
        debug!(%err, "final flush failed");
    }
    result
}

// =============================================================================
// TESTS
// =============================================================================
