//! =============================================================================
//! CAPTURE.RS - Capture d'une région de l'écran
//! CAPTURE.RS - Screen region capture
//! =============================================================================
//!
//! The requested rectangle is clamped inside the screen before it reaches the
//! display server, so a capture never reads outside the root window. Near the
//! edges the sampled window shifts instead of shrinking.
//!
//! The display connection is opened on first use and kept until `release`.
//! It lives on a worker thread so a hung display server costs one skipped
//! tick instead of a frozen event loop.

use crate::errors::CaptureError;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// TYPES
// =============================================================================

/// Dimensions de l'écran en pixels
/// Screen dimensions in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.width / 2, self.height / 2)
    }
}

/// Rectangle effectivement capturé (déjà borné à l'écran)
/// Rectangle actually captured (already clamped to the screen)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Image capturée: `width × height` triplets RGB en ordre ligne par ligne
/// Captured image: `width × height` RGB triples in row-major order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl PixelBuffer {
    /// Returns `None` when `pixels` does not hold exactly `width × height` entries
    #[cfg(test)]
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image unie / Solid image
    #[cfg(test)]
    pub fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgb; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Couleur du pixel central / Color of the center pixel
    pub fn center(&self) -> Option<[u8; 3]> {
        let (cx, cy) = center_index(self.width, self.height);
        self.pixel(cx, cy)
    }
}

/// Index (0-based) of the center pixel of a `width × height` capture
#[inline]
pub fn center_index(width: usize, height: usize) -> (usize, usize) {
    (width / 2, height / 2)
}

// =============================================================================
// BORNAGE
// CLAMPING
// =============================================================================

/// Borne le rectangle demandé à l'écran
/// Clamps the requested rectangle to the screen
///
/// Origin first (`x' = clamp(x, 0, screen_w - w)`), then size
/// (`w' = clamp(w, 1, screen_w - x')`); same for the vertical axis.
pub fn clamp_rect(x: i32, y: i32, width: i32, height: i32, screen: ScreenSize) -> CaptureRect {
    let x = x.min(screen.width - width).max(0);
    let y = y.min(screen.height - height).max(0);
    let width = width.min(screen.width - x).max(1);
    let height = height.min(screen.height - y).max(1);
    CaptureRect {
        x,
        y,
        width,
        height,
    }
}

// =============================================================================
// CODEC BGRX
// BGRX CODEC
// =============================================================================

/// Décode des pixels 32 bits BGRX (ordre des octets LSB first) en RGB
/// Decodes 32-bit BGRX pixels (LSB-first byte order) to RGB
///
/// X servers return this layout for depth 24 and depth 32 ZPixmap images.
pub fn decode_bgrx(data: &[u8], width: usize, height: usize) -> Result<PixelBuffer, CaptureError> {
    let expected = width * height * 4;
    if data.len() < expected {
        return Err(CaptureError::ShortImage {
            expected,
            actual: data.len(),
        });
    }

    let pixels = data[..expected]
        .chunks_exact(4)
        .map(|px| [px[2], px[1], px[0]])
        .collect();
    Ok(PixelBuffer {
        width,
        height,
        pixels,
    })
}

/// Encode des pixels RGB en BGRX pour PutImage
/// Encodes RGB pixels to BGRX for PutImage
pub fn encode_bgrx(pixels: &[[u8; 3]]) -> Vec<u8> {
    pixels
        .iter()
        .flat_map(|&[r, g, b]| [b, g, r, 0])
        .collect()
}

// =============================================================================
// CONNEXION DE CAPTURE
// CAPTURE CONNECTION
// =============================================================================

/// Source de pixels de l'écran (une connexion au serveur d'affichage)
/// Screen pixel source (one display server connection)
pub trait CaptureBackend {
    fn screen_size(&self) -> ScreenSize;

    /// Reads `rect`, which the caller has already clamped to `screen_size()`
    fn grab(&mut self, rect: CaptureRect) -> Result<PixelBuffer, CaptureError>;
}

type Connector = Box<dyn FnMut() -> Result<Box<dyn CaptureBackend>, CaptureError>>;

/// Capture de région avec connexion paresseuse et persistante
/// Region capture with a lazy, persistent connection
pub struct RegionCapture {
    connect: Connector,
    handle: Option<Box<dyn CaptureBackend>>,
}

impl RegionCapture {
    pub fn new<F>(connect: F) -> Self
    where
        F: FnMut() -> Result<Box<dyn CaptureBackend>, CaptureError> + 'static,
    {
        Self {
            connect: Box::new(connect),
            handle: None,
        }
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Ouvre la connexion au premier appel puis la réutilise
    /// Opens the connection on first call, then reuses it
    fn handle(&mut self) -> Result<&mut dyn CaptureBackend, CaptureError> {
        let backend = match self.handle.take() {
            Some(backend) => backend,
            None => {
                debug!("opening capture connection");
                (self.connect)()?
            }
        };
        Ok(&mut **self.handle.insert(backend))
    }

    /// Capture `width × height` pixels at `(x, y)`, clamped to the screen
    pub fn capture_region(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<PixelBuffer, CaptureError> {
        if width < 1 || height < 1 {
            return Err(CaptureError::RegionTooSmall { width, height });
        }

        let backend = self.handle()?;
        let screen = backend.screen_size();
        if screen.width < 1 || screen.height < 1 {
            return Err(CaptureError::RegionTooSmall {
                width: screen.width,
                height: screen.height,
            });
        }

        let rect = clamp_rect(x, y, width, height, screen);
        let frame = backend.grab(rect)?;
        if frame.width() != rect.width as usize || frame.height() != rect.height as usize {
            return Err(CaptureError::ShortImage {
                expected: rect.width as usize * rect.height as usize,
                actual: frame.pixels().len(),
            });
        }
        Ok(frame)
    }

    /// Ferme la connexion; la prochaine capture la rouvrira
    /// Drops the connection; the next capture reopens it
    pub fn release(&mut self) {
        if self.handle.take().is_some() {
            debug!("capture connection released");
        }
    }
}

// =============================================================================
// CAPTURE BORNÉE
// BOUNDED CAPTURE
// =============================================================================

/// Réponse du thread de capture / Capture thread reply
type Reply = Result<PixelBuffer, CaptureError>;

/// Backend exécuté sur un thread dédié, chaque appel borné par `timeout`
/// Backend run on a dedicated thread, every call bounded by `timeout`
///
/// A grab that misses the deadline fails with `DisplayUnavailable`; until the
/// late reply shows up, later grabs fail immediately without queueing more
/// requests. The worker owns the backend and exits when this handle drops.
pub struct BoundedCapture {
    screen: ScreenSize,
    requests: Sender<CaptureRect>,
    replies: Receiver<Reply>,
    timeout: Duration,
    stalled: bool,
}

impl BoundedCapture {
    /// Opens the backend with `connect` on the worker thread
    pub fn spawn<B, F>(connect: F, timeout: Duration) -> Result<Self, CaptureError>
    where
        B: CaptureBackend + 'static,
        F: FnOnce() -> Result<B, CaptureError> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<CaptureRect>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<ScreenSize, CaptureError>>();

        thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let mut backend = match connect() {
                    Ok(backend) => backend,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(backend.screen_size())).is_err() {
                    return;
                }
                for rect in request_rx {
                    if reply_tx.send(backend.grab(rect)).is_err() {
                        break;
                    }
                }
                debug!("capture worker stopped");
            })
            .map_err(|err| CaptureError::DisplayUnavailable(err.to_string()))?;

        let screen = match ready_rx.recv_timeout(timeout) {
            Ok(ready) => ready?,
            Err(RecvTimeoutError::Timeout) => {
                return Err(timed_out("connection", timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CaptureError::DisplayUnavailable("capture worker stopped".into()));
            }
        };

        Ok(Self {
            screen,
            requests: request_tx,
            replies: reply_rx,
            timeout,
            stalled: false,
        })
    }
}

fn timed_out(what: &str, timeout: Duration) -> CaptureError {
    CaptureError::DisplayUnavailable(format!(
        "capture {what} timed out after {} ms",
        timeout.as_millis()
    ))
}

impl CaptureBackend for BoundedCapture {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn grab(&mut self, rect: CaptureRect) -> Result<PixelBuffer, CaptureError> {
        // Réponse en retard: la jeter avant une nouvelle requête
        // Late reply: discard it before a new request
        if self.stalled {
            match self.replies.try_recv() {
                Ok(_) => {
                    debug!("late capture reply discarded");
                    self.stalled = false;
                }
                Err(TryRecvError::Empty) => {
                    return Err(CaptureError::DisplayUnavailable(
                        "display still not answering".into(),
                    ));
                }
                Err(TryRecvError::Disconnected) => {
                    return Err(CaptureError::DisplayUnavailable("capture worker stopped".into()));
                }
            }
        }

        self.requests
            .send(rect)
            .map_err(|_| CaptureError::DisplayUnavailable("capture worker stopped".into()))?;

        match self.replies.recv_timeout(self.timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "display not answering");
                self.stalled = true;
                Err(timed_out("request", self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(CaptureError::DisplayUnavailable("capture worker stopped".into()))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
