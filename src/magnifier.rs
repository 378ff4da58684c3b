//! =============================================================================
//! MAGNIFIER.RS - Loupe affichant la zone capturée
//! MAGNIFIER.RS - Magnifier showing the captured area
//! =============================================================================
//!
//! La loupe est passive: l'overlay lui pousse l'image et la couleur à chaque tick.
//! The magnifier is passive: the overlay pushes the frame and color every tick.
//!
//! # Layout
//! ```text
//! +-----------------------+  0
//! | 21×21 source at 10x   |
//! | grid + center border  |
//! +-----------------------+  MAGNIFIER_SIZE (210)
//! | [swatch] #RRGGBB      |
//! | R:xxx  G:xxx  B:xxx   |
//! +-----------------------+  MAGNIFIER_SIZE + INFO_PANEL_HEIGHT (290)
//! ```
//!
//! Pixels are rasterized here into a `Canvas`; text is returned as positioned
//! runs that the window surface draws with a monospace server font.

use crate::capture::{center_index, PixelBuffer, ScreenSize};
use crate::common::SampledColor;
use crate::config::{
    DARK_BG, INFO_PANEL_HEIGHT, MAGNIFIER_OFFSET, MAGNIFIER_SIZE, SUBTLE_GRID, SWATCH_MARGIN,
    SWATCH_SIZE, THEME_BLUE, WHITE_TEXT,
};
use crate::errors::SurfaceError;

/// Total window width / Largeur totale de la fenêtre
pub const WINDOW_WIDTH: i32 = MAGNIFIER_SIZE;

/// Total window height, magnified view plus info panel
pub const WINDOW_HEIGHT: i32 = MAGNIFIER_SIZE + INFO_PANEL_HEIGHT;

/// Center border thickness / Épaisseur de la bordure centrale
const HIGHLIGHT_WIDTH: i32 = 2;

/// Dash pattern of the center border, in pixels (on, then off)
const DASH_ON: i32 = 8;
const DASH_OFF: i32 = 4;

// =============================================================================
// PLACEMENT
// =============================================================================

/// Rectangle de la fenêtre de la loupe à l'écran
/// Magnifier window rectangle on screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Positionne la loupe près du curseur avec placement adaptatif
/// Positions the magnifier near the cursor with adaptive placement
///
/// Lower-left of the cursor by default. Flips to the right when that leaves the
/// screen on the left, flips above when it leaves the screen at the bottom, and
/// only then clamps the result inside the screen.
pub fn place_near(
    cursor_x: i32,
    cursor_y: i32,
    width: i32,
    height: i32,
    offset: i32,
    screen: ScreenSize,
) -> PlacementRect {
    // Par défaut: en bas à gauche du curseur / Default: bottom-left of cursor
    let mut x = cursor_x - width - offset;
    let mut y = cursor_y + offset;

    // Bascule du côté opposé si hors écran / Flip to the opposite side if off-screen
    if x < 0 {
        x = cursor_x + offset;
    }
    if y + height > screen.height {
        y = cursor_y - height - offset;
    }

    // Bornage final / Final boundary clamping
    x = x.min(screen.width - width).max(0);
    y = y.min(screen.height - height).max(0);

    PlacementRect {
        x,
        y,
        width,
        height,
    }
}

// =============================================================================
// CANEVAS
// CANVAS
// =============================================================================

/// Tampon RGB opaque de la fenêtre / Opaque RGB window buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: i32,
    height: i32,
    pixels: Vec<[u8; 3]>,
}

impl Canvas {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0]; (width.max(0) * height.max(0)) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    #[cfg(test)]
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Rows `[y, y + rows)` as a slice, for banded uploads
    pub fn rows(&self, y: i32, rows: i32) -> &[[u8; 3]] {
        let start = (y.clamp(0, self.height) * self.width) as usize;
        let end = ((y + rows).clamp(0, self.height) * self.width) as usize;
        &self.pixels[start..end]
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width && y < self.height)
            .then(|| (y * self.width + x) as usize)
    }

    fn put(&mut self, x: i32, y: i32, rgb: [u8; 3]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = rgb;
        }
    }

    /// Mélange une couleur RGBA sur un pixel / Blends an RGBA color over a pixel
    fn blend(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = blend_over(self.pixels[i], rgba);
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, rgba: [u8; 4]) {
        for py in y..y + h {
            for px in x..x + w {
                self.blend(px, py, rgba);
            }
        }
    }

    /// 1px outline covering columns `x..=x + w` and rows `y..=y + h`
    fn stroke_rect(&mut self, x: i32, y: i32, w: i32, h: i32, rgba: [u8; 4]) {
        for px in x..=x + w {
            self.blend(px, y, rgba);
            self.blend(px, y + h, rgba);
        }
        for py in y + 1..y + h {
            self.blend(x, py, rgba);
            self.blend(x + w, py, rgba);
        }
    }
}

/// `src` alpha-composited over an opaque `dst`
#[inline]
pub fn blend_over(dst: [u8; 3], [r, g, b, a]: [u8; 4]) -> [u8; 3] {
    let a = a as u32;
    let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * (255 - a) + 127) / 255) as u8;
    [mix(r, dst[0]), mix(g, dst[1]), mix(b, dst[2])]
}

// =============================================================================
// RENDU
// RENDERING
// =============================================================================

/// Police d'un texte / Font of a text run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextStyle {
    /// Large monospace, bold
    Hex,
    /// Small monospace
    Rgb,
}

/// Texte positionné (y = ligne de base) / Positioned text (y = baseline)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRun {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub style: TextStyle,
}

/// Résultat du rendu: pixels + textes / Render result: pixels + texts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedView {
    pub canvas: Canvas,
    pub texts: Vec<TextRun>,
    /// Opaque panel color behind the texts
    pub text_background: [u8; 3],
    pub text_color: [u8; 3],
}

/// Dessine la loupe complète / Draws the complete magnifier
pub fn render(frame: Option<&PixelBuffer>, color: &SampledColor) -> RenderedView {
    let mut canvas = Canvas::new(WINDOW_WIDTH, WINDOW_HEIGHT);

    if let Some(frame) = frame {
        draw_magnified(&mut canvas, frame);
        draw_grid(&mut canvas, frame);
        draw_center_highlight(&mut canvas, frame);
    }
    let texts = draw_color_info(&mut canvas, color);

    RenderedView {
        canvas,
        texts,
        text_background: blend_over([0, 0, 0], DARK_BG),
        text_color: [WHITE_TEXT[0], WHITE_TEXT[1], WHITE_TEXT[2]],
    }
}

/// Source pixel size on screen: ZOOM_FACTOR for a full 21×21 frame, larger for
/// the smaller frames a clamped capture can return on a tiny screen
fn cell_size(frame: &PixelBuffer) -> (i32, i32) {
    let w = frame.width().max(1) as i32;
    let h = frame.height().max(1) as i32;
    ((MAGNIFIER_SIZE / w).max(1), (MAGNIFIER_SIZE / h).max(1))
}

/// Agrandissement au plus proche voisin (sans interpolation)
/// Nearest-neighbor magnification (no interpolation)
fn draw_magnified(canvas: &mut Canvas, frame: &PixelBuffer) {
    let (cell_w, cell_h) = cell_size(frame);
    for y in 0..MAGNIFIER_SIZE {
        let sy = (y / cell_h) as usize;
        for x in 0..MAGNIFIER_SIZE {
            let sx = (x / cell_w) as usize;
            // Hors de l'image source: fond noir / Outside the source: black
            let rgb = frame.pixel(sx, sy).unwrap_or([0, 0, 0]);
            canvas.put(x, y, rgb);
        }
    }
}

/// Grille de 1px à chaque bord de pixel source
/// 1px grid at every source pixel boundary
fn draw_grid(canvas: &mut Canvas, frame: &PixelBuffer) {
    let (cell_w, cell_h) = cell_size(frame);

    // Lignes verticales / Vertical lines
    for i in 0..=frame.width() as i32 {
        let x = i * cell_w;
        for y in 0..MAGNIFIER_SIZE {
            canvas.blend(x, y, SUBTLE_GRID);
        }
    }

    // Lignes horizontales / Horizontal lines
    for i in 0..=frame.height() as i32 {
        let y = i * cell_h;
        for x in 0..MAGNIFIER_SIZE {
            // Intersections already blended by the vertical pass
            if x % cell_w != 0 {
                canvas.blend(x, y, SUBTLE_GRID);
            }
        }
    }
}

/// Bordure pointillée autour du pixel central
/// Dashed border around the center pixel
fn draw_center_highlight(canvas: &mut Canvas, frame: &PixelBuffer) {
    let (cell_w, cell_h) = cell_size(frame);
    let (cx, cy) = center_index(frame.width(), frame.height());

    // The 2px pen straddles the cell outline: one pixel outside, one on the line
    let left = cx as i32 * cell_w - HIGHLIGHT_WIDTH / 2;
    let top = cy as i32 * cell_h - HIGHLIGHT_WIDTH / 2;
    let right = (cx as i32 + 1) * cell_w + HIGHLIGHT_WIDTH / 2 - 1;
    let bottom = (cy as i32 + 1) * cell_h + HIGHLIGHT_WIDTH / 2 - 1;

    let dashed = |t: i32| t % (DASH_ON + DASH_OFF) < DASH_ON;

    for y in top..=bottom {
        for x in left..=right {
            let on_vertical = x < left + HIGHLIGHT_WIDTH || x > right - HIGHLIGHT_WIDTH;
            let on_horizontal = y < top + HIGHLIGHT_WIDTH || y > bottom - HIGHLIGHT_WIDTH;
            let visible = (on_horizontal && dashed(x - left)) || (on_vertical && dashed(y - top));
            if visible {
                canvas.blend(x, y, THEME_BLUE);
            }
        }
    }
}

/// Panneau d'information: échantillon, code hex, valeurs RGB
/// Info panel: swatch, hex code, RGB values
fn draw_color_info(canvas: &mut Canvas, color: &SampledColor) -> Vec<TextRun> {
    let info_y = MAGNIFIER_SIZE;
    canvas.fill_rect(0, info_y, WINDOW_WIDTH, INFO_PANEL_HEIGHT, DARK_BG);

    // Échantillon de couleur / Color swatch
    let swatch_x = SWATCH_MARGIN;
    let swatch_y = info_y + SWATCH_MARGIN;
    let [r, g, b] = color.rgb();
    canvas.fill_rect(swatch_x, swatch_y, SWATCH_SIZE, SWATCH_SIZE, [r, g, b, 255]);
    canvas.stroke_rect(swatch_x, swatch_y, SWATCH_SIZE, SWATCH_SIZE, WHITE_TEXT);

    vec![
        TextRun {
            x: swatch_x + SWATCH_SIZE + 15,
            y: info_y + 35,
            text: color.hex.clone(),
            style: TextStyle::Hex,
        },
        TextRun {
            x: SWATCH_MARGIN,
            y: info_y + 60,
            text: color.rgb_label(),
            style: TextStyle::Rgb,
        },
    ]
}

// =============================================================================
// SURFACE ET ÉTAT
// SURFACE AND STATE
// =============================================================================

/// Fenêtre flottante qui affiche la loupe
/// Floating window displaying the magnifier
pub trait MagnifierSurface {
    fn show(&mut self) -> Result<(), SurfaceError>;
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), SurfaceError>;
    fn present(&mut self, view: &RenderedView) -> Result<(), SurfaceError>;
    fn close(&mut self) -> Result<(), SurfaceError>;
}

/// État de la loupe: image, couleur, placement
/// Magnifier state: frame, color, placement
pub struct Magnifier {
    surface: Box<dyn MagnifierSurface>,
    screen: ScreenSize,
    frame: Option<PixelBuffer>,
    color: SampledColor,
    placement: Option<PlacementRect>,
    closed: bool,
}

impl Magnifier {
    pub fn new(surface: Box<dyn MagnifierSurface>, screen: ScreenSize) -> Self {
        Self {
            surface,
            screen,
            frame: None,
            color: SampledColor::default(),
            placement: None,
            closed: false,
        }
    }

    pub fn show(&mut self) -> Result<(), SurfaceError> {
        self.surface.show()
    }

    /// Remplace l'image source / Replaces the source frame
    pub fn update_source(&mut self, frame: PixelBuffer) {
        self.frame = Some(frame);
    }

    pub fn set_color(&mut self, color: SampledColor) {
        self.color = color;
    }

    pub fn placement(&self) -> Option<PlacementRect> {
        self.placement
    }

    pub fn view(&self) -> RenderedView {
        render(self.frame.as_ref(), &self.color)
    }

    /// Redessine la fenêtre avec l'état courant / Redraws with the current state
    pub fn repaint(&mut self) -> Result<(), SurfaceError> {
        if self.closed {
            return Ok(());
        }
        let view = self.view();
        self.surface.present(&view)
    }

    /// Déplace la fenêtre près du curseur / Moves the window near the cursor
    pub fn position_near_cursor(&mut self, cursor_x: i32, cursor_y: i32) -> Result<(), SurfaceError> {
        let rect = place_near(
            cursor_x,
            cursor_y,
            WINDOW_WIDTH,
            WINDOW_HEIGHT,
            MAGNIFIER_OFFSET,
            self.screen,
        );
        if self.placement() == Some(rect) || self.closed {
            return Ok(());
        }
        self.placement = Some(rect);
        self.surface.move_to(rect.x, rect.y)
    }

    pub fn close(&mut self) -> Result<(), SurfaceError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.surface.close()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SOURCE_SIZE, ZOOM_FACTOR};

    const FULL_HD: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_window_size() {
        assert_eq!((WINDOW_WIDTH, WINDOW_HEIGHT), (210, 290));
    }

    #[test]
    fn test_default_placement_is_lower_left() {
        let rect = place_near(960, 400, 210, 290, 30, FULL_HD);
        assert_eq!((rect.x, rect.y), (960 - 240, 430));
    }

    #[test]
    fn test_placement_flips_right_then_above() {
        // Gauche négative → à droite; bas coupé → au-dessus
        // Left would be negative → right; bottom clipped → above
        let rect = place_near(5, 1000, 210, 290, 30, FULL_HD);
        assert_eq!(
            rect,
            PlacementRect {
                x: 35,
                y: 680,
                width: 210,
                height: 290
            }
        );
    }

    #[test]
    fn test_placement_clamps_after_flip() {
        // Petit écran: les deux bascules ne suffisent pas
        // Small screen: flipping is not enough
        let screen = ScreenSize::new(300, 320);
        let rect = place_near(150, 160, 210, 290, 30, screen);
        assert_eq!((rect.x, rect.y), (90, 0));
    }

    #[test]
    fn test_placement_bottom_right_corner() {
        let rect = place_near(1919, 1079, 210, 290, 30, FULL_HD);
        assert_eq!((rect.x, rect.y), (1919 - 240, 1079 - 320));
    }

    fn checker_frame() -> PixelBuffer {
        let n = SOURCE_SIZE as usize;
        let pixels = (0..n * n)
            .map(|i| {
                let (x, y) = (i % n, i / n);
                [(x * 10) as u8, (y * 10) as u8, 77]
            })
            .collect();
        PixelBuffer::new(n, n, pixels).unwrap()
    }

    #[test]
    fn test_nearest_neighbor_blocks_are_crisp() {
        let frame = checker_frame();
        let view = render(Some(&frame), &SampledColor::default());

        // Intérieur de chaque bloc = pixel source exact
        // Inside every block = exact source pixel
        for (sx, sy) in [(0, 0), (3, 7), (20, 20), (12, 4)] {
            let expected = frame.pixel(sx, sy).unwrap();
            for (dx, dy) in [(1, 1), (5, 5), (9, 9), (3, 8)] {
                let x = sx as i32 * 10 + dx;
                let y = sy as i32 * 10 + dy;
                assert_eq!(view.canvas.pixel(x, y), Some(expected), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_full_frame_uses_zoom_factor() {
        let frame = PixelBuffer::solid(21, 21, [0, 0, 0]);
        assert_eq!(cell_size(&frame), (ZOOM_FACTOR, ZOOM_FACTOR));
        // Petite capture bornée: blocs plus grands / Small clamped capture: bigger blocks
        let small = PixelBuffer::solid(10, 7, [0, 0, 0]);
        assert_eq!(cell_size(&small), (21, 30));
    }

    #[test]
    fn test_grid_lines_are_blended() {
        let frame = PixelBuffer::solid(21, 21, [0, 0, 0]);
        let view = render(Some(&frame), &SampledColor::default());
        let grid = blend_over([0, 0, 0], SUBTLE_GRID);

        assert_eq!(view.canvas.pixel(30, 55), Some(grid));
        assert_eq!(view.canvas.pixel(55, 30), Some(grid));
        assert_eq!(view.canvas.pixel(30, 30), Some(grid));
        assert_eq!(view.canvas.pixel(35, 55), Some([0, 0, 0]));
    }

    #[test]
    fn test_center_pixel_highlight() {
        let frame = PixelBuffer::solid(21, 21, [0, 0, 0]);
        let view = render(Some(&frame), &SampledColor::default());
        let accent = blend_over([0, 0, 0], THEME_BLUE);

        // Cellule centrale (10, 10) = pixels 100..110
        // Center cell (10, 10) = pixels 100..110
        assert_eq!(view.canvas.pixel(99, 103), Some(accent));
        assert_eq!(view.canvas.pixel(103, 99), Some(accent));
        assert_eq!(view.canvas.pixel(109, 103), Some(accent));
        assert_eq!(view.canvas.pixel(103, 109), Some(accent));
        // L'intérieur reste la couleur source / Inside keeps the source color
        assert_eq!(view.canvas.pixel(105, 105), Some([0, 0, 0]));
        // Pointillés: un trou après 8 pixels / Dashes: a gap after 8 pixels
        assert_ne!(view.canvas.pixel(99, 99 + 9), Some(accent));
    }

    #[test]
    fn test_info_panel_swatch_and_texts() {
        let color = SampledColor::new(58, 127, 189);
        let view = render(None, &color);

        // Intérieur de l'échantillon / Inside the swatch
        assert_eq!(view.canvas.pixel(25, 235), Some([58, 127, 189]));
        // Bordure blanche / White border
        assert_eq!(view.canvas.pixel(10, 235), Some([255, 255, 255]));
        // Fond du panneau / Panel background
        assert_eq!(view.canvas.pixel(150, 280), Some(view.text_background));
        // Pas d'image: vue noire / No frame: black view
        assert_eq!(view.canvas.pixel(50, 50), Some([0, 0, 0]));

        assert_eq!(view.texts.len(), 2);
        assert_eq!(view.texts[0].text, "#3A7FBD");
        assert_eq!(view.texts[0].style, TextStyle::Hex);
        assert_eq!((view.texts[0].x, view.texts[0].y), (55, 245));
        assert_eq!(view.texts[1].text, "R: 58  G:127  B:189");
        assert_eq!(view.texts[1].style, TextStyle::Rgb);
    }

    #[test]
    fn test_canvas_rows() {
        let canvas = Canvas::new(4, 3);
        assert_eq!(canvas.rows(1, 2).len(), 8);
        assert_eq!(canvas.rows(2, 5).len(), 4);
    }
}
