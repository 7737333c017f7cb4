//=========================================================================
// Canvas
//
// The drawing surface a scene paints into. Scene backends only ever see
// the `Canvas` trait, never a concrete device type, so the same artboard
// code draws into a software pixmap or a GPU-uploaded frame.
//
// Coordinates passed to the fill methods are in the space established by
// the current transform (artboard space while a scene is drawing).
//
//=========================================================================

//=== External Crates =====================================================

use kurbo::{Affine, Rect};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

//=== Color ===============================================================

/// Packed `0xAARRGGBB` colour, the same layout view-model colour
/// properties use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const BLACK: Color = Color(0xff00_0000);
    pub const WHITE: Color = Color(0xffff_ffff);

    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    pub const fn argb(self) -> u32 {
        self.0
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.red(), self.green(), self.blue(), self.alpha())
    }
}

impl From<u32> for Color {
    fn from(argb: u32) -> Self {
        Self(argb)
    }
}

//=== Canvas Trait ========================================================

/// Minimal immediate-mode drawing interface.
///
/// Mirrors the save / transform / draw / restore pattern vector renderers
/// use: callers push a transform, draw in the transformed space, and pop.
pub trait Canvas {
    /// Pixel size of the target.
    fn size(&self) -> (u32, u32);

    /// Fills the whole target, ignoring the current transform.
    fn clear(&mut self, color: Color);

    /// Pushes the current transform.
    fn save(&mut self);

    /// Pops the transform pushed by the matching [`Canvas::save`].
    fn restore(&mut self);

    /// Post-multiplies `transform` onto the current transform.
    fn transform(&mut self, transform: Affine);

    /// Current transform (target space ← drawing space).
    fn current_transform(&self) -> Affine;

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn fill_ellipse(&mut self, bounds: Rect, color: Color);
}

//=== PixmapCanvas ========================================================

/// [`Canvas`] over a tiny-skia pixmap.
pub struct PixmapCanvas<'a> {
    pixmap: &'a mut Pixmap,
    current: Affine,
    stack: Vec<Affine>,
}

impl<'a> PixmapCanvas<'a> {
    pub fn new(pixmap: &'a mut Pixmap) -> Self {
        Self {
            pixmap,
            current: Affine::IDENTITY,
            stack: Vec::with_capacity(4),
        }
    }

    fn skia_transform(&self) -> Transform {
        let [a, b, c, d, e, f] = self.current.as_coeffs();
        Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
    }

    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;
        paint
    }

    fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
        let rect = rect.abs();
        tiny_skia::Rect::from_xywh(
            rect.x0 as f32,
            rect.y0 as f32,
            rect.width() as f32,
            rect.height() as f32,
        )
    }
}

impl Canvas for PixmapCanvas<'_> {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self, color: Color) {
        self.pixmap.fill(color.to_skia());
    }

    fn save(&mut self) {
        self.stack.push(self.current);
    }

    fn restore(&mut self) {
        if let Some(previous) = self.stack.pop() {
            self.current = previous;
        }
    }

    fn transform(&mut self, transform: Affine) {
        self.current = self.current * transform;
    }

    fn current_transform(&self) -> Affine {
        self.current
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = Self::skia_rect(rect) else {
            return;
        };
        let paint = Self::paint(color);
        let transform = self.skia_transform();
        self.pixmap.fill_rect(rect, &paint, transform, None);
    }

    fn fill_ellipse(&mut self, bounds: Rect, color: Color) {
        let Some(path) = Self::skia_rect(bounds).and_then(PathBuilder::from_oval) else {
            return;
        };
        let paint = Self::paint(color);
        let transform = self.skia_transform();
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
