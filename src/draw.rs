//! The drawing collaborator the overlays render through.
//!
//! A [`Backend`] names the two resource types a rendering API hands out: text
//! formats (font, size, weight) and shaped text layouts. A [`Surface`] is one
//! frame's worth of access to that API. Everything above this module only
//! ever talks to `dyn Surface<B>`, so the same renderer drives the skia window
//! and the recording surface used in tests.

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("failed to create text format for font `{family}`: {reason}")]
    TextFormat { family: String, reason: String },
    #[error("failed to create text layout: {0}")]
    TextLayout(String),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Color {
        Color { a, ..self }
    }

    /// Packed 0xRRGGBB, as the simulator reports license colors.
    pub fn from_rgb_u32(rgb: u32, a: f32) -> Color {
        Color {
            r: ((rgb >> 16) & 0xff) as f32 / 255.0,
            g: ((rgb >> 8) & 0xff) as f32 / 255.0,
            b: (rgb & 0xff) as f32 / 255.0,
            a,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        Rect { left, top, right, bottom }
    }

    pub fn inset(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.right - dx, self.bottom - dy)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextAlign {
    Leading = 0,
    Trailing = 1,
    Center = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub weight: i32,
}

pub trait Backend {
    type Format;
    type Layout;
}

pub trait Surface<B: Backend> {
    /// Logical width of the drawing target.
    fn width(&self) -> f32;

    fn begin_draw(&mut self);
    fn end_draw(&mut self) -> Result<(), DrawError>;

    fn create_text_format(&mut self, font: &FontSpec) -> Result<B::Format, DrawError>;

    /// Shapes a single line of `text`. Vertical centering within `max_height`
    /// is the backend's job.
    fn create_text_layout(
        &mut self,
        text: &str,
        format: &B::Format,
        align: TextAlign,
        max_width: f32,
        max_height: f32,
    ) -> Result<B::Layout, DrawError>;

    fn measure_text(&mut self, text: &str, format: &B::Format) -> Extent;

    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color);
    fn draw_rect(&mut self, rect: Rect, color: Color);
    fn draw_text_layout(&mut self, origin: Point, layout: &B::Layout, clip: Rect, color: Color);
}

static NEXT_FORMAT_ID: AtomicU32 = AtomicU32::new(1);

/// A backend format handle tagged with an identity that is never handed out
/// twice, so it can stand in for the handle inside cache keys. Identities are
/// spread over all 32 bits so consecutive formats differ in more than the low
/// bits that alignment occupies in a key.
#[derive(Debug)]
pub struct TextFormat<F> {
    id: u32,
    size: f32,
    handle: F,
}

impl<F> TextFormat<F> {
    pub fn create<B>(surface: &mut dyn Surface<B>, font: &FontSpec) -> Result<TextFormat<F>, DrawError>
    where
        B: Backend<Format = F>,
    {
        let handle = surface.create_text_format(font)?;
        Ok(TextFormat {
            id: NEXT_FORMAT_ID.fetch_add(1, Ordering::Relaxed).wrapping_mul(0x9e37_79b9),
            size: font.size,
            handle,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn handle(&self) -> &F {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_colors_unpack_from_rgb() {
        let c = Color::from_rgb_u32(0xff8000, 0.5);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn inset_shrinks_both_sides() {
        let r = Rect::new(10.0, 10.0, 30.0, 20.0).inset(2.0, 1.0);
        assert_eq!(r, Rect::new(12.0, 11.0, 28.0, 19.0));
        assert_eq!(r.width(), 16.0);
    }
}
