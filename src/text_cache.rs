//! Reuse of shaped text across frames.
//!
//! Shaping text is by far the most expensive thing a frame does, and almost
//! every string on the table is identical to the one drawn a frame earlier.
//! [`TextCache`] keeps every layout it ever built, keyed by a 32-bit hash of
//! the text, the format identity, the span width and the alignment. Entries
//! are only dropped by [`TextCache::reset`], which must happen whenever the
//! formats are recreated.
//!
//! Two different inputs hashing to the same key will draw the wrong text.
//! That risk is accepted and not detected.

use std::collections::HashMap;

use crate::draw::{Backend, Color, DrawError, Point, Rect, Surface, TextAlign, TextFormat};

const SEED: u32 = 0x1234_1234;

/// MurmurHash2 (Austin Appleby). Words are read little-endian from the byte
/// slice, so the result does not depend on the host.
pub fn murmur_hash2(key: &[u8], seed: u32) -> u32 {
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = seed ^ key.len() as u32;

    let mut chunks = key.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        if tail.len() >= 3 {
            h ^= (tail[2] as u32) << 16;
        }
        if tail.len() >= 2 {
            h ^= (tail[1] as u32) << 8;
        }
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

pub fn layout_key(text: &str, format_id: u32, width: f32, align: TextAlign) -> u32 {
    murmur_hash2(text.as_bytes(), SEED) ^ format_id ^ width.to_bits() ^ align as u32
}

pub struct TextCache<B: Backend> {
    cache: HashMap<u32, B::Layout>,
}

impl<B: Backend> Default for TextCache<B> {
    fn default() -> Self {
        TextCache { cache: HashMap::new() }
    }
}

impl<B: Backend> TextCache<B> {
    pub fn new() -> TextCache<B> {
        TextCache::default()
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Draws `text` between `xmin` and `xmax`, vertically centered on
    /// `ycenter`. Only single lines are supported: the layout gets twice the
    /// font size of vertical room.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        surface: &mut dyn Surface<B>,
        text: &str,
        format: &TextFormat<B::Format>,
        xmin: f32,
        xmax: f32,
        ycenter: f32,
        color: Color,
        align: TextAlign,
    ) -> Result<(), DrawError> {
        if xmax < xmin {
            return Ok(());
        }

        let font_size = format.size();
        let width = xmax - xmin;
        let key = layout_key(text, format.id(), width, align);

        if !self.cache.contains_key(&key) {
            let layout = surface.create_text_layout(text, format.handle(), align, width, font_size * 2.0)?;
            self.cache.insert(key, layout);
        }

        if let Some(layout) = self.cache.get(&key) {
            let clip = Rect::new(xmin, ycenter - font_size, xmax, ycenter + font_size);
            surface.draw_text_layout(Point::new(xmin, ycenter - font_size), layout, clip, color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{Extent, FontSpec};

    struct Counting;

    impl Backend for Counting {
        type Format = ();
        type Layout = (String, u32);
    }

    #[derive(Default)]
    struct CountingSurface {
        created: u32,
        drawn: Vec<(String, u32, Point)>,
    }

    impl Surface<Counting> for CountingSurface {
        fn width(&self) -> f32 {
            100.0
        }
        fn begin_draw(&mut self) {}
        fn end_draw(&mut self) -> Result<(), DrawError> {
            Ok(())
        }
        fn create_text_format(&mut self, _font: &FontSpec) -> Result<(), DrawError> {
            Ok(())
        }
        fn create_text_layout(&mut self, text: &str, _: &(), _: TextAlign, _: f32, _: f32) -> Result<(String, u32), DrawError> {
            self.created += 1;
            Ok((text.to_string(), self.created))
        }
        fn measure_text(&mut self, _text: &str, _format: &()) -> Extent {
            Extent::default()
        }
        fn fill_rect(&mut self, _rect: Rect, _color: Color) {}
        fn fill_rounded_rect(&mut self, _rect: Rect, _radius: f32, _color: Color) {}
        fn draw_rect(&mut self, _rect: Rect, _color: Color) {}
        fn draw_text_layout(&mut self, origin: Point, layout: &(String, u32), _clip: Rect, _color: Color) {
            self.drawn.push((layout.0.clone(), layout.1, origin));
        }
    }

    fn format(surface: &mut CountingSurface) -> TextFormat<()> {
        let font = FontSpec { family: "Monaco".to_string(), size: 10.0, weight: 400 };
        TextFormat::create::<Counting>(surface, &font).unwrap()
    }

    const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    #[test]
    fn empty_input_hashes_to_zero_with_zero_seed() {
        assert_eq!(murmur_hash2(b"", 0), 0);
    }

    #[test]
    fn hash_sees_every_tail_byte() {
        let base = murmur_hash2(b"abcdefg", SEED);
        assert_ne!(base, murmur_hash2(b"abcdefh", SEED));
        assert_ne!(base, murmur_hash2(b"abcdxfg", SEED));
        assert_ne!(base, murmur_hash2(b"abcdef", SEED));
        assert_eq!(base, murmur_hash2(b"abcdefg", SEED));
    }

    #[test]
    fn repeated_draw_reuses_layout() {
        let mut surface = CountingSurface::default();
        let format = format(&mut surface);
        let mut cache = TextCache::<Counting>::new();

        cache.render(&mut surface, "P1", &format, 0.0, 40.0, 10.0, WHITE, TextAlign::Trailing).unwrap();
        cache.render(&mut surface, "P1", &format, 0.0, 40.0, 10.0, WHITE, TextAlign::Trailing).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(surface.created, 1);
        assert_eq!(surface.drawn.len(), 2);
        assert_eq!(surface.drawn[0].1, surface.drawn[1].1);
    }

    #[test]
    fn any_differing_key_part_creates_new_entry() {
        let mut surface = CountingSurface::default();
        let format_a = format(&mut surface);
        let format_b = format(&mut surface);
        let mut cache = TextCache::<Counting>::new();

        cache.render(&mut surface, "P1", &format_a, 0.0, 40.0, 10.0, WHITE, TextAlign::Trailing).unwrap();
        cache.render(&mut surface, "P2", &format_a, 0.0, 40.0, 10.0, WHITE, TextAlign::Trailing).unwrap();
        assert_eq!(cache.len(), 2);
        cache.render(&mut surface, "P1", &format_b, 0.0, 40.0, 10.0, WHITE, TextAlign::Trailing).unwrap();
        assert_eq!(cache.len(), 3);
        cache.render(&mut surface, "P1", &format_a, 0.0, 41.0, 10.0, WHITE, TextAlign::Trailing).unwrap();
        assert_eq!(cache.len(), 4);
        cache.render(&mut surface, "P1", &format_a, 0.0, 40.0, 10.0, WHITE, TextAlign::Center).unwrap();
        assert_eq!(cache.len(), 5);
        assert_eq!(surface.created, 5);
    }

    #[test]
    fn position_and_color_do_not_enter_the_key() {
        let mut surface = CountingSurface::default();
        let format = format(&mut surface);
        let mut cache = TextCache::<Counting>::new();

        cache.render(&mut surface, "Driver", &format, 0.0, 40.0, 10.0, WHITE, TextAlign::Leading).unwrap();
        cache.render(&mut surface, "Driver", &format, 100.0, 140.0, 30.0, Color::TRANSPARENT, TextAlign::Leading).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(surface.drawn[1].2, Point::new(100.0, 20.0));
    }

    #[test]
    fn inverted_span_is_skipped() {
        let mut surface = CountingSurface::default();
        let format = format(&mut surface);
        let mut cache = TextCache::<Counting>::new();

        cache.render(&mut surface, "P1", &format, 40.0, 39.0, 10.0, WHITE, TextAlign::Center).unwrap();

        assert!(cache.is_empty());
        assert!(surface.drawn.is_empty());
    }

    #[test]
    fn reset_drains_everything() {
        let mut surface = CountingSurface::default();
        let format = format(&mut surface);
        let mut cache = TextCache::<Counting>::new();

        cache.render(&mut surface, "P1", &format, 0.0, 40.0, 10.0, WHITE, TextAlign::Center).unwrap();
        cache.reset();
        assert!(cache.is_empty());

        cache.render(&mut surface, "P1", &format, 0.0, 40.0, 10.0, WHITE, TextAlign::Center).unwrap();
        assert_eq!(surface.created, 2);
    }
}
