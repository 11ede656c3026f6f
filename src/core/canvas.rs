use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::resolution::Resolution;

/// RGBA8 color, laid out exactly like one texel of an `Rgba8Unorm` texture
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha scaled by `opacity` in `[0, 1]`
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Source-over blend of `self` onto `dst`
    fn over(self, dst: Color) -> Color {
        let alpha = self.a as u32;
        if alpha == 255 {
            return self;
        }
        if alpha == 0 {
            return dst;
        }
        let mix = |s: u8, d: u8| ((s as u32 * alpha + d as u32 * (255 - alpha) + 127) / 255) as u8;
        Color {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: (alpha + dst.a as u32 * (255 - alpha) / 255).min(255) as u8,
        }
    }
}

/// CPU render target for one output.
///
/// Scene roots draw into a `Canvas` between `begin_frame` and `end_frame`;
/// backends present its pixels.
#[derive(Clone)]
pub struct Canvas {
    pixels: Vec<Color>,
    resolution: Resolution,
}

impl Canvas {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            pixels: vec![Color::TRANSPARENT; resolution.pixel_count()],
            resolution,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Fill the whole canvas, ignoring alpha blending
    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Blend a single pixel; out of bounds coordinates are ignored
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x as u32 >= self.resolution.width || y as u32 >= self.resolution.height {
            return;
        }
        let idx = self.index(x as u32, y as u32);
        self.pixels[idx] = color.over(self.pixels[idx]);
    }

    /// Filled, clipped rectangle
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i32).min(self.resolution.width as i32);
        let y1 = (y + height as i32).min(self.resolution.height as i32);

        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    /// Filled circle
    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        let r_sq = radius * radius;
        let min = (center - Vec2::splat(radius)).floor();
        let max = (center + Vec2::splat(radius)).ceil();

        for py in min.y as i32..=max.y as i32 {
            for px in min.x as i32..=max.x as i32 {
                let d = Vec2::new(px as f32, py as f32) - center;
                if d.length_squared() <= r_sq {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Copy a square sprite centered on `center`, blending each texel
    pub fn blit(&mut self, sprite: &[Color], size: u32, center: Vec2, opacity: f32) {
        let half = (size / 2) as i32;
        let origin_x = center.x.round() as i32 - half;
        let origin_y = center.y.round() as i32 - half;

        for (i, texel) in sprite.iter().enumerate().take((size * size) as usize) {
            let sx = (i as u32 % size) as i32;
            let sy = (i as u32 / size) as i32;
            self.blend_pixel(origin_x + sx, origin_y + sy, texel.with_opacity(opacity));
        }
    }

    /// Blend `color` over every pixel at `opacity`
    pub fn overlay(&mut self, color: Color, opacity: f32) {
        let layer = color.with_opacity(opacity);
        for pixel in &mut self.pixels {
            *pixel = layer.over(*pixel);
        }
    }

    /// Raw RGBA bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.resolution.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_new_is_transparent() {
        let canvas = Canvas::new(Resolution::new(4, 3));
        assert_eq!(canvas.as_bytes().len(), 4 * 3 * 4);
        assert_eq!(canvas.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_clear_and_bytes_layout() {
        let mut canvas = Canvas::new(Resolution::new(2, 2));
        canvas.clear(Color::rgba(255, 128, 64, 255));
        assert_eq!(&canvas.as_bytes()[0..4], &[255, 128, 64, 255]);
        assert_eq!(&canvas.as_bytes()[12..16], &[255, 128, 64, 255]);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::new(Resolution::new(10, 10));
        canvas.clear(Color::BLACK);
        canvas.fill_rect(-5, 8, 8, 8, Color::WHITE);

        assert_eq!(canvas.pixel(0, 9), Some(Color::WHITE));
        assert_eq!(canvas.pixel(2, 9), Some(Color::WHITE));
        assert_eq!(canvas.pixel(3, 9), Some(Color::BLACK));
        assert_eq!(canvas.pixel(0, 7), Some(Color::BLACK));
    }

    #[test]
    fn test_fill_circle() {
        let mut canvas = Canvas::new(Resolution::new(20, 20));
        canvas.fill_circle(Vec2::new(10.0, 10.0), 3.0, Color::WHITE);

        assert_eq!(canvas.pixel(10, 10), Some(Color::WHITE));
        assert_eq!(canvas.pixel(13, 10), Some(Color::WHITE));
        assert_eq!(canvas.pixel(14, 10), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_overlay_full_opacity_replaces() {
        let mut canvas = Canvas::new(Resolution::new(3, 3));
        canvas.clear(Color::WHITE);
        canvas.overlay(Color::BLACK, 1.0);
        assert!(canvas.as_bytes().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_overlay_half_opacity_blends() {
        let mut canvas = Canvas::new(Resolution::new(1, 1));
        canvas.clear(Color::WHITE);
        canvas.overlay(Color::BLACK, 0.5);

        let px = canvas.pixel(0, 0).unwrap();
        assert!(px.r > 100 && px.r < 156, "got {}", px.r);
        assert_eq!(px.a, 255);
    }

    #[test]
    fn test_overlay_zero_opacity_is_noop() {
        let mut canvas = Canvas::new(Resolution::new(2, 2));
        canvas.clear(Color::rgba(10, 20, 30, 255));
        canvas.overlay(Color::BLACK, 0.0);
        assert_eq!(canvas.pixel(1, 1), Some(Color::rgba(10, 20, 30, 255)));
    }

    #[test]
    fn test_blit_centered() {
        let mut canvas = Canvas::new(Resolution::new(8, 8));
        canvas.clear(Color::BLACK);
        let sprite = vec![Color::WHITE; 4];
        canvas.blit(&sprite, 2, Vec2::new(4.0, 4.0), 1.0);

        assert_eq!(canvas.pixel(3, 3), Some(Color::WHITE));
        assert_eq!(canvas.pixel(4, 4), Some(Color::WHITE));
        assert_eq!(canvas.pixel(5, 5), Some(Color::BLACK));
    }
}
