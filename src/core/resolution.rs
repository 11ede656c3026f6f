use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Output resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 720p television output
    pub const TV_720P: Resolution = Resolution::new(1280, 720);

    /// Companion screen
    pub const COMPANION: Resolution = Resolution::new(854, 480);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Total size in bytes for an RGBA buffer
    pub fn buffer_size(&self) -> usize {
        self.pixel_count() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Per-axis factor that maps coordinates from `self` into `other`
    pub fn scale_to(&self, other: Resolution) -> Vec2 {
        if self.is_empty() {
            return Vec2::ZERO;
        }
        other.as_vec2() / self.as_vec2()
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
