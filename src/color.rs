use image::{GrayImage, Luma, Rgb, RgbImage};
use tracing::debug;

/// A color in 8-bit HSV: hue in 0..=179 (degrees halved), saturation and
/// value in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    pub fn from_rgb(pixel: &Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0.map(|c| c as f64);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

        let mut h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / delta
        } else if max == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if h < 0.0 {
            h += 360.0;
        }

        Self {
            h: ((h / 2.0).round() as u16 % 180) as u8,
            s: s.round() as u8,
            v: max as u8,
        }
    }
}

/// Inclusive HSV bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }
}

impl Default for HsvRange {
    /// Matches every pixel
    fn default() -> Self {
        Self::new(Hsv::new(0, 0, 0), Hsv::new(179, 255, 255))
    }
}

/// Binary mask: 255 where the pixel's HSV value lies inside `range`
pub fn in_range(img: &RgbImage, range: &HsvRange) -> GrayImage {
    let mask = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if range.contains(Hsv::from_rgb(img.get_pixel(x, y))) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    debug!(
        selected = mask.pixels().filter(|p| p[0] > 0).count(),
        "HSV mask computed"
    );
    mask
}

/// Keep pixels where `mask` is set, black elsewhere
pub fn apply_mask(img: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let inside = x < mask.width() && y < mask.height() && mask.get_pixel(x, y)[0] > 0;
        if inside {
            *img.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}
