use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use crate::geometry::Point;

/// Pixels with alpha below this are treated as background.
const ALPHA_THRESHOLD: u8 = 10;

/// Blur and Canny settings for turning a photo into a binary edge map
#[derive(Debug, Clone, Copy)]
pub struct EdgeOptions {
    /// Gaussian sigma applied before edge detection
    pub blur_sigma: f32,
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

/// Convert RGBA image to grayscale, using alpha to mask out transparent pixels
pub fn to_grayscale(img: &RgbaImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel[3] >= ALPHA_THRESHOLD {
            // Standard luminance conversion
            let luma = (0.299 * pixel[0] as f64
                + 0.587 * pixel[1] as f64
                + 0.114 * pixel[2] as f64)
                .round()
                .min(255.0) as u8;
            gray.put_pixel(x, y, Luma([luma]));
        }
        // Transparent pixels stay black (background)
    }

    gray
}

/// Blur then run Canny edge detection
pub fn detect_edges(gray: &GrayImage, options: &EdgeOptions) -> GrayImage {
    let blurred = if options.blur_sigma > 0.0 {
        gaussian_blur_f32(gray, options.blur_sigma)
    } else {
        gray.clone()
    };
    let edges = canny(&blurred, options.low_threshold, options.high_threshold);
    debug!(
        sigma = options.blur_sigma,
        low = options.low_threshold,
        high = options.high_threshold,
        "Applied Canny edge detection"
    );
    edges
}

/// Full preprocessing pipeline: grayscale, blur, Canny
pub fn edge_map(img: &DynamicImage, options: &EdgeOptions) -> GrayImage {
    let gray = to_grayscale(&img.to_rgba8());
    detect_edges(&gray, options)
}

/// Outermost contours of a binary image; holes and nested borders are
/// dropped. Each contour is an ordered sequence of boundary pixels.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Vec<Point>> {
    let contours: Vec<Vec<Point>> = find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect();

    debug!(count = contours.len(), "Found external contours");
    contours
}
