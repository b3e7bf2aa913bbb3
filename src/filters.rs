use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};
use tracing::debug;

/// Sigma equivalent to a 7x7 Gaussian kernel with automatic sigma.
pub const DEFAULT_BLUR_SIGMA: f32 = 1.4;

/// Radius of the square structuring element (5x5 kernel).
const MORPH_RADIUS: u8 = 2;

/// Every stage of the blur / edge / morphology chain
#[derive(Debug, Clone)]
pub struct FilterStages {
    pub blurred: RgbImage,
    pub edges: GrayImage,
    pub dilated: GrayImage,
    pub eroded: GrayImage,
}

/// Run the filter chain: blur the color image, Canny on its grayscale, then
/// dilate and erode the edges with a 5x5 square kernel.
///
/// The erosion is applied to the dilated edges, which closes small gaps in
/// the outline.
pub fn run_filter_chain(img: &RgbImage, gray: &GrayImage, blur_sigma: f32) -> FilterStages {
    let blurred = if blur_sigma > 0.0 {
        gaussian_blur_f32(img, blur_sigma)
    } else {
        img.clone()
    };

    let edges = canny(gray, 50.0, 150.0);
    let dilated = dilate(&edges, Norm::LInf, MORPH_RADIUS);
    let eroded = erode(&dilated, Norm::LInf, MORPH_RADIUS);

    debug!(
        edge_pixels = count_set(&edges),
        dilated_pixels = count_set(&dilated),
        eroded_pixels = count_set(&eroded),
        "Filter chain complete"
    );

    FilterStages {
        blurred,
        edges,
        dilated,
        eroded,
    }
}

fn count_set(img: &GrayImage) -> usize {
    img.pixels().filter(|p| p[0] > 0).count()
}
