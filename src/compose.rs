use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::error::{Result, VisionError};
use crate::geometry::TargetSize;

const LINE: Rgb<u8> = Rgb([0, 0, 255]);
const RECT: Rgb<u8> = Rgb([0, 255, 0]);
const CIRCLE: Rgb<u8> = Rgb([255, 0, 0]);

const LINE_THICKNESS: i32 = 3;
const CIRCLE_RADIUS: i32 = 50;

/// Rectangular pixel region, top-left anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|right| right <= width)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= height)
    }
}

/// Bilinear resize to exactly `size`, ignoring the aspect ratio
pub fn resize(img: &RgbImage, size: TargetSize) -> RgbImage {
    imageops::resize(img, size.width, size.height, FilterType::Triangle)
}

/// Copy of the pixels inside `region`.
///
/// Regions that are empty or extend past the image fail with
/// [`VisionError::InvalidRegion`]; nothing is clamped.
pub fn crop(img: &RgbImage, region: Region) -> Result<RgbImage> {
    let (image_width, image_height) = img.dimensions();
    if !region.fits(image_width, image_height) {
        return Err(VisionError::InvalidRegion {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            image_width,
            image_height,
        });
    }
    Ok(imageops::crop_imm(img, region.x, region.y, region.width, region.height).to_image())
}

/// Copy of `img` with a thick diagonal line, a rectangle outline and a filled
/// circle drawn on it
pub fn draw_primitives(img: &RgbImage) -> RgbImage {
    let mut canvas = img.clone();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    let half = LINE_THICKNESS / 2;
    for offset in -half..=half {
        let d = offset as f32;
        draw_line_segment_mut(&mut canvas, (0.0, d), (w, h + d), LINE);
    }

    draw_hollow_rect_mut(&mut canvas, Rect::at(50, 50).of_size(151, 101), RECT);
    draw_filled_circle_mut(&mut canvas, (300, 200), CIRCLE_RADIUS, CIRCLE);

    canvas
}

/// Lay `images` out row-major on a `rows` x `cols` grid.
///
/// Every cell takes the first image's size; other images are resized to fit
/// and grayscale inputs are expanded to RGB. The image count must equal
/// `rows * cols`.
pub fn create_grid(images: &[DynamicImage], rows: usize, cols: usize) -> Result<RgbImage> {
    let mismatch = VisionError::GridMismatch {
        rows,
        cols,
        images: images.len(),
    };
    let first = match images.first() {
        Some(first) if rows.checked_mul(cols) == Some(images.len()) => first,
        _ => return Err(mismatch),
    };

    let (cell_w, cell_h) = (first.width(), first.height());
    if cell_w == 0 || cell_h == 0 {
        return Err(VisionError::SourceUnavailable(
            "first grid image has no pixels".to_string(),
        ));
    }
    debug!(rows, cols, cell_w, cell_h, "Grid cell size");

    let mut grid = RgbImage::new(cell_w * cols as u32, cell_h * rows as u32);
    for (i, img) in images.iter().enumerate() {
        let mut cell = img.to_rgb8();
        if cell.dimensions() != (cell_w, cell_h) {
            cell = imageops::resize(&cell, cell_w, cell_h, FilterType::Triangle);
        }
        let x = (i % cols) as u32 * cell_w;
        let y = (i / cols) as u32 * cell_h;
        imageops::replace(&mut grid, &cell, x as i64, y as i64);
    }

    info!(
        width = grid.width(),
        height = grid.height(),
        "Grid assembled"
    );
    Ok(grid)
}
