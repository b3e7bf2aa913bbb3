use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Projection};
use nalgebra::Matrix3;
use tracing::{debug, info};

use crate::error::{Result, VisionError};
use crate::geometry::{compute_perspective_matrix, Point, TargetSize};

/// Fill for output pixels whose pre-image lies outside the source
const OUTSIDE: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Resampling kernel used when warping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Bilinear,
    /// Cubic over a 4x4 neighbourhood
    Bicubic,
}

impl From<Interpolation> for imageproc::geometric_transformations::Interpolation {
    fn from(interpolation: Interpolation) -> Self {
        match interpolation {
            Interpolation::Bilinear => Self::Bilinear,
            Interpolation::Bicubic => Self::Bicubic,
        }
    }
}

/// Narrow a solved homography to the row-major `f32` form `Projection` takes.
///
/// `Projection` normalises by the bottom-right entry before its own
/// invertibility check, so a zero or non-finite matrix is rejected here.
fn to_projection(matrix: &Matrix3<f64>) -> Result<Projection> {
    if matrix.iter().any(|v| !v.is_finite())
        || matrix[(2, 2)] == 0.0
        || matrix.try_inverse().is_none()
    {
        return Err(VisionError::DegenerateTransform);
    }

    let mut entries = [0f32; 9];
    for (i, entry) in entries.iter_mut().enumerate() {
        *entry = matrix[(i / 3, i % 3)] as f32;
    }
    Projection::from_matrix(entries).ok_or(VisionError::DegenerateTransform)
}

/// Resample `img` through a projective matrix into a new `target`-sized image.
///
/// `forward_matrix` maps source coordinates to output coordinates; each output
/// pixel is pulled back through its inverse. Output pixels whose pre-image
/// falls outside the source, or too close to its border for the kernel, are
/// left transparent.
pub fn apply_perspective_transform(
    img: &RgbaImage,
    forward_matrix: &Matrix3<f64>,
    target: TargetSize,
    interpolation: Interpolation,
) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(VisionError::SourceUnavailable(
            "source image has no pixels".to_string(),
        ));
    }

    let projection = to_projection(forward_matrix)?;
    let mut output = RgbaImage::new(target.width, target.height);
    warp_into(img, &projection, interpolation.into(), OUTSIDE, &mut output);

    Ok(output)
}

/// Warp the quadrilateral picked by `source_points` onto a `target` rectangle.
///
/// Points are matched to the target corners positionally: top-left,
/// top-right, bottom-left, bottom-right. Anything other than exactly four
/// points fails with [`VisionError::InsufficientPoints`] before any work is
/// done.
pub fn warp_perspective(
    img: &RgbaImage,
    source_points: &[Point],
    target: TargetSize,
    interpolation: Interpolation,
) -> Result<RgbaImage> {
    let from: [(f64, f64); 4] = match source_points {
        [a, b, c, d] => [a, b, c, d].map(|p| (p.x as f64, p.y as f64)),
        _ => {
            return Err(VisionError::InsufficientPoints {
                have: source_points.len(),
            })
        }
    };

    let matrix = compute_perspective_matrix(&from, &target.corners())?;
    debug!(?matrix, "Perspective matrix");

    let warped = apply_perspective_transform(img, &matrix, target, interpolation)?;
    info!(
        width = warped.width(),
        height = warped.height(),
        ?interpolation,
        "Perspective warp applied"
    );
    Ok(warped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> [Point; 4] {
        [
            Point::new(40, 30),
            Point::new(560, 50),
            Point::new(20, 570),
            Point::new(580, 590),
        ]
    }

    /// Resampling truncates towards zero, so flat colours may come back one
    /// step darker.
    fn assert_close(actual: Rgba<u8>, expected: Rgba<u8>) {
        for c in 0..4 {
            assert!(
                (actual[c] as i32 - expected[c] as i32).abs() <= 1,
                "{:?} vs {:?}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_identity_transform() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let identity = Matrix3::identity();
        let target = TargetSize::new(10, 10).unwrap();
        let result =
            apply_perspective_transform(&img, &identity, target, Interpolation::Bilinear).unwrap();

        assert_eq!(result.dimensions(), (10, 10));
        assert_eq!(*result.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
        // The last column has no right-hand neighbour to blend with
        assert_eq!(*result.get_pixel(9, 5), OUTSIDE);
    }

    #[test]
    fn test_outside_source_is_transparent() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 255, 255]));
        // Shift the source 30 px right; the left of the output has no pre-image
        #[rustfmt::skip]
        let shift = Matrix3::new(
            1.0, 0.0, 30.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        );
        let target = TargetSize::new(60, 20).unwrap();
        let result =
            apply_perspective_transform(&img, &shift, target, Interpolation::Bilinear).unwrap();
        assert_eq!(*result.get_pixel(10, 10), OUTSIDE);
        assert_eq!(*result.get_pixel(40, 10), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let err = apply_perspective_transform(
            &img,
            &Matrix3::zeros(),
            TargetSize::default(),
            Interpolation::Bilinear,
        )
        .unwrap_err();
        assert!(matches!(err, VisionError::DegenerateTransform));
    }

    #[test]
    fn test_warp_output_matches_target_size() {
        let img = RgbaImage::from_pixel(600, 600, Rgba([10, 200, 30, 255]));
        let target = TargetSize::new(500, 500).unwrap();
        let warped = warp_perspective(&img, &quad(), target, Interpolation::Bilinear).unwrap();

        assert_eq!(warped.dimensions(), (500, 500));
        assert_close(*warped.get_pixel(250, 250), Rgba([10, 200, 30, 255]));
    }

    #[test]
    fn test_bicubic_warp_keeps_flat_color() {
        let img = RgbaImage::from_pixel(600, 600, Rgba([90, 90, 90, 255]));
        let target = TargetSize::new(320, 240).unwrap();
        let warped = warp_perspective(&img, &quad(), target, Interpolation::Bicubic).unwrap();

        assert_eq!(warped.dimensions(), (320, 240));
        assert_close(*warped.get_pixel(160, 120), Rgba([90, 90, 90, 255]));
    }

    #[test]
    fn test_fewer_than_four_points_rejected() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255]));
        for n in 0..4 {
            let err = warp_perspective(&img, &quad()[..n], TargetSize::default(), Interpolation::Bilinear)
                .unwrap_err();
            assert!(matches!(err, VisionError::InsufficientPoints { have } if have == n));
        }
    }

    #[test]
    fn test_collinear_points_rejected() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255]));
        let line = [
            Point::new(0, 0),
            Point::new(10, 5),
            Point::new(20, 10),
            Point::new(30, 15),
        ];
        let err = warp_perspective(&img, &line, TargetSize::default(), Interpolation::Bilinear)
            .unwrap_err();
        assert!(matches!(err, VisionError::DegenerateTransform));
    }

    #[test]
    fn test_input_image_unchanged() {
        let img = RgbaImage::from_fn(64, 64, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let before = img.clone();
        let corners = [
            Point::new(5, 5),
            Point::new(60, 2),
            Point::new(3, 58),
            Point::new(62, 61),
        ];
        let _ = warp_perspective(&img, &corners, TargetSize::new(32, 32).unwrap(), Interpolation::Bilinear)
            .unwrap();
        assert_eq!(img, before);
    }
}
