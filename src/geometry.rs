use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::error::{Result, VisionError};

/// Integer pixel coordinate.
pub type Point = imageproc::point::Point<i32>;

/// Cross products at or below this magnitude count as collinear.
const COLLINEAR_EPSILON: f64 = 1e-6;

/// Determinants at or below this magnitude count as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Output size of a perspective warp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidTargetSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Destination corners in the fixed order top-left, top-right,
    /// bottom-left, bottom-right. Picked source points are matched to these
    /// positionally.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (w, h) = (self.width as f64, self.height as f64);
        [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
        }
    }
}

/// Axis-aligned box enclosing a polygon, in inclusive pixel extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }

    /// `width / height`; `None` when the box has no height.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// True when any three of the four points lie on one line, which leaves the
/// projective mapping undetermined.
fn has_collinear_triple(points: &[(f64, f64); 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES
        .iter()
        .any(|&(i, j, k)| cross(points[i], points[j], points[k]).abs() <= COLLINEAR_EPSILON)
}

/// Compute the 3x3 projective matrix mapping each `from[i]` onto `to[i]`.
///
/// Solves the standard eight-unknown linear system with `h33 = 1`. Collinear
/// or duplicated control points, a singular system, or a non-invertible
/// result all fail with [`VisionError::DegenerateTransform`].
pub fn compute_perspective_matrix(
    from: &[(f64, f64); 4],
    to: &[(f64, f64); 4],
) -> Result<Matrix3<f64>> {
    if has_collinear_triple(from) || has_collinear_triple(to) {
        return Err(VisionError::DegenerateTransform);
    }

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (i, (&(x, y), &(u, v))) in from.iter().zip(to.iter()).enumerate() {
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b).ok_or(VisionError::DegenerateTransform)?;

    #[rustfmt::skip]
    let matrix = Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], 1.0,
    );

    if matrix.iter().any(|v| !v.is_finite()) || matrix.determinant().abs() <= SINGULAR_EPSILON {
        return Err(VisionError::DegenerateTransform);
    }

    Ok(matrix)
}

/// Transform a point using a projective matrix, with perspective division
pub fn transform_point(matrix: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let p = Vector3::new(x, y, 1.0);
    let result = matrix * p;
    (result.x / result.z, result.y / result.z)
}
