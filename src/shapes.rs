use std::fmt;

use image::GrayImage;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use tracing::{debug, info, warn};

use crate::detection::find_external_contours;
use crate::error::{Result, VisionError};
use crate::geometry::{BoundingBox, Point};

/// Contours enclosing this many square pixels or fewer are treated as noise.
pub const DEFAULT_MIN_AREA: f64 = 500.0;

/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
pub const DEFAULT_EPSILON_FACTOR: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeLabel {
    Triangle,
    Square,
    Rectangle,
    Pentagon,
    Hexagon,
    Star,
    Circle,
    Oval,
    Unknown,
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeLabel::Triangle => "Triangle",
            ShapeLabel::Square => "Square",
            ShapeLabel::Rectangle => "Rectangle",
            ShapeLabel::Pentagon => "Pentagon",
            ShapeLabel::Hexagon => "Hexagon",
            ShapeLabel::Star => "Star",
            ShapeLabel::Circle => "Circle",
            ShapeLabel::Oval => "Oval",
            ShapeLabel::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

fn is_near_unit(aspect_ratio: f64) -> bool {
    aspect_ratio > 0.95 && aspect_ratio < 1.05
}

/// Label a polygon from its corner count and bounding-box aspect ratio.
///
/// Exact matches for 5, 6 and 10 corners take precedence over the
/// many-corner Circle/Oval fallback, so a 10-corner outline is always a Star
/// whatever its proportions.
pub fn classify(corners: usize, aspect_ratio: f64) -> ShapeLabel {
    match corners {
        3 => ShapeLabel::Triangle,
        4 if is_near_unit(aspect_ratio) => ShapeLabel::Square,
        4 => ShapeLabel::Rectangle,
        5 => ShapeLabel::Pentagon,
        6 => ShapeLabel::Hexagon,
        10 => ShapeLabel::Star,
        n if n > 4 && is_near_unit(aspect_ratio) => ShapeLabel::Circle,
        n if n > 4 => ShapeLabel::Oval,
        _ => ShapeLabel::Unknown,
    }
}

/// One classified region
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedShape {
    pub label: ShapeLabel,
    pub bounds: BoundingBox,
    /// Approximated outline, in contour order
    pub polygon: Vec<Point>,
    pub area: f64,
}

/// Classify an already-approximated polygon.
///
/// Fails with [`VisionError::DegenerateContour`] when the polygon is empty or
/// its bounding box has no height.
pub fn classify_polygon(polygon: &[Point]) -> Result<(ShapeLabel, BoundingBox)> {
    let bounds = BoundingBox::enclosing(polygon).ok_or(VisionError::DegenerateContour)?;
    let aspect_ratio = bounds.aspect_ratio().ok_or(VisionError::DegenerateContour)?;
    Ok((classify(polygon.len(), aspect_ratio), bounds))
}

/// A contour that passed the area filter, reduced to its corner polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Approximation {
    pub polygon: Vec<Point>,
    pub area: f64,
}

impl Approximation {
    fn label(self) -> Result<DetectedShape> {
        let (label, bounds) = classify_polygon(&self.polygon)?;
        Ok(DetectedShape {
            label,
            bounds,
            polygon: self.polygon,
            area: self.area,
        })
    }
}

/// Label each approximation in turn.
///
/// Degenerate polygons are skipped with a warning; the rest are still
/// labelled, in input order.
pub fn label_approximations<I>(approximations: I) -> Vec<DetectedShape>
where
    I: IntoIterator<Item = Approximation>,
{
    approximations
        .into_iter()
        .filter_map(|approx| {
            let corners = approx.polygon.len();
            match approx.label() {
                Ok(shape) => {
                    debug!(area = shape.area, corners, label = %shape.label, "Contour classified");
                    Some(shape)
                }
                Err(err) => {
                    warn!(corners, "Skipping contour: {}", err);
                    None
                }
            }
        })
        .collect()
}

/// Contour-based shape classifier with configurable noise and
/// approximation thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ShapeClassifier {
    pub min_area: f64,
    pub epsilon_factor: f64,
}

impl Default for ShapeClassifier {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            epsilon_factor: DEFAULT_EPSILON_FACTOR,
        }
    }
}

impl ShapeClassifier {
    pub fn new(min_area: f64, epsilon_factor: f64) -> Self {
        Self {
            min_area,
            epsilon_factor,
        }
    }

    /// Reduce a closed contour to its corner polygon.
    ///
    /// Returns `None` for contours enclosing `min_area` or less. A
    /// non-positive tolerance keeps every contour point.
    pub fn approximate(&self, contour: &[Point]) -> Option<Approximation> {
        let area = contour_area(contour);
        if area <= self.min_area {
            return None;
        }

        let epsilon = self.epsilon_factor * arc_length(contour, true);
        let polygon = if epsilon > 0.0 {
            approximate_polygon_dp(contour, epsilon, true)
        } else {
            contour.to_vec()
        };
        Some(Approximation { polygon, area })
    }

    /// Classify a single closed contour.
    ///
    /// Returns `Ok(None)` for contours at or below the area threshold.
    pub fn classify_contour(&self, contour: &[Point]) -> Result<Option<DetectedShape>> {
        self.approximate(contour)
            .map(Approximation::label)
            .transpose()
    }

    /// Classify every external contour of a binary edge map.
    pub fn classify_edges(&self, edges: &GrayImage) -> Vec<DetectedShape> {
        let contours = find_external_contours(edges);
        let total = contours.len();

        let shapes = label_approximations(contours.iter().filter_map(|c| self.approximate(c)));

        info!(contours = total, shapes = shapes.len(), "Shape classification complete");
        shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn rect_outline(x: i32, y: i32, w: i32, h: i32) -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..w - 1 {
            points.push(Point::new(x + i, y));
        }
        for j in 0..h - 1 {
            points.push(Point::new(x + w - 1, y + j));
        }
        for i in (1..w).rev() {
            points.push(Point::new(x + i, y + h - 1));
        }
        for j in (1..h).rev() {
            points.push(Point::new(x, y + j));
        }
        points
    }

    #[test]
    fn test_classify_precedence_table() {
        assert_eq!(classify(3, 1.0), ShapeLabel::Triangle);
        assert_eq!(classify(4, 1.0), ShapeLabel::Square);
        assert_eq!(classify(4, 2.0), ShapeLabel::Rectangle);
        assert_eq!(classify(4, 0.95), ShapeLabel::Rectangle);
        assert_eq!(classify(5, 1.0), ShapeLabel::Pentagon);
        assert_eq!(classify(6, 3.0), ShapeLabel::Hexagon);
        assert_eq!(classify(10, 1.0), ShapeLabel::Star);
        assert_eq!(classify(7, 1.0), ShapeLabel::Circle);
        assert_eq!(classify(8, 1.5), ShapeLabel::Oval);
        assert_eq!(classify(12, 1.04), ShapeLabel::Circle);
        assert_eq!(classify(2, 1.0), ShapeLabel::Unknown);
        assert_eq!(classify(0, 1.0), ShapeLabel::Unknown);
    }

    #[test]
    fn test_square_polygon() {
        let square = [
            Point::new(10, 10),
            Point::new(69, 10),
            Point::new(69, 69),
            Point::new(10, 69),
        ];
        let (label, bounds) = classify_polygon(&square).unwrap();
        assert_eq!(label, ShapeLabel::Square);
        assert_eq!(bounds.aspect_ratio(), Some(1.0));
    }

    #[test]
    fn test_wide_polygon_is_rectangle() {
        let rect = [
            Point::new(0, 0),
            Point::new(119, 0),
            Point::new(119, 59),
            Point::new(0, 59),
        ];
        let (label, bounds) = classify_polygon(&rect).unwrap();
        assert_eq!(label, ShapeLabel::Rectangle);
        assert_eq!(bounds.aspect_ratio(), Some(2.0));
    }

    #[test]
    fn test_ten_corners_is_star_not_circle() {
        // Regular 10-gon fitting a 101x101 box
        let polygon: Vec<Point> = (0..10)
            .map(|i| {
                let theta = i as f64 * std::f64::consts::TAU / 10.0;
                Point::new(
                    (50.0 + 50.0 * theta.cos()).round() as i32,
                    (50.0 + 50.0 * theta.sin()).round() as i32,
                )
            })
            .collect();
        let (label, bounds) = classify_polygon(&polygon).unwrap();
        assert!((bounds.aspect_ratio().unwrap() - 1.0).abs() < 0.05);
        assert_eq!(label, ShapeLabel::Star);
    }

    #[test]
    fn test_empty_polygon_is_degenerate() {
        let err = classify_polygon(&[]).unwrap_err();
        assert!(matches!(err, VisionError::DegenerateContour));
    }

    #[test]
    fn test_small_contour_discarded() {
        let classifier = ShapeClassifier::default();
        // 21x21 pixel outline encloses exactly 400 px²
        let small = rect_outline(0, 0, 21, 21);
        assert!(classifier.classify_contour(&small).unwrap().is_none());

        // Exactly at the threshold is still noise
        let threshold = ShapeClassifier::new(400.0, DEFAULT_EPSILON_FACTOR);
        assert!(threshold.classify_contour(&small).unwrap().is_none());
    }

    #[test]
    fn test_contour_classified_as_square() {
        let classifier = ShapeClassifier::default();
        let outline = rect_outline(20, 20, 60, 60);
        let shape = classifier.classify_contour(&outline).unwrap().unwrap();
        assert_eq!(shape.label, ShapeLabel::Square);
        assert_eq!(shape.polygon.len(), 4);
        assert_eq!(
            shape.bounds,
            BoundingBox {
                x: 20,
                y: 20,
                width: 60,
                height: 60
            }
        );
    }

    #[test]
    fn test_approximate_traced_square_edge() {
        let classifier = ShapeClassifier::default();
        let approx = classifier.approximate(&rect_outline(5, 5, 30, 30)).unwrap();
        assert_eq!(approx.polygon.len(), 4);
        // Shoelace area of the traced outline, not the filled pixel count
        assert_eq!(approx.area, 841.0);
    }

    #[test]
    fn test_approximate_ignores_zero_tolerance() {
        let classifier = ShapeClassifier::new(0.0, 0.0);
        let outline = rect_outline(0, 0, 10, 10);
        let approx = classifier.approximate(&outline).unwrap();
        assert_eq!(approx.polygon, outline);
    }

    #[test]
    fn test_degenerate_approximation_skipped_others_labelled() {
        let square = Approximation {
            polygon: vec![
                Point::new(10, 10),
                Point::new(69, 10),
                Point::new(69, 69),
                Point::new(10, 69),
            ],
            area: 3481.0,
        };
        let empty = Approximation {
            polygon: Vec::new(),
            area: 900.0,
        };

        let shapes = label_approximations([empty, square.clone()]);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].label, ShapeLabel::Square);
        assert_eq!(shapes[0].polygon, square.polygon);
    }

    #[test]
    fn test_flat_box_has_no_aspect_ratio() {
        let flat = BoundingBox {
            x: 0,
            y: 0,
            width: 10,
            height: 0,
        };
        assert_eq!(flat.aspect_ratio(), None);
    }

    #[test]
    fn test_classify_edges_on_filled_shapes() {
        let mut img = GrayImage::new(300, 200);
        draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(60, 60), Luma([255u8]));
        draw_filled_rect_mut(&mut img, Rect::at(120, 40).of_size(120, 60), Luma([255u8]));
        // Too small to count
        draw_filled_rect_mut(&mut img, Rect::at(20, 150).of_size(10, 10), Luma([255u8]));

        let mut shapes = ShapeClassifier::default().classify_edges(&img);
        shapes.sort_by_key(|s| s.bounds.x);

        let labels: Vec<ShapeLabel> = shapes.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![ShapeLabel::Square, ShapeLabel::Rectangle]);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(ShapeLabel::Hexagon.to_string(), "Hexagon");
        assert_eq!(ShapeLabel::Unknown.to_string(), "Unknown");
    }
}
