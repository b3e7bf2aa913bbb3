use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::geometry::Point;
use crate::shapes::DetectedShape;

const OUTLINE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const BOX: Rgba<u8> = Rgba([0, 255, 0, 255]);
const MARKER: Rgba<u8> = Rgba([0, 255, 0, 255]);

const MARKER_RADIUS: i32 = 5;

fn draw_polyline(canvas: &mut RgbaImage, points: &[Point], closed: bool, color: Rgba<u8>) {
    let segments = if closed {
        points.len()
    } else {
        points.len().saturating_sub(1)
    };
    for i in 0..segments {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color,
        );
    }
}

/// Copy of `img` with each shape's approximated outline and bounding box
pub fn annotate_shapes(img: &RgbaImage, shapes: &[DetectedShape]) -> RgbaImage {
    let mut canvas = img.clone();
    for shape in shapes {
        draw_polyline(&mut canvas, &shape.polygon, true, OUTLINE);
        let rect = Rect::at(shape.bounds.x, shape.bounds.y)
            .of_size(shape.bounds.width.max(1), shape.bounds.height.max(1));
        draw_hollow_rect_mut(&mut canvas, rect, BOX);
    }
    canvas
}

/// Copy of `img` with a dot on each picked point, joined in pick order
pub fn annotate_points(img: &RgbaImage, points: &[Point]) -> RgbaImage {
    let mut canvas = img.clone();
    draw_polyline(&mut canvas, points, points.len() == 4, MARKER);
    for p in points {
        draw_filled_circle_mut(&mut canvas, (p.x, p.y), MARKER_RADIUS, MARKER);
    }
    canvas
}
