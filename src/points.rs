use tracing::debug;

use crate::error::{Result, VisionError};
use crate::geometry::Point;

/// Maximum number of points a collector accepts before it must be reset.
pub const MAX_POINTS: usize = 4;

/// Accumulates up to four picked points in arrival order.
///
/// Points are never sorted or deduplicated: the order they were picked in is
/// the order used when computing a perspective transform.
#[derive(Debug, Clone, Default)]
pub struct PointCollector {
    points: Vec<Point>,
}

impl PointCollector {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(MAX_POINTS),
        }
    }

    /// Append a point, returning the new count.
    ///
    /// Fails with [`VisionError::CapacityExceeded`] once four points are held;
    /// the set is left untouched in that case.
    pub fn add_point(&mut self, point: Point) -> Result<usize> {
        if self.points.len() >= MAX_POINTS {
            return Err(VisionError::CapacityExceeded {
                capacity: MAX_POINTS,
            });
        }
        self.points.push(point);
        debug!(x = point.x, y = point.y, count = self.points.len(), "Point added");
        Ok(self.points.len())
    }

    pub fn reset(&mut self) {
        self.points.clear();
        debug!("Points reset");
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == MAX_POINTS
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}
