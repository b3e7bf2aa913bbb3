pub mod cli;
pub mod color;
pub mod compose;
pub mod detection;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod io;
pub mod overlay;
pub mod points;
pub mod session;
pub mod shapes;
pub mod transform;

pub use cli::Cli;
pub use color::{apply_mask, in_range, Hsv, HsvRange};
pub use compose::{create_grid, crop, draw_primitives, resize, Region};
pub use detection::{edge_map, find_external_contours, EdgeOptions};
pub use error::VisionError;
pub use filters::{run_filter_chain, FilterStages};
pub use geometry::{compute_perspective_matrix, transform_point, BoundingBox, Point, TargetSize};
pub use io::{load_image, save_image};
pub use overlay::{annotate_points, annotate_shapes};
pub use points::PointCollector;
pub use session::WarpSession;
pub use shapes::{
    classify, label_approximations, Approximation, DetectedShape, ShapeClassifier, ShapeLabel,
};
pub use transform::{warp_perspective, Interpolation};
