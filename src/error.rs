use thiserror::Error;

/// Errors produced by the point collector, the perspective warp, the shape
/// classifier and the image compositing helpers. Every variant is recoverable by the caller.
#[derive(Debug, Error)]
pub enum VisionError {
    /// A fifth point was offered to a full point set.
    #[error("point set already holds {capacity} points; reset before adding more")]
    CapacityExceeded { capacity: usize },

    /// A warp was requested without exactly four source points.
    #[error("perspective warp needs exactly 4 points, have {have}")]
    InsufficientPoints { have: usize },

    /// The source points are collinear or duplicated, so no projective
    /// mapping exists.
    #[error("source points do not define an invertible perspective transform")]
    DegenerateTransform,

    /// A contour approximation collapsed to a zero-height bounding box.
    #[error("contour approximation has a zero-height bounding box")]
    DegenerateContour,

    #[error("invalid target size {width}x{height}: both sides must be positive")]
    InvalidTargetSize { width: u32, height: u32 },

    /// A grid layout was asked for with a different number of images than
    /// it has cells.
    #[error("a {rows}x{cols} grid needs {} images, got {images}", .rows * .cols)]
    GridMismatch {
        rows: usize,
        cols: usize,
        images: usize,
    },

    #[error("region {width}x{height} at ({x}, {y}) does not fit a {image_width}x{image_height} image")]
    InvalidRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// The image or frame source could not supply pixels.
    #[error("image source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, VisionError>;
