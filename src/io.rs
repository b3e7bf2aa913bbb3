use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::{debug, info};

use crate::error::{Result, VisionError};

/// Load and decode an image from disk.
///
/// A missing or undecodable file is reported as
/// [`VisionError::SourceUnavailable`].
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(VisionError::SourceUnavailable(format!(
            "image not found: {}",
            path.display()
        )));
    }

    let img = ImageReader::open(path)
        .map_err(|err| {
            VisionError::SourceUnavailable(format!("failed to open {}: {}", path.display(), err))
        })?
        .with_guessed_format()
        .map_err(|err| {
            VisionError::SourceUnavailable(format!("failed to read {}: {}", path.display(), err))
        })?
        .decode()
        .map_err(|err| {
            VisionError::SourceUnavailable(format!("failed to decode {}: {}", path.display(), err))
        })?;

    debug!(path = %path.display(), width = img.width(), height = img.height(), "Loaded image");
    Ok(img)
}

/// Save an image, dropping the alpha channel for formats that cannot hold it.
pub fn save_image(img: &DynamicImage, path: &Path) -> Result<()> {
    let needs_rgb = matches!(ImageFormat::from_path(path), Ok(ImageFormat::Jpeg));
    if needs_rgb && img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8()).save(path)?;
    } else {
        img.save(path)?;
    }
    info!(path = %path.display(), "Saved image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, VisionError::SourceUnavailable(_)));
    }

    #[test]
    fn test_save_then_load_jpeg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 255])));

        save_image(&img, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 8));
        assert!(!loaded.color().has_alpha());
    }
}
