use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageReader};

use crate::core::GrayImageView;
use crate::detector::{DetectorError, DetectorParams, MarkerDetection, MarkerDetector};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level detection helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("image not found or unreadable: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Detection(#[from] DetectorError),
}

/// Detector with default parameters (3 crowns) and the built-in bank.
pub fn default_detector() -> Result<MarkerDetector, DetectError> {
    Ok(MarkerDetector::with_builtin_bank(DetectorParams::default())?)
}

/// Convert an `image::GrayImage` into the lightweight `cctag-core` view type.
pub fn gray_view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Read and decode an image file, converting it to 8-bit luma.
pub fn load_gray(path: impl AsRef<Path>) -> Result<GrayImage, DetectError> {
    Ok(load_image(path)?.to_luma8())
}

/// Read and decode an image file. The format is sniffed from the content.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(path)))]
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, DetectError> {
    let path = path.as_ref();
    let not_found = || DetectError::NotFound {
        path: path.to_path_buf(),
    };
    if !path.is_file() {
        return Err(not_found());
    }
    let reader = ImageReader::open(path)
        .map_err(|_| not_found())?
        .with_guessed_format()
        .map_err(|_| not_found())?;
    let img = reader.decode().map_err(|source| DetectError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}

/// Detect markers in an image file with the default detector.
pub fn detect_from_file(path: impl AsRef<Path>) -> Result<Vec<MarkerDetection>, DetectError> {
    let detector = default_detector()?;
    detect_from_file_with(path, &detector)
}

pub fn detect_from_file_with(
    path: impl AsRef<Path>,
    detector: &MarkerDetector,
) -> Result<Vec<MarkerDetection>, DetectError> {
    let img = load_gray(path)?;
    detect_from_gray_with(&img, detector)
}

/// Detect markers in a decoded image of any color type.
pub fn detect_from_image(img: &DynamicImage) -> Result<Vec<MarkerDetection>, DetectError> {
    let detector = default_detector()?;
    detect_from_image_with(img, &detector)
}

pub fn detect_from_image_with(
    img: &DynamicImage,
    detector: &MarkerDetector,
) -> Result<Vec<MarkerDetection>, DetectError> {
    match img {
        DynamicImage::ImageLuma8(gray) => detect_from_gray_with(gray, detector),
        other => detect_from_gray_with(&other.to_luma8(), detector),
    }
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, detector), fields(width = img.width(), height = img.height()))
)]
pub fn detect_from_gray_with(
    img: &GrayImage,
    detector: &MarkerDetector,
) -> Result<Vec<MarkerDetection>, DetectError> {
    Ok(detector.detect(&gray_view(img))?)
}

/// Detect markers in a raw row-major 8-bit buffer.
pub fn detect_from_gray_u8(
    width: usize,
    height: usize,
    pixels: &[u8],
) -> Result<Vec<MarkerDetection>, DetectError> {
    let view = GrayImageView::new(width, height, pixels).map_err(DetectorError::from)?;
    let detector = default_detector()?;
    Ok(detector.detect(&view)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ImageError;

    #[test]
    fn missing_file_is_not_found() {
        let err = detect_from_file("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, DetectError::NotFound { .. }));
        assert!(err.to_string().contains("not/here.png"));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = std::env::temp_dir();
        assert!(matches!(
            load_gray(&dir),
            Err(DetectError::NotFound { .. })
        ));
    }

    #[test]
    fn raw_buffer_is_validated() {
        let err = detect_from_gray_u8(4, 4, &[0u8; 3]).unwrap_err();
        assert!(matches!(
            err,
            DetectError::Detection(DetectorError::Image(ImageError::InvalidBuffer {
                expected: 16,
                got: 3
            }))
        ));
        assert!(detect_from_gray_u8(8, 8, &[255u8; 64])
            .expect("detect")
            .is_empty());
    }

    #[test]
    fn color_images_are_converted() {
        let rgb = image::RgbImage::from_pixel(32, 24, image::Rgb([10, 200, 30]));
        let markers = detect_from_image(&DynamicImage::ImageRgb8(rgb)).expect("detect");
        assert!(markers.is_empty());
    }
}
