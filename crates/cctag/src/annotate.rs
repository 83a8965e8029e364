//! Visual overlay of detections on the source image.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

use crate::detect::{load_image, DetectError};
use crate::detector::MarkerDetection;

/// How detections are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateStyle {
    /// Filled circle radius, pixels.
    pub radius: i32,
    pub color: [u8; 3],
    /// Draw only markers with a reliable id.
    pub reliable_only: bool,
}

impl Default for AnnotateStyle {
    fn default() -> Self {
        Self {
            radius: 10,
            color: [0, 255, 0],
            reliable_only: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AnnotateError {
    #[error(transparent)]
    Read(#[from] DetectError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// RGB copy of `img` with a filled circle at each detection center.
pub fn annotate(
    img: &DynamicImage,
    detections: &[MarkerDetection],
    style: &AnnotateStyle,
) -> RgbImage {
    let mut out = img.to_rgb8();
    for m in detections
        .iter()
        .filter(|m| !style.reliable_only || m.is_reliable())
    {
        let center = (m.x.round() as i32, m.y.round() as i32);
        draw_filled_circle_mut(&mut out, center, style.radius, Rgb(style.color));
    }
    out
}

/// Annotate the image at `input` and save it to `output`; the output format
/// follows its extension.
pub fn annotate_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    detections: &[MarkerDetection],
    style: &AnnotateStyle,
) -> Result<(), AnnotateError> {
    let img = load_image(input)?;
    let output = output.as_ref();
    annotate(&img, detections, style)
        .save(output)
        .map_err(|source| AnnotateError::Write {
            path: output.to_path_buf(),
            source,
        })?;
    log::info!("annotated image written to {}", output.display());
    Ok(())
}
