//! Concentric-circle tag (CCTag) detection.
//!
//! Pipeline:
//! - binarize the image (global Otsu or local-mean adaptive threshold),
//! - label 8-connected dark components and keep those shaped like rings,
//! - group concentric rings into marker candidates,
//! - fit the outer ellipse from sub-pixel boundary points,
//! - read the radius ratios of every ring edge along radial cuts,
//! - identify the ratio vector against a [`MarkerBank`].
//!
//! ```no_run
//! use cctag_core::GrayImageView;
//! use cctag_detector::{DetectorParams, MarkerDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pixels = vec![255u8; 640 * 480];
//! let img = GrayImageView::new(640, 480, &pixels)?;
//! let detector = MarkerDetector::with_builtin_bank(DetectorParams::default())?;
//! for m in detector.detect(&img)? {
//!     println!("{} {} ({}, {})", m.id, m.status, m.x, m.y);
//! }
//! # Ok(())
//! # }
//! ```

mod bank;
mod components;
mod cuts;
mod detector;
mod error;
mod rings;
mod status;
mod threshold;
mod types;

pub use bank::{BankError, IdMatch, MarkerBank, BUILTIN_MIN_SEPARATION, MAX_CROWNS, MIN_CROWNS};
pub use detector::MarkerDetector;
pub use error::DetectorError;
pub use status::DetectionStatus;
pub use types::{DetectorParams, MarkerDetection, MarkerDetectionResult, ThresholdMode};
