//! Concentric-circle tag (CCTag) detection from image files and buffers.
//!
//! This crate provides:
//! - re-exports of the underlying `cctag-*` crates,
//! - end-to-end helpers that load an image and run the marker detector,
//! - annotation of detections on the source image,
//! - JSON config and report types plus the script-style text output,
//! - the `cctag` command-line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use cctag::{detect_from_file, format_detections};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let markers = detect_from_file("frame.png")?;
//! print!("{}", format_detections(&markers));
//! for m in markers.iter().filter(|m| m.is_reliable()) {
//!     println!("marker {} at ({:.2}, {:.2})", m.id, m.x, m.y);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `cctag::core`: grayscale views, bilinear sampling, ellipses and conic fitting.
//! - `cctag::detector`: the detector, its parameters and the marker bank.
//! - `cctag::print`: rendering markers to PNG and SVG.
//! - `cctag::detect`: load-and-detect helpers and [`DetectError`].

pub use cctag_core as core;
pub use cctag_detector as detector;
pub use cctag_print as print;

pub mod annotate;
pub mod detect;
pub mod io;

pub use annotate::{annotate, annotate_file, AnnotateError, AnnotateStyle};
pub use detect::{
    default_detector, detect_from_file, detect_from_file_with, detect_from_gray_u8,
    detect_from_gray_with, detect_from_image, detect_from_image_with, gray_view, load_gray,
    load_image, DetectError,
};
pub use io::{format_detections, DetectConfig, DetectIoError, DetectReport};

pub use cctag_detector::{
    DetectionStatus, DetectorParams, MarkerBank, MarkerDetection, MarkerDetectionResult,
    MarkerDetector,
};
