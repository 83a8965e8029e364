//! Core types and utilities for concentric-circle tag detection.
//!
//! A borrowed grayscale image view with bilinear sampling, ellipse geometry
//! with least-squares fitting, and the logger shared by the binaries. No
//! image codec dependency.

mod ellipse;
mod image;
mod logger;

pub use ellipse::{fit_ellipse, rms_residual, Conic, Ellipse, EllipseFitError, MIN_FIT_POINTS};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
