//! Printable CCTag markers.
//!
//! Raster output is anti-aliased with 4x4 supersampling and can simulate an
//! oblique view (anisotropic scale plus rotation), which makes it suitable
//! both for printing and for synthetic detection fixtures. Vector output is
//! a stack of filled circles in millimeters.

mod raster;
mod svg;

use std::path::PathBuf;

use thiserror::Error;

pub use raster::{render_marker, render_sheet, write_png, MarkerRenderSpec, Placement};
pub use svg::{marker_svg, write_svg};

#[derive(Error, Debug)]
pub enum PrintError {
    #[error("unknown marker id {id} (bank has {len} ids)")]
    UnknownId { id: usize, len: usize },
    #[error("invalid render spec: {0}")]
    InvalidSpec(&'static str),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Png(#[from] png::EncodingError),
}

pub(crate) fn marker_radii(
    bank: &cctag_detector::MarkerBank,
    id: usize,
) -> Result<Vec<f32>, PrintError> {
    bank.radii(id).ok_or(PrintError::UnknownId {
        id,
        len: bank.len(),
    })
}
