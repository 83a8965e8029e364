use serde::{Deserialize, Serialize};

use cctag_core::Ellipse;

use crate::status::DetectionStatus;

/// Binarization strategy for the ring search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// One global Otsu threshold over the whole image.
    #[default]
    Otsu,
    /// Pixel is dark when below `local_mean - offset` over a `window` box.
    Adaptive { window: usize, offset: f32 },
}

/// Parameters for marker detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Number of crowns (dark/light ring pairs) per marker.
    pub n_crowns: usize,
    pub threshold: ThresholdMode,
    /// Minimum pixel count of a dark ring component.
    pub min_ring_area: usize,
    /// Minimum bbox side of a dark ring component, pixels.
    pub min_ring_diameter: f32,
    /// Concentric grouping tolerance: `max(px, frac * outer_radius)`.
    pub center_tolerance_px: f32,
    pub center_tolerance_frac: f32,
    /// Radial cuts per marker (also rays for the outer edge).
    pub n_cuts: usize,
    /// Cuts start at this multiple of the outer ellipse.
    pub cut_extent: f32,
    /// Accepted deviation of a cut's first edge from the outer ellipse.
    pub outer_edge_tolerance: f32,
    /// Minimum max-min intensity along a cut (0..255 scale).
    pub min_contrast: f32,
    /// Fraction of `n_cuts` that must show the full ring structure.
    pub min_selected_cuts_frac: f32,
    /// Largest ratio-vector distance accepted as a reliable id.
    pub max_id_distance: f32,
    /// Minimum minor/major axis ratio of the outer ellipse.
    pub min_axis_ratio: f32,
    /// Detections closer than this (pixels) are merged.
    pub min_marker_distance: f32,
    /// Also report markers whose status is not reliable.
    pub keep_unreliable: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            n_crowns: 3,
            threshold: ThresholdMode::Otsu,
            min_ring_area: 30,
            min_ring_diameter: 12.0,
            center_tolerance_px: 2.0,
            center_tolerance_frac: 0.06,
            n_cuts: 64,
            cut_extent: 1.15,
            outer_edge_tolerance: 0.12,
            min_contrast: 30.0,
            min_selected_cuts_frac: 0.35,
            max_id_distance: 0.02,
            min_axis_ratio: 0.2,
            min_marker_distance: 5.0,
            keep_unreliable: true,
        }
    }
}

impl DetectorParams {
    pub fn with_crowns(n_crowns: usize) -> Self {
        Self {
            n_crowns,
            ..Self::default()
        }
    }

    /// Number of circle edges per marker.
    pub fn n_edges(&self) -> usize {
        2 * self.n_crowns
    }
}

/// One detected marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    /// Bank id, `-1` when identification was not reached.
    pub id: i32,
    pub status: DetectionStatus,
    /// Marker center, pixel centers at integer coordinates.
    pub x: f32,
    pub y: f32,
    /// Fraction of radial cuts that matched the ring structure.
    pub quality: f32,
    /// Fitted image of the outermost circle.
    pub outer_ellipse: Option<Ellipse>,
}

impl MarkerDetection {
    pub fn is_reliable(&self) -> bool {
        self.status.is_reliable()
    }
}

/// Ordered detections from one call, row-major by center.
pub type MarkerDetectionResult = Vec<MarkerDetection>;
