use cctag_core::{fit_ellipse, Ellipse, GrayImageView, MIN_FIT_POINTS};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::bank::{MarkerBank, MAX_CROWNS, MIN_CROWNS};
use crate::components::{label_components, Components};
use crate::cuts::{measure_cut, outer_edge_points, per_edge_median, Cut};
use crate::error::DetectorError;
use crate::rings::{group_rings, RingGroup};
use crate::status::DetectionStatus;
use crate::threshold::binarize;
use crate::types::{DetectorParams, MarkerDetection, ThresholdMode};

/// Concentric-circle marker detector.
///
/// Holds validated parameters and the bank the ids refer to. Detection
/// keeps no state between calls, so one instance can serve many threads.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    params: DetectorParams,
    bank: MarkerBank,
}

impl MarkerDetector {
    pub fn new(params: DetectorParams, bank: MarkerBank) -> Result<Self, DetectorError> {
        validate_params(&params)?;
        if bank.n_crowns() != params.n_crowns {
            return Err(DetectorError::BankMismatch {
                params: params.n_crowns,
                bank: bank.n_crowns(),
            });
        }
        Ok(Self { params, bank })
    }

    /// Detector over the built-in bank for `params.n_crowns`.
    pub fn with_builtin_bank(params: DetectorParams) -> Result<Self, DetectorError> {
        validate_params(&params)?;
        let bank = MarkerBank::builtin(params.n_crowns)?;
        Self::new(params, bank)
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn bank(&self) -> &MarkerBank {
        &self.bank
    }

    /// Detect all markers in `img`, in row-major order of their centers.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn detect(&self, img: &GrayImageView<'_>) -> Result<Vec<MarkerDetection>, DetectorError> {
        // Views built by hand skip the checked constructor.
        GrayImageView::new(img.width, img.height, img.data)?;

        let mask = binarize(img, self.params.threshold);
        let comps = label_components(&mask);
        let groups = group_rings(&comps, &self.params);
        log::debug!(
            "{} dark components, {} ring groups",
            comps.stats.len(),
            groups.len()
        );

        let candidates: Vec<MarkerDetection> = groups
            .iter()
            .map(|g| self.analyze_group(img, &comps, g))
            .collect();
        let mut markers = suppress_duplicates(candidates, self.params.min_marker_distance);
        if !self.params.keep_unreliable {
            markers.retain(MarkerDetection::is_reliable);
        }
        sort_row_major(&mut markers);

        log::info!(
            "detected {} markers ({} reliable)",
            markers.len(),
            markers.iter().filter(|m| m.is_reliable()).count()
        );
        Ok(markers)
    }

    fn analyze_group(
        &self,
        img: &GrayImageView<'_>,
        comps: &Components,
        group: &RingGroup,
    ) -> MarkerDetection {
        let p = &self.params;
        let outer = group.outer();
        let center = group.center();

        let edge_points = outer_edge_points(
            img,
            comps,
            outer.label,
            center,
            1.5 * outer.radius() + 2.0,
            p.n_cuts,
        );
        let ellipse = match fit_ellipse(&edge_points) {
            Ok(e) => e,
            Err(err) => {
                log::debug!(
                    "outer fit failed at ({:.1}, {:.1}) with {} points: {err}",
                    center.0,
                    center.1,
                    edge_points.len()
                );
                return unidentified(DetectionStatus::TooFewOuterPoints, center, 0.0, None);
            }
        };
        let ellipse_center = (ellipse.cx, ellipse.cy);

        if ellipse.axis_ratio() < p.min_axis_ratio as f64
            || ellipse.b < 0.5 * p.min_ring_diameter as f64
        {
            return unidentified(DetectionStatus::Degenerate, ellipse_center, 0.0, Some(ellipse));
        }

        let cuts: Vec<Cut> = (0..p.n_cuts)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / p.n_cuts as f64;
                measure_cut(img, &ellipse, theta, p.cut_extent as f64)
            })
            .collect();
        if cuts.iter().all(|c| c.crossings.is_empty()) {
            return unidentified(
                DetectionStatus::NoCollectedCuts,
                ellipse_center,
                0.0,
                Some(ellipse),
            );
        }

        let selected: Vec<&Cut> = cuts
            .iter()
            .filter(|c| {
                c.is_selected(
                    p.n_edges(),
                    p.outer_edge_tolerance as f64,
                    p.min_contrast,
                )
            })
            .collect();
        let quality = selected.len() as f32 / p.n_cuts as f32;
        if selected.is_empty() || quality < p.min_selected_cuts_frac {
            log::debug!(
                "{} of {} cuts selected at ({:.1}, {:.1})",
                selected.len(),
                p.n_cuts,
                ellipse.cx,
                ellipse.cy
            );
            return unidentified(
                DetectionStatus::NoSelectedCuts,
                ellipse_center,
                quality,
                Some(ellipse),
            );
        }

        let (cx, cy) = marker_center(&ellipse, &selected);
        let rows: Vec<Vec<f64>> = selected.iter().map(|c| c.ratios()).collect();
        let ratios: Vec<f32> = per_edge_median(&rows).iter().map(|&r| r as f32).collect();

        let (id, status) = match self.bank.identify(&ratios) {
            Some(m) if m.distance <= p.max_id_distance => (m.id as i32, DetectionStatus::Reliable),
            Some(m) => {
                log::debug!(
                    "nearest id {} at distance {:.4} exceeds {:.4}",
                    m.id,
                    m.distance,
                    p.max_id_distance
                );
                (m.id as i32, DetectionStatus::IdNotReliable)
            }
            None => (-1, DetectionStatus::IdNotReliable),
        };

        MarkerDetection {
            id,
            status,
            x: cx as f32,
            y: cy as f32,
            quality,
            outer_ellipse: Some(ellipse),
        }
    }
}

fn unidentified(
    status: DetectionStatus,
    (x, y): (f64, f64),
    quality: f32,
    outer_ellipse: Option<Ellipse>,
) -> MarkerDetection {
    MarkerDetection {
        id: -1,
        status,
        x: x as f32,
        y: y as f32,
        quality,
        outer_ellipse,
    }
}

/// Center of the ellipse through the innermost edge of every selected cut,
/// or the outer ellipse center when that fit is unavailable.
fn marker_center(outer: &Ellipse, selected: &[&Cut]) -> (f64, f64) {
    let inner: Vec<Point2<f64>> = selected
        .iter()
        .filter_map(|c| c.innermost_point(outer))
        .collect();
    if inner.len() < MIN_FIT_POINTS {
        return (outer.cx, outer.cy);
    }
    match fit_ellipse(&inner) {
        Ok(e) if (e.cx - outer.cx).hypot(e.cy - outer.cy) <= outer.b => (e.cx, e.cy),
        _ => (outer.cx, outer.cy),
    }
}

/// Keep the best detection within `min_distance` of each other: better
/// status first, then higher quality.
fn suppress_duplicates(mut markers: Vec<MarkerDetection>, min_distance: f32) -> Vec<MarkerDetection> {
    markers.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then(b.quality.total_cmp(&a.quality))
    });
    let mut kept: Vec<MarkerDetection> = Vec::with_capacity(markers.len());
    for m in markers {
        let close = kept
            .iter()
            .any(|k| (k.x - m.x).hypot(k.y - m.y) < min_distance);
        if !close {
            kept.push(m);
        }
    }
    kept
}

/// Smallest vertical gap, in pixels, that starts a new row.
const MIN_ROW_TOLERANCE: f32 = 2.0;

/// Order by rows, then by `x` inside a row. A marker joins the current row
/// when its `y` is within half the minor axis of the row's first marker.
fn sort_row_major(markers: &mut Vec<MarkerDetection>) {
    markers.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut keyed = Vec::with_capacity(markers.len());
    let mut row = 0usize;
    let mut row_top = f32::NEG_INFINITY;
    let mut tolerance = 0.0f32;
    for m in markers.drain(..) {
        if m.y - row_top > tolerance {
            row += 1;
            row_top = m.y;
            tolerance = m
                .outer_ellipse
                .as_ref()
                .map_or(MIN_ROW_TOLERANCE, |e| (0.5 * e.b as f32).max(MIN_ROW_TOLERANCE));
        }
        keyed.push((row, m));
    }
    keyed.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then(a.x.total_cmp(&b.x)));
    markers.extend(keyed.into_iter().map(|(_, m)| m));
}

fn validate_params(p: &DetectorParams) -> Result<(), DetectorError> {
    fn check(ok: bool, name: &'static str, reason: &'static str) -> Result<(), DetectorError> {
        if ok {
            Ok(())
        } else {
            Err(DetectorError::InvalidParams { name, reason })
        }
    }
    let positive = |v: f32| v.is_finite() && v > 0.0;
    let non_negative = |v: f32| v.is_finite() && v >= 0.0;

    check(
        (MIN_CROWNS..=MAX_CROWNS).contains(&p.n_crowns),
        "n_crowns",
        "must be in 2..=5",
    )?;
    check(p.min_ring_area > 0, "min_ring_area", "must be > 0")?;
    check(positive(p.min_ring_diameter), "min_ring_diameter", "must be > 0")?;
    check(
        non_negative(p.center_tolerance_px),
        "center_tolerance_px",
        "must be >= 0",
    )?;
    check(
        non_negative(p.center_tolerance_frac),
        "center_tolerance_frac",
        "must be >= 0",
    )?;
    check(p.n_cuts >= MIN_FIT_POINTS, "n_cuts", "must be >= 6")?;
    check(
        p.cut_extent.is_finite() && p.cut_extent > 1.0,
        "cut_extent",
        "must be > 1",
    )?;
    check(
        positive(p.outer_edge_tolerance) && p.outer_edge_tolerance < 1.0,
        "outer_edge_tolerance",
        "must be in (0, 1)",
    )?;
    check(non_negative(p.min_contrast), "min_contrast", "must be >= 0")?;
    check(
        positive(p.min_selected_cuts_frac) && p.min_selected_cuts_frac <= 1.0,
        "min_selected_cuts_frac",
        "must be in (0, 1]",
    )?;
    check(positive(p.max_id_distance), "max_id_distance", "must be > 0")?;
    check(
        positive(p.min_axis_ratio) && p.min_axis_ratio <= 1.0,
        "min_axis_ratio",
        "must be in (0, 1]",
    )?;
    check(
        non_negative(p.min_marker_distance),
        "min_marker_distance",
        "must be >= 0",
    )?;
    if let ThresholdMode::Adaptive { window, offset } = p.threshold {
        check(window >= 3, "threshold.window", "must be >= 3")?;
        check(offset.is_finite(), "threshold.offset", "must be finite")?;
    }
    Ok(())
}
