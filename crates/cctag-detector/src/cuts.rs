//! Outer-edge sampling and radial cut analysis.
//!
//! A cut is the intensity profile along `ellipse.point_at(theta, t)` with `t`
//! running from outside the marker to its center. Every circle edge of the
//! marker maps to a concentric, similar ellipse, so a crossing at parameter
//! `t_k` measures the radius ratio `t_k / t_0` directly, even under an
//! affine view.

use cctag_core::{sample_bilinear, Ellipse, GrayImageView};
use nalgebra::Point2;

use crate::components::Components;

/// Unit direction vectors at `n` evenly spaced angles.
pub(crate) fn unit_circle_lut(n: usize) -> Vec<(f64, f64)> {
    let step = std::f64::consts::TAU / n.max(1) as f64;
    (0..n)
        .map(|k| {
            let (s, c) = (k as f64 * step).sin_cos();
            (c, s)
        })
        .collect()
}

/// Sub-pixel points on the outer boundary of component `label`.
///
/// Each ray from `center` keeps the farthest sample still labeled `label`,
/// then the edge is placed at the mid-intensity crossing next to it.
pub(crate) fn outer_edge_points(
    img: &GrayImageView<'_>,
    comps: &Components,
    label: u32,
    center: (f64, f64),
    max_radius: f64,
    n_rays: usize,
) -> Vec<Point2<f64>> {
    const STEP: f64 = 0.5;
    let (cx, cy) = center;
    let mut points = Vec::with_capacity(n_rays);

    for (dx, dy) in unit_circle_lut(n_rays) {
        let mut last_hit: Option<f64> = None;
        let mut s = 0.0;
        while s <= max_radius {
            let x = (cx + dx * s).round();
            let y = (cy + dy * s).round();
            if x < 0.0 || y < 0.0 || x >= img.width as f64 || y >= img.height as f64 {
                break;
            }
            if comps.label_at(x as usize, y as usize) == label {
                last_hit = Some(s);
            }
            s += STEP;
        }
        let Some(s_hit) = last_hit else {
            continue;
        };
        if let Some(s_edge) = refine_edge(img, center, (dx, dy), s_hit) {
            points.push(Point2::new(cx + dx * s_edge, cy + dy * s_edge));
        }
    }
    points
}

// Dark-to-light crossing closest to the outside within [s - 1.5, s + 1.5].
fn refine_edge(
    img: &GrayImageView<'_>,
    (cx, cy): (f64, f64),
    (dx, dy): (f64, f64),
    s_hit: f64,
) -> Option<f64> {
    const HALF: f64 = 1.5;
    const STEP: f64 = 0.25;
    let n = (2.0 * HALF / STEP) as usize + 1;
    let profile: Vec<(f64, f32)> = (0..n)
        .map(|i| {
            let s = s_hit - HALF + i as f64 * STEP;
            let v = sample_bilinear(img, (cx + dx * s) as f32, (cy + dy * s) as f32);
            (s, v)
        })
        .collect();

    let (lo, hi) = min_max(profile.iter().map(|&(_, v)| v));
    if hi - lo < 1.0 {
        return None;
    }
    let mid = 0.5 * (lo + hi);
    profile
        .windows(2)
        .rev()
        .find(|w| w[0].1 < mid && w[1].1 >= mid)
        .map(|w| interpolate_crossing(w[0], w[1], mid))
}

fn min_max(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[inline]
fn interpolate_crossing((t0, v0): (f64, f32), (t1, v1): (f64, f32), level: f32) -> f64 {
    let dv = v1 - v0;
    if dv.abs() < f32::EPSILON {
        return 0.5 * (t0 + t1);
    }
    let frac = ((level - v0) / dv) as f64;
    t0 + frac * (t1 - t0)
}

/// Measured edges of one cut.
#[derive(Clone, Debug)]
pub(crate) struct Cut {
    /// Parametric angle of the cut on the outer ellipse.
    pub theta: f64,
    /// Edge parameters, outermost first.
    pub crossings: Vec<f64>,
    pub contrast: f32,
    /// Whether the outermost sample is on the light side.
    pub starts_light: bool,
}

impl Cut {
    /// Whether the cut shows `n_edges` edges with the first one on the
    /// outer ellipse.
    pub fn is_selected(&self, n_edges: usize, outer_tolerance: f64, min_contrast: f32) -> bool {
        self.starts_light
            && self.contrast >= min_contrast
            && self.crossings.len() == n_edges
            && (self.crossings[0] - 1.0).abs() <= outer_tolerance
    }

    /// Radius ratios `t_k / t_0` for `k >= 1`.
    pub fn ratios(&self) -> Vec<f64> {
        let t0 = self.crossings[0];
        self.crossings[1..].iter().map(|t| t / t0).collect()
    }

    /// Image point of the innermost edge.
    pub fn innermost_point(&self, ellipse: &Ellipse) -> Option<Point2<f64>> {
        self.crossings
            .last()
            .map(|&t| ellipse.point_at(self.theta, t))
    }
}

/// Sample the profile along `theta` and extract its mid-level crossings.
pub(crate) fn measure_cut(
    img: &GrayImageView<'_>,
    ellipse: &Ellipse,
    theta: f64,
    extent: f64,
) -> Cut {
    let n = ((2.0 * ellipse.a * extent).ceil() as usize).max(64);
    let profile: Vec<(f64, f32)> = (0..=n)
        .map(|i| {
            let t = extent * (1.0 - i as f64 / n as f64);
            let p = ellipse.point_at(theta, t);
            (t, sample_bilinear(img, p.x as f32, p.y as f32))
        })
        .collect();

    let (lo, hi) = min_max(profile.iter().map(|&(_, v)| v));
    let mid = 0.5 * (lo + hi);
    let contrast = hi - lo;
    let starts_light = profile[0].1 >= mid;

    let mut crossings = Vec::new();
    if contrast > 0.0 {
        for w in profile.windows(2) {
            if (w[0].1 < mid) != (w[1].1 < mid) {
                crossings.push(interpolate_crossing(w[0], w[1], mid));
            }
        }
    }

    Cut {
        theta,
        crossings,
        contrast,
        starts_light,
    }
}

/// Median of each position across equally long vectors.
pub(crate) fn per_edge_median(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|k| {
            let mut column: Vec<f64> = rows.iter().map(|r| r[k]).collect();
            column.sort_by(f64::total_cmp);
            let m = column.len() / 2;
            if column.len() % 2 == 0 {
                0.5 * (column[m - 1] + column[m])
            } else {
                column[m]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Concentric rings with a hard edge, light outside and in the center.
    fn rings_image(w: usize, h: usize, c: (f64, f64), radii: &[f64]) -> Vec<u8> {
        let mut data = vec![230u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let r = (x as f64 - c.0).hypot(y as f64 - c.1);
                let inside = radii.iter().filter(|&&ri| r < ri).count();
                if inside % 2 == 1 {
                    data[y * w + x] = 20;
                }
            }
        }
        data
    }

    #[test]
    fn cut_recovers_ring_ratios() {
        let radii = [40.0, 32.0, 24.0, 16.0];
        let data = rings_image(120, 120, (60.0, 60.0), &radii);
        let img = GrayImageView::new(120, 120, &data).unwrap();
        let ellipse = Ellipse::circle(60.0, 60.0, 40.0);

        let cut = measure_cut(&img, &ellipse, 0.3, 1.15);
        assert!(cut.starts_light);
        assert!(cut.is_selected(4, 0.1, 30.0), "crossings: {:?}", cut.crossings);
        let ratios = cut.ratios();
        assert_relative_eq!(ratios[0], 0.8, epsilon = 0.03);
        assert_relative_eq!(ratios[1], 0.6, epsilon = 0.03);
        assert_relative_eq!(ratios[2], 0.4, epsilon = 0.03);
        assert!(!cut.is_selected(6, 0.1, 30.0));
    }

    #[test]
    fn flat_cut_has_no_crossings() {
        let data = vec![128u8; 64 * 64];
        let img = GrayImageView::new(64, 64, &data).unwrap();
        let cut = measure_cut(&img, &Ellipse::circle(32.0, 32.0, 20.0), 0.0, 1.15);
        assert!(cut.crossings.is_empty());
        assert_eq!(cut.contrast, 0.0);
    }

    #[test]
    fn median_per_edge() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 30.0], vec![2.0, 20.0]];
        assert_eq!(per_edge_median(&rows), vec![2.0, 20.0]);
        let even = vec![vec![1.0], vec![2.0]];
        assert_eq!(per_edge_median(&even), vec![1.5]);
        assert!(per_edge_median(&[]).is_empty());
    }

    #[test]
    fn lut_is_unit_length() {
        for (c, s) in unit_circle_lut(16) {
            assert_relative_eq!(c * c + s * s, 1.0, epsilon = 1e-12);
        }
    }
}
