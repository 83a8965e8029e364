//! Ellipse parameters and algebraic least-squares conic fitting.

use nalgebra::{Matrix6, Point2, SymmetricEigen};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geometric ellipse in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    /// Semi-major axis.
    pub a: f64,
    /// Semi-minor axis.
    pub b: f64,
    /// Major axis direction from +x, radians in (-pi/2, pi/2].
    pub angle: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EllipseFitError {
    #[error("too few points for ellipse fit (need {needed}, got {got})")]
    TooFewPoints { needed: usize, got: usize },
    #[error("conic fit is not an ellipse")]
    NotAnEllipse,
    #[error("ellipse fit is numerically degenerate")]
    Degenerate,
}

/// General conic `A x^2 + B xy + C y^2 + D x + E y + F = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conic(pub [f64; 6]);

impl Conic {
    pub fn is_ellipse(&self) -> bool {
        let [a, b, c, ..] = self.0;
        b * b - 4.0 * a * c < 0.0
    }

    pub fn algebraic_distance(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        a * x * x + b * x * y + c * y * y + d * x + e * y + f
    }

    /// Geometric parameters, or `None` for hyperbolas, parabolas and
    /// imaginary ellipses.
    pub fn to_ellipse(self) -> Option<Ellipse> {
        let [a, b, c, d, e, f] = self.0;
        let denom = 4.0 * a * c - b * b;
        if denom <= 0.0 {
            return None;
        }

        let cx = (b * e - 2.0 * c * d) / denom;
        let cy = (b * d - 2.0 * a * e) / denom;

        let angle = if (a - c).abs() < 1e-15 {
            if b > 0.0 {
                std::f64::consts::FRAC_PI_4
            } else if b < 0.0 {
                -std::f64::consts::FRAC_PI_4
            } else {
                0.0
            }
        } else {
            0.5 * b.atan2(a - c)
        };

        let sum = a + c;
        let diff = ((a - c).powi(2) + b * b).sqrt();
        let lambda1 = 0.5 * (sum + diff);
        let lambda2 = 0.5 * (sum - diff);

        let f_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
        if f_center.abs() < 1e-15 || lambda1.abs() < 1e-15 || lambda2.abs() < 1e-15 {
            return None;
        }

        let a_sq = -f_center / lambda1;
        let b_sq = -f_center / lambda2;
        if a_sq <= 0.0 || b_sq <= 0.0 {
            return None;
        }

        let (semi_a, semi_b, angle) = if a_sq >= b_sq {
            (a_sq.sqrt(), b_sq.sqrt(), angle)
        } else {
            (b_sq.sqrt(), a_sq.sqrt(), angle + std::f64::consts::FRAC_PI_2)
        };

        let ellipse = Ellipse {
            cx,
            cy,
            a: semi_a,
            b: semi_b,
            angle: normalize_angle(angle),
        };
        ellipse.is_valid().then_some(ellipse)
    }
}

impl Ellipse {
    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Self {
            cx,
            cy,
            a: r,
            b: r,
            angle: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.a > 0.0
            && self.b > 0.0
            && self.a.is_finite()
            && self.b.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.angle.is_finite()
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.cx, self.cy)
    }

    /// Minor over major axis, in `(0, 1]`.
    pub fn axis_ratio(&self) -> f64 {
        if self.a >= self.b {
            self.b / self.a
        } else {
            self.a / self.b
        }
    }

    /// Point at parametric angle `theta` on the ellipse scaled by `scale`
    /// about its center. `scale = 1` lies on the boundary.
    #[inline]
    pub fn point_at(&self, theta: f64, scale: f64) -> Point2<f64> {
        let (sin_a, cos_a) = self.angle.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();
        let px = scale * self.a * cos_t;
        let py = scale * self.b * sin_t;
        Point2::new(
            self.cx + cos_a * px - sin_a * py,
            self.cy + sin_a * px + cos_a * py,
        )
    }

    /// `n` points evenly spaced in parametric angle.
    pub fn sample_points(&self, n: usize) -> Vec<Point2<f64>> {
        (0..n)
            .map(|i| self.point_at(std::f64::consts::TAU * i as f64 / n as f64, 1.0))
            .collect()
    }

    pub fn to_conic(&self) -> Conic {
        let (sin_a, cos_a) = self.angle.sin_cos();
        let a2 = self.a * self.a;
        let b2 = self.b * self.b;

        let ca = cos_a * cos_a / a2 + sin_a * sin_a / b2;
        let cb = 2.0 * cos_a * sin_a * (1.0 / a2 - 1.0 / b2);
        let cc = sin_a * sin_a / a2 + cos_a * cos_a / b2;
        let cd = -2.0 * ca * self.cx - cb * self.cy;
        let ce = -cb * self.cx - 2.0 * cc * self.cy;
        let cf = ca * self.cx * self.cx + cb * self.cx * self.cy + cc * self.cy * self.cy - 1.0;

        Conic([ca, cb, cc, cd, ce, cf])
    }

    /// Sampson approximation of the point-to-boundary distance.
    pub fn sampson_distance(&self, x: f64, y: f64) -> f64 {
        let conic = self.to_conic();
        let [a, b, c, d, e, _] = conic.0;
        let alg = conic.algebraic_distance(x, y);
        let gx = 2.0 * a * x + b * y + d;
        let gy = b * x + 2.0 * c * y + e;
        let grad_sq = gx * gx + gy * gy;
        if grad_sq < 1e-30 {
            return alg.abs();
        }
        alg.abs() / grad_sq.sqrt()
    }
}

pub const MIN_FIT_POINTS: usize = 6;

/// Fit an ellipse to boundary points by minimizing the algebraic distance
/// under a unit-norm constraint on the conic coefficients.
///
/// Points are shifted to their centroid and scaled to a mean distance of
/// sqrt(2) before building the scatter matrix.
pub fn fit_ellipse(points: &[Point2<f64>]) -> Result<Ellipse, EllipseFitError> {
    let n = points.len();
    if n < MIN_FIT_POINTS {
        return Err(EllipseFitError::TooFewPoints {
            needed: MIN_FIT_POINTS,
            got: n,
        });
    }

    let (mx, my, s) = normalization_params(points);
    if s <= 0.0 || !s.is_finite() {
        return Err(EllipseFitError::Degenerate);
    }

    let mut scatter = Matrix6::<f64>::zeros();
    for p in points {
        let x = (p.x - mx) * s;
        let y = (p.y - my) * s;
        let row = [x * x, x * y, y * y, x, y, 1.0];
        for i in 0..6 {
            for j in i..6 {
                scatter[(i, j)] += row[i] * row[j];
            }
        }
    }
    for i in 0..6 {
        for j in 0..i {
            scatter[(i, j)] = scatter[(j, i)];
        }
    }

    let eig = SymmetricEigen::new(scatter);
    let mut order: Vec<usize> = (0..6).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));
    let min_idx = order[0];
    let largest = eig.eigenvalues[order[5]].abs().max(1e-300);
    // A second (near) null direction means the points lie on a line pair.
    if eig.eigenvalues[order[1]].abs() < 1e-10 * largest {
        return Err(EllipseFitError::Degenerate);
    }
    let v = eig.eigenvectors.column(min_idx);
    let normalized = [v[0], v[1], v[2], v[3], v[4], v[5]];
    if normalized.iter().any(|c| !c.is_finite()) {
        return Err(EllipseFitError::Degenerate);
    }

    let conic = Conic(denormalize(normalized, mx, my, s));
    if !conic.is_ellipse() {
        return Err(EllipseFitError::NotAnEllipse);
    }
    conic.to_ellipse().ok_or(EllipseFitError::Degenerate)
}

/// Root-mean-square Sampson distance of `points` to `ellipse`.
pub fn rms_residual(ellipse: &Ellipse, points: &[Point2<f64>]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = points
        .iter()
        .map(|p| ellipse.sampson_distance(p.x, p.y).powi(2))
        .sum();
    (sum_sq / points.len() as f64).sqrt()
}

fn normalization_params(points: &[Point2<f64>]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - mx).powi(2) + (p.y - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        0.0
    };
    (mx, my, s)
}

// Substitute x' = s(x - mx), y' = s(y - my) back into the normalized conic.
fn denormalize(c: [f64; 6], mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = c;
    let s2 = s * s;

    let a = a_ * s2;
    let b = b_ * s2;
    let c = c_ * s2;
    let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
    let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
    let f =
        a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;

    [a, b, c, d, e, f]
}

fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    while angle > FRAC_PI_2 {
        angle -= PI;
    }
    while angle <= -FRAC_PI_2 {
        angle += PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tilted() -> Ellipse {
        Ellipse {
            cx: 120.0,
            cy: 75.5,
            a: 40.0,
            b: 22.0,
            angle: 0.4,
        }
    }

    #[test]
    fn fit_recovers_tilted_ellipse() {
        let e = tilted();
        let fit = fit_ellipse(&e.sample_points(48)).expect("fit");
        assert_relative_eq!(fit.cx, e.cx, epsilon = 1e-6);
        assert_relative_eq!(fit.cy, e.cy, epsilon = 1e-6);
        assert_relative_eq!(fit.a, e.a, epsilon = 1e-6);
        assert_relative_eq!(fit.b, e.b, epsilon = 1e-6);
        assert_relative_eq!(fit.angle, e.angle, epsilon = 1e-6);
    }

    #[test]
    fn fit_recovers_circle() {
        let e = Ellipse::circle(10.0, -4.0, 7.5);
        let fit = fit_ellipse(&e.sample_points(16)).expect("fit");
        assert_relative_eq!(fit.cx, 10.0, epsilon = 1e-6);
        assert_relative_eq!(fit.cy, -4.0, epsilon = 1e-6);
        assert_relative_eq!(fit.a, 7.5, epsilon = 1e-6);
        assert_relative_eq!(fit.b, 7.5, epsilon = 1e-6);
    }

    #[test]
    fn fit_rejects_too_few_points() {
        let pts = tilted().sample_points(5);
        assert_eq!(
            fit_ellipse(&pts),
            Err(EllipseFitError::TooFewPoints { needed: 6, got: 5 })
        );
    }

    #[test]
    fn collinear_points_do_not_fit() {
        let pts: Vec<_> = (0..10).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(fit_ellipse(&pts).is_err());
    }

    #[test]
    fn conic_round_trip_and_residual() {
        let e = tilted();
        let back = e.to_conic().to_ellipse().expect("ellipse");
        assert_relative_eq!(back.a, e.a, epsilon = 1e-9);
        assert_relative_eq!(back.b, e.b, epsilon = 1e-9);
        assert!(rms_residual(&e, &e.sample_points(32)) < 1e-9);

        let outside = e.point_at(0.0, 1.1);
        assert_relative_eq!(e.sampson_distance(outside.x, outside.y), 4.0, epsilon = 0.3);
    }

    #[test]
    fn point_at_follows_major_axis() {
        let e = Ellipse {
            cx: 0.0,
            cy: 0.0,
            a: 10.0,
            b: 5.0,
            angle: std::f64::consts::FRAC_PI_2,
        };
        let p = e.point_at(0.0, 1.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 10.0, epsilon = 1e-9);
        assert_relative_eq!(e.axis_ratio(), 0.5);
    }
}
