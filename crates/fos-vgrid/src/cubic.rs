//! Cubic to quadratic approximation
//!
//! A cubic is first split at its inflection points (at most two), then each
//! piece is replaced by `k` quadratics whose control points are the
//! intersections of the cubic's tangents at `t = i/k` and `t = (i+1)/k`.
//! `k` grows from 1 to [`MAX_SEGMENTS`] until every quadratic stays within
//! the error bound of the cubic (a one-sided, sampled Hausdorff distance).
//! See <https://fontforge.github.io/bezier.html> for the tangent method.

use std::f64::consts::PI;
use std::ops::{Add, Div, Mul, Sub};

use crate::geometry::{Bezier2, Vec2};

/// Numeric tolerance of the solvers
const EPSILON: f64 = 1e-8;

/// Maximum quadratics per inflection-free piece
pub const MAX_SEGMENTS: usize = 8;

/// Maximum inflection points of a cubic
pub const MAX_INFLECTIONS: usize = 2;

/// Upper bound on the quadratics produced for one cubic (24)
pub const MAX_QUADS: usize = MAX_SEGMENTS * (MAX_INFLECTIONS + 1);

/// Samples per quadratic for the closeness check (`SAMPLES - 1` interior points)
const SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl Point {
    const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    fn length_sq(self) -> f64 {
        self.dot(self)
    }

    fn length(self) -> f64 {
        self.length_sq().sqrt()
    }
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Point::new(v.x as f64, v.y as f64)
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(p.x as f32, p.y as f32)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Cubic Bézier `(p1, c1, c2, p2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    pub p1: Vec2,
    pub c1: Vec2,
    pub c2: Vec2,
    pub p2: Vec2,
}

impl Cubic {
    pub const fn new(p1: Vec2, c1: Vec2, c2: Vec2, p2: Vec2) -> Self {
        Self { p1, c1, c2, p2 }
    }

    /// Point on the cubic at parameter `t`
    pub fn point_at(&self, t: f32) -> Vec2 {
        let c = CubicF64::from(*self);
        PowerBasis::of(&c).point(t as f64).into()
    }
}

#[derive(Debug, Clone, Copy)]
struct CubicF64 {
    p1: Point,
    c1: Point,
    c2: Point,
    p2: Point,
}

impl From<Cubic> for CubicF64 {
    fn from(c: Cubic) -> Self {
        Self {
            p1: c.p1.into(),
            c1: c.c1.into(),
            c2: c.c2.into(),
            p2: c.p2.into(),
        }
    }
}

impl CubicF64 {
    /// de Casteljau split at `t`
    fn split(&self, t: f64) -> (CubicF64, CubicF64) {
        let u = 1.0 - t;
        let b = self.p1 * u + self.c1 * t;
        let s = self.c1 * u + self.c2 * t;
        let f = self.c2 * u + self.p2 * t;
        let c = b * u + s * t;
        let e = s * u + f * t;
        let d = c * u + e * t;
        (
            CubicF64 { p1: self.p1, c1: b, c2: c, p2: d },
            CubicF64 { p1: d, c1: e, c2: f, p2: self.p2 },
        )
    }

    /// Parameters of the inflection points in `(0, 1)`, ascending.
    ///
    /// See <http://www.caffeineowl.com/graphics/2d/vectorial/cubic-inflexion.html>.
    fn inflections(&self) -> Vec<f64> {
        let (x1, y1) = (self.p1.x, self.p1.y);
        let (x2, y2) = (self.c1.x, self.c1.y);
        let (x3, y3) = (self.c2.x, self.c2.y);
        let (x4, y4) = (self.p2.x, self.p2.y);

        let p = -(x4 * (y1 - 2.0 * y2 + y3)) + x3 * (2.0 * y1 - 3.0 * y2 + y4)
            + x1 * (y2 - 2.0 * y3 + y4)
            - x2 * (y1 - 3.0 * y3 + 2.0 * y4);
        let q = x4 * (y1 - y2) + 3.0 * x3 * (-y1 + y2) + x2 * (2.0 * y1 - 3.0 * y3 + y4)
            - x1 * (2.0 * y2 - 3.0 * y3 + y4);
        let r = x3 * (y1 - y2) + x1 * (y2 - y3) + x2 * (-y1 + y3);

        let mut out: Vec<f64> = solve_quadratic(p, q, r)
            .into_iter()
            .filter(|&t| t > EPSILON && t < 1.0 - EPSILON)
            .collect();
        out.sort_by(f64::total_cmp);
        out.truncate(MAX_INFLECTIONS);
        out
    }
}

/// `f(t) = a t³ + b t² + c t + d`
#[derive(Debug, Clone, Copy)]
struct PowerBasis {
    a: Point,
    b: Point,
    c: Point,
    d: Point,
}

impl PowerBasis {
    fn of(cubic: &CubicF64) -> Self {
        let CubicF64 { p1, c1, c2, p2 } = *cubic;
        Self {
            a: (p2 - p1) + (c1 - c2) * 3.0,
            b: (p1 + c2) * 3.0 - c1 * 6.0,
            c: (c1 - p1) * 3.0,
            d: p1,
        }
    }

    fn point(&self, t: f64) -> Point {
        ((self.a * t + self.b) * t + self.c) * t + self.d
    }

    fn derivative(&self, t: f64) -> Point {
        (self.a * (3.0 * t) + self.b * 2.0) * t + self.c
    }

    /// Quadratic over `[t1, t2]` whose control point is the intersection of
    /// the tangents at both ends.
    ///
    /// With `D = -fx'(t1) fy'(t2) + fx'(t2) fy'(t1)`:
    /// `cx = [fx'(t1)(fy(t2) fx'(t2) - fx(t2) fy'(t2)) + fx'(t2)(fx(t1) fy'(t1) - fy(t1) fx'(t1))] / D`
    /// and symmetrically for `cy`. Parallel tangents give a straight quadratic.
    fn tangent_quad(&self, t1: f64, t2: f64) -> Quad {
        let f1 = self.point(t1);
        let f2 = self.point(t2);
        let d1 = self.derivative(t1);
        let d2 = self.derivative(t2);

        let denom = -d1.x * d2.y + d2.x * d1.y;
        if denom.abs() < EPSILON {
            return Quad { p1: f1, c: (f1 + f2) / 2.0, p2: f2 };
        }

        let k2 = f2.y * d2.x - f2.x * d2.y;
        let k1 = f1.x * d1.y - f1.y * d1.x;
        let cx = (d1.x * k2 + d2.x * k1) / denom;
        let cy = (d1.y * k2 + d2.y * k1) / denom;
        Quad { p1: f1, c: Point::new(cx, cy), p2: f2 }
    }

    /// Whether `quad` stays within `bound` of the cubic on `[tmin, tmax]`.
    ///
    /// Only checks points of the cubic against the quadratic, not the
    /// reverse direction; the shared end points are skipped.
    fn is_close(&self, tmin: f64, tmax: f64, quad: &Quad, bound: f64) -> bool {
        let dt = (tmax - tmin) / SAMPLES as f64;
        (1..SAMPLES).all(|i| {
            let point = self.point(tmin + dt * i as f64);
            quad.distance_to(point) <= bound
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Quad {
    p1: Point,
    c: Point,
    p2: Point,
}

impl Quad {
    /// Minimum distance from `point` to the curve.
    ///
    /// With `f(t) = a t² + b t + c`, extremes of `|f(t) - point|` satisfy
    /// `(f(t) - point) · f'(t) = 0`, a cubic in `t`. The minimum is taken over
    /// its roots in `(0, 1)` and both end points.
    fn distance_to(&self, point: Point) -> f64 {
        let a = self.p1 + self.p2 - self.c * 2.0;
        let b = (self.c - self.p1) * 2.0;
        let c = self.p1;
        let rel = c - point;

        let e3 = 2.0 * a.length_sq();
        let e2 = 3.0 * a.dot(b);
        let e1 = b.length_sq() + 2.0 * a.dot(rel);
        let e0 = rel.dot(b);

        solve_cubic(e3, e2, e1, e0)
            .into_iter()
            .filter(|&t| t > EPSILON && t < 1.0 - EPSILON)
            .chain([0.0, 1.0])
            .map(|t| ((a * t + b) * t + c - point).length())
            .fold(f64::INFINITY, f64::min)
    }

    fn to_bezier(self) -> Bezier2 {
        Bezier2::new(self.p1.into(), self.c.into(), self.p2.into())
    }
}

/// Real roots of `a x² + b x + c = 0`
fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < EPSILON {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc.abs() < EPSILON {
        return vec![-b / (2.0 * a)];
    }
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    vec![(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
}

/// Real roots of `a x³ + b x² + c x + d = 0`.
///
/// Cardano's method in the form described by R.W.D. Nickalls,
/// "A new approach to solving the cubic" (doi:10.2307/3619777).
fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a.abs() < EPSILON {
        return solve_quadratic(b, c, d);
    }
    let xn = -b / (3.0 * a);
    let yn = ((a * xn + b) * xn + c) * xn + d;
    let delta_sq = (b * b - 3.0 * a * c) / (9.0 * a * a);
    let h_sq = 4.0 * a * a * delta_sq.powi(3);
    let d3 = yn * yn - h_sq;

    if d3.abs() < EPSILON {
        let delta1 = (yn / (2.0 * a)).cbrt();
        return vec![xn - 2.0 * delta1, xn + delta1];
    }
    if d3 > 0.0 {
        let d3_sqrt = d3.sqrt();
        let root = xn + ((-yn + d3_sqrt) / (2.0 * a)).cbrt() + ((-yn - d3_sqrt) / (2.0 * a)).cbrt();
        return vec![root];
    }

    let theta = (-yn / h_sq.sqrt()).clamp(-1.0, 1.0).acos() / 3.0;
    let delta = delta_sq.sqrt();
    vec![
        xn + 2.0 * delta * theta.cos(),
        xn + 2.0 * delta * (theta + PI * 2.0 / 3.0).cos(),
        xn + 2.0 * delta * (theta + PI * 4.0 / 3.0).cos(),
    ]
}

/// Approximate one inflection-free cubic with 1..=8 quadratics
fn approximate_piece(cubic: &CubicF64, error_bound: f64, out: &mut Vec<Bezier2>) {
    let basis = PowerBasis::of(cubic);
    let mut quads: Vec<Quad> = Vec::with_capacity(MAX_SEGMENTS);

    for count in 1..=MAX_SEGMENTS {
        quads.clear();
        let step = 1.0 / count as f64;
        quads.extend((0..count).map(|i| {
            let t = i as f64 * step;
            basis.tangent_quad(t, t + step)
        }));

        // A single control point on the wrong side of the control polygon
        // means the approximation bends the opposite way
        if count == 1 {
            let c = quads[0].c;
            if (c - cubic.p1).dot(cubic.c1 - cubic.p1) < 0.0
                || (c - cubic.p2).dot(cubic.c2 - cubic.p2) < 0.0
            {
                continue;
            }
        }

        let close = quads.iter().enumerate().all(|(i, quad)| {
            basis.is_close(i as f64 * step, (i + 1) as f64 * step, quad, error_bound)
        });
        if close {
            break;
        }
    }

    out.extend(quads.iter().map(|q| q.to_bezier()));
}

/// Approximate a cubic by a spline of 1..=24 quadratics laid end to end.
///
/// `error_bound` is the largest tolerated distance (in the cubic's units)
/// between sampled points of the cubic and the quadratic spline.
pub fn cubic_to_quads(cubic: &Cubic, error_bound: f32) -> Vec<Bezier2> {
    let error_bound = error_bound as f64;
    let mut remaining = CubicF64::from(*cubic);
    let mut out = Vec::new();
    let mut prev = 0.0;

    for t in remaining.inflections() {
        // `remaining` covers [prev, 1] of the input parameter range
        let (head, tail) = remaining.split(1.0 - (1.0 - t) / (1.0 - prev));
        approximate_piece(&head, error_bound, &mut out);
        remaining = tail;
        prev = t;
    }
    approximate_piece(&remaining, error_bound, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn distance_to_cubic(cubic: &Cubic, p: Vec2) -> f32 {
        (0..=2000)
            .map(|i| {
                let q = cubic.point_at(i as f32 / 2000.0);
                ((q.x - p.x).powi(2) + (q.y - p.y).powi(2)).sqrt()
            })
            .fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn test_quadratic_solver() {
        let mut roots = solve_quadratic(1.0, -3.0, 2.0);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 2);
        assert!((roots[0] - 1.0).abs() < 1e-9);
        assert!((roots[1] - 2.0).abs() < 1e-9);
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
        assert_eq!(solve_quadratic(0.0, 2.0, -1.0), vec![0.5]);
    }

    #[test]
    fn test_cubic_solver_three_roots() {
        // (x - 0.25)(x - 0.5)(x - 0.75)
        let mut roots = solve_cubic(1.0, -1.5, 0.6875, -0.09375);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        for (r, expected) in roots.iter().zip([0.25, 0.5, 0.75]) {
            assert!((r - expected).abs() < 1e-6, "{r} != {expected}");
        }
    }

    #[test]
    fn test_cubic_solver_single_root() {
        // x³ + x - 2 = (x - 1)(x² + x + 2)
        let roots = solve_cubic(1.0, 0.0, 1.0, -2.0);
        assert_eq!(roots.len(), 1);
        assert!((roots[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_quadratic_cubic_is_exact() {
        // Degree-elevated quadratic (0,0) (50,100) (100,0)
        let cubic = Cubic::new(
            v(0.0, 0.0),
            v(100.0 / 3.0, 200.0 / 3.0),
            v(200.0 / 3.0, 200.0 / 3.0),
            v(100.0, 0.0),
        );
        let quads = cubic_to_quads(&cubic, 1.0);
        assert_eq!(quads.len(), 1);
        let q = quads[0];
        assert!((q.c.x - 50.0).abs() < 1e-3);
        assert!((q.c.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_straight_cubic() {
        let cubic = Cubic::new(v(0.0, 0.0), v(10.0, 10.0), v(20.0, 20.0), v(30.0, 30.0));
        let quads = cubic_to_quads(&cubic, 1.0);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].e0, v(0.0, 0.0));
        assert_eq!(quads[0].e1, v(30.0, 30.0));
    }

    #[test]
    fn test_s_curve_splits_at_inflection() {
        let cubic = Cubic::new(v(0.0, 0.0), v(100.0, 200.0), v(200.0, -100.0), v(300.0, 100.0));
        let c = CubicF64::from(cubic);
        let inflections = c.inflections();
        assert_eq!(inflections.len(), 1);
        assert!((inflections[0] - 0.5).abs() < 1e-9);

        let quads = cubic_to_quads(&cubic, 5.0);
        assert!((4..=16).contains(&quads.len()), "got {} quads", quads.len());
        for q in &quads {
            assert!(distance_to_cubic(&cubic, q.e0) <= 5.0);
            assert!(distance_to_cubic(&cubic, q.e1) <= 5.0);
        }
    }

    #[test]
    fn test_two_inflections_bounded() {
        let cubic = Cubic::new(v(0.0, 0.0), v(10.0, 20.0), v(0.0, 10.0), v(20.0, 20.0));
        assert_eq!(CubicF64::from(cubic).inflections().len(), 2);
        let quads = cubic_to_quads(&cubic, 0.01);
        assert!(quads.len() >= 3);
        assert!(quads.len() <= MAX_QUADS);
    }

    #[test]
    fn test_spline_is_continuous() {
        let cubic = Cubic::new(v(0.0, 0.0), v(0.0, 500.0), v(800.0, 700.0), v(900.0, 0.0));
        let quads = cubic_to_quads(&cubic, 2.0);
        assert_eq!(quads.first().map(|q| q.e0), Some(cubic.p1));
        let last = quads.last().map(|q| q.e1).unwrap();
        assert!((last.x - 900.0).abs() < 1e-3 && last.y.abs() < 1e-3);
        for pair in quads.windows(2) {
            let gap = pair[0].e1 - pair[1].e0;
            assert!(gap.x.abs() < 1e-3 && gap.y.abs() < 1e-3);
        }
    }

    #[test]
    fn test_tighter_bound_needs_more_quads() {
        let cubic = Cubic::new(v(0.0, 0.0), v(0.0, 500.0), v(800.0, 700.0), v(900.0, 0.0));
        let coarse = cubic_to_quads(&cubic, 50.0).len();
        let fine = cubic_to_quads(&cubic, 0.5).len();
        assert!(fine >= coarse);
        assert!(fine <= MAX_SEGMENTS * 3);
    }
}
