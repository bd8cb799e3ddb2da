//! The curve capability contract.
//!
//! Everything above this module (decomposition, intersection, the sweep)
//! treats curves as black boxes with a handful of operations: evaluation,
//! differentiation, coordinate root-finding, slicing, reversal. [`Curve`] is
//! the tagged sum of the supported segment kinds; derived curves (portions,
//! derivatives) are always freshly owned values.

use arrayvec::ArrayVec;
use kurbo::common::{solve_cubic, solve_quadratic};
use kurbo::{
    CubicBez, Line, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, Point, QuadBez, Rect, Vec2,
};

use crate::arc::EllipticalArc;
use crate::num::{are_near, EPSILON};
use crate::Axis;

/// The outcome of asking where a curve's coordinate equals a value.
///
/// `All` signals infinitely many solutions: the coordinate is constant and
/// sits on the queried line, as happens for a point-curve lying on it or a
/// segment parallel to the query axis. It is deliberately a separate variant
/// so callers can't mistake it for a large finite set.
#[derive(Clone, Debug, PartialEq)]
pub enum Roots {
    /// Finitely many parameter values, sorted, within `[0, 1]`.
    Finite(ArrayVec<f64, 3>),
    /// Every parameter value is a solution.
    All,
}

impl Roots {
    /// The finite solutions, treating `All` as having none to enumerate.
    pub fn as_finite(&self) -> &[f64] {
        match self {
            Roots::Finite(ts) => ts,
            Roots::All => &[],
        }
    }
}

/// One parametric curve segment over the time domain `[0, 1]`.
#[derive(Clone, Debug, serde::Serialize)]
pub enum Curve {
    /// A straight segment.
    Line(Line),
    /// A quadratic Bezier. Mostly shows up as the derivative of a cubic.
    Quad(QuadBez),
    /// A cubic Bezier.
    Cubic(CubicBez),
    /// An elliptical arc.
    Arc(EllipticalArc),
}

impl From<Line> for Curve {
    fn from(l: Line) -> Self {
        Curve::Line(l)
    }
}

impl From<QuadBez> for Curve {
    fn from(q: QuadBez) -> Self {
        Curve::Quad(q)
    }
}

impl From<CubicBez> for Curve {
    fn from(c: CubicBez) -> Self {
        Curve::Cubic(c)
    }
}

impl From<EllipticalArc> for Curve {
    fn from(a: EllipticalArc) -> Self {
        Curve::Arc(a)
    }
}

impl Curve {
    /// Evaluates the curve at time `t`.
    pub fn point_at(&self, t: f64) -> Point {
        match self {
            Curve::Line(l) => l.eval(t),
            Curve::Quad(q) => q.eval(t),
            Curve::Cubic(c) => c.eval(t),
            Curve::Arc(a) => a.point_at(t),
        }
    }

    /// The point at time 0.
    pub fn start(&self) -> Point {
        self.point_at(0.0)
    }

    /// The point at time 1.
    pub fn end(&self) -> Point {
        self.point_at(1.0)
    }

    /// The derivative, as a curve in its own right.
    pub fn derivative(&self) -> Curve {
        match self {
            Curve::Line(l) => {
                let d = (l.p1 - l.p0).to_point();
                Curve::Line(Line::new(d, d))
            }
            Curve::Quad(q) => Curve::Line(q.deriv()),
            Curve::Cubic(c) => Curve::Quad(c.deriv()),
            Curve::Arc(a) => Curve::Arc(a.derivative()),
        }
    }

    /// Polynomial coefficients (constant first) of the coordinate along
    /// `axis`, for the polynomial variants.
    fn coord_poly(&self, axis: Axis) -> ArrayVec<f64, 4> {
        let mut out = ArrayVec::new();
        match self {
            Curve::Line(l) => {
                let p0 = axis.coord(l.p0);
                let p1 = axis.coord(l.p1);
                out.push(p0);
                out.push(p1 - p0);
            }
            Curve::Quad(q) => {
                let (p0, p1, p2) = (axis.coord(q.p0), axis.coord(q.p1), axis.coord(q.p2));
                out.push(p0);
                out.push(2.0 * (p1 - p0));
                out.push(p0 - 2.0 * p1 + p2);
            }
            Curve::Cubic(c) => {
                let (p0, p1, p2, p3) = (
                    axis.coord(c.p0),
                    axis.coord(c.p1),
                    axis.coord(c.p2),
                    axis.coord(c.p3),
                );
                out.push(p0);
                out.push(3.0 * (p1 - p0));
                out.push(3.0 * (p2 - 2.0 * p1 + p0));
                out.push(p3 - 3.0 * p2 + 3.0 * p1 - p0);
            }
            Curve::Arc(_) => unreachable!("arcs are not polynomial in t"),
        }
        out
    }

    /// All times in `[0, 1]` where the coordinate along `axis` equals `v`.
    ///
    /// A curve whose coordinate is constant reports [`Roots::All`] if that
    /// constant is within `tol` of `v`, and no roots otherwise.
    pub fn roots(&self, v: f64, axis: Axis, tol: f64) -> Roots {
        if let Curve::Arc(a) = self {
            return a.roots(v, axis, tol);
        }
        let mut cs = self.coord_poly(axis);
        cs[0] -= v;
        if cs[1..].iter().all(|c| c.abs() <= EPSILON) {
            return if are_near(cs[0], 0.0, tol) {
                Roots::All
            } else {
                Roots::Finite(ArrayVec::new())
            };
        }
        let raw: ArrayVec<f64, 3> = match cs.len() {
            2 => {
                let mut one = ArrayVec::new();
                one.push(-cs[0] / cs[1]);
                one
            }
            3 => solve_quadratic(cs[0], cs[1], cs[2]).into_iter().collect(),
            _ => solve_cubic(cs[0], cs[1], cs[2], cs[3]),
        };
        let mut ts: ArrayVec<f64, 3> = ArrayVec::new();
        for t in raw {
            if !(-1e-12..=1.0 + 1e-12).contains(&t) {
                continue;
            }
            let t = t.clamp(0.0, 1.0);
            if !ts.iter().any(|s| are_near(*s, t, EPSILON)) {
                ts.push(t);
            }
        }
        ts.sort_unstable_by(|p, q| p.partial_cmp(q).unwrap());
        Roots::Finite(ts)
    }

    /// The sub-curve between times `f` and `t`.
    ///
    /// Both are clamped to `[0, 1]`. When `f > t` the result runs backward
    /// over the original; when `f ≈ t` it collapses to a point-curve.
    pub fn portion(&self, f: f64, t: f64) -> Curve {
        let f = f.clamp(0.0, 1.0);
        let t = t.clamp(0.0, 1.0);
        if are_near(f, t, EPSILON) {
            let p = self.point_at(0.5 * (f + t));
            return Curve::Line(Line::new(p, p));
        }
        match self {
            Curve::Line(l) => Curve::Line(l.subsegment(f..t)),
            Curve::Quad(q) => Curve::Quad(q.subsegment(f..t)),
            Curve::Cubic(c) => Curve::Cubic(c.subsegment(f..t)),
            Curve::Arc(a) => Curve::Arc(a.portion(f, t)),
        }
    }

    /// The same curve traversed the other way.
    pub fn reverse(&self) -> Curve {
        match self {
            Curve::Line(l) => Curve::Line(Line::new(l.p1, l.p0)),
            Curve::Quad(q) => Curve::Quad(QuadBez::new(q.p2, q.p1, q.p0)),
            Curve::Cubic(c) => Curve::Cubic(CubicBez::new(c.p3, c.p2, c.p1, c.p0)),
            Curve::Arc(a) => Curve::Arc(a.reverse()),
        }
    }

    /// The unit tangent at time `t`.
    ///
    /// Falls back to the chord direction when the derivative vanishes (a
    /// cusp or a point-curve); a point-curve with a zero chord gives the
    /// zero vector.
    pub fn unit_tangent_at(&self, t: f64) -> Vec2 {
        let d = self.derivative().point_at(t).to_vec2();
        let len2 = d.hypot2();
        if len2 > 1e-18 {
            return d / len2.sqrt();
        }
        let chord = self.end() - self.start();
        let len2 = chord.hypot2();
        if len2 > 1e-18 {
            chord / len2.sqrt()
        } else {
            Vec2::ZERO
        }
    }

    /// Axis-aligned bounds of the sub-curve between times `f` and `t`.
    pub fn bounds(&self, f: f64, t: f64) -> Rect {
        match self.portion(f, t) {
            Curve::Line(l) => Rect::from_points(l.p0, l.p1),
            Curve::Quad(q) => q.bounding_box(),
            Curve::Cubic(c) => c.bounding_box(),
            Curve::Arc(a) => a.bounding_box(),
        }
    }

    /// Axis-aligned bounds of the whole curve.
    pub fn bounding_box(&self) -> Rect {
        self.bounds(0.0, 1.0)
    }
}
