//! Elliptical arc segments.
//!
//! Arcs are kept in endpoint parameterization (the two endpoints, the two
//! rays, the axis rotation, and the large-arc/sweep flags), with the center
//! and angles derived at construction time. Endpoint parameterization is what
//! slicing and reversal have to preserve, so [`EllipticalArc::portion`]
//! re-derives the sub-arc from its new endpoints rather than inheriting the
//! flags of the arc it came from.

use std::f64::consts::{PI, TAU};

use arrayvec::ArrayVec;
use kurbo::{Point, Rect, Vec2};

use crate::num::{are_near, are_near_points, EPSILON};
use crate::{Axis, Roots};

/// Slack used when deciding whether an angle lies on the arc.
///
/// This is an angular quantity, independent of the caller's spatial
/// tolerance; it only absorbs rounding in the trigonometric round trips.
const ANGLE_EPS: f64 = 1e-9;

/// Failure modes of arc construction.
///
/// These are distinct outcomes on purpose: a caller that asked for an
/// unsatisfiable arc may retry with different radii, while coincident
/// endpoints mean the arc is undetermined no matter the radii.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcError {
    /// The constraints admit no arc: a zero ray, or rays too short to span
    /// the endpoints.
    NoSolution,
    /// The constraints admit every arc: the endpoints coincide, so any
    /// center at ray-distance works.
    InfiniteSolutions,
}

impl std::fmt::Display for ArcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArcError::NoSolution => write!(f, "no arc satisfies the given endpoints and rays"),
            ArcError::InfiniteSolutions => {
                write!(f, "every arc satisfies the given endpoints and rays")
            }
        }
    }
}

impl std::error::Error for ArcError {}

/// One elliptical arc segment, parameterized over `[0, 1]` by angle.
#[derive(Clone, Debug, serde::Serialize)]
pub struct EllipticalArc {
    ip: Point,
    fp: Point,
    rx: f64,
    ry: f64,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
    // Derived at construction.
    center: Point,
    start_angle: f64,
    delta: f64,
}

fn normalize_angle(a: f64) -> f64 {
    a.rem_euclid(TAU)
}

impl EllipticalArc {
    /// Builds an arc from its endpoint parameterization.
    ///
    /// This is the endpoint-to-center derivation: map the endpoints into the
    /// ellipse's own frame, solve for the center that puts both on the unit
    /// circle, then pick the center and angular span matching the
    /// `large_arc`/`sweep` flags.
    pub fn from_endpoints(
        from: Point,
        to: Point,
        rx: f64,
        ry: f64,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
    ) -> Result<EllipticalArc, ArcError> {
        if are_near_points(from, to, EPSILON) {
            return Err(ArcError::InfiniteSolutions);
        }
        let rx = rx.abs();
        let ry = ry.abs();
        if rx <= EPSILON || ry <= EPSILON {
            return Err(ArcError::NoSolution);
        }

        let (sin_phi, cos_phi) = rotation.sin_cos();
        let d = (from - to) / 2.0;
        let x1p = cos_phi * d.x + sin_phi * d.y;
        let y1p = -sin_phi * d.x + cos_phi * d.y;

        // If this is much greater than one, the rays are too short to reach
        // both endpoints. Just above one is rounding noise from the frame
        // change (portion() hits this constantly) and gets clamped.
        let lambda = (x1p / rx).powi(2) + (y1p / ry).powi(2);
        if lambda > 1.0 + 1e-9 {
            return Err(ArcError::NoSolution);
        }

        let num = (rx * ry).powi(2) - (rx * y1p).powi(2) - (ry * x1p).powi(2);
        let den = (rx * y1p).powi(2) + (ry * x1p).powi(2);
        let radicand = (num / den).max(0.0);
        let coef = if large_arc == sweep {
            -radicand.sqrt()
        } else {
            radicand.sqrt()
        };
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;

        let mid = from.midpoint(to);
        let center = Point::new(
            cos_phi * cxp - sin_phi * cyp + mid.x,
            sin_phi * cxp + cos_phi * cyp + mid.y,
        );

        let u = Vec2::new((x1p - cxp) / rx, (y1p - cyp) / ry);
        let v = Vec2::new((-x1p - cxp) / rx, (-y1p - cyp) / ry);
        let start_angle = normalize_angle(u.y.atan2(u.x));
        let mut delta = (v.y.atan2(v.x) - u.y.atan2(u.x)).rem_euclid(TAU);
        if !sweep && delta > 0.0 {
            delta -= TAU;
        }

        Ok(EllipticalArc {
            ip: from,
            fp: to,
            rx,
            ry,
            rotation,
            large_arc,
            sweep,
            center,
            start_angle,
            delta,
        })
    }

    /// Builds an arc from its center parameterization.
    ///
    /// `delta` is the signed angular span, clamped to `[-2π, 2π]`; positive
    /// spans run in the direction of increasing angle. Unlike
    /// [`from_endpoints`](Self::from_endpoints) this can represent a full
    /// ellipse (`delta = ±2π`), whose endpoints coincide.
    pub fn new(center: Point, radii: Vec2, rotation: f64, start_angle: f64, delta: f64) -> Self {
        let rx = radii.x.abs();
        let ry = radii.y.abs();
        let start_angle = normalize_angle(start_angle);
        let delta = delta.clamp(-TAU, TAU);
        let mut arc = EllipticalArc {
            ip: Point::ORIGIN,
            fp: Point::ORIGIN,
            rx,
            ry,
            rotation,
            large_arc: delta.abs() > PI,
            sweep: delta >= 0.0,
            center,
            start_angle,
            delta,
        };
        arc.ip = arc.point_at_angle(start_angle);
        arc.fp = arc.point_at_angle(start_angle + delta);
        arc
    }

    /// The arc's starting point (time 0).
    pub fn initial_point(&self) -> Point {
        self.ip
    }

    /// The arc's final point (time 1).
    pub fn final_point(&self) -> Point {
        self.fp
    }

    /// The derived center.
    pub fn center(&self) -> Point {
        self.center
    }

    /// The two rays, x first.
    pub fn radii(&self) -> Vec2 {
        Vec2::new(self.rx, self.ry)
    }

    /// Rotation of the ellipse's x axis, in radians.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// The starting angle, normalized into `[0, 2π)`.
    pub fn start_angle(&self) -> f64 {
        self.start_angle
    }

    /// The signed angular span.
    pub fn sweep_angle(&self) -> f64 {
        self.delta
    }

    /// Is the subtended angle larger than half a turn?
    pub fn large_arc(&self) -> bool {
        self.large_arc
    }

    /// Does the arc run in the direction of increasing angle?
    pub fn sweep(&self) -> bool {
        self.sweep
    }

    /// True if the arc has collapsed to (nearly) a single point.
    pub fn is_degenerate(&self) -> bool {
        (self.rx <= EPSILON && self.ry <= EPSILON) || self.delta.abs() <= ANGLE_EPS
    }

    fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + self.delta * t
    }

    /// Evaluates the ellipse (not just the arc) at an angle.
    pub fn point_at_angle(&self, theta: f64) -> Point {
        let (sin_phi, cos_phi) = self.rotation.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();
        Point::new(
            self.center.x + self.rx * cos_t * cos_phi - self.ry * sin_t * sin_phi,
            self.center.y + self.rx * cos_t * sin_phi + self.ry * sin_t * cos_phi,
        )
    }

    /// Evaluates the arc at time `t`.
    ///
    /// The cached endpoints are returned exactly at `t = 0` and `t = 1`, so
    /// arcs built with `from_endpoints` interpolate their inputs without
    /// trigonometric round-trip error.
    pub fn point_at(&self, t: f64) -> Point {
        if t == 0.0 {
            self.ip
        } else if t == 1.0 {
            self.fp
        } else {
            self.point_at_angle(self.angle_at(t))
        }
    }

    /// The coordinate along `axis`, as a function of angle, is
    /// `c0 + a cos θ + b sin θ`; returns `(a, b, c0)`.
    fn coeffs(&self, axis: Axis) -> (f64, f64, f64) {
        let (sin_phi, cos_phi) = self.rotation.sin_cos();
        match axis {
            Axis::X => (self.rx * cos_phi, -self.ry * sin_phi, self.center.x),
            Axis::Y => (self.rx * sin_phi, self.ry * cos_phi, self.center.y),
        }
    }

    /// Maps an angle back into the arc's time domain, or `None` when the
    /// ellipse point at that angle is not on the arc.
    fn time_of_angle(&self, theta: f64) -> Option<f64> {
        let span = self.delta.abs();
        let dist = if self.delta >= 0.0 {
            (theta - self.start_angle).rem_euclid(TAU)
        } else {
            (self.start_angle - theta).rem_euclid(TAU)
        };
        if span <= ANGLE_EPS {
            return (dist <= ANGLE_EPS || dist >= TAU - ANGLE_EPS).then_some(0.0);
        }
        if dist <= span + ANGLE_EPS {
            Some((dist / span).min(1.0))
        } else if dist >= TAU - ANGLE_EPS {
            Some(0.0)
        } else {
            None
        }
    }

    /// Solves `a cos θ + b sin θ = c` for `θ` in `[0, 2π)`.
    ///
    /// Uses the half-angle substitution `s = tan(θ/2)`, which turns the
    /// equation into `(c + a) s² − 2 b s + (c − a) = 0`; `θ = π` (where `s`
    /// blows up) is handled as the leading coefficient vanishing.
    fn angle_solutions(a: f64, b: f64, c: f64) -> ArrayVec<f64, 3> {
        let mut out = ArrayVec::new();
        let scale = a.abs().max(b.abs()).max(c.abs());
        let qa = c + a;
        let qb = -2.0 * b;
        let qc = c - a;
        if qa.abs() <= scale * 1e-12 {
            // cos π = −1, sin π = 0, so θ = π solves −a = c, which is
            // exactly the vanishing of the s² coefficient.
            out.push(PI);
            if qb.abs() > scale * 1e-12 {
                out.push(normalize_angle(2.0 * (-qc / qb).atan()));
            }
            return out;
        }
        let mut disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            if disc >= -(scale * scale) * 1e-12 {
                disc = 0.0;
            } else {
                return out;
            }
        }
        // Standard stable form: compute the larger-magnitude root first and
        // get the other by Vieta, to avoid cancellation.
        let q = -0.5 * (qb + disc.sqrt().copysign(qb));
        if q == 0.0 {
            out.push(normalize_angle(2.0 * (-qb / (2.0 * qa)).atan()));
            return out;
        }
        let s1 = q / qa;
        let s2 = qc / q;
        out.push(normalize_angle(2.0 * s1.atan()));
        if (s1 - s2).abs() > 1e-15 {
            out.push(normalize_angle(2.0 * s2.atan()));
        }
        out
    }

    /// All times in `[0, 1]` where the arc's coordinate along `axis` equals
    /// `v`.
    ///
    /// A degenerate arc whose coordinate never moves reports
    /// [`Roots::All`] when it sits on the query line (within `tol`), and no
    /// roots otherwise; those are different answers, and callers rely on the
    /// distinction.
    pub fn roots(&self, v: f64, axis: Axis, tol: f64) -> Roots {
        let (a, b, c0) = self.coeffs(axis);
        let c = v - c0;
        if a.abs() <= EPSILON && b.abs() <= EPSILON {
            return if are_near(c, 0.0, tol) {
                Roots::All
            } else {
                Roots::Finite(ArrayVec::new())
            };
        }
        let mut times: ArrayVec<f64, 3> = ArrayVec::new();
        for theta in Self::angle_solutions(a, b, c) {
            if let Some(t) = self.time_of_angle(theta) {
                if !times.iter().any(|s| are_near(*s, t, EPSILON)) && !times.is_full() {
                    times.push(t);
                }
            }
        }
        times.sort_unstable_by(|p, q| p.partial_cmp(q).unwrap());
        Roots::Finite(times)
    }

    /// The sub-arc between times `f` and `t` (reversed when `f > t`).
    ///
    /// The result is re-derived from its new endpoints: the large-arc flag is
    /// recomputed from the actual subtended angle, since slicing does not
    /// preserve the endpoint encoding of the whole arc.
    pub fn portion(&self, f: f64, t: f64) -> EllipticalArc {
        let f = f.clamp(0.0, 1.0);
        let t = t.clamp(0.0, 1.0);
        if f == 0.0 && t == 1.0 {
            return self.clone();
        }
        if f == 1.0 && t == 0.0 {
            return self.reverse();
        }
        let sub = self.delta * (t - f);
        let p0 = self.point_at(f);
        let p1 = self.point_at(t);
        Self::from_endpoints(p0, p1, self.rx, self.ry, self.rotation, sub.abs() > PI, sub > 0.0)
            .unwrap_or_else(|_| {
                // The sub-arc's endpoints coincide (a full or near-full
                // wrap), which the endpoint form cannot encode.
                Self::new(
                    self.center,
                    self.radii(),
                    self.rotation,
                    self.angle_at(f),
                    sub,
                )
            })
    }

    /// The same arc traversed the other way.
    pub fn reverse(&self) -> EllipticalArc {
        let mut arc = Self::new(
            self.center,
            self.radii(),
            self.rotation,
            self.start_angle + self.delta,
            -self.delta,
        );
        // Keep the cached endpoints exact rather than recomputed.
        arc.ip = self.fp;
        arc.fp = self.ip;
        arc
    }

    /// The derivative of the arc's time parameterization.
    ///
    /// Differentiating `c + R(φ)·(rx cos α(t), ry sin α(t))` with
    /// `α(t) = α₀ + Δ·t` gives another elliptical parameterization: same
    /// rotation, rays scaled by `|Δ|`, phase shifted a quarter turn in the
    /// direction of travel, centered at the origin.
    pub fn derivative(&self) -> EllipticalArc {
        let scale = self.delta.abs();
        let phase = if self.delta >= 0.0 { PI / 2.0 } else { -PI / 2.0 };
        Self::new(
            Point::ORIGIN,
            Vec2::new(self.rx * scale, self.ry * scale),
            self.rotation,
            self.start_angle + phase,
            self.delta,
        )
    }

    /// Axis-aligned bounds of the whole arc.
    pub fn bounding_box(&self) -> Rect {
        let mut rect = Rect::from_points(self.ip, self.fp);
        for axis in [Axis::X, Axis::Y] {
            let (a, b, _) = self.coeffs(axis);
            if a.abs() <= EPSILON && b.abs() <= EPSILON {
                continue;
            }
            // Interior extrema: where the coordinate's angular derivative
            // −a sin θ + b cos θ vanishes.
            let theta = b.atan2(a);
            for cand in [theta, theta + PI] {
                if let Some(t) = self.time_of_angle(cand) {
                    rect = rect.union_pt(self.point_at(t));
                }
            }
        }
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn upper_unit_half() -> EllipticalArc {
        // Unit half-circle from (1, 0) counterclockwise through (0, 1) to (−1, 0).
        EllipticalArc::from_endpoints(
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            1.0,
            1.0,
            0.0,
            false,
            true,
        )
        .unwrap()
    }

    #[test]
    fn endpoint_derivation_finds_center() {
        let arc = upper_unit_half();
        assert!(are_near_points(arc.center(), Point::ORIGIN, 1e-12));
        assert!(are_near(arc.sweep_angle(), PI, 1e-12));
        assert!(are_near_points(arc.point_at(0.5), Point::new(0.0, 1.0), 1e-12));
    }

    #[test]
    fn unsatisfiable_rays_are_rejected() {
        let err = EllipticalArc::from_endpoints(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            1.0,
            1.0,
            0.0,
            false,
            true,
        )
        .unwrap_err();
        assert_eq!(err, ArcError::NoSolution);

        let err = EllipticalArc::from_endpoints(
            Point::new(3.0, 4.0),
            Point::new(3.0, 4.0),
            1.0,
            1.0,
            0.0,
            false,
            true,
        )
        .unwrap_err();
        assert_eq!(err, ArcError::InfiniteSolutions);
    }

    #[test]
    fn roots_on_a_half_circle() {
        let arc = upper_unit_half();
        // y = 0.5 is hit twice on the upper half.
        let Roots::Finite(ts) = arc.roots(0.5, Axis::Y, 1e-9) else {
            panic!("expected finitely many roots");
        };
        assert_eq!(ts.len(), 2);
        for t in ts {
            assert!(are_near(arc.point_at(t).y, 0.5, 1e-9));
        }
        // y = 2 misses entirely, y = 1 grazes the apex.
        assert_matches!(arc.roots(2.0, Axis::Y, 1e-9), Roots::Finite(ts) if ts.is_empty());
        let Roots::Finite(ts) = arc.roots(1.0, Axis::Y, 1e-9) else {
            panic!("expected finitely many roots");
        };
        assert_eq!(ts.len(), 1);
        assert!(are_near(ts[0], 0.5, 1e-6));
    }

    #[test]
    fn degenerate_arc_roots_distinguish_on_and_off_line() {
        let dot = EllipticalArc::new(Point::new(2.0, 3.0), Vec2::ZERO, 0.0, 0.0, PI);
        assert!(dot.is_degenerate());
        assert!(!upper_unit_half().is_degenerate());
        assert_matches!(dot.roots(3.0, Axis::Y, 1e-9), Roots::All);
        assert_matches!(dot.roots(4.0, Axis::Y, 1e-9), Roots::Finite(ts) if ts.is_empty());
    }

    #[test]
    fn portion_recomputes_flags() {
        // Three quarters of a unit circle; a middle slice subtends less than
        // π and must come out with the large-arc flag cleared.
        let arc = EllipticalArc::new(Point::ORIGIN, Vec2::new(1.0, 1.0), 0.0, 0.0, 1.5 * PI);
        assert!(arc.large_arc());
        let slice = arc.portion(0.25, 0.5);
        assert!(!slice.large_arc());
        assert!(are_near(slice.sweep_angle(), 1.5 * PI * 0.25, 1e-9));
        assert!(are_near_points(slice.point_at(0.0), arc.point_at(0.25), 1e-9));
        assert!(are_near_points(slice.point_at(1.0), arc.point_at(0.5), 1e-9));
    }

    #[test]
    fn reversed_portion_runs_backward() {
        let arc = upper_unit_half();
        let back = arc.portion(0.75, 0.25);
        assert!(are_near_points(back.point_at(0.0), arc.point_at(0.75), 1e-9));
        assert!(are_near_points(back.point_at(1.0), arc.point_at(0.25), 1e-9));
        assert!(!back.sweep());
    }

    #[test]
    fn reverse_is_an_involution() {
        let arc = EllipticalArc::from_endpoints(
            Point::new(0.0, 0.0),
            Point::new(2.0, 1.0),
            3.0,
            1.5,
            0.3,
            true,
            false,
        )
        .unwrap();
        let twice = arc.reverse().reverse();
        for i in 0..=8 {
            let t = f64::from(i) / 8.0;
            assert!(are_near_points(arc.point_at(t), twice.point_at(t), 1e-9));
        }
    }

    #[test]
    fn derivative_matches_finite_differences() {
        let arc = EllipticalArc::new(
            Point::new(1.0, -2.0),
            Vec2::new(2.0, 0.5),
            0.4,
            0.3,
            -1.2,
        );
        let d = arc.derivative();
        let h = 1e-6;
        for i in 1..8 {
            let t = f64::from(i) / 8.0;
            let fd = (arc.point_at(t + h) - arc.point_at(t - h)) / (2.0 * h);
            let an = d.point_at(t).to_vec2();
            assert!((fd - an).hypot() < 1e-5, "t={t}: {fd:?} vs {an:?}");
        }
    }

    #[test]
    fn bounding_box_covers_apex() {
        let arc = upper_unit_half();
        let bb = arc.bounding_box();
        assert!(are_near(bb.max_y(), 1.0, 1e-9));
        assert!(are_near(bb.min_y(), 0.0, 1e-9));
        assert!(are_near(bb.min_x(), -1.0, 1e-9));
        assert!(are_near(bb.max_x(), 1.0, 1e-9));
    }
}
