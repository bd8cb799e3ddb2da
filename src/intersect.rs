//! Pairwise curve intersection by recursive subdivision.
//!
//! Two variants share one recursion: the general one computes tight bounds
//! for each sub-interval, while the monotonic one uses the rectangle spanned
//! by the interval's endpoints (valid for sections that are monotonic in
//! both axes, and much cheaper; it's the one the sweep calls). The inputs
//! take turns being bisected, and at the depth bound each is approximated by
//! the chord between its interval endpoints; chord intersections are then
//! sharpened against the true curves with a few damped Newton steps.

use kurbo::Rect;

use crate::curve::Curve;
use crate::num::{are_near, SortFloat, EPSILON};

/// Hard bound on subdivision depth.
///
/// This is a configuration constant, not an incidental limit: it guarantees
/// termination, and it decides when the recursion gives up on subdividing
/// and solves the chord approximation instead.
pub const MAX_DEPTH: u32 = 12;

/// How many Newton iterations to spend sharpening a chord intersection.
const NEWTON_STEPS: u32 = 4;

/// A Newton step is kept only if it shrinks the squared positional error by
/// at least this factor; otherwise the pre-step estimate stands.
const NEWTON_IMPROVEMENT: f64 = 0.25;

/// A single crossing between curve A at `ta` and curve B at `tb`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Crossing {
    /// Parameter on the first curve.
    pub ta: f64,
    /// Parameter on the second curve.
    pub tb: f64,
    /// True when the cross product of the tangents (A's tangent crossed with
    /// B's) is positive at the crossing.
    pub dir: bool,
}

impl Crossing {
    /// The same crossing, seen from the other curve's point of view.
    pub fn swapped(self) -> Crossing {
        Crossing {
            ta: self.tb,
            tb: self.ta,
            dir: !self.dir,
        }
    }
}

fn rects_touch(a: &Rect, b: &Rect, tol: f64) -> bool {
    a.min_x() <= b.max_x() + tol
        && b.min_x() <= a.max_x() + tol
        && a.min_y() <= b.max_y() + tol
        && b.min_y() <= a.max_y() + tol
}

fn interval_bounds(c: &Curve, lo: f64, hi: f64, chord: bool) -> Rect {
    if chord {
        Rect::from_points(c.point_at(lo), c.point_at(hi))
    } else {
        c.bounds(lo, hi)
    }
}

/// Intersects the two chords and returns `(ta, tb, cross)` in curve
/// parameters, where `cross` carries the sign of the tangent cross product
/// (corrected for reversed intervals). Degenerate chords and parallel chords
/// yield `None`.
fn chord_intersect(
    a: &Curve,
    al: f64,
    ah: f64,
    b: &Curve,
    bl: f64,
    bh: f64,
) -> Option<(f64, f64, f64)> {
    let a0 = a.point_at(al);
    let a1 = a.point_at(ah);
    let b0 = b.point_at(bl);
    let b1 = b.point_at(bh);
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    if d1.hypot2() <= 1e-24 || d2.hypot2() <= 1e-24 {
        return None;
    }
    let denom = d1.cross(d2);
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let e = b0 - a0;
    let s = e.cross(d2) / denom;
    let u = e.cross(d1) / denom;
    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    // The chords run in interval order, which may be backward over the
    // curves; flip the sign back to the true tangent orientation.
    let cross = denom * (ah - al).signum() * (bh - bl).signum();
    Some((al + s * (ah - al), bl + u * (bh - bl), cross))
}

/// Refines a crossing estimate with Newton iteration on the residual
/// `A(ta) − B(tb)`, keeping only steps that actually help.
fn polish_crossing(a: &Curve, mut ta: f64, b: &Curve, mut tb: f64) -> (f64, f64) {
    let da = a.derivative();
    let db = b.derivative();
    let mut err = (b.point_at(tb) - a.point_at(ta)).hypot2();
    for _ in 0..NEWTON_STEPS {
        if err <= 1e-24 {
            break;
        }
        let r = b.point_at(tb) - a.point_at(ta);
        let ja = da.point_at(ta).to_vec2();
        let jb = db.point_at(tb).to_vec2();
        let det = jb.cross(ja);
        if det == 0.0 || !det.is_finite() {
            break;
        }
        let nta = (ta + jb.cross(r) / det).clamp(0.0, 1.0);
        let ntb = (tb + ja.cross(r) / det).clamp(0.0, 1.0);
        let nerr = (b.point_at(ntb) - a.point_at(nta)).hypot2();
        if nerr < err * NEWTON_IMPROVEMENT {
            ta = nta;
            tb = ntb;
            err = nerr;
        } else {
            break;
        }
    }
    (ta, tb)
}

#[allow(clippy::too_many_arguments)]
fn pair_intersect(
    a: &Curve,
    al: f64,
    ah: f64,
    b: &Curve,
    bl: f64,
    bh: f64,
    tol: f64,
    chord_bounds: bool,
    depth: u32,
    out: &mut Vec<Crossing>,
) {
    // A zero-length interval can't cross anything, and would divide by zero
    // in the chord solve.
    if (ah - al).abs() <= 1e-12 || (bh - bl).abs() <= 1e-12 {
        return;
    }
    let ar = interval_bounds(a, al, ah, chord_bounds);
    let br = interval_bounds(b, bl, bh, chord_bounds);
    if !rects_touch(&ar, &br, tol) {
        return;
    }
    let tiny = ar.width().max(ar.height()) <= tol && br.width().max(br.height()) <= tol;
    if depth >= MAX_DEPTH || tiny {
        if let Some((ta, tb, cross)) = chord_intersect(a, al, ah, b, bl, bh) {
            let (ta, tb) = polish_crossing(a, ta, b, tb);
            // The roles swap at every level, so a hit found at odd depth has
            // the original A and B reversed.
            if depth % 2 == 1 {
                out.push(Crossing {
                    ta: tb,
                    tb: ta,
                    dir: cross < 0.0,
                });
            } else {
                out.push(Crossing {
                    ta,
                    tb,
                    dir: cross > 0.0,
                });
            }
        }
        return;
    }
    // Bisect the current first input, and swap so its partner is bisected
    // next time around.
    let mid = 0.5 * (al + ah);
    pair_intersect(b, bl, bh, a, al, mid, tol, chord_bounds, depth + 1, out);
    pair_intersect(b, bl, bh, a, mid, ah, tol, chord_bounds, depth + 1, out);
}

fn dedupe(mut out: Vec<Crossing>) -> Vec<Crossing> {
    out.sort_by(|p, q| {
        SortFloat::from(p.ta)
            .cmp(&SortFloat::from(q.ta))
            .then_with(|| SortFloat::from(p.tb).cmp(&SortFloat::from(q.tb)))
    });
    out.dedup_by(|b, a| are_near(a.ta, b.ta, EPSILON) && are_near(a.tb, b.tb, EPSILON));
    out
}

/// All crossings between two whole curves, within `tol`.
pub fn crossings(a: &Curve, b: &Curve, tol: f64) -> Vec<Crossing> {
    crossings_within(a, (0.0, 1.0), b, (0.0, 1.0), tol)
}

/// All crossings between two curve intervals, within `tol`.
pub fn crossings_within(
    a: &Curve,
    (al, ah): (f64, f64),
    b: &Curve,
    (bl, bh): (f64, f64),
    tol: f64,
) -> Vec<Crossing> {
    let mut out = Vec::new();
    pair_intersect(a, al, ah, b, bl, bh, tol, false, 0, &mut out);
    dedupe(out)
}

/// All crossings between two curve intervals that are monotonic in both
/// axes.
///
/// Identical to [`crossings_within`], except that each sub-interval is
/// bounded by the rectangle spanned by its endpoints instead of by a tight
/// bounds computation. Intervals may run backward (`lo > hi`).
pub fn crossings_monotonic(
    a: &Curve,
    (al, ah): (f64, f64),
    b: &Curve,
    (bl, bh): (f64, f64),
    tol: f64,
) -> Vec<Crossing> {
    let mut out = Vec::new();
    pair_intersect(a, al, ah, b, bl, bh, tol, true, 0, &mut out);
    dedupe(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::EllipticalArc;
    use kurbo::{CubicBez, Line, Point};

    #[test]
    fn transversal_lines_cross_once() {
        let a = Curve::Line(Line::new((0.0, 0.0), (1.0, 1.0)));
        let b = Curve::Line(Line::new((0.0, 1.0), (1.0, 0.0)));
        let found = crossings(&a, &b, 1e-9);
        assert_eq!(found.len(), 1);
        let c = found[0];
        assert!(are_near(c.ta, 0.5, 1e-9));
        assert!(are_near(c.tb, 0.5, 1e-9));
        // cross((1,1), (1,-1)) = -2
        assert!(!c.dir);
    }

    #[test]
    fn disjoint_curves_do_not_cross() {
        let a = Curve::Line(Line::new((0.0, 0.0), (1.0, 0.0)));
        let b = Curve::Line(Line::new((0.0, 5.0), (1.0, 5.0)));
        assert!(crossings(&a, &b, 1e-9).is_empty());
    }

    #[test]
    fn zero_length_intervals_short_circuit() {
        let a = Curve::Line(Line::new((0.0, 0.0), (1.0, 1.0)));
        let b = Curve::Line(Line::new((0.0, 1.0), (1.0, 0.0)));
        assert!(crossings_within(&a, (0.3, 0.3), &b, (0.0, 1.0), 1e-9).is_empty());
        let dot = Curve::Line(Line::new((0.5, 0.5), (0.5, 0.5)));
        assert!(crossings(&dot, &b, 1e-9).is_empty());
    }

    #[test]
    fn cubic_against_line() {
        // An S-shaped cubic that crosses the x axis three times.
        let c = Curve::Cubic(CubicBez::new((0.0, -1.0), (0.3, 3.0), (0.7, -3.0), (1.0, 1.0)));
        let l = Curve::Line(Line::new((-1.0, 0.0), (2.0, 0.0)));
        let found = crossings(&c, &l, 1e-9);
        assert_eq!(found.len(), 3);
        for cr in found {
            assert!(c.point_at(cr.ta).y.abs() < 1e-6);
            assert!(c.point_at(cr.ta).distance(l.point_at(cr.tb)) < 1e-6);
        }
    }

    #[test]
    fn symmetry_under_argument_swap() {
        let a = Curve::Cubic(CubicBez::new((0.0, 0.0), (1.0, 2.0), (2.0, -2.0), (3.0, 0.5)));
        let b = Curve::Line(Line::new((0.0, 0.4), (3.0, 0.1)));
        let fwd = crossings(&a, &b, 1e-9);
        let mut rev: Vec<Crossing> = crossings(&b, &a, 1e-9)
            .into_iter()
            .map(Crossing::swapped)
            .collect();
        rev.sort_by(|p, q| SortFloat::from(p.ta).cmp(&SortFloat::from(q.ta)));
        assert_eq!(fwd.len(), rev.len());
        for (f, r) in fwd.iter().zip(&rev) {
            assert!(are_near(f.ta, r.ta, 1e-6));
            assert!(are_near(f.tb, r.tb, 1e-6));
            assert_eq!(f.dir, r.dir);
        }
    }

    #[test]
    fn unit_circles_cross_at_known_points() {
        // Upper halves of the circles around (0,0) and (1,0); they meet at
        // (1/2, √3/2).
        let a = Curve::Arc(
            EllipticalArc::from_endpoints(
                Point::new(1.0, 0.0),
                Point::new(-1.0, 0.0),
                1.0,
                1.0,
                0.0,
                false,
                true,
            )
            .unwrap(),
        );
        let b = Curve::Arc(
            EllipticalArc::from_endpoints(
                Point::new(2.0, 0.0),
                Point::new(0.0, 0.0),
                1.0,
                1.0,
                0.0,
                false,
                true,
            )
            .unwrap(),
        );
        let found = crossings(&a, &b, 1e-9);
        assert_eq!(found.len(), 1);
        let p = a.point_at(found[0].ta);
        assert!(p.distance(Point::new(0.5, 3.0f64.sqrt() / 2.0)) < 1e-6);
    }

    #[test]
    fn monotonic_variant_agrees_with_general() {
        // Both inputs are monotonic in both axes on these intervals.
        let a = Curve::Cubic(CubicBez::new((0.0, 0.0), (0.4, 0.5), (0.6, 0.9), (1.0, 1.0)));
        let b = Curve::Line(Line::new((0.0, 1.0), (1.0, 0.0)));
        let gen = crossings(&a, &b, 1e-9);
        let mono = crossings_monotonic(&a, (0.0, 1.0), &b, (0.0, 1.0), 1e-9);
        assert_eq!(gen.len(), 1);
        assert_eq!(mono.len(), 1);
        assert!(are_near(gen[0].ta, mono[0].ta, 1e-6));
        assert!(are_near(gen[0].tb, mono[0].tb, 1e-6));
    }

    #[test]
    fn backward_intervals_report_curve_parameters() {
        let a = Curve::Line(Line::new((0.0, 0.0), (1.0, 1.0)));
        let b = Curve::Line(Line::new((0.0, 1.0), (1.0, 0.0)));
        let found = crossings_monotonic(&a, (1.0, 0.0), &b, (0.0, 1.0), 1e-9);
        assert_eq!(found.len(), 1);
        assert!(are_near(found[0].ta, 0.5, 1e-9));
        // The direction flag reflects the curves' own tangents, not the
        // reversed interval.
        assert!(!found[0].dir);
    }

    #[test]
    fn newton_sharpens_curved_crossings() {
        let a = Curve::Cubic(CubicBez::new((0.0, 0.0), (1.0, 3.0), (2.0, -3.0), (3.0, 1.0)));
        let b = Curve::Cubic(CubicBez::new((0.0, 1.0), (1.0, -2.0), (2.0, 3.0), (3.0, -1.0)));
        let found = crossings(&a, &b, 1e-9);
        assert!(!found.is_empty());
        for c in found {
            assert!(a.point_at(c.ta).distance(b.point_at(c.tb)) < 1e-6);
        }
    }
}
