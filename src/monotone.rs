//! Monotonic decomposition: cutting curves into sweepable sections.
//!
//! The sweep wants pieces that are monotonic along *both* axes, not just the
//! sweep axis: that's what lets the in-sweep intersection tests use the
//! rectangle spanned by a section's two endpoints as its bounding box. So a
//! curve is cut at every interior root of its derivative, in x and in y.

use std::cmp::Ordering;

use kurbo::Point;

use crate::curve::Curve;
use crate::num::{are_near, SortFloat, EPSILON};
use crate::path::Path;
use crate::Axis;

/// Identifies an input curve by its position: path index, then curve index
/// within the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CurveRef {
    /// Index of the owning path in the input slice.
    pub path: usize,
    /// Index of the curve within that path.
    pub curve: usize,
}

impl std::fmt::Display for CurveRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.path, self.curve)
    }
}

/// A directed, monotonic piece of an input curve, as carried by the sweep.
///
/// `f` and `t` are parameters on the owning curve; `fp` and `tp` are the
/// corresponding endpoints, swapped if necessary so that `fp` is the
/// sweep-lower of the two. `f > t` therefore means the section runs backward
/// over its curve relative to the sweep.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Section {
    /// The owning curve. Sections never copy geometry.
    pub curve: CurveRef,
    /// Parameter at `fp`.
    pub f: f64,
    /// Parameter at `tp`.
    pub t: f64,
    /// The sweep-lower endpoint.
    pub fp: Point,
    /// The sweep-higher endpoint.
    pub tp: Point,
    /// Winding number accumulated so far, one entry per input path. Empty
    /// until the sweep finalizes the section, then frozen.
    pub windings: Vec<i32>,
}

/// Compares two points in sweep order: by the sweep-axis coordinate, then by
/// the orthogonal coordinate.
pub(crate) fn sweep_lex_cmp(a: Point, b: Point, axis: Axis) -> Ordering {
    SortFloat::from(axis.coord(a))
        .cmp(&SortFloat::from(axis.coord(b)))
        .then_with(|| {
            SortFloat::from(axis.other().coord(a)).cmp(&SortFloat::from(axis.other().coord(b)))
        })
}

impl Section {
    pub(crate) fn new(curve_ref: CurveRef, curve: &Curve, axis: Axis, f: f64, t: f64) -> Section {
        let fp = curve.point_at(f);
        let tp = curve.point_at(t);
        let mut sec = Section {
            curve: curve_ref,
            f,
            t,
            fp,
            tp,
            windings: Vec::new(),
        };
        if sweep_lex_cmp(sec.tp, sec.fp, axis) == Ordering::Less {
            std::mem::swap(&mut sec.f, &mut sec.t);
            std::mem::swap(&mut sec.fp, &mut sec.tp);
        }
        sec
    }

    /// The contribution this section makes to a winding count when the
    /// context walk steps over it: `+1` if the owning path traverses it in
    /// the direction of increasing sweep coordinate.
    pub fn winding_sign(&self) -> i32 {
        if self.f <= self.t {
            1
        } else {
            -1
        }
    }

    /// True when the section's extent along `axis` has collapsed to within
    /// `tol` of zero.
    pub fn flat_in(&self, axis: Axis, tol: f64) -> bool {
        are_near(axis.coord(self.fp), axis.coord(self.tp), tol)
    }

    /// True when both endpoints coincide within `tol`.
    pub fn is_point(&self, tol: f64) -> bool {
        crate::num::are_near_points(self.fp, self.tp, tol)
    }
}

/// Interior parameters at which `curve` must be cut to become monotonic in
/// both axes, merged with the domain endpoints and deduplicated.
fn mono_cuts(curve: &Curve, tol: f64) -> Vec<f64> {
    let deriv = curve.derivative();
    let mut cuts = vec![0.0];
    for axis in [Axis::X, Axis::Y] {
        // A flat derivative coordinate (`Roots::All`) means the curve never
        // turns around in that axis, so it contributes no cuts. Roots at the
        // domain ends would only create point-sections; keep interior ones.
        cuts.extend(
            deriv
                .roots(0.0, axis, tol)
                .as_finite()
                .iter()
                .copied()
                .filter(|t| *t > EPSILON && *t < 1.0 - EPSILON),
        );
    }
    cuts.push(1.0);
    cuts.sort_unstable_by_key(|t| SortFloat::from(*t));
    cuts.dedup_by(|b, a| are_near(*a, *b, EPSILON));
    cuts
}

/// Decomposes one curve into monotonic sections, in parameter order.
///
/// A curve that is entirely flat along the sweep axis comes back as a single
/// degenerate section; the sweep resolves those immediately instead of
/// carrying them.
pub fn sections_for_curve(curve_ref: CurveRef, curve: &Curve, axis: Axis, tol: f64) -> Vec<Section> {
    mono_cuts(curve, tol)
        .windows(2)
        .map(|w| Section::new(curve_ref, curve, axis, w[0], w[1]))
        .collect()
}

/// Decomposes every curve of every path, returning sections sorted by the
/// sweep order of their low endpoints.
pub fn sections_for_paths(paths: &[Path], axis: Axis, tol: f64) -> Vec<Section> {
    let mut sections = Vec::new();
    for (p, path) in paths.iter().enumerate() {
        for (c, curve) in path.curves().iter().enumerate() {
            sections.extend(sections_for_curve(
                CurveRef { path: p, curve: c },
                curve,
                axis,
                tol,
            ));
        }
    }
    sections.sort_by(|a, b| sweep_lex_cmp(a.fp, b.fp, axis));
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::EllipticalArc;
    use kurbo::{CubicBez, Line};
    use proptest::prelude::*;

    #[test]
    fn s_curve_splits_at_its_y_extrema() {
        // This cubic rises, falls, and rises again in y.
        let c = Curve::Cubic(CubicBez::new((0.0, 0.0), (1.0, 3.0), (2.0, -3.0), (3.0, 0.0)));
        let secs = sections_for_curve(CurveRef { path: 0, curve: 0 }, &c, Axis::Y, 1e-9);
        assert_eq!(secs.len(), 3);
        // The cut points are the extrema of y.
        let d = c.derivative();
        for sec in &secs {
            for t in [sec.f, sec.t] {
                if t > 0.0 && t < 1.0 {
                    assert!(d.point_at(t).y.abs() < 1e-6, "cut at t={t} is not an extremum");
                }
            }
        }
    }

    #[test]
    fn half_circle_splits_at_its_apex() {
        let arc = Curve::Arc(
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
        let secs = sections_for_curve(CurveRef { path: 0, curve: 0 }, &arc, Axis::X, 1e-9);
        assert_eq!(secs.len(), 2);
        // Each piece has the apex (0, 1) at one end.
        for sec in &secs {
            assert!(
                sec.fp.distance(Point::new(0.0, 1.0)) < 1e-6
                    || sec.tp.distance(Point::new(0.0, 1.0)) < 1e-6
            );
        }
    }

    #[test]
    fn flat_curve_is_one_degenerate_section() {
        let l = Curve::Line(Line::new((0.0, 2.0), (0.0, 7.0)));
        let secs = sections_for_curve(CurveRef { path: 0, curve: 0 }, &l, Axis::X, 1e-9);
        assert_eq!(secs.len(), 1);
        assert!(secs[0].flat_in(Axis::X, 1e-9));
        assert_eq!(secs[0].fp, Point::new(0.0, 2.0));
        assert_eq!(secs[0].tp, Point::new(0.0, 7.0));
    }

    #[test]
    fn backward_sections_know_their_direction() {
        // A line running right-to-left: the section is stored low-to-high in
        // sweep order, but remembers the original traversal.
        let l = Curve::Line(Line::new((5.0, 0.0), (0.0, 0.0)));
        let secs = sections_for_curve(CurveRef { path: 0, curve: 0 }, &l, Axis::X, 1e-9);
        assert_eq!(secs.len(), 1);
        assert!(secs[0].f > secs[0].t);
        assert_eq!(secs[0].winding_sign(), -1);
    }

    proptest! {
        #[test]
        fn decomposition_covers_the_curve(c in crate::curve::tests::reasonable_cubic()) {
            let curve = Curve::Cubic(c);
            let secs = sections_for_curve(CurveRef { path: 0, curve: 0 }, &curve, Axis::X, 1e-9);
            // Sections are contiguous in parameter space and cover [0, 1].
            let mut lo = 0.0;
            for sec in &secs {
                let (a, b) = if sec.f <= sec.t { (sec.f, sec.t) } else { (sec.t, sec.f) };
                prop_assert!(are_near(a, lo, 1e-9));
                lo = b;
            }
            prop_assert!(are_near(lo, 1.0, 1e-9));
            // Each section really is monotonic in x: its interior never
            // leaves the span of its endpoints.
            for sec in &secs {
                let x0 = sec.fp.x.min(sec.tp.x) - 1e-6;
                let x1 = sec.fp.x.max(sec.tp.x) + 1e-6;
                for i in 1..8 {
                    let t = sec.f + (sec.t - sec.f) * f64::from(i) / 8.0;
                    let x = curve.point_at(t).x;
                    prop_assert!(x >= x0 && x <= x1);
                }
            }
        }
    }
}
