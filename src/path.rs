//! Paths: contiguous sequences of curves.

use kurbo::{Line, Point};

use crate::curve::Curve;
use crate::num::are_near_points;
use crate::topograph::{Area, TopoGraph};

/// The input curves did not form a path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathError {
    /// A path must contain at least one curve.
    Empty,
    /// Adjacent curves failed to meet: curve `index` does not start where
    /// curve `index - 1` ends. `gap` is the distance between the two.
    Discontinuity {
        /// Index of the curve whose start point is out of place.
        index: usize,
        /// How far apart the adjacent endpoints are.
        gap: f64,
    },
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::Empty => write!(f, "a path needs at least one curve"),
            PathError::Discontinuity { index, gap } => write!(
                f,
                "curve {index} does not start where its predecessor ends (gap {gap})"
            ),
        }
    }
}

impl std::error::Error for PathError {}

/// An ordered sequence of curves whose segments meet end-to-end.
///
/// Construction checks the contiguity invariant; a broken chain is an error
/// for the caller to repair, not something this crate papers over. Closed
/// paths get an explicit closing segment appended when their endpoints don't
/// already meet.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Path {
    curves: Vec<Curve>,
    closed: bool,
    stitched: bool,
}

impl Path {
    /// Builds a path, validating contiguity under `tol`.
    pub fn new(curves: Vec<Curve>, closed: bool, tol: f64) -> Result<Path, PathError> {
        if curves.is_empty() {
            return Err(PathError::Empty);
        }
        for (i, pair) in curves.windows(2).enumerate() {
            let gap = pair[0].end().distance(pair[1].start());
            if gap > tol {
                return Err(PathError::Discontinuity { index: i + 1, gap });
            }
        }
        let mut curves = curves;
        if closed {
            let first = curves[0].start();
            let last = curves[curves.len() - 1].end();
            if !are_near_points(last, first, tol) {
                curves.push(Curve::Line(Line::new(last, first)));
            }
        }
        Ok(Path {
            curves,
            closed,
            stitched: false,
        })
    }

    /// A closed polygonal path through `points`.
    pub fn polygon(points: impl IntoIterator<Item = impl Into<Point>>) -> Path {
        Self::from_points(points, true)
    }

    /// An open polyline through `points`.
    pub fn polyline(points: impl IntoIterator<Item = impl Into<Point>>) -> Path {
        Self::from_points(points, false)
    }

    fn from_points(points: impl IntoIterator<Item = impl Into<Point>>, closed: bool) -> Path {
        let pts: Vec<Point> = points.into_iter().map(Into::into).collect();
        assert!(pts.len() >= 2, "a polyline needs at least two points");
        let mut curves: Vec<Curve> = pts
            .windows(2)
            .map(|w| Curve::Line(Line::new(w[0], w[1])))
            .collect();
        if closed && pts[pts.len() - 1] != pts[0] {
            curves.push(Curve::Line(Line::new(pts[pts.len() - 1], pts[0])));
        }
        Path {
            curves,
            closed,
            stitched: false,
        }
    }

    /// The constituent curves, in order.
    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    /// Whether the path is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the path was assembled from arrangement output, so its joins
    /// are only contiguous up to the sweep tolerance.
    pub fn is_stitched(&self) -> bool {
        self.stitched
    }
}

/// Reassembles one [`Area`] of an arrangement into a path.
///
/// Each section contributes the portion of its owning curve, oriented so
/// that its start continues from the previous section's end. The result is
/// marked as stitched: its joins are exact only up to `tol`, since vertex
/// positions were merged by proximity during the sweep.
pub fn area_to_path(graph: &TopoGraph, area: &Area, tol: f64) -> Path {
    let mut curves = Vec::with_capacity(area.sections().len());
    let mut prev: Option<Point> = None;
    for &idx in area.sections() {
        let sec = graph.section(idx);
        let curve = graph.curve_of(sec);
        let forward = match prev {
            None => true,
            Some(p) => {
                if are_near_points(p, sec.fp, tol) {
                    true
                } else {
                    if !are_near_points(p, sec.tp, tol) {
                        log::warn!(
                            "area walk jumped from {:?} to section spanning {:?}..{:?}",
                            p,
                            sec.fp,
                            sec.tp
                        );
                    }
                    false
                }
            }
        };
        let (pf, pt) = if forward {
            (sec.f, sec.t)
        } else {
            (sec.t, sec.f)
        };
        prev = Some(if forward { sec.tp } else { sec.fp });
        curves.push(curve.portion(pf, pt));
    }
    Path {
        curves,
        closed: true,
        stitched: true,
    }
}
