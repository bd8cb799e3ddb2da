#![deny(missing_docs)]
//! Curve intersection and topological sweep for planar boolean path
//! operations.
//!
//! This crate takes a collection of possibly self-intersecting, possibly
//! overlapping paths and turns it into a planar arrangement: a graph of
//! vertices and edges annotated with per-path winding numbers, plus the
//! closed boundary walks ("areas") of that graph. Boolean operations
//! (union, intersection, difference) are a thin layer the consumer writes
//! on top, by filtering areas on their winding vectors.
//!
//! The pipeline is: [`Path`]s → monotonic [`Section`](monotone::Section)s →
//! sweep → [`TopoGraph`] → cleanup → [`Area`](topograph::Area)s → back to
//! [`Path`]s via [`area_to_path`].
//!
//! Every entry point takes an explicit tolerance, used uniformly for point
//! proximity, vertex deduplication, and cut deduplication. Pick it to match
//! the coordinate scale of your document.

pub mod arc;
pub mod curve;
pub mod intersect;
pub mod monotone;
mod num;
pub mod path;
pub mod topograph;

pub use arc::{ArcError, EllipticalArc};
pub use curve::{Curve, Roots};
pub use intersect::{crossings, crossings_monotonic, crossings_within, Crossing, MAX_DEPTH};
pub use monotone::{sections_for_curve, sections_for_paths, CurveRef, Section};
pub use num::{are_near, are_near_points, EPSILON};
pub use path::{area_to_path, Path, PathError};
pub use topograph::{Area, Edge, SecIdx, SweepEvent, TopoGraph, Vertex, VtxIdx};

use kurbo::Point;

/// A coordinate axis; the sweep progresses along one and orders its active
/// sections along the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Axis {
    /// The horizontal axis.
    X,
    /// The vertical axis.
    Y,
}

impl Axis {
    /// The coordinate of `p` along this axis.
    #[inline]
    pub fn coord(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    /// The perpendicular axis.
    #[inline]
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// The input was faulty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// A geometric constraint admitted no solution.
    NoSolution,
    /// A geometric constraint was underdetermined.
    InfiniteSolutions,
    /// An input value was outside its domain: a non-finite coordinate, or a
    /// non-positive tolerance.
    OutOfRange,
    /// A path failed its contiguity invariant.
    Path(PathError),
}

impl From<ArcError> for Error {
    fn from(e: ArcError) -> Self {
        match e {
            ArcError::NoSolution => Error::NoSolution,
            ArcError::InfiniteSolutions => Error::InfiniteSolutions,
        }
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::Path(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoSolution => write!(f, "a geometric constraint had no solution"),
            Error::InfiniteSolutions => {
                write!(f, "a geometric constraint had infinitely many solutions")
            }
            Error::OutOfRange => write!(f, "an input value was outside its domain"),
            Error::Path(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

fn validate(paths: &[Path], tolerance: f64) -> Result<(), Error> {
    if !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(Error::OutOfRange);
    }
    for path in paths {
        for curve in path.curves() {
            let bb = curve.bounding_box();
            if !(bb.min_x().is_finite()
                && bb.min_y().is_finite()
                && bb.max_x().is_finite()
                && bb.max_y().is_finite())
            {
                return Err(Error::OutOfRange);
            }
        }
    }
    Ok(())
}

/// Sweeps `paths` along `axis` and builds the planar arrangement.
pub fn topo_graph(paths: &[Path], axis: Axis, tolerance: f64) -> Result<TopoGraph, Error> {
    validate(paths, tolerance)?;
    Ok(topograph::build(paths, axis, tolerance, None))
}

/// Like [`topo_graph`], with a callback observing the sweep as it runs.
pub fn topo_graph_traced(
    paths: &[Path],
    axis: Axis,
    tolerance: f64,
    trace: &mut dyn FnMut(SweepEvent),
) -> Result<TopoGraph, Error> {
    validate(paths, tolerance)?;
    Ok(topograph::build(paths, axis, tolerance, Some(trace)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_arrangement() {
        let square = Path::polygon([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let graph = topo_graph(&[square], Axis::X, 1e-9).unwrap();
        graph.check_invariants();
        assert_eq!(graph.vertices().len(), 4);
        assert_eq!(graph.edge_count(), 4);
        let areas = graph.traverse_areas();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].sections().len(), 4);
    }

    #[test]
    fn bad_tolerance_is_rejected() {
        let square = Path::polygon([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert_eq!(
            topo_graph(&[square.clone()], Axis::X, 0.0).unwrap_err(),
            Error::OutOfRange
        );
        assert_eq!(
            topo_graph(&[square], Axis::X, f64::NAN).unwrap_err(),
            Error::OutOfRange
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let bad = Path::polygon([(0.0, 0.0), (f64::INFINITY, 0.0), (1.0, 1.0)]);
        assert_eq!(topo_graph(&[bad], Axis::X, 1e-9).unwrap_err(), Error::OutOfRange);
    }

    #[test]
    fn trace_sees_every_section_start() {
        let square = Path::polygon([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let mut starts = 0;
        let mut callback = |ev: SweepEvent| {
            if matches!(ev, SweepEvent::Start(_)) {
                starts += 1;
            }
        };
        topo_graph_traced(&[square], Axis::X, 1e-9, &mut callback).unwrap();
        assert_eq!(starts, 4);
    }
}
