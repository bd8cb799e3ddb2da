//! The topological sweep: turning monotonic sections into a planar graph.
//!
//! The sweep processes sections in order of their low endpoints, keeping the
//! currently-active ones in a `context` list sorted across the sweep
//! direction. New sections are tested for crossings against the overlapping
//! part of the context; every crossing splits both participants, with the
//! split-off tails fed back into the processing order. When the sweep
//! reaches a section's high end, the section is finalized: its winding
//! vector is frozen from a walk over the context, and it becomes an `enter`
//! edge of a vertex (deduplicated by proximity).

use std::cmp::Ordering;

use kurbo::Point;

use crate::curve::{Curve, Roots};
use crate::intersect::crossings_monotonic;
use crate::monotone::{sections_for_paths, sweep_lex_cmp, Section};
use crate::num::{are_near, are_near_points, SortFloat, EPSILON};
use crate::path::Path;
use crate::Axis;

/// Index of a section in a [`TopoGraph`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SecIdx(pub usize);

impl std::fmt::Display for SecIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sec_{}", self.0)
    }
}

/// Index of a vertex in a [`TopoGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct VtxIdx(pub usize);

/// Placeholder for an edge whose far vertex isn't known yet; none survive
/// construction.
const UNRESOLVED: VtxIdx = VtxIdx(usize::MAX);

/// Half of a connection: a section, and the vertex at its far end.
///
/// Every section shows up as an edge at both of its endpoint vertices, so
/// edges reference sections rather than owning them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Edge {
    /// The section this edge follows.
    pub section: SecIdx,
    /// The vertex at the section's other end.
    pub other: VtxIdx,
}

/// A point of the arrangement together with its incident edges.
///
/// Edge slots are kept in sweep order: first the sections ending here
/// (`enters`), ranked across the sweep direction, then the sections starting
/// here (`exits`), ranked the same way. Cyclic indexing over the
/// concatenation is what the face traversal walks.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Vertex {
    /// Where the vertex sits.
    pub point: Point,
    enters: Vec<Edge>,
    exits: Vec<Edge>,
}

impl Vertex {
    fn new(point: Point) -> Vertex {
        Vertex {
            point,
            enters: Vec::new(),
            exits: Vec::new(),
        }
    }

    /// Number of incident edge slots.
    pub fn degree(&self) -> usize {
        self.enters.len() + self.exits.len()
    }

    /// The edge in slot `i`, counting enters first.
    pub fn edge(&self, i: usize) -> &Edge {
        if i < self.enters.len() {
            &self.enters[i]
        } else {
            &self.exits[i - self.enters.len()]
        }
    }

    fn edge_mut(&mut self, i: usize) -> &mut Edge {
        let n = self.enters.len();
        if i < n {
            &mut self.enters[i]
        } else {
            &mut self.exits[i - n]
        }
    }

    /// All incident edges, in slot order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.enters.iter().chain(self.exits.iter())
    }

    /// The sections ending at this vertex.
    pub fn enters(&self) -> &[Edge] {
        &self.enters
    }

    /// The sections starting at this vertex.
    pub fn exits(&self) -> &[Edge] {
        &self.exits
    }

    fn slot_of(&self, section: SecIdx, exclude: Option<usize>) -> Option<usize> {
        (0..self.degree()).find(|&i| self.edge(i).section == section && Some(i) != exclude)
    }

    fn remove_slot(&mut self, i: usize) {
        let n = self.enters.len();
        if i < n {
            self.enters.remove(i);
        } else {
            self.exits.remove(i - n);
        }
    }
}

/// One boundary walk of the arrangement: an ordered sequence of section
/// references.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Area {
    sections: Vec<SecIdx>,
}

impl Area {
    /// The sections along the walk, in order.
    pub fn sections(&self) -> &[SecIdx] {
        &self.sections
    }
}

/// Notifications emitted while the sweep runs.
///
/// This replaces ambient debug state: callers that want to watch the sweep
/// (or count how often the defect fallbacks fire) pass a callback to
/// [`crate::topo_graph_traced`].
#[derive(Clone, Copy, Debug)]
pub enum SweepEvent {
    /// A section entered the active context.
    Start(SecIdx),
    /// A section was split at a discovered crossing.
    Split(SecIdx, Point),
    /// A group of sections was finalized into a vertex.
    Finalize(VtxIdx),
}

/// The planar arrangement: vertices, edges, and the section arena they
/// reference, with winding annotations.
#[derive(Clone, Debug)]
pub struct TopoGraph {
    paths: Vec<Path>,
    axis: Axis,
    tol: f64,
    vertices: Vec<Vertex>,
    sections: Vec<Section>,
}

impl TopoGraph {
    /// The sweep axis this graph was built along.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// The tolerance the graph was built with.
    pub fn tolerance(&self) -> f64 {
        self.tol
    }

    /// The input paths (the graph keeps its own copy, since sections
    /// reference curves by index).
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// All vertices.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// One vertex.
    pub fn vertex(&self, i: VtxIdx) -> &Vertex {
        &self.vertices[i.0]
    }

    /// All sections. Entries may be unreferenced after cleanup; edges are
    /// the source of truth for which sections participate.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// One section.
    pub fn section(&self, i: SecIdx) -> &Section {
        &self.sections[i.0]
    }

    /// The curve a section lives on.
    pub fn curve_of(&self, sec: &Section) -> &Curve {
        &self.paths[sec.curve.path].curves()[sec.curve.curve]
    }

    /// Finds the vertex within `tol` of `p`, if any.
    pub fn vertex_near(&self, p: Point, tol: f64) -> Option<VtxIdx> {
        (0..self.vertices.len())
            .map(VtxIdx)
            .find(|v| are_near_points(self.vertices[v.0].point, p, tol))
    }

    /// Total number of edges (each section referenced by a pair of slots).
    pub fn edge_count(&self) -> usize {
        self.vertices.iter().map(Vertex::degree).sum::<usize>() / 2
    }

    /// Removes dangling edges.
    ///
    /// A vertex of degree one is a whisker: its single edge borders the same
    /// region on both sides and encloses nothing. Removing one can expose
    /// another, so this chases the worklist to a fixed point, then drops the
    /// emptied vertices.
    pub fn trim_whiskers(&mut self) {
        let mut work: Vec<usize> = (0..self.vertices.len())
            .filter(|&i| self.vertices[i].degree() == 1)
            .collect();
        while let Some(vi) = work.pop() {
            if self.vertices[vi].degree() != 1 {
                continue;
            }
            let e = *self.vertices[vi].edge(0);
            self.vertices[vi].remove_slot(0);
            let w = e.other.0;
            match self.vertices[w].slot_of(e.section, None) {
                Some(slot) => self.vertices[w].remove_slot(slot),
                None => log::warn!("vertex {w} is missing its back-edge for {}", e.section),
            }
            if self.vertices[w].degree() == 1 {
                work.push(w);
            }
        }
        self.compact();
    }

    /// Doubles whisker chains instead of removing them.
    ///
    /// A dangling chain that hangs off a junction can still matter to the
    /// topology of an operation (it separates a region from itself). For
    /// each degree-one vertex, the chain's sections are duplicated with
    /// independent identities, the copies inserted next to the originals at
    /// both endpoint vertices; a vertex that lands at degree three after
    /// doubling was a pass-through, so the chain continues there, and any
    /// other degree terminates it.
    pub fn double_whiskers(&mut self) {
        for vi in 0..self.vertices.len() {
            if self.vertices[vi].degree() != 1 {
                continue;
            }
            let mut cur = VtxIdx(vi);
            let mut e = *self.vertices[vi].edge(0);
            loop {
                let w = e.other;
                let dup = SecIdx(self.sections.len());
                self.sections.push(self.sections[e.section.0].clone());
                self.insert_adjacent(cur, e.section, Edge { section: dup, other: w });
                self.insert_adjacent(w, e.section, Edge { section: dup, other: cur });
                if self.vertices[w.0].degree() != 3 {
                    break;
                }
                let Some(next) = self.vertices[w.0].edges().find(|n| n.section != e.section && n.section != dup).copied() else {
                    break;
                };
                cur = w;
                e = next;
            }
        }
    }

    fn insert_adjacent(&mut self, v: VtxIdx, after: SecIdx, edge: Edge) {
        let vert = &mut self.vertices[v.0];
        match vert.slot_of(after, None) {
            Some(i) if i < vert.enters.len() => vert.enters.insert(i + 1, edge),
            Some(i) => {
                let i = i - vert.enters.len();
                vert.exits.insert(i + 1, edge);
            }
            None => {
                log::warn!("vertex {} is missing an edge for {}", v.0, after);
                vert.exits.push(edge);
            }
        }
    }

    /// Enumerates the boundary walks of the arrangement.
    ///
    /// Every not-yet-visited edge slot starts a walk. A step takes the edge
    /// in the current slot, marks both that slot and the matching slot at
    /// the far vertex, and continues from the next slot in cyclic order
    /// there; the walk ends on returning to its starting slot, or at a
    /// dead end of degree one. Each slot starts at most one walk, so the
    /// enumeration is linear in the number of edges.
    pub fn traverse_areas(&self) -> Vec<Area> {
        let mut visited: Vec<Vec<bool>> = self
            .vertices
            .iter()
            .map(|v| vec![false; v.degree()])
            .collect();
        let mut areas = Vec::new();
        for vi in 0..self.vertices.len() {
            for slot in 0..self.vertices[vi].degree() {
                if !visited[vi][slot] {
                    areas.push(self.walk_area(vi, slot, &mut visited));
                }
            }
        }
        areas
    }

    fn walk_area(&self, start_v: usize, start_slot: usize, visited: &mut [Vec<bool>]) -> Area {
        let mut sections = Vec::new();
        let (mut vi, mut slot) = (start_v, start_slot);
        loop {
            visited[vi][slot] = true;
            let e = *self.vertices[vi].edge(slot);
            sections.push(e.section);
            let w = e.other.0;
            let exclude = (w == vi).then_some(slot);
            let Some(back) = self.vertices[w].slot_of(e.section, exclude) else {
                log::warn!("vertex {w} is missing its back-edge for {}", e.section);
                break;
            };
            visited[w][back] = true;
            let deg = self.vertices[w].degree();
            if deg == 1 {
                break;
            }
            let next = (back + 1) % deg;
            if w == start_v && next == start_slot {
                break;
            }
            vi = w;
            slot = next;
        }
        Area { sections }
    }

    /// Drops two-section areas whose sections are geometrically identical.
    ///
    /// These are the zero-area slivers left behind by doubled whiskers (and
    /// by coincident back-and-forth input edges), not real faces.
    pub fn remove_area_whiskers(&self, areas: &mut Vec<Area>) {
        areas.retain(|a| {
            if a.sections.len() != 2 {
                return true;
            }
            let s0 = self.section(a.sections[0]);
            let s1 = self.section(a.sections[1]);
            let same = s0.curve == s1.curve
                && ((are_near(s0.f, s1.f, EPSILON) && are_near(s0.t, s1.t, EPSILON))
                    || (are_near(s0.f, s1.t, EPSILON) && are_near(s0.t, s1.f, EPSILON)));
            !same
        });
    }

    fn compact(&mut self) {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut kept = 0;
        for (i, v) in self.vertices.iter().enumerate() {
            if v.degree() > 0 {
                remap[i] = kept;
                kept += 1;
            }
        }
        self.vertices.retain(|v| v.degree() > 0);
        for v in &mut self.vertices {
            for i in 0..v.degree() {
                let e = v.edge_mut(i);
                e.other = VtxIdx(remap[e.other.0]);
            }
        }
    }

    /// Panics if the graph's structural invariants don't hold: every edge
    /// has a matching back-edge, no vertex is empty, every finalized
    /// section's winding vector has one entry per input path, and edge
    /// endpoints sit near their vertices.
    pub fn check_invariants(&self) {
        for (vi, v) in self.vertices.iter().enumerate() {
            assert!(v.degree() > 0, "vertex {vi} has no edges");
            for (slot, e) in v.edges().enumerate() {
                assert!(e.other.0 < self.vertices.len(), "edge target out of range");
                let w = &self.vertices[e.other.0];
                let exclude = (e.other.0 == vi).then_some(slot);
                assert!(
                    w.slot_of(e.section, exclude).is_some(),
                    "no back-edge for {} at vertex {}",
                    e.section,
                    e.other.0
                );
                let sec = self.section(e.section);
                let slack = 4.0 * self.tol + EPSILON;
                assert!(
                    are_near_points(sec.fp, v.point, slack)
                        || are_near_points(sec.tp, v.point, slack),
                    "section {} has no endpoint near vertex {}",
                    e.section,
                    vi
                );
            }
        }
        for v in &self.vertices {
            for e in &v.enters {
                assert_eq!(
                    self.section(e.section).windings.len(),
                    self.paths.len(),
                    "finalized section without a full winding vector"
                );
            }
        }
    }
}

/// Builds the arrangement for a set of paths.
pub(crate) fn build<'a>(
    paths: &'a [Path],
    axis: Axis,
    tol: f64,
    trace: Option<&'a mut dyn FnMut(SweepEvent)>,
) -> TopoGraph {
    let mut input = sections_for_paths(paths, axis, tol);
    // Consumed from the back.
    input.reverse();
    let builder = Builder {
        paths,
        axis,
        tol,
        input,
        chops: Vec::new(),
        context: Vec::new(),
        sections: Vec::new(),
        start_vtx: Vec::new(),
        vertices: Vec::new(),
        trace,
    };
    builder.run()
}

struct Builder<'a> {
    paths: &'a [Path],
    axis: Axis,
    tol: f64,
    /// Unprocessed input sections, sweep-sorted, last = next.
    input: Vec<Section>,
    /// Split-off tails waiting to be merged back in, sweep-sorted ascending.
    chops: Vec<Section>,
    /// Active sections, ordered across the sweep direction.
    context: Vec<SecIdx>,
    sections: Vec<Section>,
    /// Start vertex of each section, filled in when it is processed.
    start_vtx: Vec<VtxIdx>,
    vertices: Vec<Vertex>,
    trace: Option<&'a mut dyn FnMut(SweepEvent)>,
}

impl<'a> Builder<'a> {
    fn run(mut self) -> TopoGraph {
        loop {
            match self.peek_next() {
                Some(fp) => {
                    self.finalize_up_to(self.axis.coord(fp));
                    let sec = self.pop_next();
                    self.process(sec);
                }
                None => {
                    if self.context.is_empty() {
                        break;
                    }
                    self.finalize_up_to(f64::INFINITY);
                }
            }
        }
        TopoGraph {
            paths: self.paths.to_vec(),
            axis: self.axis,
            tol: self.tol,
            vertices: self.vertices,
            sections: self.sections,
        }
    }

    fn emit(&mut self, ev: SweepEvent) {
        if let Some(t) = self.trace.as_mut() {
            t(ev);
        }
    }

    fn curve(&self, sec: &Section) -> &'a Curve {
        &self.paths[sec.curve.path].curves()[sec.curve.curve]
    }

    fn sweep(&self, p: Point) -> f64 {
        self.axis.coord(p)
    }

    fn ortho(&self, p: Point) -> f64 {
        self.axis.other().coord(p)
    }

    fn peek_next(&self) -> Option<Point> {
        let a = self.input.last().map(|s| s.fp);
        let b = self.chops.first().map(|s| s.fp);
        match (a, b) {
            (Some(a), Some(b)) => {
                if sweep_lex_cmp(a, b, self.axis) != Ordering::Greater {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (a, b) => a.or(b),
        }
    }

    fn pop_next(&mut self) -> Section {
        match (self.input.last(), self.chops.first()) {
            (Some(a), Some(b)) => {
                if sweep_lex_cmp(a.fp, b.fp, self.axis) != Ordering::Greater {
                    self.input.pop().unwrap()
                } else {
                    self.chops.remove(0)
                }
            }
            (Some(_), None) => self.input.pop().unwrap(),
            (None, Some(_)) => self.chops.remove(0),
            (None, None) => unreachable!("pop_next called with nothing pending"),
        }
    }

    fn queue_chop(&mut self, sec: Section) {
        let pos = self
            .chops
            .partition_point(|c| sweep_lex_cmp(c.fp, sec.fp, self.axis) != Ordering::Greater);
        self.chops.insert(pos, sec);
    }

    fn ensure_vertex(&mut self, p: Point) -> VtxIdx {
        for (i, v) in self.vertices.iter().enumerate() {
            if are_near_points(v.point, p, self.tol) {
                return VtxIdx(i);
            }
        }
        self.vertices.push(Vertex::new(p));
        VtxIdx(self.vertices.len() - 1)
    }

    /// The section's extent across the sweep direction. Valid because
    /// sections are monotonic in both axes.
    fn ortho_extent(&self, s: &Section) -> (f64, f64) {
        let a = self.ortho(s.fp);
        let b = self.ortho(s.tp);
        (a.min(b), a.max(b))
    }

    /// The forward tangent of a section at parameter `t`: the curve tangent,
    /// flipped if the section runs backward over its curve.
    fn forward_tangent(&self, s: &Section, t: f64) -> kurbo::Vec2 {
        let v = self.curve(s).unit_tangent_at(t);
        if s.f <= s.t {
            v
        } else {
            -v
        }
    }

    /// The section's parameter at sweep coordinate `coord`.
    ///
    /// A failed lookup here means the root-finder missed a value that has to
    /// exist on a monotonic section; that is a defect, and the midpoint
    /// fallback is an approximation policy to keep the sweep going, not a
    /// correct answer. It is logged so integrators can count occurrences.
    fn time_at_sweep(&self, s: &Section, coord: f64) -> f64 {
        let (lo, hi) = (s.f.min(s.t), s.f.max(s.t));
        match self.curve(s).roots(coord, self.axis, self.tol) {
            Roots::Finite(ts) => {
                let mut best: Option<f64> = None;
                for t in ts {
                    if t >= lo - EPSILON && t <= hi + EPSILON {
                        let dist_mid = (t - 0.5 * (lo + hi)).abs();
                        if best.is_none_or(|b| dist_mid < (b - 0.5 * (lo + hi)).abs()) {
                            best = Some(t.clamp(lo, hi));
                        }
                    }
                }
                match best {
                    Some(t) => t,
                    None => {
                        log::warn!(
                            "no root at sweep {coord} on section of curve {}; using interval midpoint",
                            s.curve
                        );
                        0.5 * (lo + hi)
                    }
                }
            }
            Roots::All => s.f.min(s.t),
        }
    }

    /// Orders two sections across the sweep direction.
    ///
    /// Disjoint cross-extents order by extent. Overlapping ones are compared
    /// at a shared sweep coordinate (the later start, which lies in both
    /// spans), falling back to forward tangents when the points coincide,
    /// and to a mid-span probe when the tangents are parallel too. This is
    /// what keeps the context a strict weak order.
    fn section_order(&self, a: &Section, b: &Section) -> Ordering {
        let (alo, ahi) = self.ortho_extent(a);
        let (blo, bhi) = self.ortho_extent(b);
        if ahi + self.tol < blo {
            return Ordering::Less;
        }
        if bhi + self.tol < alo {
            return Ordering::Greater;
        }

        // Probe at the later of the two starts.
        let (probe, pa, pb) = if self.sweep(a.fp) >= self.sweep(b.fp) {
            let coord = self.sweep(a.fp);
            (coord, a.fp, self.curve(b).point_at(self.time_at_sweep(b, coord)))
        } else {
            let coord = self.sweep(b.fp);
            (coord, self.curve(a).point_at(self.time_at_sweep(a, coord)), b.fp)
        };
        let (ya, yb) = (self.ortho(pa), self.ortho(pb));
        if !are_near(ya, yb, self.tol) {
            return SortFloat::from(ya).cmp(&SortFloat::from(yb));
        }

        // Shared point: order by how the sections leave it.
        let ta = self.forward_tangent(a, self.time_at_sweep(a, probe));
        let tb = self.forward_tangent(b, self.time_at_sweep(b, probe));
        let cross = ta.cross(tb);
        if cross.abs() > EPSILON {
            return if cross > 0.0 {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        // Parallel tangents (e.g. two arcs meeting vertically): compare in
        // the middle of the common sweep span.
        let hi = self.sweep(a.tp).min(self.sweep(b.tp));
        let lo = self.sweep(a.fp).max(self.sweep(b.fp));
        if hi > lo {
            let mid = 0.5 * (lo + hi);
            let ya = self.ortho(self.curve(a).point_at(self.time_at_sweep(a, mid)));
            let yb = self.ortho(self.curve(b).point_at(self.time_at_sweep(b, mid)));
            if !are_near(ya, yb, self.tol) {
                return SortFloat::from(ya).cmp(&SortFloat::from(yb));
            }
        }
        Ordering::Equal
    }

    fn process(&mut self, sec: Section) {
        let sv = self.ensure_vertex(sec.fp);
        let idx = SecIdx(self.sections.len());
        self.sections.push(sec);
        self.start_vtx.push(sv);
        self.add_exit(sv, idx);
        self.emit(SweepEvent::Start(idx));

        let pos = self.context_rank(idx);
        self.context.insert(pos, idx);
        self.resolve_crossings(idx);

        if self.sections[idx.0].flat_in(self.axis, self.tol) {
            self.resolve_flat(idx, sv);
        }
    }

    fn context_rank(&self, idx: SecIdx) -> usize {
        let s = &self.sections[idx.0];
        self.context
            .partition_point(|&c| self.section_order(&self.sections[c.0], s) != Ordering::Greater)
    }

    fn add_exit(&mut self, v: VtxIdx, idx: SecIdx) {
        let s = &self.sections[idx.0];
        let rank = self.vertices[v.0]
            .exits
            .iter()
            .position(|e| self.section_order(s, &self.sections[e.section.0]) == Ordering::Less)
            .unwrap_or(self.vertices[v.0].exits.len());
        self.vertices[v.0].exits.insert(
            rank,
            Edge {
                section: idx,
                other: UNRESOLVED,
            },
        );
    }

    /// Splits `idx` at curve parameter `t`, keeping the head in place and
    /// queueing the tail.
    fn split(&mut self, idx: SecIdx, t: f64) {
        let p = self.curve(&self.sections[idx.0]).point_at(t);
        let s = &mut self.sections[idx.0];
        let tail = Section {
            curve: s.curve,
            f: t,
            t: s.t,
            fp: p,
            tp: s.tp,
            windings: Vec::new(),
        };
        s.t = t;
        s.tp = p;
        self.queue_chop(tail);
        self.emit(SweepEvent::Split(idx, p));
    }

    /// Finds and resolves crossings between the new section and the
    /// overlapping part of the context.
    ///
    /// Each round picks the crossing nearest the new section's low end and
    /// splits both participants there; a crossing sitting at one section's
    /// endpoint splits only the other (that's a junction, and vertex
    /// proximity will merge the endpoints). Every round shortens somebody,
    /// so this terminates.
    fn resolve_crossings(&mut self, idx: SecIdx) {
        loop {
            let s = &self.sections[idx.0];
            let (slo, shi) = self.ortho_extent(s);
            let mut best: Option<(f64, SecIdx, f64, f64)> = None;
            for &other in &self.context {
                if other == idx {
                    continue;
                }
                let o = &self.sections[other.0];
                let (olo, ohi) = self.ortho_extent(o);
                if shi + self.tol < olo || ohi + self.tol < slo {
                    continue;
                }
                for c in crossings_monotonic(
                    self.curve(s),
                    (s.f, s.t),
                    self.curve(o),
                    (o.f, o.t),
                    self.tol,
                ) {
                    let p = self.curve(s).point_at(c.ta);
                    let s_interior = !are_near_points(p, s.fp, self.tol)
                        && !are_near_points(p, s.tp, self.tol);
                    let o_interior = !are_near_points(p, o.fp, self.tol)
                        && !are_near_points(p, o.tp, self.tol);
                    if !s_interior && !o_interior {
                        continue;
                    }
                    let rank = (c.ta - s.f).abs();
                    if best.is_none_or(|(r, ..)| rank < r) {
                        let s_cut = if s_interior { c.ta } else { f64::NAN };
                        let o_cut = if o_interior { c.tb } else { f64::NAN };
                        best = Some((rank, other, s_cut, o_cut));
                    }
                }
            }
            let Some((_, other, s_cut, o_cut)) = best else {
                break;
            };
            if o_cut.is_finite() {
                self.split(other, o_cut);
            }
            if s_cut.is_finite() {
                self.split(idx, s_cut);
            }
        }
    }

    /// A section whose sweep extent has collapsed can't wait in the context
    /// for the sweep to reach its far end; it gets resolved on the spot.
    fn resolve_flat(&mut self, idx: SecIdx, sv: VtxIdx) {
        let rank = self
            .context
            .iter()
            .position(|&c| c == idx)
            .expect("flat section should still be in context");

        // Its winding vector is the context count at its position.
        let mut counters = vec![0i32; self.paths.len()];
        for &c in &self.context[..rank] {
            let s = &self.sections[c.0];
            counters[s.curve.path] += s.winding_sign();
        }
        self.context.remove(rank);
        self.sections[idx.0].windings = counters;

        if self.sections[idx.0].is_point(self.tol) {
            // Nothing to connect: drop the exit edge added at the start.
            if let Some(slot) = self.vertices[sv.0].slot_of(idx, None) {
                self.vertices[sv.0].remove_slot(slot);
            }
            return;
        }

        let tp = self.sections[idx.0].tp;
        let ev = self.ensure_vertex(tp);
        self.add_enter(ev, idx, sv);
        self.fix_exit_target(sv, idx, ev);
        self.emit(SweepEvent::Finalize(ev));
    }

    /// Inserts an enter edge at its rank across the sweep direction, and
    /// shifts the winding vectors of later-ranked enters that share the
    /// newcomer's sweep position (flat sections resolved at this same
    /// coordinate): those froze before the newcomer existed and never
    /// counted it. Ordinary enters froze against the context for coordinates
    /// just below this one, where the newcomer has no extent, so they are
    /// left alone.
    fn add_enter(&mut self, v: VtxIdx, idx: SecIdx, from: VtxIdx) {
        let s = &self.sections[idx.0];
        let rank = self.vertices[v.0]
            .enters
            .iter()
            .position(|e| self.section_order(s, &self.sections[e.section.0]) == Ordering::Less)
            .unwrap_or(self.vertices[v.0].enters.len());
        let path = s.curve.path;
        let sign = s.winding_sign();
        let later: Vec<SecIdx> = self.vertices[v.0].enters[rank..]
            .iter()
            .map(|e| e.section)
            .collect();
        for l in later {
            let flat = self.sections[l.0].flat_in(self.axis, self.tol);
            if flat && !self.sections[l.0].windings.is_empty() {
                self.sections[l.0].windings[path] += sign;
            }
        }
        self.vertices[v.0].enters.insert(
            rank,
            Edge {
                section: idx,
                other: from,
            },
        );
    }

    fn fix_exit_target(&mut self, sv: VtxIdx, idx: SecIdx, target: VtxIdx) {
        let found = self.vertices[sv.0]
            .exits
            .iter_mut()
            .find(|e| e.section == idx && e.other == UNRESOLVED);
        match found {
            Some(e) => e.other = target,
            None => log::warn!("vertex {} is missing the exit edge for {}", sv.0, idx),
        }
    }

    /// Finalizes every context entry whose high end is at or before `pos`:
    /// freezes winding vectors with one walk over the context, groups the
    /// finished sections by shared high endpoint, and turns each group into
    /// the enters of a vertex.
    fn finalize_up_to(&mut self, pos: f64) {
        let finishing: Vec<bool> = self
            .context
            .iter()
            .map(|&c| self.sweep(self.sections[c.0].tp) <= pos)
            .collect();
        if !finishing.iter().any(|&f| f) {
            return;
        }

        // One walk accumulates the per-path counters; every finishing
        // section freezes the count at its own position, and still
        // contributes to the sections above it.
        let mut counters = vec![0i32; self.paths.len()];
        for (ci, &sidx) in self.context.iter().enumerate() {
            if finishing[ci] {
                self.sections[sidx.0].windings = counters.clone();
            }
            let s = &self.sections[sidx.0];
            counters[s.curve.path] += s.winding_sign();
        }

        // Group by shared high endpoint, in context order.
        let mut groups: Vec<(Point, Vec<SecIdx>)> = Vec::new();
        for (ci, &sidx) in self.context.iter().enumerate() {
            if !finishing[ci] {
                continue;
            }
            let tp = self.sections[sidx.0].tp;
            match groups.iter_mut().find(|(p, _)| are_near_points(*p, tp, self.tol)) {
                Some((_, members)) => members.push(sidx),
                None => groups.push((tp, vec![sidx])),
            }
        }

        let mut ci = 0;
        self.context.retain(|_| {
            let keep = !finishing[ci];
            ci += 1;
            keep
        });

        for (point, members) in groups {
            let v = self.ensure_vertex(point);
            for sidx in members {
                let from = self.start_vtx[sidx.0];
                // Members arrive in context order; the comparator keeps
                // their ranks consistent when merging into a vertex that
                // already has enters.
                self.add_enter_without_shift(v, sidx, from);
                self.fix_exit_target(from, sidx, v);
            }
            self.emit(SweepEvent::Finalize(v));
        }
    }

    /// Like [`add_enter`](Self::add_enter), but without winding shifts:
    /// used at finalization, where the walk already counted every section.
    fn add_enter_without_shift(&mut self, v: VtxIdx, idx: SecIdx, from: VtxIdx) {
        let s = &self.sections[idx.0];
        let rank = self.vertices[v.0]
            .enters
            .iter()
            .position(|e| self.section_order(s, &self.sections[e.section.0]) == Ordering::Less)
            .unwrap_or(self.vertices[v.0].enters.len());
        self.vertices[v.0].enters.insert(
            rank,
            Edge {
                section: idx,
                other: from,
            },
        );
    }
}
