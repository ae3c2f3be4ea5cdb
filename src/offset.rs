use std::collections::HashSet;

use crate::voronoi_core::handles::{Branch, Cell, Edge};
use crate::voronoi_core::math;
use crate::voronoi_core::separator::Site;
use crate::voronoi_core::VoronoiDiagram;
use crate::{GeometryError, OffsetNum, Point2};

/// A Voronoi diagram frozen for offset queries.
///
/// Construction is the expensive part; any number of radii can then be
/// queried against the same diagram.
pub struct OffsetDiagram<S> {
    diagram: VoronoiDiagram<S>,
}

/// One crossing of the offset level set through a Voronoi edge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Crossing<S> {
    /// The crossed edge, directed so that its tail is the cell whose ring
    /// list carries this entry.
    pub edge: Edge,
    pub branch: Branch,
    pub point: Point2<S>,
}

/// A maximal run of crossings; `cells[i]` is the cell traversed between
/// `crossings[i]` and `crossings[i + 1]` (wrapping around when closed).
pub(crate) struct Chain<S> {
    pub closed: bool,
    pub crossings: Vec<Crossing<S>>,
    pub cells: Vec<Cell>,
    pub has_right: bool,
    pub has_left: bool,
}

/// Canonical identity of an undirected crossing: the smaller directed edge
/// index and the branch as seen from it.
pub(crate) type CrossingId = (usize, i8);

impl<S: OffsetNum> OffsetDiagram<S> {
    /// Builds the diagram for the given sites. `extra_radius` must be at
    /// least as large as any radius later queried.
    pub fn new(
        points: &[Point2<S>],
        segments: &[(usize, usize)],
        extra_radius: S,
    ) -> Result<Self, GeometryError> {
        Ok(OffsetDiagram {
            diagram: VoronoiDiagram::with_parameters(
                points,
                segments,
                extra_radius,
                crate::voronoi_core::diagram::DEFAULT_SEED,
            )?,
        })
    }

    pub fn diagram(&self) -> &VoronoiDiagram<S> {
        &self.diagram
    }

    /// The offset curves at the given signed radius.
    ///
    /// Positive radii trace the side to the right of the oriented segments
    /// (the outside of a counterclockwise polygon), negative radii the left
    /// side, reversed. Closed loops do not repeat their first point. The
    /// absolute error of arc interpolation is bounded by `atol`.
    pub fn offset(&self, radius: S, atol: S) -> Vec<Vec<Point2<S>>> {
        let negative = radius.is_sign_negative();
        let magnitude = radius.abs();
        if magnitude == S::zero() {
            return self.zero_offset(negative);
        }

        let mut result = Vec::new();
        for chain in self.chains(magnitude) {
            let keep = if negative {
                chain.has_left
            } else {
                chain.has_right || !chain.has_left
            };
            if !keep {
                continue;
            }
            let mut path = self.render(&chain, magnitude, atol);
            if negative {
                path.reverse();
            }
            result.push(path);
        }
        result.extend(self.isolated_circles(magnitude, negative, atol));
        result
    }

    // ------------------------------------------------------------------
    // Crossing enumeration

    fn real_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.diagram.num_cells())
            .map(Cell::new)
            .filter(|&c| !self.diagram.is_fake_cell(c))
    }

    fn crossing_id(&self, edge: Edge, branch: Branch) -> CrossingId {
        let opposite = self.diagram.table().opposite(edge);
        if edge.index() <= opposite.index() {
            (edge.index(), branch.sign())
        } else {
            (opposite.index(), (-branch).sign())
        }
    }

    /// The crossings of `{distance = r}` through one directed edge, ordered
    /// along the counterclockwise boundary of the tail cell (which walks
    /// the dual edge from `node(opposite(e))` towards `node(e)`).
    fn edge_crossings(&self, edge: Edge, r: S) -> impl Iterator<Item = Crossing<S>> {
        let diagram = &self.diagram;
        let separator = diagram.separator(edge);
        let opposite = diagram.table().opposite(edge);
        let rmin = separator.rmin();

        let mut candidates: [Option<Crossing<S>>; 2] = [None, None];
        let branch_here = diagram.branch(edge);
        let branch_there = diagram.branch(opposite);
        let r1 = diagram.node_radius(edge.node());
        let r2 = diagram.node_radius(opposite.node());

        let usable = !separator.is_parallel()
            && !branch_here.is_bad()
            && !branch_there.is_bad()
            && r1.is_finite()
            && r2.is_finite()
            && r > rmin;
        if usable {
            let offset_u = r - rmin;
            let sign_here: S = (branch_here.sign() as f32).into();
            let sign_there: S = (branch_there.sign() as f32).into();
            let u_end = sign_here * S::zero().max(r1 - rmin);
            let u_start = -sign_there * S::zero().max(r2 - rmin);
            let lo = u_start.min(u_end);
            let hi = u_start.max(u_end);

            let mut found = 0;
            for (branch, u) in [(Branch::PLUS, offset_u), (Branch::MINUS, -offset_u)] {
                if u > lo && u < hi {
                    candidates[found] = Some(Crossing {
                        edge,
                        branch,
                        point: separator.evaluate(branch, r),
                    });
                    found += 1;
                }
            }
            // Order along the walk from u_start towards u_end; PLUS sits at
            // +offset_u, so ascending traversal visits MINUS first.
            if found == 2 && u_start <= u_end {
                candidates.swap(0, 1);
            }
        }
        candidates.into_iter().flatten()
    }

    /// All crossings around each cell, in counterclockwise boundary order.
    fn cell_lists(&self, r: S) -> Vec<Vec<Crossing<S>>> {
        let mut lists = vec![Vec::new(); self.diagram.num_cells()];
        for cell in self.real_cells() {
            let mut list = Vec::new();
            for edge in self.diagram.table().star(cell) {
                list.extend(self.edge_crossings(edge, r));
            }
            lists[cell.index()] = list;
        }
        lists
    }

    /// Whether the level set, traversed with its sites on the left, passes
    /// from the head cell into the tail cell at this crossing.
    fn enters_tail(&self, crossing: &Crossing<S>) -> bool {
        let tail = self.diagram.table().tail(crossing.edge);
        let head = self.diagram.table().head(crossing.edge);
        let radial = |cell: Cell| {
            crossing
                .point
                .sub(nearest_site_point(self.diagram.site(cell), crossing.point))
        };
        math::det2(radial(tail), radial(head)) > S::zero()
    }

    // ------------------------------------------------------------------
    // Chain construction

    pub(crate) fn chains(&self, r: S) -> Vec<Chain<S>> {
        let lists = self.cell_lists(r);
        let total: usize = lists.iter().map(Vec::len).sum();
        let mut visited: HashSet<CrossingId> = HashSet::new();
        let mut result = Vec::new();

        for start_cell in self.real_cells() {
            for start_index in 0..lists[start_cell.index()].len() {
                let start = lists[start_cell.index()][start_index];
                let start_id = self.crossing_id(start.edge, start.branch);
                if visited.contains(&start_id) {
                    continue;
                }
                visited.insert(start_id);

                let entered = if self.enters_tail(&start) {
                    self.diagram.table().tail(start.edge)
                } else {
                    self.diagram.table().head(start.edge)
                };

                let mut crossings = vec![start];
                let mut cells = Vec::new();
                let mut closed = false;

                // Forward: successor in the entered cell, then hop across.
                let mut cell = entered;
                let mut current_id = start_id;
                for _ in 0..total + 1 {
                    let list = &lists[cell.index()];
                    let here = match list
                        .iter()
                        .position(|c| self.crossing_id(c.edge, c.branch) == current_id)
                    {
                        Some(i) => i,
                        None => break,
                    };
                    if list.len() < 2 {
                        break;
                    }
                    let next = list[(here + 1) % list.len()];
                    let next_id = self.crossing_id(next.edge, next.branch);
                    cells.push(cell);
                    if next_id == start_id {
                        closed = true;
                        break;
                    }
                    visited.insert(next_id);
                    crossings.push(next);
                    cell = self.diagram.table().head(next.edge);
                    current_id = next_id;
                }

                if !closed {
                    // Extend backward from the start through the cell the
                    // start crossing exits.
                    let mut cell = if self.enters_tail(&start) {
                        self.diagram.table().head(start.edge)
                    } else {
                        self.diagram.table().tail(start.edge)
                    };
                    let mut current_id = start_id;
                    for _ in 0..total + 1 {
                        let list = &lists[cell.index()];
                        let here = match list
                            .iter()
                            .position(|c| self.crossing_id(c.edge, c.branch) == current_id)
                        {
                            Some(i) => i,
                            None => break,
                        };
                        if list.len() < 2 {
                            break;
                        }
                        let previous = list[(here + list.len() - 1) % list.len()];
                        let previous_id = self.crossing_id(previous.edge, previous.branch);
                        if visited.contains(&previous_id) {
                            break;
                        }
                        visited.insert(previous_id);
                        crossings.insert(0, previous);
                        cells.insert(0, cell);
                        cell = self.diagram.table().head(previous.edge);
                        current_id = previous_id;
                    }
                }

                let mut has_right = false;
                let mut has_left = false;
                for crossing in &crossings {
                    for cell in [
                        self.diagram.table().tail(crossing.edge),
                        self.diagram.table().head(crossing.edge),
                    ] {
                        if let Some((_, left)) = self.diagram.segment_index(cell) {
                            if left {
                                has_left = true;
                            } else {
                                has_right = true;
                            }
                        }
                    }
                }

                result.push(Chain {
                    closed,
                    crossings,
                    cells,
                    has_right,
                    has_left,
                });
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Interpolation

    /// Renders a chain as a polyline: crossing points, with circular arcs
    /// sampled around point-site cells.
    fn render(&self, chain: &Chain<S>, r: S, atol: S) -> Vec<Point2<S>> {
        self.render_marked(chain, r, atol).0
    }

    /// Like [Self::render], additionally returning the index of each
    /// crossing within the rendered polyline.
    pub(crate) fn render_marked(
        &self,
        chain: &Chain<S>,
        r: S,
        atol: S,
    ) -> (Vec<Point2<S>>, Vec<usize>) {
        let mut out = Vec::new();
        let mut marks = Vec::with_capacity(chain.crossings.len());
        let n = chain.crossings.len();
        for i in 0..n {
            marks.push(out.len());
            out.push(chain.crossings[i].point);
            if i >= chain.cells.len() {
                continue;
            }
            let cell = chain.cells[i];
            if let Site::Point(center) = self.diagram.site(cell) {
                let to = chain.crossings[(i + 1) % n].point;
                push_arc(&mut out, center, chain.crossings[i].point, to, r, atol);
            }
        }
        (out, marks)
    }

    pub(crate) fn chain_crossing_id(&self, crossing: &Crossing<S>) -> CrossingId {
        self.crossing_id(crossing.edge, crossing.branch)
    }

    /// The directed edge from `from`'s ring whose head is `to`, if the two
    /// cells are adjacent.
    pub(crate) fn edge_between(&self, from: Cell, to: Cell) -> Option<Edge> {
        self.diagram
            .table()
            .star(from)
            .find(|&e| self.diagram.table().head(e) == to)
    }

    /// Full offset circles around point sites whose cell the level set
    /// never leaves. Those carry no crossings and are invisible to the
    /// chain walk.
    fn isolated_circles(&self, r: S, negative: bool, atol: S) -> Vec<Vec<Point2<S>>> {
        let mut result = Vec::new();
        if negative {
            return result;
        }
        for cell in self.real_cells() {
            let center = match self.diagram.site(cell) {
                Site::Point(p) => p,
                Site::Segment(_, _) => continue,
            };
            let contained = self
                .diagram
                .table()
                .star(cell)
                .all(|edge| self.diagram.separator(edge).rmin() > r);
            if !contained {
                continue;
            }
            let start = center.add(Point2::new(r, S::zero()));
            let mut circle = vec![start];
            push_arc(&mut circle, center, start, start, r, atol);
            // Drop the duplicated closing point.
            circle.pop();
            result.push(circle);
        }
        result
    }

    // ------------------------------------------------------------------
    // The degenerate zero-radius query: the trajectory itself.

    fn zero_offset(&self, negative: bool) -> Vec<Vec<Point2<S>>> {
        let num_points = self.diagram.num_points();
        let mut incident: Vec<Vec<(usize, usize)>> = vec![Vec::new(); num_points];
        for k in 0..self.diagram.num_segments() {
            let (a, b) = self.diagram.segment_point_indices(k);
            incident[a].push((k, b));
            incident[b].push((k, a));
        }
        let junction = |p: usize| incident[p].len() != 2;

        let mut seen = vec![false; self.diagram.num_segments()];
        let mut result = Vec::new();
        for k in 0..self.diagram.num_segments() {
            if seen[k] {
                continue;
            }
            // Rewind, without marking, to a terminus of the run through
            // segment k; a cycle brings us back to the anchor.
            let (anchor, mut came_from) = self.diagram.segment_point_indices(k);
            let mut start = anchor;
            while !junction(start) {
                let &(_, previous) = incident[start]
                    .iter()
                    .find(|&&(_, other)| other != came_from)
                    .unwrap_or(&incident[start][0]);
                came_from = start;
                start = previous;
                if start == anchor {
                    break;
                }
            }

            // Emit the run forward from the terminus, marking segments.
            let mut path = vec![self.diagram.point_position(start)];
            let mut at = start;
            while let Some(&(segment, to)) =
                incident[at].iter().find(|&&(segment, _)| !seen[segment])
            {
                seen[segment] = true;
                path.push(self.diagram.point_position(to));
                if junction(to) {
                    break;
                }
                at = to;
            }
            // A closed run returns to its start; drop the duplicate.
            if path.len() > 2 && path.first() == path.last() {
                path.pop();
            }
            if negative {
                path.reverse();
            }
            result.push(path);
        }
        result
    }
}

fn nearest_site_point<S: OffsetNum>(site: Site<S>, q: Point2<S>) -> Point2<S> {
    match site {
        Site::Point(p) => p,
        Site::Segment(a, b) => {
            let t = math::project_relative(a, b, q).max(S::zero()).min(S::one());
            a.add(b.sub(a).mul(t))
        }
    }
}

/// Samples the counterclockwise arc from `from` to `to` around `center`,
/// appending only the interior points. The subdivision keeps the chord
/// error below `atol`.
fn push_arc<S: OffsetNum>(
    out: &mut Vec<Point2<S>>,
    center: Point2<S>,
    from: Point2<S>,
    to: Point2<S>,
    r: S,
    atol: S,
) {
    let tau: S = std::f32::consts::TAU.into();
    let slack: S = 1.0e-9f32.into();
    let a0 = from.sub(center).angle();
    let mut a1 = to.sub(center).angle();
    if from == to {
        a1 = a0 + tau;
    } else {
        // Arcs are counterclockwise; the slack keeps rounding noise on a
        // near-zero sweep from turning into a full turn.
        while a1 < a0 - slack {
            a1 = a1 + tau;
        }
    }
    let eight: S = 8.0f32.into();
    let count = ((a1 - a0) * (r / (eight * atol)).sqrt()).ceil();
    let count = num_traits::ToPrimitive::to_usize(&count).unwrap_or(1).max(1);
    for k in 1..count {
        let fraction: S = (k as f32).into();
        let steps: S = (count as f32).into();
        let angle = a0 + (a1 - a0) * fraction / steps;
        out.push(center.add(Point2::new(angle.cos() * r, angle.sin() * r)));
    }
    if from == to {
        // Emit the closing point so the caller sees the full wrap.
        out.push(to);
    }
}

/// Computes the offset curves of a figure at one signed radius.
///
/// Builds the Voronoi diagram of the sites and extracts the offset at
/// `radius`; see [OffsetDiagram::offset] for the sign convention.
pub fn offset<S: OffsetNum>(
    points: &[Point2<S>],
    segments: &[(usize, usize)],
    radius: S,
    atol: S,
) -> Result<Vec<Vec<Point2<S>>>, GeometryError> {
    let diagram = OffsetDiagram::new(points, segments, radius.abs())?;
    Ok(diagram.offset(radius, atol))
}

/// Computes offsets at several radii, sharing one diagram.
pub fn offset_multi<S: OffsetNum>(
    points: &[Point2<S>],
    segments: &[(usize, usize)],
    radii: &[S],
    atol: S,
) -> Result<Vec<Vec<Vec<Point2<S>>>>, GeometryError> {
    let mut extra = S::zero();
    for &r in radii {
        extra = extra.max(r.abs());
    }
    let diagram = OffsetDiagram::new(points, segments, extra)?;
    Ok(radii.iter().map(|&r| diagram.offset(r, atol)).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> (Vec<Point2<f64>>, Vec<(usize, usize)>) {
        (
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            vec![(0, 1), (1, 2), (2, 3), (3, 0)],
        )
    }

    fn shoelace(path: &[Point2<f64>]) -> f64 {
        let mut doubled = 0.0;
        for i in 0..path.len() {
            let p = path[i];
            let q = path[(i + 1) % path.len()];
            doubled += p.x * q.y - q.x * p.y;
        }
        doubled / 2.0
    }

    fn distance_to_figure(
        points: &[Point2<f64>],
        segments: &[(usize, usize)],
        q: Point2<f64>,
    ) -> f64 {
        let mut best = f64::INFINITY;
        for p in points {
            best = best.min(q.distance2(*p).sqrt());
        }
        for &(a, b) in segments {
            best = best.min(math::segdistance2(points[a], points[b], q).sqrt());
        }
        best
    }

    #[test]
    fn test_square_outset() {
        let (points, segments) = square();
        let paths = offset(&points, &segments, 0.5, 1.0e-3).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert!(path.len() >= 8);

        for q in path {
            assert_relative_eq!(
                distance_to_figure(&points, &segments, *q),
                0.5,
                max_relative = 1.0e-6
            );
        }
        // Area of the rounded rectangle: 1 + perimeter·r + π·r².
        let expected = 1.0 + 4.0 * 0.5 + std::f64::consts::PI * 0.25;
        assert_relative_eq!(shoelace(path), expected, max_relative = 1.0e-2);
    }

    #[test]
    fn test_square_inset() {
        let (points, segments) = square();
        let paths = offset(&points, &segments, -0.2, 1.0e-3).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        // A convex polygon shrinks to a sharp polygon: four corners.
        assert_eq!(path.len(), 4);
        for q in path {
            assert_relative_eq!(
                distance_to_figure(&points, &segments, *q),
                0.2,
                max_relative = 1.0e-6
            );
        }
        // Reversal makes insets counterclockwise again.
        assert_relative_eq!(shoelace(path), 0.36, max_relative = 1.0e-9);
    }

    #[test]
    fn test_offset_area_monotone() {
        let (points, segments) = square();
        let diagram = OffsetDiagram::new(&points, &segments, 2.0).unwrap();
        let mut last = 1.0;
        for r in [0.1, 0.4, 0.9, 1.7] {
            let paths = diagram.offset(r, 1.0e-3);
            assert_eq!(paths.len(), 1);
            let area = shoelace(&paths[0]);
            assert!(area > last, "area not monotone at r = {}", r);
            last = area;
        }
    }

    #[test]
    fn test_open_polyline_zero_offset() {
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, 1.0),
            Point2::new(5.0, 9.0),
        ];
        let segments = [(0, 1), (1, 2), (2, 3)];
        let paths = offset(&points, &segments, 0.0, 1.0e-3).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], points.to_vec());

        let reversed = offset(&points, &segments, -0.0, 1.0e-3).unwrap();
        let mut expected = points.to_vec();
        expected.reverse();
        assert_eq!(reversed[0], expected);
    }

    #[test]
    fn test_polyline_stadium() {
        // A single segment offset on both sides: one closed stadium curve.
        let points = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let segments = [(0, 1)];
        let paths = offset(&points, &segments, 1.0, 1.0e-3).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        for q in path {
            assert_relative_eq!(
                distance_to_figure(&points, &segments, *q),
                1.0,
                max_relative = 1.0e-6
            );
        }
        // Stadium area: 2·r·length + π·r².
        assert_relative_eq!(
            shoelace(path).abs(),
            20.0 + std::f64::consts::PI,
            max_relative = 1.0e-2
        );
    }

    #[test]
    fn test_two_points_merged_and_separate() {
        let points = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];

        // Beyond half the distance the two circles merge into one curve.
        let merged = offset(&points, &[], 7.0, 1.0e-3).unwrap();
        assert_eq!(merged.len(), 1);
        for q in &merged[0] {
            assert_relative_eq!(
                distance_to_figure(&points, &[], *q),
                7.0,
                max_relative = 1.0e-6
            );
        }

        // Below it they are two disjoint circles without any crossing.
        let separate = offset(&points, &[], 3.0, 1.0e-3).unwrap();
        assert_eq!(separate.len(), 2);
        for circle in &separate {
            let area = shoelace(circle);
            assert_relative_eq!(area, std::f64::consts::PI * 9.0, max_relative = 1.0e-2);
        }
    }

    #[test]
    fn test_offset_roundtrip() {
        // Outsetting and insetting back is the identity up to interpolation
        // error while the topology is unchanged.
        let (points, segments) = square();
        let outset = offset(&points, &segments, 0.3, 1.0e-4).unwrap();
        assert_eq!(outset.len(), 1);

        let ring = &outset[0];
        let ring_segments: Vec<(usize, usize)> =
            (0..ring.len()).map(|i| (i, (i + 1) % ring.len())).collect();
        let back = offset(ring, &ring_segments, -0.3, 1.0e-4).unwrap();
        assert_eq!(back.len(), 1);
        for q in &back[0] {
            let distance = distance_to_figure(&points, &segments, *q);
            assert!(distance <= 2.0e-3, "roundtrip point {:?} off by {}", q, distance);
        }
    }

    #[test]
    fn test_multi_radius_shares_diagram() {
        let (points, segments) = square();
        let all = offset_multi(&points, &segments, &[0.2, 0.5], 1.0e-3).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].len(), 1);
        assert_eq!(all[1].len(), 1);
        assert!(shoelace(&all[0][0]) < shoelace(&all[1][0]));
    }
}
