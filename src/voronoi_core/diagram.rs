use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::voronoi_core::corner_table::CornerTable;
use crate::voronoi_core::handles::{Branch, Cell, Edge, Node};
use crate::voronoi_core::math;
use crate::voronoi_core::separator::{Separator, Site};
use crate::voronoi_core::tripoint::tripoint;
use crate::{GeometryError, OffsetNum, Point2};

/// Default seed for the random insertion order. The order only affects
/// construction time, never the resulting diagram.
pub const DEFAULT_SEED: u64 = 0x5eed;

const LOCATE_ITERATION_CAP: usize = 1000;

/// A Voronoi diagram of point and segment sites.
///
/// Cells are laid out as: one cell per input point, one per input segment
/// (which becomes the segment's right half after splitting), the three far
/// cells of the bounding triangle, and finally one left-half cell per
/// segment.
///
/// The diagram is immutable once constructed; offsetting queries go through
/// [crate::OffsetDiagram].
pub struct VoronoiDiagram<S> {
    table: CornerTable,
    points: Vec<Point2<S>>,
    segments: Vec<(u32, u32)>,
    fake_positions: [Point2<S>; 3],
    fake_node: Node,
    neighbours: Vec<u32>,
    /// Relative tolerance scale: the input bounding box diagonal.
    scale: S,

    separators: Vec<Separator<S>>,
    branches: Vec<Branch>,
    node_points: Vec<Point2<S>>,
    node_radius: Vec<S>,

    rng: StdRng,
}

impl<S: OffsetNum> VoronoiDiagram<S> {
    /// Builds the diagram of the given sites. Segments are pairs of indices
    /// into `points` and may share endpoints, but must not cross.
    pub fn new(points: &[Point2<S>], segments: &[(usize, usize)]) -> Result<Self, GeometryError> {
        Self::with_parameters(points, segments, S::zero(), DEFAULT_SEED)
    }

    /// Builds the diagram with an explicit extra radius and insertion seed.
    ///
    /// `extra_radius` widens the bounding triangle so that offsets up to
    /// that radius stay within defined topology.
    pub fn with_parameters(
        points: &[Point2<S>],
        segments: &[(usize, usize)],
        extra_radius: S,
        seed: u64,
    ) -> Result<Self, GeometryError> {
        let mut maximum = S::zero();
        for p in points {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(GeometryError::BadCoordinate);
            }
            maximum = maximum.max(p.x.abs()).max(p.y.abs());
        }
        {
            let mut sorted = points.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            if sorted.windows(2).any(|w| w[0] == w[1]) {
                return Err(GeometryError::BadCoordinate);
            }
        }
        let mut neighbours = vec![0u32; points.len()];
        for &(a, b) in segments {
            if a >= points.len() || b >= points.len() || a == b {
                return Err(GeometryError::BadCoordinate);
            }
            neighbours[a] += 1;
            neighbours[b] += 1;
        }
        if !extra_radius.is_finite() || extra_radius < S::zero() {
            return Err(GeometryError::BadCoordinate);
        }

        // Far triangle at 3M around the origin; its incircle has radius
        // 1.5M, strictly containing every input point and every offset up
        // to extra_radius.
        let margin = (maximum + extra_radius + S::one()) * 3.0f32.into();
        let height: S = 3.0f32.sqrt().into();
        let half: S = 0.5f32.into();
        let fake_positions = [
            Point2::new(S::zero(), margin),
            Point2::new(-margin * height * half, -margin * half),
            Point2::new(margin * height * half, -margin * half),
        ];

        let mut table = CornerTable::new();
        for _ in 0..points.len() + segments.len() + 3 {
            table.add_cell();
        }
        let fake_cells = [
            Cell::new(points.len() + segments.len()),
            Cell::new(points.len() + segments.len() + 1),
            Cell::new(points.len() + segments.len() + 2),
        ];
        let (_, back) = table.bootstrap(fake_cells);

        let scale = if points.is_empty() {
            S::one()
        } else {
            let mut min = points[0];
            let mut max = points[0];
            for p in points {
                min = Point2::new(min.x.min(p.x), min.y.min(p.y));
                max = Point2::new(max.x.max(p.x), max.y.max(p.y));
            }
            max.sub(min).length().max(S::one())
        };

        let mut diagram = VoronoiDiagram {
            table,
            points: points.to_vec(),
            segments: segments
                .iter()
                .map(|&(a, b)| (a as u32, b as u32))
                .collect(),
            fake_positions,
            fake_node: back,
            neighbours,
            scale,
            separators: Vec::new(),
            branches: Vec::new(),
            node_points: Vec::new(),
            node_radius: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        };
        diagram.sync_sizes();
        diagram.refresh_nodes(&[Node::new(0), back])?;

        let mut order: Vec<usize> = (0..points.len()).collect();
        order.shuffle(&mut diagram.rng);
        for index in order {
            diagram.insert_point(index)?;
        }
        for k in 0..segments.len() {
            diagram.insert_segment(k)?;
        }
        for k in 0..segments.len() {
            diagram.split_segment(k)?;
        }
        for radius in &mut diagram.node_radius {
            *radius = radius.sqrt();
        }
        Ok(diagram)
    }

    // ------------------------------------------------------------------
    // Cell resolution

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.table.num_nodes()
    }

    pub fn num_cells(&self) -> usize {
        self.table.num_cells()
    }

    pub fn point_cell(&self, index: usize) -> Cell {
        debug_assert!(index < self.points.len());
        Cell::new(index)
    }

    /// The cell of a segment's right half (the whole segment before
    /// splitting).
    pub fn segment_cell(&self, k: usize) -> Cell {
        debug_assert!(k < self.segments.len());
        Cell::new(self.points.len() + k)
    }

    /// The cell of a segment's left half; only exists after construction.
    pub fn left_cell(&self, k: usize) -> Cell {
        debug_assert!(k < self.segments.len());
        Cell::new(self.points.len() + self.segments.len() + 3 + k)
    }

    pub fn is_fake_cell(&self, cell: Cell) -> bool {
        let base = self.points.len() + self.segments.len();
        (base..base + 3).contains(&cell.index())
    }

    /// The input point index of a point cell.
    pub fn point_index(&self, cell: Cell) -> Option<usize> {
        (cell.index() < self.points.len()).then(|| cell.index())
    }

    /// For a segment-half cell: the segment index and whether it is the
    /// left half.
    pub fn segment_index(&self, cell: Cell) -> Option<(usize, bool)> {
        let index = cell.index();
        let segments_base = self.points.len();
        let left_base = self.points.len() + self.segments.len() + 3;
        if (segments_base..segments_base + self.segments.len()).contains(&index) {
            Some((index - segments_base, false))
        } else if index >= left_base {
            Some((index - left_base, true))
        } else {
            None
        }
    }

    /// Number of segments incident to an input point. Trajectory endpoints
    /// have exactly one.
    pub fn point_neighbours(&self, index: usize) -> usize {
        self.neighbours[index] as usize
    }

    pub fn point_position(&self, index: usize) -> Point2<S> {
        self.points[index]
    }

    /// The endpoint indices of a segment, in input orientation.
    pub fn segment_point_indices(&self, k: usize) -> (usize, usize) {
        let (a, b) = self.segments[k];
        (a as usize, b as usize)
    }

    fn segment_points(&self, k: usize) -> (Point2<S>, Point2<S>) {
        let (a, b) = self.segments[k];
        (self.points[a as usize], self.points[b as usize])
    }

    /// The site geometry of a cell. Left halves carry the reversed segment
    /// so that the orientation encodes the side.
    pub fn site(&self, cell: Cell) -> Site<S> {
        if let Some(index) = self.point_index(cell) {
            return Site::Point(self.points[index]);
        }
        if self.is_fake_cell(cell) {
            let base = self.points.len() + self.segments.len();
            return Site::Point(self.fake_positions[cell.index() - base]);
        }
        let (k, left) = self.segment_index(cell).expect("cell out of range");
        let (a, b) = self.segment_points(k);
        if left {
            Site::Segment(b, a)
        } else {
            Site::Segment(a, b)
        }
    }

    /// The position of a point-like cell during point insertion.
    fn cell_position(&self, cell: Cell) -> Point2<S> {
        match self.site(cell) {
            Site::Point(p) => p,
            Site::Segment(_, _) => unreachable!("segment cell during point location"),
        }
    }

    // ------------------------------------------------------------------
    // Attribute access

    pub(crate) fn table(&self) -> &CornerTable {
        &self.table
    }

    pub fn node_position(&self, node: Node) -> Point2<S> {
        self.node_points[node.index()]
    }

    pub fn node_radius(&self, node: Node) -> S {
        self.node_radius[node.index()]
    }

    pub fn separator(&self, edge: Edge) -> &Separator<S> {
        &self.separators[edge.index()]
    }

    pub fn branch(&self, edge: Edge) -> Branch {
        self.branches[edge.index()]
    }

    pub(crate) fn fake_node(&self) -> Node {
        self.fake_node
    }

    // ------------------------------------------------------------------
    // Attribute maintenance

    fn sync_sizes(&mut self) {
        let placeholder = Separator::Ray {
            origin: Point2::new(S::nan(), S::nan()),
            tangent: Point2::new(S::nan(), S::nan()),
        };
        self.separators.resize(self.table.num_edges(), placeholder);
        self.branches.resize(self.table.num_edges(), Branch::BAD);
        let nan_point = Point2::new(S::nan(), S::nan());
        self.node_points.resize(self.table.num_nodes(), nan_point);
        self.node_radius.resize(self.table.num_nodes(), S::nan());
    }

    /// The separator of two adjacent cells, named in this order.
    fn site_separator(&self, c1: Cell, c2: Cell) -> Result<Separator<S>, GeometryError> {
        if let (Some((k1, left1)), Some((k2, left2))) =
            (self.segment_index(c1), self.segment_index(c2))
        {
            if k1 == k2 && left1 != left2 {
                // The two halves of one split segment: their separator is
                // the supporting line itself, branchless.
                let (a, b) = self.segment_points(k1);
                let separator = Separator::Parallel {
                    origin: a,
                    tangent: a.sub(b).normalized(),
                    rmin: S::zero(),
                };
                return Ok(if left1 { separator.reverse() } else { separator });
            }
        }
        Separator::new(self.site(c1), self.site(c2))
    }

    /// Recomputes the separators of one edge pair. Branches are owned by
    /// the nodes and set in [Self::node_data].
    fn edge_data(&mut self, edge: Edge) -> Result<(), GeometryError> {
        let separator = self.site_separator(self.table.tail(edge), self.table.head(edge))?;
        let opposite = self.table.opposite(edge);
        self.separators[edge.index()] = separator;
        self.separators[opposite.index()] = separator.reverse();
        Ok(())
    }

    /// Recomputes the tripoint of a node and the branches of its three
    /// edges. The geometric position is evaluated from a straight separator
    /// where one exists, avoiding square-root cancellation on parabolas.
    fn node_data(&mut self, node: Node) -> Result<(), GeometryError> {
        let cells = self.table.node_cells(node);
        let halves: SmallVec<[(usize, bool); 3]> = cells
            .iter()
            .filter_map(|&c| self.segment_index(c))
            .collect();
        let split_pair = halves
            .iter()
            .enumerate()
            .any(|(i, h1)| halves[i + 1..].iter().any(|h2| h1.0 == h2.0 && h1.1 != h2.1));
        if split_pair {
            // A node wedged between the two halves of one segment sits on
            // the segment itself; set in split_segment, nothing to update.
            return Ok(());
        }

        let sites = [self.site(cells[0]), self.site(cells[1]), self.site(cells[2])];
        let result = tripoint(sites)?;
        // Kept squared during construction; square-rooted once at the end.
        self.node_radius[node.index()] = result.r * result.r;
        for i in 0..3 {
            self.branches[node.side(i).index()] = result.branches[i];
        }
        if result.is_none() {
            self.node_points[node.index()] = Point2::new(S::nan(), S::nan());
            return Ok(());
        }

        let straight = |separator: &Separator<S>| {
            matches!(
                separator,
                Separator::Line { .. } | Separator::Ray { .. } | Separator::HalfLines { .. }
            )
        };
        let mut position = None;
        for i in 0..3 {
            let separator = &self.separators[node.side(i).index()];
            if straight(separator) && !result.branches[i].is_bad() {
                position = Some(separator.evaluate(result.branches[i], result.r));
                break;
            }
        }
        let position = position.unwrap_or_else(|| {
            self.separators[node.side(0).index()].evaluate(result.branches[0], result.r)
        });

        #[cfg(debug_assertions)]
        {
            let tolerance = self.scale * 1.0e-9f32.into();
            for i in 0..3 {
                let separator = &self.separators[node.side(i).index()];
                if separator.is_parallel() || result.branches[i].is_bad() {
                    continue;
                }
                let check = separator.evaluate(result.branches[i], result.r);
                debug_assert!(
                    check.sub(position).length() <= tolerance,
                    "separators disagree at {:?}: {:?} vs {:?}",
                    node,
                    check,
                    position
                );
            }
        }

        self.node_points[node.index()] = position;
        Ok(())
    }

    /// Refreshes all geometric data attached to the given nodes after a
    /// topological change.
    fn refresh_nodes(&mut self, nodes: &[Node]) -> Result<(), GeometryError> {
        self.sync_sizes();
        for &node in nodes {
            for edge in node.edges() {
                self.edge_data(edge)?;
            }
        }
        for &node in nodes {
            self.node_data(node)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Point insertion (Bowyer-Watson)

    /// Walks the triangulation towards `position`, starting at a random
    /// node.
    fn find_node(&mut self, position: Point2<S>) -> Node {
        let mut node = loop {
            let candidate = Node::new(self.rng.gen_range(0..self.table.num_nodes()));
            if candidate != self.fake_node {
                break candidate;
            }
        };
        'walk: for _ in 0..LOCATE_ITERATION_CAP {
            for edge in node.edges() {
                let tail = self.cell_position(self.table.tail(edge));
                let head = self.cell_position(self.table.head(edge));
                if math::isleft(head, tail, position) {
                    node = self.table.opposite(edge).node();
                    debug_assert!(node != self.fake_node, "walked out of the far triangle");
                    continue 'walk;
                }
            }
            return node;
        }
        panic!("point location did not terminate; degenerate input");
    }

    fn insert_point(&mut self, index: usize) -> Result<(), GeometryError> {
        let position = self.points[index];
        let cell = self.point_cell(index);
        let node = self.find_node(position);
        let exposed = self.table.split_node(node, cell);
        self.refresh_nodes(&[
            exposed[0].node(),
            exposed[1].node(),
            exposed[2].node(),
        ])?;

        let mut stack: SmallVec<[Edge; 8]> = SmallVec::from_slice(&exposed);
        while let Some(edge) = stack.pop() {
            let opposite = self.table.opposite(edge);
            if opposite.node() == self.fake_node {
                continue;
            }
            let tail = self.cell_position(self.table.tail(edge));
            let head = self.cell_position(self.table.head(edge));
            let apex = self.cell_position(self.table.apex(edge));
            let candidate = self.cell_position(self.table.apex(opposite));
            if math::incircle(tail, head, apex, candidate) {
                let [facing1, facing2] = self.table.flip(edge);
                self.refresh_nodes(&[facing1.node(), facing2.node()])?;
                stack.push(facing1);
                stack.push(facing2);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Segment insertion

    /// Finds the node of `a`'s star to splay for segment `(a, b)`: among
    /// the nodes whose vertex projects into the open segment, the one
    /// closest to it.
    fn find_root_node(&self, a: Cell, seg: (Point2<S>, Point2<S>)) -> Node {
        let mut best: Option<(S, Node)> = None;
        let mut fallback: Option<(S, Node)> = None;
        for edge in self.table.star(a) {
            let node = edge.node();
            let vertex = self.node_points[node.index()];
            if !vertex.x.is_finite() {
                continue;
            }
            let distance = math::segdistance2(seg.0, seg.1, vertex);
            if fallback.map_or(true, |(d, _)| distance < d) {
                fallback = Some((distance, node));
            }
            let t = math::project_relative(seg.0, seg.1, vertex);
            if t > S::zero() && t < S::one() && best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, node));
            }
        }
        best.or(fallback).expect("no usable root node in star").1
    }

    fn insert_segment(&mut self, k: usize) -> Result<(), GeometryError> {
        let cell = self.segment_cell(k);
        let seg = self.segment_points(k);
        let (a, _) = self.segments[k];
        let root = self.find_root_node(Cell::new(a as usize), seg);

        let exposed = self.table.split_node(root, cell);
        self.refresh_nodes(&[
            exposed[0].node(),
            exposed[1].node(),
            exposed[2].node(),
        ])?;

        let mut stack: SmallVec<[Edge; 8]> = SmallVec::from_slice(&exposed);
        while let Some(edge) = stack.pop() {
            let opposite = self.table.opposite(edge);
            let neighbor = opposite.node();
            if neighbor == self.fake_node {
                continue;
            }
            let vertex = self.node_points[neighbor.index()];
            let radius2 = self.node_radius[neighbor.index()];
            if !vertex.x.is_finite() || !radius2.is_finite() {
                continue;
            }
            // The neighbor's vertex falls into the growing region of the
            // new site: its circle around the vertex already contains a
            // piece of the segment.
            if math::segdistance2(seg.0, seg.1, vertex) < radius2 {
                let [facing1, facing2] = self.table.flip(edge);
                self.refresh_nodes(&[facing1.node(), facing2.node()])?;
                stack.push(facing1);
                stack.push(facing2);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Segment splitting

    /// Replaces segment `k`'s cell by a right-side and a left-side cell,
    /// inserting the two zero-radius nodes at its endpoints.
    fn split_segment(&mut self, k: usize) -> Result<(), GeometryError> {
        let cell = self.segment_cell(k);
        let (a_index, b_index) = self.segments[k];
        let a_cell = Cell::new(a_index as usize);
        let b_cell = Cell::new(b_index as usize);
        let (pa, pb) = self.segment_points(k);

        let ring: Vec<Edge> = self.table.star(cell).collect();
        let position_of = |target: Cell| {
            ring.iter()
                .position(|&e| self.table.head(e) == target)
                .expect("segment cell not adjacent to its endpoint")
        };
        let at_a = position_of(a_cell);
        let at_b = position_of(b_cell);
        let e_a = ring[at_a];
        let e_b = ring[at_b];

        // Counterclockwise from the a-edge the ring passes the right-side
        // neighbors, reaches the b-edge and returns through the left side.
        let mut left_edges: Vec<Edge> = Vec::new();
        let mut i = (at_b + 1) % ring.len();
        while i != at_a {
            left_edges.push(ring[i]);
            i = (i + 1) % ring.len();
        }

        let left = self.table.add_cell();
        debug_assert_eq!(left, self.left_cell(k));
        for &edge in &left_edges {
            self.table.set_tail(edge, left);
        }
        self.table.set_tail(e_b, left);
        self.table.set_anyedge(cell, e_a);

        let o_a = self.table.opposite(e_a);
        let o_b = self.table.opposite(e_b);

        // q1 = (a, right, left) at the a endpoint, q2 = (b, left, right)
        // at the b endpoint; the pair q1.1/q2.1 spans the segment interior.
        let q1 = self.table.new_nodes(2);
        let q2 = Node::new(q1.index() + 1);
        self.table.set_tail(q1.side(0), a_cell);
        self.table.set_tail(q1.side(1), cell);
        self.table.set_tail(q1.side(2), left);
        self.table.set_tail(q2.side(0), b_cell);
        self.table.set_tail(q2.side(1), left);
        self.table.set_tail(q2.side(2), cell);

        self.table.set_opposite_pair(q1.side(0), e_a);
        self.table.set_opposite_pair(q1.side(2), o_a);
        self.table.set_opposite_pair(q1.side(1), q2.side(1));
        self.table.set_opposite_pair(q2.side(0), e_b);
        self.table.set_opposite_pair(q2.side(2), o_b);

        self.sync_sizes();
        for node in [q1, q2] {
            for edge in node.edges() {
                self.edge_data(edge)?;
            }
        }

        // Both new nodes sit on the segment itself at radius zero; every
        // incident separator passes through its perigee there.
        self.node_points[q1.index()] = pa;
        self.node_points[q2.index()] = pb;
        self.node_radius[q1.index()] = S::zero();
        self.node_radius[q2.index()] = S::zero();
        for node in [q1, q2] {
            for edge in node.edges() {
                self.branches[edge.index()] = Branch::ZERO;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation

    /// Checks the structural and geometric invariants of the finished
    /// diagram. Intended for tests.
    pub fn check_consistency(&self) {
        self.table.validate();
        let tolerance = self.scale * 1.0e-7f32.into();
        for index in 0..self.table.num_edges() {
            let edge = Edge::new(index);
            let opposite = self.table.opposite(edge);
            // Separator symmetry.
            let reversed = self.separators[opposite.index()].reverse();
            let forward = &self.separators[index];
            assert_eq!(
                std::mem::discriminant(forward),
                std::mem::discriminant(&reversed),
                "separator variants disagree across {:?}",
                edge
            );
        }
        for index in 0..self.table.num_nodes() {
            let node = Node::new(index);
            let position = self.node_points[index];
            let radius = self.node_radius[index];
            if !position.x.is_finite() {
                continue;
            }
            for i in 0..3 {
                let edge = node.side(i);
                let branch = self.branches[edge.index()];
                let separator = &self.separators[edge.index()];
                if branch.is_bad() || separator.is_parallel() {
                    continue;
                }
                let evaluated = separator.evaluate(branch, radius);
                assert!(
                    evaluated.sub(position).length() <= tolerance,
                    "tripoint inconsistency at {:?}: {:?} vs {:?}",
                    node,
                    evaluated,
                    position
                );
            }
        }
    }
}
