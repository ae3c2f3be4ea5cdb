use std::collections::HashMap;

use crate::offset::{Crossing, CrossingId, OffsetDiagram};
use crate::voronoi_core::handles::{Branch, Edge};
use crate::{GeometryError, OffsetNum, Point2};

/// An indexed triangle mesh produced by [extrude].
#[derive(Debug, Clone, Default)]
pub struct Mesh<S> {
    pub vertices: Vec<[S; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

/// One offset ring used as a horizontal section of the swept surface: the
/// rendered polyline, the polyline index of every crossing, the crossing
/// geometry, and the canonical crossing identities for matching rings of
/// different radii.
#[derive(Clone)]
struct Ring<S> {
    pts: Vec<Point2<S>>,
    marks: Vec<usize>,
    crossings: Vec<(Edge, Branch)>,
    ids: Vec<CrossingId>,
}

/// Welds vertices by exact position; every shared vertex of the swept
/// surface is produced by the very same evaluation and therefore bit-equal.
struct MeshBuilder<S> {
    mesh: Mesh<S>,
    index: HashMap<[u64; 3], u32>,
}

impl<S: OffsetNum> MeshBuilder<S> {
    fn new() -> Self {
        MeshBuilder {
            mesh: Mesh::default(),
            index: HashMap::new(),
        }
    }

    fn vertex(&mut self, position: [S; 3]) -> u32 {
        let key = [
            Into::<f64>::into(position[0]).to_bits(),
            Into::<f64>::into(position[1]).to_bits(),
            Into::<f64>::into(position[2]).to_bits(),
        ];
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let index = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(position);
        self.index.insert(key, index);
        index
    }

    fn fan(&mut self, polygon: &[u32], flip: bool) {
        for i in 1..polygon.len().saturating_sub(1) {
            let triangle = if flip {
                [polygon[0], polygon[i + 1], polygon[i]]
            } else {
                [polygon[0], polygon[i], polygon[i + 1]]
            };
            if triangle[0] != triangle[1] && triangle[1] != triangle[2] && triangle[0] != triangle[2]
            {
                self.mesh.triangles.push(triangle);
            }
        }
    }
}

/// Sweeps a closed profile along a trajectory.
///
/// The trajectory is a polyline in the plane, treated as closed when its
/// first and last points coincide; for runs of several segments the
/// segments must follow head to tail. The profile is a closed loop of
/// `(r, z)` pairs where `r` is the signed offset radius (positive to the
/// right of the oriented trajectory) and `z` the height along the sweep
/// axis. Profile edges crossing `r = 0` are split there and negative parts
/// mirrored, so each resulting edge lies in one half-plane.
///
/// Faces between equal radii are cylindrical rings; faces between different
/// radii are built cell by cell from the inner offset ring, transverse
/// slices sampled along the crossed separators, and the outer ring. The
/// sampling tolerance is `atol`. Returns one mesh per profile loop.
pub fn extrude<S: OffsetNum>(
    trajectory: &[Point2<S>],
    profile: &[Point2<S>],
    atol: S,
) -> Result<Vec<Mesh<S>>, GeometryError> {
    if trajectory.len() < 2 || profile.len() < 3 {
        return Err(GeometryError::BadCoordinate);
    }

    let closed = trajectory.first() == trajectory.last();
    let points: Vec<Point2<S>> = if closed {
        trajectory[..trajectory.len() - 1].to_vec()
    } else {
        trajectory.to_vec()
    };
    let mut segments: Vec<(usize, usize)> = (0..points.len() - 1).map(|i| (i, i + 1)).collect();
    if closed {
        segments.push((points.len() - 1, 0));
    }

    // Split profile edges at r = 0.
    let mut vertices: Vec<Point2<S>> = Vec::new();
    for i in 0..profile.len() {
        let p = profile[i];
        let q = profile[(i + 1) % profile.len()];
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(GeometryError::BadCoordinate);
        }
        vertices.push(p);
        if (p.x > S::zero() && q.x < S::zero()) || (p.x < S::zero() && q.x > S::zero()) {
            let t = p.x / (p.x - q.x);
            vertices.push(Point2::new(S::zero(), p.y + (q.y - p.y) * t));
        }
    }

    let mut extra = S::zero();
    for v in &vertices {
        extra = extra.max(v.x.abs());
    }
    let diagram = OffsetDiagram::new(&points, &segments, extra)?;
    let mut sections = SectionCache::new(&diagram, atol);

    let mut builder = MeshBuilder::new();
    let count = vertices.len();
    for edge_index in 0..count {
        let p = vertices[edge_index];
        let q = vertices[(edge_index + 1) % count];
        if p.x == S::zero() && q.x == S::zero() {
            continue;
        }
        let negative = (p.x + q.x).is_sign_negative();

        if p.x.abs() == q.x.abs() {
            ring_band(&mut builder, &mut sections, p, q, negative);
        } else {
            sloped_band(&mut builder, &mut sections, &diagram, p, q, negative, atol);
        }
    }

    Ok(vec![builder.mesh])
}

/// A cylindrical band between two profile vertices of equal radius: the
/// rings are identical polylines at two heights, connected point by point.
fn ring_band<S: OffsetNum>(
    builder: &mut MeshBuilder<S>,
    sections: &mut SectionCache<'_, S>,
    p: Point2<S>,
    q: Point2<S>,
    negative: bool,
) {
    let rings = sections.rings(p.x.abs(), negative).to_vec();
    for ring in &rings {
        let n = ring.pts.len();
        for point in 0..n {
            let next = (point + 1) % n;
            let a0 = builder.vertex([ring.pts[point].x, ring.pts[point].y, p.y]);
            let a1 = builder.vertex([ring.pts[next].x, ring.pts[next].y, p.y]);
            let b1 = builder.vertex([ring.pts[next].x, ring.pts[next].y, q.y]);
            let b0 = builder.vertex([ring.pts[point].x, ring.pts[point].y, q.y]);
            builder.fan(&[a0, a1, b1, b0], negative);
        }
    }
}

/// A band between two profile vertices of different radii: for every run of
/// the inner ring between crossings shared with the outer ring, the face is
/// the inner arc, a transverse separator slice up to the outer radius, the
/// outer arc reversed, and a slice back down.
fn sloped_band<S: OffsetNum>(
    builder: &mut MeshBuilder<S>,
    sections: &mut SectionCache<'_, S>,
    diagram: &OffsetDiagram<S>,
    p: Point2<S>,
    q: Point2<S>,
    negative: bool,
    atol: S,
) {
    let reversed = p.x.abs() > q.x.abs();
    let (plo, phi) = if reversed { (q, p) } else { (p, q) };
    let r1 = plo.x.abs();
    let r2 = phi.x.abs();
    let z_of = |r: S| plo.y + (phi.y - plo.y) * (r - r1) / (r2 - r1);

    let inner_rings = sections.rings(r1, negative).to_vec();
    let outer_rings = sections.rings(r2, negative).to_vec();

    // Canonical crossing id -> (outer ring, crossing index).
    let mut outer_index: HashMap<CrossingId, (usize, usize)> = HashMap::new();
    for (k, ring) in outer_rings.iter().enumerate() {
        for (c, &id) in ring.ids.iter().enumerate() {
            outer_index.insert(id, (k, c));
        }
    }

    let flip = reversed != negative;
    for inner in &inner_rings {
        let matched: Vec<(usize, usize, usize)> = inner
            .ids
            .iter()
            .enumerate()
            .filter_map(|(c, id)| outer_index.get(id).map(|&(k, oc)| (c, k, oc)))
            .collect();
        if matched.is_empty() {
            continue;
        }

        for pair in 0..matched.len() {
            let (ia, ka, oa) = matched[pair];
            let (ib, kb, ob) = matched[(pair + 1) % matched.len()];
            if ka != kb {
                continue;
            }
            let outer = &outer_rings[ka];

            let mut polygon: Vec<u32> = Vec::new();
            for point in cyclic_run(inner.marks[ia], inner.marks[ib], inner.pts.len()) {
                polygon.push(builder.vertex([inner.pts[point].x, inner.pts[point].y, plo.y]));
            }
            // Up the separator at the closing crossing.
            push_slice(
                builder,
                diagram,
                inner.crossings[ib],
                (r1, r2),
                &z_of,
                atol,
                false,
                &mut polygon,
            );
            for point in cyclic_run(outer.marks[oa], outer.marks[ob], outer.pts.len())
                .into_iter()
                .rev()
            {
                polygon.push(builder.vertex([outer.pts[point].x, outer.pts[point].y, phi.y]));
            }
            // Back down at the opening crossing.
            push_slice(
                builder,
                diagram,
                inner.crossings[ia],
                (r1, r2),
                &z_of,
                atol,
                true,
                &mut polygon,
            );
            builder.fan(&polygon, flip);
        }
    }
}

/// Appends the interior samples of a transverse separator slice between the
/// two radii.
fn push_slice<S: OffsetNum>(
    builder: &mut MeshBuilder<S>,
    diagram: &OffsetDiagram<S>,
    (edge, branch): (Edge, Branch),
    (r1, r2): (S, S),
    z_of: &impl Fn(S) -> S,
    atol: S,
    downward: bool,
    polygon: &mut Vec<u32>,
) {
    let separator = diagram.diagram().separator(edge);
    let mut values = separator.approximate(r1, r2, atol);
    // The slice endpoints are ring vertices already.
    values.pop();
    if !values.is_empty() {
        values.remove(0);
    }
    if downward {
        values.reverse();
    }
    for r in values {
        let planar = separator.evaluate(branch, r);
        polygon.push(builder.vertex([planar.x, planar.y, z_of(r)]));
    }
}

/// Inclusive index walk from `from` to `to` modulo `len`; `from == to`
/// yields the full cycle with the shared endpoint on both ends.
fn cyclic_run(from: usize, to: usize, len: usize) -> Vec<usize> {
    let mut out = vec![from];
    let mut i = from;
    loop {
        i = (i + 1) % len;
        out.push(i);
        if i == to {
            return out;
        }
    }
}

/// Cache of offset rings per (radius, side).
struct SectionCache<'a, S> {
    diagram: &'a OffsetDiagram<S>,
    atol: S,
    cache: HashMap<(u64, bool), Vec<Ring<S>>>,
}

impl<'a, S: OffsetNum> SectionCache<'a, S> {
    fn new(diagram: &'a OffsetDiagram<S>, atol: S) -> Self {
        SectionCache {
            diagram,
            atol,
            cache: HashMap::new(),
        }
    }

    fn rings(&mut self, magnitude: S, negative: bool) -> &[Ring<S>] {
        let key = (Into::<f64>::into(magnitude).to_bits(), negative);
        if !self.cache.contains_key(&key) {
            let rings = if magnitude == S::zero() {
                self.zero_rings(negative)
            } else {
                self.offset_rings(magnitude, negative)
            };
            self.cache.insert(key, rings);
        }
        &self.cache[&key]
    }

    fn offset_rings(&self, magnitude: S, negative: bool) -> Vec<Ring<S>> {
        let mut rings = Vec::new();
        for chain in self.diagram.chains(magnitude) {
            let keep = if negative {
                chain.has_left
            } else {
                chain.has_right || !chain.has_left
            };
            if !keep || !chain.closed {
                continue;
            }
            let (pts, marks) = self.diagram.render_marked(&chain, magnitude, self.atol);
            rings.push(Ring {
                pts,
                marks,
                crossings: chain.crossings.iter().map(|c| (c.edge, c.branch)).collect(),
                ids: chain
                    .crossings
                    .iter()
                    .map(|c| self.diagram.chain_crossing_id(c))
                    .collect(),
            });
        }
        rings
    }

    /// The degenerate ring at radius zero: the trajectory itself, with
    /// limit crossings on the endpoint separators of each segment half.
    /// Open runs double back along their left side, closing the ring.
    fn zero_rings(&self, negative: bool) -> Vec<Ring<S>> {
        let diagram = self.diagram.diagram();
        let mut rings = Vec::new();

        let mut seen = vec![false; diagram.num_segments()];
        for k0 in 0..diagram.num_segments() {
            if seen[k0] {
                continue;
            }
            // The maximal head-to-tail run through k0.
            let mut run = vec![k0];
            seen[k0] = true;
            let mut run_closed = false;
            loop {
                let (_, tail) = diagram.segment_point_indices(*run.last().unwrap());
                let next = (0..diagram.num_segments())
                    .find(|&s| !seen[s] && diagram.segment_point_indices(s).0 == tail);
                match next {
                    Some(s) => {
                        seen[s] = true;
                        run.push(s);
                    }
                    None => {
                        run_closed = diagram.segment_point_indices(*run.last().unwrap()).1
                            == diagram.segment_point_indices(run[0]).0;
                        break;
                    }
                }
            }
            loop {
                let (head, _) = diagram.segment_point_indices(run[0]);
                let previous = (0..diagram.num_segments())
                    .find(|&s| !seen[s] && diagram.segment_point_indices(s).1 == head);
                match previous {
                    Some(s) => {
                        seen[s] = true;
                        run.insert(0, s);
                    }
                    None => break,
                }
            }

            let mut ring = Ring {
                pts: Vec::new(),
                marks: Vec::new(),
                crossings: Vec::new(),
                ids: Vec::new(),
            };
            if run_closed && !negative {
                for &k in &run {
                    self.push_zero_side(&mut ring, k, false);
                }
            } else if run_closed {
                for &k in run.iter().rev() {
                    self.push_zero_side(&mut ring, k, true);
                }
            } else {
                // Open: out on the right, back on the left, for either sign.
                for &k in &run {
                    self.push_zero_side(&mut ring, k, false);
                }
                for &k in run.iter().rev() {
                    self.push_zero_side(&mut ring, k, true);
                }
            }
            rings.push(ring);
        }
        rings
    }

    /// Appends the two limit crossings of segment `k`'s right (or left)
    /// half: the half's endpoint separators, met at the first tuple
    /// endpoint on the plus branch and at the second on the minus branch.
    fn push_zero_side(&self, ring: &mut Ring<S>, k: usize, left: bool) {
        let diagram = self.diagram.diagram();
        let (a, b) = diagram.segment_point_indices(k);
        let (half, first, second) = if left {
            (diagram.left_cell(k), b, a)
        } else {
            (diagram.segment_cell(k), a, b)
        };
        for (endpoint, branch) in [(first, Branch::PLUS), (second, Branch::MINUS)] {
            let edge = self
                .diagram
                .edge_between(half, diagram.point_cell(endpoint))
                .expect("segment half not adjacent to its endpoint");
            let point = diagram.point_position(endpoint);
            ring.marks.push(ring.pts.len());
            ring.pts.push(point);
            ring.crossings.push((edge, branch));
            ring.ids.push(self.diagram.chain_crossing_id(&Crossing {
                edge,
                branch,
                point,
            }));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn edge_use_counts(mesh: &Mesh<f64>) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::new();
        for t in &mesh.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = (a.min(b), a.max(b));
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    fn triangle_area(mesh: &Mesh<f64>, t: [u32; 3]) -> f64 {
        let v = |i: u32| mesh.vertices[i as usize];
        let [a, b, c] = [v(t[0]), v(t[1]), v(t[2])];
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let w = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let cross = [
            u[1] * w[2] - u[2] * w[1],
            u[2] * w[0] - u[0] * w[2],
            u[0] * w[1] - u[1] * w[0],
        ];
        (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt() / 2.0
    }

    fn surface_area(mesh: &Mesh<f64>) -> f64 {
        mesh.triangles
            .iter()
            .map(|&t| triangle_area(mesh, t))
            .sum()
    }

    #[test]
    fn test_annular_profile_around_segment() {
        // A rectangular profile away from the axis swept along one segment:
        // a closed stadium torus.
        let trajectory = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let profile = [
            Point2::new(1.0, -1.0),
            Point2::new(2.0, -1.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
        ];
        let meshes = extrude(&trajectory, &profile, 1.0e-2).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert!(!mesh.triangles.is_empty());

        // Watertight: every undirected edge is shared by exactly two
        // triangles.
        for (edge, count) in edge_use_counts(mesh) {
            assert_eq!(count, 2, "edge {:?} used {} times", edge, count);
        }

        // The two cylindrical bands alone already dominate the area:
        // perimeter of the stadium at r times the profile height.
        let p1 = 2.0 * 10.0 + std::f64::consts::TAU * 1.0;
        let p2 = 2.0 * 10.0 + std::f64::consts::TAU * 2.0;
        let rings = 2.0 * (p1 + p2);
        let area = surface_area(mesh);
        assert!(area > rings * 0.98, "area {} vs rings {}", area, rings);
    }

    #[test]
    fn test_square_trajectory_ring_profile() {
        let trajectory = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(0.0, 0.0),
        ];
        let profile = [
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.5),
            Point2::new(0.5, 1.0),
        ];
        let meshes = extrude(&trajectory, &profile, 1.0e-2).unwrap();
        let mesh = &meshes[0];
        assert!(!mesh.triangles.is_empty());
        for (edge, count) in edge_use_counts(mesh) {
            assert_eq!(count, 2, "edge {:?} used {} times", edge, count);
        }
    }

    #[test]
    fn test_l_trajectory_diamond_profile() {
        // An L-shaped open trajectory with a diamond profile crossing the
        // axis, as in the classical sweep scenario.
        let trajectory: [Point2<f64>; 3] = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let profile = [
            Point2::new(-0.5, -1.0),
            Point2::new(1.0, -0.5),
            Point2::new(0.5, 1.0),
            Point2::new(-1.0, 0.5),
        ];
        let meshes = extrude(&trajectory, &profile, 1.0e-2).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert!(mesh.vertices.len() > 16);
        assert!(!mesh.triangles.is_empty());

        // Every vertex stays within the largest profile radius of the
        // trajectory.
        for v in &mesh.vertices {
            let q = Point2::new(v[0], v[1]);
            let mut best = f64::INFINITY;
            for w in trajectory.windows(2) {
                best = best.min(
                    crate::voronoi_core::math::segdistance2(w[0], w[1], q).sqrt(),
                );
            }
            assert!(best <= 1.0 + 1.0e-6, "vertex {:?} too far: {}", v, best);
        }
    }

    #[test]
    fn test_degenerate_input_rejected() {
        let trajectory = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let profile = [Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert_eq!(
            extrude(&trajectory, &profile, 1.0e-2).err(),
            Some(GeometryError::BadCoordinate)
        );
    }
}
