use smallvec::SmallVec;

use crate::voronoi_core::handles::Branch;
use crate::voronoi_core::math;
use crate::voronoi_core::separator::{Separator, Site};
use crate::{GeometryError, OffsetNum, Point2};

/// The equidistant point of three cyclically ordered sites.
///
/// `r` is the common distance, `branches[i]` the branch of the separator
/// between site `i` and site `i + 1` carrying the point. When no tripoint
/// with the requested orientation exists, `r` is NaN and all branches are
/// [Branch::BAD].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tripoint<S> {
    pub r: S,
    pub branches: [Branch; 3],
}

impl<S: OffsetNum> Tripoint<S> {
    pub(crate) fn none() -> Self {
        Tripoint {
            r: S::nan(),
            branches: [Branch::BAD; 3],
        }
    }

    /// Whether this is the no-tripoint sentinel.
    pub fn is_none(&self) -> bool {
        self.r.is_nan()
    }
}

/// Computes the tripoint of three cyclically ordered sites.
///
/// The result is invariant under rotation of the input triple; reversing the
/// triple asks for the oppositely oriented vertex, which is generally a
/// different point (or does not exist).
pub fn tripoint<S: OffsetNum>(sites: [Site<S>; 3]) -> Result<Tripoint<S>, GeometryError> {
    let is_segment = |site: &Site<S>| matches!(site, Site::Segment(_, _));
    let segments = sites.iter().filter(|s| is_segment(s)).count();

    // Rotate the triple so that segment sites come first; the branch array
    // is rotated back below.
    let rotation = match segments {
        0 | 3 => 0,
        1 => (0..3).find(|&k| is_segment(&sites[k])).unwrap(),
        _ => (0..3).find(|&k| !is_segment(&sites[(k + 2) % 3])).unwrap(),
    };
    let rotated = [
        sites[rotation],
        sites[(rotation + 1) % 3],
        sites[(rotation + 2) % 3],
    ];

    let result = match rotated {
        [Site::Point(a), Site::Point(b), Site::Point(c)] => tripoint_ppp(a, b, c),
        [Site::Segment(a, b), Site::Point(p), Site::Point(q)] => tripoint_lpp((a, b), p, q),
        [Site::Segment(a, b), Site::Segment(c, d), Site::Point(p)] => {
            tripoint_llp((a, b), (c, d), p)
        }
        [Site::Segment(a, b), Site::Segment(c, d), Site::Segment(e, f)] => {
            tripoint_lll((a, b), (c, d), (e, f))
        }
        _ => unreachable!("rotation sorts segments to the front"),
    }?;

    let mut branches = [Branch::BAD; 3];
    for (i, &branch) in result.branches.iter().enumerate() {
        branches[(i + rotation) % 3] = branch;
    }
    Ok(Tripoint {
        r: result.r,
        branches,
    })
}

/// Nearest point of the site's carrier (the point itself, or the unclamped
/// foot on a segment's supporting line).
fn contact<S: OffsetNum>(site: Site<S>, q: Point2<S>) -> Point2<S> {
    match site {
        Site::Point(p) => p,
        Site::Segment(a, b) => {
            let t = math::project_relative(a, b, q);
            a.add(b.sub(a).mul(t))
        }
    }
}

/// Whether `u2` lies strictly inside the counterclockwise sector from `u1`
/// to `u3`.
fn ccw_cyclic<S: OffsetNum>(u1: Point2<S>, u2: Point2<S>, u3: Point2<S>) -> bool {
    if math::det2(u1, u3) > S::zero() {
        math::det2(u1, u2) > S::zero() && math::det2(u2, u3) > S::zero()
    } else {
        math::det2(u1, u2) > S::zero() || math::det2(u2, u3) > S::zero()
    }
}

/// Checks that the three sites appear in counterclockwise order as seen from
/// the candidate vertex `q`. Degenerate zero-distance contacts cannot be
/// ordered and are accepted.
fn contacts_ccw<S: OffsetNum>(sites: &[Site<S>; 3], q: Point2<S>) -> bool {
    let u1 = contact(sites[0], q).sub(q);
    let u2 = contact(sites[1], q).sub(q);
    let u3 = contact(sites[2], q).sub(q);
    let zero = |u: Point2<S>| u.length2() == S::zero();
    if zero(u1) || zero(u2) || zero(u3) {
        return true;
    }
    ccw_cyclic(u1, u2, u3)
}

/// Branches of the three cyclic separators at `q`, or `None` when any of
/// them does not carry `q`.
fn branches_at<S: OffsetNum>(
    sites: &[Site<S>; 3],
    q: Point2<S>,
) -> Result<Option<[Branch; 3]>, GeometryError> {
    let mut branches = [Branch::BAD; 3];
    for i in 0..3 {
        let separator = Separator::new(sites[i], sites[(i + 1) % 3])?;
        branches[i] = separator.whichbranch(q);
        if branches[i].is_bad() {
            return Ok(None);
        }
    }
    Ok(Some(branches))
}

fn validated<S: OffsetNum>(
    sites: &[Site<S>; 3],
    q: Point2<S>,
    r: S,
) -> Result<Option<Tripoint<S>>, GeometryError> {
    if !r.is_finite() || r < S::zero() || !contacts_ccw(sites, q) {
        return Ok(None);
    }
    Ok(match branches_at(sites, q)? {
        Some(branches) => Some(Tripoint { r, branches }),
        None => None,
    })
}

/// Three point sites: the circumcenter, requiring positive orientation.
fn tripoint_ppp<S: OffsetNum>(
    a: Point2<S>,
    b: Point2<S>,
    c: Point2<S>,
) -> Result<Tripoint<S>, GeometryError> {
    if !math::isleft(a, b, c) {
        return Ok(Tripoint::none());
    }
    let (center, r2) = math::circumcenter([a, b, c]);
    let sites = [Site::Point(a), Site::Point(b), Site::Point(c)];
    Ok(validated(&sites, center, r2.sqrt())?.unwrap_or_else(Tripoint::none))
}

/// One segment and two points, reduced to a frame where the segment lies on
/// the x axis with the points above it.
fn tripoint_lpp<S: OffsetNum>(
    seg: (Point2<S>, Point2<S>),
    p2: Point2<S>,
    p3: Point2<S>,
) -> Result<Tripoint<S>, GeometryError> {
    let (a, b) = seg;
    let sites = [Site::Segment(a, b), Site::Point(p2), Site::Point(p3)];
    let on_line = |p: Point2<S>| !math::isleft(a, b, p) && !math::isleft(b, a, p);
    let legal_on_line = |p: Point2<S>| {
        if p == a || p == b {
            Ok(())
        } else {
            Err(GeometryError::PointInSegment)
        }
    };

    let mut direction = b.sub(a).normalized();
    let mut normal = direction.perp();
    // Flip the frame so that the points lie above the supporting line.
    if p2.sub(a).dot(normal) + p3.sub(a).dot(normal) < S::zero() {
        direction = direction.mul(-S::one());
        normal = normal.mul(-S::one());
    }
    let frame = |p: Point2<S>| Point2::new(p.sub(a).dot(direction), p.sub(a).dot(normal));
    let unframe = |p: Point2<S>| a.add(direction.mul(p.x)).add(normal.mul(p.y));

    let f2 = frame(p2);
    let f3 = frame(p3);
    let two: S = 2.0f32.into();

    match (on_line(p2), on_line(p3)) {
        (true, true) => {
            legal_on_line(p2)?;
            legal_on_line(p3)?;
            // Two endpoint rays are parallel: no finite tripoint.
            Ok(Tripoint::none())
        }
        (true, false) => {
            legal_on_line(p2)?;
            if f3.y <= S::zero() {
                return Ok(Tripoint::none());
            }
            let dx = f3.x - f2.x;
            let r = (dx * dx + f3.y * f3.y) / (two * f3.y);
            let q = unframe(Point2::new(f2.x, r));
            Ok(validated(&sites, q, r)?.unwrap_or_else(Tripoint::none))
        }
        (false, true) => {
            legal_on_line(p3)?;
            if f2.y <= S::zero() {
                return Ok(Tripoint::none());
            }
            let dx = f2.x - f3.x;
            let r = (dx * dx + f2.y * f2.y) / (two * f2.y);
            let q = unframe(Point2::new(f3.x, r));
            Ok(validated(&sites, q, r)?.unwrap_or_else(Tripoint::none))
        }
        (false, false) => {
            if f2.y * f3.y < S::zero() {
                // The points straddle the supporting line.
                return Ok(Tripoint::none());
            }
            // Intersect the bisector of p2, p3 with the parabola around p2:
            // parametrizing the bisector as m + s·perp(p3 - p2) gives
            //   s²·dy² - 2·my·dx·s + (t/4 - my²) = 0,  t = dx² + dy².
            let dx = f3.x - f2.x;
            let dy = f3.y - f2.y;
            let mx = (f2.x + f3.x) / two;
            let my = (f2.y + f3.y) / two;
            let t = dx * dx + dy * dy;
            let four: S = 4.0f32.into();
            let roots =
                math::quadratic_roots(dy * dy, -two * my * dx, t / four - my * my);
            let (s1, s2) = match roots {
                Some(roots) => roots,
                None => return Ok(Tripoint::none()),
            };
            for s in [s1, s2] {
                let q_frame = Point2::new(mx - s * dy, my + s * dx);
                let r = q_frame.y;
                if let Some(result) = validated(&sites, unframe(q_frame), r)? {
                    return Ok(result);
                }
            }
            Ok(Tripoint::none())
        }
    }
}

/// Two segments and a point: the tripoint lies on a branch of the
/// segment/segment separator at equal distance from the point.
fn tripoint_llp<S: OffsetNum>(
    seg1: (Point2<S>, Point2<S>),
    seg2: (Point2<S>, Point2<S>),
    p: Point2<S>,
) -> Result<Tripoint<S>, GeometryError> {
    let sites = [Site::Segment(seg1.0, seg1.1), Site::Segment(seg2.0, seg2.1), Site::Point(p)];
    let separator = Separator::of_segments(seg1, seg2)?;

    match separator {
        Separator::HalfLines {
            origin,
            tangent,
            normal,
        } => {
            let w = p.sub(origin);
            for direction in [tangent, normal] {
                // |origin + s·v - p|² = s²  on the ray through `direction`.
                let a = direction.length2() - S::one();
                let b = -(direction.dot(w) + direction.dot(w));
                let c = w.length2();
                let roots = match math::quadratic_roots(a, b, c) {
                    Some(roots) => roots,
                    None => continue,
                };
                for s in [roots.0, roots.1] {
                    if s < S::zero() {
                        continue;
                    }
                    let q = origin.add(direction.mul(s));
                    let r = q.distance2(p).sqrt();
                    if let Some(result) = validated(&sites, q, r)? {
                        return Ok(result);
                    }
                }
            }
            Ok(Tripoint::none())
        }
        Separator::Parallel {
            origin,
            tangent,
            rmin,
        } => {
            // The tripoint sits on the strip midline at distance rmin from
            // the point.
            let w = p.sub(origin);
            let b = -(tangent.dot(w) + tangent.dot(w));
            let c = w.length2() - rmin * rmin;
            let roots = match math::quadratic_roots(S::one(), b, c) {
                Some(roots) => roots,
                None => return Ok(Tripoint::none()),
            };
            for s in [roots.0, roots.1] {
                let q = origin.add(tangent.mul(s));
                if let Some(result) = validated(&sites, q, rmin)? {
                    return Ok(result);
                }
            }
            Ok(Tripoint::none())
        }
        Separator::Line {
            origin, tangent, ..
        }
        | Separator::Ray { origin, tangent } => {
            // Collinear segments: the separator is the perpendicular through
            // `origin`, on which the distance to both segments at abscissa s
            // is √(s² + rmin²). Equality with the point distance is linear.
            let rmin = separator.rmin();
            let w = p.sub(origin);
            let denominator = w.dot(tangent) + w.dot(tangent);
            if denominator == S::zero() {
                if w.length2() == rmin * rmin {
                    // The point is equidistant from both facing endpoints
                    // everywhere on the bisector.
                    return Err(GeometryError::NotImplemented(
                        "point on the bisector of a collinear segment pair",
                    ));
                }
                return Ok(Tripoint::none());
            }
            let s = (w.length2() - rmin * rmin) / denominator;
            let q = origin.add(tangent.mul(s));
            let r = (s * s + rmin * rmin).sqrt();
            Ok(validated(&sites, q, r)?.unwrap_or_else(Tripoint::none))
        }
        Separator::Parabola { .. } => {
            unreachable!("segment/segment separators are never parabolic")
        }
    }
}

/// The carrier line of a segment/segment separator branch: a ray constrained
/// forward of its origin, or an unconstrained line (parallel midline,
/// collinear-gap perpendicular).
struct BranchCurve<S> {
    origin: Point2<S>,
    direction: Point2<S>,
    forward_only: bool,
}

fn branch_curves<S: OffsetNum>(separator: &Separator<S>) -> SmallVec<[BranchCurve<S>; 2]> {
    match *separator {
        Separator::HalfLines {
            origin,
            tangent,
            normal,
        } => smallvec::smallvec![
            BranchCurve {
                origin,
                direction: tangent,
                forward_only: true,
            },
            BranchCurve {
                origin,
                direction: normal,
                forward_only: true,
            },
        ],
        Separator::Parallel {
            origin, tangent, ..
        }
        | Separator::Line {
            origin, tangent, ..
        }
        | Separator::Ray {
            origin, tangent, ..
        } => smallvec::smallvec![BranchCurve {
            origin,
            direction: tangent,
            forward_only: false,
        }],
        Separator::Parabola { .. } => {
            unreachable!("segment/segment separators are never parabolic")
        }
    }
}

/// Three segments: an incenter or excenter of the triangle cut out by the
/// supporting lines, found by intersecting branch curves of the first two
/// separators and keeping the first candidate with three valid branches.
fn tripoint_lll<S: OffsetNum>(
    seg1: (Point2<S>, Point2<S>),
    seg2: (Point2<S>, Point2<S>),
    seg3: (Point2<S>, Point2<S>),
) -> Result<Tripoint<S>, GeometryError> {
    let sites = [
        Site::Segment(seg1.0, seg1.1),
        Site::Segment(seg2.0, seg2.1),
        Site::Segment(seg3.0, seg3.1),
    ];
    let sep12 = Separator::of_segments(seg1, seg2)?;
    let sep23 = Separator::of_segments(seg2, seg3)?;

    for curve1 in branch_curves(&sep12) {
        for curve2 in branch_curves(&sep23) {
            let q = match math::lineinter(
                curve1.origin,
                curve1.origin.add(curve1.direction),
                curve2.origin,
                curve2.origin.add(curve2.direction),
            ) {
                Ok(q) => q,
                Err(GeometryError::ConcurrentLines) => continue,
                Err(other) => return Err(other),
            };
            // Rays carry the vertex only forward of their origin.
            let forward = |curve: &BranchCurve<S>| {
                !curve.forward_only
                    || q.sub(curve.origin).dot(curve.direction) >= S::zero()
            };
            if !forward(&curve1) || !forward(&curve2) {
                continue;
            }
            let r = math::segdistance2(seg2.0, seg2.1, q).sqrt();
            if let Some(result) = validated(&sites, q, r)? {
                return Ok(result);
            }
        }
    }
    Ok(Tripoint::none())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn point(x: f64, y: f64) -> Site<f64> {
        Site::Point(Point2::new(x, y))
    }

    fn segment(a: (f64, f64), b: (f64, f64)) -> Site<f64> {
        Site::Segment(Point2::new(a.0, a.1), Point2::new(b.0, b.1))
    }

    #[test]
    fn test_equilateral_triangle() {
        let result = tripoint([
            point(0.0, 0.0),
            point(1.0, 0.0),
            point(0.5, 3.0f64.sqrt() / 2.0),
        ])
        .unwrap();
        assert_relative_eq!(result.r, 3.0f64.sqrt() / 3.0, max_relative = 1.0e-12);
        assert_eq!(result.branches, [Branch::PLUS; 3]);
    }

    #[test]
    fn test_cyclic_symmetry() {
        let a = point(0.2, -0.3);
        let b = point(4.0, 0.5);
        let c = point(1.5, 3.0);
        let t1 = tripoint([a, b, c]).unwrap();
        let t2 = tripoint([b, c, a]).unwrap();
        let t3 = tripoint([c, a, b]).unwrap();
        assert_relative_eq!(t1.r, t2.r, max_relative = 1.0e-12);
        assert_relative_eq!(t1.r, t3.r, max_relative = 1.0e-12);
        assert_eq!(t1.branches[0], t2.branches[2]);
        assert_eq!(t1.branches[1], t2.branches[0]);
        assert_eq!(t1.branches[2], t2.branches[1]);
        assert_eq!(t1.branches[0], t3.branches[1]);
    }

    #[test]
    fn test_reversed_orientation_has_no_tripoint() {
        let result = tripoint([
            point(1.0, 0.0),
            point(0.0, 0.0),
            point(0.5, 3.0f64.sqrt() / 2.0),
        ])
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_obtuse_triangle_branches() {
        // Very obtuse at c: the circumcenter falls on the far side of ab.
        let a = point(0.0, 0.0);
        let b = point(10.0, 0.0);
        let c = point(5.0, 0.5);
        let result = tripoint([a, b, c]).unwrap();
        assert!(!result.is_none());
        // Branch of separator(a, b) is negative: the center lies below ab's
        // midpoint since the angle at c is obtuse.
        assert_eq!(result.branches[0], Branch::MINUS);
    }

    #[test]
    fn test_segment_and_two_points() {
        // Segment on the x axis, symmetric points above. Seen from the
        // vertex the counterclockwise order is line, right point, left
        // point.
        let seg = segment((-10.0, 0.0), (10.0, 0.0));
        let left = point(-1.0, 2.0);
        let right = point(1.0, 2.0);

        let reversed = tripoint([seg, left, right]).unwrap();
        assert!(reversed.is_none());

        let result = tripoint([seg, right, left]).unwrap();
        assert!(!result.is_none());
        // Equidistance on x = 0 at height r: 1 + (r-2)² = r².
        let expected = (1.0 + 4.0) / 4.0;
        assert_relative_eq!(result.r, expected, max_relative = 1.0e-12);
    }

    #[test]
    fn test_segment_endpoint_and_point() {
        let seg = segment((0.0, 0.0), (10.0, 0.0));
        let endpoint = point(0.0, 0.0);
        let p = point(2.0, 2.0);
        // Cyclic order: (segment, point above, shared endpoint).
        let result = tripoint([seg, p, endpoint]).unwrap();
        assert!(!result.is_none());
        // On the endpoint's perpendicular: x = 0, r = (4 + 4) / 4 = 2... the
        // vertex is at (0, r) with 4 + (r - 2)² = r², so r = 2.
        assert_relative_eq!(result.r, 2.0, max_relative = 1.0e-12);
    }

    #[test]
    fn test_point_inside_segment_rejected() {
        let seg = segment((0.0, 0.0), (10.0, 0.0));
        let inside = point(5.0, 0.0);
        let p = point(2.0, 2.0);
        assert_eq!(
            tripoint([seg, p, inside]),
            Err(GeometryError::PointInSegment)
        );
    }

    #[test]
    fn test_two_segments_and_point() {
        // Bottom and right edge of the unit square plus its far corner.
        let bottom = segment((0.0, 0.0), (1.0, 0.0));
        let right = segment((1.0, 0.0), (1.0, 1.0));
        let corner = point(0.0, 1.0);
        let result = tripoint([bottom, right, corner]).unwrap();
        assert!(!result.is_none());
        // The vertex sits on the interior diagonal from (1, 0): at ray
        // parameter s the distance to the far corner is √2·(1-s), equal to
        // s at s = √2/(1+√2).
        let expected = 2.0f64.sqrt() / (1.0 + 2.0f64.sqrt());
        assert_relative_eq!(result.r, expected, max_relative = 1.0e-9);
    }

    #[test]
    fn test_three_segments_incenter() {
        // A 3-4-5 right triangle, counterclockwise.
        let s1 = segment((0.0, 0.0), (4.0, 0.0));
        let s2 = segment((4.0, 0.0), (0.0, 3.0));
        let s3 = segment((0.0, 3.0), (0.0, 0.0));
        let result = tripoint([s1, s2, s3]).unwrap();
        assert!(!result.is_none());
        // Inradius = area / semiperimeter = 6 / 6 = 1.
        assert_relative_eq!(result.r, 1.0, max_relative = 1.0e-9);
    }

    #[test]
    fn test_parallel_segments_and_point() {
        let lower = segment((0.0, 0.0), (10.0, 0.0));
        let upper = segment((10.0, 4.0), (0.0, 4.0));
        let p = point(5.0, 2.0);
        // The point lies on the midline: the tripoint candidates are at
        // distance 2 from it along the midline.
        let result = tripoint([lower, upper, p]).unwrap();
        assert!(!result.is_none());
        assert_relative_eq!(result.r, 2.0, max_relative = 1.0e-12);
        assert_eq!(result.branches[0], Branch::ZERO);
    }

    #[test]
    fn test_all_parallel_is_none() {
        let s1 = segment((0.0, 0.0), (10.0, 0.0));
        let s2 = segment((10.0, 2.0), (0.0, 2.0));
        let s3 = segment((0.0, 4.0), (10.0, 4.0));
        let result = tripoint([s1, s2, s3]).unwrap();
        assert!(result.is_none());
    }
}
