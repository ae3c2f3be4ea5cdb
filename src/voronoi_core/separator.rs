use crate::voronoi_core::handles::Branch;
use crate::voronoi_core::math;
use crate::{GeometryError, OffsetNum, Point2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The geometry of a site: a single point or an oriented line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Site<S> {
    Point(Point2<S>),
    Segment(Point2<S>, Point2<S>),
}

/// Position of a query point relative to a segment, by projection onto its
/// supporting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPosition {
    /// The projection parameter is `<= 0`.
    Before,
    /// The projection parameter is strictly between `0` and `1`.
    Within,
    /// The projection parameter is `>= 1`.
    After,
}

impl SegmentPosition {
    /// The direction sign of the segment as seen from the query point:
    /// `+1` if the segment extends forward of it, `-1` backward, `0` if the
    /// point projects into the interior.
    fn epsilon(self) -> i8 {
        match self {
            SegmentPosition::Before => 1,
            SegmentPosition::Within => 0,
            SegmentPosition::After => -1,
        }
    }
}

/// Classifies the supporting-line intersection of two segments against both
/// segments.
///
/// This is the position code deciding the quadrants of a segment/segment
/// separator. Both positions `Within` means the segments cross in their
/// interiors, which is invalid input.
pub fn segments_position<S: OffsetNum>(
    seg1: (Point2<S>, Point2<S>),
    seg2: (Point2<S>, Point2<S>),
) -> Result<(SegmentPosition, SegmentPosition), GeometryError> {
    let crossing = math::lineinter(seg1.0, seg1.1, seg2.0, seg2.1)?;
    let position = |seg: (Point2<S>, Point2<S>)| {
        let t = math::project_relative(seg.0, seg.1, crossing);
        if t <= S::zero() {
            SegmentPosition::Before
        } else if t >= S::one() {
            SegmentPosition::After
        } else {
            SegmentPosition::Within
        }
    };
    let result = (position(seg1), position(seg2));
    if result == (SegmentPosition::Within, SegmentPosition::Within) {
        return Err(GeometryError::CrossingSegments);
    }
    Ok(result)
}

/// The locus of points equidistant from two sites, parametrized by the
/// distance `r`.
///
/// Every separator has two infinite branches labelled `+` and `-` which meet
/// at the perigee `r = rmin`. On the `+` branch, travelling towards growing
/// `r`, the site named first at construction stays on the left;
/// [Separator::reverse] swaps the naming and with it the two branches.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Separator<S> {
    /// Bisector of two points: a straight line.
    ///
    /// `origin` is the perigee (the midpoint), `tangent` is a unit vector
    /// along the line, `rmin` half the point distance.
    Line {
        origin: Point2<S>,
        tangent: Point2<S>,
        rmin: S,
    },
    /// Bisector of a segment's supporting line and a point off that line.
    ///
    /// `origin` is the foot of the point on the line, `normal` the unit
    /// normal towards the point, `tangent` the line direction scaled to
    /// `2·√rmin` so that the abscissa at distance `r` is
    /// `‖tangent‖·√(r - rmin)`.
    Parabola {
        origin: Point2<S>,
        normal: Point2<S>,
        tangent: Point2<S>,
        rmin: S,
    },
    /// Bisector of a segment and one of its endpoints: the straight line
    /// through the endpoint perpendicular to the segment. The perigee is the
    /// endpoint itself, `rmin = 0`.
    Ray {
        origin: Point2<S>,
        tangent: Point2<S>,
    },
    /// Bisector of two segments with crossing supporting lines: two rays
    /// from the intersection along (generally different) quadrant bisectors.
    ///
    /// The `+` branch is `origin + r·tangent`, the `-` branch
    /// `origin + r·normal`; both direction vectors are scaled so that the
    /// parameter equals the distance to either line.
    HalfLines {
        origin: Point2<S>,
        tangent: Point2<S>,
        normal: Point2<S>,
    },
    /// Bisector of two segments with parallel supporting lines: the strip
    /// midline. The branch distinction collapses (`Branch::ZERO`); the
    /// parameter of [Separator::evaluate] is the signed abscissa along the
    /// midline, the distance to both lines is the constant `rmin`.
    Parallel {
        origin: Point2<S>,
        tangent: Point2<S>,
        rmin: S,
    },
}

impl<S: OffsetNum> Separator<S> {
    /// Builds the separator of two sites, named in this order: the `+`
    /// branch keeps `site1` on its left.
    pub fn new(site1: Site<S>, site2: Site<S>) -> Result<Self, GeometryError> {
        match (site1, site2) {
            (Site::Point(a), Site::Point(b)) => Ok(Self::of_points(a, b)),
            (Site::Segment(a, b), Site::Point(p)) => Self::of_segment_point((a, b), p),
            (Site::Point(p), Site::Segment(a, b)) => {
                Ok(Self::of_segment_point((a, b), p)?.reverse())
            }
            (Site::Segment(a, b), Site::Segment(c, d)) => Self::of_segments((a, b), (c, d)),
        }
    }

    /// Bisector of two distinct points.
    pub fn of_points(a: Point2<S>, b: Point2<S>) -> Self {
        debug_assert!(a != b, "bisector of coinciding points");
        let two: S = 2.0f32.into();
        let difference = b.sub(a);
        Separator::Line {
            origin: a.add(b).mul(S::one() / two),
            tangent: difference.perp().normalized(),
            rmin: difference.length() / two,
        }
    }

    /// Bisector of a segment and a point.
    ///
    /// A point on the supporting line is only legal when it coincides with a
    /// segment endpoint; any other on-line position returns
    /// [GeometryError::PointInSegment].
    pub fn of_segment_point(
        seg: (Point2<S>, Point2<S>),
        p: Point2<S>,
    ) -> Result<Self, GeometryError> {
        let (a, b) = seg;
        let on_line = !math::isleft(a, b, p) && !math::isleft(b, a, p);
        if on_line {
            let direction = if p == a {
                b.sub(a)
            } else if p == b {
                a.sub(b)
            } else {
                return Err(GeometryError::PointInSegment);
            };
            // Towards the segment on the left of the + branch.
            return Ok(Separator::Ray {
                origin: p,
                tangent: direction.normalized().perp().mul(-S::one()),
            });
        }

        let foot = a.add(b.sub(a).mul(math::project_relative(a, b, p)));
        let height = p.distance2(foot).sqrt();
        let normal = p.sub(foot).mul(S::one() / height);
        // Line direction with the point on its right, so that the + branch
        // keeps the segment on its left.
        let direction = if math::isleft(a, b, p) {
            a.sub(b).normalized()
        } else {
            b.sub(a).normalized()
        };
        let two: S = 2.0f32.into();
        Ok(Separator::Parabola {
            origin: foot,
            normal,
            tangent: direction.mul((two * height).sqrt()),
            rmin: height / two,
        })
    }

    /// Bisector of two non-crossing segments.
    pub fn of_segments(
        seg1: (Point2<S>, Point2<S>),
        seg2: (Point2<S>, Point2<S>),
    ) -> Result<Self, GeometryError> {
        let d1 = seg1.1.sub(seg1.0).normalized();
        let d2 = seg2.1.sub(seg2.0).normalized();
        let det = math::det2(d1, d2);
        if det == S::zero() {
            return Self::of_parallel_segments(seg1, d1, seg2);
        }

        let origin = math::lineinter(seg1.0, seg1.1, seg2.0, seg2.1)?;
        let (pos1, pos2) = segments_position(seg1, seg2)?;
        let (quadrant_a, quadrant_b) = segments_quadrants(pos1, pos2);

        let ray = |quadrant: (i8, i8)| {
            let sign1: S = (quadrant.0 as f32).into();
            let sign2: S = (quadrant.1 as f32).into();
            d1.mul(sign1).add(d2.mul(sign2)).mul(S::one() / det.abs())
        };
        let ray_a = ray(quadrant_a);
        let ray_b = ray(quadrant_b);

        // The + branch keeps seg1 on its left. When the intersection falls
        // into seg1's interior the segment flanks both rays and the test
        // switches to seg2-on-the-right.
        let seg1_on_left = |v: Point2<S>| {
            if pos1 == SegmentPosition::Within {
                let towards2: S = (pos2.epsilon() as f32).into();
                math::det2(v, d2.mul(towards2)) < S::zero()
            } else {
                let towards1: S = (pos1.epsilon() as f32).into();
                math::det2(v, d1.mul(towards1)) > S::zero()
            }
        };

        let (tangent, normal) = if seg1_on_left(ray_a) {
            (ray_a, ray_b)
        } else {
            (ray_b, ray_a)
        };
        Ok(Separator::HalfLines {
            origin,
            tangent,
            normal,
        })
    }

    fn of_parallel_segments(
        seg1: (Point2<S>, Point2<S>),
        d1: Point2<S>,
        seg2: (Point2<S>, Point2<S>),
    ) -> Result<Self, GeometryError> {
        let two: S = 2.0f32.into();
        let gap = seg2.0.sub(seg1.0).dot(d1.perp());
        if gap == S::zero() {
            return Self::of_collinear_segments(seg1, d1, seg2);
        }
        let origin = seg1.0.add(d1.perp().mul(gap / two));
        // With seg1 below the midline (positive gap), travelling against d1
        // keeps it on the left.
        let tangent = if gap > S::zero() { d1.mul(-S::one()) } else { d1 };
        Ok(Separator::Parallel {
            origin,
            tangent,
            rmin: gap.abs() / two,
        })
    }

    // Segments on the same supporting line, as in a straight polyline run.
    // Their bisector is the perpendicular through the midpoint of the gap
    // separating them: the bisector of the two facing endpoints.
    fn of_collinear_segments(
        seg1: (Point2<S>, Point2<S>),
        d1: Point2<S>,
        seg2: (Point2<S>, Point2<S>),
    ) -> Result<Self, GeometryError> {
        let span = |seg: (Point2<S>, Point2<S>)| {
            let s1 = seg.0.sub(seg1.0).dot(d1);
            let s2 = seg.1.sub(seg1.0).dot(d1);
            (s1.min(s2), s1.max(s2))
        };
        let (lo1, hi1) = span(seg1);
        let (lo2, hi2) = span(seg2);
        if hi1.min(hi2) > lo1.max(lo2) {
            // Overlapping interiors.
            return Err(GeometryError::CrossingSegments);
        }

        // Facing endpoints and the outward direction from seg1 towards seg2.
        let (end1, end2, outward) = if lo2 >= hi1 {
            (seg1.0.add(d1.mul(hi1)), seg1.0.add(d1.mul(lo2)), d1)
        } else {
            (
                seg1.0.add(d1.mul(lo1)),
                seg1.0.add(d1.mul(hi2)),
                d1.mul(-S::one()),
            )
        };
        if end1 == end2 {
            // The segments share the endpoint; the + branch keeps seg1 (the
            // one behind the shared point) on its left.
            return Ok(Separator::Ray {
                origin: end1,
                tangent: outward.perp(),
            });
        }
        let two: S = 2.0f32.into();
        Ok(Separator::Line {
            origin: end1.add(end2).mul(S::one() / two),
            tangent: outward.perp(),
            rmin: end1.distance2(end2).sqrt() / two,
        })
    }

    /// The smallest distance realized on this separator.
    pub fn rmin(&self) -> S {
        match *self {
            Separator::Line { rmin, .. } => rmin,
            Separator::Parabola { rmin, .. } => rmin,
            Separator::Ray { .. } => S::zero(),
            Separator::HalfLines { .. } => S::zero(),
            Separator::Parallel { rmin, .. } => rmin,
        }
    }

    /// Whether this is the degenerate parallel-strip bisector.
    pub fn is_parallel(&self) -> bool {
        matches!(self, Separator::Parallel { .. })
    }

    /// The same separator with the two sites named in the other order,
    /// swapping the `+` and `-` branches.
    pub fn reverse(&self) -> Self {
        let negate = |v: Point2<S>| v.mul(-S::one());
        match *self {
            Separator::Line {
                origin,
                tangent,
                rmin,
            } => Separator::Line {
                origin,
                tangent: negate(tangent),
                rmin,
            },
            Separator::Parabola {
                origin,
                normal,
                tangent,
                rmin,
            } => Separator::Parabola {
                origin,
                normal,
                tangent: negate(tangent),
                rmin,
            },
            Separator::Ray { origin, tangent } => Separator::Ray {
                origin,
                tangent: negate(tangent),
            },
            Separator::HalfLines {
                origin,
                tangent,
                normal,
            } => Separator::HalfLines {
                origin,
                tangent: normal,
                normal: tangent,
            },
            Separator::Parallel {
                origin,
                tangent,
                rmin,
            } => Separator::Parallel {
                origin,
                tangent: negate(tangent),
                rmin,
            },
        }
    }

    /// The point at distance `r` on the given branch.
    ///
    /// `r` values slightly below `rmin` are clamped onto the perigee; callers
    /// are expected not to evaluate far below `rmin`.
    pub fn evaluate(&self, branch: Branch, r: S) -> Point2<S> {
        debug_assert!(!branch.is_bad());
        let sign: S = (branch.sign() as f32).into();
        match *self {
            Separator::Line {
                origin,
                tangent,
                rmin,
            } => {
                let along = (r * r - rmin * rmin).max(S::zero()).sqrt();
                origin.add(tangent.mul(sign * along))
            }
            Separator::Parabola {
                origin,
                normal,
                tangent,
                rmin,
            } => {
                let along = (r - rmin).max(S::zero()).sqrt();
                origin.add(normal.mul(r)).add(tangent.mul(sign * along))
            }
            Separator::Ray { origin, tangent } => origin.add(tangent.mul(sign * r)),
            Separator::HalfLines {
                origin,
                tangent,
                normal,
            } => {
                let direction = if branch.sign() >= 0 { tangent } else { normal };
                origin.add(direction.mul(r))
            }
            Separator::Parallel { origin, tangent, .. } => origin.add(tangent.mul(sign * r)),
        }
    }

    /// Parameter values subdividing this separator between distances `r1`
    /// and `r2` (on one branch) so that the polyline through the evaluated
    /// points deviates from the separator by at most `tol`.
    ///
    /// Straight separators return just the two endpoints.
    pub fn approximate(&self, r1: S, r2: S, tol: S) -> Vec<S> {
        match *self {
            Separator::Parabola { tangent, rmin, .. } => {
                let two: S = 2.0f32.into();
                let length2 = tangent.length2();
                let x1 = tangent.length() * (r1 - rmin).max(S::zero()).sqrt();
                let x2 = tangent.length() * (r2 - rmin).max(S::zero()).sqrt();
                math::approxparabola(length2 / two, x1, x2, tol)
                    .into_iter()
                    .map(|x| rmin + x * x / length2)
                    .collect()
            }
            _ => vec![r1, r2],
        }
    }

    /// Angle of the separator's normal direction at its perigee.
    pub fn atan0(&self) -> S {
        match *self {
            Separator::Line { tangent, .. } => tangent.perp().angle(),
            Separator::Parabola { normal, .. } => normal.angle(),
            Separator::Ray { tangent, .. } => tangent.angle(),
            Separator::HalfLines { tangent, .. } => tangent.angle(),
            Separator::Parallel { tangent, .. } => tangent.perp().angle(),
        }
    }

    /// The branch of this separator containing `p`, decided by ray
    /// alignment. Returns `Branch::BAD` if `p` is behind both branches.
    pub fn whichbranch(&self, p: Point2<S>) -> Branch {
        match *self {
            Separator::HalfLines {
                origin,
                tangent,
                normal,
            } => {
                let direction = p.sub(origin);
                let along_plus = direction.dot(tangent) / tangent.length();
                let along_minus = direction.dot(normal) / normal.length();
                if along_plus <= S::zero() && along_minus <= S::zero() {
                    Branch::BAD
                } else if along_plus >= along_minus {
                    Branch::PLUS
                } else {
                    Branch::MINUS
                }
            }
            Separator::Parallel { .. } => Branch::ZERO,
            Separator::Line {
                origin, tangent, ..
            }
            | Separator::Ray {
                origin, tangent, ..
            } => Branch::from_sign(p.sub(origin).dot(tangent).into()),
            Separator::Parabola {
                origin, tangent, ..
            } => Branch::from_sign(p.sub(origin).dot(tangent).into()),
        }
    }
}

/// The two quadrants of the supporting-line intersection carrying the
/// branches of a segment/segment separator, as `(sign along line 1, sign
/// along line 2)` pairs. The first entry belongs to the candidate branch
/// listed first; the constructor still reorders the pair so that the `+`
/// branch keeps the first segment on its left.
pub fn segments_quadrants(
    pos1: SegmentPosition,
    pos2: SegmentPosition,
) -> ((i8, i8), (i8, i8)) {
    match (pos1.epsilon(), pos2.epsilon()) {
        // Intersection inside one segment: both branches lie on the side of
        // the other segment, flanking the crossed one.
        (0, e2) => ((1, e2), (-1, e2)),
        (e1, 0) => ((e1, 1), (e1, -1)),
        // Generic case: the bisector of the quadrant between the segments
        // and its opposite ray.
        (e1, e2) => ((e1, e2), (-e1, -e2)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::voronoi_core::handles::Branch;
    use approx::assert_relative_eq;

    fn site_distance(site: Site<f64>, p: Point2<f64>) -> f64 {
        match site {
            Site::Point(a) => p.distance2(a).sqrt(),
            Site::Segment(a, b) => math::segdistance2(a, b, p).sqrt(),
        }
    }

    fn assert_equidistant(site1: Site<f64>, site2: Site<f64>, p: Point2<f64>, r: f64) {
        assert_relative_eq!(site_distance(site1, p), r, max_relative = 1.0e-9);
        assert_relative_eq!(site_distance(site2, p), r, max_relative = 1.0e-9);
    }

    #[test]
    fn test_point_point() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        let separator = Separator::of_points(a, b);
        assert_relative_eq!(separator.rmin(), 5.0);

        let on_plus = separator.evaluate(Branch::PLUS, 13.0);
        assert_equidistant(Site::Point(a), Site::Point(b), on_plus, 13.0);
        // The + branch keeps the first site on its left: with a west of b it
        // must extend upwards.
        assert!(on_plus.y > 0.0);

        let on_minus = separator.evaluate(Branch::MINUS, 13.0);
        assert!(on_minus.y < 0.0);
        assert_relative_eq!(on_plus.x, 5.0);
        assert_relative_eq!(on_plus.y, 12.0);
    }

    #[test]
    fn test_parabola() {
        let a: Point2<f64> = Point2::new(-3.0, 0.0);
        let b: Point2<f64> = Point2::new(4.0, 0.0);
        let p: Point2<f64> = Point2::new(1.0, 2.0);
        let separator = Separator::of_segment_point((a, b), p).unwrap();
        assert_relative_eq!(separator.rmin(), 1.0);

        for r in [1.0, 1.5, 4.0] {
            for branch in [Branch::PLUS, Branch::MINUS] {
                let q = separator.evaluate(branch, r);
                assert_relative_eq!(q.distance2(p).sqrt(), r, max_relative = 1.0e-9);
                assert_relative_eq!(q.y, r, max_relative = 1.0e-9);
            }
        }

        // The + branch keeps the segment (named first) on its left; with the
        // point above the segment the + branch extends towards -x.
        let plus = separator.evaluate(Branch::PLUS, 5.0);
        let minus = separator.evaluate(Branch::MINUS, 5.0);
        assert!(plus.x < 1.0);
        assert!(minus.x > 1.0);
    }

    #[test]
    fn test_point_on_interior_rejected() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(4.0, 0.0);
        assert_eq!(
            Separator::of_segment_point((a, b), Point2::new(2.0, 0.0)),
            Err(GeometryError::PointInSegment)
        );
        // Collinear but outside the segment is just as illegal.
        assert_eq!(
            Separator::of_segment_point((a, b), Point2::new(7.0, 0.0)),
            Err(GeometryError::PointInSegment)
        );
    }

    #[test]
    fn test_endpoint_ray() {
        let a: Point2<f64> = Point2::new(0.0, 0.0);
        let b: Point2<f64> = Point2::new(4.0, 0.0);
        let separator = Separator::of_segment_point((a, b), a).unwrap();
        assert_relative_eq!(separator.rmin(), 0.0);
        let q = separator.evaluate(Branch::PLUS, 3.0);
        // Perpendicular through the endpoint.
        assert_relative_eq!(q.x, 0.0);
        assert_relative_eq!(q.y.abs(), 3.0);
    }

    #[test]
    fn test_square_corner_quadrants() {
        // Corner of a ccw square at (1, 0): bottom edge then right edge.
        let bottom: (Point2<f64>, Point2<f64>) = (Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        let right: (Point2<f64>, Point2<f64>) = (Point2::new(1.0, 0.0), Point2::new(1.0, 1.0));
        let separator = Separator::of_segments(bottom, right).unwrap();

        // The + branch keeps the bottom edge (named first) on its left: the
        // interior diagonal. The exterior diagonal is the - branch.
        let plus = separator.evaluate(Branch::PLUS, 0.5);
        let minus = separator.evaluate(Branch::MINUS, 0.5);
        assert!(plus.x < 1.0 && plus.y > 0.0, "interior: {:?}", plus);
        assert!(minus.x > 1.0 && minus.y < 0.0, "exterior: {:?}", minus);

        // The parameter is the distance to both supporting lines.
        for q in [plus, minus] {
            assert_relative_eq!(q.y.abs(), 0.5, max_relative = 1.0e-9);
            assert_relative_eq!((q.x - 1.0).abs(), 0.5, max_relative = 1.0e-9);
        }
    }

    #[test]
    fn test_crossing_segments() {
        let seg1 = (Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let seg2 = (Point2::new(1.0, 0.0), Point2::new(0.0, 1.0));
        assert_eq!(
            Separator::of_segments(seg1, seg2),
            Err(GeometryError::CrossingSegments)
        );
    }

    #[test]
    fn test_wedge_separator() {
        // Two segments opening like a V from near the origin.
        let seg1: (Point2<f64>, Point2<f64>) = (Point2::new(1.0, 0.0), Point2::new(5.0, 0.0));
        let seg2: (Point2<f64>, Point2<f64>) = (Point2::new(0.8, 0.6), Point2::new(4.0, 3.0));
        let separator = Separator::of_segments(seg1, seg2).unwrap();

        for r in [0.25, 0.5, 1.0] {
            for branch in [Branch::PLUS, Branch::MINUS] {
                let q = separator.evaluate(branch, r);
                // Distance to both supporting lines is r.
                let to_line1 = (q.y).abs();
                assert_relative_eq!(to_line1, r, max_relative = 1.0e-9);
            }
        }
    }

    #[test]
    fn test_parallel_segments() {
        let seg1 = (Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let seg2 = (Point2::new(10.0, 2.0), Point2::new(0.0, 2.0));
        let separator = Separator::of_segments(seg1, seg2).unwrap();
        assert!(separator.is_parallel());
        assert_relative_eq!(separator.rmin(), 1.0);

        let q = separator.evaluate(Branch::ZERO, 0.0);
        assert_relative_eq!(q.y, 1.0);
    }

    #[test]
    fn test_reversal_property() {
        // evaluate(reverse(sep), b, r) == evaluate(sep, -b, r)
        let configurations: Vec<(Site<f64>, Site<f64>)> = vec![
            (
                Site::Point(Point2::new(0.0, 0.0)),
                Site::Point(Point2::new(3.0, 4.0)),
            ),
            (
                Site::Segment(Point2::new(-3.0, 0.0), Point2::new(4.0, 0.0)),
                Site::Point(Point2::new(1.0, 2.0)),
            ),
            (
                Site::Segment(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
                Site::Segment(Point2::new(1.0, 0.0), Point2::new(1.0, 1.0)),
            ),
        ];
        for (site1, site2) in configurations {
            let separator = Separator::new(site1, site2).unwrap();
            let reversed = separator.reverse();
            for r in [0.5, 1.0, 2.5, 7.0] {
                for branch in [Branch::PLUS, Branch::MINUS] {
                    let expected = separator.evaluate(-branch, r);
                    let actual = reversed.evaluate(branch, r);
                    assert_relative_eq!(expected.x, actual.x, max_relative = 1.0e-12);
                    assert_relative_eq!(expected.y, actual.y, max_relative = 1.0e-12);
                }
            }
        }
    }

    #[test]
    fn test_reverse_matches_swapped_construction() {
        let site1 = Site::Point(Point2::new(0.0, 1.0));
        let site2: Site<f64> = Site::Point(Point2::new(2.0, -1.0));
        let forward = Separator::new(site1, site2).unwrap();
        let swapped = Separator::new(site2, site1).unwrap();
        for r in [2.0, 3.0] {
            for branch in [Branch::PLUS, Branch::MINUS] {
                let a = forward.reverse().evaluate(branch, r);
                let b = swapped.evaluate(branch, r);
                assert_relative_eq!(a.x, b.x, max_relative = 1.0e-12);
                assert_relative_eq!(a.y, b.y, max_relative = 1.0e-12);
            }
        }
    }

    #[test]
    fn test_approximate_parabola() {
        let separator = Separator::of_segment_point(
            (Point2::new(-5.0, 0.0), Point2::new(5.0, 0.0)),
            Point2::new(0.0, 2.0),
        )
        .unwrap();
        let rs = separator.approximate(1.0, 6.0, 1.0e-3);
        assert_relative_eq!(*rs.first().unwrap(), 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(*rs.last().unwrap(), 6.0, max_relative = 1.0e-9);
        assert!(rs.len() > 2);
        assert!(rs.windows(2).all(|w| w[0] < w[1]));

        // All interpolated points are genuinely on the separator.
        for &r in &rs {
            let q = separator.evaluate(Branch::PLUS, r);
            assert_relative_eq!(q.y, r, max_relative = 1.0e-9);
        }
    }

    #[test]
    fn test_approximate_straight() {
        let separator =
            Separator::of_points(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0));
        assert_eq!(separator.approximate(1.0, 5.0, 1.0e-3), vec![1.0, 5.0]);
    }
}
