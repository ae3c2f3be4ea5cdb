//! # voronoi-offset
//!
//! Planar Voronoi diagrams generalized to line segment sites, in the style
//! of VRONI/Kim, together with the two queries they were built for:
//!
//! - **Polygonal offsets**: the locus of points at a signed distance `r`
//!   from a polygon or polyline, with parabolic and circular pieces
//!   approximated to a caller-supplied tolerance.
//! - **Axial extrusion**: the surface swept by a closed profile carried
//!   along a trajectory, realized as offset curves lifted to 3D.
//!
//! The diagram is built incrementally: a Bowyer-Watson pass over the point
//! sites, segment insertion by topological capture, and finally a split of
//! every segment cell into its left and right halves. Construction is batch;
//! the frozen diagram can then be queried at any number of radii.
//!
//! # Example
//!
//! ```
//! use voronoi_offset::{offset, Point2};
//!
//! // A unit square, outset by 1/2 with rounded corners.
//! let points = [
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//! ];
//! let segments = [(0, 1), (1, 2), (2, 3), (3, 0)];
//! let loops = offset(&points, &segments, 0.5, 1.0e-2).unwrap();
//! assert_eq!(loops.len(), 1);
//! ```
//!
//! # Restrictions
//!
//! Segment sites may share endpoints but must not cross or overlap in their
//! interiors ([GeometryError::CrossingSegments]), and no point site may lie
//! on another segment's supporting line unless it is one of its endpoints
//! ([GeometryError::PointInSegment]). All computations are plain floating
//! point; degenerate inputs are detected and reported, not perturbed away.

mod extrude;
mod offset;
mod point;
mod voronoi_core;

pub use extrude::{extrude, Mesh};
pub use offset::{offset, offset_multi, OffsetDiagram};
pub use point::{OffsetNum, Point2};
pub use voronoi_core::handles::{Branch, Cell, Edge, Node};
pub use voronoi_core::math::{approxparabola, min_quadratic, min_quartic};
pub use voronoi_core::separator::{segments_position, SegmentPosition, Separator, Site};
pub use voronoi_core::tripoint::{tripoint, Tripoint};
pub use voronoi_core::VoronoiDiagram;

/// The error type for Voronoi diagram construction and its queries.
///
/// All of these indicate invalid input geometry; the failed call leaves no
/// partial result.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum GeometryError {
    /// Two segment sites cross or overlap in their interiors.
    CrossingSegments,
    /// A point site lies on a segment's supporting line without being one
    /// of its endpoints.
    PointInSegment,
    /// Two lines assumed to intersect are parallel.
    ConcurrentLines,
    /// A coordinate was NaN or infinite, or a segment had zero length.
    BadCoordinate,
    /// The input reaches a parallel-bisector degeneracy this implementation
    /// does not resolve.
    NotImplemented(&'static str),
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::CrossingSegments => write!(f, "segment sites cross in their interiors"),
            GeometryError::PointInSegment => {
                write!(f, "a point site lies in the interior of a segment's line")
            }
            GeometryError::ConcurrentLines => write!(f, "lines are parallel"),
            GeometryError::BadCoordinate => write!(f, "coordinate is NaN, infinite or degenerate"),
            GeometryError::NotImplemented(detail) => {
                write!(f, "unresolved degeneracy: {}", detail)
            }
        }
    }
}

impl std::error::Error for GeometryError {}
