use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A coordinate type that can be used with a Voronoi diagram.
///
/// Internally, most calculations are performed after converting the type into a `f64`.
/// However, changing this to `f32` will reduce the required storage space.
///
/// This type should usually be either `f32` or `f64`.
pub trait OffsetNum: Float + Into<f64> + From<f32> + Default + std::fmt::Debug {}

impl<T> OffsetNum for T where T: Float + Into<f64> + From<f32> + Default + std::fmt::Debug {}

/// A two dimensional point.
///
/// This is the basic type used for defining site positions.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2<S> {
    /// The point's x coordinate
    pub x: S,
    /// The point's y coordinate
    pub y: S,
}

impl<S> Point2<S> {
    /// Creates a new point.
    #[inline]
    pub const fn new(x: S, y: S) -> Self {
        Point2 { x, y }
    }
}

impl<S: OffsetNum> Point2<S> {
    /// Returns the squared distance of this point and another point.
    #[inline]
    pub fn distance2(&self, other: Self) -> S {
        self.sub(other).length2()
    }

    pub(crate) fn mul(&self, factor: S) -> Self {
        Point2 {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    pub(crate) fn add(&self, other: Self) -> Self {
        Point2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub(crate) fn sub(&self, other: Self) -> Self {
        Point2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub(crate) fn dot(&self, other: Self) -> S {
        self.x * other.x + self.y * other.y
    }

    pub(crate) fn length2(&self) -> S {
        self.x * self.x + self.y * self.y
    }

    pub(crate) fn length(&self) -> S {
        self.length2().sqrt()
    }

    /// Counterclockwise quarter turn.
    pub(crate) fn perp(&self) -> Self {
        Point2 {
            x: -self.y,
            y: self.x,
        }
    }

    pub(crate) fn normalized(&self) -> Self {
        self.mul(S::one() / self.length())
    }

    /// Angle of this vector against the positive x axis, in `(-π, π]`.
    pub(crate) fn angle(&self) -> S {
        self.y.atan2(self.x)
    }
}

impl<S: OffsetNum> From<Point2<S>> for [S; 2] {
    #[inline]
    fn from(point: Point2<S>) -> Self {
        [point.x, point.y]
    }
}

impl<S: OffsetNum> From<Point2<S>> for (S, S) {
    #[inline]
    fn from(point: Point2<S>) -> (S, S) {
        (point.x, point.y)
    }
}

impl<S: OffsetNum> From<[S; 2]> for Point2<S> {
    #[inline]
    fn from(source: [S; 2]) -> Self {
        Self::new(source[0], source[1])
    }
}

impl<S: OffsetNum> From<(S, S)> for Point2<S> {
    #[inline]
    fn from(source: (S, S)) -> Self {
        Self::new(source.0, source.1)
    }
}
