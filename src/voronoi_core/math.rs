use crate::{GeometryError, OffsetNum, Point2};

/// Signed area of the parallelogram spanned by `u` and `v`.
#[inline]
pub fn det2<S: OffsetNum>(u: Point2<S>, v: Point2<S>) -> S {
    u.x * v.y - u.y * v.x
}

fn to_robust_coord<S: OffsetNum>(point: Point2<S>) -> robust::Coord<S> {
    robust::Coord {
        x: point.x,
        y: point.y,
    }
}

/// Returns `true` iff `c` lies strictly left of the directed line `a -> b`.
pub fn isleft<S: OffsetNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>) -> bool {
    let a = to_robust_coord(a);
    let b = to_robust_coord(b);
    let c = to_robust_coord(c);

    robust::orient2d(a, b, c) > 0.0
}

/// Returns `true` iff `x` lies strictly inside the circumcircle of the
/// triangle `(a, b, c)`.
///
/// # Panics
///
/// Panics if `(a, b, c)` is not positively oriented.
pub fn incircle<S: OffsetNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>, x: Point2<S>) -> bool {
    assert!(
        isleft(a, b, c),
        "incircle requires a positively oriented triangle"
    );
    let a = to_robust_coord(a);
    let b = to_robust_coord(b);
    let c = to_robust_coord(c);
    let x = to_robust_coord(x);

    // robust::incircle expects clockwise input for right handed systems.
    robust::incircle(c, b, a, x) < 0.0
}

/// Intersection point of the lines through `a, b` and through `c, d`.
pub fn lineinter<S: OffsetNum>(
    a: Point2<S>,
    b: Point2<S>,
    c: Point2<S>,
    d: Point2<S>,
) -> Result<Point2<S>, GeometryError> {
    let r = b.sub(a);
    let s = d.sub(c);
    let denominator = det2(r, s);
    if denominator == S::zero() {
        return Err(GeometryError::ConcurrentLines);
    }
    let t = det2(c.sub(a), s) / denominator;
    Ok(a.add(r.mul(t)))
}

/// Scalar parameter of the projection of `p` onto the line `a -> b`,
/// normalized so that `a` maps to `0` and `b` maps to `1`.
#[inline]
pub fn project_relative<S: OffsetNum>(a: Point2<S>, b: Point2<S>, p: Point2<S>) -> S {
    let dir = b.sub(a);
    p.sub(a).dot(dir) / dir.length2()
}

/// Squared distance of `c` to the closed segment `[a, b]`.
pub fn segdistance2<S: OffsetNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>) -> S {
    let factor = project_relative(a, b, c);
    if factor <= S::zero() {
        c.distance2(a)
    } else if factor >= S::one() {
        c.distance2(b)
    } else {
        let dir = b.sub(a);
        c.distance2(a.add(dir.mul(factor)))
    }
}

/// Antiderivative of `(1 + t²)^(-1/4)`, i.e. `H(x) = x·₂F₁(¼, ½; ³⁄₂; -x²)`.
///
/// Subdividing the unit parabola `y = x²/2` at abscissas equally spaced in
/// `H` yields chords of equal Hausdorff deviation. Evaluated through the
/// Pfaff-transformed series for small `|x|` and through the expansion at
/// infinity otherwise.
pub fn parabola_arc_integral<S: OffsetNum>(x: S) -> S {
    let two: S = 2.0f32.into();
    if x < S::zero() {
        return -parabola_arc_integral(-x);
    }
    if x <= two {
        arc_integral_series(x)
    } else {
        arc_integral_tail(x) + arc_integral_series(two) - arc_integral_tail(two)
    }
}

// Pfaff: H(x) = x (1+x²)^(-1/4) ₂F₁(¼, 1; ³⁄₂; x²/(1+x²)); the transformed
// series has nonnegative argument < 1 and converges for every finite x,
// usefully fast for x² ≤ 4.
fn arc_integral_series<S: OffsetNum>(x: S) -> S {
    let quarter: S = 0.25f32.into();
    let sesqui: S = 1.5f32.into();
    let w = x * x / (S::one() + x * x);
    let mut term = S::one();
    let mut sum = S::one();
    let mut n = S::zero();
    while term > sum * S::epsilon() {
        term = term * w * (n + quarter) / (n + sesqui);
        sum = sum + term;
        n = n + S::one();
    }
    x * (S::one() + x * x).powf(-quarter) * sum
}

// For x ≥ 2, integrating the binomial series of t^(-1/2) (1 + t^(-2))^(-1/4)
// term by term gives H up to a constant; the caller fixes the constant by
// matching both evaluations at x = 2.
fn arc_integral_tail<S: OffsetNum>(x: S) -> S {
    let two: S = 2.0f32.into();
    let quarter: S = 0.25f32.into();
    let half: S = 0.5f32.into();
    let mut coefficient = S::one();
    let mut power = x.sqrt();
    let mut sum = two * power;
    let mut k = S::zero();
    loop {
        coefficient = coefficient * -(quarter + k) / (k + S::one());
        power = power / (x * x);
        k = k + S::one();
        let term = coefficient * power / (half - two * k);
        sum = sum + term;
        if term.abs() <= sum.abs() * S::epsilon() {
            return sum;
        }
    }
}

/// Inverse of [parabola_arc_integral] by Newton iteration.
pub fn parabola_arc_inverse<S: OffsetNum>(u: S) -> S {
    let two: S = 2.0f32.into();
    let quarter: S = 0.25f32.into();
    if u < S::zero() {
        return -parabola_arc_inverse(-u);
    }
    let threshold: S = 1.5f32.into();
    let eight: S = 8.0f32.into();
    // H(x) ~ x near zero and H(x) ~ 2√x + c at infinity; both provide a
    // usable starting guess.
    let mut x = if u < threshold {
        u
    } else {
        let offset = arc_integral_series(two) - arc_integral_tail(two);
        let shifted = (u - offset) / two;
        shifted * shifted
    };
    let tolerance = (S::one() + u.abs()) * S::epsilon() * eight;
    for _ in 0..60 {
        let residual = parabola_arc_integral(x) - u;
        if residual.abs() <= tolerance {
            break;
        }
        // H'(x) = (1+x²)^(-1/4)
        x = x - residual * (S::one() + x * x).powf(quarter);
    }
    x
}

/// Abscissas subdividing the parabola `y = a/2 + x²/(2a)` on `[x1, x2]` so
/// that the polyline through the returned points has Hausdorff distance at
/// most `delta` from the arc. The returned sequence starts with `x1` and ends
/// with `x2`.
pub fn approxparabola<S: OffsetNum>(a: S, x1: S, x2: S, delta: S) -> Vec<S> {
    debug_assert!(a > S::zero());
    debug_assert!(delta > S::zero());
    let eight: S = 8.0f32.into();

    // Rescale to the unit parabola y = x²/2; distances scale by 1/a.
    let u1 = parabola_arc_integral(x1 / a);
    let u2 = parabola_arc_integral(x2 / a);
    let step = (eight * delta / a).sqrt();
    let count = ((u2 - u1).abs() / step).ceil();
    let count = num_traits::ToPrimitive::to_usize(&count).unwrap_or(1).max(1);

    let mut result = Vec::with_capacity(count + 1);
    result.push(x1);
    for i in 1..count {
        let numerator: S = (i as f32).into();
        let denominator: S = (count as f32).into();
        let u = u1 + (u2 - u1) * (numerator / denominator);
        result.push(a * parabola_arc_inverse(u));
    }
    result.push(x2);
    result
}

/// Circumcenter of a triangle together with the squared circumradius.
pub fn circumcenter<S: OffsetNum>(positions: [Point2<S>; 3]) -> (Point2<S>, S) {
    let [v0, v1, v2] = positions;
    let b = v1.sub(v0);
    let c = v2.sub(v0);

    let one = S::one();
    let two = one + one;
    let d = two * (b.x * c.y - c.x * b.y);
    let len_b = b.dot(b);
    let len_c = c.dot(c);
    let d_inv: S = one / d;

    let x = (len_b * c.y - len_c * b.y) * d_inv;
    let y = (-len_b * c.x + len_c * b.x) * d_inv;
    let result = Point2::new(x, y);
    (result.add(v0), x * x + y * y)
}

/// Real roots of `a·x² + b·x + c`, in the numerically stable formulation.
///
/// Returns `None` when there is no root; a linear equation yields a single
/// root reported twice.
pub(crate) fn quadratic_roots<S: OffsetNum>(a: S, b: S, c: S) -> Option<(S, S)> {
    let two: S = 2.0f32.into();
    let four: S = 4.0f32.into();
    if a == S::zero() {
        if b == S::zero() {
            return None;
        }
        let root = -c / b;
        return Some((root, root));
    }
    let discriminant = b * b - four * a * c;
    if discriminant < S::zero() {
        return None;
    }
    let q = -(b + b.signum() * discriminant.sqrt()) / two;
    if q == S::zero() {
        return Some((S::zero(), S::zero()));
    }
    Some((q / a, c / q))
}

/// Minimum of `a·x² + 2·b·x + c` on `[x1, x2]`, returned as `(argmin, min)`.
pub fn min_quadratic<S: OffsetNum>(coefficients: (S, S, S), interval: (S, S)) -> (S, S) {
    let (a, b, c) = coefficients;
    let (x1, x2) = interval;
    let value = |x: S| (a * x + b + b) * x + c;

    let mut best = (x1, value(x1));
    let at_x2 = value(x2);
    if at_x2 < best.1 {
        best = (x2, at_x2);
    }
    if a > S::zero() {
        let vertex = -b / a;
        if vertex > x1 && vertex < x2 {
            let at_vertex = value(vertex);
            if at_vertex < best.1 {
                best = (vertex, at_vertex);
            }
        }
    }
    best
}

/// Minimum of the quartic `f[0] + f[1]·x + f[2]·x² + f[3]·x³ + f[4]·x⁴` on
/// `[x1, x2]`, returned as `(argmin, min)`.
///
/// The interior critical point is located by a bounded Newton iteration on
/// the derivative, started from the interval midpoint; the result is compared
/// against both endpoints.
pub fn min_quartic<S: OffsetNum>(f: [S; 5], interval: (S, S)) -> (S, S) {
    let (x1, x2) = interval;
    let value = |x: S| (((f[4] * x + f[3]) * x + f[2]) * x + f[1]) * x + f[0];

    let two: S = 2.0f32.into();
    let three: S = 3.0f32.into();
    let four: S = 4.0f32.into();
    let six: S = 6.0f32.into();
    let twelve: S = 12.0f32.into();
    let derivative = |x: S| ((four * f[4] * x + three * f[3]) * x + two * f[2]) * x + f[1];
    let second = |x: S| (twelve * f[4] * x + six * f[3]) * x + two * f[2];

    let mut x = (x1 + x2) / two;
    for _ in 0..40 {
        let d1 = derivative(x);
        let d2 = second(x);
        if d2 == S::zero() {
            break;
        }
        let next = (x - d1 / d2).max(x1).min(x2);
        let tolerance: S = 1.0e-12f32.into();
        if (next - x).abs() <= (x2 - x1).abs() * tolerance {
            x = next;
            break;
        }
        x = next;
    }

    let mut best = (x1, value(x1));
    let at_x2 = value(x2);
    if at_x2 < best.1 {
        best = (x2, at_x2);
    }
    if x > x1 && x < x2 {
        let at_x = value(x);
        if at_x < best.1 {
            best = (x, at_x);
        }
    }
    best
}
