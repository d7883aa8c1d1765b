use itertools::Itertools;

/// Earth radius in meters (Clarke 1866 semi-major axis) used for great-circle distances.
pub const EARTH_RADIUS: f64 = 6_378_206.4;

/// Tolerance, relative to the edge length, within which a point counts as lying on an edge.
const ON_EDGE_TOLERANCE: f64 = 1e-12;

/// A point of the 2D plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<&Point> for [f64; 2] {
    fn from(p: &Point) -> Self {
        [p.x, p.y]
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<&[f64; 2]> for Point {
    fn from(&[x, y]: &[f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Side of a directed line a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    On,
    Right,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Twice the signed area of the triangle `(p1, p2, self)`, positive when `self` is left of
    /// the line from `p1` to `p2`.
    fn cross(&self, [x1, y1]: [f64; 2], [x2, y2]: [f64; 2]) -> f64 {
        (x2 - x1) * (self.y - y1) - (self.x - x1) * (y2 - y1)
    }

    pub(crate) fn side_of<T: Into<[f64; 2]>>(&self, p1: T, p2: T) -> Side {
        match self.cross(p1.into(), p2.into()).total_cmp(&0.) {
            std::cmp::Ordering::Greater => Side::Left,
            std::cmp::Ordering::Less => Side::Right,
            std::cmp::Ordering::Equal => Side::On,
        }
    }

    /// Returns `true` if the point lies on the closed segment `[p1, p2]`.
    pub(crate) fn is_on_segment<T: Into<[f64; 2]>>(&self, p1: T, p2: T) -> bool {
        let ([x1, y1], [x2, y2]) = (p1.into(), p2.into());
        let len2 = (x2 - x1).powi(2) + (y2 - y1).powi(2);
        if len2 == 0. {
            return self.x == x1 && self.y == y1;
        }
        if self.cross([x1, y1], [x2, y2]).abs() > ON_EDGE_TOLERANCE * len2.max(1.) {
            return false;
        }
        let dot = (self.x - x1) * (x2 - x1) + (self.y - y1) * (y2 - y1);
        dot >= -ON_EDGE_TOLERANCE * len2 && dot <= len2 * (1. + ON_EDGE_TOLERANCE)
    }

    /// Number of times the closed `ring` winds around the point, counter-clockwise turns
    /// counting positive.
    ///
    /// An edge counts when it crosses the horizontal line through the point with the point on
    /// its inner side; edges are half-open in `y` so that a vertex is never counted twice.
    pub fn winding_number<I>(&self, ring: I) -> isize
    where
        I: IntoIterator,
        I::IntoIter: Clone + ExactSizeIterator,
        I::Item: Into<[f64; 2]> + Clone,
    {
        ring.into_iter()
            .circular_tuple_windows()
            .map(|(a, b)| {
                let ([_, ya], [_, yb]) = (a.clone().into(), b.clone().into());
                let upward = ya <= self.y && yb > self.y;
                let downward = ya > self.y && yb <= self.y;
                match self.side_of(a, b) {
                    Side::Left if upward => 1,
                    Side::Right if downward => -1,
                    _ => 0,
                }
            })
            .sum()
    }

    /// Returns `true` if the winding number of `ring` around the point is not zero.
    ///
    /// Points on right or top edges are outside, so a point on an edge shared by two cells
    /// belongs to only one of them. Use [`Point::is_covered_by`] to include every edge.
    pub fn is_inside<I>(&self, ring: I) -> bool
    where
        I: IntoIterator,
        I::IntoIter: Clone + ExactSizeIterator,
        I::Item: Into<[f64; 2]> + Clone,
    {
        self.winding_number(ring) != 0
    }

    /// Returns `true` if the point is inside `ring` or on any of its edges.
    pub fn is_covered_by<I>(&self, ring: I) -> bool
    where
        I: IntoIterator,
        I::IntoIter: Clone + ExactSizeIterator,
        I::Item: Into<[f64; 2]> + Clone,
    {
        let ring = ring.into_iter();
        self.winding_number(ring.clone()) != 0
            || ring
                .circular_tuple_windows()
                .any(|(a, b)| self.is_on_segment(a, b))
    }

    /// Planar distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Great-circle distance in meters, reading `x` as longitude and `y` as latitude in degrees.
    pub fn geodesic_distance(&self, other: &Point) -> f64 {
        let phi1 = self.y.to_radians();
        let phi2 = other.y.to_radians();
        let dphi = phi2 - phi1;
        let dlambda = (other.x - self.x).to_radians();
        let a = (dphi / 2.).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.).sin().powi(2);
        2. * EARTH_RADIUS * a.sqrt().atan2((1. - a).sqrt())
    }
}
