use std::cmp::Ordering;

use itertools::Itertools;
use log::warn;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::node::Node;

/// Interpolation weights, one per element vertex.
pub type Weights = SmallVec<[f64; 4]>;

/// A triangular or quadrilateral mesh cell.
///
/// Vertices are stored as indices into the owning mesh's node array, in the order they were
/// given. Methods that need coordinates take that node array as an argument; passing any other
/// slice is a logic error and may panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: usize,
    nodes: SmallVec<[usize; 4]>,
}

impl Element {
    /// Creates an element from 3 or 4 node indices.
    pub fn new(id: usize, nodes: &[usize]) -> Result<Self> {
        if nodes.len() != 3 && nodes.len() != 4 {
            return Err(Error::InvalidElement {
                id,
                message: format!("expected 3 or 4 vertices, got {}", nodes.len()),
            });
        }
        Ok(Self {
            id,
            nodes: SmallVec::from_slice(nodes),
        })
    }

    pub fn triangle(id: usize, n1: usize, n2: usize, n3: usize) -> Self {
        Self {
            id,
            nodes: SmallVec::from_slice(&[n1, n2, n3]),
        }
    }

    pub fn quadrilateral(id: usize, n1: usize, n2: usize, n3: usize, n4: usize) -> Self {
        Self {
            id,
            nodes: SmallVec::from_slice(&[n1, n2, n3, n4]),
        }
    }

    /// Number of vertices.
    pub fn n(&self) -> usize {
        self.nodes.len()
    }

    /// Node indices of the vertices.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Node index of vertex `i`.
    pub fn node(&self, i: usize) -> Result<usize> {
        self.nodes
            .get(i)
            .copied()
            .ok_or_else(|| Error::out_of_bounds("element vertex", i, self.n()))
    }

    pub fn set_node(&mut self, i: usize, node: usize) -> Result<()> {
        let n = self.n();
        let slot = self
            .nodes
            .get_mut(i)
            .ok_or_else(|| Error::out_of_bounds("element vertex", i, n))?;
        *slot = node;
        Ok(())
    }

    /// Lowers every node index above `removed` by one.
    pub(crate) fn shift_nodes_after(&mut self, removed: usize) {
        for n in self.nodes.iter_mut().filter(|n| **n > removed) {
            *n -= 1;
        }
    }

    /// Edges of the element as pairs of node indices, closing back on the first vertex.
    pub fn legs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes.iter().copied().circular_tuple_windows()
    }

    /// Vertex coordinates, in storage order.
    pub fn vertices<'a>(
        &'a self,
        nodes: &'a [Node],
    ) -> impl Iterator<Item = [f64; 2]> + Clone + ExactSizeIterator + 'a {
        self.nodes.iter().map(move |&i| nodes[i].coords())
    }

    /// Arithmetic mean of the vertex coordinates.
    pub fn center(&self, nodes: &[Node]) -> Point {
        let n = self.n() as f64;
        let (sx, sy) = self
            .vertices(nodes)
            .fold((0., 0.), |(sx, sy), [x, y]| (sx + x, sy + y));
        Point::new(sx / n, sy / n)
    }

    /// Area centroid of the element polygon.
    pub fn centroid(&self, nodes: &[Node]) -> Point {
        let coords: SmallVec<[[f64; 2]; 4]> = self.vertices(nodes).collect();
        polygon_centroid(&coords)
    }

    /// Unsigned area of the element polygon.
    pub fn area(&self, nodes: &[Node]) -> f64 {
        signed_area(self.vertices(nodes)).abs()
    }

    /// Average length of the element's legs, in meters when `geodesic` is set.
    pub fn element_size(&self, nodes: &[Node], geodesic: bool) -> f64 {
        let total: f64 = self
            .legs()
            .map(|(a, b)| {
                let (pa, pb) = (nodes[a].point(), nodes[b].point());
                if geodesic {
                    pa.geodesic_distance(&pb)
                } else {
                    pa.distance(&pb)
                }
            })
            .sum();
        total / self.n() as f64
    }

    /// Returns `true` if `(x, y)` lies inside the element or on its boundary.
    pub fn is_inside(&self, nodes: &[Node], x: f64, y: f64) -> bool {
        Point::new(x, y).is_covered_by(self.vertices(nodes))
    }

    /// Reorders the vertices clockwise around the element centroid.
    ///
    /// Elements are never reordered implicitly; call this explicitly when a consistent
    /// winding is required.
    pub fn sort_clockwise(&mut self, nodes: &[Node]) {
        let center = self.centroid(nodes);
        self.nodes
            .sort_by(|&a, &b| clockwise_cmp(nodes[a].coords(), nodes[b].coords(), center));
    }

    /// Computes the weights that reproduce the value at `(x, y)` from the vertex values.
    ///
    /// Triangles use barycentric coordinates (which extrapolate linearly outside the triangle).
    /// Quadrilaterals are split into a fan of triangles around their center and fail with
    /// [`Error::PointOutsideElement`] when no triangle of the fan covers the point.
    pub fn interpolation_weights(&self, nodes: &[Node], x: f64, y: f64) -> Result<Weights> {
        let coords: SmallVec<[[f64; 2]; 4]> = self.vertices(nodes).collect();
        if self.n() == 3 {
            let tri = [coords[0], coords[1], coords[2]];
            match barycentric_weights(tri, x, y) {
                Some(w) => Ok(SmallVec::from_slice(&w)),
                None => {
                    warn!("element {} is degenerate, using equal weights", self.id);
                    Ok(SmallVec::from_elem(1. / 3., 3))
                }
            }
        } else {
            polygon_weights(&coords, x, y).ok_or(Error::PointOutsideElement {
                element: self.id,
                x,
                y,
            })
        }
    }

    /// Formats the element as a line of an ADCIRC ASCII mesh.
    pub fn to_adcirc_string(&self, nodes: &[Node]) -> String {
        let mut line = format!("{:>11} {:>3}", self.id, self.n());
        for &i in &self.nodes {
            line.push_str(&format!(" {:>11}", nodes[i].id));
        }
        line
    }

    /// Formats the element as an `E3T`/`E4Q` card of an Aquaveo 2dm mesh.
    pub fn to_2dm_string(&self, nodes: &[Node]) -> String {
        let card = if self.n() == 3 { "E3T" } else { "E4Q" };
        let ids = self.nodes.iter().map(|&i| nodes[i].id).join(" ");
        format!("{card} {} {ids} 1", self.id)
    }
}

/// Barycentric weights of `(x, y)` in the triangle `p`.
///
/// Returns `None` when the triangle has no area.
pub(crate) fn barycentric_weights(p: [[f64; 2]; 3], x: f64, y: f64) -> Option<[f64; 3]> {
    let [[x1, y1], [x2, y2], [x3, y3]] = p;
    let denom = (y2 - y3) * (x1 - x3) + (x3 - x2) * (y1 - y3);
    if denom == 0. || !denom.is_finite() {
        return None;
    }
    let w0 = ((y2 - y3) * (x - x3) + (x3 - x2) * (y - y3)) / denom;
    let w1 = ((y3 - y1) * (x - x3) + (x1 - x3) * (y - y3)) / denom;
    Some([w0, w1, 1. - w0 - w1])
}

/// Weights of `(x, y)` in a convex polygon, computed on a fan of triangles around the
/// arithmetic center of the polygon.
///
/// The weight of the center is shared equally between all vertices, so the weights always sum
/// to one. Returns `None` when no triangle of the fan covers the point.
pub(crate) fn polygon_weights(coords: &[[f64; 2]], x: f64, y: f64) -> Option<Weights> {
    let n = coords.len();
    let centroid = polygon_centroid(coords);
    let mut order: SmallVec<[usize; 4]> = (0..n).collect();
    order.sort_by(|&a, &b| clockwise_cmp(coords[a], coords[b], centroid));

    let (sx, sy) = coords
        .iter()
        .fold((0., 0.), |(sx, sy), &[x, y]| (sx + x, sy + y));
    let mid = [sx / n as f64, sy / n as f64];

    let query = Point::new(x, y);
    for (&a, &b) in order.iter().circular_tuple_windows() {
        let tri = [coords[a], coords[b], mid];
        if !query.is_covered_by(tri) {
            continue;
        }
        let Some([wa, wb, wm]) = barycentric_weights(tri, x, y) else {
            continue;
        };
        let mut weights: Weights = SmallVec::from_elem(wm / n as f64, n);
        weights[a] += wa;
        weights[b] += wb;
        return Some(weights);
    }
    None
}

fn signed_area<I>(vertices: I) -> f64
where
    I: Iterator<Item = [f64; 2]> + Clone + ExactSizeIterator,
{
    0.5 * vertices
        .circular_tuple_windows()
        .map(|([x1, y1], [x2, y2])| x1 * y2 - x2 * y1)
        .sum::<f64>()
}

fn polygon_centroid(coords: &[[f64; 2]]) -> Point {
    let n = coords.len() as f64;
    let area = signed_area(coords.iter().copied());
    if area.abs() <= f64::EPSILON * coords.iter().map(|&[x, y]| x * x + y * y).sum::<f64>() {
        let (sx, sy) = coords
            .iter()
            .fold((0., 0.), |(sx, sy), &[x, y]| (sx + x, sy + y));
        return Point::new(sx / n, sy / n);
    }
    let (cx, cy) = coords.iter().circular_tuple_windows().fold(
        (0., 0.),
        |(cx, cy), (&[x1, y1], &[x2, y2])| {
            let cross = x1 * y2 - x2 * y1;
            (cx + (x1 + x2) * cross, cy + (y1 + y2) * cross)
        },
    );
    Point::new(cx / (6. * area), cy / (6. * area))
}

/// Orders points clockwise around `center`, starting from twelve o'clock.
///
/// Points on the same ray from the center are ordered from the farthest to the closest.
fn clockwise_cmp([ax, ay]: [f64; 2], [bx, by]: [f64; 2], center: Point) -> Ordering {
    let before = |(ax, ay): (f64, f64), (bx, by): (f64, f64)| -> bool {
        if ax >= 0. && bx < 0. {
            return true;
        }
        if ax < 0. && bx >= 0. {
            return false;
        }
        if ax == 0. && bx == 0. {
            if ay >= 0. || by >= 0. {
                return ay > by;
            }
            return by > ay;
        }
        let det = ax * by - bx * ay;
        if det != 0. {
            return det < 0.;
        }
        ax * ax + ay * ay > bx * bx + by * by
    };
    let a = (ax - center.x, ay - center.y);
    let b = (bx - center.x, by - center.y);
    if before(a, b) {
        Ordering::Less
    } else if before(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn unit_square() -> (Vec<Node>, Element) {
        let nodes = vec![
            Node::new(1, 0., 0., 0.),
            Node::new(2, 1., 0., 1.),
            Node::new(3, 1., 1., 2.),
            Node::new(4, 0., 1., 3.),
        ];
        (nodes, Element::quadrilateral(1, 0, 1, 2, 3))
    }

    fn interpolate(element: &Element, nodes: &[Node], x: f64, y: f64) -> f64 {
        let weights = element.interpolation_weights(nodes, x, y).unwrap();
        element
            .nodes()
            .iter()
            .zip(&weights)
            .map(|(&i, w)| nodes[i].z * w)
            .sum()
    }

    #[test]
    fn element_needs_three_or_four_vertices() {
        assert!(Element::new(1, &[0, 1]).is_err());
        assert!(Element::new(1, &[0, 1, 2, 3, 4]).is_err());
        assert_eq!(Element::new(1, &[0, 1, 2]).unwrap().n(), 3);
        assert_eq!(Element::new(1, &[0, 1, 2, 3]).unwrap().n(), 4);
    }

    #[test]
    fn vertex_access_is_bounds_checked() {
        let mut element = Element::triangle(1, 4, 5, 6);

        assert_eq!(element.node(2).unwrap(), 6);
        assert!(element.node(3).is_err());
        assert!(element.set_node(3, 0).is_err());
        element.set_node(0, 9).unwrap();
        assert_eq!(element.nodes(), &[9, 5, 6]);
    }

    #[test]
    fn legs_close_the_ring() {
        let element = Element::quadrilateral(1, 0, 1, 2, 3);

        assert_eq!(
            element.legs().collect::<Vec<_>>(),
            vec![(0, 1), (1, 2), (2, 3), (3, 0)]
        );
    }

    #[test]
    fn square_geometry() {
        let (nodes, element) = unit_square();

        assert_relative_eq!(element.area(&nodes), 1.);
        assert_relative_eq!(element.element_size(&nodes, false), 1.);
        assert_eq!(element.center(&nodes), Point::new(0.5, 0.5));
        let c = element.centroid(&nodes);
        assert_relative_eq!(c.x, 0.5);
        assert_relative_eq!(c.y, 0.5);
    }

    #[test]
    fn square_centroid_interpolates_to_the_mean() {
        let (nodes, element) = unit_square();

        assert_eq!(interpolate(&element, &nodes, 0.5, 0.5), 1.5);
    }

    #[rstest]
    #[case(0., 0., 0.)]
    #[case(1., 0., 1.)]
    #[case(1., 1., 2.)]
    #[case(0., 1., 3.)]
    fn square_vertices_reproduce_their_values(#[case] x: f64, #[case] y: f64, #[case] z: f64) {
        let (nodes, element) = unit_square();

        assert_relative_eq!(interpolate(&element, &nodes, x, y), z, epsilon = 1e-12);
    }

    #[test]
    fn point_outside_quadrilateral_is_an_error() {
        let (nodes, element) = unit_square();

        let err = element.interpolation_weights(&nodes, 2., 2.).unwrap_err();
        assert!(matches!(err, Error::PointOutsideElement { element: 1, .. }));
    }

    #[rstest]
    #[case([0., 0.], [1., 0., 0.])]
    #[case([1., 0.], [0., 1., 0.])]
    #[case([0., 1.], [0., 0., 1.])]
    #[case([0.5, 0.], [0.5, 0.5, 0.])]
    fn barycentric_weights_of_known_points(#[case] p: [f64; 2], #[case] expected: [f64; 3]) {
        let tri = [[0., 0.], [1., 0.], [0., 1.]];

        let w = barycentric_weights(tri, p[0], p[1]).unwrap();
        for (w, e) in w.iter().zip(expected) {
            assert_relative_eq!(*w, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn degenerate_triangle_gets_equal_weights() {
        let nodes = vec![
            Node::new(1, 0., 0., 0.),
            Node::new(2, 1., 1., 0.),
            Node::new(3, 2., 2., 0.),
        ];
        let element = Element::triangle(1, 0, 1, 2);

        let w = element.interpolation_weights(&nodes, 1., 1.).unwrap();
        assert_eq!(w.as_slice(), &[1. / 3.; 3]);
    }

    #[test]
    fn sort_clockwise_reorders_counter_clockwise_square() {
        let (nodes, mut element) = unit_square();

        element.sort_clockwise(&nodes);

        // Starting from twelve o'clock: top right, bottom right, bottom left, top left
        assert_eq!(element.nodes(), &[2, 1, 0, 3]);
    }

    #[test]
    fn containment_includes_boundary() {
        let (nodes, element) = unit_square();

        assert!(element.is_inside(&nodes, 0.5, 0.5));
        assert!(element.is_inside(&nodes, 1., 0.5));
        assert!(element.is_inside(&nodes, 1., 1.));
        assert!(!element.is_inside(&nodes, 1.01, 0.5));
    }

    #[test]
    fn adcirc_and_2dm_strings() {
        let nodes = vec![
            Node::new(10, 0., 0., 0.),
            Node::new(20, 1., 0., 0.),
            Node::new(30, 0., 1., 0.),
        ];
        let element = Element::triangle(5, 0, 1, 2);

        assert_eq!(
            element.to_adcirc_string(&nodes),
            "          5   3          10          20          30"
        );
        assert_eq!(element.to_2dm_string(&nodes), "E3T 5 10 20 30 1");
    }

    prop_compose! {
        fn coords_in_range(xmin: f64, xmax: f64, ymin: f64, ymax: f64)
                          (x in xmin..xmax, y in ymin..ymax) -> [f64; 2] {
           [x, y]
        }
    }

    proptest! {
        #[test]
        fn barycentric_weights_inside_triangle(
            a in coords_in_range(-10., 10., -10., 10.),
            b in coords_in_range(-10., 10., -10., 10.),
            c in coords_in_range(-10., 10., -10., 10.),
            s in 0.01f64..0.98,
            t in 0.01f64..0.98,
        ) {
            let area = ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs();
            prop_assume!(area > 1e-3);
            // Fold the sample back into the triangle
            let (s, t) = if s + t > 1. { (1. - s, 1. - t) } else { (s, t) };
            let x = a[0] + s * (b[0] - a[0]) + t * (c[0] - a[0]);
            let y = a[1] + s * (b[1] - a[1]) + t * (c[1] - a[1]);

            let w = barycentric_weights([a, b, c], x, y).unwrap();

            prop_assert!((w.iter().sum::<f64>() - 1.).abs() < 1e-9);
            for w in w {
                prop_assert!((-1e-9..=1. + 1e-9).contains(&w));
            }
        }

        #[test]
        fn quadrilateral_weights_sum_to_one_and_do_not_overshoot(
            x in 0.0f64..=2.,
            y in 0.0f64..=1.,
            z in proptest::collection::vec(-5.0f64..5., 4),
        ) {
            let nodes = vec![
                Node::new(1, 0., 0., z[0]),
                Node::new(2, 2., 0., z[1]),
                Node::new(3, 2., 1., z[2]),
                Node::new(4, 0., 1., z[3]),
            ];
            let element = Element::quadrilateral(1, 0, 1, 2, 3);

            let w = element.interpolation_weights(&nodes, x, y).unwrap();
            prop_assert!((w.iter().sum::<f64>() - 1.).abs() < 1e-9);

            let value = interpolate(&element, &nodes, x, y);
            let zmin = z.iter().copied().fold(f64::INFINITY, f64::min);
            let zmax = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(value >= zmin - 1e-9 && value <= zmax + 1e-9);
        }
    }
}
