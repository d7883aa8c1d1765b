use crate::geometry::Point;

/// A mesh vertex.
///
/// The `id` is the label used in mesh files. It is unique within a mesh but does not have to
/// match the node's position in the node array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn coords(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Formats the node as a line of an ADCIRC ASCII mesh.
    ///
    /// Geographic coordinates are written with ten decimals, projected ones with four.
    pub fn to_adcirc_string(&self, geographic: bool) -> String {
        if geographic {
            format!(
                "{:>11}   {:>14.10}   {:>14.10}  {:>14.10}",
                self.id, self.x, self.y, self.z
            )
        } else {
            format!(
                "{:>11}   {:>14.4}   {:>14.4}  {:>14.4}",
                self.id, self.x, self.y, self.z
            )
        }
    }

    /// Formats the node as an `ND` card of an Aquaveo 2dm mesh.
    pub fn to_2dm_string(&self) -> String {
        let Node { id, x, y, z } = self;
        format!("ND {id} {x:.8e} {y:.8e} {z:.8e}")
    }
}

impl From<&Node> for [f64; 2] {
    fn from(node: &Node) -> Self {
        node.coords()
    }
}
