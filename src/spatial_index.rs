use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// A 2D nearest-neighbour index over a set of points.
///
/// Each point is stored with its position in the slice it was built from, which is what the
/// queries return.
#[derive(Clone, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len())
            .finish()
    }
}

impl SpatialIndex {
    /// Bulk loads the index.
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let points = points
            .into_iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new(p, i))
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the point nearest to `(x, y)`, `None` if the index is empty.
    pub fn nearest(&self, x: f64, y: f64) -> Option<usize> {
        self.tree.nearest_neighbor(&[x, y]).map(|p| p.data)
    }

    /// Indices of the `n` points nearest to `(x, y)`, closest first.
    pub fn nearest_n(&self, x: f64, y: f64, n: usize) -> Vec<usize> {
        self.tree
            .nearest_neighbor_iter(&[x, y])
            .take(n)
            .map(|p| p.data)
            .collect()
    }

    /// Indices of all points within `radius` of `(x, y)`, boundary included, in no particular
    /// order.
    pub fn within_radius(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        self.tree
            .locate_within_distance([x, y], radius * radius)
            .map(|p| p.data)
            .collect()
    }
}
