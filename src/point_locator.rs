use rayon::prelude::*;
use smallvec::SmallVec;

use crate::element::Weights;
use crate::error::Result;
use crate::mesh::Mesh;
use crate::spatial_index::SpatialIndex;

/// Number of nearest element centers tested for containment by default.
pub const DEFAULT_SEARCH_DEPTH: usize = 20;

/// A trait to locate one or several query points within a mesh.
pub trait PointLocator {
    /// Locates one query point within a mesh.
    ///
    /// Returns [`None`] if the query point does not lie in any cell of the mesh.
    fn locate_one(&self, point: &[f64; 2]) -> Option<usize>;

    /// Locates several query points within a mesh.
    fn locate_many(&self, points: &[[f64; 2]]) -> Vec<Option<usize>> {
        points.iter().map(|point| self.locate_one(point)).collect()
    }

    /// Locates several query points within a mesh in parallel.
    fn par_locate_many(&self, points: &[[f64; 2]]) -> Vec<Option<usize>>
    where
        Self: std::marker::Sync,
    {
        points
            .par_iter()
            .map(|point| self.locate_one(point))
            .collect()
    }
}

/// The element containing a point together with the weights of its vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolant {
    pub element: usize,
    /// Node indices of the element vertices.
    pub nodes: SmallVec<[usize; 4]>,
    pub weights: Weights,
}

impl Interpolant {
    /// Evaluates nodal `values` at the located point.
    pub fn apply(&self, values: &[f64]) -> f64 {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&n, w)| values[n] * w)
            .sum()
    }
}

/// Locates points in the elements of a [`Mesh`].
///
/// Candidates are the elements whose centers are nearest to the query point, taken from the
/// mesh's elemental search tree and tested in order of distance.
#[derive(Debug, Clone, Copy)]
pub struct ElementLocator<'a> {
    mesh: &'a Mesh,
    tree: &'a SpatialIndex,
    search_depth: usize,
}

impl<'a> ElementLocator<'a> {
    /// Fails if the elemental search tree of `mesh` has not been built.
    pub fn new(mesh: &'a Mesh) -> Result<Self> {
        Ok(Self {
            mesh,
            tree: mesh.elemental_search_tree()?,
            search_depth: DEFAULT_SEARCH_DEPTH,
        })
    }

    /// Sets how many candidate elements are tested before giving up.
    pub fn with_search_depth(mut self, search_depth: usize) -> Self {
        self.search_depth = search_depth.max(1);
        self
    }

    /// Locates `(x, y)` and computes its interpolation weights.
    pub fn interpolant(&self, x: f64, y: f64) -> Result<Option<Interpolant>> {
        let Some(element) = self.locate_one(&[x, y]) else {
            return Ok(None);
        };
        let e = &self.mesh.elements()[element];
        let weights = e.interpolation_weights(self.mesh.nodes(), x, y)?;
        Ok(Some(Interpolant {
            element,
            nodes: SmallVec::from_slice(e.nodes()),
            weights,
        }))
    }

    /// [`ElementLocator::interpolant`] for many points, in parallel.
    pub fn par_interpolants(&self, points: &[[f64; 2]]) -> Result<Vec<Option<Interpolant>>> {
        points
            .par_iter()
            .map(|&[x, y]| self.interpolant(x, y))
            .collect()
    }
}

impl PointLocator for ElementLocator<'_> {
    fn locate_one(&self, &[x, y]: &[f64; 2]) -> Option<usize> {
        let nodes = self.mesh.nodes();
        self.tree
            .nearest_n(x, y, self.search_depth)
            .into_iter()
            .find(|&e| self.mesh.elements()[e].is_inside(nodes, x, y))
    }
}
