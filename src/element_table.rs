use log::{debug, warn};

use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// Node to element and node to node adjacency of a mesh.
///
/// The table is a snapshot: it has to be rebuilt after the mesh's nodes or elements change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementTable {
    elements_around: Vec<Vec<usize>>,
    nodes_around: Vec<Vec<usize>>,
    max_elements_around_node: usize,
    max_nodes_around_node: usize,
}

impl ElementTable {
    /// Builds the table for every node of `mesh`.
    pub fn new(mesh: &Mesh) -> Self {
        let mut elements_around = vec![Vec::new(); mesh.num_nodes()];
        for (e, element) in mesh.elements().iter().enumerate() {
            for &n in element.nodes() {
                elements_around[n].push(e);
            }
        }

        let nodes_around: Vec<Vec<usize>> = elements_around
            .iter()
            .enumerate()
            .map(|(n, elements)| {
                let mut neighbors: Vec<usize> = elements
                    .iter()
                    .flat_map(|&e| mesh.elements()[e].nodes().iter().copied())
                    .filter(|&m| m != n)
                    .collect();
                neighbors.sort_unstable();
                neighbors.dedup();
                neighbors
            })
            .collect();

        let orphans = elements_around.iter().filter(|e| e.is_empty()).count();
        if orphans > 0 {
            warn!("{orphans} nodes are not connected to any element");
        }

        let max_elements_around_node = elements_around.iter().map(Vec::len).max().unwrap_or(0);
        let max_nodes_around_node = nodes_around.iter().map(Vec::len).max().unwrap_or(0);
        debug!(
            "element table built for {} nodes (max {} elements, {} neighbors per node)",
            elements_around.len(),
            max_elements_around_node,
            max_nodes_around_node
        );

        Self {
            elements_around,
            nodes_around,
            max_elements_around_node,
            max_nodes_around_node,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.elements_around.len()
    }

    /// Indices of the elements that have `node` as a vertex, in element order.
    pub fn elements_around_node(&self, node: usize) -> Result<&[usize]> {
        self.elements_around
            .get(node)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::out_of_bounds("node", node, self.num_nodes()))
    }

    /// Indices of the nodes sharing an element with `node`, sorted and without `node` itself.
    pub fn nodes_around_node(&self, node: usize) -> Result<&[usize]> {
        self.nodes_around
            .get(node)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::out_of_bounds("node", node, self.num_nodes()))
    }

    pub fn num_elements_around_node(&self, node: usize) -> Result<usize> {
        Ok(self.elements_around_node(node)?.len())
    }

    pub fn num_nodes_around_node(&self, node: usize) -> Result<usize> {
        Ok(self.nodes_around_node(node)?.len())
    }

    /// The `i`-th element around `node`.
    pub fn element_around_node(&self, node: usize, i: usize) -> Result<usize> {
        let elements = self.elements_around_node(node)?;
        elements
            .get(i)
            .copied()
            .ok_or_else(|| Error::out_of_bounds("element around node", i, elements.len()))
    }

    /// The `i`-th neighbor of `node`.
    pub fn node_around_node(&self, node: usize, i: usize) -> Result<usize> {
        let nodes = self.nodes_around_node(node)?;
        nodes
            .get(i)
            .copied()
            .ok_or_else(|| Error::out_of_bounds("node around node", i, nodes.len()))
    }

    pub fn max_elements_around_node(&self) -> usize {
        self.max_elements_around_node
    }

    pub fn max_nodes_around_node(&self) -> usize {
        self.max_nodes_around_node
    }

    /// Dense node by element table, each row padded with `None` to
    /// [`max_elements_around_node`](Self::max_elements_around_node).
    pub fn full_element_table(&self) -> Vec<Vec<Option<usize>>> {
        pad(&self.elements_around, self.max_elements_around_node)
    }

    /// Dense node by neighbor table, each row padded with `None` to
    /// [`max_nodes_around_node`](Self::max_nodes_around_node).
    pub fn full_node_table(&self) -> Vec<Vec<Option<usize>>> {
        pad(&self.nodes_around, self.max_nodes_around_node)
    }
}

fn pad(rows: &[Vec<usize>], width: usize) -> Vec<Vec<Option<usize>>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .copied()
                .map(Some)
                .chain(std::iter::repeat(None))
                .take(width)
                .collect()
        })
        .collect()
}
