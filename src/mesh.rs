use log::debug;
use smallvec::SmallVec;

use crate::boundary::{Boundary, BoundaryKind};
use crate::element::Element;
use crate::element_table::ElementTable;
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::id_index::IdIndex;
use crate::node::Node;
use crate::point_locator::{ElementLocator, PointLocator};
use crate::projection::{CoordinateSystem, CoordinateTransform, Cpp, EPSG_UNDEFINED};
use crate::spatial_index::SpatialIndex;

/// An unstructured mesh of triangles and quadrilaterals.
///
/// Nodes and elements are owned by value. Elements and boundaries refer to nodes by their
/// position in [`Mesh::nodes`], never by id.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    title: String,
    nodes: Vec<Node>,
    elements: Vec<Element>,
    open_boundaries: Vec<Boundary>,
    land_boundaries: Vec<Boundary>,
    node_index: IdIndex,
    element_index: IdIndex,
    coordinate_system: CoordinateSystem,
    node_tree: Option<SpatialIndex>,
    element_tree: Option<SpatialIndex>,
}

impl Mesh {
    /// Creates a mesh from its nodes and elements.
    ///
    /// Fails if node or element ids are duplicated or if an element references a node index
    /// outside of `nodes`.
    pub fn new(title: impl Into<String>, nodes: Vec<Node>, elements: Vec<Element>) -> Result<Self> {
        for element in &elements {
            check_vertices(element, nodes.len())?;
        }
        let node_index = IdIndex::build("node", nodes.iter().map(|n| n.id))?;
        let element_index = IdIndex::build("element", elements.iter().map(|e| e.id))?;
        Ok(Self {
            title: title.into(),
            nodes,
            elements,
            node_index,
            element_index,
            ..Default::default()
        })
    }

    /// Creates a regular grid of `nx` by `ny` quadrilaterals covering
    /// `[xmin, xmax] x [ymin, ymax]`.
    ///
    /// Nodes and elements are numbered from left to right, then from bottom to top, starting at
    /// id 1. The coordinate system is left at its default and should be set by the caller.
    pub fn grid(xmin: f64, xmax: f64, ymin: f64, ymax: f64, nx: usize, ny: usize) -> Result<Self> {
        let nodes = grid_nodes(xmin, xmax, ymin, ymax, nx, ny)?;
        let elements = grid_cells(nx, ny)
            .enumerate()
            .map(|(e, [a, b, c, d])| Element::quadrilateral(e + 1, a, b, c, d))
            .collect();
        Self::new("grid", nodes, elements)
    }

    /// Same as [`Mesh::grid`] with every quadrilateral split into two triangles along its
    /// lower-left to upper-right diagonal.
    pub fn triangle_grid(
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Self> {
        let nodes = grid_nodes(xmin, xmax, ymin, ymax, nx, ny)?;
        let elements = grid_cells(nx, ny)
            .flat_map(|[a, b, c, d]| [[a, b, c], [a, c, d]])
            .enumerate()
            .map(|(e, [a, b, c])| Element::triangle(e + 1, a, b, c))
            .collect();
        Self::new("triangle grid", nodes, elements)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    /// Declares the coordinate system the node coordinates are expressed in, without
    /// transforming them.
    pub fn set_coordinate_system(&mut self, coordinate_system: CoordinateSystem) {
        self.coordinate_system = coordinate_system;
    }

    pub fn is_geographic(&self) -> bool {
        self.coordinate_system.geographic
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_open_boundaries(&self) -> usize {
        self.open_boundaries.len()
    }

    pub fn num_land_boundaries(&self) -> usize {
        self.land_boundaries.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn open_boundaries(&self) -> &[Boundary] {
        &self.open_boundaries
    }

    pub fn land_boundaries(&self) -> &[Boundary] {
        &self.land_boundaries
    }

    pub fn node(&self, index: usize) -> Result<&Node> {
        self.nodes
            .get(index)
            .ok_or_else(|| Error::out_of_bounds("node", index, self.nodes.len()))
    }

    pub fn element(&self, index: usize) -> Result<&Element> {
        self.elements
            .get(index)
            .ok_or_else(|| Error::out_of_bounds("element", index, self.elements.len()))
    }

    /// Position of the node with file id `id`.
    pub fn node_index_by_id(&self, id: usize) -> Result<usize> {
        self.node_index.resolve("node", id)
    }

    /// Position of the element with file id `id`.
    pub fn element_index_by_id(&self, id: usize) -> Result<usize> {
        self.element_index.resolve("element", id)
    }

    pub fn node_by_id(&self, id: usize) -> Result<&Node> {
        self.node(self.node_index_by_id(id)?)
    }

    pub fn element_by_id(&self, id: usize) -> Result<&Element> {
        self.element(self.element_index_by_id(id)?)
    }

    /// Returns `true` if node ids are `1..=n` in array order.
    pub fn node_ordering_is_sequential(&self) -> bool {
        self.node_index.is_sequential()
    }

    /// Returns `true` if element ids are `1..=n` in array order.
    pub fn element_ordering_is_sequential(&self) -> bool {
        self.element_index.is_sequential()
    }

    /// Moves node `index` in the plane. Search trees are not updated.
    pub fn set_node_position(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        let len = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or_else(|| Error::out_of_bounds("node", index, len))?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    pub fn set_node_elevation(&mut self, index: usize, z: f64) -> Result<()> {
        let len = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or_else(|| Error::out_of_bounds("node", index, len))?;
        node.z = z;
        Ok(())
    }

    /// Replaces every node elevation, e.g. with the output of a raster interpolation.
    pub fn set_z(&mut self, z: &[f64]) -> Result<()> {
        if z.len() != self.nodes.len() {
            return Err(Error::LengthMismatch {
                what: "elevation array",
                expected: self.nodes.len(),
                found: z.len(),
            });
        }
        for (node, &z) in self.nodes.iter_mut().zip(z) {
            node.z = z;
        }
        Ok(())
    }

    /// Appends `node`. Search trees are dropped.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        self.node_index = IdIndex::build("node", self.nodes.iter().chain([&node]).map(|n| n.id))?;
        self.nodes.push(node);
        self.clear_search_trees();
        Ok(())
    }

    /// Replaces node `index`. Search trees are dropped.
    pub fn replace_node(&mut self, index: usize, node: Node) -> Result<Node> {
        if index >= self.nodes.len() {
            return Err(Error::out_of_bounds("node", index, self.nodes.len()));
        }
        let ids = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| if i == index { node.id } else { n.id });
        self.node_index = IdIndex::build("node", ids)?;
        self.clear_search_trees();
        Ok(std::mem::replace(&mut self.nodes[index], node))
    }

    /// Removes node `index`, shifting the following nodes down one position.
    ///
    /// Elements and boundaries are renumbered accordingly. Fails if any of them still uses
    /// the node. Search trees are dropped.
    pub fn remove_node(&mut self, index: usize) -> Result<Node> {
        if index >= self.nodes.len() {
            return Err(Error::out_of_bounds("node", index, self.nodes.len()));
        }
        if let Some(element) = self.elements.iter().find(|e| e.nodes().contains(&index)) {
            return Err(Error::InvalidArgument(format!(
                "node {index} is a vertex of element {}",
                element.id
            )));
        }
        if self
            .open_boundaries
            .iter()
            .chain(&self.land_boundaries)
            .any(|b| b.references(index))
        {
            return Err(Error::InvalidArgument(format!("node {index} is on a boundary")));
        }
        let node = self.nodes.remove(index);
        for element in &mut self.elements {
            element.shift_nodes_after(index);
        }
        for boundary in self
            .open_boundaries
            .iter_mut()
            .chain(&mut self.land_boundaries)
        {
            boundary.shift_nodes_after(index);
        }
        self.node_index = IdIndex::build("node", self.nodes.iter().map(|n| n.id))?;
        self.clear_search_trees();
        Ok(node)
    }

    /// Appends `element`. Search trees are dropped.
    pub fn add_element(&mut self, element: Element) -> Result<()> {
        check_vertices(&element, self.nodes.len())?;
        let ids = self.elements.iter().chain([&element]).map(|e| e.id);
        self.element_index = IdIndex::build("element", ids)?;
        self.elements.push(element);
        self.clear_search_trees();
        Ok(())
    }

    /// Replaces element `index`. Search trees are dropped.
    pub fn replace_element(&mut self, index: usize, element: Element) -> Result<Element> {
        if index >= self.elements.len() {
            return Err(Error::out_of_bounds("element", index, self.elements.len()));
        }
        check_vertices(&element, self.nodes.len())?;
        let ids = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| if i == index { element.id } else { e.id });
        self.element_index = IdIndex::build("element", ids)?;
        self.clear_search_trees();
        Ok(std::mem::replace(&mut self.elements[index], element))
    }

    /// Removes element `index`, shifting the following elements down one position. Search
    /// trees are dropped.
    pub fn remove_element(&mut self, index: usize) -> Result<Element> {
        if index >= self.elements.len() {
            return Err(Error::out_of_bounds("element", index, self.elements.len()));
        }
        let element = self.elements.remove(index);
        self.element_index = IdIndex::build("element", self.elements.iter().map(|e| e.id))?;
        self.clear_search_trees();
        Ok(element)
    }

    pub fn add_open_boundary(&mut self, boundary: Boundary) -> Result<()> {
        if !boundary.is_open() {
            return Err(Error::InvalidBoundary(
                "land boundary added as an open boundary".to_string(),
            ));
        }
        boundary.validate(self.nodes.len())?;
        self.open_boundaries.push(boundary);
        Ok(())
    }

    pub fn add_land_boundary(&mut self, boundary: Boundary) -> Result<()> {
        if !matches!(boundary.kind(), BoundaryKind::Land(_)) {
            return Err(Error::InvalidBoundary(
                "open boundary added as a land boundary".to_string(),
            ));
        }
        boundary.validate(self.nodes.len())?;
        self.land_boundaries.push(boundary);
        Ok(())
    }

    pub fn total_open_boundary_nodes(&self) -> usize {
        self.open_boundaries.iter().map(Boundary::node_count).sum()
    }

    pub fn total_land_boundary_nodes(&self) -> usize {
        self.land_boundaries.iter().map(Boundary::node_count).sum()
    }

    pub fn x(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.x).collect()
    }

    pub fn y(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.y).collect()
    }

    pub fn z(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.z).collect()
    }

    pub fn xyz(&self) -> Vec<[f64; 3]> {
        self.nodes.iter().map(|n| [n.x, n.y, n.z]).collect()
    }

    /// Node ids of every element.
    pub fn connectivity(&self) -> Vec<SmallVec<[usize; 4]>> {
        self.elements
            .iter()
            .map(|e| e.nodes().iter().map(|&n| self.nodes[n].id).collect())
            .collect()
    }

    /// `[xmin, ymin, xmax, ymax]` of the nodes, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(self.nodes.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |[xmin, ymin, xmax, ymax], n| {
                [xmin.min(n.x), ymin.min(n.y), xmax.max(n.x), ymax.max(n.y)]
            },
        ))
    }

    /// Arithmetic mean of the vertices of element `index`.
    pub fn element_center(&self, index: usize) -> Result<Point> {
        Ok(self.element(index)?.center(&self.nodes))
    }

    /// Vertex coordinates of element `index`.
    pub fn element_vertices(&self, index: usize) -> Result<SmallVec<[[f64; 2]; 4]>> {
        Ok(self.element(index)?.vertices(&self.nodes).collect())
    }

    /// (Re)builds the nearest-neighbour index over node positions.
    pub fn build_nodal_search_tree(&mut self) {
        self.node_tree = Some(SpatialIndex::new(self.nodes.iter().map(Node::coords)));
        debug!("nodal search tree built over {} nodes", self.nodes.len());
    }

    /// (Re)builds the nearest-neighbour index over element centers.
    pub fn build_elemental_search_tree(&mut self) {
        let centers = self
            .elements
            .iter()
            .map(|e| e.center(&self.nodes).into())
            .collect::<Vec<[f64; 2]>>();
        self.element_tree = Some(SpatialIndex::new(centers));
        debug!(
            "elemental search tree built over {} elements",
            self.elements.len()
        );
    }

    pub fn nodal_search_tree(&self) -> Result<&SpatialIndex> {
        self.node_tree
            .as_ref()
            .ok_or(Error::SearchTreeNotBuilt("nodal"))
    }

    pub fn elemental_search_tree(&self) -> Result<&SpatialIndex> {
        self.element_tree
            .as_ref()
            .ok_or(Error::SearchTreeNotBuilt("elemental"))
    }

    /// Index of the node nearest to `(x, y)`. Needs the nodal search tree.
    pub fn nearest_node(&self, x: f64, y: f64) -> Result<Option<usize>> {
        Ok(self.nodal_search_tree()?.nearest(x, y))
    }

    /// Indices of the `n` nodes nearest to `(x, y)`, closest first. Needs the nodal search tree.
    pub fn nearest_nodes(&self, x: f64, y: f64, n: usize) -> Result<Vec<usize>> {
        Ok(self.nodal_search_tree()?.nearest_n(x, y, n))
    }

    /// Index of the element whose center is nearest to `(x, y)`. Needs the elemental search
    /// tree.
    pub fn nearest_element(&self, x: f64, y: f64) -> Result<Option<usize>> {
        Ok(self.elemental_search_tree()?.nearest(x, y))
    }

    /// Index of an element containing `(x, y)`. Needs the elemental search tree.
    pub fn find_element(&self, x: f64, y: f64) -> Result<Option<usize>> {
        Ok(ElementLocator::new(self)?.locate_one(&[x, y]))
    }

    /// Interpolates the nodal `values` at `(x, y)`, `None` if the point is outside the mesh.
    /// Needs the elemental search tree.
    pub fn interpolate(&self, values: &[f64], x: f64, y: f64) -> Result<Option<f64>> {
        if values.len() != self.nodes.len() {
            return Err(Error::LengthMismatch {
                what: "nodal values",
                expected: self.nodes.len(),
                found: values.len(),
            });
        }
        let locator = ElementLocator::new(self)?;
        Ok(locator
            .interpolant(x, y)?
            .map(|interpolant| interpolant.apply(values)))
    }

    /// Transforms every node to the coordinate system `epsg` in place.
    ///
    /// Both search trees are dropped and have to be rebuilt before the next query.
    pub fn reproject<T>(&mut self, epsg: u32, transform: &T) -> Result<()>
    where
        T: CoordinateTransform + ?Sized,
    {
        let mut points: Vec<[f64; 2]> = self.nodes.iter().map(Node::coords).collect();
        let geographic = transform.transform(self.coordinate_system.epsg, epsg, &mut points)?;
        for (node, [x, y]) in self.nodes.iter_mut().zip(points) {
            node.x = x;
            node.y = y;
        }
        self.coordinate_system = CoordinateSystem::new(epsg, geographic);
        self.clear_search_trees();
        debug!("mesh reprojected to EPSG:{epsg}");
        Ok(())
    }

    /// Projects a geographic mesh to CPP coordinates centered on `(lambda0, phi0)` degrees.
    ///
    /// The projected mesh has no EPSG code. Search trees are dropped.
    pub fn cpp(&mut self, lambda0: f64, phi0: f64) -> Result<()> {
        if !self.is_geographic() {
            return Err(Error::InvalidArgument(
                "CPP projection needs a geographic mesh".to_string(),
            ));
        }
        let projection = Cpp::new(lambda0, phi0);
        for node in &mut self.nodes {
            [node.x, node.y] = projection.forward(node.coords());
        }
        self.coordinate_system = CoordinateSystem::new(EPSG_UNDEFINED, false);
        self.clear_search_trees();
        Ok(())
    }

    /// Brings a CPP mesh centered on `(lambda0, phi0)` back to WGS84 longitude/latitude.
    pub fn inverse_cpp(&mut self, lambda0: f64, phi0: f64) -> Result<()> {
        if self.is_geographic() {
            return Err(Error::InvalidArgument("mesh is already geographic".to_string()));
        }
        let projection = Cpp::new(lambda0, phi0);
        for node in &mut self.nodes {
            [node.x, node.y] = projection.inverse(node.coords());
        }
        self.coordinate_system = CoordinateSystem::default();
        self.clear_search_trees();
        Ok(())
    }

    fn clear_search_trees(&mut self) {
        self.node_tree = None;
        self.element_tree = None;
    }

    /// Average length of the element legs around each node.
    ///
    /// Leg lengths are great-circle distances in meters when `geodesic` is set, which only
    /// makes sense for geographic meshes, and planar distances in mesh units otherwise. Nodes
    /// without elements get `0.0`.
    pub fn compute_mesh_size(&self, geodesic: bool) -> Vec<f64> {
        self.compute_mesh_size_with(&ElementTable::new(self), geodesic)
    }

    /// [`Mesh::compute_mesh_size`] with an already built element table.
    pub fn compute_mesh_size_with(&self, table: &ElementTable, geodesic: bool) -> Vec<f64> {
        let sizes: Vec<f64> = self
            .elements
            .iter()
            .map(|e| e.element_size(&self.nodes, geodesic))
            .collect();
        (0..self.nodes.len())
            .map(|n| {
                let around = table.elements_around_node(n).unwrap_or(&[]);
                if around.is_empty() {
                    return 0.;
                }
                around.iter().map(|&e| sizes[e]).sum::<f64>() / around.len() as f64
            })
            .collect()
    }

    /// Reorders the vertices of every element clockwise.
    pub fn sort_elements_clockwise(&mut self) {
        for element in &mut self.elements {
            element.sort_clockwise(&self.nodes);
        }
    }
}

fn check_vertices(element: &Element, num_nodes: usize) -> Result<()> {
    if element.nodes().iter().any(|&n| n >= num_nodes) {
        return Err(Error::InvalidElement {
            id: element.id,
            message: format!("references a node index beyond the {num_nodes} nodes of the mesh"),
        });
    }
    Ok(())
}

fn grid_nodes(
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    nx: usize,
    ny: usize,
) -> Result<Vec<Node>> {
    if nx == 0 || ny == 0 {
        return Err(Error::InvalidArgument(
            "a grid needs at least one cell in each direction".to_string(),
        ));
    }
    if !(xmin < xmax && ymin < ymax) {
        return Err(Error::InvalidArgument(format!(
            "empty grid extent [{xmin}, {xmax}] x [{ymin}, {ymax}]"
        )));
    }
    let dx = (xmax - xmin) / nx as f64;
    let dy = (ymax - ymin) / ny as f64;
    let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            let id = nodes.len() + 1;
            nodes.push(Node::new(id, xmin + i as f64 * dx, ymin + j as f64 * dy, 0.));
        }
    }
    Ok(nodes)
}

/// Counter-clockwise node indices of the grid cells, row by row from the bottom.
fn grid_cells(nx: usize, ny: usize) -> impl Iterator<Item = [usize; 4]> {
    (0..ny).flat_map(move |j| {
        (0..nx).map(move |i| {
            let a = j * (nx + 1) + i;
            [a, a + 1, a + nx + 2, a + nx + 1]
        })
    })
}
