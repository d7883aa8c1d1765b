//! Geometry and raster interpolation for ADCIRC unstructured meshes.
//!
//! A [`Mesh`] owns its nodes, elements and boundaries and resolves file ids through an
//! [`IdIndex`]. Point queries go through R*-tree search indices ([`SpatialIndex`]) and the
//! [`PointLocator`] trait, and [`GridData`] transfers raster values onto mesh nodes.
//!
//! ```no_run
//! use adcmesh::{adcirc, CoordinateSystem, GridData, Method};
//!
//! # fn main() -> adcmesh::Result<()> {
//! let mut mesh = adcirc::open("fort.14")?;
//! mesh.set_coordinate_system(CoordinateSystem::new(26915, false));
//!
//! let mut grid = GridData::open(&mesh, "dem.asc", CoordinateSystem::new(26915, false))?;
//! grid.set_all_methods(Method::Average);
//! let z = grid.compute_values()?;
//! # Ok(())
//! # }
//! ```

pub mod adcirc;
mod boundary;
mod element;
mod element_table;
mod error;
mod geometry;
mod griddata;
mod id_index;
mod mesh;
mod node;
mod output_record;
mod point_locator;
pub mod projection;
pub mod raster;
mod spatial_index;

pub use boundary::{Boundary, BoundaryKind, BoundaryLayout, BoundaryNode};
pub use element::{Element, Weights};
pub use element_table::ElementTable;
pub use error::{Error, ErrorCategory, Result};
pub use geometry::{Point, EARTH_RADIUS};
pub use griddata::{GridData, GridDataOptions, LookupTable, Method, NUM_WIND_SECTORS};
pub use id_index::IdIndex;
pub use mesh::Mesh;
pub use node::Node;
pub use output_record::{angle, AngleUnits, Dimension, OutputRecord, DEFAULT_OUTPUT_VALUE};
pub use point_locator::{ElementLocator, Interpolant, PointLocator, DEFAULT_SEARCH_DEPTH};
pub use projection::{BuiltinTransform, CoordinateSystem, CoordinateTransform};
pub use raster::{Raster, RasterInfo};
pub use spatial_index::SpatialIndex;
