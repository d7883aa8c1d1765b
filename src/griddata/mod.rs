//! Transfer of raster values onto mesh nodes.
//!
//! For every node, the raster pixels whose centers lie within a search radius are aggregated
//! with the node's [`Method`]. The radius is half the average length of the element legs
//! around the node, scaled by a per-node filter size.

mod lookup;
mod wind;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::mesh::Mesh;
use crate::projection::CoordinateSystem;
use crate::raster::Raster;

pub use lookup::LookupTable;
pub use wind::NUM_WIND_SECTORS;

/// Aggregation applied to the pixels around a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// The node is skipped and keeps the default value.
    NoMethod,
    /// Mean of the pixels within the search radius.
    #[default]
    Average,
    /// Value of the pixel containing the node, if its center is within the search radius.
    Nearest,
    /// Largest pixel value within the search radius.
    Highest,
    /// Mean of the pixels at or above `mean + n * stddev` of the pixels within the search
    /// radius, `n` being [`GridDataOptions::sigma_threshold`].
    PlusTwoSigma,
    /// Average over a radius grown until it spans at least one raster cell, nearest pixel when
    /// it never does.
    BilskieEtAll,
}

impl Method {
    /// Method for the integer flags used in interpolation control files.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::NoMethod),
            1 => Some(Self::Average),
            2 => Some(Self::Nearest),
            3 => Some(Self::Highest),
            4 => Some(Self::PlusTwoSigma),
            5 => Some(Self::BilskieEtAll),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::NoMethod => 0,
            Self::Average => 1,
            Self::Nearest => 2,
            Self::Highest => 3,
            Self::PlusTwoSigma => 4,
            Self::BilskieEtAll => 5,
        }
    }
}

/// Settings shared by all nodes of an interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDataOptions {
    /// Value of nodes without any usable pixel.
    pub default_value: f64,
    /// Factor applied to every computed value.
    pub raster_multiplier: f64,
    /// Number of standard deviations used by [`Method::PlusTwoSigma`].
    pub sigma_threshold: f64,
    /// Search radius of the directional wind reduction, in mesh units.
    pub wind_radius: f64,
    /// Width of the Gaussian weight of the directional wind reduction, in kilometers.
    pub wind_sigma: f64,
    /// Added to the Gaussian denominator of the directional wind weights.
    pub wind_normalizer: f64,
    /// How many times [`Method::BilskieEtAll`] may double its radius.
    pub bilskie_max_doublings: u32,
    /// Logs the progress of long interpolations every 10 %.
    pub show_progress: bool,
    /// Reads the whole raster once before interpolating.
    pub read_into_memory: bool,
}

impl Default for GridDataOptions {
    fn default() -> Self {
        Self {
            default_value: -9999.,
            raster_multiplier: 1.,
            sigma_threshold: 2.,
            wind_radius: 10_000.,
            wind_sigma: 6.,
            wind_normalizer: 0.,
            bilskie_max_doublings: 4,
            show_progress: false,
            read_into_memory: false,
        }
    }
}

/// A usable pixel around a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PixelSample {
    /// Offset from the node to the pixel center.
    pub dx: f64,
    pub dy: f64,
    pub distance: f64,
    pub value: f64,
}

/// Raster to mesh interpolation engine.
///
/// The mesh is borrowed for the lifetime of the engine and stays untouched; reproject it to the
/// raster's coordinate system beforehand.
#[derive(Debug)]
pub struct GridData<'a> {
    mesh: &'a Mesh,
    raster: Raster,
    methods: Vec<Method>,
    filter_sizes: Vec<f64>,
    mesh_size: Vec<f64>,
    lookup: Option<LookupTable>,
    options: GridDataOptions,
}

impl<'a> GridData<'a> {
    /// Creates an engine applying [`Method::Average`] with a filter size of 1 at every node.
    pub fn new(mesh: &'a Mesh, raster: Raster) -> Self {
        let n = mesh.num_nodes();
        Self {
            mesh,
            raster,
            methods: vec![Method::default(); n],
            filter_sizes: vec![1.; n],
            mesh_size: mesh.compute_mesh_size(false),
            lookup: None,
            options: GridDataOptions::default(),
        }
    }

    /// Creates an engine on the ESRI ASCII grid at `path`.
    pub fn open<P: AsRef<Path>>(
        mesh: &'a Mesh,
        path: P,
        coordinate_system: CoordinateSystem,
    ) -> Result<Self> {
        Ok(Self::new(mesh, Raster::open_ascii(path, coordinate_system)?))
    }

    pub fn with_options(mut self, options: GridDataOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GridDataOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut GridDataOptions {
        &mut self.options
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn default_value(&self) -> f64 {
        self.options.default_value
    }

    pub fn set_default_value(&mut self, value: f64) {
        self.options.default_value = value;
    }

    pub fn set_raster_multiplier(&mut self, multiplier: f64) {
        self.options.raster_multiplier = multiplier;
    }

    pub fn set_show_progress(&mut self, show: bool) {
        self.options.show_progress = show;
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn set_method(&mut self, node: usize, method: Method) -> Result<()> {
        let len = self.methods.len();
        *self
            .methods
            .get_mut(node)
            .ok_or_else(|| Error::out_of_bounds("node", node, len))? = method;
        Ok(())
    }

    pub fn set_methods(&mut self, methods: Vec<Method>) -> Result<()> {
        self.check_len("interpolation methods", methods.len())?;
        self.methods = methods;
        Ok(())
    }

    pub fn set_all_methods(&mut self, method: Method) {
        self.methods.fill(method);
    }

    pub fn filter_sizes(&self) -> &[f64] {
        &self.filter_sizes
    }

    pub fn set_filter_size(&mut self, node: usize, filter_size: f64) -> Result<()> {
        let len = self.filter_sizes.len();
        *self
            .filter_sizes
            .get_mut(node)
            .ok_or_else(|| Error::out_of_bounds("node", node, len))? = filter_size;
        Ok(())
    }

    pub fn set_filter_sizes(&mut self, filter_sizes: Vec<f64>) -> Result<()> {
        self.check_len("filter sizes", filter_sizes.len())?;
        self.filter_sizes = filter_sizes;
        Ok(())
    }

    /// Average length of the element legs around each node, in mesh units.
    pub fn mesh_size(&self) -> &[f64] {
        &self.mesh_size
    }

    pub fn lookup_table(&self) -> Option<&LookupTable> {
        self.lookup.as_ref()
    }

    /// Reads pixels as integer classes mapped through `table`. Classes missing from the table
    /// are ignored like nodata pixels.
    pub fn set_lookup_table(&mut self, table: LookupTable) {
        self.lookup = Some(table);
    }

    pub fn load_lookup_table<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.lookup = Some(LookupTable::open(path)?);
        Ok(())
    }

    pub fn clear_lookup_table(&mut self) {
        self.lookup = None;
    }

    /// Interpolates the raster onto every node.
    pub fn compute_values(&mut self) -> Result<Vec<f64>> {
        self.prepare()?;
        let progress = Progress::new(self.mesh.num_nodes(), self.options.show_progress);
        let values = (0..self.mesh.num_nodes())
            .into_par_iter()
            .map(|node| {
                let value = self.value_at_node(node);
                progress.tick();
                value
            })
            .collect::<Result<Vec<f64>>>()?;
        debug!("raster interpolated onto {} nodes", values.len());
        Ok(values)
    }

    /// Computes the directional wind reduction of every node.
    ///
    /// The pixels within [`GridDataOptions::wind_radius`] are weighted by distance and binned
    /// into [`NUM_WIND_SECTORS`] direction sectors. Per-node methods are not used, but nodes set
    /// to [`Method::NoMethod`] are skipped.
    pub fn compute_directional_wind(&mut self) -> Result<Vec<[f64; NUM_WIND_SECTORS]>> {
        self.prepare()?;
        let progress = Progress::new(self.mesh.num_nodes(), self.options.show_progress);
        let values = (0..self.mesh.num_nodes())
            .into_par_iter()
            .map(|node| {
                let value = self.directional_wind_at_node(node);
                progress.tick();
                value
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("directional wind computed for {} nodes", values.len());
        Ok(values)
    }

    /// Interpolated value of a single node.
    pub fn value_at_node(&self, node: usize) -> Result<f64> {
        let p = self.mesh.node(node)?.point();
        let size = self.mesh_size[node];
        let method = self.methods[node];
        if method == Method::NoMethod || size <= 0. {
            return Ok(self.options.default_value);
        }
        let radius = 0.5 * size * self.filter_sizes[node];
        let value = match method {
            Method::NoMethod => None,
            Method::Average => self.average(p, radius)?,
            Method::Nearest => self.nearest(p, radius)?,
            Method::Highest => self.highest(p, radius)?,
            Method::PlusTwoSigma => self.plus_sigma(p, radius)?,
            Method::BilskieEtAll => self.bilskie(p, radius)?,
        };
        Ok(self.scale(value))
    }

    /// Directional wind reduction of a single node.
    pub fn directional_wind_at_node(&self, node: usize) -> Result<[f64; NUM_WIND_SECTORS]> {
        let p = self.mesh.node(node)?.point();
        let default = self.options.default_value;
        if self.methods[node] == Method::NoMethod {
            return Ok([default; NUM_WIND_SECTORS]);
        }
        let samples = self.samples(p, self.options.wind_radius)?;
        let mut sectors = wind::directional_reduction(
            &samples,
            self.options.wind_sigma,
            self.options.wind_normalizer,
            default,
        );
        for s in sectors.iter_mut().filter(|s| **s != default) {
            *s *= self.options.raster_multiplier;
        }
        Ok(sectors)
    }

    fn check_len(&self, what: &'static str, found: usize) -> Result<()> {
        if found != self.mesh.num_nodes() {
            return Err(Error::LengthMismatch {
                what,
                expected: self.mesh.num_nodes(),
                found,
            });
        }
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        let mesh = self.mesh.coordinate_system();
        let raster = self.raster.info().coordinate_system;
        if mesh.epsg != raster.epsg {
            return Err(Error::ProjectionMismatch {
                mesh: mesh.epsg,
                raster: raster.epsg,
            });
        }
        if mesh.geographic {
            warn!(
                "interpolating in geographic coordinates, a planar coordinate system is recommended"
            );
        }
        if self.options.read_into_memory {
            self.raster.read_into_memory()?;
        }
        Ok(())
    }

    fn scale(&self, value: Option<f64>) -> f64 {
        value.map_or(self.options.default_value, |v| {
            v * self.options.raster_multiplier
        })
    }

    /// Usable pixels whose centers lie within `radius` of `p`.
    fn samples(&self, p: Point, radius: f64) -> Result<Vec<PixelSample>> {
        let Some((upper_left, lower_right)) = self.raster.search_box_around_point(p.x, p.y, radius)
        else {
            return Ok(Vec::new());
        };
        let (window, values): (_, Vec<Option<f64>>) = match &self.lookup {
            Some(table) => {
                let (window, classes) = self.raster.pixel_classes(upper_left, lower_right)?;
                let values = classes
                    .into_iter()
                    .map(|c| c.and_then(|c| table.get(c)))
                    .collect();
                (window, values)
            }
            None => {
                let window = self.raster.pixel_values(upper_left, lower_right)?;
                let info = self.raster.info();
                let values = window
                    .z
                    .iter()
                    .map(|&z| (!info.is_nodata(z)).then_some(z))
                    .collect();
                (window, values)
            }
        };
        Ok(window
            .x
            .iter()
            .zip(&window.y)
            .zip(values)
            .filter_map(|((&x, &y), value)| {
                let (dx, dy) = (x - p.x, y - p.y);
                let distance = dx.hypot(dy);
                match value {
                    Some(value) if distance <= radius => Some(PixelSample {
                        dx,
                        dy,
                        distance,
                        value,
                    }),
                    _ => None,
                }
            })
            .collect())
    }

    fn average(&self, p: Point, radius: f64) -> Result<Option<f64>> {
        let samples = self.samples(p, radius)?;
        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64,
        ))
    }

    fn highest(&self, p: Point, radius: f64) -> Result<Option<f64>> {
        Ok(self
            .samples(p, radius)?
            .iter()
            .map(|s| s.value)
            .reduce(f64::max))
    }

    fn nearest(&self, p: Point, radius: f64) -> Result<Option<f64>> {
        let Some(pixel) = self.raster.coordinate_to_pixel(p.x, p.y) else {
            return Ok(None);
        };
        let center = Point::from(self.raster.pixel_to_coordinate(pixel));
        if p.distance(&center) > radius {
            return Ok(None);
        }
        let value = self.raster.pixel_value(pixel)?;
        Ok(match &self.lookup {
            Some(table) if !self.raster.info().is_nodata(value) => table.get(value.round() as i64),
            Some(_) => None,
            None => (!self.raster.info().is_nodata(value)).then_some(value),
        })
    }

    fn plus_sigma(&self, p: Point, radius: f64) -> Result<Option<f64>> {
        let samples = self.samples(p, radius)?;
        if samples.is_empty() {
            return Ok(None);
        }
        let n = samples.len() as f64;
        let mean = samples.iter().map(|s| s.value).sum::<f64>() / n;
        let squares = samples.iter().map(|s| (s.value - mean).powi(2));
        let variance = squares.sum::<f64>() / n;
        let threshold = mean + self.options.sigma_threshold * variance.sqrt();
        let (sum, count) = samples
            .iter()
            .filter(|s| s.value >= threshold)
            .fold((0., 0usize), |(sum, count), s| (sum + s.value, count + 1));
        Ok((count > 0).then(|| sum / count as f64))
    }

    /// `radius` is the regular search radius; the grown radius starts at half of it.
    fn bilskie(&self, p: Point, radius: f64) -> Result<Option<f64>> {
        let info = self.raster.info();
        let cell_size = info.dx.max(info.dy);
        let mut r = 0.5 * radius;
        for _ in 0..=self.options.bilskie_max_doublings {
            if r / cell_size >= 1. {
                return self.average(p, r);
            }
            r *= 2.;
        }
        self.nearest(p, r)
    }
}

/// Shared counter of processed nodes.
struct Progress {
    done: AtomicUsize,
    total: usize,
    step: usize,
    enabled: bool,
}

impl Progress {
    fn new(total: usize, enabled: bool) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            step: (total / 10).max(1),
            enabled,
        }
    }

    fn tick(&self) {
        if !self.enabled {
            return;
        }
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.step == 0 || done == self.total {
            info!("raster interpolation {}% complete", done * 100 / self.total);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;
    use crate::raster::{AsciiGrid, MemoryRaster, PixelType, RasterInfo};

    const UTM: CoordinateSystem = CoordinateSystem {
        epsg: 26915,
        geographic: false,
    };

    /// A raster of 1 m pixels covering `[-2, 12] x [-2, 12]`, values given by `f(x, y)` at the
    /// pixel centers.
    fn raster_from<F: Fn(f64, f64) -> f64>(f: F) -> Raster {
        square_raster(1., 14, [5., 5.], f)
    }

    /// `n` x `n` square pixels of side `cell` centered on `center`.
    fn square_raster<F>(cell: f64, n: usize, center: [f64; 2], f: F) -> Raster
    where
        F: Fn(f64, f64) -> f64,
    {
        let half = 0.5 * n as f64 * cell;
        let info = RasterInfo {
            nx: n,
            ny: n,
            xmin: center[0] - half,
            ymax: center[1] + half,
            dx: cell,
            dy: cell,
            nodata: -9999.,
            pixel_type: PixelType::Float,
            coordinate_system: UTM,
        };
        let mut values = Vec::with_capacity(info.num_pixels());
        for j in 0..info.ny {
            for i in 0..info.nx {
                let [x, y] = info.pixel_to_coordinate(crate::raster::Pixel::new(i, j));
                values.push(f(x, y));
            }
        }
        Raster::new(MemoryRaster::new(info, values).unwrap())
    }

    /// A 2 x 2 grid of 5 m quadrilaterals, mesh size 5 everywhere.
    fn mesh() -> Mesh {
        let mut mesh = Mesh::grid(0., 10., 0., 10., 2, 2).unwrap();
        mesh.set_coordinate_system(UTM);
        mesh
    }

    #[rstest]
    #[case(Method::Average)]
    #[case(Method::Nearest)]
    #[case(Method::Highest)]
    #[case(Method::PlusTwoSigma)]
    #[case(Method::BilskieEtAll)]
    fn uniform_raster_is_reproduced(#[case] method: Method) -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|_, _| 10.));
        grid.set_all_methods(method);
        grid.set_filter_sizes(vec![1.5; mesh.num_nodes()])?;

        let values = grid.compute_values()?;

        assert_eq!(values, vec![10.; mesh.num_nodes()]);
        Ok(())
    }

    // Mesh size 5 and filter 1 give a search radius of 2.5, so the grown radius starts at 1.25
    // and reaches 40 after the last doubling.
    #[rstest]
    #[case::doubled_three_times(10., 9, [5., 5.], 65.)]
    #[case::nearest_within_grown_radius(100., 3, [35., 5.], 1225.)]
    #[case::nearest_beyond_grown_radius(100., 3, [50., 5.], -9999.)]
    fn bilskie_grows_the_radius_on_coarse_rasters(
        #[case] cell: f64,
        #[case] n: usize,
        #[case] center: [f64; 2],
        #[case] expected: f64,
    ) -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, square_raster(cell, n, center, |x, _| x * x));
        grid.set_all_methods(Method::BilskieEtAll);

        // Node 4 sits at (5, 5)
        assert_relative_eq!(grid.value_at_node(4)?, expected);
        Ok(())
    }

    #[test]
    fn no_method_keeps_the_default() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|_, _| 10.));
        grid.set_method(4, Method::NoMethod)?;
        grid.set_default_value(-1.);

        let values = grid.compute_values()?;

        assert_eq!(values[4], -1.);
        assert_eq!(values[0], 10.);
        Ok(())
    }

    #[test]
    fn average_over_a_gradient() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|x, _| x));

        let values = grid.compute_values()?;

        // Pixels are symmetric around every interior node
        assert_relative_eq!(values[4], 5., epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn highest_grows_with_radius() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut previous = vec![f64::NEG_INFINITY; mesh.num_nodes()];
        for filter in [0.5, 1., 2., 4.] {
            let mut grid = GridData::new(&mesh, raster_from(|x, y| (x * 7. + y * 3.).sin()));
            grid.set_all_methods(Method::Highest);
            grid.set_filter_sizes(vec![filter; mesh.num_nodes()])?;

            let values = grid.compute_values()?;

            for (v, p) in values.iter().zip(&previous) {
                assert!(v >= p);
            }
            previous = values;
        }
        Ok(())
    }

    #[test]
    fn nearest_with_zero_radius() -> anyhow::Result<()> {
        let mut mesh = mesh();
        // Node 0 sits on a pixel center, node 1 on a pixel corner
        mesh.set_node_position(0, 0.5, 0.5)?;
        let mut grid = GridData::new(&mesh, raster_from(|x, y| x + y));
        grid.set_all_methods(Method::Nearest);
        grid.set_filter_sizes(vec![0.; mesh.num_nodes()])?;

        let values = grid.compute_values()?;

        assert_eq!(values[0], 1.);
        assert_eq!(values[1], -9999.);
        Ok(())
    }

    #[test]
    fn nodata_pixels_are_ignored() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|x, _| if x < 5. { -9999. } else { 4. }));

        let values = grid.compute_values()?;

        assert_eq!(values[0], -9999.);
        assert_eq!(values[4], 4.);
        assert_eq!(values[8], 4.);
        Ok(())
    }

    #[test]
    fn plus_two_sigma_keeps_the_outliers() -> anyhow::Result<()> {
        let mesh = mesh();
        // A single tall pixel next to the center node
        let mut grid = GridData::new(
            &mesh,
            raster_from(|x, y| if x == 5.5 && y == 5.5 { 100. } else { 1. }),
        );
        grid.set_all_methods(Method::PlusTwoSigma);

        let values = grid.compute_values()?;

        assert_eq!(values[4], 100.);
        Ok(())
    }

    #[test]
    fn raster_multiplier_leaves_the_default_alone() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|x, _| if x < 5. { -9999. } else { 4. }));
        grid.set_raster_multiplier(0.5);

        let values = grid.compute_values()?;

        assert_eq!(values[0], -9999.);
        assert_eq!(values[4], 2.);
        Ok(())
    }

    #[test]
    fn lookup_table_maps_classes() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|x, _| if x < 5. { 11. } else { 42. }));
        grid.set_lookup_table(LookupTable::read(Cursor::new("11 0.02\n"))?);

        let values = grid.compute_values()?;

        // Class 42 is not in the table
        assert_relative_eq!(values[0], 0.02);
        assert_relative_eq!(values[3], 0.02);
        assert_eq!(values[2], -9999.);

        grid.set_all_methods(Method::Nearest);
        let values = grid.compute_values()?;

        assert_relative_eq!(values[0], 0.02);
        assert_relative_eq!(values[3], 0.02);
        assert_eq!(values[2], -9999.);
        assert_eq!(values[4], -9999.);
        Ok(())
    }

    #[test]
    fn projections_must_match() {
        let mut mesh = mesh();
        mesh.set_coordinate_system(CoordinateSystem::default());
        let mut grid = GridData::new(&mesh, raster_from(|_, _| 1.));

        assert!(matches!(
            grid.compute_values(),
            Err(Error::ProjectionMismatch {
                mesh: 4326,
                raster: 26915,
            })
        ));
    }

    #[test]
    fn per_node_settings_are_validated() {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|_, _| 1.));

        assert!(grid.set_method(9, Method::Highest).is_err());
        assert!(grid.set_filter_sizes(vec![1.; 3]).is_err());
        assert!(grid.set_methods(vec![Method::Nearest; 9]).is_ok());
    }

    #[test]
    fn read_into_memory_gives_the_same_values() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|x, y| x * y));
        let from_driver = grid.compute_values()?;

        grid.options_mut().read_into_memory = true;
        grid.set_show_progress(true);
        let from_memory = grid.compute_values()?;

        assert!(grid.raster().is_in_memory());
        assert_eq!(from_memory, from_driver);
        Ok(())
    }

    #[test]
    fn directional_wind_on_uniform_raster() -> anyhow::Result<()> {
        let mesh = mesh();
        let mut grid = GridData::new(&mesh, raster_from(|_, _| 0.3)).with_options(GridDataOptions {
            wind_radius: 3.,
            ..Default::default()
        });

        let sectors = grid.compute_directional_wind()?;

        assert_eq!(sectors.len(), mesh.num_nodes());
        for s in sectors[4] {
            assert!(s > 0. && s <= 0.3 + 1e-12);
        }
        Ok(())
    }

    #[test]
    fn ascii_grid_end_to_end() -> anyhow::Result<()> {
        let text = "ncols 3\nnrows 3\nxllcorner 0\nyllcorner 0\ncellsize 5\n1 1 1\n1 1 1\n1 1 1\n";
        let raster = Raster::new(AsciiGrid::read(Cursor::new(text), UTM)?);
        let mesh = {
            let mut mesh = Mesh::grid(2.5, 12.5, 2.5, 12.5, 1, 1)?;
            mesh.set_coordinate_system(UTM);
            mesh
        };
        let mut grid = GridData::new(&mesh, raster);

        assert_eq!(grid.compute_values()?, vec![1.; 4]);
        Ok(())
    }

    #[rstest]
    #[case(0, Some(Method::NoMethod))]
    #[case(1, Some(Method::Average))]
    #[case(5, Some(Method::BilskieEtAll))]
    #[case(6, None)]
    fn method_codes(#[case] code: i32, #[case] method: Option<Method>) {
        assert_eq!(Method::from_code(code), method);
        if let Some(method) = method {
            assert_eq!(method.code(), code);
        }
    }
}
