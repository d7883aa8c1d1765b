use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::projection::CoordinateSystem;

/// Column (`i`, growing eastwards) and row (`j`, growing southwards) of a raster cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub i: usize,
    pub j: usize,
}

impl Pixel {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

/// Storage class of the raster values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    Integer,
    Float,
}

/// Georeferencing of a north-up raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterInfo {
    pub nx: usize,
    pub ny: usize,
    /// West edge of the first column.
    pub xmin: f64,
    /// North edge of the first row.
    pub ymax: f64,
    pub dx: f64,
    pub dy: f64,
    pub nodata: f64,
    pub pixel_type: PixelType,
    pub coordinate_system: CoordinateSystem,
}

impl RasterInfo {
    pub fn xmax(&self) -> f64 {
        self.xmin + self.nx as f64 * self.dx
    }

    pub fn ymin(&self) -> f64 {
        self.ymax - self.ny as f64 * self.dy
    }

    /// `[xmin, ymin, xmax, ymax]`.
    pub fn bounds(&self) -> [f64; 4] {
        [self.xmin, self.ymin(), self.xmax(), self.ymax]
    }

    /// Saturates at `usize::MAX` for headers too large to address.
    pub fn num_pixels(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    /// Returns `true` for the nodata sentinel and for NaN.
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || value == self.nodata
    }

    /// Coordinates of the center of `pixel`.
    pub fn pixel_to_coordinate(&self, pixel: Pixel) -> [f64; 2] {
        [
            self.xmin + (pixel.i as f64 + 0.5) * self.dx,
            self.ymax - (pixel.j as f64 + 0.5) * self.dy,
        ]
    }

    /// Pixel containing `(x, y)`, `None` outside the raster. The east and south edges belong to
    /// the last column and row.
    pub fn coordinate_to_pixel(&self, x: f64, y: f64) -> Option<Pixel> {
        let [xmin, ymin, xmax, ymax] = self.bounds();
        if !(xmin..=xmax).contains(&x) || !(ymin..=ymax).contains(&y) {
            return None;
        }
        let i = (((x - xmin) / self.dx) as usize).min(self.nx.saturating_sub(1));
        let j = (((ymax - y) / self.dy) as usize).min(self.ny.saturating_sub(1));
        Some(Pixel::new(i, j))
    }

    /// Upper-left and lower-right pixels of the window covering the square of half side
    /// `half_side` around `(x, y)`, clipped to the raster.
    ///
    /// Returns `None` when the square does not overlap the raster.
    pub fn search_box_around_point(
        &self,
        x: f64,
        y: f64,
        half_side: f64,
    ) -> Option<(Pixel, Pixel)> {
        if self.nx == 0 || self.ny == 0 {
            return None;
        }
        let [xmin, ymin, xmax, ymax] = self.bounds();
        if x + half_side < xmin
            || x - half_side > xmax
            || y + half_side < ymin
            || y - half_side > ymax
        {
            return None;
        }
        let column = |x: f64| (((x - xmin) / self.dx).floor().max(0.) as usize).min(self.nx - 1);
        let row = |y: f64| (((ymax - y) / self.dy).floor().max(0.) as usize).min(self.ny - 1);
        Some((
            Pixel::new(column(x - half_side), row(y + half_side)),
            Pixel::new(column(x + half_side), row(y - half_side)),
        ))
    }

    fn check_window(&self, upper_left: Pixel, lower_right: Pixel) -> Result<()> {
        if lower_right.i >= self.nx {
            return Err(Error::out_of_bounds("raster column", lower_right.i, self.nx));
        }
        if lower_right.j >= self.ny {
            return Err(Error::out_of_bounds("raster row", lower_right.j, self.ny));
        }
        if upper_left.i > lower_right.i || upper_left.j > lower_right.j {
            return Err(Error::InvalidArgument(format!(
                "empty raster window {upper_left:?} to {lower_right:?}"
            )));
        }
        Ok(())
    }
}

/// Source of raster values.
///
/// Reads take `&self` so that a driver can be shared by the threads of an interpolation pass.
pub trait RasterDriver: Send + Sync {
    fn info(&self) -> &RasterInfo;

    /// Values of the window between `upper_left` and `lower_right` (both included), row by
    /// row from the north.
    fn read_window(&self, upper_left: Pixel, lower_right: Pixel) -> Result<Vec<f64>>;

    fn read_pixel(&self, pixel: Pixel) -> Result<f64> {
        Ok(self.read_window(pixel, pixel)?[0])
    }
}

/// A raster held in memory, row by row from the north.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    info: RasterInfo,
    values: Vec<f64>,
}

impl MemoryRaster {
    pub fn new(info: RasterInfo, values: Vec<f64>) -> Result<Self> {
        if values.len() != info.num_pixels() {
            return Err(Error::LengthMismatch {
                what: "raster values",
                expected: info.num_pixels(),
                found: values.len(),
            });
        }
        Ok(Self { info, values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl RasterDriver for MemoryRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&self, upper_left: Pixel, lower_right: Pixel) -> Result<Vec<f64>> {
        self.info.check_window(upper_left, lower_right)?;
        let nx = self.info.nx;
        Ok((upper_left.j..=lower_right.j)
            .flat_map(|j| &self.values[j * nx + upper_left.i..=j * nx + lower_right.i])
            .copied()
            .collect())
    }

    fn read_pixel(&self, pixel: Pixel) -> Result<f64> {
        self.info.check_window(pixel, pixel)?;
        Ok(self.values[pixel.j * self.info.nx + pixel.i])
    }
}

/// Reader for ESRI ASCII grids (`.asc`).
///
/// The header keys `ncols`, `nrows`, `xllcorner` or `xllcenter`, `yllcorner` or `yllcenter`,
/// `cellsize` (or `dx` and `dy`) and the optional `NODATA_value` are recognized in any case.
pub struct AsciiGrid;

impl AsciiGrid {
    pub fn open<P: AsRef<Path>>(
        path: P,
        coordinate_system: CoordinateSystem,
    ) -> Result<MemoryRaster> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::RasterOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let raster = Self::read(BufReader::new(file), coordinate_system).map_err(|e| match e {
            Error::Io(e) => Error::RasterOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            e => e,
        })?;
        debug!(
            "read {}x{} ascii grid from {}",
            raster.info.nx,
            raster.info.ny,
            path.display()
        );
        Ok(raster)
    }

    pub fn read<R: BufRead>(
        reader: R,
        coordinate_system: CoordinateSystem,
    ) -> Result<MemoryRaster> {
        let mut header = AsciiHeader::default();
        let mut values = Vec::new();
        let mut integer = true;
        let mut in_header = true;

        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = n + 1;
            let mut fields = line.split_whitespace().peekable();
            let Some(first) = fields.peek() else {
                continue;
            };
            if in_header && first.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let key = first.to_ascii_lowercase();
                fields.next();
                let value = fields
                    .next()
                    .ok_or_else(|| Error::parse(line_number, format!("missing value for {key}")))?;
                header.set(&key, value, line_number)?;
                continue;
            }
            in_header = false;
            for field in fields {
                integer &= !field.contains(['.', 'e', 'E']);
                let value: f64 = field.parse().map_err(|_| {
                    Error::parse(line_number, format!("invalid raster value {field:?}"))
                })?;
                values.push(value);
            }
        }

        let mut info = header.finish()?;
        info.coordinate_system = coordinate_system;
        if integer {
            info.pixel_type = PixelType::Integer;
        }
        MemoryRaster::new(info, values)
    }
}

#[derive(Debug, Default)]
struct AsciiHeader {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    dx: Option<f64>,
    dy: Option<f64>,
    nodata: Option<f64>,
}

impl AsciiHeader {
    fn set(&mut self, key: &str, value: &str, line: usize) -> Result<()> {
        let float = || -> Result<f64> {
            value
                .parse()
                .map_err(|_| Error::parse(line, format!("invalid {key} {value:?}")))
        };
        let count = || -> Result<usize> {
            value
                .parse()
                .map_err(|_| Error::parse(line, format!("invalid {key} {value:?}")))
        };
        match key {
            "ncols" => self.ncols = Some(count()?),
            "nrows" => self.nrows = Some(count()?),
            "xllcorner" => self.xll = Some((float()?, false)),
            "xllcenter" => self.xll = Some((float()?, true)),
            "yllcorner" => self.yll = Some((float()?, false)),
            "yllcenter" => self.yll = Some((float()?, true)),
            "cellsize" => {
                self.dx = Some(float()?);
                self.dy = self.dx;
            }
            "dx" => self.dx = Some(float()?),
            "dy" => self.dy = Some(float()?),
            "nodata_value" => self.nodata = Some(float()?),
            _ => return Err(Error::parse(line, format!("unknown header key {key:?}"))),
        }
        Ok(())
    }

    fn finish(self) -> Result<RasterInfo> {
        let missing = |key: &str| Error::parse(0, format!("ascii grid header has no {key}"));
        let nx = self.ncols.ok_or_else(|| missing("ncols"))?;
        let ny = self.nrows.ok_or_else(|| missing("nrows"))?;
        let (xll, x_centered) = self.xll.ok_or_else(|| missing("xllcorner"))?;
        let (yll, y_centered) = self.yll.ok_or_else(|| missing("yllcorner"))?;
        let dx = self.dx.ok_or_else(|| missing("cellsize"))?;
        let dy = self.dy.ok_or_else(|| missing("cellsize"))?;
        if dx <= 0. || dy <= 0. {
            return Err(Error::parse(0, "cell size must be positive"));
        }
        if nx.checked_mul(ny).is_none() {
            return Err(Error::parse(0, format!("raster of {nx}x{ny} pixels is too large")));
        }
        let xmin = if x_centered { xll - 0.5 * dx } else { xll };
        let ymin = if y_centered { yll - 0.5 * dy } else { yll };
        Ok(RasterInfo {
            nx,
            ny,
            xmin,
            ymax: ymin + ny as f64 * dy,
            dx,
            dy,
            nodata: self.nodata.unwrap_or(-9999.),
            pixel_type: PixelType::Float,
            coordinate_system: CoordinateSystem::default(),
        })
    }
}

/// Pixel centers and values of a raster window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelWindow {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl PixelWindow {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }
}

/// A raster driver with an optional in-memory copy of all its values.
pub struct Raster {
    driver: Box<dyn RasterDriver>,
    cache: Option<Vec<f64>>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("info", self.info())
            .field("in_memory", &self.is_in_memory())
            .finish()
    }
}

impl Raster {
    pub fn new<D: RasterDriver + 'static>(driver: D) -> Self {
        Self {
            driver: Box::new(driver),
            cache: None,
        }
    }

    /// Opens an ESRI ASCII grid.
    pub fn open_ascii<P: AsRef<Path>>(
        path: P,
        coordinate_system: CoordinateSystem,
    ) -> Result<Self> {
        Ok(Self::new(AsciiGrid::open(path, coordinate_system)?))
    }

    pub fn info(&self) -> &RasterInfo {
        self.driver.info()
    }

    pub fn is_in_memory(&self) -> bool {
        self.cache.is_some()
    }

    /// Reads every value once so that later reads never reach the driver.
    pub fn read_into_memory(&mut self) -> Result<()> {
        if self.cache.is_some() {
            return Ok(());
        }
        let info = *self.info();
        if info.num_pixels() == 0 {
            self.cache = Some(Vec::new());
            return Ok(());
        }
        let values = self.driver.read_window(
            Pixel::new(0, 0),
            Pixel::new(info.nx - 1, info.ny - 1),
        )?;
        debug!("raster of {} pixels read into memory", values.len());
        self.cache = Some(values);
        Ok(())
    }

    pub fn pixel_to_coordinate(&self, pixel: Pixel) -> [f64; 2] {
        self.info().pixel_to_coordinate(pixel)
    }

    pub fn coordinate_to_pixel(&self, x: f64, y: f64) -> Option<Pixel> {
        self.info().coordinate_to_pixel(x, y)
    }

    pub fn search_box_around_point(
        &self,
        x: f64,
        y: f64,
        half_side: f64,
    ) -> Option<(Pixel, Pixel)> {
        self.info().search_box_around_point(x, y, half_side)
    }

    pub fn pixel_value(&self, pixel: Pixel) -> Result<f64> {
        match &self.cache {
            Some(values) => {
                let info = self.info();
                info.check_window(pixel, pixel)?;
                Ok(values[pixel.j * info.nx + pixel.i])
            }
            None => self.driver.read_pixel(pixel),
        }
    }

    /// Centers and raw values of the pixels of a window. Nodata values are kept.
    pub fn pixel_values(&self, upper_left: Pixel, lower_right: Pixel) -> Result<PixelWindow> {
        let info = self.info();
        let z = match &self.cache {
            Some(values) => {
                info.check_window(upper_left, lower_right)?;
                (upper_left.j..=lower_right.j)
                    .flat_map(|j| &values[j * info.nx + upper_left.i..=j * info.nx + lower_right.i])
                    .copied()
                    .collect()
            }
            None => self.driver.read_window(upper_left, lower_right)?,
        };
        let mut window = PixelWindow {
            x: Vec::with_capacity(z.len()),
            y: Vec::with_capacity(z.len()),
            z,
        };
        for j in upper_left.j..=lower_right.j {
            for i in upper_left.i..=lower_right.i {
                let [x, y] = info.pixel_to_coordinate(Pixel::new(i, j));
                window.x.push(x);
                window.y.push(y);
            }
        }
        Ok(window)
    }

    /// Same as [`Raster::pixel_values`] with values read as integer classes. Nodata pixels
    /// are returned as `None`.
    pub fn pixel_classes(
        &self,
        upper_left: Pixel,
        lower_right: Pixel,
    ) -> Result<(PixelWindow, Vec<Option<i64>>)> {
        let window = self.pixel_values(upper_left, lower_right)?;
        let info = self.info();
        let classes = window
            .z
            .iter()
            .map(|&v| (!info.is_nodata(v)).then(|| v.round() as i64))
            .collect();
        Ok((window, classes))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;

    const GRID: &str = "ncols 4
nrows 3
xllcorner 100.0
yllcorner 200.0
cellsize 10.0
NODATA_value -9999
1 2 3 4
5 6 -9999 8
9 10 11 12
";

    fn grid() -> MemoryRaster {
        AsciiGrid::read(Cursor::new(GRID), CoordinateSystem::new(26915, false)).unwrap()
    }

    #[test]
    fn ascii_header_and_values() {
        let raster = grid();
        let info = raster.info();

        assert_eq!((info.nx, info.ny), (4, 3));
        assert_eq!(info.bounds(), [100., 200., 140., 230.]);
        assert_eq!(info.nodata, -9999.);
        assert_eq!(info.pixel_type, PixelType::Integer);
        assert_eq!(info.coordinate_system.epsg, 26915);
        assert_eq!(raster.values().len(), 12);
    }

    #[test]
    fn ascii_center_registration() -> anyhow::Result<()> {
        let text = "NCOLS 2\nNROWS 1\nXLLCENTER 0.5\nYLLCENTER 0.5\nCELLSIZE 1\n1.5 2.5\n";
        let raster = AsciiGrid::read(Cursor::new(text), CoordinateSystem::default())?;

        assert_eq!(raster.info().bounds(), [0., 0., 2., 1.]);
        assert_eq!(raster.info().pixel_type, PixelType::Float);
        assert_eq!(raster.info().nodata, -9999.);
        Ok(())
    }

    #[rstest]
    #[case("ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n")]
    #[case("ncols 1\nnrows 1\nxllcorner 0\ncellsize 1\n1\n")]
    #[case("ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nabc\n")]
    #[case("ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize -1\n1\n")]
    fn malformed_ascii_grids(#[case] text: &str) {
        let grid = AsciiGrid::read(Cursor::new(text), CoordinateSystem::default());
        assert!(grid.is_err());
    }

    #[test]
    fn oversized_ascii_header_is_a_parse_error() {
        let text = "ncols 4294967296\nnrows 4294967296\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n";

        let err = AsciiGrid::read(Cursor::new(text), CoordinateSystem::default()).unwrap_err();

        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }

    #[test]
    fn pixel_count_saturates() {
        let mut info = *grid().info();
        info.nx = usize::MAX;

        assert_eq!(info.num_pixels(), usize::MAX);
    }

    #[test]
    fn missing_file_is_an_environment_error() {
        let err =
            Raster::open_ascii("/does/not/exist.asc", CoordinateSystem::default()).unwrap_err();

        assert!(matches!(err, Error::RasterOpen { .. }));
    }

    #[test]
    fn pixel_coordinates() {
        let raster = grid();
        let info = raster.info();

        assert_eq!(info.pixel_to_coordinate(Pixel::new(0, 0)), [105., 225.]);
        assert_eq!(info.pixel_to_coordinate(Pixel::new(3, 2)), [135., 205.]);
        assert_eq!(info.coordinate_to_pixel(105., 225.), Some(Pixel::new(0, 0)));
        assert_eq!(info.coordinate_to_pixel(140., 200.), Some(Pixel::new(3, 2)));
        assert_eq!(info.coordinate_to_pixel(99., 225.), None);
    }

    #[test]
    fn search_box_is_clipped() {
        let info = *grid().info();

        assert_eq!(
            info.search_box_around_point(115., 215., 5.),
            Some((Pixel::new(1, 1), Pixel::new(2, 2)))
        );
        assert_eq!(
            info.search_box_around_point(100., 230., 1000.),
            Some((Pixel::new(0, 0), Pixel::new(3, 2)))
        );
        assert_eq!(info.search_box_around_point(0., 0., 10.), None);
    }

    #[test]
    fn window_reads() -> anyhow::Result<()> {
        let raster = Raster::new(grid());

        let window = raster.pixel_values(Pixel::new(1, 1), Pixel::new(2, 2))?;
        assert_eq!(window.z, vec![6., -9999., 10., 11.]);
        assert_eq!(window.x, vec![115., 125., 115., 125.]);
        assert_eq!(window.y, vec![215., 215., 205., 205.]);

        let (_, classes) = raster.pixel_classes(Pixel::new(1, 1), Pixel::new(2, 1))?;
        assert_eq!(classes, vec![Some(6), None]);

        let past_the_edge = raster.pixel_values(Pixel::new(0, 0), Pixel::new(4, 0));
        let reversed = raster.pixel_values(Pixel::new(2, 0), Pixel::new(1, 0));
        assert!(past_the_edge.is_err() && reversed.is_err());
        assert_eq!(raster.pixel_value(Pixel::new(3, 0))?, 4.);
        Ok(())
    }

    struct CountingDriver {
        inner: MemoryRaster,
        reads: Arc<AtomicUsize>,
    }

    impl RasterDriver for CountingDriver {
        fn info(&self) -> &RasterInfo {
            self.inner.info()
        }

        fn read_window(&self, upper_left: Pixel, lower_right: Pixel) -> Result<Vec<f64>> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.read_window(upper_left, lower_right)
        }
    }

    #[test]
    fn in_memory_reads_skip_the_driver() -> anyhow::Result<()> {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut raster = Raster::new(CountingDriver {
            inner: grid(),
            reads: Arc::clone(&reads),
        });

        let from_driver = raster.pixel_values(Pixel::new(0, 0), Pixel::new(3, 2))?;
        assert_eq!(reads.load(Ordering::Relaxed), 1);

        raster.read_into_memory()?;
        assert!(raster.is_in_memory());
        assert_eq!(reads.load(Ordering::Relaxed), 2);

        let from_memory = raster.pixel_values(Pixel::new(0, 0), Pixel::new(3, 2))?;
        assert_eq!(from_memory, from_driver);
        assert_eq!(raster.pixel_value(Pixel::new(2, 1))?, -9999.);
        assert_eq!(reads.load(Ordering::Relaxed), 2);
        Ok(())
    }
}
