use std::f64::consts::FRAC_PI_4;

use crate::error::{Error, Result};

/// WGS84 semi-major axis, the sphere radius of the Web Mercator projection.
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined; inputs are clamped to it.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779;

/// WGS84 semi-minor axis.
pub const WGS84_POLAR_RADIUS: f64 = 6_356_752.314_245;

/// Code of coordinate systems without an EPSG definition, such as CPP coordinates.
pub const EPSG_UNDEFINED: u32 = 0;
pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_NAD83: u32 = 4269;
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// Coordinate reference system of a mesh or raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateSystem {
    pub epsg: u32,
    /// `true` when coordinates are longitude/latitude in degrees.
    pub geographic: bool,
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::new(EPSG_WGS84, true)
    }
}

impl CoordinateSystem {
    pub fn new(epsg: u32, geographic: bool) -> Self {
        Self { epsg, geographic }
    }
}

/// Transforms point coordinates between coordinate systems identified by EPSG code.
///
/// Implementations backed by a full projection library can be plugged into
/// [`Mesh::reproject`](crate::Mesh::reproject); [`BuiltinTransform`] covers the common
/// geographic/Web Mercator case.
pub trait CoordinateTransform {
    /// Transforms `points` in place from `from` to `to`.
    ///
    /// Returns whether the output coordinates are geographic.
    fn transform(&self, from: u32, to: u32, points: &mut [[f64; 2]]) -> Result<bool>;
}

/// Transforms between WGS84 / NAD83 geographic coordinates and Web Mercator.
///
/// NAD83 and WGS84 are treated as identical, which holds to about a meter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTransform;

fn is_geographic(epsg: u32) -> bool {
    matches!(epsg, EPSG_WGS84 | EPSG_NAD83)
}

fn is_supported(epsg: u32) -> bool {
    is_geographic(epsg) || epsg == EPSG_WEB_MERCATOR
}

impl CoordinateTransform for BuiltinTransform {
    fn transform(&self, from: u32, to: u32, points: &mut [[f64; 2]]) -> Result<bool> {
        if !is_supported(from) || !is_supported(to) {
            return Err(Error::UnsupportedProjection { from, to });
        }
        match (is_geographic(from), is_geographic(to)) {
            (true, false) => points
                .iter_mut()
                .for_each(|p| *p = geographic_to_web_mercator(*p)),
            (false, true) => points
                .iter_mut()
                .for_each(|p| *p = web_mercator_to_geographic(*p)),
            _ => {}
        }
        Ok(is_geographic(to))
    }
}

/// Longitude/latitude in degrees to Web Mercator meters.
pub fn geographic_to_web_mercator([lon, lat]: [f64; 2]) -> [f64; 2] {
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.).tan().ln();
    [x, y]
}

/// Web Mercator meters to longitude/latitude in degrees.
pub fn web_mercator_to_geographic([x, y]: [f64; 2]) -> [f64; 2] {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2. * (y / WEB_MERCATOR_RADIUS).exp().atan() - 2. * FRAC_PI_4).to_degrees();
    [lon, lat]
}

/// Geocentric radius of the WGS84 ellipsoid at `latitude` degrees.
pub fn earth_radius_at(latitude: f64) -> f64 {
    let (a, b) = (WEB_MERCATOR_RADIUS, WGS84_POLAR_RADIUS);
    let (sin, cos) = latitude.to_radians().sin_cos();
    let numerator = (a * a * cos).powi(2) + (b * b * sin).powi(2);
    let denominator = (a * cos).powi(2) + (b * sin).powi(2);
    (numerator / denominator).sqrt()
}

/// Carte Parallelogrammatique projection, the equirectangular projection ADCIRC uses for
/// spherical runs.
///
/// Longitudes are scaled by the cosine of the reference latitude and both axes by the earth
/// radius at that latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cpp {
    lambda0: f64,
    phi0: f64,
    radius: f64,
}

impl Cpp {
    /// Projection centered on longitude `lambda0` and latitude `phi0`, in degrees.
    pub fn new(lambda0: f64, phi0: f64) -> Self {
        Self {
            lambda0,
            phi0,
            radius: earth_radius_at(phi0),
        }
    }

    /// Longitude/latitude in degrees to CPP meters.
    pub fn forward(&self, [lon, lat]: [f64; 2]) -> [f64; 2] {
        let x = self.radius * (lon - self.lambda0).to_radians() * self.phi0.to_radians().cos();
        let y = self.radius * lat.to_radians();
        [x, y]
    }

    /// CPP meters to longitude/latitude in degrees.
    pub fn inverse(&self, [x, y]: [f64; 2]) -> [f64; 2] {
        let lon = self.lambda0 + (x / (self.radius * self.phi0.to_radians().cos())).to_degrees();
        let lat = (y / self.radius).to_degrees();
        [lon, lat]
    }
}
