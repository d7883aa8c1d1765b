use std::f64::consts::TAU;

use crate::error::{Error, Result};

/// Value written by ADCIRC for dry or otherwise undefined nodes.
pub const DEFAULT_OUTPUT_VALUE: f64 = -99999.;

/// Number of components stored per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Scalar = 1,
    Vector = 2,
    Vector3 = 3,
}

impl Dimension {
    pub fn components(&self) -> usize {
        *self as usize
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Vector => "2d vector",
            Self::Vector3 => "3d vector",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AngleUnits {
    #[default]
    Degrees,
    Radians,
}

/// Angle of the vector `(x, y)` counter-clockwise from east, in `[0, 360)` degrees or
/// `[0, 2π)` radians.
pub fn angle(x: f64, y: f64, units: AngleUnits) -> f64 {
    let a = y.atan2(x).rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU for tiny negative angles
    let a = if a >= TAU { 0. } else { a };
    match units {
        AngleUnits::Radians => a,
        AngleUnits::Degrees => {
            let d = a.to_degrees();
            if d >= 360. {
                0.
            } else {
                d
            }
        }
    }
}

/// Values of one output snapshot over all mesh nodes.
///
/// Components are stored column-wise: `u` holds scalar values or the first vector component,
/// `v` and `w` are only allocated for vector records. Accessors for a component the record
/// does not have return [`Error::DimensionMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    record: usize,
    time: f64,
    iteration: i64,
    default_value: f64,
    dimension: Dimension,
    u: Vec<f64>,
    v: Vec<f64>,
    w: Vec<f64>,
}

impl OutputRecord {
    /// Creates a record of `num_nodes` values, all set to [`DEFAULT_OUTPUT_VALUE`].
    pub fn new(record: usize, num_nodes: usize, dimension: Dimension) -> Self {
        let column = |present: bool| {
            if present {
                vec![DEFAULT_OUTPUT_VALUE; num_nodes]
            } else {
                Vec::new()
            }
        };
        Self {
            record,
            time: 0.,
            iteration: 0,
            default_value: DEFAULT_OUTPUT_VALUE,
            dimension,
            u: column(true),
            v: column(dimension.components() >= 2),
            w: column(dimension.components() >= 3),
        }
    }

    pub fn record(&self) -> usize {
        self.record
    }

    pub fn set_record(&mut self, record: usize) {
        self.record = record;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn iteration(&self) -> i64 {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: i64) {
        self.iteration = iteration;
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Changes the sentinel. Values already stored are left as they are.
    pub fn set_default_value(&mut self, default_value: f64) {
        self.default_value = default_value;
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_vector(&self) -> bool {
        self.dimension != Dimension::Scalar
    }

    pub fn num_nodes(&self) -> usize {
        self.u.len()
    }

    /// Sets every component of every node to `value`.
    pub fn fill(&mut self, value: f64) {
        self.u.fill(value);
        self.v.fill(value);
        self.w.fill(value);
    }

    fn require(&self, dimension: Dimension) -> Result<()> {
        if self.dimension != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension.name(),
                found: self.dimension.name(),
            });
        }
        Ok(())
    }

    fn require_vector(&self) -> Result<()> {
        if !self.is_vector() {
            return Err(Error::DimensionMismatch {
                expected: "vector",
                found: self.dimension.name(),
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.num_nodes() {
            return Err(Error::out_of_bounds("node", index, self.num_nodes()));
        }
        Ok(())
    }

    fn check_len(&self, what: &'static str, values: &[f64]) -> Result<()> {
        if values.len() != self.num_nodes() {
            return Err(Error::LengthMismatch {
                what,
                expected: self.num_nodes(),
                found: values.len(),
            });
        }
        Ok(())
    }

    /// Scalar value of node `index`.
    pub fn z(&self, index: usize) -> Result<f64> {
        self.require(Dimension::Scalar)?;
        self.check_index(index)?;
        Ok(self.u[index])
    }

    pub fn u(&self, index: usize) -> Result<f64> {
        self.require_vector()?;
        self.check_index(index)?;
        Ok(self.u[index])
    }

    pub fn v(&self, index: usize) -> Result<f64> {
        self.require_vector()?;
        self.check_index(index)?;
        Ok(self.v[index])
    }

    pub fn w(&self, index: usize) -> Result<f64> {
        self.require(Dimension::Vector3)?;
        self.check_index(index)?;
        Ok(self.w[index])
    }

    /// Returns `true` if every component of node `index` equals the default value.
    pub fn is_default(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        let default = self.default_value;
        Ok([&self.u, &self.v, &self.w]
            .into_iter()
            .filter(|column| !column.is_empty())
            .all(|column| column[index] == default))
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        self.require(Dimension::Scalar)?;
        self.check_index(index)?;
        self.u[index] = value;
        Ok(())
    }

    /// Sets both horizontal components of a vector record.
    pub fn set_vector(&mut self, index: usize, u: f64, v: f64) -> Result<()> {
        self.require_vector()?;
        self.check_index(index)?;
        self.u[index] = u;
        self.v[index] = v;
        Ok(())
    }

    pub fn set_u(&mut self, index: usize, value: f64) -> Result<()> {
        self.require_vector()?;
        self.check_index(index)?;
        self.u[index] = value;
        Ok(())
    }

    pub fn set_v(&mut self, index: usize, value: f64) -> Result<()> {
        self.require_vector()?;
        self.check_index(index)?;
        self.v[index] = value;
        Ok(())
    }

    pub fn set_w(&mut self, index: usize, value: f64) -> Result<()> {
        self.require(Dimension::Vector3)?;
        self.check_index(index)?;
        self.w[index] = value;
        Ok(())
    }

    /// Replaces all values of a scalar record.
    pub fn set_all(&mut self, values: &[f64]) -> Result<()> {
        self.require(Dimension::Scalar)?;
        self.check_len("scalar values", values)?;
        self.u.copy_from_slice(values);
        Ok(())
    }

    /// Replaces both horizontal components of a vector record.
    pub fn set_all_vector(&mut self, u: &[f64], v: &[f64]) -> Result<()> {
        self.require_vector()?;
        self.check_len("u values", u)?;
        self.check_len("v values", v)?;
        self.u.copy_from_slice(u);
        self.v.copy_from_slice(v);
        Ok(())
    }

    pub fn set_all_u(&mut self, values: &[f64]) -> Result<()> {
        self.require_vector()?;
        self.check_len("u values", values)?;
        self.u.copy_from_slice(values);
        Ok(())
    }

    pub fn set_all_v(&mut self, values: &[f64]) -> Result<()> {
        self.require_vector()?;
        self.check_len("v values", values)?;
        self.v.copy_from_slice(values);
        Ok(())
    }

    pub fn set_all_w(&mut self, values: &[f64]) -> Result<()> {
        self.require(Dimension::Vector3)?;
        self.check_len("w values", values)?;
        self.w.copy_from_slice(values);
        Ok(())
    }

    /// Values of component `column` (0 for `u`, 1 for `v`, 2 for `w`).
    pub fn values(&self, column: usize) -> Result<&[f64]> {
        match column {
            0 => Ok(&self.u),
            1 if self.is_vector() => Ok(&self.v),
            2 if self.dimension == Dimension::Vector3 => Ok(&self.w),
            _ => Err(Error::out_of_bounds("component", column, self.dimension.components())),
        }
    }

    /// Horizontal magnitude `sqrt(u² + v²)` of node `index`.
    pub fn magnitude(&self, index: usize) -> Result<f64> {
        self.require_vector()?;
        self.check_index(index)?;
        Ok(self.u[index].hypot(self.v[index]))
    }

    /// Direction of the horizontal vector of node `index`, counter-clockwise from east.
    pub fn direction(&self, index: usize, units: AngleUnits) -> Result<f64> {
        self.require_vector()?;
        self.check_index(index)?;
        Ok(angle(self.u[index], self.v[index], units))
    }
}
