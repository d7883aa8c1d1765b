use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;

use crate::error::{Error, Result};

/// Maps integer raster classes (e.g. land cover codes) to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    values: HashMap<i64, f64>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: i64, value: f64) -> Option<f64> {
        self.values.insert(class, value)
    }

    pub fn get(&self, class: i64) -> Option<f64> {
        self.values.get(&class).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a two column `class value` table.
    ///
    /// Blank lines and lines starting with `#` are skipped, as is anything after the second
    /// column. A class listed twice keeps its last value.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = n + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |message: String| Error::InvalidLookupTable {
                line: line_number,
                message,
            };
            let mut fields = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty());
            let (Some(class), Some(value)) = (fields.next(), fields.next()) else {
                return Err(invalid(format!("expected a class and a value, got {line:?}")));
            };
            let class: i64 = class
                .parse()
                .map_err(|_| invalid(format!("invalid class {class:?}")))?;
            let value: f64 = value
                .parse()
                .map_err(|_| invalid(format!("invalid value {value:?}")))?;
            if table.insert(class, value).is_some() {
                warn!("lookup table line {line_number}: class {class} redefined");
            }
        }
        Ok(table)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }
}

impl FromIterator<(i64, f64)> for LookupTable {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
