use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure a caller may want to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input data could not be interpreted. Anything built from it must be discarded.
    MalformedInput,
    /// A caller asked for something that cannot exist (bad index, wrong record kind, ...).
    Logic,
    /// The outside world got in the way (missing file, unknown coordinate system, ...).
    Environment,
}

/// Errors produced by mesh, raster and output operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEof { line: usize, expected: &'static str },

    #[error("invalid element {id}: {message}")]
    InvalidElement { id: usize, message: String },

    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("invalid lookup table, line {line}: {message}")]
    InvalidLookupTable { line: usize, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{what} index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("record holds {found} data but {expected} data was requested")]
    DimensionMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{what} has length {found}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("duplicate {what} id {id}")]
    DuplicateId { what: &'static str, id: usize },

    #[error("no {what} with id {id}")]
    UnknownId { what: &'static str, id: usize },

    #[error("the {0} search tree has not been built")]
    SearchTreeNotBuilt(&'static str),

    #[error("point ({x}, {y}) does not lie inside element {element}")]
    PointOutsideElement { element: usize, x: f64, y: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not open raster {path:?}: {reason}")]
    RasterOpen { path: PathBuf, reason: String },

    #[error("no transformation available from EPSG:{from} to EPSG:{to}")]
    UnsupportedProjection { from: u32, to: u32 },

    #[error("mesh is in EPSG:{mesh} but the raster is in EPSG:{raster}")]
    ProjectionMismatch { mesh: u32, raster: u32 },
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_bounds(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { what, index, len }
    }

    /// Returns the class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse { .. }
            | Self::UnexpectedEof { .. }
            | Self::InvalidElement { .. }
            | Self::InvalidBoundary(_)
            | Self::InvalidLookupTable { .. }
            | Self::DuplicateId { .. } => ErrorCategory::MalformedInput,
            Self::InvalidArgument(_)
            | Self::IndexOutOfBounds { .. }
            | Self::DimensionMismatch { .. }
            | Self::LengthMismatch { .. }
            | Self::UnknownId { .. }
            | Self::SearchTreeNotBuilt(_)
            | Self::PointOutsideElement { .. } => ErrorCategory::Logic,
            Self::Io(_)
            | Self::RasterOpen { .. }
            | Self::UnsupportedProjection { .. }
            | Self::ProjectionMismatch { .. } => ErrorCategory::Environment,
        }
    }
}
