//! Error type shared by mesh construction, grid building and drainage.

use std::path::PathBuf;

use thiserror::Error;

use crate::attributes::Attribute;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("mesh has no points")]
    EmptyMesh,

    #[error("mesh has {count} points, at most {max} are supported")]
    TooManyPoints { count: usize, max: usize },

    #[error("edge ({a}, {b}) references a point outside a mesh of {count} points")]
    EdgeOutOfRange { a: usize, b: usize, count: usize },

    #[error("edge joins point {0} to itself")]
    SelfLoop(usize),

    #[error("point {0} has non-finite coordinates")]
    NonFiniteCoordinate(usize),

    #[error("{name} has {found} values but the mesh has {expected} points")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("grid resolution {width}x{height} has no cells")]
    EmptyGrid { width: usize, height: usize },

    #[error("drainage routing contains a cycle through point {0}")]
    RoutingCycle(usize),

    #[error("{attribute} edit started at revision {base} but the array is now at {current}")]
    StaleEdit {
        attribute: Attribute,
        base: u64,
        current: u64,
    },

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Check that a per-point attribute array matches the mesh size.
pub(crate) fn check_len<T>(name: &'static str, expected: usize, values: &[T]) -> Result<()> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            name,
            expected,
            found: values.len(),
        })
    }
}
