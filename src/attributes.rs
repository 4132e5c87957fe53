//! Per-point attribute arrays with explicit edit transactions
//!
//! Arrays are never changed in place. An edit works on a private copy of
//! one array and is either committed, which publishes the whole array and
//! bumps its revision, or rolled back, which discards the copy. Anything
//! derived from an array (drainage, flux, rasters) can compare revisions to
//! decide whether it is stale.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cartesian::Bounds;
use crate::error::{check_len, Error, Result};
use crate::mesh::Mesh;

/// Attribute kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Height,
    Erosion,
    Rain,
    Soil,
    Flora,
    Fauna,
}

impl Attribute {
    pub fn all() -> &'static [Self] {
        &[Self::Height, Self::Erosion, Self::Rain, Self::Soil, Self::Flora, Self::Fauna]
    }

    fn slot(self) -> usize {
        self as usize
    }

    /// Height and erosion shape drainage; the rest do not.
    pub fn affects_drainage(self) -> bool {
        matches!(self, Self::Height | Self::Erosion)
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Height => write!(f, "height"),
            Self::Erosion => write!(f, "erosion"),
            Self::Rain => write!(f, "rain"),
            Self::Soil => write!(f, "soil"),
            Self::Flora => write!(f, "flora"),
            Self::Fauna => write!(f, "fauna"),
        }
    }
}

const ATTRIBUTE_COUNT: usize = 6;

/// All attribute arrays of one mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Attributes {
    points: usize,
    layers: [Vec<f64>; ATTRIBUTE_COUNT],
    revisions: [u64; ATTRIBUTE_COUNT],
    clock: u64,
}

impl Attributes {
    /// Zeroed arrays for a mesh of `points` points.
    pub fn new(points: usize) -> Self {
        Self {
            points,
            layers: std::array::from_fn(|_| vec![0.0; points]),
            revisions: [0; ATTRIBUTE_COUNT],
            clock: 0,
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn get(&self, attribute: Attribute) -> &[f64] {
        &self.layers[attribute.slot()]
    }

    /// Revision of one array; changes on every commit to it.
    pub fn revision(&self, attribute: Attribute) -> u64 {
        self.revisions[attribute.slot()]
    }

    /// Latest revision of any array.
    pub fn latest_revision(&self) -> u64 {
        self.clock
    }

    /// Replace a whole array at once.
    pub fn replace(&mut self, attribute: Attribute, values: Vec<f64>) -> Result<u64> {
        check_len("attribute values", self.points, &values)?;
        self.layers[attribute.slot()] = values;
        self.clock += 1;
        self.revisions[attribute.slot()] = self.clock;
        debug!(%attribute, revision = self.clock, "committed attribute");
        Ok(self.clock)
    }

    /// Start editing a private copy of one array.
    pub fn edit(&self, attribute: Attribute) -> AttributeEdit {
        AttributeEdit {
            attribute,
            base_revision: self.revision(attribute),
            values: self.get(attribute).to_vec(),
        }
    }
}

/// Pending change to one attribute array.
#[derive(Clone, Debug, PartialEq)]
#[must_use = "an edit does nothing until it is committed"]
pub struct AttributeEdit {
    attribute: Attribute,
    base_revision: u64,
    values: Vec<f64>,
}

impl AttributeEdit {
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Revision the edit started from.
    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Set every point inside `bounds` to `value`, returning how many changed.
    /// Corners may be given in either order.
    pub fn set_region(&mut self, mesh: &Mesh, bounds: Bounds, value: f64) -> usize {
        let (x0, x1) = (bounds.left.min(bounds.right), bounds.left.max(bounds.right));
        let (y0, y1) = (bounds.top.min(bounds.bottom), bounds.top.max(bounds.bottom));
        let mut changed = 0;
        for p in mesh.points() {
            if p.x >= x0 && p.x <= x1 && p.y >= y0 && p.y <= y1 {
                self.values[p.index] = value;
                changed += 1;
            }
        }
        changed
    }

    /// Publish the edited array, returning its new revision.
    ///
    /// Fails with [`Error::StaleEdit`] if another commit reached the array
    /// after this edit was started; the published array is left alone.
    pub fn commit(self, attributes: &mut Attributes) -> Result<u64> {
        let current = attributes.revision(self.attribute);
        if current != self.base_revision {
            return Err(Error::StaleEdit {
                attribute: self.attribute,
                base: self.base_revision,
                current,
            });
        }
        attributes.replace(self.attribute, self.values)
    }

    /// Drop the edit, leaving the published array as it was.
    pub fn rollback(self) {
        debug!(attribute = %self.attribute, "rolled back attribute edit");
    }
}
