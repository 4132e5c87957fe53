//! Nearby mesh points for an arbitrary map coordinate
//!
//! A [`Vicinity`] records up to [`MAX_NEIGHBORS`] mesh points near a query
//! coordinate together with their distances, and answers three questions
//! about any per-point attribute array:
//! - **interpolate**: inverse-distance weighted mean (continuous attributes)
//! - **nearest**: value of the closest point (categorical attributes)
//! - **nearest_valid**: closest value that is not a "missing" sentinel
//!
//! Which points get recorded is decided by a [`VicinityKind`] policy.

pub mod nearest;
pub mod polygon;
pub mod proxcimity;

use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;

/// Capacity of a vicinity (longest polygon walk we attempt).
pub const MAX_NEIGHBORS: usize = 12;

/// Marks an unused neighbor slot.
pub const NO_POINT: u32 = u32::MAX;

/// Neighbor-selection policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VicinityKind {
    /// Nearest point in each quadrant: smooth continuous interpolation
    #[default]
    Proxcimity,
    /// Enclosing Voronoi polygon: sharp, topologically correct boundaries
    Polygon,
    /// Single closest point: categorical attributes
    Nearest,
}

impl VicinityKind {
    pub fn all() -> &'static [Self] {
        &[Self::Proxcimity, Self::Polygon, Self::Nearest]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Proxcimity => "Nearest point per quadrant (smooth)",
            Self::Polygon => "Enclosing polygon (sharp shores)",
            Self::Nearest => "Closest point only (categorical)",
        }
    }
}

impl std::fmt::Display for VicinityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proxcimity => write!(f, "proxcimity"),
            Self::Polygon => write!(f, "polygon"),
            Self::Nearest => write!(f, "nearest"),
        }
    }
}

impl std::str::FromStr for VicinityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown vicinity '{}' (proxcimity, polygon, nearest)", s))
    }
}

/// The mesh points considered "near" one query coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct Vicinity {
    kind: VicinityKind,
    points: [u32; MAX_NEIGHBORS],
    distances: [f64; MAX_NEIGHBORS],
    len: usize,
    closed: bool,
}

impl Vicinity {
    fn empty(kind: VicinityKind) -> Self {
        Self {
            kind,
            points: [NO_POINT; MAX_NEIGHBORS],
            distances: [f64::INFINITY; MAX_NEIGHBORS],
            len: 0,
            closed: false,
        }
    }

    /// Find the neighbors of (x, y) using the given policy.
    ///
    /// # Panics
    /// If the mesh has no points.
    pub fn find(kind: VicinityKind, mesh: &Mesh, x: f64, y: f64) -> Self {
        assert!(!mesh.is_empty(), "vicinity query against an empty mesh");
        let mut vicinity = Self::empty(kind);
        match kind {
            VicinityKind::Proxcimity => proxcimity::find_neighbors(&mut vicinity, mesh, x, y),
            VicinityKind::Polygon => polygon::find_neighbors(&mut vicinity, mesh, x, y),
            VicinityKind::Nearest => nearest::find_neighbors(&mut vicinity, mesh, x, y),
        }
        debug_assert!(vicinity.len > 0);
        vicinity
    }

    pub fn kind(&self) -> VicinityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether a polygon walk returned to its starting point.
    /// Always false for the other policies.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mesh indices of the recorded neighbors, in slot order.
    pub fn points(&self) -> impl Iterator<Item = usize> + '_ {
        self.points[..self.len].iter().map(|&p| p as usize)
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances[..self.len]
    }

    /// (mesh index, distance) pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.points().zip(self.distances().iter().copied())
    }

    fn push(&mut self, point: usize, distance: f64) {
        debug_assert!(distance >= 0.0);
        // Mesh::new caps the point count below NO_POINT
        debug_assert!(point < crate::mesh::MAX_POINTS);
        self.points[self.len] = point as u32;
        self.distances[self.len] = distance;
        self.len += 1;
    }

    fn truncate(&mut self, len: usize) {
        for slot in len..self.len {
            self.points[slot] = NO_POINT;
            self.distances[slot] = f64::INFINITY;
        }
        self.len = self.len.min(len);
    }

    /// Inverse-distance weighted mean of `values` over the recorded neighbors.
    ///
    /// A neighbor at distance zero returns its own value directly.
    ///
    /// # Panics
    /// If no neighbors are recorded.
    pub fn interpolate(&self, values: &[f64]) -> f64 {
        assert!(self.len > 0, "interpolation over an empty vicinity");

        let mut norm = 0.0;
        let mut sum = 0.0;
        for (point, distance) in self.iter() {
            let value = values[point];
            if distance == 0.0 {
                return value;
            }
            sum += value / distance;
            norm += 1.0 / distance;
        }
        sum / norm
    }

    /// Slot of the closest recorded neighbor.
    fn closest_slot(&self) -> usize {
        let mut best = 0;
        for slot in 1..self.len {
            if self.distances[slot] < self.distances[best] {
                best = slot;
            }
        }
        best
    }

    /// Value at the closest recorded neighbor.
    ///
    /// Meant for categorical attributes where blending makes no sense.
    ///
    /// # Panics
    /// If no neighbors are recorded.
    pub fn nearest<T: Copy>(&self, values: &[T]) -> T {
        assert!(self.len > 0, "nearest value of an empty vicinity");
        values[self.points[self.closest_slot()] as usize]
    }

    /// Value at the closest neighbor whose value is not `invalid`,
    /// or `invalid` when every neighbor is.
    pub fn nearest_valid<T: Copy + PartialEq>(&self, values: &[T], invalid: T) -> T {
        let mut best: Option<(f64, T)> = None;
        for (point, distance) in self.iter() {
            let value = values[point];
            if value == invalid {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, value));
            }
        }
        best.map_or(invalid, |(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_mesh() -> Mesh {
        let positions = [(-0.4, 0.0), (-0.1, 0.0), (0.2, 0.0), (0.4, 0.1)];
        Mesh::new(&positions, &[(0, 1), (1, 2), (2, 3)]).unwrap()
    }

    fn manual(points: &[(usize, f64)]) -> Vicinity {
        let mut v = Vicinity::empty(VicinityKind::Proxcimity);
        for &(p, d) in points {
            v.push(p, d);
        }
        v
    }

    #[test]
    fn test_interpolate_inverse_distance() {
        let v = manual(&[(0, 1.0), (1, 3.0)]);
        // weights 1 and 1/3
        assert_relative_eq!(v.interpolate(&[10.0, 20.0]), 12.5, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_stays_within_neighbor_range() {
        let values = [3.0, -7.5, 12.0, 0.25];
        let mesh = line_mesh();
        for i in 0..40 {
            for j in 0..10 {
                let x = -0.5 + i as f64 * 0.025 + 0.001;
                let y = -0.25 + j as f64 * 0.05 + 0.001;
                for &kind in VicinityKind::all() {
                    let v = Vicinity::find(kind, &mesh, x, y);
                    let (lo, hi) = v.points().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
                        (lo.min(values[p]), hi.max(values[p]))
                    });
                    let z = v.interpolate(&values);
                    assert!(z >= lo - 1e-9 && z <= hi + 1e-9,
                        "{} at ({}, {}) gave {} outside [{}, {}]", kind, x, y, z, lo, hi);
                }
            }
        }
    }

    #[test]
    fn test_interpolate_at_mesh_point_returns_its_value() {
        let mesh = line_mesh();
        let values = [1.0, 2.0, 3.0, 4.0];
        let v = Vicinity::find(VicinityKind::Proxcimity, &mesh, 0.2, 0.0);
        assert_eq!(v.interpolate(&values), 3.0);
    }

    #[test]
    #[should_panic(expected = "empty vicinity")]
    fn test_interpolate_without_neighbors_panics() {
        Vicinity::empty(VicinityKind::Nearest).interpolate(&[1.0]);
    }

    #[test]
    fn test_nearest_uses_smallest_distance() {
        let v = manual(&[(0, 0.5), (1, 0.2), (2, 0.9)]);
        assert_eq!(v.nearest(&['a', 'b', 'c']), 'b');
    }

    #[test]
    fn test_nearest_valid_skips_sentinel() {
        let v = manual(&[(0, 0.1), (1, 0.2), (2, 0.3)]);
        let unknown = -666.0;
        assert_eq!(v.nearest_valid(&[unknown, 5.0, 7.0], unknown), 5.0);
        assert_eq!(v.nearest_valid(&[unknown, unknown, 7.0], unknown), 7.0);
        assert_eq!(v.nearest_valid(&[unknown; 3], unknown), unknown);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Polygon".parse::<VicinityKind>().unwrap(), VicinityKind::Polygon);
        for &kind in VicinityKind::all() {
            assert_eq!(kind.to_string().parse::<VicinityKind>().unwrap(), kind);
        }
        assert!("voronoi".parse::<VicinityKind>().is_err());
    }

    #[test]
    fn test_truncate_clears_slots() {
        let mut v = manual(&[(0, 0.1), (1, 0.2), (2, 0.3)]);
        v.truncate(1);
        assert_eq!(v.len(), 1);
        assert_eq!(v.points[1], NO_POINT);
        assert_eq!(v.points[2], NO_POINT);
    }
}
