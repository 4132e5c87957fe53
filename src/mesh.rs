//! Irregular planar mesh of sample points
//!
//! Points live in a single arena owned by [`Mesh`]. Neighbor links are plain
//! indices into that arena, so the graph carries no ownership between points
//! and indices stay valid for as long as the mesh does.
//!
//! Coordinates are normalized map units, conventionally within [-0.5, 0.5]
//! on both axes. Interior points of a Voronoi-derived mesh have exactly three
//! neighbors; anything with fewer sits on the edge of the map.

use crate::cartesian::Bounds;
use crate::error::{Error, Result};

/// Largest mesh a [`Vicinity`](crate::Vicinity) can index; the last `u32`
/// is its empty-slot marker.
pub const MAX_POINTS: usize = u32::MAX as usize;

/// A single sample point of the mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshPoint {
    pub x: f64,
    pub y: f64,
    /// Position of this point in the owning mesh
    pub index: usize,
    neighbors: Vec<usize>,
}

impl MeshPoint {
    fn new(x: f64, y: f64, index: usize) -> Self {
        Self {
            x,
            y,
            index,
            neighbors: Vec::with_capacity(3),
        }
    }

    /// Indices of the points sharing an edge with this one.
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Points with fewer than three neighbors are on the edge of the mesh.
    pub fn is_on_edge(&self) -> bool {
        self.neighbors.len() < 3
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }

    pub fn distance(&self, other: &MeshPoint) -> f64 {
        self.distance_to(other.x, other.y)
    }

    fn add_neighbor(&mut self, other: usize) {
        if !self.neighbors.contains(&other) {
            self.neighbors.push(other);
        }
    }
}

/// An immutable graph of sample points.
#[derive(Clone, Debug)]
pub struct Mesh {
    points: Vec<MeshPoint>,
    edges: Vec<(usize, usize)>,
}

impl Mesh {
    /// Build a mesh from point positions and undirected edges.
    ///
    /// Every edge is recorded on both of its ends, so the neighbor relation is
    /// symmetric. Repeated edges are ignored.
    pub fn new(positions: &[(f64, f64)], edges: &[(usize, usize)]) -> Result<Self> {
        check_point_count(positions.len())?;

        let mut points = Vec::with_capacity(positions.len());
        for (index, &(x, y)) in positions.iter().enumerate() {
            if !x.is_finite() || !y.is_finite() {
                return Err(Error::NonFiniteCoordinate(index));
            }
            points.push(MeshPoint::new(x, y, index));
        }

        let count = points.len();
        let mut unique_edges = Vec::with_capacity(edges.len());
        for &(a, b) in edges {
            if a >= count || b >= count {
                return Err(Error::EdgeOutOfRange { a, b, count });
            }
            if a == b {
                return Err(Error::SelfLoop(a));
            }
            if points[a].neighbors.contains(&b) {
                continue;
            }
            points[a].add_neighbor(b);
            points[b].add_neighbor(a);
            unique_edges.push((a.min(b), a.max(b)));
        }

        Ok(Self {
            points,
            edges: unique_edges,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[MeshPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> &MeshPoint {
        &self.points[index]
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.points[index].neighbors()
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Index of the mesh point closest to (x, y).
    ///
    /// Linear scan; the first of several equally close points wins.
    pub fn nearest_point(&self, x: f64, y: f64) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for point in &self.points {
            let distance = point.distance_to(x, y);
            if distance < best_distance {
                best = point.index;
                best_distance = distance;
            }
        }
        best
    }

    /// Smallest box containing every point.
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds {
            left: f64::INFINITY,
            top: f64::INFINITY,
            right: f64::NEG_INFINITY,
            bottom: f64::NEG_INFINITY,
        };
        for p in &self.points {
            bounds.left = bounds.left.min(p.x);
            bounds.right = bounds.right.max(p.x);
            bounds.top = bounds.top.min(p.y);
            bounds.bottom = bounds.bottom.max(p.y);
        }
        bounds
    }

    /// A regular trivalent honeycomb, scaled and centred into [-0.5, 0.5].
    ///
    /// `columns` x `rows` vertices are laid out as zig-zag rows joined by
    /// alternating vertical edges, which is topologically the Voronoi diagram
    /// of a hexagonal lattice. Interior vertices get three neighbors.
    pub fn honeycomb(columns: usize, rows: usize) -> Result<Self> {
        let layout = HoneycombLayout::new(columns, rows);
        Self::new(&layout.vertices, &layout.edges)
    }

    /// Centres of the complete hexagonal faces of [`Mesh::honeycomb`] with
    /// the same dimensions, in the same normalized coordinates.
    pub fn honeycomb_face_centers(columns: usize, rows: usize) -> Vec<(f64, f64)> {
        HoneycombLayout::new(columns, rows).faces
    }

    /// Copy of this mesh with each point moved by `offset(index)`.
    ///
    /// Topology is unchanged; used to roughen synthetic meshes.
    pub fn displaced(&self, mut offset: impl FnMut(usize) -> (f64, f64)) -> Result<Self> {
        let positions: Vec<(f64, f64)> = self
            .points
            .iter()
            .map(|p| {
                let (dx, dy) = offset(p.index);
                (p.x + dx, p.y + dy)
            })
            .collect();
        Self::new(&positions, &self.edges)
    }
}

/// Raw honeycomb geometry with unit edge length, normalized on construction.
struct HoneycombLayout {
    vertices: Vec<(f64, f64)>,
    edges: Vec<(usize, usize)>,
    faces: Vec<(f64, f64)>,
}

impl HoneycombLayout {
    fn new(columns: usize, rows: usize) -> Self {
        let half_width = 3f64.sqrt() / 2.0;
        let index = |i: usize, j: usize| j * columns + i;
        let even = |i: usize, j: usize| (i + j) % 2 == 0;

        let mut vertices = Vec::with_capacity(columns * rows);
        for j in 0..rows {
            for i in 0..columns {
                let lift = if even(i, j) { 0.5 } else { 0.0 };
                vertices.push((i as f64 * half_width, j as f64 * 1.5 + lift));
            }
        }

        let mut edges = Vec::new();
        for j in 0..rows {
            for i in 0..columns {
                if i + 1 < columns {
                    edges.push((index(i, j), index(i + 1, j)));
                }
                if even(i, j) && j + 1 < rows {
                    edges.push((index(i, j), index(i, j + 1)));
                }
            }
        }

        // a face spans vertex columns i..=i+2 between vertex rows j and j+1
        let mut faces = Vec::new();
        for j in 0..rows.saturating_sub(1) {
            for i in 0..columns.saturating_sub(2) {
                if even(i, j) {
                    faces.push(((i + 1) as f64 * half_width, j as f64 * 1.5 + 1.0));
                }
            }
        }

        let mut layout = Self { vertices, edges, faces };
        layout.normalize();
        layout
    }

    fn normalize(&mut self) {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &self.vertices {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        let extent = (max_x - min_x).max(max_y - min_y);
        if !extent.is_finite() || extent <= 0.0 {
            return;
        }

        // uniform scale keeps the hexagons regular
        let scale = 1.0 / extent;
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;
        let place = |(x, y): (f64, f64)| ((x - cx) * scale, (y - cy) * scale);
        for v in self.vertices.iter_mut() {
            *v = place(*v);
        }
        for f in self.faces.iter_mut() {
            *f = place(*f);
        }
    }
}

fn check_point_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::EmptyMesh);
    }
    if count > MAX_POINTS {
        return Err(Error::TooManyPoints { count, max: MAX_POINTS });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Mesh {
        let positions = [(-0.25, -0.25), (0.25, -0.25), (0.25, 0.25), (-0.25, 0.25)];
        Mesh::new(&positions, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap()
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let mesh = Mesh::honeycomb(9, 7).unwrap();
        for p in mesh.points() {
            for &n in p.neighbors() {
                assert!(mesh.neighbors(n).contains(&p.index),
                    "{} lists {} but not the reverse", p.index, n);
            }
        }
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let positions = [(0.0, 0.0), (0.1, 0.0)];
        let mesh = Mesh::new(&positions, &[(0, 1), (1, 0), (0, 1)]).unwrap();
        assert_eq!(mesh.neighbors(0), &[1]);
        assert_eq!(mesh.neighbors(1), &[0]);
        assert_eq!(mesh.edges().len(), 1);
    }

    #[test]
    fn test_invalid_meshes_rejected() {
        assert!(matches!(Mesh::new(&[], &[]), Err(Error::EmptyMesh)));
        assert!(matches!(
            Mesh::new(&[(0.0, 0.0)], &[(0, 3)]),
            Err(Error::EdgeOutOfRange { count: 1, .. })
        ));
        assert!(matches!(Mesh::new(&[(0.0, 0.0)], &[(0, 0)]), Err(Error::SelfLoop(0))));
        assert!(matches!(
            Mesh::new(&[(0.0, f64::NAN)], &[]),
            Err(Error::NonFiniteCoordinate(0))
        ));
    }

    #[test]
    fn test_point_count_fits_vicinity_slots() {
        assert!(check_point_count(MAX_POINTS).is_ok());
        assert!(matches!(
            check_point_count(MAX_POINTS + 1),
            Err(Error::TooManyPoints { max: MAX_POINTS, .. })
        ));
        assert!(matches!(check_point_count(0), Err(Error::EmptyMesh)));
    }

    #[test]
    fn test_nearest_point() {
        let mesh = square();
        assert_eq!(mesh.nearest_point(-0.3, -0.2), 0);
        assert_eq!(mesh.nearest_point(0.2, 0.3), 2);
        assert_eq!(mesh.nearest_point(0.25, -0.25), 1);
    }

    #[test]
    fn test_honeycomb_is_trivalent_inside() {
        let mesh = Mesh::honeycomb(12, 8).unwrap();
        assert_eq!(mesh.len(), 96);
        let interior = mesh.points().iter().filter(|p| !p.is_on_edge()).count();
        assert!(interior > 0);
        assert!(mesh.points().iter().all(|p| p.neighbors().len() <= 3));

        let bounds = mesh.bounds();
        assert!(bounds.left >= -0.5 - 1e-12 && bounds.right <= 0.5 + 1e-12);
        assert!(bounds.top >= -0.5 - 1e-12 && bounds.bottom <= 0.5 + 1e-12);
    }

    #[test]
    fn test_honeycomb_edges_have_equal_length() {
        let mesh = Mesh::honeycomb(8, 6).unwrap();
        let (a, b) = mesh.edges()[0];
        let unit = mesh.point(a).distance(mesh.point(b));
        for &(a, b) in mesh.edges() {
            let len = mesh.point(a).distance(mesh.point(b));
            assert!((len - unit).abs() < 1e-9, "edge {}-{} has length {}", a, b, len);
        }
    }

    #[test]
    fn test_honeycomb_faces_are_equidistant_from_six_vertices() {
        let mesh = Mesh::honeycomb(8, 6).unwrap();
        let (a, b) = mesh.edges()[0];
        let side = mesh.point(a).distance(mesh.point(b));
        for &(x, y) in &Mesh::honeycomb_face_centers(8, 6) {
            let corners = mesh
                .points()
                .iter()
                .filter(|p| (p.distance_to(x, y) - side).abs() < 1e-9)
                .count();
            assert_eq!(corners, 6);
        }
    }

    #[test]
    fn test_displaced_keeps_topology() {
        let mesh = Mesh::honeycomb(6, 4).unwrap();
        let moved = mesh.displaced(|i| (i as f64 * 1e-4, 0.0)).unwrap();
        assert_eq!(moved.edges(), mesh.edges());
        assert!((moved.point(3).x - mesh.point(3).x - 3e-4).abs() < 1e-12);
    }
}
