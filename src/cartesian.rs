//! Dense rectangular rasters interpolated from the mesh
//!
//! A [`Cartesian`] grid maps every cell of a W x H raster onto a
//! [`Vicinity`] of mesh points. Building it is the expensive step: every
//! cell scans the mesh, so construction is O(W·H·N). Once built, the grid
//! holds only topology (which points, how far), never attribute values, so any
//! number of per-point arrays (height, rainfall, erosion, ...) can be
//! interpolated over it in O(W·H) each.
//!
//! The grid must be rebuilt whenever the mesh, the bounding box or the
//! resolution changes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{check_len, Error, Result};
use crate::mesh::Mesh;
use crate::tilemap::Tilemap;
use crate::vicinity::{Vicinity, VicinityKind};

/// Box in map coordinates. `top` is the smaller y value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    /// The whole normalized map, [-0.5, 0.5] on both axes.
    pub fn whole_map() -> Self {
        Self::new(-0.5, -0.5, 0.5, 0.5)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::whole_map()
    }
}

/// A W x H grid of vicinities over one mesh.
#[derive(Clone, Debug)]
pub struct Cartesian {
    pub width: usize,
    pub height: usize,
    bounds: Bounds,
    kind: VicinityKind,
    point_count: usize,
    cells: Vec<Vicinity>,
}

impl Cartesian {
    /// Build the grid, one vicinity per cell centre.
    pub fn new(
        mesh: &Mesh,
        bounds: Bounds,
        width: usize,
        height: usize,
        kind: VicinityKind,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyGrid { width, height });
        }

        let dx = bounds.width() / width as f64;
        let dy = bounds.height() / height as f64;

        // rows are independent, so fan them out
        let cells: Vec<Vicinity> = (0..height)
            .into_par_iter()
            .flat_map_iter(|r| {
                let y = bounds.top + (r as f64 + 0.5) * dy;
                (0..width).map(move |c| {
                    let x = bounds.left + (c as f64 + 0.5) * dx;
                    Vicinity::find(kind, mesh, x, y)
                })
            })
            .collect();

        debug!(
            width,
            height,
            points = mesh.len(),
            policy = %kind,
            "built cartesian grid"
        );

        Ok(Self {
            width,
            height,
            bounds,
            kind,
            point_count: mesh.len(),
            cells,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn kind(&self) -> VicinityKind {
        self.kind
    }

    /// Vicinity of one cell.
    pub fn cell(&self, col: usize, row: usize) -> &Vicinity {
        &self.cells[row * self.width + col]
    }

    /// Map coordinates of a cell centre.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        let dx = self.bounds.width() / self.width as f64;
        let dy = self.bounds.height() / self.height as f64;
        (
            self.bounds.left + (col as f64 + 0.5) * dx,
            self.bounds.top + (row as f64 + 0.5) * dy,
        )
    }

    /// Interpolate a per-point array into every cell.
    pub fn interpolate(&self, mesh_values: &[f64]) -> Result<Tilemap<f64>> {
        check_len("interpolated values", self.point_count, mesh_values)?;
        let data = self.cells.iter().map(|v| v.interpolate(mesh_values)).collect();
        Ok(Tilemap::from_vec(self.width, self.height, data))
    }

    /// Closest-point value of a categorical per-point array in every cell.
    pub fn nearest<T: Copy>(&self, mesh_values: &[T]) -> Result<Tilemap<T>> {
        check_len("nearest values", self.point_count, mesh_values)?;
        let data = self.cells.iter().map(|v| v.nearest(mesh_values)).collect();
        Ok(Tilemap::from_vec(self.width, self.height, data))
    }

    /// Closest value that is not `invalid`, in every cell.
    pub fn nearest_valid<T: Copy + PartialEq>(
        &self,
        mesh_values: &[T],
        invalid: T,
    ) -> Result<Tilemap<T>> {
        check_len("nearest valid values", self.point_count, mesh_values)?;
        let data = self
            .cells
            .iter()
            .map(|v| v.nearest_valid(mesh_values, invalid))
            .collect();
        Ok(Tilemap::from_vec(self.width, self.height, data))
    }

    /// Re-encode a raster linearly into the integer range [min_value, max_value],
    /// typically altitudes into palette indices.
    pub fn encode(map: &Tilemap<f64>, min_value: i32, max_value: i32) -> Tilemap<i32> {
        let (lowest, highest) = map.min_max();
        let mut scale = (max_value - min_value) as f64;
        if highest > lowest {
            scale /= highest - lowest;
        }
        map.map(|&v| min_value + ((v - lowest) * scale) as i32)
    }

    /// Gaussian blur, applied as two 1D passes (rows, then columns).
    ///
    /// Neighboring cells can pick different vicinities, which leaves small
    /// discontinuities; high-resolution altitude rasters want them smoothed.
    /// Taps falling off the map reuse the centre value.
    pub fn smooth(map: &mut Tilemap<f64>) {
        // radius 3, normalized to sum to 1
        const KERNEL: [f64; 7] = [0.03663, 0.11128, 0.21675, 0.27068, 0.21675, 0.11128, 0.03663];
        const OFFSET: isize = (KERNEL.len() / 2) as isize;

        let (width, height) = (map.width as isize, map.height as isize);
        let mut rows = map.clone();

        for y in 0..height {
            for x in 0..width {
                let center = *map.get(x as usize, y as usize);
                let sum: f64 = KERNEL
                    .iter()
                    .enumerate()
                    .map(|(i, k)| {
                        let xx = x + i as isize - OFFSET;
                        let v = if xx < 0 || xx >= width { center } else { *map.get(xx as usize, y as usize) };
                        k * v
                    })
                    .sum();
                rows.set(x as usize, y as usize, sum);
            }
        }

        for y in 0..height {
            for x in 0..width {
                let center = *rows.get(x as usize, y as usize);
                let sum: f64 = KERNEL
                    .iter()
                    .enumerate()
                    .map(|(i, k)| {
                        let yy = y + i as isize - OFFSET;
                        let v = if yy < 0 || yy >= height { center } else { *rows.get(x as usize, yy as usize) };
                        k * v
                    })
                    .sum();
                map.set(x as usize, y as usize, sum);
            }
        }
    }
}
