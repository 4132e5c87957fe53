//! Water movement over the mesh
//!
//! Everything here works on *effective* heights: the terrain height minus
//! the erosion at each point (positive erosion means material was removed).
//! A [`Hydrology`] takes a snapshot of those heights when it is created, so
//! later edits to the source arrays never leak into tables derived from it.
//!
//! Pipeline:
//! 1. [`Hydrology::downhill`] - steepest-descent neighbor per point
//! 2. [`Drainage`] - memoized sink resolution along downhill chains
//! 3. [`Hydrology::route_depressions`] - spill closed depressions over their
//!    lowest pass, giving a routed graph and lake outlet heights
//! 4. [`Routing::flow_order`] - sources-first order for flow accumulation

mod drainage;
mod routing;

pub use drainage::{Drainage, Sink};
pub use routing::{flow_order, Routing};

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{check_len, Result};
use crate::mesh::Mesh;
use crate::params::HydroParams;

/// Per point, the single steepest-descent neighbor (or none).
pub type DownhillTable = Vec<Option<usize>>;

/// Effective heights of one mesh, with the world scale needed to turn them
/// into slopes.
#[derive(Clone, Debug)]
pub struct Hydrology<'a> {
    mesh: &'a Mesh,
    heights: Vec<f64>,
    params: HydroParams,
}

impl<'a> Hydrology<'a> {
    pub fn new(mesh: &'a Mesh, height: &[f64], erosion: &[f64], params: HydroParams) -> Result<Self> {
        check_len("height", mesh.len(), height)?;
        check_len("erosion", mesh.len(), erosion)?;
        let heights = height.iter().zip(erosion).map(|(h, e)| h - e).collect();
        Ok(Self { mesh, heights, params })
    }

    pub fn mesh(&self) -> &'a Mesh {
        self.mesh
    }

    pub fn params(&self) -> &HydroParams {
        &self.params
    }

    /// Effective height of every point.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn effective_height(&self, point: usize) -> f64 {
        self.heights[point]
    }

    pub fn is_below_sea(&self, point: usize) -> bool {
        self.heights[point] < self.params.sea_level
    }

    /// Lowest strictly-lower neighbor of every point.
    ///
    /// Equally low neighbors resolve to the smallest index, so the table does
    /// not depend on the order edges were supplied in.
    pub fn downhill(&self) -> DownhillTable {
        let mut table = vec![None; self.mesh.len()];
        let mut minima = 0;

        for point in self.mesh.points() {
            let mut best = self.heights[point.index];
            let mut lowest: Option<usize> = None;
            for &n in point.neighbors() {
                let z = self.heights[n];
                if z < best || (z == best && lowest.is_some_and(|l| n < l)) {
                    best = z;
                    lowest = Some(n);
                }
            }
            if lowest.is_none() && !point.is_on_edge() && !self.is_below_sea(point.index) {
                minima += 1;
            }
            table[point.index] = lowest;
        }

        debug!(points = self.mesh.len(), minima, "computed downhill table");
        table
    }

    /// Downhill table plus an empty sink memo.
    pub fn drainage(&self) -> Drainage<'_> {
        Drainage::new(self, self.downhill())
    }

    /// Points connected to the open sea: sub-sea-level edge points and every
    /// sub-sea-level point reachable from them through sub-sea-level points.
    ///
    /// Inland basins below sea level are not oceanic.
    pub fn oceanic(&self) -> Vec<bool> {
        let mut ocean = vec![false; self.mesh.len()];
        let mut queue = VecDeque::new();

        for point in self.mesh.points() {
            if point.is_on_edge() && self.is_below_sea(point.index) {
                ocean[point.index] = true;
                queue.push_back(point.index);
            }
        }

        while let Some(p) = queue.pop_front() {
            for &n in self.mesh.neighbors(p) {
                if !ocean[n] && self.is_below_sea(n) {
                    ocean[n] = true;
                    queue.push_back(n);
                }
            }
        }

        debug!(points = ocean.iter().filter(|&&o| o).count(), "flooded ocean");
        ocean
    }

    /// Slope (metres of drop per metre travelled) from every point to its
    /// downhill neighbor, zero where there is none.
    pub fn slopes(&self, downhill: &[Option<usize>]) -> Result<Vec<f64>> {
        check_len("downhill table", self.mesh.len(), downhill)?;
        Ok(downhill
            .iter()
            .enumerate()
            .map(|(p, d)| d.map_or(0.0, |d| self.slope(p, d)))
            .collect())
    }

    fn slope(&self, from: usize, to: usize) -> f64 {
        let (a, b) = (self.mesh.point(from), self.mesh.point(to));
        let run = self.params.km(a.distance(b)) * 1000.0;
        if run <= 0.0 {
            return 0.0;
        }
        let rise = self.params.altitude(self.heights[from]) - self.params.altitude(self.heights[to]);
        rise.abs() / run
    }
}
