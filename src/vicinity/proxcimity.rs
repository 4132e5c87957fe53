//! Quadrant-based vicinity for continuous attributes.
//!
//! The plane around the query point is split into four quadrants and the
//! closest mesh point in each is kept. The angular spread gives visually
//! continuous interpolation of altitude-like values, but it ignores polygon
//! boundaries and so bleeds across lake shores.

use super::Vicinity;
use crate::mesh::Mesh;

// quadrant slots, y grows towards the south
const SE: usize = 0;
const SW: usize = 1;
const NW: usize = 2;
const NE: usize = 3;

fn quadrant(dx: f64, dy: f64) -> usize {
    match (dx >= 0.0, dy >= 0.0) {
        (true, true) => SE,
        (false, true) => SW,
        (false, false) => NW,
        (true, false) => NE,
    }
}

pub(super) fn find_neighbors(vicinity: &mut Vicinity, mesh: &Mesh, x: f64, y: f64) {
    let mut best: [Option<(usize, f64)>; 4] = [None; 4];

    for point in mesh.points() {
        let dx = point.x - x;
        let dy = point.y - y;
        let distance = dx.hypot(dy);
        let slot = &mut best[quadrant(dx, dy)];
        if slot.map_or(true, |(_, d)| distance < d) {
            *slot = Some((point.index, distance));
        }
    }

    for (index, distance) in best.into_iter().flatten() {
        vicinity.push(index, distance);
    }
}
