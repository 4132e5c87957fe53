//! Enclosing-polygon vicinity for sharp, topologically correct boundaries.
//!
//! Starting from the mesh point nearest the query, we trace the cell that
//! surrounds it: at every vertex take the outgoing edge along which the
//! distance to the query grows the least per unit of edge length (the "most
//! concave" path). On a well-formed mesh this walks the enclosing polygon and
//! comes back to the start. The result gives an abrupt land/water transition
//! exactly on the polygon boundary, which lake shores need.
//!
//! Slot 0 is always the globally nearest mesh point, so this policy doubles as
//! a nearest-value source.

use super::{Vicinity, MAX_NEIGHBORS};
use crate::mesh::Mesh;

pub(super) fn find_neighbors(vicinity: &mut Vicinity, mesh: &Mesh, x: f64, y: f64) {
    let start = mesh.nearest_point(x, y);
    vicinity.push(start, mesh.point(start).distance_to(x, y));

    let mut previous = None;
    let mut current = start;
    let mut closed = false;
    while vicinity.len() < MAX_NEIGHBORS {
        let Some(next) = next_point(mesh, x, y, current, previous) else {
            break; // dead end
        };
        if next == start {
            closed = true;
            break;
        }
        if vicinity.points().any(|p| p == next) {
            break; // looped without passing the start
        }
        vicinity.push(next, mesh.point(next).distance_to(x, y));
        previous = Some(current);
        current = next;
    }

    if closed && !outside_mesh(vicinity, mesh, x, y) {
        vicinity.closed = true;
        return;
    }

    // Could not enclose the query, most likely because it lies beyond the
    // mesh. The closest point and its most concave neighbor are enough for
    // points on the edge of the map.
    vicinity.truncate(2);
}

/// Next vertex of the enclosing polygon, ignoring the edge we arrived on.
fn next_point(mesh: &Mesh, x: f64, y: f64, vertex: usize, previous: Option<usize>) -> Option<usize> {
    let here = mesh.point(vertex);
    let radius = here.distance_to(x, y);

    let mut best = None;
    let mut best_rate = f64::INFINITY;
    for &candidate in here.neighbors() {
        if Some(candidate) == previous {
            continue;
        }
        let there = mesh.point(candidate);
        let step = here.distance(there);
        if step <= 0.0 {
            continue;
        }
        let rate = (there.distance_to(x, y) - radius) / step;
        if rate < best_rate {
            best = Some(candidate);
            best_rate = rate;
        }
    }
    best
}

/// Cheap heuristics for "the query is not inside the traced polygon".
///
/// A real point-in-polygon test is not needed: a query outside the bounding
/// box of the polygon, or a mean radius larger than that box, both indicate a
/// walk around some cell other than the one containing the query.
fn outside_mesh(vicinity: &Vicinity, mesh: &Mesh, x: f64, y: f64) -> bool {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut mean_radius = 0.0;
    for (index, distance) in vicinity.iter() {
        let p = mesh.point(index);
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
        mean_radius += distance;
    }
    mean_radius /= vicinity.len() as f64;

    if x < x_min || x > x_max || y < y_min || y > y_max {
        return true;
    }

    mean_radius > x_max - x_min || mean_radius > y_max - y_min
}
