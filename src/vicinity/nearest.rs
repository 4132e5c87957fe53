//! Single closest point, for attributes that do not interpolate
//! (soil class, flora and fauna types).

use super::Vicinity;
use crate::mesh::Mesh;

pub(super) fn find_neighbors(vicinity: &mut Vicinity, mesh: &Mesh, x: f64, y: f64) {
    let index = mesh.nearest_point(x, y);
    vicinity.push(index, mesh.point(index).distance_to(x, y));
}
