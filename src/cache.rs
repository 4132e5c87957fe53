//! Drainage results kept until the heights they came from change
//!
//! Downhill tables, sinks and routing are valid only for the height and
//! erosion arrays they were computed from. [`DrainageCache`] remembers the
//! revisions of those arrays and recomputes when either moves on. A new mesh
//! cannot be detected this way: call [`DrainageCache::invalidate`] after
//! replacing it.

use tracing::debug;

use crate::attributes::{Attribute, Attributes};
use crate::error::Result;
use crate::hydrology::{DownhillTable, Hydrology, Routing, Sink};
use crate::mesh::Mesh;
use crate::params::HydroParams;

/// Everything derived from one height snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct DrainageState {
    pub downhill: DownhillTable,
    pub sinks: Vec<Sink>,
    pub routing: Routing,
    /// Sources-first order over `routing.next`
    pub order: Vec<usize>,
    pub slopes: Vec<f64>,
}

impl DrainageState {
    pub fn compute(hydrology: &Hydrology<'_>) -> Result<Self> {
        let mut drainage = hydrology.drainage();
        let sinks = drainage.sinks();
        let routing = hydrology.route_depressions(&mut drainage);
        let order = routing.flow_order()?;
        let slopes = hydrology.slopes(drainage.downhill())?;
        Ok(Self {
            downhill: drainage.downhill().to_vec(),
            sinks,
            routing,
            order,
            slopes,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Stamp {
    points: usize,
    height: u64,
    erosion: u64,
    params: HydroParams,
}

/// Effective-height snapshot and the drainage derived from it, for one mesh.
#[derive(Clone, Debug, Default)]
pub struct DrainageCache<'m> {
    entry: Option<(Stamp, Hydrology<'m>, DrainageState)>,
    computations: usize,
}

impl<'m> DrainageCache<'m> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drainage for the current height and erosion, recomputed only if they
    /// (or the parameters) changed since the last call. The returned
    /// [`Hydrology`] is the snapshot the state was computed from.
    pub fn get(
        &mut self,
        mesh: &'m Mesh,
        attributes: &Attributes,
        params: &HydroParams,
    ) -> Result<(&Hydrology<'m>, &DrainageState)> {
        let stamp = Stamp {
            points: mesh.len(),
            height: attributes.revision(Attribute::Height),
            erosion: attributes.revision(Attribute::Erosion),
            params: params.clone(),
        };

        let entry = match self.entry.take() {
            Some((cached, hydrology, state)) if cached == stamp => (cached, hydrology, state),
            _ => {
                let hydrology = Hydrology::new(
                    mesh,
                    attributes.get(Attribute::Height),
                    attributes.get(Attribute::Erosion),
                    params.clone(),
                )?;
                let state = DrainageState::compute(&hydrology)?;
                self.computations += 1;
                debug!(
                    height = stamp.height,
                    erosion = stamp.erosion,
                    computations = self.computations,
                    "recomputed drainage"
                );
                (stamp, hydrology, state)
            }
        };
        let (_, hydrology, state) = self.entry.insert(entry);
        Ok((hydrology, state))
    }

    /// Forget the cached drainage.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }

    /// How many times drainage was actually computed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bowl() -> (Mesh, Attributes) {
        let mesh = Mesh::honeycomb(10, 8).unwrap();
        let mut attributes = Attributes::new(mesh.len());
        let heights = mesh.points().iter().map(|p| 0.2 + p.x * p.x + p.y * p.y).collect();
        attributes.replace(Attribute::Height, heights).unwrap();
        (mesh, attributes)
    }

    #[test]
    fn test_recomputes_only_after_relevant_change() {
        let (mesh, mut attributes) = bowl();
        let params = HydroParams::default();
        let mut cache = DrainageCache::new();

        let first = cache.get(&mesh, &attributes, &params).unwrap().1.clone();
        cache.get(&mesh, &attributes, &params).unwrap();
        assert_eq!(cache.computations(), 1);

        // rainfall does not move water
        let mut rain = attributes.edit(Attribute::Rain);
        rain.values_mut().fill(50.0);
        rain.commit(&mut attributes).unwrap();
        cache.get(&mesh, &attributes, &params).unwrap();
        assert_eq!(cache.computations(), 1);

        let mut erosion = attributes.edit(Attribute::Erosion);
        erosion.values_mut()[0] = 0.05;
        erosion.commit(&mut attributes).unwrap();
        let (hydrology, second) = cache.get(&mesh, &attributes, &params).unwrap();
        assert_eq!(second.downhill.len(), first.downhill.len());
        assert_relative_eq!(hydrology.effective_height(0), attributes.get(Attribute::Height)[0] - 0.05);
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn test_invalidate_and_params() {
        let (mesh, attributes) = bowl();
        let mut params = HydroParams::default();
        let mut cache = DrainageCache::new();

        cache.get(&mesh, &attributes, &params).unwrap();
        cache.invalidate();
        assert!(!cache.is_cached());
        cache.get(&mesh, &attributes, &params).unwrap();
        assert_eq!(cache.computations(), 2);

        params.sea_level = 0.25;
        let (hydrology, state) = cache.get(&mesh, &attributes, &params).unwrap();
        assert_eq!(hydrology.params().sea_level, 0.25);
        assert!(state.sinks.contains(&Sink::Sea));
        assert_eq!(cache.computations(), 3);
    }

    #[test]
    fn test_state_is_consistent() {
        let (mesh, attributes) = bowl();
        let mut cache = DrainageCache::new();
        let (_, state) = cache.get(&mesh, &attributes, &HydroParams::default()).unwrap();
        assert_eq!(state.order.len(), mesh.len());
        assert_eq!(state.slopes.len(), mesh.len());
        assert!(state.routing.trapped.is_empty());
    }
}
