use approx::assert_relative_eq;

use terrain_mesh::attributes::Attribute;
use terrain_mesh::cache::DrainageCache;
use terrain_mesh::water::WaterInputs;
use terrain_mesh::hydrology::flow_order;
use terrain_mesh::params::{HydroParams, MeshParams};
use terrain_mesh::synthetic::{self, Terrain};
use terrain_mesh::{Bounds, Cartesian, FlowMap, Hydrology, Sink, VicinityKind, WaterFlow};

fn terrain(seed: u64) -> Terrain {
    synthetic::generate(&MeshParams::small(), seed).unwrap()
}

fn hydrology(terrain: &Terrain) -> Hydrology<'_> {
    Hydrology::new(
        &terrain.mesh,
        terrain.attributes.get(Attribute::Height),
        terrain.attributes.get(Attribute::Erosion),
        HydroParams::default(),
    )
    .unwrap()
}

#[test]
fn downhill_descends_and_terminates() {
    for seed in 0..5 {
        let terrain = terrain(seed);
        let hydro = hydrology(&terrain);
        let downhill = hydro.downhill();

        for (p, d) in downhill.iter().enumerate() {
            if let Some(d) = *d {
                assert!(hydro.effective_height(d) < hydro.effective_height(p));
            }
        }
        let order = flow_order(&downhill).unwrap();
        assert_eq!(order.len(), terrain.mesh.len());
    }
}

#[test]
fn sinks_are_idempotent_and_terminal() {
    let terrain = terrain(11);
    let hydro = hydrology(&terrain);
    let mut drainage = hydro.drainage();
    let first = drainage.sinks();
    assert_eq!(drainage.sinks(), first);

    for (p, sink) in first.iter().enumerate() {
        match *sink {
            Sink::Point(bottom) => {
                assert!(drainage.downhill()[bottom].is_none());
                assert!(!terrain.mesh.point(bottom).is_on_edge());
                assert!(!hydro.is_below_sea(bottom));
            }
            Sink::Sea => assert!(hydro.is_below_sea(p) || drainage.downhill()[p].is_some()),
            Sink::OffMap => {}
        }
    }
}

#[test]
fn flux_is_rain_plus_upstream() {
    let terrain = terrain(5);
    let hydro = hydrology(&terrain);
    let downhill = hydro.downhill();
    let rain = terrain.attributes.get(Attribute::Rain);
    let flux = FlowMap::new(&hydro).calculate(&downhill, rain).unwrap();

    let mut inflow = vec![0.0; terrain.mesh.len()];
    for (q, d) in downhill.iter().enumerate() {
        if let Some(d) = *d {
            if !hydro.is_below_sea(q) {
                inflow[d] += flux[q];
            }
        }
    }
    for p in 0..terrain.mesh.len() {
        if hydro.is_below_sea(p) {
            assert_eq!(flux[p], 0.0);
        } else {
            assert_relative_eq!(flux[p], rain[p] + inflow[p], max_relative = 1e-9);
        }
    }
}

#[test]
fn routed_water_leaves_the_land() {
    let terrain = terrain(21);
    let hydro = hydrology(&terrain);
    let mut drainage = hydro.drainage();
    let routing = hydro.route_depressions(&mut drainage);
    let order = routing.flow_order().unwrap();

    for start in 0..terrain.mesh.len() {
        let mut p = start;
        while let Some(d) = routing.next[p] {
            p = d;
        }
        let end = terrain.mesh.point(p);
        assert!(
            end.is_on_edge() || hydro.is_below_sea(p) || routing.trapped.contains(&p),
            "water from {} stops inland at {}",
            start,
            p
        );
    }

    let rain = terrain.attributes.get(Attribute::Rain);
    let flux = FlowMap::new(&hydro).accumulate_routed(&routing, &order, rain).unwrap();
    assert!(flux.iter().all(|&f| f >= 0.0));
}

#[test]
fn rasters_stay_within_mesh_range() {
    let terrain = terrain(2);
    let height = terrain.attributes.get(Attribute::Height);
    let lo = height.iter().cloned().fold(f64::MAX, f64::min);
    let hi = height.iter().cloned().fold(f64::MIN, f64::max);

    for &kind in VicinityKind::all() {
        let grid = Cartesian::new(&terrain.mesh, Bounds::whole_map(), 40, 30, kind).unwrap();
        let map = grid.interpolate(height).unwrap();
        let (min, max) = map.min_max();
        assert!(min >= lo - 1e-9 && max <= hi + 1e-9, "{} left the height range", kind);
    }
}

#[test]
fn erosion_year_feeds_back_into_drainage() {
    let mut terrain = terrain(8);
    let params = HydroParams::default();
    let mut cache = DrainageCache::new();

    let increment = {
        let (hydro, state) = cache.get(&terrain.mesh, &terrain.attributes, &params).unwrap();
        let inputs = WaterInputs {
            rain: terrain.attributes.get(Attribute::Rain),
            soil: terrain.attributes.get(Attribute::Soil),
            erosion: terrain.attributes.get(Attribute::Erosion),
            incoming: None,
        };
        let budget = WaterFlow::new(hydro).simulate(&state.routing, &state.order, &inputs).unwrap();
        assert!(budget.flux.iter().all(|&f| f >= 0.0));
        for p in 0..terrain.mesh.len() {
            if hydro.is_below_sea(p) {
                assert_eq!(budget.water_level[p], Some(params.sea_level));
            }
        }
        budget.erosion_increment(&params)
    };

    let mut edit = terrain.attributes.edit(Attribute::Erosion);
    for (erosion, dz) in edit.values_mut().iter_mut().zip(&increment) {
        *erosion += dz;
    }
    edit.commit(&mut terrain.attributes).unwrap();

    let (hydro, state) = cache.get(&terrain.mesh, &terrain.attributes, &params).unwrap();
    assert_eq!(state.order.len(), terrain.mesh.len());
    for (p, &dz) in increment.iter().enumerate() {
        let expected = terrain.attributes.get(Attribute::Height)[p] - dz;
        assert_relative_eq!(hydro.effective_height(p), expected, epsilon = 1e-12);
    }
    assert_eq!(cache.computations(), 2);
}
