//! Water budget over a routed drainage graph
//!
//! One sources-first sweep carries rain, and any river entering from off the
//! map, downstream. On the way each point's soil soaks up its share and loses
//! part of it to evaporation. Fast water picks up sediment from its bed and
//! slow water drops it again. Points held back by a pass get a lake surface,
//! and dry land above a lake takes that surface as its water table.
//!
//! Flows are m³/s throughout; erosion and deposition come out in metres per
//! year.

use tracing::debug;

use crate::error::{check_len, Result};
use crate::flow::{sort_descending, velocity, SECONDS_PER_YEAR};
use crate::hydrology::{Hydrology, Routing};
use crate::params::HydroParams;

/// Water depth assumed at a lake's escape point (m)
const EXIT_DEPTH_M: f64 = 1.0;

/// Deposition from a dropped load, relative to the bed it came from
const SILT_BOOST: f64 = 4.0;

/// Bed material, as far as water is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Soil {
    Sedimentary,
    Metamorphic,
    Igneous,
    /// Loose river deposits
    Alluvial,
}

impl Soil {
    /// Soil for a class stored in the soil attribute: 0 seabed, 1 lowland,
    /// 2 upland, 3 rock. Unknown classes count as sedimentary.
    pub fn from_class(class: f64) -> Self {
        match class.round() as i64 {
            0 => Self::Alluvial,
            2 => Self::Metamorphic,
            3 => Self::Igneous,
            _ => Self::Sedimentary,
        }
    }

    /// Water held per m³ of soil (m³)
    pub fn saturation(self) -> f64 {
        match self {
            Self::Sedimentary => 0.30,
            Self::Metamorphic => 0.15,
            Self::Igneous => 0.10,
            Self::Alluvial => 0.40,
        }
    }

    /// Resistance to erosion, relative to sedimentary rock
    pub fn resistance(self) -> f64 {
        match self {
            Self::Sedimentary => 1.0,
            Self::Metamorphic => 4.0,
            Self::Igneous => 2.5,
            Self::Alluvial => 0.5,
        }
    }
}

/// Per-point inputs of a water budget.
#[derive(Clone, Copy, Debug)]
pub struct WaterInputs<'a> {
    /// Annual rainfall (cm)
    pub rain: &'a [f64],
    /// Soil class, see [`Soil::from_class`]
    pub soil: &'a [f64],
    /// Erosion attribute; points built up by deposits (negative) are alluvial
    pub erosion: &'a [f64],
    /// Rivers flowing in from off the map (m³/s)
    pub incoming: Option<&'a [f64]>,
}

/// Result of [`WaterFlow::simulate`].
#[derive(Clone, Debug, PartialEq)]
pub struct WaterBudget {
    /// Net flow through each point after soil losses (m³/s)
    pub flux: Vec<f64>,
    /// Speed of the water arriving at each point (m/s)
    pub velocity: Vec<f64>,
    /// Sediment carried into each point (m³/s)
    pub suspended: Vec<f64>,
    /// Soil water content (m³/m³) on land. Under water, minus the water
    /// depth in height units.
    pub hydration: Vec<f64>,
    /// Surface of the standing water at or below each point, if any
    pub water_level: Vec<Option<f64>>,
    /// Bed removed per year (m)
    pub eroded: Vec<f64>,
    /// Sediment laid down per year (m)
    pub deposited: Vec<f64>,
}

impl WaterBudget {
    /// One year's change to the erosion attribute, in height units.
    /// Positive where material is removed.
    pub fn erosion_increment(&self, params: &HydroParams) -> Vec<f64> {
        self.eroded
            .iter()
            .zip(&self.deposited)
            .map(|(e, d)| params.z(e - d))
            .collect()
    }

    pub fn total_eroded(&self) -> f64 {
        self.eroded.iter().sum()
    }

    pub fn total_deposited(&self) -> f64 {
        self.deposited.iter().sum()
    }

    pub fn max_velocity(&self) -> f64 {
        self.velocity.iter().cloned().fold(0.0, f64::max)
    }
}

/// Water budget calculator for one height snapshot.
#[derive(Clone, Copy, Debug)]
pub struct WaterFlow<'h> {
    hydrology: &'h Hydrology<'h>,
}

impl<'h> WaterFlow<'h> {
    pub fn new(hydrology: &'h Hydrology<'h>) -> Self {
        Self { hydrology }
    }

    /// Sweep the routed graph in `order` (sources first, as from
    /// [`Routing::flow_order`]).
    pub fn simulate(&self, routing: &Routing, order: &[usize], inputs: &WaterInputs<'_>) -> Result<WaterBudget> {
        let hydrology = self.hydrology;
        let mesh = hydrology.mesh();
        let params = hydrology.params();
        let n = mesh.len();
        check_len("routed graph", n, &routing.next)?;
        check_len("lake outlets", n, &routing.outlet)?;
        check_len("flow order", n, order)?;
        check_len("rainfall", n, inputs.rain)?;
        check_len("soil", n, inputs.soil)?;
        check_len("erosion", n, inputs.erosion)?;
        if let Some(incoming) = inputs.incoming {
            check_len("incoming rivers", n, incoming)?;
        }

        let heights = hydrology.heights();
        let slopes = hydrology.slopes(&routing.next)?;
        let area = params.point_area_m2(n);
        let rain_to_flow = 0.01 * area / SECONDS_PER_YEAR;
        let soaked_volume = params.soil_depth_m * area;
        let evaporation = params.evaporation();

        let mut flux = vec![0.0; n];
        let mut speed = vec![0.0_f64; n];
        let mut suspended = vec![0.0; n];
        // m³/s of bed taken (positive) or laid down (negative)
        let mut removal = vec![0.0; n];
        let mut hydration = vec![0.0; n];
        let mut water_level: Vec<Option<f64>> = vec![None; n];

        for &x in order {
            if hydrology.is_below_sea(x) {
                flux[x] = 0.0;
                hydration[x] = heights[x] - params.sea_level;
                water_level[x] = Some(params.sea_level);
                continue;
            }

            flux[x] += rain_to_flow * inputs.rain[x] + inputs.incoming.map_or(0.0, |incoming| incoming[x]);

            let soil = if inputs.erosion[x] < 0.0 {
                Soil::Alluvial
            } else {
                Soil::from_class(inputs.soil[x])
            };
            let lost = soil.saturation() * soaked_volume * evaporation;

            // the soil takes it all
            if flux[x] * SECONDS_PER_YEAR <= lost {
                hydration[x] = if soaked_volume > 0.0 {
                    flux[x] * SECONDS_PER_YEAR / soaked_volume
                } else {
                    0.0
                };
                flux[x] = 0.0;
                continue;
            }
            hydration[x] = soil.saturation();
            flux[x] -= lost / SECONDS_PER_YEAR;

            if let Some(d) = routing.next[x] {
                flux[d] += flux[x];
                speed[d] = speed[d].max(velocity(slopes[x], params));
                let v = (speed[x] + speed[d]) / 2.0;

                if v >= params.v_erode {
                    let capacity = params.s_max * flux[x];
                    let mut taken = 0.0;
                    // lakes do not scour their beds
                    if routing.outlet[x].is_none() && suspended[x] < capacity {
                        taken = (erosion_rate(soil, v, params) * flux[x]).min(capacity - suspended[x]);
                        removal[x] += taken;
                    }
                    suspended[d] += suspended[x] + taken;
                } else if suspended[x] > 0.0 {
                    let dropped = settling(v, params) * suspended[x];
                    removal[x] -= dropped;
                    suspended[d] += suspended[x] - dropped;
                }
            }

            if let Some(level) = routing.outlet[x] {
                if heights[x] < level {
                    hydration[x] = heights[x] - level;
                    water_level[x] = Some(level);
                } else {
                    let exit = params.z(EXIT_DEPTH_M);
                    hydration[x] = -exit;
                    water_level[x] = Some(heights[x] + exit);
                }
            }
        }

        self.raise_water_table(&mut water_level);

        let per_year = SECONDS_PER_YEAR / area;
        let eroded: Vec<f64> = removal
            .iter()
            .map(|&r| if r > 0.0 { r * per_year } else { 0.0 })
            .collect();
        let deposited: Vec<f64> = (0..n)
            .map(|p| {
                if removal[p] < 0.0 {
                    SILT_BOOST * -removal[p] * per_year
                } else if speed[p] <= params.v_deposit {
                    let span = (params.v_deposit - params.v_min).max(f64::EPSILON);
                    let sloth = ((params.v_deposit - speed[p]) / span).clamp(0.0, 1.0);
                    sloth * flux[p] * params.c_silt * per_year
                } else {
                    0.0
                }
            })
            .collect();

        let budget = WaterBudget {
            flux,
            velocity: speed,
            suspended,
            hydration,
            water_level,
            eroded,
            deposited,
        };
        debug!(
            eroded_m = budget.total_eroded(),
            deposited_m = budget.total_deposited(),
            max_velocity = budget.max_velocity(),
            "simulated water budget"
        );
        Ok(budget)
    }

    /// Give every point above standing water, and without a level of its
    /// own, the level of the water below it. Higher water claims first.
    fn raise_water_table(&self, water_level: &mut [Option<f64>]) {
        let hydrology = self.hydrology;
        let mesh = hydrology.mesh();
        let heights = hydrology.heights();

        let mut by_height: Vec<usize> = (0..mesh.len()).filter(|&p| !hydrology.is_below_sea(p)).collect();
        sort_descending(&mut by_height, heights);

        let mut stack = Vec::new();
        for &p in &by_height {
            let Some(level) = water_level[p] else {
                continue;
            };
            stack.push(p);
            while let Some(q) = stack.pop() {
                for &nb in mesh.neighbors(q) {
                    if heights[nb] > heights[q] && water_level[nb].is_none() {
                        water_level[nb] = Some(level);
                        stack.push(nb);
                    }
                }
            }
        }
    }
}

/// Bed material picked up per m³ of water moving at `v`.
fn erosion_rate(soil: Soil, v: f64, params: &HydroParams) -> f64 {
    if v <= params.v_erode {
        return 0.0;
    }
    let load = params.s_max * (v / params.v_max).min(1.0);
    params.c_erode * load / soil.resistance()
}

/// Fraction of the suspended load that settles out of water moving at `v`.
fn settling(v: f64, params: &HydroParams) -> f64 {
    if v >= params.v_erode {
        return 0.0;
    }
    if v > params.v_min {
        params.c_deposit * (params.v_erode - v) / params.v_erode
    } else {
        params.c_deposit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowMap;
    use crate::hydrology::tests::flat;
    use crate::mesh::Mesh;
    use approx::assert_relative_eq;

    /// Plane falling towards the right edge of a honeycomb.
    fn tilted() -> (Mesh, Vec<f64>) {
        let mesh = Mesh::honeycomb(12, 8).unwrap();
        let heights = mesh.points().iter().map(|p| 0.6 - p.x).collect();
        (mesh, heights)
    }

    fn run(mesh: &Mesh, heights: &[f64], params: HydroParams, rain: f64, soil: f64, incoming: Option<&[f64]>) -> WaterBudget {
        let n = mesh.len();
        let hydro = Hydrology::new(mesh, heights, &flat(n), params).unwrap();
        let mut drainage = hydro.drainage();
        let routing = hydro.route_depressions(&mut drainage);
        let order = routing.flow_order().unwrap();
        let inputs = WaterInputs {
            rain: &vec![rain; n],
            soil: &vec![soil; n],
            erosion: &flat(n),
            incoming,
        };
        WaterFlow::new(&hydro).simulate(&routing, &order, &inputs).unwrap()
    }

    #[test]
    fn test_soil_classes() {
        assert_eq!(Soil::from_class(0.0), Soil::Alluvial);
        assert_eq!(Soil::from_class(1.0), Soil::Sedimentary);
        assert_eq!(Soil::from_class(2.0), Soil::Metamorphic);
        assert_eq!(Soil::from_class(3.0), Soil::Igneous);
        assert_eq!(Soil::from_class(17.0), Soil::Sedimentary);
    }

    #[test]
    fn test_without_losses_matches_flow_map() {
        let (mesh, heights) = tilted();
        let params = HydroParams { soil_depth_m: 0.0, ..Default::default() };
        let budget = run(&mesh, &heights, params.clone(), 80.0, 1.0, None);

        let hydro = Hydrology::new(&mesh, &heights, &flat(mesh.len()), params).unwrap();
        let mut drainage = hydro.drainage();
        let routing = hydro.route_depressions(&mut drainage);
        let order = routing.flow_order().unwrap();
        let flow = FlowMap::new(&hydro);
        let expected = flow.discharge(&flow.accumulate_routed(&routing, &order, &vec![80.0; mesh.len()]).unwrap());

        for p in 0..mesh.len() {
            assert_relative_eq!(budget.flux[p], expected[p], max_relative = 1e-9);
        }
    }

    #[test]
    fn test_dry_soil_swallows_light_rain() {
        let (mesh, heights) = tilted();
        let budget = run(&mesh, &heights, HydroParams::default(), 5.0, 3.0, None);

        assert!(budget.flux.iter().all(|&f| f == 0.0));
        // 5 cm of rain into 1 m of soil
        for &h in &budget.hydration {
            assert_relative_eq!(h, 0.05, max_relative = 1e-9);
        }
        assert_eq!(budget.total_eroded(), 0.0);
        assert_eq!(budget.total_deposited(), 0.0);
    }

    #[test]
    fn test_evaporation_reduces_flow() {
        let (mesh, heights) = tilted();
        let wet = run(&mesh, &heights, HydroParams { soil_depth_m: 0.0, ..Default::default() }, 100.0, 1.0, None);
        let budget = run(&mesh, &heights, HydroParams::default(), 100.0, 1.0, None);

        for p in 0..mesh.len() {
            assert!(budget.flux[p] <= wet.flux[p]);
        }
        assert!(budget.flux.iter().any(|&f| f > 0.0));
        assert!(budget.hydration.iter().all(|&h| (h - Soil::Sedimentary.saturation()).abs() < 1e-12));
    }

    #[test]
    fn test_steep_rivers_erode_and_gentle_ones_silt_up() {
        let (mesh, heights) = tilted();

        let steep = HydroParams { xy_range_km: 1.0, ..Default::default() };
        let budget = run(&mesh, &heights, steep.clone(), 250.0, 1.0, None);
        assert!(budget.total_eroded() > 0.0);
        assert!(budget.max_velocity() >= steep.v_erode);
        // never more than the water can carry
        let per_year = SECONDS_PER_YEAR / steep.point_area_m2(mesh.len());
        for p in 0..mesh.len() {
            assert!(budget.eroded[p] <= steep.s_max * budget.flux[p] * per_year * (1.0 + 1e-9));
        }

        let gentle = run(&mesh, &heights, HydroParams::default(), 250.0, 1.0, None);
        assert_eq!(gentle.total_eroded(), 0.0);
        assert!(gentle.total_deposited() > 0.0);
        let increment = gentle.erosion_increment(&HydroParams::default());
        assert!(increment.iter().all(|&dz| dz <= 0.0));
    }

    #[test]
    fn test_lake_surface_and_water_table() {
        let (mesh, mut heights) = tilted();
        let pit = mesh.nearest_point(0.0, 0.0);
        heights[pit] = 0.05;

        let budget = run(&mesh, &heights, HydroParams::default(), 100.0, 1.0, None);
        let level = budget.water_level[pit].unwrap();
        assert!(level > heights[pit]);
        assert_relative_eq!(budget.hydration[pit], heights[pit] - level, epsilon = 1e-12);
        assert_eq!(budget.eroded[pit], 0.0);
        for &nb in mesh.neighbors(pit) {
            assert!(budget.water_level[nb].is_some(), "{} has no water table", nb);
        }
    }

    #[test]
    fn test_incoming_river_flows_downstream() {
        let (mesh, heights) = tilted();
        let params = HydroParams { soil_depth_m: 0.0, ..Default::default() };
        let source = mesh.nearest_point(-0.2, 0.0);

        let mut incoming = vec![0.0; mesh.len()];
        incoming[source] = 50.0;
        let dry = run(&mesh, &heights, params.clone(), 10.0, 1.0, None);
        let fed = run(&mesh, &heights, params, 10.0, 1.0, Some(&incoming));

        assert_relative_eq!(fed.flux[source] - dry.flux[source], 50.0, max_relative = 1e-9);
        let hydro = Hydrology::new(&mesh, &heights, &flat(mesh.len()), HydroParams::default()).unwrap();
        let below = hydro.downhill()[source].unwrap();
        assert_relative_eq!(fed.flux[below] - dry.flux[below], 50.0, max_relative = 1e-9);
    }

    #[test]
    fn test_inputs_checked() {
        let (mesh, heights) = tilted();
        let hydro = Hydrology::new(&mesh, &heights, &flat(mesh.len()), HydroParams::default()).unwrap();
        let mut drainage = hydro.drainage();
        let routing = hydro.route_depressions(&mut drainage);
        let order = routing.flow_order().unwrap();
        let n = mesh.len();
        let inputs = WaterInputs {
            rain: &vec![1.0; n],
            soil: &vec![1.0; n - 1],
            erosion: &flat(n),
            incoming: None,
        };
        assert!(WaterFlow::new(&hydro).simulate(&routing, &order, &inputs).is_err());
    }
}
