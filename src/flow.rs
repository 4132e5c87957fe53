//! Flux accumulation over drainage tables
//!
//! Every point collects its own rainfall plus everything that drains into it
//! from upstream. Processing points from the highest to the lowest makes one
//! sweep enough: downhill links always point strictly lower, so a point's
//! total is final by the time we push it onward.

use tracing::debug;

use crate::error::{check_len, Result};
use crate::hydrology::{Hydrology, Routing};
use crate::params::HydroParams;

pub(crate) const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0;

/// Flux accumulator for one height snapshot.
#[derive(Clone, Copy, Debug)]
pub struct FlowMap<'h> {
    hydrology: &'h Hydrology<'h>,
}

impl<'h> FlowMap<'h> {
    pub fn new(hydrology: &'h Hydrology<'h>) -> Self {
        Self { hydrology }
    }

    /// Accumulated flux at every point, in the units of `rain`.
    ///
    /// Points below sea level end the flow and carry no flux.
    pub fn calculate(&self, downhill: &[Option<usize>], rain: &[f64]) -> Result<Vec<f64>> {
        let n = self.hydrology.mesh().len();
        check_len("downhill table", n, downhill)?;
        check_len("rainfall", n, rain)?;

        let mut order: Vec<usize> = (0..n).collect();
        sort_descending(&mut order, self.hydrology.heights());

        let flux = self.sweep(&order, downhill, rain);
        debug!(points = n, total = flux.iter().sum::<f64>(), "accumulated flux");
        Ok(flux)
    }

    /// Same accumulation along the routed graph, where depression bottoms
    /// drain uphill to their escape.
    ///
    /// `order` must list sources before the points they drain into, as
    /// [`Routing::flow_order`] does.
    pub fn accumulate_routed(&self, routing: &Routing, order: &[usize], rain: &[f64]) -> Result<Vec<f64>> {
        let n = self.hydrology.mesh().len();
        check_len("routed graph", n, &routing.next)?;
        check_len("flow order", n, order)?;
        check_len("rainfall", n, rain)?;
        Ok(self.sweep(order, &routing.next, rain))
    }

    fn sweep(&self, order: &[usize], next: &[Option<usize>], rain: &[f64]) -> Vec<f64> {
        let mut flux = vec![0.0; next.len()];
        for &p in order {
            if self.hydrology.is_below_sea(p) {
                flux[p] = 0.0;
                continue;
            }
            flux[p] += rain[p];
            if let Some(d) = next[p] {
                flux[d] += flux[p];
            }
        }
        flux
    }

    /// Convert flux in cm of rain per year (over each point's share of the
    /// map) into discharge in m³/s.
    pub fn discharge(&self, flux: &[f64]) -> Vec<f64> {
        let params = self.hydrology.params();
        let area = params.point_area_m2(self.hydrology.mesh().len());
        let rain_to_flow = 0.01 * area / SECONDS_PER_YEAR;
        flux.iter().map(|f| f * rain_to_flow).collect()
    }
}

/// Sort point indices by strictly descending height.
///
/// Hoare partitioning around the middle element, with an explicit stack of
/// ranges. Not stable.
pub(crate) fn sort_descending(order: &mut [usize], heights: &[f64]) {
    if order.len() < 2 {
        return;
    }

    let mut stack = vec![(0, order.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if lo >= hi {
            continue;
        }
        let pivot = heights[order[lo + (hi - lo) / 2]];
        let (mut i, mut j) = (lo, hi);
        let split = loop {
            while heights[order[i]] > pivot {
                i += 1;
            }
            while heights[order[j]] < pivot {
                j -= 1;
            }
            if i >= j {
                break j;
            }
            order.swap(i, j);
            i += 1;
            j -= 1;
        };
        stack.push((lo, split));
        stack.push((split + 1, hi));
    }
}

/// River speed (m/s) on a slope (m/m): grows with slope, kept within
/// `v_min..=v_max`.
pub fn velocity(slope: f64, params: &HydroParams) -> f64 {
    (3.0 * slope).min(params.v_max).max(params.v_min)
}

/// Channel shape of a river carrying a given discharge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverEstimate {
    /// m/s
    pub velocity: f64,
    /// m
    pub width: f64,
    /// m
    pub depth: f64,
}

impl RiverEstimate {
    /// Estimate from discharge (m³/s) and slope (m/m).
    ///
    /// Width and depth multiply back to the cross-section `flow / velocity`.
    pub fn from_flow(flow: f64, slope: f64, params: &HydroParams) -> Self {
        let velocity = velocity(slope, params);
        let area = flow / velocity;
        Self {
            velocity,
            width: (6.0 * area / velocity).sqrt(),
            depth: (area * velocity / 6.0).sqrt(),
        }
    }
}
