use std::collections::VecDeque;

use tracing::{debug, warn};

use super::{Drainage, Hydrology, Sink};
use crate::error::{Error, Result};

/// Drainage with every closed depression spilled over its lowest pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Routing {
    /// Where each point sends its water. Mostly the downhill table, but a
    /// depression bottom points at its escape, which lies uphill. Edge and
    /// sea points send it nowhere.
    pub next: Vec<Option<usize>>,
    /// Final sink of each point after basins were merged.
    pub basin: Vec<Sink>,
    /// Water surface height for points held back by a pass.
    pub outlet: Vec<Option<f64>>,
    /// Points under standing water (outlet above the ground).
    pub lakes: Vec<usize>,
    /// Depression bottoms that found no way out.
    pub trapped: Vec<usize>,
}

impl Routing {
    /// Sources-first order over the routed graph.
    pub fn flow_order(&self) -> Result<Vec<usize>> {
        flow_order(&self.next)
    }
}

/// Kahn topological sort of a drainage graph: every point comes before the
/// point it drains into.
pub fn flow_order(next: &[Option<usize>]) -> Result<Vec<usize>> {
    let n = next.len();
    let mut references = vec![0usize; n];
    for &d in next.iter().flatten() {
        references[d] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&p| references[p] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(p) = queue.pop_front() {
        order.push(p);
        if let Some(d) = next[p] {
            references[d] -= 1;
            if references[d] == 0 {
                queue.push_back(d);
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n).find(|&p| references[p] > 0).unwrap_or(0);
        return Err(Error::RoutingCycle(stuck));
    }
    Ok(order)
}

impl Hydrology<'_> {
    /// Spill every closed depression into a neighboring basin.
    ///
    /// For each basin we look for the lowest pass: the cheapest edge leaving
    /// it, at the height of the higher of its two ends. If that higher end is
    /// outside the basin the bottom drains straight to it; otherwise it is a
    /// saddle on our rim, and water runs bottom -> saddle -> outside point.
    /// The basin then joins the basin it spilled into, and its points at or
    /// below the pass get that height as their outlet. Merging repeats until
    /// nothing changes.
    pub fn route_depressions(&self, drainage: &mut Drainage<'_>) -> Routing {
        let mesh = self.mesh();
        let heights = self.heights();
        let n = mesh.len();

        // edge and sea points end the graph, as they end sink resolution
        let mut next: Vec<Option<usize>> = drainage
            .downhill()
            .iter()
            .enumerate()
            .map(|(p, &d)| {
                if mesh.point(p).is_on_edge() || self.is_below_sea(p) {
                    None
                } else {
                    d
                }
            })
            .collect();
        let mut basin = drainage.sinks();
        let mut outlet: Vec<Option<f64>> = vec![None; n];
        let raise = |slot: &mut Option<f64>, height: f64| {
            *slot = Some(slot.map_or(height, |o: f64| o.max(height)));
        };

        let mut passes = 0;
        loop {
            let mut combined = false;
            for s in 0..n {
                if basin[s] != Sink::Point(s) || next[s].is_some() {
                    continue;
                }

                // (thru, to, height) of the lowest pass out of this basin
                let mut escape: Option<(usize, usize, f64)> = None;
                let mut escape_height = f64::INFINITY;
                for point in (0..n).filter(|&p| basin[p] == Sink::Point(s)) {
                    let z1 = heights[point];
                    for &nb in mesh.neighbors(point) {
                        if basin[nb] == Sink::Point(s) {
                            continue;
                        }
                        let z2 = heights[nb];
                        if z2 >= z1 && z2 < escape_height {
                            escape = Some((nb, nb, z2));
                            escape_height = z2;
                        } else if z1 >= z2 && z1 < escape_height {
                            escape = Some((point, nb, z1));
                            escape_height = z1;
                        }
                    }
                }

                let Some((thru, to, pass)) = escape else {
                    continue;
                };

                if thru == to || thru == s {
                    next[s] = Some(to);
                } else {
                    next[s] = Some(thru);
                    next[thru] = Some(to);
                }

                let target = basin[to];
                for p in 0..n {
                    if basin[p] == Sink::Point(s) {
                        basin[p] = target;
                        if heights[p] <= pass {
                            raise(&mut outlet[p], pass);
                        }
                    }
                }

                if thru == to {
                    raise(&mut outlet[to], pass);
                }

                debug!(bottom = s, escape = to, saddle = thru, pass, into = ?target, "spilled depression");
                combined = true;
            }

            passes += 1;
            if !combined {
                break;
            }
        }

        let trapped: Vec<usize> = (0..n)
            .filter(|&p| basin[p] == Sink::Point(p) && next[p].is_none())
            .collect();
        for &bottom in &trapped {
            warn!(bottom, "depression has no escape");
        }

        let lakes: Vec<usize> = (0..n)
            .filter(|&p| outlet[p].is_some_and(|o| o > heights[p]))
            .collect();

        debug!(passes, lakes = lakes.len(), trapped = trapped.len(), "routed depressions");

        Routing {
            next,
            basin,
            outlet,
            lakes,
            trapped,
        }
    }
}
