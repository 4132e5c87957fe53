use super::{DownhillTable, Hydrology};

/// Where a drainage chain ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sink {
    /// Reached a point below sea level
    Sea,
    /// Reached the edge of the map
    OffMap,
    /// Closed depression with this bottom point
    Point(usize),
}

/// A downhill table and the memoized sink of every point resolved so far.
///
/// Resolution follows downhill links with an explicit path stack instead of
/// recursion, and records the answer for every point on the walked path, so
/// resolving the whole mesh is linear no matter how long the chains are.
#[derive(Clone, Debug)]
pub struct Drainage<'h> {
    hydrology: &'h Hydrology<'h>,
    downhill: DownhillTable,
    sinks: Vec<Option<Sink>>,
}

impl<'h> Drainage<'h> {
    pub(super) fn new(hydrology: &'h Hydrology<'h>, downhill: DownhillTable) -> Self {
        let sinks = vec![None; downhill.len()];
        Self {
            hydrology,
            downhill,
            sinks,
        }
    }

    pub fn hydrology(&self) -> &'h Hydrology<'h> {
        self.hydrology
    }

    pub fn downhill(&self) -> &[Option<usize>] {
        &self.downhill
    }

    /// Whether the sink of `point` is already memoized.
    pub fn is_resolved(&self, point: usize) -> bool {
        self.sinks[point].is_some()
    }

    /// Sink of one point.
    pub fn sink(&mut self, point: usize) -> Sink {
        let mesh = self.hydrology.mesh();
        let mut path = Vec::new();
        let mut current = point;

        let sink = loop {
            if let Some(known) = self.sinks[current] {
                break known;
            }
            path.push(current);
            if self.hydrology.is_below_sea(current) {
                break Sink::Sea;
            }
            if mesh.point(current).is_on_edge() {
                break Sink::OffMap;
            }
            match self.downhill[current] {
                Some(next) => current = next,
                None => break Sink::Point(current),
            }
        };

        for p in path {
            self.sinks[p] = Some(sink);
        }
        sink
    }

    /// Sink of every point, by index.
    pub fn sinks(&mut self) -> Vec<Sink> {
        (0..self.sinks.len()).map(|p| self.sink(p)).collect()
    }

    /// Bottoms of all closed depressions, in index order.
    pub fn depressions(&mut self) -> Vec<usize> {
        (0..self.sinks.len())
            .filter(|&p| self.sink(p) == Sink::Point(p))
            .collect()
    }
}
