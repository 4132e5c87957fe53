//! Terrain mesh library
//!
//! Interpolates attributes of an irregular terrain mesh onto rectangular
//! rasters and simulates drainage, water flow and erosion over it.

pub mod attributes;
pub mod cache;
pub mod cartesian;
pub mod error;
pub mod flow;
pub mod hydrology;
pub mod mesh;
pub mod params;
pub mod synthetic;
pub mod tilemap;
pub mod vicinity;
pub mod water;

pub use cartesian::{Bounds, Cartesian};
pub use error::{Error, Result};
pub use flow::{FlowMap, RiverEstimate};
pub use hydrology::{Drainage, Hydrology, Routing, Sink};
pub use mesh::{Mesh, MeshPoint};
pub use tilemap::Tilemap;
pub use vicinity::{Vicinity, VicinityKind};
pub use water::{WaterBudget, WaterFlow};
