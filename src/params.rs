//! Configuration for grids, drainage and synthetic terrain
//!
//! Every struct has sensible defaults and `#[serde(default)]`, so a config
//! file only needs to mention the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cartesian::Bounds;
use crate::error::{Error, Result};
use crate::vicinity::VicinityKind;

/// Rainfall preset for synthetic terrain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainPreset {
    /// Desert and steppe
    Arid,
    /// Mid-latitude rainfall
    #[default]
    Temperate,
    /// Tropical wet season
    Monsoon,
}

impl RainPreset {
    pub fn all() -> &'static [Self] {
        &[Self::Arid, Self::Temperate, Self::Monsoon]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Arid => "Sparse rain (desert and steppe)",
            Self::Temperate => "Moderate rain",
            Self::Monsoon => "Heavy tropical rain",
        }
    }

    /// Mean annual rainfall in cm
    pub fn annual_rain_cm(&self) -> f64 {
        match self {
            Self::Arid => 15.0,
            Self::Temperate => 80.0,
            Self::Monsoon => 250.0,
        }
    }
}

impl std::fmt::Display for RainPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arid => write!(f, "arid"),
            Self::Temperate => write!(f, "temperate"),
            Self::Monsoon => write!(f, "monsoon"),
        }
    }
}

impl std::str::FromStr for RainPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|preset| preset.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown rain preset '{}' (arid, temperate, monsoon)", s))
    }
}

/// World scale and water-flow constants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydroParams {
    /// Sea level in normalized height units
    pub sea_level: f64,

    /// Width (and height) of the whole map in km
    pub xy_range_km: f64,

    /// Altitude span in metres covered by `z_extent` height units
    pub z_range_m: f64,

    /// Normalized height span (Zmax - Zmin)
    pub z_extent: f64,

    /// Slowest river velocity we model (m/s)
    pub v_min: f64,

    /// Fastest river velocity we model (m/s)
    pub v_max: f64,

    /// Water at or above this speed erodes its bed, slower water drops
    /// its load (m/s)
    pub v_erode: f64,

    /// Below this speed rivers lay down silt (m/s)
    pub v_deposit: f64,

    /// Most sediment a m³ of water can carry (m³)
    pub s_max: f64,

    /// Erosion coefficient
    pub c_erode: f64,

    /// Largest fraction of the suspended load dropped at one point
    pub c_deposit: f64,

    /// Silt carried per m³ of slow water
    pub c_silt: f64,

    /// Depth of soil that holds water (m)
    pub soil_depth_m: f64,

    /// Evaporation half-life at 35°C (days)
    pub evap_half_life_days: f64,

    /// Degrees of cooling that double the evaporation half-life
    pub evap_doubling_deg: f64,

    /// Mean annual temperature (°C)
    pub mean_temp_c: f64,
}

impl Default for HydroParams {
    fn default() -> Self {
        Self {
            sea_level: 0.0,
            xy_range_km: 500.0,
            z_range_m: 10_000.0,
            z_extent: 1.0,
            v_min: 0.1,
            v_max: 3.0,
            v_erode: 1.0,
            v_deposit: 0.3,
            s_max: 0.1,
            c_erode: 0.01,
            c_deposit: 0.5,
            c_silt: 0.0001,
            soil_depth_m: 1.0,
            evap_half_life_days: 2.0,
            evap_doubling_deg: 10.0,
            mean_temp_c: 15.0,
        }
    }
}

impl HydroParams {
    /// Map distance to km
    pub fn km(&self, distance: f64) -> f64 {
        distance * self.xy_range_km
    }

    /// Height to metres above the height origin
    pub fn altitude(&self, z: f64) -> f64 {
        z * self.z_range_m / self.z_extent
    }

    /// Metres to height units, the inverse of [`altitude`](Self::altitude)
    pub fn z(&self, metres: f64) -> f64 {
        metres * self.z_extent / self.z_range_m
    }

    /// Fraction of the water held in soil that evaporates over a year.
    ///
    /// The half-life halves for every `evap_doubling_deg` of warming.
    pub fn evaporation(&self) -> f64 {
        let half_life = self.evap_half_life_days * 2f64.powf((35.0 - self.mean_temp_c) / self.evap_doubling_deg);
        if half_life <= 0.0 {
            return 1.0;
        }
        1.0 - 0.5f64.powf(365.25 / half_life)
    }

    /// Area represented by one of `points` mesh points, in m²
    pub fn point_area_m2(&self, points: usize) -> f64 {
        1.0e6 * self.xy_range_km * self.xy_range_km / points.max(1) as f64
    }
}

/// Raster settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub width: usize,
    pub height: usize,
    pub bounds: Bounds,
    pub vicinity: VicinityKind,
    /// Blur the height raster after interpolation
    pub smooth: bool,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            bounds: Bounds::whole_map(),
            vicinity: VicinityKind::Proxcimity,
            smooth: false,
        }
    }
}

/// Synthetic terrain settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Honeycomb columns and rows
    pub columns: usize,
    pub rows: usize,

    /// Random displacement as a fraction of edge length (0.0-0.45)
    pub jitter: f64,

    /// Noise scale and octave count for heights
    pub frequency: f64,
    pub octaves: usize,

    /// Height lost towards the map edge, keeps land away from the border
    pub edge_falloff: f64,

    pub rain: RainPreset,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            columns: 64,
            rows: 48,
            jitter: 0.3,
            frequency: 3.0,
            octaves: 5,
            edge_falloff: 0.6,
            rain: RainPreset::Temperate,
        }
    }
}

impl MeshParams {
    /// Tiny mesh for quick checks
    pub fn small() -> Self {
        Self {
            columns: 16,
            rows: 12,
            octaves: 3,
            ..Default::default()
        }
    }
}

/// Everything a run needs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub seed: u64,
    pub mesh: MeshParams,
    pub grid: GridParams,
    pub hydro: HydroParams,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
