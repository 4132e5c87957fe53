//! Seeded synthetic terrain for the tools and tests
//!
//! A jittered honeycomb stands in for a real Voronoi mesh, heights come from
//! fBm Perlin noise pulled down towards the map edge so the land ends in
//! sea, and rainfall is the preset mean modulated by a second noise field.

use noise::{NoiseFn, Perlin, Seedable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::attributes::{Attribute, Attributes};
use crate::error::Result;
use crate::mesh::Mesh;
use crate::params::MeshParams;

/// Soil classes, stored as f64 in the soil attribute
pub const SOIL_SEABED: f64 = 0.0;
pub const SOIL_LOWLAND: f64 = 1.0;
pub const SOIL_UPLAND: f64 = 2.0;
pub const SOIL_ROCK: f64 = 3.0;

/// A mesh with its generated attributes.
#[derive(Clone, Debug)]
pub struct Terrain {
    pub mesh: Mesh,
    pub attributes: Attributes,
}

/// Generate terrain for a seed.
pub fn generate(params: &MeshParams, seed: u64) -> Result<Terrain> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let base = Mesh::honeycomb(params.columns, params.rows)?;
    let edge = base
        .edges()
        .first()
        .map(|&(a, b)| base.point(a).distance(base.point(b)))
        .unwrap_or(0.0);
    let jitter = params.jitter.clamp(0.0, 0.45) * edge;
    let mesh = if jitter > 0.0 {
        base.displaced(|_| (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter)))?
    } else {
        base
    };

    let terrain_noise = Perlin::new(1).set_seed(seed as u32);
    let rain_noise = Perlin::new(1).set_seed((seed as u32).wrapping_add(1111));

    let bounds = mesh.bounds();
    let (cx, cy) = ((bounds.left + bounds.right) / 2.0, (bounds.top + bounds.bottom) / 2.0);
    let (half_w, half_h) = (bounds.width().max(f64::EPSILON) / 2.0, bounds.height().max(f64::EPSILON) / 2.0);

    let height: Vec<f64> = mesh
        .points()
        .iter()
        .map(|p| {
            let n = fbm(&terrain_noise, p.x * params.frequency, p.y * params.frequency, params.octaves, 0.5, 2.0);
            // 0 at the centre, 1 at the edge
            let r = ((p.x - cx).abs() / half_w).max((p.y - cy).abs() / half_h).min(1.0);
            0.15 + 0.35 * n - params.edge_falloff * r * r
        })
        .collect();

    let mean_rain = params.rain.annual_rain_cm();
    let rain: Vec<f64> = mesh
        .points()
        .iter()
        .map(|p| {
            let n = fbm(&rain_noise, p.x * 2.0, p.y * 2.0, 3, 0.5, 2.0);
            (mean_rain * (1.0 + 0.6 * n)).max(0.0)
        })
        .collect();

    let soil: Vec<f64> = height
        .iter()
        .map(|&z| match z {
            z if z < 0.0 => SOIL_SEABED,
            z if z < 0.15 => SOIL_LOWLAND,
            z if z < 0.3 => SOIL_UPLAND,
            _ => SOIL_ROCK,
        })
        .collect();

    let mut attributes = Attributes::new(mesh.len());
    attributes.replace(Attribute::Height, height)?;
    attributes.replace(Attribute::Rain, rain)?;
    attributes.replace(Attribute::Soil, soil)?;

    let land = attributes.get(Attribute::Height).iter().filter(|&&z| z >= 0.0).count();
    info!(seed, points = mesh.len(), land, rain = %params.rain, "generated synthetic terrain");

    Ok(Terrain { mesh, attributes })
}

/// Fractal Brownian motion, normalized to roughly [-1, 1].
fn fbm(noise: &Perlin, x: f64, y: f64, octaves: usize, persistence: f64, lacunarity: f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_value > 0.0 {
        total / max_value
    } else {
        0.0
    }
}
