//! Profiling tool for grid construction, interpolation and drainage

use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_mesh::attributes::Attribute;
use terrain_mesh::cache::DrainageState;
use terrain_mesh::params::MeshParams;
use terrain_mesh::{synthetic, Bounds, Cartesian, FlowMap, Hydrology, VicinityKind};

#[derive(Parser, Debug)]
#[command(name = "profile_grid")]
#[command(about = "Time grid construction per vicinity policy")]
struct Args {
    /// Raster width and height in cells
    #[arg(short, long, default_value = "256")]
    size: usize,

    /// Honeycomb columns (rows scale with it)
    #[arg(short, long, default_value = "64")]
    columns: usize,

    #[arg(long, default_value = "1337")]
    seed: u64,
}

fn share(part: Duration, total: Duration) -> f64 {
    100.0 * part.as_secs_f64() / total.as_secs_f64().max(f64::EPSILON)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();

    let params = MeshParams {
        columns: args.columns,
        rows: args.columns * 3 / 4,
        ..Default::default()
    };

    println!("=== Performance Profiling ===");
    println!("Raster: {}x{} ({} cells)", args.size, args.size, args.size * args.size);

    let start = Instant::now();
    let terrain = synthetic::generate(&params, args.seed)?;
    let terrain_time = start.elapsed();
    println!("Mesh: {} points, generated in {:?}", terrain.mesh.len(), terrain_time);
    println!();

    let mesh = &terrain.mesh;
    let height = terrain.attributes.get(Attribute::Height);

    // Drainage
    let start = Instant::now();
    let hydrology = Hydrology::new(mesh, height, terrain.attributes.get(Attribute::Erosion), Default::default())?;
    let state = DrainageState::compute(&hydrology)?;
    let drainage_time = start.elapsed();
    println!("Drainage + routing: {:?}", drainage_time);

    let start = Instant::now();
    let rain = terrain.attributes.get(Attribute::Rain);
    let flow = FlowMap::new(&hydrology);
    let _sorted = flow.calculate(&state.downhill, rain)?;
    let _routed = flow.accumulate_routed(&state.routing, &state.order, rain)?;
    let flow_time = start.elapsed();
    println!("Flow accumulation: {:?}", flow_time);
    println!();

    let mut rows = Vec::new();
    for &kind in VicinityKind::all() {
        let start = Instant::now();
        let grid = Cartesian::new(mesh, Bounds::whole_map(), args.size, args.size, kind)?;
        let build = start.elapsed();

        let start = Instant::now();
        let _altitude = grid.interpolate(height)?;
        let interpolate = start.elapsed();

        println!("{:<11} build {:>12?}  interpolate {:>12?}  ({})", kind.to_string(), build, interpolate, kind.description());
        rows.push((kind, build + interpolate));
    }

    // Summary
    let total = terrain_time + drainage_time + flow_time + rows.iter().map(|(_, t)| *t).sum::<Duration>();
    println!("\n=== Summary ===");
    println!("Terrain:          {:>8.2}% ({:?})", share(terrain_time, total), terrain_time);
    println!("Drainage:         {:>8.2}% ({:?})", share(drainage_time, total), drainage_time);
    println!("Flow:             {:>8.2}% ({:?})", share(flow_time, total), flow_time);
    for (kind, time) in &rows {
        println!("Grid {:<11}  {:>8.2}% ({:?})", kind.to_string(), share(*time, total), time);
    }
    println!("─────────────────────────────────");
    println!("TOTAL:            {:>8}  {:?}", "100%", total);
    Ok(())
}
