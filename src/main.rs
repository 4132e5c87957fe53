use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_mesh::attributes::Attribute;
use terrain_mesh::cache::DrainageCache;
use terrain_mesh::params::{Config, RainPreset};
use terrain_mesh::synthetic;
use terrain_mesh::water::WaterInputs;
use terrain_mesh::{Cartesian, FlowMap, RiverEstimate, VicinityKind, WaterFlow};

/// Marks mesh points that hold no lake
const NO_LAKE: f64 = -666.0;

#[derive(Parser, Debug)]
#[command(name = "terrain_mesh")]
#[command(about = "Generate a terrain mesh, drain it and rasterize it")]
struct Args {
    /// JSON config file (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width of the raster in cells
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Height of the raster in cells
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Neighbor policy: proxcimity, polygon or nearest
    #[arg(short, long)]
    vicinity: Option<VicinityKind>,

    /// Rainfall: arid, temperate or monsoon
    #[arg(short, long)]
    rain: Option<RainPreset>,

    /// Sea level in normalized height units
    #[arg(long)]
    sea_level: Option<f64>,

    /// Blur the height raster
    #[arg(long)]
    smooth: bool,

    /// River entering from the west edge, in m³/s
    #[arg(long)]
    arterial: Option<f64>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn config(&self) -> terrain_mesh::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        } else if self.config.is_none() {
            config.seed = rand::random();
        }
        if let Some(width) = self.width {
            config.grid.width = width;
        }
        if let Some(height) = self.height {
            config.grid.height = height;
        }
        if let Some(kind) = self.vicinity {
            config.grid.vicinity = kind;
        }
        if let Some(rain) = self.rain {
            config.mesh.rain = rain;
        }
        if let Some(sea_level) = self.sea_level {
            config.hydro.sea_level = sea_level;
        }
        config.grid.smooth |= self.smooth;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.config()?;
    if args.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    println!("Generating terrain with seed: {}", config.seed);
    println!("Mesh: {}x{} honeycomb, {} rain", config.mesh.columns, config.mesh.rows, config.mesh.rain);

    let mut terrain = synthetic::generate(&config.mesh, config.seed)?;
    let mesh = &terrain.mesh;
    let attributes = &terrain.attributes;
    let height = attributes.get(Attribute::Height);

    let above_sea = height.iter().filter(|&&z| z >= config.hydro.sea_level).count();
    println!("Points: {} ({:.1}% above sea level)", mesh.len(), 100.0 * above_sea as f64 / mesh.len() as f64);

    // Drainage
    println!("Resolving drainage...");
    let start = Instant::now();
    let mut cache = DrainageCache::new();
    let (hydrology, state) = cache.get(mesh, attributes, &config.hydro)?;
    let depressions = state.sinks.iter().enumerate().filter(|&(p, s)| *s == terrain_mesh::Sink::Point(p)).count();
    println!("  {} depressions, {} lake points, {} trapped ({:?})",
        depressions, state.routing.lakes.len(), state.routing.trapped.len(), start.elapsed());

    // Flow
    let flow = FlowMap::new(hydrology);
    let flux = flow.accumulate_routed(&state.routing, &state.order, attributes.get(Attribute::Rain))?;
    let discharge = flow.discharge(&flux);

    let river = (0..mesh.len())
        .filter(|&p| !hydrology.is_below_sea(p))
        .max_by(|&a, &b| discharge[a].total_cmp(&discharge[b]));
    if let Some(p) = river {
        let estimate = RiverEstimate::from_flow(discharge[p], state.slopes[p], &config.hydro);
        let point = mesh.point(p);
        println!("Largest river at point {} ({:.3}, {:.3}): {:.1} m³/s", p, point.x, point.y, discharge[p]);
        println!("  velocity {:.2} m/s, width {:.1} m, depth {:.2} m",
            estimate.velocity, estimate.width, estimate.depth);
    }

    // Water budget
    let mut incoming = vec![0.0; mesh.len()];
    if let Some(arterial) = args.arterial {
        let bounds = mesh.bounds();
        let (wx, wy) = (bounds.left, (bounds.top + bounds.bottom) / 2.0);
        let from_west = |p: usize| (mesh.point(p).x - wx).hypot(mesh.point(p).y - wy);
        let entry = (0..mesh.len())
            .filter(|&p| !mesh.point(p).is_on_edge() && !hydrology.is_below_sea(p))
            .min_by(|&a, &b| from_west(a).total_cmp(&from_west(b)));
        if let Some(p) = entry {
            incoming[p] = arterial;
            println!("Arterial river of {:.0} m³/s enters at point {}", arterial, p);
        }
    }
    let inputs = WaterInputs {
        rain: attributes.get(Attribute::Rain),
        soil: attributes.get(Attribute::Soil),
        erosion: attributes.get(Attribute::Erosion),
        incoming: Some(&incoming),
    };
    let budget = WaterFlow::new(hydrology).simulate(&state.routing, &state.order, &inputs)?;
    let hydrated = budget.hydration.iter().filter(|&&h| h > 0.0).count();
    println!("Water: fastest river {:.2} m/s, {} hydrated points", budget.max_velocity(), hydrated);
    println!("  {:.4} m eroded, {:.4} m deposited per year", budget.total_eroded(), budget.total_deposited());

    // Rasterize
    let grid_params = &config.grid;
    println!("Building {}x{} {} grid...", grid_params.width, grid_params.height, grid_params.vicinity);
    let start = Instant::now();
    let grid = Cartesian::new(mesh, grid_params.bounds, grid_params.width, grid_params.height, grid_params.vicinity)?;
    println!("  built in {:?}", start.elapsed());

    let mut altitude = grid.interpolate(height)?;
    if grid_params.smooth {
        Cartesian::smooth(&mut altitude);
    }
    let (min_h, max_h) = altitude.min_max();
    let centre = altitude.sample_bilinear((altitude.width as f64 - 1.0) / 2.0, (altitude.height as f64 - 1.0) / 2.0);
    println!("Altitude range: {:.0}m to {:.0}m, {:.0}m at the centre",
        config.hydro.altitude(min_h), config.hydro.altitude(max_h), config.hydro.altitude(centre));

    let levels = Cartesian::encode(&altitude, 0, 9);
    let mut histogram = [0usize; 10];
    for &level in levels.as_slice() {
        histogram[level.clamp(0, 9) as usize] += 1;
    }
    println!("Altitude levels: {:?}", histogram);

    let soil = grid.nearest(attributes.get(Attribute::Soil))?;
    let rock = soil.iter().filter(|&(_, _, &s)| s == synthetic::SOIL_ROCK).count();
    println!("Rock cells: {}", rock);

    let surface: Vec<f64> = state.routing.outlet.iter().map(|o| o.unwrap_or(NO_LAKE)).collect();
    let lakes = grid.nearest_valid(&surface, NO_LAKE)?;
    let wet = lakes.iter().filter(|&(x, y, &s)| s != NO_LAKE && s > *altitude.get(x, y)).count();
    println!("Lake cells: {}", wet);

    // A year of erosion reshapes the drainage
    let increment = budget.erosion_increment(&config.hydro);
    let mut edit = terrain.attributes.edit(Attribute::Erosion);
    for (erosion, dz) in edit.values_mut().iter_mut().zip(&increment) {
        *erosion += dz;
    }
    let revision = edit.commit(&mut terrain.attributes)?;
    let (_, state) = cache.get(mesh, &terrain.attributes, &config.hydro)?;
    let depressions = state.sinks.iter().enumerate().filter(|&(p, s)| *s == terrain_mesh::Sink::Point(p)).count();
    println!("After erosion (revision {}): {} depressions, {} lake points",
        revision, depressions, state.routing.lakes.len());

    Ok(())
}
