//! Procedural map generation.
//!
//! Three noise fields (elevation, moisture, temperature) are sampled from one
//! seeded [`NoiseField`], classified into terrain and landform per cell, and
//! handed to [`HexGrid`] which links the adjacency graph.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::{Landform, Terrain};
use crate::grid::{HexGrid, Tile};
use crate::noise::NoiseField;
use crate::rng::{self, RandomSource, RngManager, LANDFORM_STREAM, WORLDGEN_STREAM};

const FIELD_OFFSET_RANGE: f32 = 10_000.0;
const TEMPERATURE_OCTAVES: u32 = 2;

fn default_elevation_scale() -> f64 {
    0.05
}

fn default_moisture_scale() -> f64 {
    0.08
}

fn default_temperature_scale() -> f64 {
    0.03
}

fn default_octaves() -> u32 {
    4
}

fn default_persistence() -> f64 {
    0.5
}

fn default_lacunarity() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    #[serde(default = "default_elevation_scale")]
    pub elevation_scale: f64,
    #[serde(default = "default_moisture_scale")]
    pub moisture_scale: f64,
    #[serde(default = "default_temperature_scale")]
    pub temperature_scale: f64,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f64,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f64,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            elevation_scale: default_elevation_scale(),
            moisture_scale: default_moisture_scale(),
            temperature_scale: default_temperature_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
        }
    }
}

/// A generated map together with the seed that actually produced it.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub seed: u64,
    pub grid: HexGrid,
}

/// Raw per-cell climate, row-major, every value in `[0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct ClimateFields {
    pub elevation: Vec<f64>,
    pub moisture: Vec<f64>,
    pub temperature: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct WorldGenerator {
    params: GeneratorParams,
}

impl WorldGenerator {
    pub fn new(params: GeneratorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GeneratorParams {
        &self.params
    }

    /// Generates a `width` x `height` map. A seed of 0 draws a fresh seed,
    /// which is reported back in [`GeneratedMap::seed`].
    pub fn generate(&self, width: u32, height: u32, seed: u64) -> GeneratedMap {
        let seed = resolve_seed(seed);
        let mut streams = RngManager::new(seed);
        let fields = self.sample_fields(width, height, &mut streams.stream(WORLDGEN_STREAM));
        let grid = build_grid(width, height, &fields, &mut streams.stream(LANDFORM_STREAM));
        log_generated(seed, &grid);
        GeneratedMap { seed, grid }
    }

    /// Same as [`WorldGenerator::generate`] but landform rolls come from the
    /// supplied source.
    pub fn generate_with(
        &self,
        width: u32,
        height: u32,
        seed: u64,
        landform_rng: &mut dyn RandomSource,
    ) -> GeneratedMap {
        let seed = resolve_seed(seed);
        let mut streams = RngManager::new(seed);
        let fields = self.sample_fields(width, height, &mut streams.stream(WORLDGEN_STREAM));
        let grid = build_grid(width, height, &fields, landform_rng);
        log_generated(seed, &grid);
        GeneratedMap { seed, grid }
    }

    pub fn sample_fields<R: Rng + ?Sized>(
        &self,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> ClimateFields {
        if width == 0 || height == 0 {
            return ClimateFields::default();
        }
        let noise = NoiseField::from_rng(rng);
        let p = &self.params;
        let cells = width as usize * height as usize;
        let mut fields = ClimateFields {
            elevation: Vec::with_capacity(cells),
            moisture: Vec::with_capacity(cells),
            temperature: Vec::with_capacity(cells),
        };

        let (ex, ey) = field_offset(rng);
        let (mx, my) = field_offset(rng);
        let (tx, ty) = field_offset(rng);

        let w = f64::from(width);
        let h = f64::from(height);
        for y in 0..height {
            let fy = f64::from(y);
            let latitude = 1.0 - ((fy / h - 0.5).abs() * 2.0);
            let edge_y = 1.0 - ((fy / h - 0.5).abs() * 2.0).powi(2);
            for x in 0..width {
                let fx = f64::from(x);

                let raw = noise.sample_octaves(
                    fx * p.elevation_scale + ex,
                    fy * p.elevation_scale + ey,
                    p.octaves,
                    p.persistence,
                    p.lacunarity,
                );
                let edge_x = 1.0 - ((fx / w - 0.5).abs() * 2.0).powi(2);
                let elevation = raw * 0.7 + edge_x * edge_y * 0.3;
                fields.elevation.push(elevation.clamp(0.0, 1.0));

                let moisture = noise.sample_octaves(
                    fx * p.moisture_scale + mx,
                    fy * p.moisture_scale + my,
                    p.octaves.saturating_sub(1),
                    p.persistence,
                    p.lacunarity,
                );
                fields.moisture.push(moisture.clamp(0.0, 1.0));

                let variation = noise.sample_octaves(
                    fx * p.temperature_scale + tx,
                    fy * p.temperature_scale + ty,
                    TEMPERATURE_OCTAVES,
                    0.5,
                    2.0,
                ) * 0.3;
                let temperature = latitude * 0.7 + variation + 0.15;
                fields.temperature.push(temperature.clamp(0.0, 1.0));
            }
        }
        fields
    }
}

fn resolve_seed(seed: u64) -> u64 {
    if seed == 0 {
        rng::random_seed()
    } else {
        seed
    }
}

fn field_offset<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    let x = rng.uniform(0.0, FIELD_OFFSET_RANGE);
    let y = rng.uniform(0.0, FIELD_OFFSET_RANGE);
    (f64::from(x), f64::from(y))
}

fn log_generated(seed: u64, grid: &HexGrid) {
    info!(
        seed,
        width = grid.width(),
        height = grid.height(),
        tiles = grid.len(),
        "generated map"
    );
}

/// Classifies every cell of `fields` and links the resulting grid.
pub fn build_grid(
    width: u32,
    height: u32,
    fields: &ClimateFields,
    landform_rng: &mut dyn RandomSource,
) -> HexGrid {
    let cells = width as usize * height as usize;
    if cells == 0 || fields.elevation.len() != cells {
        return HexGrid::empty();
    }
    let mut tiles = Vec::with_capacity(cells);
    for y in 0..height {
        for x in 0..width {
            let i = y as usize * width as usize + x as usize;
            let (elevation, moisture, temperature) =
                (fields.elevation[i], fields.moisture[i], fields.temperature[i]);
            let terrain = classify_terrain(elevation, moisture, temperature);
            let landform = classify_landform(terrain, elevation, moisture, temperature, landform_rng);
            let mut tile = Tile::new(x, y, terrain, landform);
            tile.elevation = elevation;
            tile.moisture = moisture;
            tile.temperature = temperature;
            tiles.push(tile);
        }
    }
    HexGrid::from_tiles(width, height, tiles)
}

pub fn classify_terrain(elevation: f64, moisture: f64, temperature: f64) -> Terrain {
    if elevation < 0.3 {
        Terrain::Ocean
    } else if elevation < 0.4 {
        Terrain::Coast
    } else if temperature < 0.15 {
        Terrain::Snow
    } else if temperature < 0.3 {
        Terrain::Tundra
    } else if moisture < 0.25 && temperature > 0.5 {
        Terrain::Desert
    } else if moisture < 0.5 {
        Terrain::Grassland
    } else {
        Terrain::Plain
    }
}

/// Picks the overlay for a land cell. Rolls are only drawn for the rules a
/// cell actually reaches, in precedence order.
pub fn classify_landform(
    terrain: Terrain,
    elevation: f64,
    moisture: f64,
    temperature: f64,
    rng: &mut dyn RandomSource,
) -> Landform {
    if terrain.is_water() {
        return Landform::None;
    }
    if elevation > 0.85 {
        return Landform::Mountain;
    }
    if elevation > 0.7 {
        return Landform::Hills;
    }
    if terrain == Terrain::Snow && rng.chance(0.3) {
        return Landform::Ice;
    }
    if terrain == Terrain::Desert && moisture > 0.3 && rng.chance(0.05) {
        return Landform::Oasis;
    }
    if moisture > 0.6 {
        if temperature > 0.7 {
            if rng.chance(0.6) {
                return Landform::Rainforest;
            }
        } else if temperature > 0.35 && rng.chance(0.5) {
            return Landform::Forest;
        }
    }
    if moisture > 0.7 && temperature > 0.4 && elevation < 0.5 && rng.chance(0.2) {
        return Landform::Marsh;
    }
    if moisture > 0.4 && temperature > 0.3 && temperature < 0.8 && rng.chance(0.25) {
        return Landform::Forest;
    }
    Landform::None
}
