pub mod catalog;
pub mod combat;
pub mod commands;
pub mod components;
pub mod config;
pub mod engine;
pub mod grid;
pub mod noise;
pub mod report;
pub mod rng;
pub mod scenario;
pub mod systems;
pub mod world;
pub mod worldgen;
pub mod yields;

pub use catalog::Catalogs;
pub use engine::{Engine, EngineBuilder, EngineSettings, TurnSummary};
pub use grid::{HexGrid, Tile, TileId};
pub use scenario::{RunOverrides, Scenario, ScenarioLoader};
pub use world::{CityId, GameState, UnitId};
pub use worldgen::WorldGenerator;
pub use yields::Yields;
