use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::catalog::Catalogs;
use crate::components::{CivicKind, PlayerIndex, TechKind, UnitKind};
use crate::config::{LoggingConfig, MapConfig, ReportConfig};
use crate::engine::{Engine, EngineBuilder, EngineSettings};
use crate::grid::{HexGrid, TileId};
use crate::world::{GameState, PlayerState};
use crate::worldgen::WorldGenerator;

const DEFAULT_TURNS: u32 = 100;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("map must be at least 1x1, got {width}x{height}")]
    EmptyMap { width: u32, height: u32 },
    #[error("scenario needs at least one player")]
    NoPlayers,
    #[error("no start tile left for player {player} ({name})")]
    NoStartTile { player: PlayerIndex, name: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 0 draws a fresh seed at build time.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub turns: Option<u32>,
    #[serde(default)]
    pub map: MapConfig,
    pub players: Vec<ScenarioPlayer>,
    /// Optional balance override file, relative to the loader's base directory.
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioPlayer {
    pub name: String,
    #[serde(default)]
    pub research: Option<TechKind>,
    #[serde(default)]
    pub civic: Option<CivicKind>,
}

/// Command-line overrides applied on top of a scenario.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub seed: Option<u64>,
    pub report_every_turns: Option<u32>,
    pub report_dir: Option<PathBuf>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }

    /// The scenario's balance tables: its override file if it names one,
    /// otherwise the standard data.
    pub fn load_catalogs(&self, scenario: &Scenario) -> Result<Catalogs> {
        let Some(file) = &scenario.catalog_file else {
            return Ok(Catalogs::standard());
        };
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let catalogs = Catalogs::from_yaml_str(&data)
            .with_context(|| format!("Invalid catalog file {}", path.display()))?;
        Ok(catalogs)
    }
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.map.width == 0 || self.map.height == 0 {
            return Err(ScenarioError::EmptyMap {
                width: self.map.width,
                height: self.map.height,
            });
        }
        if self.players.is_empty() {
            return Err(ScenarioError::NoPlayers);
        }
        Ok(())
    }

    pub fn turns(&self, override_turns: Option<u32>) -> u32 {
        override_turns.or(self.turns).unwrap_or(DEFAULT_TURNS)
    }

    /// Generates the map and places a capital and a warrior for every
    /// player. Returns the game and the seed actually used.
    pub fn build_game(
        &self,
        catalogs: Catalogs,
        seed_override: Option<u64>,
    ) -> Result<(GameState, u64), ScenarioError> {
        self.validate()?;
        let generator = WorldGenerator::new(self.map.generator.clone());
        let map = generator.generate(
            self.map.width,
            self.map.height,
            seed_override.unwrap_or(self.seed),
        );

        let players = self
            .players
            .iter()
            .map(|p| PlayerState::new(p.name.clone()))
            .collect();
        let mut game = GameState::new(map.grid, catalogs, players);

        for (index, player) in self.players.iter().enumerate() {
            let start = pick_start_tile(&game, index, self.players.len()).ok_or_else(|| {
                ScenarioError::NoStartTile {
                    player: index,
                    name: player.name.clone(),
                }
            })?;
            game.settle_city(index, format!("{} Capital", player.name), start)
                .ok_or_else(|| ScenarioError::NoStartTile {
                    player: index,
                    name: player.name.clone(),
                })?;
            let escort: Vec<TileId> = game.grid().neighbors(start).collect();
            for tile in escort {
                if game.spawn_unit(UnitKind::Warrior, index, tile).is_some() {
                    break;
                }
            }
            if let Some(tech) = player.research {
                game.set_player_research(index, tech);
            }
            if let Some(civic) = player.civic {
                game.set_player_civic(index, civic);
            }
        }

        info!(
            scenario = %self.name,
            seed = map.seed,
            players = self.players.len(),
            "scenario built"
        );
        Ok((game, map.seed))
    }

    pub fn build_engine(
        &self,
        catalogs: Catalogs,
        overrides: &RunOverrides,
    ) -> Result<Engine, ScenarioError> {
        let (game, seed) = self.build_game(catalogs, overrides.seed)?;
        let settings = EngineSettings {
            scenario_name: self.name.clone(),
            seed,
            report_every_turns: overrides
                .report_every_turns
                .unwrap_or(self.report.every_turns),
            report_dir: overrides
                .report_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&self.report.output_dir)),
        };
        Ok(EngineBuilder::new(settings)
            .with_standard_systems()
            .build(game))
    }
}

/// Anchors for `players` capitals spread evenly along the middle row.
fn start_anchor(grid: &HexGrid, player: PlayerIndex, players: usize) -> (i64, i64) {
    let width = i64::from(grid.width());
    let slots = players.max(1) as i64;
    let x = (2 * player as i64 + 1) * width / (2 * slots);
    (x, i64::from(grid.height()) / 2)
}

fn wrapped_distance(grid: &HexGrid, a: (i64, i64), b: (i64, i64)) -> i64 {
    let width = i64::from(grid.width());
    let dx = (a.0 - b.0).abs();
    let dx = dx.min(width - dx);
    let dy = (a.1 - b.1).abs();
    dx * dx + dy * dy
}

/// The unclaimed passable land tile closest to the player's anchor that
/// still has a free passable neighbour for an escort.
fn pick_start_tile(game: &GameState, player: PlayerIndex, players: usize) -> Option<TileId> {
    let grid = game.grid();
    let catalogs = game.catalogs();
    let anchor = start_anchor(grid, player, players);
    grid.tiles()
        .iter()
        .enumerate()
        .filter(|(_, tile)| {
            !tile.is_water() && tile.is_passable(catalogs) && tile.owning_city().is_none()
        })
        .filter(|(id, _)| {
            grid.neighbors(*id).any(|n| {
                grid.tile(n)
                    .is_some_and(|t| t.is_passable(catalogs) && !t.has_unit())
            })
        })
        .min_by_key(|(_, tile)| {
            wrapped_distance(grid, anchor, (i64::from(tile.x), i64::from(tile.y)))
        })
        .map(|(id, _)| id)
}
