//! Write-only JSON turn reports.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::components::{CivicKind, PlayerIndex, TechKind};
use crate::world::{GameState, Outcome, ProductionItem};
use crate::yields::Yields;

#[derive(Debug, Serialize)]
pub struct PlayerReport {
    pub index: PlayerIndex,
    pub name: String,
    pub resources: Yields,
    pub last_turn_yield: Yields,
    pub research: Option<TechKind>,
    pub civic: Option<CivicKind>,
    pub unlocked_techs: Vec<TechKind>,
    pub unlocked_civics: Vec<CivicKind>,
    pub cities: usize,
    pub units: usize,
}

#[derive(Debug, Serialize)]
pub struct CityReport {
    pub id: u32,
    pub name: String,
    pub owner: PlayerIndex,
    pub population: i32,
    pub food_stock: i32,
    pub hp: i32,
    pub territory: usize,
    pub production: Option<ProductionItem>,
}

#[derive(Debug, Serialize)]
pub struct TurnReport {
    pub scenario: String,
    pub generated_at: DateTime<Utc>,
    pub turn: u32,
    pub active_player: PlayerIndex,
    pub outcome: Option<Outcome>,
    pub players: Vec<PlayerReport>,
    pub cities: Vec<CityReport>,
}

impl TurnReport {
    pub fn capture(game: &GameState, scenario: &str) -> Self {
        let players = game
            .players()
            .iter()
            .enumerate()
            .map(|(index, player)| PlayerReport {
                index,
                name: player.name.clone(),
                resources: player.resources,
                last_turn_yield: player.last_turn_yield,
                research: player.research.current,
                civic: player.civics.current,
                unlocked_techs: game.unlocked_techs(index),
                unlocked_civics: game.unlocked_civics(index),
                cities: game.cities_of(index).len(),
                units: game.units_of(index).len(),
            })
            .collect();
        let cities = game
            .cities()
            .map(|(id, city)| CityReport {
                id: id.raw(),
                name: city.name.clone(),
                owner: city.owner,
                population: city.population,
                food_stock: city.food_stock,
                hp: city.hp,
                territory: city.territory().len(),
                production: city.production.clone(),
            })
            .collect();
        Self {
            scenario: scenario.to_string(),
            generated_at: Utc::now(),
            turn: game.turn(),
            active_player: game.active_player(),
            outcome: game.outcome(),
            players,
            cities,
        }
    }
}

/// Writes a report at the start of every `every_turns`-th round into
/// `<output_dir>/<scenario>/turn_NNNNNN.json`. An interval of 0 disables it.
pub struct TurnReportWriter {
    every_turns: u32,
    output_dir: PathBuf,
}

impl TurnReportWriter {
    pub fn new(output_dir: impl AsRef<Path>, every_turns: u32) -> Self {
        Self {
            every_turns,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.every_turns > 0
    }

    pub fn maybe_write(&self, game: &GameState, scenario: &str) -> Result<Option<PathBuf>> {
        if !self.is_enabled() || game.active_player() != 0 {
            return Ok(None);
        }
        let completed = game.turn().saturating_sub(1);
        if completed == 0 || completed % self.every_turns != 0 {
            return Ok(None);
        }
        self.write(game, scenario).map(Some)
    }

    /// Writes a report for the current state regardless of the interval.
    pub fn write(&self, game: &GameState, scenario: &str) -> Result<PathBuf> {
        let dir = self.output_dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
        let path = dir.join(format!("turn_{:06}.json", game.turn()));
        let report = TurnReport::capture(game, scenario);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write turn report {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogs;
    use crate::components::Terrain;
    use crate::grid::HexGrid;
    use crate::world::PlayerState;

    fn game() -> GameState {
        GameState::new(
            HexGrid::filled(4, 4, Terrain::Plain),
            Catalogs::standard(),
            vec![PlayerState::new("solo")],
        )
    }

    #[test]
    fn zero_interval_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TurnReportWriter::new(dir.path(), 0);
        let mut game = game();
        game.advance_player();
        assert!(writer.maybe_write(&game, "s").unwrap().is_none());
    }

    #[test]
    fn writes_on_interval_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TurnReportWriter::new(dir.path(), 2);
        let mut game = game();
        assert!(writer.maybe_write(&game, "s").unwrap().is_none());
        game.advance_player();
        assert!(writer.maybe_write(&game, "s").unwrap().is_none());
        game.advance_player();
        let path = writer.maybe_write(&game, "s").unwrap().unwrap();
        assert_eq!(path, dir.path().join("s").join("turn_000003.json"));

        let text = std::fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["turn"], 3);
        assert_eq!(value["players"][0]["name"], "solo");
    }
}
