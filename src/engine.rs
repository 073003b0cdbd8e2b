use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::combat::{self, CombatReport};
use crate::commands;
use crate::components::{CivicKind, PlayerIndex, TechKind};
use crate::grid::TileId;
use crate::report::TurnReportWriter;
use crate::rng::{RngManager, COMBAT_STREAM};
use crate::systems::{
    economy, EconomySystem, ResearchSystem, UnitUpkeepSystem, VictorySystem, VisibilitySystem,
};
use crate::world::{CityId, GameState, Outcome, ProductionTarget, UnitId};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub report_every_turns: u32,
    pub report_dir: PathBuf,
}

/// Identifies whose turn a system is running for.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    pub turn: u32,
    pub player: PlayerIndex,
}

pub trait TurnSystem {
    fn name(&self) -> &'static str;
    fn run(&mut self, ctx: &TurnContext, game: &mut GameState);
}

pub struct EngineBuilder {
    settings: EngineSettings,
    end_of_turn: Vec<Box<dyn TurnSystem>>,
    start_of_turn: Vec<Box<dyn TurnSystem>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            end_of_turn: Vec::new(),
            start_of_turn: Vec::new(),
        }
    }

    /// Adds a system that runs for the player ending their turn.
    pub fn with_end_system(mut self, system: impl TurnSystem + 'static) -> Self {
        self.end_of_turn.push(Box::new(system));
        self
    }

    /// Adds a system that runs for the player whose turn is beginning.
    pub fn with_start_system(mut self, system: impl TurnSystem + 'static) -> Self {
        self.start_of_turn.push(Box::new(system));
        self
    }

    /// Economy, research and victory at turn end; unit upkeep and
    /// visibility at turn start.
    pub fn with_standard_systems(self) -> Self {
        self.with_end_system(EconomySystem::new())
            .with_end_system(ResearchSystem::new())
            .with_end_system(VictorySystem::new())
            .with_start_system(UnitUpkeepSystem::new())
            .with_start_system(VisibilitySystem::new())
    }

    /// Wraps `game` and runs the start-of-turn systems for its active player.
    pub fn build(self, game: GameState) -> Engine {
        let mut engine = Engine {
            rng: RngManager::new(self.settings.seed),
            reports: TurnReportWriter::new(
                &self.settings.report_dir,
                self.settings.report_every_turns,
            ),
            end_of_turn: self.end_of_turn,
            start_of_turn: self.start_of_turn,
            settings: self.settings,
            game,
        };
        let ctx = engine.context();
        run_phase(&mut engine.start_of_turn, &ctx, &mut engine.game);
        engine
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemRunReport {
    pub name: &'static str,
    pub duration_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnSummary {
    pub turn: u32,
    pub player: PlayerIndex,
    pub system_reports: Vec<SystemRunReport>,
    pub outcome: Option<Outcome>,
}

fn run_phase(
    systems: &mut [Box<dyn TurnSystem>],
    ctx: &TurnContext,
    game: &mut GameState,
) -> Vec<SystemRunReport> {
    let mut reports = Vec::with_capacity(systems.len());
    for system in systems.iter_mut() {
        let start = Instant::now();
        system.run(ctx, game);
        let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
        debug!(
            system = system.name(),
            turn = ctx.turn,
            player = ctx.player,
            duration_ms,
            "system ran"
        );
        reports.push(SystemRunReport {
            name: system.name(),
            duration_ms,
        });
    }
    reports
}

/// Turn controller. Owns the game and sequences players through
/// end-of-turn and start-of-turn processing.
pub struct Engine {
    game: GameState,
    rng: RngManager,
    end_of_turn: Vec<Box<dyn TurnSystem>>,
    start_of_turn: Vec<Box<dyn TurnSystem>>,
    reports: TurnReportWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn into_game(self) -> GameState {
        self.game
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn seed(&self) -> u64 {
        self.rng.master_seed()
    }

    fn context(&self) -> TurnContext {
        TurnContext {
            turn: self.game.turn(),
            player: self.game.active_player(),
        }
    }

    /// Ends the active player's turn. Returns `None`, touching nothing, once
    /// the game is over. A victory declared during this call halts the game
    /// before the turn passes on.
    pub fn end_turn(&mut self) -> Option<TurnSummary> {
        if self.game.is_game_over() {
            return None;
        }
        let ending = self.context();
        let mut system_reports = run_phase(&mut self.end_of_turn, &ending, &mut self.game);

        if !self.game.is_game_over() {
            self.game.advance_player();
            let starting = self.context();
            system_reports.extend(run_phase(
                &mut self.start_of_turn,
                &starting,
                &mut self.game,
            ));
        }

        Some(TurnSummary {
            turn: ending.turn,
            player: ending.player,
            system_reports,
            outcome: self.game.outcome(),
        })
    }

    /// Ends turns until `rounds` full rounds have passed or the game ends,
    /// writing turn reports as configured. Returns the number of turns ended.
    pub fn run(&mut self, rounds: u32) -> Result<u32> {
        let last_turn = self.game.turn().saturating_add(rounds);
        let mut ended = 0;
        while self.game.turn() < last_turn {
            if self.end_turn().is_none() {
                break;
            }
            ended += 1;
            if self.game.is_game_over() {
                if self.reports.is_enabled() {
                    self.reports.write(&self.game, &self.settings.scenario_name)?;
                }
                break;
            }
            self.reports
                .maybe_write(&self.game, &self.settings.scenario_name)?;
        }
        Ok(ended)
    }

    fn owns_unit(&self, unit: UnitId) -> bool {
        !self.game.is_game_over()
            && self
                .game
                .unit(unit)
                .is_some_and(|u| u.owner == self.game.active_player())
    }

    fn owns_city(&self, city: CityId) -> bool {
        !self.game.is_game_over()
            && self
                .game
                .city(city)
                .is_some_and(|c| c.owner == self.game.active_player())
    }

    pub fn move_unit(&mut self, unit: UnitId, to: TileId) -> bool {
        if !self.owns_unit(unit) {
            return false;
        }
        let mut rng = self.rng.stream(COMBAT_STREAM);
        commands::move_unit(&mut self.game, unit, to, &mut rng)
    }

    pub fn fortify(&mut self, unit: UnitId) -> bool {
        self.owns_unit(unit) && commands::fortify(&mut self.game, unit)
    }

    pub fn found_city(&mut self, unit: UnitId, name: &str) -> Option<CityId> {
        if !self.owns_unit(unit) {
            return None;
        }
        commands::found_city(&mut self.game, unit, name)
    }

    pub fn attack_unit(&mut self, attacker: UnitId, defender: UnitId) -> Option<CombatReport> {
        if !self.owns_unit(attacker) {
            return None;
        }
        let mut rng = self.rng.stream(COMBAT_STREAM);
        combat::melee_attack_unit(&mut self.game, attacker, defender, &mut rng)
    }

    pub fn ranged_attack_unit(&mut self, attacker: UnitId, target: UnitId) -> Option<CombatReport> {
        if !self.owns_unit(attacker) {
            return None;
        }
        let mut rng = self.rng.stream(COMBAT_STREAM);
        combat::ranged_attack_unit(&mut self.game, attacker, target, &mut rng)
    }

    pub fn attack_city(&mut self, attacker: UnitId, city: CityId) -> Option<CombatReport> {
        if !self.owns_unit(attacker) {
            return None;
        }
        let mut rng = self.rng.stream(COMBAT_STREAM);
        combat::attack_city(&mut self.game, attacker, city, &mut rng)
    }

    pub fn ranged_attack_city(&mut self, attacker: UnitId, city: CityId) -> Option<CombatReport> {
        if !self.owns_unit(attacker) {
            return None;
        }
        let mut rng = self.rng.stream(COMBAT_STREAM);
        combat::ranged_attack_city(&mut self.game, attacker, city, &mut rng)
    }

    /// Damages a city directly. Returns whether it was captured.
    pub fn damage_city(
        &mut self,
        city: CityId,
        amount: i32,
        attacker: Option<PlayerIndex>,
    ) -> bool {
        if self.game.is_game_over() {
            return false;
        }
        let own_city = self
            .game
            .city(city)
            .is_some_and(|c| Some(c.owner) == attacker);
        if own_city {
            return false;
        }
        combat::receive_damage(&mut self.game, city, amount, attacker)
    }

    pub fn start_production(&mut self, city: CityId, target: ProductionTarget) -> bool {
        self.owns_city(city) && economy::start_production(&mut self.game, city, target)
    }

    /// Sets the active player's research target.
    pub fn set_research(&mut self, tech: TechKind) -> bool {
        let player = self.game.active_player();
        !self.game.is_game_over() && self.game.set_player_research(player, tech)
    }

    /// Sets the active player's civic target.
    pub fn set_civic(&mut self, civic: CivicKind) -> bool {
        let player = self.game.active_player();
        !self.game.is_game_over() && self.game.set_player_civic(player, civic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogs;
    use crate::components::{Terrain, UnitKind, Visibility};
    use crate::grid::HexGrid;
    use crate::world::PlayerState;

    fn settings() -> EngineSettings {
        EngineSettings {
            scenario_name: "unit".into(),
            seed: 11,
            report_every_turns: 0,
            report_dir: PathBuf::from("reports_engine_tests"),
        }
    }

    fn engine() -> Engine {
        let mut game = GameState::new(
            HexGrid::filled(10, 6, Terrain::Grassland),
            Catalogs::standard(),
            vec![PlayerState::new("a"), PlayerState::new("b")],
        );
        game.add_city(0, "A", 12).unwrap();
        game.add_city(1, "B", 47).unwrap();
        EngineBuilder::new(settings())
            .with_standard_systems()
            .build(game)
    }

    #[test]
    fn build_reveals_the_first_players_surroundings() {
        let engine = engine();
        assert_eq!(
            engine.game().grid().tile(12).unwrap().visibility(0),
            Visibility::Visible
        );
        assert_eq!(
            engine.game().grid().tile(47).unwrap().visibility(1),
            Visibility::Unexplored
        );
    }

    #[test]
    fn summary_lists_every_system_run() {
        let mut engine = engine();
        let summary = engine.end_turn().unwrap();
        assert_eq!((summary.turn, summary.player), (1, 0));
        let names: Vec<_> = summary.system_reports.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["economy", "research", "victory", "unit_upkeep", "visibility"]
        );
        assert_eq!(engine.game().active_player(), 1);
    }

    #[test]
    fn commands_are_limited_to_the_active_player() {
        let mut engine = engine();
        let theirs = engine
            .game_mut()
            .spawn_unit(UnitKind::Warrior, 1, 30)
            .unwrap();
        assert!(!engine.fortify(theirs));
        engine.end_turn();
        assert!(engine.fortify(theirs));
    }

    #[test]
    fn owners_cannot_damage_their_own_city() {
        let mut engine = engine();
        let city = engine.game().city_at(12).unwrap();
        engine.game_mut().city_mut(city).unwrap().population = 4;
        assert!(!engine.damage_city(city, 500, Some(0)));
        let state = engine.game().city(city).unwrap();
        assert_eq!(state.hp, 200);
        assert_eq!(state.population, 4);
        assert_eq!(state.owner, 0);
    }

    #[test]
    fn run_stops_after_the_round_budget() {
        let mut engine = engine();
        let ended = engine.run(3).unwrap();
        assert_eq!(ended, 6);
        assert_eq!(engine.game().turn(), 4);
        assert_eq!(engine.game().active_player(), 0);
    }
}
