use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Catalogs, UnitInfo};
use crate::components::{
    BuildingKind, CivicKind, PlayerIndex, TechKind, UnitKind, VictoryKind, WonderKind,
};
use crate::grid::{HexGrid, TileId};
use crate::yields::Yields;

pub const CITY_MAX_HP: i32 = 200;
pub const CITY_BASE_STRENGTH: i32 = 10;
pub const UNIT_MAX_HP: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CityId(u32);

impl CityId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum ProductionTarget {
    Building(BuildingKind),
    Unit(UnitKind),
    Wonder(WonderKind),
}

impl ProductionTarget {
    pub fn cost(self, catalogs: &Catalogs) -> i32 {
        match self {
            ProductionTarget::Building(kind) => catalogs.buildings.info(kind).production_cost,
            ProductionTarget::Unit(kind) => catalogs.units.info(kind).production_cost,
            ProductionTarget::Wonder(kind) => catalogs.wonders.info(kind).production_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionItem {
    pub target: ProductionTarget,
    pub cost: i32,
    pub progress: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct City {
    pub name: String,
    pub owner: PlayerIndex,
    pub position: TileId,
    pub population: i32,
    /// May dip below zero within a turn before starvation is applied.
    pub food_stock: i32,
    pub production_overflow: i32,
    pub production: Option<ProductionItem>,
    pub hp: i32,
    pub max_hp: i32,
    pub combat_strength: i32,
    pub completed: Vec<ProductionTarget>,
    territory: Vec<TileId>,
}

impl City {
    fn new(owner: PlayerIndex, name: String, position: TileId) -> Self {
        Self {
            name,
            owner,
            position,
            population: 1,
            food_stock: 0,
            production_overflow: 0,
            production: None,
            hp: CITY_MAX_HP,
            max_hp: CITY_MAX_HP,
            combat_strength: CITY_BASE_STRENGTH,
            completed: Vec::new(),
            territory: Vec::new(),
        }
    }

    pub fn territory(&self) -> &[TileId] {
        &self.territory
    }

    /// Food needed in stock for the next population point.
    pub fn growth_threshold(&self) -> i32 {
        15 + 8 * (self.population - 1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub kind: UnitKind,
    pub owner: PlayerIndex,
    pub tile: TileId,
    pub hp: i32,
    pub max_hp: i32,
    pub movement: i32,
    pub max_movement: i32,
    pub fortified: bool,
    pub combat_strength: i32,
    pub ranged_strength: i32,
    pub range: u32,
}

impl Unit {
    fn from_info(kind: UnitKind, owner: PlayerIndex, tile: TileId, info: &UnitInfo) -> Self {
        Self {
            kind,
            owner,
            tile,
            hp: UNIT_MAX_HP,
            max_hp: UNIT_MAX_HP,
            movement: info.max_movement,
            max_movement: info.max_movement,
            fortified: false,
            combat_strength: info.combat_strength,
            ranged_strength: info.ranged_strength,
            range: info.range,
        }
    }

    pub fn can_act(&self) -> bool {
        self.movement > 0
    }
}

/// Unlock progress along one tree (technologies or civics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockProgress<T: Ord> {
    pub unlocked: BTreeSet<T>,
    pub current: Option<T>,
    pub progress: i32,
}

impl<T: Ord> Default for UnlockProgress<T> {
    fn default() -> Self {
        Self {
            unlocked: BTreeSet::new(),
            current: None,
            progress: 0,
        }
    }
}

impl<T: Ord + Copy> UnlockProgress<T> {
    /// Switching targets drops accumulated progress; re-selecting the
    /// current target keeps it. Already unlocked items are refused.
    pub fn select(&mut self, item: T) -> bool {
        if self.unlocked.contains(&item) {
            return false;
        }
        if self.current != Some(item) {
            self.current = Some(item);
            self.progress = 0;
        }
        true
    }

    pub fn is_unlocked(&self, item: T) -> bool {
        self.unlocked.contains(&item)
    }
}

pub type PlayerResearchState = UnlockProgress<TechKind>;
pub type PlayerCivicState = UnlockProgress<CivicKind>;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub name: String,
    pub resources: Yields,
    /// Treasury credit from the most recent turn this player ended.
    pub last_turn_yield: Yields,
    pub research: PlayerResearchState,
    pub civics: PlayerCivicState,
}

impl PlayerState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Yields::ZERO,
            last_turn_yield: Yields::ZERO,
            research: PlayerResearchState::default(),
            civics: PlayerCivicState::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub winner: PlayerIndex,
    pub kind: VictoryKind,
}

/// The whole mutable game: grid, rosters, players and turn position.
#[derive(Debug, Clone)]
pub struct GameState {
    grid: HexGrid,
    catalogs: Catalogs,
    players: Vec<PlayerState>,
    cities: BTreeMap<CityId, City>,
    units: BTreeMap<UnitId, Unit>,
    turn: u32,
    active_player: PlayerIndex,
    outcome: Option<Outcome>,
    next_city: u32,
    next_unit: u32,
}

impl GameState {
    pub fn new(grid: HexGrid, catalogs: Catalogs, players: Vec<PlayerState>) -> Self {
        Self {
            grid,
            catalogs,
            players,
            cities: BTreeMap::new(),
            units: BTreeMap::new(),
            turn: 1,
            active_player: 0,
            outcome: None,
            next_city: 0,
            next_unit: 0,
        }
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut HexGrid {
        &mut self.grid
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn active_player(&self) -> PlayerIndex {
        self.active_player
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn player(&self, index: PlayerIndex) -> Option<&PlayerState> {
        self.players.get(index)
    }

    pub fn player_mut(&mut self, index: PlayerIndex) -> Option<&mut PlayerState> {
        self.players.get_mut(index)
    }

    pub fn player_resources(&self, index: PlayerIndex) -> Yields {
        self.player(index).map(|p| p.resources).unwrap_or_default()
    }

    pub fn add_player_resources(&mut self, index: PlayerIndex, amount: Yields) -> bool {
        match self.players.get_mut(index) {
            Some(player) => {
                player.resources += amount;
                true
            }
            None => false,
        }
    }

    pub fn unlocked_techs(&self, index: PlayerIndex) -> Vec<TechKind> {
        self.player(index)
            .map(|p| p.research.unlocked.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn unlocked_civics(&self, index: PlayerIndex) -> Vec<CivicKind> {
        self.player(index)
            .map(|p| p.civics.unlocked.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn current_research(&self, index: PlayerIndex) -> Option<TechKind> {
        self.player(index).and_then(|p| p.research.current)
    }

    pub fn current_civic(&self, index: PlayerIndex) -> Option<CivicKind> {
        self.player(index).and_then(|p| p.civics.current)
    }

    pub fn is_tech_unlocked(&self, index: PlayerIndex, tech: TechKind) -> bool {
        self.player(index)
            .is_some_and(|p| p.research.is_unlocked(tech))
    }

    pub fn is_civic_unlocked(&self, index: PlayerIndex, civic: CivicKind) -> bool {
        self.player(index).is_some_and(|p| p.civics.is_unlocked(civic))
    }

    /// Prerequisites are not checked.
    pub fn set_player_research(&mut self, index: PlayerIndex, tech: TechKind) -> bool {
        self.players
            .get_mut(index)
            .is_some_and(|p| p.research.select(tech))
    }

    pub fn set_player_civic(&mut self, index: PlayerIndex, civic: CivicKind) -> bool {
        self.players
            .get_mut(index)
            .is_some_and(|p| p.civics.select(civic))
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(&id)
    }

    pub fn city_mut(&mut self, id: CityId) -> Option<&mut City> {
        self.cities.get_mut(&id)
    }

    pub fn cities(&self) -> impl Iterator<Item = (CityId, &City)> {
        self.cities.iter().map(|(id, city)| (*id, city))
    }

    pub fn city_ids(&self) -> Vec<CityId> {
        self.cities.keys().copied().collect()
    }

    pub fn cities_of(&self, owner: PlayerIndex) -> Vec<CityId> {
        self.cities
            .iter()
            .filter(|(_, city)| city.owner == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn city_at(&self, tile: TileId) -> Option<CityId> {
        self.cities
            .iter()
            .find(|(_, city)| city.position == tile)
            .map(|(id, _)| *id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.units.iter().map(|(id, unit)| (*id, unit))
    }

    pub fn units_of(&self, owner: PlayerIndex) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|(_, unit)| unit.owner == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn unit_at(&self, tile: TileId) -> Option<UnitId> {
        self.grid.tile(tile).and_then(|t| t.occupant())
    }

    /// Places a city with no territory. Fails if the tile does not exist or
    /// already holds a city centre.
    pub fn add_city(
        &mut self,
        owner: PlayerIndex,
        name: impl Into<String>,
        position: TileId,
    ) -> Option<CityId> {
        if owner >= self.players.len() || self.grid.tile(position).is_none() {
            return None;
        }
        if self.city_at(position).is_some() {
            return None;
        }
        let id = CityId(self.next_city);
        self.next_city += 1;
        self.cities.insert(id, City::new(owner, name.into(), position));
        Some(id)
    }

    /// Founds a city and claims its centre plus every unowned passable
    /// neighbour. The centre must be passable and not owned by another city.
    pub fn settle_city(
        &mut self,
        owner: PlayerIndex,
        name: impl Into<String>,
        position: TileId,
    ) -> Option<CityId> {
        let tile = self.grid.tile(position)?;
        if !tile.is_passable(&self.catalogs) || tile.owning_city().is_some() {
            return None;
        }
        let name = name.into();
        let id = self.add_city(owner, name.clone(), position)?;
        self.add_territory(id, position);
        let ring: Vec<TileId> = self.grid.neighbors(position).collect();
        for neighbor in ring {
            let claimable = self.grid.tile(neighbor).is_some_and(|t| {
                t.owning_city().is_none() && t.is_passable(&self.catalogs)
            });
            if claimable {
                self.add_territory(id, neighbor);
            }
        }
        info!(city = id.raw(), owner, %name, tile = position, "city founded");
        Some(id)
    }

    /// Links `tile` to `city` on both sides. Tiles already owned by a
    /// different city are refused; re-adding an owned tile is a no-op.
    pub fn add_territory(&mut self, city: CityId, tile: TileId) -> bool {
        let Some(city_state) = self.cities.get_mut(&city) else {
            return false;
        };
        let Some(tile_state) = self.grid.tile_mut(tile) else {
            return false;
        };
        match tile_state.owning_city {
            Some(existing) if existing != city => false,
            Some(_) => true,
            None => {
                tile_state.owning_city = Some(city);
                city_state.territory.push(tile);
                true
            }
        }
    }

    pub fn spawn_unit(&mut self, kind: UnitKind, owner: PlayerIndex, tile: TileId) -> Option<UnitId> {
        if owner >= self.players.len() {
            return None;
        }
        let target = self.grid.tile(tile)?;
        if target.has_unit() || !target.is_passable(&self.catalogs) {
            debug!(?kind, tile, "spawn rejected");
            return None;
        }
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        let unit = Unit::from_info(kind, owner, tile, self.catalogs.units.info(kind));
        self.units.insert(id, unit);
        if let Some(target) = self.grid.tile_mut(tile) {
            target.occupant = Some(id);
        }
        Some(id)
    }

    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if let Some(tile) = self.grid.tile_mut(unit.tile) {
            if tile.occupant == Some(id) {
                tile.occupant = None;
            }
        }
        Some(unit)
    }

    /// Moves the occupancy link without any rule checks.
    pub(crate) fn relocate_unit(&mut self, id: UnitId, to: TileId) -> bool {
        let Some(from) = self.units.get(&id).map(|u| u.tile) else {
            return false;
        };
        if self.grid.tile(to).map_or(true, |t| t.has_unit()) {
            return false;
        }
        if let Some(tile) = self.grid.tile_mut(from) {
            tile.occupant = None;
        }
        if let Some(tile) = self.grid.tile_mut(to) {
            tile.occupant = Some(id);
        }
        if let Some(unit) = self.units.get_mut(&id) {
            unit.tile = to;
        }
        true
    }

    /// Latches the first declared outcome; later calls are ignored.
    pub fn declare_victory(&mut self, winner: PlayerIndex, kind: VictoryKind) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(Outcome { winner, kind });
        info!(winner, ?kind, turn = self.turn, "victory declared");
        true
    }

    /// Hands the turn to the next player, wrapping into a new round.
    pub(crate) fn advance_player(&mut self) {
        if self.players.is_empty() {
            return;
        }
        self.active_player += 1;
        if self.active_player >= self.players.len() {
            self.active_player = 0;
            self.turn += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Terrain;

    fn state(players: usize) -> GameState {
        let grid = HexGrid::filled(8, 6, Terrain::Grassland);
        let players = (0..players).map(|i| PlayerState::new(format!("p{i}"))).collect();
        GameState::new(grid, Catalogs::standard(), players)
    }

    #[test]
    fn territory_is_two_way_and_exclusive() {
        let mut game = state(2);
        let a = game.add_city(0, "A", 10).unwrap();
        let b = game.add_city(1, "B", 30).unwrap();
        assert!(game.add_territory(a, 11));
        assert!(game.add_territory(a, 11));
        assert!(!game.add_territory(b, 11));
        assert_eq!(game.city(a).unwrap().territory(), &[11]);
        assert!(game.city(b).unwrap().territory().is_empty());
        assert_eq!(game.grid().tile(11).unwrap().owning_city(), Some(a));
    }

    #[test]
    fn settling_claims_the_ring() {
        let mut game = state(1);
        let centre = game.grid().index(3, 2).unwrap();
        let id = game.settle_city(0, "Capital", centre).unwrap();
        let city = game.city(id).unwrap();
        assert_eq!(city.territory().len(), 7);
        assert_eq!(city.hp, CITY_MAX_HP);
        assert_eq!(city.combat_strength, CITY_BASE_STRENGTH);
        for tile in city.territory() {
            assert_eq!(game.grid().tile(*tile).unwrap().owning_city(), Some(id));
        }
        // a neighbouring settle cannot take an owned centre
        let next = game.grid().index(4, 2).unwrap();
        assert!(game.settle_city(0, "Second", next).is_none());
    }

    #[test]
    fn spawn_rejects_occupied_and_impassable_tiles() {
        let mut game = state(1);
        assert!(game.spawn_unit(UnitKind::Warrior, 0, 5).is_some());
        assert!(game.spawn_unit(UnitKind::Warrior, 0, 5).is_none());
        game.grid_mut().tile_mut(6).unwrap().terrain = Terrain::Ocean;
        assert!(game.spawn_unit(UnitKind::Warrior, 0, 6).is_none());
        assert!(game.spawn_unit(UnitKind::Warrior, 3, 7).is_none());
    }

    #[test]
    fn removing_a_unit_frees_its_tile() {
        let mut game = state(1);
        let id = game.spawn_unit(UnitKind::Scout, 0, 4).unwrap();
        assert_eq!(game.unit_at(4), Some(id));
        let unit = game.remove_unit(id).unwrap();
        assert_eq!(unit.max_movement, 3);
        assert_eq!(game.unit_at(4), None);
    }

    #[test]
    fn research_selection_resets_progress_on_switch() {
        let mut game = state(1);
        assert!(game.set_player_research(0, TechKind::Pottery));
        game.player_mut(0).unwrap().research.progress = 10;
        assert!(game.set_player_research(0, TechKind::Pottery));
        assert_eq!(game.player(0).unwrap().research.progress, 10);
        assert!(game.set_player_research(0, TechKind::Mining));
        assert_eq!(game.player(0).unwrap().research.progress, 0);
        assert!(!game.set_player_research(5, TechKind::Mining));
    }

    #[test]
    fn victory_latches() {
        let mut game = state(2);
        assert!(game.declare_victory(1, VictoryKind::Science));
        assert!(!game.declare_victory(0, VictoryKind::Conquest));
        assert_eq!(
            game.outcome(),
            Some(Outcome {
                winner: 1,
                kind: VictoryKind::Science
            })
        );
    }

    #[test]
    fn advancing_wraps_into_next_round() {
        let mut game = state(2);
        assert_eq!((game.turn(), game.active_player()), (1, 0));
        game.advance_player();
        assert_eq!((game.turn(), game.active_player()), (1, 1));
        game.advance_player();
        assert_eq!((game.turn(), game.active_player()), (2, 0));
    }

    #[test]
    fn invalid_player_reads_as_defaults() {
        let game = state(1);
        assert_eq!(game.player_resources(9), Yields::ZERO);
        assert!(game.unlocked_techs(9).is_empty());
        assert!(!game.is_tech_unlocked(9, TechKind::Pottery));
    }
}
