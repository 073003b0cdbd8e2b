use tracing::{debug, info};

use crate::{
    catalog::Catalogs,
    components::WonderKind,
    engine::{TurnContext, TurnSystem},
    grid::{HexGrid, Tile},
    world::{CityId, GameState, ProductionItem, ProductionTarget, CITY_BASE_STRENGTH},
    yields::Yields,
};

/// What a city centre produces on its own, regardless of territory.
pub const CITY_CENTRE_YIELD: Yields = Yields::new(2, 1, 1, 0, 0);

pub const FOOD_PER_CITIZEN: i32 = 2;
pub const CITY_REGEN_PER_TURN: i32 = 20;

/// Terrain base plus landform, building and wonder bonuses, less building
/// maintenance. Never clamped.
pub fn tile_yield(tile: &Tile, catalogs: &Catalogs) -> Yields {
    let mut total = catalogs.terrains.info(tile.terrain).yields;
    total += catalogs.landforms.info(tile.landform).yields;
    if let Some(kind) = tile.building {
        let building = catalogs.buildings.info(kind);
        total += building.yields;
        total -= Yields::gold(building.maintenance);
    }
    if let Some(kind) = tile.wonder {
        total += catalogs.wonders.info(kind).yields;
    }
    total
}

/// Centre yield plus territory, less population food upkeep. Unknown
/// cities yield zero.
pub fn city_turn_yields(game: &GameState, city: CityId) -> Yields {
    let Some(city) = game.city(city) else {
        return Yields::ZERO;
    };
    let territory: Yields = city
        .territory()
        .iter()
        .filter_map(|id| game.grid().tile(*id))
        .map(|tile| tile_yield(tile, game.catalogs()))
        .sum();
    CITY_CENTRE_YIELD + territory - Yields::food(city.population * FOOD_PER_CITIZEN)
}

/// Queues `target`, replacing anything in progress. The stored overflow
/// becomes the new item's starting progress.
pub fn start_production(game: &mut GameState, city: CityId, target: ProductionTarget) -> bool {
    if let ProductionTarget::Wonder(kind) = target {
        if wonder_taken(game.grid(), kind) {
            debug!(?kind, "wonder already standing");
            return false;
        }
        if centre_has_wonder(game, city) {
            debug!(?kind, "city centre already holds a wonder");
            return false;
        }
    }
    let cost = target.cost(game.catalogs());
    let Some(city) = game.city_mut(city) else {
        return false;
    };
    city.production = Some(ProductionItem {
        target,
        cost,
        progress: city.production_overflow,
    });
    city.production_overflow = 0;
    debug!(city = %city.name, ?target, cost, "production started");
    true
}

fn wonder_taken(grid: &HexGrid, kind: WonderKind) -> bool {
    grid.tiles().iter().any(|tile| tile.wonder == Some(kind))
}

fn centre_has_wonder(game: &GameState, city: CityId) -> bool {
    game.city(city)
        .and_then(|c| game.grid().tile(c.position))
        .is_some_and(|tile| tile.wonder.is_some())
}

/// A wonder in progress that can no longer be placed: someone finished it
/// first, or this centre already holds one.
fn wonder_blocked(game: &GameState, city: CityId) -> bool {
    let Some(item) = game.city(city).and_then(|c| c.production.as_ref()) else {
        return false;
    };
    match item.target {
        ProductionTarget::Wonder(kind) => {
            wonder_taken(game.grid(), kind) || centre_has_wonder(game, city)
        }
        _ => false,
    }
}

/// Runs one city's turn in order: yield, growth or starvation, production,
/// then regeneration. Returns the yield so the caller can bank the
/// treasury share without computing it again.
pub fn process_city_turn(game: &mut GameState, id: CityId) -> Yields {
    let yields = city_turn_yields(game, id);
    let blocked = wonder_blocked(game, id);
    let finished = {
        let Some(city) = game.city_mut(id) else {
            return Yields::ZERO;
        };

        city.food_stock += yields.food;
        let threshold = city.growth_threshold();
        if city.food_stock >= threshold {
            city.population += 1;
            city.food_stock -= threshold;
        } else if city.food_stock < 0 && city.population > 1 {
            city.population -= 1;
            city.food_stock = 0;
        }

        let mut finished = None;
        if let Some(item) = city.production.as_mut() {
            item.progress += yields.production.max(0);
            if item.progress >= item.cost {
                if blocked {
                    debug!(city = %city.name, target = ?item.target, "wonder lost to a rival");
                    city.production_overflow = item.progress;
                } else {
                    city.production_overflow = item.progress - item.cost;
                    finished = Some(item.target);
                }
                city.production = None;
            }
        }

        city.hp = (city.hp + CITY_REGEN_PER_TURN).min(city.max_hp);
        city.combat_strength = CITY_BASE_STRENGTH + city.population * 2;
        finished
    };

    if let Some(target) = finished {
        complete_production(game, id, target);
    }
    yields
}

fn complete_production(game: &mut GameState, id: CityId, target: ProductionTarget) {
    let Some((owner, centre, name)) = game
        .city(id)
        .map(|c| (c.owner, c.position, c.name.clone()))
    else {
        return;
    };

    let delivered = match target {
        ProductionTarget::Building(kind) => {
            if let Some(tile) = game.grid_mut().tile_mut(centre) {
                if tile.building.is_none() {
                    tile.construct_building(kind);
                }
            }
            true
        }
        ProductionTarget::Wonder(kind) => {
            if let Some(tile) = game.grid_mut().tile_mut(centre) {
                tile.set_wonder(kind);
            }
            true
        }
        ProductionTarget::Unit(kind) => {
            let mut spots = vec![centre];
            spots.extend(game.grid().neighbors(centre));
            spots
                .into_iter()
                .any(|tile| game.spawn_unit(kind, owner, tile).is_some())
        }
    };

    if delivered {
        if let Some(city) = game.city_mut(id) {
            city.completed.push(target);
        }
        info!(city = %name, ?target, "production completed");
    } else {
        debug!(city = %name, ?target, "no room to place finished unit");
    }
}

/// Processes every city of the active player and banks their gold,
/// science and culture into the player's treasury.
pub struct EconomySystem;

impl EconomySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EconomySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSystem for EconomySystem {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn run(&mut self, ctx: &TurnContext, game: &mut GameState) {
        let mut credit = Yields::ZERO;
        for id in game.cities_of(ctx.player) {
            credit += process_city_turn(game, id).treasury_share();
        }
        game.add_player_resources(ctx.player, credit);
        if let Some(player) = game.player_mut(ctx.player) {
            player.last_turn_yield = credit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BuildingKind, Landform, Terrain, UnitKind};
    use crate::world::PlayerState;

    fn game() -> GameState {
        let grid = HexGrid::filled(6, 6, Terrain::Grassland);
        GameState::new(
            grid,
            Catalogs::standard(),
            vec![PlayerState::new("a"), PlayerState::new("b")],
        )
    }

    #[test]
    fn tile_yield_nets_out_maintenance() {
        let catalogs = Catalogs::standard();
        let mut tile = Tile::new(0, 0, Terrain::Desert, Landform::None);
        tile.construct_building(BuildingKind::Library);
        // desert gives nothing; library +2 science, -1 gold upkeep
        assert_eq!(tile_yield(&tile, &catalogs), Yields::new(0, 0, -1, 2, 0));

        let mut hills = Tile::new(0, 0, Terrain::Plain, Landform::Hills);
        hills.construct_building(BuildingKind::Mine);
        assert_eq!(tile_yield(&hills, &catalogs), Yields::new(1, 3, 0, 0, 0));
    }

    #[test]
    fn bare_city_breaks_even_on_food() {
        let mut game = game();
        let id = game.add_city(0, "Solo", 8).unwrap();
        let yields = process_city_turn(&mut game, id);
        assert_eq!(yields, Yields::new(0, 1, 1, 0, 0));
        let city = game.city(id).unwrap();
        assert_eq!(city.food_stock, 0);
        assert_eq!(city.population, 1);
        assert_eq!(city.combat_strength, 12);
    }

    #[test]
    fn growth_consumes_threshold() {
        let mut game = game();
        let id = game.add_city(0, "Grow", 8).unwrap();
        game.city_mut(id).unwrap().food_stock = 14;
        game.add_territory(id, 9);
        // grassland +2 food
        process_city_turn(&mut game, id);
        let city = game.city(id).unwrap();
        assert_eq!(city.population, 2);
        assert_eq!(city.food_stock, 1);
    }

    #[test]
    fn starvation_never_drops_below_one() {
        let mut game = game();
        let id = game.add_city(0, "Hungry", 8).unwrap();
        game.city_mut(id).unwrap().population = 3;
        for _ in 0..10 {
            process_city_turn(&mut game, id);
            assert!(game.city(id).unwrap().population >= 1);
        }
        assert_eq!(game.city(id).unwrap().population, 1);
    }

    #[test]
    fn overflow_carries_into_next_item() {
        let mut game = game();
        let id = game.add_city(0, "Works", 8).unwrap();
        assert!(start_production(
            &mut game,
            id,
            ProductionTarget::Building(BuildingKind::Farm)
        ));
        game.city_mut(id).unwrap().production.as_mut().unwrap().progress = 39;
        game.grid_mut().tile_mut(9).unwrap().landform = Landform::Hills;
        game.add_territory(id, 9);
        // centre 1 + hills 1 = 2 production, 41 against cost 40
        process_city_turn(&mut game, id);
        let city = game.city(id).unwrap();
        assert!(city.production.is_none());
        assert_eq!(city.production_overflow, 1);
        assert_eq!(city.completed, vec![ProductionTarget::Building(BuildingKind::Farm)]);
        assert_eq!(game.grid().tile(8).unwrap().building, Some(BuildingKind::Farm));

        assert!(start_production(
            &mut game,
            id,
            ProductionTarget::Building(BuildingKind::Mine)
        ));
        let city = game.city(id).unwrap();
        assert_eq!(city.production.as_ref().unwrap().progress, 1);
        assert_eq!(city.production_overflow, 0);
    }

    #[test]
    fn finished_unit_spills_to_a_free_neighbour() {
        let mut game = game();
        let id = game.add_city(0, "Barracks", 8).unwrap();
        let blocker = game.spawn_unit(UnitKind::Warrior, 0, 8).unwrap();
        start_production(&mut game, id, ProductionTarget::Unit(UnitKind::Warrior));
        game.city_mut(id).unwrap().production.as_mut().unwrap().progress = 40;
        process_city_turn(&mut game, id);
        let spawned: Vec<_> = game
            .units_of(0)
            .into_iter()
            .filter(|u| *u != blocker)
            .collect();
        assert_eq!(spawned.len(), 1);
        let tile = game.unit(spawned[0]).unwrap().tile;
        assert!(game.grid().is_adjacent(8, tile));
    }

    #[test]
    fn a_wonder_can_only_stand_once() {
        let mut game = game();
        let a = game.add_city(0, "A", 8).unwrap();
        let b = game.add_city(1, "B", 20).unwrap();
        let target = ProductionTarget::Wonder(WonderKind::Stonehenge);
        assert!(start_production(&mut game, a, target));
        game.city_mut(a).unwrap().production.as_mut().unwrap().progress = 500;
        process_city_turn(&mut game, a);
        assert_eq!(game.grid().tile(8).unwrap().wonder, Some(WonderKind::Stonehenge));
        assert!(!start_production(&mut game, b, target));
    }

    #[test]
    fn a_centre_holds_only_one_wonder() {
        let mut game = game();
        let a = game.add_city(0, "A", 8).unwrap();
        let b = game.add_city(1, "B", 20).unwrap();
        assert!(start_production(&mut game, a, ProductionTarget::Wonder(WonderKind::Pyramids)));
        game.city_mut(a).unwrap().production.as_mut().unwrap().progress = 500;
        process_city_turn(&mut game, a);
        assert_eq!(game.grid().tile(8).unwrap().wonder, Some(WonderKind::Pyramids));

        assert!(!start_production(&mut game, a, ProductionTarget::Wonder(WonderKind::Stonehenge)));
        assert_eq!(game.grid().tile(8).unwrap().wonder, Some(WonderKind::Pyramids));
        assert!(!start_production(&mut game, b, ProductionTarget::Wonder(WonderKind::Pyramids)));
    }

    #[test]
    fn racing_cities_finish_a_wonder_once() {
        let mut game = game();
        let a = game.add_city(0, "A", 8).unwrap();
        let b = game.add_city(1, "B", 20).unwrap();
        let target = ProductionTarget::Wonder(WonderKind::Pyramids);
        assert!(start_production(&mut game, a, target));
        assert!(start_production(&mut game, b, target));
        for city in [a, b] {
            game.city_mut(city).unwrap().production.as_mut().unwrap().progress = 500;
        }
        process_city_turn(&mut game, a);
        process_city_turn(&mut game, b);

        let standing = game
            .grid()
            .tiles()
            .iter()
            .filter(|t| t.wonder == Some(WonderKind::Pyramids))
            .count();
        assert_eq!(standing, 1);
        let loser = game.city(b).unwrap();
        assert!(loser.production.is_none());
        assert!(loser.completed.is_empty());
        // centre adds 1 production on top of the stored 500
        assert_eq!(loser.production_overflow, 501);
        assert_eq!(game.grid().tile(20).unwrap().wonder, None);
    }

    #[test]
    fn system_credits_treasury_once_per_city() {
        let mut game = game();
        game.add_city(0, "Mine", 8).unwrap();
        game.add_city(1, "Theirs", 20).unwrap();
        let ctx = TurnContext { turn: 1, player: 0 };
        EconomySystem::new().run(&ctx, &mut game);
        assert_eq!(game.player_resources(0), Yields::gold(1));
        assert_eq!(game.player_resources(1), Yields::ZERO);
        assert_eq!(game.player(0).unwrap().last_turn_yield, Yields::gold(1));
    }
}
