//! Damage formula and attack resolution.
//!
//! Every attack consumes all of the attacker's movement and drops its
//! fortification. Random variance is drawn from the supplied
//! [`RandomSource`], once per damage roll.

use serde::Serialize;
use tracing::{debug, info};

use crate::components::{Landform, PlayerIndex};
use crate::grid::Tile;
use crate::rng::RandomSource;
use crate::systems::victory;
use crate::world::{CityId, GameState, UnitId};

pub const MIN_DAMAGE: i32 = 1;
pub const MAX_DAMAGE: i32 = 200;
pub const FORTIFY_BONUS: i32 = 6;
pub const CAPTURED_CITY_HP: i32 = 50;

/// `30 * e^(0.04 * (attacker - defender))`, scaled by a roll in
/// `[0.85, 1.15]`, rounded and clamped to `[1, 200]`.
pub fn damage(attacker: i32, defender: i32, rng: &mut dyn RandomSource) -> i32 {
    let diff = f64::from(attacker.saturating_sub(defender));
    let base = 30.0 * (0.04 * diff).exp();
    let roll = f64::from(rng.uniform(0.85, 1.15));
    // float-to-int casts saturate, so huge gaps land on the upper clamp
    ((base * roll).round() as i32).clamp(MIN_DAMAGE, MAX_DAMAGE)
}

pub fn terrain_defense_bonus(tile: &Tile) -> i32 {
    match tile.landform {
        Landform::Hills | Landform::Forest | Landform::Rainforest => 3,
        Landform::Marsh => -2,
        _ => 0,
    }
}

/// Base strength plus terrain and fortification. Wounds do not reduce it.
pub fn defensive_strength(game: &GameState, unit: UnitId) -> i32 {
    let Some(unit) = game.unit(unit) else {
        return 0;
    };
    let terrain = game
        .grid()
        .tile(unit.tile)
        .map_or(0, terrain_defense_bonus);
    let fortify = if unit.fortified { FORTIFY_BONUS } else { 0 };
    unit.combat_strength + terrain + fortify
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CombatReport {
    pub damage_dealt: i32,
    pub damage_taken: i32,
    pub attacker_destroyed: bool,
    pub defender_destroyed: bool,
    pub city_captured: bool,
}

fn reject(reason: &str) -> Option<CombatReport> {
    debug!(reason, "attack rejected");
    None
}

/// Marks the attacker as having acted and returns its owner and strength.
fn commit_attacker(game: &mut GameState, attacker: UnitId) -> Option<(PlayerIndex, i32)> {
    let unit = game.unit_mut(attacker)?;
    unit.movement = 0;
    unit.fortified = false;
    Some((unit.owner, unit.combat_strength))
}

/// Applies `amount` to a unit and removes it at zero HP. Returns true if
/// the unit was destroyed.
fn wound_unit(game: &mut GameState, unit: UnitId, amount: i32) -> bool {
    let Some(state) = game.unit_mut(unit) else {
        return false;
    };
    state.hp -= amount;
    if state.hp > 0 {
        return false;
    }
    game.remove_unit(unit);
    true
}

/// Simultaneous melee exchange between adjacent enemy units. A surviving
/// attacker advances into the tile of a destroyed defender.
pub fn melee_attack_unit(
    game: &mut GameState,
    attacker: UnitId,
    defender: UnitId,
    rng: &mut dyn RandomSource,
) -> Option<CombatReport> {
    let (Some(att), Some(def)) = (game.unit(attacker), game.unit(defender)) else {
        return reject("missing combatant");
    };
    if att.owner == def.owner {
        return reject("friendly target");
    }
    if !att.can_act() || att.combat_strength <= 0 {
        return reject("attacker cannot fight");
    }
    if !game.grid().is_adjacent(att.tile, def.tile) {
        return reject("target not adjacent");
    }
    let target_tile = def.tile;

    let defense = defensive_strength(game, defender);
    let (owner, strength) = commit_attacker(game, attacker)?;
    let dealt = damage(strength, defense, rng);
    let taken = damage(defense, strength, rng);

    let defender_destroyed = wound_unit(game, defender, dealt);
    let attacker_destroyed = wound_unit(game, attacker, taken);
    // an enemy city centre is only taken by assaulting the city itself
    let enemy_city = game
        .city_at(target_tile)
        .and_then(|c| game.city(c))
        .is_some_and(|c| c.owner != owner);
    if defender_destroyed && !attacker_destroyed && !enemy_city {
        game.relocate_unit(attacker, target_tile);
    }

    debug!(strength, defense, dealt, taken, "melee resolved");
    Some(CombatReport {
        damage_dealt: dealt,
        damage_taken: taken,
        attacker_destroyed,
        defender_destroyed,
        city_captured: false,
    })
}

/// One-sided ranged strike at an enemy unit within the attacker's range.
pub fn ranged_attack_unit(
    game: &mut GameState,
    attacker: UnitId,
    target: UnitId,
    rng: &mut dyn RandomSource,
) -> Option<CombatReport> {
    let (Some(att), Some(def)) = (game.unit(attacker), game.unit(target)) else {
        return reject("missing combatant");
    };
    if att.owner == def.owner {
        return reject("friendly target");
    }
    if !att.can_act() || att.ranged_strength <= 0 {
        return reject("attacker has no ranged strike");
    }
    if !game.grid().within_range(att.tile, def.tile, att.range) {
        return reject("target out of range");
    }
    let ranged = att.ranged_strength;

    let defense = defensive_strength(game, target);
    commit_attacker(game, attacker)?;
    let dealt = damage(ranged, defense, rng);
    let defender_destroyed = wound_unit(game, target, dealt);

    Some(CombatReport {
        damage_dealt: dealt,
        defender_destroyed,
        ..CombatReport::default()
    })
}

/// Melee assault on an adjacent enemy city. The city hits back once with
/// its own strength.
pub fn attack_city(
    game: &mut GameState,
    attacker: UnitId,
    city: CityId,
    rng: &mut dyn RandomSource,
) -> Option<CombatReport> {
    let (Some(att), Some(target)) = (game.unit(attacker), game.city(city)) else {
        return reject("missing combatant");
    };
    if att.owner == target.owner {
        return reject("friendly city");
    }
    if !att.can_act() || att.combat_strength <= 0 {
        return reject("attacker cannot fight");
    }
    if !game.grid().is_adjacent(att.tile, target.position) {
        return reject("city not adjacent");
    }
    let city_strength = target.combat_strength;

    let (owner, strength) = commit_attacker(game, attacker)?;
    let dealt = damage(strength, city_strength, rng);
    let taken = damage(city_strength, strength, rng);

    let city_captured = receive_damage(game, city, dealt, Some(owner));
    let attacker_destroyed = wound_unit(game, attacker, taken);

    Some(CombatReport {
        damage_dealt: dealt,
        damage_taken: taken,
        attacker_destroyed,
        defender_destroyed: false,
        city_captured,
    })
}

/// Ranged bombardment. Never takes a city below 1 HP.
pub fn ranged_attack_city(
    game: &mut GameState,
    attacker: UnitId,
    city: CityId,
    rng: &mut dyn RandomSource,
) -> Option<CombatReport> {
    let (Some(att), Some(target)) = (game.unit(attacker), game.city(city)) else {
        return reject("missing combatant");
    };
    if att.owner == target.owner {
        return reject("friendly city");
    }
    if !att.can_act() || att.ranged_strength <= 0 {
        return reject("attacker has no ranged strike");
    }
    if !game.grid().within_range(att.tile, target.position, att.range) {
        return reject("city out of range");
    }
    let ranged = att.ranged_strength;
    let city_strength = target.combat_strength;

    commit_attacker(game, attacker)?;
    let dealt = damage(ranged, city_strength, rng);
    if let Some(target) = game.city_mut(city) {
        target.hp = (target.hp - dealt).max(1);
    }

    Some(CombatReport {
        damage_dealt: dealt,
        ..CombatReport::default()
    })
}

/// Subtracts `amount` from the city's HP. Reaching zero with a known
/// attacker captures the city; returns whether that happened.
pub fn receive_damage(
    game: &mut GameState,
    city: CityId,
    amount: i32,
    attacker: Option<PlayerIndex>,
) -> bool {
    let Some(target) = game.city_mut(city) else {
        return false;
    };
    target.hp -= amount;
    if target.hp > 0 {
        return false;
    }
    target.hp = 0;
    match attacker {
        Some(owner) => capture_city(game, city, owner),
        None => false,
    }
}

/// Transfers the city to `new_owner`, halves its population, resets HP to
/// 50 and clears its production, then checks for victory.
pub fn capture_city(game: &mut GameState, city: CityId, new_owner: PlayerIndex) -> bool {
    let Some(target) = game.city_mut(city) else {
        return false;
    };
    let previous = target.owner;
    target.owner = new_owner;
    target.hp = CAPTURED_CITY_HP;
    target.population = (target.population / 2).max(1);
    target.production = None;
    target.production_overflow = 0;
    info!(city = %target.name, previous, new_owner, "city captured");
    victory::check_victory(game);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogs;
    use crate::components::{Terrain, UnitKind};
    use crate::grid::HexGrid;
    use crate::rng::ScriptedRandom;
    use crate::world::PlayerState;
    use proptest::prelude::*;

    fn game() -> GameState {
        GameState::new(
            HexGrid::filled(10, 6, Terrain::Plain),
            Catalogs::standard(),
            vec![PlayerState::new("red"), PlayerState::new("blue")],
        )
    }

    #[test]
    fn midpoint_roll_matches_formula() {
        let mut mid = ScriptedRandom::constant(0.5);
        assert_eq!(damage(20, 20, &mut mid), 30);
        // 30 * e^1.2 = 99.6
        assert_eq!(damage(30, 0, &mut mid), 100);
        assert_eq!(damage(0, 30, &mut mid), 9);
    }

    #[test]
    fn extreme_gaps_hit_the_clamps() {
        let mut mid = ScriptedRandom::constant(0.5);
        assert_eq!(damage(1_000, 0, &mut mid), MAX_DAMAGE);
        assert_eq!(damage(0, 1_000, &mut mid), MIN_DAMAGE);
        assert_eq!(damage(i32::MAX, i32::MIN, &mut mid), MAX_DAMAGE);
    }

    #[test]
    fn terrain_bonuses() {
        let mut tile = Tile::new(0, 0, Terrain::Plain, Landform::Hills);
        assert_eq!(terrain_defense_bonus(&tile), 3);
        tile.landform = Landform::Rainforest;
        assert_eq!(terrain_defense_bonus(&tile), 3);
        tile.landform = Landform::Marsh;
        assert_eq!(terrain_defense_bonus(&tile), -2);
        tile.landform = Landform::Oasis;
        assert_eq!(terrain_defense_bonus(&tile), 0);
    }

    #[test]
    fn fortified_defender_on_hills() {
        let mut game = game();
        game.grid_mut().tile_mut(12).unwrap().landform = Landform::Hills;
        let id = game.spawn_unit(UnitKind::Warrior, 0, 12).unwrap();
        game.unit_mut(id).unwrap().fortified = true;
        assert_eq!(defensive_strength(&game, id), 20 + 3 + 6);
    }

    #[test]
    fn melee_winner_advances() {
        let mut game = game();
        let from = game.grid().index(2, 2).unwrap();
        let to = game.grid().index(3, 2).unwrap();
        let horse = game.spawn_unit(UnitKind::Horseman, 0, from).unwrap();
        let scout = game.spawn_unit(UnitKind::Scout, 1, to).unwrap();
        game.unit_mut(scout).unwrap().hp = 5;

        let report =
            melee_attack_unit(&mut game, horse, scout, &mut ScriptedRandom::constant(0.5)).unwrap();
        assert!(report.defender_destroyed);
        assert!(!report.attacker_destroyed);
        assert!(game.unit(scout).is_none());
        let horse_state = game.unit(horse).unwrap();
        assert_eq!(horse_state.tile, to);
        assert_eq!(horse_state.movement, 0);
        assert_eq!(game.unit_at(from), None);
    }

    #[test]
    fn melee_requires_adjacency_and_movement() {
        let mut game = game();
        let a = game.spawn_unit(UnitKind::Warrior, 0, 0).unwrap();
        let b = game.spawn_unit(UnitKind::Warrior, 1, 4).unwrap();
        let mut rng = ScriptedRandom::constant(0.5);
        assert!(melee_attack_unit(&mut game, a, b, &mut rng).is_none());
        let c = game.spawn_unit(UnitKind::Warrior, 1, 1).unwrap();
        game.unit_mut(a).unwrap().movement = 0;
        assert!(melee_attack_unit(&mut game, a, c, &mut rng).is_none());
        assert_eq!(game.unit(c).unwrap().hp, 100);
    }

    #[test]
    fn ranged_strike_is_one_sided_and_range_limited() {
        let mut game = game();
        let archer = game
            .spawn_unit(UnitKind::Archer, 0, game.grid().index(2, 2).unwrap())
            .unwrap();
        let near = game
            .spawn_unit(UnitKind::Warrior, 1, game.grid().index(4, 2).unwrap())
            .unwrap();
        let far = game
            .spawn_unit(UnitKind::Warrior, 1, game.grid().index(6, 2).unwrap())
            .unwrap();
        let mut rng = ScriptedRandom::constant(0.5);
        assert!(ranged_attack_unit(&mut game, archer, far, &mut rng).is_none());
        let report = ranged_attack_unit(&mut game, archer, near, &mut rng).unwrap();
        assert_eq!(report.damage_taken, 0);
        assert_eq!(game.unit(archer).unwrap().hp, 100);
        assert_eq!(game.unit(near).unwrap().hp, 100 - report.damage_dealt);
        // melee units have no ranged strike
        let warrior = game.spawn_unit(UnitKind::Warrior, 0, 0).unwrap();
        assert!(ranged_attack_unit(&mut game, warrior, near, &mut rng).is_none());
    }

    #[test]
    fn ranged_fire_leaves_city_at_one() {
        let mut game = game();
        let city = game.add_city(1, "Keep", game.grid().index(4, 2).unwrap()).unwrap();
        game.city_mut(city).unwrap().hp = 5;
        let archer = game
            .spawn_unit(UnitKind::Archer, 0, game.grid().index(2, 2).unwrap())
            .unwrap();
        let report =
            ranged_attack_city(&mut game, archer, city, &mut ScriptedRandom::constant(0.5)).unwrap();
        assert!(!report.city_captured);
        let city = game.city(city).unwrap();
        assert_eq!(city.hp, 1);
        assert_eq!(city.owner, 1);
    }

    #[test]
    fn melee_siege_captures_a_broken_city() {
        let mut game = game();
        let centre = game.grid().index(4, 2).unwrap();
        let city = game.add_city(1, "Gate", centre).unwrap();
        game.add_city(1, "Rear", game.grid().index(8, 4).unwrap()).unwrap();
        {
            let target = game.city_mut(city).unwrap();
            target.hp = 1;
            target.population = 5;
        }
        let warrior = game
            .spawn_unit(UnitKind::Warrior, 0, game.grid().index(3, 2).unwrap())
            .unwrap();
        let report =
            attack_city(&mut game, warrior, city, &mut ScriptedRandom::constant(0.5)).unwrap();
        assert!(report.city_captured);
        let taken = game.city(city).unwrap();
        assert_eq!(taken.owner, 0);
        assert_eq!(taken.hp, CAPTURED_CITY_HP);
        assert_eq!(taken.population, 2);
        assert!(!game.is_game_over());
    }

    #[test]
    fn unattributed_damage_does_not_capture() {
        let mut game = game();
        let city = game.add_city(1, "Lone", 0).unwrap();
        assert!(!receive_damage(&mut game, city, 500, None));
        let city = game.city(city).unwrap();
        assert_eq!(city.hp, 0);
        assert_eq!(city.owner, 1);
    }

    proptest! {
        #[test]
        fn damage_is_always_clamped(
            attacker in -500i32..500,
            defender in -500i32..500,
            fraction in 0.0f32..=1.0,
        ) {
            let dealt = damage(attacker, defender, &mut ScriptedRandom::constant(fraction));
            prop_assert!((MIN_DAMAGE..=MAX_DAMAGE).contains(&dealt));
        }
    }
}
