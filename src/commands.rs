//! Unit orders issued by a player.
//!
//! Each order either completes or is rejected with no state change.

use tracing::debug;

use crate::combat;
use crate::components::UnitKind;
use crate::grid::TileId;
use crate::rng::RandomSource;
use crate::world::{CityId, GameState, UnitId};

/// Steps a unit onto an adjacent tile. Entering an enemy unit's tile or an
/// enemy city centre attacks it instead, which counts as the move.
pub fn move_unit(
    game: &mut GameState,
    unit: UnitId,
    to: TileId,
    rng: &mut dyn RandomSource,
) -> bool {
    let Some(mover) = game.unit(unit) else {
        return false;
    };
    let (owner, from, movement) = (mover.owner, mover.tile, mover.movement);
    if movement <= 0 || from == to {
        return false;
    }
    let Some(target) = game.grid().tile(to) else {
        return false;
    };
    let Some(cost) = target.movement_cost(game.catalogs()) else {
        debug!(unit = unit.raw(), to, "target impassable");
        return false;
    };

    if let Some(occupant) = target.occupant() {
        let hostile = game.unit(occupant).is_some_and(|u| u.owner != owner);
        if !hostile {
            return false;
        }
        return combat::melee_attack_unit(game, unit, occupant, rng).is_some();
    }
    if let Some(city) = game.city_at(to) {
        if game.city(city).is_some_and(|c| c.owner != owner) {
            return combat::attack_city(game, unit, city, rng).is_some();
        }
    }

    if !game.grid().is_adjacent(from, to) {
        debug!(unit = unit.raw(), from, to, "target not adjacent");
        return false;
    }
    if movement < cost {
        debug!(unit = unit.raw(), movement, cost, "not enough movement");
        return false;
    }
    if !game.relocate_unit(unit, to) {
        return false;
    }
    if let Some(mover) = game.unit_mut(unit) {
        mover.movement -= cost;
        mover.fortified = false;
    }
    true
}

/// Digs in for the rest of the turn. Needs movement left.
pub fn fortify(game: &mut GameState, unit: UnitId) -> bool {
    match game.unit_mut(unit) {
        Some(state) if state.can_act() => {
            state.fortified = true;
            state.movement = 0;
            true
        }
        _ => false,
    }
}

/// Turns a settler with movement left into a city on its tile.
pub fn found_city(game: &mut GameState, unit: UnitId, name: &str) -> Option<CityId> {
    let settler = game.unit(unit)?;
    if settler.kind != UnitKind::Settler || !settler.can_act() {
        return None;
    }
    let (owner, tile) = (settler.owner, settler.tile);
    let city = game.settle_city(owner, name, tile)?;
    game.remove_unit(unit);
    Some(city)
}
