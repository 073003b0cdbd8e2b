use crate::{
    components::PlayerIndex,
    engine::{TurnContext, TurnSystem},
    world::GameState,
};

pub const FORTIFY_HEAL: i32 = 15;

/// Restores movement for every unit of `player`; fortified units also heal.
/// Fortification itself persists until the unit moves or attacks.
pub fn refresh_units(game: &mut GameState, player: PlayerIndex) {
    for id in game.units_of(player) {
        if let Some(unit) = game.unit_mut(id) {
            unit.movement = unit.max_movement;
            if unit.fortified {
                unit.hp = (unit.hp + FORTIFY_HEAL).min(unit.max_hp);
            }
        }
    }
}

pub struct UnitUpkeepSystem;

impl UnitUpkeepSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnitUpkeepSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSystem for UnitUpkeepSystem {
    fn name(&self) -> &'static str {
        "unit_upkeep"
    }

    fn run(&mut self, ctx: &TurnContext, game: &mut GameState) {
        refresh_units(game, ctx.player);
    }
}
