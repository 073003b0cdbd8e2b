use tracing::info;

use crate::{
    components::PlayerIndex,
    engine::{TurnContext, TurnSystem},
    world::{GameState, UnlockProgress},
};

/// Adds `points` to the current target of one tree. Completion unlocks the
/// target, clears it and zeroes progress; excess points are dropped.
/// Returns the item unlocked this call, if any.
pub fn advance<T: Ord + Copy>(tree: &mut UnlockProgress<T>, points: i32, cost: i32) -> Option<T> {
    let current = tree.current?;
    tree.progress += points.max(0);
    if tree.progress < cost {
        return None;
    }
    tree.unlocked.insert(current);
    tree.current = None;
    tree.progress = 0;
    Some(current)
}

/// Feeds the science and culture banked by `player` this turn into their
/// research and civic trees.
pub fn process_player_research(game: &mut GameState, player: PlayerIndex) {
    let tech_cost = game
        .current_research(player)
        .map_or(0, |t| game.catalogs().techs.info(t).science_cost);
    let civic_cost = game
        .current_civic(player)
        .map_or(0, |c| game.catalogs().civics.info(c).culture_cost);
    let Some(state) = game.player_mut(player) else {
        return;
    };
    let gained = state.last_turn_yield;
    if let Some(tech) = advance(&mut state.research, gained.science, tech_cost) {
        info!(player, ?tech, "technology unlocked");
    }
    if let Some(civic) = advance(&mut state.civics, gained.culture, civic_cost) {
        info!(player, ?civic, "civic unlocked");
    }
}

pub struct ResearchSystem;

impl ResearchSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResearchSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSystem for ResearchSystem {
    fn name(&self) -> &'static str {
        "research"
    }

    fn run(&mut self, ctx: &TurnContext, game: &mut GameState) {
        process_player_research(game, ctx.player);
    }
}
