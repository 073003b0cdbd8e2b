use crate::{
    components::{PlayerIndex, VictoryKind},
    engine::{TurnContext, TurnSystem},
    world::{GameState, Outcome},
};

/// The player holding every city, if there is at least one city.
pub fn conquest_winner(game: &GameState) -> Option<PlayerIndex> {
    let mut owners = game.cities().map(|(_, city)| city.owner);
    let first = owners.next()?;
    owners.all(|owner| owner == first).then_some(first)
}

/// The lowest-indexed player who has unlocked every catalogued technology.
pub fn science_winner(game: &GameState) -> Option<PlayerIndex> {
    let techs = game.catalogs().techs.keys();
    if techs.is_empty() {
        return None;
    }
    (0..game.player_count()).find(|player| {
        techs
            .iter()
            .all(|tech| game.is_tech_unlocked(*player, *tech))
    })
}

/// Conquest is checked before science. The first declared outcome sticks.
pub fn check_victory(game: &mut GameState) -> Option<Outcome> {
    if game.is_game_over() {
        return game.outcome();
    }
    if let Some(winner) = conquest_winner(game) {
        game.declare_victory(winner, VictoryKind::Conquest);
    } else if let Some(winner) = science_winner(game) {
        game.declare_victory(winner, VictoryKind::Science);
    }
    game.outcome()
}

pub struct VictorySystem;

impl VictorySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VictorySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSystem for VictorySystem {
    fn name(&self) -> &'static str {
        "victory"
    }

    fn run(&mut self, _ctx: &TurnContext, game: &mut GameState) {
        check_victory(game);
    }
}
