use std::collections::HashSet;

use crate::{
    components::{PlayerIndex, Visibility},
    engine::{TurnContext, TurnSystem},
    grid::TileId,
    world::GameState,
};

/// Tiles `player` currently sees: every unit and city centre plus their
/// immediate neighbours.
pub fn sighted_tiles(game: &GameState, player: PlayerIndex) -> HashSet<TileId> {
    let mut origins: Vec<TileId> = game
        .units()
        .filter(|(_, unit)| unit.owner == player)
        .map(|(_, unit)| unit.tile)
        .collect();
    origins.extend(
        game.cities()
            .filter(|(_, city)| city.owner == player)
            .map(|(_, city)| city.position),
    );

    let mut seen = HashSet::new();
    for origin in origins {
        seen.insert(origin);
        seen.extend(game.grid().neighbors(origin));
    }
    seen
}

/// Marks sighted tiles visible and demotes anything that dropped out of
/// sight to fog of war. Unexplored tiles stay unexplored until seen.
pub fn refresh_visibility(game: &mut GameState, player: PlayerIndex) {
    let sighted = sighted_tiles(game, player);
    for (id, tile) in game.grid_mut().tiles_mut().enumerate() {
        if sighted.contains(&id) {
            tile.set_visibility(player, Visibility::Visible);
        } else if tile.visibility(player) == Visibility::Visible {
            tile.set_visibility(player, Visibility::FogOfWar);
        }
    }
}

pub struct VisibilitySystem;

impl VisibilitySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VisibilitySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSystem for VisibilitySystem {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn run(&mut self, ctx: &TurnContext, game: &mut GameState) {
        refresh_visibility(game, ctx.player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogs;
    use crate::components::{Terrain, UnitKind};
    use crate::grid::HexGrid;
    use crate::world::PlayerState;

    #[test]
    fn sight_follows_units_and_leaves_fog() {
        let mut game = GameState::new(
            HexGrid::filled(10, 6, Terrain::Plain),
            Catalogs::standard(),
            vec![PlayerState::new("a")],
        );
        let start = game.grid().index(2, 2).unwrap();
        let far = game.grid().index(7, 2).unwrap();
        let scout = game.spawn_unit(UnitKind::Scout, 0, start).unwrap();

        refresh_visibility(&mut game, 0);
        let tile = |game: &GameState, id| game.grid().tile(id).unwrap().visibility(0);
        assert_eq!(tile(&game, start), Visibility::Visible);
        assert_eq!(tile(&game, far), Visibility::Unexplored);
        let visible = game
            .grid()
            .tiles()
            .iter()
            .filter(|t| t.visibility(0) == Visibility::Visible)
            .count();
        assert_eq!(visible, 7);

        assert!(game.relocate_unit(scout, far));
        refresh_visibility(&mut game, 0);
        assert_eq!(tile(&game, start), Visibility::FogOfWar);
        assert_eq!(tile(&game, far), Visibility::Visible);
    }
}
