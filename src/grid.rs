//! Hex tile grid and its adjacency graph.
//!
//! Tiles live in one flat row-major array owned by [`HexGrid`]. Rows are
//! offset hex rows: odd rows sit half a tile to the east. The horizontal
//! axis wraps like a cylinder, the vertical axis does not.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::catalog::Catalogs;
use crate::components::{
    BuildingKind, HexDirection, Landform, PlayerIndex, Terrain, Visibility, WonderKind,
};
use crate::world::{CityId, UnitId};

pub type TileId = usize;

const EVEN_ROW_OFFSETS: [(i32, i32); 6] = [(0, -1), (1, 0), (0, 1), (-1, 1), (-1, 0), (-1, -1)];
const ODD_ROW_OFFSETS: [(i32, i32); 6] = [(1, -1), (1, 0), (1, 1), (0, 1), (-1, 0), (0, -1)];

/// Neighbour offsets for a row, in [`HexDirection`] order.
pub fn neighbor_offsets(y: u32) -> &'static [(i32, i32); 6] {
    if y % 2 == 0 {
        &EVEN_ROW_OFFSETS
    } else {
        &ODD_ROW_OFFSETS
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub terrain: Terrain,
    pub landform: Landform,
    pub elevation: f64,
    pub moisture: f64,
    pub temperature: f64,
    pub building: Option<BuildingKind>,
    pub wonder: Option<WonderKind>,
    pub(crate) owning_city: Option<CityId>,
    pub(crate) occupant: Option<UnitId>,
    visibility: Vec<Visibility>,
    neighbors: [Option<TileId>; 6],
}

impl Tile {
    pub fn new(x: u32, y: u32, terrain: Terrain, landform: Landform) -> Self {
        Self {
            x,
            y,
            terrain,
            landform,
            elevation: 0.0,
            moisture: 0.0,
            temperature: 0.0,
            building: None,
            wonder: None,
            owning_city: None,
            occupant: None,
            visibility: Vec::new(),
            neighbors: [None; 6],
        }
    }

    pub fn is_water(&self) -> bool {
        self.terrain.is_water()
    }

    pub fn is_passable(&self, catalogs: &Catalogs) -> bool {
        catalogs.terrains.info(self.terrain).passable
            && catalogs.landforms.info(self.landform).passable
    }

    /// Movement points needed to enter this tile, or `None` if it cannot be entered.
    pub fn movement_cost(&self, catalogs: &Catalogs) -> Option<i32> {
        if !self.is_passable(catalogs) {
            return None;
        }
        let base = catalogs.terrains.info(self.terrain).movement_cost;
        let extra = catalogs.landforms.info(self.landform).extra_movement_cost;
        Some(base + extra)
    }

    pub fn owning_city(&self) -> Option<CityId> {
        self.owning_city
    }

    pub fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    pub fn has_unit(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn neighbors(&self) -> &[Option<TileId>; 6] {
        &self.neighbors
    }

    pub fn neighbor(&self, direction: HexDirection) -> Option<TileId> {
        self.neighbors[direction.index()]
    }

    pub fn visibility(&self, player: PlayerIndex) -> Visibility {
        self.visibility.get(player).copied().unwrap_or_default()
    }

    pub fn set_visibility(&mut self, player: PlayerIndex, state: Visibility) {
        if self.visibility.len() <= player {
            self.visibility.resize(player + 1, Visibility::Unexplored);
        }
        self.visibility[player] = state;
    }

    /// Replaces whatever building stands here.
    pub fn construct_building(&mut self, kind: BuildingKind) {
        self.building = Some(kind);
    }

    pub fn set_wonder(&mut self, kind: WonderKind) {
        self.wonder = Some(kind);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HexGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl HexGrid {
    /// Takes row-major tiles (`y * width + x`) and links their neighbours.
    /// A tile count that does not match the dimensions yields an empty grid.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Self {
        let expected = width as usize * height as usize;
        if expected == 0 || tiles.len() != expected {
            return Self::empty();
        }
        let mut grid = Self {
            width,
            height,
            tiles,
        };
        grid.link_neighbors();
        grid
    }

    pub fn filled(width: u32, height: u32, terrain: Terrain) -> Self {
        let mut tiles = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile::new(x, y, terrain, Landform::None));
            }
        }
        Self::from_tiles(width, height, tiles)
    }

    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn index(&self, x: u32, y: u32) -> Option<TileId> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    pub fn position(&self, id: TileId) -> Option<(u32, u32)> {
        self.tiles.get(id).map(|tile| (tile.x, tile.y))
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<&Tile> {
        self.index(x, y).and_then(|id| self.tiles.get(id))
    }

    pub fn tile_at_mut(&mut self, x: u32, y: u32) -> Option<&mut Tile> {
        let id = self.index(x, y)?;
        self.tiles.get_mut(id)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    pub fn neighbors(&self, id: TileId) -> impl Iterator<Item = TileId> + '_ {
        self.tiles
            .get(id)
            .into_iter()
            .flat_map(|tile| tile.neighbors.iter().flatten().copied())
    }

    pub fn is_adjacent(&self, a: TileId, b: TileId) -> bool {
        a != b && self.neighbors(a).any(|n| n == b)
    }

    /// Whether `to` is reachable from `from` in at most `range` hops,
    /// ignoring terrain. Used for attack ranges.
    pub fn within_range(&self, from: TileId, to: TileId, range: u32) -> bool {
        if from >= self.tiles.len() || to >= self.tiles.len() {
            return false;
        }
        if from == to {
            return true;
        }
        let mut seen = HashSet::from([from]);
        let mut frontier = VecDeque::from([(from, 0u32)]);
        while let Some((current, depth)) = frontier.pop_front() {
            if depth == range {
                continue;
            }
            for next in self.neighbors(current) {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    frontier.push_back((next, depth + 1));
                }
            }
        }
        false
    }

    fn link_neighbors(&mut self) {
        let width = self.width as i32;
        let height = self.height as i32;
        for id in 0..self.tiles.len() {
            let (x, y) = (self.tiles[id].x, self.tiles[id].y);
            let mut links = [None; 6];
            for (slot, (dx, dy)) in neighbor_offsets(y).iter().enumerate() {
                let nx = (x as i32 + dx).rem_euclid(width);
                let ny = y as i32 + dy;
                if (0..height).contains(&ny) {
                    links[slot] = self.index(nx as u32, ny as u32);
                }
            }
            self.tiles[id].neighbors = links;
        }
    }
}
