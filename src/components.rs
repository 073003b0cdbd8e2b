use serde::{Deserialize, Serialize};

pub type PlayerIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Ocean,
    Coast,
    Plain,
    Grassland,
    Desert,
    Tundra,
    Snow,
}

impl Terrain {
    pub const ALL: [Terrain; 7] = [
        Terrain::Ocean,
        Terrain::Coast,
        Terrain::Plain,
        Terrain::Grassland,
        Terrain::Desert,
        Terrain::Tundra,
        Terrain::Snow,
    ];

    pub fn is_water(self) -> bool {
        matches!(self, Terrain::Ocean | Terrain::Coast)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Landform {
    #[default]
    None,
    Hills,
    Mountain,
    Forest,
    Rainforest,
    Marsh,
    Oasis,
    Ice,
}

/// Neighbour slots of a hex tile, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HexDirection {
    NorthEast = 0,
    East = 1,
    SouthEast = 2,
    SouthWest = 3,
    West = 4,
    NorthWest = 5,
}

impl HexDirection {
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NorthEast,
        HexDirection::East,
        HexDirection::SouthEast,
        HexDirection::SouthWest,
        HexDirection::West,
        HexDirection::NorthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> HexDirection {
        Self::ALL[(self.index() + 3) % 6]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Unexplored,
    FogOfWar,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Farm,
    Mine,
    LumberMill,
    Granary,
    Monument,
    Library,
    Market,
    Walls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Settler,
    Builder,
    Scout,
    Warrior,
    Archer,
    Spearman,
    Horseman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WonderKind {
    Pyramids,
    Stonehenge,
    HangingGardens,
    GreatLibrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechKind {
    Pottery,
    AnimalHusbandry,
    Mining,
    Archery,
    Writing,
    BronzeWorking,
    Masonry,
    Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivicKind {
    CodeOfLaws,
    Craftsmanship,
    ForeignTrade,
    EarlyEmpire,
    Mysticism,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryKind {
    Conquest,
    Science,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_directions_pair_up() {
        for dir in HexDirection::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
        }
        assert_eq!(HexDirection::East.opposite(), HexDirection::West);
        assert_eq!(HexDirection::NorthEast.opposite(), HexDirection::SouthWest);
    }

    #[test]
    fn only_ocean_and_coast_are_water() {
        let water: Vec<_> = Terrain::ALL.iter().filter(|t| t.is_water()).collect();
        assert_eq!(water, vec![&Terrain::Ocean, &Terrain::Coast]);
    }
}
