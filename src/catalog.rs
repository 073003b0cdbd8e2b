//! Static balance tables, queried by key.
//!
//! Lookups never fail: a key with no record resolves to the record's
//! `Default`, mirroring how designers leave entries unconfigured.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{
    BuildingKind, CivicKind, Landform, TechKind, Terrain, UnitKind, WonderKind,
};
use crate::yields::Yields;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{catalog} catalog defines {key} more than once")]
    DuplicateKey { catalog: &'static str, key: String },
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone)]
pub struct Catalog<K, V> {
    records: HashMap<K, V>,
    fallback: V,
}

impl<K, V> Catalog<K, V>
where
    K: Copy + Eq + Hash + Ord + Debug,
    V: Default,
{
    pub fn from_entries(
        catalog: &'static str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, CatalogError> {
        let mut records = HashMap::new();
        for (key, value) in entries {
            if records.insert(key, value).is_some() {
                return Err(CatalogError::DuplicateKey {
                    catalog,
                    key: format!("{key:?}"),
                });
            }
        }
        Ok(Self {
            records,
            fallback: V::default(),
        })
    }

    pub fn empty() -> Self {
        Self {
            records: HashMap::new(),
            fallback: V::default(),
        }
    }

    /// The record for `key`, or the default record when none is configured.
    pub fn info(&self, key: K) -> &V {
        self.records.get(&key).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, key: K) -> bool {
        self.records.contains_key(&key)
    }

    /// Configured keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.records.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainInfo {
    pub name: String,
    pub yields: Yields,
    pub passable: bool,
    pub movement_cost: i32,
}

impl Default for TerrainInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            yields: Yields::ZERO,
            passable: true,
            movement_cost: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandformInfo {
    pub name: String,
    pub yields: Yields,
    pub passable: bool,
    pub extra_movement_cost: i32,
}

impl Default for LandformInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            yields: Yields::ZERO,
            passable: true,
            extra_movement_cost: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingInfo {
    pub name: String,
    pub production_cost: i32,
    /// Gold deducted from the hosting tile's yield every turn.
    pub maintenance: i32,
    pub yields: Yields,
}

impl Default for BuildingInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            production_cost: 60,
            maintenance: 1,
            yields: Yields::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitInfo {
    pub name: String,
    pub max_movement: i32,
    pub combat_strength: i32,
    /// Zero means the unit has no ranged attack.
    pub ranged_strength: i32,
    pub range: u32,
    pub production_cost: i32,
}

impl Default for UnitInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_movement: 2,
            combat_strength: 10,
            ranged_strength: 0,
            range: 0,
            production_cost: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechInfo {
    pub name: String,
    pub science_cost: i32,
    /// Informational only. Research targets are accepted regardless.
    pub prerequisites: Vec<TechKind>,
    /// The `unlocks_*` entries are informational only: production is not
    /// gated on unlocked technologies.
    pub unlocks_building: Option<BuildingKind>,
    pub unlocks_unit: Option<UnitKind>,
    pub unlocks_wonder: Option<WonderKind>,
}

impl Default for TechInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            science_cost: 25,
            prerequisites: Vec::new(),
            unlocks_building: None,
            unlocks_unit: None,
            unlocks_wonder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CivicInfo {
    pub name: String,
    pub culture_cost: i32,
    pub prerequisites: Vec<CivicKind>,
}

impl Default for CivicInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            culture_cost: 20,
            prerequisites: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WonderInfo {
    pub name: String,
    pub production_cost: i32,
    pub yields: Yields,
}

impl Default for WonderInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            production_cost: 180,
            yields: Yields::ZERO,
        }
    }
}

/// Every balance table the simulation reads.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub terrains: Catalog<Terrain, TerrainInfo>,
    pub landforms: Catalog<Landform, LandformInfo>,
    pub buildings: Catalog<BuildingKind, BuildingInfo>,
    pub units: Catalog<UnitKind, UnitInfo>,
    pub techs: Catalog<TechKind, TechInfo>,
    pub civics: Catalog<CivicKind, CivicInfo>,
    pub wonders: Catalog<WonderKind, WonderInfo>,
}

#[derive(Debug, Deserialize)]
struct Entry<K, V> {
    kind: K,
    #[serde(flatten)]
    info: V,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    terrains: Option<Vec<Entry<Terrain, TerrainInfo>>>,
    landforms: Option<Vec<Entry<Landform, LandformInfo>>>,
    buildings: Option<Vec<Entry<BuildingKind, BuildingInfo>>>,
    units: Option<Vec<Entry<UnitKind, UnitInfo>>>,
    techs: Option<Vec<Entry<TechKind, TechInfo>>>,
    civics: Option<Vec<Entry<CivicKind, CivicInfo>>>,
    wonders: Option<Vec<Entry<WonderKind, WonderInfo>>>,
}

fn section<K, V>(
    catalog: &'static str,
    entries: Option<Vec<Entry<K, V>>>,
    standard: Catalog<K, V>,
) -> Result<Catalog<K, V>, CatalogError>
where
    K: Copy + Eq + Hash + Ord + Debug,
    V: Default,
{
    match entries {
        Some(entries) => {
            Catalog::from_entries(catalog, entries.into_iter().map(|e| (e.kind, e.info)))
        }
        None => Ok(standard),
    }
}

impl Catalogs {
    /// Parses a YAML override file. Sections it leaves out keep the
    /// standard data; sections it provides replace the standard table whole.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        let standard = Self::standard();
        Ok(Self {
            terrains: section("terrain", file.terrains, standard.terrains)?,
            landforms: section("landform", file.landforms, standard.landforms)?,
            buildings: section("building", file.buildings, standard.buildings)?,
            units: section("unit", file.units, standard.units)?,
            techs: section("tech", file.techs, standard.techs)?,
            civics: section("civic", file.civics, standard.civics)?,
            wonders: section("wonder", file.wonders, standard.wonders)?,
        })
    }

    /// Catalogs with no records at all; every lookup yields the default record.
    pub fn empty() -> Self {
        Self {
            terrains: Catalog::empty(),
            landforms: Catalog::empty(),
            buildings: Catalog::empty(),
            units: Catalog::empty(),
            techs: Catalog::empty(),
            civics: Catalog::empty(),
            wonders: Catalog::empty(),
        }
    }

    pub fn standard() -> Self {
        Self {
            terrains: standard_table(standard_terrains()),
            landforms: standard_table(standard_landforms()),
            buildings: standard_table(standard_buildings()),
            units: standard_table(standard_units()),
            techs: standard_table(standard_techs()),
            civics: standard_table(standard_civics()),
            wonders: standard_table(standard_wonders()),
        }
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_table<K, V>(entries: Vec<(K, V)>) -> Catalog<K, V>
where
    K: Copy + Eq + Hash + Ord + Debug,
    V: Default,
{
    let records = entries.into_iter().collect();
    Catalog {
        records,
        fallback: V::default(),
    }
}

fn terrain(name: &str, yields: Yields, passable: bool) -> TerrainInfo {
    TerrainInfo {
        name: name.to_string(),
        yields,
        passable,
        movement_cost: 1,
    }
}

fn standard_terrains() -> Vec<(Terrain, TerrainInfo)> {
    vec![
        (Terrain::Ocean, terrain("Ocean", Yields::food(1), false)),
        (Terrain::Coast, terrain("Coast", Yields::new(1, 0, 1, 0, 0), true)),
        (Terrain::Plain, terrain("Plains", Yields::new(1, 1, 0, 0, 0), true)),
        (Terrain::Grassland, terrain("Grassland", Yields::food(2), true)),
        (Terrain::Desert, terrain("Desert", Yields::ZERO, true)),
        (Terrain::Tundra, terrain("Tundra", Yields::food(1), true)),
        (Terrain::Snow, terrain("Snow", Yields::ZERO, true)),
    ]
}

fn landform(
    name: &str,
    yields: Yields,
    passable: bool,
    extra_movement_cost: i32,
) -> LandformInfo {
    LandformInfo {
        name: name.to_string(),
        yields,
        passable,
        extra_movement_cost,
    }
}

fn standard_landforms() -> Vec<(Landform, LandformInfo)> {
    vec![
        (Landform::None, landform("None", Yields::ZERO, true, 0)),
        (Landform::Hills, landform("Hills", Yields::production(1), true, 1)),
        (Landform::Mountain, landform("Mountains", Yields::ZERO, false, 0)),
        (Landform::Forest, landform("Woods", Yields::production(1), true, 1)),
        (Landform::Rainforest, landform("Rainforest", Yields::food(1), true, 1)),
        (Landform::Marsh, landform("Marsh", Yields::food(1), true, 2)),
        (Landform::Oasis, landform("Oasis", Yields::new(3, 0, 1, 0, 0), true, 0)),
        (Landform::Ice, landform("Ice", Yields::ZERO, true, 0)),
    ]
}

fn building(name: &str, production_cost: i32, maintenance: i32, yields: Yields) -> BuildingInfo {
    BuildingInfo {
        name: name.to_string(),
        production_cost,
        maintenance,
        yields,
    }
}

fn standard_buildings() -> Vec<(BuildingKind, BuildingInfo)> {
    vec![
        (BuildingKind::Farm, building("Farm", 40, 0, Yields::food(1))),
        (BuildingKind::Mine, building("Mine", 40, 0, Yields::production(1))),
        (BuildingKind::LumberMill, building("Lumber Mill", 50, 0, Yields::production(2))),
        (BuildingKind::Granary, building("Granary", 65, 1, Yields::food(2))),
        (BuildingKind::Monument, building("Monument", 60, 1, Yields::new(0, 0, 0, 0, 2))),
        (BuildingKind::Library, building("Library", 90, 1, Yields::new(0, 0, 0, 2, 0))),
        (BuildingKind::Market, building("Market", 120, 0, Yields::gold(3))),
        (BuildingKind::Walls, building("Ancient Walls", 80, 1, Yields::ZERO)),
    ]
}

fn unit(
    name: &str,
    max_movement: i32,
    combat_strength: i32,
    ranged_strength: i32,
    range: u32,
    production_cost: i32,
) -> UnitInfo {
    UnitInfo {
        name: name.to_string(),
        max_movement,
        combat_strength,
        ranged_strength,
        range,
        production_cost,
    }
}

fn standard_units() -> Vec<(UnitKind, UnitInfo)> {
    vec![
        (UnitKind::Settler, unit("Settler", 2, 0, 0, 0, 80)),
        (UnitKind::Builder, unit("Builder", 2, 0, 0, 0, 50)),
        (UnitKind::Scout, unit("Scout", 3, 10, 0, 0, 30)),
        (UnitKind::Warrior, unit("Warrior", 2, 20, 0, 0, 40)),
        (UnitKind::Archer, unit("Archer", 2, 15, 20, 2, 60)),
        (UnitKind::Spearman, unit("Spearman", 2, 25, 0, 0, 65)),
        (UnitKind::Horseman, unit("Horseman", 4, 36, 0, 0, 80)),
    ]
}

fn tech(
    name: &str,
    science_cost: i32,
    prerequisites: Vec<TechKind>,
    unlocks_building: Option<BuildingKind>,
    unlocks_unit: Option<UnitKind>,
    unlocks_wonder: Option<WonderKind>,
) -> TechInfo {
    TechInfo {
        name: name.to_string(),
        science_cost,
        prerequisites,
        unlocks_building,
        unlocks_unit,
        unlocks_wonder,
    }
}

fn standard_techs() -> Vec<(TechKind, TechInfo)> {
    use TechKind::*;
    vec![
        (Pottery, tech("Pottery", 25, vec![], Some(BuildingKind::Granary), None, None)),
        (AnimalHusbandry, tech("Animal Husbandry", 25, vec![], None, Some(UnitKind::Horseman), None)),
        (Mining, tech("Mining", 25, vec![], Some(BuildingKind::Mine), None, None)),
        (Archery, tech("Archery", 50, vec![AnimalHusbandry], None, Some(UnitKind::Archer), None)),
        (Writing, tech("Writing", 50, vec![Pottery], Some(BuildingKind::Library), None, None)),
        (BronzeWorking, tech("Bronze Working", 80, vec![Mining], None, Some(UnitKind::Spearman), None)),
        (
            Masonry,
            tech("Masonry", 80, vec![Mining], Some(BuildingKind::Walls), None, Some(WonderKind::Pyramids)),
        ),
        (Currency, tech("Currency", 120, vec![Writing], Some(BuildingKind::Market), None, None)),
    ]
}

fn civic(name: &str, culture_cost: i32, prerequisites: Vec<CivicKind>) -> CivicInfo {
    CivicInfo {
        name: name.to_string(),
        culture_cost,
        prerequisites,
    }
}

fn standard_civics() -> Vec<(CivicKind, CivicInfo)> {
    use CivicKind::*;
    vec![
        (CodeOfLaws, civic("Code of Laws", 20, vec![])),
        (Craftsmanship, civic("Craftsmanship", 40, vec![CodeOfLaws])),
        (ForeignTrade, civic("Foreign Trade", 40, vec![CodeOfLaws])),
        (EarlyEmpire, civic("Early Empire", 70, vec![ForeignTrade])),
        (Mysticism, civic("Mysticism", 70, vec![ForeignTrade])),
    ]
}

fn wonder(name: &str, production_cost: i32, yields: Yields) -> WonderInfo {
    WonderInfo {
        name: name.to_string(),
        production_cost,
        yields,
    }
}

fn standard_wonders() -> Vec<(WonderKind, WonderInfo)> {
    vec![
        (WonderKind::Pyramids, wonder("Pyramids", 220, Yields::production(2))),
        (WonderKind::Stonehenge, wonder("Stonehenge", 180, Yields::new(0, 0, 0, 0, 2))),
        (WonderKind::HangingGardens, wonder("Hanging Gardens", 240, Yields::food(3))),
        (WonderKind::GreatLibrary, wonder("Great Library", 290, Yields::new(0, 0, 0, 3, 0))),
    ]
}
