pub mod economy;
pub mod research;
pub mod upkeep;
pub mod victory;
pub mod visibility;

pub use economy::EconomySystem;
pub use research::ResearchSystem;
pub use upkeep::UnitUpkeepSystem;
pub use victory::VictorySystem;
pub use visibility::VisibilitySystem;
