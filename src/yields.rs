use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// The five per-turn resource channels.
///
/// All aggregation in the economy is built on component-wise addition, with
/// [`Yields::ZERO`] as the identity. Components are signed: a tile or city
/// may legitimately produce a negative net yield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Yields {
    pub food: i32,
    pub production: i32,
    pub gold: i32,
    pub science: i32,
    pub culture: i32,
}

impl Yields {
    pub const ZERO: Yields = Yields::new(0, 0, 0, 0, 0);

    pub const fn new(food: i32, production: i32, gold: i32, science: i32, culture: i32) -> Self {
        Self {
            food,
            production,
            gold,
            science,
            culture,
        }
    }

    pub const fn food(food: i32) -> Self {
        Self::new(food, 0, 0, 0, 0)
    }

    pub const fn production(production: i32) -> Self {
        Self::new(0, production, 0, 0, 0)
    }

    pub const fn gold(gold: i32) -> Self {
        Self::new(0, 0, gold, 0, 0)
    }

    /// The part of a city's yield that is banked in the owner's treasury.
    /// Food and production stay with the city.
    pub fn treasury_share(self) -> Self {
        Self::new(0, 0, self.gold, self.science, self.culture)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for Yields {
    type Output = Yields;

    fn add(self, rhs: Self) -> Self::Output {
        Yields {
            food: self.food + rhs.food,
            production: self.production + rhs.production,
            gold: self.gold + rhs.gold,
            science: self.science + rhs.science,
            culture: self.culture + rhs.culture,
        }
    }
}

impl AddAssign for Yields {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Yields {
    type Output = Yields;

    fn neg(self) -> Self::Output {
        Yields {
            food: -self.food,
            production: -self.production,
            gold: -self.gold,
            science: -self.science,
            culture: -self.culture,
        }
    }
}

impl Sub for Yields {
    type Output = Yields;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl SubAssign for Yields {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Sum for Yields {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Yields::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Yields> for Yields {
    fn sum<I: Iterator<Item = &'a Yields>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
