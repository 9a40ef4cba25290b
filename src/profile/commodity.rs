//! Exchanged commodities and a dense per-commodity map.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// A quantity exchanged between devices or with the grid.
///
/// All power values attached to a commodity are signed watts, negative
/// meaning production (feed-in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Commodity {
    ActivePower,
    ReactivePower,
    NaturalGasPower,
    HeatingHotWaterPower,
    DomesticHotWaterPower,
    ColdWaterPower,
}

impl Commodity {
    /// Number of commodities.
    pub const COUNT: usize = 6;

    /// Every commodity in declaration order.
    pub const ALL: [Commodity; Commodity::COUNT] = [
        Commodity::ActivePower,
        Commodity::ReactivePower,
        Commodity::NaturalGasPower,
        Commodity::HeatingHotWaterPower,
        Commodity::DomesticHotWaterPower,
        Commodity::ColdWaterPower,
    ];

    /// Position of this commodity inside a [`CommodityMap`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Upper-case wire name, e.g. `HEATINGHOTWATERPOWER`.
    pub fn name(self) -> &'static str {
        match self {
            Commodity::ActivePower => "ACTIVEPOWER",
            Commodity::ReactivePower => "REACTIVEPOWER",
            Commodity::NaturalGasPower => "NATURALGASPOWER",
            Commodity::HeatingHotWaterPower => "HEATINGHOTWATERPOWER",
            Commodity::DomesticHotWaterPower => "DOMESTICHOTWATERPOWER",
            Commodity::ColdWaterPower => "COLDWATERPOWER",
        }
    }

    /// Commodities metered at the grid connection point.
    pub fn is_grid_commodity(self) -> bool {
        matches!(
            self,
            Commodity::ActivePower | Commodity::ReactivePower | Commodity::NaturalGasPower
        )
    }

    /// Parses the upper-case wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size map with one slot per [`Commodity`].
///
/// Used for all per-tick state in the co-simulation so the hot loop never
/// hashes and iteration order is always the declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CommodityMap<T>([T; Commodity::COUNT]);

impl<T> CommodityMap<T> {
    /// Creates a map from a value per slot.
    pub fn from_fn(mut f: impl FnMut(Commodity) -> T) -> Self {
        Self(Commodity::ALL.map(&mut f))
    }

    /// Iterates `(commodity, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Commodity, &T)> {
        Commodity::ALL.into_iter().zip(self.0.iter())
    }

    /// Iterates mutable `(commodity, value)` pairs in declaration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Commodity, &mut T)> {
        Commodity::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T: Copy> CommodityMap<T> {
    /// Creates a map holding `value` in every slot.
    pub fn splat(value: T) -> Self {
        Self([value; Commodity::COUNT])
    }
}

impl<T> Index<Commodity> for CommodityMap<T> {
    type Output = T;

    fn index(&self, commodity: Commodity) -> &T {
        &self.0[commodity.index()]
    }
}

impl<T> IndexMut<Commodity> for CommodityMap<T> {
    fn index_mut(&mut self, commodity: Commodity) -> &mut T {
        &mut self.0[commodity.index()]
    }
}
