//! Price and power-limit signal snapshots consumed by the co-simulation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::{Commodity, CommodityMap};

/// Step function of a value over absolute time (seconds since epoch).
///
/// Before the first entry the `default` value applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSeries<T> {
    entries: Vec<(i64, T)>,
    default: T,
}

impl<T: Copy> StepSeries<T> {
    /// A series holding `value` everywhere.
    pub fn constant(value: T) -> Self {
        Self {
            entries: Vec::new(),
            default: value,
        }
    }

    /// Sets the value in effect from `tick` on.
    pub fn insert(&mut self, tick: i64, value: T) {
        match self.entries.binary_search_by_key(&tick, |e| e.0) {
            Ok(i) => self.entries[i].1 = value,
            Err(i) => self.entries.insert(i, (tick, value)),
        }
    }

    /// Builder form of [`StepSeries::insert`].
    pub fn with(mut self, tick: i64, value: T) -> Self {
        self.insert(tick, value);
        self
    }

    /// Value in effect at `tick`.
    pub fn value_at(&self, tick: i64) -> T {
        let idx = self.entries.partition_point(|e| e.0 <= tick);
        if idx == 0 {
            self.default
        } else {
            self.entries[idx - 1].1
        }
    }
}

/// Prices for one commodity in cents per kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    /// Price paid for consumed energy.
    pub import_per_kwh: f64,
    /// Compensation received for produced (fed-in) energy.
    pub export_per_kwh: f64,
}

impl Tariff {
    /// Cost in cents of running at `power_w` for `secs` seconds.
    ///
    /// Production yields a negative cost.
    pub fn cost(&self, power_w: f64, secs: i64) -> f64 {
        let kwh = power_w * secs as f64 / 3_600_000.0;
        if kwh >= 0.0 {
            kwh * self.import_per_kwh
        } else {
            kwh * self.export_per_kwh
        }
    }
}

/// Admissible net power band for one commodity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLimit {
    /// Maximum net consumption (W).
    pub upper_w: f64,
    /// Minimum net power, i.e. negated maximum feed-in (W).
    pub lower_w: f64,
}

impl PowerLimit {
    /// Magnitude (W) by which `power_w` leaves the band.
    pub fn violation_w(&self, power_w: f64) -> f64 {
        if power_w > self.upper_w {
            power_w - self.upper_w
        } else if power_w < self.lower_w {
            self.lower_w - power_w
        } else {
            0.0
        }
    }
}

/// Cost and limit violation accrued during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickCost {
    /// Energy cost in cents.
    pub cost: f64,
    /// Limit violation in Wh.
    pub violation_wh: f64,
}

/// Price and power-limit signals valid for one optimization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    prices: BTreeMap<Commodity, StepSeries<Tariff>>,
    limits: BTreeMap<Commodity, StepSeries<PowerLimit>>,
}

impl SignalSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, commodity: Commodity, series: StepSeries<Tariff>) -> Self {
        self.prices.insert(commodity, series);
        self
    }

    pub fn with_limit(mut self, commodity: Commodity, series: StepSeries<PowerLimit>) -> Self {
        self.limits.insert(commodity, series);
        self
    }

    pub fn price_at(&self, commodity: Commodity, tick: i64) -> Option<Tariff> {
        self.prices.get(&commodity).map(|s| s.value_at(tick))
    }

    pub fn limit_at(&self, commodity: Commodity, tick: i64) -> Option<PowerLimit> {
        self.limits.get(&commodity).map(|s| s.value_at(tick))
    }

    /// Prices and checks the net grid totals of one tick.
    pub fn tick_cost(&self, totals: &CommodityMap<i64>, tick: i64, step_size: i64) -> TickCost {
        let mut out = TickCost::default();
        for (commodity, series) in &self.prices {
            let power = totals[*commodity] as f64;
            out.cost += series.value_at(tick).cost(power, step_size);
        }
        for (commodity, series) in &self.limits {
            let power = totals[*commodity] as f64;
            out.violation_wh += series.value_at(tick).violation_w(power) * step_size as f64 / 3600.0;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_series_default_before_first_entry() {
        let s = StepSeries::constant(1.0).with(100, 2.0).with(50, 3.0);
        assert_eq!(s.value_at(0), 1.0);
        assert_eq!(s.value_at(50), 3.0);
        assert_eq!(s.value_at(99), 3.0);
        assert_eq!(s.value_at(100), 2.0);
    }

    #[test]
    fn tariff_prices_import_and_export_separately() {
        let t = Tariff {
            import_per_kwh: 30.0,
            export_per_kwh: 10.0,
        };
        assert!((t.cost(1000.0, 3600) - 30.0).abs() < 1e-9);
        assert!((t.cost(-1000.0, 3600) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn limit_violation_magnitude() {
        let l = PowerLimit {
            upper_w: 5000.0,
            lower_w: -3000.0,
        };
        assert_eq!(l.violation_w(4000.0), 0.0);
        assert_eq!(l.violation_w(6000.0), 1000.0);
        assert_eq!(l.violation_w(-3500.0), 500.0);
    }

    #[test]
    fn tick_cost_uses_only_signalled_commodities() {
        let signals = SignalSnapshot::new()
            .with_price(
                Commodity::ActivePower,
                StepSeries::constant(Tariff {
                    import_per_kwh: 36.0,
                    export_per_kwh: 0.0,
                }),
            )
            .with_limit(
                Commodity::ActivePower,
                StepSeries::constant(PowerLimit {
                    upper_w: 500.0,
                    lower_w: -500.0,
                }),
            );
        let mut totals = CommodityMap::splat(0_i64);
        totals[Commodity::ActivePower] = 1000;
        totals[Commodity::NaturalGasPower] = 5000;
        let c = signals.tick_cost(&totals, 0, 3600);
        assert!((c.cost - 36.0).abs() < 1e-9);
        assert!((c.violation_wh - 500.0).abs() < 1e-9);
    }
}
