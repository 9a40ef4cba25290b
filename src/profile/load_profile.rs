//! Sparse step-function load profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::commodity::{Commodity, CommodityMap};
use super::compression::LoadProfileCompression;

/// Sparse, per-commodity step function of integer power over time.
///
/// Each commodity holds `(tick, watts)` entries strictly increasing in
/// `tick` (seconds). A value holds until the next entry of the same
/// commodity. Before the first entry the value is 0. A closed profile
/// (see [`LoadProfile::close`]) is 0 at and after its end tick.
///
/// # Examples
///
/// ```
/// use hems_sched::profile::{Commodity, LoadProfile};
///
/// let mut p = LoadProfile::new();
/// p.set_load(Commodity::ActivePower, 0, 500);
/// p.set_load(Commodity::ActivePower, 60, 0);
/// assert_eq!(p.value_at(Commodity::ActivePower, 30), 500);
/// assert_eq!(p.value_at(Commodity::ActivePower, 90), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadProfile {
    series: CommodityMap<Vec<(i64, i32)>>,
    end: Option<i64>,
}

impl LoadProfile {
    /// Creates an empty, open profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the step starting at `tick` to `value` watts.
    ///
    /// Appending in non-decreasing tick order is O(1) amortized; earlier
    /// ticks are located by binary search. Ticks at or after a closed end
    /// are ignored.
    pub fn set_load(&mut self, commodity: Commodity, tick: i64, value: i32) {
        if self.end.is_some_and(|end| tick >= end) {
            return;
        }
        let series = &mut self.series[commodity];
        match series.last_mut() {
            None => series.push((tick, value)),
            Some(last) if last.0 < tick => series.push((tick, value)),
            Some(last) if last.0 == tick => last.1 = value,
            Some(_) => match series.binary_search_by_key(&tick, |e| e.0) {
                Ok(i) => series[i].1 = value,
                Err(i) => series.insert(i, (tick, value)),
            },
        }
    }

    /// Value in effect at `tick`.
    pub fn value_at(&self, commodity: Commodity, tick: i64) -> i32 {
        if self.end.is_some_and(|end| tick >= end) {
            return 0;
        }
        let series = &self.series[commodity];
        let idx = series.partition_point(|e| e.0 <= tick);
        if idx == 0 { 0 } else { series[idx - 1].1 }
    }

    /// Raw entries of one commodity.
    pub fn entries(&self, commodity: Commodity) -> &[(i64, i32)] {
        &self.series[commodity]
    }

    /// Commodities that carry at least one entry.
    pub fn commodities(&self) -> impl Iterator<Item = Commodity> + '_ {
        self.series
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(c, _)| c)
    }

    /// `true` when no commodity carries an entry.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|(_, s)| s.is_empty())
    }

    /// Closed end tick, if any.
    pub fn end_time(&self) -> Option<i64> {
        self.end
    }

    /// Earliest entry tick across all commodities.
    pub fn start_time(&self) -> Option<i64> {
        self.series.iter().filter_map(|(_, s)| s.first().map(|e| e.0)).min()
    }

    /// Closes the profile at `end`: entries at or after `end` are dropped and
    /// every value is 0 from `end` on.
    pub fn close(&mut self, end: i64) {
        if let Some(old_end) = self.end.filter(|e| *e < end) {
            // Reopening must keep the zero tail that used to be implicit.
            for (_, series) in self.series.iter_mut() {
                if series.last().is_some_and(|e| e.1 != 0) {
                    series.push((old_end, 0));
                }
            }
        }
        for (_, series) in self.series.iter_mut() {
            let keep = series.partition_point(|e| e.0 < end);
            series.truncate(keep);
        }
        self.end = Some(end);
    }

    /// Returns `self + other` with `other` shifted by `offset` seconds.
    ///
    /// The result has an entry at every tick where either input has one
    /// (including closed ends inside the merged range). Merging with an
    /// empty profile is the identity.
    pub fn merge(&self, other: &LoadProfile, offset: i64) -> LoadProfile {
        let shifted = other.clone_with_offset(offset);
        let end = merged_end(self, &shifted);

        let mut out = LoadProfile {
            series: CommodityMap::default(),
            end,
        };
        for commodity in Commodity::ALL {
            let mut ticks: Vec<i64> = Vec::new();
            for p in [self, &shifted] {
                let series = &p.series[commodity];
                ticks.extend(series.iter().map(|e| e.0));
                if let (Some(e), false) = (p.end, series.is_empty()) {
                    ticks.push(e);
                }
            }
            ticks.sort_unstable();
            ticks.dedup();
            if let Some(e) = end {
                ticks.retain(|t| *t < e);
            }
            out.series[commodity] = ticks
                .into_iter()
                .map(|t| {
                    let sum = i64::from(self.value_at(commodity, t))
                        + i64::from(shifted.value_at(commodity, t));
                    (t, saturate(sum))
                })
                .collect();
        }
        out
    }

    /// Returns a copy whose old tick 0 lies at `new_start`.
    ///
    /// Turns a relative (e.g. midnight-anchored) profile into an absolute
    /// one.
    pub fn clone_with_offset(&self, new_start: i64) -> LoadProfile {
        let mut out = self.clone();
        for (_, series) in out.series.iter_mut() {
            for entry in series.iter_mut() {
                entry.0 += new_start;
            }
        }
        out.end = self.end.map(|e| e + new_start);
        out
    }

    /// Returns a copy with every value scaled by `factor` (rounded).
    pub fn multiply(&self, factor: f64) -> LoadProfile {
        let mut out = self.clone();
        for (_, series) in out.series.iter_mut() {
            for entry in series.iter_mut() {
                entry.1 = saturate((f64::from(entry.1) * factor).round() as i64);
            }
        }
        out
    }

    /// Returns a compressed copy.
    ///
    /// This is a deliberately lossy step; see [`LoadProfileCompression`] for
    /// the bound each type guarantees.
    pub fn compressed(&self, compression: &LoadProfileCompression) -> LoadProfile {
        self.compressed_per_commodity(&CommodityMap::splat(*compression))
    }

    /// Like [`compressed`](Self::compressed) with a policy per commodity.
    pub fn compressed_per_commodity(&self, compression: &CommodityMap<LoadProfileCompression>) -> LoadProfile {
        LoadProfile {
            series: CommodityMap::from_fn(|c| compression[c].compress_series(&self.series[c])),
            end: self.end,
        }
    }

    /// Plain `commodity -> tick -> value` view for downstream consumers.
    ///
    /// A closed end is represented by a trailing 0 entry.
    pub fn to_map(&self) -> BTreeMap<Commodity, BTreeMap<i64, i32>> {
        let mut map = BTreeMap::new();
        for commodity in self.commodities() {
            let mut inner: BTreeMap<i64, i32> = self.series[commodity].iter().copied().collect();
            if let Some(end) = self.end {
                inner.insert(end, 0);
            }
            map.insert(commodity, inner);
        }
        map
    }

    /// Constant-value segments `(start, duration, value)` covering `[from, to)`.
    pub fn segments(&self, commodity: Commodity, from: i64, to: i64) -> Vec<(i64, i64, i32)> {
        if to <= from {
            return Vec::new();
        }
        let mut breaks: Vec<i64> = self.series[commodity]
            .iter()
            .map(|e| e.0)
            .filter(|t| *t > from && *t < to)
            .collect();
        if let Some(end) = self.end.filter(|e| *e > from && *e < to) {
            breaks.push(end);
            breaks.sort_unstable();
            breaks.dedup();
        }
        let mut out = Vec::with_capacity(breaks.len() + 1);
        let mut start = from;
        for b in breaks.into_iter().chain(std::iter::once(to)) {
            out.push((start, b - start, self.value_at(commodity, start)));
            start = b;
        }
        out
    }

    /// Energy in watt-hours over `[from, to)`, split into
    /// `(consumed, produced)` magnitudes.
    pub fn energy_wh(&self, commodity: Commodity, from: i64, to: i64) -> (f64, f64) {
        let mut consumed = 0.0;
        let mut produced = 0.0;
        for (_, duration, value) in self.segments(commodity, from, to) {
            let wh = f64::from(value) * duration as f64 / 3600.0;
            if wh >= 0.0 {
                consumed += wh;
            } else {
                produced -= wh;
            }
        }
        (consumed, produced)
    }

    /// Largest and smallest value over `[from, to)`.
    pub fn extremes(&self, commodity: Commodity, from: i64, to: i64) -> (i32, i32) {
        self.segments(commodity, from, to)
            .iter()
            .fold((i32::MIN, i32::MAX), |(hi, lo), s| (hi.max(s.2), lo.min(s.2)))
    }
}

fn merged_end(a: &LoadProfile, b: &LoadProfile) -> Option<i64> {
    let mut ends = [a, b].into_iter().filter(|p| !p.is_empty()).map(|p| p.end);
    let Some(first) = ends.next() else {
        return a.end;
    };
    ends.fold(first, |acc, e| match (acc, e) {
        (Some(x), Some(y)) => Some(x.max(y)),
        _ => None,
    })
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
