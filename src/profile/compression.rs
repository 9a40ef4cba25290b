//! Lossy compression of load-profile step series.

use serde::{Deserialize, Serialize};

/// How a [`LoadProfile`](super::LoadProfile) is thinned before it leaves the
/// co-simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    /// Keep every entry.
    #[default]
    Raw,
    /// Drop entries within `value` watts of the last kept entry.
    Discontinuities,
    /// Keep only the first entry of every `value`-second slot.
    Timeslot,
}

/// Compression policy: a [`CompressionType`] plus its numeric parameter.
///
/// `DISCONTINUITIES` is lossy by at most `value` watts at any tick.
/// `TIMESLOT` is lossy without a value bound; it bounds the entry count to
/// one per slot. Both keep the first and the last entry of every series
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadProfileCompression {
    /// Compression algorithm.
    #[serde(rename = "type")]
    pub kind: CompressionType,
    /// Epsilon in watts (`Discontinuities`) or slot width in seconds (`Timeslot`).
    #[serde(default)]
    pub value: i64,
}

impl Default for LoadProfileCompression {
    fn default() -> Self {
        Self::raw()
    }
}

impl LoadProfileCompression {
    pub fn raw() -> Self {
        Self {
            kind: CompressionType::Raw,
            value: 0,
        }
    }

    pub fn discontinuities(epsilon_w: i64) -> Self {
        Self {
            kind: CompressionType::Discontinuities,
            value: epsilon_w,
        }
    }

    pub fn timeslot(width_secs: i64) -> Self {
        Self {
            kind: CompressionType::Timeslot,
            value: width_secs,
        }
    }

    /// Returns a compressed copy of one commodity's series.
    pub(crate) fn compress_series(&self, series: &[(i64, i32)]) -> Vec<(i64, i32)> {
        match self.kind {
            CompressionType::Raw => series.to_vec(),
            CompressionType::Discontinuities => by_discontinuities(series, self.value.max(0)),
            CompressionType::Timeslot if self.value > 0 => by_timeslot(series, self.value),
            CompressionType::Timeslot => series.to_vec(),
        }
    }
}

fn by_discontinuities(series: &[(i64, i32)], epsilon: i64) -> Vec<(i64, i32)> {
    let Some((&first, rest)) = series.split_first() else {
        return Vec::new();
    };
    let mut out = vec![first];
    let mut kept = i64::from(first.1);
    for (i, &(tick, value)) in rest.iter().enumerate() {
        let is_last = i + 1 == rest.len();
        if is_last || (i64::from(value) - kept).abs() > epsilon {
            out.push((tick, value));
            kept = i64::from(value);
        }
    }
    out
}

fn by_timeslot(series: &[(i64, i32)], width: i64) -> Vec<(i64, i32)> {
    let Some((&first, rest)) = series.split_first() else {
        return Vec::new();
    };
    let mut out = vec![first];
    let mut slot = first.0.div_euclid(width);
    for (i, &(tick, value)) in rest.iter().enumerate() {
        let is_last = i + 1 == rest.len();
        let this_slot = tick.div_euclid(width);
        if is_last || this_slot != slot {
            out.push((tick, value));
            slot = this_slot;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_keeps_everything() {
        let s = vec![(0, 1), (1, 1), (2, 3)];
        assert_eq!(LoadProfileCompression::raw().compress_series(&s), s);
    }

    #[test]
    fn discontinuities_drops_small_changes() {
        let s = vec![(0, 100), (10, 105), (20, 200), (30, 198), (40, 0)];
        let c = LoadProfileCompression::discontinuities(10).compress_series(&s);
        assert_eq!(c, vec![(0, 100), (20, 200), (40, 0)]);
    }

    #[test]
    fn discontinuities_keeps_last_entry() {
        let s = vec![(0, 100), (10, 101), (20, 102)];
        let c = LoadProfileCompression::discontinuities(10).compress_series(&s);
        assert_eq!(c, vec![(0, 100), (20, 102)]);
    }

    #[test]
    fn timeslot_keeps_first_entry_per_slot() {
        let s = vec![(0, 1), (30, 2), (60, 3), (90, 4), (150, 5), (170, 6)];
        let c = LoadProfileCompression::timeslot(60).compress_series(&s);
        assert_eq!(c, vec![(0, 1), (60, 3), (150, 5), (170, 6)]);
    }

    #[test]
    fn empty_series_stays_empty() {
        for c in [
            LoadProfileCompression::raw(),
            LoadProfileCompression::discontinuities(5),
            LoadProfileCompression::timeslot(60),
        ] {
            assert!(c.compress_series(&[]).is_empty());
        }
    }

    #[test]
    fn deserializes_from_toml() {
        let c: LoadProfileCompression = toml::from_str("type = \"timeslot\"\nvalue = 300").unwrap();
        assert_eq!(c, LoadProfileCompression::timeslot(300));
    }
}
