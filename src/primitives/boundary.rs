// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::codec::{de_i64_lenient, de_u64_lenient};
use chrono::{DateTime, NaiveDate};
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Reporting period granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Hourly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        }
    }

    pub fn period_seconds(&self) -> i64 {
        match self {
            Self::Daily => SECONDS_PER_DAY,
            Self::Hourly => SECONDS_PER_HOUR,
        }
    }

    /// Floors a unix timestamp to the start of its UTC calendar period
    pub fn period_start(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.period_seconds())
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::Daily
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFrequencyErr(pub String);

impl fmt::Display for ParseFrequencyErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid frequency {:?}, expected daily or hourly", self.0)
    }
}

impl std::error::Error for ParseFrequencyErr {}

impl FromStr for Frequency {
    type Err = ParseFrequencyErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "hourly" | "hour" => Ok(Self::Hourly),
            _ => Err(ParseFrequencyErr(s.to_owned())),
        }
    }
}

/// Daily or hourly snapshot record of the network subgraph. Only the
/// fields needed to place period boundaries are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    #[serde(default)]
    pub id: String,

    #[serde(
        rename = "blockHeight",
        alias = "block_height",
        alias = "height",
        deserialize_with = "de_u64_lenient"
    )]
    pub block_height: u64,

    #[serde(deserialize_with = "de_i64_lenient")]
    pub timestamp: i64,
}

/// First block height of a reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodBoundary {
    pub height: u64,

    /// Unix timestamp, seconds
    pub timestamp: i64,
}

impl PeriodBoundary {
    pub fn new(height: u64, timestamp: i64) -> Self {
        Self { height, timestamp }
    }

    /// UTC calendar date of the boundary. `None` if the timestamp is out of range.
    pub fn date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.timestamp, 0).map(|dt| dt.date_naive())
    }
}

/// Places one boundary at the lowest block height observed in each calendar period.
///
/// The result is sorted by height and strictly increasing. A period whose
/// first height does not exceed the previous boundary is dropped.
pub fn derive_boundaries(rows: &[SnapshotRow], frequency: Frequency) -> Vec<PeriodBoundary> {
    let mut firsts: BTreeMap<i64, &SnapshotRow> = BTreeMap::new();

    for row in rows {
        match firsts.entry(frequency.period_start(row.timestamp)) {
            Entry::Vacant(e) => {
                e.insert(row);
            }
            Entry::Occupied(mut e) => {
                if row.block_height < e.get().block_height {
                    e.insert(row);
                }
            }
        }
    }

    let mut boundaries: Vec<PeriodBoundary> = Vec::with_capacity(firsts.len());
    for row in firsts.values() {
        if let Some(last) = boundaries.last() {
            if row.block_height <= last.height {
                warn!(
                    "Dropping {} boundary at height {} (timestamp {}): not above previous boundary {}",
                    frequency, row.block_height, row.timestamp, last.height
                );
                continue;
            }
        }

        boundaries.push(PeriodBoundary::new(row.block_height, row.timestamp));
    }

    boundaries
}

/// Keeps the boundaries dated within `[from, to]`, plus the last boundary
/// before `from` so the first period in range still has a baseline.
pub fn filter_boundaries(
    boundaries: &[PeriodBoundary],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<PeriodBoundary> {
    let mut baseline = None;
    let mut out = Vec::with_capacity(boundaries.len());

    for boundary in boundaries {
        let date = match boundary.date() {
            Some(date) => date,
            None => continue,
        };

        if from.map_or(false, |from| date < from) {
            baseline = Some(*boundary);
            continue;
        }

        if to.map_or(false, |to| date > to) {
            continue;
        }

        out.push(*boundary);
    }

    if let Some(baseline) = baseline {
        out.insert(0, baseline);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    // 2022-07-01T00:00:00Z
    const JULY_1: i64 = 1_656_633_600;

    fn row(height: u64, timestamp: i64) -> SnapshotRow {
        SnapshotRow {
            id: String::new(),
            block_height: height,
            timestamp,
        }
    }

    #[test]
    fn it_parses_frequency() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("Hourly".parse::<Frequency>().unwrap(), Frequency::Hourly);
        assert!("weekly".parse::<Frequency>().is_err());
    }

    #[test]
    fn it_floors_to_period_start() {
        assert_eq!(Frequency::Daily.period_start(JULY_1 + 3_599), JULY_1);
        assert_eq!(Frequency::Hourly.period_start(JULY_1 + 3_599), JULY_1);
        assert_eq!(Frequency::Hourly.period_start(JULY_1 + 3_600), JULY_1 + 3_600);
        assert_eq!(Frequency::Daily.period_start(-1), -SECONDS_PER_DAY);
    }

    #[test]
    fn it_derives_first_height_per_day() {
        let rows = vec![
            row(110, JULY_1 + 500),
            row(100, JULY_1 + 10),
            row(205, JULY_1 + SECONDS_PER_DAY + 20),
            row(200, JULY_1 + SECONDS_PER_DAY + 5),
            row(300, JULY_1 + 2 * SECONDS_PER_DAY),
        ];

        let boundaries = derive_boundaries(&rows, Frequency::Daily);
        assert_eq!(
            boundaries,
            vec![
                PeriodBoundary::new(100, JULY_1 + 10),
                PeriodBoundary::new(200, JULY_1 + SECONDS_PER_DAY + 5),
                PeriodBoundary::new(300, JULY_1 + 2 * SECONDS_PER_DAY),
            ]
        );
    }

    #[test]
    fn it_drops_out_of_order_periods() {
        let rows = vec![
            row(100, JULY_1),
            row(90, JULY_1 + SECONDS_PER_DAY),
            row(300, JULY_1 + 2 * SECONDS_PER_DAY),
        ];

        let heights: Vec<_> = derive_boundaries(&rows, Frequency::Daily)
            .iter()
            .map(|b| b.height)
            .collect();
        assert_eq!(heights, vec![100, 300]);
    }

    #[test]
    fn it_dates_boundaries_in_utc() {
        let boundary = PeriodBoundary::new(1, JULY_1 + SECONDS_PER_DAY - 1);
        assert_eq!(boundary.date(), NaiveDate::from_ymd_opt(2022, 7, 1));
        assert_eq!(PeriodBoundary::new(1, i64::MAX).date(), None);
    }

    #[test]
    fn it_filters_boundaries_keeping_a_baseline() {
        let boundaries: Vec<_> = (0..5)
            .map(|i| PeriodBoundary::new(100 * (i + 1), JULY_1 + i as i64 * SECONDS_PER_DAY))
            .collect();

        let filtered = filter_boundaries(
            &boundaries,
            NaiveDate::from_ymd_opt(2022, 7, 3),
            NaiveDate::from_ymd_opt(2022, 7, 4),
        );
        let heights: Vec<_> = filtered.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![200, 300, 400]);

        assert_eq!(filter_boundaries(&boundaries, None, None), boundaries);
    }

    #[quickcheck]
    fn derived_boundaries_are_strictly_increasing(rows: Vec<(u32, u32)>, hourly: bool) -> bool {
        let frequency = if hourly { Frequency::Hourly } else { Frequency::Daily };
        let rows: Vec<_> = rows
            .into_iter()
            .map(|(height, timestamp)| row(height as u64, JULY_1 + timestamp as i64))
            .collect();
        let boundaries = derive_boundaries(&rows, frequency);

        let periods: Vec<_> = boundaries
            .iter()
            .map(|b| frequency.period_start(b.timestamp))
            .collect();
        boundaries.windows(2).all(|w| w[0].height < w[1].height)
            && periods.windows(2).all(|w| w[0] < w[1])
            && boundaries.iter().all(|b| rows.iter().any(|r| r.block_height == b.height))
    }
}
