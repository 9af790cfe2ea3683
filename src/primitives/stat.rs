// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Decentralization statistics of one network over one reporting period.
///
/// The distribution fields describe blocks authored per active author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecentralizationStat {
    pub network: String,

    /// UTC date of the period end boundary, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    /// Height of the period end boundary
    pub height: u64,

    /// Authors with at least one block in the period
    pub author_count: usize,

    pub nakamoto_realized: usize,

    pub sum: i64,
    pub mean: f64,
    pub median: f64,
    pub max: i64,
    pub min: i64,

    /// Sample standard deviation
    pub std: f64,

    #[serde(alias = "q1")]
    pub lower_quartile: f64,

    #[serde(alias = "q3")]
    pub upper_quartile: f64,
}

/// Keeps the rows dated within the inclusive `[from, to]` range
pub fn filter_stats(
    stats: &[DecentralizationStat],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<DecentralizationStat> {
    stats
        .iter()
        .filter(|s| from.map_or(true, |from| s.date >= from))
        .filter(|s| to.map_or(true, |to| s.date <= to))
        .cloned()
        .collect()
}
