// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::engine::{EngineErr, NakamotoThreshold, LOWER_QUARTILE, MEDIAN, UPPER_QUARTILE};
use serde::{Deserialize, Serialize};
use std::cmp;

/// Descriptive statistics of blocks authored per author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub sum: i64,
    pub mean: f64,
    pub median: f64,
    pub min: i64,
    pub max: i64,
    pub std: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
}

impl Distribution {
    /// `sorted` must be non-empty and in ascending order, `sum` its exact total
    fn from_sorted(sorted: &[i64], sum: i64) -> Self {
        debug_assert!(!sorted.is_empty());
        debug_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

        let n = sorted.len();
        let mean = sum as f64 / n as f64;
        let std = if n > 1 {
            let squares: f64 = sorted.iter().map(|v| (*v as f64 - mean).powi(2)).sum();
            (squares / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            sum,
            mean,
            median: quantile(sorted, MEDIAN),
            min: sorted[0],
            max: sorted[n - 1],
            std,
            lower_quartile: quantile(sorted, LOWER_QUARTILE),
            upper_quartile: quantile(sorted, UPPER_QUARTILE),
        }
    }
}

/// Concentration of block production within one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub author_count: usize,
    pub nakamoto_realized: usize,
    pub distribution: Distribution,
}

/// Linear interpolation between the closest ranks at `(n - 1) * p`
pub fn quantile(sorted: &[i64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let a = sorted[lo] as f64;
    let b = sorted[hi] as f64;
    a + (h - lo as f64) * (b - a)
}

/// Computes the blocks-authored distribution and the realized Nakamoto
/// coefficient of one period.
///
/// Authors are ranked by blocks authored, descending, ties broken by
/// ascending author id. Every author whose cumulative share, including its
/// own blocks, stays below the threshold is counted, plus the author that
/// crosses it.
///
/// Every entry must carry a positive block count and at least one entry is
/// required.
pub fn concentration<'a, I>(entries: I, threshold: NakamotoThreshold) -> Result<Concentration, EngineErr>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut ranked: Vec<(&str, i64)> = Vec::new();
    for (author_id, blocks) in entries {
        if blocks <= 0 {
            return Err(EngineErr::NonPositiveBlocks {
                author_id: author_id.to_owned(),
                blocks,
            });
        }

        ranked.push((author_id, blocks));
    }

    if ranked.is_empty() {
        return Err(EngineErr::NoActiveAuthors);
    }

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total: u128 = ranked.iter().map(|(_, b)| *b as u128).sum();
    let sum = i64::try_from(total).map_err(|_| EngineErr::BlocksOverflow(total))?;
    let mut cumulative: u128 = 0;
    let mut below = 0;
    for (_, blocks) in ranked.iter() {
        cumulative += *blocks as u128;
        if !threshold.is_below(cumulative, total) {
            break;
        }
        below += 1;
    }

    let mut sorted: Vec<i64> = ranked.iter().map(|(_, b)| *b).collect();
    sorted.reverse();

    Ok(Concentration {
        author_count: ranked.len(),
        nakamoto_realized: cmp::min(below + 1, ranked.len()),
        distribution: Distribution::from_sorted(&sorted, sum),
    })
}
