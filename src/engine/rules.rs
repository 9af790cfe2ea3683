// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use serde::{Deserialize, Serialize};
use static_assertions::*;

/// Thresholds are expressed in basis points of the period's blocks
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Share of blocks a colluding group of authors must reach, 33%
pub const DEFAULT_NAKAMOTO_THRESHOLD_BPS: u16 = 3_300;

/// Quantile positions used for the blocks-authored distribution
pub const LOWER_QUARTILE: f64 = 0.25;
pub const MEDIAN: f64 = 0.5;
pub const UPPER_QUARTILE: f64 = 0.75;

/// Cumulative share threshold of the realized Nakamoto coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NakamotoThreshold(u16);

impl NakamotoThreshold {
    /// Returns `None` unless `0 < bps <= 10000`
    pub fn new(bps: u16) -> Option<Self> {
        if bps == 0 || bps as u64 > BPS_DENOMINATOR {
            return None;
        }

        Some(Self(bps))
    }

    pub fn bps(&self) -> u16 {
        self.0
    }

    /// `cumulative / total < threshold`, evaluated without floating point.
    /// A share exactly at the threshold is not below it.
    pub fn is_below(&self, cumulative: u128, total: u128) -> bool {
        let denominator = BPS_DENOMINATOR as u128;
        cumulative * denominator < (self.0 as u128) * total
    }
}

impl Default for NakamotoThreshold {
    fn default() -> Self {
        Self(DEFAULT_NAKAMOTO_THRESHOLD_BPS)
    }
}

const_assert!(DEFAULT_NAKAMOTO_THRESHOLD_BPS > 0);
const_assert!(DEFAULT_NAKAMOTO_THRESHOLD_BPS as u64 <= BPS_DENOMINATOR);
const_assert!(LOWER_QUARTILE < MEDIAN);
const_assert!(MEDIAN < UPPER_QUARTILE);
const_assert!(UPPER_QUARTILE <= 1.0);
