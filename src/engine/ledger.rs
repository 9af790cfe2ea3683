// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::engine::EngineErr;
use crate::primitives::{AuthorObservation, PeriodBoundary};
use itertools::Itertools;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Cumulative blocks created per author as of one period boundary.
///
/// Authors without an observation at this boundary are absent, not zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub height: u64,
    pub timestamp: i64,
    pub cumulative: BTreeMap<String, u64>,
}

impl LedgerRow {
    pub fn boundary(&self) -> PeriodBoundary {
        PeriodBoundary::new(self.height, self.timestamp)
    }
}

/// Wide author ledger of one network, rows ordered by ascending height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorLedgerMatrix {
    pub network: String,
    rows: Vec<LedgerRow>,
}

impl AuthorLedgerMatrix {
    pub fn empty(network: &str) -> Self {
        Self {
            network: network.to_owned(),
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cumulative blocks of `author_id` at `height`, if observed there
    pub fn get(&self, height: u64, author_id: &str) -> Option<u64> {
        let idx = self.rows.binary_search_by_key(&height, |r| r.height).ok()?;
        self.rows[idx].cumulative.get(author_id).copied()
    }

    /// Every author observed at any boundary
    pub fn authors(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|r| r.cumulative.keys().map(String::as_str))
            .collect()
    }
}

/// Reshapes the observations of `network` into a ledger matrix with one row
/// per boundary.
///
/// A network without observations yields an empty matrix. Observations of
/// other networks or at heights that are not boundaries are ignored. When the
/// same author is observed twice at a height, the larger counter is kept.
pub fn reshape<'a, I>(
    network: &str,
    boundaries: &[PeriodBoundary],
    observations: I,
) -> Result<AuthorLedgerMatrix, EngineErr>
where
    I: IntoIterator<Item = &'a AuthorObservation>,
{
    for (previous, next) in boundaries.iter().tuple_windows() {
        if next.height <= previous.height {
            return Err(EngineErr::UnorderedBoundaries {
                previous: previous.height,
                next: next.height,
            });
        }
    }

    let mut rows: Vec<LedgerRow> = boundaries
        .iter()
        .map(|b| LedgerRow {
            height: b.height,
            timestamp: b.timestamp,
            cumulative: BTreeMap::new(),
        })
        .collect();
    let index: HashMap<u64, usize> = boundaries
        .iter()
        .enumerate()
        .map(|(i, b)| (b.height, i))
        .collect();

    let mut observed = 0;
    let mut ignored = 0;

    for obs in observations {
        if obs.network != network {
            continue;
        }

        observed += 1;
        let row = match index.get(&obs.height) {
            Some(i) => &mut rows[*i],
            None => {
                ignored += 1;
                continue;
            }
        };

        let cell = row
            .cumulative
            .entry(obs.author_id.clone())
            .or_insert(obs.cumulative_blocks_created);
        if obs.cumulative_blocks_created > *cell {
            *cell = obs.cumulative_blocks_created;
        }
    }

    if observed == 0 {
        debug!("No author observations for {network}, ledger is empty");
        return Ok(AuthorLedgerMatrix::empty(network));
    }

    if ignored > 0 {
        debug!("Ignored {ignored} {network} observations outside of the period boundaries");
    }

    Ok(AuthorLedgerMatrix {
        network: network.to_owned(),
        rows,
    })
}

/// Reshapes observations of several networks at once.
pub fn reshape_all(
    boundaries: &BTreeMap<String, Vec<PeriodBoundary>>,
    observations: &[AuthorObservation],
) -> Result<BTreeMap<String, AuthorLedgerMatrix>, EngineErr> {
    let mut by_network = observations
        .iter()
        .into_group_map_by(|obs| obs.network.as_str());

    boundaries
        .iter()
        .map(|(network, boundaries)| {
            let observations = by_network.remove(network.as_str()).unwrap_or_default();
            reshape(network, boundaries, observations).map(|m| (network.clone(), m))
        })
        .collect()
}
