// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::engine::{
    concentration, extract_deltas, reshape, AuthorLedgerMatrix, DataAnomaly, EngineErr,
    NakamotoThreshold, PeriodDelta,
};
use crate::primitives::{AuthorObservation, DecentralizationStat, PeriodBoundary};
use log::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInput {
    pub network: String,
    pub boundaries: Vec<PeriodBoundary>,
    pub observations: Vec<AuthorObservation>,
}

/// A period the concentration calculator refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPeriod {
    pub network: String,
    pub start_height: u64,
    pub end_height: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub network: String,

    /// One row per period with at least one active author, ascending by height
    pub stats: Vec<DecentralizationStat>,

    pub anomalies: Vec<DataAnomaly>,
    pub skipped: Vec<SkippedPeriod>,

    /// Raw author ledger, for drill-down display
    pub ledger: AuthorLedgerMatrix,
}

/// Turns one period's delta into a statistics row
pub fn stat_for_period(
    delta: &PeriodDelta,
    threshold: NakamotoThreshold,
) -> Result<DecentralizationStat, EngineErr> {
    let date = PeriodBoundary::new(delta.end_height, delta.end_timestamp)
        .date()
        .ok_or(EngineErr::InvalidTimestamp(delta.end_timestamp))?;
    let c = concentration(
        delta.blocks.iter().map(|(author, blocks)| (author.as_str(), *blocks)),
        threshold,
    )?;

    Ok(DecentralizationStat {
        network: delta.network.clone(),
        date,
        height: delta.end_height,
        author_count: c.author_count,
        nakamoto_realized: c.nakamoto_realized,
        sum: c.distribution.sum,
        mean: c.distribution.mean,
        median: c.distribution.median,
        max: c.distribution.max,
        min: c.distribution.min,
        std: c.distribution.std,
        lower_quartile: c.distribution.lower_quartile,
        upper_quartile: c.distribution.upper_quartile,
    })
}

/// Runs reshaping, delta extraction and concentration for one network.
///
/// Periods without active authors are left out. A period the calculator
/// rejects is recorded in `skipped` and does not affect the others. Only
/// malformed boundaries fail the whole network.
#[tracing::instrument(skip(input), fields(network = %input.network))]
pub fn run_network(
    input: &NetworkInput,
    threshold: NakamotoThreshold,
) -> Result<NetworkReport, EngineErr> {
    let ledger = reshape(&input.network, &input.boundaries, &input.observations)?;
    let report = extract_deltas(&ledger);

    let mut stats = Vec::with_capacity(report.deltas.len());
    let mut skipped = Vec::new();

    for delta in report.deltas.iter() {
        if delta.is_empty() {
            debug!(
                "No blocks authored on {} between heights {} and {}",
                delta.network, delta.start_height, delta.end_height
            );
            continue;
        }

        match stat_for_period(delta, threshold) {
            Ok(stat) => stats.push(stat),
            Err(err) => {
                warn!(
                    "Skipping {} period {}..{}: {}",
                    delta.network, delta.start_height, delta.end_height, err
                );
                skipped.push(SkippedPeriod {
                    network: delta.network.clone(),
                    start_height: delta.start_height,
                    end_height: delta.end_height,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        "Computed {} {} periods ({} anomalies, {} skipped)",
        stats.len(),
        input.network,
        report.anomalies.len(),
        skipped.len()
    );

    Ok(NetworkReport {
        network: input.network.clone(),
        stats,
        anomalies: report.anomalies,
        skipped,
        ledger,
    })
}

/// Runs independent networks in parallel on the rayon pool. Results are in
/// input order.
pub fn run_networks<F>(
    inputs: &[NetworkInput],
    threshold_for: F,
) -> Vec<Result<NetworkReport, EngineErr>>
where
    F: Fn(&str) -> NakamotoThreshold + Sync,
{
    inputs
        .par_iter()
        .map(|input| run_network(input, threshold_for(&input.network)))
        .collect()
}
