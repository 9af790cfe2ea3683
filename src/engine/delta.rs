// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::engine::AuthorLedgerMatrix;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Blocks authored strictly within one period, per author.
///
/// Only authors with a positive count are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDelta {
    pub network: String,
    pub start_height: u64,
    pub end_height: u64,
    pub end_timestamp: i64,
    pub blocks: BTreeMap<String, i64>,
}

impl PeriodDelta {
    pub fn author_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// The cumulative counter went down
    Decrease,

    /// The counter grew by more than a period total can hold
    Overflow,
}

/// A cumulative counter step that could not be counted. The period
/// counts zero blocks for the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAnomaly {
    pub network: String,
    pub start_height: u64,
    pub end_height: u64,
    pub author_id: String,
    pub kind: AnomalyKind,

    /// The delta as computed from the raw counters
    pub delta: i128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaReport {
    /// One entry per consecutive boundary pair, including periods without active authors
    pub deltas: Vec<PeriodDelta>,
    pub anomalies: Vec<DataAnomaly>,
}

/// Diffs consecutive ledger rows.
///
/// An author missing at a boundary carries its last known counter forward,
/// an author never seen before starts from zero. The first row is only a
/// baseline. Counters that decrease are clamped to a zero delta, reported
/// as anomalies, and do not lower the carried value, so a counter that
/// recovers is not counted twice. A jump larger than `i64::MAX` is also
/// reported and counted as zero, but the carried value moves up to it.
pub fn extract_deltas(matrix: &AuthorLedgerMatrix) -> DeltaReport {
    let mut report = DeltaReport::default();
    let rows = matrix.rows();

    let first = match rows.first() {
        Some(first) => first,
        None => return report,
    };

    let mut last_known: BTreeMap<&str, u64> = first
        .cumulative
        .iter()
        .map(|(author, v)| (author.as_str(), *v))
        .collect();

    for (previous, current) in rows.iter().zip(rows.iter().skip(1)) {
        let mut blocks = BTreeMap::new();

        for (author, value) in current.cumulative.iter() {
            let carried = last_known.get(author.as_str()).copied().unwrap_or(0);
            let delta = *value as i128 - carried as i128;

            if delta < 0 {
                warn!(
                    "Cumulative blocks of {} on {} went down by {} between heights {} and {}, counting 0",
                    author,
                    matrix.network,
                    -delta,
                    previous.height,
                    current.height
                );
                report.anomalies.push(DataAnomaly {
                    network: matrix.network.clone(),
                    start_height: previous.height,
                    end_height: current.height,
                    author_id: author.clone(),
                    kind: AnomalyKind::Decrease,
                    delta,
                });
                continue;
            }

            match i64::try_from(delta) {
                Ok(0) => {}
                Ok(blocks_in_period) => {
                    blocks.insert(author.clone(), blocks_in_period);
                }
                Err(_) => {
                    warn!(
                        "Cumulative blocks of {} on {} jumped by {} between heights {} and {}, counting 0",
                        author, matrix.network, delta, previous.height, current.height
                    );
                    report.anomalies.push(DataAnomaly {
                        network: matrix.network.clone(),
                        start_height: previous.height,
                        end_height: current.height,
                        author_id: author.clone(),
                        kind: AnomalyKind::Overflow,
                        delta,
                    });
                }
            }

            last_known.insert(author.as_str(), *value);
        }

        report.deltas.push(PeriodDelta {
            network: matrix.network.clone(),
            start_height: previous.height,
            end_height: current.height,
            end_timestamp: current.timestamp,
            blocks,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reshape;
    use crate::primitives::{AuthorObservation, PeriodBoundary};
    use quickcheck::*;

    fn matrix(rows: &[&[(&str, u64)]]) -> AuthorLedgerMatrix {
        let boundaries: Vec<_> = (0..rows.len())
            .map(|i| PeriodBoundary::new(100 * (i as u64 + 1), 86_400 * i as i64))
            .collect();
        let observations: Vec<_> = rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter().map(move |(author, blocks)| {
                    AuthorObservation::new("bsc", 100 * (i as u64 + 1), author, *blocks)
                })
            })
            .collect();
        reshape("bsc", &boundaries, &observations).unwrap()
    }

    #[test]
    fn it_diffs_consecutive_boundaries() {
        let report = extract_deltas(&matrix(&[
            &[("a", 10), ("b", 5)],
            &[("a", 15), ("b", 9)],
            &[("a", 15), ("b", 20)],
        ]));

        assert!(report.anomalies.is_empty());
        assert_eq!(report.deltas.len(), 2);
        assert_eq!(report.deltas[0].start_height, 100);
        assert_eq!(report.deltas[0].end_height, 200);
        assert_eq!(report.deltas[0].blocks["a"], 5);
        assert_eq!(report.deltas[0].blocks["b"], 4);

        // a authored nothing in the second period and is dropped
        assert_eq!(report.deltas[1].author_count(), 1);
        assert_eq!(report.deltas[1].blocks["b"], 11);
    }

    #[test]
    fn it_carries_missing_authors_forward() {
        let report = extract_deltas(&matrix(&[
            &[("a", 10), ("b", 5)],
            &[("b", 6)],
            &[("a", 12), ("b", 6)],
        ]));

        assert!(report.anomalies.is_empty());
        assert_eq!(report.deltas[0].blocks.get("a"), None);
        assert_eq!(report.deltas[0].blocks["b"], 1);
        // a is diffed against its value two boundaries back
        assert_eq!(report.deltas[1].blocks["a"], 2);
        assert_eq!(report.deltas[1].blocks.get("b"), None);
    }

    #[test]
    fn it_counts_new_authors_from_zero() {
        let report = extract_deltas(&matrix(&[&[("a", 10)], &[("a", 11), ("c", 3)]]));
        assert_eq!(report.deltas[0].blocks["c"], 3);
    }

    #[test]
    fn it_clamps_decreasing_counters_and_reports_them() {
        let report = extract_deltas(&matrix(&[
            &[("a", 10), ("b", 5)],
            &[("a", 8), ("b", 6)],
            &[("a", 13), ("b", 6)],
        ]));

        assert_eq!(
            report.anomalies,
            vec![DataAnomaly {
                network: "bsc".to_owned(),
                start_height: 100,
                end_height: 200,
                author_id: "a".to_owned(),
                kind: AnomalyKind::Decrease,
                delta: -2,
            }]
        );
        assert_eq!(report.deltas[0].blocks.get("a"), None);
        assert_eq!(report.deltas[0].blocks["b"], 1);
        // Recovery is measured from the high-water mark
        assert_eq!(report.deltas[1].blocks["a"], 3);
    }

    #[test]
    fn it_reports_jumps_too_large_for_a_period() {
        let report = extract_deltas(&matrix(&[
            &[("a", 1), ("b", 1)],
            &[("a", u64::MAX), ("b", 2)],
            &[("a", u64::MAX), ("b", 3)],
        ]));

        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::Overflow);
        assert_eq!(report.anomalies[0].end_height, 200);
        assert_eq!(report.anomalies[0].delta, u64::MAX as i128 - 1);
        assert_eq!(report.deltas[0].blocks.get("a"), None);
        assert_eq!(report.deltas[0].blocks["b"], 1);

        // The counter moved on, so the next period starts from it
        assert_eq!(report.deltas[1].blocks.get("a"), None);
        assert_eq!(report.deltas[1].blocks["b"], 1);
    }

    #[test]
    fn it_never_emits_the_baseline() {
        assert!(extract_deltas(&matrix(&[&[("a", 10)]])).deltas.is_empty());
        assert_eq!(extract_deltas(&AuthorLedgerMatrix::empty("bsc")), DeltaReport::default());
    }

    #[test]
    fn it_emits_empty_periods() {
        let report = extract_deltas(&matrix(&[&[("a", 10)], &[("a", 10)]]));
        assert_eq!(report.deltas.len(), 1);
        assert!(report.deltas[0].is_empty());
    }

    quickcheck! {
        fn deltas_are_positive_prop(rows: Vec<Vec<(u8, u16)>>) -> bool {
            let rows: Vec<Vec<(String, u64)>> = rows
                .into_iter()
                .map(|row| row.into_iter().map(|(a, v)| (format!("author{}", a % 8), v as u64)).collect())
                .collect();
            let borrowed: Vec<Vec<(&str, u64)>> = rows
                .iter()
                .map(|row| row.iter().map(|(a, v)| (a.as_str(), *v)).collect())
                .collect();
            let slices: Vec<&[(&str, u64)]> = borrowed.iter().map(|r| r.as_slice()).collect();
            let report = extract_deltas(&matrix(&slices));

            report.deltas.len() == slices.len().saturating_sub(1)
                && report.deltas.iter().all(|d| d.blocks.values().all(|v| *v > 0))
                && report.anomalies.iter().all(|a| a.kind == AnomalyKind::Decrease && a.delta < 0)
        }
    }
}
