// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

mod json_dir;

pub use json_dir::*;

use crate::engine::NetworkInput;
use crate::networks;
use crate::primitives::{
    derive_boundaries, filter_boundaries, AuthorObservation, Frequency, SnapshotRow,
};
use crate::store::{CacheKey, Store, StoreErr};
use chrono::NaiveDate;
use log::*;
use std::fmt;
use std::io;

pub const AUTHORS_NAMESPACE: &str = "authors";

/// Provides subgraph data for the engine. Implementations perform I/O, the
/// engine never does.
pub trait ObservationSource {
    /// Daily or hourly snapshot records of `network`, in any order
    fn snapshots(&self, network: &str, frequency: Frequency) -> Result<Vec<SnapshotRow>, SourceErr>;

    /// Author counters of `network` as of block `height`. An unknown height
    /// yields an empty set.
    fn authors_at(&self, network: &str, height: u64) -> Result<Vec<AuthorObservation>, SourceErr>;

    /// Identifies the current contents of the snapshot list, which grows as
    /// new periods are exported. `None` means the list cannot be versioned
    /// and must not be cached.
    fn snapshot_revision(&self, _network: &str, _frequency: Frequency) -> Result<Option<String>, SourceErr> {
        Ok(None)
    }
}

#[derive(Debug)]
pub enum SourceErr {
    /// Filesystem error
    Io(io::Error),

    /// Malformed subgraph document
    Json(serde_json::Error),

    /// Cache error
    Store(StoreErr),

    /// Generic error
    Error(&'static str),
}

impl From<io::Error> for SourceErr {
    fn from(other: io::Error) -> Self {
        Self::Io(other)
    }
}

impl From<serde_json::Error> for SourceErr {
    fn from(other: serde_json::Error) -> Self {
        Self::Json(other)
    }
}

impl From<StoreErr> for SourceErr {
    fn from(other: StoreErr) -> Self {
        Self::Store(other)
    }
}

impl fmt::Display for SourceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "source io error: {err}"),
            Self::Json(err) => write!(f, "malformed subgraph document: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Error(err) => write!(f, "source error: {err}"),
        }
    }
}

impl std::error::Error for SourceErr {}

/// Wraps a source with a cache. Results are keyed by network, subgraph
/// deployment and queried heights. Snapshot lists are also keyed by their
/// revision, so a new export is picked up. Empty author sets are not cached
/// because the export for that height may still be missing.
#[derive(Debug, Clone)]
pub struct CachedSource<S, C> {
    inner: S,
    cache: C,
}

impl<S: ObservationSource, C: Store> CachedSource<S, C> {
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<S: ObservationSource, C: Store> ObservationSource for CachedSource<S, C> {
    fn snapshots(&self, network: &str, frequency: Frequency) -> Result<Vec<SnapshotRow>, SourceErr> {
        let revision = match self.inner.snapshot_revision(network, frequency)? {
            Some(revision) => revision,
            None => return self.inner.snapshots(network, frequency),
        };

        let namespace = format!("snapshots/{frequency}");
        let key = CacheKey::new(&namespace, network, &networks::deployment_url(network), vec![])
            .with_revision(&revision);

        if let Some(rows) = self.cache.get(&key)? {
            return Ok(rows);
        }

        let rows = self.inner.snapshots(network, frequency)?;
        self.cache.put(&key, &rows)?;
        Ok(rows)
    }

    fn authors_at(&self, network: &str, height: u64) -> Result<Vec<AuthorObservation>, SourceErr> {
        let key = CacheKey::new(
            AUTHORS_NAMESPACE,
            network,
            &networks::deployment_url(network),
            vec![height],
        );

        if let Some(observations) = self.cache.get(&key)? {
            return Ok(observations);
        }

        let observations = self.inner.authors_at(network, height)?;
        if !observations.is_empty() {
            self.cache.put(&key, &observations)?;
        }
        Ok(observations)
    }

    fn snapshot_revision(&self, network: &str, frequency: Frequency) -> Result<Option<String>, SourceErr> {
        self.inner.snapshot_revision(network, frequency)
    }
}

/// Fetches everything the engine needs for one network: the period
/// boundaries within `[from, to]` and the author observations at each of them.
pub fn collect_network_input<S: ObservationSource>(
    source: &S,
    network: &str,
    frequency: Frequency,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<NetworkInput, SourceErr> {
    let snapshots = source.snapshots(network, frequency)?;
    let boundaries = filter_boundaries(&derive_boundaries(&snapshots, frequency), from, to);

    let mut observations = Vec::new();
    for boundary in boundaries.iter() {
        observations.extend(source.authors_at(network, boundary.height)?);
    }

    debug!(
        "Collected {} observations at {} {} boundaries of {}",
        observations.len(),
        boundaries.len(),
        frequency,
        network
    );

    Ok(NetworkInput {
        network: network.to_owned(),
        boundaries,
        observations,
    })
}

/// Collects the input of every network in `networks`, in order. A network
/// whose data cannot be read gets its error and does not stop the others.
/// Names are trimmed and lowercased.
pub fn collect_inputs<S: ObservationSource>(
    source: &S,
    networks: &[String],
    frequency: Frequency,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<(String, Result<NetworkInput, SourceErr>)> {
    networks
        .iter()
        .map(|network| {
            let network = network.trim().to_lowercase();
            let input = collect_network_input(source, &network, frequency, from, to);
            if let Err(err) = input.as_ref() {
                error!("Failed to collect {network}: {err}");
            }
            (network, input)
        })
        .collect()
}
