// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

mod disk;
mod memory;

pub use disk::*;
pub use memory::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io;

/// Interface to the cache used by the fetch layer. Values are opaque to the
/// engine and are stored as JSON documents.
pub trait Store {
    /// Returns `Ok(None)` on a cache miss
    fn get<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<V>, StoreErr>;

    fn put<V: Serialize>(&self, key: &CacheKey, value: &V) -> Result<(), StoreErr>;
}

/// Identifies a cached query result.
///
/// A result depends on the network, the subgraph deployment it was fetched
/// from and the block heights it was fetched at. Results that change over
/// time, such as the snapshot list, also carry the revision of the data
/// they were read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub network: String,
    pub deployment: String,
    pub boundaries: Vec<u64>,
    pub revision: Option<String>,
}

impl CacheKey {
    pub fn new(namespace: &str, network: &str, deployment: &str, boundaries: Vec<u64>) -> Self {
        Self {
            namespace: namespace.to_owned(),
            network: network.to_owned(),
            deployment: deployment.to_owned(),
            boundaries,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: &str) -> Self {
        self.revision = Some(revision.to_owned());
        self
    }

    pub fn canonical(&self) -> String {
        let heights: Vec<String> = self.boundaries.iter().map(u64::to_string).collect();
        let mut canonical = format!(
            "{}|{}|{}|{}",
            self.namespace,
            self.network,
            self.deployment,
            heights.join(",")
        );

        if let Some(revision) = self.revision.as_ref() {
            canonical.push('|');
            canonical.push_str(revision);
        }

        canonical
    }

    /// Hex encoded blake3 hash of the canonical key
    pub fn digest(&self) -> String {
        hex::encode(blake3::hash(self.canonical().as_bytes()).as_bytes())
    }
}

#[derive(Debug)]
pub enum StoreErr {
    /// Filesystem error
    Io(io::Error),

    /// Value could not be encoded or decoded
    Json(serde_json::Error),

    /// Generic error
    Error(&'static str),
}

impl From<io::Error> for StoreErr {
    fn from(other: io::Error) -> Self {
        Self::Io(other)
    }
}

impl From<serde_json::Error> for StoreErr {
    fn from(other: serde_json::Error) -> Self {
        Self::Json(other)
    }
}

impl fmt::Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cache io error: {err}"),
            Self::Json(err) => write!(f, "cache codec error: {err}"),
            Self::Error(err) => write!(f, "cache error: {err}"),
        }
    }
}

impl std::error::Error for StoreErr {}
