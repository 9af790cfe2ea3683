// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::codec::{de_f64_lenient, de_u64_lenient};
use serde::{Deserialize, Serialize};

/// Cumulative authorship counters of a single author as of a sampled block height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorObservation {
    /// Network name as listed in the registry
    pub network: String,

    /// Block height the author state was sampled at
    pub height: u64,

    /// Author id, usually an address
    pub author_id: String,

    /// Blocks created by the author up to and including `height`
    pub cumulative_blocks_created: u64,

    /// Only kept for drill-down display
    #[serde(default)]
    pub cumulative_difficulty: f64,
}

impl AuthorObservation {
    pub fn new(network: &str, height: u64, author_id: &str, cumulative_blocks_created: u64) -> Self {
        Self {
            network: network.to_owned(),
            height,
            author_id: author_id.to_owned(),
            cumulative_blocks_created,
            cumulative_difficulty: 0.0,
        }
    }
}

/// `Author` entity as returned by the network subgraph when queried at a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: String,

    #[serde(
        rename = "cumulativeBlocksCreated",
        alias = "cumulative_blocks_created",
        deserialize_with = "de_u64_lenient"
    )]
    pub cumulative_blocks_created: u64,

    #[serde(
        rename = "cumulativeDifficulty",
        alias = "cumulative_difficulty",
        default,
        deserialize_with = "de_f64_lenient"
    )]
    pub cumulative_difficulty: f64,
}

impl AuthorRecord {
    pub fn into_observation(self, network: &str, height: u64) -> AuthorObservation {
        AuthorObservation {
            network: network.to_owned(),
            height,
            author_id: self.id,
            cumulative_blocks_created: self.cumulative_blocks_created,
            cumulative_difficulty: self.cumulative_difficulty,
        }
    }
}
