// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

pub mod concentration;
pub mod delta;
pub mod ledger;
pub mod pipeline;
pub mod rules;

pub use concentration::*;
pub use delta::*;
pub use ledger::*;
pub use pipeline::*;
pub use rules::*;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErr {
    /// Boundary heights must be strictly increasing
    UnorderedBoundaries { previous: u64, next: u64 },

    /// An author was passed to the concentration calculator with zero or negative blocks
    NonPositiveBlocks { author_id: String, blocks: i64 },

    /// The period has no active authors
    NoActiveAuthors,

    /// Blocks authored in the period do not fit in a 64 bit total
    BlocksOverflow(u128),

    /// Timestamp cannot be mapped to a calendar date
    InvalidTimestamp(i64),
}

impl fmt::Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnorderedBoundaries { previous, next } => write!(
                f,
                "period boundaries are not strictly increasing: {next} follows {previous}"
            ),
            Self::NonPositiveBlocks { author_id, blocks } => write!(
                f,
                "author {author_id} has {blocks} blocks authored, expected a positive count"
            ),
            Self::NoActiveAuthors => write!(f, "period has no active authors"),
            Self::BlocksOverflow(total) => {
                write!(f, "{total} blocks authored in one period overflow the period total")
            }
            Self::InvalidTimestamp(ts) => write!(f, "timestamp {ts} is out of range"),
        }
    }
}

impl std::error::Error for EngineErr {}
