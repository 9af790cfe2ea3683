// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! # Nakaflow
//! Decentralization statistics for blockchain networks indexed by the Messari network subgraphs.
//!
//! The crate turns per-author `cumulativeBlocksCreated` counters, sampled at the first block of every
//! calendar day or hour, into a per-period distribution of blocks authored and derives the
//! **realized Nakamoto coefficient** from it.
//!
//! ## Pipeline
//! 1. [`engine::ledger`] reshapes raw author observations into a ledger matrix, one row per period boundary.
//! 2. [`engine::delta`] diffs consecutive boundaries with carry-forward semantics, clamping negative counter
//!    movements to zero and reporting them as [`engine::DataAnomaly`] records.
//! 3. [`engine::concentration`] computes the blocks-authored distribution and the realized Nakamoto
//!    coefficient for every period that had at least one active author.
//!
//! ## Realized Nakamoto coefficient
//! Authors are ranked by blocks authored in the period (descending, ties broken by ascending author id).
//! The coefficient is the number of top authors needed for their combined share to first reach the
//! threshold, 33% by default. Shares are compared with integer arithmetic, so a share of exactly 33%
//! already reaches the threshold.
//!
//! Fetching ([`source`]) and caching ([`store`]) are collaborators of the engine, the engine itself never
//! performs I/O.

pub mod codec;
pub mod engine;
pub mod networks;
pub mod primitives;
pub mod settings;
pub mod source;
pub mod store;
