// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use lazy_static::*;
use serde::Serialize;

pub const SUBGRAPH_BASE_URL: &str = "https://api.thegraph.com/subgraphs/name/messari/network-";

/// A network indexed by a Messari network subgraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    /// Subgraph name suffix, also used as the network id everywhere else
    pub name: &'static str,

    /// Messari asset slug
    pub slug: &'static str,
}

impl NetworkInfo {
    const fn new(name: &'static str, slug: &'static str) -> Self {
        Self { name, slug }
    }

    pub fn deployment(&self) -> String {
        deployment_url(self.name)
    }
}

lazy_static! {
    static ref NETWORKS: Vec<NetworkInfo> = vec![
        NetworkInfo::new("arweave-mainnet", "arweave"),
        NetworkInfo::new("arbitrum", "arbitrum"),
        NetworkInfo::new("aurora", "aurora-near"),
        NetworkInfo::new("avalanche", "avalanche"),
        NetworkInfo::new("boba", "boba-network"),
        NetworkInfo::new("bsc", "binance-coin"),
        NetworkInfo::new("celo", "celo"),
        NetworkInfo::new("clover", "clover-finance"),
        NetworkInfo::new("cronos", "cronos"),
        NetworkInfo::new("fantom", "fantom"),
        NetworkInfo::new("fuse", "fuse"),
        NetworkInfo::new("harmony", "harmony"),
        NetworkInfo::new("ethereum", "ethereum"),
        NetworkInfo::new("polygon", "polygon"),
        NetworkInfo::new("moonbeam", "moonbeam"),
        NetworkInfo::new("moonriver", "moonriver"),
        NetworkInfo::new("optimism", "optimism"),
        NetworkInfo::new("gnosis", "xdai"),
        NetworkInfo::new("cosmos", "cosmos"),
        NetworkInfo::new("osmosis", "osmosis"),
        NetworkInfo::new("near", "near-protocol"),
    ];
}

/// Subgraph deployment of `network`. Unknown networks follow the same naming scheme.
pub fn deployment_url(network: &str) -> String {
    format!("{SUBGRAPH_BASE_URL}{network}")
}

pub fn lookup(name: &str) -> Option<&'static NetworkInfo> {
    let name = name.trim();
    NETWORKS.iter().find(|n| n.name.eq_ignore_ascii_case(name))
}

pub fn all() -> &'static [NetworkInfo] {
    &NETWORKS
}
