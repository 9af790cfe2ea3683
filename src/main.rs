// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use chrono::NaiveDate;
use clap::Parser;
use log::*;
use nakaflow::engine::{
    run_networks, AuthorLedgerMatrix, DataAnomaly, NetworkReport, SkippedPeriod,
};
use nakaflow::networks;
use nakaflow::primitives::{filter_stats, DecentralizationStat, Frequency};
use nakaflow::settings::Settings;
use nakaflow::source::{collect_inputs, CachedSource, JsonDirSource};
use nakaflow::store::{DiskStore, MemoryStore};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "nakaflow",
    about = "Decentralization statistics from network subgraph exports",
    version
)]
struct Args {
    /// Configuration file, defaults to the user configuration directory
    #[arg(long, value_name = "PATH", env = "NAKAFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Network to compute, may be repeated. Overrides `engine.networks`
    #[arg(long = "network", short = 'n', value_name = "NAME")]
    networks: Vec<String>,

    /// Reporting period, daily or hourly
    #[arg(long, value_name = "FREQUENCY")]
    frequency: Option<Frequency>,

    /// First period date to report, inclusive
    #[arg(long, value_name = "YYYY-MM-DD")]
    from: Option<NaiveDate>,

    /// Last period date to report, inclusive
    #[arg(long, value_name = "YYYY-MM-DD")]
    to: Option<NaiveDate>,

    /// Directory holding exported subgraph query results
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Include the raw author ledger of every network
    #[arg(long)]
    ledger: bool,
}

#[derive(Serialize)]
struct NetworkOutput {
    network: String,
    stats: Vec<DecentralizationStat>,
    anomalies: Vec<DataAnomaly>,
    skipped: Vec<SkippedPeriod>,

    #[serde(skip_serializing_if = "Option::is_none")]
    ledger: Option<AuthorLedgerMatrix>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl NetworkOutput {
    fn from_report(report: NetworkReport, args: &Args) -> Self {
        Self {
            stats: filter_stats(&report.stats, args.from, args.to),
            network: report.network,
            anomalies: report.anomalies,
            skipped: report.skipped,
            ledger: if args.ledger { Some(report.ledger) } else { None },
            error: None,
        }
    }

    fn failed(network: &str, err: String) -> Self {
        Self {
            network: network.to_owned(),
            stats: Vec::new(),
            anomalies: Vec::new(),
            skipped: Vec::new(),
            ledger: None,
            error: Some(err),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let mut settings = match args.config.as_ref() {
        Some(path) => Settings::from_path(path)?,
        None => Settings::new()?,
    };
    apply_args(&mut settings, &args);
    settings.validate()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(settings.worker_threads())
        .build_global()?;

    let frequency = settings.frequency()?;
    let thresholds = settings.thresholds()?;

    info!(
        "Running Nakaflow v{} on {} networks ({} periods, threshold {} bps, {} overrides)",
        env!("CARGO_PKG_VERSION"),
        settings.engine.networks.len(),
        frequency,
        thresholds.default.bps(),
        thresholds.overrides.len()
    );

    for network in settings.engine.networks.iter() {
        if networks::lookup(network).is_none() {
            warn!("{network} is not a known network subgraph");
        }
    }

    let source = JsonDirSource::new(&settings.data.data_dir);
    let names = &settings.engine.networks;
    let collected = if settings.data.cache_enabled {
        let cache = DiskStore::new(&settings.data.cache_dir);
        collect_inputs(&CachedSource::new(source, cache), names, frequency, args.from, args.to)
    } else {
        let cache = MemoryStore::new(settings.data.memory_cache_entries as usize);
        collect_inputs(&CachedSource::new(source, cache), names, frequency, args.from, args.to)
    };

    // Networks whose data could not be read keep their position in the output
    let mut inputs = Vec::with_capacity(collected.len());
    let mut failed = Vec::new();
    for (i, (network, input)) in collected.into_iter().enumerate() {
        match input {
            Ok(input) => inputs.push(input),
            Err(err) => failed.push((i, NetworkOutput::failed(&network, err.to_string()))),
        }
    }

    let reports = run_networks(&inputs, |network| thresholds.for_network(network));

    let mut output: Vec<NetworkOutput> = inputs
        .iter()
        .zip(reports)
        .map(|(input, report)| match report {
            Ok(report) => NetworkOutput::from_report(report, &args),
            Err(err) => {
                error!("Failed to compute {}: {err}", input.network);
                NetworkOutput::failed(&input.network, err.to_string())
            }
        })
        .collect();
    for (i, failure) in failed {
        output.insert(i, failure);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &output)?;
    writeln!(out)?;

    Ok(())
}

fn apply_args(settings: &mut Settings, args: &Args) {
    if !args.networks.is_empty() {
        settings.engine.networks = args.networks.clone();
    }

    if let Some(frequency) = args.frequency {
        settings.engine.frequency = frequency.to_string();
    }

    if let Some(data_dir) = args.data_dir.as_ref() {
        settings.data.data_dir = data_dir.to_string_lossy().into_owned();
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info"));

    // Stdout carries the report
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()?;

    Ok(())
}
