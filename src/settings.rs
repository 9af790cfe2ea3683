// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::engine::{NakamotoThreshold, BPS_DENOMINATOR};
use crate::primitives::Frequency;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File};
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, metadata};
use std::path::{Path, PathBuf};
use struct_field_names_as_array::FieldNamesAsArray;

const ENV_PREFIX: &str = "nakaflow";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, FieldNamesAsArray)]
pub struct Settings {
    /// Engine settings.
    pub engine: Engine,

    /// Input data and cache settings.
    pub data: Data,
}

impl Settings {
    /// Loads `<config_dir>/Nakaflow/config.toml`, creating it with the
    /// defaults when missing, then applies environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = default_config_dir().join("config.toml");

        if metadata(&config_path).is_err() {
            // Create default configuration
            if let Err(err) = write_default_config(&config_path) {
                // Fall back to defaults and environment variables
                error!("Failed to create configuration! Reason: {err}");
            }
        }

        Self::build(File::from(config_path).required(false))
    }

    /// Loads an explicit configuration file, then applies environment overrides.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let mut s = Config::builder().add_source(file);
        let mut sequences = Vec::new();

        // Set defaults
        let defaults: HashMap<String, HashMap<String, DynamicConfVal>> =
            serde_yaml::from_value(
                serde_yaml::to_value(Settings::default())
                    .map_err(|err| ConfigError::Message(err.to_string()))?,
            )
            .map_err(|err| ConfigError::Message(err.to_string()))?;
        for (k1, inner) in &defaults {
            for (k2, v) in inner {
                let key = format!("{k1}.{k2}");
                match v {
                    DynamicConfVal::String(v) => {
                        s = s.set_default(key, v.as_str())?;
                    }

                    DynamicConfVal::Bool(v) => {
                        s = s.set_default(key, v.to_string())?;
                    }

                    DynamicConfVal::U16(v) => {
                        s = s.set_default(key, v.to_string())?;
                    }

                    DynamicConfVal::Sequence(v) => {
                        sequences.push(key.clone());
                        s = s.set_default(key, v.clone())?;
                    }
                }
            }
        }

        s = apply_env_overrides(s, std::env::vars(), &sequences)?;
        s.build()?.try_deserialize()
    }

    /// Rejects values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds()?;
        self.frequency()?;

        if self.engine.networks.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Message(
                "engine.networks contains an empty network name".to_owned(),
            ));
        }

        Ok(())
    }

    pub fn threshold(&self) -> Result<NakamotoThreshold, ConfigError> {
        NakamotoThreshold::new(self.engine.nakamoto_threshold_bps).ok_or_else(|| {
            ConfigError::Message(format!(
                "engine.nakamoto_threshold_bps must be within 1..={BPS_DENOMINATOR}, got {}",
                self.engine.nakamoto_threshold_bps
            ))
        })
    }

    /// The configured threshold together with the per network overrides
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        let mut overrides = HashMap::new();

        for entry in self.engine.threshold_overrides.iter() {
            let (network, bps) = entry.split_once('=').ok_or_else(|| {
                ConfigError::Message(format!(
                    "engine.threshold_overrides entry {entry:?} is not of the form network=bps"
                ))
            })?;
            let network = network.trim().to_lowercase();
            if network.is_empty() {
                return Err(ConfigError::Message(format!(
                    "engine.threshold_overrides entry {entry:?} has no network"
                )));
            }

            let threshold = bps
                .trim()
                .parse()
                .ok()
                .and_then(NakamotoThreshold::new)
                .ok_or_else(|| {
                    ConfigError::Message(format!(
                        "engine.threshold_overrides threshold for {network} must be within 1..={BPS_DENOMINATOR}, got {:?}",
                        bps.trim()
                    ))
                })?;
            overrides.insert(network, threshold);
        }

        Ok(Thresholds {
            default: self.threshold()?,
            overrides,
        })
    }

    pub fn frequency(&self) -> Result<Frequency, ConfigError> {
        self.engine
            .frequency
            .parse()
            .map_err(|err| ConfigError::Message(format!("engine.frequency: {err}")))
    }

    /// Number of worker threads, 0 meaning one per core
    pub fn worker_threads(&self) -> usize {
        match self.engine.worker_threads {
            0 => num_cpus::get(),
            n => n as usize,
        }
    }
}

/// Nakamoto thresholds to run each network with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    pub default: NakamotoThreshold,

    /// Keyed by lowercase network name
    pub overrides: HashMap<String, NakamotoThreshold>,
}

impl Thresholds {
    pub fn for_network(&self, network: &str) -> NakamotoThreshold {
        self.overrides
            .get(&network.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default)
    }
}

/// Overrides settings from `NAKAFLOW_<SECTION>_<FIELD>` variables. Field names
/// are written without underscores, e.g. `NAKAFLOW_ENGINE_WORKERTHREADS`.
fn apply_env_overrides<I>(
    mut s: ConfigBuilder<DefaultState>,
    vars: I,
    sequences: &[String],
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    // Make sure to list these in order
    let settings_modules: Vec<&[&str]> = vec![
        &Engine::FIELD_NAMES_AS_ARRAY[..],
        &Data::FIELD_NAMES_AS_ARRAY[..],
    ];

    // Gather all possible settings keys
    let possible_keys: HashMap<String, String> = Settings::FIELD_NAMES_AS_ARRAY
        .iter()
        .enumerate()
        .flat_map(|(i, field)| {
            settings_modules[i].iter().map(move |nested| {
                (
                    format!("{}_{}_{}", ENV_PREFIX, field, nested.replace('_', "")),
                    format!("{field}.{nested}"),
                )
            })
        })
        .collect();

    for (k, v) in vars {
        let key = match possible_keys.get(&k.to_lowercase()) {
            Some(key) => key,
            None => continue,
        };

        // Filter empty values
        if v.is_empty() {
            continue;
        }

        debug!("Overriding {key} from environment");
        if sequences.contains(key) {
            let list: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|x| !x.is_empty())
                .map(str::to_owned)
                .collect();
            s = s.set_override(key.as_str(), list)?;
        } else {
            s = s.set_override(key.as_str(), v)?;
        }
    }

    Ok(s)
}

fn write_default_config(path: &Path) -> Result<(), String> {
    let settings_str =
        toml::ser::to_string_pretty(&Settings::default()).map_err(|err| err.to_string())?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|err| err.to_string())?;
    }
    fs::write(path, settings_str).map_err(|err| err.to_string())
}

fn default_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
    path.push("Nakaflow");
    path
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Engine {
    /// Share of a period's blocks, in basis points, a group of authors must
    /// reach to count as a critical majority.
    ///
    /// Default is 3300 (33%)
    #[serde(alias = "nakamotothresholdbps")]
    pub nakamoto_threshold_bps: u16,

    /// Per network thresholds as `network=bps` entries, e.g. `near=5100`.
    /// Networks not listed use `nakamoto_threshold_bps`.
    #[serde(alias = "thresholdoverrides")]
    pub threshold_overrides: Vec<String>,

    /// Reporting period. Either `daily` or `hourly`
    pub frequency: String,

    /// Number of worker threads.
    ///
    /// Default is 0 which means the number of cores of the system
    #[serde(alias = "workerthreads")]
    pub worker_threads: u16,

    /// Networks to compute statistics for.
    pub networks: Vec<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            nakamoto_threshold_bps: crate::engine::DEFAULT_NAKAMOTO_THRESHOLD_BPS,
            threshold_overrides: Vec::new(),
            frequency: Frequency::default().to_string(),
            worker_threads: 0,
            networks: vec!["ethereum".to_owned()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Data {
    /// Directory holding exported subgraph query results
    #[serde(alias = "datadir")]
    pub data_dir: String,

    /// Cache directory
    #[serde(alias = "cachedir")]
    pub cache_dir: String,

    /// Cache fetched documents on disk. When disabled, an in-memory cache is
    /// used for the duration of the run.
    #[serde(alias = "cacheenabled")]
    pub cache_enabled: bool,

    /// Capacity of the in-memory cache
    #[serde(alias = "memorycacheentries")]
    pub memory_cache_entries: u16,
}

impl Default for Data {
    fn default() -> Self {
        let mut cache_dir = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        cache_dir.push("Nakaflow");

        Self {
            data_dir: path_string(default_config_dir().join("data")),
            cache_dir: path_string(cache_dir),
            cache_enabled: true,
            memory_cache_entries: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DynamicConfVal {
    String(String),
    Sequence(Vec<String>),
    Bool(bool),
    U16(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn write_config(contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "nakaflow-settings-{}.toml",
            hex::encode(rand::random::<[u8; 8]>())
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    #[serial]
    fn it_loads_defaults_for_missing_keys() {
        let path = write_config("[engine]\nfrequency = \"hourly\"\n");
        let settings = Settings::from_path(&path).unwrap();

        assert_eq!(settings.engine.frequency, "hourly");
        assert_eq!(settings.frequency().unwrap(), Frequency::Hourly);
        assert_eq!(settings.engine.nakamoto_threshold_bps, 3_300);
        assert_eq!(settings.engine.networks, vec!["ethereum".to_owned()]);
        assert!(settings.engine.threshold_overrides.is_empty());
        assert_eq!(settings.data, Data::default());
        settings.validate().unwrap();

        fs::remove_file(&path).unwrap();
    }

    #[test]
    #[serial]
    fn it_reads_the_written_defaults_back() {
        let path = write_config(&toml::ser::to_string_pretty(&Settings::default()).unwrap());
        assert_eq!(Settings::from_path(&path).unwrap(), Settings::default());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    #[serial]
    fn it_applies_environment_overrides() {
        let path = write_config("[engine]\nworker_threads = 2\n");

        std::env::set_var("NAKAFLOW_ENGINE_NAKAMOTOTHRESHOLDBPS", "5100");
        std::env::set_var("NAKAFLOW_ENGINE_NETWORKS", "celo, fuse");
        std::env::set_var("NAKAFLOW_DATA_CACHEENABLED", "false");
        std::env::set_var("NAKAFLOW_DATA_DATADIR", "");
        let settings = Settings::from_path(&path);
        std::env::remove_var("NAKAFLOW_ENGINE_NAKAMOTOTHRESHOLDBPS");
        std::env::remove_var("NAKAFLOW_ENGINE_NETWORKS");
        std::env::remove_var("NAKAFLOW_DATA_CACHEENABLED");
        std::env::remove_var("NAKAFLOW_DATA_DATADIR");

        let settings = settings.unwrap();
        assert_eq!(settings.engine.nakamoto_threshold_bps, 5_100);
        assert_eq!(settings.engine.networks, vec!["celo".to_owned(), "fuse".to_owned()]);
        assert_eq!(settings.engine.worker_threads, 2);
        assert_eq!(settings.worker_threads(), 2);
        assert!(!settings.data.cache_enabled);
        assert_eq!(settings.data.data_dir, Data::default().data_dir);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    #[serial]
    fn it_applies_per_network_threshold_overrides() {
        let path = write_config("[engine]\nthreshold_overrides = [\"osmosis=4000\"]\n");
        let from_file = Settings::from_path(&path).unwrap().thresholds().unwrap();
        assert_eq!(from_file.for_network("osmosis").bps(), 4_000);
        assert_eq!(from_file.for_network("near").bps(), 3_300);

        std::env::set_var("NAKAFLOW_ENGINE_THRESHOLDOVERRIDES", "near=5100, Celo = 3400");
        let settings = Settings::from_path(&path);
        std::env::remove_var("NAKAFLOW_ENGINE_THRESHOLDOVERRIDES");

        let settings = settings.unwrap();
        settings.validate().unwrap();
        let thresholds = settings.thresholds().unwrap();
        assert_eq!(thresholds.default.bps(), 3_300);
        assert_eq!(thresholds.for_network("near").bps(), 5_100);
        assert_eq!(thresholds.for_network("celo").bps(), 3_400);
        assert_eq!(thresholds.for_network(" CELO").bps(), 3_400);
        assert_eq!(thresholds.for_network("osmosis").bps(), 3_300);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    #[serial]
    fn it_rejects_a_missing_explicit_file() {
        let mut path = std::env::temp_dir();
        path.push("nakaflow-settings-does-not-exist.toml");
        assert!(Settings::from_path(&path).is_err());
    }

    #[test]
    fn it_validates_values() {
        let mut settings = Settings::default();
        settings.validate().unwrap();

        settings.engine.nakamoto_threshold_bps = 0;
        assert!(settings.validate().is_err());

        settings.engine.nakamoto_threshold_bps = 10_001;
        assert!(settings.validate().is_err());

        settings.engine.nakamoto_threshold_bps = 5_100;
        settings.engine.frequency = "weekly".to_owned();
        assert!(settings.validate().is_err());

        settings.engine.frequency = "daily".to_owned();
        settings.engine.networks.push(" ".to_owned());
        assert!(settings.validate().is_err());
        settings.engine.networks.pop();

        for bad in ["near=0", "near=10001", "near", "=5100", "near=half"] {
            settings.engine.threshold_overrides = vec![bad.to_owned()];
            assert!(settings.validate().is_err(), "{bad}");
        }

        settings.engine.threshold_overrides = vec!["near=5100".to_owned()];
        settings.validate().unwrap();
    }

    #[test]
    fn it_counts_cores_for_zero_workers() {
        assert_eq!(Settings::default().worker_threads(), num_cpus::get());
    }
}
