// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::codec::decode;
use crate::primitives::{AuthorObservation, AuthorRecord, Frequency, SnapshotRow};
use crate::source::{ObservationSource, SourceErr};
use log::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Either a bare array of entities or a GraphQL response body
#[derive(Deserialize)]
#[serde(untagged)]
enum Document<T> {
    Rows(Vec<T>),
    Response { data: BTreeMap<String, Vec<T>> },
}

impl<T> Document<T> {
    fn into_rows(self) -> Vec<T> {
        match self {
            Self::Rows(rows) => rows,
            Self::Response { data } => data.into_values().flatten().collect(),
        }
    }
}

/// Reads subgraph query results exported as JSON files.
///
/// ```text
/// <root>/snapshots/<frequency>/<network>.json
/// <root>/authors/<network>/<height>.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn snapshots_path(&self, network: &str, frequency: Frequency) -> PathBuf {
        self.root
            .join("snapshots")
            .join(frequency.as_str())
            .join(format!("{network}.json"))
    }

    pub fn authors_path(&self, network: &str, height: u64) -> PathBuf {
        self.root
            .join("authors")
            .join(network)
            .join(format!("{height}.json"))
    }

    /// `Ok(None)` when the file does not exist
    fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, SourceErr> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// `Ok(None)` when the file does not exist
    fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, SourceErr> {
        let bytes = match Self::read_bytes(path)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let doc: Document<T> = decode(&bytes)?;
        Ok(Some(doc.into_rows()))
    }
}

impl ObservationSource for JsonDirSource {
    fn snapshots(&self, network: &str, frequency: Frequency) -> Result<Vec<SnapshotRow>, SourceErr> {
        let path = self.snapshots_path(network, frequency);
        match Self::read_rows(&path)? {
            Some(rows) => Ok(rows),
            None => {
                warn!("No {frequency} snapshots for {network} at {}", path.display());
                Ok(Vec::new())
            }
        }
    }

    fn authors_at(&self, network: &str, height: u64) -> Result<Vec<AuthorObservation>, SourceErr> {
        let path = self.authors_path(network, height);
        let records: Vec<AuthorRecord> = match Self::read_rows(&path)? {
            Some(records) => records,
            None => {
                debug!("No author records for {network} at height {height}");
                return Ok(Vec::new());
            }
        };

        Ok(records
            .into_iter()
            .map(|r| r.into_observation(network, height))
            .collect())
    }

    /// Hash of the exported snapshot document, so re-exporting invalidates
    /// cached lists
    fn snapshot_revision(&self, network: &str, frequency: Frequency) -> Result<Option<String>, SourceErr> {
        let path = self.snapshots_path(network, frequency);
        Ok(Self::read_bytes(&path)?.map(|bytes| hex::encode(blake3::hash(&bytes).as_bytes())))
    }
}
