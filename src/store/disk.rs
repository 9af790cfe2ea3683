// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::codec::{decode, encode_to_vec};
use crate::store::{CacheKey, Store, StoreErr};
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// JSON documents under `<root>/<namespace>/<network>/<digest>.json`
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.namespace.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(&key.network);
        path.push(format!("{}.json", key.digest()));
        path
    }
}

impl Store for DiskStore {
    fn get<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<V>, StoreErr> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        trace!("Cache hit {}", path.display());
        Ok(Some(decode(&bytes)?))
    }

    fn put<V: Serialize>(&self, key: &CacheKey, value: &V) -> Result<(), StoreErr> {
        let path = self.path_for(key);
        let dir = path.parent().ok_or(StoreErr::Error("cache path has no parent"))?;
        fs::create_dir_all(dir)?;

        // Readers never observe a partially written document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encode_to_vec(value)?)?;
        fs::rename(&tmp, &path)?;

        trace!("Cached {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_dir(label: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("nakaflow-{label}-{}", hex::encode(rand::random::<[u8; 8]>())));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_misses_then_hits() {
        let root = temp_dir("disk-store");
        let store = DiskStore::new(&root);
        let key = CacheKey::new("authors", "fantom", "d", vec![10, 20]);

        let miss: Option<Vec<u64>> = store.get(&key).unwrap();
        assert!(miss.is_none());

        store.put(&key, &vec![1_u64, 2, 3]).unwrap();
        let hit: Option<Vec<u64>> = store.get(&key).unwrap();
        assert_eq!(hit, Some(vec![1, 2, 3]));

        let expected = root
            .join("authors")
            .join("fantom")
            .join(format!("{}.json", key.digest()));
        assert_eq!(store.path_for(&key), expected);
        assert!(expected.exists());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn it_nests_namespaces() {
        let store = DiskStore::new("/cache");
        let key = CacheKey::new("snapshots/hourly", "cronos", "d", vec![]);
        assert!(store
            .path_for(&key)
            .starts_with(Path::new("/cache/snapshots/hourly/cronos")));
    }

    #[test]
    fn it_overwrites_entries() {
        let root = temp_dir("disk-store");
        let store = DiskStore::new(&root);
        let key = CacheKey::new("authors", "fantom", "d", vec![10]);

        store.put(&key, &"first").unwrap();
        store.put(&key, &"second").unwrap();
        let value: Option<String> = store.get(&key).unwrap();
        assert_eq!(value.as_deref(), Some("second"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn it_reports_corrupt_entries() {
        let root = temp_dir("disk-store");
        let store = DiskStore::new(&root);
        let key = CacheKey::new("authors", "fantom", "d", vec![10]);
        let path = store.path_for(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();

        let res: Result<Option<Vec<u64>>, _> = store.get(&key);
        assert!(matches!(res, Err(StoreErr::Json(_))));

        fs::remove_dir_all(&root).unwrap();
    }
}
