// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::codec::{decode, encode_to_vec};
use crate::store::{CacheKey, Store, StoreErr};
use lru::LruCache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_MEMORY_CACHE_ENTRIES: usize = 256;

/// Bounded in-process cache. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<LruCache<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// A capacity of 0 falls back to `DEFAULT_MEMORY_CACHE_ENTRIES`
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_MEMORY_CACHE_ENTRIES))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CACHE_ENTRIES)
    }
}

impl Store for MemoryStore {
    fn get<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<V>, StoreErr> {
        let bytes = match self.entries.lock().get(&key.digest()) {
            Some(bytes) => bytes.clone(),
            None => return Ok(None),
        };

        Ok(Some(decode(&bytes)?))
    }

    fn put<V: Serialize>(&self, key: &CacheKey, value: &V) -> Result<(), StoreErr> {
        let bytes = encode_to_vec(value)?;
        self.entries.lock().put(key.digest(), bytes);
        Ok(())
    }
}
