// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fingerprint -> [`WorkResult`] cache with TTL, LRU, and memory bounds.

use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use derive_more::Display;
use serde_json::Value;

use crate::{result::WorkResult, work::Work};

/// A canonical, collision-resistant digest of `(worker_class, work.input,
/// work.timeout)`. `serde_json::Value`'s default map representation is
/// already key-sorted (the `preserve_order` feature is not enabled), so
/// serializing with `serde_json::to_vec` is already the canonical form the
/// fingerprint needs before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{}", hex::encode(_0))]
pub struct Fingerprint([u8; 32]);

mod hex {
    pub fn encode(bytes: [u8; 32]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Fingerprint {
    #[must_use]
    pub fn compute(worker_class: &str, work: &Work) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(worker_class.as_bytes());
        hasher.update(b"\0");
        if let Ok(canonical) = serde_json::to_vec(&work.input) {
            hasher.update(&canonical);
        }
        hasher.update(b"\0");
        if let Some(timeout) = work.timeout {
            hasher.update(&timeout.as_nanos().to_le_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }
}

struct Entry {
    value: WorkResult,
    inserted_at: Instant,
    last_access: Instant,
    size_bytes: usize,
}

/// A cheap, approximate size estimator over JSON-like values; good enough to
/// drive `max_memory_bytes` eviction without a precise heap accounting pass.
fn estimate_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 1,
        Value::Number(_) => 8,
        Value::String(s) => s.len(),
        Value::Array(items) => items.iter().map(estimate_size).sum::<usize>() + 8,
        Value::Object(map) => {
            map.iter().map(|(k, v)| k.len() + estimate_size(v)).sum::<usize>() + 8
        }
    }
}

fn estimate_result_size(wr: &WorkResult) -> usize {
    match &wr.outcome {
        crate::result::Outcome::Success(v) => estimate_size(v),
        crate::result::Outcome::Failure(f) => {
            f.error_message.len() + f.error_context.values().map(estimate_size).sum::<usize>()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

pub struct ResultCache {
    entries: tokio::sync::Mutex<HashMap<Fingerprint, Entry>>,
    ttl: Option<Duration>,
    max_size: Option<usize>,
    max_memory_bytes: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    #[must_use]
    pub fn new(ttl: Option<Duration>, max_size: Option<usize>, max_memory_bytes: Option<usize>) -> Self {
        Self {
            entries: tokio::sync::Mutex::new(HashMap::new()),
            ttl,
            max_size,
            max_memory_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn expired(&self, entry: &Entry) -> bool {
        self.ttl.is_some_and(|ttl| entry.inserted_at.elapsed() > ttl)
    }

    /// Returns the cached result if present and unexpired (bumping the hit
    /// counter), else runs `compute`, stores its result, and returns it. The
    /// whole operation holds one lock, so `compute` runs at most once per
    /// fingerprint even under concurrent callers.
    pub async fn get<F, Fut>(&self, worker_class: &str, work: &Work, compute: F) -> WorkResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = WorkResult>,
    {
        let fp = Fingerprint::compute(worker_class, work);
        let mut guard = self.entries.lock().await;

        if let Some(entry) = guard.get_mut(&fp) {
            if !self.expired(entry) {
                entry.last_access = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return entry.value.clone();
            }
            guard.remove(&fp);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let result = compute().await;
        self.insert_locked(&mut guard, fp, result.clone());
        result
    }

    #[must_use]
    pub async fn has(&self, worker_class: &str, work: &Work) -> bool {
        let fp = Fingerprint::compute(worker_class, work);
        let guard = self.entries.lock().await;
        guard.get(&fp).is_some_and(|e| !self.expired(e))
    }

    pub async fn set(&self, worker_class: &str, work: &Work, result: WorkResult) {
        let fp = Fingerprint::compute(worker_class, work);
        let mut guard = self.entries.lock().await;
        self.insert_locked(&mut guard, fp, result);
    }

    pub async fn invalidate(&self, worker_class: &str, work: &Work) {
        let fp = Fingerprint::compute(worker_class, work);
        self.entries.lock().await.remove(&fp);
    }

    pub async fn clear(&self) { self.entries.lock().await.clear(); }

    pub async fn cleanup_expired(&self) {
        let Some(ttl) = self.ttl else { return };
        self.entries.lock().await.retain(|_, e| e.inserted_at.elapsed() <= ttl);
    }

    #[must_use]
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.lock().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn insert_locked(
        &self,
        guard: &mut HashMap<Fingerprint, Entry>,
        fp: Fingerprint,
        result: WorkResult,
    ) {
        let size_bytes = estimate_result_size(&result);

        if let Some(max_size) = self.max_size {
            while guard.len() >= max_size && !guard.contains_key(&fp) {
                if !Self::evict_lru(guard) {
                    break;
                }
            }
        }
        if let Some(max_memory) = self.max_memory_bytes {
            let mut total: usize = guard.values().map(|e| e.size_bytes).sum::<usize>() + size_bytes;
            while total > max_memory {
                let Some(evicted) = Self::evict_lru(guard) else { break };
                total -= evicted;
            }
        }

        let now = Instant::now();
        guard.insert(fp, Entry { value: result, inserted_at: now, last_access: now, size_bytes });
    }

    /// Evicts the entry with the oldest `last_access`, returning its
    /// estimated size, or `None` if the cache is empty.
    fn evict_lru(guard: &mut HashMap<Fingerprint, Entry>) -> Option<usize> {
        let oldest = guard
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(fp, _)| *fp)?;
        guard.remove(&oldest).map(|e| e.size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn work() -> Work { Work::builder().input(serde_json::json!({"a": 1, "b": 2})).build() }

    #[tokio::test]
    async fn cache_hit_never_recomputes() {
        let cache = ResultCache::new(None, None, None);
        let calls = AtomicU32::new(0);
        let w = work();

        for _ in 0..100 {
            let result = cache
                .get("square", &w, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { WorkResult::success(w.clone(), serde_json::json!(42)) }
                })
                .await;
            assert!(result.is_success());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 99);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn max_size_evicts_exactly_one_entry() {
        let cache = ResultCache::new(None, Some(2), None);
        for class in ["a", "b"] {
            let w = Work::builder().input(serde_json::json!(class)).build();
            cache.set(class, &w, WorkResult::success(w.clone(), serde_json::json!(1))).await;
        }
        assert_eq!(cache.stats().await.size, 2);

        let w = Work::builder().input(serde_json::json!("c")).build();
        cache.set("c", &w, WorkResult::success(w.clone(), serde_json::json!(1))).await;
        assert_eq!(cache.stats().await.size, 2);
    }

    #[test]
    fn fingerprint_is_stable_for_equal_inputs() {
        let w1 = Work::builder().input(serde_json::json!({"x": 1, "y": 2})).build();
        let w2 = Work::builder().input(serde_json::json!({"y": 2, "x": 1})).build();
        assert_eq!(Fingerprint::compute("k", &w1), Fingerprint::compute("k", &w2));
    }
}
