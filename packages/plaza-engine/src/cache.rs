use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use serde_json::Value;
use tracing::debug;

use plaza_service::{BoxFuture, CacheCompute, Error, ResponseCache, Result};

/// In-process read-through cache keyed by the resolved query. Concurrent
/// identical misses may both compute and both store; last writer wins, which
/// costs a redundant engine call but never correctness.
#[derive(Default)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, (Instant, Value)>>,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}

	fn get_fresh(&self, key: &str) -> Result<Option<Value>> {
		let mut entries = self.entries.lock().map_err(|_| Error::Cache {
			message: "Cache lock poisoned.".to_string(),
		})?;

		match entries.get(key) {
			Some((expires_at, value)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
			Some(_) => {
				entries.remove(key);
				Ok(None)
			},
			None => Ok(None),
		}
	}

	fn store(&self, key: &str, ttl: Duration, value: Value) -> Result<()> {
		let mut entries = self.entries.lock().map_err(|_| Error::Cache {
			message: "Cache lock poisoned.".to_string(),
		})?;

		entries.insert(key.to_string(), (Instant::now() + ttl, value));

		Ok(())
	}
}

impl ResponseCache for MemoryCache {
	fn fetch<'a>(
		&'a self,
		key: &'a str,
		ttl: Duration,
		compute: CacheCompute<'a>,
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move {
			if let Some(value) = self.get_fresh(key)? {
				debug!(key = %key, "cache hit");

				return Ok(value);
			}

			debug!(key = %key, "cache miss");

			let value = compute().await?;

			self.store(key, ttl, value.clone())?;

			Ok(value)
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use plaza_service::ResponseCache;

	use super::*;

	fn compute_counting<'a>(counter: &'a AtomicUsize, value: Value) -> CacheCompute<'a> {
		Box::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move { Ok(value) })
		})
	}

	#[tokio::test]
	async fn second_fetch_is_served_from_cache() {
		let cache = MemoryCache::new();
		let calls = AtomicUsize::new(0);
		let ttl = Duration::from_secs(60);

		let first = cache
			.fetch("key", ttl, compute_counting(&calls, serde_json::json!({ "total": 1 })))
			.await
			.expect("fetch failed");
		let second = cache
			.fetch("key", ttl, compute_counting(&calls, serde_json::json!({ "total": 2 })))
			.await
			.expect("fetch failed");

		assert_eq!(first, second);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn expired_entries_are_recomputed() {
		let cache = MemoryCache::new();
		let calls = AtomicUsize::new(0);
		let ttl = Duration::from_millis(0);

		cache
			.fetch("key", ttl, compute_counting(&calls, serde_json::json!(1)))
			.await
			.expect("fetch failed");
		cache
			.fetch("key", ttl, compute_counting(&calls, serde_json::json!(2)))
			.await
			.expect("fetch failed");

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn distinct_keys_do_not_collide() {
		let cache = MemoryCache::new();
		let calls = AtomicUsize::new(0);
		let ttl = Duration::from_secs(60);

		let a = cache
			.fetch("a", ttl, compute_counting(&calls, serde_json::json!("a")))
			.await
			.expect("fetch failed");
		let b = cache
			.fetch("b", ttl, compute_counting(&calls, serde_json::json!("b")))
			.await
			.expect("fetch failed");

		assert_ne!(a, b);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}
}
