//! Process-local [`LockStore`] for single-instance deployments and tests.

// self
use crate::{
	_prelude::*,
	lock::{LockFuture, LockStore},
};

type LockMap = Arc<RwLock<HashMap<String, LockEntry>>>;

#[derive(Clone, Debug)]
struct LockEntry {
	value: String,
	expires_at: Option<OffsetDateTime>,
}
impl LockEntry {
	fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|expires_at| instant < expires_at)
	}
}

/// Thread-safe lock store that honours TTLs lazily on access.
///
/// Only processes sharing this value observe each other's locks; use a shared backend such as
/// [`RedisLockStore`](crate::lock::RedisLockStore) once more than one instance runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryLockStore(LockMap);
impl MemoryLockStore {
	fn get_now(map: LockMap, key: &str, now: OffsetDateTime) -> Option<String> {
		map.read().get(key).filter(|entry| entry.is_live_at(now)).map(|entry| entry.value.clone())
	}

	fn set_if_absent_now(
		map: LockMap,
		key: &str,
		value: &str,
		ttl: Option<Duration>,
		now: OffsetDateTime,
	) -> bool {
		let mut guard = map.write();

		if guard.get(key).is_some_and(|entry| entry.is_live_at(now)) {
			return false;
		}

		// Non-positive TTLs keep the key for a millisecond, as `SET PX` would. Expiries past the
		// representable range never lapse.
		let expires_at =
			ttl.and_then(|ttl| now.checked_add(ttl.max(Duration::milliseconds(1))));

		guard.insert(key.to_owned(), LockEntry { value: value.to_owned(), expires_at });

		true
	}

	fn delete_now(map: LockMap, key: &str, now: OffsetDateTime) -> bool {
		map.write().remove(key).is_some_and(|entry| entry.is_live_at(now))
	}
}
impl LockStore for MemoryLockStore {
	fn get<'a>(&'a self, key: &'a str) -> LockFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key, OffsetDateTime::now_utc())) })
	}

	fn set_if_absent<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> LockFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::set_if_absent_now(map, key, value, ttl, OffsetDateTime::now_utc()))
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> LockFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::delete_now(map, key, OffsetDateTime::now_utc())) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn set_if_absent_only_wins_once() {
		let map = LockMap::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(MemoryLockStore::set_if_absent_now(map.clone(), "lock:a", "REFRESHING", None, now));
		assert!(!MemoryLockStore::set_if_absent_now(map.clone(), "lock:a", "OTHER", None, now));
		assert_eq!(
			MemoryLockStore::get_now(map.clone(), "lock:a", now).as_deref(),
			Some("REFRESHING")
		);
		assert!(MemoryLockStore::set_if_absent_now(map, "lock:b", "REFRESHING", None, now));
	}

	#[test]
	fn expired_entries_are_treated_as_absent() {
		let map = LockMap::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let ttl = Some(Duration::seconds(60));

		assert!(MemoryLockStore::set_if_absent_now(map.clone(), "lock:a", "REFRESHING", ttl, now));

		let before = now + Duration::seconds(59);
		let after = now + Duration::seconds(60);

		assert!(MemoryLockStore::get_now(map.clone(), "lock:a", before).is_some());
		assert!(MemoryLockStore::get_now(map.clone(), "lock:a", after).is_none());
		assert!(MemoryLockStore::set_if_absent_now(map.clone(), "lock:a", "REFRESHING", ttl, after));
		assert!(!MemoryLockStore::delete_now(map, "lock:a", after + Duration::seconds(60)));
	}

	#[test]
	fn degenerate_ttls_do_not_reopen_or_panic() {
		let map = LockMap::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(MemoryLockStore::set_if_absent_now(
			map.clone(),
			"lock:zero",
			"REFRESHING",
			Some(Duration::ZERO),
			now,
		));
		assert!(!MemoryLockStore::set_if_absent_now(
			map.clone(),
			"lock:zero",
			"REFRESHING",
			Some(Duration::ZERO),
			now,
		));
		assert!(MemoryLockStore::set_if_absent_now(
			map.clone(),
			"lock:huge",
			"REFRESHING",
			Some(Duration::MAX),
			now,
		));
		assert!(
			MemoryLockStore::get_now(map, "lock:huge", now + Duration::days(365 * 100)).is_some()
		);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_acquires_have_a_single_winner() {
		let store = MemoryLockStore::default();
		let handles = (0..16)
			.map(|_| {
				let store = store.clone();

				tokio::spawn(async move {
					store.set_if_absent("lock:gitple", "REFRESHING", None).await
				})
			})
			.collect::<Vec<_>>();
		let mut winners = 0;

		for handle in handles {
			if handle
				.await
				.expect("Acquire task should not panic.")
				.expect("Memory store should not fail.")
			{
				winners += 1;
			}
		}

		assert_eq!(winners, 1);
		assert!(store.delete("lock:gitple").await.expect("Delete should succeed."));
		assert!(!store.delete("lock:gitple").await.expect("Second delete should succeed."));
	}
}
