//! Redis-backed [`LockStore`] shared by every process pointing at the same server.

// crates.io
use redis::{Client, RedisError, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	lock::{LockFuture, LockStore, LockStoreError},
};

/// Lock store issuing `GET`, `SET NX PX`, and `DEL` against Redis.
#[derive(Clone)]
pub struct RedisLockStore {
	connection: ConnectionManager,
}
impl RedisLockStore {
	/// Opens a managed (auto-reconnecting) connection to `url`.
	pub async fn connect(url: &str) -> Result<Self, LockStoreError> {
		let client = Client::open(url).map_err(backend)?;
		let connection = ConnectionManager::new(client).await.map_err(backend)?;

		Ok(Self::with_connection(connection))
	}

	/// Wraps an existing connection manager.
	pub fn with_connection(connection: ConnectionManager) -> Self {
		Self { connection }
	}
}
impl LockStore for RedisLockStore {
	fn get<'a>(&'a self, key: &'a str) -> LockFuture<'a, Option<String>> {
		let mut connection = self.connection.clone();

		Box::pin(async move {
			redis::cmd("GET")
				.arg(key)
				.query_async::<Option<String>>(&mut connection)
				.await
				.map_err(backend)
		})
	}

	fn set_if_absent<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> LockFuture<'a, bool> {
		let mut connection = self.connection.clone();

		Box::pin(async move {
			let mut command = redis::cmd("SET");

			command.arg(key).arg(value).arg("NX");

			if let Some(ttl) = ttl {
				// Redis rejects a zero expiry.
				let millis = ttl.whole_milliseconds().max(1);

				command.arg("PX").arg(i64::try_from(millis).unwrap_or(i64::MAX));
			}

			// `SET NX` replies `OK` when it wrote the key and nil otherwise.
			let reply =
				command.query_async::<Option<String>>(&mut connection).await.map_err(backend)?;

			Ok(reply.is_some())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> LockFuture<'a, bool> {
		let mut connection = self.connection.clone();

		Box::pin(async move {
			let removed =
				redis::cmd("DEL").arg(key).query_async::<i64>(&mut connection).await.map_err(backend)?;

			Ok(removed > 0)
		})
	}
}
impl Debug for RedisLockStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisLockStore").finish_non_exhaustive()
	}
}

fn backend(e: RedisError) -> LockStoreError {
	LockStoreError::Backend { message: e.to_string() }
}
