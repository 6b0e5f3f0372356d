//! Per-tenant OAuth 2.0 refresh-token rotation guarded by a distributed lock.
//!
//! [`flows::RefreshOrchestrator`] guarantees that at most one refresh per tenant is in flight
//! across every process sharing the same [`lock::LockStore`], and reconciles stale refresh tokens
//! that lost a rotation race against the authoritative [`store::TokenRepository`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod lock;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(any(test, feature = "test"))] pub mod _preludet;

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, oauth2_refresh_coordinator as _};
