//! Signed, single-flight-authenticated and backoff-aware client core for the dax partner
//! access-control API.
//!
//! The crate exposes four cooperating pieces:
//!
//! - [`backoff::BackoffScheduler`] produces deterministic retry delays.
//! - [`signing::RequestSigner`] binds method, target, date and body to an RSA key.
//! - [`auth::CredentialCache`] acquires bearer tokens through the password grant and coalesces
//!   concurrent refreshes into a single in-flight fetch.
//! - [`client::ResilientClient`] composes the three into authenticated, signed, retried calls.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod signing;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use httpmock as _;
