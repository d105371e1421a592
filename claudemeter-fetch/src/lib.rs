// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ClaudeMeter` Fetch
//!
//! Upstream access for the `ClaudeMeter` usage monitor.
//!
//! - [`api::UsageApi`] - The fetch capability consumed by the refresh
//!   coordinator and the validator
//! - [`api::ClaudeWebClient`] - Production implementation against claude.ai
//! - [`http::HttpClient`] - `reqwest` wrapper with tracing and domain allowlist
//! - [`validator::SessionKeyValidator`] - Format check plus one-shot remote check
//!
//! ## Example
//!
//! ```ignore
//! use claudemeter_fetch::{ClaudeWebClient, SessionKeyValidator};
//! use std::sync::Arc;
//!
//! let validator = SessionKeyValidator::new(Arc::new(ClaudeWebClient::new()?));
//! let key = validator.validate("sk-ant-sid01-...").await?;
//! ```

pub mod api;
pub mod error;
pub mod http;
pub mod validator;

pub use api::{CLAUDE_DOMAIN, ClaudeWebClient, DEFAULT_BASE_URL, UsageApi};
pub use error::{FetchError, HttpError, ValidationError};
pub use http::HttpClient;
pub use validator::SessionKeyValidator;
