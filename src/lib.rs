//! Birdsong - AI-assisted status posting library.
//!
//! This library generates a short status update from an operator prompt and
//! posts it to Twitter/X once the operator approves it. It supports:
//!
//! - **Message generation** via the Anthropic Messages API
//! - **Credential verification and posting** via the Twitter API v2 with
//!   OAuth 1.0a request signing
//! - **Bounded rate-limit retry** with a fixed backoff interval
//! - **Interactive confirmation** before anything leaves the machine
//! - **Mock mode** for running and testing the full flow offline
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management (credentials, mock mode)
//! - [`http_client`] - HTTP client abstraction
//! - [`oauth`] - OAuth 1.0a request signing
//! - [`generator`] - AI-powered message generation
//! - [`publisher`] - Credential handshake and status posting
//! - [`pipeline`] - The generate → confirm → publish flow
//! - [`providers`] - Shared dependency injection traits
//!
//! # Example
//!
//! ```ignore
//! use birdsong::config::Config;
//! use birdsong::generator::ClaudeGenerator;
//! use birdsong::http_client::ReqwestHttpClient;
//! use birdsong::pipeline::Pipeline;
//! use birdsong::publisher::TwitterPublisher;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let creds = config.credentials().expect("not in mock mode");
//!
//!     let http = Arc::new(ReqwestHttpClient::new());
//!     let pipeline = Pipeline::new(
//!         Box::new(ClaudeGenerator::new(http.clone(), creds.anthropic_api_key.clone())),
//!         Box::new(TwitterPublisher::new(http, creds.twitter.clone())),
//!     );
//!
//!     let outcome = pipeline.run().await?;
//!     std::process::exit(outcome.exit_code() as i32);
//! }
//! ```

pub mod config;
pub mod generator;
pub mod http_client;
pub mod oauth;
pub mod pipeline;
pub mod providers;
pub mod publisher;
