//! # Tern Transport
//!
//! Concrete [`Transport`](tern_core::Transport) implementations for the Tern
//! API client.
//!
//! ## Features
//!
//! - `http-client`: [`HttpTransport`], backed by `reqwest`
//! - `full`: all transports
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  tern-framework     │  (client facade, plugins)
//! ├─────────────────────┤
//! │  tern-core          │  (Transport trait)
//! ├─────────────────────┤
//! │  tern-transport     │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tern_transport::{HttpTransport, HttpTransportConfig};
//!
//! let transport = HttpTransport::new(HttpTransportConfig::default())?;
//! let client = Client::builder().transport(transport).build();
//! ```

mod config;

pub use config::{DEFAULT_BASE_URL, HttpTransportConfig};

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::HttpTransport;
