//! HTTP transport.

mod client;

pub use client::HttpTransport;
