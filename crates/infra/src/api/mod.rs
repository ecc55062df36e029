//! Remote API adapter
//!
//! Replays queued mutations and fetches reference datasets over HTTP/JSON.

mod client;

pub use client::RestApiClient;
