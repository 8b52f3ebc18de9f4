//! Fetch layer for resource bytes.
//!
//! This module provides the HTTP client used by network-backed resources.
//! Bodies are streamed into memory and hashed on the fly; the committer
//! decides where (and whether) they land on disk.
//!
//! # Example
//!
//! ```no_run
//! use bulkdl_core::download::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let content = client.fetch("https://example.com/image.png").await?;
//! println!("{} bytes, sha256 {}", content.bytes.len(), content.hash);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;

pub use client::{FetchedContent, HttpClient};
pub use constants::{CONNECT_TIMEOUT, DEFAULT_MAX_WAIT};
pub use error::FetchError;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
