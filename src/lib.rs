//! # cookievault
//!
//! A persistent cookie store for Rust HTTP clients.
//!
//! `cookievault` implements RFC 6265 cookie-jar semantics (domain and path
//! matching, expiry, replace-by-identity) on top of an SQLite-backed durable
//! store, so cookies survive process restarts without the HTTP client ever
//! having to care about storage.
//!
//! ## Features
//!
//! - **Cookie-jar contract**: [`CookieJar`] with `save_from_response` /
//!   `load_for_request`, the abstraction most HTTP clients expect
//! - **Durable storage**: write-through SQLite persistence with a versioned,
//!   additive schema migration layer
//! - **RFC 6265 matching**: host-only and suffix domain matching, path prefix
//!   matching, secure-flag enforcement, longest-path-first ordering
//! - **Session cookies**: non-persistent cookies live in memory only and are
//!   never written to disk
//! - **Snapshots**: JSON export/import for backup and store migration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cookievault::{Cookie, CookieJar, CookieRepository, DefaultSettings};
//! use url::Url;
//!
//! let repository = CookieRepository::open("cookies.db", Arc::new(DefaultSettings))?;
//!
//! let url = Url::parse("https://example.com/").unwrap();
//! let cookie = Cookie::builder()
//!     .name("session")
//!     .value("abc123")
//!     .domain("example.com")
//!     .expires_at(1_900_000_000_000)
//!     .build();
//! repository.save_from_response(&url, vec![cookie]);
//!
//! let cookies = repository.load_for_request(&url);
//! println!("{} cookie(s) for {}", cookies.len(), url);
//! # Ok::<(), cookievault::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`cookies`] - Cookie type, per-domain index, durable store, repository
//! - [`storage`] - Versioned schema migration over SQLite
//! - [`settings`] - Runtime configuration consumed by the store
//! - [`error`] - Error definitions
//!
//! ## Failure model
//!
//! The jar contract never raises storage-layer errors to the HTTP client:
//! a failed durable write is logged via `tracing` and the in-memory state
//! stays authoritative. Only construction, migration and the snapshot codec
//! return [`Error`].

pub mod cookies;
pub mod error;
pub mod settings;
pub mod storage;

pub use cookies::cookie::Cookie;
pub use cookies::repository::{CookieJar, CookieRepository};
pub use error::Error;
pub use settings::{DefaultSettings, SettingsProvider};
