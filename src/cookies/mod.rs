//! Cookie storage and matching.
//!
//! The pieces compose bottom-up:
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`Cookie`](cookie::Cookie) | Single cookie, URL matching, identity |
//! | [`CookieSet`](set::CookieSet) | Per-domain index keyed by (name, domain, path) |
//! | [`CookieDatabase`](database::CookieDatabase) | Durable rows + row-identity map |
//! | [`CookieRepository`](repository::CookieRepository) | Jar contract, domain matching, write-through |
//!
//! An HTTP client talks only to the repository. Response cookies flow through
//! [`add_cookie`](repository::CookieRepository::add_cookie) into the in-memory
//! index and, for persistent cookies, through to SQLite; request cookies come
//! back out of the index with expired entries evicted on the way.

pub mod cookie;
pub mod database;
pub mod export;
pub mod parse;
pub mod repository;
pub mod set;

pub use cookie::Cookie;
pub use repository::{CookieJar, CookieRepository};
