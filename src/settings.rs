//! Runtime configuration consumed by the cookie store.
//!
//! The store reads configuration through a provider trait instead of global
//! state, so hosts can back it with whatever preference system they use.

/// Configuration queried by [`CookieDatabase`](crate::cookies::database::CookieDatabase)
/// at write time.
pub trait SettingsProvider: Send + Sync {
    /// When true, updates to the cookie named `igneous` are not persisted:
    /// the durable row keeps its old value while the in-memory jar follows
    /// the server. Checked on every update.
    fn lock_cookie_igneous(&self) -> bool {
        false
    }
}

/// Provider with every setting at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSettings;

impl SettingsProvider for DefaultSettings {}
