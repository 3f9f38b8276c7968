//! The public-facing cookie jar.
//!
//! One mutex serializes every operation: HTTP clients call the jar from
//! concurrent request and response threads, and both the domain map and the
//! durable store are touched under that single lock.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::Url;

use crate::cookies::cookie::{now_millis, Cookie};
use crate::cookies::database::CookieDatabase;
use crate::cookies::parse::parse_set_cookie;
use crate::cookies::set::CookieSet;
use crate::error::Error;
use crate::settings::SettingsProvider;

/// The cookie-jar contract an HTTP client consumes.
pub trait CookieJar: Send + Sync {
    /// Stores the cookies of one HTTP response.
    fn save_from_response(&self, url: &Url, cookies: Vec<Cookie>);

    /// Loads the cookies to attach to a request for `url`.
    fn load_for_request(&self, url: &Url) -> Vec<Cookie>;
}

struct Inner {
    db: CookieDatabase,
    map: HashMap<String, CookieSet>,
}

/// Persistent cookie jar: per-domain in-memory index with write-through
/// SQLite durability.
pub struct CookieRepository {
    inner: Mutex<Inner>,
}

impl CookieRepository {
    /// Opens the store at `path`, loading every valid persistent cookie.
    pub fn open(path: impl AsRef<Path>, settings: Arc<dyn SettingsProvider>) -> Result<Self, Error> {
        let mut db = CookieDatabase::open(path, settings)?;
        let map = db.load_all()?;
        Ok(Self {
            inner: Mutex::new(Inner { db, map }),
        })
    }

    /// Jar backed by an in-memory database; nothing survives drop.
    pub fn open_in_memory(settings: Arc<dyn SettingsProvider>) -> Result<Self, Error> {
        let mut db = CookieDatabase::open_in_memory(settings)?;
        let map = db.load_all()?;
        Ok(Self {
            inner: Mutex::new(Inner { db, map }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds one cookie, following the deletion-signal and persistence rules.
    pub fn add_cookie(&self, cookie: Cookie) {
        self.lock().add_cookie(cookie);
    }

    /// All cookies to send to `url`, longest path first.
    pub fn get_cookies(&self, url: &Url) -> Vec<Cookie> {
        self.lock().get_cookies(url)
    }

    /// Parses raw `Set-Cookie` header values and stores the valid ones.
    pub fn save_from_response_headers(&self, url: &Url, headers: &[&str]) {
        let mut inner = self.lock();
        for header in headers {
            if let Some(cookie) = parse_set_cookie(url, header) {
                inner.add_cookie(cookie);
            }
        }
    }

    /// The `Cookie` request-header value for `url`.
    pub fn cookie_header(&self, url: &Url) -> String {
        let cookies = self.get_cookies(url);
        let mut header = String::new();
        for (i, cookie) in cookies.iter().enumerate() {
            if i > 0 {
                header.push_str("; ");
            }
            header.push_str(&cookie.name);
            header.push('=');
            header.push_str(&cookie.value);
        }
        header
    }

    /// Whether any cookie named `name` would be sent to `url`.
    pub fn contains(&self, url: &Url, name: &str) -> bool {
        self.get_cookies(url).iter().any(|c| c.name == name)
    }

    /// Every live cookie across all domains, in no particular order.
    pub fn all_cookies(&self) -> Vec<Cookie> {
        let inner = self.lock();
        inner
            .map
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Removes every cookie, in memory and on disk.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.db.clear();
    }

    /// Closes the repository, releasing the underlying database.
    pub fn close(self) {}
}

impl CookieJar for CookieRepository {
    // Cookies carry their own domain; the response URL is not consulted.
    fn save_from_response(&self, _url: &Url, cookies: Vec<Cookie>) {
        let mut inner = self.lock();
        for cookie in cookies {
            inner.add_cookie(cookie);
        }
    }

    fn load_for_request(&self, url: &Url) -> Vec<Cookie> {
        self.get_cookies(url)
    }
}

impl Inner {
    fn add_cookie(&mut self, cookie: Cookie) {
        // Durable-write plan for this cookie.
        let mut to_add = None;
        let mut to_update = None;
        let mut to_remove = None;

        let now = now_millis();
        let set = self
            .map
            .entry(cookie.domain.clone())
            .or_insert_with(CookieSet::new);

        if cookie.expired(now) {
            // Servers delete a cookie by sending an already-expired
            // replacement. A removed non-persistent cookie was never stored.
            to_remove = set.remove(&cookie);
            if matches!(&to_remove, Some(removed) if !removed.persistent) {
                to_remove = None;
            }
        } else {
            to_update = set.add(cookie.clone());
            to_add = Some(cookie);
            if matches!(&to_add, Some(added) if !added.persistent) {
                to_add = None;
            }
            if matches!(&to_update, Some(replaced) if !replaced.persistent) {
                to_update = None;
            }
            // A non-storable cookie superseding a stored one evicts its row.
            if to_add.is_none() {
                if let Some(replaced) = to_update.take() {
                    to_remove = Some(replaced);
                }
            }
        }

        if let Some(cookie) = to_remove {
            self.db.remove(&cookie);
        }
        if let Some(cookie) = to_add {
            match to_update {
                Some(old) => self.db.update(&old, &cookie),
                None => self.db.add(&cookie),
            }
        }
    }

    fn get_cookies(&mut self, url: &Url) -> Vec<Cookie> {
        let now = now_millis();
        let host = url.host_str().unwrap_or("");
        let mut accepted = Vec::new();
        let mut expired = Vec::new();

        for (domain, set) in self.map.iter_mut() {
            if domain_match(host, domain) {
                set.query(url, now, &mut accepted, &mut expired);
            }
        }

        for cookie in &expired {
            if cookie.persistent {
                self.db.remove(cookie);
            }
        }

        // RFC 6265 section 5.4 step 2: longer paths first. Creation time is
        // not tracked, so it does not participate.
        accepted.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        accepted
    }
}

/// RFC 6265 domain matching: exact host, or a subdomain of `domain` when the
/// host is not an IP literal.
pub fn domain_match(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
        && !looks_like_ip_address(host)
}

/// Quick and dirty check that a host might be an IP address rather than a
/// name: hex digits followed by a colon and more hex/colon/dot characters
/// (IPv6-ish), or nothing but decimal digits and dots (IPv4-ish). Looser than
/// real address validation on purpose: a host this matches must never be
/// suffix-matched as a domain.
fn looks_like_ip_address(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    if host.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return true;
    }
    match host.find(':') {
        Some(colon) => {
            host[..colon].bytes().all(|b| b.is_ascii_hexdigit())
                && host[colon + 1..]
                    .bytes()
                    .all(|b| b.is_ascii_hexdigit() || b == b':' || b == b'.')
        }
        None => false,
    }
}
