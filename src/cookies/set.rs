use std::collections::HashMap;

use url::Url;

use crate::cookies::cookie::Cookie;

/// Replacement identity of a cookie within a domain's set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    name: String,
    domain: String,
    path: String,
}

impl Key {
    fn of(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
        }
    }
}

/// Unordered per-domain cookie index keyed by `(name, domain, path)`.
#[derive(Debug, Default)]
pub struct CookieSet {
    map: HashMap<Key, Cookie>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by identity key. Returns the cookie it replaced.
    pub fn add(&mut self, cookie: Cookie) -> Option<Cookie> {
        self.map.insert(Key::of(&cookie), cookie)
    }

    /// Removes the cookie sharing `cookie`'s identity key, returning it.
    pub fn remove(&mut self, cookie: &Cookie) -> Option<Cookie> {
        self.map.remove(&Key::of(cookie))
    }

    /// Single pass over the set: entries past expiry are evicted into
    /// `expired` (callers owe the durable store a removal for persistent
    /// ones), live entries matching `url` go into `accepted`.
    pub fn query(&mut self, url: &Url, now: i64, accepted: &mut Vec<Cookie>, expired: &mut Vec<Cookie>) {
        self.map.retain(|_, cookie| {
            if cookie.expired(now) {
                expired.push(cookie.clone());
                false
            } else {
                if cookie.matches(url) {
                    accepted.push(cookie.clone());
                }
                true
            }
        });
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.map.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::cookie::MAX_DATE;

    fn cookie(name: &str, path: &str, expires_at: i64) -> Cookie {
        Cookie::builder()
            .name(name)
            .value("v")
            .domain("example.com")
            .path(path)
            .expires_at(expires_at)
            .build()
    }

    #[test]
    fn add_replaces_by_identity_key() {
        let mut set = CookieSet::new();
        let first = cookie("user", "/", MAX_DATE);
        let mut second = cookie("user", "/", MAX_DATE);
        second.value = "other".to_string();

        assert!(set.add(first.clone()).is_none());
        let replaced = set.add(second.clone());
        assert_eq!(replaced, Some(first));
        assert_eq!(set.len(), 1);

        // Different path is a different identity.
        set.add(cookie("user", "/sub", MAX_DATE));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_matches_identity_not_value() {
        let mut set = CookieSet::new();
        set.add(cookie("user", "/", MAX_DATE));

        let mut probe = cookie("user", "/", 123);
        probe.value = "anything".to_string();
        assert!(set.remove(&probe).is_some());
        assert!(set.is_empty());
    }

    #[test]
    fn query_evicts_expired_entries() {
        let mut set = CookieSet::new();
        set.add(cookie("live", "/", 2_000));
        set.add(cookie("dead", "/", 500));

        let url = Url::parse("http://example.com/").unwrap();
        let mut accepted = Vec::new();
        let mut expired = Vec::new();
        set.query(&url, 1_000, &mut accepted, &mut expired);

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].name, "live");
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].name, "dead");
        assert_eq!(set.len(), 1);

        // A second query finds nothing expired: eviction happened.
        expired.clear();
        accepted.clear();
        set.query(&url, 1_000, &mut accepted, &mut expired);
        assert!(expired.is_empty());
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn query_filters_by_url() {
        let mut set = CookieSet::new();
        set.add(cookie("root", "/", MAX_DATE));
        set.add(cookie("deep", "/account", MAX_DATE));

        let url = Url::parse("http://example.com/home").unwrap();
        let mut accepted = Vec::new();
        let mut expired = Vec::new();
        set.query(&url, 0, &mut accepted, &mut expired);

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].name, "root");
        assert_eq!(set.len(), 2);
    }
}
