use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

/// Expiry sentinel for cookies that never expire on their own:
/// 9999-12-31T23:59:59.999Z in epoch milliseconds. Session cookies carry it
/// too, distinguished by `persistent == false`.
pub const MAX_DATE: i64 = 253_402_300_799_999;

/// Current wall-clock time in epoch milliseconds, the time base every expiry
/// in this crate is compared against.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// A single HTTP cookie.
///
/// Two cookies with the same `(name, domain, path)` replace each other in the
/// jar. Full-field value equality (the derived `Eq`/`Hash`) is the identity
/// the durable store uses to map a cookie to its row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Lowercase host or domain suffix, no leading dot.
    pub domain: String,
    pub path: String,
    /// Absolute expiry, epoch milliseconds. [`MAX_DATE`] means "forever".
    pub expires_at: i64,
    pub secure: bool,
    pub http_only: bool,
    /// True: `domain` matches the exact host only. False: subdomains match too.
    pub host_only: bool,
    /// True: survives restarts via the durable store. Session cookies are
    /// memory-only.
    pub persistent: bool,
}

impl Cookie {
    pub fn builder() -> CookieBuilder {
        CookieBuilder::default()
    }

    pub fn expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Whether this cookie should be sent on a request to `url`.
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        let domain_ok = if self.host_only {
            host.eq_ignore_ascii_case(&self.domain)
        } else {
            crate::cookies::repository::domain_match(host, &self.domain)
        };
        domain_ok && path_match(&self.path, url.path()) && (!self.secure || url.scheme() == "https")
    }

    /// Copies this cookie onto another domain.
    ///
    /// `force_persistent` makes a session cookie durable, `force_long_live`
    /// stretches the expiry to [`MAX_DATE`], and `force_not_host_only` widens
    /// a host-only cookie to subdomain matching. Used when mirroring a
    /// session across sibling hosts.
    pub fn retarget(
        &self,
        new_domain: &str,
        force_persistent: bool,
        force_long_live: bool,
        force_not_host_only: bool,
    ) -> Cookie {
        let mut builder = Cookie::builder().name(&self.name).value(&self.value);

        if force_long_live {
            builder = builder.expires_at(MAX_DATE);
        } else if self.persistent {
            builder = builder.expires_at(self.expires_at);
        } else if force_persistent {
            builder = builder.expires_at(MAX_DATE);
        }

        if self.host_only && !force_not_host_only {
            builder = builder.host_only_domain(new_domain);
        } else {
            builder = builder.domain(new_domain);
        }

        builder = builder.path(&self.path);
        if self.secure {
            builder = builder.secure();
        }
        if self.http_only {
            builder = builder.http_only();
        }
        builder.build()
    }
}

/// RFC 6265 path matching: exact, or prefix ending at a `/` boundary.
fn path_match(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    if request_path.starts_with(cookie_path) {
        if cookie_path.ends_with('/') {
            return true;
        }
        return request_path[cookie_path.len()..].starts_with('/');
    }
    false
}

/// Builder for [`Cookie`].
///
/// A cookie built without [`expires_at`](Self::expires_at) is a session
/// cookie: it carries the [`MAX_DATE`] sentinel and is never persisted.
#[derive(Debug, Default)]
pub struct CookieBuilder {
    name: String,
    value: String,
    domain: String,
    path: Option<String>,
    expires_at: Option<i64>,
    secure: bool,
    http_only: bool,
    host_only: bool,
}

impl CookieBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Domain the cookie is scoped to, subdomains included.
    pub fn domain(mut self, domain: impl AsRef<str>) -> Self {
        self.domain = domain.as_ref().trim_start_matches('.').to_lowercase();
        self.host_only = false;
        self
    }

    /// Domain the cookie is scoped to, exact host only.
    pub fn host_only_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.domain = domain.as_ref().trim_start_matches('.').to_lowercase();
        self.host_only = true;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Absolute expiry in epoch milliseconds. Marks the cookie persistent.
    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at.min(MAX_DATE));
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn build(self) -> Cookie {
        Cookie {
            name: self.name,
            value: self.value,
            domain: self.domain,
            path: self.path.unwrap_or_else(|| "/".to_string()),
            expires_at: self.expires_at.unwrap_or(MAX_DATE),
            secure: self.secure,
            http_only: self.http_only,
            host_only: self.host_only,
            persistent: self.expires_at.is_some(),
        }
    }
}
