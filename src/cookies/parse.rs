//! `Set-Cookie` header parsing.
//!
//! Turns a raw header value into a [`Cookie`] scoped to the response URL,
//! rejecting domains the response host may not set cookies on (unrelated
//! domains and public suffixes, the supercookie case).

use psl::{List, Psl};
use time::OffsetDateTime;
use url::Url;

use crate::cookies::cookie::{Cookie, MAX_DATE};
use crate::cookies::repository::domain_match;

/// Parses one `Set-Cookie` value received from `url`.
///
/// Returns `None` for unparseable headers and for disallowed `Domain`
/// attributes. `Max-Age` wins over `Expires`; a header with neither yields a
/// session cookie.
pub fn parse_set_cookie(url: &Url, header: &str) -> Option<Cookie> {
    let parsed = cookie::Cookie::parse(header.trim()).ok()?;
    let host = url.host_str()?.to_lowercase();

    let (domain, host_only) = match parsed.domain() {
        Some(domain) => {
            let domain = domain.trim_start_matches('.').to_lowercase();
            if !allowed_cookie_domain(&domain, &host) {
                tracing::debug!(%domain, %host, "rejecting cookie domain");
                return None;
            }
            (domain, false)
        }
        None => (host.clone(), true),
    };

    let now = OffsetDateTime::now_utc();
    let expires_at = if let Some(max_age) = parsed.max_age() {
        Some(now.checked_add(max_age).map(to_millis).unwrap_or(MAX_DATE))
    } else {
        parsed.expires_datetime().map(to_millis)
    };

    let mut builder = Cookie::builder().name(parsed.name()).value(parsed.value());
    builder = if host_only {
        builder.host_only_domain(&domain)
    } else {
        builder.domain(&domain)
    };
    builder = builder.path(parsed.path().unwrap_or("/"));
    if let Some(expires_at) = expires_at {
        builder = builder.expires_at(expires_at);
    }
    if parsed.secure().unwrap_or(false) {
        builder = builder.secure();
    }
    if parsed.http_only().unwrap_or(false) {
        builder = builder.http_only();
    }
    Some(builder.build())
}

fn to_millis(time: OffsetDateTime) -> i64 {
    (time.unix_timestamp_nanos() / 1_000_000) as i64
}

/// A response host may set a cookie on a domain that covers it, as long as
/// the domain is not a public suffix.
fn allowed_cookie_domain(domain: &str, host: &str) -> bool {
    if List
        .suffix(domain.as_bytes())
        .is_some_and(|suffix| suffix.as_bytes() == domain.as_bytes())
    {
        return false;
    }
    domain_match(host, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn bare_header_is_a_host_only_session_cookie() {
        let cookie = parse_set_cookie(&url("https://www.example.com/"), "user=1").unwrap();
        assert_eq!(cookie.name, "user");
        assert_eq!(cookie.value, "1");
        assert_eq!(cookie.domain, "www.example.com");
        assert!(cookie.host_only);
        assert!(!cookie.persistent);
        assert_eq!(cookie.expires_at, MAX_DATE);
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn domain_attribute_widens_to_suffix_match() {
        let cookie = parse_set_cookie(
            &url("https://www.example.com/"),
            "user=1; Domain=.Example.com; Path=/account; Secure; HttpOnly",
        )
        .unwrap();
        assert_eq!(cookie.domain, "example.com");
        assert!(!cookie.host_only);
        assert_eq!(cookie.path, "/account");
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn max_age_makes_the_cookie_persistent() {
        let before = OffsetDateTime::now_utc().unix_timestamp() * 1_000;
        let cookie =
            parse_set_cookie(&url("https://example.com/"), "user=1; Max-Age=3600").unwrap();
        assert!(cookie.persistent);
        assert!(cookie.expires_at >= before + 3_600_000);
        assert!(cookie.expires_at < before + 3_700_000);
    }

    #[test]
    fn public_suffix_domain_is_rejected() {
        assert!(parse_set_cookie(&url("https://example.com/"), "a=b; Domain=com").is_none());
        assert!(
            parse_set_cookie(&url("https://example.co.uk/"), "a=b; Domain=co.uk").is_none()
        );
    }

    #[test]
    fn unrelated_domain_is_rejected() {
        assert!(
            parse_set_cookie(&url("https://example.com/"), "a=b; Domain=other.com").is_none()
        );
        // Sibling subdomain cannot claim the other's host.
        assert!(
            parse_set_cookie(&url("https://a.example.com/"), "a=b; Domain=b.example.com")
                .is_none()
        );
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_set_cookie(&url("https://example.com/"), "").is_none());
        assert!(parse_set_cookie(&url("https://example.com/"), "no-equals-sign").is_none());
    }
}
