//! JSON snapshots of a repository's cookies.
//!
//! For backups and for migrating a jar between stores. The snapshot is not
//! part of the durability path; the SQLite store is.

use crate::cookies::cookie::{now_millis, Cookie};
use crate::cookies::repository::CookieRepository;
use crate::error::Error;

/// Serializes every live cookie, session cookies included.
pub fn export_json(repository: &CookieRepository) -> Result<String, Error> {
    let cookies = repository.all_cookies();
    Ok(serde_json::to_string_pretty(&cookies)?)
}

/// Feeds a snapshot back into a repository, skipping entries that expired
/// since it was taken. Returns the number of cookies imported.
pub fn import_json(repository: &CookieRepository, json: &str) -> Result<usize, Error> {
    let cookies: Vec<Cookie> = serde_json::from_str(json)?;
    let now = now_millis();
    let mut count = 0;
    for cookie in cookies {
        if cookie.expired(now) {
            continue;
        }
        repository.add_cookie(cookie);
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cookies::cookie::MAX_DATE;
    use crate::settings::DefaultSettings;

    fn repository() -> CookieRepository {
        CookieRepository::open_in_memory(Arc::new(DefaultSettings)).unwrap()
    }

    #[test]
    fn snapshot_round_trips_between_repositories() {
        let source = repository();
        source.add_cookie(
            Cookie::builder()
                .name("user")
                .value("1234567890")
                .domain("example.com")
                .expires_at(MAX_DATE)
                .build(),
        );
        source.add_cookie(
            Cookie::builder()
                .name("session")
                .value("abc")
                .host_only_domain("www.example.com")
                .build(),
        );

        let json = export_json(&source).unwrap();

        let target = repository();
        let count = import_json(&target, &json).unwrap();
        assert_eq!(count, 2);

        let mut imported = target.all_cookies();
        let mut original = source.all_cookies();
        imported.sort_by(|a, b| a.name.cmp(&b.name));
        original.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(imported, original);
    }

    #[test]
    fn import_skips_expired_entries() {
        let source = repository();
        source.add_cookie(
            Cookie::builder()
                .name("gone")
                .value("v")
                .domain("example.com")
                .expires_at(now_millis() + 20)
                .build(),
        );

        let json = export_json(&source).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        let target = repository();
        assert_eq!(import_json(&target, &json).unwrap(), 0);
        assert!(target.all_cookies().is_empty());
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let target = repository();
        assert!(import_json(&target, "not json").is_err());
    }
}
