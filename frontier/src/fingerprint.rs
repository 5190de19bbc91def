//! Request fingerprinting.
//!
//! Two requests that differ only in url spelling (host case, default port,
//! query parameter order, fragment, a trailing slash on a non-root path) must
//! produce the same fingerprint, otherwise the duplicate filter lets both in.
//!
//! Canonicalization steps:
//! 1. Lower-case scheme and host, strip the scheme's default port.
//! 2. Stable-sort query parameters by their raw key; values of equal keys
//!    keep order. Empty parameters go, nothing is decoded or re-encoded.
//! 3. Drop the fragment.
//! 4. Strip one trailing slash from non-root paths. `/` stays.
//!
//! The fingerprint is the SHA-256 of method, canonical url and (for methods
//! that permit one) the body.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

use crate::{FrontierError, Request};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn canonicalize_url(raw: &str) -> Result<Url, FrontierError> {
    // The url parser already lower-cases scheme and host of http(s) urls and
    // drops a port equal to the scheme default.
    let mut url = Url::parse(raw.trim()).map_err(|e| FrontierError::invalid(raw, e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FrontierError::invalid(
            raw,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(FrontierError::invalid(raw, "missing host"));
    }

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let query = sort_query(query);
        url.set_query((!query.is_empty()).then_some(query.as_str()));
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path[..path.len() - 1].to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}

/// Reorder the raw query by key. Segments are compared and joined back as
/// they were written, escapes included, so no two distinct queries collapse.
fn sort_query(query: &str) -> String {
    let mut segments: Vec<&str> =
        query.split('&').filter(|segment| !segment.is_empty()).collect();
    segments.sort_by_key(|segment| segment.split('=').next().unwrap_or_default());
    segments.join("&")
}

pub fn fingerprint(request: &Request) -> Result<Fingerprint, FrontierError> {
    let url = canonicalize_url(request.url())?;

    let mut hasher = Sha256::new();
    hasher.update(request.method().as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    if request.method().permits_body() {
        if let Some(body) = request.body() {
            hasher.update(b"\n");
            hasher.update(body);
        }
    }

    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn fp(url: &str) -> Fingerprint {
        fingerprint(&Request::get(url)).unwrap()
    }

    fn canon(url: &str) -> String {
        canonicalize_url(url).unwrap().to_string()
    }

    #[test]
    fn test_query_order_and_host_case() {
        assert_eq!(
            fp("http://Example.com/a?b=2&a=1"),
            fp("http://example.com/a?a=1&b=2")
        );
        assert_eq!(canon("http://Example.com/a?b=2&a=1"), "http://example.com/a?a=1&b=2");
    }

    #[test]
    fn test_trailing_slash_on_non_root() {
        assert_eq!(fp("http://example.com/a/"), fp("http://example.com/a"));
        assert_eq!(canon("http://example.com/a/"), "http://example.com/a");
    }

    #[test]
    fn test_root_slash_preserved() {
        assert_eq!(canon("http://example.com/"), "http://example.com/");
        assert_eq!(canon("http://example.com"), "http://example.com/");
    }

    #[test]
    fn test_only_one_trailing_slash_stripped() {
        assert_eq!(canon("http://example.com/a//"), "http://example.com/a/");
    }

    #[test]
    fn test_default_port_and_scheme_case() {
        assert_eq!(canon("HTTP://example.com:80/x"), "http://example.com/x");
        assert_eq!(canon("https://example.com:443/x"), "https://example.com/x");
        assert_eq!(canon("http://example.com:8080/x"), "http://example.com:8080/x");
    }

    #[test]
    fn test_fragment_dropped() {
        assert_eq!(fp("http://example.com/a#top"), fp("http://example.com/a"));
    }

    #[test]
    fn test_repeated_keys_keep_value_order() {
        assert_eq!(
            canon("http://example.com/?b=1&a=2&a=1"),
            "http://example.com/?a=2&a=1&b=1"
        );
        assert_ne!(
            fp("http://example.com/?a=1&a=2"),
            fp("http://example.com/?a=2&a=1")
        );
    }

    #[test]
    fn test_empty_query_dropped() {
        assert_eq!(canon("http://example.com/a?"), "http://example.com/a");
        assert_eq!(canon("http://example.com/a?&"), "http://example.com/a");
        assert_eq!(canon("http://example.com/a?a=1&&b=2"), "http://example.com/a?a=1&b=2");
    }

    #[test]
    fn test_non_utf8_escapes_stay_distinct() {
        assert_eq!(
            canon("http://example.com/search?q=%E9"),
            "http://example.com/search?q=%E9"
        );
        assert_ne!(
            fp("http://example.com/search?q=%E9"),
            fp("http://example.com/search?q=%E8")
        );
    }

    #[test]
    fn test_key_without_value_kept_verbatim() {
        assert_eq!(canon("http://example.com/?b&a=1"), "http://example.com/?a=1&b");
        assert_ne!(fp("http://example.com/?b"), fp("http://example.com/?b="));
    }

    #[test]
    fn test_escaped_and_plain_spellings_not_merged() {
        assert_eq!(
            canon("http://example.com/?q=a+b&p=%2F"),
            "http://example.com/?p=%2F&q=a+b"
        );
    }

    #[test]
    fn test_path_case_is_significant() {
        assert_ne!(fp("http://example.com/A"), fp("http://example.com/a"));
    }

    #[test]
    fn test_method_and_body_participate() {
        let get = fingerprint(&Request::get("http://example.com/s")).unwrap();
        let post = fingerprint(&Request::new(Method::Post, "http://example.com/s")).unwrap();
        let post_q1 = fingerprint(
            &Request::new(Method::Post, "http://example.com/s").with_body("q=1"),
        )
        .unwrap();
        let post_q2 = fingerprint(
            &Request::new(Method::Post, "http://example.com/s").with_body("q=2"),
        )
        .unwrap();

        assert_ne!(get, post);
        assert_ne!(post, post_q1);
        assert_ne!(post_q1, post_q2);
    }

    #[test]
    fn test_body_ignored_for_get() {
        let plain = fingerprint(&Request::get("http://example.com/s")).unwrap();
        let with_body =
            fingerprint(&Request::get("http://example.com/s").with_body("ignored")).unwrap();
        assert_eq!(plain, with_body);
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fp("https://sofifa.com/teams/club/");
        let b = fp("https://sofifa.com/teams/club/");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_depth_and_time_do_not_matter() {
        let a = Request::get("https://sofifa.com/team/1");
        let b = Request::get("https://sofifa.com/team/1").with_depth(7);
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_malformed_urls_rejected() {
        for bad in ["", "not a url", "/relative/path", "mailto:x@example.com", "ftp://example.com/"] {
            let result = fingerprint(&Request::get(bad));
            assert!(
                matches!(result, Err(FrontierError::InvalidRequest { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }
}
