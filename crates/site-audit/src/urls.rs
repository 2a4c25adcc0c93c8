// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! URL helpers shared by discovery and analysis: origin, registrable-domain
//! scoping, the normalization policy and the asset-extension filter.

use crate::error::{AuditError, Result};
use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;
use url::Url;

/// Parse a user-supplied URL. A bare host gets `https://` prepended.
pub fn parse_target(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| AuditError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !is_http(&url) {
        return Err(AuditError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none() {
        return Err(AuditError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Scheme + host (+ explicit port), no trailing slash.
pub fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Approximate site identity: the last two dot-separated host labels.
///
/// Multi-label public suffixes (`co.uk`, `com.au`) collapse to the suffix
/// itself, so `a.co.uk` and `b.co.uk` compare equal. IP hosts compare whole.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }
    labels[labels.len() - 2..].join(".")
}

/// True when `url` belongs to the site identified by `domain`.
pub fn same_site(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|h| registrable_domain(h) == domain)
        .unwrap_or(false)
}

/// Which URL parts survive normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizePolicy {
    pub keep_query: bool,
    pub keep_hash: bool,
}

impl NormalizePolicy {
    /// Normalize an absolute URL for deduplication.
    pub fn normalize(&self, url: &Url) -> Url {
        let mut out = url.clone();
        if !self.keep_hash || out.fragment() == Some("") {
            out.set_fragment(None);
        }
        if !self.keep_query || out.query() == Some("") {
            out.set_query(None);
        }
        out
    }

    /// Parse then normalize; `None` for unparsable or non-http(s) input.
    pub fn normalize_str(&self, raw: &str) -> Option<String> {
        let url = Url::parse(raw.trim()).ok()?;
        if !is_http(&url) {
            return None;
        }
        Some(self.normalize(&url).to_string())
    }
}

fn asset_regex() -> &'static Regex {
    static ASSET_RE: OnceLock<Regex> = OnceLock::new();
    ASSET_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\.(jpe?g|png|gif|webp|svg|ico|bmp|avif|tiff?|zip|rar|7z|tar|gz|tgz|bz2|xz|mp3|mp4|m4a|m4v|wav|ogg|webm|avi|mov|mkv|flac|woff2?|ttf|otf|eot|xml|pdf)$",
        )
        .expect("asset pattern is valid")
    })
}

/// True when the path ends in an image, archive, media, font, XML or PDF
/// extension. Such resources are never analyzable pages.
pub fn is_asset_path(path: &str) -> bool {
    asset_regex().is_match(path)
}

pub fn is_asset_url(url: &Url) -> bool {
    is_asset_path(url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_adds_scheme() {
        let url = parse_target("example.com/shop").unwrap();
        assert_eq!(url.as_str(), "https://example.com/shop");
        assert!(parse_target("ftp://example.com").is_err());
        assert!(parse_target("http://").is_err());
    }

    #[test]
    fn test_origin() {
        let url = Url::parse("https://www.example.com:8443/a/b?c=d").unwrap();
        assert_eq!(origin(&url), "https://www.example.com:8443");
        let url = Url::parse("http://example.com/").unwrap();
        assert_eq!(origin(&url), "http://example.com");
    }

    #[test]
    fn test_registrable_domain_two_labels() {
        assert_eq!(registrable_domain("www.example.com"), "example.com");
        assert_eq!(registrable_domain("shop.eu.example.com"), "example.com");
        assert_eq!(registrable_domain("example.com."), "example.com");
        assert_eq!(registrable_domain("localhost"), "localhost");
        // Known approximation: the public suffix itself becomes the identity.
        assert_eq!(registrable_domain("shop.example.co.uk"), "co.uk");
    }

    #[test]
    fn test_registrable_domain_ip() {
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(registrable_domain("[::1]"), "[::1]");
    }

    #[test]
    fn test_same_site() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert!(same_site(&url, "example.com"));
        let other = Url::parse("https://example.org/").unwrap();
        assert!(!same_site(&other, "example.com"));
    }

    #[test]
    fn test_normalize_policy() {
        let url = Url::parse("https://example.com/a?x=1#top").unwrap();
        let strip = NormalizePolicy::default();
        assert_eq!(strip.normalize(&url).as_str(), "https://example.com/a");

        let keep = NormalizePolicy {
            keep_query: true,
            keep_hash: true,
        };
        assert_eq!(keep.normalize(&url).as_str(), "https://example.com/a?x=1#top");

        let empty = Url::parse("https://example.com/a?#").unwrap();
        assert_eq!(keep.normalize(&empty).as_str(), "https://example.com/a");
    }

    #[test]
    fn test_asset_paths() {
        assert!(is_asset_path("/media/hero.JPG"));
        assert!(is_asset_path("/downloads/price-list.pdf"));
        assert!(is_asset_path("/sitemap-pages.xml"));
        assert!(is_asset_path("/fonts/inter.woff2"));
        assert!(!is_asset_path("/produkte/"));
        assert!(!is_asset_path("/blog/pdf-guide"));
    }
}
