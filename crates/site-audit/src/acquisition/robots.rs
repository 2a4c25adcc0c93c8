// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! robots.txt parsing: `Sitemap:` and `Disallow:` directives only.
//!
//! Directives are collected across all user-agent groups; the audit reports
//! what a site declares, it does not evaluate per-agent access.

use serde::{Deserialize, Serialize};

/// Directives relevant to the audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsTxt {
    pub sitemaps: Vec<String>,
    pub disallow: Vec<String>,
}

impl RobotsTxt {
    /// `Disallow: /` blocks the whole site for the group it appears in.
    pub fn broad_block(&self) -> bool {
        self.disallow.iter().any(|d| d == "/")
    }
}

/// Parse robots.txt: case-insensitive keys, first colon splits key from
/// value, blank lines and `#` comments ignored. Empty `Disallow:` values
/// (allow everything) are dropped.
pub fn parse_robots(body: &str) -> RobotsTxt {
    let mut robots = RobotsTxt::default();

    for raw in body.lines() {
        let line = match raw.find('#') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim().to_ascii_lowercase().as_str() {
            "sitemap" => {
                if !robots.sitemaps.iter().any(|s| s == value) {
                    robots.sitemaps.push(value.to_string());
                }
            }
            "disallow" => robots.disallow.push(value.to_string()),
            _ => {}
        }
    }

    robots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sitemaps_and_disallow() {
        let body = "User-agent: *\n\
                    Disallow: /intern/\n\
                    Disallow:\n\
                    # Sitemap: https://example.com/commented.xml\n\
                    \n\
                    SITEMAP: https://example.com/sitemap_index.xml\n\
                    sitemap:https://example.com/news.xml # trailing comment\n";
        let robots = parse_robots(body);
        assert_eq!(
            robots.sitemaps,
            vec![
                "https://example.com/sitemap_index.xml".to_string(),
                "https://example.com/news.xml".to_string()
            ]
        );
        assert_eq!(robots.disallow, vec!["/intern/".to_string()]);
        assert!(!robots.broad_block());
    }

    #[test]
    fn test_first_colon_splits() {
        // The URL keeps its own colon.
        let robots = parse_robots("Sitemap: https://example.com:8080/s.xml");
        assert_eq!(robots.sitemaps, vec!["https://example.com:8080/s.xml".to_string()]);
    }

    #[test]
    fn test_broad_block() {
        let robots = parse_robots("User-agent: *\nDisallow: /\n");
        assert!(robots.broad_block());
        assert!(robots.sitemaps.is_empty());
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let robots = parse_robots("this is not robots\n\x00\x01\n:::\n");
        assert_eq!(robots, RobotsTxt::default());
    }
}
