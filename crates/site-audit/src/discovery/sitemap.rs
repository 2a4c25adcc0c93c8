// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sitemap discovery: robots.txt, sitemap index trees and urlsets.

use crate::acquisition::{parse_robots, HttpClient};
use crate::urls::is_asset_url;
use anyhow::{bail, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on sitemap documents fetched per resolution.
pub const MAX_SITEMAP_DOCUMENTS: usize = 50;

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: child sitemap locations.
    Index(Vec<String>),
    /// `<urlset>`: page locations.
    UrlSet(Vec<String>),
}

/// Parse a sitemap or sitemap index.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut root: Option<String> = None;
    let mut depth = 0usize;
    // Depth of the open <url>/<sitemap> entry; only its direct <loc> child
    // counts (extensions such as <image:loc> sit deeper).
    let mut entry_depth: Option<usize> = None;
    let mut in_loc = false;
    let mut current_loc = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if root.is_none() {
                    root = Some(name.clone());
                }
                match (name.as_str(), entry_depth) {
                    ("url" | "sitemap", None) => {
                        entry_depth = Some(depth);
                        current_loc.clear();
                    }
                    ("loc", Some(d)) if depth == d + 1 => in_loc = true,
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                if entry_depth == Some(depth) {
                    if !current_loc.is_empty() {
                        locs.push(std::mem::take(&mut current_loc));
                    }
                    entry_depth = None;
                }
                in_loc = false;
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                if in_loc {
                    current_loc = e.unescape().unwrap_or_default().trim().to_string();
                }
            }
            Ok(Event::CData(e)) => {
                if in_loc {
                    current_loc = String::from_utf8_lossy(&e.into_inner()).trim().to_string();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("XML parse error: {e}"),
            _ => {}
        }
        buf.clear();
    }

    match root.as_deref() {
        Some("sitemapindex") => Ok(SitemapDocument::Index(locs)),
        Some("urlset") => Ok(SitemapDocument::UrlSet(locs)),
        Some(other) => bail!("unexpected sitemap root element <{other}>"),
        None => bail!("empty sitemap document"),
    }
}

/// Outcome of a sitemap resolution for one origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitemapReport {
    /// Whether sitemap documents were requested at all (cap > 0).
    pub expanded: bool,
    /// Page URLs found, deduplicated, in discovery order.
    pub found: Vec<String>,
    /// Sitemap documents requested, in order.
    pub tried: Vec<String>,
    pub robots_reachable: bool,
    pub disallow: Vec<String>,
    /// At least one `Sitemap:` line was present in robots.txt.
    pub listed_in_robots: bool,
    /// robots.txt contains `Disallow: /`.
    pub broad_block: bool,
}

/// Expands the sitemap tree of an origin.
#[derive(Clone)]
pub struct SitemapResolver {
    http: HttpClient,
}

impl SitemapResolver {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Resolve `origin` (scheme + host, no trailing slash), collecting at
    /// most `cap` page URLs. Every sitemap URL is fetched at most once.
    /// With `cap == 0` only robots.txt is read.
    pub async fn resolve(
        &self,
        origin: &str,
        cap: usize,
        cancel: &CancellationToken,
    ) -> SitemapReport {
        let mut report = SitemapReport {
            expanded: cap > 0,
            ..SitemapReport::default()
        };
        let mut candidates: VecDeque<String> = VecDeque::new();

        let robots_url = format!("{origin}/robots.txt");
        match self.http.get(&robots_url).await {
            Ok(resp) if resp.is_success() => {
                let robots = parse_robots(&resp.body);
                report.robots_reachable = true;
                report.broad_block = robots.broad_block();
                report.listed_in_robots = !robots.sitemaps.is_empty();
                report.disallow = robots.disallow;
                candidates.extend(robots.sitemaps);
            }
            Ok(resp) => debug!("robots.txt at {robots_url} returned {}", resp.status),
            Err(e) => debug!("robots.txt at {robots_url} unreachable: {e:#}"),
        }

        if candidates.is_empty() {
            candidates.push_back(format!("{origin}/sitemap.xml"));
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut found: HashSet<String> = HashSet::new();

        while let Some(sitemap_url) = candidates.pop_front() {
            if report.found.len() >= cap || visited.len() >= MAX_SITEMAP_DOCUMENTS {
                break;
            }
            if cancel.is_cancelled() {
                debug!("sitemap resolution cancelled");
                break;
            }
            if !visited.insert(sitemap_url.clone()) {
                continue;
            }
            report.tried.push(sitemap_url.clone());

            let body = match self.http.get(&sitemap_url).await {
                Ok(resp) if resp.is_success() => resp.body,
                Ok(resp) => {
                    debug!("sitemap {sitemap_url} returned {}", resp.status);
                    continue;
                }
                Err(e) => {
                    debug!("sitemap {sitemap_url} failed: {e:#}");
                    continue;
                }
            };

            match parse_sitemap(&body) {
                Ok(SitemapDocument::Index(children)) => {
                    candidates.extend(children.into_iter().filter(|c| !visited.contains(c)));
                }
                Ok(SitemapDocument::UrlSet(urls)) => {
                    for raw in urls {
                        if report.found.len() >= cap {
                            break;
                        }
                        let Ok(url) = Url::parse(&raw) else {
                            continue;
                        };
                        if !crate::urls::is_http(&url) || is_asset_url(&url) {
                            continue;
                        }
                        let url = url.to_string();
                        if found.insert(url.clone()) {
                            report.found.push(url);
                        }
                    }
                }
                Err(e) => warn!("skipping malformed sitemap {sitemap_url}: {e:#}"),
            }
        }

        info!(
            "sitemap resolution for {origin}: {} URLs from {} documents",
            report.found.len(),
            report.tried.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/</loc>
            <priority>1.0</priority>
          </url>
          <url>
            <loc>https://example.com/about</loc>
            <lastmod>2024-01-15</lastmod>
          </url>
          <url><loc><![CDATA[https://example.com/blog?a=1&b=2]]></loc></url>
        </urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(
            doc,
            SitemapDocument::UrlSet(vec![
                "https://example.com/".to_string(),
                "https://example.com/about".to_string(),
                "https://example.com/blog?a=1&b=2".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sitemap><loc>https://example.com/sitemap-pages.xml</loc></sitemap>
          <sitemap><loc>https://example.com/sitemap-posts.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
        </sitemapindex>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(
            doc,
            SitemapDocument::Index(vec![
                "https://example.com/sitemap-pages.xml".to_string(),
                "https://example.com/sitemap-posts.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_entities_in_loc() {
        let xml = "<urlset><url><loc>https://example.com/?a=1&amp;b=2</loc></url></urlset>";
        assert_eq!(
            parse_sitemap(xml).unwrap(),
            SitemapDocument::UrlSet(vec!["https://example.com/?a=1&b=2".to_string()])
        );
    }

    #[test]
    fn test_parse_image_extension_keeps_page_loc() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
          <url>
            <loc>https://example.com/leistungen</loc>
            <image:image>
              <image:loc>https://example.com/wp-content/hero.jpg</image:loc>
            </image:image>
          </url>
          <url>
            <image:image><image:loc>https://example.com/a.png</image:loc></image:image>
            <loc>https://example.com/kontakt</loc>
          </url>
        </urlset>"#;

        assert_eq!(
            parse_sitemap(xml).unwrap(),
            SitemapDocument::UrlSet(vec![
                "https://example.com/leistungen".to_string(),
                "https://example.com/kontakt".to_string(),
            ])
        );
    }

    #[test]
    fn test_malformed_and_foreign_documents_error() {
        assert!(parse_sitemap("<urlset><url><loc>x</lo></url></urlset>").is_err());
        assert!(parse_sitemap("<html><body>Not found</body></html>").is_err());
        assert!(parse_sitemap("").is_err());
    }
}
