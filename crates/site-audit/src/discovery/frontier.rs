// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded, domain-scoped breadth-first crawl.
//!
//! Links are followed only within the registrable domain of the start URL.
//! The output is capped at `max_pages`; the seen-set (everything ever
//! enqueued) is capped at `max_pages * 6`.

use crate::acquisition::HttpClient;
use crate::config::{CompiledPatterns, PipelineSettings};
use crate::renderer::http::absolute_hrefs;
use crate::renderer::{BrowserLauncher, NavigateOptions, Renderer};
use crate::urls::{is_asset_url, is_http, registrable_domain, same_site, NormalizePolicy};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Multiplier for the seen-set cap relative to `max_pages`.
pub const SEEN_CAP_FACTOR: usize = 6;

/// Parameters of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub start: Url,
    pub seeds: Vec<String>,
    pub max_pages: usize,
    /// Extract links from rendered pages instead of static HTML.
    pub render: bool,
    pub policy: NormalizePolicy,
    pub patterns: CompiledPatterns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOutput {
    /// Discovered URLs in BFS order, seeds included.
    pub urls: Vec<String>,
    /// Pages whose links were extracted.
    pub visited: usize,
    /// Final size of the seen-set.
    pub seen: usize,
}

/// Link admission rules for one crawl.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    domain: String,
    policy: NormalizePolicy,
    patterns: CompiledPatterns,
}

impl LinkFilter {
    pub fn new(start: &Url, policy: NormalizePolicy, patterns: CompiledPatterns) -> Self {
        Self {
            domain: registrable_domain(start.host_str().unwrap_or_default()),
            policy,
            patterns,
        }
    }

    /// Resolve `href` against `base` and return the normalized URL if it
    /// may be crawled.
    pub fn admit(&self, href: &str, base: &Url) -> Option<String> {
        let url = base.join(href.trim()).ok()?;
        if !is_http(&url) || !same_site(&url, &self.domain) {
            return None;
        }
        let url = self.policy.normalize(&url);
        if is_asset_url(&url) {
            return None;
        }
        let url = url.to_string();
        self.patterns.allows(&url).then_some(url)
    }
}

/// BFS bookkeeping: queue, seen-set and output list with their caps.
struct Frontier {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    output: Vec<String>,
    max_pages: usize,
    seen_cap: usize,
}

impl Frontier {
    fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            output: Vec::new(),
            max_pages,
            seen_cap: max_pages.saturating_mul(SEEN_CAP_FACTOR),
        }
    }

    fn full(&self) -> bool {
        self.output.len() >= self.max_pages
    }

    /// Record a new URL as seen and enqueue it; it joins the output while
    /// the output cap allows.
    fn push(&mut self, url: String) -> bool {
        if self.seen.len() >= self.seen_cap || self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.queue.push_back(url.clone());
        if !self.full() {
            self.output.push(url);
        }
        true
    }
}

#[derive(Clone)]
pub struct CrawlFrontier {
    http: HttpClient,
    launcher: Arc<dyn BrowserLauncher>,
    settings: PipelineSettings,
}

impl CrawlFrontier {
    pub fn new(
        http: HttpClient,
        launcher: Arc<dyn BrowserLauncher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            http,
            launcher,
            settings,
        }
    }

    pub async fn crawl(&self, request: CrawlRequest, cancel: &CancellationToken) -> CrawlOutput {
        let filter = LinkFilter::new(&request.start, request.policy, request.patterns.clone());
        let mut frontier = Frontier::new(request.max_pages);

        frontier.push(request.policy.normalize(&request.start).to_string());
        for seed in &request.seeds {
            match filter.admit(seed, &request.start) {
                Some(url) => {
                    frontier.push(url);
                }
                None => debug!("seed {seed} rejected by crawl filter"),
            }
        }

        let renderer = if request.render {
            match self.launcher.launch().await {
                Ok(renderer) => {
                    debug!("crawling with the {} renderer", self.launcher.name());
                    Some(renderer)
                }
                Err(e) => {
                    warn!("{} renderer unavailable, crawling static HTML: {e:#}", self.launcher.name());
                    None
                }
            }
        } else {
            None
        };

        let mut visited = 0usize;
        while let Some(current) = frontier.queue.pop_front() {
            if frontier.full() {
                break;
            }
            if cancel.is_cancelled() {
                debug!("crawl cancelled after {visited} pages");
                break;
            }

            let Ok(base) = Url::parse(&current) else {
                continue;
            };
            let (base, hrefs) = match &renderer {
                Some(renderer) => self.rendered_links(renderer.as_ref(), &base).await,
                None => self.static_links(&base).await,
            };
            visited += 1;

            for href in hrefs {
                if let Some(url) = filter.admit(&href, &base) {
                    frontier.push(url);
                }
            }
        }

        if let Some(renderer) = renderer {
            if let Err(e) = renderer.shutdown().await {
                warn!("renderer shutdown failed: {e:#}");
            }
        }

        info!(
            "crawl of {} finished: {} URLs, {visited} visited, {} seen",
            request.start,
            frontier.output.len(),
            frontier.seen.len()
        );

        CrawlOutput {
            urls: frontier.output,
            visited,
            seen: frontier.seen.len(),
        }
    }

    /// Static extraction. Non-HTML and failed fetches yield no links.
    async fn static_links(&self, url: &Url) -> (Url, Vec<String>) {
        match self.http.get(url.as_str()).await {
            Ok(page) if page.is_success() && page.is_html() => {
                let base = Url::parse(&page.final_url).unwrap_or_else(|_| url.clone());
                let hrefs = absolute_hrefs(&page.body, base.as_str());
                (base, hrefs)
            }
            Ok(page) => {
                debug!("not following {url}: status {}", page.status);
                (url.clone(), Vec::new())
            }
            Err(e) => {
                debug!("crawl fetch of {url} failed: {e:#}");
                (url.clone(), Vec::new())
            }
        }
    }

    /// Rendered extraction in a short-lived context, closed on every path.
    async fn rendered_links(&self, renderer: &dyn Renderer, url: &Url) -> (Url, Vec<String>) {
        let mut context = match renderer.new_context().await {
            Ok(context) => context,
            Err(e) => {
                debug!("no render context for {url}: {e:#}");
                return (url.clone(), Vec::new());
            }
        };

        let options = NavigateOptions {
            timeout_ms: self.settings.nav_timeout_ms,
            response_cap: self.settings.response_cap,
        };
        let result = match context.navigate(url.as_str(), &options).await {
            Ok(nav) => {
                let base = Url::parse(&nav.final_url).unwrap_or_else(|_| url.clone());
                match context.anchor_hrefs().await {
                    Ok(hrefs) => (base, hrefs),
                    Err(e) => {
                        debug!("anchor extraction on {url} failed: {e:#}");
                        (base, Vec::new())
                    }
                }
            }
            Err(e) => {
                debug!("crawl navigation to {url} failed: {e:#}");
                (url.clone(), Vec::new())
            }
        };

        if let Err(e) = context.close().await {
            warn!("failed to close render context for {url}: {e:#}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditOptions;

    fn filter(policy: NormalizePolicy) -> LinkFilter {
        let start = Url::parse("https://www.example.com/").unwrap();
        LinkFilter::new(&start, policy, AuditOptions::default().validate().unwrap())
    }

    #[test]
    fn test_admit_resolves_and_scopes() {
        let f = filter(NormalizePolicy::default());
        let base = Url::parse("https://www.example.com/leistungen/").unwrap();

        assert_eq!(
            f.admit("beratung", &base).as_deref(),
            Some("https://www.example.com/leistungen/beratung")
        );
        assert_eq!(
            f.admit("https://shop.example.com/a", &base).as_deref(),
            Some("https://shop.example.com/a")
        );
        assert!(f.admit("https://example.org/", &base).is_none());
        assert!(f.admit("mailto:info@example.com", &base).is_none());
        assert!(f.admit("javascript:void(0)", &base).is_none());
        assert!(f.admit("/bild.JPG", &base).is_none());
        assert!(f.admit("/wp-admin/edit.php", &base).is_none());
    }

    #[test]
    fn test_admit_applies_normalization_policy() {
        let base = Url::parse("https://www.example.com/").unwrap();

        let strip = filter(NormalizePolicy::default());
        assert_eq!(
            strip.admit("/a?x=1#top", &base).as_deref(),
            Some("https://www.example.com/a")
        );

        let keep = filter(NormalizePolicy {
            keep_query: true,
            keep_hash: true,
        });
        assert_eq!(
            keep.admit("/a?x=1#top", &base).as_deref(),
            Some("https://www.example.com/a?x=1#top")
        );
    }

    #[test]
    fn test_frontier_caps() {
        let mut frontier = Frontier::new(2);
        assert!(frontier.push("https://example.com/".to_string()));
        assert!(!frontier.push("https://example.com/".to_string()));
        assert!(frontier.push("https://example.com/a".to_string()));
        assert!(frontier.full());
        assert!(frontier.push("https://example.com/b".to_string()));
        assert_eq!(frontier.output.len(), 2);

        for i in 0..50 {
            frontier.push(format!("https://example.com/p{i}"));
        }
        assert_eq!(frontier.seen.len(), 2 * SEEN_CAP_FACTOR);
        assert_eq!(frontier.output.len(), 2);
    }
}
