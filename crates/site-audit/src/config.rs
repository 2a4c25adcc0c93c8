// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run options and operational settings.
//!
//! [`AuditOptions`] is what a caller submits with a job (JSON-loadable, every
//! field defaulted). [`PipelineSettings`] holds timeouts and budgets that an
//! operator tunes through `SITE_AUDIT_*` environment variables.

use crate::error::{AuditError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Exclude pattern applied when the caller gives none: asset paths and
/// directories that never hold auditable content.
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"(?i)(\.(jpe?g|png|gif|webp|svg|ico|bmp|avif|tiff?|zip|rar|7z|tar|gz|tgz|bz2|mp3|mp4|m4a|wav|ogg|webm|avi|mov|mkv|woff2?|ttf|otf|eot|xml|pdf|css|js)$)|/(wp-admin|wp-json|cart|checkout|login|feed|cdn-cgi)(/|$)|/tag/";

/// Upper bound for `max_pages`; larger crawls are outside the sampling model.
pub const MAX_PAGES_LIMIT: usize = 5000;

/// Options for one discovery-and-analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditOptions {
    /// Expand the sitemap tree of the origin.
    pub include_sitemap: bool,
    /// Light-analyze a sample of sitemap URLs.
    pub sample_sitemap: bool,
    /// Maximum sitemap URLs in the light sample.
    pub sample_max: usize,
    /// Run the crawl frontier.
    pub crawl: bool,
    /// Extract crawl links from rendered pages instead of static HTML.
    pub crawl_render: bool,
    /// Cap on crawl output.
    pub max_pages: usize,
    /// Keep query strings when normalizing discovered URLs.
    pub keep_query: bool,
    /// Keep hash fragments when normalizing discovered URLs.
    pub keep_hash: bool,
    /// Manual seed URLs added to the crawl.
    pub extra_seeds: Vec<String>,
    /// Every pattern must match a crawled URL (vacuous when empty).
    pub include_patterns: Vec<String>,
    /// No pattern may match a crawled URL.
    pub exclude_patterns: Vec<String>,
    /// Probe conventional paths (contact, legal, FAQ, ...) as extra seeds.
    pub guess_common_paths: bool,
    /// How many discovered URLs get a rendered deep analysis.
    pub deep_cap: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            include_sitemap: true,
            sample_sitemap: true,
            sample_max: 50,
            crawl: true,
            crawl_render: false,
            max_pages: 100,
            keep_query: false,
            keep_hash: false,
            extra_seeds: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: vec![DEFAULT_EXCLUDE_PATTERN.to_string()],
            guess_common_paths: true,
            deep_cap: 5,
        }
    }
}

/// Include/exclude patterns compiled once per run.
#[derive(Debug, Clone, Default)]
pub struct CompiledPatterns {
    pub include: Vec<Regex>,
    pub exclude: Vec<Regex>,
}

impl CompiledPatterns {
    /// True when `url` matches every include pattern and no exclude pattern.
    pub fn allows(&self, url: &str) -> bool {
        self.include.iter().all(|re| re.is_match(url))
            && !self.exclude.iter().any(|re| re.is_match(url))
    }
}

impl AuditOptions {
    /// Check value ranges and compile the pattern lists.
    pub fn validate(&self) -> Result<CompiledPatterns> {
        if self.max_pages == 0 || self.max_pages > MAX_PAGES_LIMIT {
            return Err(AuditError::InvalidOptions(format!(
                "max_pages must be between 1 and {MAX_PAGES_LIMIT}, got {}",
                self.max_pages
            )));
        }
        if self.deep_cap > 100 {
            return Err(AuditError::InvalidOptions(format!(
                "deep_cap must not exceed 100, got {}",
                self.deep_cap
            )));
        }
        if self.sample_max > 1000 {
            return Err(AuditError::InvalidOptions(format!(
                "sample_max must not exceed 1000, got {}",
                self.sample_max
            )));
        }

        Ok(CompiledPatterns {
            include: compile_all(&self.include_patterns)?,
            exclude: compile_all(&self.exclude_patterns)?,
        })
    }

    /// Parse options from a JSON document; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AuditError::InvalidOptions(e.to_string()))
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            Regex::new(p).map_err(|source| AuditError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Operational budgets and timeouts shared by every run of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Timeout for a single HTTP request, including redirects.
    pub http_timeout_ms: u64,
    /// Navigation timeout for rendered pages.
    pub nav_timeout_ms: u64,
    /// Upper bound for the best-effort network-quiescence wait.
    pub idle_timeout_ms: u64,
    /// Quiet window that counts as network quiescence.
    pub idle_quiet_ms: u64,
    /// Observed responses recorded per navigation.
    pub response_cap: usize,
    /// Images above this many bytes count as big.
    pub big_image_bytes: u64,
    /// Cap on URLs collected from the sitemap tree.
    pub sitemap_cap: usize,
    /// Concurrent page operations within one job.
    pub concurrency: usize,
    /// Response bodies are truncated to this many bytes.
    pub max_body_bytes: usize,
    /// User agent for HTTP requests.
    pub user_agent: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            http_timeout_ms: 15_000,
            nav_timeout_ms: 30_000,
            idle_timeout_ms: 5_000,
            idle_quiet_ms: 500,
            response_cap: 80,
            big_image_bytes: 500 * 1024,
            sitemap_cap: 500,
            concurrency: 4,
            max_body_bytes: 5 * 1024 * 1024,
            user_agent: format!(
                "Mozilla/5.0 (compatible; site-audit/{})",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl PipelineSettings {
    /// Defaults overridden by `SITE_AUDIT_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        override_from_env("SITE_AUDIT_HTTP_TIMEOUT_MS", &mut settings.http_timeout_ms);
        override_from_env("SITE_AUDIT_NAV_TIMEOUT_MS", &mut settings.nav_timeout_ms);
        override_from_env("SITE_AUDIT_IDLE_TIMEOUT_MS", &mut settings.idle_timeout_ms);
        override_from_env("SITE_AUDIT_RESPONSE_CAP", &mut settings.response_cap);
        override_from_env("SITE_AUDIT_BIG_IMAGE_BYTES", &mut settings.big_image_bytes);
        override_from_env("SITE_AUDIT_SITEMAP_CAP", &mut settings.sitemap_cap);
        override_from_env("SITE_AUDIT_CONCURRENCY", &mut settings.concurrency);
        if let Ok(ua) = std::env::var("SITE_AUDIT_USER_AGENT") {
            if !ua.trim().is_empty() {
                settings.user_agent = ua;
            }
        }
        settings.concurrency = settings.concurrency.max(1);
        settings
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Some(value) = std::env::var(key).ok().and_then(|v| v.trim().parse().ok()) {
        *slot = value;
    }
}
