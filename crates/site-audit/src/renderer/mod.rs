// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over the
//! browser engine (Chromium via chromiumoxide, or the no-JS HTTP renderer),
//! plus `BrowserLauncher`, which starts one renderer per pipeline stage.

pub mod chromium;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-navigation limits.
#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    /// Navigation timeout in milliseconds.
    pub timeout_ms: u64,
    /// Observed responses recorded for this navigation.
    pub response_cap: usize,
}

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// HTTP status code of the main document.
    pub status: u16,
    /// Main document response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// URLs that redirected before the final document, in order.
    pub redirect_chain: Vec<String>,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

impl NavigationResult {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Asset class of an observed network response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Document,
    Image,
    Script,
    Stylesheet,
    Font,
    Other,
}

/// One network response seen during a navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedResponse {
    pub url: String,
    pub kind: ResourceKind,
    pub status: u16,
    /// Byte length from `content-length`, or the body when the header is absent.
    pub bytes: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout, recording network responses.
    async fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<NavigationResult>;
    /// Wait until no response arrived for `quiet_ms`, at most `timeout_ms`.
    /// Returns whether quiescence was reached.
    async fn wait_for_network_idle(&self, timeout_ms: u64, quiet_ms: u64) -> Result<bool>;
    /// Responses observed during the last navigation (capped).
    async fn observed_responses(&self) -> Vec<ObservedResponse>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Absolute `href` of every anchor on the page.
    async fn anchor_hrefs(&self) -> Result<Vec<String>>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Starts a renderer. One renderer is held for a crawl or a batch of deep
/// analyses and shut down at the end of that stage.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Renderer>>;
    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Map a MIME type / URL to an asset class when the engine gives no type.
pub fn classify_resource(mime: &str, url: &str) -> ResourceKind {
    let mime = mime.to_ascii_lowercase();
    let path = url.split(['?', '#']).next().unwrap_or("").to_ascii_lowercase();
    if mime.starts_with("image/") {
        ResourceKind::Image
    } else if mime.contains("javascript") || mime.contains("ecmascript") || path.ends_with(".js") {
        ResourceKind::Script
    } else if mime == "text/css" || path.ends_with(".css") {
        ResourceKind::Stylesheet
    } else if mime.starts_with("font/") || mime.contains("font") {
        ResourceKind::Font
    } else if mime.contains("html") {
        ResourceKind::Document
    } else {
        ResourceKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_resource() {
        assert_eq!(classify_resource("image/webp", "https://x/a"), ResourceKind::Image);
        assert_eq!(
            classify_resource("application/javascript", "https://x/app"),
            ResourceKind::Script
        );
        assert_eq!(classify_resource("", "https://x/main.css?v=2"), ResourceKind::Stylesheet);
        assert_eq!(classify_resource("font/woff2", "https://x/f"), ResourceKind::Font);
        assert_eq!(
            classify_resource("text/html; charset=utf-8", "https://x/"),
            ResourceKind::Document
        );
        assert_eq!(classify_resource("application/json", "https://x/api"), ResourceKind::Other);
    }

    #[test]
    fn test_navigation_header_lookup() {
        let nav = NavigationResult {
            final_url: "https://example.com/".to_string(),
            status: 200,
            headers: vec![("x-robots-tag".to_string(), "noindex".to_string())],
            redirect_chain: Vec::new(),
            load_time_ms: 12,
        };
        assert_eq!(nav.header("X-Robots-Tag"), Some("noindex"));
    }
}
