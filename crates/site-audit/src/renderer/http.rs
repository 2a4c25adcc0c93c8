// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Script-free renderer backed by the HTTP client.
//!
//! Used when no browser is available. A navigation is a single GET; the
//! DOM is the server HTML and the only observed response is the document.

use super::{
    BrowserLauncher, NavigateOptions, NavigationResult, ObservedResponse, RenderContext, Renderer,
    ResourceKind,
};
use crate::acquisition::{FetchedPage, HttpClient};
use anyhow::{bail, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Launcher that hands out [`HttpRenderer`]s.
#[derive(Clone)]
pub struct HttpLauncher {
    client: HttpClient,
}

impl HttpLauncher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Arc<dyn Renderer>> {
        Ok(Arc::new(HttpRenderer::new(self.client.clone())))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

pub struct HttpRenderer {
    client: HttpClient,
    active_count: Arc<AtomicUsize>,
}

impl HttpRenderer {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(HttpContext {
            client: self.client.clone(),
            active_count: Arc::clone(&self.active_count),
            page: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

pub struct HttpContext {
    client: HttpClient,
    active_count: Arc<AtomicUsize>,
    page: Option<FetchedPage>,
}

#[async_trait]
impl RenderContext for HttpContext {
    async fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<NavigationResult> {
        let start = Instant::now();
        let fetched = match tokio::time::timeout(
            Duration::from_millis(options.timeout_ms),
            self.client.get(url),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => bail!("navigation timed out after {}ms", options.timeout_ms),
        };

        let nav = NavigationResult {
            final_url: fetched.final_url.clone(),
            status: fetched.status,
            headers: fetched.headers.clone(),
            redirect_chain: fetched.redirect_chain.clone(),
            load_time_ms: start.elapsed().as_millis() as u64,
        };
        self.page = Some(fetched);
        Ok(nav)
    }

    async fn wait_for_network_idle(&self, _timeout_ms: u64, _quiet_ms: u64) -> Result<bool> {
        Ok(true)
    }

    async fn observed_responses(&self) -> Vec<ObservedResponse> {
        self.page
            .iter()
            .map(|p| ObservedResponse {
                url: p.final_url.clone(),
                kind: ResourceKind::Document,
                status: p.status,
                bytes: p.body.len() as u64,
            })
            .collect()
    }

    async fn get_html(&self) -> Result<String> {
        match &self.page {
            Some(p) => Ok(p.body.clone()),
            None => bail!("no page loaded"),
        }
    }

    async fn anchor_hrefs(&self) -> Result<Vec<String>> {
        match &self.page {
            Some(p) => Ok(absolute_hrefs(&p.body, &p.final_url)),
            None => bail!("no page loaded"),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Resolve every `a[href]` against `base`, the way `HTMLAnchorElement.href`
/// does in a browser. Unresolvable hrefs are dropped.
pub fn absolute_hrefs(html: &str, base: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|u| u.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_absolute_hrefs_resolves_relative() {
        let html = r#"<a href="/a">A</a><a href="b?x=1">B</a><a href="https://other.org/">O</a><a>none</a>"#;
        let hrefs = absolute_hrefs(html, "https://example.com/dir/page");
        assert_eq!(
            hrefs,
            vec![
                "https://example.com/a",
                "https://example.com/dir/b?x=1",
                "https://other.org/",
            ]
        );
    }

    #[tokio::test]
    async fn test_launcher_starts_http_renderer() {
        let launcher = HttpLauncher::new(HttpClient::new(&PipelineSettings::default()));
        assert_eq!(launcher.name(), "http");
        let renderer = launcher.launch().await.unwrap();
        assert_eq!(renderer.active_contexts(), 0);
        renderer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_http_context_navigate_and_close() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r#"<html><body><a href="/kontakt">K</a></body></html>"#,
                    "text/html",
                ),
            )
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(HttpClient::new(&PipelineSettings::default()));
        let mut ctx = renderer.new_context().await.unwrap();
        assert_eq!(renderer.active_contexts(), 1);

        let options = NavigateOptions {
            timeout_ms: 5_000,
            response_cap: 80,
        };
        let nav = ctx
            .navigate(&format!("{}/", server.uri()), &options)
            .await
            .unwrap();
        assert_eq!(nav.status, 200);
        assert!(ctx.wait_for_network_idle(100, 10).await.unwrap());

        let hrefs = ctx.anchor_hrefs().await.unwrap();
        assert_eq!(hrefs, vec![format!("{}/kontakt", server.uri())]);
        assert_eq!(ctx.observed_responses().await.len(), 1);

        ctx.close().await.unwrap();
        assert_eq!(renderer.active_contexts(), 0);
    }
}
