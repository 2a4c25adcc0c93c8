// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deep analysis: rendered navigation with network measurement.
//!
//! The page is first fetched without rendering to get a raw word count,
//! then navigated in a fresh render context. The context is closed on
//! every exit path.

use crate::acquisition::HttpClient;
use crate::config::PipelineSettings;
use crate::extraction::signals::{extract_signals, has_noindex, url_clean, word_count};
use crate::extraction::DocumentSignals;
use crate::renderer::{NavigateOptions, ObservedResponse, RenderContext, Renderer, ResourceKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Byte weight of the observed responses of one navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSignals {
    pub total_bytes: u64,
    pub image_bytes: u64,
    pub script_bytes: u64,
    pub stylesheet_bytes: u64,
    /// Images above the big-image threshold.
    pub big_images: usize,
    /// Responses observed (bounded by the response cap).
    pub response_count: usize,
}

impl PerformanceSignals {
    pub fn from_responses(responses: &[ObservedResponse], big_image_bytes: u64) -> Self {
        let mut perf = Self {
            response_count: responses.len(),
            ..Self::default()
        };
        for r in responses {
            perf.total_bytes += r.bytes;
            match r.kind {
                ResourceKind::Image => {
                    perf.image_bytes += r.bytes;
                    if r.bytes > big_image_bytes {
                        perf.big_images += 1;
                    }
                }
                ResourceKind::Script => perf.script_bytes += r.bytes,
                ResourceKind::Stylesheet => perf.stylesheet_bytes += r.bytes,
                _ => {}
            }
        }
        perf
    }
}

/// Raw vs rendered word count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderDelta {
    pub raw_words: usize,
    pub rendered_words: usize,
    /// `(rendered - raw) / rendered * 100`; positive when rendering adds text.
    pub delta_pct: f64,
}

impl RenderDelta {
    pub fn new(raw_words: usize, rendered_words: usize) -> Self {
        let delta_pct = if rendered_words == 0 {
            0.0
        } else {
            (rendered_words as f64 - raw_words as f64) / rendered_words as f64 * 100.0
        };
        Self {
            raw_words,
            rendered_words,
            delta_pct,
        }
    }
}

/// Full signal record of a deep-analyzed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSignals {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub redirect_chain_len: usize,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub x_robots_tag: Option<String>,
    pub document: DocumentSignals,
    pub indexable: bool,
    pub url_clean: bool,
    pub performance: PerformanceSignals,
    pub render_delta: RenderDelta,
    pub load_time_ms: u64,
    /// Whether the network went quiet before the idle timeout.
    pub network_idle: bool,
}

impl PageSignals {
    pub fn noindex_header(&self) -> bool {
        self.x_robots_tag.as_deref().map(has_noindex).unwrap_or(false)
    }

    /// Why the page is not indexable, if it is not.
    pub fn noindex_reason(&self) -> Option<String> {
        if !(200..400).contains(&self.status) {
            Some(format!("HTTP-Status {}", self.status))
        } else if self.document.meta.noindex() {
            Some("Meta-Robots noindex".to_string())
        } else if self.noindex_header() {
            Some("X-Robots-Tag noindex".to_string())
        } else {
            None
        }
    }
}

/// Indexable ⇔ status in [200, 400) and no `noindex` in meta robots or
/// `X-Robots-Tag`.
pub fn is_indexable(status: u16, meta_robots: Option<&str>, x_robots_tag: Option<&str>) -> bool {
    (200..400).contains(&status)
        && !meta_robots.map(has_noindex).unwrap_or(false)
        && !x_robots_tag.map(has_noindex).unwrap_or(false)
}

/// Page-level failure of a deep analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub url: String,
    pub status: Option<u16>,
    pub reason: String,
}

#[derive(Clone)]
pub struct DeepAnalyzer {
    http: HttpClient,
    settings: PipelineSettings,
}

impl DeepAnalyzer {
    pub fn new(http: HttpClient, settings: PipelineSettings) -> Self {
        Self { http, settings }
    }

    /// Analyze `url` in a new context of `renderer`.
    pub async fn analyze(
        &self,
        renderer: &dyn Renderer,
        url: &str,
    ) -> std::result::Result<PageSignals, PageFailure> {
        let raw_words = match self.http.get(url).await {
            Ok(page) if page.is_html() => word_count(&page.body),
            Ok(_) => 0,
            Err(e) => {
                debug!("raw fetch of {url} failed: {e:#}");
                0
            }
        };

        let mut context = renderer.new_context().await.map_err(|e| PageFailure {
            url: url.to_string(),
            status: None,
            reason: format!("{e:#}"),
        })?;

        let result = self.inspect(context.as_mut(), url, raw_words).await;

        if let Err(e) = context.close().await {
            warn!("failed to close render context for {url}: {e:#}");
        }
        result
    }

    async fn inspect(
        &self,
        context: &mut dyn RenderContext,
        url: &str,
        raw_words: usize,
    ) -> std::result::Result<PageSignals, PageFailure> {
        let failure = |status: Option<u16>, e: anyhow::Error| PageFailure {
            url: url.to_string(),
            status,
            reason: format!("{e:#}"),
        };

        let options = NavigateOptions {
            timeout_ms: self.settings.nav_timeout_ms,
            response_cap: self.settings.response_cap,
        };
        let nav = context
            .navigate(url, &options)
            .await
            .map_err(|e| failure(None, e))?;

        let network_idle = context
            .wait_for_network_idle(self.settings.idle_timeout_ms, self.settings.idle_quiet_ms)
            .await
            .unwrap_or(false);

        let html = context
            .get_html()
            .await
            .map_err(|e| failure(Some(nav.status), e))?;
        let responses = context.observed_responses().await;

        let document = extract_signals(&html, &nav.final_url);
        let x_robots_tag = nav.header("x-robots-tag").map(str::to_string);
        let indexable = is_indexable(
            nav.status,
            document.meta.robots.as_deref(),
            x_robots_tag.as_deref(),
        );
        let render_delta = RenderDelta::new(raw_words, document.word_count);

        debug!(
            "deep analysis of {url}: status {} in {}ms, {} responses",
            nav.status,
            nav.load_time_ms,
            responses.len()
        );

        Ok(PageSignals {
            url: url.to_string(),
            url_clean: url_clean(&nav.final_url),
            status: nav.status,
            redirect_chain_len: nav.redirect_chain.len(),
            content_type: nav.header("content-type").map(str::to_string),
            cache_control: nav.header("cache-control").map(str::to_string),
            x_robots_tag,
            document,
            indexable,
            performance: PerformanceSignals::from_responses(
                &responses,
                self.settings.big_image_bytes,
            ),
            render_delta,
            load_time_ms: nav.load_time_ms,
            network_idle,
            final_url: nav.final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::http::HttpRenderer;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response(kind: ResourceKind, bytes: u64) -> ObservedResponse {
        ObservedResponse {
            url: "https://example.com/x".to_string(),
            kind,
            status: 200,
            bytes,
        }
    }

    #[test]
    fn test_performance_buckets() {
        let responses = vec![
            response(ResourceKind::Document, 10_000),
            response(ResourceKind::Image, 600 * 1024),
            response(ResourceKind::Image, 20_000),
            response(ResourceKind::Script, 5_000),
            response(ResourceKind::Stylesheet, 1_000),
            response(ResourceKind::Font, 2_000),
        ];
        let perf = PerformanceSignals::from_responses(&responses, 500 * 1024);
        assert_eq!(perf.response_count, 6);
        assert_eq!(perf.big_images, 1);
        assert_eq!(perf.image_bytes, 600 * 1024 + 20_000);
        assert_eq!(perf.script_bytes, 5_000);
        assert_eq!(perf.stylesheet_bytes, 1_000);
        assert_eq!(perf.total_bytes, 10_000 + 600 * 1024 + 20_000 + 5_000 + 1_000 + 2_000);
    }

    #[test]
    fn test_render_delta() {
        assert_eq!(RenderDelta::new(0, 0).delta_pct, 0.0);
        assert_eq!(RenderDelta::new(50, 200).delta_pct, 75.0);
        assert_eq!(RenderDelta::new(200, 200).delta_pct, 0.0);
        assert!(RenderDelta::new(300, 200).delta_pct < 0.0);
    }

    #[test]
    fn test_indexability() {
        assert!(is_indexable(200, None, None));
        assert!(is_indexable(301, Some("index, follow"), None));
        assert!(!is_indexable(404, None, None));
        assert!(!is_indexable(199, None, None));
        assert!(!is_indexable(200, Some("noindex"), None));
        assert!(!is_indexable(200, None, Some("googlebot: noindex")));
    }

    #[tokio::test]
    async fn test_deep_analysis_with_http_renderer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-robots-tag", "noindex")
                    .insert_header("cache-control", "max-age=600")
                    .set_body_raw(
                        "<html lang='de'><head><title>Start</title></head><body><h1>Hallo Welt</h1></body></html>",
                        "text/html",
                    ),
            )
            .mount(&server)
            .await;

        let settings = PipelineSettings::default();
        let http = HttpClient::new(&settings).without_retries();
        let renderer = HttpRenderer::new(http.clone());
        let analyzer = DeepAnalyzer::new(http, settings);

        let page = analyzer
            .analyze(&renderer, &format!("{}/", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.status, 200);
        assert!(!page.indexable);
        assert_eq!(page.noindex_reason().as_deref(), Some("X-Robots-Tag noindex"));
        assert_eq!(page.cache_control.as_deref(), Some("max-age=600"));
        assert_eq!(page.render_delta.raw_words, 2);
        assert_eq!(page.render_delta.delta_pct, 0.0);
        assert_eq!(page.performance.response_count, 1);
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test]
    async fn test_deep_navigation_failure_is_page_failure() {
        let settings = PipelineSettings::default();
        let http = HttpClient::new(&settings).without_retries();
        let renderer = HttpRenderer::new(http.clone());
        let analyzer = DeepAnalyzer::new(http, settings);

        let failure = analyzer
            .analyze(&renderer, "http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert_eq!(failure.url, "http://127.0.0.1:1/");
        assert!(failure.status.is_none());
        assert_eq!(renderer.active_contexts(), 0);
    }
}
