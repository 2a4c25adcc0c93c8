// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.
//!
//! Every context attaches a network listener for the duration of a
//! navigation: the main-frame document response supplies status, headers
//! and the redirect chain; other responses are recorded up to the cap.

use super::{
    classify_resource, BrowserLauncher, NavigateOptions, NavigationResult, ObservedResponse,
    RenderContext, Renderer, ResourceKind,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived, ResourceType, Response,
};
use chromiumoxide::cdp::browser_protocol::page::FrameId;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SITE_AUDIT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SITE_AUDIT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.site-audit/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".site-audit/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".site-audit/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".site-audit/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".site-audit/chromium/chrome-linux64/chrome"),
                home.join(".site-audit/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches a fresh headless Chromium per stage.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Renderer>> {
        let renderer = ChromiumRenderer::new().await?;
        Ok(Arc::new(renderer))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn new() -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set SITE_AUDIT_CHROMIUM_PATH or install Chrome.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        info!("Chromium renderer launched");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
            trace: Arc::new(StdMutex::new(NavigationTrace::default())),
            last_activity_ms: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
            listener: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!("browser close failed: {e}");
        }
        let _ = browser.wait().await;
        self.handler.abort();
        info!("Chromium renderer shut down");
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// Network facts collected by the listener task of one navigation.
#[derive(Debug, Default)]
struct NavigationTrace {
    document_status: Option<u16>,
    document_url: Option<String>,
    document_headers: Vec<(String, String)>,
    redirect_chain: Vec<String>,
    responses: Vec<ObservedResponse>,
    /// Request id -> index into `responses` of entries still waiting for
    /// their transfer size.
    pending: HashMap<String, usize>,
    cap: usize,
}

impl NavigationTrace {
    fn is_full(&self) -> bool {
        self.responses.len() >= self.cap
    }

    /// Record a response. Without a known length its size is filled in by
    /// [`Self::record_finished`].
    fn record_response(&mut self, request_id: &str, response: ObservedResponse, known_length: bool) {
        if self.is_full() {
            return;
        }
        if !known_length {
            self.pending.insert(request_id.to_string(), self.responses.len());
        }
        self.responses.push(response);
    }

    fn record_finished(&mut self, request_id: &str, encoded_bytes: f64) {
        if let Some(index) = self.pending.remove(request_id) {
            self.responses[index].bytes = encoded_bytes.max(0.0) as u64;
        }
    }
}

enum NetEvent {
    Request(Arc<EventRequestWillBeSent>),
    Response(Arc<EventResponseReceived>),
    Finished(Arc<EventLoadingFinished>),
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
    trace: Arc<StdMutex<NavigationTrace>>,
    last_activity_ms: Arc<AtomicU64>,
    started: Instant,
    listener: Option<JoinHandle<()>>,
}

impl ChromiumContext {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    async fn start_listener(&mut self, cap: usize) -> Result<()> {
        if let Some(old) = self.listener.take() {
            old.abort();
        }
        {
            let mut trace = self.trace.lock().unwrap_or_else(|p| p.into_inner());
            *trace = NavigationTrace {
                cap,
                ..NavigationTrace::default()
            };
        }

        let main_frame: Option<FrameId> = self.page.mainframe().await.ok().flatten();
        let requests = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .context("failed to attach request listener")?;
        let responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to attach response listener")?;

        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("failed to attach loading listener")?;

        let mut events = Box::pin(futures::stream::select(
            futures::stream::select(
                requests.map(NetEvent::Request),
                responses.map(NetEvent::Response),
            ),
            finished.map(NetEvent::Finished),
        ));

        let trace = Arc::clone(&self.trace);
        let last_activity = Arc::clone(&self.last_activity_ms);
        let started = self.started;

        self.listener = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                last_activity.store(started.elapsed().as_millis() as u64, Ordering::Relaxed);
                match event {
                    NetEvent::Request(req) => {
                        let is_main_document = req.r#type == Some(ResourceType::Document)
                            && (main_frame.is_none() || req.frame_id == main_frame);
                        if let (true, Some(redirect)) = (is_main_document, &req.redirect_response)
                        {
                            let mut t = trace.lock().unwrap_or_else(|p| p.into_inner());
                            t.redirect_chain.push(redirect.url.clone());
                        }
                    }
                    NetEvent::Response(resp) => {
                        let is_main_document = resp.r#type == ResourceType::Document
                            && (main_frame.is_none() || resp.frame_id == main_frame);
                        if is_main_document {
                            let mut t = trace.lock().unwrap_or_else(|p| p.into_inner());
                            t.document_status = Some(resp.response.status as u16);
                            t.document_url = Some(resp.response.url.clone());
                            t.document_headers = headers_of(&resp.response);
                        }

                        let length = content_length(&resp.response);
                        let observed = ObservedResponse {
                            url: resp.response.url.clone(),
                            kind: kind_of(&resp),
                            status: resp.response.status as u16,
                            bytes: length.unwrap_or(0),
                        };
                        let mut t = trace.lock().unwrap_or_else(|p| p.into_inner());
                        t.record_response(resp.request_id.inner(), observed, length.is_some());
                    }
                    NetEvent::Finished(done) => {
                        let mut t = trace.lock().unwrap_or_else(|p| p.into_inner());
                        t.record_finished(done.request_id.inner(), done.encoded_data_length);
                    }
                }
            }
        }));

        Ok(())
    }
}

fn headers_of(response: &Response) -> Vec<(String, String)> {
    response
        .headers
        .inner()
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    (
                        k.to_ascii_lowercase(),
                        v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn content_length(response: &Response) -> Option<u64> {
    headers_of(response)
        .into_iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.trim().parse().ok())
}

fn kind_of(event: &EventResponseReceived) -> ResourceKind {
    match event.r#type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Font => ResourceKind::Font,
        _ => classify_resource(&event.response.mime_type, &event.response.url),
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<NavigationResult> {
        self.start_listener(options.response_cap).await?;
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_millis(options.timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                let trace = self.trace.lock().unwrap_or_else(|p| p.into_inner());
                let Some(status) = trace.document_status else {
                    bail!("no document response observed for {url}");
                };

                Ok(NavigationResult {
                    final_url: trace.document_url.clone().unwrap_or(final_url),
                    status,
                    headers: trace.document_headers.clone(),
                    redirect_chain: trace.redirect_chain.clone(),
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", options.timeout_ms),
        }
    }

    async fn wait_for_network_idle(&self, timeout_ms: u64, quiet_ms: u64) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let idle_for = self
                .elapsed_ms()
                .saturating_sub(self.last_activity_ms.load(Ordering::Relaxed));
            if idle_for >= quiet_ms {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn observed_responses(&self) -> Vec<ObservedResponse> {
        self.trace
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .responses
            .clone()
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn anchor_hrefs(&self) -> Result<Vec<String>> {
        let result = self
            .page
            .evaluate("Array.from(document.querySelectorAll('a[href]')).map(a => a.href)")
            .await
            .context("failed to query anchors")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert anchor list: {e:?}"))
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}
