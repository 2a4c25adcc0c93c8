// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Async HTTP client wrapping reqwest.
//!
//! Plain HTTP requests, no browser. Follows redirects by hand so every
//! hop is recorded, retries on 5xx, backs off on 429 and truncates bodies
//! to the configured byte budget.

use crate::config::PipelineSettings;
use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Response of a GET after all redirects were followed.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Originally requested URL.
    pub requested_url: String,
    /// URL of the last response in the chain.
    pub final_url: String,
    /// HTTP status code of the last response.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Body as text, truncated to the byte budget.
    pub body: String,
    /// URLs that answered with a redirect, in order.
    pub redirect_chain: Vec<String>,
}

impl FetchedPage {
    /// First header value with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(false)
    }
}

/// HTTP client for every non-rendered fetch in the pipeline.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for servers that reject HTTP/2.
    h1_client: reqwest::Client,
    max_body_bytes: usize,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(settings: &PipelineSettings) -> Self {
        let timeout = Duration::from_millis(settings.http_timeout_ms);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(settings.user_agent.as_str())
            .build()
            .unwrap_or_default();

        let h1_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(settings.user_agent.as_str())
            .http1_only()
            .build()
            .unwrap_or_default();

        Self {
            client,
            h1_client,
            max_body_bytes: settings.max_body_bytes,
            max_retries: 2,
        }
    }

    /// Disable retries; the next request is the only attempt.
    pub fn without_retries(mut self) -> Self {
        self.max_retries = 0;
        self
    }

    /// GET `url`, following up to [`MAX_REDIRECTS`] redirects.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn get(&self, url: &str) -> Result<FetchedPage> {
        match self.get_following(&self.client, url).await {
            Ok(page) => Ok(page),
            Err(e) => {
                let err_str = format!("{e:#}");
                if err_str.contains("http2")
                    || err_str.contains("protocol")
                    || err_str.contains("connection closed")
                {
                    self.get_following(&self.h1_client, url).await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_following(&self, client: &reqwest::Client, url: &str) -> Result<FetchedPage> {
        let mut current = Url::parse(url).with_context(|| format!("invalid URL {url}"))?;
        let mut redirect_chain = Vec::new();

        loop {
            let resp = self.send_with_retry(client, current.as_str()).await?;
            let status = resp.status();

            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());

                if let Some(location) = location {
                    if redirect_chain.len() >= MAX_REDIRECTS {
                        return Err(anyhow!(
                            "too many redirects ({MAX_REDIRECTS}) starting at {url}"
                        ));
                    }
                    let next = current
                        .join(&location)
                        .with_context(|| format!("invalid redirect target {location}"))?;
                    debug!("redirect {} -> {}", current, next);
                    redirect_chain.push(current.to_string());
                    current = next;
                    continue;
                }
            }

            let headers: Vec<(String, String)> = resp
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = read_body(resp, self.max_body_bytes).await?;

            return Ok(FetchedPage {
                requested_url: url.to_string(),
                final_url: current.to_string(),
                status: status.as_u16(),
                headers,
                body,
                redirect_chain,
            });
        }
    }

    async fn send_with_retry(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<reqwest::Response> {
        let mut retries = 0u32;

        loop {
            match client.get(url).send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    // Retry on 5xx
                    if status >= 500 && retries < self.max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    // Backoff on 429
                    if status == 429 && retries < self.max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        let delay = Duration::from_secs(retry_after.min(10));
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Ok(r);
                }
                Err(e) => {
                    if retries < self.max_retries && !e.is_builder() {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(anyhow::Error::new(e).context(format!("GET {url} failed")));
                }
            }
        }
    }
}

/// Read a body chunk by chunk, stopping at `limit` bytes.
async fn read_body(mut resp: reqwest::Response, limit: usize) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let room = limit.saturating_sub(buf.len());
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(&PipelineSettings::default()).without_retries()
    }

    #[test]
    fn test_fetched_page_header_lookup() {
        let page = FetchedPage {
            requested_url: "https://example.com".to_string(),
            final_url: "https://example.com/".to_string(),
            status: 200,
            headers: vec![("content-type".to_string(), "text/html; charset=utf-8".to_string())],
            body: String::new(),
            redirect_chain: Vec::new(),
        };
        assert_eq!(page.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert!(page.is_html());
        assert!(page.is_success());
        assert!(page.header("x-robots-tag").is_none());
    }

    #[tokio::test]
    async fn test_follows_redirect_chain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/middle"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/middle"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .mount(&server)
            .await;

        let page = client().get(&format!("{}/old", server.uri())).await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.redirect_chain.len(), 2);
        assert!(page.final_url.ends_with("/new"));
        assert!(page.is_html());
    }

    #[tokio::test]
    async fn test_body_truncated_to_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(4096), "text/plain"))
            .mount(&server)
            .await;

        let settings = PipelineSettings {
            max_body_bytes: 1000,
            ..PipelineSettings::default()
        };
        let client = HttpClient::new(&settings).without_retries();
        let page = client.get(&format!("{}/big", server.uri())).await.unwrap();
        assert_eq!(page.body.len(), 1000);
    }

    #[tokio::test]
    async fn test_not_found_is_a_response() {
        let server = MockServer::start().await;
        let page = client().get(&format!("{}/missing", server.uri())).await.unwrap();
        assert_eq!(page.status, 404);
        assert!(!page.is_success());
    }
}
