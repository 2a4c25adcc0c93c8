// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Light analysis: one HTTP fetch plus a static parse.

use crate::acquisition::HttpClient;
use crate::extraction::signals::{extract_signals, HeadingSignals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Reduced signal set for sampled pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightSignals {
    pub title: Option<String>,
    pub title_len: usize,
    pub has_description: bool,
    pub description_len: usize,
    pub has_canonical: bool,
    pub noindex: bool,
    pub lang: Option<String>,
    pub headings: HeadingSignals,
    pub word_count: usize,
    pub jsonld_blocks: usize,
    pub jsonld_invalid: usize,
    pub jsonld_types: BTreeMap<String, u32>,
    pub images: usize,
    pub missing_alt: usize,
    pub og_basic: bool,
    pub hreflang_count: usize,
    pub x_default: bool,
    pub label_coverage: f64,
    pub imprint_link: bool,
    pub privacy_link: bool,
}

impl LightSignals {
    pub fn missing_alt_ratio(&self) -> f64 {
        if self.images == 0 {
            0.0
        } else {
            self.missing_alt as f64 / self.images as f64
        }
    }
}

/// Result of a light analysis. `ok` means reachable with a 2xx status and
/// an HTML content type; only then are signals present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightPage {
    pub url: String,
    pub ok: bool,
    pub status: Option<u16>,
    pub reason: Option<String>,
    pub final_url: Option<String>,
    pub signals: Option<LightSignals>,
}

impl LightPage {
    fn failed(url: &str, status: Option<u16>, final_url: Option<String>, reason: String) -> Self {
        Self {
            url: url.to_string(),
            ok: false,
            status,
            reason: Some(reason),
            final_url,
            signals: None,
        }
    }
}

#[derive(Clone)]
pub struct LightAnalyzer {
    http: HttpClient,
}

impl LightAnalyzer {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn analyze(&self, url: &str) -> LightPage {
        let page = match self.http.get(url).await {
            Ok(page) => page,
            Err(e) => {
                debug!("light fetch of {url} failed: {e:#}");
                return LightPage::failed(url, None, None, format!("{e:#}"));
            }
        };

        if !page.is_success() {
            return LightPage::failed(
                url,
                Some(page.status),
                Some(page.final_url),
                format!("HTTP {}", page.status),
            );
        }
        if !page.is_html() {
            let content_type = page.content_type().unwrap_or("unknown").to_string();
            return LightPage::failed(
                url,
                Some(page.status),
                Some(page.final_url),
                format!("not HTML ({content_type})"),
            );
        }

        let signals = light_signals(&page.body, &page.final_url);
        LightPage {
            url: url.to_string(),
            ok: true,
            status: Some(page.status),
            reason: None,
            final_url: Some(page.final_url),
            signals: Some(signals),
        }
    }
}

/// Static parse of `html` into the light signal set.
pub fn light_signals(html: &str, page_url: &str) -> LightSignals {
    let doc = extract_signals(html, page_url);
    LightSignals {
        title_len: doc.meta.title_len,
        has_description: doc.meta.description.is_some(),
        description_len: doc.meta.description_len,
        has_canonical: doc.meta.canonical.is_some(),
        noindex: doc.meta.noindex(),
        lang: doc.meta.lang.clone(),
        title: doc.meta.title,
        headings: doc.headings,
        word_count: doc.word_count,
        jsonld_blocks: doc.structured_data.blocks,
        jsonld_invalid: doc.structured_data.invalid_blocks,
        jsonld_types: doc.structured_data.report.types,
        images: doc.images.count,
        missing_alt: doc.images.missing_alt,
        og_basic: doc.social.og_basic(),
        hreflang_count: doc.hreflang.languages.len(),
        x_default: doc.hreflang.x_default,
        label_coverage: doc.forms.coverage(),
        imprint_link: doc.legal.imprint_link,
        privacy_link: doc.legal.privacy_link,
    }
}
