// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Speculative probing of conventional paths as extra crawl seeds.

use crate::analysis::LightAnalyzer;
use crate::urls::NormalizePolicy;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Conventional slugs, German and English.
pub const COMMON_SLUGS: &[&str] = &[
    "kontakt",
    "contact",
    "impressum",
    "imprint",
    "datenschutz",
    "privacy",
    "privacy-policy",
    "legal",
    "faq",
    "standorte",
    "locations",
    "ueber-uns",
    "about",
    "about-us",
    "portfolio",
    "referenzen",
    "blog",
    "news",
];

/// Candidate URLs for `origin`: every slug with and without a trailing slash.
pub fn candidates(origin: &str) -> Vec<String> {
    COMMON_SLUGS
        .iter()
        .flat_map(|slug| [format!("{origin}/{slug}"), format!("{origin}/{slug}/")])
        .collect()
}

#[derive(Clone)]
pub struct CommonPathProber {
    light: LightAnalyzer,
    concurrency: usize,
}

impl CommonPathProber {
    pub fn new(light: LightAnalyzer, concurrency: usize) -> Self {
        Self {
            light,
            concurrency: concurrency.max(1),
        }
    }

    /// Probe all candidates; keep those the light analysis reports as `ok`.
    ///
    /// Results keep candidate order and are deduplicated by normalized
    /// final URL. Failures are dropped silently.
    pub async fn probe(&self, origin: &str, cancel: &CancellationToken) -> Vec<String> {
        let policy = NormalizePolicy::default();
        let mut confirmed: Vec<(usize, String)> =
            stream::iter(candidates(origin).into_iter().enumerate())
                .map(|(index, url)| {
                    let light = self.light.clone();
                    let cancel = cancel.clone();
                    async move {
                        if cancel.is_cancelled() {
                            return None;
                        }
                        let page = light.analyze(&url).await;
                        if !page.ok {
                            return None;
                        }
                        let landed = page.final_url.unwrap_or(url);
                        policy.normalize_str(&landed).map(|u| (index, u))
                    }
                })
                .buffer_unordered(self.concurrency)
                .filter_map(|found| async move { found })
                .collect()
                .await;

        confirmed.sort_by_key(|(index, _)| *index);
        let mut seen = HashSet::new();
        let seeds: Vec<String> = confirmed
            .into_iter()
            .map(|(_, url)| url)
            .filter(|url| seen.insert(url.clone()))
            .collect();

        debug!("common-path probing of {origin} confirmed {} seeds", seeds.len());
        seeds
    }
}
