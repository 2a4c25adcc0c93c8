// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::analysis::{LightPage, PageFailure, PageSignals};
use crate::discovery::SitemapReport;
use crate::findings::score::{Score, ScoreFlags};
use crate::findings::{Finding, FindingSummary, Issue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a deep analysis of a discovered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Analyzed(Box<PageSignals>),
    Failed(PageFailure),
}

/// Everything one discovery-and-analysis run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    /// The audited URL as given (after scheme completion).
    pub url: String,
    pub origin: String,
    pub main: PageSignals,
    /// robots.txt and sitemap summary.
    pub robots: SitemapReport,
    pub discovered_count: usize,
    pub discovered: Vec<String>,
    /// Light-analyzed pages.
    pub sampled: Vec<LightPage>,
    /// Deep-analyzed discovered pages.
    pub crawl_analysis: Vec<PageOutcome>,
    /// All findings, ranked.
    pub findings: Vec<Finding>,
    pub summary: FindingSummary,
    /// Main-page issue list, ordered by impact.
    pub issues: Vec<Issue>,
    pub score: Score,
    pub score_flags: ScoreFlags,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
