// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Findings: immutable facts about one page, produced by declarative rule
//! tables, plus the aggregate views of a run (summary and issue list).

pub mod rules;
pub mod score;

use crate::analysis::{LightPage, PageSignals};
use crate::discovery::SitemapReport;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub use rules::{deep_findings, light_findings, Rule, Template};

/// Finding severity. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Fehler,
    Warnung,
    Hinweis,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Fehler => "Fehler",
            Severity::Warnung => "Warnung",
            Severity::Hinweis => "Hinweis",
        };
        f.write_str(s)
    }
}

/// Expected effect of fixing a finding. Ordered from high to low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Hoch,
    Mittel,
    Niedrig,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Impact::Hoch => "hoch",
            Impact::Mittel => "mittel",
            Impact::Niedrig => "niedrig",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Indexability,
    Technical,
    Content,
    StructuredData,
    Social,
    Performance,
    Accessibility,
    Legal,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Indexability => "Indexierung",
            Category::Technical => "Technik",
            Category::Content => "Inhalt",
            Category::StructuredData => "Strukturierte Daten",
            Category::Social => "Social",
            Category::Performance => "Performance",
            Category::Accessibility => "Barrierefreiheit",
            Category::Legal => "Rechtliches",
        };
        f.write_str(s)
    }
}

/// One fact about one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub url: String,
    pub category: Category,
    /// Where on the page the problem lives (`<head>`, `<title>`, HTTP, ...).
    pub location: String,
    pub severity: Severity,
    pub issue: String,
    pub fix: String,
    pub example: Option<String>,
    pub impact: Impact,
}

/// Order findings by severity, then impact, then URL. Stable, so rule order
/// survives within a page.
pub fn rank(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(a.impact.cmp(&b.impact))
            .then_with(|| a.url.cmp(&b.url))
    });
}

/// Human-readable issue for the main-page issue list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub text: String,
    pub impact: Impact,
}

/// Issue text for a robots.txt `Disallow: /`.
pub const BROAD_BLOCK_ISSUE: &str = "robots.txt blockiert breitflächig";

/// Robots and sitemap problems of the origin.
pub fn discovery_issues(report: &SitemapReport) -> Vec<Issue> {
    let mut issues = Vec::new();
    if report.broad_block {
        issues.push(Issue {
            text: BROAD_BLOCK_ISSUE.to_string(),
            impact: Impact::Hoch,
        });
    }
    if !report.robots_reachable {
        issues.push(Issue {
            text: "robots.txt nicht erreichbar".to_string(),
            impact: Impact::Mittel,
        });
    }
    if report.expanded && report.found.is_empty() {
        issues.push(Issue {
            text: "Keine Sitemap-URLs gefunden".to_string(),
            impact: Impact::Mittel,
        });
    }
    if report.robots_reachable && !report.listed_in_robots {
        issues.push(Issue {
            text: "Sitemap nicht in robots.txt eingetragen".to_string(),
            impact: Impact::Niedrig,
        });
    }
    issues
}

/// Issue list of the main page: its findings plus discovery problems,
/// deduplicated by text and ordered by impact.
pub fn main_page_issues(main_findings: &[Finding], report: &SitemapReport) -> Vec<Issue> {
    let mut seen = HashSet::new();
    let mut issues: Vec<Issue> = discovery_issues(report)
        .into_iter()
        .chain(main_findings.iter().map(|f| Issue {
            text: f.issue.clone(),
            impact: f.impact,
        }))
        .filter(|issue| seen.insert(issue.text.clone()))
        .collect();
    issues.sort_by_key(|issue| issue.impact);
    issues
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSummary {
    pub pages_scanned: usize,
    pub pages_with_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub notices: usize,
}

impl FindingSummary {
    pub fn new(pages_scanned: usize, findings: &[Finding]) -> Self {
        let pages_with_issues = findings
            .iter()
            .map(|f| f.url.as_str())
            .collect::<HashSet<_>>()
            .len();
        let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
        Self {
            pages_scanned,
            pages_with_issues,
            errors: count(Severity::Fehler),
            warnings: count(Severity::Warnung),
            notices: count(Severity::Hinweis),
        }
    }
}

/// Findings for every light page of a run.
pub fn light_page_findings<'a>(pages: impl IntoIterator<Item = &'a LightPage>) -> Vec<Finding> {
    pages.into_iter().flat_map(light_findings).collect()
}

/// Findings for every deep-analyzed page of a run.
pub fn deep_page_findings<'a>(pages: impl IntoIterator<Item = &'a PageSignals>) -> Vec<Finding> {
    pages.into_iter().flat_map(deep_findings).collect()
}
