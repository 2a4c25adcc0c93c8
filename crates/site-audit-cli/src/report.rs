// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Plain-text rendering of an audit result.

use site_audit::AuditResult;
use std::fmt::Write;

/// Findings shown in the text summary.
const TOP_FINDINGS: usize = 15;

pub fn summary(result: &AuditResult) -> String {
    let mut out = String::new();
    let score = &result.score;
    let _ = writeln!(out, "Audit: {}", result.url);
    let _ = writeln!(
        out,
        "Score: {} / 100  (Strukturierte Daten {}/30, Technik {}/35, Inhalt {}/25, Social {}/10)",
        score.total, score.structured_data, score.technical, score.content, score.social
    );
    let _ = writeln!(
        out,
        "Seiten: {} entdeckt, {} geprüft, {} mit Befunden",
        result.discovered_count, result.summary.pages_scanned, result.summary.pages_with_issues
    );
    let _ = writeln!(
        out,
        "Befunde: {} Fehler, {} Warnungen, {} Hinweise",
        result.summary.errors, result.summary.warnings, result.summary.notices
    );

    if !result.issues.is_empty() {
        let _ = writeln!(out, "\nProbleme der Hauptseite:");
        for issue in &result.issues {
            let _ = writeln!(out, "  [{}] {}", issue.impact, issue.text);
        }
    }

    if !result.findings.is_empty() {
        let _ = writeln!(out, "\nWichtigste Befunde:");
        for f in result.findings.iter().take(TOP_FINDINGS) {
            let _ = writeln!(
                out,
                "  {:<8} {:<7} {}  {}  ({})",
                f.severity.to_string(),
                f.impact.to_string(),
                f.url,
                f.issue,
                f.category
            );
        }
        if result.findings.len() > TOP_FINDINGS {
            let _ = writeln!(
                out,
                "  ... {} weitere (--json für alle)",
                result.findings.len() - TOP_FINDINGS
            );
        }
    }
    out
}
