// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Declarative rule tables.
//!
//! A rule is a check plus a finding template. The check inspects one
//! signal record and returns `Some(detail)` when the rule fires; a
//! non-empty detail is appended to the issue text. Light rules use wider
//! ranges than deep rules for the same concern.

use super::{Category, Finding, Impact, Severity};
use crate::analysis::{LightPage, LightSignals, PageSignals};
use crate::extraction::signals::HeadingJump;
use Category::*;
use Impact::*;
use Severity::*;

/// Static part of a finding.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub category: Category,
    pub location: &'static str,
    pub severity: Severity,
    pub impact: Impact,
    pub issue: &'static str,
    pub fix: &'static str,
    pub example: Option<&'static str>,
}

impl Template {
    pub fn instantiate(&self, url: &str, detail: &str) -> Finding {
        let issue = if detail.is_empty() {
            self.issue.to_string()
        } else {
            format!("{} ({detail})", self.issue)
        };
        Finding {
            url: url.to_string(),
            category: self.category,
            location: self.location.to_string(),
            severity: self.severity,
            issue,
            fix: self.fix.to_string(),
            example: self.example.map(str::to_string),
            impact: self.impact,
        }
    }
}

/// A check over signal record `S` and the finding it produces.
pub struct Rule<S> {
    pub id: &'static str,
    pub check: fn(&S) -> Option<String>,
    pub template: Template,
}

/// Run every rule of `rules` against `signals`.
pub fn evaluate<S>(rules: &[Rule<S>], url: &str, signals: &S) -> Vec<Finding> {
    rules
        .iter()
        .filter_map(|rule| {
            (rule.check)(signals).map(|detail| rule.template.instantiate(url, &detail))
        })
        .collect()
}

fn when(cond: bool) -> Option<String> {
    cond.then(String::new)
}

fn when_detail(cond: bool, detail: impl FnOnce() -> String) -> Option<String> {
    cond.then(detail)
}

fn outside(len: usize, min: usize, max: usize) -> bool {
    len < min || len > max
}

const fn template(
    category: Category,
    location: &'static str,
    severity: Severity,
    impact: Impact,
    issue: &'static str,
    fix: &'static str,
    example: Option<&'static str>,
) -> Template {
    Template {
        category,
        location,
        severity,
        impact,
        issue,
        fix,
        example,
    }
}

/// Finding for a sampled page that answered with an HTTP error.
pub const HTTP_ERROR: Template = template(
    Indexability,
    "HTTP",
    Fehler,
    Hoch,
    "HTTP-Fehler",
    "Seite reparieren oder per 301 auf eine passende Seite weiterleiten.",
    None,
);

/// Rules for light-analyzed sample pages.
pub static LIGHT_RULES: &[Rule<LightSignals>] = &[
    Rule {
        id: "light.title.missing",
        check: |s| when(s.title.is_none()),
        template: template(Content, "<title>", Fehler, Hoch, "Title fehlt",
            "Eindeutigen Seitentitel im <head> setzen.",
            Some("<title>Leistung in Ort | Firma</title>")),
    },
    Rule {
        id: "light.title.length",
        check: |s| when_detail(
            s.title.is_some() && outside(s.title_len, 30, 65),
            || format!("{} Zeichen", s.title_len),
        ),
        template: template(Content, "<title>", Warnung, Mittel, "Title-Länge außerhalb 30–65 Zeichen",
            "Title auf 30 bis 65 Zeichen bringen.", None),
    },
    Rule {
        id: "light.description.missing",
        check: |s| when(!s.has_description),
        template: template(Content, "<meta name=\"description\">", Warnung, Mittel, "Meta-Description fehlt",
            "Beschreibende Meta-Description ergänzen.",
            Some("<meta name=\"description\" content=\"...\">")),
    },
    Rule {
        id: "light.description.length",
        check: |s| when_detail(
            s.has_description && outside(s.description_len, 70, 200),
            || format!("{} Zeichen", s.description_len),
        ),
        template: template(Content, "<meta name=\"description\">", Hinweis, Niedrig,
            "Meta-Description-Länge außerhalb 70–200 Zeichen",
            "Description auf 70 bis 200 Zeichen bringen.", None),
    },
    Rule {
        id: "light.canonical.missing",
        check: |s| when(!s.has_canonical),
        template: template(Technical, "<link rel=\"canonical\">", Hinweis, Niedrig, "Canonical fehlt",
            "Selbstreferenzierenden Canonical-Link setzen.",
            Some("<link rel=\"canonical\" href=\"https://example.com/seite\">")),
    },
    Rule {
        id: "light.robots.noindex",
        check: |s| when(s.noindex),
        template: template(Indexability, "<meta name=\"robots\">", Fehler, Hoch, "Seite auf noindex gesetzt",
            "noindex entfernen, wenn die Seite gefunden werden soll.", None),
    },
    Rule {
        id: "light.lang.missing",
        check: |s| when(s.lang.is_none()),
        template: template(Technical, "<html>", Warnung, Mittel, "Sprachangabe fehlt",
            "lang-Attribut am <html>-Element setzen.", Some("<html lang=\"de\">")),
    },
    Rule {
        id: "light.h1.missing",
        check: |s| when(s.headings.h1() == 0),
        template: template(Content, "<h1>", Fehler, Hoch, "Keine H1-Überschrift",
            "Genau eine H1 mit dem Hauptthema der Seite setzen.", None),
    },
    Rule {
        id: "light.h1.multiple",
        check: |s| when_detail(s.headings.h1() > 1, || format!("{} H1", s.headings.h1())),
        template: template(Content, "<h1>", Hinweis, Niedrig, "Mehrere H1-Überschriften",
            "Nur eine H1 verwenden, weitere Überschriften als H2.", None),
    },
    Rule {
        id: "light.headings.order",
        check: |s| when_detail(!s.headings.jumps.is_empty(), || jump_detail(&s.headings.jumps)),
        template: template(Content, "<h1>–<h6>", Hinweis, Niedrig, "Überschriften-Hierarchie springt",
            "Überschriftenebenen nicht überspringen.", None),
    },
    Rule {
        id: "light.words.low",
        check: |s| when_detail(s.word_count < 150, || format!("{} Wörter", s.word_count)),
        template: template(Content, "<body>", Warnung, Mittel, "Wenig Text",
            "Inhalt auf mindestens 150 Wörter ausbauen.", None),
    },
    Rule {
        id: "light.jsonld.missing",
        check: |s| when(s.jsonld_blocks == 0),
        template: template(StructuredData, "<head>", Warnung, Mittel, "Keine strukturierten Daten (JSON-LD)",
            "Passendes schema.org-Markup als JSON-LD ergänzen.", None),
    },
    Rule {
        id: "light.jsonld.invalid",
        check: |s| when_detail(s.jsonld_invalid > 0, || format!("{} Block/Blöcke", s.jsonld_invalid)),
        template: template(StructuredData, "<script type=\"application/ld+json\">", Fehler, Mittel,
            "Ungültiges JSON-LD", "JSON-Syntax des Blocks korrigieren.", None),
    },
    Rule {
        id: "light.images.alt",
        check: |s| when_detail(
            s.missing_alt_ratio() > 0.2,
            || format!("{} von {} Bildern", s.missing_alt, s.images),
        ),
        template: template(Accessibility, "<img>", Warnung, Mittel, "Viele Bilder ohne Alt-Text",
            "Alt-Texte für inhaltliche Bilder ergänzen.", Some("<img src=\"team.jpg\" alt=\"Unser Team\">")),
    },
    Rule {
        id: "light.og.basic",
        check: |s| when(!s.og_basic),
        template: template(Social, "<meta property=\"og:*\">", Hinweis, Niedrig, "Open-Graph-Basis-Tags fehlen",
            "og:title, og:description und og:image setzen.", None),
    },
    Rule {
        id: "light.hreflang.x_default",
        check: |s| when(s.hreflang_count > 0 && !s.x_default),
        template: template(Technical, "<link rel=\"alternate\" hreflang>", Hinweis, Niedrig,
            "hreflang ohne x-default", "hreflang=\"x-default\" ergänzen.", None),
    },
    Rule {
        id: "light.forms.labels",
        check: |s| when_detail(
            s.label_coverage < 0.5,
            || format!("{:.0} % beschriftet", s.label_coverage * 100.0),
        ),
        template: template(Accessibility, "<form>", Warnung, Mittel, "Formularfelder ohne Beschriftung",
            "Jedem Feld ein <label> oder aria-label geben.", None),
    },
    Rule {
        id: "light.legal.links",
        check: |s| when_detail(!(s.imprint_link && s.privacy_link), || missing_legal(s.imprint_link, s.privacy_link)),
        template: template(Legal, "<footer>", Warnung, Mittel, "Rechtliche Links fehlen",
            "Impressum und Datenschutzerklärung auf jeder Seite verlinken.", None),
    },
];

/// Rules for the main page and deep-analyzed pages.
pub static DEEP_RULES: &[Rule<PageSignals>] = &[
    Rule {
        id: "deep.indexable",
        check: |s| if s.indexable { None } else { Some(s.noindex_reason().unwrap_or_default()) },
        template: template(Indexability, "HTTP / robots", Fehler, Hoch, "Seite nicht indexierbar",
            "Status 200 liefern und noindex in Meta-Robots und X-Robots-Tag entfernen.", None),
    },
    Rule {
        id: "deep.canonical.missing",
        check: |s| when(s.document.meta.canonical.is_none()),
        template: template(Technical, "<link rel=\"canonical\">", Warnung, Mittel, "Canonical fehlt",
            "Selbstreferenzierenden Canonical-Link setzen.",
            Some("<link rel=\"canonical\" href=\"https://example.com/seite\">")),
    },
    Rule {
        id: "deep.redirects",
        check: |s| when_detail(s.redirect_chain_len > 1, || format!("{} Weiterleitungen", s.redirect_chain_len)),
        template: template(Technical, "HTTP", Warnung, Mittel, "Weiterleitungskette",
            "Direkt auf das endgültige Ziel verlinken bzw. weiterleiten.", None),
    },
    Rule {
        id: "deep.title.missing",
        check: |s| when(s.document.meta.title.is_none()),
        template: template(Content, "<title>", Fehler, Hoch, "Title fehlt",
            "Eindeutigen Seitentitel im <head> setzen.",
            Some("<title>Leistung in Ort | Firma</title>")),
    },
    Rule {
        id: "deep.title.length",
        check: |s| when_detail(
            s.document.meta.title.is_some() && outside(s.document.meta.title_len, 50, 60),
            || format!("{} Zeichen", s.document.meta.title_len),
        ),
        template: template(Content, "<title>", Warnung, Mittel, "Title-Länge außerhalb 50–60 Zeichen",
            "Title auf 50 bis 60 Zeichen bringen.", None),
    },
    Rule {
        id: "deep.description.missing",
        check: |s| when(s.document.meta.description.is_none()),
        template: template(Content, "<meta name=\"description\">", Warnung, Hoch, "Meta-Description fehlt",
            "Beschreibende Meta-Description ergänzen.",
            Some("<meta name=\"description\" content=\"...\">")),
    },
    Rule {
        id: "deep.description.length",
        check: |s| when_detail(
            s.document.meta.description.is_some() && outside(s.document.meta.description_len, 140, 180),
            || format!("{} Zeichen", s.document.meta.description_len),
        ),
        template: template(Content, "<meta name=\"description\">", Hinweis, Niedrig,
            "Meta-Description-Länge außerhalb 140–180 Zeichen",
            "Description auf 140 bis 180 Zeichen bringen.", None),
    },
    Rule {
        id: "deep.lang.missing",
        check: |s| when(s.document.meta.lang.is_none()),
        template: template(Technical, "<html>", Warnung, Mittel, "Sprachangabe fehlt",
            "lang-Attribut am <html>-Element setzen.", Some("<html lang=\"de\">")),
    },
    Rule {
        id: "deep.h1.missing",
        check: |s| when(s.document.headings.h1() == 0),
        template: template(Content, "<h1>", Fehler, Hoch, "Keine H1-Überschrift",
            "Genau eine H1 mit dem Hauptthema der Seite setzen.", None),
    },
    Rule {
        id: "deep.h1.multiple",
        check: |s| when_detail(s.document.headings.h1() > 1, || format!("{} H1", s.document.headings.h1())),
        template: template(Content, "<h1>", Warnung, Mittel, "Mehrere H1-Überschriften",
            "Nur eine H1 verwenden, weitere Überschriften als H2.", None),
    },
    Rule {
        id: "deep.headings.order",
        check: |s| when_detail(
            !s.document.headings.jumps.is_empty(),
            || jump_detail(&s.document.headings.jumps),
        ),
        template: template(Content, "<h1>–<h6>", Warnung, Mittel, "Überschriften-Hierarchie springt",
            "Überschriftenebenen nicht überspringen.", None),
    },
    Rule {
        id: "deep.words.low",
        check: |s| when_detail(s.document.word_count < 200, || format!("{} Wörter", s.document.word_count)),
        template: template(Content, "<body>", Warnung, Mittel, "Wenig Text",
            "Inhalt auf mindestens 200 Wörter ausbauen.", None),
    },
    Rule {
        id: "deep.jsonld.missing",
        check: |s| when(s.document.structured_data.blocks == 0),
        template: template(StructuredData, "<head>", Fehler, Hoch, "Keine strukturierten Daten (JSON-LD)",
            "Passendes schema.org-Markup als JSON-LD ergänzen.", None),
    },
    Rule {
        id: "deep.jsonld.invalid",
        check: |s| when_detail(
            s.document.structured_data.invalid_blocks > 0,
            || format!("{} Block/Blöcke", s.document.structured_data.invalid_blocks),
        ),
        template: template(StructuredData, "<script type=\"application/ld+json\">", Fehler, Mittel,
            "Ungültiges JSON-LD", "JSON-Syntax des Blocks korrigieren.", None),
    },
    Rule {
        id: "deep.jsonld.head",
        check: |s| {
            let sd = &s.document.structured_data;
            when(sd.blocks > 0 && sd.blocks_in_head < sd.blocks)
        },
        template: template(StructuredData, "<body>", Hinweis, Niedrig, "JSON-LD außerhalb des <head>",
            "JSON-LD-Blöcke in den <head> verschieben.", None),
    },
    Rule {
        id: "deep.jsonld.nap",
        check: |s| {
            let nap = s.document.structured_data.report.nap;
            when(nap.present && !nap.complete())
        },
        template: template(StructuredData, "LocalBusiness", Warnung, Hoch, "LocalBusiness ohne vollständige NAP-Daten",
            "name, address und telephone im LocalBusiness-Markup angeben.", None),
    },
    Rule {
        id: "deep.jsonld.offer",
        check: |s| {
            let offer = s.document.structured_data.report.offer;
            when(offer.present && !offer.complete())
        },
        template: template(StructuredData, "Product", Warnung, Hoch, "Product ohne vollständiges Angebot",
            "offers mit price und priceCurrency angeben.", None),
    },
    Rule {
        id: "deep.jsonld.article",
        check: |s| {
            let article = s.document.structured_data.report.article;
            when(article.present && !article.complete())
        },
        template: template(StructuredData, "Article", Warnung, Mittel, "Article ohne Autor oder Datum",
            "author und datePublished angeben.", None),
    },
    Rule {
        id: "deep.social.completeness",
        check: |s| when_detail(
            s.document.social.completeness() < 1.0,
            || format!("{:.0} % vorhanden", s.document.social.completeness() * 100.0),
        ),
        template: template(Social, "<meta property=\"og:*\">", Hinweis, Niedrig, "Social-Tags unvollständig",
            "og:title, og:description, og:image, og:url, og:type und twitter:card setzen.", None),
    },
    Rule {
        id: "deep.images.alt",
        check: |s| when_detail(
            s.document.images.missing_alt > 0,
            || format!("{} von {} Bildern", s.document.images.missing_alt, s.document.images.count),
        ),
        template: template(Accessibility, "<img>", Warnung, Mittel, "Bilder ohne Alt-Text",
            "Alt-Texte für inhaltliche Bilder ergänzen.", Some("<img src=\"team.jpg\" alt=\"Unser Team\">")),
    },
    Rule {
        id: "deep.images.lazy",
        check: |s| {
            let images = &s.document.images;
            when(images.count > 3 && images.lazy_ratio() < 0.5)
        },
        template: template(Performance, "<img>", Hinweis, Niedrig, "Bilder ohne Lazy Loading",
            "loading=\"lazy\" für Bilder unterhalb des sichtbaren Bereichs setzen.", None),
    },
    Rule {
        id: "deep.images.big",
        check: |s| when_detail(s.performance.big_images > 0, || format!("{} Bilder", s.performance.big_images)),
        template: template(Performance, "<img>", Warnung, Mittel, "Große Bilder über 500 KB",
            "Bilder komprimieren und in WebP/AVIF ausliefern.", None),
    },
    Rule {
        id: "deep.weight",
        check: |s| when_detail(
            s.performance.total_bytes > 3 * 1024 * 1024,
            || format!("{:.1} MB", s.performance.total_bytes as f64 / (1024.0 * 1024.0)),
        ),
        template: template(Performance, "Netzwerk", Warnung, Mittel, "Seitengewicht über 3 MB",
            "Skripte, Styles und Bilder reduzieren.", None),
    },
    Rule {
        id: "deep.render_delta",
        check: |s| when_detail(
            s.render_delta.delta_pct > 30.0,
            || format!("{:.0} % erst nach Rendering", s.render_delta.delta_pct),
        ),
        template: template(Technical, "JavaScript", Warnung, Hoch, "Inhalt hängt von JavaScript ab",
            "Wichtige Inhalte serverseitig ausliefern.", None),
    },
    Rule {
        id: "deep.cache",
        check: |s| when(!strong_cache_header(s.cache_control.as_deref())),
        template: template(Performance, "Cache-Control", Hinweis, Niedrig, "Kein wirksamer Cache-Header",
            "Cache-Control mit max-age setzen.", Some("Cache-Control: public, max-age=3600")),
    },
    Rule {
        id: "deep.forms.labels",
        check: |s| when_detail(
            s.document.forms.coverage() < 1.0,
            || format!("{} von {} Feldern beschriftet", s.document.forms.labelled, s.document.forms.inputs),
        ),
        template: template(Accessibility, "<form>", Warnung, Mittel, "Formularfelder ohne Beschriftung",
            "Jedem Feld ein <label> oder aria-label geben.", None),
    },
    Rule {
        id: "deep.legal.links",
        check: |s| {
            let legal = s.document.legal;
            when_detail(!(legal.imprint_link && legal.privacy_link), || {
                missing_legal(legal.imprint_link, legal.privacy_link)
            })
        },
        template: template(Legal, "<footer>", Fehler, Hoch, "Rechtliche Links fehlen",
            "Impressum und Datenschutzerklärung auf jeder Seite verlinken.", None),
    },
    Rule {
        id: "deep.url.clean",
        check: |s| when(!s.url_clean),
        template: template(Technical, "URL", Hinweis, Niedrig, "URL nicht sauber",
            "Kurze, kleingeschriebene URLs mit wenigen Parametern verwenden.", None),
    },
    Rule {
        id: "deep.hreflang.x_default",
        check: |s| {
            let hreflang = &s.document.hreflang;
            when(!hreflang.languages.is_empty() && !hreflang.x_default)
        },
        template: template(Technical, "<link rel=\"alternate\" hreflang>", Hinweis, Niedrig,
            "hreflang ohne x-default", "hreflang=\"x-default\" ergänzen.", None),
    },
];

/// `Cache-Control` present and not `no-store`.
pub fn strong_cache_header(cache_control: Option<&str>) -> bool {
    match cache_control {
        Some(value) => !value.trim().is_empty() && !value.to_ascii_lowercase().contains("no-store"),
        None => false,
    }
}

fn jump_detail(jumps: &[HeadingJump]) -> String {
    jumps
        .iter()
        .map(|j| format!("H{}→H{}", j.from, j.to))
        .collect::<Vec<_>>()
        .join(", ")
}

fn missing_legal(imprint: bool, privacy: bool) -> String {
    match (imprint, privacy) {
        (false, false) => "Impressum, Datenschutz".to_string(),
        (false, true) => "Impressum".to_string(),
        _ => "Datenschutz".to_string(),
    }
}

/// Findings for one light page. Failed pages with an HTTP error status
/// yield a single `HTTP-Fehler`; other failures yield nothing.
pub fn light_findings(page: &LightPage) -> Vec<Finding> {
    match (&page.signals, page.status) {
        (Some(signals), _) if page.ok => evaluate(LIGHT_RULES, &page.url, signals),
        (_, Some(status)) if status >= 400 => {
            vec![HTTP_ERROR.instantiate(&page.url, &format!("HTTP {status}"))]
        }
        _ => Vec::new(),
    }
}

pub fn deep_findings(page: &PageSignals) -> Vec<Finding> {
    evaluate(DEEP_RULES, &page.url, page)
}
