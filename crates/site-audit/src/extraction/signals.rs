// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Signal extraction from parsed HTML.
//!
//! One pass over a document produces [`DocumentSignals`]: meta tags,
//! heading structure, text volume, images, JSON-LD, social tags, hreflang,
//! form labelling and legal links. Both analyzers build on it; the light
//! analyzer keeps a reduced view, the deep analyzer adds HTTP and network
//! measurements.
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and the
//! parsed document never outlives [`extract_signals`].

use super::jsonld::{LdNode, TypeReport};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;
use url::Url;

/// All signals extracted from one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSignals {
    pub meta: MetaSignals,
    pub headings: HeadingSignals,
    pub word_count: usize,
    pub images: ImageSignals,
    pub structured_data: StructuredDataSignals,
    pub social: SocialSignals,
    pub hreflang: HreflangSignals,
    pub forms: FormSignals,
    pub legal: LegalSignals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaSignals {
    pub title: Option<String>,
    /// Title length in characters (0 when missing).
    pub title_len: usize,
    pub description: Option<String>,
    pub description_len: usize,
    /// `<html lang>`.
    pub lang: Option<String>,
    /// Absolute canonical URL.
    pub canonical: Option<String>,
    /// Content of `<meta name="robots">`.
    pub robots: Option<String>,
    pub viewport: bool,
}

impl MetaSignals {
    pub fn noindex(&self) -> bool {
        self.robots.as_deref().map(has_noindex).unwrap_or(false)
    }
}

/// True when a robots directive list contains `noindex` (or `none`).
pub fn has_noindex(directives: &str) -> bool {
    directives
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_ascii_lowercase())
        .any(|t| t == "noindex" || t == "none")
}

/// A heading that descends more than one level below its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingJump {
    pub from: u8,
    pub to: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadingSignals {
    /// Occurrences of h1..h6.
    pub counts: [u32; 6],
    /// Order violations in document order.
    pub jumps: Vec<HeadingJump>,
}

impl HeadingSignals {
    pub fn h1(&self) -> u32 {
        self.counts[0]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Order violations for a sequence of heading levels.
///
/// Only skips while descending count: h2 → h4 is a jump, h4 → h2 is not.
pub fn heading_jumps(levels: &[u8]) -> Vec<HeadingJump> {
    levels
        .windows(2)
        .filter(|w| w[1] > w[0] + 1)
        .map(|w| HeadingJump {
            from: w[0],
            to: w[1],
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSignals {
    pub count: usize,
    /// Images without an `alt` attribute. An empty `alt` marks a decorative
    /// image and is not counted.
    pub missing_alt: usize,
    /// `loading="lazy"` or deferred via `data-src`/`data-srcset`.
    pub lazy: usize,
}

impl ImageSignals {
    /// Share of images without alt, in [0, 1].
    pub fn missing_alt_ratio(&self) -> f64 {
        ratio(self.missing_alt, self.count, 0.0)
    }

    pub fn lazy_ratio(&self) -> f64 {
        ratio(self.lazy, self.count, 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDataSignals {
    /// `application/ld+json` script blocks, valid or not.
    pub blocks: usize,
    pub invalid_blocks: usize,
    /// Blocks placed inside `<head>`.
    pub blocks_in_head: usize,
    pub report: TypeReport,
}

impl StructuredDataSignals {
    pub fn present(&self) -> bool {
        self.blocks > self.invalid_blocks
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialSignals {
    pub og_title: bool,
    pub og_description: bool,
    pub og_image: bool,
    pub og_url: bool,
    pub og_type: bool,
    pub twitter_card: bool,
}

impl SocialSignals {
    /// og:title, og:description and og:image.
    pub fn og_basic(&self) -> bool {
        self.og_title && self.og_description && self.og_image
    }

    /// Share of the six tracked social tags that are present.
    pub fn completeness(&self) -> f64 {
        let present = [
            self.og_title,
            self.og_description,
            self.og_image,
            self.og_url,
            self.og_type,
            self.twitter_card,
        ]
        .iter()
        .filter(|p| **p)
        .count();
        present as f64 / 6.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HreflangSignals {
    /// Distinct hreflang values, lowercased.
    pub languages: BTreeSet<String>,
    pub x_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSignals {
    pub inputs: usize,
    pub labelled: usize,
}

impl FormSignals {
    /// Labelled share of user-facing inputs; 1.0 without inputs.
    pub fn coverage(&self) -> f64 {
        ratio(self.labelled, self.inputs, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalSignals {
    pub imprint_link: bool,
    pub privacy_link: bool,
}

fn ratio(part: usize, whole: usize, empty: f64) -> f64 {
    if whole == 0 {
        empty
    } else {
        (part as f64 / whole as f64).clamp(0.0, 1.0)
    }
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn imprint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)impressum|imprint|legal[- ]notice").unwrap())
}

fn privacy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)datenschutz|privacy").unwrap())
}

/// Extract all signals from `html`, resolving relative URLs against `page_url`.
pub fn extract_signals(html: &str, page_url: &str) -> DocumentSignals {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    DocumentSignals {
        meta: extract_meta(&document, base.as_ref()),
        headings: extract_headings(&document),
        word_count: count_words(&document),
        images: extract_images(&document),
        structured_data: extract_structured_data(&document),
        social: extract_social(&document),
        hreflang: extract_hreflang(&document),
        forms: extract_forms(&document),
        legal: extract_legal(&document),
    }
}

/// Word count of the visible body text of `html`.
pub fn word_count(html: &str) -> usize {
    count_words(&Html::parse_document(html))
}

/// Path ≤ 120 characters, no uppercase in path or query, ≤ 4 query parameters.
pub fn url_clean(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path();
    let query = parsed.query().unwrap_or("");
    // Percent-escapes use uppercase hex; judge the decoded text.
    let decoded = |raw: &str| {
        String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
    };
    path.chars().count() <= 120
        && !decoded(path).chars().chain(decoded(query).chars()).any(|c| c.is_uppercase())
        && parsed.query_pairs().count() <= 4
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Content of the first `<meta>` whose `attr` equals `key` (case-insensitive).
fn meta_content(document: &Html, attr: &str, key: &str) -> Option<String> {
    document
        .select(&sel("meta"))
        .find(|m| {
            m.value()
                .attr(attr)
                .map(|v| v.trim().eq_ignore_ascii_case(key))
                .unwrap_or(false)
        })
        .and_then(|m| non_empty(m.value().attr("content")))
}

fn rel_contains(element: ElementRef<'_>, token: &str) -> bool {
    element
        .value()
        .attr("rel")
        .map(|rel| {
            rel.split_whitespace()
                .any(|r| r.eq_ignore_ascii_case(token))
        })
        .unwrap_or(false)
}

fn extract_meta(document: &Html, base: Option<&Url>) -> MetaSignals {
    let title = document
        .select(&sel("title"))
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());
    let description = meta_content(document, "name", "description");

    let lang = document
        .select(&sel("html"))
        .next()
        .and_then(|h| non_empty(h.value().attr("lang")));

    let canonical = document
        .select(&sel("link[rel][href]"))
        .find(|l| rel_contains(*l, "canonical"))
        .and_then(|l| l.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| match base.and_then(|b| b.join(href).ok()) {
            Some(abs) => abs.to_string(),
            None => href.to_string(),
        });

    MetaSignals {
        title_len: title.as_ref().map(|t| t.chars().count()).unwrap_or(0),
        title,
        description_len: description
            .as_ref()
            .map(|d| d.chars().count())
            .unwrap_or(0),
        description,
        lang,
        canonical,
        robots: meta_content(document, "name", "robots"),
        viewport: meta_content(document, "name", "viewport").is_some(),
    }
}

fn extract_headings(document: &Html) -> HeadingSignals {
    let mut counts = [0u32; 6];
    let mut levels = Vec::new();
    for h in document.select(&sel("h1, h2, h3, h4, h5, h6")) {
        let level = h.value().name().as_bytes()[1] - b'0';
        counts[(level - 1) as usize] += 1;
        levels.push(level);
    }
    HeadingSignals {
        counts,
        jumps: heading_jumps(&levels),
    }
}

const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

fn count_words(document: &Html) -> usize {
    let root = document
        .select(&sel("body"))
        .next()
        .unwrap_or_else(|| document.root_element());
    let mut text = String::new();
    collect_text(root, &mut text);
    text.split_whitespace().count()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => {
                out.push(' ');
                out.push_str(t);
            }
            Node::Element(e) if !NON_TEXT_ELEMENTS.contains(&e.name()) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn extract_images(document: &Html) -> ImageSignals {
    let mut images = ImageSignals::default();
    for img in document.select(&sel("img")) {
        let el = img.value();
        images.count += 1;
        if el.attr("alt").is_none() {
            images.missing_alt += 1;
        }
        let lazy = el
            .attr("loading")
            .map(|l| l.trim().eq_ignore_ascii_case("lazy"))
            .unwrap_or(false)
            || el.attr("data-src").is_some()
            || el.attr("data-srcset").is_some();
        if lazy {
            images.lazy += 1;
        }
    }
    images
}

fn inside(element: ElementRef<'_>, tag: &str) -> bool {
    element
        .ancestors()
        .filter_map(|a| a.value().as_element())
        .any(|e| e.name() == tag)
}

fn extract_structured_data(document: &Html) -> StructuredDataSignals {
    let mut sd = StructuredDataSignals::default();
    let script_sel = sel("script[type]");
    let scripts = document.select(&script_sel).filter(|s| {
        s.value()
            .attr("type")
            .map(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
            .unwrap_or(false)
    });

    for script in scripts {
        sd.blocks += 1;
        if inside(script, "head") {
            sd.blocks_in_head += 1;
        }
        let text: String = script.text().collect();
        match LdNode::parse(&text) {
            Some(node) => sd.report.visit(&node),
            None => sd.invalid_blocks += 1,
        }
    }
    sd
}

fn social_tag(document: &Html, key: &str) -> bool {
    meta_content(document, "property", key).is_some()
        || meta_content(document, "name", key).is_some()
}

fn extract_social(document: &Html) -> SocialSignals {
    SocialSignals {
        og_title: social_tag(document, "og:title"),
        og_description: social_tag(document, "og:description"),
        og_image: social_tag(document, "og:image"),
        og_url: social_tag(document, "og:url"),
        og_type: social_tag(document, "og:type"),
        twitter_card: social_tag(document, "twitter:card"),
    }
}

fn extract_hreflang(document: &Html) -> HreflangSignals {
    let mut hreflang = HreflangSignals::default();
    for link in document.select(&sel("link[hreflang]")) {
        if !rel_contains(link, "alternate") {
            continue;
        }
        if let Some(lang) = non_empty(link.value().attr("hreflang")) {
            let lang = lang.to_ascii_lowercase();
            if lang == "x-default" {
                hreflang.x_default = true;
            }
            hreflang.languages.insert(lang);
        }
    }
    hreflang
}

const UNLABELLED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

fn extract_forms(document: &Html) -> FormSignals {
    let label_targets: HashSet<String> = document
        .select(&sel("label[for]"))
        .filter_map(|l| non_empty(l.value().attr("for")))
        .collect();

    let mut forms = FormSignals::default();
    for field in document.select(&sel("input, select, textarea")) {
        let el = field.value();
        let input_type = el.attr("type").unwrap_or("text").trim().to_ascii_lowercase();
        if el.name() == "input" && UNLABELLED_INPUT_TYPES.contains(&input_type.as_str()) {
            continue;
        }
        forms.inputs += 1;

        let labelled = non_empty(el.attr("aria-label")).is_some()
            || non_empty(el.attr("aria-labelledby")).is_some()
            || non_empty(el.attr("title")).is_some()
            || el
                .attr("id")
                .map(|id| label_targets.contains(id.trim()))
                .unwrap_or(false)
            || inside(field, "label");
        if labelled {
            forms.labelled += 1;
        }
    }
    forms
}

fn extract_legal(document: &Html) -> LegalSignals {
    let mut legal = LegalSignals::default();
    for a in document.select(&sel("a[href]")) {
        let href = a.value().attr("href").unwrap_or("");
        let text = text_of(a);
        if imprint_regex().is_match(href) || imprint_regex().is_match(&text) {
            legal.imprint_link = true;
        }
        if privacy_regex().is_match(href) || privacy_regex().is_match(&text) {
            legal.privacy_link = true;
        }
    }
    legal
}
