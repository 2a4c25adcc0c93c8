// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Weighted point score over the main page.
//!
//! Each flag that holds adds a fixed number of points to its bucket. Buckets
//! are clamped to their maximum and the total to [0, 100].

use super::rules::strong_cache_header;
use crate::analysis::PageSignals;
use crate::discovery::SitemapReport;
use serde::{Deserialize, Serialize};

/// Score-relevant facts about the main page and its origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFlags {
    pub jsonld_present: bool,
    pub jsonld_valid: bool,
    pub jsonld_in_head: bool,
    pub type_specific_complete: bool,

    pub indexable: bool,
    pub canonical: bool,
    pub lang: bool,
    pub no_broad_block: bool,
    pub sitemap_found: bool,
    pub short_redirects: bool,
    pub clean_url: bool,
    pub caching: bool,

    pub title_ok: bool,
    pub description_ok: bool,
    pub single_h1: bool,
    pub heading_order: bool,
    pub enough_words: bool,
    pub alt_coverage: bool,

    pub og_complete: bool,
    pub twitter_card: bool,
}

impl ScoreFlags {
    pub fn from_signals(main: &PageSignals, sitemap: &SitemapReport) -> Self {
        let doc = &main.document;
        let sd = &doc.structured_data;
        let social = &doc.social;
        Self {
            jsonld_present: sd.present(),
            jsonld_valid: sd.blocks > 0 && sd.invalid_blocks == 0,
            jsonld_in_head: sd.blocks_in_head > 0,
            type_specific_complete: sd.present() && sd.report.type_specific_complete(),

            indexable: main.indexable,
            canonical: doc.meta.canonical.is_some(),
            lang: doc.meta.lang.is_some(),
            no_broad_block: !sitemap.broad_block,
            sitemap_found: !sitemap.found.is_empty(),
            short_redirects: main.redirect_chain_len <= 1,
            clean_url: main.url_clean,
            caching: strong_cache_header(main.cache_control.as_deref()),

            title_ok: (50..=60).contains(&doc.meta.title_len),
            description_ok: (140..=180).contains(&doc.meta.description_len),
            single_h1: doc.headings.h1() == 1,
            heading_order: doc.headings.jumps.is_empty(),
            enough_words: doc.word_count >= 200,
            alt_coverage: doc.images.missing_alt == 0,

            og_complete: social.og_basic() && social.og_url && social.og_type,
            twitter_card: social.twitter_card,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    StructuredData,
    Technical,
    Content,
    Social,
}

impl Bucket {
    pub const fn max(self) -> u32 {
        match self {
            Bucket::StructuredData => 30,
            Bucket::Technical => 35,
            Bucket::Content => 25,
            Bucket::Social => 10,
        }
    }
}

/// `(bucket, predicate, points)`.
pub type Weight = (Bucket, fn(&ScoreFlags) -> bool, u32);

pub static WEIGHTS: &[Weight] = &[
    (Bucket::StructuredData, |f| f.jsonld_present, 10),
    (Bucket::StructuredData, |f| f.jsonld_valid, 5),
    (Bucket::StructuredData, |f| f.jsonld_in_head, 5),
    (Bucket::StructuredData, |f| f.type_specific_complete, 10),
    (Bucket::Technical, |f| f.indexable, 10),
    (Bucket::Technical, |f| f.canonical, 5),
    (Bucket::Technical, |f| f.lang, 3),
    (Bucket::Technical, |f| f.no_broad_block, 5),
    (Bucket::Technical, |f| f.sitemap_found, 5),
    (Bucket::Technical, |f| f.short_redirects, 3),
    (Bucket::Technical, |f| f.clean_url, 2),
    (Bucket::Technical, |f| f.caching, 2),
    (Bucket::Content, |f| f.title_ok, 5),
    (Bucket::Content, |f| f.description_ok, 5),
    (Bucket::Content, |f| f.single_h1, 5),
    (Bucket::Content, |f| f.heading_order, 3),
    (Bucket::Content, |f| f.enough_words, 4),
    (Bucket::Content, |f| f.alt_coverage, 3),
    (Bucket::Social, |f| f.og_complete, 6),
    (Bucket::Social, |f| f.twitter_card, 4),
];

/// Score breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub structured_data: u32,
    pub technical: u32,
    pub content: u32,
    pub social: u32,
    pub total: u32,
}

impl Score {
    pub fn compute(flags: &ScoreFlags) -> Self {
        let bucket = |b: Bucket| {
            WEIGHTS
                .iter()
                .filter(|(wb, holds, _)| *wb == b && holds(flags))
                .map(|(_, _, points)| points)
                .sum::<u32>()
                .min(b.max())
        };
        let structured_data = bucket(Bucket::StructuredData);
        let technical = bucket(Bucket::Technical);
        let content = bucket(Bucket::Content);
        let social = bucket(Bucket::Social);
        Self {
            structured_data,
            technical,
            content,
            social,
            total: (structured_data + technical + content + social).min(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_flags() -> ScoreFlags {
        ScoreFlags {
            jsonld_present: true,
            jsonld_valid: true,
            jsonld_in_head: true,
            type_specific_complete: true,
            indexable: true,
            canonical: true,
            lang: true,
            no_broad_block: true,
            sitemap_found: true,
            short_redirects: true,
            clean_url: true,
            caching: true,
            title_ok: true,
            description_ok: true,
            single_h1: true,
            heading_order: true,
            enough_words: true,
            alt_coverage: true,
            og_complete: true,
            twitter_card: true,
        }
    }

    #[test]
    fn test_maximal_flags_score_100() {
        let score = Score::compute(&all_flags());
        assert_eq!(score.total, 100);
        assert_eq!(score.structured_data, 30);
        assert_eq!(score.technical, 35);
        assert_eq!(score.content, 25);
        assert_eq!(score.social, 10);
    }

    #[test]
    fn test_minimal_flags_score_0() {
        assert_eq!(Score::compute(&ScoreFlags::default()), Score::default());
    }

    #[test]
    fn test_bucket_weights_sum_to_max() {
        for bucket in [
            Bucket::StructuredData,
            Bucket::Technical,
            Bucket::Content,
            Bucket::Social,
        ] {
            let sum: u32 = WEIGHTS
                .iter()
                .filter(|(b, _, _)| *b == bucket)
                .map(|(_, _, p)| p)
                .sum();
            assert_eq!(sum, bucket.max());
        }
    }

    #[test]
    fn test_score_bounded_for_every_single_flag() {
        // Toggle each flag alone on top of none and all.
        for i in 0..WEIGHTS.len() {
            let mut bits = serde_json::to_value(ScoreFlags::default()).unwrap();
            let key = bits.as_object().unwrap().keys().nth(i).unwrap().clone();
            bits[&key] = serde_json::Value::Bool(true);
            let flags: ScoreFlags = serde_json::from_value(bits).unwrap();
            let score = Score::compute(&flags);
            assert!(score.total <= 100);
            assert!(score.total > 0);

            let mut bits = serde_json::to_value(all_flags()).unwrap();
            bits[&key] = serde_json::Value::Bool(false);
            let score = Score::compute(&serde_json::from_value(bits).unwrap());
            assert!(score.total < 100);
        }
    }
}
