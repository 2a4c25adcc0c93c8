// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! URL discovery: sitemap trees, conventional-path probing and the crawl
//! frontier.

pub mod frontier;
pub mod prober;
pub mod sitemap;

pub use frontier::{CrawlFrontier, CrawlOutput, CrawlRequest, LinkFilter};
pub use prober::CommonPathProber;
pub use sitemap::{parse_sitemap, SitemapDocument, SitemapReport, SitemapResolver};
