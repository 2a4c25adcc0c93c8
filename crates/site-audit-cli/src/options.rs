// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! `run` arguments and their translation into [`AuditOptions`].

use anyhow::{Context, Result};
use clap::Args;
use site_audit::AuditOptions;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// URL or host to audit.
    pub url: String,

    /// JSON file with audit options; flags override its values.
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Cap on crawled pages.
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Extract crawl links from rendered pages.
    #[arg(long)]
    pub render: bool,

    /// Skip the crawl.
    #[arg(long)]
    pub no_crawl: bool,

    /// Skip sitemap expansion and sampling.
    #[arg(long)]
    pub no_sitemap: bool,

    /// Number of discovered pages to analyze with rendering.
    #[arg(long)]
    pub deep: Option<usize>,

    /// Extra crawl seed (repeatable).
    #[arg(long = "seed")]
    pub seeds: Vec<String>,

    /// Regex every crawled URL must match (repeatable).
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Regex no crawled URL may match (repeatable; replaces the default).
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Keep query strings when normalizing URLs.
    #[arg(long)]
    pub keep_query: bool,

    /// Keep hash fragments when normalizing URLs.
    #[arg(long)]
    pub keep_hash: bool,

    /// Do not probe conventional paths (contact, imprint, ...).
    #[arg(long)]
    pub no_guess: bool,

    /// Never launch Chromium; render with plain HTTP.
    #[arg(long)]
    pub http_only: bool,

    /// Print the full result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write the JSON result to a file.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl RunArgs {
    pub fn audit_options(&self) -> Result<AuditOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                AuditOptions::from_json(&json)?
            }
            None => AuditOptions::default(),
        };

        if let Some(max_pages) = self.max_pages {
            options.max_pages = max_pages;
        }
        if let Some(deep) = self.deep {
            options.deep_cap = deep;
        }
        options.crawl_render |= self.render;
        options.keep_query |= self.keep_query;
        options.keep_hash |= self.keep_hash;
        if self.no_crawl {
            options.crawl = false;
        }
        if self.no_sitemap {
            options.include_sitemap = false;
            options.sample_sitemap = false;
        }
        if self.no_guess {
            options.guess_common_paths = false;
        }
        options.extra_seeds.extend(self.seeds.iter().cloned());
        options.include_patterns.extend(self.include.iter().cloned());
        if !self.exclude.is_empty() {
            options.exclude_patterns = self.exclude.clone();
        }

        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(url: &str) -> RunArgs {
        RunArgs {
            url: url.to_string(),
            ..RunArgs::default()
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let options = args("example.com").audit_options().unwrap();
        assert_eq!(options, AuditOptions::default());
    }

    #[test]
    fn test_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_pages": 20, "deep_cap": 2, "extra_seeds": ["https://example.com/a"]}}"#
        )
        .unwrap();

        let mut run = args("example.com");
        run.options = Some(file.path().to_path_buf());
        run.deep = Some(3);
        run.no_sitemap = true;
        run.seeds = vec!["https://example.com/b".to_string()];

        let options = run.audit_options().unwrap();
        assert_eq!(options.max_pages, 20);
        assert_eq!(options.deep_cap, 3);
        assert!(!options.include_sitemap && !options.sample_sitemap);
        assert_eq!(options.extra_seeds.len(), 2);
        assert!(options.crawl);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut run = args("example.com");
        run.max_pages = Some(0);
        assert!(run.audit_options().is_err());

        let mut run = args("example.com");
        run.include = vec!["(".to_string()];
        assert!(run.audit_options().is_err());

        let mut run = args("example.com");
        run.options = Some(PathBuf::from("/nonexistent/options.json"));
        assert!(run.audit_options().is_err());
    }
}
