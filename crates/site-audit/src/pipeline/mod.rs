// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! The discovery-and-analysis pipeline.
//!
//! Stages run strictly in sequence: main page, sitemap, seeding, crawl,
//! sampling, deep analysis, scoring. Within the sampling, seeding and deep
//! stages, page operations fan out with a bounded concurrency. The
//! cancellation token is checked at every stage boundary and before every
//! page operation.

mod result;

pub use result::{AuditResult, PageOutcome};

use crate::acquisition::HttpClient;
use crate::analysis::{DeepAnalyzer, LightAnalyzer, LightPage, PageFailure};
use crate::config::{AuditOptions, PipelineSettings};
use crate::discovery::{CommonPathProber, CrawlFrontier, CrawlOutput, CrawlRequest, SitemapResolver};
use crate::error::{AuditError, Result};
use crate::findings::score::{Score, ScoreFlags};
use crate::findings::{
    deep_page_findings, light_page_findings, main_page_issues, rank, rules::deep_findings,
    FindingSummary,
};
use crate::progress::{emit, AuditStage, ProgressEventKind, ProgressSender};
use crate::renderer::BrowserLauncher;
use crate::urls::{origin, parse_target, NormalizePolicy};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Emits the progress events of one run.
struct Reporter {
    tx: Option<ProgressSender>,
    job_id: String,
    seq: u64,
}

impl Reporter {
    fn send(&mut self, event: ProgressEventKind) {
        emit(&self.tx, &self.job_id, &mut self.seq, event);
    }

    fn started(&mut self, stage: AuditStage, message: impl Into<String>) -> Instant {
        self.send(ProgressEventKind::StageStarted {
            stage,
            message: message.into(),
        });
        Instant::now()
    }

    fn completed(&mut self, stage: AuditStage, started: Instant, message: impl Into<String>) {
        let message = message.into();
        info!("{stage}: {message}");
        self.send(ProgressEventKind::StageCompleted {
            stage,
            message,
            percent: stage.checkpoint(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    fn skipped(&mut self, stage: AuditStage, reason: &str) {
        self.send(ProgressEventKind::StageSkipped {
            stage,
            reason: reason.to_string(),
            percent: stage.checkpoint(),
        });
    }

    fn warning(&mut self, message: String) {
        warn!("{message}");
        self.send(ProgressEventKind::Warning { message });
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(AuditError::Cancelled)
    } else {
        Ok(())
    }
}

/// Append `urls` to `out`, skipping anything already in `seen`.
fn union_into(out: &mut Vec<String>, seen: &mut HashSet<String>, urls: impl IntoIterator<Item = String>) {
    for url in urls {
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
}

/// Runs audits. Cheap to clone; one instance serves many concurrent jobs.
#[derive(Clone)]
pub struct AuditPipeline {
    http: HttpClient,
    launcher: Arc<dyn BrowserLauncher>,
    settings: PipelineSettings,
}

impl AuditPipeline {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: PipelineSettings) -> Self {
        Self {
            http: HttpClient::new(&settings),
            launcher,
            settings,
        }
    }

    /// Use `http` for every non-rendered fetch.
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Discover and analyze the site of `url`.
    ///
    /// Fails only on invalid input, main-page failure or cancellation;
    /// per-page failures are recorded in the result.
    pub async fn run(
        &self,
        url: &str,
        options: &AuditOptions,
        progress: Option<ProgressSender>,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AuditResult> {
        let started_at = Utc::now();
        let patterns = options.validate()?;
        let target = parse_target(url)?;
        let origin = origin(&target);
        let policy = NormalizePolicy {
            keep_query: options.keep_query,
            keep_hash: options.keep_hash,
        };
        let concurrency = self.settings.concurrency.max(1);
        let mut reporter = Reporter {
            tx: progress,
            job_id: job_id.to_string(),
            seq: 0,
        };

        info!("audit of {target} started");

        // 1. Main page
        checkpoint(cancel)?;
        let t = reporter.started(AuditStage::MainPage, target.as_str());
        let deep = DeepAnalyzer::new(self.http.clone(), self.settings.clone());
        debug!("launching {} renderer for the main page", self.launcher.name());
        let renderer = self
            .launcher
            .launch()
            .await
            .map_err(|e| AuditError::Browser(format!("{e:#}")))?;
        let main = deep.analyze(renderer.as_ref(), target.as_str()).await;
        if let Err(e) = renderer.shutdown().await {
            warn!("renderer shutdown failed: {e:#}");
        }
        let main = main.map_err(|failure| AuditError::MainPage {
            url: failure.url,
            reason: failure.reason,
        })?;
        reporter.completed(
            AuditStage::MainPage,
            t,
            format!("Status {}, {} Wörter", main.status, main.document.word_count),
        );

        // 2. Sitemap
        checkpoint(cancel)?;
        let t = reporter.started(AuditStage::Sitemap, origin.as_str());
        let sitemap_cap = if options.include_sitemap {
            self.settings.sitemap_cap
        } else {
            0
        };
        let report = SitemapResolver::new(self.http.clone())
            .resolve(&origin, sitemap_cap, cancel)
            .await;
        checkpoint(cancel)?;
        reporter.completed(
            AuditStage::Sitemap,
            t,
            format!(
                "{} URLs aus {} Sitemaps",
                report.found.len(),
                report.tried.len()
            ),
        );

        // 3. Seeding
        checkpoint(cancel)?;
        let light = LightAnalyzer::new(self.http.clone());
        let mut seeds: Vec<String> = Vec::new();
        let mut seed_set = HashSet::new();
        for raw in &options.extra_seeds {
            match parse_target(raw) {
                Ok(seed) => union_into(&mut seeds, &mut seed_set, [policy.normalize(&seed).to_string()]),
                Err(e) => reporter.warning(format!("Seed ignoriert: {e}")),
            }
        }
        if options.guess_common_paths {
            let t = reporter.started(AuditStage::Seeding, "Standardpfade prüfen");
            let guessed = CommonPathProber::new(light.clone(), concurrency)
                .probe(&origin, cancel)
                .await;
            checkpoint(cancel)?;
            let count = guessed.len();
            union_into(&mut seeds, &mut seed_set, guessed);
            reporter.completed(AuditStage::Seeding, t, format!("{count} Pfade bestätigt"));
        } else {
            reporter.skipped(AuditStage::Seeding, "Pfadsuche deaktiviert");
        }

        // 4. Crawl
        checkpoint(cancel)?;
        let crawl = if options.crawl {
            let t = reporter.started(AuditStage::Crawl, format!("max. {} Seiten", options.max_pages));
            let frontier = CrawlFrontier::new(
                self.http.clone(),
                Arc::clone(&self.launcher),
                self.settings.clone(),
            );
            let output = frontier
                .crawl(
                    CrawlRequest {
                        start: target.clone(),
                        seeds: seeds.clone(),
                        max_pages: options.max_pages,
                        render: options.crawl_render,
                        policy,
                        patterns: patterns.clone(),
                    },
                    cancel,
                )
                .await;
            checkpoint(cancel)?;
            reporter.completed(
                AuditStage::Crawl,
                t,
                format!("{} URLs, {} besucht", output.urls.len(), output.visited),
            );
            output
        } else {
            reporter.skipped(AuditStage::Crawl, "Crawl deaktiviert");
            CrawlOutput {
                urls: vec![policy.normalize(&target).to_string()],
                visited: 0,
                seen: 1,
            }
        };

        let main_key = policy.normalize(&target).to_string();
        let sitemap_urls: Vec<String> = report
            .found
            .iter()
            .filter_map(|u| policy.normalize_str(u))
            .collect();

        let mut discovered = Vec::new();
        let mut discovered_set = HashSet::new();
        union_into(&mut discovered, &mut discovered_set, crawl.urls.iter().cloned());
        union_into(&mut discovered, &mut discovered_set, seeds.iter().cloned());
        union_into(&mut discovered, &mut discovered_set, sitemap_urls.iter().cloned());

        // 5. Sampling: sitemap sample plus crawl and seed URLs
        let mut sample: Vec<String> = Vec::new();
        let mut sample_set = HashSet::from([main_key.clone()]);
        if options.sample_sitemap {
            union_into(
                &mut sample,
                &mut sample_set,
                sitemap_urls.iter().take(options.sample_max).cloned(),
            );
        }
        union_into(&mut sample, &mut sample_set, crawl.urls.iter().cloned());
        union_into(&mut sample, &mut sample_set, seeds.iter().cloned());

        checkpoint(cancel)?;
        let t = reporter.started(AuditStage::Sampling, format!("{} Seiten", sample.len()));
        let mut pages = stream::iter(sample.into_iter().enumerate())
            .map(|(index, url)| {
                let light = light.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some((index, light.analyze(&url).await))
                }
            })
            .buffer_unordered(concurrency);
        let mut sampled: Vec<(usize, LightPage)> = Vec::new();
        while let Some(analyzed) = pages.next().await {
            let Some((index, page)) = analyzed else {
                continue;
            };
            reporter.send(ProgressEventKind::PageAnalyzed {
                url: page.url.clone(),
                status: page.status,
            });
            sampled.push((index, page));
        }
        checkpoint(cancel)?;
        sampled.sort_by_key(|(index, _)| *index);
        let sampled: Vec<LightPage> = sampled.into_iter().map(|(_, page)| page).collect();
        let ok_count = sampled.iter().filter(|p| p.ok).count();
        reporter.completed(
            AuditStage::Sampling,
            t,
            format!("{ok_count} von {} Seiten erreichbar", sampled.len()),
        );

        // 6. Deep analysis of discovered pages
        let deep_targets: Vec<String> = discovered
            .iter()
            .filter(|u| **u != main_key)
            .take(options.deep_cap)
            .cloned()
            .collect();
        let crawl_analysis = if deep_targets.is_empty() {
            reporter.skipped(AuditStage::Deep, "Keine Seiten für die Tiefenanalyse");
            Vec::new()
        } else {
            let t = reporter.started(AuditStage::Deep, format!("{} Seiten", deep_targets.len()));
            let outcomes = self.deep_batch(&deep, deep_targets, concurrency, cancel).await;
            checkpoint(cancel)?;
            for outcome in &outcomes {
                if let PageOutcome::Failed(failure) = outcome {
                    reporter.warning(format!("{}: {}", failure.url, failure.reason));
                }
            }
            reporter.completed(AuditStage::Deep, t, format!("{} Seiten", outcomes.len()));
            outcomes
        };

        // 7. Findings and score
        let t = reporter.started(AuditStage::Scoring, "Befunde und Score");
        let main_findings = deep_findings(&main);
        let issues = main_page_issues(&main_findings, &report);
        let mut findings = main_findings;
        findings.extend(light_page_findings(&sampled));
        findings.extend(deep_page_findings(crawl_analysis.iter().filter_map(
            |outcome| match outcome {
                PageOutcome::Analyzed(page) => Some(&**page),
                PageOutcome::Failed(_) => None,
            },
        )));
        rank(&mut findings);

        let summary = FindingSummary::new(1 + sampled.len() + crawl_analysis.len(), &findings);
        let score_flags = ScoreFlags::from_signals(&main, &report);
        let score = Score::compute(&score_flags);
        reporter.completed(
            AuditStage::Scoring,
            t,
            format!("Score {} / 100, {} Befunde", score.total, findings.len()),
        );

        info!(
            "audit of {target} finished: score {}, {} findings, {} URLs discovered",
            score.total,
            findings.len(),
            discovered.len()
        );

        Ok(AuditResult {
            url: target.to_string(),
            origin,
            main,
            robots: report,
            discovered_count: discovered.len(),
            discovered,
            sampled,
            crawl_analysis,
            findings,
            summary,
            issues,
            score,
            score_flags,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Deep-analyze `urls` with one renderer, shut down when the batch ends.
    async fn deep_batch(
        &self,
        deep: &DeepAnalyzer,
        urls: Vec<String>,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Vec<PageOutcome> {
        debug!("launching {} renderer for {} deep analyses", self.launcher.name(), urls.len());
        let renderer = match self.launcher.launch().await {
            Ok(renderer) => renderer,
            Err(e) => {
                let reason = format!("renderer unavailable: {e:#}");
                return urls
                    .into_iter()
                    .map(|url| {
                        PageOutcome::Failed(PageFailure {
                            url,
                            status: None,
                            reason: reason.clone(),
                        })
                    })
                    .collect();
            }
        };

        let mut outcomes: Vec<(usize, PageOutcome)> = stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| {
                let deep = deep.clone();
                let renderer = Arc::clone(&renderer);
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let outcome = match deep.analyze(renderer.as_ref(), &url).await {
                        Ok(page) => PageOutcome::Analyzed(Box::new(page)),
                        Err(failure) => PageOutcome::Failed(failure),
                    };
                    Some((index, outcome))
                }
            })
            .buffer_unordered(concurrency)
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await;

        if let Err(e) = renderer.shutdown().await {
            warn!("renderer shutdown failed: {e:#}");
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
