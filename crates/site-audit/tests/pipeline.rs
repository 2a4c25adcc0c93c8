// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end audits over plain HTTP rendering against a local mock server.

use site_audit::acquisition::HttpClient;
use site_audit::findings::BROAD_BLOCK_ISSUE;
use site_audit::progress::{self, AuditStage, ProgressEventKind};
use site_audit::renderer::http::HttpLauncher;
use site_audit::{
    AuditError, AuditOptions, AuditPipeline, Impact, InMemoryJobStore, Job, JobRunner, JobStatus,
    PipelineSettings, Severity,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME: &str = r#"<!DOCTYPE html>
<html lang="de">
<head>
  <title>Tischlerei Muster | Möbel nach Maß aus Holz</title>
  <meta name="description" content="Individuelle Möbel, Küchen und Innenausbau aus unserer Meisterwerkstatt. Beratung, Planung und Montage aus einer Hand.">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <link rel="canonical" href="/">
  <meta property="og:title" content="Tischlerei Muster">
  <script type="application/ld+json">
  {"@context": "https://schema.org", "@type": "LocalBusiness", "name": "Tischlerei Muster",
   "address": {"@type": "PostalAddress", "streetAddress": "Hauptstr. 1"}, "telephone": "+49 30 123456"}
  </script>
</head>
<body>
  <h1>Möbel nach Maß</h1>
  <h2>Leistungen</h2>
  <p>Wir planen und bauen Möbel für Wohnung, Büro und Praxis.</p>
  <a href="/leistungen">Leistungen</a>
  <a href="/impressum">Impressum</a>
  <a href="/datenschutz">Datenschutz</a>
</body>
</html>"#;

fn settings() -> PipelineSettings {
    PipelineSettings {
        http_timeout_ms: 5_000,
        nav_timeout_ms: 5_000,
        concurrency: 2,
        ..PipelineSettings::default()
    }
}

fn pipeline() -> AuditPipeline {
    let settings = settings();
    let http = HttpClient::new(&settings).without_retries();
    AuditPipeline::new(Arc::new(HttpLauncher::new(http.clone())), settings).with_http_client(http)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

fn quick_options() -> AuditOptions {
    AuditOptions {
        crawl: false,
        guess_common_paths: false,
        deep_cap: 0,
        ..AuditOptions::default()
    }
}

async fn small_site() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME))
        .mount(&server)
        .await;
    for page in ["/leistungen", "/impressum", "/datenschutz"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("<html><head><title>Unterseite</title></head><body><h1>Seite</h1></body></html>"))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nDisallow:\nSitemap: {base}/sitemap.xml\n")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>{base}/</loc></url><url><loc>{base}/leistungen</loc></url></urlset>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;
    server
}

async fn wait_for_terminal(runner: &JobRunner, job: &Job) -> Job {
    for _ in 0..200 {
        let current = runner.get(job.id).await.unwrap();
        if current.status.is_terminal() {
            return current;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} did not finish", job.id);
}

#[tokio::test]
async fn test_full_audit_of_small_site() {
    let server = small_site().await;
    let options = AuditOptions {
        guess_common_paths: false,
        deep_cap: 2,
        ..AuditOptions::default()
    };

    let result = pipeline()
        .run(&server.uri(), &options, None, "test", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.main.status, 200);
    assert!(result.main.indexable);
    assert!(result.robots.listed_in_robots);
    assert_eq!(result.robots.found.len(), 2);

    let base = server.uri();
    assert_eq!(result.discovered[0], format!("{base}/"));
    assert!(result.discovered.contains(&format!("{base}/impressum")));
    assert_eq!(result.discovered_count, result.discovered.len());
    assert_eq!(result.discovered_count, 4);

    assert_eq!(result.sampled.len(), 3);
    assert!(result.sampled.iter().all(|p| p.ok));
    assert!(result.sampled.iter().all(|p| p.url != format!("{base}/")));
    assert_eq!(result.crawl_analysis.len(), 2);
    assert_eq!(result.summary.pages_scanned, 1 + 3 + 2);

    assert!(result.score.total <= 100);
    assert!(result.score.structured_data > 0);
    assert!(result.finished_at >= result.started_at);
}

#[tokio::test]
async fn test_page_events_precede_sampling_checkpoint() {
    let server = small_site().await;
    let (tx, mut rx) = progress::channel();
    let options = AuditOptions {
        guess_common_paths: false,
        deep_cap: 0,
        ..AuditOptions::default()
    };

    let result = pipeline()
        .run(&server.uri(), &options, Some(tx), "job-1", &CancellationToken::new())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));

    let sampling_done = events
        .iter()
        .position(|e| {
            matches!(
                e.event,
                ProgressEventKind::StageCompleted {
                    stage: AuditStage::Sampling,
                    ..
                }
            )
        })
        .unwrap();
    let page_events: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e.event, ProgressEventKind::PageAnalyzed { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(page_events.len(), result.sampled.len());
    assert!(page_events.iter().all(|i| *i < sampling_done));
}

#[tokio::test]
async fn test_missing_main_page_is_not_indexable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("<html><body>weg</body></html>", "text/html"))
        .mount(&server)
        .await;

    let result = pipeline()
        .run(&server.uri(), &quick_options(), None, "test", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.main.status, 404);
    assert!(!result.main.indexable);
    let finding = result
        .findings
        .iter()
        .find(|f| f.issue.starts_with("Seite nicht indexierbar"))
        .unwrap();
    assert_eq!(finding.severity, Severity::Fehler);
    assert_eq!(result.findings[0].severity, Severity::Fehler);
}

#[tokio::test]
async fn test_robots_broad_block_reported_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;

    let result = pipeline()
        .run(&server.uri(), &quick_options(), None, "test", &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.robots.broad_block);
    assert!(result
        .robots
        .tried
        .contains(&format!("{}/sitemap.xml", server.uri())));
    let issue = result
        .issues
        .iter()
        .find(|i| i.text == BROAD_BLOCK_ISSUE)
        .unwrap();
    assert_eq!(issue.impact, Impact::Hoch);
    assert_eq!(result.issues[0].impact, Impact::Hoch);
}

#[tokio::test]
async fn test_invalid_input_fails_fast() {
    let pipeline = pipeline();
    let cancel = CancellationToken::new();

    let err = pipeline
        .run("ftp://example.com", &quick_options(), None, "test", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::InvalidUrl { .. }));

    let options = AuditOptions {
        include_patterns: vec!["(".to_string()],
        ..quick_options()
    };
    let err = pipeline
        .run("https://example.com", &options, None, "test", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::InvalidPattern { .. }));
}

#[tokio::test]
async fn test_unreachable_main_page_fails_run() {
    let err = pipeline()
        .run("http://127.0.0.1:1/", &quick_options(), None, "test", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::MainPage { .. }));
}

#[tokio::test]
async fn test_job_runs_to_completion() {
    let server = small_site().await;
    let runner = JobRunner::new(pipeline(), Arc::new(InMemoryJobStore::new()));

    let job = runner.submit(&server.uri(), quick_options()).await;
    assert_eq!(job.status, JobStatus::Queued);

    let done = wait_for_terminal(&runner, &job).await;
    assert_eq!(done.status, JobStatus::Done, "{:?}", done.error);
    assert_eq!(done.progress, 100);
    assert!(done.error.is_none());
    assert!(done.finished_at.is_some());
    assert!(done.logs.len() > 2);
    let result = done.result.unwrap();
    assert_eq!(result.main.status, 200);
}

#[tokio::test]
async fn test_cancelled_job_ends_in_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    let runner = JobRunner::new(pipeline(), Arc::new(InMemoryJobStore::new()));

    let job = runner.submit(&server.uri(), quick_options()).await;
    runner.cancel(job.id).await.unwrap();

    let done = wait_for_terminal(&runner, &job).await;
    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(done.error.as_deref(), Some("Audit abgebrochen"));
    assert!(done.result.is_none());
}

#[tokio::test]
async fn test_unknown_job_cannot_be_cancelled() {
    let runner = JobRunner::new(pipeline(), Arc::new(InMemoryJobStore::new()));
    assert!(runner.cancel(uuid::Uuid::new_v4()).await.is_err());
}
