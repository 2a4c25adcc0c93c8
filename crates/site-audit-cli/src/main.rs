// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! `site-audit`: discover and audit a website from the command line.

mod options;
mod report;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use options::RunArgs;
use site_audit::acquisition::HttpClient;
use site_audit::renderer::chromium::{find_chromium, ChromiumLauncher};
use site_audit::renderer::http::HttpLauncher;
use site_audit::renderer::BrowserLauncher;
use site_audit::{
    AuditPipeline, InMemoryJobStore, Job, JobRunner, JobStatus, JobStore, PipelineSettings,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(
    name = "site-audit",
    about = "Crawl a website and report SEO, structured-data and performance findings",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a site.
    Run(RunArgs),

    /// Report the renderer that `run` would use.
    Doctor,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Doctor => {
            match find_chromium() {
                Some(path) => println!("chromium: {}", path.display()),
                None => println!("chromium: not found (pages are rendered over plain HTTP)"),
            }
            let settings = PipelineSettings::from_env();
            println!("user agent: {}", settings.user_agent);
            println!("concurrency: {}", settings.concurrency);
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "site-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn launcher(http_only: bool, http: &HttpClient) -> Arc<dyn BrowserLauncher> {
    if !http_only {
        if find_chromium().is_some() {
            return Arc::new(ChromiumLauncher);
        }
        warn!("chromium not found, rendering over plain HTTP");
    }
    Arc::new(HttpLauncher::new(http.clone()))
}

/// Poll `job` until it is terminal, printing progress and new log lines.
/// The first completion of `interrupt` cancels the job.
async fn wait_for_job<F: Future>(runner: &JobRunner, job: &Job, interrupt: F) -> Result<Job> {
    let id = job.id;
    let mut last_progress = None;
    let mut logged = 0;
    let mut cancelling = false;
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt, if !cancelling => {
                cancelling = true;
                eprintln!("abbrechen ...");
                if let Err(e) = runner.cancel(id).await {
                    warn!("cancel failed: {e}");
                }
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
        let Some(job) = runner.get(id).await else {
            bail!("job {id} disappeared");
        };
        for entry in &job.logs[logged..] {
            eprintln!("  {}", entry.message);
        }
        logged = job.logs.len();
        if last_progress != Some(job.progress) {
            eprintln!("[{:>3}%] {}", job.progress, job.url);
            last_progress = Some(job.progress);
        }
        if job.status.is_terminal() {
            return Ok(job);
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let options = args.audit_options()?;
    let settings = PipelineSettings::from_env();
    let http = HttpClient::new(&settings);
    let pipeline = AuditPipeline::new(launcher(args.http_only, &http), settings).with_http_client(http);
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let runner = JobRunner::new(pipeline, store);

    let job = runner.submit(&args.url, options).await;
    let job = wait_for_job(&runner, &job, tokio::signal::ctrl_c()).await?;

    if job.status == JobStatus::Error {
        bail!(
            "audit failed: {}",
            job.error.as_deref().unwrap_or("unknown error")
        );
    }
    let Some(result) = job.result else {
        bail!("audit finished without a result");
    };

    if let Some(path) = &args.out {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("result written to {}", path.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report::summary(&result));
    }
    Ok(())
}
