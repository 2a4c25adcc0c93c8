// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Site audit: discovery and analysis pipeline for single-origin SEO audits.
//!
//! The pipeline expands the sitemap tree, crawls the origin breadth-first,
//! inspects pages with a cheap HTTP pass and a rendered pass, and turns the
//! collected page signals into ranked findings and a 0–100 score.

pub mod acquisition;
pub mod analysis;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extraction;
pub mod findings;
pub mod jobs;
pub mod pipeline;
pub mod progress;
pub mod renderer;
pub mod urls;

pub use config::{AuditOptions, PipelineSettings};
pub use error::{AuditError, JobError, Result};
pub use findings::{Category, Finding, Impact, Issue, Severity};
pub use findings::score::Score;
pub use jobs::{InMemoryJobStore, Job, JobRunner, JobStatus, JobStore};
pub use pipeline::{AuditPipeline, AuditResult};
