// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for audit telemetry.
//!
//! The pipeline emits `ProgressEvent`s at stage boundaries and per page,
//! which flow through a `tokio::sync::broadcast` channel to all subscribers
//! (the job runner, CLI output). When no subscriber exists, events are
//! silently dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted during an audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The job this event belongs to.
    pub job_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A pipeline stage has started.
    StageStarted { stage: AuditStage, message: String },
    /// A pipeline stage completed; `percent` is its checkpoint.
    StageCompleted {
        stage: AuditStage,
        message: String,
        percent: u8,
        duration_ms: u64,
    },
    /// A stage was disabled by the run options.
    StageSkipped {
        stage: AuditStage,
        reason: String,
        percent: u8,
    },
    /// A single page was analyzed.
    PageAnalyzed { url: String, status: Option<u16> },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

impl ProgressEventKind {
    /// Checkpoint reached by this event, if it ends a stage.
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::StageCompleted { percent, .. } | Self::StageSkipped { percent, .. } => {
                Some(*percent)
            }
            _ => None,
        }
    }

    /// One-line description for job logs.
    pub fn describe(&self) -> String {
        match self {
            Self::StageStarted { stage, message } => format!("{stage}: {message}"),
            Self::StageCompleted {
                stage,
                message,
                duration_ms,
                ..
            } => format!("{stage} abgeschlossen in {duration_ms}ms: {message}"),
            Self::StageSkipped { stage, reason, .. } => format!("{stage} übersprungen: {reason}"),
            Self::PageAnalyzed { url, status } => match status {
                Some(status) => format!("{url} analysiert ({status})"),
                None => format!("{url} nicht erreichbar"),
            },
            Self::Warning { message } => format!("Warnung: {message}"),
        }
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditStage {
    MainPage,
    Sitemap,
    Seeding,
    Crawl,
    Sampling,
    Deep,
    Scoring,
}

impl AuditStage {
    /// Progress percentage reached when the stage ends.
    pub fn checkpoint(self) -> u8 {
        match self {
            Self::MainPage => 10,
            Self::Sitemap => 25,
            Self::Seeding => 35,
            Self::Crawl => 55,
            Self::Sampling => 75,
            Self::Deep => 95,
            Self::Scoring => 100,
        }
    }
}

impl std::fmt::Display for AuditStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainPage => write!(f, "Hauptseite"),
            Self::Sitemap => write!(f, "Sitemap"),
            Self::Seeding => write!(f, "Seeds"),
            Self::Crawl => write!(f, "Crawl"),
            Self::Sampling => write!(f, "Stichprobe"),
            Self::Deep => write!(f, "Tiefenanalyse"),
            Self::Scoring => write!(f, "Bewertung"),
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// 256 events cover the stage events plus per-page events of a default run.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emit a progress event, silently ignoring send errors (which occur when
/// no receivers are listening).
pub fn emit(tx: &Option<ProgressSender>, job_id: &str, seq: &mut u64, event: ProgressEventKind) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent {
            job_id: job_id.to_string(),
            seq: *seq,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_serialization() {
        let event = ProgressEvent {
            job_id: "job-1".to_string(),
            seq: 1,
            event: ProgressEventKind::StageCompleted {
                stage: AuditStage::Sitemap,
                message: "42 URLs".to_string(),
                percent: 25,
                duration_ms: 800,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("StageCompleted"));
        assert!(json.contains("Sitemap"));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.seq, 1);
        assert_eq!(parsed.event.percent(), Some(25));
    }

    #[test]
    fn test_checkpoints_are_increasing() {
        let stages = [
            AuditStage::MainPage,
            AuditStage::Sitemap,
            AuditStage::Seeding,
            AuditStage::Crawl,
            AuditStage::Sampling,
            AuditStage::Deep,
            AuditStage::Scoring,
        ];
        assert!(stages
            .windows(2)
            .all(|w| w[0].checkpoint() < w[1].checkpoint()));
        assert_eq!(AuditStage::Scoring.checkpoint(), 100);
    }

    #[test]
    fn test_channel_no_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        let mut seq = 0;
        emit(
            &Some(tx),
            "job",
            &mut seq,
            ProgressEventKind::Warning {
                message: "test".to_string(),
            },
        );
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_emit_none_sender() {
        let mut seq = 0;
        emit(
            &None,
            "job",
            &mut seq,
            ProgressEventKind::Warning {
                message: "test".to_string(),
            },
        );
        assert_eq!(seq, 0);
    }
}
