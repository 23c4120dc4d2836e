//! Per-slide restructuring with explicit fallback outcomes.

use crate::backend::{Backend, CompletionBackend};
use crate::prompt::build_prompt;
use crate::response::parse_reply;
use deck_core::{PipelineConfig, Provenance, RestructuredRecord, Result, SlideRecord};
use rayon::prelude::*;
use std::fmt;

/// Summary of a record whose reply arrived but could not be decoded.
pub const PARSE_FAILURE_SUMMARY: &str = "Restructuring completed, but the model reply could not be parsed";

/// Why a record fell back to the slide's own content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// The backend could not be reached or refused the request.
    Dispatch(String),
    /// The reply was not a usable JSON object.
    Parse(String),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::Dispatch(e) => write!(f, "dispatch failed: {}", e),
            DegradeReason::Parse(e) => write!(f, "reply not parsed: {}", e),
        }
    }
}

/// Result of restructuring one slide.
#[derive(Debug, Clone, PartialEq)]
pub enum RestructureOutcome {
    Complete(RestructuredRecord),
    Degraded {
        record: RestructuredRecord,
        reason: DegradeReason,
    },
}

impl RestructureOutcome {
    pub fn record(&self) -> &RestructuredRecord {
        match self {
            RestructureOutcome::Complete(record) => record,
            RestructureOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn into_record(self) -> RestructuredRecord {
        match self {
            RestructureOutcome::Complete(record) => record,
            RestructureOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RestructureOutcome::Degraded { .. })
    }
}

/// Rewrites slides through a completion backend.
pub struct Restructurer {
    backend: Box<dyn CompletionBackend>,
    workers: usize,
}

impl Restructurer {
    /// Build the configured backend and probe it.
    ///
    /// An unreachable backend is only a warning; each slide then degrades on
    /// its own.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let backend = Backend::from_config(config)?;
        if let Err(e) = backend.check() {
            log::warn!("{} backend at {} may be unavailable: {}", backend.id(), config.base_url(), e);
        }
        Ok(Self::with_backend(Box::new(backend), config.workers))
    }

    pub fn with_backend(backend: Box<dyn CompletionBackend>, workers: usize) -> Self {
        Self {
            backend,
            workers: workers.max(1),
        }
    }

    /// Restructure a single slide.
    pub fn restructure_slide(&self, slide: &SlideRecord) -> RestructureOutcome {
        log::debug!("Restructuring slide {}", slide.index);
        let provenance = Provenance::for_slide(slide, self.backend.id(), self.backend.model());

        let reply = match self.backend.send(&build_prompt(slide)) {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Slide {}: {}", slide.index, e);
                let message = e.to_string();
                let record = RestructuredRecord::from_slide(
                    slide,
                    format!("restructuring failed: {}", message),
                    Provenance {
                        error: Some(message.clone()),
                        ..provenance
                    },
                );
                return RestructureOutcome::Degraded {
                    record,
                    reason: DegradeReason::Dispatch(message),
                };
            }
        };

        match parse_reply(&reply) {
            Ok(parsed) => RestructureOutcome::Complete(RestructuredRecord {
                index: slide.index,
                title: slide.title.clone(),
                content: parsed.content.unwrap_or_else(|| slide.body_text.clone()),
                summary: parsed.summary.unwrap_or_default(),
                key_points: parsed.key_points.unwrap_or_else(|| slide.bullets.clone()),
                tags: parsed.tags.unwrap_or_default(),
                tables: slide.tables.clone(),
                notes: slide.notes.clone(),
                provenance,
            }),
            Err(e) => {
                log::warn!("Slide {}: {}", slide.index, e);
                let message = e.to_string();
                let mut record = RestructuredRecord::from_slide(
                    slide,
                    PARSE_FAILURE_SUMMARY,
                    Provenance {
                        error: Some(message.clone()),
                        raw_response: Some(reply.clone()),
                        ..provenance
                    },
                );
                if !reply.is_empty() {
                    record.content = reply;
                }
                RestructureOutcome::Degraded {
                    record,
                    reason: DegradeReason::Parse(message),
                }
            }
        }
    }

    /// Restructure every slide, preserving length and order.
    ///
    /// Slides are dispatched on a pool of `workers` threads.
    pub fn restructure(&self, slides: &[SlideRecord]) -> Vec<RestructuredRecord> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build();

        let records: Vec<RestructuredRecord> = match pool {
            Ok(pool) => pool.install(|| {
                slides
                    .par_iter()
                    .map(|slide| self.restructure_slide(slide).into_record())
                    .collect()
            }),
            Err(e) => {
                log::warn!("Cannot start {} workers ({}), restructuring sequentially", self.workers, e);
                slides
                    .iter()
                    .map(|slide| self.restructure_slide(slide).into_record())
                    .collect()
            }
        };

        let degraded = records.iter().filter(|r| r.provenance.error.is_some()).count();
        if degraded > 0 {
            log::warn!("{} of {} slides fell back to their original content", degraded, records.len());
        }
        records
    }
}
