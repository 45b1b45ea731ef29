//! Run events, the sinks that receive them, and the counters folded from them.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chronicle_common::Stage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::citations::CitationOrigin;
use crate::normalize::DroppedElement;

/// What kind of soft reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Category,
    Note,
    TurningPoint,
    RelationshipSource,
    RelationshipTarget,
    Citation,
    Theme,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Category => "category",
            Self::Note => "note",
            Self::TurningPoint => "turning_point",
            Self::RelationshipSource => "relationship_source",
            Self::RelationshipTarget => "relationship_target",
            Self::Citation => "citation",
            Self::Theme => "theme",
        };
        f.write_str(label)
    }
}

/// Everything observable about a run, as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    PhaseStarted {
        stage: Stage,
    },
    PhaseCompleted {
        stage: Stage,
        calls: u32,
    },
    ElementDropped {
        stage: Stage,
        path: String,
        reason: String,
    },
    /// A skeleton event had no usable model draft and was built from the
    /// skeleton alone.
    EventFallback {
        title: String,
    },
    ReferenceUnresolved {
        kind: ReferenceKind,
        reference: String,
    },
    CitationDiscarded {
        origin: CitationOrigin,
        number: u32,
        reason: String,
    },
    CitationMerged {
        origin: CitationOrigin,
        number: u32,
        into: u32,
    },
    LinkAccepted {
        event_slug: String,
        beat_index: usize,
        paragraph_index: usize,
    },
    LinkRejected {
        event_slug: String,
        beat_index: usize,
        paragraph_index: usize,
        reason: String,
    },
    /// A persisted-data lookup failed and the run carried on without it.
    LookupFailed {
        what: &'static str,
        error: String,
    },
}

impl From<DroppedElement> for RunEvent {
    fn from(dropped: DroppedElement) -> Self {
        RunEvent::ElementDropped {
            stage: dropped.stage,
            path: dropped.path,
            reason: dropped.reason,
        }
    }
}

/// Receives every run event as it happens.
///
/// Implemented by [`TracingSink`] (production) and [`MemoryReportSink`]
/// (tests). Also implemented for `Arc<S>` so a sink can be shared for
/// assertions.
pub trait ReportSink: Send + Sync {
    fn record(&self, event: &RunEvent);
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn record(&self, event: &RunEvent) {
        (**self).record(event)
    }
}

/// Forwards run events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn record(&self, event: &RunEvent) {
        match event {
            RunEvent::PhaseStarted { stage } => info!(%stage, "Phase started"),
            RunEvent::PhaseCompleted { stage, calls } => {
                info!(%stage, calls, "Phase completed")
            }
            RunEvent::ElementDropped {
                stage,
                path,
                reason,
            } => debug!(%stage, path = path.as_str(), reason = reason.as_str(), "Element dropped"),
            RunEvent::EventFallback { title } => {
                warn!(title = title.as_str(), "No draft for event, using skeleton content")
            }
            RunEvent::ReferenceUnresolved { kind, reference } => {
                debug!(%kind, reference = reference.as_str(), "Reference unresolved")
            }
            RunEvent::CitationDiscarded {
                origin,
                number,
                reason,
            } => debug!(?origin, number, reason = reason.as_str(), "Citation discarded"),
            RunEvent::CitationMerged {
                origin,
                number,
                into,
            } => debug!(?origin, number, into, "Citation merged"),
            RunEvent::LinkAccepted { event_slug, .. } => {
                debug!(event_slug = event_slug.as_str(), "Link accepted")
            }
            RunEvent::LinkRejected {
                event_slug,
                beat_index,
                paragraph_index,
                reason,
            } => debug!(
                event_slug = event_slug.as_str(),
                beat_index,
                paragraph_index,
                reason = reason.as_str(),
                "Link rejected"
            ),
            RunEvent::LookupFailed { what, error } => {
                warn!(what, error = error.as_str(), "Lookup failed, continuing without it")
            }
        }
    }
}

/// In-memory sink for tests. Thread-safe.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    events: Mutex<Vec<RunEvent>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemoryReportSink {
    fn record(&self, event: &RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Counters for a run, folded from its events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub phases_completed: u32,
    pub model_calls: u32,
    pub elements_dropped: u32,
    pub event_fallbacks: u32,
    pub references_unresolved: u32,
    pub citations_discarded: u32,
    pub citations_merged: u32,
    pub links_accepted: u32,
    pub links_rejected: u32,
    pub lookups_failed: u32,
}

impl RunReport {
    /// Pure state update. No I/O.
    pub fn absorb(&mut self, event: &RunEvent) {
        match event {
            RunEvent::PhaseStarted { .. } => {}
            RunEvent::PhaseCompleted { calls, .. } => {
                self.phases_completed += 1;
                self.model_calls += calls;
            }
            RunEvent::ElementDropped { .. } => self.elements_dropped += 1,
            RunEvent::EventFallback { .. } => self.event_fallbacks += 1,
            RunEvent::ReferenceUnresolved { .. } => self.references_unresolved += 1,
            RunEvent::CitationDiscarded { .. } => self.citations_discarded += 1,
            RunEvent::CitationMerged { .. } => self.citations_merged += 1,
            RunEvent::LinkAccepted { .. } => self.links_accepted += 1,
            RunEvent::LinkRejected { .. } => self.links_rejected += 1,
            RunEvent::LookupFailed { .. } => self.lookups_failed += 1,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Generation Run Complete ===")?;
        writeln!(f, "Phases completed:      {}", self.phases_completed)?;
        writeln!(f, "Model calls:           {}", self.model_calls)?;
        writeln!(f, "Elements dropped:      {}", self.elements_dropped)?;
        writeln!(f, "Event fallbacks:       {}", self.event_fallbacks)?;
        writeln!(f, "Unresolved references: {}", self.references_unresolved)?;
        writeln!(f, "Failed lookups:        {}", self.lookups_failed)?;
        writeln!(f, "\nCitations:")?;
        writeln!(f, "  Merged:    {}", self.citations_merged)?;
        writeln!(f, "  Discarded: {}", self.citations_discarded)?;
        let proposed = self.links_accepted + self.links_rejected;
        writeln!(f, "\nLinks:")?;
        writeln!(
            f,
            "  Accepted: {} ({:.0}%)",
            self.links_accepted,
            self.links_accepted as f64 / proposed.max(1) as f64 * 100.0
        )?;
        writeln!(f, "  Rejected: {}", self.links_rejected)?;
        Ok(())
    }
}

/// Sends each event to the sink and folds it into the run's report.
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
    report: RunReport,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            report: RunReport::default(),
        }
    }

    pub fn record(&mut self, event: RunEvent) {
        self.report.absorb(&event);
        self.sink.record(&event);
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_forwards_and_counts() {
        let sink = Arc::new(MemoryReportSink::new());
        let mut reporter = Reporter::new(sink.clone());

        reporter.record(RunEvent::PhaseStarted {
            stage: Stage::Research,
        });
        reporter.record(RunEvent::PhaseCompleted {
            stage: Stage::Research,
            calls: 1,
        });
        reporter.record(RunEvent::LinkRejected {
            event_slug: "hannibals-oath".into(),
            beat_index: 0,
            paragraph_index: 0,
            reason: "text not found".into(),
        });

        assert_eq!(sink.events().len(), 3);
        let report = reporter.into_report();
        assert_eq!(report.phases_completed, 1);
        assert_eq!(report.model_calls, 1);
        assert_eq!(report.links_rejected, 1);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = RunEvent::CitationMerged {
            origin: CitationOrigin::Enrichment,
            number: 2,
            into: 1,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "citation_merged");
        assert_eq!(value["origin"], "enrichment");
    }

    #[test]
    fn display_handles_zero_links() {
        let text = RunReport::default().to_string();
        assert!(text.contains("Accepted: 0 (0%)"));
    }
}
