//! Generation pipeline and narrative binding engine.
//!
//! Drives a topic seed through dependent model calls (research → skeleton →
//! narrative → events → enrichment → SEO), normalizes every weakly-typed
//! response into the strict `chronicle_common` schema, then binds the
//! structured content to persisted events: titles resolve to slugs,
//! citations are deduplicated and renumbered, and proposed in-text links
//! are validated against the authoritative slug set.
//!
//! The model call and the persisted-data lookups are injected through the
//! traits in [`traits`]; nothing here talks to a provider or a database.

pub mod binder;
pub mod citations;
pub mod error;
pub mod jsonish;
pub mod links;
pub mod normalize;
pub mod orchestrator;
pub mod phases;
pub mod prompts;
pub mod replay;
pub mod report;
pub mod schema;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use binder::{EventBinding, ExactThenContains, NarrativeBinder, NarrativeBindings, TitleMatcher};
pub use citations::{CitationOrigin, CitationRegistry, RegisteredCitation};
pub use error::{PipelineError, PipelineResult};
pub use links::{validate_links, LinkRejection, LinkValidation};
pub use normalize::Normalizer;
pub use orchestrator::{GenerationOutput, Orchestrator, PipelineDeps};
pub use report::{MemoryReportSink, ReportSink, RunEvent, RunReport, TracingSink};
pub use traits::{CitationCatalog, EventCatalog, NullCatalog, Prompt, PromptSubmitter};
