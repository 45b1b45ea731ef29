use chronicle_common::{ChronicleError, Stage};
use thiserror::Error;

/// Errors that abort a generation run.
///
/// Malformed model output, unresolved references, rejected links and
/// failed catalog lookups are not errors: they degrade to less content and
/// are reported as [`RunEvent`](crate::report::RunEvent)s instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A phase was asked to run without an upstream output it reads.
    #[error("{phase} phase requires {missing}, which is not in the context")]
    Precondition { phase: Stage, missing: &'static str },

    /// The injected model-call capability failed.
    #[error("model call failed during {phase} phase: {source}")]
    Transport {
        phase: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("run cancelled before {phase} phase")]
    Cancelled { phase: Stage },

    #[error("invalid seed: {0}")]
    InvalidSeed(#[from] ChronicleError),
}

impl PipelineError {
    pub(crate) fn transport(phase: Stage, source: anyhow::Error) -> Self {
        Self::Transport {
            phase,
            source: source.into(),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
