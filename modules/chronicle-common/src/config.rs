use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ChronicleError;

/// Pipeline configuration loaded from environment variables.
///
/// Every value has a default, so an empty environment yields a working
/// configuration. Model credentials are not part of it: the model-call
/// capability is injected by the caller, already configured.
#[derive(Debug, Clone)]
pub struct Config {
    /// Courtesy pause between dependent model calls within one run.
    pub call_delay: Duration,
    /// Skeleton events expanded per model call in the events phase.
    pub events_chunk_size: usize,
    /// Paragraphs kept per story beat.
    pub max_beat_paragraphs: usize,
    /// Emit logs as JSON lines instead of the human formatter.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_millis(1500),
            events_chunk_size: 6,
            max_beat_paragraphs: 3,
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from `CHRONICLE_*` environment variables.
    pub fn from_env() -> Result<Self, ChronicleError> {
        let defaults = Self::default();

        let config = Self {
            call_delay: Duration::from_millis(env_or(
                "CHRONICLE_CALL_DELAY_MS",
                defaults.call_delay.as_millis() as u64,
            )?),
            events_chunk_size: env_or("CHRONICLE_EVENTS_CHUNK_SIZE", defaults.events_chunk_size)?
                .max(1),
            max_beat_paragraphs: env_or(
                "CHRONICLE_MAX_BEAT_PARAGRAPHS",
                defaults.max_beat_paragraphs,
            )?
            .max(1),
            log_json: env_or("CHRONICLE_LOG_JSON", defaults.log_json)?,
        };

        Ok(config)
    }

    /// No delay between calls. For tests and fixture replays.
    pub fn without_delay() -> Self {
        Self {
            call_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  CHRONICLE_CALL_DELAY_MS: {}", self.call_delay.as_millis());
        tracing::info!("  CHRONICLE_EVENTS_CHUNK_SIZE: {}", self.events_chunk_size);
        tracing::info!("  CHRONICLE_MAX_BEAT_PARAGRAPHS: {}", self.max_beat_paragraphs);
        tracing::info!("  CHRONICLE_LOG_JSON: {}", self.log_json);
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, ChronicleError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ChronicleError::Config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(default),
    }
}
