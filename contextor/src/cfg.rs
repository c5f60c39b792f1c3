//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::error::ContextorError;

/// Knobs of the chat pipeline. Retrieval `k` lives in `rag_store::RagConfig`.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextorConfig {
    /// Character budget for retrieved context in the grounding prompt.
    pub max_ctx_chars: usize,
    /// Turns (user + assistant messages) kept per session; an odd value
    /// rounds down to whole exchanges.
    pub history_max_turns: usize,
    /// Inactivity after which a session is forgotten.
    pub session_ttl: Duration,
    /// Capacity of the chat frame channel.
    pub stream_buffer: usize,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            max_ctx_chars: 8000,
            history_max_turns: 20,
            session_ttl: Duration::from_secs(1800),
            stream_buffer: 32,
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables, falling back to [`Default`].
    ///
    /// # Errors
    /// [`ContextorError::Configuration`] if a variable is set but is not a
    /// valid number, or if a value is out of range.
    ///
    /// # Example
    /// ```
    /// # use contextor::ContextorConfig;
    /// let cfg = ContextorConfig::from_env().unwrap();
    /// assert!(cfg.stream_buffer >= 1);
    /// ```
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();
        let cfg = Self {
            max_ctx_chars: parse("MAX_CTX_CHARS", d.max_ctx_chars)?,
            history_max_turns: parse("HISTORY_MAX_TURNS", d.history_max_turns)?,
            session_ttl: Duration::from_secs(parse("SESSION_TTL_SECS", d.session_ttl.as_secs())?),
            stream_buffer: parse("STREAM_BUFFER", d.stream_buffer)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.stream_buffer == 0 {
            return Err(ContextorError::Configuration(
                "STREAM_BUFFER must be at least 1".into(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(ContextorError::Configuration(
                "SESSION_TTL_SECS must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> Result<T, ContextorError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|e| {
            ContextorError::Configuration(format!("{k}={v:?} is not a valid number: {e}"))
        }),
        _ => Ok(dflt),
    }
}
