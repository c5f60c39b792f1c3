//! Chunking, embedding and retrieval configuration.

use std::str::FromStr;

use crate::errors::RagError;

/// Configuration for document ingestion and retrieval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RagConfig {
    /// Maximum chunk length, in characters.
    pub chunk_size: usize,
    /// Maximum characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks returned per retrieval.
    pub top_k: usize,
    /// Chunks sent per embedding request.
    pub embed_batch: usize,
    /// Embedding requests in flight at once.
    pub embed_concurrency: usize,
    /// If set, every vector must have exactly this dimension.
    pub expected_dim: Option<usize>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self::new_default()
    }
}

impl RagConfig {
    /// 1000/200 character chunks, top-4 retrieval.
    pub fn new_default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            embed_batch: 32,
            embed_concurrency: 4,
            expected_dim: None,
        }
    }

    /// Reads `CHUNK_SIZE`, `CHUNK_OVERLAP`, `RAG_TOP_K`, `EMBEDDING_BATCH`,
    /// `EMBEDDING_CONCURRENCY` and `EMBEDDING_DIM`, falling back to
    /// [`RagConfig::new_default`] for unset variables.
    ///
    /// # Errors
    /// `RagError::Config` if a variable is set but unparsable, or if the
    /// resulting config fails [`RagConfig::validate`].
    pub fn from_env() -> Result<Self, RagError> {
        let d = Self::new_default();
        let cfg = Self {
            chunk_size: parse_env("CHUNK_SIZE", d.chunk_size)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", d.chunk_overlap)?,
            top_k: parse_env("RAG_TOP_K", d.top_k)?,
            embed_batch: parse_env("EMBEDDING_BATCH", d.embed_batch)?,
            embed_concurrency: parse_env("EMBEDDING_CONCURRENCY", d.embed_concurrency)?,
            expected_dim: match std::env::var("EMBEDDING_DIM") {
                Ok(v) if !v.trim().is_empty() => Some(parse_value("EMBEDDING_DIM", &v)?),
                _ => None,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be > 0".into()));
        }
        if self.embed_batch == 0 {
            return Err(RagError::Config("embed_batch must be > 0".into()));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::Config("embed_concurrency must be > 0".into()));
        }
        if self.expected_dim == Some(0) {
            return Err(RagError::Config("expected_dim must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, dflt: T) -> Result<T, RagError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => parse_value(key, &v),
        _ => Ok(dflt),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, RagError> {
    raw.trim()
        .parse()
        .map_err(|_| RagError::Config(format!("{key}: cannot parse {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RagConfig::default();
        assert_eq!((cfg.chunk_size, cfg.chunk_overlap, cfg.top_k), (1000, 200, 4));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let cfg = RagConfig {
            chunk_overlap: 1000,
            ..RagConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn parse_value_reports_key() {
        let err = parse_value::<usize>("CHUNK_SIZE", "big").unwrap_err();
        assert!(err.to_string().contains("CHUNK_SIZE"));
        assert_eq!(parse_value::<usize>("CHUNK_SIZE", " 512 ").unwrap(), 512);
    }
}
