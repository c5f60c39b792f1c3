//! Embedding executor with batching, bounded concurrency and output checks.

use crate::{embed::EmbeddingsProvider, errors::RagError};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

/// Embeds all `texts`, `batch` texts per provider call, at most
/// `concurrency` calls in flight.
///
/// All-or-nothing: the first failing batch aborts the whole run and batches
/// still in flight are dropped. The result
/// has one vector per text, in input order, all of the same non-zero
/// dimension (`expected_dim` if given) and with finite components.
///
/// # Errors
/// - [`RagError::Provider`] if the provider call fails
/// - [`RagError::MalformedEmbedding`] on wrong vector count, empty or non-finite vectors
/// - [`RagError::VectorSizeMismatch`] on inconsistent dimensions
pub async fn embed_all(
    texts: &[String],
    provider: &dyn EmbeddingsProvider,
    batch: usize,
    concurrency: usize,
    expected_dim: Option<usize>,
) -> Result<Vec<Vec<f32>>, RagError> {
    info!(
        total = texts.len(),
        batch,
        concurrency,
        "embed_pool::embed_all"
    );
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let batches: Vec<(usize, &[String])> = texts.chunks(batch.max(1)).enumerate().collect();

    // futures are lazy: collecting them first starts no work, but keeps the
    // resulting stream provably `Send` for callers
    let jobs: Vec<_> = batches
        .into_iter()
        .map(|(i, slice)| async move {
            let vectors = provider.embed_batch(slice).await?;
            if vectors.len() != slice.len() {
                return Err(RagError::MalformedEmbedding(format!(
                    "batch {i}: expected {} vectors, got {}",
                    slice.len(),
                    vectors.len()
                )));
            }
            debug!(batch = i, size = slice.len(), "batch embedded");
            Ok::<_, RagError>((i, vectors))
        })
        .collect();

    let mut results: Vec<(usize, Vec<Vec<f32>>)> = stream::iter(jobs)
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    results.sort_by_key(|(i, _)| *i);
    let vectors: Vec<Vec<f32>> = results.into_iter().flat_map(|(_, v)| v).collect();

    let want = expected_dim.unwrap_or_else(|| vectors.first().map_or(0, Vec::len));
    for v in &vectors {
        check_vector(v, want)?;
    }

    debug!(count = vectors.len(), dim = want, "embed_pool::embed_all done");
    Ok(vectors)
}

/// Dimension and finiteness check for a single vector.
pub(crate) fn check_vector(v: &[f32], want: usize) -> Result<(), RagError> {
    if v.is_empty() {
        return Err(RagError::MalformedEmbedding("empty vector".into()));
    }
    if v.len() != want {
        return Err(RagError::VectorSizeMismatch { got: v.len(), want });
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(RagError::MalformedEmbedding("non-finite component".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::EmbedFuture;
    use std::time::Duration;

    /// Fails the first batch at once; every other batch waits forever.
    struct FirstBatchFails;

    impl EmbeddingsProvider for FirstBatchFails {
        fn embed<'a>(&'a self, _text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
            Box::pin(async { Ok(vec![1.0]) })
        }

        fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a, Vec<Vec<f32>>> {
            Box::pin(async move {
                if texts[0] == "t0" {
                    return Err(RagError::MalformedEmbedding("boom".into()));
                }
                std::future::pending().await
            })
        }
    }

    #[tokio::test]
    async fn first_failure_does_not_wait_for_other_batches() {
        let texts: Vec<String> = (0..4).map(|i| format!("t{i}")).collect();
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            embed_all(&texts, &FirstBatchFails, 1, 4, None),
        )
        .await
        .expect("embed_all waited for pending batches");
        assert!(matches!(res, Err(RagError::MalformedEmbedding(_))));
    }

    #[test]
    fn vector_checks() {
        assert!(check_vector(&[0.1, 0.2], 2).is_ok());
        assert!(matches!(
            check_vector(&[], 0),
            Err(RagError::MalformedEmbedding(_))
        ));
        assert!(matches!(
            check_vector(&[0.1], 2),
            Err(RagError::VectorSizeMismatch { got: 1, want: 2 })
        ));
        assert!(matches!(
            check_vector(&[f32::INFINITY, 0.0], 2),
            Err(RagError::MalformedEmbedding(_))
        ));
    }
}
