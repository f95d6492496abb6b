//! Bounded-size batch enrichment.
//!
//! Identifiers are split into contiguous chunks of at most
//! [`MAX_BATCH_SIZE`] and one secondary request is issued per chunk, in order.
//! [`BatchChunker::collect`] concatenates the results positionally;
//! [`BatchChunker::collect_keyed`] keys every result by identifier so a failed
//! or reordered chunk cannot shift records onto the wrong track.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Error,
    paging::{Aggregate, Failure, FailurePolicy, FailureSite},
    warning,
};

/// Largest number of identifiers the batch endpoints accept.
pub const MAX_BATCH_SIZE: usize = 100;

#[async_trait]
pub trait BatchSource: Send + Sync {
    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Value>, Error>;
}

/// Splits `ids` into contiguous chunks of at most `size` (clamped to
/// `1..=MAX_BATCH_SIZE`).
pub fn chunk_ids(ids: &[String], size: usize) -> std::slice::Chunks<'_, String> {
    ids.chunks(size.clamp(1, MAX_BATCH_SIZE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchChunker {
    pub chunk_size: usize,
    pub policy: FailurePolicy,
}

impl Default for BatchChunker {
    fn default() -> Self {
        Self::new(MAX_BATCH_SIZE)
    }
}

impl BatchChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.clamp(1, MAX_BATCH_SIZE),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches every chunk and concatenates the formatted results in chunk
    /// order. A failed chunk contributes nothing under the best-effort
    /// policy, which shifts the positions of every later result. An
    /// authorization error is returned as is under every policy.
    pub async fn collect<S, O, F>(
        &self,
        source: &S,
        ids: &[String],
        mut format: F,
    ) -> Result<Aggregate<O>, Error>
    where
        S: BatchSource + ?Sized,
        F: FnMut(Value) -> Result<O, Error>,
    {
        let mut aggregate = Aggregate::default();

        for (index, chunk) in chunk_ids(ids, self.chunk_size).enumerate() {
            let values = match source.fetch_batch(chunk).await {
                Ok(values) => values,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    let error = Error::BatchFetch {
                        chunk: index + 1,
                        source: Box::new(e),
                    };
                    if self.policy == FailurePolicy::FailFast {
                        return Err(error);
                    }
                    warning!("{}", error);
                    aggregate.failures.push(Failure {
                        site: FailureSite::Chunk(index + 1),
                        error,
                    });
                    continue;
                }
            };

            for (position, value) in values.into_iter().enumerate() {
                match format(value) {
                    Ok(item) => aggregate.items.push(item),
                    Err(e) => {
                        if self.policy == FailurePolicy::FailFast {
                            return Err(e);
                        }
                        warning!("Skipping item {} of batch {}: {}", position, index + 1, e);
                        aggregate.failures.push(Failure {
                            site: FailureSite::Item {
                                batch: index + 1,
                                position,
                            },
                            error: e,
                        });
                    }
                }
            }
        }

        Ok(aggregate)
    }

    /// Like [`collect`](Self::collect), but keys every formatted result by
    /// the identifier `key` returns. Results without a key (e.g. null entries
    /// for unknown ids) are dropped.
    pub async fn collect_keyed<S, O, F, K>(
        &self,
        source: &S,
        ids: &[String],
        format: F,
        key: K,
    ) -> Result<Enrichment<O>, Error>
    where
        S: BatchSource + ?Sized,
        F: FnMut(Value) -> Result<Option<O>, Error>,
        K: Fn(&O) -> String,
    {
        let aggregate = self.collect(source, ids, format).await?;

        let mut by_id = HashMap::with_capacity(aggregate.items.len());
        for item in aggregate.items.into_iter().flatten() {
            by_id.insert(key(&item), item);
        }

        Ok(Enrichment {
            by_id,
            failures: aggregate.failures,
        })
    }
}

/// Secondary records keyed by identifier.
#[derive(Debug)]
pub struct Enrichment<T> {
    pub by_id: HashMap<String, T>,
    pub failures: Vec<Failure>,
}

impl<T> Default for Enrichment<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            failures: Vec::new(),
        }
    }
}

impl<T: Clone> Enrichment<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Pairs every primary record with the enrichment sharing its id.
    pub fn attach<P, I, J>(&self, primary: I, id_of: J) -> Vec<(P, Option<T>)>
    where
        I: IntoIterator<Item = P>,
        J: Fn(&P) -> Option<&str>,
    {
        primary
            .into_iter()
            .map(|record| {
                let extra = id_of(&record).and_then(|id| self.by_id.get(id)).cloned();
                (record, extra)
            })
            .collect()
    }
}
