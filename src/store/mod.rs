//! Document store access
//!
//! The store runs finished pipelines and hands back plain JSON records.
//! `QueryExecutor` puts the time bound around every call.

use crate::error::OrchestrationError;
use crate::models::{Pipeline, QueryResult};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub mod mongo;
pub use mongo::MongoStore;

/// Trait for aggregation backends
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run `pipeline` against the sales collection. `max_time` is a hint the
    /// backend may forward to the server.
    async fn aggregate(&self, pipeline: &Pipeline, max_time: Duration) -> Result<QueryResult>;
}

/// Runs pipelines at most once each, bounded by a fixed timeout
pub struct QueryExecutor {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn execute(&self, pipeline: &Pipeline) -> Result<QueryResult> {
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.store.aggregate(pipeline, self.timeout))
            .await
            .map_err(|_| {
                warn!(timeout_secs = self.timeout.as_secs(), "Aggregation timed out");
                OrchestrationError::TimeoutError(self.timeout.as_secs())
            })?;

        let records = outcome.map_err(|e| match e {
            OrchestrationError::TimeoutError(_) | OrchestrationError::ExecutionError(_) => e,
            other => OrchestrationError::ExecutionError(other.to_string()),
        })?;

        info!(
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation finished"
        );

        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use mongodb::bson::Document;
    use std::sync::Mutex;

    /// Returns canned records after an optional delay and records pipelines.
    pub struct RecordingStore {
        records: std::result::Result<QueryResult, String>,
        delay: Duration,
        seen: Mutex<Vec<Vec<Document>>>,
        max_times: Mutex<Vec<Duration>>,
    }

    impl RecordingStore {
        pub fn returning(records: QueryResult) -> Self {
            Self {
                records: Ok(records),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
                max_times: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                records: Err(message.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
                max_times: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        pub fn pipeline(&self, index: usize) -> Vec<Document> {
            self.seen.lock().unwrap()[index].clone()
        }

        /// Server-side bound passed with call `index`
        pub fn max_time(&self, index: usize) -> Duration {
            self.max_times.lock().unwrap()[index]
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn aggregate(&self, pipeline: &Pipeline, max_time: Duration) -> Result<QueryResult> {
            self.seen.lock().unwrap().push(pipeline.to_documents());
            self.max_times.lock().unwrap().push(max_time);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.records
                .clone()
                .map_err(OrchestrationError::TransportError)
        }
    }
}
