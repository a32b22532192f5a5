//! MongoDB-backed document store

use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::models::{Pipeline, QueryRecord, QueryResult};
use crate::store::DocumentStore;
use crate::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::AggregateOptions;
use mongodb::{Client, Collection};
use std::time::Duration;
use tracing::{debug, info};

/// Long-lived handle; the driver pools connections and is safe to share.
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect and ping once. Failure here is fatal for the service.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.mongodb_uri).await?;
        let database = client.database(&config.mongodb_database);

        database.run_command(doc! { "ping": 1 }, None).await?;

        info!(
            database = %config.mongodb_database,
            collection = %config.mongodb_collection,
            "MongoDB connected"
        );

        Ok(Self {
            collection: database.collection(&config.mongodb_collection),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(&self, pipeline: &Pipeline, max_time: Duration) -> Result<QueryResult> {
        let options = AggregateOptions::builder().max_time(max_time).build();

        let cursor = self
            .collection
            .aggregate(pipeline.to_documents(), options)
            .await
            .map_err(|e| OrchestrationError::ExecutionError(format!("aggregate failed: {}", e)))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| OrchestrationError::ExecutionError(format!("cursor failed: {}", e)))?;

        debug!(records = documents.len(), "Cursor drained");

        Ok(documents.into_iter().map(document_to_record).collect())
    }
}

/// Relaxed extended JSON keeps numbers as numbers and dates readable.
pub fn document_to_record(document: Document) -> QueryRecord {
    match Bson::Document(document).into_relaxed_extjson() {
        serde_json::Value::Object(map) => map,
        _ => QueryRecord::new(),
    }
}
