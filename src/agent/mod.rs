//! Main orchestrator - one linear pass per question
//!
//! RECEIVED → CLASSIFIED → { REJECTED | TRANSLATED → FILTERED → EXECUTED
//! → SUMMARIZED → ASSEMBLED }, with FAILED reachable from translation and
//! execution. No state is revisited.

use crate::assembler::assemble;
use crate::classifier::IntentClassifier;
use crate::filters::inject_date_filter;
use crate::llm::{ImageGenerator, TextGenerator};
use crate::models::{Intent, RejectionEnvelope, RequestState, ResponseEnvelope};
use crate::store::{DocumentStore, QueryExecutor};
use crate::summarizer::ResultSummarizer;
use crate::translator::PipelineTranslator;
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Fixed reply for questions outside analytics
pub const CHAT_REPLY: &str = "Ask analytics questions only 🙂";

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Rejected(RejectionEnvelope),
    Answered(ResponseEnvelope),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub answer: Answer,
    pub trace: Vec<RequestState>,
}

/// Ordered record of the states one request went through
#[derive(Debug, Default)]
struct RequestTrace {
    states: Vec<RequestState>,
}

impl RequestTrace {
    fn start() -> Self {
        let mut trace = Self::default();
        trace.advance(RequestState::Received);
        trace
    }

    fn advance(&mut self, state: RequestState) {
        info!(state = %state, step = self.states.len(), "Request state");
        self.states.push(state);
    }

    fn fail<E: std::fmt::Display>(&mut self, stage: RequestState, err: &E) {
        warn!(stage = %stage, error = %err, "Request failed");
        self.advance(RequestState::Failed);
    }
}

pub struct Orchestrator {
    classifier: IntentClassifier,
    translator: PipelineTranslator,
    executor: QueryExecutor,
    summarizer: ResultSummarizer,
    clock: fn() -> DateTime<Utc>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        store: Arc<dyn DocumentStore>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(generator.clone()),
            translator: PipelineTranslator::new(generator.clone()),
            executor: QueryExecutor::new(store, query_timeout),
            summarizer: ResultSummarizer::new(generator, images),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for date windows
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Answer one question end to end
    pub async fn answer(&self, question: &str) -> Result<RequestOutcome> {
        let started = Instant::now();
        let mut trace = RequestTrace::start();

        // === CLASSIFY ===
        let intent = self.classifier.classify(question).await;
        trace.advance(RequestState::Classified);

        if intent != Intent::Analytics {
            trace.advance(RequestState::Rejected);
            return Ok(RequestOutcome {
                answer: Answer::Rejected(RejectionEnvelope {
                    summary: CHAT_REPLY.to_string(),
                }),
                trace: trace.states,
            });
        }

        // === TRANSLATE ===
        let pipeline = match self.translator.translate(question).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                trace.fail(RequestState::Translated, &e);
                return Err(e);
            }
        };
        trace.advance(RequestState::Translated);

        // === FILTER ===
        let pipeline = inject_date_filter(question, pipeline, (self.clock)());
        trace.advance(RequestState::Filtered);

        // === EXECUTE ===
        let results = match self.executor.execute(&pipeline).await {
            Ok(results) => results,
            Err(e) => {
                trace.fail(RequestState::Executed, &e);
                return Err(e);
            }
        };
        trace.advance(RequestState::Executed);

        // === SUMMARIZE ===
        let summary = self.summarizer.summarize(&results).await;
        trace.advance(RequestState::Summarized);

        // === ASSEMBLE ===
        let envelope = assemble(summary.meta, summary.image, results);
        trace.advance(RequestState::Assembled);

        info!(
            records = envelope.data.len(),
            has_image = !envelope.image.is_empty(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request answered"
        );

        Ok(RequestOutcome {
            answer: Answer::Answered(envelope),
            trace: trace.states,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use crate::filters::DATE_FIELD;
    use crate::llm::testing::{FixedImageGenerator, ScriptedGenerator};
    use crate::store::testing::RecordingStore;
    use chrono::TimeZone;
    use mongodb::bson::Bson;
    use serde_json::json;

    const ANALYTICS: &str = "<json>{\"type\":\"analytics\"}</json>";
    const CHAT: &str = "<json>{\"type\":\"chat\"}</json>";

    const REVENUE_PIPELINE: &str = r#"<json>[
 {"$lookup":{"from":"products","localField":"productId","foreignField":"_id","as":"productInfo"}},
 {"$unwind":"$productInfo"},
 {"$group":{"_id":"$productInfo.name","totalRevenue":{"$sum":"$revenue"}}},
 {"$sort":{"totalRevenue":-1}}
]</json>"#;

    const SUMMARY: &str = r#"<json>{"summary":"Laptop leads revenue at 1200.","chart":"bar","imagePrompt":"Dashboard: Laptop 1200, Phone 800","videoPrompt":"optional"}</json>"#;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn grouped_records() -> crate::models::QueryResult {
        vec![
            json!({ "_id": "Laptop", "totalRevenue": 1200 }),
            json!({ "_id": "Phone", "totalRevenue": 800 }),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    fn orchestrator(
        generator: &Arc<ScriptedGenerator>,
        images: &Arc<FixedImageGenerator>,
        store: &Arc<RecordingStore>,
    ) -> Orchestrator {
        Orchestrator::new(
            generator.clone(),
            images.clone(),
            store.clone(),
            Duration::from_secs(10),
        )
        .with_clock(fixed_now)
    }

    #[tokio::test]
    async fn test_chat_short_circuits() {
        for reply in [CHAT, "I think this is analytics", "<json>{\"type\":\"maybe\"}</json>"] {
            let generator = Arc::new(ScriptedGenerator::replying(&[reply]));
            let images = Arc::new(FixedImageGenerator::returning(None));
            let store = Arc::new(RecordingStore::returning(grouped_records()));

            let outcome = orchestrator(&generator, &images, &store)
                .answer("tell me a joke")
                .await
                .unwrap();

            assert_eq!(
                outcome.answer,
                Answer::Rejected(RejectionEnvelope {
                    summary: CHAT_REPLY.to_string()
                })
            );
            assert_eq!(generator.calls(), 1, "no translation call for {}", reply);
            assert_eq!(store.calls(), 0);
            assert_eq!(outcome.trace.last(), Some(&RequestState::Rejected));
            assert!(outcome.trace.iter().filter(|s| s.is_terminal()).count() == 1);
        }
    }

    #[tokio::test]
    async fn test_revenue_per_product_end_to_end() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            ANALYTICS,
            REVENUE_PIPELINE,
            SUMMARY,
        ]));
        let images = Arc::new(FixedImageGenerator::returning(Some("ZGFzaGJvYXJk")));
        let store = Arc::new(RecordingStore::returning(grouped_records()));

        let outcome = orchestrator(&generator, &images, &store)
            .answer("show me total revenue per product")
            .await
            .unwrap();

        let Answer::Answered(envelope) = outcome.answer else {
            panic!("expected a full answer");
        };
        assert_eq!(envelope.summary, "Laptop leads revenue at 1200.");
        assert_eq!(envelope.chart, "bar");
        assert_eq!(envelope.image, "ZGFzaGJvYXJk");
        assert_eq!(envelope.data, grouped_records());

        let executed = store.pipeline(0);
        assert_eq!(executed.len(), 4);
        assert!(executed[0].contains_key("$lookup"));
        assert_eq!(images.calls(), 1);
        assert_eq!(
            outcome.trace,
            vec![
                RequestState::Received,
                RequestState::Classified,
                RequestState::Translated,
                RequestState::Filtered,
                RequestState::Executed,
                RequestState::Summarized,
                RequestState::Assembled,
            ]
        );
    }

    #[tokio::test]
    async fn test_date_filter_is_stage_zero() {
        let translated_match = r#"<json>[
 {"$match":{"revenue":{"$gt":0}}},
 {"$group":{"_id":null,"total":{"$sum":"$revenue"}}}
]</json>"#;
        let generator = Arc::new(ScriptedGenerator::replying(&[
            ANALYTICS,
            translated_match,
            SUMMARY,
        ]));
        let images = Arc::new(FixedImageGenerator::returning(None));
        let store = Arc::new(RecordingStore::returning(vec![]));

        orchestrator(&generator, &images, &store)
            .answer("revenue last one year")
            .await
            .unwrap();

        let executed = store.pipeline(0);
        assert_eq!(executed.len(), 3);

        let first = executed[0].get_document("$match").unwrap();
        let Some(Bson::Document(bound)) = first.get(DATE_FIELD) else {
            panic!("stage 0 is not the date filter");
        };
        let threshold = bound.get_datetime("$gte").unwrap().timestamp_millis();
        let expected = Utc.with_ymd_and_hms(2025, 10, 16, 9, 30, 0).unwrap();
        assert_eq!(threshold, expected.timestamp_millis());

        assert!(executed[1].get_document("$match").unwrap().contains_key("revenue"));
    }

    #[tokio::test]
    async fn test_invalid_pipeline_fails_without_store_call() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            ANALYTICS,
            r#"<json>[{"$match":{}},{"$merge":{"into":"sales_copy"}}]</json>"#,
        ]));
        let images = Arc::new(FixedImageGenerator::returning(None));
        let store = Arc::new(RecordingStore::returning(grouped_records()));

        let result = orchestrator(&generator, &images, &store)
            .answer("revenue by product")
            .await;

        assert!(matches!(result, Err(OrchestrationError::ValidationError(_))));
        assert_eq!(store.calls(), 0);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_execution_timeout_is_failure() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            ANALYTICS,
            REVENUE_PIPELINE,
            SUMMARY,
        ]));
        let images = Arc::new(FixedImageGenerator::returning(None));
        let store = Arc::new(
            RecordingStore::returning(grouped_records()).with_delay(Duration::from_secs(5)),
        );

        let orchestrator = Orchestrator::new(
            generator.clone(),
            images,
            store,
            Duration::from_millis(50),
        );
        let result = orchestrator.answer("revenue per product").await;

        assert!(matches!(result, Err(OrchestrationError::TimeoutError(_))));
        assert_eq!(generator.calls(), 2, "summary must not run after a failed query");
    }

    #[tokio::test]
    async fn test_summary_decode_failure_keeps_data() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            ANALYTICS,
            REVENUE_PIPELINE,
            "Laptop sold the most.",
        ]));
        let images = Arc::new(FixedImageGenerator::returning(Some("unused")));
        let store = Arc::new(RecordingStore::returning(grouped_records()));

        let outcome = orchestrator(&generator, &images, &store)
            .answer("revenue per product")
            .await
            .unwrap();

        let Answer::Answered(envelope) = outcome.answer else {
            panic!("expected a full answer");
        };
        assert_eq!(envelope.chart, "");
        assert_eq!(envelope.image, "");
        assert_eq!(envelope.data, grouped_records());
        assert_eq!(images.calls(), 0);
    }
}
