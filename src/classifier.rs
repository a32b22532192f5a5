//! Intent Classifier
//!
//! Decides whether a question is an analytics question (revenue, profit,
//! sales, products, quantities, trends, top sellers) or plain chat.
//! Every failure path lands on `Intent::Chat`, which never reaches the store.

use crate::fence::extract_fenced_json;
use crate::llm::TextGenerator;
use crate::models::Intent;
use crate::prompts::{INTENT_PROMPT, SCHEMA_CONTEXT};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct IntentPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub struct IntentClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn classify(&self, question: &str) -> Intent {
        let prompt = format!("{}{}", INTENT_PROMPT, question);

        let raw = match self.generator.generate(SCHEMA_CONTEXT, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Intent classification failed, treating as chat: {}", e);
                return Intent::Chat;
            }
        };

        let intent = decode_intent(&raw);
        info!(?intent, "Intent classified");
        intent
    }
}

/// Fenced `{"type": "..."}` → intent; anything unreadable is chat
pub fn decode_intent(raw: &str) -> Intent {
    let payload = extract_fenced_json(raw);
    if payload.is_empty() {
        return Intent::Chat;
    }

    match serde_json::from_str::<IntentPayload>(&payload) {
        Ok(IntentPayload { kind: Some(kind) }) => Intent::from_literal(&kind),
        Ok(_) => Intent::Chat,
        Err(e) => {
            warn!("Intent payload did not decode: {}", e);
            Intent::Chat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use crate::llm::testing::ScriptedGenerator;

    #[test]
    fn test_decode_intent() {
        let cases = vec![
            ("<json>{\"type\":\"analytics\"}</json>", Intent::Analytics),
            ("Sure!\n```\n<json>\n{ \"type\": \"analytics\" }\n</json>\n```", Intent::Analytics),
            ("<json>{\"type\":\"chat\"}</json>", Intent::Chat),
            ("<json>{\"type\":\"analytics|chat\"}</json>", Intent::Chat),
            ("<json>{\"type\":42}</json>", Intent::Chat),
            ("<json>{\"kind\":\"analytics\"}</json>", Intent::Chat),
            ("{\"type\":\"analytics\"}", Intent::Chat),
            ("<json>not json</json>", Intent::Chat),
        ];

        for (raw, expected) in cases {
            assert_eq!(decode_intent(raw), expected, "input: {}", raw);
        }
    }

    #[tokio::test]
    async fn test_classify_appends_question() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            "<json>{\"type\":\"analytics\"}</json>",
        ]));
        let classifier = IntentClassifier::new(generator.clone());

        let intent = classifier.classify("top selling products").await;

        assert_eq!(intent, Intent::Analytics);
        assert_eq!(generator.calls(), 1);
        assert!(generator.prompt(0).starts_with(INTENT_PROMPT));
        assert!(generator.prompt(0).ends_with("top selling products"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_chat() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(
            OrchestrationError::TransportError("connection reset".into()),
        )]));
        let classifier = IntentClassifier::new(generator);

        assert_eq!(classifier.classify("revenue by year").await, Intent::Chat);
    }
}
