//! Pipeline Translator
//!
//! Turns a question into aggregation stages via the generation service, then
//! validates every stage against the operator allow-list. Nothing partial
//! ever leaves this module: one bad stage rejects the whole pipeline.

use crate::error::OrchestrationError;
use crate::fence::extract_fenced_json;
use crate::llm::TextGenerator;
use crate::models::{Pipeline, PipelineStage, StageOperator};
use crate::prompts::{pipeline_prompt, SCHEMA_CONTEXT};
use crate::Result;
use mongodb::bson;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PipelineTranslator {
    generator: Arc<dyn TextGenerator>,
}

impl PipelineTranslator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn translate(&self, question: &str) -> Result<Pipeline> {
        let prompt = format!("{}{}", pipeline_prompt(), question);

        let raw = self.generator.generate(SCHEMA_CONTEXT, &prompt).await?;

        let pipeline = parse_pipeline(&raw).map_err(|e| {
            warn!("Pipeline rejected: {}", e);
            e
        })?;

        info!(stages = pipeline.len(), "Pipeline translated");
        debug!(pipeline = ?pipeline.to_documents(), "Translated stages");

        Ok(pipeline)
    }
}

/// Fenced JSON array of single-key stage objects → validated pipeline
pub fn parse_pipeline(raw: &str) -> Result<Pipeline> {
    let payload = extract_fenced_json(raw);
    if payload.is_empty() {
        return Err(OrchestrationError::DecodeError(
            "no fenced pipeline in generation output".to_string(),
        ));
    }

    let decoded: Value = serde_json::from_str(&payload)
        .map_err(|e| OrchestrationError::DecodeError(format!("pipeline is not JSON: {}", e)))?;

    let Value::Array(items) = decoded else {
        return Err(OrchestrationError::ValidationError(
            "pipeline is not an array".to_string(),
        ));
    };

    if items.is_empty() {
        return Err(OrchestrationError::ValidationError("pipeline is empty".to_string()));
    }

    let stages = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_stage(index, item))
        .collect::<Result<Vec<_>>>()?;

    Ok(Pipeline::new(stages))
}

fn parse_stage(index: usize, item: Value) -> Result<PipelineStage> {
    let Value::Object(map) = item else {
        return Err(OrchestrationError::ValidationError(format!(
            "stage {} is not an object",
            index
        )));
    };

    if map.len() != 1 {
        return Err(OrchestrationError::ValidationError(format!(
            "stage {} must have exactly one operator, found {}",
            index,
            map.len()
        )));
    }

    let Some((key, body)) = map.into_iter().next() else {
        return Err(OrchestrationError::ValidationError(format!("stage {} is empty", index)));
    };

    let operator = StageOperator::from_key(&key).ok_or_else(|| {
        OrchestrationError::ValidationError(format!(
            "stage {} uses operator {:?}, which is not allowed",
            index, key
        ))
    })?;

    validate_body(operator, &body).map_err(|reason| {
        OrchestrationError::ValidationError(format!("stage {} ({}): {}", index, operator, reason))
    })?;

    Ok(PipelineStage::new(operator, bson::to_bson(&body)?))
}

fn validate_body(operator: StageOperator, body: &Value) -> std::result::Result<(), &'static str> {
    match operator {
        StageOperator::Match
        | StageOperator::Lookup
        | StageOperator::Group
        | StageOperator::Sort
        | StageOperator::Project => {
            if body.is_object() {
                Ok(())
            } else {
                Err("body must be an object")
            }
        }
        StageOperator::Unwind => {
            let path = match body {
                Value::String(path) => Some(path.as_str()),
                Value::Object(options) => options.get("path").and_then(Value::as_str),
                _ => None,
            };
            match path {
                Some(path) if is_field_path(path) => Ok(()),
                _ => Err("body must be a $-prefixed field path or an object with one"),
            }
        }
        StageOperator::Limit => match body.as_f64() {
            Some(n) if n >= 1.0 && n.fract() == 0.0 => Ok(()),
            _ => Err("body must be a positive integer"),
        },
        StageOperator::Sum | StageOperator::AddToSet => {
            if body.is_null() {
                Err("body must not be null")
            } else {
                Ok(())
            }
        }
    }
}

fn is_field_path(path: &str) -> bool {
    path.starts_with('$') && path.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedGenerator;
    use mongodb::bson::doc;

    const REVENUE_PER_PRODUCT: &str = r#"Here is the pipeline:
<json>
[
 {"$lookup":{"from":"products","localField":"productId","foreignField":"_id","as":"productInfo"}},
 {"$unwind":"$productInfo"},
 {"$group":{"_id":"$productInfo.name","totalRevenue":{"$sum":"$revenue"}}},
 {"$sort":{"totalRevenue":-1}}
]
</json>"#;

    #[test]
    fn test_parse_valid_pipeline_keeps_order() {
        let pipeline = parse_pipeline(REVENUE_PER_PRODUCT).unwrap();
        let ops: Vec<_> = pipeline.stages().iter().map(|s| s.operator).collect();
        assert_eq!(
            ops,
            vec![
                StageOperator::Lookup,
                StageOperator::Unwind,
                StageOperator::Group,
                StageOperator::Sort
            ]
        );
        assert_eq!(
            pipeline.to_documents()[3],
            doc! { "$sort": { "totalRevenue": -1_i64 } }
        );
    }

    #[test]
    fn test_foreign_operator_fails_closed() {
        let raw = r#"<json>[{"$match":{}},{"$out":"stolen"}]</json>"#;
        let err = parse_pipeline(raw).unwrap_err();
        assert!(matches!(err, OrchestrationError::ValidationError(_)));
        assert!(err.to_string().contains("$out"));
    }

    #[test]
    fn test_structural_rejections() {
        let cases = vec![
            r#"<json>[]</json>"#,
            r#"<json>{"$match":{}}</json>"#,
            r#"<json>["$match"]</json>"#,
            r#"<json>[{}]</json>"#,
            r#"<json>[{"$match":{},"$sort":{"a":1}}]</json>"#,
            r#"<json>[{"$match":"revenue > 10"}]</json>"#,
            r#"<json>[{"$unwind":"productInfo"}]</json>"#,
            r#"<json>[{"$limit":0}]</json>"#,
            r#"<json>[{"$limit":"5"}]</json>"#,
            r#"<json>[{"$limit":2.5}]</json>"#,
            r#"<json>[{"$unwind":{"path":"productInfo"}}]</json>"#,
            r#"<json>[{"$unwind":{"includeArrayIndex":"idx"}}]</json>"#,
            r#"<json>[{"$sum":null}]</json>"#,
        ];

        for raw in cases {
            let result = parse_pipeline(raw);
            assert!(
                matches!(result, Err(OrchestrationError::ValidationError(_))),
                "expected rejection for {}",
                raw
            );
        }
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            parse_pipeline("[{\"$match\":{}}]"),
            Err(OrchestrationError::DecodeError(_))
        ));
        assert!(matches!(
            parse_pipeline("<json>[{'$match':{}}]</json>"),
            Err(OrchestrationError::DecodeError(_))
        ));
    }

    #[test]
    fn test_unwind_and_limit_forms() {
        let raw = r#"<json>[
            {"$unwind":{"path":"$productInfo","preserveNullAndEmptyArrays":true}},
            {"$limit":5}
        ]</json>"#;
        let pipeline = parse_pipeline(raw).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.to_documents()[1], doc! { "$limit": 5_i64 });
    }

    #[test]
    fn test_integral_float_limit_is_accepted() {
        let pipeline = parse_pipeline(r#"<json>[{"$limit":5.0}]</json>"#).unwrap();
        assert_eq!(pipeline.stages()[0].operator, StageOperator::Limit);
        assert_eq!(pipeline.to_documents()[0], doc! { "$limit": 5.0_f64 });
    }

    #[tokio::test]
    async fn test_translate_surfaces_generation_failure() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(
            OrchestrationError::TransportError("timeout".into()),
        )]));
        let translator = PipelineTranslator::new(generator);

        let result = translator.translate("revenue per product").await;
        assert!(matches!(result, Err(OrchestrationError::TransportError(_))));
    }

    #[tokio::test]
    async fn test_translate_sends_question() {
        let generator = Arc::new(ScriptedGenerator::replying(&[REVENUE_PER_PRODUCT]));
        let translator = PipelineTranslator::new(generator.clone());

        let pipeline = translator.translate("show me total revenue per product").await;

        tokio_test::assert_ok!(pipeline);
        assert!(generator.prompt(0).ends_with("show me total revenue per product"));
        assert!(generator.prompt(0).contains("\"$addToSet\""));
    }
}
