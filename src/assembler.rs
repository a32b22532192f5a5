//! Response Assembler
//!
//! Pure merge into the outward-facing envelope.

use crate::models::{ImageArtifact, QueryResult, ResponseEnvelope, SummaryMeta};

pub fn assemble(meta: SummaryMeta, image: ImageArtifact, data: QueryResult) -> ResponseEnvelope {
    ResponseEnvelope {
        summary: meta.summary,
        chart: meta.chart.map(|c| c.as_str().to_string()).unwrap_or_default(),
        image: image.into_inner(),
        data,
    }
}
