//! Deterministic date-window filter
//!
//! Time windows are computed here, in process, and never taken from the
//! generation service. A recognised phrase prepends
//! `{"$match": {"date": {"$gte": <now - window>}}}` as stage 0.

use crate::models::{Pipeline, PipelineStage, StageOperator};
use chrono::{DateTime, Months as CalendarMonths, Utc};
use mongodb::bson::{self, doc, Document};
use tracing::{info, warn};

/// Date field on the sales collection
pub const DATE_FIELD: &str = "date";

/// Phrases that always mean a one-year window
const FIXED_TRIGGERS: &[&str] = &["last one year", "past year"];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Years(u32),
    Months(u32),
}

impl DateWindow {
    /// Start of the window ending at `now`
    pub fn threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            DateWindow::Years(n) => n.checked_mul(12)?,
            DateWindow::Months(n) => *n,
        };
        now.checked_sub_months(CalendarMonths::new(months))
    }
}

/// Find the date window a question asks for, if any.
pub fn detect_window(question: &str) -> Option<DateWindow> {
    let lowered = question.to_lowercase();

    if FIXED_TRIGGERS.iter().any(|phrase| lowered.contains(phrase)) {
        return Some(DateWindow::Years(1));
    }

    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    words.windows(3).find_map(|w| {
        if w[0] != "last" && w[0] != "past" {
            return None;
        }
        let count = parse_count(w[1]).filter(|n| *n > 0)?;
        match w[2] {
            "year" | "years" => Some(DateWindow::Years(count)),
            "month" | "months" => Some(DateWindow::Months(count)),
            _ => None,
        }
    })
}

fn parse_count(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return Some(n);
    }
    NUMBER_WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, n)| *n)
}

/// `$match` on the date field, inclusive of `threshold`
pub fn date_match_stage(threshold: DateTime<Utc>) -> PipelineStage {
    let mut filter = Document::new();
    filter.insert(
        DATE_FIELD,
        doc! { "$gte": bson::DateTime::from_millis(threshold.timestamp_millis()) },
    );
    PipelineStage::new(StageOperator::Match, filter)
}

/// Prepend the date filter when the question names a window; otherwise the
/// pipeline comes back untouched.
pub fn inject_date_filter(question: &str, pipeline: Pipeline, now: DateTime<Utc>) -> Pipeline {
    let Some(window) = detect_window(question) else {
        return pipeline;
    };

    let Some(threshold) = window.threshold(now) else {
        warn!(?window, "Date window out of range, no filter injected");
        return pipeline;
    };

    info!(?window, threshold = %threshold.to_rfc3339(), "Injecting date filter");
    pipeline.prepend(date_match_stage(threshold))
}
