//! Parameter extraction from free-text queries
//!
//! Pulls structured values out of a query via fixed pattern families: dates,
//! named policy episodes, output formats, and relative time windows.
//! Extraction never fails; a category that does not match is simply absent
//! from the returned map.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4}",
    )
    .unwrap()
});

static TIME_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"last\s+(\d+)\s+(year|month|quarter)").unwrap());

/// Named historical episodes recognized in queries
const EPISODE_KEYWORDS: &[&str] = &[
    "gfc",
    "covid",
    "volcker",
    "inflation fight",
    "2008",
    "2020",
    "2022",
    "great financial crisis",
    "pandemic",
];

/// Output format keywords mapped to canonical format names
const FORMAT_KEYWORDS: &[(&str, &str)] = &[
    ("pdf", "pdf"),
    ("word", "docx"),
    ("docx", "docx"),
    ("html", "html"),
    ("markdown", "markdown"),
    ("json", "json"),
];

/// Extract structured parameters from a query
///
/// Returned keys, when present: `dates` (array of strings), `episodes`
/// (array of strings), `output_format` (string), `time_period`
/// (`{value, unit}` object).
pub fn extract_parameters(text: &str) -> Map<String, Value> {
    let mut params = Map::new();
    let lower = text.to_lowercase();

    // Dates: the first matching pattern family wins
    let iso_dates: Vec<Value> = ISO_DATE
        .find_iter(text)
        .map(|m| Value::String(m.as_str().to_string()))
        .collect();
    if !iso_dates.is_empty() {
        params.insert("dates".to_string(), Value::Array(iso_dates));
    } else {
        let month_dates: Vec<Value> = MONTH_YEAR
            .find_iter(text)
            .map(|m| Value::String(m.as_str().to_string()))
            .collect();
        if !month_dates.is_empty() {
            params.insert("dates".to_string(), Value::Array(month_dates));
        }
    }

    let episodes: Vec<Value> = EPISODE_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| Value::String(k.to_string()))
        .collect();
    if !episodes.is_empty() {
        params.insert("episodes".to_string(), Value::Array(episodes));
    }

    for (keyword, format) in FORMAT_KEYWORDS {
        if lower.contains(keyword) {
            params.insert(
                "output_format".to_string(),
                Value::String(format.to_string()),
            );
            break;
        }
    }

    if let Some(captures) = TIME_PERIOD.captures(&lower) {
        // The \d+ capture always parses
        if let Ok(value) = captures[1].parse::<u64>() {
            params.insert(
                "time_period".to_string(),
                json!({ "value": value, "unit": &captures[2] }),
            );
        }
    }

    params
}
