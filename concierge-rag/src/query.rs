//! Input normalizer: raw request body → [`Query`].

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::document::Query;
use crate::error::{RagError, Result};

/// Resolve a partially-trusted request body into a normalized [`Query`].
///
/// The question text is taken from the first alias in the configured
/// chain whose value is a non-empty string after trimming and collapsing
/// internal whitespace. `topK` accepts a JSON number or numeric string;
/// a present but non-numeric value maps to the minimum bound, a missing
/// one to the configured default. This is the only validating step in
/// the query pipeline.
///
/// # Errors
///
/// Returns [`RagError::InvalidInput`] when no alias yields non-empty text.
pub fn normalize(body: &Value, config: &PipelineConfig) -> Result<Query> {
    let text = config
        .query_aliases
        .iter()
        .filter_map(|alias| body.get(alias).and_then(Value::as_str))
        .map(collapse_whitespace)
        .find(|text| !text.is_empty())
        .ok_or_else(|| {
            RagError::InvalidInput("question text is empty or missing".to_string())
        })?;

    let top_k = match body.get("topK") {
        None | Some(Value::Null) => config.default_top_k,
        Some(value) => parse_top_k(value).unwrap_or(config.min_top_k),
    };
    let top_k = top_k.clamp(config.min_top_k, config.max_top_k);

    Ok(Query { text, top_k })
}

/// Trim and collapse runs of internal whitespace to single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_top_k(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f.max(0.0) as usize),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.max(0.0) as usize),
        _ => None,
    }
}
