//! Loose OpenAPI spec inspection.
//!
//! Specs are treated as semi-structured text with light structural hints,
//! not validated schemas. This module answers three questions:
//!
//! | Question                              | Function            |
//! |---------------------------------------|---------------------|
//! | Is this content an OpenAPI spec?      | [`detect_doc_type`] |
//! | Which paths does the spec declare?    | [`extract_paths`]   |
//! | Which operations match a question?    | [`rank_operations`] |
//!
//! Parsing is lenient: JSON first, then YAML, and anything that is not a
//! mapping is treated as not-a-spec rather than an error.

use serde_json::Value;

/// Parse spec content as JSON, then as YAML. Returns the parsed mapping,
/// or `None` when the content is unparseable or not a mapping.
pub fn parse_spec(content: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        if value.is_object() {
            return Some(value);
        }
    }
    match serde_yml::from_str::<Value>(content) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Classify a file as `"openapi"` or `"markdown"`.
///
/// Only JSON/YAML-looking extensions are probed for spec structure; a file
/// qualifies as a spec when its content parses to a mapping with a
/// top-level `openapi` or `swagger` key. Everything else is markdown.
pub fn detect_doc_type(name: &str, content: &str) -> &'static str {
    let lower = name.to_lowercase();
    let spec_like = lower.ends_with(".json") || lower.ends_with(".yaml") || lower.ends_with(".yml");
    if spec_like {
        if let Some(spec) = parse_spec(content) {
            if spec.get("openapi").is_some() || spec.get("swagger").is_some() {
                return "openapi";
            }
        }
    }
    "markdown"
}

/// The top-level `paths` mapping of a parsed spec, if present.
pub fn extract_paths(spec: &Value) -> Option<&serde_json::Map<String, Value>> {
    spec.get("paths").and_then(Value::as_object)
}

/// Rank a spec's operations against a question.
///
/// Each operation's identifier, summary, and description form a lowercase
/// search blob. The score is the count of question tokens appearing as
/// substrings of the blob, plus 2 when the blob mentions `create`, `add`,
/// or `new` (questions skew heavily toward "how do I create X"). Zero-score
/// operations are dropped; ties keep input order.
pub fn rank_operations(spec: &Value, question: &str, top_k: usize) -> Vec<(String, String)> {
    let question = question.to_lowercase();
    let tokens: Vec<&str> = question.split_whitespace().collect();

    let mut matches: Vec<(i64, String, String)> = Vec::new();
    if let Some(paths) = extract_paths(spec) {
        for (path, item) in paths {
            let Some(operations) = item.as_object() else {
                continue;
            };
            for (method, op) in operations {
                let blob = format!(
                    "{} {} {}",
                    field_str(op, "operationId"),
                    field_str(op, "summary"),
                    field_str(op, "description"),
                )
                .to_lowercase();

                let mut score = tokens.iter().filter(|t| blob.contains(*t)).count() as i64;
                if ["create", "add", "new"].iter().any(|k| blob.contains(k)) {
                    score += 2;
                }
                if score > 0 {
                    matches.push((score, method.to_uppercase(), path.clone()));
                }
            }
        }
    }

    matches.sort_by(|a, b| b.0.cmp(&a.0));
    matches
        .into_iter()
        .take(top_k)
        .map(|(_, method, path)| (method, path))
        .collect()
}

fn field_str<'a>(op: &'a Value, key: &str) -> &'a str {
    op.get(key).and_then(Value::as_str).unwrap_or("")
}
