//! Answer and snippet synthesis.
//!
//! Turns retrieved context into a grounded answer string and a small set of
//! runnable code snippets. Snippet synthesis tries strategies in order:
//!
//! ```text
//! question + contexts ──► generative provider ──► lenient parse ──┐
//!        │ (disabled or failed)                                   │
//!        └──► spec heuristic ──► operation templates ─────────────┤
//!                                                                 ▼
//!                                            padding + dedupe invariant
//! ```
//!
//! Whatever the strategies produce, [`ensure_snippets`] guarantees at least
//! two snippets in distinct languages (padding with a fixed safe pair),
//! capped at three. Synthesis never hard-fails.

use serde_json::Value;

use crate::generate::Generator;
use crate::models::{QaRecord, Snippet};
use crate::openapi;

/// Answer returned when no chunks match. This record is never persisted.
pub fn not_found_record(question: &str) -> QaRecord {
    QaRecord {
        id: None,
        question: question.to_string(),
        answer: "I couldn't find an answer in the current docs. Try adding or enabling more docs."
            .to_string(),
        citations: Vec::new(),
        snippets: Vec::new(),
        created_at: None,
    }
}

/// Format the grounded answer: a fixed lead, up to 3 bulleted excerpts,
/// and a fixed trailer pointing at the citations.
pub fn format_answer(contexts: &[String]) -> String {
    let bullets: Vec<String> = contexts
        .iter()
        .take(3)
        .map(|text| format!("- {}", excerpt(text, 160)))
        .collect();
    format!(
        "Here’s what the docs state: \n{} Based on these sections, follow the referenced endpoints and parameters in the citations.",
        bullets.join("\n")
    )
}

/// Trimmed text capped at `max` characters, with an ellipsis when cut.
fn excerpt(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max).collect();
    out.push_str("...");
    out
}

// ============ Snippet Synthesis ============

const GROUNDING_INSTRUCTION: &str = "You write minimal runnable API usage examples. \
Use only endpoints, parameters, and fields present in the provided context; \
do not invent paths or parameters absent from context. \
Respond with JSON of the form {\"snippets\": [{\"language\": \"curl\", \"code\": \"...\"}]}.";

/// Produce the snippet list for an answer.
///
/// `spec_content` is the raw content of the top-matched document when that
/// document is an OpenAPI spec. Strategy order: generative provider when
/// configured, spec heuristic otherwise, then the padding invariant.
pub async fn synthesize_snippets(
    generator: Option<&Generator>,
    question: &str,
    contexts: &[String],
    spec_content: Option<&str>,
) -> Vec<Snippet> {
    let mut snippets = Vec::new();

    if let Some(generator) = generator {
        let prompt = build_snippet_prompt(question, contexts, spec_content);
        match generator.generate(GROUNDING_INSTRUCTION, &prompt).await {
            Ok(raw) => snippets = parse_snippet_response(&raw),
            Err(e) => {
                eprintln!("Warning: snippet generation failed ({}); falling back", e);
            }
        }
    }

    if snippets.is_empty() {
        if let Some(spec) = spec_content.and_then(openapi::parse_spec) {
            snippets = heuristic_snippets(&spec, question, 1);
        }
    }

    ensure_snippets(snippets)
}

/// Emit one command-line and one request-library example per top-ranked
/// operation of the spec.
pub fn heuristic_snippets(spec: &Value, question: &str, top_k: usize) -> Vec<Snippet> {
    let mut snippets = Vec::new();
    for (method, path) in openapi::rank_operations(spec, question, top_k) {
        snippets.push(Snippet {
            language: "curl".to_string(),
            code: format!(
                "curl -X {} 'https://api.example.com{}' -H 'Content-Type: application/json' -d '{{}}'",
                method, path
            ),
        });
        snippets.push(Snippet {
            language: "python".to_string(),
            code: format!(
                "import requests\nresp = requests.request('{}', 'https://api.example.com{}', json={{}})\nprint(resp.status_code, resp.text)\n",
                method, path
            ),
        });
    }
    snippets
}

/// Guarantee at least two snippets in distinct languages.
///
/// When fewer than two languages are present, the fixed safe pair is
/// appended and the list is de-duplicated keeping the first snippet per
/// language. The result is capped at 3.
pub fn ensure_snippets(mut snippets: Vec<Snippet>) -> Vec<Snippet> {
    let distinct = {
        let mut languages: Vec<&str> = snippets.iter().map(|s| s.language.as_str()).collect();
        languages.sort_unstable();
        languages.dedup();
        languages.len()
    };

    if distinct < 2 {
        snippets.extend(fallback_snippets());
        let mut seen: Vec<String> = Vec::new();
        snippets.retain(|s| {
            if seen.contains(&s.language) {
                false
            } else {
                seen.push(s.language.clone());
                true
            }
        });
    }
    snippets.truncate(3);
    snippets
}

/// Fixed safe defaults: a minimal GET in two languages.
fn fallback_snippets() -> Vec<Snippet> {
    vec![
        Snippet {
            language: "curl".to_string(),
            code: "curl -X GET 'https://api.example.com/ping'".to_string(),
        },
        Snippet {
            language: "python".to_string(),
            code: "import requests\nprint(requests.get('https://api.example.com/ping').status_code)"
                .to_string(),
        },
    ]
}

/// Prompt for the generative provider: question, up to 3 context excerpts
/// (800 chars each), and up to 4000 chars of spec content.
fn build_snippet_prompt(question: &str, contexts: &[String], spec_content: Option<&str>) -> String {
    let mut prompt = format!("Question: {}\n\nContext:\n", question);
    for text in contexts.iter().take(3) {
        prompt.push_str("- ");
        prompt.push_str(&excerpt(text, 800));
        prompt.push('\n');
    }
    if let Some(spec) = spec_content {
        let head: String = spec.chars().take(4000).collect();
        prompt.push_str("\nOpenAPI spec (may be truncated):\n");
        prompt.push_str(&head);
        prompt.push('\n');
    }
    prompt.push_str("\nReturn at most 3 snippets covering at least two languages.");
    prompt
}

/// Parse generator output leniently: strict JSON first (outer code fence
/// stripped if present), then fenced code blocks labeled by language.
pub fn parse_snippet_response(raw: &str) -> Vec<Snippet> {
    let cleaned = strip_outer_fence(raw);
    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        if let Some(items) = value.get("snippets").and_then(Value::as_array) {
            let snippets: Vec<Snippet> = items
                .iter()
                .filter_map(|item| {
                    let language = item.get("language").and_then(Value::as_str)?.trim();
                    let code = item.get("code").and_then(Value::as_str)?;
                    if language.is_empty() || code.trim().is_empty() {
                        return None;
                    }
                    Some(Snippet {
                        language: language.to_lowercase(),
                        code: code.to_string(),
                    })
                })
                .collect();
            if !snippets.is_empty() {
                return snippets;
            }
        }
    }
    extract_fenced_snippets(raw)
}

/// Strip a single wrapping ``` fence (with optional info string) so that
/// fenced JSON bodies still parse strictly.
fn strip_outer_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Extract ```lang ... ``` blocks. Blocks without a language label are
/// skipped.
fn extract_fenced_snippets(raw: &str) -> Vec<Snippet> {
    let mut snippets = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find("```") {
        let after = &rest[start + 3..];
        let Some((info, tail)) = after.split_once('\n') else {
            break;
        };
        let Some(end) = tail.find("```") else {
            break;
        };
        let language = info.trim().to_lowercase();
        let code = tail[..end].trim();
        if !language.is_empty() && !code.is_empty() {
            snippets.push(Snippet {
                language,
                code: code.to_string(),
            });
        }
        rest = &tail[end + 3..];
    }
    snippets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_answer_basic() {
        let contexts = vec!["First fact.".to_string(), "Second fact.".to_string()];
        let answer = format_answer(&contexts);
        assert!(answer.starts_with("Here’s what the docs state: \n"));
        assert!(answer.contains("- First fact.\n- Second fact."));
        assert!(answer.ends_with(
            "Based on these sections, follow the referenced endpoints and parameters in the citations."
        ));
    }

    #[test]
    fn test_format_answer_truncates_long_context() {
        let long = "x".repeat(200);
        let answer = format_answer(&[long]);
        assert!(answer.contains(&format!("- {}...", "x".repeat(160))));
        assert!(!answer.contains(&"x".repeat(161)));
    }

    #[test]
    fn test_format_answer_caps_at_three_bullets() {
        let contexts: Vec<String> = (0..5).map(|i| format!("Fact {}.", i)).collect();
        let answer = format_answer(&contexts);
        assert!(answer.contains("- Fact 2."));
        assert!(!answer.contains("- Fact 3."));
    }

    #[test]
    fn test_not_found_record() {
        let record = not_found_record("anything?");
        assert!(record.id.is_none());
        assert!(record.created_at.is_none());
        assert!(record.citations.is_empty());
        assert!(record.snippets.is_empty());
        assert!(record.answer.contains("couldn't find an answer"));
    }

    #[test]
    fn test_heuristic_snippets_templates() {
        let spec = json!({
            "paths": {
                "/invoices": {
                    "post": {"operationId": "createInvoice", "summary": "Create invoice"}
                }
            }
        });
        let snippets = heuristic_snippets(&spec, "create an invoice", 1);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].language, "curl");
        assert_eq!(
            snippets[0].code,
            "curl -X POST 'https://api.example.com/invoices' -H 'Content-Type: application/json' -d '{}'"
        );
        assert_eq!(snippets[1].language, "python");
        assert!(snippets[1].code.contains("requests.request('POST', 'https://api.example.com/invoices'"));
    }

    #[test]
    fn test_ensure_snippets_pads_empty() {
        let snippets = ensure_snippets(Vec::new());
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].language, "curl");
        assert_eq!(snippets[1].language, "python");
        assert!(snippets[0].code.contains("/ping"));
    }

    #[test]
    fn test_ensure_snippets_keeps_produced_over_padding() {
        let produced = vec![Snippet {
            language: "python".to_string(),
            code: "print('real')".to_string(),
        }];
        let snippets = ensure_snippets(produced);
        assert_eq!(snippets.len(), 2);
        let python = snippets.iter().find(|s| s.language == "python").unwrap();
        assert_eq!(python.code, "print('real')");
        assert!(snippets.iter().any(|s| s.language == "curl"));
    }

    #[test]
    fn test_ensure_snippets_caps_at_three() {
        let many: Vec<Snippet> = ["curl", "python", "javascript", "typescript"]
            .iter()
            .map(|lang| Snippet {
                language: lang.to_string(),
                code: format!("{} example", lang),
            })
            .collect();
        let snippets = ensure_snippets(many);
        assert_eq!(snippets.len(), 3);
    }

    #[test]
    fn test_parse_snippet_response_strict_json() {
        let raw = r#"{"snippets": [{"language": "curl", "code": "curl -X GET 'https://api.example.com/a'"}]}"#;
        let snippets = parse_snippet_response(raw);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].language, "curl");
    }

    #[test]
    fn test_parse_snippet_response_fenced_json() {
        let raw = "```json\n{\"snippets\": [{\"language\": \"Python\", \"code\": \"print(1)\"}]}\n```";
        let snippets = parse_snippet_response(raw);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].language, "python");
        assert_eq!(snippets[0].code, "print(1)");
    }

    #[test]
    fn test_parse_snippet_response_code_fence_fallback() {
        let raw = "Here are examples:\n```curl\ncurl -X GET 'https://api.example.com/a'\n```\nand\n```python\nimport requests\n```\n";
        let snippets = parse_snippet_response(raw);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].language, "curl");
        assert_eq!(snippets[1].language, "python");
        assert_eq!(snippets[1].code, "import requests");
    }

    #[test]
    fn test_parse_snippet_response_garbage() {
        assert!(parse_snippet_response("no snippets here").is_empty());
        assert!(parse_snippet_response("```\nunlabeled\n```").is_empty());
    }

    #[test]
    fn test_build_snippet_prompt_caps() {
        let contexts: Vec<String> = (0..5).map(|i| format!("ctx {}", i)).collect();
        let spec = "s".repeat(5000);
        let prompt = build_snippet_prompt("how?", &contexts, Some(&spec));
        assert!(prompt.contains("Question: how?"));
        assert!(prompt.contains("- ctx 2"));
        assert!(!prompt.contains("- ctx 3"));
        assert!(prompt.contains(&"s".repeat(4000)));
        assert!(!prompt.contains(&"s".repeat(4001)));
    }

    #[tokio::test]
    async fn test_synthesize_snippets_without_generator_uses_heuristic() {
        let spec = json!({
            "openapi": "3.0.0",
            "paths": {
                "/invoices": {
                    "post": {"operationId": "createInvoice", "summary": "Create invoice"}
                }
            }
        })
        .to_string();

        let snippets = synthesize_snippets(
            None,
            "How do I create an invoice?",
            &["Create invoice docs.".to_string()],
            Some(&spec),
        )
        .await;

        assert_eq!(snippets.len(), 2);
        assert!(snippets[0].code.contains("/invoices"));
    }

    #[tokio::test]
    async fn test_synthesize_snippets_without_spec_pads() {
        let snippets = synthesize_snippets(None, "anything?", &[], None).await;
        assert_eq!(snippets.len(), 2);
        assert!(snippets.iter().any(|s| s.language == "curl"));
        assert!(snippets.iter().any(|s| s.language == "python"));
    }
}
