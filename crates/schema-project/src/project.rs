//! Extracting a JSON object out of a free-form model response, and
//! projecting it onto a JSON-Schema document (C5's schema-filtering half —
//! `ResponseParser.Parse`/`Project`/`ParseWithReasoning`).

use crate::error::{Error, Result};
use jsonschema::Validator;
use serde_json::{Map, Value};

/// Recursion is bounded so an adversarial or deeply-nested schema can't
/// overflow the stack while projecting (Design Note, SPEC_FULL.md §9).
const MAX_PROJECT_DEPTH: usize = 64;

/// Strip trailing commas before `}`/`]` and collapse runs of whitespace,
/// mirroring `original_source/utils/json_utils.py::clean_json_string`.
pub fn clean_json_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ',' {
            // Look ahead past whitespace for a closing brace/bracket.
            let mut lookahead = chars.clone();
            let mut skipped = String::new();
            while let Some(&n) = lookahead.peek() {
                if n.is_whitespace() {
                    skipped.push(n);
                    lookahead.next();
                } else {
                    break;
                }
            }
            if matches!(lookahead.peek(), Some('}') | Some(']')) {
                chars = lookahead;
                continue;
            }
        }
        out.push(c);
    }

    let collapsed: String = out
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
}

/// Finds the first `{` ... matching `}` span, honouring string escapes, so
/// nested braces inside string values don't break the balance count.
fn brace_balanced_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        let c = b as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Pulls the content out of a ```` ```json ... ``` ```` or bare ```` ``` ... ``` ````
/// fenced block, if present.
fn fenced_code_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let after_fence = after_fence.strip_prefix("json").unwrap_or(after_fence);
    let after_fence = after_fence.strip_prefix('\n').unwrap_or(after_fence);
    let end = after_fence.find("```")?;
    Some(&after_fence[..end])
}

/// `Parse(modelText, schema)`: direct decode, then fenced block, then
/// brace-balanced scan, cleaning up formatting issues before each decode
/// attempt. Returns `Error::MalformedModelResponse` rather than panicking
/// if no strategy succeeds.
pub fn parse(model_text: &str) -> Result<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(model_text) {
        return Ok(v);
    }

    if let Some(block) = fenced_code_block(model_text) {
        let cleaned = clean_json_string(block);
        if let Ok(v) = serde_json::from_str::<Value>(&cleaned) {
            return Ok(v);
        }
    }

    if let Some(span) = brace_balanced_span(model_text) {
        let cleaned = clean_json_string(span);
        if let Ok(v) = serde_json::from_str::<Value>(&cleaned) {
            return Ok(v);
        }
    }

    Err(Error::MalformedModelResponse)
}

/// `Project(value, schema)`: keep only keys present in `schema.properties`,
/// recursing into nested objects and array `items`. Primitives and unknown
/// schema shapes (no `properties`) pass through verbatim.
pub fn project(value: &Value, schema: &Value) -> Value {
    project_depth(value, schema, 0)
}

fn project_depth(value: &Value, schema: &Value, depth: usize) -> Value {
    if depth >= MAX_PROJECT_DEPTH {
        return value.clone();
    }

    match value {
        Value::Object(obj) => {
            let properties = schema.get("properties").and_then(Value::as_object);
            let Some(properties) = properties else {
                return value.clone();
            };

            let mut result = Map::new();
            for (key, sub_schema) in properties {
                if let Some(v) = obj.get(key) {
                    result.insert(key.clone(), project_depth(v, sub_schema, depth + 1));
                }
            }
            Value::Object(result)
        }
        Value::Array(items) => {
            let item_schema = schema.get("items");
            match item_schema {
                Some(item_schema) => Value::Array(
                    items
                        .iter()
                        .map(|v| project_depth(v, item_schema, depth + 1))
                        .collect(),
                ),
                None => value.clone(),
            }
        }
        other => other.clone(),
    }
}

/// `ParseWithReasoning(modelText, schema) → {mergedData, reasoning}`.
/// Requires a top-level object with both `merged_data` and `reasoning`;
/// projects only `merged_data`. Falls back to plain `parse` plus a
/// synthesized `{"fallback": "..."}` reasoning object when that shape is
/// absent — wording resolved from
/// `original_source/ai/llm_extractor.py::merge_results_with_reasoning`.
pub fn parse_with_reasoning(model_text: &str, schema: &Value) -> Result<(Value, Value)> {
    if let Ok(parsed) = parse(model_text) {
        if let Some(obj) = parsed.as_object() {
            if let (Some(merged_data), Some(reasoning)) =
                (obj.get("merged_data"), obj.get("reasoning"))
            {
                return Ok((project(merged_data, schema), reasoning.clone()));
            }
        }
    }

    let fallback_data = parse(model_text)?;
    let reasoning = serde_json::json!({
        "fallback": "Could not extract reasoning from model response, using standard merge."
    });
    Ok((project(&fallback_data, schema), reasoning))
}

/// Sanity-checks that `schema` itself compiles as JSON-Schema, using the
/// same `jsonschema` crate the teacher depends on for manifest validation.
pub fn validate_schema_document(schema: &Value) -> Result<()> {
    Validator::new(schema).map_err(|e| Error::InvalidSchema(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_direct_json() {
        let v = parse(r#"{"title": "X"}"#).unwrap();
        assert_eq!(v, json!({"title": "X"}));
    }

    #[test]
    fn parse_strips_trailing_comma_in_fenced_block() {
        let text = "here you go:\n```json\n{\"title\": \"X\",}\n```";
        let v = parse(text).unwrap();
        assert_eq!(v, json!({"title": "X"}));
    }

    #[test]
    fn parse_brace_balanced_scan_with_trailing_comma() {
        let text = "here you go: {\"data\": {\"title\": \"X\",}}";
        let v = parse(text).unwrap();
        assert_eq!(v, json!({"data": {"title": "X"}}));
    }

    #[test]
    fn parse_brace_balanced_scan_ignores_braces_inside_strings() {
        let text = r#"noise {"note": "contains a } brace", "title": "X"} trailing"#;
        let v = parse(text).unwrap();
        assert_eq!(v["title"], json!("X"));
        assert_eq!(v["note"], json!("contains a } brace"));
    }

    #[test]
    fn parse_returns_malformed_error_when_nothing_found() {
        let err = parse("no json here at all").unwrap_err();
        assert!(matches!(err, Error::MalformedModelResponse));
    }

    #[test]
    fn project_drops_unknown_keys_and_recurses() {
        let schema = json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "author": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}}
                }
            }
        });
        let value = json!({
            "title": "X",
            "extra": "drop me",
            "author": {"name": "A", "secret": "drop me too"}
        });

        let projected = project(&value, &schema);
        assert_eq!(
            projected,
            json!({"title": "X", "author": {"name": "A"}})
        );
    }

    #[test]
    fn project_applies_items_schema_to_every_array_element() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"name": {"type": "string"}}
                    }
                }
            }
        });
        let value = json!({"items": [{"name": "a", "junk": 1}, {"name": "b", "junk": 2}]});

        let projected = project(&value, &schema);
        assert_eq!(
            projected,
            json!({"items": [{"name": "a"}, {"name": "b"}]})
        );
    }

    #[test]
    fn project_is_idempotent() {
        let schema = json!({
            "type": "object",
            "properties": {"title": {"type": "string"}}
        });
        let value = json!({"title": "X", "extra": "y"});

        let once = project(&value, &schema);
        let twice = project(&once, &schema);
        assert_eq!(once, twice);
    }

    #[test]
    fn parse_with_reasoning_happy_path() {
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
        let text = r#"{"merged_data": {"title": "X", "junk": 1}, "reasoning": {"title": "chose longest value"}}"#;

        let (data, reasoning) = parse_with_reasoning(text, &schema).unwrap();
        assert_eq!(data, json!({"title": "X"}));
        assert_eq!(reasoning, json!({"title": "chose longest value"}));
    }

    #[test]
    fn parse_with_reasoning_falls_back_when_shape_is_absent() {
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
        let text = r#"{"title": "X", "junk": 1}"#;

        let (data, reasoning) = parse_with_reasoning(text, &schema).unwrap();
        assert_eq!(data, json!({"title": "X"}));
        assert_eq!(
            reasoning["fallback"],
            json!("Could not extract reasoning from model response, using standard merge.")
        );
    }

    #[test]
    fn schema_document_validates() {
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
        assert!(validate_schema_document(&schema).is_ok());
    }
}
