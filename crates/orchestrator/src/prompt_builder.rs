//! PromptBuilder (C4): the three deterministic prompt shapes consumed by the
//! engine — per-chunk extraction, intermediate merge, final merge.

use serde_json::Value;

/// `BuildExtractionPrompt(chunkText, schema, chunkIndex, totalChunks)`.
/// Instructs the model to return `{"data": {...}, "metadata": {field:
/// {pageNumber, prominence, format, confidence}}}`.
pub fn build_extraction_prompt(chunk_text: &str, schema: &Value, chunk_index: usize, total_chunks: usize) -> String {
    format!(
        "You are extracting structured data from a document chunk ({current} of {total}).\n\
         Return a single JSON object of the exact shape:\n\
         {{\"data\": <object matching the schema below>, \"metadata\": {{\"<field>\": {{\"pageNumber\": <int|null>, \"prominence\": <string>, \"format\": <string>, \"confidence\": <0..1>}}}}}}\n\
         Only include fields you can find evidence for in this chunk.\n\n\
         Schema:\n{schema}\n\n\
         Chunk text:\n{chunk_text}",
        current = chunk_index + 1,
        total = total_chunks,
        schema = schema.to_string(),
        chunk_text = chunk_text,
    )
}

/// `BuildIntermediatePrompt(accumulatedChunkResults, schema)`. Instructs the
/// model to merge all supplied chunk results and return `{"merged_data":
/// {...}, "reasoning": {field: explanation}}`.
pub fn build_intermediate_prompt(accumulated_chunk_results: &[Value], schema: &Value) -> String {
    build_merge_prompt(accumulated_chunk_results, schema, false)
}

/// `BuildFinalPrompt(...)`. Identical shape to intermediate; used for the
/// terminal merge.
pub fn build_final_prompt(accumulated_chunk_results: &[Value], schema: &Value) -> String {
    build_merge_prompt(accumulated_chunk_results, schema, true)
}

fn build_merge_prompt(accumulated_chunk_results: &[Value], schema: &Value, is_final: bool) -> String {
    let kind = if is_final { "final" } else { "intermediate" };
    let results = Value::Array(accumulated_chunk_results.to_vec());
    format!(
        "Merge the following {kind} set of per-chunk extraction results into one object matching the schema below.\n\
         Where chunks disagree, prefer the more complete or more confident value and explain your choice.\n\
         Return a single JSON object of the exact shape:\n\
         {{\"merged_data\": <object matching the schema>, \"reasoning\": {{\"<field>\": \"<explanation>\"}}}}\n\n\
         Schema:\n{schema}\n\n\
         Chunk results:\n{results}",
        kind = kind,
        schema = schema.to_string(),
        results = results.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extraction_prompt_embeds_schema_and_chunk_position() {
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
        let prompt = build_extraction_prompt("some text", &schema, 1, 5);
        assert!(prompt.contains("2 of 5"));
        assert!(prompt.contains("some text"));
        assert!(prompt.contains("\"title\""));
    }

    #[test]
    fn intermediate_and_final_prompts_share_a_shape_but_differ_in_wording() {
        let schema = json!({"type": "object"});
        let results = vec![json!({"data": {"title": "A"}})];
        let intermediate = build_intermediate_prompt(&results, &schema);
        let final_prompt = build_final_prompt(&results, &schema);

        assert!(intermediate.contains("merged_data"));
        assert!(final_prompt.contains("merged_data"));
        assert!(intermediate.contains("intermediate"));
        assert!(final_prompt.contains("final"));
    }

    #[test]
    fn prompts_are_deterministic_functions_of_their_inputs() {
        let schema = json!({"type": "object"});
        let results = vec![json!({"data": {"title": "A"}})];
        assert_eq!(
            build_intermediate_prompt(&results, &schema),
            build_intermediate_prompt(&results, &schema)
        );
    }
}
