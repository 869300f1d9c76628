use super::types::AiRequestItem;

/// System prompt for source review
pub const REVIEW_SYSTEM_PROMPT: &str = r#"You are a senior software engineer performing a code review. Your task is to review one source file and report concrete, actionable findings.

RULES:
1. Focus on correctness bugs, security issues, concurrency hazards and error handling
2. Mention style only when it hides a real problem
3. Reference line numbers or identifiers for every finding
4. Order findings by severity: critical, major, minor
5. If the file looks fine, say so in one sentence
6. Do not restate the code; do not invent context that is not in the file

FORMAT:
- One bullet per finding: [severity] location: problem. Suggested fix.
- End with a one-line overall assessment."#;

/// Build the user prompt for reviewing one parsed item
pub fn build_review_prompt(item: &AiRequestItem) -> String {
    let mut prompt = format!(
        r#"Review this file:

FILE: {}
LANGUAGE: {}"#,
        item.file_id,
        item.meta("language").unwrap_or("unknown"),
    );

    if let Some(lines) = item.meta("lines") {
        prompt.push_str(&format!("\nLINES: {}", lines));
    }
    if item.meta("truncated") == Some("true") {
        prompt.push_str("\nNOTE: content was truncated; review only what is shown.");
    }

    prompt.push_str(&format!(
        r#"

CONTENT:
---
{}
---"#,
        item.content
    ));

    prompt.push_str("\n\nRespond with the findings list only.");

    prompt
}
