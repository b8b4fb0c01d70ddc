//! Prompt construction and reply parsing shared by the remote providers.

use seogen_core::error::AppError;
use seogen_core::models::{ExtractedSignals, FieldSelection, GeneratedFields};

pub const SYSTEM_PROMPT: &str =
    "You are an SEO expert generating web page metadata. Respond with valid JSON only.";

/// Page text beyond this many characters is left out of the prompt.
pub const MAX_CONTENT_CHARS: usize = 3000;

/// Build the user prompt for one page.
pub fn build_prompt(signals: &ExtractedSignals, url: &str, fields: &FieldSelection) -> String {
    let or_none = |s: &str| if s.is_empty() { "none".to_string() } else { s.to_string() };

    let mut wanted: Vec<String> = Vec::new();
    let mut shape: Vec<&str> = Vec::new();
    if fields.title {
        wanted.push("title (max 60 characters)".into());
        shape.push(r#""title": "generated title""#);
    }
    if fields.description {
        wanted.push("description (max 160 characters)".into());
        shape.push(r#""description": "generated description""#);
    }
    if fields.json_ld {
        wanted.push("json_ld (a Schema.org FAQPage or WebPage object)".into());
        shape.push(r#""json_ld": { ... Schema.org object ... }"#);
    }
    if fields.canonical {
        wanted.push("canonical URL".into());
        shape.push(r#""canonical": "canonical URL""#);
    }
    if fields.h1_selector {
        wanted.push(format!(
            "h1_selector (available selectors: {})",
            signals.candidate_selectors.join(", ")
        ));
        shape.push(r#""h1_selector": "CSS selector""#);
    }

    let content: String = signals.plain_text.chars().take(MAX_CONTENT_CHARS).collect();

    format!(
        "Analyze the following web page content and generate SEO metadata.\n\n\
         URL: {url}\n\
         Existing title: {title}\n\
         Existing h1: {h1}\n\n\
         Page content (excerpt):\n{content}\n\n\
         Fields to generate: {wanted}\n\n\
         Respond with JSON only, in this shape:\n{{\n  {shape}\n}}",
        url = url,
        title = or_none(&signals.existing_title),
        h1 = or_none(&signals.existing_h1),
        content = content,
        wanted = wanted.join(", "),
        shape = shape.join(",\n  "),
    )
}

/// Parse the JSON object embedded in a model reply.
///
/// Takes the span from the first `{` to the last `}` so prose or code
/// fences around the object are ignored.
pub fn parse_reply(provider: &str, reply: &str) -> Result<GeneratedFields, AppError> {
    let span = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(AppError::ContentError(format!(
                "{provider} reply contained no JSON object"
            )));
        }
    };

    let fields: GeneratedFields = serde_json::from_str(span).map_err(|e| {
        AppError::ContentError(format!("{provider} reply JSON could not be parsed: {e}"))
    })?;

    if fields.is_empty() {
        return Err(AppError::ContentError(format!(
            "{provider} reply contained none of the expected fields"
        )));
    }
    Ok(fields)
}
