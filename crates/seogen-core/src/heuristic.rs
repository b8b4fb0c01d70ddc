//! Rule-based SEO field generation. Needs no credentials and no network.

use url::Url;

use crate::error::AppError;
use crate::models::{ExtractedSignals, FieldSelection, GeneratedFields, ModelKind};
use crate::traits::Generator;

pub const TITLE_MAX_CHARS: usize = 60;
pub const DESCRIPTION_MAX_CHARS: usize = 160;
const MIN_SENTENCE_CHARS: usize = 20;
const DEFAULT_TITLE: &str = "Page Title";
const DEFAULT_DESCRIPTION: &str = "Page description";

/// Query parameters that survive canonicalization, in output order.
const CANONICAL_PARAMS: &[&str] = &["id", "no"];

/// Heading selectors preferred for `h1_selector`, most specific first.
const H1_SELECTOR_PRIORITY: &[&str] = &[
    "[data-seo-heading]",
    ".post-title",
    "#post-title",
    ".title",
    "#title",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicGenerator;

impl HeuristicGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`Generator::generate`].
    pub fn build(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> GeneratedFields {
        let mut out = GeneratedFields::default();

        if fields.title {
            out.title = Some(heuristic_title(signals));
        }
        if fields.description {
            out.description = Some(heuristic_description(signals));
        }
        if fields.canonical {
            out.canonical = Some(canonical_url(url));
        }
        if fields.h1_selector {
            out.h1_selector = pick_h1_selector(&signals.candidate_selectors);
        }
        if fields.json_ld {
            let name = out
                .title
                .clone()
                .or_else(|| non_empty(&signals.existing_title))
                .or_else(|| non_empty(&signals.existing_h1))
                .unwrap_or_default();
            out.json_ld = Some(serde_json::json!({
                "@context": "https://schema.org",
                "@type": "WebPage",
                "name": name,
                "description": out.description.clone().unwrap_or_default(),
                "url": out.canonical.clone().unwrap_or_else(|| url.to_string()),
            }));
        }

        out
    }
}

impl Generator for HeuristicGenerator {
    fn model(&self) -> ModelKind {
        ModelKind::Heuristic
    }

    async fn generate(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> Result<GeneratedFields, AppError> {
        Ok(self.build(signals, url, fields))
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Existing H1, else existing title, else a placeholder; capped at 60 chars.
pub fn heuristic_title(signals: &ExtractedSignals) -> String {
    let source = non_empty(&signals.existing_h1)
        .or_else(|| non_empty(&signals.existing_title))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    truncate_with_ellipsis(&source, TITLE_MAX_CHARS)
}

/// First two substantial sentences of the page text, capped at 160 chars.
pub fn heuristic_description(signals: &ExtractedSignals) -> String {
    let sentences: Vec<&str> = signals
        .plain_text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .take(2)
        .collect();
    let description: String = sentences
        .join(". ")
        .chars()
        .take(DESCRIPTION_MAX_CHARS)
        .collect();

    if description.is_empty() {
        non_empty(&signals.existing_title)
            .or_else(|| non_empty(&signals.existing_h1))
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
    } else {
        description
    }
}

/// `origin + path`, keeping only the allow-listed query parameters.
///
/// Unparseable input is returned unchanged.
pub fn canonical_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut kept = 0;
    for key in CANONICAL_PARAMS {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == key) {
            query.append_pair(key, &value);
            kept += 1;
        }
    }

    let mut canonical = format!("{}{}", url.origin().ascii_serialization(), url.path());
    if kept > 0 {
        canonical.push('?');
        canonical.push_str(&query.finish());
    }
    canonical
}

/// Best heading selector among the extractor's candidates.
pub fn pick_h1_selector(candidates: &[String]) -> Option<String> {
    H1_SELECTOR_PRIORITY
        .iter()
        .find(|preferred| candidates.iter().any(|c| c == *preferred))
        .map(|s| s.to_string())
        .or_else(|| candidates.first().cloned())
}

/// Cut to `max` chars, replacing the last three with `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
