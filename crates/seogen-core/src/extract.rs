//! Lightweight SEO signal extraction from raw markup.
//!
//! Pattern matching only, no DOM. Good enough for titles, the first heading
//! and a handful of well-known heading class names.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ExtractedSignals;
use crate::traits::SignalExtractor;

#[allow(clippy::expect_used)]
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid regex"));

#[allow(clippy::expect_used)]
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid regex"));

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[allow(clippy::expect_used)]
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[allow(clippy::expect_used)]
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid regex"));

#[allow(clippy::expect_used)]
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("valid regex"));

/// Heading selector patterns in priority order. Each contributes at most once.
#[allow(clippy::expect_used)]
static SELECTOR_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let class = |name: &str| format!(r#"(?i)class\s*=\s*["'][^"']*{name}[^"']*["']"#);
    [
        (r"(?i)data-seo-heading".to_string(), "[data-seo-heading]"),
        (class("post-title"), ".post-title"),
        (class("page-title"), ".page-title"),
        (class("entry-title"), ".entry-title"),
        (class("article-title"), ".article-title"),
        (class("main-title"), ".main-title"),
        (r#"(?i)\bid\s*=\s*["']post-title["']"#.to_string(), "#post-title"),
        (r#"(?i)\bid\s*=\s*["']title["']"#.to_string(), "#title"),
        (r"(?i)<h1\b[^>]*>".to_string(), "h1"),
        (r"(?i)<h2\b[^>]*>".to_string(), "h2"),
    ]
    .into_iter()
    .map(|(pattern, selector)| (Regex::new(&pattern).expect("valid regex"), selector))
    .collect()
});

/// Regex-backed [`SignalExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor;

impl RegexExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SignalExtractor for RegexExtractor {
    fn extract(&self, html: &str) -> ExtractedSignals {
        extract_signals(html)
    }
}

/// Derive all signals from `html`. Pure and deterministic.
pub fn extract_signals(html: &str) -> ExtractedSignals {
    let markup = strip_code_blocks(html);
    ExtractedSignals {
        plain_text: collapse_whitespace(&TAG_RE.replace_all(&markup, " ")),
        existing_title: first_element_text(&TITLE_RE, &markup),
        existing_h1: first_element_text(&H1_RE, &markup),
        candidate_selectors: candidate_selectors(html),
    }
}

/// Visible text: scripts and styles removed, tags stripped, whitespace collapsed.
pub fn plain_text(html: &str) -> String {
    let markup = strip_code_blocks(html);
    collapse_whitespace(&TAG_RE.replace_all(&markup, " "))
}

fn strip_code_blocks(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    STYLE_RE.replace_all(&text, " ").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Inner text of the first element matched by `re`, nested tags stripped.
fn first_element_text(re: &Regex, html: &str) -> String {
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|inner| collapse_whitespace(&TAG_RE.replace_all(inner.as_str(), " ")))
        .unwrap_or_default()
}

/// Selectors likely to identify the page's primary heading, in priority order.
pub fn candidate_selectors(html: &str) -> Vec<String> {
    let mut selectors: Vec<String> = Vec::new();
    for (re, selector) in SELECTOR_PATTERNS.iter() {
        if re.is_match(html) && !selectors.iter().any(|s| s == selector) {
            selectors.push((*selector).to_string());
        }
    }
    selectors
}
