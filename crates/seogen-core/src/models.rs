use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;

/// Which generation strategy a batch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Heuristic,
    #[serde(rename = "openai")]
    OpenAi,
    Claude,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Heuristic => "heuristic",
            ModelKind::OpenAi => "openai",
            ModelKind::Claude => "claude",
        }
    }

    /// Remote providers need an API key and are paced between pages.
    pub fn is_remote(&self) -> bool {
        !matches!(self, ModelKind::Heuristic)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(ModelKind::Heuristic),
            "openai" => Ok(ModelKind::OpenAi),
            "claude" => Ok(ModelKind::Claude),
            _ => Err(format!("Unknown model: {}", s)),
        }
    }
}

/// Raw bytes of a fetched page plus its transport metadata.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, empty if absent.
    pub content_type: String,
    /// URL the bytes were finally served from, after redirects.
    pub final_url: String,
}

/// Page text decoded with a charset the resolver could actually use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub text: String,
    pub charset_used: String,
}

/// SEO signals derived from page markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedSignals {
    pub plain_text: String,
    pub existing_title: String,
    pub existing_h1: String,
    /// Deduplicated, in extraction-pattern priority order.
    pub candidate_selectors: Vec<String>,
}

/// Which SEO fields a batch should generate and write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelection {
    pub title: bool,
    pub description: bool,
    pub json_ld: bool,
    pub canonical: bool,
    pub h1_selector: bool,
}

impl FieldSelection {
    pub fn all() -> Self {
        Self {
            title: true,
            description: true,
            json_ld: true,
            canonical: true,
            h1_selector: true,
        }
    }

    pub fn any(&self) -> bool {
        self.title || self.description || self.json_ld || self.canonical || self.h1_selector
    }

    /// Parse a comma-separated list such as `title,description,json_ld`.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        let mut fields = Self::default();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.to_lowercase().replace('-', "_").as_str() {
                "title" => fields.title = true,
                "description" => fields.description = true,
                "json_ld" | "jsonld" => fields.json_ld = true,
                "canonical" => fields.canonical = true,
                "h1_selector" | "h1" => fields.h1_selector = true,
                "all" => fields = Self::all(),
                other => return Err(format!("Unknown field: {}", other)),
            }
        }
        Ok(fields)
    }
}

/// Whatever a provider produced. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_ld: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h1_selector: Option<String>,
}

impl GeneratedFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.json_ld.is_none()
            && self.canonical.is_none()
            && self.h1_selector.is_none()
    }

    /// Keep only fields that were requested and actually produced.
    ///
    /// Empty strings, JSON `null`, and empty objects count as absent so they
    /// never overwrite stored values.
    pub fn select(&self, fields: &FieldSelection) -> FieldUpdate {
        fn text(wanted: bool, value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| wanted && !v.is_empty())
                .map(str::to_string)
        }

        let json_ld = self.json_ld.as_ref().filter(|v| {
            fields.json_ld
                && match v {
                    serde_json::Value::Null => false,
                    serde_json::Value::Object(map) => !map.is_empty(),
                    serde_json::Value::String(s) => !s.trim().is_empty(),
                    _ => true,
                }
        });

        FieldUpdate {
            title: text(fields.title, &self.title),
            description: text(fields.description, &self.description),
            json_ld: json_ld.cloned(),
            canonical: text(fields.canonical, &self.canonical),
            h1_selector: text(fields.h1_selector, &self.h1_selector),
        }
    }
}

/// Fields to write for one page; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub json_ld: Option<serde_json::Value>,
    pub canonical: Option<String>,
    pub h1_selector: Option<String>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.json_ld.is_none()
            && self.canonical.is_none()
            && self.h1_selector.is_none()
    }
}

/// A page scheduled for a batch, as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    pub id: String,
    pub path: String,
}

/// One batch invocation.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub version_id: String,
    pub host: String,
    /// Restrict the batch to these page ids; empty means every page.
    pub page_ids: Vec<String>,
    pub fields: FieldSelection,
    pub model: ModelKind,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Error,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Success => "success",
            PageStatus::Error => "error",
        }
    }
}

/// Outcome recorded for one page of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub page_id: String,
    pub path: String,
    pub status: PageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Aggregated per-page outcomes of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Model of the most recent successful generation.
    pub model: String,
    pub results: Vec<PageResult>,
}

impl BatchReport {
    pub fn from_results(total: usize, model: String, results: Vec<PageResult>) -> Self {
        let success_count = results
            .iter()
            .filter(|r| r.status == PageStatus::Success)
            .count();
        let error_count = results.len() - success_count;
        Self {
            total,
            success_count,
            error_count,
            model,
            results,
        }
    }
}

/// Where a page is in the per-page pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    Pending,
    Fetching,
    Decoding,
    Extracting,
    Generating,
    Persisted,
    Failed,
}

impl PageStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStage::Pending => "pending",
            PageStage::Fetching => "fetching",
            PageStage::Decoding => "decoding",
            PageStage::Extracting => "extracting",
            PageStage::Generating => "generating",
            PageStage::Persisted => "persisted",
            PageStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PageStage::Persisted | PageStage::Failed)
    }
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
