//! Provider API keys.
//!
//! Keys arrive per batch as [`Credentials`]. The only ambient source is
//! [`ProviderKeys::from_env`], which the binary loads once and hands to the
//! provider factory.

use std::fmt;

use crate::models::ModelKind;

/// Environment variable holding the default OpenAI key.
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable holding the default Anthropic key.
pub const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Request-level credentials supplied with a batch.
#[derive(Clone, Default)]
pub struct Credentials {
    api_key: Option<String>,
}

impl Credentials {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Pick the key for `model`: the request key first, then the
    /// environment default for that provider. Heuristic needs none.
    pub fn resolve<'a>(&'a self, model: ModelKind, defaults: &'a ProviderKeys) -> Option<&'a str> {
        let fallback = match model {
            ModelKind::Heuristic => return None,
            ModelKind::OpenAi => defaults.openai.as_deref(),
            ModelKind::Claude => defaults.anthropic.as_deref(),
        };
        non_blank(self.api_key.as_deref()).or(non_blank(fallback))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .finish()
    }
}

fn non_blank(key: Option<&str>) -> Option<&str> {
    key.filter(|k| !k.trim().is_empty())
}

/// Environment-level default keys, one per remote provider.
#[derive(Clone, Default)]
pub struct ProviderKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

impl ProviderKeys {
    /// Read `OPENAI_API_KEY` and `ANTHROPIC_API_KEY`; blank values count as unset.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai: read(OPENAI_KEY_ENV),
            anthropic: read(ANTHROPIC_KEY_ENV),
        }
    }

    pub fn has_default(&self, model: ModelKind) -> bool {
        match model {
            ModelKind::Heuristic => true,
            ModelKind::OpenAi => non_blank(self.openai.as_deref()).is_some(),
            ModelKind::Claude => non_blank(self.anthropic.as_deref()).is_some(),
        }
    }
}

impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("openai", &self.openai.as_deref().map(mask_key))
            .field("anthropic", &self.anthropic.as_deref().map(mask_key))
            .finish()
    }
}

/// Short, log-safe rendering of a key: its first few characters only.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{prefix}...")
}
