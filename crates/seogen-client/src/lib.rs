pub mod fetcher;
pub mod llm;
pub mod prompt;

pub use fetcher::{FetchConfig, ReqwestFetcher};
pub use llm::{
    AnyGenerator, ClaudeGenerator, KeyStatus, OpenAiGenerator, ProviderConfig, ProviderFactory,
    verify_key,
};
