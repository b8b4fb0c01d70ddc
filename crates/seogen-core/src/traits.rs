use std::future::Future;

use crate::credentials::Credentials;
use crate::error::{AppError, FetchError};
use crate::models::{
    ExtractedSignals, FetchedPage, FieldSelection, FieldUpdate, GeneratedFields, ModelKind,
    PageTarget,
};

/// Fetches the raw bytes of a page over HTTP(S).
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// Derives SEO signals from decoded markup.
pub trait SignalExtractor: Send + Sync + Clone {
    fn extract(&self, html: &str) -> ExtractedSignals;
}

/// Synthesizes SEO fields for one page.
pub trait Generator: Send + Sync {
    /// The strategy this generator implements, recorded in batch results.
    fn model(&self) -> ModelKind;

    fn generate(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> impl Future<Output = Result<GeneratedFields, AppError>> + Send;
}

/// Builds the generator for a batch from the selected model and credentials.
///
/// Fails (rather than substituting another model) when the selected
/// provider has no usable key.
pub trait GeneratorFactory: Send + Sync + Clone {
    type Generator: Generator;

    fn create(
        &self,
        model: ModelKind,
        credentials: &Credentials,
    ) -> Result<Self::Generator, AppError>;
}

/// The external store holding pages and versions.
pub trait PageStore: Send + Sync + Clone {
    /// Pages of a version in processing order, optionally restricted to `page_ids`.
    fn list_pages_for_batch(
        &self,
        version_id: &str,
        page_ids: &[String],
    ) -> impl Future<Output = Result<Vec<PageTarget>, AppError>> + Send;

    /// Write the given fields; `None` fields keep their stored value.
    fn apply_field_updates(
        &self,
        page_id: &str,
        update: &FieldUpdate,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Flag the version as having had a generation run.
    fn mark_version_generated(
        &self,
        version_id: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
