//! Sequential batch orchestration.
//!
//! Pages are processed one at a time in store order. A page failure is
//! recorded and the batch moves on; only pre-flight validation, a failed page
//! listing, or cancellation end a batch early. Every exit path emits exactly
//! one terminal progress event.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{
    BatchReport, BatchRequest, ModelKind, PageResult, PageStage, PageStatus, PageTarget,
};
use crate::page::{self, MIN_CONTENT_CHARS};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::traits::{Fetcher, Generator, GeneratorFactory, PageStore, SignalExtractor};

/// Tuning for [`BatchService`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause before every page after the first when a remote provider is used.
    pub inter_item_delay: Duration,
    pub min_content_chars: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_item_delay: Duration::from_millis(500),
            min_content_chars: MIN_CONTENT_CHARS,
        }
    }
}

impl BatchConfig {
    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    pub fn with_min_content_chars(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }
}

/// Runs generation batches: list → (fetch → decode → extract → generate → persist) per page.
///
/// Generic over every collaborator so tests can run without HTTP, providers,
/// or a database.
pub struct BatchService<F, X, GF, S>
where
    F: Fetcher,
    X: SignalExtractor,
    GF: GeneratorFactory,
    S: PageStore,
{
    fetcher: F,
    extractor: X,
    factory: GF,
    store: S,
    config: BatchConfig,
}

impl<F, X, GF, S> BatchService<F, X, GF, S>
where
    F: Fetcher,
    X: SignalExtractor,
    GF: GeneratorFactory,
    S: PageStore,
{
    pub fn new(fetcher: F, extractor: X, factory: GF, store: S, config: BatchConfig) -> Self {
        Self {
            fetcher,
            extractor,
            factory,
            store,
            config,
        }
    }

    /// Run one batch to completion, streaming progress into `sink`.
    ///
    /// The sink is dropped before returning, which closes the stream.
    pub async fn run<P: ProgressSink>(
        &self,
        request: &BatchRequest,
        sink: P,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, AppError> {
        let result = self.run_inner(request, &sink, cancel).await;
        match &result {
            Ok(report) => sink.emit(ProgressEvent::Complete(report.clone())),
            Err(e) => sink.emit(ProgressEvent::Error {
                error: e.to_string(),
            }),
        }
        drop(sink);
        result
    }

    async fn run_inner<P: ProgressSink>(
        &self,
        request: &BatchRequest,
        sink: &P,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, AppError> {
        validate(request)?;

        let pages = self
            .store
            .list_pages_for_batch(&request.version_id, &request.page_ids)
            .await?;
        let total = pages.len();

        tracing::info!(
            version_id = %request.version_id,
            host = %request.host,
            %total,
            model = %request.model,
            "Starting generation batch"
        );
        sink.emit(ProgressEvent::Init {
            total,
            model: request.model,
        });

        // Built once; a missing key fails every page rather than switching models.
        let generator = self.factory.create(request.model, &request.credentials);
        if let Err(e) = &generator {
            tracing::warn!(model = %request.model, category = %e.category(), error = %e, "Generator unavailable");
        }

        let mut results: Vec<PageResult> = Vec::with_capacity(total);
        let mut used_model: Option<ModelKind> = None;

        for (i, page) in pages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(cancelled(i, total));
            }
            if i > 0 && request.model.is_remote() && !self.config.inter_item_delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(self.config.inter_item_delay) => {}
                    () = cancel.cancelled() => return Err(cancelled(i, total)),
                }
            }

            sink.emit(ProgressEvent::Progress {
                current: i + 1,
                total,
                path: page.path.clone(),
            });
            log_stage(page, PageStage::Pending);

            let outcome = match &generator {
                Ok(generator) => self.process_page(generator, request, page).await,
                Err(e) => {
                    results.push(failed_result(page, request, e));
                    continue;
                }
            };

            let result = match outcome {
                Ok(model) => {
                    used_model = Some(model);
                    PageResult {
                        page_id: page.id.clone(),
                        path: page.path.clone(),
                        status: PageStatus::Success,
                        message: None,
                        model: Some(model.to_string()),
                    }
                }
                Err(e) => failed_result(page, request, &e),
            };
            results.push(result);
        }

        if let Err(e) = self.store.mark_version_generated(&request.version_id).await {
            tracing::warn!(version_id = %request.version_id, error = %e, "Failed to mark version as generated");
        }

        let model = used_model.unwrap_or(request.model);
        let report = BatchReport::from_results(total, model.to_string(), results);
        tracing::info!(
            total = report.total,
            success = report.success_count,
            errors = report.error_count,
            "Generation batch finished"
        );
        Ok(report)
    }

    /// Drive one page through the pipeline.
    async fn process_page(
        &self,
        generator: &GF::Generator,
        request: &BatchRequest,
        page: &PageTarget,
    ) -> Result<ModelKind, AppError> {
        let stage = |stage: PageStage| log_stage(page, stage);

        let loaded = page::load_page(
            &self.fetcher,
            &request.host,
            &page.path,
            self.config.min_content_chars,
            &stage,
        )
        .await?;

        stage(PageStage::Extracting);
        let signals = self.extractor.extract(&loaded.decoded.text);

        stage(PageStage::Generating);
        let generated = generator
            .generate(&signals, &loaded.url, &request.fields)
            .await?;

        let update = generated.select(&request.fields);
        if update.is_empty() {
            return Err(AppError::ContentError(
                "generator produced none of the requested fields".into(),
            ));
        }

        self.store.apply_field_updates(&page.id, &update).await?;

        stage(PageStage::Persisted);
        Ok(generator.model())
    }
}

fn failed_result(page: &PageTarget, request: &BatchRequest, error: &AppError) -> PageResult {
    tracing::warn!(
        page_id = %page.id,
        path = %page.path,
        stage = %PageStage::Failed,
        category = %error.category(),
        error = %error,
        "Page failed"
    );
    PageResult {
        page_id: page.id.clone(),
        path: page.path.clone(),
        status: PageStatus::Error,
        message: Some(error.to_string()),
        model: Some(request.model.to_string()),
    }
}

fn log_stage(page: &PageTarget, stage: PageStage) {
    if stage.is_terminal() {
        tracing::info!(page_id = %page.id, path = %page.path, %stage, "Page done");
    } else {
        tracing::debug!(page_id = %page.id, path = %page.path, %stage, "Page stage");
    }
}

fn cancelled(processed: usize, total: usize) -> AppError {
    tracing::info!(%processed, %total, "Batch cancelled");
    AppError::Cancelled { processed, total }
}

/// Reject requests that cannot start; runs before any I/O.
pub fn validate(request: &BatchRequest) -> Result<(), AppError> {
    if request.version_id.trim().is_empty() {
        return Err(AppError::ValidationError("version id is required".into()));
    }
    if request.host.trim().is_empty() {
        return Err(AppError::ValidationError("host is required".into()));
    }
    if !request.fields.any() {
        return Err(AppError::ValidationError(
            "select at least one field to generate".into(),
        ));
    }
    Ok(())
}
