//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use crate::credentials::Credentials;
use crate::error::{AppError, FetchError};
use crate::heuristic::HeuristicGenerator;
use crate::models::{
    ExtractedSignals, FetchedPage, FieldSelection, FieldUpdate, GeneratedFields, ModelKind,
    PageTarget,
};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::traits::{Fetcher, Generator, GeneratorFactory, PageStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A page comfortably above the minimum content length.
pub fn long_html(body: &str) -> String {
    format!(
        "<html><head><title>Fixture page</title></head><body>{}<p>{}</p></body></html>",
        body,
        "This fixture paragraph pads the page well past the minimum content length. ".repeat(3)
    )
}

pub fn page_bytes(html: &str) -> FetchedPage {
    FetchedPage {
        bytes: html.as_bytes().to_vec(),
        content_type: "text/html; charset=utf-8".to_string(),
        final_url: String::new(),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher with a response queue and per-URL failures.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns `fallback` (or a default page).
    responses: Arc<Mutex<Vec<Result<FetchedPage, FetchError>>>>,
    fallback: Option<String>,
    /// URLs containing the fragment always fail with the error.
    failures: Arc<Mutex<Vec<(String, FetchError)>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Serve `html` for every request.
    pub fn new(html: &str) -> Self {
        Self {
            fallback: Some(html.to_string()),
            ..Default::default()
        }
    }

    pub fn with_responses(responses: Vec<Result<FetchedPage, FetchError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Default::default()
        }
    }

    pub fn fail_on(self, url_fragment: &str, error: FetchError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((url_fragment.to_string(), error));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());

        if let Some((_, err)) = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
        {
            return Err(err.clone());
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            let html = self
                .fallback
                .clone()
                .unwrap_or_else(|| long_html("<h1>Default heading</h1>"));
            Ok(page_bytes(&html))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// Mock generator returning queued results, or the heuristic output when
/// built by [`MockGeneratorFactory::heuristic`].
#[derive(Clone)]
pub struct MockGenerator {
    model: ModelKind,
    responses: Arc<Mutex<Vec<Result<GeneratedFields, AppError>>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Generator for MockGenerator {
    fn model(&self) -> ModelKind {
        self.model
    }

    async fn generate(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> Result<GeneratedFields, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.model == ModelKind::Heuristic {
            return Ok(HeuristicGenerator::new().build(signals, url, fields));
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(GeneratedFields {
                title: Some("Generated title".into()),
                description: Some("Generated description".into()),
                ..Default::default()
            })
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockGeneratorFactory
// ---------------------------------------------------------------------------

/// Mock factory handing out one shared [`MockGenerator`].
#[derive(Clone)]
pub struct MockGeneratorFactory {
    generator: MockGenerator,
    create_error: Arc<Mutex<Option<AppError>>>,
    pub created: Arc<Mutex<Vec<ModelKind>>>,
}

impl MockGeneratorFactory {
    pub fn heuristic() -> Self {
        Self::with_responses(ModelKind::Heuristic, vec![])
    }

    pub fn with_responses(
        model: ModelKind,
        responses: Vec<Result<GeneratedFields, AppError>>,
    ) -> Self {
        Self {
            generator: MockGenerator {
                model,
                responses: Arc::new(Mutex::new(responses)),
                calls: Arc::new(Mutex::new(Vec::new())),
            },
            create_error: Arc::new(Mutex::new(None)),
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_create_error(error: AppError) -> Self {
        let factory = Self::heuristic();
        *factory.create_error.lock().unwrap() = Some(error);
        factory
    }
}

impl GeneratorFactory for MockGeneratorFactory {
    type Generator = MockGenerator;

    fn create(&self, model: ModelKind, _credentials: &Credentials) -> Result<MockGenerator, AppError> {
        self.created.lock().unwrap().push(model);
        let mut err = self.create_error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(self.generator.clone())
    }
}

// ---------------------------------------------------------------------------
// MockPageStore
// ---------------------------------------------------------------------------

/// Recorded update: (page_id, fields written).
pub type UpdateRecord = (String, FieldUpdate);

/// In-memory page store recording every write.
#[derive(Clone, Default)]
pub struct MockPageStore {
    pages: Arc<Mutex<Vec<PageTarget>>>,
    list_error: Arc<Mutex<Option<AppError>>>,
    update_errors: Arc<Mutex<Vec<(String, AppError)>>>,
    mark_error: Arc<Mutex<Option<AppError>>>,
    list_calls: Arc<Mutex<usize>>,
    updates: Arc<Mutex<Vec<UpdateRecord>>>,
    marked: Arc<Mutex<Vec<String>>>,
}

impl MockPageStore {
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        let pages = pages
            .iter()
            .map(|(id, path)| PageTarget {
                id: id.to_string(),
                path: path.to_string(),
            })
            .collect();
        Self {
            pages: Arc::new(Mutex::new(pages)),
            ..Default::default()
        }
    }

    pub fn with_list_error(error: AppError) -> Self {
        Self {
            list_error: Arc::new(Mutex::new(Some(error))),
            ..Default::default()
        }
    }

    pub fn fail_update(self, page_id: &str, error: AppError) -> Self {
        self.update_errors
            .lock()
            .unwrap()
            .push((page_id.to_string(), error));
        self
    }

    pub fn fail_mark(self, error: AppError) -> Self {
        *self.mark_error.lock().unwrap() = Some(error);
        self
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn updates(&self) -> Vec<UpdateRecord> {
        self.updates.lock().unwrap().clone()
    }

    pub fn updated_ids(&self) -> Vec<String> {
        self.updates().into_iter().map(|(id, _)| id).collect()
    }

    pub fn marked_versions(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }
}

impl PageStore for MockPageStore {
    async fn list_pages_for_batch(
        &self,
        _version_id: &str,
        page_ids: &[String],
    ) -> Result<Vec<PageTarget>, AppError> {
        *self.list_calls.lock().unwrap() += 1;
        if let Some(e) = self.list_error.lock().unwrap().take() {
            return Err(e);
        }
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .iter()
            .filter(|p| page_ids.is_empty() || page_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn apply_field_updates(&self, page_id: &str, update: &FieldUpdate) -> Result<(), AppError> {
        let mut errors = self.update_errors.lock().unwrap();
        if let Some(pos) = errors.iter().position(|(id, _)| id == page_id) {
            return Err(errors.remove(pos).1);
        }
        self.updates
            .lock()
            .unwrap()
            .push((page_id.to_string(), update.clone()));
        Ok(())
    }

    async fn mark_version_generated(&self, version_id: &str) -> Result<(), AppError> {
        if let Some(e) = self.mark_error.lock().unwrap().take() {
            return Err(e);
        }
        self.marked.lock().unwrap().push(version_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockProgressSink
// ---------------------------------------------------------------------------

/// Progress sink that records events. Clones share the same log.
#[derive(Clone, Default)]
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for MockProgressSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
