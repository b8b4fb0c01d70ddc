pub mod batch;
pub mod charset;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod heuristic;
pub mod models;
pub mod page;
pub mod progress;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use batch::{BatchConfig, BatchService};
pub use credentials::{Credentials, ProviderKeys};
pub use error::{AppError, FetchError, TransportKind};
pub use extract::RegexExtractor;
pub use heuristic::HeuristicGenerator;
pub use models::{BatchReport, BatchRequest, ExtractedSignals, FieldSelection, ModelKind};
pub use progress::{ProgressEvent, ProgressSink};
pub use traits::{Fetcher, Generator, GeneratorFactory, PageStore, SignalExtractor};
