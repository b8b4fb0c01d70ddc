//! Fetch + decode for one batch page, with the one-shot scheme fallback.

use crate::charset;
use crate::error::AppError;
use crate::models::{DecodedPage, PageStage};
use crate::traits::Fetcher;

/// Decoded pages shorter than this are treated as error stubs.
pub const MIN_CONTENT_CHARS: usize = 100;

/// A page that was fetched and decoded successfully.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// The URL that produced the content (`https://` or the `http://` fallback).
    pub url: String,
    /// Where the bytes were served from after redirects.
    pub final_url: String,
    pub decoded: DecodedPage,
}

/// Compose `https://{host}{path}` and its `http://` twin.
///
/// Tolerates a host given with a scheme or trailing slash and a path
/// without its leading slash.
pub fn page_urls(host: &str, path: &str) -> (String, String) {
    let host = host
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    let path = path.trim();
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    (
        format!("https://{}{}", host, path),
        format!("http://{}{}", host, path),
    )
}

/// Load a page over HTTPS, retrying once over plain HTTP if that fails.
///
/// `on_stage` sees `Fetching` and `Decoding` for every attempt. The error
/// of the last attempt is returned.
pub async fn load_page<F: Fetcher>(
    fetcher: &F,
    host: &str,
    path: &str,
    min_chars: usize,
    on_stage: &(dyn Fn(PageStage) + Sync),
) -> Result<LoadedPage, AppError> {
    let (secure, plain) = page_urls(host, path);

    match fetch_and_decode(fetcher, &secure, min_chars, on_stage).await {
        Ok(page) => Ok(page),
        Err(e) => {
            tracing::debug!(url = %secure, error = %e, "HTTPS attempt failed, retrying over HTTP");
            fetch_and_decode(fetcher, &plain, min_chars, on_stage).await
        }
    }
}

/// Fetch and decode one URL, rejecting pages below `min_chars`.
pub async fn load_url<F: Fetcher>(
    fetcher: &F,
    url: &str,
    min_chars: usize,
) -> Result<LoadedPage, AppError> {
    fetch_and_decode(fetcher, url, min_chars, &|_| {}).await
}

async fn fetch_and_decode<F: Fetcher>(
    fetcher: &F,
    url: &str,
    min_chars: usize,
    on_stage: &(dyn Fn(PageStage) + Sync),
) -> Result<LoadedPage, AppError> {
    on_stage(PageStage::Fetching);
    let fetched = fetcher.fetch(url).await?;
    if !fetched.final_url.is_empty() && fetched.final_url != url {
        tracing::debug!(%url, final_url = %fetched.final_url, "Page served after redirects");
    }

    on_stage(PageStage::Decoding);
    let hint = (!fetched.content_type.is_empty()).then_some(fetched.content_type.as_str());
    let decoded = charset::resolve(&fetched.bytes, hint);

    let chars = decoded.text.chars().count();
    if chars < min_chars {
        return Err(AppError::ContentError(format!(
            "page content too short ({} characters)",
            chars
        )));
    }

    tracing::debug!(
        %url,
        bytes = fetched.bytes.len(),
        charset = %decoded.charset_used,
        "Page decoded"
    );
    let final_url = if fetched.final_url.is_empty() {
        url.to_string()
    } else {
        fetched.final_url
    };
    Ok(LoadedPage {
        url: url.to_string(),
        final_url,
        decoded,
    })
}
