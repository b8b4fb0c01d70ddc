//! Charset resolution for fetched pages.
//!
//! Picks an encoding from the transport hint or the page's own `<meta>`
//! declarations, decodes with it, and retries as EUC-KR when the result is
//! full of replacement characters. Korean sites frequently serve EUC-KR
//! bytes with a wrong or missing label.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{EUC_KR, Encoding, UTF_8};
use regex::Regex;

use crate::models::DecodedPage;

/// More replacement characters than this triggers the EUC-KR retry.
pub const BROKEN_CHAR_THRESHOLD: usize = 5;

const KOREAN: &str = "euc-kr";
const FALLBACK: &str = "utf-8";

#[allow(clippy::expect_used)]
static CONTENT_TYPE_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)charset\s*=\s*([^\s;]+)").expect("valid regex"));

#[allow(clippy::expect_used)]
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<meta\b[^>]*>").expect("valid regex"));

/// `charset=` inside a meta tag: either the attribute itself or the tail of
/// an http-equiv `content` value.
#[allow(clippy::expect_used)]
static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bcharset\s*=\s*["']?\s*([^"'\s;/>]+)"#).expect("valid regex")
});

/// Decode `bytes`, preferring `transport_hint` (a `Content-Type` value or
/// bare charset name) over charsets declared in the markup.
///
/// Never fails: unknown charsets decode as UTF-8 and an empty buffer decodes
/// to an empty string.
pub fn resolve(bytes: &[u8], transport_hint: Option<&str>) -> DecodedPage {
    let declared = transport_hint
        .and_then(charset_from_content_type)
        .or_else(|| detect_meta_charset(bytes));
    let label = normalize_charset(declared.as_deref().unwrap_or(FALLBACK));

    let (text, charset_used) = match Encoding::for_label_no_replacement(label.as_bytes()) {
        Some(encoding) => decode_with(bytes, encoding, &label),
        None => {
            tracing::debug!(charset = %label, "Unsupported charset, falling back to utf-8");
            decode_with(bytes, UTF_8, FALLBACK)
        }
    };

    let broken = count_replacement_chars(&text);
    if broken > BROKEN_CHAR_THRESHOLD && charset_used != KOREAN {
        let (korean, _) = EUC_KR.decode_without_bom_handling(bytes);
        let korean_broken = count_replacement_chars(&korean);
        tracing::debug!(
            charset = %charset_used,
            broken,
            korean_broken,
            "Too many broken characters, retried as euc-kr"
        );
        if korean_broken < broken {
            return DecodedPage {
                text: korean.into_owned(),
                charset_used: KOREAN.to_string(),
            };
        }
    }

    DecodedPage { text, charset_used }
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding, label: &str) -> (String, String) {
    let (text, actual, _had_errors) = encoding.decode(bytes);
    // A byte-order mark overrides the declared label.
    let charset_used = if actual == encoding {
        label.to_string()
    } else {
        actual.name().to_lowercase()
    };
    (text.into_owned(), charset_used)
}

/// Extract the charset parameter from a `Content-Type`-like value.
///
/// A bare charset name (no `charset=`) is accepted as-is.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    let raw = match CONTENT_TYPE_CHARSET_RE.captures(content_type) {
        Some(caps) => caps.get(1)?.as_str(),
        None if !content_type.contains(['/', ';', '=']) => content_type,
        None => return None,
    };
    let cleaned = strip_quotes(raw);
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Scan the raw bytes for a charset declared in a `<meta>` tag.
///
/// Bytes are read as Latin-1 so every byte maps to one char and the scan
/// works whatever the real encoding is. The first declaring tag wins.
pub fn detect_meta_charset(bytes: &[u8]) -> Option<String> {
    let text: Cow<'_, str> = encoding_rs::mem::decode_latin1(bytes);
    META_TAG_RE.find_iter(&text).find_map(|tag| {
        META_CHARSET_RE
            .captures(tag.as_str())
            .and_then(|caps| caps.get(1))
            .map(|m| strip_quotes(m.as_str()).to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Map common charset aliases onto canonical names.
///
/// Matching ignores case, surrounding quotes and `_`/`-` differences.
/// Unknown names are returned lowercased.
pub fn normalize_charset(name: &str) -> String {
    let cleaned = strip_quotes(name).to_lowercase();
    let key: String = cleaned.chars().filter(|c| *c != '_' && *c != '-').collect();

    let canonical = match key.as_str() {
        "euckr" | "cp949" | "windows949" | "uhc" | "ksc5601" | "ksc56011987"
        | "ksksc56011987" => KOREAN,
        "eucjp" => "euc-jp",
        "shiftjis" | "sjis" | "xsjis" | "mskanji" | "windows31j" => "shift_jis",
        "gb2312" => "gb2312",
        "gbk" | "cp936" => "gbk",
        "big5" => "big5",
        "iso88591" | "latin1" | "l1" => "iso-8859-1",
        "utf8" => "utf-8",
        "utf16" => "utf-16",
        "utf16le" => "utf-16le",
        "utf16be" => "utf-16be",
        _ => return cleaned,
    };
    canonical.to_string()
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

pub fn count_replacement_chars(text: &str) -> usize {
    text.chars().filter(|&c| c == char::REPLACEMENT_CHARACTER).count()
}
