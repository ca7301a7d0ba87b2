//! Text, URL, and date helpers used by every stage of the pipeline.
//!
//! This module provides pure helper functions:
//! - Text normalization for markup-laden feed and meta text
//! - Redirect-wrapper unwrapping for alert links
//! - Word-preserving truncation for excerpts
//! - Date reformatting for display
//! - File system validation for output directories
//!
//! None of the text or URL helpers can fail: malformed input is passed
//! through (or reduced to an empty string) instead of raising an error.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

/// Timestamp format used by the alert feed's `published` element.
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format of [`PostRecord::date`](crate::models::PostRecord::date).
pub const DISPLAY_DATE_FORMAT: &str = "%d %b %Y";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());

static CHAR_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*)(;?)").unwrap());

/// Named references browsers accept without the closing `;`.
const LEGACY_ENTITIES: &[&str] = &[
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren",
    "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34",
    "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr", "micro",
    "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm", "oslash",
    "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy", "sup1",
    "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml", "uuml",
    "yacute", "yen", "yuml",
];

/// Windows-1252 reading of numeric references in `0x80..=0x9F`.
const CP1252_C1: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{8D}', '\u{017D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{9D}', '\u{017E}', '\u{0178}',
];

/// Normalize feed or page text for display.
///
/// Removes markup tags, decodes HTML entities (`&quot;` becomes `"`), and
/// collapses every run of whitespace, including newlines and decoded
/// non-breaking spaces, into a single space.
///
/// # Arguments
///
/// * `text` - The text to clean; `None` is treated as empty
///
/// # Returns
///
/// Plain, trimmed text. Never fails.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text(Some("<b>PSOE</b> &amp; allies\n")), "PSOE & allies");
/// assert_eq!(clean_text(None), "");
/// ```
pub fn clean_text(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return String::new();
    };
    let stripped = TAG_RE.replace_all(text, "");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode named and numeric HTML character references.
///
/// Decoding is done by `html_escape`. References it would leave alone or
/// read differently from a browser are rewritten first:
/// - legacy names missing their `;` (`&amp co`, `Caf&eacute`)
/// - numeric references missing their `;`
/// - `&#128;`..`&#159;`, which mean Windows-1252 characters (`&#150;` is `–`)
/// - `&#0;`, surrogates, and out-of-range numbers, which become U+FFFD
///
/// Unknown named references are left untouched.
pub fn decode_entities(text: &str) -> String {
    let canonical = CHAR_REF_RE.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let terminated = !caps[2].is_empty();
        match body.strip_prefix('#') {
            Some(number) => {
                let code = match number.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16),
                    None => number.parse::<u32>(),
                };
                match code {
                    Ok(code @ 0x80..=0x9F) => CP1252_C1[(code - 0x80) as usize].to_string(),
                    Ok(code) if code != 0 && char::from_u32(code).is_some() => {
                        format!("&#{number};")
                    }
                    _ => char::REPLACEMENT_CHARACTER.to_string(),
                }
            }
            None if terminated => caps[0].to_string(),
            None => match LEGACY_ENTITIES
                .iter()
                .filter(|name| body.starts_with(**name))
                .max_by_key(|name| name.len())
            {
                Some(name) => format!("&{name};{}", &body[name.len()..]),
                None => caps[0].to_string(),
            },
        }
    });
    html_escape::decode_html_entities(&canonical).into_owned()
}

/// Unwrap an alert-service redirect link.
///
/// Alert feeds link to a redirector such as
/// `https://www.google.com/url?rct=j&url=https://news.example/a&ct=ga`.
/// The destination is carried, percent-encoded, in the `url` query parameter.
///
/// # Arguments
///
/// * `link` - The entry link as found in the feed
///
/// # Returns
///
/// The decoded destination when a non-empty `url` parameter exists, otherwise
/// `link` unchanged. Unparseable links are returned unchanged as well.
pub fn resolve_redirect_url(link: &str) -> String {
    match Url::parse(link) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, value)| key == "url" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
            .unwrap_or_else(|| link.to_string()),
        Err(e) => {
            debug!(%link, error = %e, "Link is not an absolute URL; keeping as-is");
            link.to_string()
        }
    }
}

/// Cut text to at most `length` characters without splitting a word.
///
/// Text at or under the limit is returned unchanged. Longer text is cut at
/// `length` characters; when the cut does not end on a space it backs up to
/// the last space inside the cut. `suffix` is appended to anything that was
/// cut.
///
/// A cut that contains no space at all keeps nothing, so the result is the
/// bare suffix. Callers rely on this exact behavior; do not "fix" it.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(smart_truncate("The quick brown fox", 12, "..."), "The quick...");
/// assert_eq!(smart_truncate("Supercalifragilistic", 5, "..."), "...");
/// ```
pub fn smart_truncate(content: &str, length: usize, suffix: &str) -> String {
    if content.chars().count() <= length {
        return content.to_string();
    }

    let cut: String = content.chars().take(length).collect();
    let kept = if cut.ends_with(' ') {
        cut.as_str()
    } else {
        match cut.rfind(' ') {
            Some(idx) => &cut[..idx],
            None => "",
        }
    };
    format!("{kept}{suffix}")
}

/// Reformat a feed timestamp for display.
///
/// `2024-01-07T10:30:00Z` becomes `07 Jan 2024`. Text that does not match
/// [`SOURCE_DATE_FORMAT`] is returned unchanged.
pub fn format_date(published: &str) -> String {
    match NaiveDateTime::parse_from_str(published, SOURCE_DATE_FORMAT) {
        Ok(dt) => dt.format(DISPLAY_DATE_FORMAT).to_string(),
        Err(_) => published.to_string(),
    }
}

/// Create `path` if needed and confirm files can be written into it.
///
/// Called before any work starts so a bad output path fails the run
/// immediately instead of after the pipeline has finished.
///
/// # Errors
///
/// Any I/O error from creating the directory or writing the check file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    let dir = Path::new(path);
    fs::create_dir_all(dir).await?;
    let check_file = dir.join(".alert_digest_write_check");
    fs::write(&check_file, b"").await?;
    if let Err(e) = fs::remove_file(&check_file).await {
        debug!(error = %e, "Could not remove write check file");
    }
    info!("Output directory is writable");
    Ok(())
}
