//! Ordered selector chains for DOM extraction.
//!
//! Each field is a list of [`FieldRule`]s tried in order; the first rule whose
//! element exists and whose parse function accepts the raw text wins. Adding
//! a fallback is a new table entry, not new control flow.

use crate::error::Result;
use crate::numbers::{has_digits, parse_count};
use reelharvest_browser::BrowserSession;

/// How a rule reads its element.
#[derive(Debug, Clone, Copy)]
pub enum Probe {
    /// Inner text.
    Text,
    /// First non-empty attribute among the listed names.
    Attribute(&'static [&'static str]),
}

/// One candidate selector for one field.
#[derive(Debug, Clone)]
pub struct FieldRule<T: 'static> {
    pub selector: &'static str,
    pub probe: Probe,
    pub parse: fn(&str) -> Option<T>,
}

impl<T: 'static> FieldRule<T> {
    const fn new(selector: &'static str, probe: Probe, parse: fn(&str) -> Option<T>) -> Self {
        Self {
            selector,
            probe,
            parse,
        }
    }
}

/// Accept any non-blank text.
pub fn text_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Accept text that carries a number.
pub fn count_value(raw: &str) -> Option<u64> {
    has_digits(raw).then(|| parse_count(raw))
}

const THUMBNAIL_ATTRS: &[&str] = &["poster", "src"];

pub const CAPTION: &[FieldRule<String>] = &[
    FieldRule::new(r#"[data-e2e="video-desc"]"#, Probe::Text, text_value),
    FieldRule::new(r#"[data-e2e="browse-video-desc"]"#, Probe::Text, text_value),
];

pub const LIKES: &[FieldRule<u64>] = &[
    FieldRule::new(r#"[data-e2e="like-count"]"#, Probe::Text, count_value),
    FieldRule::new(r#"[data-e2e="browse-like-count"]"#, Probe::Text, count_value),
];

pub const COMMENTS: &[FieldRule<u64>] = &[
    FieldRule::new(r#"[data-e2e="comment-count"]"#, Probe::Text, count_value),
    FieldRule::new(r#"[data-e2e="browse-comment-count"]"#, Probe::Text, count_value),
];

pub const SHARES: &[FieldRule<u64>] = &[
    FieldRule::new(r#"[data-e2e="share-count"]"#, Probe::Text, count_value),
    FieldRule::new(r#"[data-e2e="undefined-count"]"#, Probe::Text, count_value),
];

pub const USERNAME: &[FieldRule<String>] = &[
    FieldRule::new(r#"[data-e2e="video-author-uniqueid"]"#, Probe::Text, text_value),
    FieldRule::new(r#"[data-e2e="browse-username"]"#, Probe::Text, text_value),
];

pub const UPLOAD_DATE: &[FieldRule<String>] = &[
    FieldRule::new(r#"[data-e2e="browser-nickname"] + span"#, Probe::Text, text_value),
    FieldRule::new("time", Probe::Text, text_value),
];

pub const THUMBNAIL: &[FieldRule<String>] = &[
    FieldRule::new("video", Probe::Attribute(THUMBNAIL_ATTRS), text_value),
    FieldRule::new(r#"img[alt*="video"]"#, Probe::Attribute(THUMBNAIL_ATTRS), text_value),
];

pub const BIO: &[FieldRule<String>] = &[
    FieldRule::new(r#"[data-e2e="user-bio"]"#, Probe::Text, text_value),
    FieldRule::new(r#"h2[data-e2e="user-subtitle"]"#, Probe::Text, text_value),
    FieldRule::new(r#"[class*="bio"]"#, Probe::Text, text_value),
    FieldRule::new(r#"[class*="description"]"#, Probe::Text, text_value),
];

/// Evaluate `rules` in order and return the first accepted value.
pub async fn first_match<S, T>(session: &S, rules: &[FieldRule<T>]) -> Result<Option<T>>
where
    S: BrowserSession + ?Sized,
    T: 'static,
{
    for rule in rules {
        let raw = match rule.probe {
            Probe::Text => session.query_text(rule.selector).await?,
            Probe::Attribute(names) => session.query_attribute(rule.selector, names).await?,
        };

        if let Some(value) = raw.as_deref().and_then(rule.parse) {
            return Ok(Some(value));
        }
    }
    Ok(None)
}
