//! Record extraction from a loaded page.
//!
//! Item pages are read from the embedded rehydration payload when it is
//! present and well-formed, and from the rendered DOM otherwise. Profile
//! enrichment runs afterwards on the same session and can never fail the
//! item.

use crate::error::{Result, ScanError};
use crate::numbers::parse_count;
use crate::pacing::pause;
use crate::profile::read_profile;
use crate::selectors::{
    first_match, CAPTION, COMMENTS, LIKES, SHARES, THUMBNAIL, UPLOAD_DATE, USERNAME,
};
use once_cell::sync::Lazy;
use reelharvest_browser::{BrowserSession, WaitStrategy};
use reelharvest_core::{
    AppConfig, DelayRange, PlatformConfig, ProfileData, Record, UNKNOWN_USERNAME,
};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Reads and parses the rehydration script; `null` when absent or unparsable.
pub const REHYDRATION_SCRIPT: &str = r"(() => {
    const script = document.querySelector('#__UNIVERSAL_DATA_FOR_REHYDRATION__');
    if (!script) return null;
    try { return JSON.parse(script.textContent); } catch (e) { return null; }
})()";

/// Location of the item inside the rehydration payload.
pub const ITEM_POINTER: &str = "/__DEFAULT_SCOPE__/webapp.video-detail/itemInfo/itemStruct";

static HASHTAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\w+").expect("hashtag regex is hardcoded and valid"));

#[derive(Debug, Deserialize)]
struct ItemStruct {
    #[serde(default)]
    desc: String,
    #[serde(default)]
    stats: ItemStats,
    #[serde(default)]
    author: Author,
    #[serde(default, rename = "createTime")]
    create_time: Value,
    #[serde(default)]
    video: VideoInfo,
    #[serde(default)]
    challenges: Vec<Challenge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemStats {
    #[serde(default, deserialize_with = "lenient_count")]
    digg_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    comment_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    share_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Author {
    #[serde(default)]
    unique_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    cover: String,
}

#[derive(Debug, Deserialize)]
struct Challenge {
    #[serde(default)]
    title: String,
}

/// Counters are usually numbers, occasionally numeric strings.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0).round() as u64))
            .unwrap_or(0),
        Value::String(s) => parse_count(&s),
        _ => 0,
    })
}

fn timestamp_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn username_or_unknown(username: &str) -> String {
    if username.trim().is_empty() {
        UNKNOWN_USERNAME.to_string()
    } else {
        username.trim().to_string()
    }
}

/// Item pages carry `/video/` in their path; everything else is a profile.
#[must_use]
pub fn is_item_url(url: &str) -> bool {
    url.contains("/video/")
}

/// Handle after the last `@` in a profile URL, or `unknown`.
#[must_use]
pub fn username_from_url(url: &str) -> String {
    let Some((_, tail)) = url.rsplit_once('@') else {
        return UNKNOWN_USERNAME.to_string();
    };
    let handle = tail.split(['/', '?', '#']).next().unwrap_or_default();
    username_or_unknown(handle)
}

/// `#`-prefixed tokens in caption order.
#[must_use]
pub fn hashtags_from_caption(caption: &str) -> Vec<String> {
    HASHTAG_PATTERN
        .find_iter(caption)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Build a record from a rehydration payload.
///
/// Returns `None` when the payload does not have the expected item shape.
#[must_use]
pub fn record_from_payload(url: &str, payload: &Value) -> Option<Record> {
    let item = payload.pointer(ITEM_POINTER)?;
    let item: ItemStruct = match serde_json::from_value(item.clone()) {
        Ok(item) => item,
        Err(e) => {
            debug!(url = %url, error = %e, "malformed item payload");
            return None;
        }
    };

    Some(Record {
        source_url: url.to_string(),
        caption: item.desc,
        hashtags: item
            .challenges
            .into_iter()
            .filter(|c| !c.title.is_empty())
            .map(|c| format!("#{}", c.title))
            .collect(),
        like_count: item.stats.digg_count,
        comment_count: item.stats.comment_count,
        share_count: item.stats.share_count,
        username: username_or_unknown(&item.author.unique_id),
        upload_timestamp_raw: timestamp_text(&item.create_time),
        thumbnail_url: item.video.cover,
        ..Record::default()
    })
}

/// Turns loaded pages into records.
#[derive(Debug, Clone)]
pub struct Extractor {
    platform: PlatformConfig,
    skip_profile_enrichment: bool,
    item_delay: DelayRange,
    profile_delay: DelayRange,
    profile_timeout: Duration,
}

impl Extractor {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            platform: config.platform.clone(),
            skip_profile_enrichment: config.scraping.skip_profile_enrichment,
            item_delay: config.scraping.item_delay,
            profile_delay: config.scraping.profile_delay,
            profile_timeout: config.scraping.profile_timeout(),
        }
    }

    /// Override the enrichment flag from the configuration.
    #[must_use]
    pub fn with_skip_profile_enrichment(mut self, skip: bool) -> Self {
        self.skip_profile_enrichment = skip;
        self
    }

    /// Extract a full record from the item page the session is on.
    pub async fn extract_item<S>(&self, session: &S, url: &str) -> Result<Record>
    where
        S: BrowserSession + ?Sized,
    {
        pause(session, self.item_delay).await?;

        let payload = session.evaluate_script(REHYDRATION_SCRIPT).await?;
        let structured = if payload.is_null() {
            None
        } else {
            record_from_payload(url, &payload)
        };

        let mut record = match structured {
            Some(record) => {
                debug!(url = %url, "extracted from structured payload");
                record
            }
            None => {
                debug!(url = %url, "falling back to DOM extraction");
                dom_record(session, url).await?
            }
        };

        let profile = self.enrich(session, &record.username).await;
        record.apply_profile(profile);
        Ok(record)
    }

    /// Extract a profile-only record for a profile URL.
    pub async fn extract_profile_only<S>(&self, session: &S, url: &str) -> Result<Record>
    where
        S: BrowserSession + ?Sized,
    {
        let username = username_from_url(url);

        session
            .navigate(url, WaitStrategy::ContentLoaded, self.profile_timeout)
            .await
            .map_err(|e| ScanError::extraction(url, format!("profile page: {e}")))?;
        pause(session, self.profile_delay).await?;

        let profile = read_profile(session).await;
        Ok(Record::profile_only(url, username, profile))
    }

    async fn enrich<S>(&self, session: &S, username: &str) -> ProfileData
    where
        S: BrowserSession + ?Sized,
    {
        if self.skip_profile_enrichment {
            return ProfileData::skipped();
        }
        if username.is_empty() || username == UNKNOWN_USERNAME {
            return ProfileData::default();
        }

        let profile_url = self.platform.profile_url(username);
        if let Err(e) = session
            .navigate(&profile_url, WaitStrategy::ContentLoaded, self.profile_timeout)
            .await
        {
            debug!(url = %profile_url, error = %e, "profile enrichment skipped");
            return ProfileData::default();
        }
        if let Err(e) = pause(session, self.profile_delay).await {
            debug!(error = %e, "profile pause failed");
        }

        read_profile(session).await
    }
}

async fn dom_record<S>(session: &S, url: &str) -> Result<Record>
where
    S: BrowserSession + ?Sized,
{
    let caption = first_match(session, CAPTION).await?;
    let likes = first_match(session, LIKES).await?;
    let comments = first_match(session, COMMENTS).await?;
    let shares = first_match(session, SHARES).await?;
    let username = first_match(session, USERNAME).await?;
    let upload = first_match(session, UPLOAD_DATE).await?;
    let thumbnail = first_match(session, THUMBNAIL).await?;

    let found_anything = caption.is_some()
        || likes.is_some()
        || comments.is_some()
        || shares.is_some()
        || username.is_some()
        || thumbnail.is_some();
    if !found_anything {
        return Err(ScanError::extraction(
            url,
            "no structured payload and no item markup on page",
        ));
    }

    let caption = caption.unwrap_or_default();
    Ok(Record {
        source_url: url.to_string(),
        hashtags: hashtags_from_caption(&caption),
        caption,
        like_count: likes.unwrap_or(0),
        comment_count: comments.unwrap_or(0),
        share_count: shares.unwrap_or(0),
        username: username_or_unknown(&username.unwrap_or_default()),
        upload_timestamp_raw: upload.unwrap_or_default(),
        thumbnail_url: thumbnail.unwrap_or_default(),
        ..Record::default()
    })
}
