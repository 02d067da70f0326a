//! Shared types used across the reelharvest crates.
//!
//! These are plain values: a proxy endpoint, the normalized record produced by
//! extraction, and the tagged result of scraping one URL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caption/hashtags/date/thumbnail marker for records built from a profile page.
pub const PROFILE_SENTINEL: &str = "PROFILE";

/// Written into every profile field when enrichment was not attempted.
pub const SKIPPED_SENTINEL: &str = "Profile scraping skipped";

/// Bio value when enrichment ran but found no bio text.
pub const EMPTY_BIO_SENTINEL: &str = "Bio is empty";

/// Username used when the author handle could not be resolved.
pub const UNKNOWN_USERNAME: &str = "unknown";

/// Separator for multi-valued fields in the flat output.
pub const LIST_SEPARATOR: &str = ";";

/// A forward proxy with credentials.
///
/// Two endpoints are the same proxy when their [`key`](Self::key) matches;
/// credentials are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ProxyEndpoint {
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Identity key, `address:port`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Proxy server URL without credentials, as passed to the browser.
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Bio, contact and social-link fields gathered from a profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub bio: String,
    pub email: String,
    pub instagram_link: String,
    pub youtube_link: String,
    pub twitter_link: String,
    pub other_links: Vec<String>,
}

impl ProfileData {
    /// Profile fields for a record whose enrichment was deliberately skipped.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            bio: SKIPPED_SENTINEL.to_string(),
            email: SKIPPED_SENTINEL.to_string(),
            instagram_link: SKIPPED_SENTINEL.to_string(),
            youtube_link: SKIPPED_SENTINEL.to_string(),
            twitter_link: SKIPPED_SENTINEL.to_string(),
            other_links: vec![SKIPPED_SENTINEL.to_string()],
        }
    }
}

/// Normalized video or profile record.
///
/// Numeric fields default to 0 and text fields to the empty string when the
/// page did not expose a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub source_url: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub username: String,
    pub upload_timestamp_raw: String,
    pub thumbnail_url: String,
    pub bio: String,
    pub email: String,
    pub instagram_link: String,
    pub youtube_link: String,
    pub twitter_link: String,
    pub other_links: Vec<String>,
}

impl Record {
    /// Column order of the flat output.
    pub const COLUMNS: [&'static str; 15] = [
        "video_url",
        "caption",
        "hashtags",
        "likes",
        "comments_count",
        "share_count",
        "username",
        "upload_date",
        "thumbnail_url",
        "bio",
        "email",
        "instagram_link",
        "youtube_link",
        "twitter_link",
        "other_links",
    ];

    /// Build a profile-only record. Video-specific fields carry
    /// [`PROFILE_SENTINEL`] so every row has the same shape.
    #[must_use]
    pub fn profile_only(
        source_url: impl Into<String>,
        username: impl Into<String>,
        profile: ProfileData,
    ) -> Self {
        let mut record = Self {
            source_url: source_url.into(),
            caption: PROFILE_SENTINEL.to_string(),
            hashtags: vec![PROFILE_SENTINEL.to_string()],
            username: username.into(),
            upload_timestamp_raw: PROFILE_SENTINEL.to_string(),
            thumbnail_url: PROFILE_SENTINEL.to_string(),
            ..Self::default()
        };
        record.apply_profile(profile);
        record
    }

    /// Copy profile fields onto the record.
    pub fn apply_profile(&mut self, profile: ProfileData) {
        self.bio = profile.bio;
        self.email = profile.email;
        self.instagram_link = profile.instagram_link;
        self.youtube_link = profile.youtube_link;
        self.twitter_link = profile.twitter_link;
        self.other_links = profile.other_links;
    }

    /// Flatten into one text cell per [`Record::COLUMNS`] entry.
    #[must_use]
    pub fn to_row(&self) -> [String; 15] {
        [
            self.source_url.clone(),
            self.caption.clone(),
            self.hashtags.join(LIST_SEPARATOR),
            self.like_count.to_string(),
            self.comment_count.to_string(),
            self.share_count.to_string(),
            self.username.clone(),
            self.upload_timestamp_raw.clone(),
            self.thumbnail_url.clone(),
            self.bio.clone(),
            self.email.clone(),
            self.instagram_link.clone(),
            self.youtube_link.clone(),
            self.twitter_link.clone(),
            self.other_links.join(LIST_SEPARATOR),
        ]
    }
}

/// Outcome of scraping one URL, including all of its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeResult {
    Success {
        url: String,
        proxy_used: String,
        retry_count: u32,
        record: Record,
    },
    Failure {
        url: String,
        proxy_used: String,
        retry_count: u32,
        error: String,
    },
}

impl ScrapeResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Success { url, .. } | Self::Failure { url, .. } => url,
        }
    }

    #[must_use]
    pub fn proxy_used(&self) -> &str {
        match self {
            Self::Success { proxy_used, .. } | Self::Failure { proxy_used, .. } => proxy_used,
        }
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        match self {
            Self::Success { retry_count, .. } | Self::Failure { retry_count, .. } => *retry_count,
        }
    }

    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Success { record, .. } => Some(record),
            Self::Failure { .. } => None,
        }
    }
}

/// Success and failure counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[ScrapeResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
