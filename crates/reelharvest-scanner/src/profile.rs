//! Profile enrichment: bio text, contact email and social links.
//!
//! Reading a profile never fails. Whatever could not be read stays at its
//! default and the caller keeps the item record it already has.

use crate::selectors::{first_match, BIO};
use once_cell::sync::Lazy;
use reelharvest_browser::BrowserSession;
use reelharvest_core::{ProfileData, EMPTY_BIO_SENTINEL};
use regex::Regex;
use tracing::debug;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("email regex is hardcoded and valid"));

static INSTAGRAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:insta|instagram|ig)\b[\s:]+@?([a-zA-Z0-9._]+)",
        r"(?i)@([a-zA-Z0-9._]+)\s+on\s+(?:insta|instagram)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("instagram regex is hardcoded and valid"))
    .collect()
});

static TWITCH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:twitch|ttv)\b[\s:]+@?([a-zA-Z0-9._]+)",
        r"(?i)twitch\.tv/([a-zA-Z0-9._]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("twitch regex is hardcoded and valid"))
    .collect()
});

/// Domains that land in the catch-all bucket.
pub const OTHER_SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "linkedin.com",
    "snapchat.com",
    "twitch.tv",
    "discord.gg",
    "reddit.com",
    "pinterest.com",
    "tumblr.com",
    "github.com",
];

/// Bucket an outbound link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Instagram,
    YouTube,
    Twitter,
    Other,
}

/// Classify a lowercase href by domain substring.
#[must_use]
pub fn classify_link(href: &str) -> Option<LinkKind> {
    if href.contains("instagram.com") {
        Some(LinkKind::Instagram)
    } else if href.contains("youtube.com") || href.contains("youtu.be") {
        Some(LinkKind::YouTube)
    } else if href.contains("twitter.com") || href.contains("x.com") {
        Some(LinkKind::Twitter)
    } else if OTHER_SOCIAL_DOMAINS.iter().any(|d| href.contains(d)) {
        Some(LinkKind::Other)
    } else {
        None
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fill bio-derived fields. Returns links synthesized from handle mentions
/// that belong in the catch-all bucket.
pub fn apply_bio(profile: &mut ProfileData, bio: &str) -> Vec<String> {
    if let Some(email) = EMAIL_PATTERN.find(bio) {
        profile.email = email.as_str().to_string();
    }

    if let Some(handle) = first_capture(&INSTAGRAM_PATTERNS, bio) {
        profile.instagram_link = format!("https://instagram.com/{handle}");
    }

    first_capture(&TWITCH_PATTERNS, bio)
        .map(|handle| vec![format!("https://twitch.tv/{handle}")])
        .unwrap_or_default()
}

/// Fill link fields from the page's anchors, then append `extra_other`.
///
/// The first anchor of each dedicated kind wins, and an Instagram anchor
/// replaces a link guessed from the bio.
pub fn apply_links(profile: &mut ProfileData, hrefs: &[String], extra_other: Vec<String>) {
    let (mut instagram, mut youtube, mut twitter) = (None, None, None);

    for href in hrefs {
        let href = href.to_lowercase();
        match classify_link(&href) {
            Some(LinkKind::Instagram) => {
                instagram.get_or_insert(href);
            }
            Some(LinkKind::YouTube) => {
                youtube.get_or_insert(href);
            }
            Some(LinkKind::Twitter) => {
                twitter.get_or_insert(href);
            }
            Some(LinkKind::Other) => push_unique(&mut profile.other_links, href),
            None => {}
        }
    }

    if let Some(link) = instagram {
        profile.instagram_link = link;
    }
    if let Some(link) = youtube {
        profile.youtube_link = link;
    }
    if let Some(link) = twitter {
        profile.twitter_link = link;
    }
    for link in extra_other {
        push_unique(&mut profile.other_links, link);
    }
}

fn push_unique(links: &mut Vec<String>, link: String) {
    if !links.contains(&link) {
        links.push(link);
    }
}

/// Read the profile page the session is currently on.
pub async fn read_profile<S>(session: &S) -> ProfileData
where
    S: BrowserSession + ?Sized,
{
    let mut profile = ProfileData::default();

    let bio = match first_match(session, BIO).await {
        Ok(bio) => bio,
        Err(e) => {
            debug!(error = %e, "bio lookup failed");
            None
        }
    };

    let bio_links = match bio {
        Some(bio) => {
            let links = apply_bio(&mut profile, &bio);
            profile.bio = bio;
            links
        }
        None => {
            profile.bio = EMPTY_BIO_SENTINEL.to_string();
            Vec::new()
        }
    };

    match session.query_all_links().await {
        Ok(hrefs) => apply_links(&mut profile, &hrefs, bio_links),
        Err(e) => {
            debug!(error = %e, "link lookup failed");
            apply_links(&mut profile, &[], bio_links);
        }
    }

    profile
}
