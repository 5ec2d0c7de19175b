use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::prelude::*;
use crate::types::UserId;

lazy_static!(
    static ref URL_REGEX: Regex = Regex::new(r"^https?://(?:www\.)?.+").unwrap();
);

const UNKNOWN_TITLE: &str = "Unknown";

/// A resolved, playable track.
///
/// Values are moved between the queue and the loop snapshot by cloning, never
/// by sharing, so editing one collection can never leak into the other.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    /// Identifier the audio sink streams from.
    #[serde(alias = "url")]
    pub locator: String,
    #[serde(default = "unknown_title", deserialize_with = "title_or_unknown")]
    pub title: String,
    #[serde(alias = "duration", default, deserialize_with = "lenient_seconds")]
    pub duration_seconds: u64,
    #[serde(alias = "thumbnail", default)]
    pub thumbnail_url: Option<String>,
    #[serde(alias = "requester_id", default, deserialize_with = "deserialize_option_number_from_string")]
    pub requester_id: Option<UserId>,
}

impl TrackRef {
    pub fn new(locator: impl ToString, title: impl ToString) -> Self {
        Self {
            locator: locator.to_string(),
            title: title.to_string(),
            duration_seconds: 0,
            thumbnail_url: None,
            requester_id: None,
        }
    }

    pub fn duration(mut self, seconds: u64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn thumbnail(mut self, url: impl ToString) -> Self {
        self.thumbnail_url = Some(url.to_string());
        self
    }

    /// Sets the user that requested the track.
    pub fn requester(mut self, requester: UserId) -> Self {
        self.requester_id = Some(requester);
        self
    }
}

fn unknown_title() -> String {
    UNKNOWN_TITLE.to_string()
}

fn title_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_title))
}

// Older snapshots carry null, fractional or stringly-typed durations.
fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(u64),
        Fraction(f64),
        Text(String),
    }

    fn round(secs: f64) -> u64 {
        if secs.is_finite() && secs > 0.0 { secs.round() as u64 } else { 0 }
    }

    Ok(match Option::<Seconds>::deserialize(deserializer)? {
        Some(Seconds::Whole(secs)) => secs,
        Some(Seconds::Fraction(secs)) => round(secs),
        Some(Seconds::Text(text)) => text.trim().parse::<f64>().map(round).unwrap_or(0),
        None => 0,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSearch {
    Youtube(String),
    Url(String)
}

impl TrackSearch {
    /// Urls are passed through untouched, anything else becomes a youtube search.
    pub fn auto(query: impl ToString) -> Self {
        let query = query.to_string();

        if URL_REGEX.is_match(&query) {
            Self::Url(query)
        } else {
            Self::Youtube(query)
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl std::fmt::Display for TrackSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Youtube(query) => write!(f, "ytsearch:{}", query),
            Self::Url(url) => write!(f, "{}", url)
        }
    }
}
