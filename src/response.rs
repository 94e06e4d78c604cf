use crate::error::{FeedbackError, Result};
use chrono::{Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref ISO_DATE_REGEX: Regex =
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[T ][0-9:.]*(?:Z|[+-]\d{2}:?\d{2})?)?$").unwrap();
    static ref DMY_DATE_REGEX: Regex = Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap();
}

/// Recommendation rating, always within `0..=10`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub const MIN: i64 = 0;
    pub const MAX: i64 = 10;

    pub fn new(value: i64) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Score(value as u8))
        } else {
            Err(FeedbackError::InvalidScore(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = FeedbackError;

    fn try_from(value: i64) -> Result<Self> {
        Score::new(value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResponseId(String);

impl ResponseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResponseId {
    fn from(value: &str) -> Self {
        ResponseId(value.to_string())
    }
}

impl From<String> for ResponseId {
    fn from(value: String) -> Self {
        ResponseId(value)
    }
}

impl From<u64> for ResponseId {
    fn from(value: u64) -> Self {
        ResponseId(value.to_string())
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One survey submission.
///
/// Fields are private: a `Response` never changes after construction, so
/// every derived view can share the same snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    id: ResponseId,
    location: String,
    score: Score,
    comment: String,
    timestamp: Option<NaiveDate>,
}

impl Response {
    /// Builds a response, transliterating the comment to plain ASCII.
    pub fn new(
        id: impl Into<ResponseId>,
        location: impl Into<String>,
        score: Score,
        comment: &str,
        timestamp: Option<NaiveDate>,
    ) -> Self {
        Response {
            id: id.into(),
            location: location.into(),
            score,
            comment: normalize_comment(comment),
            timestamp,
        }
    }

    pub fn id(&self) -> &ResponseId {
        &self.id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn has_comment(&self) -> bool {
        !self.comment.is_empty()
    }

    /// `None` when the record arrived without a usable date.
    pub fn timestamp(&self) -> Option<NaiveDate> {
        self.timestamp
    }
}

/// A record exactly as the backend ships it, before validation.
///
/// Accepts both the backend's field names (`local`, `nota`, `observacao`,
/// `data`) and the crate's own (`location`, `score`, `comment`, `timestamp`).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawResponse {
    #[serde(default, alias = "_id")]
    pub id: Option<serde_json::Value>,
    #[serde(default, alias = "local")]
    pub location: Option<String>,
    #[serde(default, alias = "nota")]
    pub score: Option<serde_json::Value>,
    #[serde(default, alias = "observacao")]
    pub comment: Option<String>,
    #[serde(default, alias = "data", alias = "date")]
    pub timestamp: Option<String>,
}

impl RawResponse {
    /// Validates the record. `fallback_id` names records that arrived
    /// without an id.
    ///
    /// A missing or out-of-range score rejects the record. An unreadable
    /// date does not: the response is kept with no timestamp so that
    /// time-based views can report it as skipped.
    pub fn into_response(self, fallback_id: impl FnOnce() -> String) -> Result<Response> {
        let score = match &self.score {
            Some(value) => score_from_value(value)?,
            None => return Err(FeedbackError::UnreadableScore("missing".to_string())),
        };

        let id = match self.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => ResponseId(s),
            Some(serde_json::Value::Number(n)) => ResponseId(n.to_string()),
            _ => ResponseId(fallback_id()),
        };

        let timestamp = match self.timestamp.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_date(raw) {
                Ok(date) => Some(date),
                Err(_) => {
                    log::warn!("response {}: unreadable date {:?}", id, raw);
                    None
                }
            },
        };

        Ok(Response::new(
            id,
            self.location.unwrap_or_default(),
            score,
            self.comment.as_deref().unwrap_or(""),
            timestamp,
        ))
    }
}

fn score_from_value(value: &serde_json::Value) -> Result<Score> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Score::new(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Score::new(f as i64),
                    _ => Err(FeedbackError::UnreadableScore(n.to_string())),
                }
            }
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| FeedbackError::UnreadableScore(s.clone()))
            .and_then(Score::new),
        other => Err(FeedbackError::UnreadableScore(other.to_string())),
    }
}

/// Removes diacritics from a comment. Every other character, emoji and
/// non-Latin scripts included, is kept as written.
pub fn normalize_comment(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    text.nfd().filter(|c| !COMBINING_DIACRITICS.contains(c)).nfc().collect()
}

const COMBINING_DIACRITICS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Parses `YYYY-MM-DD`, an ISO-8601 date-time (date part kept) or
/// `DD/MM/YYYY`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    let invalid = || FeedbackError::InvalidDate(input.to_string());

    let (year, month, day) = if let Some(caps) = ISO_DATE_REGEX.captures(input) {
        (caps[1].parse::<i32>(), caps[2].parse::<u32>(), caps[3].parse::<u32>())
    } else if let Some(caps) = DMY_DATE_REGEX.captures(input) {
        (caps[3].parse::<i32>(), caps[2].parse::<u32>(), caps[1].parse::<u32>())
    } else {
        return Err(invalid());
    };

    match (year, month, day) {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Earliest and latest valid timestamps in a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateSpan {
    /// Whole days from `earliest` to `reference`, never negative.
    pub fn days_until(&self, reference: NaiveDate) -> u64 {
        (reference - self.earliest).num_days().max(0) as u64
    }

    /// The date `offset` days after `earliest`; a range slider position.
    pub fn date_at_offset(&self, offset: u64) -> Option<NaiveDate> {
        self.earliest.checked_add_days(Days::new(offset))
    }
}

/// Immutable snapshot of the responses fetched from the backend.
///
/// Cloning is cheap and clones share the same records, so several views
/// may filter one snapshot independently, on any thread.
#[derive(Clone, Debug, Default)]
pub struct ResponseStore {
    responses: Arc<[Response]>,
}

impl ResponseStore {
    pub fn new(responses: Vec<Response>) -> Self {
        ResponseStore {
            responses: responses.into(),
        }
    }

    /// Takes a fresh snapshot from whatever fetches the records.
    pub fn fetch<F>(provider: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<Response>>,
    {
        let responses = provider()?;
        log::debug!("fetched {} responses", responses.len());
        Ok(ResponseStore::new(responses))
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Distinct locations, alphabetical ignoring case. An unset location
    /// shows up as the empty string.
    pub fn locations(&self) -> Vec<String> {
        let distinct: BTreeSet<&str> = self.responses.iter().map(Response::location).collect();
        let mut locations: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        locations.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        locations
    }

    /// The location catalogue narrowed by a case-insensitive search term.
    pub fn search_locations(&self, term: &str) -> Vec<String> {
        let needle = term.to_lowercase();
        self.locations()
            .into_iter()
            .filter(|location| location.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn date_span(&self) -> Option<DateSpan> {
        let mut dates = self.responses.iter().filter_map(Response::timestamp);
        let first = dates.next()?;
        let (earliest, latest) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateSpan { earliest, latest })
    }
}

impl Deref for ResponseStore {
    type Target = [Response];

    fn deref(&self) -> &[Response] {
        &self.responses
    }
}

impl From<Vec<Response>> for ResponseStore {
    fn from(responses: Vec<Response>) -> Self {
        ResponseStore::new(responses)
    }
}
