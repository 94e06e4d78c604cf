use crate::error::{FeedbackError, Result};
use crate::response::Response;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain accepted by the lower score bound picker.
pub const SCORE_MIN_DOMAIN: (i32, i32) = (-1, 10);
/// Domain accepted by the upper score bound picker.
pub const SCORE_MAX_DOMAIN: (i32, i32) = (0, 11);

/// Declarative query over a response collection.
///
/// Every populated field is a predicate; a response passes when all of them
/// hold. Bounds are inclusive and `None` leaves that side open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Case-insensitive substring of the location. Empty matches everything.
    pub search_text: String,
    /// Exact location; `Some("")` selects responses with no location.
    pub location: Option<String>,
    pub score_min: Option<i32>,
    pub score_max: Option<i32>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub require_comment: bool,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn min_score(mut self, min: i32) -> Self {
        self.score_min = Some(min);
        self
    }

    pub fn max_score(mut self, max: i32) -> Self {
        self.score_max = Some(max);
        self
    }

    pub fn from_date(mut self, start: NaiveDate) -> Self {
        self.date_start = Some(start);
        self
    }

    pub fn until_date(mut self, end: NaiveDate) -> Self {
        self.date_end = Some(end);
        self
    }

    pub fn between(self, start: NaiveDate, end: NaiveDate) -> Self {
        self.from_date(start).until_date(end)
    }

    pub fn with_comment(mut self) -> Self {
        self.require_comment = true;
        self
    }

    /// Lower bound picker. Values outside `-1..=10` are rejected and the
    /// previous bound stays in place.
    pub fn set_score_min(&mut self, value: i32) -> Result<()> {
        check_domain("minimum", value, SCORE_MIN_DOMAIN)?;
        self.score_min = Some(value);
        Ok(())
    }

    /// Upper bound picker. Values outside `0..=11` are rejected and the
    /// previous bound stays in place.
    pub fn set_score_max(&mut self, value: i32) -> Result<()> {
        check_domain("maximum", value, SCORE_MAX_DOMAIN)?;
        self.score_max = Some(value);
        Ok(())
    }

    pub fn clear_score_bounds(&mut self) {
        self.score_min = None;
        self.score_max = None;
    }

    /// Configuration problems that make the filter degrade.
    pub fn validate(&self) -> Vec<FilterIssue> {
        self.compile().1
    }

    pub fn matches(&self, response: &Response) -> bool {
        self.compile().0.matches(response)
    }

    fn compile(&self) -> (CompiledFilter, Vec<FilterIssue>) {
        let mut issues = Vec::new();

        let score_min = self.score_min.filter(|&min| {
            let ok = in_domain(min, SCORE_MIN_DOMAIN);
            if !ok {
                issues.push(FilterIssue::ScoreMinOutOfDomain { value: min });
            }
            ok
        });
        let score_max = self.score_max.filter(|&max| {
            let ok = in_domain(max, SCORE_MAX_DOMAIN);
            if !ok {
                issues.push(FilterIssue::ScoreMaxOutOfDomain { value: max });
            }
            ok
        });

        let mut matches_nothing = false;
        if let (Some(min), Some(max)) = (score_min, score_max) {
            if min > max {
                issues.push(FilterIssue::InvertedScoreRange { min, max });
                matches_nothing = true;
            }
        }
        if let (Some(start), Some(end)) = (self.date_start, self.date_end) {
            if start > end {
                issues.push(FilterIssue::InvertedDateRange { start, end });
                matches_nothing = true;
            }
        }

        let compiled = CompiledFilter {
            needle: self.search_text.to_lowercase(),
            location: self.location.clone(),
            score_min,
            score_max,
            date_start: self.date_start,
            date_end: self.date_end,
            require_comment: self.require_comment,
            matches_nothing,
        };
        (compiled, issues)
    }
}

fn in_domain(value: i32, (min, max): (i32, i32)) -> bool {
    (min..=max).contains(&value)
}

fn check_domain(bound: &'static str, value: i32, (min, max): (i32, i32)) -> Result<()> {
    if in_domain(value, (min, max)) {
        Ok(())
    } else {
        Err(FeedbackError::BoundOutOfRange {
            bound,
            value,
            min,
            max,
        })
    }
}

/// Why a filter returned less (or more) than its fields suggest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterIssue {
    /// `date_start` is after `date_end`; nothing passes.
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    /// `score_min` is above `score_max`; nothing passes.
    InvertedScoreRange { min: i32, max: i32 },
    /// Ignored: the lower bound is left open.
    ScoreMinOutOfDomain { value: i32 },
    /// Ignored: the upper bound is left open.
    ScoreMaxOutOfDomain { value: i32 },
}

impl fmt::Display for FilterIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterIssue::InvertedDateRange { start, end } => {
                write!(f, "date range starts {} after it ends {}", start, end)
            }
            FilterIssue::InvertedScoreRange { min, max } => {
                write!(f, "score minimum {} is above maximum {}", min, max)
            }
            FilterIssue::ScoreMinOutOfDomain { value: v } => {
                write!(f, "score minimum {} outside -1..=10 was ignored", v)
            }
            FilterIssue::ScoreMaxOutOfDomain { value: v } => {
                write!(f, "score maximum {} outside 0..=11 was ignored", v)
            }
        }
    }
}

struct CompiledFilter {
    needle: String,
    location: Option<String>,
    score_min: Option<i32>,
    score_max: Option<i32>,
    date_start: Option<NaiveDate>,
    date_end: Option<NaiveDate>,
    require_comment: bool,
    matches_nothing: bool,
}

impl CompiledFilter {
    fn matches(&self, response: &Response) -> bool {
        if self.matches_nothing {
            return false;
        }
        if !self.needle.is_empty() && !response.location().to_lowercase().contains(&self.needle) {
            return false;
        }
        if let Some(location) = &self.location {
            if response.location() != location {
                return false;
            }
        }

        let score = i32::from(response.score().value());
        if self.score_min.is_some_and(|min| score < min) {
            return false;
        }
        if self.score_max.is_some_and(|max| score > max) {
            return false;
        }

        if self.date_start.is_some() || self.date_end.is_some() {
            let Some(day) = response.timestamp() else {
                return false;
            };
            if self.date_start.is_some_and(|start| day < start) {
                return false;
            }
            if self.date_end.is_some_and(|end| day > end) {
                return false;
            }
        }

        !self.require_comment || response.has_comment()
    }
}

/// Filtered responses together with any configuration issues found.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterOutcome {
    pub items: Vec<Response>,
    pub issues: Vec<FilterIssue>,
}

/// Keeps the responses satisfying every predicate of `spec`, in input order.
pub fn filter(responses: &[Response], spec: &FilterSpec) -> Vec<Response> {
    filter_with_issues(responses, spec).items
}

/// Like [`filter`], also returning the issues that degraded the result.
pub fn filter_with_issues(responses: &[Response], spec: &FilterSpec) -> FilterOutcome {
    let (compiled, issues) = spec.compile();
    for issue in &issues {
        log::warn!("filter degraded: {}", issue);
    }

    let items: Vec<Response> = responses
        .iter()
        .filter(|r| compiled.matches(r))
        .cloned()
        .collect();
    log::debug!("filter kept {} of {} responses", items.len(), responses.len());

    FilterOutcome { items, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Score;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Response> {
        vec![
            Response::new(1u64, "Centro Sul", Score::new(5).unwrap(), "lento", Some(date(2024, 3, 1))),
            Response::new(2u64, "Norte", Score::new(7).unwrap(), "", Some(date(2024, 3, 5))),
            Response::new(3u64, "centro norte", Score::new(9).unwrap(), "bom", Some(date(2024, 3, 10))),
            Response::new(4u64, "", Score::new(10).unwrap(), "", None),
        ]
    }

    fn ids(items: &[Response]) -> Vec<&str> {
        items.iter().map(|r| r.id().as_str()).collect()
    }

    #[test]
    fn empty_spec_keeps_everything_in_order() {
        let out = filter(&sample(), &FilterSpec::new());
        assert_eq!(ids(&out), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let out = filter(&sample(), &FilterSpec::new().search("CENTRO"));
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn exact_location_selects_the_empty_group() {
        let out = filter(&sample(), &FilterSpec::new().at_location(""));
        assert_eq!(ids(&out), vec!["4"]);
        let out = filter(&sample(), &FilterSpec::new().at_location("Norte"));
        assert_eq!(ids(&out), vec!["2"]);
    }

    #[test]
    fn score_bounds_are_inclusive() {
        let out = filter(&sample(), &FilterSpec::new().min_score(7).max_score(9));
        assert_eq!(ids(&out), vec!["2", "3"]);
    }

    #[test]
    fn date_bounds_exclude_undated_responses() {
        let out = filter(&sample(), &FilterSpec::new().between(date(2024, 3, 5), date(2024, 3, 10)));
        assert_eq!(ids(&out), vec!["2", "3"]);
        let out = filter(&sample(), &FilterSpec::new().from_date(date(2024, 1, 1)));
        assert_eq!(ids(&out), vec!["1", "2", "3"]);
    }

    #[test]
    fn require_comment_drops_blank_comments() {
        let out = filter(&sample(), &FilterSpec::new().with_comment());
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let spec = FilterSpec::new().search("centro").min_score(6).with_comment();
        assert_eq!(ids(&filter(&sample(), &spec)), vec!["3"]);
    }

    #[test]
    fn inverted_ranges_empty_the_result_and_are_reported() {
        let spec = FilterSpec::new().between(date(2024, 3, 10), date(2024, 3, 1));
        let out = filter_with_issues(&sample(), &spec);
        assert!(out.items.is_empty());
        assert_eq!(
            out.issues,
            vec![FilterIssue::InvertedDateRange {
                start: date(2024, 3, 10),
                end: date(2024, 3, 1)
            }]
        );

        let out = filter_with_issues(&sample(), &FilterSpec::new().min_score(9).max_score(3));
        assert!(out.items.is_empty());
        assert_eq!(out.issues, vec![FilterIssue::InvertedScoreRange { min: 9, max: 3 }]);
    }

    #[test]
    fn out_of_domain_bounds_are_ignored_and_reported() {
        let out = filter_with_issues(&sample(), &FilterSpec::new().min_score(42).max_score(-5));
        assert_eq!(out.items.len(), 4);
        assert_eq!(
            out.issues,
            vec![
                FilterIssue::ScoreMinOutOfDomain { value: 42 },
                FilterIssue::ScoreMaxOutOfDomain { value: -5 }
            ]
        );
    }

    #[test]
    fn picker_rejects_and_keeps_stale_bound() {
        let mut spec = FilterSpec::new();
        spec.set_score_min(-1).unwrap();
        spec.set_score_max(11).unwrap();
        spec.set_score_min(6).unwrap();

        let err = spec.set_score_min(11).unwrap_err();
        assert!(matches!(err, FeedbackError::BoundOutOfRange { value: 11, .. }));
        assert_eq!(spec.score_min, Some(6));

        assert!(spec.set_score_max(-1).is_err());
        assert_eq!(spec.score_max, Some(11));
        assert!(spec.validate().is_empty());

        spec.clear_score_bounds();
        assert_eq!(spec, FilterSpec::new());
    }

    #[test]
    fn input_is_left_untouched() {
        let input = sample();
        let before = input.clone();
        let _ = filter(&input, &FilterSpec::new().min_score(8));
        assert_eq!(input, before);
    }
}
