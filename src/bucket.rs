use crate::error::FeedbackError;
use crate::filter::FilterSpec;
use crate::response::Response;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Calendar period size used to group responses over time.
///
/// Weeks follow ISO 8601: they start on Monday and are numbered within the
/// ISO week-year, so a week may straddle two months or two years.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    /// The next finer granularity used when drilling into a period.
    pub fn finer(self) -> Option<Granularity> {
        match self {
            Granularity::Year => Some(Granularity::Month),
            Granularity::Month => Some(Granularity::Week),
            Granularity::Week => Some(Granularity::Day),
            Granularity::Day => None,
        }
    }
}

impl FromStr for Granularity {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            "year" | "yearly" => Ok(Granularity::Year),
            _ => Err(FeedbackError::UnknownOption {
                option: "granularity",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        };
        f.write_str(name)
    }
}

/// One calendar period, identified by its granularity and first day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    start: NaiveDate,
    granularity: Granularity,
}

impl Period {
    /// The period of `granularity` that contains `date`.
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Self {
        let start = match granularity {
            Granularity::Day => date,
            Granularity::Week => {
                let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
                date.checked_sub_days(back).unwrap_or(date)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        };
        Period { start, granularity }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the period, inclusive.
    pub fn end(&self) -> NaiveDate {
        let next = match self.granularity {
            Granularity::Day => self.start.succ_opt(),
            Granularity::Week => self.start.checked_add_days(Days::new(7)),
            Granularity::Month => {
                let (y, m) = if self.start.month() == 12 {
                    (self.start.year() + 1, 1)
                } else {
                    (self.start.year(), self.start.month() + 1)
                };
                NaiveDate::from_ymd_opt(y, m, 1)
            }
            Granularity::Year => NaiveDate::from_ymd_opt(self.start.year() + 1, 1, 1),
        };
        next.and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end()
    }

    /// Inclusive `(first, last)` days.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end())
    }

    /// Narrows `spec` to this period, replacing any date bounds it had.
    pub fn restrict(&self, spec: FilterSpec) -> FilterSpec {
        spec.between(self.start, self.end())
    }

    /// `2024-03-01`, `2024-W09`, `2024-03` or `2024`.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.start.format("%Y-%m-%d").to_string(),
            Granularity::Week => {
                let week = self.start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Month => self.start.format("%Y-%m").to_string(),
            Granularity::Year => self.start.format("%Y").to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Mean score of the responses recorded in one period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeBucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mean: f64,
    pub count: usize,
}

/// Chronological buckets plus the number of responses that could not be
/// placed because they carry no valid timestamp.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BucketSeries {
    pub granularity: Granularity,
    pub buckets: Vec<TimeBucket>,
    pub skipped: usize,
}

impl BucketSeries {
    /// Responses that landed in a bucket.
    pub fn bucketed(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Groups responses by the period containing their timestamp and averages
/// the scores in each, oldest period first.
pub fn bucket(responses: &[Response], granularity: Granularity) -> BucketSeries {
    let mut sums: BTreeMap<Period, (u64, usize)> = BTreeMap::new();
    let mut skipped = 0;

    for response in responses {
        match response.timestamp() {
            Some(day) => {
                let entry = sums.entry(Period::containing(day, granularity)).or_insert((0, 0));
                entry.0 += u64::from(response.score().value());
                entry.1 += 1;
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("{} response(s) without a valid timestamp left out of the {} series", skipped, granularity);
    }

    let buckets = sums
        .into_iter()
        .map(|(period, (sum, count))| TimeBucket {
            label: period.label(),
            start: period.start(),
            end: period.end(),
            mean: sum as f64 / count as f64,
            count,
        })
        .collect();

    BucketSeries {
        granularity,
        buckets,
        skipped,
    }
}

/// Periods of `granularity` that hold at least one response, oldest first.
///
/// With `within`, only responses dated inside that parent period count, so
/// a caller can drill from years to months to weeks.
pub fn available_periods(
    responses: &[Response],
    granularity: Granularity,
    within: Option<Period>,
) -> Vec<Period> {
    let periods: BTreeSet<Period> = responses
        .iter()
        .filter_map(Response::timestamp)
        .filter(|day| within.is_none_or(|parent| parent.contains(*day)))
        .map(|day| Period::containing(day, granularity))
        .collect();
    periods.into_iter().collect()
}
