use crate::response::{Response, Score};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// NPS category of a single score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// 0..=6
    Detractor,
    /// 7..=8
    Neutral,
    /// 9..=10
    Promoter,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Detractor, Segment::Neutral, Segment::Promoter];

    pub fn of(score: Score) -> Self {
        match score.value() {
            0..=6 => Segment::Detractor,
            7..=8 => Segment::Neutral,
            _ => Segment::Promoter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Segment::Detractor => "Detractors",
            Segment::Neutral => "Neutrals",
            Segment::Promoter => "Promoters",
        }
    }

    /// Chart colour used for the segment's slice.
    pub fn color(self) -> &'static str {
        match self {
            Segment::Detractor => "#FF0000",
            Segment::Neutral => "#FFFF00",
            Segment::Promoter => "#00FF00",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate promoter/neutral/detractor counts and the derived NPS.
///
/// Every ratio is zero for an empty collection; no field is ever NaN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub promoters: usize,
    pub neutrals: usize,
    pub detractors: usize,
    pub total: usize,
    /// `(promoters - detractors) / total * 100`, within `-100..=100`.
    pub nps: f64,
    pub promoter_pct: f64,
    pub neutral_pct: f64,
    pub detractor_pct: f64,
}

impl SegmentSummary {
    fn from_counts(promoters: usize, neutrals: usize, detractors: usize) -> Self {
        let total = promoters + neutrals + detractors;
        SegmentSummary {
            promoters,
            neutrals,
            detractors,
            total,
            nps: if total == 0 {
                0.0
            } else {
                (promoters as f64 - detractors as f64) / total as f64 * 100.0
            },
            promoter_pct: percentage(promoters, total),
            neutral_pct: percentage(neutrals, total),
            detractor_pct: percentage(detractors, total),
        }
    }

    pub fn count(&self, segment: Segment) -> usize {
        match segment {
            Segment::Detractor => self.detractors,
            Segment::Neutral => self.neutrals,
            Segment::Promoter => self.promoters,
        }
    }

    pub fn percent(&self, segment: Segment) -> f64 {
        match segment {
            Segment::Detractor => self.detractor_pct,
            Segment::Neutral => self.neutral_pct,
            Segment::Promoter => self.promoter_pct,
        }
    }

    /// NPS rounded to one decimal for display.
    pub fn nps_rounded(&self) -> f64 {
        round1(self.nps)
    }

    /// Needle position of an NPS gauge, from 0 (NPS -100) to 1 (NPS 100).
    pub fn gauge_fraction(&self) -> f64 {
        ((self.nps + 100.0) / 200.0).clamp(0.0, 1.0)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Counts each NPS category over `responses`.
pub fn segment<'a, I>(responses: I) -> SegmentSummary
where
    I: IntoIterator<Item = &'a Response>,
{
    let mut counts = [0usize; 3];
    for response in responses {
        counts[Segment::of(response.score()) as usize] += 1;
    }
    let [detractors, neutrals, promoters] = counts;
    SegmentSummary::from_counts(promoters, neutrals, detractors)
}

/// One summary per location group, keyed by location. Responses without a
/// location are grouped under the empty string.
pub fn segment_by_location(responses: &[Response]) -> BTreeMap<String, SegmentSummary> {
    let mut groups: BTreeMap<&str, Vec<&Response>> = BTreeMap::new();
    for response in responses {
        groups.entry(response.location()).or_default().push(response);
    }
    groups
        .into_iter()
        .map(|(location, members)| (location.to_string(), segment(members)))
        .collect()
}

/// Responses falling into `segment`, in input order.
pub fn members(responses: &[Response], segment: Segment) -> Vec<Response> {
    responses
        .iter()
        .filter(|r| Segment::of(r.score()) == segment)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(scores: &[i64]) -> Vec<Response> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| Response::new(i as u64, "x", Score::new(s).unwrap(), "", None))
            .collect()
    }

    #[test]
    fn thresholds() {
        let expected = [
            (0, Segment::Detractor),
            (6, Segment::Detractor),
            (7, Segment::Neutral),
            (8, Segment::Neutral),
            (9, Segment::Promoter),
            (10, Segment::Promoter),
        ];
        for (score, segment) in expected {
            assert_eq!(Segment::of(Score::new(score).unwrap()), segment, "score {}", score);
        }
    }

    #[test]
    fn four_response_summary() {
        let summary = segment(&scored(&[5, 7, 9, 10]));
        assert_eq!(summary.detractors, 1);
        assert_eq!(summary.neutrals, 1);
        assert_eq!(summary.promoters, 2);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.nps, 25.0);
        assert_eq!(summary.promoter_pct, 50.0);
        assert_eq!(summary.neutral_pct, 25.0);
        assert_eq!(summary.detractor_pct, 25.0);
        assert_eq!(summary.gauge_fraction(), 0.625);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = segment(&Vec::<Response>::new());
        assert_eq!(summary, SegmentSummary::default());
        assert_eq!(summary.gauge_fraction(), 0.5);
        assert!(!summary.nps.is_nan());
    }

    #[test]
    fn display_rounding() {
        let summary = segment(&scored(&[10, 0, 0]));
        assert_eq!(summary.nps_rounded(), -33.3);
        assert_eq!(round1(summary.promoter_pct), 33.3);
        assert_eq!(round1(summary.detractor_pct), 66.7);
    }

    #[test]
    fn groups_by_location() {
        let mut responses = scored(&[10, 2]);
        responses.push(Response::new(9u64, "", Score::new(8).unwrap(), "", None));
        let by_location = segment_by_location(&responses);

        assert_eq!(by_location.keys().collect::<Vec<_>>(), vec!["", "x"]);
        assert_eq!(by_location[""].neutrals, 1);
        assert_eq!(by_location["x"].total, 2);
        assert_eq!(by_location["x"].nps, 0.0);
    }

    #[test]
    fn members_of_a_segment() {
        let responses = scored(&[9, 3, 10, 7]);
        let promoters = members(&responses, Segment::Promoter);
        let ids: Vec<&str> = promoters.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["0", "2"]);
        assert_eq!(members(&responses, Segment::Neutral).len(), 1);
    }
}
