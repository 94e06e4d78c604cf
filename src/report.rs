//! Presentation-ready views built from one pass through the pipeline:
//! filter once, then segment, bucket, sort and paginate the same subset.

use crate::bucket::{BucketSeries, bucket};
use crate::config::ReportOptions;
use crate::filter::{FilterIssue, FilterSpec, filter_with_issues};
use crate::paging::{Page, paginate, sort};
use crate::response::Response;
use crate::segment::{Segment, SegmentSummary, round1, segment, segment_by_location};
use serde::Serialize;

/// One slice of the NPS pie chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PieSlice {
    pub segment: Segment,
    pub label: &'static str,
    pub count: usize,
    /// Rounded to one decimal.
    pub percent: f64,
    pub color: &'static str,
}

/// Detractor, neutral and promoter slices, in that order.
pub fn pie_chart(summary: &SegmentSummary) -> Vec<PieSlice> {
    Segment::ALL
        .iter()
        .map(|&segment| PieSlice {
            segment,
            label: segment.label(),
            count: summary.count(segment),
            percent: round1(summary.percent(segment)),
            color: segment.color(),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NpsPanel {
    pub summary: SegmentSummary,
    /// NPS rounded to one decimal.
    pub nps: f64,
    pub gauge: f64,
    pub pie: Vec<PieSlice>,
}

impl NpsPanel {
    pub fn new(summary: SegmentSummary) -> Self {
        NpsPanel {
            nps: summary.nps_rounded(),
            gauge: summary.gauge_fraction(),
            pie: pie_chart(&summary),
            summary,
        }
    }
}

/// Everything the admin dashboard shows for one query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub issues: Vec<FilterIssue>,
    /// Responses passing the filter.
    pub matched: usize,
    pub nps: NpsPanel,
    pub trend: BucketSeries,
    pub list: Page<Response>,
}

pub fn build_report(responses: &[Response], spec: &FilterSpec, options: &ReportOptions) -> Report {
    let outcome = filter_with_issues(responses, spec);
    let matched = outcome.items.len();

    let nps = NpsPanel::new(segment(&outcome.items));
    let trend = bucket(&outcome.items, options.granularity);
    let ordered = sort(&outcome.items, options.sort_key, options.sort_direction);
    let list = paginate(&ordered, options.page_size, options.page);

    log::debug!(
        "report: {} matched, {} trend buckets, page {}/{}",
        matched,
        trend.buckets.len(),
        list.page_number,
        list.total_pages
    );

    Report {
        issues: outcome.issues,
        matched,
        nps,
        trend,
        list,
    }
}

/// The comment list page: only responses with a non-empty comment, on top
/// of whatever `spec` already asks for.
pub fn comment_page(
    responses: &[Response],
    spec: &FilterSpec,
    options: &ReportOptions,
) -> (Page<Response>, Vec<FilterIssue>) {
    let spec = spec.clone().with_comment();
    let outcome = filter_with_issues(responses, &spec);
    let ordered = sort(&outcome.items, options.sort_key, options.sort_direction);
    (paginate(&ordered, options.page_size, options.page), outcome.issues)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationRow {
    pub location: String,
    pub summary: SegmentSummary,
}

/// NPS per location for the responses matching `spec`, ordered by location.
pub fn location_breakdown(responses: &[Response], spec: &FilterSpec) -> Vec<LocationRow> {
    let outcome = filter_with_issues(responses, spec);
    segment_by_location(&outcome.items)
        .into_iter()
        .map(|(location, summary)| LocationRow { location, summary })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Granularity;
    use crate::paging::{SortDirection, SortKey};
    use crate::response::Score;
    use chrono::NaiveDate;

    fn sample() -> Vec<Response> {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d);
        vec![
            Response::new(1u64, "Centro", Score::new(5).unwrap(), "demorado", day(1)),
            Response::new(2u64, "Centro", Score::new(7).unwrap(), "", day(1)),
            Response::new(3u64, "Norte", Score::new(9).unwrap(), "gostei", day(8)),
            Response::new(4u64, "Norte", Score::new(10).unwrap(), "", None),
        ]
    }

    #[test]
    fn pie_slices_follow_segment_order() {
        let pie = pie_chart(&segment(&sample()));
        let counts: Vec<(&str, usize, f64)> = pie.iter().map(|s| (s.label, s.count, s.percent)).collect();
        assert_eq!(
            counts,
            vec![("Detractors", 1, 25.0), ("Neutrals", 1, 25.0), ("Promoters", 2, 50.0)]
        );
        assert_eq!(pie[0].color, "#FF0000");
    }

    #[test]
    fn report_uses_one_filtered_subset() {
        let options = ReportOptions {
            page_size: 2,
            granularity: Granularity::Week,
            sort_direction: SortDirection::Descending,
            ..ReportOptions::default()
        };
        let report = build_report(&sample(), &FilterSpec::new().min_score(6), &options);

        assert!(report.issues.is_empty());
        assert_eq!(report.matched, 3);
        assert_eq!(report.nps.summary.promoters, 2);
        assert_eq!(report.nps.nps, 66.7);
        assert_eq!(report.trend.skipped, 1);
        assert_eq!(report.trend.buckets.len(), 2);
        assert_eq!(report.list.total_pages, 2);
        let ids: Vec<&str> = report.list.items.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["4", "3"]);
    }

    #[test]
    fn report_on_empty_input_is_well_defined() {
        let report = build_report(&[], &FilterSpec::new(), &ReportOptions::default());
        assert_eq!(report.matched, 0);
        assert_eq!(report.nps.nps, 0.0);
        assert_eq!(report.nps.gauge, 0.5);
        assert!(report.nps.pie.iter().all(|s| s.count == 0 && s.percent == 0.0));
        assert!(report.trend.buckets.is_empty());
        assert_eq!(report.list.total_pages, 0);
    }

    #[test]
    fn inverted_range_surfaces_in_report() {
        let spec = FilterSpec::new().between(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        let report = build_report(&sample(), &spec, &ReportOptions::default());
        assert_eq!(report.matched, 0);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn comment_page_skips_blank_comments() {
        let options = ReportOptions {
            sort_key: SortKey::Score,
            sort_direction: SortDirection::Descending,
            ..ReportOptions::default()
        };
        let (page, issues) = comment_page(&sample(), &FilterSpec::new(), &options);
        assert!(issues.is_empty());
        let ids: Vec<&str> = page.items.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(page.total_items, 2);
    }

    #[test]
    fn breakdown_per_location() {
        let rows = location_breakdown(&sample(), &FilterSpec::new());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].location, "Centro");
        assert_eq!(rows[0].summary.nps, -50.0);
        assert_eq!(rows[1].location, "Norte");
        assert_eq!(rows[1].summary.nps, 100.0);
    }
}
