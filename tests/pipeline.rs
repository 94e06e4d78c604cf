use chrono::NaiveDate;
use feedback::bucket::{Granularity, Period, available_periods, bucket};
use feedback::filter::{FilterIssue, FilterSpec, filter, filter_with_issues};
use feedback::loader::from_json_str;
use feedback::paging::{SortDirection, SortKey, paginate, sort};
use feedback::segment::segment;
use feedback::{ReportOptions, Response, ResponseStore, Score, build_report};
use pretty_assertions::assert_eq;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn scored(scores: &[i64]) -> Vec<Response> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &s)| Response::new(i as u64 + 1, "SENAI", Score::new(s).unwrap(), "", Some(date(2024, 3, 1))))
        .collect()
}

fn backend_store() -> ResponseStore {
    let json = r#"[
        {"id": 1, "local": "SENAI Centro", "nota": 10, "observacao": "Ótimo atendimento", "data": "2024-01-15"},
        {"id": 2, "local": "SENAI Centro", "nota": 3, "observacao": "Fila longa", "data": "2024-01-20"},
        {"id": 3, "local": "SESI Norte", "nota": 8, "observacao": "", "data": "2024-02-02"},
        {"id": 4, "local": "SESI Norte", "nota": 9, "observacao": "Rápido", "data": "2024-02-28"},
        {"id": 5, "local": "SESI Norte", "nota": 6, "observacao": "", "data": null},
        {"id": 6, "local": "SENAI Sul", "nota": 12, "observacao": "", "data": "2024-03-01"}
    ]"#;
    let report = from_json_str(json).unwrap();
    assert_eq!(report.rejected.len(), 1);
    ResponseStore::new(report.responses)
}

#[test]
fn segments_four_scores() {
    let summary = segment(&scored(&[5, 7, 9, 10]));
    assert_eq!(
        (summary.detractors, summary.neutrals, summary.promoters, summary.total),
        (1, 1, 2, 4)
    );
    assert_eq!(summary.nps, 25.0);
}

#[test]
fn lower_bound_keeps_scores_at_or_above() {
    let matched = filter(&scored(&[5, 7, 9, 10]), &FilterSpec::new().min_score(7));
    let scores: Vec<u8> = matched.iter().map(|r| r.score().value()).collect();
    assert_eq!(scores, vec![7, 9, 10]);
}

#[test]
fn inverted_date_range_matches_nothing_and_says_so() {
    let spec = FilterSpec::new().between(date(2024, 3, 10), date(2024, 3, 1));
    let outcome = filter_with_issues(&scored(&[5, 7, 9, 10]), &spec);
    assert!(outcome.items.is_empty());
    assert_eq!(
        outcome.issues,
        vec![FilterIssue::InvertedDateRange {
            start: date(2024, 3, 10),
            end: date(2024, 3, 1),
        }]
    );
}

#[test]
fn twenty_five_items_in_pages_of_ten() {
    let items: Vec<u32> = (1..=25).collect();
    let third = paginate(&items, 10, 3);
    assert_eq!(third.total_pages, 3);
    assert_eq!(third.items, (21..=25).collect::<Vec<_>>());
    assert!(!third.has_next());
    assert!(paginate(&items, 10, 4).items.is_empty());
}

#[test]
fn dashboard_over_backend_payload() {
    let store = backend_store();
    assert_eq!(store.locations(), vec!["SENAI Centro", "SESI Norte"]);

    let spec = FilterSpec::new().search("sesi");
    let options = ReportOptions {
        granularity: Granularity::Month,
        sort_key: SortKey::Date,
        sort_direction: SortDirection::Descending,
        ..ReportOptions::default()
    };
    let report = build_report(&store, &spec, &options);

    assert_eq!(report.matched, 3);
    assert_eq!(report.nps.summary.promoters, 1);
    assert_eq!(report.nps.summary.neutrals, 1);
    assert_eq!(report.nps.summary.detractors, 1);
    assert_eq!(report.nps.nps, 0.0);

    assert_eq!(report.trend.buckets.len(), 1);
    assert_eq!(report.trend.buckets[0].label, "2024-02");
    assert_eq!(report.trend.buckets[0].mean, 8.5);
    assert_eq!(report.trend.skipped, 1);

    let ids: Vec<&str> = report.list.items.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["4", "3", "5"]);
}

#[test]
fn drill_down_from_year_to_week() {
    let store = backend_store();

    let years = available_periods(&store, Granularity::Year, None);
    assert_eq!(years.len(), 1);
    let months = available_periods(&store, Granularity::Month, Some(years[0]));
    let labels: Vec<String> = months.iter().map(Period::label).collect();
    assert_eq!(labels, vec!["2024-01", "2024-02"]);

    let weeks = available_periods(&store, Granularity::Week, Some(months[1]));
    let labels: Vec<String> = weeks.iter().map(Period::label).collect();
    assert_eq!(labels, vec!["2024-W05", "2024-W09"]);

    // A drill-down period becomes a date filter.
    let in_february = filter(&store, &months[1].restrict(FilterSpec::new()));
    assert_eq!(in_february.len(), 2);
    let series = bucket(&in_february, Granularity::Week);
    assert_eq!(series.bucketed(), 2);
}

#[test]
fn sorting_then_paging_comment_list() {
    let store = backend_store();
    let commented = filter(&store, &FilterSpec::new().with_comment());
    let ordered = sort(&commented, SortKey::Score, SortDirection::Ascending);
    let page = paginate(&ordered, 2, 1);
    let comments: Vec<&str> = page.items.iter().map(|r| r.comment()).collect();
    assert_eq!(comments, vec!["Fila longa", "Rapido"]);
    assert_eq!(page.total_pages, 2);
}
