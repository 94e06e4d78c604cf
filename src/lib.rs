/*!
# Feedback Analytics

An analytics engine for survey responses, built in Rust.

## Overview

Survey responses (a location, a 0 to 10 score, an optional comment and a
date) are loaded into an immutable store and queried. Every query runs the
same pipeline: filter the store, then derive the Net Promoter Score
breakdown, the score trend over time, and an ordered, paged list from the
one filtered subset. Results can be exported as CSV, JSON, XML or XLSX.

## Architecture

### Data Layer
- **response**: validated `Score`, `Response` records, comment normalization,
  date parsing and the shared read-only `ResponseStore`
- **loader**: JSON and CSV import that rejects bad records without failing
  the whole load

### Query Layer
- **filter**: conjunctive `FilterSpec` (text, location, score and date
  bounds, comment presence) with reported configuration issues
- **segment**: detractor/neutral/promoter classification and NPS
- **bucket**: daily, ISO-weekly, monthly and yearly mean-score series with
  drill-down periods
- **paging**: stable sorting and 1-based pagination

### Presentation Layer
- **report**: dashboard view models composed from one filtered subset
- **downloader**: export of result sets and trend series
- **config**: report options with defaults, read from JSON

## Modules

- **error**: `FeedbackError` and the crate `Result` alias
- **response**, **loader**, **filter**, **segment**, **bucket**, **paging**,
  **report**, **downloader**, **config**: see above
*/

pub mod bucket;
pub mod config;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod loader;
pub mod paging;
pub mod report;
pub mod response;
pub mod segment;

pub use bucket::{BucketSeries, Granularity, Period, TimeBucket};
pub use config::ReportOptions;
pub use downloader::ExportFormat;
pub use error::{FeedbackError, Result};
pub use filter::{FilterIssue, FilterSpec};
pub use paging::{Page, SortDirection, SortKey};
pub use report::{Report, build_report};
pub use response::{Response, ResponseStore, Score};
pub use segment::{Segment, SegmentSummary};
