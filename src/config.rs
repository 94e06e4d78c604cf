use crate::bucket::Granularity;
use crate::downloader::ExportFormat;
use crate::error::Result;
use crate::paging::{SortDirection, SortKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration options for building a report
///
/// This structure holds the presentation choices that are not part of a
/// query: how the lists are ordered and paged, how the trend is grouped,
/// and which format exports use. Every field has a default, so a config
/// file only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportOptions {
    /// Number of responses shown per list page
    pub page_size: usize,

    /// Page to show, starting at 1
    pub page: usize,

    /// Period size of the trend series
    pub granularity: Granularity,

    /// Field the lists are ordered by
    pub sort_key: SortKey,

    /// Order of the lists
    pub sort_direction: SortDirection,

    /// Format used when a result set is exported
    pub export_format: ExportFormat,
}

impl Default for ReportOptions {
    /// Creates the default report configuration
    ///
    /// # Returns
    /// * `ReportOptions` - Default configuration with:
    ///   - pages of 10 responses, first page
    ///   - daily trend buckets
    ///   - ascending score order
    ///   - CSV exports
    fn default() -> Self {
        Self {
            page_size: 10,
            page: 1,
            granularity: Granularity::Day,
            sort_key: SortKey::Score,
            sort_direction: SortDirection::Ascending,
            export_format: ExportFormat::Csv,
        }
    }
}

impl ReportOptions {
    /// Parses options from a JSON document
    ///
    /// # Arguments
    /// * `json` - JSON object; absent fields keep their defaults
    ///
    /// # Returns
    /// * `Result<ReportOptions>` - The options, or an error for malformed
    ///   JSON and unknown fields
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file
    ///
    /// # Examples
    /// ```no_run
    /// use feedback::config::ReportOptions;
    ///
    /// match ReportOptions::from_json_file("report.json") {
    ///     Ok(options) => println!("page size {}", options.page_size),
    ///     Err(e) => eprintln!("Failed to read options: {}", e),
    /// }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
