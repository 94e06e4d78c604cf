use crate::error::{FeedbackError, Result};
use crate::response::{RawResponse, Response};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Responses decoded from an input document, plus the records that could
/// not be turned into a valid [`Response`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub responses: Vec<Response>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedRecord {
    /// 1-based position of the record (array index or CSV data line).
    pub position: usize,
    pub reason: String,
}

impl LoadReport {
    fn push(&mut self, position: usize, raw: RawResponse) {
        match raw.into_response(|| format!("row-{}", position)) {
            Ok(response) => self.responses.push(response),
            Err(e) => self.reject(position, e.to_string()),
        }
    }

    fn reject(&mut self, position: usize, reason: String) {
        log::warn!("record {} rejected: {}", position, reason);
        self.rejected.push(RejectedRecord { position, reason });
    }
}

/// Load responses from the backend's JSON payload
///
/// The payload is either an array of records or an object holding the array
/// under `responses` or `usuarios`. Records use the backend field names
/// (`local`, `nota`, `observacao`, `data`) or the crate's own.
///
/// # Arguments
/// * `json` - The JSON document
///
/// # Returns
/// * `Result<LoadReport>` - Decoded responses and rejected records. Only a
///   document that is not JSON, or has no record array, is an error.
///
/// # Examples
/// ```
/// use feedback::loader::from_json_str;
///
/// let report = from_json_str(r#"[{"local": "SENAI", "nota": 9, "observacao": "", "data": "2024-03-01"}]"#).unwrap();
/// assert_eq!(report.responses.len(), 1);
/// ```
pub fn from_json_str(json: &str) -> Result<LoadReport> {
    records_to_report(serde_json::from_str(json)?)
}

pub fn from_json_reader(reader: impl Read) -> Result<LoadReport> {
    records_to_report(serde_json::from_reader(reader)?)
}

fn records_to_report(document: serde_json::Value) -> Result<LoadReport> {
    let records = match document {
        serde_json::Value::Array(records) => records,
        serde_json::Value::Object(mut map) => match map
            .remove("responses")
            .or_else(|| map.remove("usuarios"))
        {
            Some(serde_json::Value::Array(records)) => records,
            _ => {
                return Err(FeedbackError::UnsupportedFormat(
                    "JSON object without a `responses` array".to_string(),
                ));
            }
        },
        _ => {
            return Err(FeedbackError::UnsupportedFormat(
                "JSON document is not an array of responses".to_string(),
            ));
        }
    };

    let mut report = LoadReport::default();
    for (i, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawResponse>(record) {
            Ok(raw) => report.push(i + 1, raw),
            Err(e) => report.reject(i + 1, e.to_string()),
        }
    }
    log::debug!(
        "loaded {} responses, rejected {}",
        report.responses.len(),
        report.rejected.len()
    );
    Ok(report)
}

/// Load responses from CSV text
///
/// The first line is a header naming the columns, in any order:
/// `location`/`local`, `score`/`nota`, `comment`/`observacao`,
/// `date`/`data` and optionally `id`. Quoted fields may contain commas,
/// doubled quotes and line breaks, so this reads back what
/// [`crate::downloader::to_csv`] writes.
pub fn from_csv_str(content: &str) -> Result<LoadReport> {
    let mut records = parse_csv_records(content).into_iter();

    let (_, header) = records.next().ok_or_else(|| FeedbackError::Csv {
        line: 1,
        message: "CSV file is empty".to_string(),
    })?;
    let columns = CsvColumns::from_header(&header)?;

    let mut report = LoadReport::default();
    for (line, fields) in records {
        let field = |col: Option<usize>| col.and_then(|c| fields.get(c)).cloned();

        let raw = RawResponse {
            id: field(columns.id).map(serde_json::Value::String),
            location: field(columns.location),
            score: field(Some(columns.score)).map(serde_json::Value::String),
            comment: field(columns.comment),
            timestamp: field(columns.date),
        };
        report.push(line, raw);
    }
    Ok(report)
}

/// Load responses from a CSV file
///
/// # Examples
/// ```no_run
/// use feedback::loader::from_csv;
///
/// match from_csv("responses.csv") {
///     Ok(report) => println!("Loaded {} responses", report.responses.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<LoadReport> {
    let mut content = String::new();
    File::open(filepath)?.read_to_string(&mut content)?;
    from_csv_str(&content)
}

struct CsvColumns {
    id: Option<usize>,
    location: Option<usize>,
    score: usize,
    comment: Option<usize>,
    date: Option<usize>,
}

impl CsvColumns {
    fn from_header(header: &[String]) -> Result<Self> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        let score = find(&["score", "nota"]).ok_or_else(|| FeedbackError::Csv {
            line: 1,
            message: "header has no score column".to_string(),
        })?;
        Ok(CsvColumns {
            id: find(&["id"]),
            location: find(&["location", "local"]),
            score,
            comment: find(&["comment", "observacao"]),
            date: find(&["date", "data", "timestamp"]),
        })
    }
}

// Split CSV text into records, each tagged with the line it starts on.
// Quoted fields may span lines; blank lines between records are skipped.
fn parse_csv_records(content: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                    quoted = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                if !fields.is_empty() || !current_field.trim().is_empty() || quoted {
                    fields.push(std::mem::take(&mut current_field));
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                current_field.clear();
                quoted = false;
                line += 1;
                record_line = line;
            }
            _ => {
                if c == '\n' {
                    line += 1;
                }
                current_field.push(c);
            }
        }
    }

    if !fields.is_empty() || !current_field.trim().is_empty() || quoted {
        fields.push(current_field);
        records.push((record_line, fields));
    }
    records
}

/// Detect file type and load appropriate format
///
/// # Arguments
/// * `filepath` - Path to a `.json` or `.csv` file
///
/// # Returns
/// * `Result<LoadReport>` - The loaded responses or an error
pub fn load_responses(filepath: impl AsRef<Path>) -> Result<LoadReport> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("json") => from_json_reader(BufReader::new(File::open(path)?)),
        Some("csv") => from_csv(path),
        Some(ext) => Err(FeedbackError::UnsupportedFormat(format!(
            "unsupported file extension: {}",
            ext
        ))),
        None => Err(FeedbackError::UnsupportedFormat("file has no extension".to_string())),
    }
}
