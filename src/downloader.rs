use crate::bucket::BucketSeries;
use crate::error::{FeedbackError, Result};
use crate::response::Response;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Formats a result set can be exported to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Xml,
    /// Requires the `xlsx` feature
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = FeedbackError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(FeedbackError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Flat row written by every exporter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportRecord<'a> {
    pub location: &'a str,
    pub score: u8,
    pub comment: &'a str,
    /// `DD/MM/YYYY`, empty when the response has no date
    pub date: String,
}

impl<'a> From<&'a Response> for ExportRecord<'a> {
    fn from(response: &'a Response) -> Self {
        ExportRecord {
            location: response.location(),
            score: response.score().value(),
            comment: response.comment(),
            date: format_date(response),
        }
    }
}

fn format_date(response: &Response) -> String {
    response
        .timestamp()
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// Convert responses to CSV format
///
/// Writes a `location,score,comment,date` header followed by one row per
/// response. The comment is always quoted; the location is quoted only when
/// it contains a comma, quote or newline. Embedded quotes are doubled.
///
/// # Arguments
/// * `responses` - Responses to write, in the order given
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use feedback::downloader::to_csv;
/// use feedback::response::{Response, Score};
///
/// let rows = vec![Response::new(1u64, "Centro", Score::new(9).unwrap(), "bom", None)];
/// assert_eq!(to_csv(&rows), "location,score,comment,date\nCentro,9,\"bom\",\n");
/// ```
pub fn to_csv(responses: &[Response]) -> String {
    let mut csv_content = String::from("location,score,comment,date\n");

    for response in responses {
        let record = ExportRecord::from(response);
        csv_content.push_str(&csv_field(record.location));
        csv_content.push(',');
        csv_content.push_str(&record.score.to_string());
        csv_content.push(',');
        csv_content.push_str(&quoted(record.comment));
        csv_content.push(',');
        csv_content.push_str(&record.date);
        csv_content.push('\n');
    }

    csv_content
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        quoted(value)
    } else {
        value.to_string()
    }
}

/// Convert responses to a pretty-printed JSON array of export records
pub fn to_json(responses: &[Response]) -> Result<String> {
    let records: Vec<ExportRecord<'_>> = responses.iter().map(ExportRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Convert responses to an XML document
///
/// # Examples
/// ```
/// use feedback::downloader::to_xml;
///
/// let xml = to_xml(&[]);
/// assert!(xml.contains("<responses>"));
/// ```
pub fn to_xml(responses: &[Response]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<responses>\n");

    for response in responses {
        let record = ExportRecord::from(response);
        xml.push_str("  <response>\n");
        xml.push_str(&format!("    <location>{}</location>\n", xml_escape(record.location)));
        xml.push_str(&format!("    <score>{}</score>\n", record.score));
        xml.push_str(&format!("    <comment>{}</comment>\n", xml_escape(record.comment)));
        xml.push_str(&format!("    <date>{}</date>\n", record.date));
        xml.push_str("  </response>\n");
    }

    xml.push_str("</responses>\n");
    xml
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Not allowed anywhere in an XML 1.0 document
            '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Convert a trend series to CSV with a `period,mean,count` header
pub fn series_to_csv(series: &BucketSeries) -> String {
    let mut csv_content = String::from("period,mean,count\n");
    for bucket in &series.buckets {
        csv_content.push_str(&format!("{},{},{}\n", bucket.label, bucket.mean, bucket.count));
    }
    csv_content
}

/// Convert responses to XLSX format
///
/// Writes the same columns as [`to_csv`] into a single worksheet using the
/// rust_xlsxwriter library.
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
#[cfg(feature = "xlsx")]
pub fn to_xlsx(responses: &[Response]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| FeedbackError::Xlsx(e.to_string());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in ["location", "score", "comment", "date"].iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).map_err(xlsx_err)?;
    }

    for (i, response) in responses.iter().enumerate() {
        let row = (i + 1) as u32;
        let record = ExportRecord::from(response);
        worksheet.write_string(row, 0, record.location).map_err(xlsx_err)?;
        worksheet.write_number(row, 1, f64::from(record.score)).map_err(xlsx_err)?;
        worksheet.write_string(row, 2, record.comment).map_err(xlsx_err)?;
        worksheet.write_string(row, 3, &record.date).map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

/// Serialize responses in the requested format
///
/// # Errors
/// * JSON serialization failures
/// * `UnsupportedFormat` for XLSX when the `xlsx` feature is disabled
pub fn export(responses: &[Response], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => Ok(to_csv(responses).into_bytes()),
        ExportFormat::Json => Ok(to_json(responses)?.into_bytes()),
        ExportFormat::Xml => Ok(to_xml(responses).into_bytes()),
        #[cfg(feature = "xlsx")]
        ExportFormat::Xlsx => to_xlsx(responses),
        #[cfg(not(feature = "xlsx"))]
        ExportFormat::Xlsx => Err(FeedbackError::UnsupportedFormat(
            "xlsx export requires the 'xlsx' feature".to_string(),
        )),
    }
}

/// Download file name for an export, e.g. `responses_centro-sul.csv`, or
/// `responses_all.csv` when no location is selected.
pub fn export_filename(location: Option<&str>, format: ExportFormat) -> String {
    let slug = location
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "all".to_string());
    format!("responses_{}.{}", slug, format.extension())
}

fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Granularity, bucket};
    use crate::response::Score;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Response> {
        vec![
            Response::new(
                1u64,
                "Centro, Sul",
                Score::new(9).unwrap(),
                "disse \"otimo\"",
                NaiveDate::from_ymd_opt(2024, 3, 5),
            ),
            Response::new(2u64, "Norte", Score::new(4).unwrap(), "", None),
        ]
    }

    #[test]
    fn csv_quotes_comments_and_formats_dates() {
        let expected = "location,score,comment,date\n\
                        \"Centro, Sul\",9,\"disse \"\"otimo\"\"\",05/03/2024\n\
                        Norte,4,\"\",\n";
        assert_eq!(to_csv(&sample()), expected);
    }

    #[test]
    fn json_uses_export_fields() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["location"], "Centro, Sul");
        assert_eq!(value[0]["score"], 9);
        assert_eq!(value[0]["date"], "05/03/2024");
        assert_eq!(value[1]["date"], "");
    }

    #[test]
    fn xml_escapes_text() {
        let xml = to_xml(&sample());
        assert!(xml.contains("<comment>disse &quot;otimo&quot;</comment>"));
        assert!(xml.contains("<date>05/03/2024</date>"));
        assert_eq!(xml.matches("<response>").count(), 2);
    }

    #[test]
    fn xml_drops_control_characters() {
        let rows = vec![Response::new(
            1u64,
            "Norte\u{1}",
            Score::new(7).unwrap(),
            "a\u{0}b\u{B}c\u{1F}d\tok\nfim",
            None,
        )];
        let xml = to_xml(&rows);
        assert!(xml.contains("<location>Norte</location>"));
        assert!(xml.contains("<comment>abcd\tok\nfim</comment>"));
        assert!(!xml.chars().any(|c| c < ' ' && !matches!(c, '\t' | '\n' | '\r')));
    }

    #[test]
    fn series_csv() {
        let series = bucket(&sample(), Granularity::Month);
        assert_eq!(series_to_csv(&series), "period,mean,count\n2024-03,9,1\n");
    }

    #[test]
    fn export_dispatches_on_format() {
        let bytes = export(&sample(), ExportFormat::Csv).unwrap();
        assert!(bytes.starts_with(b"location,score"));
        let bytes = export(&sample(), ExportFormat::Xml).unwrap();
        assert!(bytes.starts_with(b"<?xml"));
    }

    #[cfg(not(feature = "xlsx"))]
    #[test]
    fn xlsx_needs_the_feature() {
        assert!(matches!(
            export(&sample(), ExportFormat::Xlsx),
            Err(FeedbackError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn filenames() {
        assert_eq!(export_filename(None, ExportFormat::Csv), "responses_all.csv");
        assert_eq!(export_filename(Some("Centro Sul / SENAI"), ExportFormat::Json), "responses_centro-sul-senai.json");
        assert_eq!(export_filename(Some("São João"), ExportFormat::Xml), "responses_sao-joao.xml");
        assert_eq!(export_filename(Some(""), ExportFormat::Csv), "responses_all.csv");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
