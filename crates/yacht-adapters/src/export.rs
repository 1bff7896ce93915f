//! JSON and CSV renditions of a local record.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use yacht_core::LocalRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unsupported export format `{other}`")),
        }
    }
}

/// Pretty-printed JSON object holding every field.
pub fn export_json(record: &LocalRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Header row of field names and one row of double-quoted values.
pub fn export_csv(record: &LocalRecord) -> String {
    let (names, values): (Vec<&str>, Vec<String>) =
        record.iter().map(|(name, value)| (name, quote(value))).unzip();
    format!("{}\n{}", names.join(","), values.join(","))
}

pub fn render_export(record: &LocalRecord, format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => export_json(record),
        ExportFormat::Csv => Ok(export_csv(record)),
    }
}

/// Path separators, control characters and `..` become `-` so the model
/// can only ever name a single file.
fn file_name_part(model: &str) -> String {
    let cleaned: String = model
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '-' } else { c })
        .collect();
    let cleaned = cleaned.replace("..", "-");
    if cleaned.trim().is_empty() {
        "data".to_string()
    } else {
        cleaned
    }
}

/// `devalk-yacht-<model or "data">-<YYYY-MM-DD>.<ext>`
pub fn export_file_name(record: &LocalRecord, date: NaiveDate, format: ExportFormat) -> String {
    let model = file_name_part(record.value("model"));
    format!(
        "devalk-yacht-{model}-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_every_value_and_doubles_embedded_quotes() {
        let mut r = LocalRecord::new();
        r.set("model", "Najad 460").unwrap();
        r.set("notes", "teak \"as new\", varnished").unwrap();
        let csv = export_csv(&r);
        let (header, row) = csv.split_once('\n').unwrap();
        assert!(header.starts_with("dimensions,material,built,"));
        assert!(header.ends_with(",notes,tags"));
        assert!(row.starts_with("\"\",\"\","));
        assert!(row.contains("\"Najad 460\""));
        assert!(row.ends_with("\"teak \"\"as new\"\", varnished\",\"\""));
    }

    #[test]
    fn json_export_round_trips() {
        let mut r = LocalRecord::new();
        r.set("model", "Najad 460").unwrap();
        r.set("cabins", "3").unwrap();
        let text = export_json(&r).unwrap();
        let back: LocalRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn file_names_fall_back_to_data() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut r = LocalRecord::new();
        assert_eq!(
            export_file_name(&r, date, ExportFormat::Csv),
            "devalk-yacht-data-2026-10-16.csv"
        );
        r.set("model", "Najad 460").unwrap();
        assert_eq!(
            export_file_name(&r, date, ExportFormat::Json),
            "devalk-yacht-Najad 460-2026-10-16.json"
        );
    }

    #[test]
    fn file_names_never_contain_path_separators() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut r = LocalRecord::new();
        r.set("model", "Bavaria 34/2").unwrap();
        let name = export_file_name(&r, date, ExportFormat::Json);
        assert_eq!(name, "devalk-yacht-Bavaria 34-2-2026-10-16.json");

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(&name), "{}").unwrap();
        assert!(dir.path().join(&name).is_file());

        r.set("model", "..\\boot\tsecret").unwrap();
        let name = export_file_name(&r, date, ExportFormat::Csv);
        assert!(!name.contains(['/', '\\', '\t']));
        assert!(!name.contains(".."));
        assert!(name.ends_with("-2026-10-16.csv"));

        r.set("model", " / ").unwrap();
        assert_eq!(
            export_file_name(&r, date, ExportFormat::Csv),
            "devalk-yacht---2026-10-16.csv"
        );
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
