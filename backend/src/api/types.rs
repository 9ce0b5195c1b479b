//! REST API types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::load::LoadReport;
use crate::parser::DataTable;

/// Response sent after a CSV upload has been loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning", "dryRun"
    pub status: String,

    pub report: LoadReport,

    pub csv_info: CsvMetadata,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<&DataTable> for CsvMetadata {
    fn from(table: &DataTable) -> Self {
        CsvMetadata {
            encoding: table.encoding.clone(),
            delimiter: table.delimiter.to_string(),
            row_count: table.len(),
            columns: table.headers.clone(),
        }
    }
}

impl LoadResponse {
    pub fn new(report: LoadReport, table: &DataTable) -> Self {
        let status = if report.dry_run {
            "dryRun"
        } else if report.is_success() && report.warnings.is_empty() {
            "ready"
        } else {
            "warning"
        };

        LoadResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            report,
            csv_info: CsvMetadata::from(table),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "report": null,
    })
}

/// Error response carrying the partial report of an aborted load.
pub fn aborted_response(error: &str, report: &LoadReport) -> Value {
    let mut value = error_response(error);
    value["report"] = serde_json::to_value(report).unwrap_or(Value::Null);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowError;

    fn table() -> DataTable {
        crate::parser::parse_str("Name,SKU\nMug,MUG\nCap,CAP\n", ',').unwrap()
    }

    #[test]
    fn test_status_ready() {
        let mut report = LoadReport::new(false);
        report.record_loaded(1);
        let response = LoadResponse::new(report, &table());

        assert_eq!(response.status, "ready");
        assert_eq!(response.csv_info.row_count, 2);
        assert_eq!(response.csv_info.delimiter, ",");
        assert_eq!(response.csv_info.columns, vec!["Name", "SKU"]);
    }

    #[test]
    fn test_status_warning_and_dry_run() {
        let mut report = LoadReport::new(false);
        report.record_failure(2, &[], &RowError::SaveValidationFailed { errors: vec![] });
        assert_eq!(LoadResponse::new(report, &table()).status, "warning");

        let report = LoadReport::new(true);
        assert_eq!(LoadResponse::new(report, &table()).status, "dryRun");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(LoadResponse::new(LoadReport::new(false), &table())).unwrap();
        assert!(json["jobId"].is_string());
        assert_eq!(json["csvInfo"]["rowCount"], 2);
        assert_eq!(json["report"]["loadedCount"], 0);
    }

    #[test]
    fn test_error_responses() {
        let err = error_response("boom");
        assert_eq!(err["status"], "error");
        assert!(err["report"].is_null());

        let mut report = LoadReport::new(false);
        report.record_loaded(4);
        let aborted = aborted_response("disk full", &report);
        assert_eq!(aborted["error"], "disk full");
        assert_eq!(aborted["report"]["loadedIds"][0], 4);
    }
}
