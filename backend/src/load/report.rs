//! Load report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LoadWarning, RowError};
use crate::models::Id;

/// A row that could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based line in the file (the header is line 1).
    pub row: usize,
    /// Raw cells of the row.
    pub data: Vec<String>,
    pub error: String,
}

/// A non-fatal condition raised by a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowWarning {
    pub row: usize,
    pub message: String,
}

/// Outcome of one load session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub processed_count: usize,
    pub loaded_count: usize,
    pub failed_count: usize,
    pub failures: Vec<RowFailure>,
    pub warnings: Vec<RowWarning>,
    /// Ids of loaded products, in row order.
    pub loaded_ids: Vec<Id>,
    /// Everything was rolled back after processing.
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LoadReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            processed_count: 0,
            loaded_count: 0,
            failed_count: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
            loaded_ids: Vec::new(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_loaded(&mut self, id: Id) {
        self.processed_count += 1;
        self.loaded_count += 1;
        self.loaded_ids.push(id);
    }

    pub fn record_failure(&mut self, row: usize, data: &[String], error: &RowError) {
        self.processed_count += 1;
        self.failed_count += 1;
        self.failures.push(RowFailure {
            row,
            data: data.to_vec(),
            error: error.to_string(),
        });
    }

    pub fn record_warning(&mut self, row: usize, warning: &LoadWarning) {
        self.warnings.push(RowWarning {
            row,
            message: warning.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Every processed row was loaded.
    pub fn is_success(&self) -> bool {
        self.failed_count == 0
    }

    /// Wall time, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
