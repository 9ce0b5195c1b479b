//! Load Session - one file, one transaction, one report.
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐   ┌────────────┐
//! │ DataTable│──▶│ HeaderMapper │──▶│ RowProcessor  │──▶│ LoadReport │
//! │          │   │  (bindings)  │   │ (row by row)  │   │            │
//! └──────────┘   └──────────────┘   └───────────────┘   └────────────┘
//!                                   begin ─────────── commit / rollback
//! ```
//!
//! Row failures are recorded and skipped. Mapping errors, transaction
//! failures and fatal store errors abort the load; an abort after rows were
//! processed carries the partial report. A dummy run processes every row
//! and then rolls back.

use std::sync::Arc;

use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::assets::AssetPipeline;
use crate::config::LoadOptions;
use crate::error::{LoadError, LoadResult, RowError, StoreError};
use crate::load::processor::RowProcessor;
use crate::load::report::LoadReport;
use crate::mapping::{ColumnBinding, HeaderMapper};
use crate::parser::DataTable;
use crate::schema::OperatorCatalog;
use crate::store::Repository;

/// Why the session transaction ends without committing.
enum SessionAbort {
    /// Dummy run: everything processed, nothing kept.
    DryRun(LoadReport),
    Failed(LoadError),
}

impl From<StoreError> for SessionAbort {
    fn from(e: StoreError) -> Self {
        SessionAbort::Failed(LoadError::Store(e))
    }
}

/// A load of one table into one repository.
pub struct LoadSession<'a, R: Repository> {
    repo: &'a mut R,
    assets: &'a mut dyn AssetPipeline,
    catalog: Arc<OperatorCatalog>,
    options: LoadOptions,
}

impl<'a, R: Repository> LoadSession<'a, R> {
    pub fn new(
        repo: &'a mut R,
        assets: &'a mut dyn AssetPipeline,
        catalog: Arc<OperatorCatalog>,
        options: LoadOptions,
    ) -> Self {
        Self {
            repo,
            assets,
            catalog,
            options,
        }
    }

    /// Bind the header row.
    ///
    /// On schema versions above 1.0 the catalog's pseudo operators are
    /// force-included, since the loader knows how to apply them.
    pub fn map_headers(&self, headers: &[String]) -> LoadResult<Vec<ColumnBinding>> {
        let mut mapping = self.options.mapping();
        if self.options.schema_version.has_master_variant() {
            for name in self.catalog.pseudo_names() {
                if !mapping.force_inclusion.contains(&name) {
                    mapping.force_inclusion.push(name);
                }
            }
        }
        Ok(HeaderMapper::new(&self.catalog).map(headers, &mapping)?)
    }

    /// Load every row of the table.
    pub fn run(&mut self, table: &DataTable) -> LoadResult<LoadReport> {
        for (c, first, second) in self.options.delimiters.conflicts() {
            log_warning(format!("Delimiter '{}' used for both {} and {}", c, first, second));
        }

        let bindings = self.map_headers(&table.headers)?;
        log_info(format!(
            "Mapped {} of {} columns (schema {})",
            bindings.len(),
            table.headers.len(),
            self.options.schema_version
        ));
        for binding in &bindings {
            log_info_indent(
                format!("{} -> {} ({:?})", binding.header, binding.operator.name, binding.operator.handler),
                1,
            );
        }

        let processor = RowProcessor::new(&self.catalog, &bindings, &self.options)?;
        let dummy = self.options.dummy;
        let assets = &mut *self.assets;

        log_info(format!(
            "Loading {} rows{}",
            table.len(),
            if dummy { " (dry run)" } else { "" }
        ));

        let outcome = self.repo.transaction(|repo| {
            let mut report = LoadReport::new(dummy);

            for (index, row) in table.rows.iter().enumerate() {
                // Header is line 1
                let line = index + 2;
                let outcome = processor.process(repo, assets, row, line);

                for warning in &outcome.warnings {
                    log_warning_indent(format!("Line {}: {}", line, warning), 1);
                    report.record_warning(line, warning);
                }

                match outcome.result {
                    Ok(id) => {
                        let verb = if outcome.updated { "Updated" } else { "Loaded" };
                        log_info_indent(format!("Line {}: {} '{}' (#{})", line, verb, outcome.label, id), 1);
                        report.record_loaded(id);
                    }
                    Err(RowError::Store(source)) if source.is_fatal() => {
                        log_error(format!("Line {}: {}", line, source));
                        report.finish();
                        return Err(SessionAbort::Failed(LoadError::Aborted {
                            row: line,
                            source,
                            report: Box::new(report),
                        }));
                    }
                    Err(e) => {
                        log_warning_indent(format!("Line {}: failed: {}", line, e), 1);
                        report.record_failure(line, row, &e);
                    }
                }
            }

            report.finish();
            if dummy {
                Err(SessionAbort::DryRun(report))
            } else {
                Ok(report)
            }
        });

        let report = match outcome {
            Ok(report) => report,
            Err(SessionAbort::DryRun(report)) => {
                log_info("Dry run: all changes rolled back");
                report
            }
            Err(SessionAbort::Failed(e)) => {
                log_error(format!("Load aborted: {}", e));
                return Err(e);
            }
        };

        log_success(format!(
            "Processed {} rows: {} loaded, {} failed, {} warnings",
            report.processed_count,
            report.loaded_count,
            report.failed_count,
            report.warnings.len()
        ));
        Ok(report)
    }
}
