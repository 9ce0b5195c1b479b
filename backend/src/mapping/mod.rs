//! Header Mapper - bind header cells to operators.
//!
//! Produces one [`ColumnBinding`] per mapped header, in file-column order.
//! Column order is mutation order, so a file should list the columns the
//! product's first save depends on (name, sku, price) before association
//! columns.

use serde::Serialize;
use std::collections::HashSet;

use crate::api::logs::log_warning_indent;
use crate::config::MappingOptions;
use crate::error::{MappingError, MappingResult};
use crate::schema::{normalize_header, Handler, OperatorCatalog, OperatorDescriptor, OperatorKind};

/// A header cell bound to the operator that applies its cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnBinding {
    /// Zero-based index of the column in the file.
    pub column_index: usize,
    /// Header text as it appears in the file.
    pub header: String,
    pub operator: OperatorDescriptor,
}

/// Maps a header row against one operator catalog.
pub struct HeaderMapper<'a> {
    catalog: &'a OperatorCatalog,
}

impl<'a> HeaderMapper<'a> {
    pub fn new(catalog: &'a OperatorCatalog) -> Self {
        Self { catalog }
    }

    /// Bind every mappable header.
    ///
    /// Fails when the header row is empty, when a mandatory column is not
    /// bound, or (strict mode) when any header cannot be mapped.
    pub fn map(&self, headers: &[String], options: &MappingOptions) -> MappingResult<Vec<ColumnBinding>> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(MappingError::EmptyHeader);
        }

        let forced: HashSet<String> = options
            .force_inclusion
            .iter()
            .map(|c| normalize_header(c))
            .collect();

        let mut bindings = Vec::new();
        for (column_index, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header);
            if normalized.is_empty() {
                continue;
            }

            let operator = match self.catalog.resolve(header) {
                Some(op) if op.kind != OperatorKind::Pseudo => Some(op.clone()),
                Some(op) => {
                    let included = options.include_all
                        || forced.contains(&normalized)
                        || forced.contains(&op.name);
                    included.then(|| op.clone())
                }
                None if forced.contains(&normalized) => {
                    Some(OperatorDescriptor::pseudo(&normalized, Handler::Unhandled))
                }
                None => None,
            };

            match operator {
                Some(operator) => bindings.push(ColumnBinding {
                    column_index,
                    header: header.trim().to_string(),
                    operator,
                }),
                None if options.strict => {
                    return Err(MappingError::UnmappableColumn {
                        column: column_index,
                        header: header.clone(),
                    })
                }
                None => log_warning_indent(format!("Column '{}' not mapped, skipped", header.trim()), 1),
            }
        }

        let missing: Vec<String> = options
            .mandatory
            .iter()
            .filter(|column| self.find(&bindings, column).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MappingError::MissingMandatoryColumn(missing));
        }

        Ok(bindings)
    }

    /// The binding for a configured column name.
    ///
    /// Matches the header text in normalized form first, then the operator
    /// the name resolves to (`"Stock"` finds a `count_on_hand` column).
    pub fn find<'b>(&self, bindings: &'b [ColumnBinding], column: &str) -> Option<&'b ColumnBinding> {
        let normalized = normalize_header(column);
        if normalized.is_empty() {
            return None;
        }
        bindings
            .iter()
            .find(|b| normalize_header(&b.header) == normalized)
            .or_else(|| {
                let operator = self.catalog.resolve(column)?;
                bindings.iter().find(|b| b.operator.name == operator.name)
            })
    }

    /// The binding for the match-by column, which must be mapped.
    pub fn match_binding<'b>(&self, bindings: &'b [ColumnBinding], column: &str) -> MappingResult<&'b ColumnBinding> {
        self.find(bindings, column)
            .ok_or_else(|| MappingError::MatchColumnMissing(column.to_string()))
    }
}
