//! Row Processor - one data row to one saved product.
//!
//! ```text
//! Start -> Resolved -> DefaultsApplied -> FieldsApplied -> Saved | Failed -> Reset
//! ```
//!
//! Resolution finds the product to update through the match-by column, or
//! starts a new one. Cells are applied in column order; the first error
//! aborts the row. The product lives in the row's [`RowContext`] and is
//! dropped with it, so every row starts clean.

use crate::api::logs::{log_debug, log_warning_indent};
use crate::assets::AssetPipeline;
use crate::builders::broadcast::{broadcast, VariantField};
use crate::builders::{associations, images, properties, taxons, variants, RowContext};
use crate::config::{LoadOptions, SchemaVersion};
use crate::error::{LoadWarning, MappingResult, RowError, RowResult};
use crate::grammar::Delimiters;
use crate::mapping::{ColumnBinding, HeaderMapper};
use crate::models::{Id, Product};
use crate::schema::{Handler, OperatorCatalog, OperatorDescriptor, OperatorKind};
use crate::store::Repository;

/// Apply one non-empty cell through its operator's handler.
pub fn apply_cell(ctx: &mut RowContext<'_>, op: &OperatorDescriptor, cell: &str) -> RowResult<()> {
    match op.handler {
        Handler::Assign => ctx.product.assign(&op.name, cell),
        Handler::RootPrice => ctx.product.assign("price", cell),
        Handler::Associate => associations::associate(ctx, op, cell),
        Handler::OptionVariants => variants::build_variants(ctx, cell).map(drop),
        Handler::Taxons => taxons::attach_taxons(ctx, cell).map(drop),
        Handler::Properties => properties::apply_properties(ctx, cell).map(drop),
        Handler::Images => images::attach_images(ctx, cell).map(drop),
        Handler::VariantPrice => broadcast(ctx, VariantField::Price, cell).map(drop),
        Handler::VariantSku => broadcast(ctx, VariantField::Sku, cell).map(drop),
        Handler::Stock => broadcast(ctx, VariantField::Stock, cell).map(drop),
        Handler::Unhandled => Err(RowError::UnresolvedOperator {
            operator: op.name.clone(),
            value: cell.to_string(),
        }),
    }
}

/// Whether applying the operator saves the product first.
fn needs_persisted_product(op: &OperatorDescriptor) -> bool {
    match op.handler {
        Handler::Assign | Handler::RootPrice | Handler::Unhandled => false,
        Handler::Associate => op.kind == OperatorKind::ToMany,
        _ => true,
    }
}

/// Result of processing one row.
#[derive(Debug)]
pub struct RowOutcome {
    pub result: RowResult<Id>,
    pub warnings: Vec<LoadWarning>,
    /// Product label, for logs.
    pub label: String,
    /// An existing product was matched and updated.
    pub updated: bool,
}

impl RowOutcome {
    fn failed(error: RowError) -> Self {
        Self {
            result: Err(error),
            warnings: Vec::new(),
            label: String::new(),
            updated: false,
        }
    }
}

struct MatchColumn {
    column_index: usize,
    attribute: String,
}

struct DefaultValue {
    operator: OperatorDescriptor,
    value: String,
    /// Applied after the row's cells because it needs a saved product.
    deferred: bool,
}

/// Processes rows against a fixed set of bindings.
pub struct RowProcessor<'a> {
    bindings: &'a [ColumnBinding],
    match_column: Option<MatchColumn>,
    defaults: Vec<DefaultValue>,
    delimiters: &'a Delimiters,
    version: SchemaVersion,
    verbose: bool,
}

impl<'a> RowProcessor<'a> {
    /// Fails when the match-by column is configured but not bound.
    pub fn new(
        catalog: &OperatorCatalog,
        bindings: &'a [ColumnBinding],
        options: &'a LoadOptions,
    ) -> MappingResult<Self> {
        let mapper = HeaderMapper::new(catalog);

        let match_column = match &options.match_by {
            Some(column) => {
                let binding = mapper.match_binding(bindings, column)?;
                Some(MatchColumn {
                    column_index: binding.column_index,
                    attribute: binding.operator.name.clone(),
                })
            }
            None => None,
        };

        let mut defaults = Vec::new();
        for (column, value) in &options.defaults {
            match catalog.resolve(column) {
                Some(op) => defaults.push(DefaultValue {
                    deferred: needs_persisted_product(op),
                    operator: op.clone(),
                    value: value.clone(),
                }),
                None => log_warning_indent(format!("Default for unknown column '{}' ignored", column), 1),
            }
        }

        Ok(Self {
            bindings,
            match_column,
            defaults,
            delimiters: &options.delimiters,
            version: options.schema_version,
            verbose: options.verbose,
        })
    }

    pub fn bindings(&self) -> &[ColumnBinding] {
        self.bindings
    }

    /// Process one row. `line` is the row's line in the file, for logs.
    ///
    /// The row runs inside a store savepoint: a failed row leaves nothing
    /// behind, not even the variants or taxons it created before failing.
    pub fn process(
        &self,
        repo: &mut dyn Repository,
        assets: &mut dyn AssetPipeline,
        row: &[String],
        line: usize,
    ) -> RowOutcome {
        if let Err(e) = repo.savepoint() {
            return RowOutcome::failed(e.into());
        }

        let mut outcome = self.run(repo, assets, row, line);

        let settled = match outcome.result {
            Ok(_) => repo.release_savepoint(),
            Err(_) => repo.rollback_to_savepoint(),
        };
        if let Err(e) = settled {
            outcome.result = Err(e.into());
        }
        outcome
    }

    fn run(&self, repo: &mut dyn Repository, assets: &mut dyn AssetPipeline, row: &[String], line: usize) -> RowOutcome {
        let (product, updated) = match self.resolve(repo, row) {
            Ok(resolved) => resolved,
            Err(e) => return RowOutcome::failed(e),
        };

        let mut ctx = RowContext::new(repo, assets, product, self.delimiters, self.version);
        let result = self.apply(&mut ctx, row, line);

        RowOutcome {
            label: ctx.product.label().to_string(),
            result,
            warnings: ctx.warnings,
            updated,
        }
    }

    /// The product to update, or a new one.
    fn resolve(&self, repo: &dyn Repository, row: &[String]) -> RowResult<(Product, bool)> {
        let Some(matcher) = &self.match_column else {
            return Ok((Product::new(), false));
        };
        let key = cell(row, matcher.column_index);
        if key.is_empty() {
            return Ok((Product::new(), false));
        }
        let conditions = [(matcher.attribute.clone(), key.to_string())];
        Ok(match repo.find_product(&conditions)? {
            Some(existing) => (existing, true),
            None => (Product::new(), false),
        })
    }

    fn apply(&self, ctx: &mut RowContext<'_>, row: &[String], line: usize) -> RowResult<Id> {
        for default in self.defaults.iter().filter(|d| !d.deferred) {
            self.apply_default(ctx, default, row)?;
        }

        for binding in self.bindings {
            let value = cell(row, binding.column_index);
            if value.is_empty() {
                continue;
            }
            if self.verbose {
                log_debug(format!("line {}: {} <- '{}'", line, binding.operator.name, value));
            }
            apply_cell(ctx, &binding.operator, value)?;
        }

        for default in self.defaults.iter().filter(|d| d.deferred) {
            self.apply_default(ctx, default, row)?;
        }

        ctx.save_product()
    }

    fn apply_default(&self, ctx: &mut RowContext<'_>, default: &DefaultValue, row: &[String]) -> RowResult<()> {
        let has_cell = self
            .bindings
            .iter()
            .any(|b| b.operator.name == default.operator.name && !cell(row, b.column_index).is_empty());
        if has_cell {
            return Ok(());
        }
        apply_cell(ctx, &default.operator, &default.value)
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssets;
    use crate::error::MappingError;
    use crate::schema::product_schema;
    use crate::store::MemoryRepository;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    struct Setup {
        catalog: OperatorCatalog,
        bindings: Vec<ColumnBinding>,
        options: LoadOptions,
    }

    fn setup(headers: &[&str], options: LoadOptions) -> Setup {
        let catalog = OperatorCatalog::build(&product_schema(options.schema_version));
        let mut mapping = options.mapping();
        mapping.include_all = true;
        let bindings = HeaderMapper::new(&catalog).map(&row(headers), &mapping).unwrap();
        Setup {
            catalog,
            bindings,
            options,
        }
    }

    #[test]
    fn test_new_product_from_row() {
        let s = setup(&["Name", "SKU", "Price", "Taxons"], LoadOptions::default());
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(
            &mut repo,
            &mut assets,
            &row(&["Mug", "MUG", "9.99", "Kitchen>Mugs"]),
            2,
        );

        let id = outcome.result.unwrap();
        let product = repo.reload_product(id).unwrap();
        assert_eq!(product.price, Some(9.99));
        assert_eq!(product.taxon_ids.len(), 1);
        assert_eq!(outcome.label, "Mug");
        assert!(!outcome.updated);
    }

    #[test]
    fn test_empty_cells_skipped() {
        let s = setup(&["Name", "Cost Price"], LoadOptions::default());
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(&mut repo, &mut assets, &row(&["Mug", "  "]), 2);
        let product = repo.reload_product(outcome.result.unwrap()).unwrap();
        assert!(product.cost_price.is_none());
    }

    #[test]
    fn test_defaults_fill_missing_cells_only() {
        let options = LoadOptions::default().with_default("Description", "No description");
        let s = setup(&["Name", "Description"], options);
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let first = processor.process(&mut repo, &mut assets, &row(&["Mug", ""]), 2);
        let second = processor.process(&mut repo, &mut assets, &row(&["Cap", "Blue cap"]), 3);

        let first = repo.reload_product(first.result.unwrap()).unwrap();
        let second = repo.reload_product(second.result.unwrap()).unwrap();
        assert_eq!(first.description.as_deref(), Some("No description"));
        assert_eq!(second.description.as_deref(), Some("Blue cap"));
    }

    #[test]
    fn test_association_default_applied_after_cells() {
        let options = LoadOptions::default().with_default("Taxons", "Catalog>Unsorted");
        let s = setup(&["Name"], options);
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(&mut repo, &mut assets, &row(&["Mug"]), 2);
        let product = repo.reload_product(outcome.result.unwrap()).unwrap();
        assert_eq!(product.taxon_ids.len(), 1);
    }

    #[test]
    fn test_match_by_updates_existing_product() {
        let options = LoadOptions::default().with_match_by("SKU");
        let s = setup(&["SKU", "Name", "Price"], options);
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let created = processor.process(&mut repo, &mut assets, &row(&["MUG", "Mug", "9.99"]), 2);
        let updated = processor.process(&mut repo, &mut assets, &row(&["MUG", "Big Mug", "12.00"]), 3);

        assert!(updated.updated);
        assert_eq!(created.result.unwrap(), updated.result.unwrap());
        assert_eq!(repo.count_products(), 1);
        assert_eq!(repo.products()[0].name.as_deref(), Some("Big Mug"));
    }

    #[test]
    fn test_match_column_must_be_bound() {
        let options = LoadOptions::default().with_match_by("Permalink");
        let s = setup(&["Name"], options);
        let err = RowProcessor::new(&s.catalog, &s.bindings, &s.options).err();
        assert_eq!(err, Some(MappingError::MatchColumnMissing("Permalink".into())));
    }

    #[test]
    fn test_failure_keeps_warnings_and_discards_product() {
        let s = setup(&["Name", "Variant Price", "Price"], LoadOptions::default());
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(&mut repo, &mut assets, &row(&["Mug", "1.00", "free"]), 2);

        assert!(matches!(outcome.result, Err(RowError::InvalidValue { .. })));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(repo.count_products(), 0);
    }

    #[test]
    fn test_failed_row_discards_earlier_writes() {
        let s = setup(&["Name", "SKU", "Variants", "Cost Price"], LoadOptions::default());
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(&mut repo, &mut assets, &row(&["Shirt", "SH", "size:S|size:M", "cheap"]), 2);

        assert!(outcome.result.is_err());
        assert_eq!(repo.count_products(), 0);
        assert!(repo.find_option_type("size").unwrap().is_none());
        assert!(!repo.is_sku_taken("SH_1").unwrap());
        assert!(!repo.in_transaction());
    }

    #[test]
    fn test_successful_row_releases_savepoint() {
        let s = setup(&["Name", "SKU", "Variants"], LoadOptions::default());
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(&mut repo, &mut assets, &row(&["Shirt", "SH", "size:S|size:M"]), 2);

        assert!(outcome.result.is_ok());
        assert_eq!(repo.count_products(), 1);
        assert!(repo.is_sku_taken("SH_2").unwrap());
        assert!(!repo.in_transaction());
    }

    #[test]
    fn test_unhandled_forced_column_fails_row() {
        let mut options = LoadOptions::default();
        options.force_inclusion = vec!["Barcode".into()];
        let s = setup(&["Name", "Barcode"], options);
        let processor = RowProcessor::new(&s.catalog, &s.bindings, &s.options).unwrap();
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();

        let outcome = processor.process(&mut repo, &mut assets, &row(&["Mug", "4006381333931"]), 2);
        assert!(matches!(outcome.result, Err(RowError::UnresolvedOperator { .. })));

        // An empty unhandled cell is simply skipped
        let outcome = processor.process(&mut repo, &mut assets, &row(&["Mug", ""]), 3);
        assert!(outcome.result.is_ok());
    }
}
