//! Loading: rows to products, inside one transaction per file.
//!
//! - [`processor`] - per-row state machine and cell dispatch
//! - [`session`] - transaction, dry run, counters
//! - [`report`] - serializable outcome
//!
//! ```rust,ignore
//! use productload::{load_file, CatalogRegistry, LoadOptions, LocalAssets, MemoryRepository};
//!
//! let mut repo = MemoryRepository::new();
//! let mut assets = LocalAssets::new();
//! let mut registry = CatalogRegistry::new();
//! let report = load_file("products.csv", &mut repo, &mut assets, &mut registry, LoadOptions::default())?;
//! println!("{} loaded, {} failed", report.loaded_count, report.failed_count);
//! ```

pub mod processor;
pub mod report;
pub mod session;

use std::path::Path;

use crate::assets::AssetPipeline;
use crate::cache::CatalogRegistry;
use crate::config::LoadOptions;
use crate::error::LoadResult;
use crate::parser::{parse_file_auto, DataTable};
use crate::store::Repository;

pub use processor::{RowOutcome, RowProcessor};
pub use report::{LoadReport, RowFailure, RowWarning};
pub use session::LoadSession;

/// Load a parsed table with the catalog for the configured schema version.
pub fn load_table<R: Repository>(
    table: &DataTable,
    repo: &mut R,
    assets: &mut dyn AssetPipeline,
    registry: &mut CatalogRegistry,
    options: LoadOptions,
) -> LoadResult<LoadReport> {
    let catalog = registry.product_catalog(options.schema_version, options.reload_catalog);
    LoadSession::new(repo, assets, catalog, options).run(table)
}

/// Parse a CSV file (encoding and delimiter detected) and load it.
pub fn load_file<R: Repository>(
    path: impl AsRef<Path>,
    repo: &mut R,
    assets: &mut dyn AssetPipeline,
    registry: &mut CatalogRegistry,
    options: LoadOptions,
) -> LoadResult<LoadReport> {
    let table = parse_file_auto(path)?;
    load_table(&table, repo, assets, registry, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssets;
    use crate::store::MemoryRepository;
    use std::io::Write;

    #[test]
    fn test_load_file_end_to_end() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Name;SKU;Price;Variants;Variant SKU;Taxons;Properties;Images\n\
             Shirt;SH;20.00;size:S,M,L;SH-S|SH-M|SH-L;Clothing>Shirts;material:cotton;front.jpg|back.jpg\n\
             Mug;MUG;9.99;;;Kitchen>Mugs;;\n"
        )
        .unwrap();

        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();
        let mut registry = CatalogRegistry::new();

        let report = load_file(file.path(), &mut repo, &mut assets, &mut registry, LoadOptions::default()).unwrap();

        assert_eq!(report.loaded_count, 2, "{:?}", report.failures);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        let shirt = report.loaded_ids[0];
        let skus: Vec<_> = repo
            .variants_of(shirt)
            .unwrap()
            .into_iter()
            .filter_map(|v| v.sku)
            .collect();
        assert_eq!(skus, vec!["SH-S", "SH-M", "SH-L"]);
        assert_eq!(repo.product_properties_of(shirt).unwrap().len(), 1);
        assert_eq!(assets.attached().len(), 2);
        assert_eq!(registry.builds(), 1);
    }

    #[test]
    fn test_load_file_missing() {
        let mut repo = MemoryRepository::new();
        let mut assets = LocalAssets::new();
        let mut registry = CatalogRegistry::new();

        let err = load_file("/nonexistent.csv", &mut repo, &mut assets, &mut registry, LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, crate::error::LoadError::Csv(_)));
    }
}
