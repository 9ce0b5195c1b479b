//! Catalog Registry - build operator catalogs once and reuse them
//!
//! Catalogs are keyed by target type and schema version. The registry is an
//! explicit value owned by the caller (CLI, server state, tests); nothing is
//! cached in global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::logs::log_info;
use crate::config::SchemaVersion;
use crate::schema::{OperatorCatalog, SchemaDescription, TargetType};

/// Registry of built operator catalogs
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    /// Built catalogs ((target, version) -> catalog)
    catalogs: HashMap<(TargetType, SchemaVersion), Arc<OperatorCatalog>>,
    /// Number of catalog builds performed
    builds: usize,
}

impl CatalogRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the catalog for a target type, building it on first use.
    ///
    /// `reload` forces a rebuild even if a catalog is cached. Returns `None`
    /// when the target type cannot be introspected.
    pub fn catalog(
        &mut self,
        target: TargetType,
        version: SchemaVersion,
        reload: bool,
    ) -> Option<Arc<OperatorCatalog>> {
        let key = (target, version);
        if !reload {
            if let Some(catalog) = self.catalogs.get(&key) {
                return Some(Arc::clone(catalog));
            }
        }

        let schema = SchemaDescription::introspect(target, version)?;
        let catalog = Arc::new(OperatorCatalog::build(&schema));
        self.builds += 1;
        log_info(format!(
            "Built operator catalog for {} (schema {}): {} operators",
            target,
            version,
            catalog.len()
        ));
        self.catalogs.insert(key, Arc::clone(&catalog));
        Some(catalog)
    }

    /// Convenience for the product catalog.
    pub fn product_catalog(&mut self, version: SchemaVersion, reload: bool) -> Arc<OperatorCatalog> {
        match self.catalog(TargetType::Product, version, reload) {
            Some(catalog) => catalog,
            // Product is always introspectable.
            None => Arc::new(OperatorCatalog::build(&crate::schema::product_schema(version))),
        }
    }

    /// Whether a catalog is cached
    pub fn contains(&self, target: TargetType, version: SchemaVersion) -> bool {
        self.catalogs.contains_key(&(target, version))
    }

    /// Number of builds performed so far
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Drop every cached catalog
    pub fn clear(&mut self) {
        self.catalogs.clear();
    }
}
