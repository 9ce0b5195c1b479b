//! Persistence collaborator.
//!
//! The loader only talks to storage through [`Repository`]. Reference data
//! (option types, taxonomies, properties) is found-or-created through the
//! helpers in [`reference`], which assume a single writer.
//!
//! [`MemoryRepository`] is the bundled implementation: in-memory tables with
//! snapshot transactions and optional JSON file persistence.

pub mod memory;
pub mod reference;

use crate::api::logs::log_error;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Id, OptionType, OptionValue, Product, ProductProperty, Property, ReferenceRecord, Taxon,
    Taxonomy, Variant,
};
use crate::schema::TargetType;

pub use memory::MemoryRepository;

/// Attribute equality conditions, all of which must hold.
pub type Conditions = Vec<(String, String)>;

/// Storage for the product graph.
pub trait Repository {
    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;

    /// Mark a point that a later `rollback_to_savepoint` returns to.
    /// Savepoints nest.
    fn savepoint(&mut self) -> StoreResult<()>;
    /// Keep everything written since the innermost savepoint.
    fn release_savepoint(&mut self) -> StoreResult<()>;
    /// Undo everything written since the innermost savepoint.
    fn rollback_to_savepoint(&mut self) -> StoreResult<()>;

    /// Run `body` in a transaction: commit on `Ok`, roll back on `Err`.
    fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.begin()?;
        match body(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.rollback() {
                    log_error(format!("Rollback failed: {}", rollback_error));
                }
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Products & variants
    // -------------------------------------------------------------------------

    /// First product matching every condition.
    fn find_product(&self, conditions: &[(String, String)]) -> StoreResult<Option<Product>>;

    /// Insert or update. Returns `false` and fills `product.errors` when the
    /// record is rejected.
    fn save_product(&mut self, product: &mut Product) -> StoreResult<bool>;

    fn reload_product(&self, id: Id) -> StoreResult<Product>;

    /// Non-master variants of a product, in creation order.
    fn variants_of(&self, product_id: Id) -> StoreResult<Vec<Variant>>;

    /// Insert or update. Returns `false` and fills `variant.errors` when the
    /// record is rejected.
    fn save_variant(&mut self, variant: &mut Variant) -> StoreResult<bool>;

    /// The product's master variant, created on first access.
    fn master_variant(&mut self, product_id: Id) -> StoreResult<Variant>;

    /// Some variant, of any product, already uses this SKU.
    fn is_sku_taken(&self, sku: &str) -> StoreResult<bool>;

    // -------------------------------------------------------------------------
    // Options
    // -------------------------------------------------------------------------

    fn find_option_type(&self, name: &str) -> StoreResult<Option<OptionType>>;
    fn create_option_type(&mut self, name: &str, presentation: &str) -> StoreResult<OptionType>;

    fn find_option_value(&self, name: &str, option_type_id: Id) -> StoreResult<Option<OptionValue>>;
    fn create_option_value(
        &mut self,
        name: &str,
        presentation: &str,
        option_type_id: Id,
    ) -> StoreResult<OptionValue>;

    // -------------------------------------------------------------------------
    // Taxonomies
    // -------------------------------------------------------------------------

    fn find_taxonomy(&self, name: &str) -> StoreResult<Option<Taxonomy>>;

    /// Create a taxonomy together with its root taxon.
    fn create_taxonomy(&mut self, name: &str) -> StoreResult<Taxonomy>;

    fn find_taxon(&self, name: &str, parent_id: Id, taxonomy_id: Id) -> StoreResult<Option<Taxon>>;
    fn create_taxon(&mut self, name: &str, parent_id: Id, taxonomy_id: Id) -> StoreResult<Taxon>;

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    fn find_property(&self, name: &str) -> StoreResult<Option<Property>>;
    fn create_property(&mut self, name: &str, presentation: &str) -> StoreResult<Property>;

    fn product_properties_of(&self, product_id: Id) -> StoreResult<Vec<ProductProperty>>;
    fn save_product_property(&mut self, property: &mut ProductProperty) -> StoreResult<()>;

    // -------------------------------------------------------------------------
    // Generic reference data
    // -------------------------------------------------------------------------

    /// Look up a reference record of `target` by `name`, `code` or `id`.
    fn find_reference(
        &self,
        target: TargetType,
        field: &str,
        value: &str,
    ) -> StoreResult<Option<ReferenceRecord>>;
}
