//! In-memory repository with snapshot transactions.
//!
//! `begin` clones every table, `rollback` restores the clone. Savepoints
//! stack further clones on top. Records are
//! validated against the embedded JSON schemas on save. The whole state can
//! be written to and read back from a JSON file, so a later load can update
//! what an earlier one created.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::Repository;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Id, OptionType, OptionValue, Product, ProductProperty, Property, ReferenceRecord, Taxon,
    Taxonomy, Variant,
};
use crate::schema::TargetType;
use crate::validation::{validate_product, validate_variant};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Tables {
    last_id: Id,
    products: BTreeMap<Id, Product>,
    variants: BTreeMap<Id, Variant>,
    option_types: BTreeMap<Id, OptionType>,
    option_values: BTreeMap<Id, OptionValue>,
    taxonomies: BTreeMap<Id, Taxonomy>,
    taxons: BTreeMap<Id, Taxon>,
    properties: BTreeMap<Id, Property>,
    product_properties: BTreeMap<Id, ProductProperty>,
    /// Generic reference data, keyed by target type name.
    references: BTreeMap<String, Vec<ReferenceRecord>>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }
}

/// Repository holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Tables,
    /// Tables as they were at `begin`.
    snapshot: Option<Tables>,
    /// Tables at each open savepoint, innermost last.
    savepoints: Vec<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a repository from a JSON snapshot file; a missing file gives an
    /// empty repository.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let tables: Tables = serde_json::from_str(&content)?;
        Ok(Self {
            tables,
            ..Self::default()
        })
    }

    /// Write the committed state to a JSON snapshot file.
    pub fn persist(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        if self.in_transaction() {
            return Err(StoreError::Transaction(
                "cannot persist while a transaction is open".into(),
            ));
        }
        let json = serde_json::to_string_pretty(&self.tables)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// The whole state as JSON.
    pub fn snapshot(&self) -> StoreResult<Value> {
        Ok(serde_json::to_value(&self.tables)?)
    }

    /// Add a reference record (shipping category, tax category, store...).
    pub fn seed_reference(&mut self, target: TargetType, name: &str, code: Option<&str>) -> ReferenceRecord {
        let record = ReferenceRecord {
            id: self.tables.next_id(),
            name: name.to_string(),
            code: code.map(str::to_string),
        };
        self.tables
            .references
            .entry(target.as_str().to_string())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some() || !self.savepoints.is_empty()
    }

    pub fn products(&self) -> Vec<&Product> {
        self.tables.products.values().collect()
    }

    pub fn count_products(&self) -> usize {
        self.tables.products.len()
    }

    pub fn count_option_values(&self) -> usize {
        self.tables.option_values.len()
    }

    pub fn option_types(&self) -> Vec<&OptionType> {
        self.tables.option_types.values().collect()
    }

    pub fn option_value(&self, id: Id) -> Option<&OptionValue> {
        self.tables.option_values.get(&id)
    }

    pub fn taxon(&self, id: Id) -> Option<&Taxon> {
        self.tables.taxons.get(&id)
    }

    pub fn taxonomies(&self) -> Vec<&Taxonomy> {
        self.tables.taxonomies.values().collect()
    }

    pub fn count_taxons(&self) -> usize {
        self.tables.taxons.len()
    }

    fn option_value_names(&self, variant: &Variant) -> Vec<String> {
        variant
            .option_value_ids
            .iter()
            .filter_map(|id| self.tables.option_values.get(id))
            .map(|v| v.name.clone())
            .collect()
    }

    /// Option value names of every non-master variant of a product.
    pub fn variant_options(&self, product_id: Id) -> Vec<Vec<String>> {
        self.tables
            .variants
            .values()
            .filter(|v| v.product_id == product_id && !v.is_master)
            .map(|v| self.option_value_names(v))
            .collect()
    }

    fn sku_taken(&self, sku: &str, except: Option<Id>) -> bool {
        self.tables
            .variants
            .values()
            .any(|v| v.id != except && v.sku.as_deref() == Some(sku))
    }

    fn sync_master(&mut self, product: &Product, product_id: Id) {
        if let Some(master) = self
            .tables
            .variants
            .values_mut()
            .find(|v| v.product_id == product_id && v.is_master)
        {
            master.sku = product.sku.clone();
            master.price = product.price;
        }
    }
}

/// Compare after coercing the cell like an assignment would, so `12.00`
/// matches a stored price of 12.
fn product_matches(product: &Product, field: &str, value: &str) -> bool {
    if field == "id" {
        return value.trim().parse::<Id>().ok() == product.id;
    }
    let mut normalized = Product::new();
    if normalized.assign(field, value).is_err() {
        return false;
    }
    match normalized.attribute(field) {
        Some(wanted) => product.attribute(field).as_deref() == Some(wanted.as_str()),
        None => false,
    }
}

impl Repository for MemoryRepository {
    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::Transaction("transaction already open".into()));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if !self.savepoints.is_empty() {
            return Err(StoreError::Transaction("commit with an open savepoint".into()));
        }
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("commit without open transaction".into()))
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::Transaction("rollback without open transaction".into()))?;
        self.savepoints.clear();
        self.tables = snapshot;
        Ok(())
    }

    fn savepoint(&mut self) -> StoreResult<()> {
        self.savepoints.push(self.tables.clone());
        Ok(())
    }

    fn release_savepoint(&mut self) -> StoreResult<()> {
        self.savepoints
            .pop()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("no savepoint to release".into()))
    }

    fn rollback_to_savepoint(&mut self) -> StoreResult<()> {
        let tables = self
            .savepoints
            .pop()
            .ok_or_else(|| StoreError::Transaction("no savepoint to roll back to".into()))?;
        self.tables = tables;
        Ok(())
    }

    fn find_product(&self, conditions: &[(String, String)]) -> StoreResult<Option<Product>> {
        for (field, _) in conditions {
            let known = field == "id" || Product::ATTRIBUTES.iter().any(|(name, _)| name == field);
            if !known {
                return Err(StoreError::UnsupportedCondition {
                    target: TargetType::Product,
                    field: field.clone(),
                });
            }
        }
        Ok(self
            .tables
            .products
            .values()
            .find(|p| conditions.iter().all(|(f, v)| product_matches(p, f, v)))
            .cloned())
    }

    fn save_product(&mut self, product: &mut Product) -> StoreResult<bool> {
        let value = serde_json::to_value(&*product)?;
        if let Err(errors) = validate_product(&value) {
            product.errors = errors;
            return Ok(false);
        }
        product.errors.clear();

        let id = match product.id {
            Some(id) if self.tables.products.contains_key(&id) => id,
            Some(id) => return Err(StoreError::NotFound { target: TargetType::Product, id }),
            None => self.tables.next_id(),
        };
        product.id = Some(id);
        self.tables.products.insert(id, product.clone());
        self.sync_master(product, id);
        Ok(true)
    }

    fn reload_product(&self, id: Id) -> StoreResult<Product> {
        self.tables
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { target: TargetType::Product, id })
    }

    fn variants_of(&self, product_id: Id) -> StoreResult<Vec<Variant>> {
        Ok(self
            .tables
            .variants
            .values()
            .filter(|v| v.product_id == product_id && !v.is_master)
            .cloned()
            .collect())
    }

    fn save_variant(&mut self, variant: &mut Variant) -> StoreResult<bool> {
        if !self.tables.products.contains_key(&variant.product_id) {
            return Err(StoreError::NotFound {
                target: TargetType::Product,
                id: variant.product_id,
            });
        }

        let value = serde_json::to_value(&*variant)?;
        let mut errors = validate_variant(&value).err().unwrap_or_default();
        if let Some(sku) = variant.sku.as_deref().filter(|s| !s.is_empty()) {
            if !variant.is_master && self.sku_taken(sku, variant.id) {
                errors.push(format!("sku '{}' has already been taken", sku));
            }
        }
        if !errors.is_empty() {
            variant.errors = errors;
            return Ok(false);
        }
        variant.errors.clear();

        let id = match variant.id {
            Some(id) if self.tables.variants.contains_key(&id) => id,
            Some(id) => return Err(StoreError::NotFound { target: TargetType::Variant, id }),
            None => self.tables.next_id(),
        };
        variant.id = Some(id);
        self.tables.variants.insert(id, variant.clone());
        Ok(true)
    }

    fn master_variant(&mut self, product_id: Id) -> StoreResult<Variant> {
        if let Some(master) = self
            .tables
            .variants
            .values()
            .find(|v| v.product_id == product_id && v.is_master)
        {
            return Ok(master.clone());
        }

        let product = self.reload_product(product_id)?;
        let id = self.tables.next_id();
        let mut master = Variant::from_product(&product, product_id, product.sku.clone().unwrap_or_default());
        master.id = Some(id);
        master.sku = product.sku.clone();
        master.is_master = true;
        self.tables.variants.insert(id, master.clone());
        Ok(master)
    }

    fn is_sku_taken(&self, sku: &str) -> StoreResult<bool> {
        Ok(self.sku_taken(sku, None))
    }

    fn find_option_type(&self, name: &str) -> StoreResult<Option<OptionType>> {
        Ok(self
            .tables
            .option_types
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    fn create_option_type(&mut self, name: &str, presentation: &str) -> StoreResult<OptionType> {
        let option_type = OptionType {
            id: self.tables.next_id(),
            name: name.to_string(),
            presentation: presentation.to_string(),
        };
        self.tables.option_types.insert(option_type.id, option_type.clone());
        Ok(option_type)
    }

    fn find_option_value(&self, name: &str, option_type_id: Id) -> StoreResult<Option<OptionValue>> {
        Ok(self
            .tables
            .option_values
            .values()
            .find(|v| v.name == name && v.option_type_id == option_type_id)
            .cloned())
    }

    fn create_option_value(
        &mut self,
        name: &str,
        presentation: &str,
        option_type_id: Id,
    ) -> StoreResult<OptionValue> {
        if !self.tables.option_types.contains_key(&option_type_id) {
            return Err(StoreError::NotFound {
                target: TargetType::OptionType,
                id: option_type_id,
            });
        }
        let value = OptionValue {
            id: self.tables.next_id(),
            name: name.to_string(),
            presentation: presentation.to_string(),
            option_type_id,
        };
        self.tables.option_values.insert(value.id, value.clone());
        Ok(value)
    }

    fn find_taxonomy(&self, name: &str) -> StoreResult<Option<Taxonomy>> {
        Ok(self
            .tables
            .taxonomies
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    fn create_taxonomy(&mut self, name: &str) -> StoreResult<Taxonomy> {
        let taxonomy_id = self.tables.next_id();
        let root_id = self.tables.next_id();
        let taxonomy = Taxonomy {
            id: taxonomy_id,
            name: name.to_string(),
            root_id,
        };
        self.tables.taxons.insert(
            root_id,
            Taxon {
                id: root_id,
                name: name.to_string(),
                parent_id: None,
                taxonomy_id,
            },
        );
        self.tables.taxonomies.insert(taxonomy_id, taxonomy.clone());
        Ok(taxonomy)
    }

    fn find_taxon(&self, name: &str, parent_id: Id, taxonomy_id: Id) -> StoreResult<Option<Taxon>> {
        Ok(self
            .tables
            .taxons
            .values()
            .find(|t| t.name == name && t.parent_id == Some(parent_id) && t.taxonomy_id == taxonomy_id)
            .cloned())
    }

    fn create_taxon(&mut self, name: &str, parent_id: Id, taxonomy_id: Id) -> StoreResult<Taxon> {
        if !self.tables.taxons.contains_key(&parent_id) {
            return Err(StoreError::NotFound {
                target: TargetType::Taxon,
                id: parent_id,
            });
        }
        let taxon = Taxon {
            id: self.tables.next_id(),
            name: name.to_string(),
            parent_id: Some(parent_id),
            taxonomy_id,
        };
        self.tables.taxons.insert(taxon.id, taxon.clone());
        Ok(taxon)
    }

    fn find_property(&self, name: &str) -> StoreResult<Option<Property>> {
        Ok(self
            .tables
            .properties
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    fn create_property(&mut self, name: &str, presentation: &str) -> StoreResult<Property> {
        let property = Property {
            id: self.tables.next_id(),
            name: name.to_string(),
            presentation: presentation.to_string(),
        };
        self.tables.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn product_properties_of(&self, product_id: Id) -> StoreResult<Vec<ProductProperty>> {
        Ok(self
            .tables
            .product_properties
            .values()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect())
    }

    fn save_product_property(&mut self, property: &mut ProductProperty) -> StoreResult<()> {
        if !self.tables.products.contains_key(&property.product_id) {
            return Err(StoreError::NotFound {
                target: TargetType::Product,
                id: property.product_id,
            });
        }
        let id = match property.id {
            Some(id) => id,
            None => self.tables.next_id(),
        };
        property.id = Some(id);
        self.tables.product_properties.insert(id, property.clone());
        Ok(())
    }

    fn find_reference(
        &self,
        target: TargetType,
        field: &str,
        value: &str,
    ) -> StoreResult<Option<ReferenceRecord>> {
        let records = match self.tables.references.get(target.as_str()) {
            Some(records) => records,
            None => return Ok(None),
        };
        let found = match field {
            "name" => records.iter().find(|r| r.name == value),
            "code" => records.iter().find(|r| r.code.as_deref() == Some(value)),
            "id" => records.iter().find(|r| r.id.to_string() == value),
            _ => {
                return Err(StoreError::UnsupportedCondition {
                    target,
                    field: field.to_string(),
                })
            }
        };
        Ok(found.cloned())
    }
}
