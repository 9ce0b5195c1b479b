//! Target schema description and operator descriptors.
//!
//! A [`SchemaDescription`] lists what a target type exposes (scalar
//! attributes, to-one and to-many associations, pseudo fields). The
//! [`catalog::OperatorCatalog`] turns it into a lookup from normalized
//! header text to [`OperatorDescriptor`].

pub mod catalog;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SchemaVersion;
use crate::models::Product;

pub use catalog::OperatorCatalog;

// =============================================================================
// Target Types
// =============================================================================

/// Every entity type an operator can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Product,
    Variant,
    OptionType,
    OptionValue,
    Taxonomy,
    Taxon,
    Property,
    ProductProperty,
    Image,
    ShippingCategory,
    TaxCategory,
    Store,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Product => "product",
            TargetType::Variant => "variant",
            TargetType::OptionType => "option_type",
            TargetType::OptionValue => "option_value",
            TargetType::Taxonomy => "taxonomy",
            TargetType::Taxon => "taxon",
            TargetType::Property => "property",
            TargetType::ProductProperty => "product_property",
            TargetType::Image => "image",
            TargetType::ShippingCategory => "shipping_category",
            TargetType::TaxCategory => "tax_category",
            TargetType::Store => "store",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Operators
// =============================================================================

/// What kind of target a column maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// Scalar attribute of the root object.
    Attribute,
    /// Single reference to another record.
    ToOne,
    /// Collection of references or owned children.
    ToMany,
    /// Not backed by a schema field.
    Pseudo,
}

/// How a cell is applied, decided once when the catalog is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handler {
    /// Generic scalar assignment.
    Assign,
    /// Generic association lookup (to-one or to-many).
    Associate,
    /// Option types and variant expansion.
    OptionVariants,
    /// Taxon chains.
    Taxons,
    /// Property lists.
    Properties,
    /// Image attachment through the asset pipeline.
    Images,
    /// Per-variant prices.
    VariantPrice,
    /// Per-variant SKUs.
    VariantSku,
    /// Per-variant stock, falling back to product stock.
    Stock,
    /// Product price held outside the product columns.
    RootPrice,
    /// Force-included column nothing knows how to apply.
    Unhandled,
}

/// Immutable description of one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDescriptor {
    /// Canonical operator name (schema field or pseudo name).
    pub name: String,
    pub kind: OperatorKind,
    pub target_type: Option<TargetType>,
    /// Field used to look associations up when the cell names none.
    pub find_by_default: Option<String>,
    pub handler: Handler,
}

impl OperatorDescriptor {
    pub fn attribute(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OperatorKind::Attribute,
            target_type: None,
            find_by_default: None,
            handler: Handler::Assign,
        }
    }

    pub fn to_one(name: &str, target: TargetType, find_by: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OperatorKind::ToOne,
            target_type: Some(target),
            find_by_default: Some(find_by.to_string()),
            handler: Handler::Associate,
        }
    }

    pub fn to_many(name: &str, target: TargetType, find_by: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OperatorKind::ToMany,
            target_type: Some(target),
            find_by_default: Some(find_by.to_string()),
            handler: Handler::Associate,
        }
    }

    pub fn pseudo(name: &str, handler: Handler) -> Self {
        Self {
            name: name.to_string(),
            kind: OperatorKind::Pseudo,
            target_type: None,
            find_by_default: None,
            handler,
        }
    }

    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_target(mut self, target: TargetType) -> Self {
        self.target_type = Some(target);
        self
    }

    pub fn is_pseudo(&self) -> bool {
        self.kind == OperatorKind::Pseudo
    }
}

// =============================================================================
// Schema Description
// =============================================================================

/// Introspected shape of a target type.
#[derive(Debug, Clone)]
pub struct SchemaDescription {
    pub target: TargetType,
    pub version: SchemaVersion,
    pub operators: Vec<OperatorDescriptor>,
    /// Alternative header spellings: (alias, operator name).
    pub aliases: Vec<(&'static str, &'static str)>,
}

impl SchemaDescription {
    /// Describe a target type at a schema version.
    pub fn introspect(target: TargetType, version: SchemaVersion) -> Option<Self> {
        match target {
            TargetType::Product => Some(product_schema(version)),
            _ => None,
        }
    }

    /// Names of the pseudo operators the loader can process anyway.
    pub fn pseudo_names(&self) -> Vec<String> {
        self.operators
            .iter()
            .filter(|op| op.is_pseudo())
            .map(|op| op.name.clone())
            .collect()
    }
}

/// The product schema.
///
/// From 1.1 images live on the master variant so there is no `images`
/// association on the product; from 1.3 the same holds for `price`.
pub fn product_schema(version: SchemaVersion) -> SchemaDescription {
    let mut operators: Vec<OperatorDescriptor> = Product::ATTRIBUTES
        .iter()
        .filter(|(name, _)| !(version.price_on_master() && *name == "price"))
        .map(|(name, _)| match *name {
            "count_on_hand" => OperatorDescriptor::attribute(name).with_handler(Handler::Stock),
            _ => OperatorDescriptor::attribute(name),
        })
        .collect();

    operators.extend([
        OperatorDescriptor::to_one("shipping_category", TargetType::ShippingCategory, "name"),
        OperatorDescriptor::to_one("tax_category", TargetType::TaxCategory, "name"),
        OperatorDescriptor::to_many("option_types", TargetType::OptionType, "name")
            .with_handler(Handler::OptionVariants),
        OperatorDescriptor::to_many("taxons", TargetType::Taxon, "name")
            .with_handler(Handler::Taxons),
        OperatorDescriptor::to_many("product_properties", TargetType::ProductProperty, "name")
            .with_handler(Handler::Properties),
        OperatorDescriptor::to_many("stores", TargetType::Store, "name"),
        OperatorDescriptor::pseudo("variant_price", Handler::VariantPrice)
            .with_target(TargetType::Variant),
        OperatorDescriptor::pseudo("variant_sku", Handler::VariantSku)
            .with_target(TargetType::Variant),
    ]);

    if version.has_master_variant() {
        operators.push(
            OperatorDescriptor::pseudo("images", Handler::Images).with_target(TargetType::Image),
        );
    } else {
        operators.push(
            OperatorDescriptor::to_many("images", TargetType::Image, "attachment")
                .with_handler(Handler::Images),
        );
    }

    if version.price_on_master() {
        operators.push(OperatorDescriptor::pseudo("price", Handler::RootPrice));
    }

    SchemaDescription {
        target: TargetType::Product,
        version,
        operators,
        aliases: vec![
            ("variants", "option_types"),
            ("properties", "product_properties"),
            ("on_hand", "count_on_hand"),
            ("stock", "count_on_hand"),
            ("categories", "taxons"),
            ("master_price", "price"),
        ],
    }
}

/// Normalize header text: lowercase, runs of punctuation/space become `_`.
pub fn normalize_header(header: &str) -> String {
    let mut normalized = String::with_capacity(header.len());
    let mut pending_separator = false;
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    normalized
}
