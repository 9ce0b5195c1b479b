//! Domain models for the product load.
//!
//! - [`Product`] - the root object built from each row
//! - [`Variant`] - sellable child of a product, defined by option values
//! - [`OptionType`] / [`OptionValue`] - shared variant axes (Size = Medium)
//! - [`Taxonomy`] / [`Taxon`] - category trees
//! - [`Property`] / [`ProductProperty`] - free key/value properties
//! - [`ReferenceRecord`] - generic named reference data (stores, categories)

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RowError, RowResult};

/// Identifier assigned by the persistence layer.
pub type Id = u64;

// =============================================================================
// Attribute Types
// =============================================================================

/// Scalar type of a product attribute, used for cell coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Text,
    Decimal,
    Integer,
    Date,
}

static DAY_FIRST_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("valid date regex"));

fn parse_decimal(field: &str, value: &str) -> RowResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowError::invalid(field, value, "expected a decimal number"))
}

fn parse_integer(field: &str, value: &str) -> RowResult<i64> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .or_else(|_| match trimmed.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 => Ok(f as i64),
            _ => Err(()),
        })
        .map_err(|_| RowError::invalid(field, value, "expected an integer"))
}

fn parse_date(field: &str, value: &str) -> RowResult<NaiveDate> {
    let trimmed = value.trim();
    let format = if DAY_FIRST_DATE.is_match(trimmed) {
        "%d/%m/%Y"
    } else {
        "%Y-%m-%d"
    };
    NaiveDate::parse_from_str(trimmed, format)
        .map_err(|_| RowError::invalid(field, value, "expected a date (YYYY-MM-DD or DD/MM/YYYY)"))
}

// =============================================================================
// Product
// =============================================================================

/// The root object: one per data row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: Option<Id>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub cost_price: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub available_on: Option<NaiveDate>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub permalink: Option<String>,
    pub count_on_hand: Option<i64>,
    pub shipping_category_id: Option<Id>,
    pub tax_category_id: Option<Id>,
    pub option_type_ids: Vec<Id>,
    pub taxon_ids: Vec<Id>,
    pub store_ids: Vec<Id>,
    /// Validation errors from the last rejected save.
    #[serde(skip)]
    pub errors: Vec<String>,
}

impl Product {
    /// Scalar attributes and their types.
    pub const ATTRIBUTES: &'static [(&'static str, AttributeType)] = &[
        ("name", AttributeType::Text),
        ("description", AttributeType::Text),
        ("sku", AttributeType::Text),
        ("price", AttributeType::Decimal),
        ("cost_price", AttributeType::Decimal),
        ("weight", AttributeType::Decimal),
        ("height", AttributeType::Decimal),
        ("width", AttributeType::Decimal),
        ("depth", AttributeType::Decimal),
        ("available_on", AttributeType::Date),
        ("meta_description", AttributeType::Text),
        ("meta_keywords", AttributeType::Text),
        ("permalink", AttributeType::Text),
        ("count_on_hand", AttributeType::Integer),
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Display label for logs.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.sku.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// Generic single-value assignment with type coercion.
    pub fn assign(&mut self, attribute: &str, value: &str) -> RowResult<()> {
        let text = || Some(value.trim().to_string());
        match attribute {
            "name" => self.name = text(),
            "description" => self.description = text(),
            "sku" => self.sku = text(),
            "price" => self.price = Some(parse_decimal(attribute, value)?),
            "cost_price" => self.cost_price = Some(parse_decimal(attribute, value)?),
            "weight" => self.weight = Some(parse_decimal(attribute, value)?),
            "height" => self.height = Some(parse_decimal(attribute, value)?),
            "width" => self.width = Some(parse_decimal(attribute, value)?),
            "depth" => self.depth = Some(parse_decimal(attribute, value)?),
            "available_on" => self.available_on = Some(parse_date(attribute, value)?),
            "meta_description" => self.meta_description = text(),
            "meta_keywords" => self.meta_keywords = text(),
            "permalink" => self.permalink = text(),
            "count_on_hand" => self.count_on_hand = Some(parse_integer(attribute, value)?),
            _ => {
                return Err(RowError::UnresolvedOperator {
                    operator: attribute.to_string(),
                    value: value.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Current value of a scalar attribute, as text.
    pub fn attribute(&self, attribute: &str) -> Option<String> {
        match attribute {
            "name" => self.name.clone(),
            "description" => self.description.clone(),
            "sku" => self.sku.clone(),
            "price" => self.price.map(|v| v.to_string()),
            "cost_price" => self.cost_price.map(|v| v.to_string()),
            "weight" => self.weight.map(|v| v.to_string()),
            "height" => self.height.map(|v| v.to_string()),
            "width" => self.width.map(|v| v.to_string()),
            "depth" => self.depth.map(|v| v.to_string()),
            "available_on" => self.available_on.map(|d| d.format("%Y-%m-%d").to_string()),
            "meta_description" => self.meta_description.clone(),
            "meta_keywords" => self.meta_keywords.clone(),
            "permalink" => self.permalink.clone(),
            "count_on_hand" => self.count_on_hand.map(|v| v.to_string()),
            _ => None,
        }
    }

    /// Parse a stock level the way `count_on_hand` cells are parsed.
    pub fn parse_stock(value: &str) -> RowResult<i64> {
        parse_integer("count_on_hand", value)
    }

    /// Parse a price the way `price` cells are parsed.
    pub fn parse_price(value: &str) -> RowResult<f64> {
        parse_decimal("price", value)
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A sellable variant of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    pub id: Option<Id>,
    pub product_id: Id,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub on_hand: Option<i64>,
    /// The master variant carries product-level price and images.
    pub is_master: bool,
    pub option_value_ids: Vec<Id>,
    #[serde(skip)]
    pub errors: Vec<String>,
}

impl Variant {
    /// New variant inheriting price and dimensions from its product.
    pub fn from_product(product: &Product, product_id: Id, sku: String) -> Self {
        Self {
            id: None,
            product_id,
            sku: Some(sku),
            price: product.price,
            weight: product.weight,
            height: product.height,
            width: product.width,
            depth: product.depth,
            on_hand: None,
            is_master: false,
            option_value_ids: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Same option values, ignoring order.
    pub fn has_option_values(&self, ids: &[Id]) -> bool {
        let mut mine = self.option_value_ids.clone();
        let mut theirs = ids.to_vec();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

// =============================================================================
// Option Types & Values
// =============================================================================

/// A variant axis, e.g. `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionType {
    pub id: Id,
    pub name: String,
    pub presentation: String,
}

/// A value on an axis, e.g. `medium` for `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionValue {
    pub id: Id,
    pub name: String,
    pub presentation: String,
    pub option_type_id: Id,
}

// =============================================================================
// Taxonomies
// =============================================================================

/// A category tree. Owns a root taxon with the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub id: Id,
    pub name: String,
    pub root_id: Id,
}

/// A node of a category tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxon {
    pub id: Id,
    pub name: String,
    pub parent_id: Option<Id>,
    pub taxonomy_id: Id,
}

// =============================================================================
// Properties
// =============================================================================

/// A property name shared between products, e.g. `material`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Id,
    pub name: String,
    pub presentation: String,
}

/// A property value owned by one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProperty {
    pub id: Option<Id>,
    pub product_id: Id,
    pub property_id: Id,
    pub value: Option<String>,
}

// =============================================================================
// Generic Reference Data
// =============================================================================

/// Named reference data targeted by plain to-one / to-many columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: Id,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_coerces_types() {
        let mut product = Product::new();
        product.assign("name", "  Ruby Mug ").unwrap();
        product.assign("price", "12.50").unwrap();
        product.assign("count_on_hand", "7").unwrap();
        product.assign("available_on", "2024-03-15").unwrap();

        assert_eq!(product.name.as_deref(), Some("Ruby Mug"));
        assert_eq!(product.price, Some(12.5));
        assert_eq!(product.count_on_hand, Some(7));
        assert_eq!(product.available_on, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_assign_day_first_date() {
        let mut product = Product::new();
        product.assign("available_on", "15/03/2024").unwrap();
        assert_eq!(product.available_on, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_assign_invalid_value() {
        let mut product = Product::new();
        let err = product.assign("price", "cheap").unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { ref field, .. } if field == "price"));
        assert!(product.price.is_none());
    }

    #[test]
    fn test_non_finite_decimals_rejected() {
        let mut product = Product::new();
        for value in ["inf", "-inf", "NaN", "infinity"] {
            assert!(product.assign("price", value).is_err(), "{} accepted", value);
        }
        assert!(product.price.is_none());
        assert!(Product::parse_price("1e400").is_err());
        assert!(Product::parse_stock("inf").is_err());
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert_eq!(Product::parse_stock("12.0").unwrap(), 12);
        assert!(Product::parse_stock("1.5").is_err());
    }

    #[test]
    fn test_unknown_attribute() {
        let mut product = Product::new();
        assert!(matches!(
            product.assign("colour", "red"),
            Err(RowError::UnresolvedOperator { .. })
        ));
    }

    #[test]
    fn test_attribute_roundtrip_for_every_declared_attribute() {
        let mut product = Product::new();
        for (name, ty) in Product::ATTRIBUTES {
            let value = match ty {
                AttributeType::Text => "text",
                AttributeType::Decimal => "1.5",
                AttributeType::Integer => "3",
                AttributeType::Date => "2024-01-02",
            };
            product.assign(name, value).unwrap();
            assert_eq!(product.attribute(name).as_deref(), Some(value), "{}", name);
        }
    }

    #[test]
    fn test_variant_inherits_product_dimensions() {
        let mut product = Product::new();
        product.price = Some(9.99);
        product.weight = Some(0.4);
        let variant = Variant::from_product(&product, 1, "MUG_1".into());
        assert_eq!(variant.price, Some(9.99));
        assert_eq!(variant.weight, Some(0.4));
        assert_eq!(variant.sku.as_deref(), Some("MUG_1"));
        assert!(!variant.is_master);
    }

    #[test]
    fn test_variant_option_value_set_comparison() {
        let mut variant = Variant::default();
        variant.option_value_ids = vec![3, 1];
        assert!(variant.has_option_values(&[1, 3]));
        assert!(!variant.has_option_values(&[1]));
    }
}
