//! JSON Schema validation for records before they are saved.
//!
//! Schemas (JSON Schema Draft 7) are embedded at compile time from the
//! `schemas/` directory:
//! - `product.json` - a product needs a non-empty name; measures and prices
//!   are non-negative
//! - `variant.json` - a variant belongs to a product; stock is an integer
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use productload::validation::validate_product;
//!
//! assert!(validate_product(&json!({ "name": "Ruby Mug", "price": 9.99 })).is_ok());
//! assert!(validate_product(&json!({ "name": "" })).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static PRODUCT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/product.json")).expect("Invalid embedded schema")
});

static VARIANT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/variant.json")).expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// Returns every validation error message when the value is invalid.
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use productload::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a serialized product.
pub fn validate_product(data: &Value) -> Result<(), Vec<String>> {
    validate(&PRODUCT_SCHEMA, data)
}

/// Validate a serialized variant.
pub fn validate_variant(data: &Value) -> Result<(), Vec<String>> {
    validate(&VARIANT_SCHEMA, data)
}
