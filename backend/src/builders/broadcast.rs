//! Per-variant fields: price, SKU and stock.
//!
//! With variants the cell must hold exactly one entry per variant, split on
//! the association delimiter, applied in variant order. Any other count
//! assigns nothing and records a warning.

use std::collections::HashSet;

use crate::error::{LoadWarning, RowError, RowResult};
use crate::models::{Product, Variant};

use super::RowContext;

/// Which variant field a column sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantField {
    Price,
    Sku,
    Stock,
}

impl VariantField {
    pub fn name(&self) -> &'static str {
        match self {
            VariantField::Price => "price",
            VariantField::Sku => "sku",
            VariantField::Stock => "stock",
        }
    }

    fn apply(&self, variant: &mut Variant, value: &str) -> RowResult<()> {
        match self {
            VariantField::Price => variant.price = Some(Product::parse_price(value)?),
            VariantField::Sku => variant.sku = Some(value.to_string()),
            VariantField::Stock => variant.on_hand = Some(Product::parse_stock(value)?),
        }
        Ok(())
    }
}

/// Apply a per-variant cell. Returns the number of variants updated.
pub fn broadcast(ctx: &mut RowContext<'_>, field: VariantField, cell: &str) -> RowResult<usize> {
    if field == VariantField::Stock {
        ctx.ensure_persisted("stock")?;
    }

    let values = ctx.delimiters.split_associations(cell);
    if values.is_empty() {
        return Ok(0);
    }

    let variants = match ctx.product.id {
        Some(id) => ctx.repo.variants_of(id)?,
        None => Vec::new(),
    };

    if variants.is_empty() {
        return fall_back(ctx, field, &values);
    }

    if values.len() != variants.len() {
        ctx.warn(LoadWarning::VariantFieldCountMismatch {
            field: field.name().to_string(),
            supplied: values.len(),
            variants: variants.len(),
        });
        return Ok(0);
    }

    // Parse and check everything before saving anything.
    if field == VariantField::Sku {
        check_skus(ctx, &variants, &values)?;
    }
    let mut updated = Vec::with_capacity(variants.len());
    for (mut variant, value) in variants.into_iter().zip(&values) {
        field.apply(&mut variant, value)?;
        updated.push(variant);
    }

    let count = updated.len();
    for mut variant in updated {
        if !ctx.repo.save_variant(&mut variant)? {
            return Err(RowError::SaveValidationFailed {
                errors: variant.errors,
            });
        }
    }
    Ok(count)
}

/// Reject SKUs repeated within the cell or held by another product's variant.
fn check_skus(ctx: &RowContext<'_>, variants: &[Variant], values: &[String]) -> RowResult<()> {
    let own: HashSet<&str> = variants.iter().filter_map(|v| v.sku.as_deref()).collect();
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    for sku in values {
        if !seen.insert(sku.as_str()) {
            errors.push(format!("sku '{}' is given to more than one variant", sku));
        } else if !own.contains(sku.as_str()) && ctx.repo.is_sku_taken(sku)? {
            errors.push(format!("sku '{}' has already been taken", sku));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(RowError::SaveValidationFailed { errors })
    }
}

/// No variants: stock goes to the product, price and SKU are ignored.
fn fall_back(ctx: &mut RowContext<'_>, field: VariantField, values: &[String]) -> RowResult<usize> {
    match field {
        VariantField::Stock => {
            ctx.product.count_on_hand = Some(Product::parse_stock(&values[0])?);
            if values.len() > 1 {
                ctx.warn(LoadWarning::StockValuesTruncated {
                    supplied: values.len(),
                });
            }
        }
        VariantField::Price | VariantField::Sku => ctx.warn(LoadWarning::NoVariants {
            field: format!("variant_{}", field.name()),
        }),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::Fixture;
    use crate::builders::variants::build_variants;

    #[test]
    fn test_prices_assigned_positionally() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");
        build_variants(&mut ctx, "size:S,M,L").unwrap();

        assert_eq!(broadcast(&mut ctx, VariantField::Price, "9.99|12.99|15.99").unwrap(), 3);

        let product_id = ctx.product.id.unwrap();
        let prices: Vec<_> = ctx
            .repo
            .variants_of(product_id)
            .unwrap()
            .iter()
            .map(|v| v.price)
            .collect();
        assert_eq!(prices, vec![Some(9.99), Some(12.99), Some(15.99)]);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_count_mismatch_assigns_nothing() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");
        ctx.product.price = Some(5.0);
        build_variants(&mut ctx, "size:S,M,L").unwrap();

        assert_eq!(broadcast(&mut ctx, VariantField::Price, "9.99|12.99").unwrap(), 0);

        let product_id = ctx.product.id.unwrap();
        let variants = ctx.repo.variants_of(product_id).unwrap();
        assert!(variants.iter().all(|v| v.price == Some(5.0)));
        assert_eq!(
            ctx.warnings,
            vec![LoadWarning::VariantFieldCountMismatch {
                field: "price".into(),
                supplied: 2,
                variants: 3,
            }]
        );
    }

    #[test]
    fn test_skus_and_stock() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");
        build_variants(&mut ctx, "size:S,M").unwrap();

        broadcast(&mut ctx, VariantField::Sku, "SH-S|SH-M").unwrap();
        broadcast(&mut ctx, VariantField::Stock, "4|0").unwrap();

        let product_id = ctx.product.id.unwrap();
        let variants = ctx.repo.variants_of(product_id).unwrap();
        assert_eq!(variants[0].sku.as_deref(), Some("SH-S"));
        assert_eq!(variants[1].on_hand, Some(0));
    }

    #[test]
    fn test_bad_value_fails_before_any_save() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");
        build_variants(&mut ctx, "size:S,M").unwrap();

        assert!(matches!(
            broadcast(&mut ctx, VariantField::Price, "1.00|lots"),
            Err(RowError::InvalidValue { .. })
        ));
        let product_id = ctx.product.id.unwrap();
        assert!(ctx
            .repo
            .variants_of(product_id)
            .unwrap()
            .iter()
            .all(|v| v.price.is_none()));
    }

    fn skus(ctx: &RowContext<'_>) -> Vec<String> {
        let product_id = ctx.product.id.unwrap();
        ctx.repo
            .variants_of(product_id)
            .unwrap()
            .into_iter()
            .filter_map(|v| v.sku)
            .collect()
    }

    #[test]
    fn test_repeated_sku_saves_nothing() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");
        build_variants(&mut ctx, "size:S,M").unwrap();

        let err = broadcast(&mut ctx, VariantField::Sku, "X|X").unwrap_err();

        assert!(matches!(err, RowError::SaveValidationFailed { ref errors } if errors.len() == 1));
        assert_eq!(skus(&ctx), vec!["SHIRT_1", "SHIRT_2"]);
    }

    #[test]
    fn test_sku_of_other_product_saves_nothing() {
        let mut fixture = Fixture::new();
        {
            let mut ctx = fixture.context("Mug", "MUG");
            build_variants(&mut ctx, "size:S,M").unwrap();
        }
        let mut ctx = fixture.context("Shirt", "SHIRT");
        build_variants(&mut ctx, "size:S,M").unwrap();

        assert!(matches!(
            broadcast(&mut ctx, VariantField::Sku, "SH-S|MUG_2"),
            Err(RowError::SaveValidationFailed { .. })
        ));
        assert_eq!(skus(&ctx), vec!["SHIRT_1", "SHIRT_2"]);

        // Keeping a variant's own SKU is fine
        assert_eq!(broadcast(&mut ctx, VariantField::Sku, "SHIRT_1|SH-M").unwrap(), 2);
        assert_eq!(skus(&ctx), vec!["SHIRT_1", "SH-M"]);
    }

    #[test]
    fn test_stock_without_variants_goes_to_product() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Mug", "MUG");

        broadcast(&mut ctx, VariantField::Stock, "12|3").unwrap();

        assert!(ctx.product.is_persisted());
        assert_eq!(ctx.product.count_on_hand, Some(12));
        assert_eq!(ctx.warnings, vec![LoadWarning::StockValuesTruncated { supplied: 2 }]);
    }

    #[test]
    fn test_price_without_variants_warns() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Mug", "MUG");

        assert_eq!(broadcast(&mut ctx, VariantField::Price, "9.99").unwrap(), 0);
        assert!(!ctx.product.is_persisted());
        assert_eq!(
            ctx.warnings,
            vec![LoadWarning::NoVariants { field: "variant_price".into() }]
        );
    }
}
