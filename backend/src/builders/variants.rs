//! Option types and variant expansion.
//!
//! A cell lists variant specs separated by the association delimiter. Each
//! variant spec lists option axes separated by the facet delimiter, each axis being
//! `type:value,value...`:
//!
//! ```text
//! size:S,M,L;colour:red,green,blue|size:XL
//! ```
//!
//! Within one variant spec the axis with the most values leads. Lead value `i` is
//! combined with value `i` of every axis of the same length, and with the
//! first value of any shorter axis. The cell above yields S/red, M/green,
//! L/blue and XL.

use crate::error::{RowError, RowResult};
use crate::models::{Id, OptionType, Variant};
use crate::store::reference::{find_or_create_option_type, find_or_create_option_value};

use super::RowContext;

/// One option axis of a variant spec: the option type and its values, in order.
#[derive(Debug, Clone)]
struct Axis {
    option_type: OptionType,
    values: Vec<String>,
}

/// Apply an option-types cell. Returns the number of variants created.
pub fn build_variants(ctx: &mut RowContext<'_>, cell: &str) -> RowResult<usize> {
    let product_id = ctx.ensure_persisted("variants")?;

    let mut created = 0;
    for spec in ctx.delimiters.split_associations(cell) {
        let axes = collect_axes(ctx, &spec)?;
        if axes.is_empty() {
            continue;
        }
        for combination in combinations(&axes) {
            if create_variant(ctx, product_id, &combination)? {
                created += 1;
            }
        }
    }
    Ok(created)
}

/// Find or create every option type of a variant spec, attach it to the product and
/// return the axes that carry values.
fn collect_axes(ctx: &mut RowContext<'_>, spec: &str) -> RowResult<Vec<Axis>> {
    let mut axes: Vec<Axis> = Vec::new();
    for facet in ctx.delimiters.split_facets(spec) {
        let (type_name, values) = ctx.delimiters.split_name_value(&facet);
        if type_name.is_empty() {
            return Err(RowError::invalid("option_types", &facet, "missing option type name"));
        }

        let option_type = find_or_create_option_type(ctx.repo, &type_name)?;
        if !ctx.product.option_type_ids.contains(&option_type.id) {
            ctx.product.option_type_ids.push(option_type.id);
        }

        let values = values
            .map(|v| ctx.delimiters.split_values(&v))
            .unwrap_or_default();
        if values.is_empty() {
            continue;
        }
        match axes.iter_mut().find(|a| a.option_type.id == option_type.id) {
            Some(axis) => axis.values.extend(values),
            None => axes.push(Axis { option_type, values }),
        }
    }
    Ok(axes)
}

/// Pair the lead axis' values with the other axes, in declaration order.
fn combinations(axes: &[Axis]) -> Vec<Vec<(&OptionType, &str)>> {
    let lead_len = axes.iter().map(|a| a.values.len()).max().unwrap_or(0);

    (0..lead_len)
        .map(|i| {
            axes.iter()
                .map(|axis| {
                    let value = if axis.values.len() == lead_len {
                        &axis.values[i]
                    } else {
                        &axis.values[0]
                    };
                    (&axis.option_type, value.as_str())
                })
                .collect()
        })
        .collect()
}

/// Create the variant for one combination unless the product already has a
/// variant with exactly these option values.
fn create_variant(
    ctx: &mut RowContext<'_>,
    product_id: Id,
    combination: &[(&OptionType, &str)],
) -> RowResult<bool> {
    let mut value_ids = Vec::with_capacity(combination.len());
    for (option_type, name) in combination {
        value_ids.push(find_or_create_option_value(ctx.repo, name, option_type)?.id);
    }

    let existing = ctx.repo.variants_of(product_id)?;
    if existing.iter().any(|v| v.has_option_values(&value_ids)) {
        return Ok(false);
    }

    let base = ctx
        .product
        .sku
        .clone()
        .unwrap_or_else(|| product_id.to_string());
    let mut n = existing.len() + 1;
    let mut sku = format!("{}_{}", base, n);
    while ctx.repo.is_sku_taken(&sku)? {
        n += 1;
        sku = format!("{}_{}", base, n);
    }

    let mut variant = Variant::from_product(&ctx.product, product_id, sku);
    variant.option_value_ids = value_ids;
    if !ctx.repo.save_variant(&mut variant)? {
        return Err(RowError::SaveValidationFailed {
            errors: variant.errors,
        });
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::Fixture;
    use crate::store::Repository;

    fn sorted(mut variants: Vec<Vec<String>>) -> Vec<Vec<String>> {
        for v in variants.iter_mut() {
            v.sort();
        }
        variants
    }

    #[test]
    fn test_facets_and_associations() {
        let mut fixture = Fixture::new();
        let (product_id, created) = {
            let mut ctx = fixture.context("Poster", "POSTER");
            let created = build_variants(
                &mut ctx,
                "mime_type:jpeg;print_type:black_white|mime_type:jpeg",
            )
            .unwrap();
            assert_eq!(ctx.product.option_type_ids.len(), 2);
            (ctx.product.id.unwrap(), created)
        };

        assert_eq!(created, 2);
        let names: Vec<_> = fixture.repo.option_types().iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["mime_type", "print_type"]);
        assert_eq!(
            sorted(fixture.repo.variant_options(product_id)),
            vec![
                vec!["black_white".to_string(), "jpeg".to_string()],
                vec!["jpeg".to_string()],
            ]
        );
    }

    #[test]
    fn test_lead_axis_pairs_equal_length_axes() {
        let mut fixture = Fixture::new();
        let product_id = {
            let mut ctx = fixture.context("Shirt", "SHIRT");
            build_variants(&mut ctx, "size:S,M,L;colour:red,green,blue").unwrap();
            ctx.product.id.unwrap()
        };

        assert_eq!(
            sorted(fixture.repo.variant_options(product_id)),
            vec![
                vec!["S".to_string(), "red".to_string()],
                vec!["M".to_string(), "green".to_string()],
                vec!["L".to_string(), "blue".to_string()],
            ]
        );
    }

    #[test]
    fn test_shorter_axis_contributes_first_value() {
        let mut fixture = Fixture::new();
        let product_id = {
            let mut ctx = fixture.context("Shirt", "SHIRT");
            build_variants(&mut ctx, "colour:red,green;size:S,M,L").unwrap();
            ctx.product.id.unwrap()
        };

        assert_eq!(
            sorted(fixture.repo.variant_options(product_id)),
            vec![
                vec!["S".to_string(), "red".to_string()],
                vec!["M".to_string(), "red".to_string()],
                vec!["L".to_string(), "red".to_string()],
            ]
        );
    }

    #[test]
    fn test_variant_skus_and_inherited_price() {
        let mut fixture = Fixture::new();
        let product_id = {
            let mut ctx = fixture.context("Mug", "MUG");
            ctx.product.price = Some(9.5);
            build_variants(&mut ctx, "size:S,M").unwrap();
            ctx.product.id.unwrap()
        };

        let variants = fixture.repo.variants_of(product_id).unwrap();
        let skus: Vec<_> = variants.iter().filter_map(|v| v.sku.clone()).collect();
        assert_eq!(skus, vec!["MUG_1", "MUG_2"]);
        assert!(variants.iter().all(|v| v.price == Some(9.5) && !v.option_value_ids.is_empty()));
    }

    #[test]
    fn test_types_without_values_create_no_variants() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Mug", "MUG");

        assert_eq!(build_variants(&mut ctx, "size;colour").unwrap(), 0);
        assert_eq!(ctx.product.option_type_ids.len(), 2);
    }

    #[test]
    fn test_reimport_reuses_variants() {
        let mut fixture = Fixture::new();
        let product_id = {
            let mut ctx = fixture.context("Mug", "MUG");
            build_variants(&mut ctx, "size:S,M").unwrap();
            ctx.product.id.unwrap()
        };

        let product = fixture.repo.reload_product(product_id).unwrap();
        let created = {
            let mut ctx = fixture.context_for(product);
            build_variants(&mut ctx, "size:S,M,L").unwrap()
        };

        assert_eq!(created, 1);
        assert_eq!(fixture.repo.variants_of(product_id).unwrap().len(), 3);
        assert_eq!(fixture.repo.count_option_values(), 3);
    }

    #[test]
    fn test_missing_type_name() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Mug", "MUG");
        assert!(matches!(
            build_variants(&mut ctx, ":S,M"),
            Err(RowError::InvalidValue { .. })
        ));
    }
}
