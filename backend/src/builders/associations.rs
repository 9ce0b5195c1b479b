//! Generic association columns.
//!
//! To-many cells list instances separated by the association delimiter, each
//! either `field:key,key...` or just `key,key...` looked up by the operator's
//! default field:
//!
//! ```text
//! name:Main Street,Outlet|code:WEB
//! ```
//!
//! To-one cells hold a single key, optionally prefixed with `field:`.

use crate::error::{LoadWarning, RowError, RowResult};
use crate::models::{Id, Product};
use crate::schema::{OperatorDescriptor, OperatorKind, TargetType};

use super::RowContext;

/// Apply a generic association cell.
pub fn associate(ctx: &mut RowContext<'_>, op: &OperatorDescriptor, cell: &str) -> RowResult<()> {
    match op.kind {
        OperatorKind::ToOne => assign_one(ctx, op, cell),
        OperatorKind::ToMany => attach_many(ctx, op, cell),
        _ => Err(unresolved(op, cell)),
    }
}

fn unresolved(op: &OperatorDescriptor, cell: &str) -> RowError {
    RowError::UnresolvedOperator {
        operator: op.name.clone(),
        value: cell.to_string(),
    }
}

/// Split an instance into its lookup field and keys.
fn lookup_terms(ctx: &RowContext<'_>, op: &OperatorDescriptor, instance: &str) -> (String, Vec<String>) {
    let default_field = op.find_by_default.clone().unwrap_or_else(|| "name".to_string());
    if instance.contains(ctx.delimiters.name_value) {
        let (field, keys) = ctx.delimiters.split_name_value(instance);
        let keys = keys.map(|k| ctx.delimiters.split_values(&k)).unwrap_or_default();
        let field = if field.is_empty() { default_field } else { field };
        (field, keys)
    } else {
        (default_field, ctx.delimiters.split_values(instance))
    }
}

fn to_one_slot(product: &mut Product, target: TargetType) -> Option<&mut Option<Id>> {
    match target {
        TargetType::ShippingCategory => Some(&mut product.shipping_category_id),
        TargetType::TaxCategory => Some(&mut product.tax_category_id),
        _ => None,
    }
}

fn to_many_collection(product: &mut Product, target: TargetType) -> Option<&mut Vec<Id>> {
    match target {
        TargetType::Store => Some(&mut product.store_ids),
        TargetType::Taxon => Some(&mut product.taxon_ids),
        TargetType::OptionType => Some(&mut product.option_type_ids),
        _ => None,
    }
}

fn assign_one(ctx: &mut RowContext<'_>, op: &OperatorDescriptor, cell: &str) -> RowResult<()> {
    let target = op.target_type.ok_or_else(|| unresolved(op, cell))?;
    let default_field = op.find_by_default.clone().unwrap_or_else(|| "name".to_string());
    let (field, key) = match cell.split_once(ctx.delimiters.name_value) {
        Some((field, key)) if !field.trim().is_empty() => (field.trim().to_string(), key.trim().to_string()),
        _ => (default_field, cell.trim().to_string()),
    };

    let record = ctx
        .repo
        .find_reference(target, &field, &key)?
        .ok_or_else(|| RowError::AssociationLookupFailed {
            association: op.name.clone(),
            field: field.clone(),
            keys: vec![key.clone()],
        })?;

    let slot = to_one_slot(&mut ctx.product, target).ok_or_else(|| unresolved(op, cell))?;
    *slot = Some(record.id);
    Ok(())
}

fn attach_many(ctx: &mut RowContext<'_>, op: &OperatorDescriptor, cell: &str) -> RowResult<()> {
    let target = op.target_type.ok_or_else(|| unresolved(op, cell))?;
    if to_many_collection(&mut ctx.product, target).is_none() {
        return Err(unresolved(op, cell));
    }
    ctx.ensure_persisted(&op.name)?;

    let mut fields: Vec<String> = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut found: Vec<Id> = Vec::new();

    for instance in ctx.delimiters.split_associations(cell) {
        let (field, instance_keys) = lookup_terms(ctx, op, &instance);
        if !fields.contains(&field) {
            fields.push(field.clone());
        }
        for key in instance_keys {
            match ctx.repo.find_reference(target, &field, &key)? {
                Some(record) => found.push(record.id),
                None => missing.push(key.clone()),
            }
            keys.push(key);
        }
    }

    if keys.is_empty() {
        return Ok(());
    }
    let field = fields.join(",");
    if found.is_empty() {
        return Err(RowError::AssociationLookupFailed {
            association: op.name.clone(),
            field,
            keys,
        });
    }
    if !missing.is_empty() {
        ctx.warn(LoadWarning::AssociationLookupPartial {
            association: op.name.clone(),
            field,
            missing,
        });
    }

    if let Some(collection) = to_many_collection(&mut ctx.product, target) {
        for id in found {
            if !collection.contains(&id) {
                collection.push(id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::Fixture;
    use crate::config::SchemaVersion;
    use crate::schema::{product_schema, OperatorCatalog};

    fn operator(name: &str) -> OperatorDescriptor {
        OperatorCatalog::build(&product_schema(SchemaVersion::default()))
            .resolve(name)
            .cloned()
            .unwrap()
    }

    fn seeded() -> Fixture {
        let mut fixture = Fixture::new();
        fixture.repo.seed_reference(TargetType::Store, "Main Street", Some("MAIN"));
        fixture.repo.seed_reference(TargetType::Store, "Outlet", Some("OUT"));
        fixture.repo.seed_reference(TargetType::ShippingCategory, "Default", Some("STD"));
        fixture
    }

    #[test]
    fn test_to_many_default_field() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        associate(&mut ctx, &operator("stores"), "Main Street,Outlet").unwrap();

        assert_eq!(ctx.product.store_ids.len(), 2);
        assert!(ctx.product.is_persisted());
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_to_many_explicit_field_and_dedup() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        associate(&mut ctx, &operator("stores"), "code:MAIN|name:Main Street").unwrap();
        assert_eq!(ctx.product.store_ids.len(), 1);
    }

    #[test]
    fn test_to_many_partial_lookup_warns() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        associate(&mut ctx, &operator("stores"), "Main Street,Airport").unwrap();

        assert_eq!(ctx.product.store_ids.len(), 1);
        assert_eq!(
            ctx.warnings,
            vec![LoadWarning::AssociationLookupPartial {
                association: "stores".into(),
                field: "name".into(),
                missing: vec!["Airport".into()],
            }]
        );
    }

    #[test]
    fn test_to_many_nothing_found_fails() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        let err = associate(&mut ctx, &operator("stores"), "Airport|Harbour").unwrap_err();
        assert!(matches!(
            err,
            RowError::AssociationLookupFailed { ref keys, .. } if keys.len() == 2
        ));
    }

    #[test]
    fn test_to_one_lookup() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        associate(&mut ctx, &operator("shipping_category"), "Default").unwrap();
        assert!(ctx.product.shipping_category_id.is_some());
        // to-one columns never force a save
        assert!(!ctx.product.is_persisted());

        let first = ctx.product.shipping_category_id;
        associate(&mut ctx, &operator("shipping_category"), "code:STD").unwrap();
        assert_eq!(ctx.product.shipping_category_id, first);
    }

    #[test]
    fn test_to_one_missing_fails() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        assert!(matches!(
            associate(&mut ctx, &operator("tax_category"), "Reduced"),
            Err(RowError::AssociationLookupFailed { .. })
        ));
    }

    #[test]
    fn test_unsupported_lookup_field() {
        let mut fixture = seeded();
        let mut ctx = fixture.context("Mug", "MUG");

        assert!(matches!(
            associate(&mut ctx, &operator("stores"), "colour:red"),
            Err(RowError::Store(_))
        ));
    }
}
