//! Property lists: `material:cotton|fit:slim|organic`.
//!
//! Each entry names a property and optionally a value. A product holds one
//! value per property; loading a property again updates that value.

use crate::error::{RowError, RowResult};
use crate::models::ProductProperty;
use crate::store::reference::find_or_create_property;

use super::RowContext;

/// Apply a properties cell. Returns the number of entries applied.
pub fn apply_properties(ctx: &mut RowContext<'_>, cell: &str) -> RowResult<usize> {
    let product_id = ctx.ensure_persisted("product_properties")?;
    let mut current = ctx.repo.product_properties_of(product_id)?;

    let mut applied = 0;
    for entry in ctx.delimiters.split_associations(cell) {
        let (name, value) = ctx.delimiters.split_name_value(&entry);
        if name.is_empty() {
            return Err(RowError::invalid("product_properties", &entry, "missing property name"));
        }

        let property = find_or_create_property(ctx.repo, &name)?;
        match current.iter_mut().find(|p| p.property_id == property.id) {
            Some(existing) => {
                existing.value = value;
                ctx.repo.save_product_property(existing)?;
            }
            None => {
                let mut created = ProductProperty {
                    id: None,
                    product_id,
                    property_id: property.id,
                    value,
                };
                ctx.repo.save_product_property(&mut created)?;
                current.push(created);
            }
        }
        applied += 1;
    }
    Ok(applied)
}
