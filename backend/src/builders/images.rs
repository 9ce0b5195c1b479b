//! Image attachment.
//!
//! The cell is handed to the asset pipeline untouched. Schemas above 1.0
//! attach images to the master variant, older ones to the product.

use crate::assets::ImageTarget;
use crate::error::{RowResult, StoreError};
use crate::schema::TargetType;

use super::RowContext;

/// Apply an images cell. Returns the number of images attached.
pub fn attach_images(ctx: &mut RowContext<'_>, cell: &str) -> RowResult<usize> {
    let product_id = ctx.ensure_persisted("images")?;

    let target = if ctx.version.has_master_variant() {
        let master = ctx.repo.master_variant(product_id)?;
        let id = master.id.ok_or(StoreError::NotFound {
            target: TargetType::Variant,
            id: product_id,
        })?;
        ImageTarget::MasterVariant(id)
    } else {
        ImageTarget::Product(product_id)
    };

    Ok(ctx.assets.attach_images(target, cell)?)
}
