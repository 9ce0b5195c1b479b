//! Association builders: turn one encoded cell into mutations of the product
//! graph.
//!
//! | Builder        | Cell example                                   |
//! |----------------|------------------------------------------------|
//! | [`variants`]   | `size:S,M,L;colour:red\|size:XL`               |
//! | [`taxons`]     | `Clothing>Shirts>Casual\|Brands>Acme`          |
//! | [`properties`] | `material:cotton\|fit:slim\|organic`           |
//! | [`broadcast`]  | `9.99\|12.99\|15.99` (one entry per variant)   |
//! | [`images`]     | `front.jpg\|back.jpg` (passed to the pipeline) |
//! | [`associations`] | `name:Main,Outlet` or `Default`              |
//!
//! Every builder works on a [`RowContext`] holding the in-progress product
//! and the collaborators for the current row.

pub mod associations;
pub mod broadcast;
pub mod images;
pub mod properties;
pub mod taxons;
pub mod variants;

use crate::assets::AssetPipeline;
use crate::config::SchemaVersion;
use crate::error::{LoadWarning, RowError, RowResult};
use crate::grammar::Delimiters;
use crate::models::{Id, Product};
use crate::store::Repository;

/// State for processing one row.
pub struct RowContext<'a> {
    pub repo: &'a mut dyn Repository,
    pub assets: &'a mut dyn AssetPipeline,
    /// The product being built; discarded if the row fails.
    pub product: Product,
    pub delimiters: &'a Delimiters,
    pub version: SchemaVersion,
    /// Non-fatal conditions raised while processing the row.
    pub warnings: Vec<LoadWarning>,
}

impl<'a> RowContext<'a> {
    pub fn new(
        repo: &'a mut dyn Repository,
        assets: &'a mut dyn AssetPipeline,
        product: Product,
        delimiters: &'a Delimiters,
        version: SchemaVersion,
    ) -> Self {
        Self {
            repo,
            assets,
            product,
            delimiters,
            version,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: LoadWarning) {
        self.warnings.push(warning);
    }

    /// Save the product, turning a rejected save into a row error.
    pub fn save_product(&mut self) -> RowResult<Id> {
        if !self.repo.save_product(&mut self.product)? {
            return Err(RowError::SaveValidationFailed {
                errors: self.product.errors.clone(),
            });
        }
        self.persisted_id()
    }

    /// Id of the product, saving it first if it is new.
    ///
    /// Children (`association`) cannot be attached to an unsaved product, so
    /// a rejected save fails the row with `ParentSaveRequiredButFailed`.
    pub fn ensure_persisted(&mut self, association: &str) -> RowResult<Id> {
        if let Some(id) = self.product.id {
            return Ok(id);
        }
        if !self.repo.save_product(&mut self.product)? {
            return Err(RowError::ParentSaveRequiredButFailed {
                association: association.to_string(),
                reason: self.product.errors.join("; "),
            });
        }
        self.persisted_id()
    }

    fn persisted_id(&self) -> RowResult<Id> {
        self.product.id.ok_or_else(|| RowError::SaveValidationFailed {
            errors: vec!["store did not assign an id".to_string()],
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::assets::LocalAssets;
    use crate::store::MemoryRepository;

    /// Repository, assets and delimiters for builder tests.
    pub struct Fixture {
        pub repo: MemoryRepository,
        pub assets: LocalAssets,
        pub delimiters: Delimiters,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                repo: MemoryRepository::new(),
                assets: LocalAssets::new(),
                delimiters: Delimiters::default(),
            }
        }

        /// Context over a new product with a name and SKU.
        pub fn context(&mut self, name: &str, sku: &str) -> RowContext<'_> {
            let mut product = Product::new();
            product.name = Some(name.to_string());
            product.sku = Some(sku.to_string());
            self.context_for(product)
        }

        pub fn context_for(&mut self, product: Product) -> RowContext<'_> {
            RowContext::new(
                &mut self.repo,
                &mut self.assets,
                product,
                &self.delimiters,
                SchemaVersion::default(),
            )
        }
    }
}
