//! Taxon chains: `Clothing>Shirts>Casual|Brands>Acme`.
//!
//! The first level names the taxonomy; its root taxon is the parent of the
//! second level. Only the deepest taxon of each chain is attached.

use crate::error::RowResult;
use crate::store::reference::{find_or_create_taxon, find_or_create_taxonomy};

use super::RowContext;

/// Apply a taxons cell. Returns the number of taxons newly attached.
pub fn attach_taxons(ctx: &mut RowContext<'_>, cell: &str) -> RowResult<usize> {
    ctx.ensure_persisted("taxons")?;

    let mut attached = 0;
    for chain in ctx.delimiters.split_associations(cell) {
        let levels = ctx.delimiters.split_chain(&chain);
        let Some((root, rest)) = levels.split_first() else {
            continue;
        };

        let taxonomy = find_or_create_taxonomy(ctx.repo, root)?;
        let mut parent = taxonomy.root_id;
        for name in rest {
            parent = find_or_create_taxon(ctx.repo, name, parent, taxonomy.id)?.id;
        }

        if !ctx.product.taxon_ids.contains(&parent) {
            ctx.product.taxon_ids.push(parent);
            attached += 1;
        }
    }
    Ok(attached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::Fixture;

    #[test]
    fn test_chain_attaches_deepest_taxon() {
        let mut fixture = Fixture::new();
        let taxon_ids = {
            let mut ctx = fixture.context("Shirt", "SHIRT");
            assert_eq!(attach_taxons(&mut ctx, "Clothing>Shirts>Casual").unwrap(), 1);
            ctx.product.taxon_ids.clone()
        };

        let taxonomies = fixture.repo.taxonomies();
        assert_eq!(taxonomies.len(), 1);
        assert_eq!(taxonomies[0].name, "Clothing");

        assert_eq!(taxon_ids.len(), 1);
        let casual = fixture.repo.taxon(taxon_ids[0]).unwrap();
        assert_eq!(casual.name, "Casual");
        let shirts = fixture.repo.taxon(casual.parent_id.unwrap()).unwrap();
        assert_eq!(shirts.name, "Shirts");
        assert_eq!(shirts.parent_id, Some(taxonomies[0].root_id));
    }

    #[test]
    fn test_reprocessing_does_not_duplicate() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");

        attach_taxons(&mut ctx, "Clothing>Shirts>Casual").unwrap();
        assert_eq!(attach_taxons(&mut ctx, "Clothing > Shirts > Casual").unwrap(), 0);
        assert_eq!(ctx.product.taxon_ids.len(), 1);
        drop(ctx);

        // root + Shirts + Casual
        assert_eq!(fixture.repo.count_taxons(), 3);
    }

    #[test]
    fn test_several_chains_and_root_only() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.context("Shirt", "SHIRT");

        let attached = attach_taxons(&mut ctx, "Clothing>Shirts|Brands||Clothing>Sale").unwrap();
        assert_eq!(attached, 3);
    }
}
