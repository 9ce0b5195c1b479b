//! Find-or-create for shared reference data.
//!
//! Check-then-create: callers must not run these concurrently against the
//! same repository.

use super::Repository;
use crate::error::StoreResult;
use crate::grammar::humanize;
use crate::models::{Id, OptionType, OptionValue, Property, Taxon, Taxonomy};

pub fn find_or_create_option_type(repo: &mut dyn Repository, name: &str) -> StoreResult<OptionType> {
    match repo.find_option_type(name)? {
        Some(option_type) => Ok(option_type),
        None => repo.create_option_type(name, &humanize(name)),
    }
}

/// Option values are unique per (name, option type).
pub fn find_or_create_option_value(
    repo: &mut dyn Repository,
    name: &str,
    option_type: &OptionType,
) -> StoreResult<OptionValue> {
    match repo.find_option_value(name, option_type.id)? {
        Some(value) => Ok(value),
        None => repo.create_option_value(name, name, option_type.id),
    }
}

pub fn find_or_create_taxonomy(repo: &mut dyn Repository, name: &str) -> StoreResult<Taxonomy> {
    match repo.find_taxonomy(name)? {
        Some(taxonomy) => Ok(taxonomy),
        None => repo.create_taxonomy(name),
    }
}

/// Taxons are unique per (name, parent, taxonomy).
pub fn find_or_create_taxon(
    repo: &mut dyn Repository,
    name: &str,
    parent_id: Id,
    taxonomy_id: Id,
) -> StoreResult<Taxon> {
    match repo.find_taxon(name, parent_id, taxonomy_id)? {
        Some(taxon) => Ok(taxon),
        None => repo.create_taxon(name, parent_id, taxonomy_id),
    }
}

pub fn find_or_create_property(repo: &mut dyn Repository, name: &str) -> StoreResult<Property> {
    match repo.find_property(name)? {
        Some(property) => Ok(property),
        None => repo.create_property(name, &humanize(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    #[test]
    fn test_option_value_find_or_create_is_idempotent() {
        let mut repo = MemoryRepository::new();
        let size = find_or_create_option_type(&mut repo, "size").unwrap();

        let first = find_or_create_option_value(&mut repo, "M", &size).unwrap();
        let second = find_or_create_option_value(&mut repo, "M", &size).unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.count_option_values(), 1);
    }

    #[test]
    fn test_option_value_scoped_by_type() {
        let mut repo = MemoryRepository::new();
        let size = find_or_create_option_type(&mut repo, "size").unwrap();
        let fit = find_or_create_option_type(&mut repo, "fit").unwrap();

        let a = find_or_create_option_value(&mut repo, "M", &size).unwrap();
        let b = find_or_create_option_value(&mut repo, "M", &fit).unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_option_type_presentation() {
        let mut repo = MemoryRepository::new();
        let option_type = find_or_create_option_type(&mut repo, "print_type").unwrap();
        assert_eq!(option_type.presentation, "Print type");
        let again = find_or_create_option_type(&mut repo, "print_type").unwrap();
        assert_eq!(again.id, option_type.id);
    }

    #[test]
    fn test_taxon_scoped_by_parent() {
        let mut repo = MemoryRepository::new();
        let taxonomy = find_or_create_taxonomy(&mut repo, "Clothing").unwrap();
        let shirts = find_or_create_taxon(&mut repo, "Shirts", taxonomy.root_id, taxonomy.id).unwrap();
        let casual = find_or_create_taxon(&mut repo, "Casual", shirts.id, taxonomy.id).unwrap();
        let casual_root = find_or_create_taxon(&mut repo, "Casual", taxonomy.root_id, taxonomy.id).unwrap();

        assert_ne!(casual.id, casual_root.id);
        assert_eq!(
            find_or_create_taxon(&mut repo, "Casual", shirts.id, taxonomy.id).unwrap().id,
            casual.id
        );
    }

    #[test]
    fn test_property_find_or_create() {
        let mut repo = MemoryRepository::new();
        let a = find_or_create_property(&mut repo, "material").unwrap();
        let b = find_or_create_property(&mut repo, "material").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.presentation, "Material");
    }
}
