//! Operator catalog: normalized header text -> operator descriptor.

use std::collections::HashMap;

use super::{normalize_header, OperatorDescriptor, SchemaDescription, TargetType};
use crate::config::SchemaVersion;

/// Lookup of operators for one target type at one schema version.
#[derive(Debug, Clone)]
pub struct OperatorCatalog {
    target: TargetType,
    version: SchemaVersion,
    operators: HashMap<String, OperatorDescriptor>,
    aliases: HashMap<String, String>,
}

impl OperatorCatalog {
    /// Build from a schema description. The first descriptor for a name wins.
    pub fn build(schema: &SchemaDescription) -> Self {
        let mut operators = HashMap::new();
        for op in &schema.operators {
            operators
                .entry(normalize_header(&op.name))
                .or_insert_with(|| op.clone());
        }

        let aliases = schema
            .aliases
            .iter()
            .map(|(alias, target)| (normalize_header(alias), normalize_header(target)))
            .filter(|(alias, target)| !operators.contains_key(alias) && operators.contains_key(target))
            .collect();

        Self {
            target: schema.target,
            version: schema.version,
            operators,
            aliases,
        }
    }

    pub fn target(&self) -> TargetType {
        self.target
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Resolve header text to an operator.
    ///
    /// Tries the normalized text, then aliases, then simple singular/plural
    /// spellings (`Taxon` -> `taxons`, `Property` -> `properties`).
    pub fn resolve(&self, header: &str) -> Option<&OperatorDescriptor> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return None;
        }
        spellings(&normalized)
            .iter()
            .find_map(|candidate| self.lookup(candidate))
    }

    fn lookup(&self, key: &str) -> Option<&OperatorDescriptor> {
        self.operators.get(key).or_else(|| {
            self.aliases
                .get(key)
                .and_then(|target| self.operators.get(target))
        })
    }

    /// All operators, sorted by name.
    pub fn operators(&self) -> Vec<&OperatorDescriptor> {
        let mut ops: Vec<_> = self.operators.values().collect();
        ops.sort_by(|a, b| a.name.cmp(&b.name));
        ops
    }

    /// Aliases as (alias, operator name), sorted.
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut aliases: Vec<_> = self
            .aliases
            .iter()
            .map(|(a, t)| (a.as_str(), t.as_str()))
            .collect();
        aliases.sort();
        aliases
    }

    /// Names of pseudo operators, sorted.
    pub fn pseudo_names(&self) -> Vec<String> {
        self.operators()
            .into_iter()
            .filter(|op| op.is_pseudo())
            .map(|op| op.name.clone())
            .collect()
    }
}

fn spellings(normalized: &str) -> Vec<String> {
    let mut candidates = vec![normalized.to_string()];
    if let Some(stem) = normalized.strip_suffix("ies") {
        candidates.push(format!("{}y", stem));
    } else if let Some(stem) = normalized.strip_suffix('y') {
        candidates.push(format!("{}ies", stem));
    }
    match normalized.strip_suffix('s') {
        Some(singular) => candidates.push(singular.to_string()),
        None => candidates.push(format!("{}s", normalized)),
    }
    candidates
}
