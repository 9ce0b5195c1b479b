//! Delimiter grammar for encoding several values or associations in one cell.
//!
//! ```text
//! mime_type:jpeg;print_type:black_white|mime_type:png,pdf
//! └──────── facet ───────┘ └── facet ──┘ └─ name ─┘└values┘
//! └──────────── association ────────────┘└── association ──┘
//! ```
//!
//! All functions are pure: they never mutate their input and always return
//! new owned tokens. Tokens are trimmed and empty tokens dropped, so a cell
//! without the delimiter yields exactly one token.

use serde::{Deserialize, Serialize};

/// The characters that structure a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    /// Separates values for one key (`size:S,M,L`).
    pub value: char,
    /// Separates independent association instances (`a|b|c`).
    pub association: char,
    /// Separates facets of one instance (`type:a;other:b`).
    pub facet: char,
    /// Separates a key from its value(s) (`name:value`).
    pub name_value: char,
    /// Separates levels of a taxon chain (`Root>Child`).
    pub chain: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            value: ',',
            association: '|',
            facet: ';',
            name_value: ':',
            chain: '>',
        }
    }
}

impl Delimiters {
    /// Split into independent target values.
    pub fn split_values(&self, cell: &str) -> Vec<String> {
        split_trimmed(cell, self.value)
    }

    /// Split into independent association instances.
    pub fn split_associations(&self, cell: &str) -> Vec<String> {
        split_trimmed(cell, self.association)
    }

    /// Split one association instance into its facets.
    pub fn split_facets(&self, instance: &str) -> Vec<String> {
        split_trimmed(instance, self.facet)
    }

    /// Split a `name:value` pair on the first name/value delimiter.
    ///
    /// The value is `None` when the delimiter is absent or nothing follows it.
    pub fn split_name_value(&self, token: &str) -> (String, Option<String>) {
        match token.split_once(self.name_value) {
            Some((name, value)) => {
                let value = value.trim();
                let value = (!value.is_empty()).then(|| value.to_string());
                (name.trim().to_string(), value)
            }
            None => (token.trim().to_string(), None),
        }
    }

    /// Split a taxon chain into its levels, root first.
    pub fn split_chain(&self, chain: &str) -> Vec<String> {
        split_trimmed(chain, self.chain)
    }

    /// Delimiters that may not be reused for another purpose.
    pub fn conflicts(&self) -> Vec<(char, &'static str, &'static str)> {
        let all = [
            (self.value, "value"),
            (self.association, "association"),
            (self.facet, "facet"),
            (self.name_value, "name_value"),
            (self.chain, "chain"),
        ];
        let mut conflicts = Vec::new();
        for (i, (c, name)) in all.iter().enumerate() {
            for (other, other_name) in &all[i + 1..] {
                if c == other {
                    conflicts.push((*c, *name, *other_name));
                }
            }
        }
        conflicts
    }
}

fn split_trimmed(input: &str, delimiter: char) -> Vec<String> {
    input
        .split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Turn an identifier into a display label (`print_type` -> `Print type`).
pub fn humanize(name: &str) -> String {
    let spaced: String = name
        .trim()
        .trim_end_matches("_id")
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
