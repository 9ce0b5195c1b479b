//! Load options.
//!
//! Options can be built in code, deserialized from a JSON file, or assembled
//! by the CLI from flags (flags override file values).
//!
//! ```json
//! {
//!   "dummy": false,
//!   "mandatory": ["Name", "SKU"],
//!   "forceInclusion": ["images"],
//!   "matchBy": "SKU",
//!   "defaults": { "available_on": "2024-01-01" },
//!   "delimiters": { "association": "|" },
//!   "schemaVersion": "2.2"
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::grammar::Delimiters;

// =============================================================================
// Schema Version
// =============================================================================

/// Version of the target product schema.
///
/// Older schemas keep `price` and images on the product; newer ones move them
/// to the master variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Images and price live on the master variant.
    pub fn has_master_variant(&self) -> bool {
        *self > SchemaVersion::new(1, 0)
    }

    /// `price` is no longer a product column.
    pub fn price_on_master(&self) -> bool {
        *self >= SchemaVersion::new(1, 3)
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        SchemaVersion::new(2, 2)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SchemaVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidSchemaVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(SchemaVersion { major, minor })
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Mapping Options
// =============================================================================

/// Inclusion policy for the header mapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingOptions {
    /// Columns that must be present and mapped.
    pub mandatory: Vec<String>,
    /// Columns mapped even without a schema field behind them.
    pub force_inclusion: Vec<String>,
    /// Map every resolvable header, pseudo operators included.
    pub include_all: bool,
    /// Fail on any header that cannot be mapped.
    pub strict: bool,
}

// =============================================================================
// Load Options
// =============================================================================

/// Options for one load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadOptions {
    /// Process everything, then roll back.
    pub dummy: bool,
    /// Columns that must be present and mapped.
    pub mandatory: Vec<String>,
    /// Columns mapped even without a schema field behind them.
    pub force_inclusion: Vec<String>,
    /// Map every resolvable header.
    pub include_all: bool,
    /// Fail on unmappable headers.
    pub strict: bool,
    /// Column used to find an existing product to update.
    pub match_by: Option<String>,
    /// Per-field processing logs.
    pub verbose: bool,
    /// Values for attributes that have no cell in a row.
    pub defaults: BTreeMap<String, String>,
    /// Cell grammar.
    pub delimiters: Delimiters,
    /// Target schema version.
    pub schema_version: SchemaVersion,
    /// Rebuild the operator catalog even if cached.
    pub reload_catalog: bool,
}

impl LoadOptions {
    /// Read options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse options from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Inclusion policy for the header mapper.
    pub fn mapping(&self) -> MappingOptions {
        MappingOptions {
            mandatory: self.mandatory.clone(),
            force_inclusion: self.force_inclusion.clone(),
            include_all: self.include_all,
            strict: self.strict,
        }
    }

    pub fn with_dummy(mut self, dummy: bool) -> Self {
        self.dummy = dummy;
        self
    }

    pub fn with_match_by(mut self, column: impl Into<String>) -> Self {
        self.match_by = Some(column.into());
        self
    }

    pub fn with_mandatory(mut self, columns: &[&str]) -> Self {
        self.mandatory = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_default(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(column.into(), value.into());
        self
    }

    pub fn with_schema_version(mut self, version: SchemaVersion) -> Self {
        self.schema_version = version;
        self
    }
}
