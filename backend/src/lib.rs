//! # Productload - product catalog mass loading from CSV
//!
//! Productload reads a CSV file of products (any encoding, detected
//! delimiter), binds each header to an operator of the product schema and
//! loads every row into a store: attributes, associations, option types and
//! generated variants, taxon chains, properties, per-variant prices, SKUs and
//! stock, and images.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Mapper    │────▶│ Row process │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (operators) │     │ (one txn)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use productload::{load_file, CatalogRegistry, LoadOptions, LocalAssets, MemoryRepository};
//!
//! let mut repo = MemoryRepository::new();
//! let mut assets = LocalAssets::new();
//! let mut registry = CatalogRegistry::new();
//! let report = load_file(
//!     "products.csv",
//!     &mut repo,
//!     &mut assets,
//!     &mut registry,
//!     LoadOptions::default().with_match_by("sku"),
//! )?;
//! println!("Loaded {} products", report.loaded_count);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Layered error types
//! - [`models`] - Domain models (Product, Variant, Taxon...)
//! - [`grammar`] - Cell delimiter grammar
//! - [`config`] - Load options and schema version
//! - [`schema`] - Operator descriptors and catalog
//! - [`cache`] - Catalog registry
//! - [`parser`] - CSV parsing with auto-detection
//! - [`mapping`] - Header to operator binding
//! - [`store`] - Repository trait and in-memory store
//! - [`assets`] - Image ingestion
//! - [`builders`] - Variant, taxon, property, association and image builders
//! - [`validation`] - JSON Schema validation of records
//! - [`load`] - Row processor and load session
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Configuration
pub mod config;
pub mod grammar;

// Operators
pub mod cache;
pub mod schema;

// Parsing and mapping
pub mod mapping;
pub mod parser;

// Persistence
pub mod assets;
pub mod store;
pub mod validation;

// Loading
pub mod builders;
pub mod load;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AssetError,
    ConfigError,
    LoadError,
    LoadResult,
    LoadWarning,
    MappingError,
    RowError,
    ServerError,
    StoreError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Id,
    OptionType,
    OptionValue,
    Product,
    ProductProperty,
    Property,
    Taxon,
    Taxonomy,
    Variant,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{LoadOptions, MappingOptions, SchemaVersion};
pub use grammar::Delimiters;

// =============================================================================
// Re-exports - Operators
// =============================================================================

pub use cache::CatalogRegistry;
pub use schema::{normalize_header, product_schema, Handler, OperatorCatalog, OperatorDescriptor, OperatorKind, TargetType};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file,
    parse_file_auto,
    parse_str,
    CsvError,
    DataTable,
};

// =============================================================================
// Re-exports - Mapping, store, loading
// =============================================================================

pub use assets::{AssetPipeline, LocalAssets};
pub use load::{load_file, load_table, LoadReport, LoadSession, RowFailure, RowProcessor, RowWarning};
pub use mapping::{ColumnBinding, HeaderMapper};
pub use store::{MemoryRepository, Repository};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, validate, validate_product, validate_variant};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, CsvMetadata, LoadResponse};

// Server
pub mod server {
    pub use crate::api::server::{start_server, ServerConfig};
}
