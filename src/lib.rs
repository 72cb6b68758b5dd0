//! # salesdw: CSV sales data into a star-schema warehouse
//!
//! A small batch ETL pipeline. Raw CSV tables (sales, customers, products)
//! are cleaned into typed records, a date dimension is derived from the
//! cleaned sales, and the result is loaded into PostgreSQL as one fact table
//! with three dimensions.
//!
//! ## Stages
//!
//! - **Extract** ([`extraction`]): header-first CSV into string rows
//! - **Clean** ([`cleaning`]): typed records, bad and duplicate rows dropped
//! - **Date dimension** ([`date_dimension`]): one entry per distinct sale date
//! - **Key resolution** ([`keys`]): business keys to warehouse surrogate keys
//! - **Load** ([`warehouse`]): one transaction per run, upsert on business key
//!
//! ## Example
//!
//! ```ignore
//! use salesdw::{transform, CleaningPolicy, RawBatches};
//!
//! let raw = RawBatches::from_dir("data/raw")?;
//! let batch = transform(&raw, &CleaningPolicy::default())?;
//! let facts = batch.dry_run()?;
//! ```

// Core modules
pub mod entity;
pub mod error;
pub mod extraction;
pub mod cleaning;
pub mod date_dimension;
pub mod keys;
pub mod pipeline;

pub mod config;
pub mod serialization;

// Diesel/PostgreSQL warehouse
pub mod warehouse;

// Re-export key types
pub use entity::{
    CustomerRecord, DateDimensionEntry, Entity, FactSalesRow, ProductRecord, SalesRecord,
};
pub use error::{EtlError, MissingKey, RowRejection};
pub use extraction::{Extractor, RawBatch, RawBatches, RawRow};
pub use cleaning::{clean_batch, CleanReport, Cleaned, CleaningPolicy, FillDefaults, OnMissing};
pub use date_dimension::build_date_dimension;
pub use keys::{resolve_facts, round_money, DimensionKeys};
pub use pipeline::{transform, RunId, TransformReport, TransformedBatch};
pub use config::PipelineConfig;
pub use serialization::{export_batch, NdjsonWriter};
