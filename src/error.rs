//! Error types for the pipeline.
//!
//! `EtlError` is what stages return to the caller. `RowRejection` describes
//! why the cleaner dropped a single row and never escapes the cleaner.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

use crate::serialization::SerializationError;

/// A dimension business key that a sale could not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingKey {
    Customer(i32),
    Product(i32),
    Date(NaiveDate),
}

impl fmt::Display for MissingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingKey::Customer(id) => write!(f, "customer_id {}", id),
            MissingKey::Product(id) => write!(f, "product_id {}", id),
            MissingKey::Date(date) => write!(f, "sale_date {}", date),
        }
    }
}

/// Error type for pipeline operations
#[derive(Debug)]
pub enum EtlError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv(csv::Error),
    Config(String),
    /// Cleaning removed every row of an entity type.
    EmptyBatch {
        entity: &'static str,
    },
    /// A sale references a dimension row that is not in the batch.
    DanglingReference {
        sale_id: i32,
        missing: MissingKey,
    },
    Database(diesel::result::Error),
    Pool(r2d2::Error),
    Serialization(SerializationError),
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtlError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
            EtlError::Csv(e) => write!(f, "CSV error: {}", e),
            EtlError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EtlError::EmptyBatch { entity } => {
                write!(f, "No valid {} records left after cleaning", entity)
            }
            EtlError::DanglingReference { sale_id, missing } => {
                write!(f, "sale {} references unknown {}", sale_id, missing)
            }
            EtlError::Database(e) => write!(f, "Database error: {}", e),
            EtlError::Pool(e) => write!(f, "Database pool error: {}", e),
            EtlError::Serialization(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EtlError::Io { source, .. } => Some(source),
            EtlError::Csv(e) => Some(e),
            EtlError::Database(e) => Some(e),
            EtlError::Pool(e) => Some(e),
            EtlError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for EtlError {
    fn from(e: csv::Error) -> Self {
        EtlError::Csv(e)
    }
}

impl From<diesel::result::Error> for EtlError {
    fn from(e: diesel::result::Error) -> Self {
        EtlError::Database(e)
    }
}

impl From<r2d2::Error> for EtlError {
    fn from(e: r2d2::Error) -> Self {
        EtlError::Pool(e)
    }
}

impl From<SerializationError> for EtlError {
    fn from(e: SerializationError) -> Self {
        EtlError::Serialization(e)
    }
}

/// Why a single raw row did not make it into a cleaned batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    Missing { field: &'static str },
    Invalid { field: &'static str, value: String },
    Duplicate { key: String },
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRejection::Missing { field } => {
                write!(f, "Field '{}' is missing or empty", field)
            }
            RowRejection::Invalid { field, value } => {
                write!(f, "Invalid value '{}' for field '{}'", value, field)
            }
            RowRejection::Duplicate { key } => write!(f, "Duplicate business key {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_reference_message() {
        let err = EtlError::DanglingReference {
            sale_id: 7,
            missing: MissingKey::Customer(999),
        };
        assert_eq!(err.to_string(), "sale 7 references unknown customer_id 999");
    }

    #[test]
    fn test_missing_date_display() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(MissingKey::Date(date).to_string(), "sale_date 2024-01-15");
    }

    #[test]
    fn test_empty_batch_message() {
        let err = EtlError::EmptyBatch { entity: "sales" };
        assert!(err.to_string().contains("sales"));
    }
}
