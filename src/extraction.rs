//! Raw record reading.
//!
//! Input tables arrive as header-first CSV. Each row is kept as a map from
//! column name to string cell; typing happens in the cleaner.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::EtlError;

/// File names expected inside the raw data directory.
pub const SALES_FILE: &str = "sales.csv";
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const PRODUCTS_FILE: &str = "products.csv";

/// Trait for types that can extract string cells by column name.
pub trait Extractor {
    /// Extract the cell for `field`.
    ///
    /// Returns `None` when the column is absent or the cell is blank.
    fn extract(&self, field: &str) -> Option<&str>;
}

/// One source row: column name -> raw cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(key.into(), value.into());
        self
    }

    pub fn from_hashmap(cells: HashMap<String, String>) -> Self {
        Self { cells }
    }
}

impl Extractor for RawRow {
    fn extract(&self, field: &str) -> Option<&str> {
        self.cells
            .get(field)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// All rows read from one input table.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub name: String,
    pub rows: Vec<RawRow>,
}

impl RawBatch {
    pub fn new(name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Read a header-first CSV from any reader.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, EtlError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let cells = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();
            rows.push(RawRow::from_hashmap(cells));
        }

        let name = name.into();
        tracing::info!("Extracted {} raw {} rows", rows.len(), name);
        Ok(Self { name, rows })
    }

    pub fn from_csv_str(name: impl Into<String>, text: &str) -> Result<Self, EtlError> {
        Self::from_reader(name, text.as_bytes())
    }

    pub fn from_path<P: AsRef<Path>>(name: impl Into<String>, path: P) -> Result<Self, EtlError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EtlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(name, file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The three raw input tables of one run.
#[derive(Debug, Clone, Default)]
pub struct RawBatches {
    pub sales: RawBatch,
    pub customers: RawBatch,
    pub products: RawBatch,
}

impl RawBatches {
    /// Read `sales.csv`, `customers.csv` and `products.csv` from `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, EtlError> {
        let dir = dir.as_ref();
        Ok(Self {
            sales: RawBatch::from_path("sales", dir.join(SALES_FILE))?,
            customers: RawBatch::from_path("customers", dir.join(CUSTOMERS_FILE))?,
            products: RawBatch::from_path("products", dir.join(PRODUCTS_FILE))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_trims_and_skips_blank() {
        let row = RawRow::new()
            .with_value("name", "  Alice ")
            .with_value("email", "   ");

        assert_eq!(row.extract("name"), Some("Alice"));
        assert_eq!(row.extract("email"), None);
        assert_eq!(row.extract("city"), None);
    }

    #[test]
    fn test_from_csv_str() {
        let text = "customer_id,customer_name,email\n101,Alice,alice@example.com\n102,Bob,\n";
        let batch = RawBatch::from_csv_str("customers", text).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows[0].extract("customer_name"), Some("Alice"));
        assert_eq!(batch.rows[1].extract("email"), None);
    }

    #[test]
    fn test_short_row_is_missing_trailing_cells() {
        let text = "a,b,c\n1,2\n";
        let batch = RawBatch::from_csv_str("t", text).unwrap();

        assert_eq!(batch.rows[0].extract("b"), Some("2"));
        assert_eq!(batch.rows[0].extract("c"), None);
    }

    #[test]
    fn test_from_dir_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RawBatches::from_dir(dir.path()).unwrap_err();
        match err {
            EtlError::Io { path, .. } => assert!(path.ends_with(SALES_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_dir_reads_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SALES_FILE), "sale_id\n1\n2\n").unwrap();
        std::fs::write(dir.path().join(CUSTOMERS_FILE), "customer_id\n101\n").unwrap();
        std::fs::write(dir.path().join(PRODUCTS_FILE), "product_id\n").unwrap();

        let batches = RawBatches::from_dir(dir.path()).unwrap();
        assert_eq!(batches.sales.len(), 2);
        assert_eq!(batches.customers.len(), 1);
        assert!(batches.products.is_empty());
    }
}
