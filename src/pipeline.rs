//! The transform stage: raw tables in, cleaned dimensions and date dimension out.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::cleaning::{clean_batch, CleanReport, CleaningPolicy};
use crate::date_dimension::build_date_dimension;
use crate::entity::{CustomerRecord, DateDimensionEntry, FactSalesRow, ProductRecord, SalesRecord};
use crate::error::EtlError;
use crate::extraction::RawBatches;
use crate::keys::{resolve_facts, DimensionKeys};

/// Identifies one pipeline invocation in logs and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-entity cleaning counts for a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformReport {
    pub sales: CleanReport,
    pub customers: CleanReport,
    pub products: CleanReport,
    pub dates: usize,
}

/// Output of the transform stage, ready for the loader.
#[derive(Debug, Clone)]
pub struct TransformedBatch {
    pub run_id: RunId,
    pub sales: Vec<SalesRecord>,
    pub customers: Vec<CustomerRecord>,
    pub products: Vec<ProductRecord>,
    pub dates: Vec<DateDimensionEntry>,
    pub report: TransformReport,
}

impl TransformedBatch {
    /// Build fact rows from keys assigned by the warehouse.
    pub fn resolve(&self, keys: &DimensionKeys) -> Result<Vec<FactSalesRow>, EtlError> {
        resolve_facts(keys, &self.sales)
    }

    /// Keys as an empty warehouse would assign them.
    pub fn sequential_keys(&self) -> DimensionKeys {
        DimensionKeys::sequential(&self.customers, &self.products, &self.dates)
    }

    /// Resolve facts without a database.
    pub fn dry_run(&self) -> Result<Vec<FactSalesRow>, EtlError> {
        self.resolve(&self.sequential_keys())
    }
}

/// Run the transform stage over one set of raw tables.
///
/// Dimensions are cleaned before sales so an empty dimension is reported
/// first.
///
/// # Errors
/// `EtlError::EmptyBatch` when any entity type has no valid rows.
pub fn transform(raw: &RawBatches, policy: &CleaningPolicy) -> Result<TransformedBatch, EtlError> {
    let run_id = RunId::new();
    let span = tracing::info_span!("transform", run_id = %run_id);
    let _enter = span.enter();

    let customers = clean_batch::<CustomerRecord>(&raw.customers, policy)?;
    let products = clean_batch::<ProductRecord>(&raw.products, policy)?;
    let sales = clean_batch::<SalesRecord>(&raw.sales, policy)?;
    let dates = build_date_dimension(&sales.records);

    let report = TransformReport {
        sales: sales.report,
        customers: customers.report,
        products: products.report,
        dates: dates.len(),
    };
    tracing::info!(
        "Transform complete: {} sales, {} customers, {} products, {} dates",
        sales.records.len(),
        customers.records.len(),
        products.records.len(),
        dates.len()
    );

    Ok(TransformedBatch {
        run_id,
        sales: sales.records,
        customers: customers.records,
        products: products.records,
        dates,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::RawBatch;

    fn raw(sales: &str, customers: &str, products: &str) -> RawBatches {
        RawBatches {
            sales: RawBatch::from_csv_str("sales", sales).unwrap(),
            customers: RawBatch::from_csv_str("customers", customers).unwrap(),
            products: RawBatch::from_csv_str("products", products).unwrap(),
        }
    }

    const CUSTOMERS: &str = "customer_id,customer_name,email,city,country\n101,Alice,a@x.com,Paris,France\n";
    const PRODUCTS: &str = "product_id,product_name,category,subcategory,unit_cost\n1,Mouse,Electronics,Accessories,4.50\n";

    #[test]
    fn test_transform_and_dry_run() {
        let sales = "sale_id,sale_date,customer_id,product_id,quantity,unit_price\n\
                     1,2024-01-15,101,1,2,10.00\n\
                     2,2024-01-16,101,1,1,12.50\n";
        let batch = transform(&raw(sales, CUSTOMERS, PRODUCTS), &CleaningPolicy::default()).unwrap();

        assert_eq!(batch.sales.len(), 2);
        assert_eq!(batch.dates.len(), 2);
        assert_eq!(batch.report.dates, 2);

        let facts = batch.dry_run().unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[1].date_key, 2);
    }

    #[test]
    fn test_empty_customers_reported() {
        let sales = "sale_id,sale_date,customer_id,product_id,quantity,unit_price\n1,2024-01-15,101,1,2,10.00\n";
        let customers = "customer_id,customer_name,email,city,country\n";

        let err = transform(&raw(sales, customers, PRODUCTS), &CleaningPolicy::default()).unwrap_err();

        assert!(matches!(err, EtlError::EmptyBatch { entity: "customers" }));
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        let sales = "sale_id,sale_date,customer_id,product_id,quantity,unit_price\n1,2024-01-15,101,1,2,10.00\n";
        let input = raw(sales, CUSTOMERS, PRODUCTS);

        let a = transform(&input, &CleaningPolicy::default()).unwrap();
        let b = transform(&input, &CleaningPolicy::default()).unwrap();

        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.dates, b.dates);
    }
}
