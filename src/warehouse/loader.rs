//! Transactional load of a transformed batch into the star schema.
//!
//! Dimensions go first, then their surrogate keys are read back and used to
//! resolve the fact rows. All four tables are written inside one transaction,
//! so a failure anywhere leaves the warehouse untouched.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde::Serialize;
use std::collections::HashMap;

use crate::entity::FactSalesRow;
use crate::error::EtlError;
use crate::keys::DimensionKeys;
use crate::pipeline::TransformedBatch;
use crate::warehouse::database::DbConnection;
use crate::warehouse::models::{NewCustomer, NewDate, NewFactSale, NewProduct};
use crate::warehouse::schema::{dim_customer, dim_date, dim_product, fact_sales};

/// Rows per INSERT statement; keeps bind parameters well under the Postgres limit.
const INSERT_CHUNK: usize = 1000;

/// Row counts written by one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub customers: usize,
    pub products: usize,
    /// Dates not already present in the warehouse
    pub new_dates: usize,
    pub facts: usize,
}

/// Load a transformed batch.
///
/// # Errors
/// Any database error or `EtlError::DanglingReference` rolls the whole run back.
pub fn load(conn: &mut DbConnection, batch: &TransformedBatch) -> Result<LoadSummary, EtlError> {
    let span = tracing::info_span!("load", run_id = %batch.run_id);
    let _enter = span.enter();

    let summary = conn.transaction::<_, EtlError, _>(|conn| {
        let customers = upsert_customers(conn, batch)?;
        let products = upsert_products(conn, batch)?;
        let new_dates = insert_dates(conn, batch)?;

        let keys = read_keys(conn, batch)?;
        let facts = batch.resolve(&keys)?;
        let facts = upsert_facts(conn, &facts)?;

        Ok(LoadSummary {
            customers,
            products,
            new_dates,
            facts,
        })
    })?;

    tracing::info!(
        "Loaded {} customers, {} products, {} new dates, {} facts",
        summary.customers,
        summary.products,
        summary.new_dates,
        summary.facts
    );
    Ok(summary)
}

fn upsert_customers(conn: &mut DbConnection, batch: &TransformedBatch) -> Result<usize, EtlError> {
    let rows: Vec<NewCustomer<'_>> = batch.customers.iter().map(NewCustomer::from).collect();
    let mut written = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        written += diesel::insert_into(dim_customer::table)
            .values(chunk)
            .on_conflict(dim_customer::customer_id)
            .do_update()
            .set((
                dim_customer::customer_name.eq(excluded(dim_customer::customer_name)),
                dim_customer::email.eq(excluded(dim_customer::email)),
                dim_customer::city.eq(excluded(dim_customer::city)),
                dim_customer::country.eq(excluded(dim_customer::country)),
            ))
            .execute(conn)?;
    }
    Ok(written)
}

fn upsert_products(conn: &mut DbConnection, batch: &TransformedBatch) -> Result<usize, EtlError> {
    let rows: Vec<NewProduct<'_>> = batch.products.iter().map(NewProduct::from).collect();
    let mut written = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        written += diesel::insert_into(dim_product::table)
            .values(chunk)
            .on_conflict(dim_product::product_id)
            .do_update()
            .set((
                dim_product::product_name.eq(excluded(dim_product::product_name)),
                dim_product::category.eq(excluded(dim_product::category)),
                dim_product::subcategory.eq(excluded(dim_product::subcategory)),
                dim_product::unit_cost.eq(excluded(dim_product::unit_cost)),
            ))
            .execute(conn)?;
    }
    Ok(written)
}

// Date attributes are derived from the date itself, so existing rows never change.
fn insert_dates(conn: &mut DbConnection, batch: &TransformedBatch) -> Result<usize, EtlError> {
    let rows: Vec<NewDate<'_>> = batch.dates.iter().map(NewDate::from).collect();
    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        inserted += diesel::insert_into(dim_date::table)
            .values(chunk)
            .on_conflict(dim_date::sale_date)
            .do_nothing()
            .execute(conn)?;
    }
    Ok(inserted)
}

/// Surrogate keys for exactly the business keys in this batch.
fn read_keys(conn: &mut DbConnection, batch: &TransformedBatch) -> Result<DimensionKeys, EtlError> {
    let customer_ids: Vec<i32> = batch.customers.iter().map(|c| c.customer_id).collect();
    let customers: HashMap<i32, i32> = dim_customer::table
        .filter(dim_customer::customer_id.eq_any(customer_ids))
        .select((dim_customer::customer_id, dim_customer::customer_key))
        .load::<(i32, i32)>(conn)?
        .into_iter()
        .collect();

    let product_ids: Vec<i32> = batch.products.iter().map(|p| p.product_id).collect();
    let products: HashMap<i32, i32> = dim_product::table
        .filter(dim_product::product_id.eq_any(product_ids))
        .select((dim_product::product_id, dim_product::product_key))
        .load::<(i32, i32)>(conn)?
        .into_iter()
        .collect();

    let sale_dates: Vec<NaiveDate> = batch.dates.iter().map(|d| d.sale_date).collect();
    let dates: HashMap<NaiveDate, i32> = dim_date::table
        .filter(dim_date::sale_date.eq_any(sale_dates))
        .select((dim_date::sale_date, dim_date::date_key))
        .load::<(NaiveDate, i32)>(conn)?
        .into_iter()
        .collect();

    tracing::debug!(
        customers = customers.len(),
        products = products.len(),
        dates = dates.len(),
        "Read back surrogate keys"
    );
    Ok(DimensionKeys::from_maps(customers, products, dates))
}

fn upsert_facts(conn: &mut DbConnection, facts: &[FactSalesRow]) -> Result<usize, EtlError> {
    let rows: Vec<NewFactSale<'_>> = facts.iter().map(NewFactSale::from).collect();
    let mut written = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        written += diesel::insert_into(fact_sales::table)
            .values(chunk)
            .on_conflict(fact_sales::sale_id)
            .do_update()
            .set((
                fact_sales::date_key.eq(excluded(fact_sales::date_key)),
                fact_sales::customer_key.eq(excluded(fact_sales::customer_key)),
                fact_sales::product_key.eq(excluded(fact_sales::product_key)),
                fact_sales::quantity.eq(excluded(fact_sales::quantity)),
                fact_sales::unit_price.eq(excluded(fact_sales::unit_price)),
                fact_sales::total_amount.eq(excluded(fact_sales::total_amount)),
            ))
            .execute(conn)?;
    }
    Ok(written)
}
