// Star schema: one fact table, three dimensions keyed by surrogate key.

use diesel::connection::SimpleConnection;

use crate::error::EtlError;
use crate::warehouse::database::DbConnection;

diesel::table! {
    dim_customer (customer_key) {
        customer_key -> Int4,
        customer_id -> Int4,
        customer_name -> Text,
        email -> Text,
        city -> Text,
        country -> Text,
    }
}

diesel::table! {
    dim_product (product_key) {
        product_key -> Int4,
        product_id -> Int4,
        product_name -> Text,
        category -> Text,
        subcategory -> Text,
        unit_cost -> Numeric,
    }
}

diesel::table! {
    dim_date (date_key) {
        date_key -> Int4,
        sale_date -> Date,
        day -> Int4,
        month -> Int4,
        quarter -> Int4,
        year -> Int4,
        month_name -> Text,
        quarter_name -> Text,
        day_of_week -> Text,
        is_weekend -> Bool,
    }
}

diesel::table! {
    fact_sales (sale_id) {
        sale_id -> Int4,
        date_key -> Int4,
        customer_key -> Int4,
        product_key -> Int4,
        quantity -> Int4,
        unit_price -> Numeric,
        total_amount -> Numeric,
    }
}

diesel::joinable!(fact_sales -> dim_customer (customer_key));
diesel::joinable!(fact_sales -> dim_product (product_key));
diesel::joinable!(fact_sales -> dim_date (date_key));

diesel::allow_tables_to_appear_in_same_query!(dim_customer, dim_product, dim_date, fact_sales,);

/// DDL for the four warehouse tables. Safe to run repeatedly.
pub const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS dim_customer (
    customer_key  SERIAL PRIMARY KEY,
    customer_id   INTEGER NOT NULL UNIQUE,
    customer_name TEXT NOT NULL,
    email         TEXT NOT NULL,
    city          TEXT NOT NULL,
    country       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_product (
    product_key  SERIAL PRIMARY KEY,
    product_id   INTEGER NOT NULL UNIQUE,
    product_name TEXT NOT NULL,
    category     TEXT NOT NULL,
    subcategory  TEXT NOT NULL,
    unit_cost    NUMERIC(12, 2) NOT NULL CHECK (unit_cost >= 0)
);

CREATE TABLE IF NOT EXISTS dim_date (
    date_key     SERIAL PRIMARY KEY,
    sale_date    DATE NOT NULL UNIQUE,
    day          INTEGER NOT NULL,
    month        INTEGER NOT NULL,
    quarter      INTEGER NOT NULL,
    year         INTEGER NOT NULL,
    month_name   TEXT NOT NULL,
    quarter_name TEXT NOT NULL,
    day_of_week  TEXT NOT NULL,
    is_weekend   BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS fact_sales (
    sale_id      INTEGER PRIMARY KEY,
    date_key     INTEGER NOT NULL REFERENCES dim_date (date_key),
    customer_key INTEGER NOT NULL REFERENCES dim_customer (customer_key),
    product_key  INTEGER NOT NULL REFERENCES dim_product (product_key),
    quantity     INTEGER NOT NULL CHECK (quantity > 0),
    unit_price   NUMERIC(12, 2) NOT NULL CHECK (unit_price >= 0),
    total_amount NUMERIC(14, 2) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fact_sales_date ON fact_sales (date_key);
CREATE INDEX IF NOT EXISTS idx_fact_sales_customer ON fact_sales (customer_key);
CREATE INDEX IF NOT EXISTS idx_fact_sales_product ON fact_sales (product_key);
"#;

/// Ensure warehouse tables exist
pub fn ensure_tables(conn: &mut DbConnection) -> Result<(), EtlError> {
    tracing::info!("Ensuring warehouse tables exist...");
    conn.batch_execute(CREATE_TABLES_SQL)?;
    Ok(())
}
