//! Canned analytical queries over the star schema.

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer, Numeric, Text};
use serde::Serialize;

use crate::error::EtlError;
use crate::warehouse::database::DbConnection;

pub const MONTHLY_REVENUE_SQL: &str = r#"
SELECT d.year, d.month, d.month_name,
       COUNT(*) AS orders,
       SUM(f.total_amount) AS revenue
FROM fact_sales f
JOIN dim_date d ON d.date_key = f.date_key
GROUP BY d.year, d.month, d.month_name
ORDER BY d.year, d.month
"#;

pub const TOP_PRODUCTS_SQL: &str = r#"
SELECT p.product_name, p.category,
       SUM(f.quantity)::BIGINT AS units_sold,
       SUM(f.total_amount) AS revenue
FROM fact_sales f
JOIN dim_product p ON p.product_key = f.product_key
GROUP BY p.product_key, p.product_name, p.category
ORDER BY revenue DESC, p.product_name
LIMIT $1
"#;

pub const REVENUE_BY_COUNTRY_SQL: &str = r#"
SELECT c.country,
       COUNT(DISTINCT c.customer_key) AS customers,
       SUM(f.total_amount) AS revenue
FROM fact_sales f
JOIN dim_customer c ON c.customer_key = f.customer_key
GROUP BY c.country
ORDER BY revenue DESC, c.country
"#;

pub const WEEKEND_SPLIT_SQL: &str = r#"
SELECT d.is_weekend,
       COUNT(*) AS orders,
       SUM(f.total_amount) AS revenue,
       ROUND(AVG(f.total_amount), 2) AS avg_order_value
FROM fact_sales f
JOIN dim_date d ON d.date_key = f.date_key
GROUP BY d.is_weekend
ORDER BY d.is_weekend
"#;

#[derive(Debug, Clone, QueryableByName, Serialize)]
pub struct MonthlyRevenue {
    #[diesel(sql_type = Integer)]
    pub year: i32,
    #[diesel(sql_type = Integer)]
    pub month: i32,
    #[diesel(sql_type = Text)]
    pub month_name: String,
    #[diesel(sql_type = BigInt)]
    pub orders: i64,
    #[diesel(sql_type = Numeric)]
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, QueryableByName, Serialize)]
pub struct ProductRevenue {
    #[diesel(sql_type = Text)]
    pub product_name: String,
    #[diesel(sql_type = Text)]
    pub category: String,
    #[diesel(sql_type = BigInt)]
    pub units_sold: i64,
    #[diesel(sql_type = Numeric)]
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, QueryableByName, Serialize)]
pub struct CountryRevenue {
    #[diesel(sql_type = Text)]
    pub country: String,
    #[diesel(sql_type = BigInt)]
    pub customers: i64,
    #[diesel(sql_type = Numeric)]
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, QueryableByName, Serialize)]
pub struct WeekendSplit {
    #[diesel(sql_type = Bool)]
    pub is_weekend: bool,
    #[diesel(sql_type = BigInt)]
    pub orders: i64,
    #[diesel(sql_type = Numeric)]
    pub revenue: BigDecimal,
    #[diesel(sql_type = Numeric)]
    pub avg_order_value: BigDecimal,
}

/// All canned queries, as printed by `salesdw report`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub top_products: Vec<ProductRevenue>,
    pub revenue_by_country: Vec<CountryRevenue>,
    pub weekend_split: Vec<WeekendSplit>,
}

pub fn monthly_revenue(conn: &mut DbConnection) -> Result<Vec<MonthlyRevenue>, EtlError> {
    Ok(diesel::sql_query(MONTHLY_REVENUE_SQL).load(conn)?)
}

pub fn top_products(conn: &mut DbConnection, limit: i64) -> Result<Vec<ProductRevenue>, EtlError> {
    Ok(diesel::sql_query(TOP_PRODUCTS_SQL)
        .bind::<BigInt, _>(limit)
        .load(conn)?)
}

pub fn revenue_by_country(conn: &mut DbConnection) -> Result<Vec<CountryRevenue>, EtlError> {
    Ok(diesel::sql_query(REVENUE_BY_COUNTRY_SQL).load(conn)?)
}

pub fn weekend_split(conn: &mut DbConnection) -> Result<Vec<WeekendSplit>, EtlError> {
    Ok(diesel::sql_query(WEEKEND_SPLIT_SQL).load(conn)?)
}

pub fn run_all(conn: &mut DbConnection, top_limit: i64) -> Result<AnalyticsReport, EtlError> {
    Ok(AnalyticsReport {
        monthly_revenue: monthly_revenue(conn)?,
        top_products: top_products(conn, top_limit)?,
        revenue_by_country: revenue_by_country(conn)?,
        weekend_split: weekend_split(conn)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_read_from_fact_table() {
        for sql in [
            MONTHLY_REVENUE_SQL,
            TOP_PRODUCTS_SQL,
            REVENUE_BY_COUNTRY_SQL,
            WEEKEND_SPLIT_SQL,
        ] {
            assert!(sql.trim_start().starts_with("SELECT"));
            assert!(sql.contains("FROM fact_sales f"));
        }
    }

    #[test]
    fn test_top_products_is_parameterised() {
        assert!(TOP_PRODUCTS_SQL.contains("LIMIT $1"));
    }
}
