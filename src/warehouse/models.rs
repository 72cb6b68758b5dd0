//! Diesel row types for the warehouse tables.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use diesel::prelude::*;

use crate::entity::{CustomerRecord, DateDimensionEntry, FactSalesRow, ProductRecord};
use crate::warehouse::schema::*;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dim_customer)]
pub struct NewCustomer<'a> {
    pub customer_id: i32,
    pub customer_name: &'a str,
    pub email: &'a str,
    pub city: &'a str,
    pub country: &'a str,
}

impl<'a> From<&'a CustomerRecord> for NewCustomer<'a> {
    fn from(r: &'a CustomerRecord) -> Self {
        NewCustomer {
            customer_id: r.customer_id,
            customer_name: &r.customer_name,
            email: &r.email,
            city: &r.city,
            country: &r.country,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dim_product)]
pub struct NewProduct<'a> {
    pub product_id: i32,
    pub product_name: &'a str,
    pub category: &'a str,
    pub subcategory: &'a str,
    pub unit_cost: &'a BigDecimal,
}

impl<'a> From<&'a ProductRecord> for NewProduct<'a> {
    fn from(r: &'a ProductRecord) -> Self {
        NewProduct {
            product_id: r.product_id,
            product_name: &r.product_name,
            category: &r.category,
            subcategory: &r.subcategory,
            unit_cost: &r.unit_cost,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dim_date)]
pub struct NewDate<'a> {
    pub sale_date: NaiveDate,
    pub day: i32,
    pub month: i32,
    pub quarter: i32,
    pub year: i32,
    pub month_name: &'a str,
    pub quarter_name: &'a str,
    pub day_of_week: &'a str,
    pub is_weekend: bool,
}

impl<'a> From<&'a DateDimensionEntry> for NewDate<'a> {
    fn from(r: &'a DateDimensionEntry) -> Self {
        NewDate {
            sale_date: r.sale_date,
            day: r.day,
            month: r.month,
            quarter: r.quarter,
            year: r.year,
            month_name: &r.month_name,
            quarter_name: &r.quarter_name,
            day_of_week: &r.day_of_week,
            is_weekend: r.is_weekend,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = fact_sales)]
pub struct NewFactSale<'a> {
    pub sale_id: i32,
    pub date_key: i32,
    pub customer_key: i32,
    pub product_key: i32,
    pub quantity: i32,
    pub unit_price: &'a BigDecimal,
    pub total_amount: &'a BigDecimal,
}

impl<'a> From<&'a FactSalesRow> for NewFactSale<'a> {
    fn from(r: &'a FactSalesRow) -> Self {
        NewFactSale {
            sale_id: r.sale_id,
            date_key: r.date_key,
            customer_key: r.customer_key,
            product_key: r.product_key,
            quantity: r.quantity,
            unit_price: &r.unit_price,
            total_amount: &r.total_amount,
        }
    }
}
