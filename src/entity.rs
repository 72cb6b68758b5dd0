//! Core entity trait and the record types that flow through the pipeline.
//!
//! Every stage consumes and produces these records by value. Dimension
//! records are identified by their business key until the warehouse assigns
//! a surrogate key; fact rows only carry surrogate keys.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Core trait for all warehouse-bound records.
///
/// # Example
///
/// ```ignore
/// use salesdw::Entity;
///
/// #[derive(Serialize)]
/// struct Store {
///     store_id: i32,
/// }
///
/// impl Entity for Store {
///     const NAME: &'static str = "stores";
///     type Key = i32;
///     fn business_key(&self) -> i32 {
///         self.store_id
///     }
/// }
/// ```
pub trait Entity: Serialize + Sized {
    /// The name of this entity type, used in logs and errors
    const NAME: &'static str;

    /// Natural identifier from the source system
    type Key: Eq + Hash + Clone + fmt::Display;

    fn business_key(&self) -> Self::Key;
}

/// One sale transaction (the fact grain) before key resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub sale_id: i32,
    pub customer_id: i32,
    pub product_id: i32,
    pub sale_date: NaiveDate,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl SalesRecord {
    /// Unrounded `quantity × unit_price`.
    pub fn total_amount(&self) -> BigDecimal {
        BigDecimal::from(self.quantity) * &self.unit_price
    }
}

impl Entity for SalesRecord {
    const NAME: &'static str = "sales";
    type Key = i32;

    fn business_key(&self) -> i32 {
        self.sale_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: i32,
    pub customer_name: String,
    pub email: String,
    pub city: String,
    pub country: String,
}

impl Entity for CustomerRecord {
    const NAME: &'static str = "customers";
    type Key = i32;

    fn business_key(&self) -> i32 {
        self.customer_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: i32,
    pub product_name: String,
    pub category: String,
    pub subcategory: String,
    pub unit_cost: BigDecimal,
}

impl Entity for ProductRecord {
    const NAME: &'static str = "products";
    type Key = i32;

    fn business_key(&self) -> i32 {
        self.product_id
    }
}

/// Calendar attributes of one sale date. Derived entirely from `sale_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDimensionEntry {
    pub sale_date: NaiveDate,
    pub day: i32,
    pub month: i32,
    pub quarter: i32,
    pub year: i32,
    pub month_name: String,
    pub quarter_name: String,
    pub day_of_week: String,
    pub is_weekend: bool,
}

impl Entity for DateDimensionEntry {
    const NAME: &'static str = "dates";
    type Key = NaiveDate;

    fn business_key(&self) -> NaiveDate {
        self.sale_date
    }
}

/// A sale with its dimension references resolved to surrogate keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSalesRow {
    pub sale_id: i32,
    pub date_key: i32,
    pub customer_key: i32,
    pub product_key: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_amount: BigDecimal,
}

impl Entity for FactSalesRow {
    const NAME: &'static str = "fact_sales";
    type Key = i32;

    fn business_key(&self) -> i32 {
        self.sale_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn customer() -> CustomerRecord {
        CustomerRecord {
            customer_id: 101,
            customer_name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            city: "Toronto".to_string(),
            country: "Canada".to_string(),
        }
    }

    #[test]
    fn test_customer_serializes_flat() {
        let json = serde_json::to_string(&customer()).unwrap();
        assert!(json.contains("Alice"));
        assert!(json.contains("\"customer_id\":101"));
        assert!(json.contains("\"city\":\"Toronto\""));
        assert_eq!(customer().business_key(), 101);
    }

    #[test]
    fn test_sales_total_amount() {
        let sale = SalesRecord {
            sale_id: 1,
            customer_id: 101,
            product_id: 1,
            sale_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            quantity: 3,
            unit_price: BigDecimal::from_str("19.99").unwrap(),
        };
        assert_eq!(sale.total_amount(), BigDecimal::from_str("59.97").unwrap());
        assert_eq!(sale.business_key(), 1);
    }
}
