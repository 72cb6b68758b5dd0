//! Surrogate key resolution for fact rows.
//!
//! The warehouse assigns surrogate keys when dimension rows are inserted.
//! `DimensionKeys` holds the business key -> surrogate key maps for one run,
//! and `resolve_facts` uses them to turn sales into fact rows.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::entity::{
    CustomerRecord, DateDimensionEntry, Entity, FactSalesRow, ProductRecord, SalesRecord,
};
use crate::error::{EtlError, MissingKey};

/// Round a money amount to 2 decimal places, half away from zero.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp).with_scale(2)
}

/// Business key -> surrogate key maps for the three dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionKeys {
    pub customers: HashMap<i32, i32>,
    pub products: HashMap<i32, i32>,
    pub dates: HashMap<NaiveDate, i32>,
}

impl DimensionKeys {
    pub fn from_maps(
        customers: HashMap<i32, i32>,
        products: HashMap<i32, i32>,
        dates: HashMap<NaiveDate, i32>,
    ) -> Self {
        Self {
            customers,
            products,
            dates,
        }
    }

    /// Assign keys 1..=n in batch order, the way an empty warehouse would.
    pub fn sequential(
        customers: &[CustomerRecord],
        products: &[ProductRecord],
        dates: &[DateDimensionEntry],
    ) -> Self {
        Self {
            customers: sequential_keys(customers),
            products: sequential_keys(products),
            dates: sequential_keys(dates),
        }
    }

    pub fn customer_key(&self, customer_id: i32) -> Option<i32> {
        self.customers.get(&customer_id).copied()
    }

    pub fn product_key(&self, product_id: i32) -> Option<i32> {
        self.products.get(&product_id).copied()
    }

    pub fn date_key(&self, sale_date: NaiveDate) -> Option<i32> {
        self.dates.get(&sale_date).copied()
    }

    /// Resolve one sale.
    ///
    /// Lookups run customer, product, then date; the first miss is reported.
    pub fn resolve(&self, sale: &SalesRecord) -> Result<FactSalesRow, EtlError> {
        let dangling = |missing| EtlError::DanglingReference {
            sale_id: sale.sale_id,
            missing,
        };

        let customer_key = self
            .customer_key(sale.customer_id)
            .ok_or_else(|| dangling(MissingKey::Customer(sale.customer_id)))?;
        let product_key = self
            .product_key(sale.product_id)
            .ok_or_else(|| dangling(MissingKey::Product(sale.product_id)))?;
        let date_key = self
            .date_key(sale.sale_date)
            .ok_or_else(|| dangling(MissingKey::Date(sale.sale_date)))?;

        Ok(FactSalesRow {
            sale_id: sale.sale_id,
            date_key,
            customer_key,
            product_key,
            quantity: sale.quantity,
            unit_price: sale.unit_price.clone(),
            total_amount: round_money(&sale.total_amount()),
        })
    }
}

fn sequential_keys<T: Entity>(records: &[T]) -> HashMap<T::Key, i32> {
    records
        .iter()
        .zip(1..)
        .map(|(record, key)| (record.business_key(), key))
        .collect()
}

/// Build fact rows for a cleaned sales batch.
///
/// # Errors
/// Fails on the first sale whose customer, product or date has no key.
/// Such a sale is never skipped.
pub fn resolve_facts(
    keys: &DimensionKeys,
    sales: &[SalesRecord],
) -> Result<Vec<FactSalesRow>, EtlError> {
    let facts = sales
        .iter()
        .map(|sale| keys.resolve(sale))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("Resolved {} fact rows", facts.len());
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_dimension::build_date_dimension;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn customer(id: i32) -> CustomerRecord {
        CustomerRecord {
            customer_id: id,
            customer_name: format!("Customer {}", id),
            email: format!("c{}@example.com", id),
            city: "Lisbon".to_string(),
            country: "Portugal".to_string(),
        }
    }

    fn product(id: i32) -> ProductRecord {
        ProductRecord {
            product_id: id,
            product_name: format!("Product {}", id),
            category: "Electronics".to_string(),
            subcategory: "Audio".to_string(),
            unit_cost: dec("3.00"),
        }
    }

    fn sale(id: i32, customer_id: i32, product_id: i32, date: NaiveDate, qty: i32, price: &str) -> SalesRecord {
        SalesRecord {
            sale_id: id,
            customer_id,
            product_id,
            sale_date: date,
            quantity: qty,
            unit_price: dec(price),
        }
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(&dec("1.005")), dec("1.01"));
        assert_eq!(round_money(&dec("1.004")), dec("1.00"));
        assert_eq!(round_money(&dec("2.675")), dec("2.68"));
        assert_eq!(round_money(&dec("7")), dec("7.00"));
    }

    #[test]
    fn test_round_money_keeps_two_places() {
        assert_eq!(round_money(&dec("0.0015")).to_string(), "0.00");
        assert_eq!(round_money(&dec("0")).to_string(), "0.00");
        assert_eq!(round_money(&dec("7")).to_string(), "7.00");
        assert_eq!(
            serde_json::to_string(&round_money(&dec("0.0015"))).unwrap(),
            serde_json::to_string(&dec("0.00")).unwrap()
        );
    }

    #[test]
    fn test_sequential_keys_follow_batch_order() {
        let customers = vec![customer(205), customer(101)];
        let keys = DimensionKeys::sequential(&customers, &[], &[]);

        assert_eq!(keys.customer_key(205), Some(1));
        assert_eq!(keys.customer_key(101), Some(2));
        assert_eq!(keys.product_key(1), None);
    }

    #[test]
    fn test_resolve_round_trip() {
        let customers = vec![customer(101), customer(102)];
        let products = vec![product(1), product(2)];
        let sales = vec![
            sale(1, 102, 2, d(2024, 2, 20), 3, "3.335"),
            sale(2, 101, 1, d(2024, 1, 15), 1, "10.00"),
        ];
        let dates = build_date_dimension(&sales);
        let keys = DimensionKeys::sequential(&customers, &products, &dates);

        let facts = resolve_facts(&keys, &sales).unwrap();

        assert_eq!(facts.len(), 2);
        for (fact, sale) in facts.iter().zip(&sales) {
            let c = keys.customers.iter().find(|(_, k)| **k == fact.customer_key).unwrap();
            let p = keys.products.iter().find(|(_, k)| **k == fact.product_key).unwrap();
            let dt = keys.dates.iter().find(|(_, k)| **k == fact.date_key).unwrap();
            assert_eq!(*c.0, sale.customer_id);
            assert_eq!(*p.0, sale.product_id);
            assert_eq!(*dt.0, sale.sale_date);
            assert_eq!(fact.total_amount, round_money(&sale.total_amount()));
        }
        // 3 x 3.335 = 10.005
        assert_eq!(facts[0].total_amount, dec("10.01"));
        // dates are keyed ascending, so 2024-02-20 gets key 2
        assert_eq!(facts[0].date_key, 2);
    }

    #[test]
    fn test_dangling_customer() {
        let sales = vec![sale(7, 999, 1, d(2024, 1, 15), 1, "1.00")];
        let dates = build_date_dimension(&sales);
        let keys = DimensionKeys::sequential(&[customer(101)], &[product(1)], &dates);

        let err = resolve_facts(&keys, &sales).unwrap_err();

        match &err {
            EtlError::DanglingReference { sale_id, missing } => {
                assert_eq!(*sale_id, 7);
                assert_eq!(*missing, MissingKey::Customer(999));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("customer_id 999"));
    }

    #[test]
    fn test_dangling_product_and_date() {
        let sales = vec![sale(3, 101, 42, d(2024, 1, 15), 1, "1.00")];
        let keys = DimensionKeys::sequential(&[customer(101)], &[product(1)], &[]);

        let err = keys.resolve(&sales[0]).unwrap_err();
        assert!(err.to_string().contains("product_id 42"));

        let keys = DimensionKeys::sequential(&[customer(101)], &[product(42)], &[]);
        let err = keys.resolve(&sales[0]).unwrap_err();
        assert!(err.to_string().contains("sale_date 2024-01-15"));
    }
}
