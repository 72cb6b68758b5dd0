//! Record cleaning.
//!
//! Turns raw string rows into typed records, one entity type at a time.
//! Bad rows are dropped and counted, never raised. Only a batch that ends up
//! empty is an error.

use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::entity::{CustomerRecord, Entity, ProductRecord, SalesRecord};
use crate::error::{EtlError, RowRejection};
use crate::extraction::{Extractor, RawBatch, RawRow};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// Integer digits of a NUMERIC(12, 2) column.
const MONEY_INTEGER_DIGITS: usize = 10;

/// Values written into descriptive columns when `OnMissing::Fill` is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillDefaults {
    pub text: String,
    pub number: BigDecimal,
}

impl Default for FillDefaults {
    fn default() -> Self {
        FillDefaults {
            text: "Unknown".to_string(),
            number: BigDecimal::zero(),
        }
    }
}

/// What to do with a row whose descriptive column is blank.
///
/// Required columns (keys, names, dates, quantities, prices) always drop the
/// row when missing, whatever the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMissing {
    Drop,
    Fill(FillDefaults),
}

impl Default for OnMissing {
    fn default() -> Self {
        OnMissing::Drop
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningPolicy {
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub on_missing: OnMissing,
}

impl CleaningPolicy {
    pub fn drop_missing() -> Self {
        Self {
            on_missing: OnMissing::Drop,
        }
    }

    pub fn fill_missing(defaults: FillDefaults) -> Self {
        Self {
            on_missing: OnMissing::Fill(defaults),
        }
    }
}

/// Typed access to the cells of one raw row under a cleaning policy.
pub struct FieldReader<'a> {
    row: &'a RawRow,
    policy: &'a CleaningPolicy,
    filled: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(row: &'a RawRow, policy: &'a CleaningPolicy) -> Self {
        Self {
            row,
            policy,
            filled: 0,
        }
    }

    /// Number of cells filled with defaults so far.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn required(&self, field: &'static str) -> Result<&'a str, RowRejection> {
        self.row
            .extract(field)
            .ok_or(RowRejection::Missing { field })
    }

    pub fn required_integer(&self, field: &'static str) -> Result<i32, RowRejection> {
        let raw = self.required(field)?;
        parse_integer(raw).ok_or_else(|| invalid(field, raw))
    }

    /// A money column: plain decimal, at most two fractional digits.
    pub fn required_decimal(&self, field: &'static str) -> Result<BigDecimal, RowRejection> {
        let raw = self.required(field)?;
        parse_money(raw).ok_or_else(|| invalid(field, raw))
    }

    pub fn required_date(&self, field: &'static str) -> Result<NaiveDate, RowRejection> {
        let raw = self.required(field)?;
        parse_date(raw).ok_or_else(|| invalid(field, raw))
    }

    /// A text column that may be filled in under `OnMissing::Fill`.
    pub fn descriptive(&mut self, field: &'static str) -> Result<String, RowRejection> {
        if let Some(value) = self.row.extract(field) {
            return Ok(value.to_string());
        }
        match &self.policy.on_missing {
            OnMissing::Drop => Err(RowRejection::Missing { field }),
            OnMissing::Fill(defaults) => {
                self.filled += 1;
                Ok(defaults.text.clone())
            }
        }
    }

    /// A numeric column that may be filled in under `OnMissing::Fill`.
    pub fn descriptive_decimal(&mut self, field: &'static str) -> Result<BigDecimal, RowRejection> {
        if let Some(raw) = self.row.extract(field) {
            return parse_money(raw).ok_or_else(|| invalid(field, raw));
        }
        match &self.policy.on_missing {
            OnMissing::Drop => Err(RowRejection::Missing { field }),
            OnMissing::Fill(defaults) => {
                self.filled += 1;
                Ok(defaults.number.with_scale(2))
            }
        }
    }
}

fn invalid(field: &'static str, raw: &str) -> RowRejection {
    RowRejection::Invalid {
        field,
        value: raw.to_string(),
    }
}

/// Split a plain decimal literal into its integer and fraction digits.
///
/// Only an optional sign, digits and one `.` are allowed. Exponents are
/// rejected so a short cell can never expand into a huge number.
fn plain_number(raw: &str) -> Option<(&str, &str)> {
    let unsigned = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    Some((int_part, frac_part))
}

/// Parse an integer cell. Accepts `"101"` and integral decimals like `"101.0"`.
pub fn parse_integer(raw: &str) -> Option<i32> {
    let (_, frac_part) = plain_number(raw)?;
    if frac_part.bytes().any(|b| b != b'0') {
        return None;
    }
    let int_text = raw.split_once('.').map_or(raw, |(int_text, _)| int_text);
    int_text.parse::<i32>().ok()
}

/// Parse a money cell into a value with scale 2.
///
/// Fits the warehouse `NUMERIC(12, 2)` columns: at most ten integer digits
/// and no non-zero digit past the cents.
pub fn parse_money(raw: &str) -> Option<BigDecimal> {
    let (int_part, frac_part) = plain_number(raw)?;
    if int_part.trim_start_matches('0').len() > MONEY_INTEGER_DIGITS {
        return None;
    }
    if frac_part.bytes().skip(2).any(|b| b != b'0') {
        return None;
    }
    let value = BigDecimal::from_str(raw).ok()?;
    Some(value.with_scale(2))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Records that can be built from a raw row.
///
/// The business key is parsed on its own first so that duplicate detection
/// follows input order even when the rest of the row turns out invalid.
pub trait FromRawRow: Entity {
    fn parse_key(fields: &FieldReader<'_>) -> Result<Self::Key, RowRejection>;

    fn from_fields(fields: &mut FieldReader<'_>, key: Self::Key) -> Result<Self, RowRejection>;
}

impl FromRawRow for SalesRecord {
    fn parse_key(fields: &FieldReader<'_>) -> Result<i32, RowRejection> {
        fields.required_integer("sale_id")
    }

    fn from_fields(fields: &mut FieldReader<'_>, sale_id: i32) -> Result<Self, RowRejection> {
        let customer_id = fields.required_integer("customer_id")?;
        let product_id = fields.required_integer("product_id")?;
        let sale_date = fields.required_date("sale_date")?;

        let quantity = fields.required_integer("quantity")?;
        if quantity <= 0 {
            return Err(invalid("quantity", fields.required("quantity")?));
        }
        let unit_price = fields.required_decimal("unit_price")?;
        if unit_price < BigDecimal::zero() {
            return Err(invalid("unit_price", fields.required("unit_price")?));
        }

        Ok(SalesRecord {
            sale_id,
            customer_id,
            product_id,
            sale_date,
            quantity,
            unit_price,
        })
    }
}

impl FromRawRow for CustomerRecord {
    fn parse_key(fields: &FieldReader<'_>) -> Result<i32, RowRejection> {
        fields.required_integer("customer_id")
    }

    fn from_fields(fields: &mut FieldReader<'_>, customer_id: i32) -> Result<Self, RowRejection> {
        Ok(CustomerRecord {
            customer_id,
            customer_name: fields.required("customer_name")?.to_string(),
            email: fields.descriptive("email")?,
            city: fields.descriptive("city")?,
            country: fields.descriptive("country")?,
        })
    }
}

impl FromRawRow for ProductRecord {
    fn parse_key(fields: &FieldReader<'_>) -> Result<i32, RowRejection> {
        fields.required_integer("product_id")
    }

    fn from_fields(fields: &mut FieldReader<'_>, product_id: i32) -> Result<Self, RowRejection> {
        let product_name = fields.required("product_name")?.to_string();
        let category = fields.descriptive("category")?;
        let subcategory = fields.descriptive("subcategory")?;
        let unit_cost = fields.descriptive_decimal("unit_cost")?;
        if unit_cost < BigDecimal::zero() {
            return Err(invalid("unit_cost", &unit_cost.to_string()));
        }

        Ok(ProductRecord {
            product_id,
            product_name,
            category,
            subcategory,
            unit_cost,
        })
    }
}

/// Row counts from one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub total: usize,
    pub kept: usize,
    pub missing: usize,
    pub invalid: usize,
    pub duplicate: usize,
    /// Cells filled with defaults in kept rows
    pub filled: usize,
}

impl CleanReport {
    fn reject(&mut self, rejection: &RowRejection) {
        match rejection {
            RowRejection::Missing { .. } => self.missing += 1,
            RowRejection::Invalid { .. } => self.invalid += 1,
            RowRejection::Duplicate { .. } => self.duplicate += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.missing + self.invalid + self.duplicate
    }
}

/// A cleaned batch of one entity type.
#[derive(Debug, Clone)]
pub struct Cleaned<T> {
    pub records: Vec<T>,
    pub report: CleanReport,
}

/// Clean one raw batch.
///
/// # Errors
/// Returns `EtlError::EmptyBatch` when no row survives.
pub fn clean_batch<T: FromRawRow>(
    batch: &RawBatch,
    policy: &CleaningPolicy,
) -> Result<Cleaned<T>, EtlError> {
    let mut seen: HashSet<T::Key> = HashSet::new();
    let mut report = CleanReport {
        total: batch.rows.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(batch.rows.len());

    for (i, row) in batch.rows.iter().enumerate() {
        let mut fields = FieldReader::new(row, policy);
        match clean_row::<T>(&mut fields, &mut seen) {
            Ok(record) => {
                report.filled += fields.filled();
                records.push(record);
            }
            Err(rejection) => {
                // Row numbers are 1-based and exclude the header.
                tracing::debug!(entity = T::NAME, row = i + 1, "Dropped row: {}", rejection);
                report.reject(&rejection);
            }
        }
    }
    report.kept = records.len();

    if report.dropped() > 0 {
        tracing::info!(
            "Removed {} {} rows ({} missing, {} invalid, {} duplicate)",
            report.dropped(),
            T::NAME,
            report.missing,
            report.invalid,
            report.duplicate
        );
    }
    if report.filled > 0 {
        tracing::warn!("Filled {} missing {} cells with defaults", report.filled, T::NAME);
    }
    if records.is_empty() {
        return Err(EtlError::EmptyBatch { entity: T::NAME });
    }
    tracing::info!("Cleaned {} {} records", report.kept, T::NAME);

    Ok(Cleaned { records, report })
}

fn clean_row<T: FromRawRow>(
    fields: &mut FieldReader<'_>,
    seen: &mut HashSet<T::Key>,
) -> Result<T, RowRejection> {
    let key = T::parse_key(fields)?;
    if !seen.insert(key.clone()) {
        return Err(RowRejection::Duplicate {
            key: key.to_string(),
        });
    }
    T::from_fields(fields, key)
}
