//! Date dimension construction.
//!
//! The dimension is sales-driven: one entry per distinct sale date in the
//! cleaned batch, ascending, and nothing else. Weekday names follow ISO 8601
//! (Monday first) and Saturday/Sunday count as the weekend.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

use crate::entity::{DateDimensionEntry, SalesRecord};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Indexed by `Weekday::num_days_from_monday`.
const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Build the date dimension for a cleaned sales batch.
pub fn build_date_dimension(sales: &[SalesRecord]) -> Vec<DateDimensionEntry> {
    let dates: BTreeSet<NaiveDate> = sales.iter().map(|s| s.sale_date).collect();
    let dimension: Vec<DateDimensionEntry> = dates.into_iter().map(date_entry).collect();
    tracing::info!("Created date dimension with {} unique dates", dimension.len());
    dimension
}

/// Calendar attributes for a single date.
pub fn date_entry(date: NaiveDate) -> DateDimensionEntry {
    let month = date.month();
    let quarter = (month - 1) / 3 + 1;
    let weekday = date.weekday();

    DateDimensionEntry {
        sale_date: date,
        day: date.day() as i32,
        month: month as i32,
        quarter: quarter as i32,
        year: date.year(),
        month_name: MONTH_NAMES[(month - 1) as usize].to_string(),
        quarter_name: format!("Q{}", quarter),
        day_of_week: DAY_NAMES[weekday.num_days_from_monday() as usize].to_string(),
        is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
    }
}
