//! Loads orders from a CSV export so daily reports can be produced offline.
//!
//! Expected header:
//! `id,user_id,company_id,lunch_option_id,date,status,unit_price,subsidized_price`
//! with optional `approved_by`, `created_at` and `updated_at` columns.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{
    CompanyId, LunchOptionId, Money, Order, OrderId, OrderStatus, UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum OrderImportError {
    #[error("failed to read order export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid order CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid {field} '{value}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

pub fn orders_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Order>, OrderImportError> {
    let file = std::fs::File::open(path)?;
    orders_from_reader(file)
}

pub fn orders_from_reader<R: Read>(reader: R) -> Result<Vec<Order>, OrderImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut orders = Vec::new();

    for (index, record) in csv_reader.deserialize::<OrderRow>().enumerate() {
        // header is line 1
        let row = index + 2;
        orders.push(record?.into_order(row)?);
    }

    Ok(orders)
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    id: String,
    user_id: String,
    company_id: String,
    lunch_option_id: String,
    date: String,
    status: String,
    unit_price: String,
    subsidized_price: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    approved_by: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    updated_at: Option<String>,
}

impl OrderRow {
    fn into_order(self, row: usize) -> Result<Order, OrderImportError> {
        let invalid = |field: &'static str, value: &str| OrderImportError::InvalidField {
            row,
            field,
            value: value.to_string(),
        };
        let required = |field: &'static str, value: String| {
            if value.is_empty() {
                Err(invalid(field, &value))
            } else {
                Ok(value)
            }
        };

        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| invalid("date", &self.date))?;
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|_| invalid("status", &self.status))?;
        let unit_price = parse_price(&self.unit_price)
            .ok_or_else(|| invalid("unit_price", &self.unit_price))?;
        let subsidized_price = parse_price(&self.subsidized_price)
            .ok_or_else(|| invalid("subsidized_price", &self.subsidized_price))?;

        let start_of_day = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        let created_at = match self.created_at.as_deref() {
            Some(raw) => parse_timestamp(raw).ok_or_else(|| invalid("created_at", raw))?,
            None => start_of_day.ok_or_else(|| invalid("date", &self.date))?,
        };
        let updated_at = match self.updated_at.as_deref() {
            Some(raw) => parse_timestamp(raw).ok_or_else(|| invalid("updated_at", raw))?,
            None => created_at,
        };

        Ok(Order {
            id: OrderId(required("id", self.id)?),
            user_id: UserId(required("user_id", self.user_id)?),
            company_id: CompanyId(required("company_id", self.company_id)?),
            lunch_option_id: LunchOptionId(required("lunch_option_id", self.lunch_option_id)?),
            date,
            status,
            unit_price,
            subsidized_price,
            approved_by: self.approved_by.map(UserId),
            created_at,
            updated_at,
        })
    }
}

fn parse_price(raw: &str) -> Option<Money> {
    raw.parse::<Money>().ok().filter(|money| !money.is_negative())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
