use std::io::Read;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

use super::IncomingReport;

/// Parse a clinic's visit export. Expected headers: `Patient`, `Clinic`, `Visit Date`,
/// `Amount` (minor units). Blank cells are read as missing values.
pub(crate) fn parse_reports<R: Read>(reader: R) -> Result<Vec<IncomingReport>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut reports = Vec::new();

    for record in csv_reader.deserialize::<VisitRow>() {
        let row = record?;
        reports.push(IncomingReport {
            patient_name: row.patient,
            clinic_name: row.clinic,
            visit_date: row.visit_date,
            treatment_amount: row.amount,
        });
    }

    Ok(reports)
}

#[derive(Debug, Deserialize)]
struct VisitRow {
    #[serde(rename = "Patient")]
    patient: String,
    #[serde(rename = "Clinic", default, deserialize_with = "empty_string_as_none")]
    clinic: Option<String>,
    #[serde(rename = "Visit Date", default, deserialize_with = "optional_visit_date")]
    visit_date: Option<NaiveDate>,
    #[serde(rename = "Amount", default)]
    amount: Option<i64>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn optional_visit_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = empty_string_as_none(deserializer)?;
    opt.map(|raw| {
        parse_visit_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized visit date '{raw}'")))
    })
    .transpose()
}

/// Accepts `YYYY-MM-DD`, `DD.MM.YYYY` and RFC 3339 timestamps.
pub fn parse_visit_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d.%m.%Y") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}
