use chrono::{DateTime, Utc};
use serde_aux::field_attributes::deserialize_number_from_string;
use serde_json::Value;
use std::fmt;

use crate::domain::expiry_date::{days_left, MalformedDate, ParsedDate};
use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    FirstName,
    LastName,
    Email,
    ExpiryDate,
}

impl fmt::Display for RowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowField::FirstName => "firstName",
            RowField::LastName => "lastName",
            RowField::Email => "email",
            RowField::ExpiryDate => "expiryDate",
        };

        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubscriberRowError {
    #[error("Unexpected {0} value.")]
    MissingField(RowField),
    #[error("Invalid {field} value.")]
    InvalidField {
        field: RowField,
        #[source]
        cause: Option<MalformedDate>,
    },
}

/// Position of each field inside a spreadsheet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct ColumnLayout {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub first_name: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub last_name: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub email: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub expiry_date: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout {
            first_name: 0,
            last_name: 1,
            email: 3,
            expiry_date: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubscriberRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: SubscriberEmail,
    pub expiry_date: ParsedDate,
    pub expires_at: DateTime<Utc>,
}

impl SubscriberRecord {
    /// Builds a record out of one spreadsheet row. Every field must be a string
    /// cell, otherwise the whole row is rejected.
    pub fn from_row(row: &[Value], columns: &ColumnLayout) -> Result<Self, SubscriberRowError> {
        let first_name = string_cell(row, columns.first_name, RowField::FirstName)?;
        let last_name = string_cell(row, columns.last_name, RowField::LastName)?;
        let raw_expiry_date = string_cell(row, columns.expiry_date, RowField::ExpiryDate)?;
        let email = string_cell(row, columns.email, RowField::Email)?;

        Self::parse(first_name, last_name, email, raw_expiry_date)
    }

    pub fn parse(
        first_name: &str,
        last_name: &str,
        email: &str,
        raw_expiry_date: &str,
    ) -> Result<Self, SubscriberRowError> {
        let email = SubscriberEmail::parse(email.to_owned()).map_err(|_| {
            SubscriberRowError::InvalidField {
                field: RowField::Email,
                cause: None,
            }
        })?;
        let expiry_date =
            ParsedDate::parse(raw_expiry_date).map_err(|err| SubscriberRowError::InvalidField {
                field: RowField::ExpiryDate,
                cause: Some(err),
            })?;
        let expires_at = expiry_date
            .expires_at()
            .ok_or(SubscriberRowError::InvalidField {
                field: RowField::ExpiryDate,
                cause: None,
            })?;

        Ok(SubscriberRecord {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email,
            expiry_date,
            expires_at,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Recomputed on every call, two calls at different instants may disagree.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        days_left(self.expires_at, now)
    }
}

fn string_cell<'a>(
    row: &'a [Value],
    index: usize,
    field: RowField,
) -> Result<&'a str, SubscriberRowError> {
    row.get(index)
        .and_then(Value::as_str)
        .ok_or(SubscriberRowError::MissingField(field))
}
