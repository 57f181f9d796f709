//! Transaction payload types.
//!
//! The domain fields of a budgeting transaction are a fixed, typed shape.
//! Partial updates are expressed as a [`TransactionPatch`] with an explicit
//! per-field merge, so every combination in the queue coalescing table is
//! handled exhaustively.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month, used for query filters and cache keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Create a period for a specific year and month (1-12).
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The period a date falls into.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Check whether a date falls inside this period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Domain fields of a budgeting transaction.
///
/// Amounts are stored in minor currency units (cents for USD); the sign
/// carries the direction, negative for spending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFields {
    pub date: NaiveDate,
    pub amount_minor: i64,
    /// ISO 4217 currency code
    pub currency: String,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl TransactionFields {
    /// The calendar month this transaction belongs to.
    pub fn period(&self) -> Period {
        Period::from_date(self.date)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &TransactionPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(amount_minor) = patch.amount_minor {
            self.amount_minor = amount_minor;
        }
        if let Some(currency) = &patch.currency {
            self.currency = currency.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(note) = &patch.note {
            self.note = note.clone();
        }
    }

    /// Apply a partial update, returning the merged fields.
    pub fn with_patch(mut self, patch: &TransactionPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// A partial update to a transaction.
///
/// `None` leaves a field untouched. For the optional fields an outer `Some`
/// sets the new value, including `Some(None)` to clear it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_minor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
}

impl TransactionPatch {
    /// Check whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.amount_minor.is_none()
            && self.currency.is_none()
            && self.category.is_none()
            && self.note.is_none()
    }

    /// Merge a later patch over this one; the later patch wins per field.
    pub fn merge(self, later: Self) -> Self {
        Self {
            date: later.date.or(self.date),
            amount_minor: later.amount_minor.or(self.amount_minor),
            currency: later.currency.or(self.currency),
            category: later.category.or(self.category),
            note: later.note.or(self.note),
        }
    }
}

/// Filter for querying locally held transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub period: Option<Period>,
    pub currency: Option<String>,
}

impl TransactionFilter {
    /// Check whether fields match the filter.
    pub fn matches(&self, fields: &TransactionFields) -> bool {
        if let Some(period) = &self.period {
            if !period.contains(fields.date) {
                return false;
            }
        }
        if let Some(currency) = &self.currency {
            if fields.currency != *currency {
                return false;
            }
        }
        true
    }
}
