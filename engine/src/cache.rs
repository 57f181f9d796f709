//! Read-through cache of remote query results.
//!
//! Entries are keyed by household, period, and currency. Staleness is a
//! property derived from an entry's age at read time, never a stored flag.

use crate::{HouseholdId, Period, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Composite key for a cached remote query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryKey {
    pub household_id: HouseholdId,
    pub period: Period,
    pub currency: String,
}

impl QueryKey {
    pub fn new(
        household_id: impl Into<HouseholdId>,
        period: Period,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            household_id: household_id.into(),
            period,
            currency: currency.into(),
        }
    }

    /// Canonical string form, used as the storage key.
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.household_id, self.period, self.currency)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// A cached remote query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub fetched_at: Timestamp,
}

impl CacheEntry {
    pub fn new(data: serde_json::Value, now: Timestamp) -> Self {
        Self {
            data,
            fetched_at: now,
        }
    }

    /// Age of the entry at `now`, in milliseconds.
    pub fn age_ms(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.fetched_at)
    }

    /// Whether the entry is older than `max_age` at `now`.
    pub fn is_stale(&self, now: Timestamp, max_age: Duration) -> bool {
        self.age_ms(now) > max_age.as_millis() as Timestamp
    }
}

/// A cache read result handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedQuery {
    pub data: serde_json::Value,
    pub is_stale: bool,
}
