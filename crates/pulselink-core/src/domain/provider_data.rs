//! Provider-agnostic data shapes returned to the rest of the application.
//!
//! Live adapters and the fallback generator both produce these types, so
//! downstream consumers never branch on where the data came from.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::error::ConnectError;

/// Default reporting window when the caller does not supply dates.
pub const DEFAULT_RANGE_DAYS: i64 = 28;

/// Longest reporting window accepted.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Parameters accepted by every data request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// GA4 property id (numeric, without the `properties/` prefix)
    #[serde(default)]
    pub property_id: Option<String>,
    /// Search Console site (e.g. `sc-domain:example.com`)
    #[serde(default)]
    pub site_url: Option<String>,
    /// Business Profile account (e.g. `accounts/123`)
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Request parameters with a concrete date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub property_id: Option<String>,
    pub site_url: Option<String>,
    pub account_id: Option<String>,
}

impl RequestParams {
    /// Fill in the default date range relative to `today` and validate it.
    ///
    /// The default window is the [`DEFAULT_RANGE_DAYS`] days ending yesterday.
    pub fn resolve(&self, today: NaiveDate) -> Result<ResolvedParams, ConnectError> {
        let end_date = self.end_date.unwrap_or(today - Duration::days(1));
        let start_date = self
            .start_date
            .unwrap_or(end_date - Duration::days(DEFAULT_RANGE_DAYS - 1));

        if start_date > end_date {
            return Err(ConnectError::InvalidRequest(format!(
                "startDate {} is after endDate {}",
                start_date, end_date
            )));
        }
        if (end_date - start_date).num_days() >= MAX_RANGE_DAYS {
            return Err(ConnectError::InvalidRequest(format!(
                "date range exceeds {} days",
                MAX_RANGE_DAYS
            )));
        }

        Ok(ResolvedParams {
            start_date,
            end_date,
            property_id: non_empty(&self.property_id),
            site_url: non_empty(&self.site_url),
            account_id: non_empty(&self.account_id),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl ResolvedParams {
    /// Every date in the range, inclusive.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let days = (self.end_date - self.start_date).num_days();
        (0..=days)
            .map(|offset| self.start_date + Duration::days(offset))
            .collect()
    }
}

// =============================================================================
// Google Analytics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRow {
    pub date: NaiveDate,
    pub sessions: u64,
    pub active_users: u64,
    pub conversions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTotals {
    pub sessions: u64,
    pub active_users: u64,
    pub conversions: u64,
}

impl AnalyticsTotals {
    pub fn from_rows(rows: &[AnalyticsRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            acc.sessions = acc.sessions.saturating_add(row.sessions);
            acc.active_users = acc.active_users.saturating_add(row.active_users);
            acc.conversions = acc.conversions.saturating_add(row.conversions);
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub property_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rows: Vec<AnalyticsRow>,
    pub totals: AnalyticsTotals,
}

// =============================================================================
// Search Console
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConsoleSite {
    pub site_url: String,
    pub permission_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPerformanceRow {
    pub date: NaiveDate,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPerformance {
    pub site_url: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    pub rows: Vec<SearchPerformanceRow>,
}

impl SearchPerformance {
    /// Aggregate daily rows into totals (impression-weighted position).
    pub fn from_rows(site_url: impl Into<String>, rows: Vec<SearchPerformanceRow>) -> Self {
        let clicks = rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.clicks));
        let impressions = rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.impressions));
        let ctr = if impressions > 0 {
            round4(clicks as f64 / impressions as f64)
        } else {
            0.0
        };
        let position = if impressions > 0 {
            round4(
                rows.iter()
                    .map(|r| r.position * r.impressions as f64)
                    .sum::<f64>()
                    / impressions as f64,
            )
        } else {
            0.0
        };
        Self {
            site_url: site_url.into(),
            clicks,
            impressions,
            ctr,
            position,
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConsoleOverview {
    pub sites: Vec<SearchConsoleSite>,
    /// Present when a site URL was requested
    pub performance: Option<SearchPerformance>,
}

// =============================================================================
// Business Profile
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAccount {
    /// Resource name, e.g. `accounts/123`
    pub name: String,
    pub account_name: String,
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessLocation {
    /// Resource name, e.g. `locations/456`
    pub name: String,
    pub title: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfileOverview {
    pub accounts: Vec<BusinessAccount>,
    /// Locations of the requested (or first) account
    pub locations: Vec<BusinessLocation>,
}

// =============================================================================
// Union
// =============================================================================

/// Normalized payload for any provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderData {
    Analytics(AnalyticsReport),
    SearchConsole(SearchConsoleOverview),
    BusinessProfile(BusinessProfileOverview),
}

impl ProviderData {
    /// Provider whose shape this payload has.
    pub fn provider(&self) -> Provider {
        match self {
            ProviderData::Analytics(_) => Provider::Ga4,
            ProviderData::SearchConsole(_) => Provider::Gsc,
            ProviderData::BusinessProfile(_) => Provider::Gbp,
        }
    }
}

/// Round to four decimal places (keeps ratios stable in JSON output).
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
