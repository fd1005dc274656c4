//! Google Analytics 4 adapter (Analytics Data API `runReport`).

use async_trait::async_trait;
use chrono::NaiveDate;
use pulselink_core::{
    AnalyticsReport, AnalyticsRow, AnalyticsTotals, ConnectError, ConnectResult, Provider,
    ProviderData, ResolvedParams,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{send_json, upstream, ProviderClient};

const METRICS: [&str; 3] = ["sessions", "activeUsers", "conversions"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    dimension_values: Vec<ReportValue>,
    #[serde(default)]
    metric_values: Vec<ReportValue>,
}

#[derive(Deserialize)]
struct ReportValue {
    #[serde(default)]
    value: String,
}

pub struct Ga4Client {
    http: reqwest::Client,
    base_url: String,
}

impl Ga4Client {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl ProviderClient for Ga4Client {
    fn provider(&self) -> Provider {
        Provider::Ga4
    }

    async fn fetch(&self, access_token: &str, params: &ResolvedParams) -> ConnectResult<ProviderData> {
        let property_id = property_id(params)?;
        let url = format!("{}/v1beta/properties/{}:runReport", self.base_url, property_id);

        let body = json!({
            "dateRanges": [{
                "startDate": params.start_date.to_string(),
                "endDate": params.end_date.to_string(),
            }],
            "dimensions": [{ "name": "date" }],
            "metrics": METRICS.iter().map(|m| json!({ "name": m })).collect::<Vec<_>>(),
            "orderBys": [{ "dimension": { "dimensionName": "date" } }],
            "keepEmptyRows": true,
        });

        debug!(property_id = %property_id, "[Facade] Requesting GA4 report");
        let response: RunReportResponse =
            send_json(Provider::Ga4, self.http.post(url).json(&body), access_token).await?;

        let rows = parse_rows(response)?;
        Ok(ProviderData::Analytics(AnalyticsReport {
            property_id: Some(property_id),
            start_date: params.start_date,
            end_date: params.end_date,
            totals: AnalyticsTotals::from_rows(&rows),
            rows,
        }))
    }
}

/// Numeric property id, accepting an optional `properties/` prefix.
fn property_id(params: &ResolvedParams) -> ConnectResult<String> {
    let raw = params.property_id.as_deref().ok_or_else(|| {
        ConnectError::InvalidRequest("propertyId is required for Google Analytics".to_string())
    })?;
    let id = raw.strip_prefix("properties/").unwrap_or(raw);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConnectError::InvalidRequest(format!(
            "propertyId must be numeric, got {:?}",
            raw
        )));
    }
    Ok(id.to_string())
}

fn parse_rows(response: RunReportResponse) -> ConnectResult<Vec<AnalyticsRow>> {
    let mut rows = Vec::with_capacity(response.rows.len());
    for row in response.rows {
        let date = row
            .dimension_values
            .first()
            .and_then(|d| NaiveDate::parse_from_str(&d.value, "%Y%m%d").ok())
            .ok_or_else(|| upstream(Provider::Ga4, "report row without a valid date"))?;

        let metric = |index: usize| -> u64 {
            row.metric_values
                .get(index)
                .and_then(|m| m.value.parse::<f64>().ok())
                .map(|v| v.max(0.0).round() as u64)
                .unwrap_or(0)
        };

        rows.push(AnalyticsRow {
            date,
            sessions: metric(0),
            active_users: metric(1),
            conversions: metric(2),
        });
    }
    rows.sort_by_key(|r| r.date);
    Ok(rows)
}
