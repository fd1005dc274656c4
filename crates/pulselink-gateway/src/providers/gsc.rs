//! Google Search Console adapter (Webmasters v3).

use async_trait::async_trait;
use chrono::NaiveDate;
use pulselink_core::{
    ConnectResult, Provider, ProviderData, ResolvedParams, SearchConsoleOverview,
    SearchConsoleSite, SearchPerformance, SearchPerformanceRow,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{send_json, upstream, ProviderClient};

/// Upper bound on daily rows per query (one year plus a day).
const ROW_LIMIT: u32 = 400;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SitesResponse {
    #[serde(default)]
    site_entry: Vec<SiteEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteEntry {
    site_url: String,
    #[serde(default)]
    permission_level: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<QueryRow>,
}

#[derive(Deserialize)]
struct QueryRow {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    clicks: f64,
    #[serde(default)]
    impressions: f64,
    #[serde(default)]
    ctr: f64,
    #[serde(default)]
    position: f64,
}

pub struct GscClient {
    http: reqwest::Client,
    base_url: String,
}

impl GscClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Sites the token holder can see.
    pub async fn list_sites(&self, access_token: &str) -> ConnectResult<Vec<SearchConsoleSite>> {
        let url = format!("{}/webmasters/v3/sites", self.base_url);
        let response: SitesResponse =
            send_json(Provider::Gsc, self.http.get(url), access_token).await?;

        let mut sites: Vec<SearchConsoleSite> = response
            .site_entry
            .into_iter()
            .map(|entry| SearchConsoleSite {
                site_url: entry.site_url,
                permission_level: entry.permission_level,
            })
            .collect();
        sites.sort_by(|a, b| a.site_url.cmp(&b.site_url));
        Ok(sites)
    }

    /// Daily clicks, impressions, CTR and position for one site.
    pub async fn performance(
        &self,
        access_token: &str,
        site_url: &str,
        params: &ResolvedParams,
    ) -> ConnectResult<SearchPerformance> {
        let url = format!(
            "{}/webmasters/v3/sites/{}/searchAnalytics/query",
            self.base_url,
            urlencoding::encode(site_url)
        );
        let body = json!({
            "startDate": params.start_date.to_string(),
            "endDate": params.end_date.to_string(),
            "dimensions": ["date"],
            "rowLimit": ROW_LIMIT,
        });

        debug!(site_url = %site_url, "[Facade] Querying Search Console performance");
        let response: QueryResponse =
            send_json(Provider::Gsc, self.http.post(url).json(&body), access_token).await?;

        Ok(SearchPerformance::from_rows(site_url, parse_rows(response)?))
    }
}

#[async_trait]
impl ProviderClient for GscClient {
    fn provider(&self) -> Provider {
        Provider::Gsc
    }

    async fn fetch(&self, access_token: &str, params: &ResolvedParams) -> ConnectResult<ProviderData> {
        let sites = self.list_sites(access_token).await?;
        let performance = match &params.site_url {
            Some(site_url) => Some(self.performance(access_token, site_url, params).await?),
            None => None,
        };
        Ok(ProviderData::SearchConsole(SearchConsoleOverview {
            sites,
            performance,
        }))
    }
}

fn parse_rows(response: QueryResponse) -> ConnectResult<Vec<SearchPerformanceRow>> {
    let mut rows = response
        .rows
        .into_iter()
        .map(|row| {
            let date = row
                .keys
                .first()
                .and_then(|k| NaiveDate::parse_from_str(k, "%Y-%m-%d").ok())
                .ok_or_else(|| upstream(Provider::Gsc, "performance row without a valid date"))?;
            Ok(SearchPerformanceRow {
                date,
                clicks: row.clicks.max(0.0).round() as u64,
                impressions: row.impressions.max(0.0).round() as u64,
                ctr: pulselink_core::round4(row.ctr),
                position: pulselink_core::round4(row.position),
            })
        })
        .collect::<ConnectResult<Vec<_>>>()?;
    rows.sort_by_key(|r| r.date);
    Ok(rows)
}
