//! Fallback data provider - deterministic synthetic data
//!
//! Output depends only on the provider and the resolved request parameters:
//! the generator is seeded from a SHA-256 digest of both, so the same inputs
//! always yield byte-identical data.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::domain::{
    round4, AnalyticsReport, AnalyticsRow, AnalyticsTotals, BusinessAccount, BusinessLocation,
    BusinessProfileOverview, Provider, ProviderData, ResolvedParams, SearchConsoleOverview,
    SearchConsoleSite, SearchPerformance, SearchPerformanceRow,
};

/// Demo site listed when no site was requested.
pub const DEMO_SITE_URL: &str = "sc-domain:demo-practice.example";

/// Demo Business Profile account resource name.
pub const DEMO_ACCOUNT_NAME: &str = "accounts/100000000000000000000";

const DEMO_LOCATION_TITLES: [&str; 4] = [
    "Demo Practice - Downtown",
    "Demo Practice - Riverside",
    "Demo Practice - North Clinic",
    "Demo Practice - Westgate",
];

/// Generates synthetic, shape-compatible provider data.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackDataProvider;

impl FallbackDataProvider {
    pub fn new() -> Self {
        Self
    }

    /// Synthetic data for `provider` with the same shape as live data.
    pub fn generate(&self, provider: Provider, params: &ResolvedParams) -> ProviderData {
        let mut rng = seeded_rng(provider, params);
        match provider {
            Provider::Ga4 => ProviderData::Analytics(analytics(&mut rng, params)),
            Provider::Gsc => ProviderData::SearchConsole(search_console(&mut rng, params)),
            Provider::Gbp => ProviderData::BusinessProfile(business_profile(&mut rng, params)),
        }
    }

    /// Synthetic Search Console site list.
    pub fn sites(&self, params: &ResolvedParams) -> Vec<SearchConsoleSite> {
        demo_sites(params)
    }
}

fn seeded_rng(provider: Provider, params: &ResolvedParams) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(provider.id().as_bytes());
    for part in [
        Some(params.start_date.to_string()),
        Some(params.end_date.to_string()),
        params.property_id.clone(),
        params.site_url.clone(),
        params.account_id.clone(),
    ] {
        // Separator keeps ("ab", None) distinct from ("a", "b")
        hasher.update([0x1f]);
        if let Some(value) = part {
            hasher.update(value.as_bytes());
        }
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hasher.finalize());
    StdRng::from_seed(seed)
}

/// Weekends get less traffic.
fn weekday_factor(date: NaiveDate) -> f64 {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => 0.65,
        _ => 1.0,
    }
}

fn analytics(rng: &mut StdRng, params: &ResolvedParams) -> AnalyticsReport {
    let baseline: f64 = rng.gen_range(150.0..450.0);
    let rows: Vec<AnalyticsRow> = params
        .dates()
        .into_iter()
        .map(|date| {
            let sessions = (baseline * weekday_factor(date) * rng.gen_range(0.8..1.2)).round();
            let active_users = (sessions * rng.gen_range(0.68..0.86)).round();
            let conversions = (sessions * rng.gen_range(0.015..0.055)).round();
            AnalyticsRow {
                date,
                sessions: sessions as u64,
                active_users: active_users as u64,
                conversions: conversions as u64,
            }
        })
        .collect();

    AnalyticsReport {
        property_id: params.property_id.clone(),
        start_date: params.start_date,
        end_date: params.end_date,
        totals: AnalyticsTotals::from_rows(&rows),
        rows,
    }
}

fn demo_sites(params: &ResolvedParams) -> Vec<SearchConsoleSite> {
    let site_url = params
        .site_url
        .clone()
        .unwrap_or_else(|| DEMO_SITE_URL.to_string());
    vec![SearchConsoleSite {
        site_url,
        permission_level: "siteOwner".to_string(),
    }]
}

fn search_console(rng: &mut StdRng, params: &ResolvedParams) -> SearchConsoleOverview {
    let sites = demo_sites(params);

    let performance = params.site_url.as_ref().map(|site_url| {
        let base_impressions: f64 = rng.gen_range(400.0..2_500.0);
        let base_position: f64 = rng.gen_range(6.0..24.0);
        let rows = params
            .dates()
            .into_iter()
            .map(|date| {
                let impressions =
                    (base_impressions * weekday_factor(date) * rng.gen_range(0.75..1.25)).round();
                let ctr = rng.gen_range(0.012..0.065);
                let clicks = (impressions * ctr).round();
                let position = round4(base_position * rng.gen_range(0.9..1.1));
                SearchPerformanceRow {
                    date,
                    clicks: clicks as u64,
                    impressions: impressions as u64,
                    ctr: if impressions > 0.0 {
                        round4(clicks / impressions)
                    } else {
                        0.0
                    },
                    position,
                }
            })
            .collect();
        SearchPerformance::from_rows(site_url.clone(), rows)
    });

    SearchConsoleOverview { sites, performance }
}

fn business_profile(rng: &mut StdRng, params: &ResolvedParams) -> BusinessProfileOverview {
    let account_name = params
        .account_id
        .clone()
        .unwrap_or_else(|| DEMO_ACCOUNT_NAME.to_string());

    let count = rng.gen_range(1..=DEMO_LOCATION_TITLES.len());
    let locations = DEMO_LOCATION_TITLES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, title)| BusinessLocation {
            name: format!("locations/{}", 9_000_000_000u64 + rng.gen_range(0..1_000_000u64)),
            title: (*title).to_string(),
            address: Some(format!("{} Example Street, Springfield", 100 + i * 25)),
            phone: Some(format!("+1 555-01{:02}", rng.gen_range(0..100u32))),
            website: Some("https://demo-practice.example".to_string()),
        })
        .collect();

    BusinessProfileOverview {
        accounts: vec![BusinessAccount {
            name: account_name,
            account_name: "Demo Practice Group".to_string(),
            account_type: Some("LOCATION_GROUP".to_string()),
        }],
        locations,
    }
}
