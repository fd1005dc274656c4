//! Google Business Profile adapter.
//!
//! Accounts come from the Account Management API, locations from the
//! Business Information API; the two live on different hosts.

use async_trait::async_trait;
use pulselink_core::{
    BusinessAccount, BusinessLocation, BusinessProfileOverview, ConnectError, ConnectResult,
    Provider, ProviderData, ResolvedParams,
};
use serde::Deserialize;
use tracing::debug;

use super::{send_json, ProviderClient};

const LOCATION_READ_MASK: &str = "name,title,storefrontAddress,phoneNumbers,websiteUri";
const LOCATION_PAGE_SIZE: u32 = 100;

#[derive(Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    accounts: Vec<AccountEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountEntry {
    name: String,
    #[serde(default)]
    account_name: String,
    #[serde(rename = "type")]
    account_type: Option<String>,
}

#[derive(Deserialize)]
struct LocationsResponse {
    #[serde(default)]
    locations: Vec<LocationEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationEntry {
    name: String,
    #[serde(default)]
    title: String,
    storefront_address: Option<PostalAddress>,
    phone_numbers: Option<PhoneNumbers>,
    website_uri: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostalAddress {
    #[serde(default)]
    address_lines: Vec<String>,
    locality: Option<String>,
    administrative_area: Option<String>,
    postal_code: Option<String>,
}

impl PostalAddress {
    fn single_line(&self) -> Option<String> {
        let mut parts: Vec<&str> = self.address_lines.iter().map(String::as_str).collect();
        parts.extend(self.locality.as_deref());
        let region = match (self.administrative_area.as_deref(), self.postal_code.as_deref()) {
            (Some(area), Some(code)) => Some(format!("{} {}", area, code)),
            (Some(area), None) => Some(area.to_string()),
            (None, Some(code)) => Some(code.to_string()),
            (None, None) => None,
        };
        let mut line = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if let Some(region) = region {
            if !line.is_empty() {
                line.push_str(", ");
            }
            line.push_str(&region);
        }
        (!line.is_empty()).then_some(line)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhoneNumbers {
    primary_phone: Option<String>,
}

pub struct GbpClient {
    http: reqwest::Client,
    accounts_base_url: String,
    locations_base_url: String,
}

impl GbpClient {
    pub fn new(http: reqwest::Client, accounts_base_url: String, locations_base_url: String) -> Self {
        Self {
            http,
            accounts_base_url,
            locations_base_url,
        }
    }

    async fn accounts(&self, access_token: &str) -> ConnectResult<Vec<BusinessAccount>> {
        let url = format!("{}/v1/accounts", self.accounts_base_url);
        let response: AccountsResponse =
            send_json(Provider::Gbp, self.http.get(url), access_token).await?;

        Ok(response
            .accounts
            .into_iter()
            .map(|a| BusinessAccount {
                name: a.name,
                account_name: a.account_name,
                account_type: a.account_type,
            })
            .collect())
    }

    async fn locations(&self, access_token: &str, account: &str) -> ConnectResult<Vec<BusinessLocation>> {
        let url = format!("{}/v1/{}/locations", self.locations_base_url, account);
        let request = self.http.get(url).query(&[
            ("readMask", LOCATION_READ_MASK.to_string()),
            ("pageSize", LOCATION_PAGE_SIZE.to_string()),
        ]);

        debug!(account = %account, "[Facade] Listing Business Profile locations");
        let response: LocationsResponse = send_json(Provider::Gbp, request, access_token).await?;

        Ok(response
            .locations
            .into_iter()
            .map(|l| BusinessLocation {
                address: l.storefront_address.as_ref().and_then(PostalAddress::single_line),
                phone: l.phone_numbers.and_then(|p| p.primary_phone),
                name: l.name,
                title: l.title,
                website: l.website_uri,
            })
            .collect())
    }
}

#[async_trait]
impl ProviderClient for GbpClient {
    fn provider(&self) -> Provider {
        Provider::Gbp
    }

    async fn fetch(&self, access_token: &str, params: &ResolvedParams) -> ConnectResult<ProviderData> {
        let requested = params.account_id.as_deref().map(account_name).transpose()?;
        let accounts = self.accounts(access_token).await?;

        let account = requested.or_else(|| accounts.first().map(|a| a.name.clone()));
        let locations = match account {
            Some(account) => self.locations(access_token, &account).await?,
            None => Vec::new(),
        };

        Ok(ProviderData::BusinessProfile(BusinessProfileOverview {
            accounts,
            locations,
        }))
    }
}

/// Normalize `123` or `accounts/123` to `accounts/123`.
fn account_name(raw: &str) -> ConnectResult<String> {
    let id = raw.strip_prefix("accounts/").unwrap_or(raw);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConnectError::InvalidRequest(format!(
            "accountId must be numeric, got {:?}",
            raw
        )));
    }
    Ok(format!("accounts/{}", id))
}
