//! Provider Registry
//!
//! Closed set of Google data providers. Every per-provider fact (scopes,
//! callback path, API hosts) lives in the single [`REGISTRY`] table, so adding
//! a provider is one enum variant plus one table entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConnectError;

/// A third-party Google API surface requiring delegated OAuth authorization.
///
/// Variant order is the canonical provider order used for stable UI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    /// Google Analytics 4
    Ga4 = 0,
    /// Google Search Console
    Gsc = 1,
    /// Google Business Profile
    Gbp = 2,
}

/// Static description of one provider.
#[derive(Debug)]
pub struct ProviderSpec {
    pub provider: Provider,
    /// Unique identifier, also the `service_name` column in storage
    pub id: &'static str,
    pub display_name: &'static str,
    /// OAuth scopes requested during authorization
    pub scopes: &'static [&'static str],
    /// Callback path relative to the redirect origin
    pub callback_path: &'static str,
    /// Primary REST API origin
    pub api_base_url: &'static str,
    /// Secondary REST API origin for providers split across two Google APIs
    pub aux_api_base_url: Option<&'static str>,
}

/// The registry, in canonical order. Indexed by `Provider as usize`.
pub static REGISTRY: [ProviderSpec; 3] = [
    ProviderSpec {
        provider: Provider::Ga4,
        id: "ga4",
        display_name: "Google Analytics",
        scopes: &["https://www.googleapis.com/auth/analytics.readonly"],
        callback_path: "/callback/ga4",
        api_base_url: "https://analyticsdata.googleapis.com",
        aux_api_base_url: None,
    },
    ProviderSpec {
        provider: Provider::Gsc,
        id: "gsc",
        display_name: "Google Search Console",
        scopes: &["https://www.googleapis.com/auth/webmasters.readonly"],
        callback_path: "/callback/gsc",
        api_base_url: "https://www.googleapis.com",
        aux_api_base_url: None,
    },
    ProviderSpec {
        provider: Provider::Gbp,
        id: "gbp",
        display_name: "Google Business Profile",
        scopes: &["https://www.googleapis.com/auth/business.manage"],
        callback_path: "/callback/gbp",
        api_base_url: "https://mybusinessaccountmanagement.googleapis.com",
        aux_api_base_url: Some("https://mybusinessbusinessinformation.googleapis.com"),
    },
];

impl Provider {
    /// All providers in canonical order.
    pub const ALL: [Provider; 3] = [Provider::Ga4, Provider::Gsc, Provider::Gbp];

    /// Registry entry for this provider.
    pub fn spec(self) -> &'static ProviderSpec {
        &REGISTRY[self as usize]
    }

    pub fn id(self) -> &'static str {
        self.spec().id
    }

    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    /// Scope set requested for this provider.
    pub fn scopes(self) -> &'static [&'static str] {
        self.spec().scopes
    }

    /// Callback path (e.g. `/callback/gsc`).
    pub fn callback_path(self) -> &'static str {
        self.spec().callback_path
    }

    /// Whether `id` names a registered provider.
    pub fn is_supported(id: &str) -> bool {
        id.parse::<Provider>().is_ok()
    }

    /// Position in canonical order.
    pub fn canonical_index(self) -> usize {
        self as usize
    }
}

impl FromStr for Provider {
    type Err = ConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|spec| spec.id == needle)
            .map(|spec| spec.provider)
            .ok_or_else(|| ConnectError::UnsupportedProvider(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for Provider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
