//! Result envelope returned by every data-fetching operation.
//!
//! The discriminant is explicit: a caller has to look at [`DataSource`]
//! (or [`ProviderResult::is_live`]) before it can tell live data from
//! synthetic data, and the only constructors are the three states below.

use serde::Serialize;

/// Where the payload of a [`ProviderResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult<T> {
    connected: bool,
    source: DataSource,
    data: T,
}

impl<T> ProviderResult<T> {
    /// Credential present and the provider answered.
    pub fn live(data: T) -> Self {
        Self {
            connected: true,
            source: DataSource::Live,
            data,
        }
    }

    /// No credential stored; `data` is synthetic.
    pub fn not_connected(fallback: T) -> Self {
        Self {
            connected: false,
            source: DataSource::Fallback,
            data: fallback,
        }
    }

    /// Credential present but the provider call failed; `data` is synthetic.
    pub fn degraded(fallback: T) -> Self {
        Self {
            connected: true,
            source: DataSource::Fallback,
            data: fallback,
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn is_live(&self) -> bool {
        self.source == DataSource::Live
    }

    /// Connected but currently serving fallback data.
    pub fn is_degraded(&self) -> bool {
        self.connected && self.source == DataSource::Fallback
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    /// Transform the payload, keeping the discriminant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderResult<U> {
        ProviderResult {
            connected: self.connected,
            source: self.source,
            data: f(self.data),
        }
    }
}
