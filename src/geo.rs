//! Multi-provider geolocation lookup.
//!
//! Every configured provider is queried once per address. A provider that
//! times out, errors or returns garbage degrades to an empty
//! [`GeoResult`]; it never fails the lookup as a whole.

use crate::config::{Extracted, ProviderSpec, ResolverConfig};
use crate::error::{ProviderError, ReportError};
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Country and city reported by one provider. Both absent means the
/// provider had nothing, or could not be reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoResult {
    pub country: Option<String>,
    pub city: Option<String>,
}

impl GeoResult {
    pub fn new(country: Option<String>, city: Option<String>) -> Self {
        Self { country, city }
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.city.is_none()
    }
}

/// Per-provider outcome, before it is flattened into a [`GeoResult`].
#[derive(Debug)]
pub enum ProviderOutcome {
    Located(GeoResult),
    NoData,
    Failed(ProviderError),
}

impl ProviderOutcome {
    pub fn into_geo(self) -> GeoResult {
        match self {
            Self::Located(geo) => geo,
            Self::NoData | Self::Failed(_) => GeoResult::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

pub struct GeoResolver {
    client: Client,
    providers: Arc<[ProviderSpec]>,
}

impl GeoResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("ufw_report/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ReportError::Client)?;

        Ok(Self {
            client,
            providers: config.shared_providers(),
        })
    }

    pub fn providers(&self) -> &[ProviderSpec] {
        &self.providers
    }

    /// Query every provider for `source_ip`, one outcome per provider in
    /// configuration order.
    pub async fn lookup(&self, source_ip: &str) -> Vec<ProviderOutcome> {
        join_all(
            self.providers
                .iter()
                .map(|provider| self.query(provider, source_ip)),
        )
        .await
    }

    /// Like [`lookup`](Self::lookup), with failures flattened to empty pairs.
    pub async fn resolve(&self, source_ip: &str) -> Vec<GeoResult> {
        self.lookup(source_ip)
            .await
            .into_iter()
            .map(ProviderOutcome::into_geo)
            .collect()
    }

    async fn query(&self, provider: &ProviderSpec, source_ip: &str) -> ProviderOutcome {
        match self.fetch(provider, source_ip).await {
            Ok(outcome) => {
                trace!(provider = %provider.label, ip = source_ip, ?outcome, "geo lookup done");
                outcome
            }
            Err(e) => {
                debug!(provider = %provider.label, ip = source_ip, "geo lookup failed: {}", e);
                ProviderOutcome::Failed(e)
            }
        }
    }

    async fn fetch(
        &self,
        provider: &ProviderSpec,
        source_ip: &str,
    ) -> Result<ProviderOutcome, ProviderError> {
        let url = provider.request_url(source_ip);
        let body: Value = self.client.get(&url).send().await?.json().await?;

        let Value::Object(body) = body else {
            return Err(ProviderError::UnexpectedShape);
        };

        match provider.shape.extract(&body) {
            Extracted::Rejected(status) => Err(ProviderError::Rejected(status)),
            Extracted::Fields {
                country: None,
                city: None,
            } => Ok(ProviderOutcome::NoData),
            Extracted::Fields { country, city } => {
                Ok(ProviderOutcome::Located(GeoResult::new(country, city)))
            }
        }
    }
}
