use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder replaced by the source address in a provider URL template.
pub const IP_PLACEHOLDER: &str = "{ip}";

pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);

/// How a provider lays out country and city in its JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseShape {
    /// `{"status": "success", "country": .., "city": ..}` (ip-api.com)
    StatusGated,
    /// `{"country": .., "city": ..}` (ipinfo.io)
    Direct,
    /// `{"country_name": .., "city": ..}` (ipapi.co)
    CountryName,
}

/// Result of applying a shape to a decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Fields {
        country: Option<String>,
        city: Option<String>,
    },
    /// The status gate refused the body; carries the reported status.
    Rejected(String),
}

impl ResponseShape {
    fn country_field(self) -> &'static str {
        match self {
            Self::StatusGated | Self::Direct => "country",
            Self::CountryName => "country_name",
        }
    }

    /// Pull `(country, city)` out of a JSON object. Non-string values count
    /// as absent.
    pub fn extract(self, body: &serde_json::Map<String, Value>) -> Extracted {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);

        if self == Self::StatusGated {
            let status = body.get("status").and_then(Value::as_str).unwrap_or("");
            if status != "success" {
                return Extracted::Rejected(status.to_string());
            }
        }

        Extracted::Fields {
            country: text(self.country_field()),
            city: text("city"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub label: String,
    pub url: String,
    pub shape: ResponseShape,
}

impl ProviderSpec {
    pub fn new(label: impl Into<String>, url: impl Into<String>, shape: ResponseShape) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            shape,
        }
    }

    pub fn request_url(&self, source_ip: &str) -> String {
        self.url.replace(IP_PLACEHOLDER, source_ip)
    }
}

/// The stock provider set: ip-api.com, ipinfo.io and ipapi.co.
pub fn default_providers() -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::new(
            "API1",
            "http://ip-api.com/json/{ip}?fields=status,country,city",
            ResponseShape::StatusGated,
        ),
        ProviderSpec::new("API2", "https://ipinfo.io/{ip}/json", ResponseShape::Direct),
        ProviderSpec::new("API3", "https://ipapi.co/{ip}/json", ResponseShape::CountryName),
    ]
}

/// Immutable resolver settings shared by every lookup in a run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    providers: Arc<[ProviderSpec]>,
    timeout: Duration,
}

impl ResolverConfig {
    pub fn new(providers: Vec<ProviderSpec>, timeout: Duration) -> Result<Self, ConfigError> {
        validate(&providers)?;
        Ok(Self {
            providers: providers.into(),
            timeout,
        })
    }

    /// Load a JSON array of providers from disk.
    pub fn from_file(path: &Path, timeout: Duration) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let providers: Vec<ProviderSpec> =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(providers, timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn providers(&self) -> &[ProviderSpec] {
        &self.providers
    }

    pub(crate) fn shared_providers(&self) -> Arc<[ProviderSpec]> {
        Arc::clone(&self.providers)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            providers: default_providers().into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn validate(providers: &[ProviderSpec]) -> Result<(), ConfigError> {
    if providers.is_empty() {
        return Err(ConfigError::NoProviders);
    }
    for (index, provider) in providers.iter().enumerate() {
        if provider.label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel { index });
        }
        if !provider.url.contains(IP_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder {
                label: provider.label.clone(),
            });
        }
    }
    Ok(())
}
