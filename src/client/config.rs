//! Provider configuration.
//!
//! The configuration block is deserialized with serde; unset options fall back
//! to `PINGONE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::Diagnostics;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema, Validator};

/// A PingOne geographic region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Region {
    /// North America, `.com` tenants.
    #[default]
    #[serde(rename = "NorthAmerica", alias = "NA")]
    NorthAmerica,
    /// Europe, `.eu` tenants.
    #[serde(rename = "Europe", alias = "EU")]
    Europe,
    /// Asia-Pacific, `.asia` tenants.
    #[serde(rename = "AsiaPacific", alias = "AP")]
    AsiaPacific,
    /// Canada, `.ca` tenants.
    #[serde(rename = "Canada", alias = "CA")]
    Canada,
    /// Australia, `.com.au` tenants.
    #[serde(rename = "Australia", alias = "AU")]
    Australia,
    /// Singapore, `.sg` tenants.
    #[serde(rename = "Singapore", alias = "SG")]
    Singapore,
}

impl Region {
    /// Accepted region names and codes.
    pub const CODES: [&'static str; 12] = [
        "NorthAmerica",
        "NA",
        "Europe",
        "EU",
        "AsiaPacific",
        "AP",
        "Canada",
        "CA",
        "Australia",
        "AU",
        "Singapore",
        "SG",
    ];

    /// The top-level domain of the region's hosts, including the leading dot.
    pub fn tld(&self) -> &'static str {
        match self {
            Self::NorthAmerica => ".com",
            Self::Europe => ".eu",
            Self::AsiaPacific => ".asia",
            Self::Canada => ".ca",
            Self::Australia => ".com.au",
            Self::Singapore => ".sg",
        }
    }
}

impl FromStr for Region {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NorthAmerica" | "NA" => Ok(Self::NorthAmerica),
            "Europe" | "EU" => Ok(Self::Europe),
            "AsiaPacific" | "AP" => Ok(Self::AsiaPacific),
            "Canada" | "CA" => Ok(Self::Canada),
            "Australia" | "AU" => Ok(Self::Australia),
            "Singapore" | "SG" => Ok(Self::Singapore),
            other => Err(ProviderError::Configuration(format!(
                "unsupported region \"{}\", expected one of {}",
                other,
                Self::CODES.join(", ")
            ))),
        }
    }
}

/// Population options that apply across resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationOptions {
    /// Delete users of a sandbox population before deleting the population.
    #[serde(default)]
    pub contains_users_force_delete: bool,
}

/// Environment options.
///
/// Reserved: accepted in configuration and carried on the client, but no
/// managed object in this crate deletes environments, so nothing reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentOptions {
    /// Allow deleting production environments. Reserved.
    #[serde(default)]
    pub production_type_force_delete: bool,
}

/// Options that change the behavior of several resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalOptions {
    /// Population options.
    #[serde(default)]
    pub population: PopulationOptions,
    /// Environment options.
    #[serde(default)]
    pub environment: EnvironmentOptions,
}

/// The provider configuration block.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Client id of the worker application.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Client secret of the worker application.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Environment that holds the worker application.
    #[serde(default)]
    pub environment_id: Option<String>,
    /// A pre-obtained access token.
    #[serde(default, alias = "api_access_token")]
    pub access_token: Option<String>,
    /// Region of the tenant.
    #[serde(default)]
    pub region: Option<Region>,
    /// Management API host override.
    #[serde(default)]
    pub api_hostname: Option<String>,
    /// Authentication host override.
    #[serde(default)]
    pub auth_hostname: Option<String>,
    /// Status codes to retry in addition to the transient set.
    #[serde(default)]
    pub additional_retry_codes: Vec<u16>,
    /// Cross-resource behavior switches.
    #[serde(default)]
    pub global_options: GlobalOptions,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("environment_id", &self.environment_id)
            .field("access_token", &redact(&self.access_token))
            .field("region", &self.region)
            .field("api_hostname", &self.api_hostname)
            .field("auth_hostname", &self.auth_hostname)
            .field("additional_retry_codes", &self.additional_retry_codes)
            .field("global_options", &self.global_options)
            .finish()
    }
}

/// Resolved credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A token obtained outside the provider.
    AccessToken(String),
    /// The OAuth2 client-credentials grant of a worker application.
    Worker {
        /// Worker client id.
        client_id: String,
        /// Worker client secret.
        client_secret: String,
        /// Environment holding the worker.
        environment_id: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::Worker {
                client_id,
                environment_id,
                ..
            } => f
                .debug_struct("Worker")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("environment_id", environment_id)
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Parse the configuration block.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let mut value = value.clone();
        drop_nulls(&mut value);
        Ok(serde_json::from_value(value)?)
    }

    /// Fill unset options from the process environment.
    pub fn with_env_defaults(self) -> Result<(Self, Diagnostics), ProviderError> {
        self.with_env_defaults_from(|name| std::env::var(name).ok())
    }

    /// Fill unset options from `lookup`.
    pub fn with_env_defaults_from<F>(mut self, lookup: F) -> Result<(Self, Diagnostics), ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Diagnostics::new();
        let env = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        fill(&mut self.client_id, env("PINGONE_CLIENT_ID"));
        fill(&mut self.client_secret, env("PINGONE_CLIENT_SECRET"));
        fill(&mut self.environment_id, env("PINGONE_ENVIRONMENT_ID"));
        fill(&mut self.access_token, env("PINGONE_API_ACCESS_TOKEN"));
        fill(&mut self.api_hostname, env("PINGONE_API_HOSTNAME"));
        fill(&mut self.auth_hostname, env("PINGONE_AUTH_HOSTNAME"));

        if self.region.is_none() {
            if let Some(code) = env("PINGONE_REGION_CODE") {
                self.region = Some(code.parse()?);
            } else if let Some(code) = env("PINGONE_REGION") {
                diagnostics.add_warning(
                    "Deprecated PINGONE_REGION environment variable",
                    "The PINGONE_REGION environment variable is deprecated and should be replaced with PINGONE_REGION_CODE.",
                );
                self.region = Some(code.parse()?);
            }
        }

        Ok((self, diagnostics))
    }

    /// Resolve the credentials, failing with "Missing credentials".
    pub fn credentials(&self) -> Result<Credentials, ProviderError> {
        if let Some(token) = &self.access_token {
            return Ok(Credentials::AccessToken(token.clone()));
        }
        match (&self.client_id, &self.client_secret, &self.environment_id) {
            (Some(client_id), Some(client_secret), Some(environment_id)) => Ok(Credentials::Worker {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                environment_id: environment_id.clone(),
            }),
            _ => Err(ProviderError::Configuration(
                "Missing credentials: set access_token, or client_id, client_secret and environment_id".to_string(),
            )),
        }
    }

    /// The effective region.
    pub fn region(&self) -> Region {
        self.region.unwrap_or_default()
    }

    /// Base URL of the management API, without a trailing slash.
    pub fn api_base_url(&self) -> String {
        let host = self
            .api_hostname
            .clone()
            .unwrap_or_else(|| format!("api.pingone{}", self.region().tld()));
        format!("{}/v1", with_scheme(&host))
    }

    /// Base URL of the authentication service.
    pub fn auth_base_url(&self) -> String {
        let host = self
            .auth_hostname
            .clone()
            .unwrap_or_else(|| format!("auth.pingone{}", self.region().tld()));
        with_scheme(&host)
    }

    /// Token endpoint of `environment_id`.
    pub fn token_url(&self, environment_id: &str) -> String {
        format!("{}/{}/as/token", self.auth_base_url(), environment_id)
    }

    /// Schema of the configuration block.
    pub fn schema() -> Schema {
        let uuid = || Attribute::optional_string().with_validator(Validator::ResourceId);
        Schema::v0()
            .with_description("PingOne provider configuration")
            .with_attribute(
                "client_id",
                uuid().with_description("Client ID for the worker app client. Falls back to PINGONE_CLIENT_ID."),
            )
            .with_attribute(
                "client_secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Client secret for the worker app client. Falls back to PINGONE_CLIENT_SECRET."),
            )
            .with_attribute(
                "environment_id",
                uuid().with_description("Environment ID for the worker app client. Falls back to PINGONE_ENVIRONMENT_ID."),
            )
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_validator(Validator::conflicts_with(&["client_id"]))
                    .with_description("Access token for the management API. Falls back to PINGONE_API_ACCESS_TOKEN."),
            )
            .with_attribute(
                "region",
                Attribute::optional_string()
                    .with_validator(Validator::one_of(&Region::CODES))
                    .with_description("The PingOne region. Falls back to PINGONE_REGION_CODE."),
            )
            .with_attribute("api_hostname", Attribute::optional_string())
            .with_attribute("auth_hostname", Attribute::optional_string())
            .with_attribute(
                "additional_retry_codes",
                Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional())
                    .with_description("HTTP status codes to retry in addition to 429 and 5xx gateway errors."),
            )
            .with_block(
                "global_options",
                NestedBlock::single(
                    Block::new()
                        .with_block(
                            "population",
                            NestedBlock::single(
                                Block::new().with_attribute("contains_users_force_delete", Attribute::optional_bool()),
                            ),
                        )
                        .with_block(
                            "environment",
                            NestedBlock::single(
                                Block::new().with_attribute("production_type_force_delete", Attribute::optional_bool()),
                            ),
                        ),
                ),
            )
    }
}

fn drop_nulls(value: &mut serde_json::Value) {
    if let Some(object) = value.as_object_mut() {
        object.retain(|_, v| !v.is_null());
        object.values_mut().for_each(drop_nulls);
    }
}

fn fill(slot: &mut Option<String>, fallback: Option<String>) {
    if slot.as_deref().map_or(true, str::is_empty) {
        *slot = fallback;
    }
}

fn with_scheme(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
