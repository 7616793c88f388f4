//! Provider configuration.
//!
//! Every field may be given in the provider block or through the matching
//! `SNOWFLAKE_*` environment variable; the provider block wins.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

/// Environment variable consulted for each configuration field.
pub const ENV_VARS: &[(&str, &str)] = &[
    ("account", "SNOWFLAKE_ACCOUNT"),
    ("username", "SNOWFLAKE_USER"),
    ("password", "SNOWFLAKE_PASSWORD"),
    ("role", "SNOWFLAKE_ROLE"),
    ("region", "SNOWFLAKE_REGION"),
];

/// Connection settings for a Snowflake account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Account name, without the `snowflakecomputing.com` suffix.
    #[serde(default)]
    pub account: String,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Role to assume after login.
    #[serde(default)]
    pub role: Option<String>,
    /// Region of the account, when not the default `us-west-2`.
    #[serde(default)]
    pub region: Option<String>,
}

impl ProviderConfig {
    /// Parse a provider block, falling back to the process environment.
    pub fn from_value(config: serde_json::Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Parse a provider block with an explicit environment lookup.
    pub fn from_value_with_env<F>(config: serde_json::Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let map = config.as_object_mut().ok_or_else(|| {
            ProviderError::Configuration("provider configuration must be an object".to_string())
        })?;

        for &(field, var) in ENV_VARS {
            let unset = map
                .get(field)
                .map_or(true, |v| v.is_null() || v.as_str() == Some(""));
            if unset {
                if let Some(value) = env(var).filter(|v| !v.is_empty()) {
                    map.insert(field.to_string(), serde_json::Value::String(value));
                }
            }
        }

        Ok(serde_json::from_value(config)?)
    }

    /// Check required settings, one diagnostic per problem.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if self.account.is_empty() {
            diagnostics.push(missing("account", "SNOWFLAKE_ACCOUNT"));
        }
        if self.username.is_empty() {
            diagnostics.push(missing("username", "SNOWFLAKE_USER"));
        }
        let password = self.password.as_ref().map(ExposeSecret::expose_secret);
        if password.map_or(true, str::is_empty) {
            diagnostics.push(
                Diagnostic::warning("No password configured")
                    .with_detail("Set 'password' or SNOWFLAKE_PASSWORD unless the executor authenticates another way")
                    .with_attribute("password"),
            );
        }
        diagnostics
    }

    /// The account host name.
    pub fn host(&self) -> String {
        match self.region.as_deref().filter(|r| !r.is_empty()) {
            Some(region) => format!("{}.{}.snowflakecomputing.com", self.account, region),
            None => format!("{}.snowflakecomputing.com", self.account),
        }
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Connection settings for the Snowflake account.")
            .with_attribute(
                "account",
                Attribute::optional_string()
                    .with_description("Account name. Falls back to SNOWFLAKE_ACCOUNT."),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description("Login name. Falls back to SNOWFLAKE_USER."),
            )
            .with_attribute(
                "password",
                Attribute::new(AttributeType::String, AttributeFlags::optional().sensitive())
                    .with_description("Login password. Falls back to SNOWFLAKE_PASSWORD."),
            )
            .with_attribute(
                "role",
                Attribute::optional_string()
                    .with_description("Role to use. Falls back to SNOWFLAKE_ROLE."),
            )
            .with_attribute(
                "region",
                Attribute::optional_string()
                    .with_description("Account region. Falls back to SNOWFLAKE_REGION."),
            )
    }
}

fn missing(field: &str, var: &str) -> Diagnostic {
    Diagnostic::error(format!("Missing required setting '{}'", field))
        .with_detail(format!("Set '{}' in the provider block or {}", field, var))
        .with_attribute(field)
}
