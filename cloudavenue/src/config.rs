//! Provider configuration
//!
//! Every setting can come from the provider block or from a `CLOUDAVENUE_*`
//! environment variable. The provider block wins; empty strings count as
//! unset.

use crate::api::Credentials;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder, StringKind};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringPatternValidator;
use url::Url;

pub const DEFAULT_URL: &str = "https://console1.cloudavenue.orange-business.com";

pub const ENV_URL: &str = "CLOUDAVENUE_URL";
pub const ENV_USER: &str = "CLOUDAVENUE_USER";
pub const ENV_PASSWORD: &str = "CLOUDAVENUE_PASSWORD";
pub const ENV_ORG: &str = "CLOUDAVENUE_ORG";
pub const ENV_VDC: &str = "CLOUDAVENUE_VDC";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub url: Url,
    pub user: String,
    pub password: String,
    pub org: String,
    /// VDC used by resources that do not name one
    pub vdc: Option<String>,
}

impl ProviderConfig {
    pub fn schema() -> Schema {
        let mut url = AttributeBuilder::new("url", AttributeType::String)
            .description(&format!(
                "The URL of the Cloud Avenue API. Can also be set with the `{}` environment variable. Defaults to `{}`.",
                ENV_URL, DEFAULT_URL
            ))
            .optional();
        if let Ok(validator) =
            StringPatternValidator::new("^https?://", "an http:// or https:// URL")
        {
            url = url.validator(validator);
        }

        SchemaBuilder::new()
            .version(0)
            .description("The Cloud Avenue provider manages Orange Cloud Avenue infrastructure.")
            .description_kind(StringKind::Markdown)
            .attribute(url.build())
            .attribute(
                AttributeBuilder::new("user", AttributeType::String)
                    .description(&format!(
                        "The username to use to connect to the Cloud Avenue API. Can also be set with the `{}` environment variable.",
                        ENV_USER
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description(&format!(
                        "The password to use to connect to the Cloud Avenue API. Can also be set with the `{}` environment variable.",
                        ENV_PASSWORD
                    ))
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("org", AttributeType::String)
                    .description(&format!(
                        "The organization used on Cloud Avenue API. Can also be set with the `{}` environment variable.",
                        ENV_ORG
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vdc", AttributeType::String)
                    .description(&format!(
                        "The VDC used on Cloud Avenue API. Can also be set with the `{}` environment variable.",
                        ENV_VDC
                    ))
                    .optional()
                    .build(),
            )
            .build()
    }

    /// Resolve the configuration from the provider block and an environment
    /// lookup. All problems are reported at once, scoped to their attribute.
    pub fn resolve<E>(config: &DynamicValue, env: E) -> Result<Self, Vec<Diagnostic>>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Vec::new();
        let mut setting = |attribute: &str, var: &str| -> Option<String> {
            let path = AttributePath::new(attribute);
            let configured = match config.get_optional_string(&path) {
                Ok(value) => value,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for {}", attribute), e.to_string())
                            .with_attribute(path),
                    );
                    None
                }
            };
            configured
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let url = setting("url", ENV_URL);
        let user = setting("user", ENV_USER);
        let password = setting("password", ENV_PASSWORD);
        let org = setting("org", ENV_ORG);
        let vdc = setting("vdc", ENV_VDC);

        let url = match parse_url(url.as_deref().unwrap_or(DEFAULT_URL)) {
            Ok(url) => Some(url),
            Err(detail) => {
                diagnostics.push(
                    Diagnostic::error("Invalid Cloud Avenue API URL", detail)
                        .with_attribute(AttributePath::new("url")),
                );
                None
            }
        };

        let user = require(user, "user", "username", ENV_USER, &mut diagnostics);
        let password = require(password, "password", "password", ENV_PASSWORD, &mut diagnostics);
        let org = require(org, "org", "organization", ENV_ORG, &mut diagnostics);

        match (url, user, password, org) {
            (Some(url), Some(user), Some(password), Some(org)) if diagnostics.is_empty() => {
                Ok(Self {
                    url,
                    user,
                    password,
                    org,
                    vdc,
                })
            }
            _ => Err(diagnostics),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
            org: self.org.clone(),
        }
    }
}

fn parse_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| format!("`{}` is not a valid URL: {}", value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!(
            "`{}` uses the {} scheme, only http and https are supported",
            value, scheme
        )),
    }
}

fn require(
    value: Option<String>,
    attribute: &str,
    label: &str,
    var: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    if value.is_none() {
        diagnostics.push(
            Diagnostic::error(
                format!("Missing Cloud Avenue API {}", label),
                format!(
                    "The provider cannot create the Cloud Avenue API client as there is a missing or empty value for the Cloud Avenue API {}. \
                     Set the {} value in the configuration or use the {} environment variable.",
                    label, attribute, var
                ),
            )
            .with_attribute(AttributePath::new(attribute)),
        );
    }
    value
}
