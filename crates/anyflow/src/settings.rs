use std::str::FromStr;

use anyflow_cli_common::store::LocalStore;
use anyhow::Context;
use secrecy::SecretString;
use url::Url;

use crate::{
    consts::{API_KEY_VAR, BACKEND_URL_VAR, BASE_RPC_URL_VAR, ENVIRONMENT_VAR},
    messages::{msg_invalid_environment, msg_invalid_url, MSG_NOT_AUTHENTICATED},
};

/// Deployment target of the CLI itself, selected with `ANYFLOW_ENV`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn backend_url(self) -> &'static str {
        match self {
            Self::Development => "http://localhost/api",
            Self::Staging => "https://api.staging.anyflow.pro/api",
            Self::Production => "https://api.anyflow.pro/api",
        }
    }

    pub fn base_rpc_url(self) -> &'static str {
        match self {
            Self::Development => "http://nest:3000",
            Self::Staging => "https://rpc.staging.anyflow.pro",
            Self::Production => "https://rpc.anyflow.pro",
        }
    }

    /// Web app page where users create API keys.
    pub fn token_page_url(self) -> &'static str {
        match self {
            Self::Development => "http://localhost:3000/dev",
            Self::Staging => "https://app-staging.anyflow.pro/dev",
            Self::Production => "https://app.anyflow.pro/dev",
        }
    }
}

/// Values passed on the command line. They take precedence over everything else.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub backend_url: Option<String>,
    pub base_rpc_url: Option<String>,
    pub api_key: Option<String>,
}

/// Resolved runtime settings.
///
/// Each value is looked up in order: command-line flag, the local store, the process
/// environment, then the default of the selected [`Environment`].
///
/// `base_rpc_url` is validated but kept verbatim: deploy scripts append
/// `/rpc-proxy/...` to it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub backend_url: Url,
    pub base_rpc_url: String,
    api_key: Option<SecretString>,
}

impl Settings {
    pub fn resolve(overrides: &SettingsOverrides, store: &LocalStore<'_>) -> anyhow::Result<Self> {
        Self::resolve_with(overrides, store, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        overrides: &SettingsOverrides,
        store: &LocalStore<'_>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let environment = match env(ENVIRONMENT_VAR).filter(|value| !value.is_empty()) {
            Some(value) => Environment::from_str(&value)
                .map_err(|_| anyhow::anyhow!(msg_invalid_environment(&value)))?,
            None => Environment::default(),
        };

        let lookup = |flag: &Option<String>, key: &str| -> anyhow::Result<Option<String>> {
            if let Some(value) = flag.clone().filter(|value| !value.is_empty()) {
                return Ok(Some(value));
            }
            if let Some(value) = store.get(key)?.filter(|value| !value.is_empty()) {
                return Ok(Some(value));
            }
            Ok(env(key).filter(|value| !value.is_empty()))
        };

        let backend_url = lookup(&overrides.backend_url, BACKEND_URL_VAR)?
            .unwrap_or_else(|| environment.backend_url().to_owned());
        let base_rpc_url = lookup(&overrides.base_rpc_url, BASE_RPC_URL_VAR)?
            .unwrap_or_else(|| environment.base_rpc_url().to_owned());
        let api_key = lookup(&overrides.api_key, API_KEY_VAR)?.map(SecretString::new);
        parse_url(BASE_RPC_URL_VAR, &base_rpc_url)?;

        Ok(Self {
            environment,
            backend_url: parse_url(BACKEND_URL_VAR, &backend_url)?,
            base_rpc_url,
            api_key,
        })
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn require_api_key(&self) -> anyhow::Result<&SecretString> {
        self.api_key.as_ref().context(MSG_NOT_AUTHENTICATED)
    }
}

fn parse_url(name: &str, value: &str) -> anyhow::Result<Url> {
    Url::parse(value).with_context(|| msg_invalid_url(name, value))
}
