// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Credential resolution
//
// Decides which upstream endpoint, key and model a request uses:
// 1. A complete explicit `aiConfig` from the request wins outright.
// 2. Otherwise a supplied access password must match the configured one.
// 3. Otherwise the configured defaults apply, `selectedModel` overriding
//    the default model name.

use serde::Deserialize;

use crate::config::UpstreamDefaults;

/// Caller-supplied upstream settings (`aiConfig` in the request body).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
}

/// The credential-bearing part of an inbound request.
#[derive(Debug, Clone, Default)]
pub struct CredentialRequest<'a> {
    pub ai_config: Option<&'a AiConfig>,
    pub access_password: Option<&'a str>,
    pub selected_model: Option<&'a str>,
}

/// Fully resolved upstream settings for one session.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamCredentials {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
}

impl std::fmt::Debug for UpstreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamCredentials")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid access password")]
    InvalidPassword,

    #[error("AI configuration is incomplete: set the API URL, API key and model name")]
    Incomplete,
}

/// Resolve credentials for a request. Empty strings count as absent.
pub fn resolve_credentials(
    request: &CredentialRequest<'_>,
    defaults: &UpstreamDefaults,
    configured_password: Option<&str>,
) -> Result<UpstreamCredentials, CredentialError> {
    if let Some(ai) = request.ai_config {
        if let (Some(api_url), Some(api_key), Some(model_name)) = (
            present(ai.api_url.as_deref()),
            present(ai.api_key.as_deref()),
            present(ai.model_name.as_deref()),
        ) {
            return Ok(UpstreamCredentials {
                api_url: api_url.to_string(),
                api_key: api_key.to_string(),
                model_name: model_name.to_string(),
            });
        }
    }

    if let Some(supplied) = present(request.access_password) {
        match present(configured_password) {
            Some(expected) if expected == supplied => {}
            _ => return Err(CredentialError::InvalidPassword),
        }
    }

    let model_name =
        present(request.selected_model).or_else(|| present(defaults.model_name.as_deref()));

    match (
        present(defaults.api_url.as_deref()),
        present(defaults.api_key.as_deref()),
        model_name,
    ) {
        (Some(api_url), Some(api_key), Some(model_name)) => Ok(UpstreamCredentials {
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model_name: model_name.to_string(),
        }),
        _ => Err(CredentialError::Incomplete),
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
