// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use crate::stream::StreamLimits;

use super::error::ConfigError;
use super::interpolation::resolve_optional;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a relay config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Validate version and enumerated values
/// 5. Resolve `${VAR}` interpolation in upstream and password fields
/// 6. Fill defaults and build the typed Config
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.relay != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.relay
        )));
    }

    let upstream = build_upstream(raw.upstream.unwrap_or_default())?;
    let access_password = resolve_optional(raw.access_password.as_deref())?;
    let prompt = build_prompt(raw.prompt.unwrap_or_default())?;
    let stream = build_stream(raw.stream.unwrap_or_default())?;

    Ok(Config {
        version: raw.relay,
        upstream,
        access_password,
        prompt,
        stream,
        config_hash,
    })
}

pub(super) fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_upstream(raw: raw::RawUpstream) -> Result<UpstreamDefaults, ConfigError> {
    if raw.timeout_ms == Some(0) {
        return Err(ConfigError::Validation(
            "upstream.timeout_ms must be greater than 0".to_string(),
        ));
    }
    Ok(UpstreamDefaults {
        api_url: resolve_optional(raw.api_url.as_deref())?,
        api_key: resolve_optional(raw.api_key.as_deref())?,
        model_name: resolve_optional(raw.model_name.as_deref())?,
        timeout_ms: raw.timeout_ms,
    })
}

fn build_prompt(raw: raw::RawPrompt) -> Result<PromptConfig, ConfigError> {
    let defaults = PromptConfig::default();

    let language = match raw.language.as_deref() {
        None => defaults.language,
        Some("zh") => PromptLanguage::Zh,
        Some("en") => PromptLanguage::En,
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "prompt.language must be \"zh\" or \"en\", got \"{other}\""
            )))
        }
    };

    let flow_direction = match raw.flow_direction.as_deref() {
        None => defaults.flow_direction,
        Some("TD") | Some("TB") => FlowDirection::TopDown,
        Some("LR") => FlowDirection::LeftRight,
        Some("BT") => FlowDirection::BottomTop,
        Some("RL") => FlowDirection::RightLeft,
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "prompt.flow_direction must be one of TD, LR, BT, RL, got \"{other}\""
            )))
        }
    };

    let max_nodes = positive("prompt.max_nodes", raw.max_nodes, defaults.max_nodes)?;
    let max_edges = positive("prompt.max_edges", raw.max_edges, defaults.max_edges)?;

    Ok(PromptConfig {
        language,
        max_nodes,
        max_edges,
        flow_direction,
    })
}

fn build_stream(raw: raw::RawStream) -> Result<StreamLimits, ConfigError> {
    let defaults = StreamLimits::default();

    let fence_language = match raw.fence_language {
        Some(lang) if lang.trim().is_empty() || lang.contains(char::is_whitespace) => {
            return Err(ConfigError::Validation(format!(
                "stream.fence_language must be a single word, got \"{lang}\""
            )))
        }
        Some(lang) => lang,
        None => defaults.fence_language,
    };

    Ok(StreamLimits {
        max_carry_bytes: positive(
            "stream.max_carry_bytes",
            raw.max_carry_bytes,
            defaults.max_carry_bytes,
        )?,
        max_line_bytes: positive(
            "stream.max_line_bytes",
            raw.max_line_bytes,
            defaults.max_line_bytes,
        )?,
        channel_capacity: positive(
            "stream.channel_capacity",
            raw.channel_capacity,
            defaults.channel_capacity,
        )?,
        fence_language,
        advisory: raw.advisory.unwrap_or(defaults.advisory),
    })
}

fn positive<T>(field: &str, value: Option<T>, default: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default,
{
    match value {
        Some(v) if v == T::default() => Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        ))),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}
