// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal)
// Kept apart from the public Config: strings here are pre-interpolation
// and enums are still unvalidated text.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub relay: String,
    pub upstream: Option<RawUpstream>,
    pub access_password: Option<String>,
    pub prompt: Option<RawPrompt>,
    pub stream: Option<RawStream>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstream {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPrompt {
    pub language: Option<String>,
    pub max_nodes: Option<u32>,
    pub max_edges: Option<u32>,
    pub flow_direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStream {
    pub fence_language: Option<String>,
    pub max_carry_bytes: Option<usize>,
    pub max_line_bytes: Option<usize>,
    pub channel_capacity: Option<usize>,
    pub advisory: Option<bool>,
}
