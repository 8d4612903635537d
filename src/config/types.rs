// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use crate::stream::StreamLimits;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated relay config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Config version. Always "v1".
    pub version: String,
    /// Fallback upstream settings used when a request does not bring its own.
    pub upstream: UpstreamDefaults,
    /// Password that unlocks the fallback settings. `None` rejects any
    /// supplied password.
    pub access_password: Option<String>,
    pub prompt: PromptConfig,
    pub stream: StreamLimits,
    /// SHA256 of the raw YAML: "sha256:{hex}".
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamDefaults {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    /// Whole-request timeout. `None` leaves it to the HTTP client.
    pub timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_NODES: u32 = 40;
pub const DEFAULT_MAX_EDGES: u32 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub language: PromptLanguage,
    pub max_nodes: u32,
    pub max_edges: u32,
    pub flow_direction: FlowDirection,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            language: PromptLanguage::Zh,
            max_nodes: DEFAULT_MAX_NODES,
            max_edges: DEFAULT_MAX_EDGES,
            flow_direction: FlowDirection::TopDown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptLanguage {
    Zh,
    En,
}

/// Default flowchart direction written into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    TopDown,
    LeftRight,
    BottomTop,
    RightLeft,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::TopDown => "TD",
            FlowDirection::LeftRight => "LR",
            FlowDirection::BottomTop => "BT",
            FlowDirection::RightLeft => "RL",
        }
    }
}
