// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Core types for the extraction stream: downstream events, buffer limits,
// the bounded carry buffer, and session errors.

use bytes::Bytes;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Downstream events
// ---------------------------------------------------------------------------

/// One event on the downstream SSE stream.
///
/// Serialized as `{"type":"chunk","data":..}`, `{"type":"final","data":..,"ok":true}`
/// or `{"type":"error","message":..,"ok":false}`. Exactly one `Final` or
/// `Error` is sent per session, always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DownstreamEvent {
    /// Interior code content, forwarded as soon as it is extracted.
    Chunk { data: String },
    /// The complete extracted (or raw fallback) result.
    Final { data: String, ok: bool },
    /// Terminal failure. No `Final` follows.
    Error { message: String, ok: bool },
}

impl DownstreamEvent {
    pub fn chunk(data: impl Into<String>) -> Self {
        Self::Chunk { data: data.into() }
    }

    pub fn final_code(data: impl Into<String>) -> Self {
        Self::Final {
            data: data.into(),
            ok: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            ok: false,
        }
    }

    /// `Final` and `Error` end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }

    /// Render as one SSE record: `data: <json>\n\n`.
    pub fn to_sse_bytes(&self) -> Bytes {
        // Serializing a tag + string fields cannot fail.
        let json = serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"event serialization failed","ok":false}"#.to_string()
        });
        Bytes::from(format!("data: {json}\n\n"))
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Default cap for a payload carried across chunk boundaries.
pub const DEFAULT_MAX_CARRY_BYTES: usize = 10 * 1024;

/// Default cap for a physical line awaiting its terminating newline.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Default capacity of the downstream event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Buffer limits and extraction settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLimits {
    /// Carry buffer cap for split JSON payloads.
    pub max_carry_bytes: usize,
    /// Line buffer cap for partial SSE lines.
    pub max_line_bytes: usize,
    /// Bounded channel size; a full channel stalls upstream reads.
    pub channel_capacity: usize,
    /// Language tag of the preferred fence opener (e.g. "mermaid").
    pub fence_language: String,
    /// Run the syntax advisory over the final result.
    pub advisory: bool,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            max_carry_bytes: DEFAULT_MAX_CARRY_BYTES,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            fence_language: "mermaid".to_string(),
            advisory: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Bounded carry buffer
// ---------------------------------------------------------------------------

/// Outcome of appending to a [`BoundedCarry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryOutcome {
    /// The fragment was retained.
    Retained,
    /// The buffer would have exceeded its limit; everything was discarded.
    Overflowed { discarded_bytes: usize },
}

/// An append-only text buffer with a hard size limit.
///
/// Exceeding the limit drops the whole buffer instead of growing it. The
/// caller decides how to report the loss.
#[derive(Debug, Clone)]
pub struct BoundedCarry {
    buf: String,
    limit: usize,
}

impl BoundedCarry {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            limit,
        }
    }

    /// Append `text`, enforcing the limit.
    pub fn push(&mut self, text: &str) -> CarryOutcome {
        let new_len = self.buf.len() + text.len();
        if new_len > self.limit {
            self.buf.clear();
            return CarryOutcome::Overflowed {
                discarded_bytes: new_len,
            };
        }
        self.buf.push_str(text);
        CarryOutcome::Retained
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that end a session early.
///
/// The `Display` text is what the downstream consumer sees in the `error`
/// event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The upstream service answered with a non-success status.
    #[error("AI service returned an error ({status})")]
    UpstreamStatus { status: u16, body: String },

    /// The upstream transport failed before or during the read loop.
    #[error("error while processing request: {0}")]
    Transport(String),

    /// The downstream consumer went away; nothing more can be delivered.
    #[error("downstream consumer disconnected")]
    Disconnected,
}
