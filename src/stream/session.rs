// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Session controller
//
// Owns one request's stream end to end: sends the upstream request, drives
// the frame decoder and fence extractor over the response body, and emits
// downstream events over a bounded channel. Exactly one terminal event
// (final or error) is sent, and the channel is closed on every exit path.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use super::fence::FenceExtractor;
use super::frame::FrameDecoder;
use super::types::{DownstreamEvent, SessionError, StreamLimits};
use crate::advisory;
use crate::upstream::{HttpBody, HttpError, HttpRequest, HttpSender};

/// Upper bound on how much of an upstream error body is kept for logging.
const MAX_ERROR_BODY_BYTES: usize = 4096;

// ---------------------------------------------------------------------------
// Per-session state
// ---------------------------------------------------------------------------

/// Buffers and state machines for one session. Single owner, no sharing.
#[derive(Debug)]
pub struct StreamSession {
    session_id: String,
    decoder: FrameDecoder,
    extractor: FenceExtractor,
    /// Accepted increments; their concatenation is the extracted code.
    collected: Vec<String>,
    /// Every content delta seen, used when no fence is ever found.
    raw_all: String,
    advisory: bool,
}

/// What is left to send once the upstream stream has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    /// Chunk events released by flushing the decoder and extractor.
    pub trailing: Vec<DownstreamEvent>,
    /// Trimmed extracted code, or the trimmed raw text when no fence was found.
    pub final_code: String,
    /// Syntax advisory output (logged only).
    pub warnings: Vec<String>,
}

impl StreamSession {
    pub fn new(session_id: impl Into<String>, limits: &StreamLimits) -> Self {
        Self {
            session_id: session_id.into(),
            decoder: FrameDecoder::new(limits),
            extractor: FenceExtractor::new(&limits.fence_language),
            collected: Vec::new(),
            raw_all: String::new(),
            advisory: limits.advisory,
        }
    }

    /// Process one raw upstream chunk into zero or more `Chunk` events.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<DownstreamEvent> {
        let deltas = self.decoder.decode(chunk);
        self.absorb(deltas)
    }

    /// Flush buffered input and compute the final result.
    pub fn finish(&mut self) -> FinishedSession {
        let deltas = self.decoder.finish();
        let mut trailing = self.absorb(deltas);
        if let Some(rest) = self.extractor.finish() {
            trailing.push(DownstreamEvent::chunk(rest.clone()));
            self.collected.push(rest);
        }

        let extracted = self.collected.concat();
        let final_code = match extracted.trim() {
            "" => self.raw_all.trim().to_string(),
            code => code.to_string(),
        };

        let warnings = if self.advisory && !final_code.is_empty() {
            advisory::advise(&final_code)
        } else {
            Vec::new()
        };
        if !warnings.is_empty() {
            tracing::warn!(
                session_id = %self.session_id,
                warnings = %warnings.join("; "),
                "diagram syntax advisory"
            );
        }

        FinishedSession {
            trailing,
            final_code,
            warnings,
        }
    }

    /// Fragments dropped by the decoder's size caps.
    pub fn dropped_fragments(&self) -> usize {
        self.decoder.dropped_fragments()
    }

    fn absorb(&mut self, deltas: Vec<String>) -> Vec<DownstreamEvent> {
        let mut events = Vec::new();
        for delta in deltas {
            self.raw_all.push_str(&delta);
            for increment in self.extractor.process(&delta) {
                events.push(DownstreamEvent::chunk(increment.clone()));
                self.collected.push(increment);
            }
        }
        events
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Spawns one task per session and hands back its event stream.
///
/// The channel is bounded: when the consumer is slow, `send` waits and the
/// next upstream read is not issued. When the consumer goes away, the read
/// loop stops and the upstream body is dropped.
pub struct SessionController {
    sender: Arc<dyn HttpSender>,
    limits: StreamLimits,
}

impl SessionController {
    pub fn new(sender: Arc<dyn HttpSender>, limits: StreamLimits) -> Self {
        Self { sender, limits }
    }

    /// Start a session for `request`. The returned stream ends right after
    /// the terminal event.
    pub fn spawn(&self, request: HttpRequest) -> ReceiverStream<DownstreamEvent> {
        let (tx, rx) = mpsc::channel::<DownstreamEvent>(self.limits.channel_capacity.max(1));
        let sender = self.sender.clone();
        let limits = self.limits.clone();
        let session_id = Uuid::new_v4().to_string();

        tokio::spawn(async move {
            let run = drive(sender.as_ref(), request, &limits, &session_id, &tx);
            let terminal = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(Ok(final_code)) => DownstreamEvent::final_code(final_code),
                Ok(Err(SessionError::Disconnected)) => {
                    tracing::info!(session_id = %session_id, "downstream disconnected; upstream read abandoned");
                    return;
                }
                Ok(Err(e)) => {
                    tracing::warn!(session_id = %session_id, error = %e, "session failed");
                    DownstreamEvent::error(e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(session_id = %session_id, error = %message, "session panicked");
                    DownstreamEvent::error(SessionError::Transport(message).to_string())
                }
            };
            if tx.send(terminal).await.is_err() {
                tracing::debug!(session_id = %session_id, "terminal event not delivered; consumer gone");
            }
            // `tx` drops here, closing the downstream stream.
        });

        ReceiverStream::new(rx)
    }
}

type UpstreamStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

async fn drive(
    sender: &dyn HttpSender,
    request: HttpRequest,
    limits: &StreamLimits,
    session_id: &str,
    tx: &mpsc::Sender<DownstreamEvent>,
) -> Result<String, SessionError> {
    tracing::debug!(session_id, url = %request.url, "sending upstream request");

    let response = tokio::select! {
        biased;
        _ = tx.closed() => return Err(SessionError::Disconnected),
        result = sender.send(request) => result.map_err(|e| SessionError::Transport(e.to_string()))?,
    };

    if !response.status.is_success() {
        let status = response.status.as_u16();
        let body = tokio::select! {
            biased;
            _ = tx.closed() => return Err(SessionError::Disconnected),
            body = read_error_body(response.body) => body,
        };
        tracing::error!(session_id, status, body = %body, "upstream returned error status");
        return Err(SessionError::UpstreamStatus { status, body });
    }

    let mut upstream: UpstreamStream = match response.body {
        HttpBody::Full(bytes) => Box::pin(stream::once(async move { Ok::<Bytes, HttpError>(bytes) })),
        HttpBody::Stream(s) => s,
    };

    let mut session = StreamSession::new(session_id, limits);
    let mut chunks_sent = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => return Err(SessionError::Disconnected),
            item = upstream.next() => item,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(|e| SessionError::Transport(e.to_string()))?;

        for event in session.ingest(&chunk) {
            forward(tx, event).await?;
            chunks_sent += 1;
        }
    }
    drop(upstream);

    let finished = session.finish();
    for event in finished.trailing {
        forward(tx, event).await?;
        chunks_sent += 1;
    }

    tracing::info!(
        session_id,
        chunks = chunks_sent,
        final_len = finished.final_code.len(),
        warnings = finished.warnings.len(),
        dropped_fragments = session.dropped_fragments(),
        "session complete"
    );

    Ok(finished.final_code)
}

async fn forward(
    tx: &mpsc::Sender<DownstreamEvent>,
    event: DownstreamEvent,
) -> Result<(), SessionError> {
    tx.send(event).await.map_err(|_| SessionError::Disconnected)
}

async fn read_error_body(body: HttpBody) -> String {
    let bytes = match body {
        HttpBody::Full(bytes) => bytes.to_vec(),
        HttpBody::Stream(mut s) => {
            let mut collected = Vec::new();
            while let Some(Ok(chunk)) = s.next().await {
                collected.extend_from_slice(&chunk);
                if collected.len() >= MAX_ERROR_BODY_BYTES {
                    break;
                }
            }
            collected
        }
    };
    let end = bytes.len().min(MAX_ERROR_BODY_BYTES);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}
