// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Streaming fenced-code extraction
//
// Responsibilities:
// - Decode the upstream SSE byte stream into content deltas (frame)
// - Extract the interior of the first fenced code block incrementally (fence)
// - Drive one upstream request per session and emit downstream events over
//   a bounded channel, ending with exactly one final or error (session)
// - Memory-bounded: carry, line and search buffers all have hard caps

mod fence;
mod frame;
mod session;
mod types;

pub use fence::{FenceExtractor, FenceOpener, FenceState};
pub use frame::{extract_content, parse_data_line, FrameDecoder, DONE_SENTINEL};
pub use session::{FinishedSession, SessionController, StreamSession};
pub use types::{
    BoundedCarry, CarryOutcome, DownstreamEvent, SessionError, StreamLimits,
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_CARRY_BYTES, DEFAULT_MAX_LINE_BYTES,
};
