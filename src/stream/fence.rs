// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Fence extractor
//
// Scans accumulated model output for the first fenced code block and
// releases its interior incrementally:
// - Search: wait for a complete opener line (tagged or bare)
// - Collect: flush interior text as it arrives, stop at the closer
// - Done: absorb everything else

const FENCE: &str = "```";

/// Which opener started the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceOpener {
    /// ```` ```<language> ````
    Tagged,
    /// ```` ``` ```` with no (or a different) language tag.
    Bare,
}

/// Extractor state. Transitions only move forward:
/// `Search -> Collect -> Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceState {
    /// No opener line consumed yet. `pending` starts at the earliest opener
    /// candidate, or holds at most a short run of trailing backticks.
    Search { pending: String },
    /// Inside the block. `pending` only ever holds up to two trailing
    /// backticks that may belong to a split closer.
    Collect { pending: String },
    /// Closer seen or stream finished; all further input is ignored.
    Done,
}

/// Incremental fenced-block extractor.
#[derive(Debug, Clone)]
pub struct FenceExtractor {
    state: FenceState,
    tagged_opener: String,
    opener: Option<FenceOpener>,
}

impl FenceExtractor {
    /// Create an extractor that prefers ```` ```<language> ```` openers.
    pub fn new(language: &str) -> Self {
        Self {
            state: FenceState::Search {
                pending: String::new(),
            },
            tagged_opener: format!("{FENCE}{language}"),
            opener: None,
        }
    }

    /// Feed the next piece of text; returns the interior increments it
    /// released, in order. Nothing is released before the opener line is
    /// complete, and nothing after the closer.
    pub fn process(&mut self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        match &mut self.state {
            FenceState::Search { pending } | FenceState::Collect { pending } => {
                pending.push_str(text)
            }
            FenceState::Done => return out,
        }

        loop {
            let state = std::mem::replace(&mut self.state, FenceState::Done);
            let (next, progressed) = self.step(state, &mut out);
            self.state = next;
            if !progressed {
                break;
            }
        }
        out
    }

    /// End of input. Releases any held-back tail while collecting and moves
    /// to `Done`.
    pub fn finish(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, FenceState::Done) {
            FenceState::Collect { pending } if !pending.is_empty() => Some(pending),
            _ => None,
        }
    }

    pub fn state(&self) -> &FenceState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, FenceState::Done)
    }

    /// The opener that started the block, once one has been consumed.
    pub fn opener(&self) -> Option<FenceOpener> {
        self.opener
    }

    /// Bytes buffered but not yet classified or released.
    pub fn pending_len(&self) -> usize {
        match &self.state {
            FenceState::Search { pending } | FenceState::Collect { pending } => pending.len(),
            FenceState::Done => 0,
        }
    }

    /// Run one transition. The flag is false when no further progress is
    /// possible with the input buffered so far.
    fn step(&mut self, state: FenceState, out: &mut Vec<String>) -> (FenceState, bool) {
        match state {
            FenceState::Search { mut pending } => {
                let Some((idx, opener)) = find_opener(&pending, &self.tagged_opener) else {
                    retain_backtick_tail(&mut pending);
                    return (FenceState::Search { pending }, false);
                };
                match pending[idx..].find('\n') {
                    None => {
                        // Opener line incomplete; text before it is prose.
                        pending.drain(..idx);
                        (FenceState::Search { pending }, false)
                    }
                    Some(rel) => {
                        let interior = pending.split_off(idx + rel + 1);
                        self.opener = Some(opener);
                        (FenceState::Collect { pending: interior }, true)
                    }
                }
            }
            FenceState::Collect { mut pending } => match pending.find(FENCE) {
                None => {
                    let hold = trailing_backticks(&pending);
                    let emit_len = pending.len() - hold;
                    if emit_len > 0 {
                        let held = pending.split_off(emit_len);
                        out.push(pending);
                        pending = held;
                    }
                    (FenceState::Collect { pending }, false)
                }
                Some(close) => {
                    pending.truncate(close);
                    if !pending.is_empty() {
                        out.push(pending);
                    }
                    (FenceState::Done, true)
                }
            },
            FenceState::Done => (FenceState::Done, false),
        }
    }
}

/// Earliest opener in `pending`. The tagged opener wins only when it starts
/// at or before the first bare fence.
fn find_opener(pending: &str, tagged: &str) -> Option<(usize, FenceOpener)> {
    let tagged_idx = pending.find(tagged);
    let bare_idx = pending.find(FENCE);
    match (tagged_idx, bare_idx) {
        (Some(t), Some(b)) if t <= b => Some((t, FenceOpener::Tagged)),
        (Some(t), None) => Some((t, FenceOpener::Tagged)),
        (_, Some(b)) => Some((b, FenceOpener::Bare)),
        (None, None) => None,
    }
}

/// Length in bytes of the trailing run of backticks (at most two when no
/// full fence is present).
fn trailing_backticks(text: &str) -> usize {
    text.bytes().rev().take_while(|b| *b == b'`').count()
}

/// Drop everything except a trailing backtick run that could start a fence.
fn retain_backtick_tail(pending: &mut String) {
    let keep = trailing_backticks(pending);
    let cut = pending.len() - keep;
    pending.drain(..cut);
}
