// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Frame decoder
//
// Turns the raw upstream byte stream into content deltas:
// - Incremental UTF-8 decoding (split multi-byte sequences are held back)
// - Line reassembly across chunk boundaries, bounded by max_line_bytes
// - `data:` payload extraction, `[DONE]` handling
// - Split-JSON recovery through a bounded carry buffer

use serde_json::Value;

use super::types::{BoundedCarry, CarryOutcome, StreamLimits};

/// Payload that marks the end of an OpenAI-style event stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Decodes upstream SSE bytes into `choices[0].delta.content` strings.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    utf8_tail: Vec<u8>,
    /// Text after the last newline seen so far.
    line_buffer: String,
    max_line_bytes: usize,
    /// Payload text that has not parsed yet.
    carry: BoundedCarry,
    max_carry_bytes: usize,
    dropped_fragments: usize,
}

impl FrameDecoder {
    pub fn new(limits: &StreamLimits) -> Self {
        Self {
            utf8_tail: Vec::new(),
            line_buffer: String::new(),
            max_line_bytes: limits.max_line_bytes,
            carry: BoundedCarry::new(limits.max_carry_bytes),
            max_carry_bytes: limits.max_carry_bytes,
            dropped_fragments: 0,
        }
    }

    /// Decode one raw chunk. Returns the non-empty content deltas it
    /// completed, in arrival order; possibly none.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        self.line_buffer.push_str(&text);

        let mut deltas = Vec::new();
        while let Some(newline_pos) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=newline_pos).collect();
            if let Some(content) = self.process_line(&line) {
                deltas.push(content);
            }
        }

        if self.line_buffer.len() > self.max_line_bytes {
            self.dropped_fragments += 1;
            tracing::error!(
                discarded_bytes = self.line_buffer.len(),
                limit = self.max_line_bytes,
                "upstream line exceeded buffer limit without a newline; discarded"
            );
            self.line_buffer.clear();
        }

        deltas
    }

    /// Flush whatever is left once the upstream stream has ended.
    pub fn finish(&mut self) -> Vec<String> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.line_buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let line = std::mem::take(&mut self.line_buffer);
        let mut deltas = Vec::new();
        if !line.trim().is_empty() {
            if let Some(content) = self.process_line(&line) {
                deltas.push(content);
            }
        }
        deltas
    }

    /// Number of fragments dropped by the size caps so far.
    pub fn dropped_fragments(&self) -> usize {
        self.dropped_fragments
    }

    /// Bytes currently held in the carry buffer.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            self.utf8_tail = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        let payload = parse_data_line(line)?;

        if payload.is_empty() || payload == DONE_SENTINEL {
            self.carry.clear();
            return None;
        }

        let value = self.parse_payload(payload)?;
        let content = extract_content(&value);
        if content.is_empty() {
            None
        } else {
            Some(content)
        }
    }

    fn parse_payload(&mut self, payload: &str) -> Option<Value> {
        if self.carry.is_empty() {
            if let Ok(value) = serde_json::from_str::<Value>(payload) {
                return Some(value);
            }
        } else {
            let joined = format!("{}{}", self.carry.as_str(), payload);
            if let Ok(value) = serde_json::from_str::<Value>(&joined) {
                self.carry.clear();
                return Some(value);
            }
            // A complete record after an unfinished one: the old fragment
            // can never complete, so keep the new record instead.
            if let Ok(value) = serde_json::from_str::<Value>(payload) {
                tracing::debug!(
                    discarded_bytes = self.carry.len(),
                    "stale payload fragment discarded"
                );
                self.carry.clear();
                return Some(value);
            }
        }

        if let CarryOutcome::Overflowed { discarded_bytes } = self.carry.push(payload) {
            self.dropped_fragments += 1;
            tracing::error!(
                discarded_bytes,
                limit = self.max_carry_bytes,
                "upstream payload never became valid JSON; carry buffer discarded"
            );
        }
        None
    }
}

/// Extract the payload of a `data:` line. Blank lines, comments and other
/// SSE fields yield `None`.
pub fn parse_data_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    trimmed.strip_prefix("data:").map(str::trim)
}

/// `choices[0].delta.content`, or an empty string when absent.
pub fn extract_content(value: &Value) -> String {
    value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(&StreamLimits::default())
    }

    fn record(content: &str) -> String {
        let payload = serde_json::json!({
            "choices": [{"index": 0, "delta": {"content": content}}]
        });
        format!("data: {payload}\n\n")
    }

    #[test]
    fn decodes_single_record() {
        let mut d = decoder();
        assert_eq!(d.decode(record("Hello").as_bytes()), vec!["Hello"]);
    }

    #[test]
    fn decodes_several_records_in_one_chunk_in_order() {
        let mut d = decoder();
        let chunk = format!("{}{}{}", record("a"), record("b"), record("c"));
        assert_eq!(d.decode(chunk.as_bytes()), vec!["a", "b", "c"]);
    }

    #[test]
    fn line_split_across_chunks_is_reassembled() {
        let mut d = decoder();
        let full = record("split me");
        let (first, second) = full.split_at(20);
        assert!(d.decode(first.as_bytes()).is_empty());
        assert_eq!(d.decode(second.as_bytes()), vec!["split me"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut d = decoder();
        let full = record("流程图");
        let bytes = full.as_bytes();
        let cut = full.find('流').unwrap() + 1;
        assert!(d.decode(&bytes[..cut]).is_empty());
        assert_eq!(d.decode(&bytes[cut..]), vec!["流程图"]);
    }

    #[test]
    fn split_json_across_data_records_is_joined() {
        let mut d = decoder();
        let chunk = "data: {\"choices\":[{\"delta\":\ndata: {\"content\":\"joined\"}}]}\n";
        assert_eq!(d.decode(chunk.as_bytes()), vec!["joined"]);
        assert_eq!(d.carry_len(), 0);
    }

    #[test]
    fn split_json_across_deliveries_is_joined() {
        let mut d = decoder();
        assert!(d
            .decode(b"data: {\"choices\":[{\"delta\":{\"content\":\n")
            .is_empty());
        assert!(d.carry_len() > 0);
        assert_eq!(d.decode(b"data: \"late\"}}]}\n"), vec!["late"]);
        assert_eq!(d.carry_len(), 0);
    }

    #[test]
    fn done_sentinel_clears_carry_and_yields_nothing() {
        let mut d = decoder();
        d.decode(b"data: {\"choices\":[\n");
        assert!(d.carry_len() > 0);
        assert!(d.decode(b"data: [DONE]\n").is_empty());
        assert_eq!(d.carry_len(), 0);
    }

    #[test]
    fn fragment_that_never_completes_is_dropped_at_cap() {
        let limits = StreamLimits {
            max_carry_bytes: 32,
            ..StreamLimits::default()
        };
        let mut d = FrameDecoder::new(&limits);
        let garbage = format!("data: {{\"choices\":\"{}\n", "x".repeat(40));
        assert!(d.decode(garbage.as_bytes()).is_empty());
        assert_eq!(d.dropped_fragments(), 1);
        assert_eq!(d.carry_len(), 0);

        // Decoding continues normally afterwards.
        assert_eq!(d.decode(record("after").as_bytes()), vec!["after"]);
    }

    #[test]
    fn default_cap_is_ten_kib() {
        let mut d = decoder();
        let garbage = format!("data: {{\"x\":\"{}\n", "y".repeat(10 * 1024));
        assert!(d.decode(garbage.as_bytes()).is_empty());
        assert_eq!(d.dropped_fragments(), 1);
    }

    #[test]
    fn stale_fragment_is_replaced_by_complete_record() {
        let mut d = decoder();
        d.decode(b"data: {\"choices\":[{\"delta\":\n");
        assert_eq!(d.decode(record("fresh").as_bytes()), vec!["fresh"]);
        assert_eq!(d.carry_len(), 0);
    }

    #[test]
    fn missing_or_null_content_yields_nothing() {
        let mut d = decoder();
        let chunk = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n",
            "data: {\"choices\":[]}\n",
            "data: {\"id\":\"x\"}\n",
        );
        assert!(d.decode(chunk.as_bytes()).is_empty());
        assert_eq!(d.carry_len(), 0);
    }

    #[test]
    fn comments_blank_lines_and_other_fields_are_skipped() {
        let mut d = decoder();
        let chunk = format!(": keep-alive\n\nevent: message\n{}", record("ok"));
        assert_eq!(d.decode(chunk.as_bytes()), vec!["ok"]);
    }

    #[test]
    fn data_prefix_without_space_is_accepted() {
        let mut d = decoder();
        let chunk = "data:{\"choices\":[{\"delta\":{\"content\":\"tight\"}}]}\r\n";
        assert_eq!(d.decode(chunk.as_bytes()), vec!["tight"]);
    }

    #[test]
    fn finish_flushes_unterminated_final_line() {
        let mut d = decoder();
        let full = record("tail");
        let unterminated = full.trim_end();
        assert!(d.decode(unterminated.as_bytes()).is_empty());
        assert_eq!(d.finish(), vec!["tail"]);
        assert!(d.finish().is_empty());
    }

    #[test]
    fn overlong_line_is_discarded() {
        let limits = StreamLimits {
            max_line_bytes: 16,
            ..StreamLimits::default()
        };
        let mut d = FrameDecoder::new(&limits);
        assert!(d.decode(b"data: {\"choices\":[{\"delta\"").is_empty());
        assert_eq!(d.dropped_fragments(), 1);
        // The rest of the dropped line does not look like a record.
        assert!(d.decode(b":{\"content\":\"x\"}}]}\n").is_empty());
    }

    #[test]
    fn parse_data_line_variants() {
        assert_eq!(parse_data_line("data: [DONE]"), Some("[DONE]"));
        assert_eq!(parse_data_line("  data:   x  "), Some("x"));
        assert_eq!(parse_data_line(""), None);
        assert_eq!(parse_data_line(": ping"), None);
        assert_eq!(parse_data_line("event: delta"), None);
    }
}
