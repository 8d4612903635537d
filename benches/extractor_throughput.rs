// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

//! Extraction throughput benchmarks.
//!
//! Measures:
//! - Frame decoding alone (SSE lines to content deltas)
//! - Full session ingest (decode + fence extraction) at several chunk sizes
//! - Syntax advisory over a large diagram
//!
//! Run: cargo bench --bench extractor_throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use diagram_relay::advisory::advise;
use diagram_relay::stream::{FrameDecoder, StreamLimits, StreamSession};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A diagram with `nodes` nodes and a chain of edges.
fn diagram(nodes: usize) -> String {
    let mut out = String::from("flowchart TD\n");
    for i in 0..nodes {
        out.push_str(&format!("  N{i}[Step {i}]\n"));
    }
    for i in 1..nodes {
        out.push_str(&format!("  N{} --> N{i}\n", i - 1));
    }
    out
}

/// Upstream SSE body streaming `text` a few characters per record.
fn upstream_body(text: &str, chars_per_delta: usize) -> Vec<u8> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    for piece in chars.chunks(chars_per_delta) {
        let piece: String = piece.iter().collect();
        let record = serde_json::json!({
            "id": "chatcmpl-bench",
            "choices": [{"index": 0, "delta": {"content": piece}, "finish_reason": null}]
        });
        out.push_str(&format!("data: {record}\n\n"));
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

fn fenced_answer(nodes: usize) -> String {
    format!(
        "Here is the diagram you asked for:\n\n```mermaid\n{}```\n\nLet me know if anything should change.",
        diagram(nodes)
    )
}

// ---------------------------------------------------------------------------
// Benchmark: frame decoding
// ---------------------------------------------------------------------------

fn bench_frame_decode(c: &mut Criterion) {
    let limits = StreamLimits::default();
    let body = upstream_body(&fenced_answer(40), 4);

    let mut group = c.benchmark_group("frame_decode");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("40_nodes_4_char_deltas", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new(&limits);
            let mut deltas = 0;
            for chunk in body.chunks(512) {
                deltas += decoder.decode(black_box(chunk)).len();
            }
            deltas + decoder.finish().len()
        });
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: session ingest
// ---------------------------------------------------------------------------

fn bench_session_ingest(c: &mut Criterion) {
    let limits = StreamLimits {
        advisory: false,
        ..StreamLimits::default()
    };
    let body = upstream_body(&fenced_answer(200), 8);

    let mut group = c.benchmark_group("session_ingest");
    group.throughput(Throughput::Bytes(body.len() as u64));

    // Network chunk size changes how often lines and payloads are split.
    for chunk_size in [64usize, 1024, 16 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut session = StreamSession::new("bench", &limits);
                    let mut events = 0;
                    for chunk in body.chunks(chunk_size) {
                        events += session.ingest(black_box(chunk)).len();
                    }
                    let finished = session.finish();
                    events + finished.trailing.len()
                });
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: advisory
// ---------------------------------------------------------------------------

fn bench_advisory(c: &mut Criterion) {
    let code = diagram(200);
    c.bench_function("advise_200_nodes", |b| b.iter(|| advise(black_box(&code))));
}

criterion_group!(
    benches,
    bench_frame_decode,
    bench_session_ingest,
    bench_advisory,
);
criterion_main!(benches);
