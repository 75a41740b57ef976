// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec Benchmark
//!
//! Measures binary encode and decode of messages with:
//! - Growing field counts (mixed scalar/string fields)
//! - Growing BIN payloads
//! - The header section on and off

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gmsec::{Decoder, Encoder, Field, Message, MessageKind};
use std::hint::black_box as bb;

/// Message shaped like telemetry: a header block plus `fields` mixed values.
fn telemetry(fields: usize) -> Message {
    let mut msg = Message::new("GMSEC.MISSION.SAT1.MSG.TLM", MessageKind::Publish);
    for (name, value) in [
        ("MESSAGE-TYPE", "MSG"),
        ("MESSAGE-SUBTYPE", "TLM"),
        ("MISSION-ID", "MISSION"),
        ("FACILITY", "FACILITY"),
        ("COMPONENT", "BENCH"),
    ] {
        msg.add_field(Field::header(name, value)).expect("header field");
    }
    for i in 0..fields {
        let name = format!("POINT.{}", i);
        let added = match i % 4 {
            0 => msg.add(&name, i as f64 * 0.5),
            1 => msg.add(&name, i as u32),
            2 => msg.add(&name, format!("value-{}", i)),
            _ => msg.add(&name, i % 2 == 0),
        };
        added.expect("field");
    }
    msg
}

fn bench_encode_by_field_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_by_fields");
    for fields in [8, 64, 512] {
        let msg = telemetry(fields);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &msg, |b, msg| {
            let encoder = Encoder::new();
            b.iter(|| bb(encoder.encode(bb(msg)).expect("encode")));
        });
    }
    group.finish();
}

fn bench_decode_by_field_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_by_fields");
    for fields in [8, 64, 512] {
        let bytes = Encoder::new().encode(&telemetry(fields)).expect("encode");
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &bytes, |b, bytes| {
            let decoder = Decoder::new();
            b.iter(|| bb(decoder.decode(bb(bytes)).expect("decode")));
        });
    }
    group.finish();
}

fn bench_binary_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("binary_payload");
    for size in [64, 4096, 65536] {
        let mut msg = Message::new("GMSEC.BENCH.BIN", MessageKind::Publish);
        msg.add("DATA", vec![0xABu8; size]).expect("field");
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &msg, |b, msg| {
            let encoder = Encoder::new();
            let mut buf = vec![0u8; encoder.find_length(msg).expect("length") as usize];
            b.iter(|| bb(encoder.encode_into(bb(msg), &mut buf).expect("encode")));
        });
    }
    group.finish();
}

fn bench_header_section(c: &mut Criterion) {
    let msg = telemetry(32);
    let mut group = c.benchmark_group("header_section");
    for header in [false, true] {
        let encoder = Encoder::new().with_header(header);
        let decoder = Decoder::new().with_header(header);
        group.bench_function(BenchmarkId::new("round_trip", header), |b| {
            b.iter(|| {
                let bytes = encoder.encode(bb(&msg)).expect("encode");
                bb(decoder.decode(&bytes).expect("decode"))
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_encode_by_field_count,
    bench_decode_by_field_count,
    bench_binary_payload,
    bench_header_section
);
criterion_main!(benches);
