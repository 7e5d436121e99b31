//! Criterion micro-benchmarks for command decoding and demo parsing.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use sdfz_bench::{command_mix, skirmish_demo, skirmish_script};
use sdfz_command::{CommandDecoder, RawCommand, UnitDefTable};
use sdfz_demo::{decode_packet, parse_container, parse_script, ParseOptions};
use sdfz_test_utils::packets;

/// Benchmark: decode one command of every shape.
fn bench_decode_command_mix(c: &mut Criterion) {
    let table = UnitDefTable::from_names((0..64).map(|i| format!("unit{i}")));
    let raws: Vec<RawCommand> = command_mix()
        .into_iter()
        .map(|(id, params)| {
            let params: Vec<f64> = params.into_iter().map(f64::from).collect();
            RawCommand::new(id, 32, &params).with_unit(1234)
        })
        .collect();

    let mut group = c.benchmark_group("command");
    group.throughput(Throughput::Elements(raws.len() as u64));
    group.bench_function("decode_mix", |b| {
        let mut decoder = CommandDecoder::new(&table);
        b.iter(|| {
            for raw in &raws {
                black_box(decoder.decode(black_box(raw)));
            }
        });
    });
    group.finish();
}

/// Benchmark: decode command and chat packets.
fn bench_decode_packets(c: &mut Criterion) {
    let command = packets::command(3, 10, 0, &[1024.0, 64.0, 2048.0]);
    let ai = packets::ai_command(3, 1, 77, 20, 0, &[4711.0]);
    let chat = packets::chat(3, 252, "rush the geo on the left");

    c.bench_function("packet_decode_mix", |b| {
        b.iter(|| {
            black_box(decode_packet(black_box(&command)).ok());
            black_box(decode_packet(black_box(&ai)).ok());
            black_box(decode_packet(black_box(&chat)).ok());
        });
    });
}

/// Benchmark: parse an 8v8 launch script.
fn bench_parse_script(c: &mut Criterion) {
    let script = skirmish_script(8);
    c.bench_function("script_parse_8v8", |b| {
        b.iter(|| black_box(parse_script(black_box(&script)).ok()));
    });
}

/// Benchmark: parse a whole demo, record only and with command decoding.
fn bench_parse_demo(c: &mut Criterion) {
    let raw = skirmish_demo(8, 5_000).build();
    let gzipped = skirmish_demo(8, 5_000).gzip(true).build();
    let record_only = ParseOptions::record_only();
    let full = ParseOptions::default();

    let mut group = c.benchmark_group("demo");
    group.throughput(Throughput::Bytes(raw.len() as u64));
    group.bench_function("parse_record_only", |b| {
        b.iter(|| black_box(parse_container(black_box(raw.as_slice()), "bench.sdfz", &record_only).ok()));
    });
    group.bench_function("parse_with_commands", |b| {
        b.iter(|| black_box(parse_container(black_box(raw.as_slice()), "bench.sdfz", &full).ok()));
    });
    group.bench_function("parse_gzip_record_only", |b| {
        b.iter(|| {
            black_box(parse_container(black_box(gzipped.as_slice()), "bench.sdfz", &record_only).ok())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_decode_command_mix,
    bench_decode_packets,
    bench_parse_script,
    bench_parse_demo
);
criterion_main!(benches);
