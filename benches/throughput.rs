//! Throughput Benchmark for comlink
//!
//! Measures the hot path of the protocol engine: grammar parsing,
//! response encoding, and full registry dispatch.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use comlink::devices::{Focuser, TemperatureProbe};
use comlink::dispatch::RegistryBuilder;
use comlink::protocol::{decode_7bit, parse_command, Response, ResponseBuilder};

fn sealed_registry() -> comlink::dispatch::CommandRegistry {
    let mut builder = RegistryBuilder::new();
    builder.register(&Focuser::new("F1")).unwrap();
    builder.register(&TemperatureProbe::new("T1", 12.5)).unwrap();
    builder.seal()
}

/// Benchmark wire grammar parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_with_position", |b| {
        b.iter(|| black_box(parse_command(black_box("<F1,234,MoveTo=12345>"))));
    });

    group.bench_function("parse_without_payload", |b| {
        b.iter(|| black_box(parse_command(black_box("<F1,234,Status>"))));
    });

    group.bench_function("parse_rejects_garbage", |b| {
        b.iter(|| black_box(parse_command(black_box("this is not a command"))));
    });

    group.finish();
}

/// Benchmark 7-bit receive decoding
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    let wire = b"<F1,234,MoveTo=12345>\r\n";
    group.bench_function("decode_request", |b| {
        b.iter(|| black_box(decode_7bit(black_box(wire))));
    });

    group.finish();
}

/// Benchmark response encoding
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    let command = parse_command("<F1,234,Status>").unwrap();
    let mut builder = ResponseBuilder::new(&command);
    builder.add_payload_item("Position", "12345");
    builder.add_payload_item("Moving", "false");
    let response = builder.to_response();

    group.bench_function("encode_status_response", |b| {
        b.iter(|| black_box(response.encode()));
    });

    let empty = Response::from_successful_command(&command);
    group.bench_function("encode_empty_response", |b| {
        b.iter(|| black_box(empty.encode()));
    });

    group.finish();
}

/// Benchmark full dispatch through the sealed registry
fn bench_dispatch(c: &mut Criterion) {
    let registry = sealed_registry();

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let status = parse_command("<F1,1,Status>").unwrap();
    group.bench_function("dispatch_status", |b| {
        b.iter(|| black_box(registry.dispatch(black_box(&status))));
    });

    let move_to = parse_command("<F1,2,MoveTo=500>").unwrap();
    group.bench_function("dispatch_move_to", |b| {
        b.iter(|| black_box(registry.dispatch(black_box(&move_to))));
    });

    let unknown = parse_command("<Z9,3,Status>").unwrap();
    group.bench_function("dispatch_unknown_device", |b| {
        b.iter(|| black_box(registry.dispatch(black_box(&unknown))));
    });

    group.finish();
}

/// Benchmark the whole pipeline: decode, parse, dispatch, encode
fn bench_pipeline(c: &mut Criterion) {
    let registry = sealed_registry();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1));

    let wire = b"<T1,88,Temperature>\r\n";
    group.bench_function("request_to_response", |b| {
        b.iter(|| {
            let text = decode_7bit(black_box(wire));
            let command = parse_command(&text).unwrap();
            let response = registry.dispatch(&command);
            black_box(response.encode())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_decode,
    bench_encode,
    bench_dispatch,
    bench_pipeline,
);

criterion_main!(benches);
