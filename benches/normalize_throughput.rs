//! Request normalization throughput benchmark.
//!
//! Measures argument decoding, defaulting and wire rendering per tool, plus
//! line codec reads, using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use std::time::Duration;
use uptrace_mcp::mcp::codec::{read_frame, write_frame, DEFAULT_MAX_LINE_BYTES};
use uptrace_mcp::tools::ops::{dashboards, spans};
use uptrace_mcp::tools::{parse_arguments, DefaultPolicy, Operation};
use uptrace_mcp::validation::DASHBOARD_YAML_EXAMPLE;

fn policy() -> DefaultPolicy {
    DefaultPolicy::new(1, Duration::from_secs(3600), 100, "group by _group_id").unwrap()
}

fn normalize<O: Operation>(policy: &DefaultPolicy, args: &Value) {
    let input: O::Input = parse_arguments(args.clone()).unwrap();
    let request = O::normalize(input, policy).unwrap();
    black_box(request.to_api_call().unwrap());
}

fn bench_normalize(c: &mut Criterion) {
    let policy = policy();
    let mut group = c.benchmark_group("normalize");

    let empty = json!({});
    group.bench_function("list_spans/defaults", |b| {
        b.iter(|| normalize::<spans::ListSpans>(&policy, black_box(&empty)))
    });

    let filtered = json!({
        "time_start": "2024-05-01T10:00:00Z",
        "time_end": "2024-05-01T11:00:00Z",
        "query": "where _status_code = 'error'",
        "system": "httpserver:all",
        "duration_gte": 1_000_000,
    });
    group.bench_function("list_spans/filtered", |b| {
        b.iter(|| normalize::<spans::ListSpans>(&policy, black_box(&filtered)))
    });

    for n in [1usize, 4, 16] {
        let args = json!({
            "query": vec!["where _status_code = 'error'"; n],
            "alias": (0..n).map(|i| if i == 0 { "root".to_string() } else { format!("q{i}") }).collect::<Vec<_>>(),
            "system": vec!["spans:all"; n],
        });
        group.bench_with_input(BenchmarkId::new("list_traces", n), &args, |b, a| {
            b.iter(|| normalize::<spans::ListTraces>(&policy, black_box(a)))
        });
    }

    let create = json!({ "body": DASHBOARD_YAML_EXAMPLE });
    group.bench_function("create_dashboard", |b| {
        b.iter(|| normalize::<dashboards::CreateDashboard>(&policy, black_box(&create)))
    });

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let sizes: &[usize] = &[64, 4096, 65536];

    let mut group = c.benchmark_group("read_frame");
    for &size in sizes {
        let message = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "create_dashboard", "arguments": {"body": "x".repeat(size)}},
        });
        let wire = rt.block_on(async {
            let mut buf = Vec::new();
            write_frame(&mut buf, &message).await.unwrap();
            buf
        });

        group.bench_with_input(BenchmarkId::from_parameter(size), &wire, |b, w| {
            b.iter(|| {
                rt.block_on(async {
                    let mut reader = black_box(w.as_slice());
                    let mut buf = Vec::new();
                    read_frame(&mut reader, &mut buf, DEFAULT_MAX_LINE_BYTES).await.unwrap()
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_codec);
criterion_main!(benches);
