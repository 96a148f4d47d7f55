use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stacklog::log::{Context, LogEvent, LogLevel, MessageTransformer};

/// 创建指定条目数的上下文
fn create_context(entries: usize) -> Context {
    let mut context = Context::new();
    for i in 0..entries {
        context.push(format!("key_{}", i), format!("value_{}", i));
    }
    context
}

fn benchmark_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for entries in [0, 1, 10, 50].iter() {
        let context = create_context(*entries);
        group.throughput(Throughput::Elements(*entries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &context, |b, context| {
            b.iter(|| MessageTransformer::transform(black_box("disk full"), black_box(context)))
        });
    }

    group.finish();
}

fn benchmark_format_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_line");

    for size in [10, 100, 1000].iter() {
        let event = LogEvent::new(LogLevel::Error, "x".repeat(*size), create_context(5));
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &event, |b, event| {
            b.iter(|| MessageTransformer::format_line(black_box(event), "bench"))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_transform, benchmark_format_line);
criterion_main!(benches);
