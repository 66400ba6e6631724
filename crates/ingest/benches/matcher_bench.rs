//! 디렉티브 매칭 벤치마크
//!
//! 규칙 순서 매칭, 문서 생성, 식별자 계산의 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lapio_core::types::LogLine;
use lapio_ingest::directive::{CompiledDirective, DirectiveLoader};
use lapio_ingest::{DocumentBuilder, identity};

const DIRECTIVE: &str = r#"
name: mixed
regexes:
  - expression: '^(?P<level>ERROR|WARN) (?P<component>\w+): (?P<text>.*)$'
    capture_groups: 3
  - expression: '^(?P<ip>\S+) \S+ \S+ \[(?P<ts>[^\]]+)\] "(?P<method>\S+) (?P<url>\S+) \S+" (?P<status>\d+) (?P<bytes>\d+)$'
    capture_groups: 6
time:
  field: ts
  layout: "%d/%b/%Y:%H:%M:%S %z"
"#;

/// 두 번째 규칙에 매칭되는 Apache combined 로그
const ACCESS_LINE: &str =
    r#"203.0.113.45 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#;

/// 첫 번째 규칙에 매칭되는 애플리케이션 로그
const APP_LINE: &str = "ERROR scheduler: job 42 exceeded its deadline";

/// 어떤 규칙에도 매칭되지 않는 라인
const MISS_LINE: &str = "-- MARK --";

fn directive() -> CompiledDirective {
    let def = DirectiveLoader::parse_yaml(DIRECTIVE, "bench.yml").unwrap();
    CompiledDirective::compile(def).unwrap()
}

fn bench_match_line(c: &mut Criterion) {
    let directive = directive();
    let mut group = c.benchmark_group("match_line");
    group.throughput(Throughput::Elements(1));

    for (name, line) in [("first_rule", APP_LINE), ("second_rule", ACCESS_LINE), ("miss", MISS_LINE)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| directive.match_line(black_box(line)))
        });
    }

    group.finish();
}

fn bench_build_document(c: &mut Criterion) {
    let directive = directive();
    let builder = DocumentBuilder::from_directive(&directive);
    let line = LogLine::new(ACCESS_LINE, 1, "/var/log/apache2/access.log");
    let matched = directive.match_line(ACCESS_LINE).unwrap();

    let mut group = c.benchmark_group("document");
    group.throughput(Throughput::Elements(1));
    group.bench_function("build_with_timestamp", |b| {
        b.iter(|| builder.build(black_box(&matched), black_box(&line)))
    });
    group.bench_function("build_and_serialize", |b| {
        b.iter(|| builder.build(&matched, &line).to_json().unwrap())
    });
    group.finish();
}

fn bench_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");
    group.throughput(Throughput::Bytes(ACCESS_LINE.len() as u64));
    group.bench_function("sha256_content", |b| {
        b.iter(|| identity::assign(black_box(ACCESS_LINE)))
    });
    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let directive = directive();
    let builder = DocumentBuilder::from_directive(&directive);
    let lines: Vec<LogLine> = (0..1000u64)
        .map(|n| {
            let raw = match n % 3 {
                0 => ACCESS_LINE,
                1 => APP_LINE,
                _ => MISS_LINE,
            };
            LogLine::new(raw, n + 1, "bench.log")
        })
        .collect();

    let mut group = c.benchmark_group("pipeline_cpu");
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("match_build_identify_1000", |b| {
        b.iter(|| {
            let mut indexed = 0usize;
            for line in &lines {
                if let Some(m) = directive.match_line(line.raw()) {
                    let doc = builder.build(&m, line);
                    let _id = identity::assign(line.raw_bytes());
                    indexed += doc.len();
                }
            }
            indexed
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_match_line,
    bench_build_document,
    bench_identity,
    bench_throughput
);
criterion_main!(benches);
