use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kalix_lint::parse;
use kalix_lint::parser::{classify_line, strip_comment};
use std::fs;
use std::hint::black_box;

/// Generate a chain of nodes, each linking to the next
fn generate_model(nodes: usize, pattern: &str) -> String {
    let mut content = String::from("[attributes]\nini_version = 0.0.1\n\n[inputs]\nrain.csv\n\n[outputs]\n");
    for i in 0..nodes.min(50) {
        content.push_str(&format!("node.n{}.dsflow\n", i));
    }

    for i in 0..nodes {
        content.push_str(&format!("\n[node.n{}]\n", i));
        match pattern {
            "continuations" => {
                content.push_str("type = gr4j\n");
                content.push_str(&format!("loc = {}.0, {}.5\n", i, i));
                content.push_str("params = 350.0,\n    0.0,\n    90.0,\n    1.7\n");
            }
            "comment_heavy" => {
                content.push_str("# Catchment upstream of the gauge\n");
                content.push_str("type = gr4j # rainfall-runoff\n");
                content.push_str(&format!("loc = {}.0, {}.5 # map position\n", i, i));
                content.push_str("params = 350, 0, 90, 1.7 # calibrated\n");
            }
            _ => {
                content.push_str("type = gr4j\n");
                content.push_str(&format!("loc = {}.0, {}.5\n", i, i));
                content.push_str("params = 350, 0, 90, 1.7\n");
                content.push_str("rain = data.rain_csv\n");
            }
        }
        if i + 1 < nodes {
            content.push_str(&format!("ds_1 = n{}\n", i + 1));
        }
    }

    content
}

/// Benchmark classifying single lines
fn bench_line_classification(c: &mut Criterion) {
    let test_lines = vec![
        ("header", "[node.catchment]"),
        ("property", "params = 350, 0, 90, 1.7"),
        ("with_comment", "loc = 10.0, 20.0 # map position"),
        ("comment_only", "# Calibrated against 1990-2010 records"),
        ("bare", "node.catchment.dsflow"),
    ];

    let mut group = c.benchmark_group("line_classification");

    for (name, line) in test_lines {
        group.bench_with_input(BenchmarkId::new("classify_line", name), &line, |b, line| {
            b.iter(|| black_box(classify_line(strip_comment(black_box(line)))))
        });
    }

    group.finish();
}

/// Benchmark parsing models of different sizes
fn bench_model_parsing(c: &mut Criterion) {
    let sizes = vec![10, 100, 1_000, 10_000];
    let patterns = vec!["plain", "continuations", "comment_heavy"];

    let mut group = c.benchmark_group("model_parsing");

    for &size in &sizes {
        for pattern in &patterns {
            let content = generate_model(size, pattern);

            group.throughput(Throughput::Bytes(content.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(*pattern, size),
                &content,
                |b, content| b.iter(|| black_box(parse(black_box(content)))),
            );
        }
    }

    group.finish();
}

/// Benchmark parsing the fixture models
fn bench_real_files(c: &mut Criterion) {
    let fixture_files = vec!["tests/fixtures/catchment.ini", "tests/fixtures/broken.ini"];

    let mut group = c.benchmark_group("real_files");

    for file_path in fixture_files {
        if let Ok(content) = fs::read_to_string(file_path) {
            let file_name = file_path.rsplit('/').next().unwrap_or("unknown");

            group.throughput(Throughput::Bytes(content.len() as u64));
            group.bench_with_input(
                BenchmarkId::new("real_file", file_name),
                &content,
                |b, content| b.iter(|| black_box(parse(black_box(content)))),
            );
        }
    }

    group.finish();
}

criterion_group!(
    parsing_benches,
    bench_line_classification,
    bench_model_parsing,
    bench_real_files
);

criterion_main!(parsing_benches);
