use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vintf_version::{Version, VersionRange};

fn bench_supported_by(c: &mut Criterion) {
    let ranges: Vec<VersionRange> = (0..16).map(|i| VersionRange::new(i % 4, i, i + 3)).collect();
    let versions: Vec<Version> = (0..16).map(|i| Version::new(i % 4, i)).collect();

    c.bench_function("supported_by", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for r in &ranges {
                for v in &versions {
                    if black_box(r).supported_by(black_box(v)) {
                        hits += 1;
                    }
                }
            }
            hits
        })
    });
}

fn bench_parse_range(c: &mut Criterion) {
    let inputs = ["1.0", "1.2-3", "2.0-7", "202404.0-3"];

    c.bench_function("parse_range", |b| {
        b.iter(|| {
            for s in inputs {
                let _ = black_box(s).parse::<VersionRange>();
            }
        })
    });
}

criterion_group!(benches, bench_supported_by, bench_parse_range);
criterion_main!(benches);
