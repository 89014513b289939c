use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{Criterion, criterion_group, criterion_main};
use datastory_prep::aggregate;
use datastory_prep::dataset::Dataset;
use datastory_prep::derive::{self, JoinSpec, RatioSpec};
use datastory_prep::ingest::{IngestOptions, ingest};
use datastory_prep::reshape::{self, MeltSpec};
use tempfile::TempDir;

const REGIONS: usize = 400;
const YEARS: usize = 30;

/// One row per region, one `y<year>` column per year.
fn generate_population() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("population.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    let header = (0..YEARS)
        .map(|y| format!("y{}", 1990 + y))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(file, "Region,{header}").expect("header");
    for region in 0..REGIONS {
        let values = (0..YEARS)
            .map(|y| {
                if (region + y) % 17 == 0 {
                    String::new()
                } else {
                    (10_000 + region * 31 + y * 7).to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        writeln!(file, "region-{region},{values}").expect("row");
    }
    (temp_dir, csv_path)
}

fn melted(wide: &Dataset) -> Dataset {
    let spec = MeltSpec::new(["Region"], Vec::<String>::new())
        .named("year", "population")
        .strip_prefix(1);
    reshape::melt(wide, &spec).expect("melt")
}

fn bench_stages(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_population();
    let options = IngestOptions::default();
    let wide = ingest(&csv_path, &options).expect("ingest");
    let long = melted(&wide);
    let waste = derive::scale(&long, "population", 0.5, Some("waste")).expect("scale");
    let join = JoinSpec::new(["Region", "year"], ["Region", "year"]);
    let ratio = RatioSpec::new("waste", "population", "per_capita");

    let mut group = c.benchmark_group("stages");
    group.bench_function("ingest", |b| {
        b.iter(|| ingest(&csv_path, &options).expect("ingest"))
    });
    group.bench_function("melt", |b| b.iter(|| melted(&wide)));
    group.bench_function("merge_and_derive", |b| {
        b.iter(|| derive::merge_and_derive(&waste, &long, &join, &ratio).expect("merge"))
    });
    group.bench_function("group_mean", |b| {
        b.iter(|| aggregate::group_mean(&long, "year").expect("group"))
    });
    group.bench_function("present_sorted", |b| {
        b.iter(|| aggregate::present_sorted(&long, "population", "population").expect("rank"))
    });
    group.finish();
    drop(temp_dir);
}

criterion_group!(benches, bench_stages);
criterion_main!(benches);
