//! Rewrite benchmarks: classification, predicate translation, reconstruction
//! SQL, and intercepted reads and writes against a file-backed database.

use criterion::{criterion_group, criterion_main, Criterion};

use sixnf_core::config::TemporalConfig;
use sixnf_core::models::{Params, SqlFragment};
use sixnf_core::traits::ITemporalEngine;
use sixnf_storage::SqliteEngine;
use sixnf_temporal::classifier::Classifier;
use sixnf_temporal::translator::{translate_predicate, SystemTimeFilter};
use sixnf_temporal::views::reconstruction_sql;
use sixnf_temporal::TemporalEngine;
use std::sync::Arc;

const CREATE_PRICE: &str = "CREATE TABLE price (sku TEXT, amount TEXT, vf TEXT, vt TEXT, \
     PERIOD FOR valid (vf, vt), PRIMARY KEY (sku, valid WITHOUT OVERLAPS)) WITH SYSTEM VERSIONING";

fn setup() -> TemporalEngine {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bench_rewrite.db");
    let _dir = Box::leak(Box::new(dir));
    let storage = SqliteEngine::open_path(&db_path).unwrap();
    let engine = TemporalEngine::new(Arc::new(storage), TemporalConfig::default());
    engine.execute_intercepted(CREATE_PRICE, &Params::None).unwrap();
    for i in 0..100 {
        engine
            .execute_intercepted(
                "INSERT INTO price (sku, amount, vf, vt) VALUES (?, ?, '2020-01-01', '2025-01-01')",
                &Params::positional([format!("sku-{i}"), format!("{i}.00")]),
            )
            .unwrap();
    }
    engine
}

fn bench_classify(c: &mut Criterion) {
    let classifier = Classifier::new();
    c.bench_function("classify_portion_update", |b| {
        b.iter(|| {
            classifier.classify(
                "UPDATE price FOR PORTION OF valid FROM '2021-01-01' TO '2022-01-01' \
                 SET amount = ? WHERE sku = ?",
            )
        });
    });
    c.bench_function("classify_create_table", |b| {
        b.iter(|| classifier.classify(CREATE_PRICE));
    });
}

fn bench_translate(c: &mut Criterion) {
    let engine = setup();
    let entry = engine.catalog().resolve("price").unwrap();
    let predicate = SqlFragment::literal(
        "valid OVERLAPS PERIOD('2021-06-01', '2022-06-01') AND sku = 'sku-1' OR valid CONTAINS '2023-01-01'",
    );
    c.bench_function("translate_predicate", |b| {
        b.iter(|| translate_predicate(&entry, &predicate).unwrap());
    });
    c.bench_function("reconstruction_sql_as_of", |b| {
        let filter = SystemTimeFilter::AsOf(sixnf_core::models::Timestamp::Infinity);
        b.iter(|| reconstruction_sql(&entry, &filter, false));
    });
}

fn bench_intercepted(c: &mut Criterion) {
    let engine = setup();
    c.bench_function("select_current_with_period_predicate", |b| {
        b.iter(|| {
            engine
                .execute_intercepted(
                    "SELECT sku, amount FROM price WHERE valid CONTAINS '2021-06-01'",
                    &Params::None,
                )
                .unwrap()
        });
    });

    let mut next = 1000u64;
    c.bench_function("insert_one_row", |b| {
        b.iter(|| {
            next += 1;
            engine
                .execute_intercepted(
                    "INSERT INTO price (sku, amount, vf, vt) VALUES (?, '1.00', '2020-01-01', '2025-01-01')",
                    &Params::positional([format!("sku-{next}")]),
                )
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_classify, bench_translate, bench_intercepted);
criterion_main!(benches);
