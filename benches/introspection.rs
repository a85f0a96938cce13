//! Schema Introspection Performance Benchmarks
//!
//! Introspection runs on every question, so its cost is paid per cycle.
//! These benchmarks measure:
//! - Introspection of a single table
//! - Introspection of several related tables
//! - Rendering the result into prompt text

use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[cfg(feature = "sqlite")]
use askql::engine::sqlite::SqliteEngine;
#[cfg(feature = "sqlite")]
use askql::{ConnectionConfig, DatabaseEngine, QueryLimits};

#[cfg(feature = "sqlite")]
fn seeded_engine(name: &str, sql: &str) -> (SqliteEngine, std::path::PathBuf) {
    let temp_file = std::env::temp_dir().join(name);
    let _ = std::fs::remove_file(&temp_file);

    {
        let conn = rusqlite::Connection::open(&temp_file).expect("Failed to create database");
        conn.execute_batch(sql).expect("Failed to seed database");
    }

    let engine = SqliteEngine::new(ConnectionConfig::sqlite(temp_file.clone()), QueryLimits::default())
        .expect("Failed to create engine");
    (engine, temp_file)
}

#[cfg(feature = "sqlite")]
fn bench_sqlite_introspection_simple(c: &mut Criterion) {
    let (engine, temp_file) = seeded_engine(
        "askql_bench_introspect_simple.db",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT)",
    );

    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("sqlite_introspect_single_table", |b| {
        b.iter(|| {
            let result = runtime.block_on(black_box(&engine).introspect());
            assert!(result.is_ok());
            result
        });
    });

    let _ = std::fs::remove_file(&temp_file);
}

#[cfg(feature = "sqlite")]
fn bench_sqlite_introspection_complex(c: &mut Criterion) {
    let (engine, temp_file) = seeded_engine(
        "askql_bench_introspect_complex.db",
        "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT NOT NULL);
         CREATE TABLE ta (id INTEGER PRIMARY KEY, person_id INTEGER NOT NULL REFERENCES person(id));
         CREATE TABLE student_request (
             id INTEGER PRIMARY KEY,
             person_id INTEGER NOT NULL REFERENCES person(id),
             ta_id INTEGER REFERENCES ta(id),
             status TEXT NOT NULL,
             created_at TEXT NOT NULL,
             description TEXT
         );
         CREATE INDEX idx_request_status ON student_request(status);
         CREATE VIEW waiting AS SELECT * FROM student_request WHERE status = 'waiting';",
    );

    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("sqlite_introspect_multiple_tables", |b| {
        b.iter(|| {
            let result = runtime.block_on(black_box(&engine).introspect());
            assert!(result.is_ok());
            result
        });
    });

    let schema = runtime.block_on(engine.introspect()).expect("Failed to introspect");
    c.bench_function("schema_render_multiple_tables", |b| {
        b.iter(|| black_box(&schema).render());
    });

    let _ = std::fs::remove_file(&temp_file);
}

#[cfg(feature = "sqlite")]
criterion_group!(benches, bench_sqlite_introspection_simple, bench_sqlite_introspection_complex);

#[cfg(not(feature = "sqlite"))]
criterion_group!(benches,);

criterion_main!(benches);
