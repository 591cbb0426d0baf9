//! Execution Pipeline Performance Benchmarks
//!
//! Benchmarks for the registered-query execution path.
//! These benchmarks measure the performance of:
//! - Parameter validation and type coercion
//! - Conditional template rendering
//! - End-to-end runs through lookup, render, execute, and audit
//! - Large result set handling under the row ceiling

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use docket::{ensure_schema, App, ParamType, ParameterDefinition, Settings};

fn bench_validation(c: &mut Criterion) {
    let definitions = vec![
        ParameterDefinition::new("id", ParamType::Number),
        ParameterDefinition {
            required: false,
            allowed_values: Some(vec![json!("OPEN"), json!("CLOSED")]),
            ..ParameterDefinition::new("status", ParamType::Varchar2)
        },
        ParameterDefinition {
            required: false,
            ..ParameterDefinition::new("since", ParamType::Date)
        },
    ];

    let provided = match json!({"id": "42", "status": "OPEN", "since": "2024-03-01"}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };

    c.bench_function("validate_three_params", |b| {
        b.iter(|| {
            let bound = docket::validate::validate(black_box(&definitions), black_box(&provided));
            assert!(bound.is_ok());
            bound
        });
    });
}

fn bench_template_render(c: &mut Criterion) {
    let definitions = vec![
        ParameterDefinition {
            required: false,
            ..ParameterDefinition::new("status", ParamType::Varchar2)
        },
        ParameterDefinition {
            required: false,
            ..ParameterDefinition::new("since", ParamType::Date)
        },
    ];
    let provided = match json!({"status": "OPEN"}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let bound = docket::validate::validate(&definitions, &provided).expect("Failed to validate");

    let sql = "SELECT id, status, opened_on FROM cases WHERE 1 = 1\
               /*[ AND status = :status]*//*[ AND opened_on >= :since]*/ ORDER BY id";

    c.bench_function("render_two_blocks", |b| {
        b.iter(|| docket::template::render(black_box(sql), black_box(&bound)));
    });
}

fn bench_end_to_end_run(c: &mut Criterion) {
    let temp_db = std::env::temp_dir().join("bench_pipeline_run.db");
    let temp_log = std::env::temp_dir().join("bench_pipeline_run.log");
    let _ = std::fs::remove_file(&temp_db);
    let _ = std::fs::remove_file(&temp_log);

    {
        use rusqlite::Connection;
        let conn = Connection::open(&temp_db).expect("Failed to create database");
        ensure_schema(&conn).expect("Failed to create registry schema");
        conn.execute("CREATE TABLE cases (id INTEGER PRIMARY KEY, status TEXT)", [])
            .expect("Failed to create table");

        for i in 1..=100 {
            conn.execute(
                "INSERT INTO cases (status) VALUES (?)",
                [if i % 2 == 0 { "OPEN" } else { "CLOSED" }],
            )
            .expect("Failed to insert");
        }

        conn.execute(
            "INSERT INTO query_registry (name, sql_text, parameters) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                "cases_by_status",
                "SELECT id, status FROM cases WHERE 1 = 1/*[ AND status = :status]*/ ORDER BY id",
                r#"[{"name": "status", "type": "VARCHAR2", "required": false}]"#,
            ],
        )
        .expect("Failed to register query");
    }

    let settings = Settings {
        database_path: temp_db.clone(),
        audit_log_path: temp_log.clone(),
        ..Settings::default()
    };

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let app = runtime.block_on(App::bootstrap(settings)).expect("Failed to bootstrap");

    let provided = match json!({"status": "OPEN"}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };

    c.bench_function("run_query_filtered_50_rows", |b| {
        b.iter(|| {
            let rows = runtime.block_on(app.run_query(
                black_box("cases_by_status"),
                black_box(&provided),
                None,
                None,
            ));
            assert!(rows.is_ok());
            rows
        });
    });

    let empty = serde_json::Map::new();
    c.bench_function("run_query_all_100_rows", |b| {
        b.iter(|| {
            let rows = runtime.block_on(app.run_query(
                black_box("cases_by_status"),
                black_box(&empty),
                None,
                None,
            ));
            assert!(rows.is_ok());
            rows
        });
    });

    // Cleanup
    let _ = std::fs::remove_file(&temp_db);
    let _ = std::fs::remove_file(&temp_log);
}

fn bench_large_result_under_ceiling(c: &mut Criterion) {
    let temp_db = std::env::temp_dir().join("bench_pipeline_large.db");
    let temp_log = std::env::temp_dir().join("bench_pipeline_large.log");
    let _ = std::fs::remove_file(&temp_db);
    let _ = std::fs::remove_file(&temp_log);

    {
        use rusqlite::Connection;
        let conn = Connection::open(&temp_db).expect("Failed to create database");
        ensure_schema(&conn).expect("Failed to create registry schema");
        conn.execute("CREATE TABLE large_table (id INTEGER PRIMARY KEY, value TEXT)", [])
            .expect("Failed to create table");

        for i in 1..=10000 {
            conn.execute("INSERT INTO large_table (value) VALUES (?)", [format!("Value {i}")])
                .expect("Failed to insert");
        }

        conn.execute(
            "INSERT INTO query_registry (name, sql_text, parameters) VALUES (?1, ?2, ?3)",
            rusqlite::params!["all_values", "SELECT id, value FROM large_table", "[]"],
        )
        .expect("Failed to register query");
    }

    let settings = Settings {
        database_path: temp_db.clone(),
        audit_log_path: temp_log.clone(),
        ..Settings::default()
    };

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let app = runtime.block_on(App::bootstrap(settings)).expect("Failed to bootstrap");
    let empty = serde_json::Map::new();

    // The hard ceiling stops the scan at 2000 rows regardless of table size
    c.bench_function("run_query_ceiling_capped", |b| {
        b.iter(|| {
            let rows = runtime
                .block_on(app.run_query(black_box("all_values"), black_box(&empty), Some(9999), None));
            assert!(rows.is_ok());
            rows
        });
    });

    // Cleanup
    let _ = std::fs::remove_file(&temp_db);
    let _ = std::fs::remove_file(&temp_log);
}

criterion_group!(
    benches,
    bench_validation,
    bench_template_render,
    bench_end_to_end_run,
    bench_large_result_under_ceiling
);

criterion_main!(benches);
