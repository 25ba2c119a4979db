//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use gridcore_rs::{ColumnDefinition, ColumnType, GridEngine, GridOptions, RowRecord};

/// Initialize test logging once; safe to call from every test.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Standard people fixture: id / name / country / age columns.
pub fn people_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", ColumnType::Number).with_width(60.0),
        ColumnDefinition::new("name", ColumnType::String).with_width(160.0),
        ColumnDefinition::new("country", ColumnType::String).with_width(120.0),
        ColumnDefinition::new("age", ColumnType::Number).with_width(80.0),
    ]
}

pub fn people_rows() -> Vec<RowRecord> {
    let data: &[(i64, &str, &str, f64)] = &[
        (1, "Ada", "UK", 36.0),
        (2, "Grace", "US", 45.0),
        (3, "Linus", "FI", 28.0),
        (4, "Margaret", "US", 52.0),
        (5, "Alan", "UK", 41.0),
        (6, "Barbara", "US", 33.0),
    ];
    data.iter()
        .map(|(id, name, country, age)| {
            RowRecord::new()
                .with("id", *id)
                .with("name", *name)
                .with("country", *country)
                .with("age", *age)
        })
        .collect()
}

pub fn people_engine() -> GridEngine {
    init_logging();
    let mut engine = GridEngine::new(people_columns(), GridOptions::default()).unwrap();
    engine.set_rows(people_rows()).unwrap();
    engine
}
