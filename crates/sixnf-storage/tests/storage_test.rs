use sixnf_core::errors::TemporalError;
use sixnf_core::models::{
    ColumnDef, ExecOutcome, LogicalTable, Params, PeriodDef, PeriodKind, SqlValue,
};
use sixnf_core::traits::{ICatalogStore, ISqlEngine};
use sixnf_core::SixnfError;
use sixnf_storage::migrations::{current_version, run_migrations, LATEST_VERSION};
use sixnf_storage::SqliteEngine;

fn setup() -> (tempfile::TempDir, SqliteEngine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::open_path(&dir.path().join("sixnf.db")).unwrap();
    (dir, engine)
}

fn prices() -> LogicalTable {
    LogicalTable {
        name: "Prices".to_string(),
        columns: vec![
            ColumnDef {
                primary_key: true,
                ..ColumnDef::new("sku", "TEXT")
            },
            ColumnDef::new("amount", "REAL"),
        ],
        periods: vec![PeriodDef {
            name: "SYSTEM_TIME".to_string(),
            start_column: "transaction_start".to_string(),
            end_column: "transaction_end".to_string(),
            kind: PeriodKind::System,
        }],
        primary_key: None,
        foreign_keys: vec![],
        system_versioned: true,
    }
}

#[test]
fn migrations_are_idempotent() {
    let (_dir, engine) = setup();
    engine
        .with_conn(|conn| {
            assert_eq!(current_version(conn)?, LATEST_VERSION);
            assert_eq!(run_migrations(conn)?, 0);
            Ok(())
        })
        .unwrap();
}

#[test]
fn catalog_round_trip_is_case_insensitive() {
    let (_dir, engine) = setup();
    let stored = engine.insert_table(&prices()).unwrap();
    assert!(stored.id > 0);

    let loaded = engine.load_table("PRICES").unwrap().unwrap();
    assert_eq!(loaded.id, stored.id);
    assert_eq!(loaded.table, prices());
    assert!(engine.load_table("missing").unwrap().is_none());
    assert_eq!(engine.list_tables().unwrap().len(), 1);
}

#[test]
fn duplicate_registration_is_rejected() {
    let (_dir, engine) = setup();
    engine.insert_table(&prices()).unwrap();
    let mut again = prices();
    again.name = "prices".to_string();
    let err = engine.insert_table(&again).unwrap_err();
    assert!(matches!(
        err,
        SixnfError::TemporalError(TemporalError::DuplicateTable { .. })
    ));
}

#[test]
fn named_and_positional_parameters_bind() {
    let (_dir, engine) = setup();
    engine.execute_batch("CREATE TABLE t (a INTEGER, b TEXT)").unwrap();

    let outcome = engine
        .execute(
            "INSERT INTO t VALUES (?1, ?2)",
            &Params::positional([SqlValue::Integer(1), SqlValue::text("x")]),
        )
        .unwrap();
    assert_eq!(outcome, ExecOutcome::Affected(1));

    let named = Params::Named(vec![
        ("b".to_string(), SqlValue::text("y")),
        (":a".to_string(), SqlValue::Integer(2)),
    ]);
    engine.execute("INSERT INTO t VALUES (:a, @b)", &named).unwrap();

    let rows = engine
        .query("SELECT a, b FROM t ORDER BY a", &Params::None)
        .unwrap();
    assert_eq!(rows.columns, vec!["a", "b"]);
    assert_eq!(rows.get(1, "b"), Some(&SqlValue::text("y")));
}

#[test]
fn wrong_parameter_count_is_an_engine_error() {
    let (_dir, engine) = setup();
    let err = engine
        .query("SELECT ?1 + ?2", &Params::positional([1i64]))
        .unwrap_err();
    assert!(err.as_sqlite().is_some());
}

#[test]
fn introspection_skips_reserved_tables() {
    let (_dir, engine) = setup();
    engine
        .execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL DEFAULT 'anon');
             CREATE TABLE sixnf_9 (x);",
        )
        .unwrap();

    assert_eq!(engine.list_user_tables().unwrap(), vec!["customers"]);

    let columns = engine.table_columns("customers").unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].primary_key_position, 1);
    assert!(columns[1].not_null);
    assert_eq!(columns[1].default_sql.as_deref(), Some("'anon'"));
    assert!(engine.table_columns("nope").unwrap().is_empty());
}

#[test]
fn catalog_table_exists_after_open() {
    let (_dir, engine) = setup();
    assert!(engine.object_exists("SIXNF_TABLE").unwrap());
    assert!(!engine.object_exists("nope").unwrap());

    engine
        .execute_batch("CREATE TABLE plain (x INTEGER); CREATE VIEW plain_view AS SELECT x FROM plain")
        .unwrap();
    assert!(engine.object_exists("Plain").unwrap());
    assert!(engine.object_exists("plain_view").unwrap());
}
