//! End-to-end behaviour of the public `Engine` API.

use labsql::catalog::lab;
use labsql::{
    BindError, Engine, EngineConfig, Error, ExecuteOptions, ExecutionErrorKind, NullOrdering, ParseErrorKind,
    ResultSet, SuggestionKind, Value,
};

fn engine_with(config: EngineConfig) -> Engine {
    let engine = Engine::with_config(config);
    engine
        .register_table(
            "t",
            vec!["a".into(), "b".into()],
            vec![
                vec![Value::Integer(1), Value::from("x")],
                vec![Value::Integer(2), Value::from("y")],
                vec![Value::Integer(2), Value::from("z")],
                vec![Value::Null, Value::from("w")],
            ],
            None,
        )
        .expect("register t");
    engine
}

fn engine() -> Engine {
    engine_with(EngineConfig::for_testing())
}

fn run(engine: &Engine, sql: &str) -> ResultSet {
    engine
        .execute(sql, &ExecuteOptions::default())
        .unwrap_or_else(|e| panic!("{sql}: {e}"))
}

fn ints(values: &[Option<i64>]) -> Vec<Vec<Value>> {
    values
        .iter()
        .map(|v| vec![v.map(Value::Integer).unwrap_or(Value::Null)])
        .collect()
}

#[test]
fn count_star() {
    let result = run(&engine(), "SELECT COUNT(*) FROM t");
    assert_eq!(result.columns, vec!["expr_1"]);
    assert_eq!(result.rows, vec![vec![Value::Integer(4)]]);
}

#[test]
fn count_column_skips_nulls() {
    let result = run(&engine(), "SELECT COUNT(a) FROM t");
    assert_eq!(result.rows, vec![vec![Value::Integer(3)]]);
}

#[test]
fn group_by_with_nulls_last() {
    let result = run(&engine(), "SELECT a, COUNT(*) AS n FROM t GROUP BY a ORDER BY a");
    assert_eq!(result.columns, vec!["a", "n"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Integer(1), Value::Integer(1)],
            vec![Value::Integer(2), Value::Integer(2)],
            vec![Value::Null, Value::Integer(1)],
        ]
    );
}

#[test]
fn group_by_with_nulls_first() {
    let engine = engine_with(EngineConfig {
        null_ordering: NullOrdering::NullsFirstAsc,
        ..EngineConfig::for_testing()
    });
    let result = run(&engine, "SELECT a, COUNT(*) AS n FROM t GROUP BY a ORDER BY a");
    assert_eq!(result.rows[0], vec![Value::Null, Value::Integer(1)]);
}

#[test]
fn distinct_keeps_source_order() {
    let result = run(&engine(), "SELECT DISTINCT a FROM t");
    assert_eq!(result.columns, vec!["a"]);
    assert_eq!(result.rows, ints(&[Some(1), Some(2), None]));
}

#[test]
fn like_prefix() {
    let result = run(&engine(), "SELECT a FROM t WHERE b LIKE 'x%'");
    assert_eq!(result.rows, ints(&[Some(1)]));
}

#[test]
fn limit_without_order_keeps_source_rows() {
    let result = run(&engine(), "SELECT a FROM t LIMIT 2");
    assert_eq!(result.rows, ints(&[Some(1), Some(2)]));
}

#[test]
fn select_star_is_identity() {
    let engine = engine();
    let result = run(&engine, "SELECT * FROM t");
    let table = engine.catalog().snapshot();
    let info = labsql::TableSource::lookup(&table, "t").unwrap();
    assert_eq!(result.columns, vec!["a", "b"]);
    assert_eq!(result.rows, info.rows().to_vec());
}

#[test]
fn ordered_projection_is_deterministic_permutation() {
    let engine = engine();
    let sql = "SELECT a, b FROM t ORDER BY a, b";
    let first = run(&engine, sql);
    let second = run(&engine, sql);
    assert_eq!(first, second);

    let mut expected: Vec<String> = run(&engine, "SELECT a, b FROM t")
        .rows
        .iter()
        .map(|r| format!("{:?}", r))
        .collect();
    let mut got: Vec<String> = first.rows.iter().map(|r| format!("{:?}", r)).collect();
    expected.sort();
    got.sort();
    assert_eq!(expected, got);
}

#[test]
fn rows_match_projection_arity() {
    let engine = engine();
    for sql in [
        "SELECT a, b, a + 1 FROM t",
        "SELECT t.*, a FROM t",
        "SELECT b, COUNT(*), MAX(a) FROM t GROUP BY b",
        "SELECT 1, 'x', NULL",
    ] {
        let result = run(&engine, sql);
        assert!(result.rows.iter().all(|r| r.len() == result.columns.len()), "{sql}");
    }
}

#[test]
fn distinct_is_idempotent() {
    let engine = engine();
    let once = run(&engine, "SELECT DISTINCT a FROM t");
    engine
        .register_table("once", vec!["a".into()], once.rows.clone(), None)
        .unwrap();
    let twice = run(&engine, "SELECT DISTINCT a FROM once");
    assert_eq!(once.rows, twice.rows);
}

#[test]
fn non_grouped_column_is_rejected() {
    let engine = engine();
    for sql in [
        "SELECT b, COUNT(*) FROM t",
        "SELECT b, COUNT(*) FROM t GROUP BY a",
        "SELECT a + 1, SUM(a) FROM t GROUP BY b",
    ] {
        let err = engine.execute(sql, &ExecuteOptions::default()).unwrap_err();
        assert!(
            matches!(err, Error::Bind(BindError::NonGroupedColumn { .. })),
            "{sql}: {err:?}"
        );
    }
    run(&engine, "SELECT a + 1, SUM(a) FROM t GROUP BY a + 1");
}

#[test]
fn null_semantics() {
    let engine = engine();
    let result = run(&engine, "SELECT a = NULL, a IS NULL FROM t LIMIT 1");
    assert_eq!(result.rows, vec![vec![Value::Null, Value::Bool(false)]]);

    assert!(run(&engine, "SELECT a FROM t WHERE a = NULL").rows.is_empty());
    assert_eq!(run(&engine, "SELECT b FROM t WHERE a IS NULL").rows, vec![vec![Value::from("w")]]);
    assert_eq!(run(&engine, "SELECT a FROM t WHERE NOT a = 1").rows, ints(&[Some(2), Some(2)]));
}

#[test]
fn like_wildcards() {
    let engine = engine();
    let result = run(
        &engine,
        "SELECT 'axxb' LIKE 'a%b', 'acb' LIKE 'a_b', 'ab' LIKE 'a_b', 'acbd' LIKE 'a_b'",
    );
    assert_eq!(
        result.rows,
        vec![vec![Value::Bool(true), Value::Bool(true), Value::Bool(false), Value::Bool(false)]]
    );
}

#[test]
fn parse_errors_stay_within_input() {
    let engine = engine();
    for sql in [
        "",
        "SELECT",
        "SELECT FROM t",
        "SELECT a FROM",
        "SELECT a FROM t WHERE",
        "SELECT a FROM t ORDER",
        "SELECT (a FROM t",
        "SELECT 'open",
        "SELECT a @ b FROM t",
        "SELECT a < b < c FROM t",
        "SELECT é FROM t",
    ] {
        let err = engine.execute(sql, &ExecuteOptions::default()).unwrap_err();
        let offset = err.offset().expect("parse errors carry an offset");
        assert!(offset <= sql.len(), "{sql}: offset {offset}");
    }

    match engine.execute("SELECT FROM t", &ExecuteOptions::default()) {
        Err(Error::Parse(e)) => {
            assert_eq!(e.kind, ParseErrorKind::EmptySelect);
            assert_eq!(e.offset, 7);
        }
        other => panic!("expected EmptySelect, got {other:?}"),
    }
}

#[test]
fn oversized_expressions_fail_cleanly() {
    let engine = engine();
    let nested = format!("SELECT {}a{} FROM t", "(".repeat(50_000), ")".repeat(50_000));
    let chained = format!("SELECT a FROM t WHERE {}", vec!["a = 1"; 50_000].join(" OR "));
    for sql in [&nested, &chained] {
        match engine.execute(sql, &ExecuteOptions::default()) {
            Err(Error::Parse(e)) => assert!(e.offset <= sql.len()),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    let sum = vec!["a"; 200].join(" + ");
    let result = run(&engine, &format!("SELECT {sum} FROM t WHERE a = 1"));
    assert_eq!(result.rows, ints(&[Some(200)]));
}

#[test]
fn execution_errors_point_at_the_expression() {
    let err = engine()
        .execute("SELECT a / 0 FROM t", &ExecuteOptions::default())
        .unwrap_err();
    match err {
        Error::Execution(e) => {
            assert_eq!(e.kind, ExecutionErrorKind::DivisionByZero);
            assert_eq!(e.offset, 11);
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn top_and_limit_conflict() {
    let err = engine()
        .execute("SELECT TOP 1 a FROM t LIMIT 1", &ExecuteOptions::default())
        .unwrap_err();
    assert_eq!(err, Error::Bind(BindError::TopAndLimitConflict));
}

#[test]
fn result_serializes_for_the_boundary() {
    let result = run(&engine(), "SELECT a, b FROM t WHERE a IS NULL OR a = 1");
    assert_eq!(
        result.to_json().unwrap(),
        r#"{"columns":["a","b"],"rows":[[1,"x"],[null,"w"]]}"#
    );
}

#[test]
fn completion_scenario() {
    let engine = Engine::new();
    engine
        .register_table("samples", vec!["id".into(), "name".into()], vec![], None)
        .unwrap();
    engine.register_table("tests", vec!["id".into()], vec![], None).unwrap();

    let suggestions = engine.suggest("SELECT * FROM sa", 16);
    let top = &suggestions[0];
    assert_eq!(top.text, "samples");
    assert_eq!(top.kind, SuggestionKind::Table);
    assert_eq!(top.replace_range, [14, 16]);
}

#[test]
fn lab_catalog_join_and_group() {
    let engine = Engine::new();
    lab::install(engine.catalog(), 40).unwrap();

    let result = run(
        &engine,
        "SELECT s.sample_type, COUNT(*) AS n FROM samples s \
         JOIN results r ON r.sample_id = s.id \
         GROUP BY s.sample_type ORDER BY n DESC, s.sample_type",
    );
    assert_eq!(result.columns, vec!["sample_type", "n"]);
    assert_eq!(result.row_count(), 4);
    let total: i64 = result
        .rows
        .iter()
        .map(|r| match r[1] {
            Value::Integer(n) => n,
            ref other => panic!("unexpected count {other:?}"),
        })
        .sum();
    assert_eq!(total, 80);
}

#[test]
fn lab_catalog_left_join_pads_nulls() {
    let engine = Engine::new();
    lab::install(engine.catalog(), 10).unwrap();

    let result = run(
        &engine,
        "SELECT i.name, t.code FROM instruments i \
         LEFT JOIN tests t ON t.instrument_id = i.id AND t.code = 'GLU' \
         ORDER BY i.id",
    );
    assert_eq!(
        result.rows,
        vec![
            vec![Value::from("Cobas c311"), Value::from("GLU")],
            vec![Value::from("Sysmex XN"), Value::Null],
            vec![Value::from("Architect i2000"), Value::Null],
        ]
    );
}

#[test]
fn interactive_preset_caps_unbounded_queries() {
    let engine = Engine::with_config(EngineConfig::interactive());
    lab::install(engine.catalog(), 1200).unwrap();

    assert_eq!(run(&engine, "SELECT id FROM samples").row_count(), 1000);
    assert_eq!(run(&engine, "SELECT TOP 5 id FROM samples").row_count(), 5);
    let all = engine
        .execute("SELECT id FROM samples", &ExecuteOptions::with_default_limit(0))
        .unwrap();
    assert_eq!(all.row_count(), 1200);
}
