mod common;

use catalog_sql::prelude::*;
use common::{FakeCatalog, binds, text_rows};

#[tokio::test]
async fn submits_translated_sql_with_positional_binds() {
    let mut conn = FakeCatalog::new();
    let outcome = execute(
        &mut conn,
        "SELECT * FROM t WHERE x = ? AND y LIKE ?",
        &binds(&["10013", "/tempZone/home/%"]),
    )
    .await;

    assert!(!outcome.is_error());
    let (sql, sent) = &conn.log[0];
    assert_eq!(sql, "SELECT * FROM t WHERE x = $1 AND y SIMILAR TO $2");
    assert_eq!(sent, &binds(&["10013", "/tempZone/home/%"]));
}

#[tokio::test]
async fn zero_rows_is_success_with_no_info() {
    let mut conn = FakeCatalog::new();
    conn.respond(
        "select coll_id from r_coll_main where coll_name = $1",
        text_rows("coll_id", &[]),
    );
    let outcome = execute(
        &mut conn,
        "select coll_id from r_coll_main where coll_name = ?",
        &binds(&["/nope"]),
    )
    .await;

    assert!(matches!(outcome, StatementOutcome::SuccessNoRows(_)));
    assert_eq!(outcome.code(), Some(CatalogErrorCode::SuccessButWithNoInfo));
}

#[tokio::test]
async fn rows_come_back_with_success() {
    let mut conn = FakeCatalog::new();
    conn.respond("select coll_name from r_coll_main", text_rows("coll_name", &["/a", "/b"]));

    match execute(&mut conn, "select coll_name from r_coll_main", &[]).await {
        StatementOutcome::Success(rs) => {
            assert_eq!(rs.len(), 2);
            assert_eq!(rs.results[1].get("coll_name").and_then(RowValues::as_text), Some("/b"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn transaction_control_is_never_no_rows() {
    let mut conn = FakeCatalog::new();
    for sql in ["begin", "COMMIT", "savepoint cockroach_restart", "rollback"] {
        conn.respond(sql, ResultSet::command(0));
        let outcome = execute(&mut conn, sql, &[]).await;
        assert!(matches!(outcome, StatementOutcome::Success(_)), "{sql}");
    }

    // anything else with a zero count is "no info", even DDL
    conn.respond("create table t (a int)", ResultSet::command(0));
    let outcome = execute(&mut conn, "create table t (a int)", &[]).await;
    assert!(matches!(outcome, StatementOutcome::SuccessNoRows(_)));
}

#[tokio::test]
async fn duplicate_key_is_classified() {
    let mut conn = FakeCatalog::new();
    let sql = "insert into r_coll_main (coll_id, coll_name) values ($1, $2)";
    conn.fail_next(
        sql,
        "23505",
        "duplicate key value violates unique constraint \"idx_coll_main2\"",
    );
    conn.fail_next(sql, "23505", "unique violation on an expression index");

    let args = binds(&["1", "/tempZone/home"]);
    let sql = "insert into r_coll_main (coll_id, coll_name) values (?, ?)";
    let first = execute(&mut conn, sql, &args).await;
    let second = execute(&mut conn, sql, &args).await;

    match first {
        StatementOutcome::Error(err) => {
            assert_eq!(err.code, CatalogErrorCode::AlreadyHasItemByThatName);
            assert_eq!(err.sqlstate.as_deref(), Some("23505"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(second.code(), Some(CatalogErrorCode::SqlFailure));
}

#[tokio::test]
async fn execute_no_result_reduces_to_status() {
    let mut conn = FakeCatalog::new();
    conn.respond("delete from r_objt_access where object_id = $1", ResultSet::command(0));
    conn.fail_next(
        "update r_data_main set data_size = $1",
        "42703",
        "column \"data_size\" does not exist",
    );

    let status =
        execute_no_result(&mut conn, "insert into r_objt_access values (?)", &binds(&["9"]))
            .await
            .unwrap();
    assert_eq!(status, StatementStatus::Success);

    let status = execute_no_result(
        &mut conn,
        "delete from r_objt_access where object_id = ?",
        &binds(&["9"]),
    )
    .await
    .unwrap();
    assert_eq!(status, StatementStatus::NoRows);

    let err = execute_no_result(&mut conn, "update r_data_main set data_size = ?", &binds(&["0"]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), CatalogErrorCode::SqlFailure);
    assert_eq!(err.sqlstate(), Some("42703"));
    assert!(err.to_string().contains("data_size"));
}
