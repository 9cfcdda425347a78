mod common;

use std::num::NonZeroU32;

use catalog_sql::prelude::*;
use common::{FakeCatalog, binds};

const RELEASE: &str = "release savepoint cockroach_restart";
const ROLLBACK_TO: &str = "rollback to savepoint cockroach_restart";
const INSERT: &str = "insert into r_coll_main (coll_id, coll_name) values (?, ?)";

fn conflicting(times: usize) -> FakeCatalog {
    let mut conn = FakeCatalog::new();
    for _ in 0..times {
        conn.fail_next(
            RELEASE,
            "40001",
            "restart transaction: TransactionRetryWithProtoRefreshError: WriteTooOld",
        );
    }
    conn
}

#[tokio::test]
async fn conflicts_are_retried_then_committed() {
    for k in [0usize, 1, 3, 10] {
        let mut session = CatalogSession::new(conflicting(k));
        let mut runs = 0usize;

        let id = session
            .run_transaction(|conn| {
                runs += 1;
                Box::pin(async move {
                    let args = binds(&["10020", "/tempZone/home/alice"]);
                    execute_no_result(conn, INSERT, &args).await?;
                    Ok(10020)
                })
            })
            .await
            .unwrap();

        assert_eq!(id, 10020);
        assert_eq!(runs, k + 1, "k={k}");
        assert_eq!(session.transaction_state(), TransactionState::Committed);

        let conn = session.into_backend();
        assert_eq!(conn.count("begin"), 1);
        assert_eq!(conn.count("savepoint cockroach_restart"), 1);
        assert_eq!(conn.count(RELEASE), k + 1);
        assert_eq!(conn.count(ROLLBACK_TO), k);
        assert_eq!(conn.count("commit"), 1);
        assert_eq!(conn.count("rollback"), 0);
        assert_eq!(conn.count_containing("insert into r_coll_main"), k + 1);
    }
}

#[tokio::test]
async fn protocol_order_with_one_conflict() {
    let mut session = CatalogSession::new(conflicting(1));
    session
        .run_transaction(|conn| {
            Box::pin(async move {
                execute_no_result(conn, INSERT, &binds(&["1", "/a"])).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

    let conn = session.into_backend();
    assert_eq!(
        conn.statements(),
        vec![
            "begin",
            "savepoint cockroach_restart",
            "insert into r_coll_main (coll_id, coll_name) values ($1, $2)",
            RELEASE,
            ROLLBACK_TO,
            "insert into r_coll_main (coll_id, coll_name) values ($1, $2)",
            RELEASE,
            "commit",
        ]
    );
}

#[tokio::test]
async fn failed_unit_of_work_is_returned_without_release_or_commit() {
    let mut conn = FakeCatalog::new();
    conn.fail_next(
        "insert into r_coll_main (coll_id, coll_name) values ($1, $2)",
        "23505",
        "duplicate key value violates unique constraint \"idx_coll_main2\"",
    );
    let mut session = CatalogSession::new(conn);
    let mut runs = 0;

    let err = session
        .run_transaction(|conn| {
            runs += 1;
            Box::pin(async move {
                execute_no_result(conn, INSERT, &binds(&["1", "/tempZone"])).await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    assert_eq!(runs, 1);
    assert_eq!(err.code(), CatalogErrorCode::AlreadyHasItemByThatName);
    // the transaction is deliberately left open for the caller
    assert_eq!(session.transaction_state(), TransactionState::Active);

    let conn = session.into_backend();
    assert_eq!(conn.count(RELEASE), 0);
    assert_eq!(conn.count("commit"), 0);
    assert_eq!(conn.count("rollback"), 0);
}

#[tokio::test]
async fn non_retryable_release_failure_rolls_back() {
    let mut conn = FakeCatalog::new();
    conn.fail_next(RELEASE, "23503", "insert or update violates foreign key constraint");
    let mut session = CatalogSession::new(conn);

    let err = session
        .run_transaction(|_conn| Box::pin(async { Ok(()) }))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CatalogSqlError::TransactionControl { step: TxStep::ReleaseSavepoint, .. }
    ));
    assert_eq!(err.sqlstate(), Some("23503"));
    assert_eq!(session.transaction_state(), TransactionState::RolledBack);
    let conn = session.into_backend();
    assert_eq!(conn.count(ROLLBACK_TO), 0);
    assert_eq!(conn.count("rollback"), 1);
}

#[tokio::test]
async fn configured_ceiling_bounds_retries() {
    let policy = RetryPolicy::with_max_attempts(NonZeroU32::new(2).unwrap());
    let mut session = CatalogSession::with_retry_policy(conflicting(50), policy);
    let mut runs = 0;

    let err = session
        .run_transaction(|_conn| {
            runs += 1;
            Box::pin(async { Ok(()) })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogSqlError::RetryLimitExceeded { attempts: 2 }));
    assert_eq!(runs, 2);
    assert_eq!(session.transaction_state(), TransactionState::RolledBack);
    assert_eq!(session.into_backend().count("commit"), 0);
}

#[tokio::test]
async fn session_runs_statements_between_transactions() {
    let mut session = CatalogSession::new(FakeCatalog::new());
    assert_eq!(session.transaction_state(), TransactionState::NotStarted);

    session.run_transaction(|_conn| Box::pin(async { Ok(()) })).await.unwrap();
    let status = session
        .execute_no_result(
            "update r_coll_main set modify_ts = ?",
            binds(&["01700000000"]).as_slice(),
        )
        .await
        .unwrap();
    assert_eq!(status, StatementStatus::Success);
    session.run_transaction(|_conn| Box::pin(async { Ok(()) })).await.unwrap();

    assert_eq!(session.into_backend().count("commit"), 2);
}
