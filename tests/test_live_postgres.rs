#![cfg(feature = "test-utils")]

use std::num::NonZeroUsize;

use catalog_sql::prelude::*;
use catalog_sql::test_utils::setup_catalog_db;

fn binds(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[tokio::test]
async fn catalog_round_trip_against_embedded_postgres() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_catalog_db("catalog_live").await?;
    let mut session = CatalogSession::new(db.connect().await?);

    session
        .execute_no_result(
            "create table r_coll_main \
             (coll_id bigint primary key, coll_name varchar(2700) unique not null)",
            &[],
        )
        .await?;

    for i in 0..25 {
        let id = (10000 + i).to_string();
        let name = format!("/tempZone/home/rods/c{i:02}");
        let status = session
            .execute_no_result(
                "insert into r_coll_main (coll_id, coll_name) values (?, ?)",
                &[id, name],
            )
            .await?;
        assert_eq!(status, StatementStatus::Success);
    }

    // unique violation on the name column
    let outcome = session
        .execute(
            "insert into r_coll_main (coll_id, coll_name) values (?, ?)",
            &binds(&["99999", "/tempZone/home/rods/c00"]),
        )
        .await;
    assert_eq!(outcome.code(), Some(CatalogErrorCode::AlreadyHasItemByThatName));

    let status = session
        .execute_no_result(
            "update r_coll_main set coll_name = ? where coll_id = ?",
            &binds(&["/tempZone/trash", "1"]),
        )
        .await?;
    assert_eq!(status, StatementStatus::NoRows);

    // LIKE is rewritten to SIMILAR TO, which shares the % wildcard
    let (handle, mut step) = session
        .open_query(
            "select coll_name from r_coll_main where coll_name like ? order by coll_name",
            binds(&["%/c1%"]),
        )
        .await?;
    let mut matched = Vec::new();
    while step == CursorStep::HasRow {
        matched.extend(session.cursor(handle)?.value(0));
        step = session.advance(handle).await?;
    }
    session.free_cursor(handle)?;
    assert_eq!(matched.len(), 10);
    assert_eq!(matched[0], "/tempZone/home/rods/c10");

    let page = NonZeroUsize::new(10).ok_or("zero page")?;
    let (handle, mut step) = session
        .open_paged_query(
            "select coll_id, coll_name from r_coll_main order by coll_id",
            Vec::new(),
            0,
            page,
        )
        .await?;
    assert_eq!(session.cursor(handle)?.column_name(1), Some("coll_name"));
    let mut ids = Vec::new();
    while step == CursorStep::HasRow {
        ids.extend(session.cursor(handle)?.value(0));
        step = session.advance(handle).await?;
    }
    session.free_cursor(handle)?;
    assert_eq!(ids.len(), 25);
    assert_eq!(ids.first().map(String::as_str), Some("10000"));
    assert_eq!(ids.last().map(String::as_str), Some("10024"));

    let moved = session
        .run_transaction(|conn| {
            Box::pin(async move {
                execute_no_result(
                    conn,
                    "update r_coll_main set coll_name = ? where coll_id = ?",
                    &binds(&["/tempZone/home/rods/renamed", "10003"]),
                )
                .await?;
                Ok(1)
            })
        })
        .await?;
    assert_eq!(moved, 1);
    assert_eq!(session.transaction_state(), TransactionState::Committed);

    let outcome = session
        .execute(
            "select coll_name from r_coll_main where coll_id = ?",
            &binds(&["10003"]),
        )
        .await;
    let StatementOutcome::Success(rs) = outcome else {
        panic!("expected a row, got {outcome:?}");
    };
    assert_eq!(rs.results[0].get_text(0).as_deref(), Some("/tempZone/home/rods/renamed"));

    session.into_backend().disconnect().await?;
    db.stop().await;
    Ok(())
}
