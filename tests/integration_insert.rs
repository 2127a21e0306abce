//! Insert round-trip integration tests against a live ClickHouse server.
//! Ignored by default; set CLICKHOUSE_HOST/CLICKHOUSE_PORT to point at a
//! server and run with `--ignored`.

mod common;

use clickhouse_conn::{Column, Error};
use common::{cleanup_test_database, create_isolated_test_client};

#[tokio::test]
#[ignore]
async fn test_fixed_string_truncation_roundtrip() {
    let (client, db_name) = create_isolated_test_client("fixed_string")
        .await
        .expect("create client");

    client
        .command("CREATE TABLE t (id String, s FixedString(7)) ENGINE = Memory")
        .await
        .expect("create table");

    client
        .insert(
            "t",
            vec![
                Column::new("id", vec!["1", "🎅☃🧪", "234"]),
                Column::new("s", vec!["🎅☃🧪", "a", "awfawfawf"]),
            ],
        )
        .await
        .expect("insert");

    let result = client
        .query("SELECT * FROM t ORDER BY id")
        .await
        .expect("select");
    assert_eq!(result.row_count(), 3);

    // The 7-byte UTF-8 prefix of "🎅☃🧪" is exactly "🎅☃"; "awfawfawf"
    // loses its last two bytes; "a" comes back NUL-stripped.
    let ids = result.column("id").unwrap().data().as_strings().unwrap();
    assert_eq!(ids, ["1", "234", "🎅☃🧪"]);

    let fixed = result.column("s").unwrap().data().as_strings().unwrap();
    assert_eq!(fixed, ["🎅☃", "awfawfa", "a"]);

    client.close().await;
    cleanup_test_database(&db_name).await;
}

#[tokio::test]
#[ignore]
async fn test_nullable_roundtrip() {
    let (client, db_name) = create_isolated_test_client("nullable")
        .await
        .expect("create client");

    client
        .command(
            "CREATE TABLE t (nullable Nullable(UInt32), str Nullable(String)) ENGINE = Memory",
        )
        .await
        .expect("create table");

    let nullable: Vec<Option<u32>> =
        vec![None, None, Some(1), Some(3), Some(4), Some(5), Some(6), Some(7), Some(8), Some(8)];
    let str_values: Vec<Option<&str>> = vec![
        None,
        None,
        Some("1"),
        Some("3"),
        Some("4"),
        Some("5"),
        Some("6"),
        Some("7"),
        Some("8"),
        Some("8"),
    ];

    client
        .insert(
            "t",
            vec![
                Column::new("nullable", nullable.clone()),
                Column::new("str", str_values.clone()),
            ],
        )
        .await
        .expect("insert");

    let result = client
        .query("SELECT nullable.null FROM t")
        .await
        .expect("select null subcolumn");
    let flags = result.columns()[0].data().as_u8s().unwrap();
    assert_eq!(flags, [1, 1, 0, 0, 0, 0, 0, 0, 0, 0]);

    let result = client
        .query("SELECT nullable, str FROM t")
        .await
        .expect("select values");
    assert_eq!(
        result.column("nullable").unwrap().data().as_opt_u32s().unwrap(),
        nullable
    );
    let expected: Vec<Option<String>> = str_values
        .into_iter()
        .map(|s| s.map(str::to_string))
        .collect();
    assert_eq!(
        result.column("str").unwrap().data().as_opt_strings().unwrap(),
        expected
    );

    client.close().await;
    cleanup_test_database(&db_name).await;
}

#[tokio::test]
#[ignore]
async fn test_array_roundtrip_with_offsets() {
    let (client, db_name) = create_isolated_test_client("array")
        .await
        .expect("create client");

    client
        .command("CREATE TABLE t (arr Array(Int32)) ENGINE = Memory")
        .await
        .expect("create table");

    let rows: Vec<Vec<i32>> = vec![vec![1], vec![43, 65], vec![], vec![1234, -345, 1]];
    client
        .insert("t", vec![Column::new("arr", rows)])
        .await
        .expect("insert");

    let result = client.query("SELECT arr FROM t").await.expect("select");
    assert_eq!(result.row_count(), 4);

    let data = result.column("arr").unwrap().data();
    assert_eq!(data.offsets().unwrap(), [1, 3, 3, 6]);
    assert_eq!(
        data.nested().unwrap().as_i32s().unwrap(),
        [1, 43, 65, 1234, -345, 1]
    );

    client.close().await;
    cleanup_test_database(&db_name).await;
}

#[tokio::test]
#[ignore]
async fn test_insert_rejects_wrong_column_name() {
    let (client, db_name) = create_isolated_test_client("wrong_name")
        .await
        .expect("create client");

    client
        .command("CREATE TABLE t (id UInt64) ENGINE = Memory")
        .await
        .expect("create table");

    let err = client
        .insert("t", vec![Column::new("not_id", vec![1u64])])
        .await
        .expect_err("name mismatch");
    assert!(matches!(err, Error::Validation(_) | Error::Server(_)));

    // The connection stays usable after the rejected insert.
    client.ping().await.expect("ping after rejection");

    client.close().await;
    cleanup_test_database(&db_name).await;
}

#[tokio::test]
#[ignore]
async fn test_numeric_roundtrip_via_insert() {
    let (client, db_name) = create_isolated_test_client("numeric")
        .await
        .expect("create client");

    client
        .command("CREATE TABLE t (a Int64, b Float64) ENGINE = Memory")
        .await
        .expect("create table");

    client
        .insert(
            "t",
            vec![
                Column::new("a", vec![i64::MIN, 0, i64::MAX]),
                Column::new("b", vec![-1.5f64, 0.0, 12345.75]),
            ],
        )
        .await
        .expect("insert");

    let result = client.query("SELECT a, b FROM t").await.expect("select");
    assert_eq!(
        result.column("a").unwrap().data().as_i64s().unwrap(),
        [i64::MIN, 0, i64::MAX]
    );
    assert_eq!(
        result.column("b").unwrap().data().as_f64s().unwrap(),
        [-1.5, 0.0, 12345.75]
    );

    client.close().await;
    cleanup_test_database(&db_name).await;
}
