//! Builders executed on a single data source.

mod common;

use common::{User, plain, written};
use oxide_shard_core::expr::{assign, col, count_all};
use oxide_shard_core::{Context, Error, Rows, SqlValue};
use oxide_shard_datasource::MockDataSource;
use oxide_shard_orm::{Exec, Fetch};

fn user_rows() -> Rows {
    Rows::new(
        vec![
            String::from("id"),
            String::from("first_name"),
            String::from("age"),
        ],
        vec![
            vec![
                SqlValue::Int(1),
                SqlValue::Text(String::from("Tom")),
                SqlValue::Int(18),
            ],
            vec![
                SqlValue::Int(2),
                SqlValue::Text(String::from("Jerry")),
                SqlValue::Int(20),
            ],
        ],
    )
}

#[tokio::test]
async fn test_get_adds_limit_and_scans_first_row() {
    let (db, source) = plain(MockDataSource::new("main").with_rows(user_rows()));
    let user = db
        .select::<User>()
        .where_([col("age").gt(10)])
        .get(&Context::new(), &db)
        .await
        .unwrap();
    assert_eq!(user.first_name, "Tom");
    assert_eq!(user.age, 18);

    let q = &source.queries()[0];
    assert_eq!(
        q.sql,
        "SELECT `id`,`first_name`,`age` FROM `user` WHERE `age`>? LIMIT ?;"
    );
    assert_eq!(q.args, vec![SqlValue::Int(10), SqlValue::Int(1)]);
}

#[tokio::test]
async fn test_get_on_empty_result_is_no_rows() {
    let (db, _source) = plain(MockDataSource::new("main"));
    let err = db
        .select::<User>()
        .get(&Context::new(), &db)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoRows));
}

#[tokio::test]
async fn test_get_multi_scans_every_row() {
    let (db, _source) = plain(MockDataSource::new("main").with_rows(user_rows()));
    let users = db
        .select::<User>()
        .get_multi(&Context::new(), &db)
        .await
        .unwrap();
    let names: Vec<&str> = users.iter().map(|u| u.first_name.as_str()).collect();
    assert_eq!(names, vec!["Tom", "Jerry"]);
}

#[tokio::test]
async fn test_count_into_scalar() {
    let rows = Rows::new(vec![String::from("COUNT(*)")], vec![vec![SqlValue::Int(42)]]);
    let (db, source) = plain(MockDataSource::new("main").with_rows(rows));
    let n = db
        .select::<i64>()
        .from_entity::<User>()
        .select(count_all())
        .get(&Context::new(), &db)
        .await
        .unwrap();
    assert_eq!(n, 42);
    assert_eq!(
        source.queries()[0].sql,
        "SELECT COUNT(*) FROM `user` LIMIT ?;"
    );
}

#[tokio::test]
async fn test_writes_return_driver_result() {
    let (db, source) =
        plain(MockDataSource::new("main").with_exec_result(written(1, Some(3))));
    let ctx = Context::new();
    let tom = User {
        id: 0,
        first_name: String::from("Tom"),
        age: 18,
    };

    let res = db
        .insert::<User>()
        .values(std::slice::from_ref(&tom))
        .ignore_pk()
        .exec(&ctx, &db)
        .await
        .unwrap();
    assert_eq!(res.last_insert_id, Some(3));

    db.update::<User>()
        .set(assign("age", col("age").add(1)))
        .where_([col("id").eq(3)])
        .exec(&ctx, &db)
        .await
        .unwrap();

    let sql: Vec<String> = source.queries().into_iter().map(|q| q.sql).collect();
    assert_eq!(
        sql,
        vec![
            "INSERT INTO `user`(`first_name`,`age`) VALUES(?,?);",
            "UPDATE `user` SET `age`=(`age`+?) WHERE `id`=?;",
        ]
    );
}

#[tokio::test]
async fn test_build_error_runs_nothing() {
    let (db, source) = plain(MockDataSource::new("main"));
    let err = db
        .insert::<User>()
        .exec(&Context::new(), &db)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsertZeroRows));
    assert!(source.queries().is_empty());
}

#[tokio::test]
async fn test_exec_sharding_on_plain_entity() {
    let (db, _source) = plain(MockDataSource::new("main"));
    let err = db
        .delete::<User>()
        .exec_sharding(&Context::new(), &db)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoShardingAlgorithm(name) if name == "User"));
}

#[tokio::test]
async fn test_driver_error_surfaces() {
    let (db, _source) = plain(MockDataSource::new("main").failing("gone away"));
    let err = db
        .delete::<User>()
        .exec(&Context::new(), &db)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "database error: main: gone away");
}
