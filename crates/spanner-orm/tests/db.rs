mod common;

use common::{config, open, Album, Event, Singer, Track, Venue};
use spanner_orm::{Config, Model, OrmError, Q, Reflect};

#[tokio::test]
async fn test_transaction_commit() {
    let db = open(config());
    let tx = db.begin().await.unwrap();
    let mut hall = Venue {
        name: String::from("Hall"),
        ..Default::default()
    };
    Venue::objects().create(&tx, &mut hall).await.unwrap();
    tx.commit().await.unwrap();

    let events = db.client().events().await;
    assert_eq!(events.first(), Some(&Event::Begin));
    assert!(matches!(events[1], Event::Query(ref sql) if sql.starts_with("INSERT INTO `venues`")));
    assert_eq!(events.last(), Some(&Event::Commit));
}

#[tokio::test]
async fn test_nested_transaction_joins_outer() {
    let db = open(config());
    let tx = db.begin().await.unwrap();
    {
        let nested = tx.nested().unwrap();
        Venue::objects().unscoped().delete(&nested).await.unwrap();
        nested.rollback().await.unwrap();
    }
    tx.commit().await.unwrap();

    let events = db.client().events().await;
    assert_eq!(
        events,
        vec![
            Event::Begin,
            Event::Execute(String::from("DELETE FROM `venues` WHERE TRUE")),
            Event::Commit,
        ]
    );
}

#[tokio::test]
async fn test_rollback() {
    let db = open(config());
    let tx = db.begin().await.unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(db.client().events().await, vec![Event::Begin, Event::Rollback]);
}

#[tokio::test]
async fn test_prepared_statements_are_cached() {
    let db = open(config().prepare_stmt(true));
    let query = Singer::objects().filter(Q::eq("active", true));
    query.execute(&db).await.unwrap();
    query.execute(&db).await.unwrap();

    let prepares = db
        .client()
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e, Event::Prepare(_)))
        .count();
    assert_eq!(prepares, 1);
}

#[tokio::test]
async fn test_statements_are_not_prepared_by_default() {
    let db = open(config());
    Singer::objects().all().execute(&db).await.unwrap();
    assert!(!db
        .client()
        .events()
        .await
        .iter()
        .any(|e| matches!(e, Event::Prepare(_))));
}

#[tokio::test]
async fn test_locking_clause_is_dropped() {
    let db = open(config());
    Singer::objects()
        .filter(Q::eq("active", true))
        .for_update()
        .execute(&db)
        .await
        .unwrap();

    let sql = db.client().sql().await;
    assert!(!sql[0].contains("FOR UPDATE"));
}

#[tokio::test]
async fn test_locking_clause_rejected_when_enabled() {
    let db = open(Config {
        disable_locking_clause: false,
        ..config()
    });
    let err = Singer::objects()
        .all()
        .for_share()
        .execute(&db)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Unsupported(_)));
    assert!(db.client().sql().await.is_empty());
}

#[tokio::test]
async fn test_auto_migrate_orders_interleaved_tables() {
    let db = open(config());
    let models = vec![
        Track::schema().unwrap(),
        Album::schema().unwrap(),
        Singer::schema().unwrap(),
    ];
    db.auto_migrate(&models).await.unwrap();

    let ddl = db.client().ddl().await;
    let position = |prefix: &str| ddl.iter().position(|s| s.starts_with(prefix)).unwrap();
    assert!(position("CREATE TABLE `singers`") < position("CREATE TABLE `albums`"));
    assert!(position("CREATE TABLE `albums`") < position("CREATE TABLE `tracks`"));
    assert!(ddl
        .iter()
        .any(|s| s.ends_with("INTERLEAVE IN PARENT `albums` ON DELETE CASCADE")));
}

#[test]
fn test_open_rejects_bad_dsn() {
    let err = spanner_orm::SpannerDialector::new(Config::new("projects/p/instances/i")).unwrap_err();
    assert!(matches!(err, OrmError::Config(_)));
}
