mod common;

use common::{config, open, row, Album, Event, Singer, Track, Venue};
use spanner_orm::{ClientError, ErrorCode, Model, OrmError, SqlValue, StandardModel, Q};
use spanner_sql_core::DialectError;

fn venue(name: &str) -> Venue {
    Venue {
        name: String::from(name),
        description: String::from("Small stage"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_reads_back_generated_columns() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![
            ("id", SqlValue::Int64(1)),
            ("full_name", SqlValue::String(String::from("Alice Trentor"))),
        ])])
        .await;

    let mut singer = Singer {
        first_name: Some(String::from("Alice")),
        last_name: String::from("Trentor"),
        active: true,
        ..Default::default()
    };
    Singer::objects().create(&db, &mut singer).await.unwrap();

    assert_eq!(singer.base.id, 1);
    assert_eq!(singer.full_name, "Alice Trentor");
    assert!(singer.base.created_at.timestamp() > 0);
    assert_eq!(singer.base.created_at, singer.base.updated_at);

    let statements = db.client().statements().await;
    assert_eq!(
        statements[0].sql,
        "INSERT INTO `singers` (`created_at`,`updated_at`,`deleted_at`,`first_name`,`last_name`,`active`) \
         VALUES (@p1,@p2,@p3,@p4,@p5,@p6) THEN RETURN `id`,`full_name`"
    );
    assert_eq!(statements[0].params[2], SqlValue::Null);
    assert_eq!(statements[0].params[3], SqlValue::String(String::from("Alice")));
}

#[tokio::test]
async fn test_create_keeps_explicit_key() {
    let db = open(config());
    let mut track = Track {
        id: 3,
        track_number: 1,
        title: String::from("Overture"),
    };
    Track::objects().create(&db, &mut track).await.unwrap();

    assert_eq!(
        db.client().events().await,
        vec![Event::Execute(String::from(
            "INSERT INTO `tracks` (`id`,`track_number`,`title`) VALUES (@p1,@p2,@p3)"
        ))]
    );
}

#[tokio::test]
async fn test_create_passes_client_errors_through() {
    let db = open(config());
    db.client()
        .fail_next(ClientError::new(ErrorCode::AlreadyExists, "row exists"))
        .await;

    let mut track = Track {
        id: 3,
        track_number: 1,
        title: String::from("Overture"),
    };
    let err = Track::objects().create(&db, &mut track).await.unwrap_err();
    assert!(matches!(err, OrmError::Client(e) if e.code == ErrorCode::AlreadyExists));
}

#[tokio::test]
async fn test_create_in_batches() {
    let db = open(config());
    db.client()
        .push_rows(vec![
            row(vec![("id", SqlValue::Int64(10))]),
            row(vec![("id", SqlValue::Int64(11))]),
        ])
        .await;
    db.client()
        .push_rows(vec![row(vec![("id", SqlValue::Int64(12))])])
        .await;

    let mut venues = vec![venue("Hall"), venue("Club"), venue("Arena")];
    let inserted = Venue::objects()
        .create_in_batches(&db, &mut venues, 2)
        .await
        .unwrap();

    assert_eq!(inserted, 3);
    let ids: Vec<i64> = venues.iter().map(|v| v.base.id).collect();
    assert_eq!(ids, vec![10, 11, 12]);

    assert!(venues
        .iter()
        .all(|v| v.base.created_at == v.base.updated_at && v.base.created_at.timestamp() > 0));
    assert_eq!(venues[0].base.created_at, venues[1].base.created_at);

    let sql = db.client().sql().await;
    assert_eq!(sql.len(), 2);
    assert!(sql[0].contains("VALUES (@p1,@p2,@p3,@p4,@p5),(@p6,@p7,@p8,@p9,@p10) THEN RETURN `id`"));
    assert!(sql[1].contains("VALUES (@p1,@p2,@p3,@p4,@p5) THEN RETURN `id`"));
}

#[tokio::test]
async fn test_create_in_batches_splits_rows_with_different_columns() {
    let db = open(config());
    let mut venues = vec![venue("Hall"), venue("Club")];
    venues[1].base.id = 7;

    Venue::objects()
        .create_in_batches(&db, &mut venues, 10)
        .await
        .unwrap();

    let sql = db.client().sql().await;
    assert_eq!(sql.len(), 2);
    assert!(sql[0].ends_with("THEN RETURN `id`"));
    assert!(sql[1].starts_with("INSERT INTO `venues` (`id`,"));
}

#[tokio::test]
async fn test_save_updates_by_composite_key() {
    let db = open(config());
    let mut track = Track {
        id: 3,
        track_number: 2,
        title: String::from("Reprise"),
    };
    let updated = Track::objects().save(&db, &mut track).await.unwrap();

    assert_eq!(updated, 1);
    let statements = db.client().statements().await;
    assert_eq!(
        statements[0].sql,
        "UPDATE `tracks` SET `title`=@p1 WHERE `id` = @p2 AND `track_number` = @p3"
    );
    assert_eq!(
        statements[0].params,
        vec![
            SqlValue::String(String::from("Reprise")),
            SqlValue::Int64(3),
            SqlValue::Int64(2),
        ]
    );
}

#[tokio::test]
async fn test_save_refreshes_generated_columns() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![(
            "full_name",
            SqlValue::String(String::from("Bruce Allison")),
        )])])
        .await;

    let mut singer = Singer {
        base: StandardModel {
            id: 5,
            ..Default::default()
        },
        first_name: Some(String::from("Bruce")),
        last_name: String::from("Allison"),
        ..Default::default()
    };
    Singer::objects().save(&db, &mut singer).await.unwrap();

    assert_eq!(singer.full_name, "Bruce Allison");
    assert!(singer.base.updated_at.timestamp() > 0);
    assert_eq!(
        db.client().sql().await,
        vec![
            "UPDATE `singers` SET `created_at`=@p1,`updated_at`=@p2,`deleted_at`=@p3,`first_name`=@p4,\
             `last_name`=@p5,`active`=@p6 WHERE `id` = @p7 THEN RETURN `full_name`"
        ]
    );
}

#[tokio::test]
async fn test_save_inserts_unsaved_model() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![("id", SqlValue::Int64(4))])])
        .await;

    let mut hall = venue("Hall");
    Venue::objects().save(&db, &mut hall).await.unwrap();

    assert_eq!(hall.base.id, 4);
    assert!(db.client().sql().await[0].starts_with("INSERT INTO `venues`"));
}

#[tokio::test]
async fn test_update_column() {
    let db = open(config());
    let mut hall = venue("Hall");
    hall.base.id = 9;

    Venue::objects()
        .update_column(&db, &mut hall, "name", "Grand Hall")
        .await
        .unwrap();

    assert_eq!(hall.name, "Grand Hall");
    assert!(hall.base.updated_at.timestamp() > 0);
    assert_eq!(
        db.client().sql().await,
        vec!["UPDATE `venues` SET `name`=@p1,`updated_at`=@p2 WHERE `id` = @p3"]
    );
}

#[tokio::test]
async fn test_update_column_rejects_generated_columns() {
    let db = open(config());
    let mut singer = Singer::default();
    singer.base.id = 1;

    let err = Singer::objects()
        .update_column(&db, &mut singer, "full_name", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidField(ref c) if c == "full_name"));

    let err = Singer::objects()
        .update_column(&db, &mut singer, "nickname", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidField(_)));
    assert!(db.client().sql().await.is_empty());
}

#[tokio::test]
async fn test_delete_by_key() {
    let db = open(config());
    let track = Track {
        id: 3,
        track_number: 2,
        title: String::new(),
    };
    let deleted = Track::objects().delete(&db, &track).await.unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(
        db.client().sql().await,
        vec!["DELETE FROM `tracks` WHERE `id` = @p1 AND `track_number` = @p2"]
    );
}

#[tokio::test]
async fn test_delete_marks_soft_deleted_row() {
    let db = open(config());
    let mut hall = venue("Hall");
    hall.base.id = 4;

    Venue::objects().delete(&db, &hall).await.unwrap();
    Venue::objects().all().execute(&db).await.unwrap();

    let statements = db.client().statements().await;
    assert_eq!(
        statements[0].sql,
        "UPDATE `venues` SET `deleted_at`=@p1 WHERE `id` = @p2 AND `deleted_at` IS NULL"
    );
    assert!(matches!(statements[0].params[0], SqlValue::Timestamp(_)));
    assert_eq!(statements[0].params[1], SqlValue::Int64(4));
    assert_eq!(
        statements[1].sql,
        "SELECT `id`,`created_at`,`updated_at`,`deleted_at`,`name`,`description` FROM `venues` \
         WHERE `deleted_at` IS NULL"
    );
}

#[tokio::test]
async fn test_hard_delete_and_unscoped_queries() {
    let db = open(config());
    let mut hall = venue("Hall");
    hall.base.id = 4;

    Venue::objects().hard_delete(&db, &hall).await.unwrap();
    Venue::objects()
        .unscoped()
        .filter(Q::eq("name", "Hall"))
        .execute(&db)
        .await
        .unwrap();

    assert_eq!(
        db.client().sql().await,
        vec![
            "DELETE FROM `venues` WHERE `id` = @p1",
            "SELECT `id`,`created_at`,`updated_at`,`deleted_at`,`name`,`description` FROM `venues` \
             WHERE `name` = @p1",
        ]
    );
}

#[tokio::test]
async fn test_find_in_batches_continues_after_last_key() {
    let db = open(config());
    let track = |n: i64| {
        row(vec![
            ("id", SqlValue::Int64(1)),
            ("track_number", SqlValue::Int64(n)),
            ("title", SqlValue::String(format!("Track {n}"))),
        ])
    };
    db.client().push_rows(vec![track(1), track(2)]).await;
    db.client().push_rows(vec![track(3)]).await;

    let mut seen = Vec::new();
    let read = Track::objects()
        .filter(Q::gt("id", 0))
        .order_by("-title")
        .find_in_batches(&db, 2, |batch, number| {
            seen.push((number, batch.iter().map(|t| t.track_number).collect::<Vec<_>>()));
            async { Ok::<(), OrmError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(read, 3);
    assert_eq!(seen, vec![(1, vec![1, 2]), (2, vec![3])]);
    let statements = db.client().statements().await;
    assert_eq!(
        statements[0].sql,
        "SELECT `id`,`track_number`,`title` FROM `tracks` WHERE `id` > @p1 \
         ORDER BY `id`,`track_number` LIMIT 2"
    );
    assert_eq!(
        statements[1].sql,
        "SELECT `id`,`track_number`,`title` FROM `tracks` \
         WHERE `id` > @p1 AND ((`id` > @p2) OR ((`id` = @p3) AND (`track_number` > @p4))) \
         ORDER BY `id`,`track_number` LIMIT 2"
    );
    assert_eq!(
        statements[1].params,
        vec![
            SqlValue::Int64(0),
            SqlValue::Int64(1),
            SqlValue::Int64(1),
            SqlValue::Int64(2),
        ]
    );
}

#[tokio::test]
async fn test_find_in_batches_stops_on_callback_error() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![("id", SqlValue::Int64(1))])])
        .await;

    let err = Venue::objects()
        .all()
        .find_in_batches(&db, 1, |_, _| async { Err::<(), _>(OrmError::NotFound) })
        .await
        .unwrap_err();

    assert!(matches!(err, OrmError::NotFound));
    assert_eq!(db.client().sql().await.len(), 1);
}

#[tokio::test]
async fn test_filter_with_named_arguments() {
    let db = open(config());
    let title = Q::raw_named("title LIKE @title", &[("title", SqlValue::String(String::from("e%")))])
        .unwrap();
    Album::objects()
        .filter(title)
        .order_by("title")
        .execute(&db)
        .await
        .unwrap();

    let statements = db.client().statements().await;
    assert_eq!(
        statements[0].sql,
        "SELECT `id`,`created_at`,`updated_at`,`deleted_at`,`title`,`singer_id` FROM `albums` \
         WHERE (title LIKE @p1) AND `deleted_at` IS NULL ORDER BY `title`"
    );
    assert_eq!(statements[0].params, vec![SqlValue::String(String::from("e%"))]);
}

#[tokio::test]
async fn test_get_by_key() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![
            ("id", SqlValue::Int64(2)),
            ("title", SqlValue::String(String::from("Blue"))),
            ("singer_id", SqlValue::Int64(1)),
        ])])
        .await;

    let album = Album::objects().get(&db, 2_i64).await.unwrap();
    assert_eq!(album.title, "Blue");
    assert_eq!(album.singer_id, 1);
    assert_eq!(
        db.client().sql().await,
        vec![
            "SELECT `id`,`created_at`,`updated_at`,`deleted_at`,`title`,`singer_id` FROM `albums` \
             WHERE `id` = @p1 AND `deleted_at` IS NULL ORDER BY `id` LIMIT 1"
        ]
    );

    let missing = Album::objects().get(&db, 3_i64).await.unwrap_err();
    assert!(matches!(missing, OrmError::NotFound));
}

#[tokio::test]
async fn test_get_requires_single_column_key() {
    let db = open(config());
    let err = Track::objects().get(&db, 1_i64).await.unwrap_err();
    assert!(matches!(err, OrmError::InvalidField(_)));
}

#[tokio::test]
async fn test_last_orders_by_key_descending() {
    let db = open(config());
    assert!(Track::objects().last(&db).await.unwrap().is_none());
    assert_eq!(
        db.client().sql().await,
        vec![
            "SELECT `id`,`track_number`,`title` FROM `tracks` \
             ORDER BY `id` DESC,`track_number` DESC LIMIT 1"
        ]
    );
}

#[tokio::test]
async fn test_first_or_init_applies_equalities() {
    let db = open(config());
    let found = Venue::objects()
        .first_or_init(&db, Q::eq("name", "Hall"), venue("ignored"))
        .await
        .unwrap();

    assert_eq!(found.name, "Hall");
    assert_eq!(found.description, "Small stage");
    assert_eq!(found.base.id, 0);
    assert_eq!(db.client().sql().await.len(), 1);
}

#[tokio::test]
async fn test_first_or_create_inserts_when_missing() {
    let db = open(config());
    db.client().push_rows(vec![]).await;
    db.client()
        .push_rows(vec![row(vec![("id", SqlValue::Int64(8))])])
        .await;

    let created = Venue::objects()
        .first_or_create(&db, Q::eq("name", "Club"), Venue::default())
        .await
        .unwrap();

    assert_eq!(created.base.id, 8);
    assert_eq!(created.name, "Club");
    let sql = db.client().sql().await;
    assert_eq!(sql.len(), 2);
    assert!(sql[0].starts_with("SELECT"));
    assert!(sql[1].starts_with("INSERT INTO `venues`"));
}

#[tokio::test]
async fn test_first_or_create_returns_existing_row() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![
            ("id", SqlValue::Int64(2)),
            ("name", SqlValue::String(String::from("Club"))),
        ])])
        .await;

    let existing = Venue::objects()
        .first_or_create(&db, Q::eq("name", "Club"), Venue::default())
        .await
        .unwrap();

    assert_eq!(existing.base.id, 2);
    assert_eq!(db.client().sql().await.len(), 1);
}

#[tokio::test]
async fn test_upsert_is_unsupported() {
    let db = open(config());
    let err = Venue::objects().upsert(&db, &venue("Hall")).unwrap_err();
    assert!(matches!(
        err,
        OrmError::Dialect(DialectError::Unsupported("ON CONFLICT"))
    ));
    assert!(db.client().events().await.is_empty());
}

#[tokio::test]
async fn test_queryset_update_and_delete() {
    let db = open(config());
    db.client().push_affected(4).await;

    let updated = Singer::objects()
        .filter(Q::eq("active", false))
        .update(&db, "last_name", "Unknown")
        .await
        .unwrap();
    let deleted = Singer::objects().all().delete(&db).await.unwrap();
    Singer::objects().unscoped().delete(&db).await.unwrap();

    assert_eq!(updated, 4);
    assert_eq!(deleted, 1);
    assert_eq!(
        db.client().sql().await,
        vec![
            "UPDATE `singers` SET `last_name`=@p1 WHERE `active` = @p2 AND `deleted_at` IS NULL",
            "UPDATE `singers` SET `deleted_at`=@p1 WHERE `deleted_at` IS NULL",
            "DELETE FROM `singers` WHERE TRUE",
        ]
    );
}

#[tokio::test]
async fn test_count() {
    let db = open(config());
    db.client()
        .push_rows(vec![row(vec![("", SqlValue::Int64(3))])])
        .await;

    assert_eq!(Singer::objects().count(&db).await.unwrap(), 3);
    assert!(!Singer::objects().exists(&db).await.unwrap());
    assert_eq!(
        db.client().sql().await[0],
        "SELECT COUNT(*) FROM `singers` WHERE `deleted_at` IS NULL"
    );
}
