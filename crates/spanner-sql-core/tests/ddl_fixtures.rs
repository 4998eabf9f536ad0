//! DDL generated from derived models.
//!
//! Each model's statements must list columns in field order with the
//! expected Spanner types and constraints.

mod common;

use common::{Album, Concert, Singer, SingerWithFullName, Track, Venue};
use spanner_sql_core::migrations::{ddl_for_model, ddl_for_model_with, DdlOptions};
use spanner_sql_core::schema::Reflect;

#[test]
fn test_singers_and_albums() {
    let mut ddl = ddl_for_model(&Singer::schema().unwrap()).unwrap();
    ddl.extend(ddl_for_model(&Album::schema().unwrap()).unwrap());
    assert_eq!(
        ddl,
        vec![
            "CREATE TABLE `singers` (`id` INT64,`created_at` TIMESTAMP,`updated_at` TIMESTAMP,`deleted_at` TIMESTAMP,`first_name` STRING(MAX),`last_name` STRING(MAX),`full_name` STRING(MAX),`active` BOOL) PRIMARY KEY (`id`)",
            "CREATE INDEX `idx_singers_deleted_at` ON `singers`(`deleted_at`)",
            "CREATE TABLE `albums` (`id` INT64,`created_at` TIMESTAMP,`updated_at` TIMESTAMP,`deleted_at` TIMESTAMP,`title` STRING(MAX),`singer_id` INT64,CONSTRAINT `fk_albums_singer` FOREIGN KEY (`singer_id`) REFERENCES `singers`(`id`)) PRIMARY KEY (`id`)",
            "CREATE INDEX `idx_albums_deleted_at` ON `albums`(`deleted_at`)",
        ]
    );
}

#[test]
fn test_interleaved_table() {
    assert_eq!(
        ddl_for_model(&Track::schema().unwrap()).unwrap(),
        vec![
            "CREATE TABLE `tracks` (`id` INT64,`track_number` INT64,`title` STRING(200) NOT NULL,`sample_rate` FLOAT64) PRIMARY KEY (`id`,`track_number`), INTERLEAVE IN PARENT `albums` ON DELETE CASCADE"
        ]
    );
}

#[test]
fn test_unique_column_and_type_override() {
    assert_eq!(
        ddl_for_model(&Venue::schema().unwrap()).unwrap(),
        vec![
            "CREATE TABLE `venues` (`id` INT64,`name` STRING(100) NOT NULL,`description` JSON) PRIMARY KEY (`id`)",
            "CREATE UNIQUE INDEX `idx_venues_name` ON `venues`(`name`)",
        ]
    );
}

#[test]
fn test_composite_index_foreign_keys_and_commit_timestamp() {
    assert_eq!(
        ddl_for_model(&Concert::schema().unwrap()).unwrap(),
        vec![
            "CREATE TABLE `concerts` (`id` INT64,`venue_id` INT64,`singer_id` INT64,`start_time` TIMESTAMP,`updated_at` TIMESTAMP DEFAULT (CURRENT_TIMESTAMP()) OPTIONS (allow_commit_timestamp=true),CONSTRAINT `fk_concerts_venue` FOREIGN KEY (`venue_id`) REFERENCES `venues`(`id`) ON DELETE CASCADE,CONSTRAINT `fk_concerts_singer` FOREIGN KEY (`singer_id`) REFERENCES `singers`(`id`)) PRIMARY KEY (`id`)",
            "CREATE UNIQUE INDEX `idx_concerts_venue_start` ON `concerts`(`venue_id`,`start_time`)",
        ]
    );
}

#[test]
fn test_generated_column() {
    assert_eq!(
        ddl_for_model(&SingerWithFullName::schema().unwrap()).unwrap(),
        vec![
            "CREATE TABLE `singer_views` (`id` INT64,`first_name` STRING(MAX),`last_name` STRING(MAX),`full_name` STRING(MAX) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED,`active` BOOL DEFAULT (TRUE)) PRIMARY KEY (`id`)"
        ]
    );
}

#[test]
fn test_sequence_backed_keys() {
    let options = DdlOptions {
        sequence_backed_keys: true,
    };
    let ddl = ddl_for_model_with(&Venue::schema().unwrap(), &options).unwrap();
    assert_eq!(
        ddl,
        vec![
            "CREATE SEQUENCE `seq_venues` OPTIONS (sequence_kind = \"bit_reversed_positive\")",
            "CREATE TABLE `venues` (`id` INT64 DEFAULT (GET_NEXT_SEQUENCE_VALUE(SEQUENCE `seq_venues`)),`name` STRING(100) NOT NULL,`description` JSON) PRIMARY KEY (`id`)",
            "CREATE UNIQUE INDEX `idx_venues_name` ON `venues`(`name`)",
        ]
    );

    // Application-assigned composite keys need no sequence.
    let ddl = ddl_for_model_with(&Track::schema().unwrap(), &options).unwrap();
    assert_eq!(ddl.len(), 1);
}
