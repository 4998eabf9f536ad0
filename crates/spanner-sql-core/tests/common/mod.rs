#![allow(dead_code)]

use chrono::{DateTime, Utc};
use spanner_sql_derive::Table;

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct StandardModel {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[column(index)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Singer {
    #[column(embed)]
    pub base: StandardModel,
    pub first_name: Option<String>,
    pub last_name: String,
    pub full_name: String,
    pub active: bool,
    #[column(skip)]
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Album {
    #[column(embed)]
    pub base: StandardModel,
    pub title: String,
    #[column(belongs_to = "Singer")]
    pub singer_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
#[table(interleave_in = "Album", on_delete = "cascade")]
pub struct Track {
    #[column(primary_key)]
    pub id: i64,
    #[column(primary_key, auto_increment = false)]
    pub track_number: i64,
    #[column(not_null, size = 200)]
    pub title: String,
    pub sample_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Venue {
    pub id: i64,
    #[column(not_null, unique, size = 100)]
    pub name: String,
    #[column(type = "JSON")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Concert {
    pub id: i64,
    #[column(belongs_to = "Venue", on_delete = "cascade", unique_index = "idx_concerts_venue_start")]
    pub venue_id: i64,
    #[column(belongs_to = "Singer")]
    pub singer_id: i64,
    #[column(index = "idx_concerts_venue_start")]
    pub start_time: DateTime<Utc>,
    #[column(default = "CURRENT_TIMESTAMP()", commit_timestamp)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
#[table(name = "singer_views")]
pub struct SingerWithFullName {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[column(
        type = "STRING(MAX) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED",
        read_only
    )]
    pub full_name: String,
    #[column(default = "true")]
    pub active: bool,
}
