//! Example: Singers, Albums and interleaved Tracks
//!
//! Creates the data model of a music catalog, with `Track` interleaved in
//! `Album`, then writes and reads rows through the ORM. The client records
//! statements instead of sending them, so the example runs without a
//! database; the statements show up in the debug log.
//!
//! Run with: cargo run --example interleave -p spanner-orm

use chrono::{DateTime, Duration, NaiveDate, Utc};
use spanner_migrate::recording::RecordingClient;
use spanner_orm::{
    Config, Db, Model, OrmError, Reflect, SpannerDialector, SqlValue, StandardModel, Table, Q,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// =============================================================================
// Models
// =============================================================================

#[derive(Debug, Clone, Default, Table)]
pub struct Singer {
    #[column(embed)]
    pub base: StandardModel,
    pub first_name: Option<String>,
    pub last_name: String,
    /// Generated by the database and read back after every write.
    #[column(type = "STRING(MAX) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED")]
    pub full_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Table)]
pub struct Album {
    #[column(embed)]
    pub base: StandardModel,
    pub title: String,
    pub marketing_budget: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub cover_picture: Vec<u8>,
    #[column(belongs_to = "Singer")]
    pub singer_id: i64,
}

/// `id` is both the first part of the key and the id of the owning album.
#[derive(Debug, Clone, Default, Table)]
#[table(interleave_in = "Album", on_delete = "cascade")]
pub struct Track {
    #[column(primary_key)]
    pub id: i64,
    #[column(primary_key, auto_increment = false)]
    pub track_number: i64,
    pub title: String,
    pub sample_rate: f64,
}

#[derive(Debug, Clone, Default, Table)]
pub struct Venue {
    #[column(embed)]
    pub base: StandardModel,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Table)]
pub struct Concert {
    #[column(embed)]
    pub base: StandardModel,
    pub name: String,
    #[column(belongs_to = "Venue")]
    pub venue_id: i64,
    #[column(belongs_to = "Singer")]
    pub singer_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

// =============================================================================
// Sample
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dsn = std::env::var("SPANNER_DSN").unwrap_or_else(|_| {
        String::from("projects/my-project/instances/my-instance/databases/my-database")
    });
    let dialector = SpannerDialector::new(Config::new(dsn).prepare_stmt(true))?;
    let db = Db::open(dialector, RecordingClient::new());

    let ddl = db
        .auto_migrate(&[
            Singer::schema()?,
            Album::schema()?,
            Track::schema()?,
            Venue::schema()?,
            Concert::schema()?,
        ])
        .await?;
    println!("Data model:");
    for statement in &ddl {
        println!("  {statement};");
    }

    // Purge existing data, soft-deleted rows included; deleting albums
    // cascades to their tracks.
    Concert::objects().unscoped().delete(&db).await?;
    Album::objects().unscoped().delete(&db).await?;
    Singer::objects().unscoped().delete(&db).await?;

    // A singer, an album and its tracks in one transaction.
    let tx = db.begin().await?;
    let mut singer = Singer {
        first_name: Some(String::from("Alice")),
        last_name: String::from("Trentor"),
        active: true,
        ..Default::default()
    };
    Singer::objects().create(&tx, &mut singer).await?;

    let mut album = Album {
        title: String::from("Echoes"),
        release_date: NaiveDate::from_ymd_opt(2021, 6, 1),
        singer_id: singer.base.id,
        ..Default::default()
    };
    Album::objects().create(&tx, &mut album).await?;

    let mut tracks: Vec<Track> = (1..=12)
        .map(|n| Track {
            id: album.base.id,
            track_number: n,
            title: format!("Track {n}"),
            sample_rate: 44.1,
        })
        .collect();
    let inserted = Track::objects()
        .create_in_batches(&tx, &mut tracks, 5)
        .await?;
    tx.commit().await?;
    println!("Inserted {inserted} tracks");

    // Venue and concert; the venue is reused when it already exists.
    let venue = Venue::objects()
        .first_or_create(
            &db,
            Q::eq("name", "Concert Hall"),
            Venue {
                description: String::from("Large stage"),
                ..Default::default()
            },
        )
        .await?;
    let start = Utc::now() + Duration::days(30);
    let mut concert = Concert {
        name: String::from("Echoes Live"),
        venue_id: venue.base.id,
        singer_id: singer.base.id,
        start_time: start,
        end_time: start + Duration::hours(3),
        ..Default::default()
    };
    Concert::objects().create(&db, &mut concert).await?;

    // Singers by last name, one page at a time.
    let mut offset = 0;
    loop {
        let page = Singer::objects()
            .filter(Q::eq("active", true))
            .order_by("last_name")
            .limit(5)
            .offset(offset)
            .execute(&db)
            .await?;
        for singer in &page {
            println!("Singer: {}", singer.full_name);
        }
        if page.len() < 5 {
            break;
        }
        offset += 5;
    }

    // Lower the sample rate of high-resolution tracks, 20 at a time.
    let tx = db.begin().await?;
    let read = Track::objects()
        .filter(Q::gt("sample_rate", 44.1))
        .find_in_batches(&tx, 20, |batch, _| {
            let tx = &tx;
            async move {
                for mut track in batch {
                    let factor = if track.sample_rate > 50.0 { 0.9 } else { 0.95 };
                    let rate = track.sample_rate * factor;
                    Track::objects()
                        .update_column(tx, &mut track, "sample_rate", rate)
                        .await?;
                }
                Ok::<(), OrmError>(())
            }
        })
        .await?;
    tx.commit().await?;
    println!("Updated {read} tracks");

    // Albums whose title starts with 'e', released before 1900 or not.
    let title = Q::raw_named(
        "title LIKE @title",
        &[("title", SqlValue::String(String::from("e%")))],
    )?;
    let albums = Album::objects()
        .filter(title)
        .exclude(Q::lt("release_date", NaiveDate::from_ymd_opt(1900, 1, 1)))
        .order_by("title")
        .execute(&db)
        .await?;
    println!("Found {} albums starting with 'e'", albums.len());

    album.marketing_budget = Some(25_000.0);
    Album::objects().save(&db, &mut album).await?;
    Album::objects().delete(&db, &album).await?;
    let remaining = Album::objects().count(&db).await?;
    let kept = Album::objects().unscoped().count(&db).await?;
    println!("{remaining} albums visible, {kept} kept after soft delete");

    if let Err(err) = Venue::objects().upsert(&db, &venue) {
        println!("Upsert: {err}");
    }
    Ok(())
}
