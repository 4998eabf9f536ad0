//! Model trait and the standard model fields.
//!
//! Any struct deriving `Table` is a [`Model`]: the derive supplies the
//! reflected schema and the row mapping, and this crate adds the manager.

use chrono::{DateTime, Utc};
use spanner_sql_core::schema::{FieldType, ModelSchema, Record, Reflect};
use spanner_sql_derive::Table;

use crate::manager::Manager;

/// A database model with ORM capabilities.
///
/// Implemented for every type with `Reflect` and `Record`, which
/// `#[derive(Table)]` provides.
///
/// # Example
///
/// ```rust
/// use spanner_orm::{Model, StandardModel, Table};
///
/// #[derive(Debug, Default, Table)]
/// pub struct Venue {
///     #[column(embed)]
///     pub base: StandardModel,
///     pub name: String,
///     pub description: String,
/// }
///
/// assert_eq!(Venue::table_name(), "venues");
/// let _all = Venue::objects().all();
/// ```
pub trait Model: Reflect + Record {
    /// Returns the table name.
    #[must_use]
    fn table_name() -> &'static str {
        Self::TABLE
    }

    /// Returns a new Manager for this model.
    #[must_use]
    fn objects() -> Manager<Self> {
        Manager::new()
    }
}

impl<T: Reflect + Record> Model for T {}

/// The usual leading fields of a model: an `id` key, creation and update
/// timestamps and an indexed soft-delete marker.
///
/// Embed it with `#[column(embed)]`. The manager fills `created_at` and
/// `updated_at` when they are unset. Deleting sets `deleted_at` instead of
/// removing the row, and queries skip rows where it is set; see
/// [`soft_delete_column`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Table)]
pub struct StandardModel {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[column(index)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Returns the column that marks rows of `schema` as deleted.
///
/// Any writable, nullable `deleted_at` timestamp column qualifies.
#[must_use]
pub fn soft_delete_column(schema: &ModelSchema) -> Option<&str> {
    schema
        .field("deleted_at")
        .filter(|f| f.nullable && f.field_type == FieldType::Timestamp && f.is_writable())
        .map(|f| f.name.as_str())
}
