//! Model reflection.
//!
//! Two layers live here:
//! - compile-time traits (`Table`, `Column`, `TypedColumn`, `Selectable`)
//!   implemented by `#[derive(Table)]` for type-checked column references
//! - runtime metadata (`ModelSchema` and friends) that DDL generation and
//!   the ORM walk, plus the `Reflect`/`Record` row mapping traits

mod field_type;
mod model;
mod naming;
mod row;

pub use field_type::FieldType;
pub use model::{
    FieldIndex, FieldReference, FieldSchema, ForeignKeySchema, IndexSchema, Interleave,
    ModelSchema, ModelSchemaBuilder, OnDelete,
};
pub use naming::{pluralize, to_snake_case, NamingStrategy};
pub use row::{Record, Reflect, Row, RowError};

/// Trait for table metadata.
///
/// Implemented by types generated from `#[derive(Table)]`.
pub trait Table {
    /// The row type (the original struct).
    type Row;

    /// The SQL table name.
    const NAME: &'static str;
}

/// Trait for column metadata.
///
/// Implemented by column types generated from `#[derive(Table)]` to provide
/// column-level information and enable type-safe queries.
pub trait Column {
    /// The table this column belongs to.
    type Table: Table;

    /// The Rust type of this column.
    type Type;

    /// The SQL column name.
    const NAME: &'static str;

    /// Whether this column is nullable.
    const NULLABLE: bool;

    /// Whether this column is flagged as part of the primary key.
    const PRIMARY_KEY: bool;
}

/// Marker trait for columns with a specific Rust type.
///
/// Used for compile-time type checking of values in queries.
pub trait TypedColumn<T>: Column<Type = T> {}

/// Trait for selecting specific columns from a table.
///
/// Implemented for single columns and tuples of columns of one table.
pub trait Selectable<T: Table> {
    /// Returns the column names to select.
    fn column_names() -> &'static [&'static str];
}

impl<T: Table, C: Column<Table = T>> Selectable<T> for C {
    fn column_names() -> &'static [&'static str] {
        &[C::NAME]
    }
}

macro_rules! impl_selectable_tuple {
    ($($col:ident),+) => {
        impl<T: Table, $($col: Column<Table = T>),+> Selectable<T> for ($($col,)+) {
            fn column_names() -> &'static [&'static str] {
                &[$($col::NAME),+]
            }
        }
    };
}

impl_selectable_tuple!(C0);
impl_selectable_tuple!(C0, C1);
impl_selectable_tuple!(C0, C1, C2);
impl_selectable_tuple!(C0, C1, C2, C3);
impl_selectable_tuple!(C0, C1, C2, C3, C4);
impl_selectable_tuple!(C0, C1, C2, C3, C4, C5);
impl_selectable_tuple!(C0, C1, C2, C3, C4, C5, C6);
impl_selectable_tuple!(C0, C1, C2, C3, C4, C5, C6, C7);

/// Returns a builder column reference for a typed column.
#[must_use]
pub fn column_ref<C: Column>() -> crate::builder::Column {
    crate::builder::col(C::NAME)
}
