//! Schema change operations.

use super::column_builder::ColumnDefinition;
use crate::schema::{ForeignKeySchema, IndexSchema, Interleave};

/// All schema change operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a new table.
    CreateTable(CreateTableOp),
    /// Drop an existing table.
    DropTable(DropTableOp),
    /// Rename a table.
    RenameTable(RenameTableOp),
    /// Add a column to an existing table.
    AddColumn(AddColumnOp),
    /// Drop a column from a table.
    DropColumn(DropColumnOp),
    /// Change the type or nullability of a column.
    AlterColumn(AlterColumnOp),
    /// Rename a column. Spanner has no DDL for it.
    RenameColumn(RenameColumnOp),
    /// Create an index.
    CreateIndex(CreateIndexOp),
    /// Drop an index.
    DropIndex(DropIndexOp),
    /// Rename an index. Spanner has no DDL for it.
    RenameIndex(RenameIndexOp),
    /// Add a foreign key constraint.
    AddForeignKey(AddForeignKeyOp),
    /// Drop a named constraint.
    DropConstraint(DropConstraintOp),
    /// Create a sequence.
    CreateSequence(SequenceOp),
    /// Drop a sequence.
    DropSequence(SequenceOp),
    /// Run raw SQL.
    RunSql(String),
}

impl Operation {
    /// Creates a drop table operation.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable(DropTableOp { name: name.into() })
    }

    /// Creates a rename table operation.
    #[must_use]
    pub fn rename_table(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::RenameTable(RenameTableOp {
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    /// Creates an add column operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnDefinition) -> Self {
        Self::AddColumn(AddColumnOp {
            table: table.into(),
            column,
        })
    }

    /// Creates a drop column operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn(DropColumnOp {
            table: table.into(),
            column: column.into(),
        })
    }

    /// Creates an alter column operation.
    #[must_use]
    pub fn alter_column(table: impl Into<String>, column: ColumnDefinition) -> Self {
        Self::AlterColumn(AlterColumnOp {
            table: table.into(),
            column,
        })
    }

    /// Creates a rename column operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameColumn(RenameColumnOp {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    /// Creates a create index operation.
    #[must_use]
    pub fn create_index(table: impl Into<String>, index: IndexSchema) -> Self {
        Self::CreateIndex(CreateIndexOp {
            table: table.into(),
            index,
        })
    }

    /// Creates a drop index operation.
    #[must_use]
    pub fn drop_index(name: impl Into<String>) -> Self {
        Self::DropIndex(DropIndexOp { name: name.into() })
    }

    /// Creates an add foreign key operation.
    #[must_use]
    pub fn add_foreign_key(table: impl Into<String>, foreign_key: ForeignKeySchema) -> Self {
        Self::AddForeignKey(AddForeignKeyOp {
            table: table.into(),
            foreign_key,
        })
    }

    /// Creates a drop constraint operation.
    #[must_use]
    pub fn drop_constraint(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropConstraint(DropConstraintOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Creates a bit-reversed sequence.
    #[must_use]
    pub fn create_sequence(name: impl Into<String>) -> Self {
        Self::CreateSequence(SequenceOp { name: name.into() })
    }

    /// Drops a sequence.
    #[must_use]
    pub fn drop_sequence(name: impl Into<String>) -> Self {
        Self::DropSequence(SequenceOp { name: name.into() })
    }

    /// Creates a raw SQL operation.
    #[must_use]
    pub fn run_sql(sql: impl Into<String>) -> Self {
        Self::RunSql(sql.into())
    }
}

/// Create table operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableOp {
    /// Table name.
    pub name: String,
    /// Column definitions, in order.
    pub columns: Vec<ColumnDefinition>,
    /// Foreign key constraints declared inline.
    pub foreign_keys: Vec<ForeignKeySchema>,
    /// Primary key columns.
    pub primary_key: Vec<String>,
    /// Parent table, for interleaved tables.
    pub interleave: Option<Interleave>,
}

impl From<CreateTableOp> for Operation {
    fn from(op: CreateTableOp) -> Self {
        Self::CreateTable(op)
    }
}

/// Drop table operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTableOp {
    /// Table name.
    pub name: String,
}

/// Rename table operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTableOp {
    /// Current name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

/// Add column operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AddColumnOp {
    /// Table name.
    pub table: String,
    /// Column definition.
    pub column: ColumnDefinition,
}

/// Drop column operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// Alter column operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterColumnOp {
    /// Table name.
    pub table: String,
    /// New column definition.
    pub column: ColumnDefinition,
}

/// Rename column operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameColumnOp {
    /// Table name.
    pub table: String,
    /// Current name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

/// Create index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexOp {
    /// Indexed table.
    pub table: String,
    /// The index.
    pub index: IndexSchema,
}

/// Drop index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndexOp {
    /// Index name.
    pub name: String,
}

/// Rename index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameIndexOp {
    /// Current name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

/// Add foreign key operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddForeignKeyOp {
    /// Referencing table.
    pub table: String,
    /// The constraint.
    pub foreign_key: ForeignKeySchema,
}

/// Drop constraint operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropConstraintOp {
    /// Table name.
    pub table: String,
    /// Constraint name.
    pub name: String,
}

/// Sequence operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceOp {
    /// Sequence name.
    pub name: String,
}
