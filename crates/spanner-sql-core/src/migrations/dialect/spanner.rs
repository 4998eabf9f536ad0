//! Cloud Spanner DDL.

use super::MigrationDialect;
use crate::dialect::{Dialect, SpannerDialect};
use crate::migrations::column_builder::ColumnDefinition;
use crate::migrations::operation::{CreateIndexOp, CreateTableOp, SequenceOp};

/// Cloud Spanner DDL generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpannerDdl;

impl SpannerDdl {
    /// Creates a new Spanner DDL generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for SpannerDdl {
    fn name(&self) -> &'static str {
        "spanner"
    }

    fn create_table(&self, op: &CreateTableOp) -> String {
        let mut parts: Vec<String> = op
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        parts.extend(op.foreign_keys.iter().map(|fk| self.foreign_key_constraint(fk)));

        let mut sql = format!(
            "CREATE TABLE {} ({}) PRIMARY KEY ({})",
            self.quote_identifier(&op.name),
            parts.join(","),
            self.quote_list(&op.primary_key)
        );
        if let Some(interleave) = &op.interleave {
            sql.push_str(&format!(
                ", INTERLEAVE IN PARENT {} ON DELETE {}",
                self.quote_identifier(&interleave.parent),
                interleave.on_delete.as_sql()
            ));
        }
        sql
    }

    fn create_index(&self, op: &CreateIndexOp) -> String {
        let index = &op.index;
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        if index.null_filtered {
            sql.push_str("NULL_FILTERED ");
        }
        sql.push_str(&format!(
            "INDEX {} ON {}({})",
            self.quote_identifier(&index.name),
            self.quote_identifier(&op.table),
            self.quote_list(&index.columns)
        ));
        if !index.storing.is_empty() {
            sql.push_str(&format!(" STORING ({})", self.quote_list(&index.storing)));
        }
        sql
    }

    fn create_sequence(&self, op: &SequenceOp) -> String {
        format!(
            "CREATE SEQUENCE {} OPTIONS (sequence_kind = \"bit_reversed_positive\")",
            self.quote_identifier(&op.name)
        )
    }

    fn column_definition(&self, col: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&col.name),
            col.data_type.to_sql()
        );
        if col.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(generated) = &col.generated {
            sql.push(' ');
            sql.push_str(generated);
        } else if let Some(default) = &col.default {
            sql.push_str(&format!(" DEFAULT ({})", default.to_sql()));
        }
        if col.commit_timestamp {
            sql.push_str(" OPTIONS (allow_commit_timestamp=true)");
        }
        sql
    }

    fn quote_identifier(&self, name: &str) -> String {
        SpannerDialect::new().quote_identifier(name)
    }
}
