//! spanner-migrate CLI
//!
//! Prints the Spanner DDL for the models of a schema file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use spanner_migrate::prelude::*;

/// Schema migrations for Cloud Spanner models.
#[derive(Parser)]
#[command(name = "spanner-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON schema file describing the models.
    #[arg(short, long, env = "SPANNER_SCHEMA", default_value = "schema.json")]
    schema: PathBuf,

    /// Back auto-increment keys with bit-reversed sequences.
    #[arg(long)]
    sequence_backed_keys: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL creating every model, parents first.
    CreateDdl,

    /// Print the DDL dropping every model, children first.
    DropDdl,

    /// Validate the schema file and list its tables.
    Check {
        /// Print the resolved schemas as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TableSummary<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    primary_key: &'a [String],
    depends_on: Vec<&'a str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let models = load_schema_file(&cli.schema)?;
    info!(path = %cli.schema.display(), models = models.len(), "Loaded schema");

    let client = RecordingClient::new();
    let migrator = Migrator::with_options(
        &client,
        MigratorOptions {
            sequence_backed_keys: cli.sequence_backed_keys,
            dry_run: false,
        },
    );

    match cli.command {
        Commands::CreateDdl => {
            for statement in migrator.create_table(&models).await? {
                println!("{statement};");
            }
        }

        Commands::DropDdl => {
            for statement in migrator.drop_table(&models).await? {
                println!("{statement};");
            }
        }

        Commands::Check { json } => {
            let ordered = order_models(&models)?;
            if json {
                let summary: Vec<TableSummary<'_>> = ordered
                    .iter()
                    .map(|m| TableSummary {
                        table: &m.table,
                        columns: m.column_names(),
                        primary_key: &m.primary_key,
                        depends_on: m.dependencies(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for model in &ordered {
                    println!(
                        "{} ({} columns, primary key: {})",
                        model.table,
                        model.fields.len(),
                        model.primary_key.join(", ")
                    );
                }
                info!(tables = ordered.len(), "Schema is valid");
            }
        }
    }

    Ok(())
}
