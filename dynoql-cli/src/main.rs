use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dynoql_api::{Connection, ExecResult, ExecStatus, Rows, Value};
use dynoql_client::{DriverConfig, DynamoStore};
use dynoql_core::dialect::{transform_insert_to_partiql, ExecMode};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod shell;
mod table;

use table::ResultSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    Table,
    /// Pretty JSON
    Json,
    /// JSON Lines (one row per line)
    Jsonl,
}

#[derive(Parser)]
#[command(name = "dynoql")]
#[command(about = "dynoql CLI: SQL-style statements against DynamoDB", long_about = None)]
struct Cli {
    /// Connection string, e.g. "Region=us-east-1;Endpoint=http://localhost:8000".
    /// Missing values are read from AWS_* environment variables.
    #[arg(short, long, default_value = "", global = true)]
    conn: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a statement that returns rows (SELECT, LIST/DESCRIBE, UPDATE/DELETE)
    Query {
        /// Statement text
        sql: String,
        /// Positional parameters as JSON values; bare words are strings
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// Output format (table, json, jsonl)
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
    /// Run a statement for its affected-row count (DDL, INSERT, UPDATE/DELETE)
    Exec {
        /// Statement text
        sql: String,
        /// Positional parameters as JSON values; bare words are strings
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Rewrite `INSERT INTO t (a, b) VALUES (1, 'x')` into the store's syntax
    Transform {
        /// INSERT statement
        sql: String,
    },
    /// Start interactive shell
    Shell,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Transform { sql } = &cli.command {
        let partiql = transform_insert_to_partiql(sql).context("Failed to transform statement")?;
        println!("{}", partiql);
        return Ok(());
    }

    let runtime = Runtime::new()?;
    let conn = runtime.block_on(connect(&cli.conn))?;

    match cli.command {
        Commands::Query { sql, params, output } => {
            let params = parse_params(&params);
            let mut rows = runtime
                .block_on(conn.query(&sql, &params))
                .context("Query failed")?;
            print_rows(&mut rows, output)?;
        }

        Commands::Exec { sql, params } => {
            let params = parse_params(&params);
            let res = runtime
                .block_on(conn.execute(&sql, &params))
                .context("Statement failed")?;
            print_exec(&res)?;
        }

        Commands::Shell => {
            let mut shell = shell::Shell::new(conn, runtime, &cli.conn)?;
            shell.run()?;
        }

        Commands::Transform { .. } => {}
    }

    Ok(())
}

/// Opens a connection from a connection string.
async fn connect(conn_str: &str) -> Result<Connection> {
    let config = DriverConfig::from_conn_string(conn_str).context("Invalid connection string")?;
    debug!(
        region = config.region.as_deref().unwrap_or("default"),
        timeout_ms = config.timeout.as_millis() as u64,
        "connecting"
    );
    let store = DynamoStore::connect(&config)
        .await
        .context("Failed to create store client")?;
    Ok(Connection::new(Arc::new(store)).with_timeout(config.timeout))
}

/// Reads each parameter as JSON, falling back to a plain string.
fn parse_params(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|p| match serde_json::from_str::<serde_json::Value>(p) {
            Ok(json) => Value::from(json),
            Err(_) => Value::from(p.as_str()),
        })
        .collect()
}

/// Which mode to run a statement in when the caller does not say.
///
/// UPDATE/DELETE run as queries so the old items are shown.
pub(crate) fn prefers_query(conn: &Connection, sql: &str) -> Result<bool> {
    let stmt = conn.prepare(sql)?;
    Ok(stmt.kind().mode() != ExecMode::ExecOnly)
}

pub(crate) fn print_rows(rows: &mut Rows, format: OutputFormat) -> Result<usize> {
    if rows.is_pending() {
        println!("{}", "Queued in transaction".dimmed());
        return Ok(0);
    }

    let set = ResultSet::collect(rows)?;
    match format {
        OutputFormat::Table => {
            println!("{}", table::format_rows_table(&set));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&set.to_json())?);
        }
        OutputFormat::Jsonl => {
            for row in &set.rows {
                println!("{}", serde_json::to_string(&set.row_json(row))?);
            }
        }
    }
    Ok(set.len())
}

pub(crate) fn print_exec(res: &ExecResult) -> Result<usize> {
    match res.status() {
        ExecStatus::Queued => {
            println!("{}", "Queued in transaction".dimmed());
            Ok(0)
        }
        _ => {
            let n = res.rows_affected()?;
            println!(
                "{} {} row{} affected",
                "✓".green(),
                n,
                if n == 1 { "" } else { "s" }
            );
            Ok(usize::try_from(n).unwrap_or(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&[
            "42".to_string(),
            "\"quoted\"".to_string(),
            "bare".to_string(),
            "true".to_string(),
            "[1, 2]".to_string(),
        ]);
        assert_eq!(
            params,
            vec![
                Value::Int(42),
                Value::from("quoted"),
                Value::from("bare"),
                Value::Bool(true),
                Value::List(vec![Value::Int(1), Value::Int(2)]),
            ]
        );
    }

    #[test]
    fn test_cli_parses_query() {
        let cli = Cli::try_parse_from([
            "dynoql",
            "--conn",
            "Region=us-west-2",
            "query",
            "SELECT * FROM t WHERE id=?",
            "-p",
            "a",
            "--output",
            "jsonl",
        ])
        .unwrap();
        assert_eq!(cli.conn, "Region=us-west-2");
        match cli.command {
            Commands::Query { sql, params, output } => {
                assert_eq!(sql, "SELECT * FROM t WHERE id=?");
                assert_eq!(params, vec!["a"]);
                assert_eq!(output, OutputFormat::Jsonl);
            }
            _ => panic!("expected query command"),
        }
    }
}
