/// Interactive REPL shell for dynoql
///
/// Line editing, history, keyword completion, meta-commands, and
/// BEGIN/COMMIT/ROLLBACK for transactions.

use crate::OutputFormat;
use anyhow::{Context, Result};
use colored::Colorize;
use dynoql_api::{Connection, Transaction};
use rustyline::error::ReadlineError;
use rustyline::{
    completion::{Completer, Pair},
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
    Helper,
};
use tokio::runtime::Runtime;

const META_COMMANDS: &[&str] = &[
    ".help", ".exit", ".quit", ".tables", ".describe", ".format", ".timer", ".clear",
];

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUE", "UPDATE", "SET", "DELETE", "RETURNING",
    "LIMIT", "WITH", "CREATE", "ALTER", "DROP", "DESCRIBE", "LIST", "TABLE", "TABLES", "GSI",
    "LSI", "ON", "IF", "NOT", "EXISTS", "AND", "OR", "BEGIN", "COMMIT", "ROLLBACK",
];

/// Completion for meta-commands and statement keywords
#[derive(Clone, Default)]
struct DynoqlCompleter;

impl DynoqlCompleter {
    fn candidates(words: &[&str], prefix: &str) -> Vec<Pair> {
        let upper = prefix.to_uppercase();
        words
            .iter()
            .filter(|w| w.to_uppercase().starts_with(&upper))
            .map(|w| Pair {
                display: w.to_string(),
                replacement: w.to_string(),
            })
            .collect()
    }
}

impl Completer for DynoqlCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_prefix = &line[..pos];

        if line_prefix.starts_with('.') {
            return Ok((0, Self::candidates(META_COMMANDS, line_prefix)));
        }

        let word_start = line_prefix
            .rfind(|c: char| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        Ok((word_start, Self::candidates(KEYWORDS, &line_prefix[word_start..])))
    }
}

impl Hinter for DynoqlCompleter {
    type Hint = String;
}

impl Highlighter for DynoqlCompleter {}

impl Validator for DynoqlCompleter {}

impl Helper for DynoqlCompleter {}

/// Transaction control words handled by the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxCommand {
    Begin,
    Commit,
    Rollback,
}

impl TxCommand {
    fn parse(input: &str) -> Option<Self> {
        let words: Vec<String> = input
            .split_whitespace()
            .map(|w| w.to_uppercase())
            .collect();
        let cmd = match words.first().map(String::as_str) {
            Some("BEGIN") => TxCommand::Begin,
            Some("COMMIT") => TxCommand::Commit,
            Some("ROLLBACK") => TxCommand::Rollback,
            _ => return None,
        };
        match words.get(1).map(String::as_str) {
            None | Some("TRANSACTION") | Some("WORK") if words.len() <= 2 => Some(cmd),
            _ => None,
        }
    }
}

/// Interactive shell session state
pub struct Shell {
    conn: Connection,
    runtime: Runtime,
    /// Connection string for display
    conn_label: String,
    editor: rustyline::Editor<DynoqlCompleter, rustyline::history::FileHistory>,
    /// Open transaction, if any
    tx: Option<Transaction>,
    format: OutputFormat,
    show_timing: bool,
}

impl Shell {
    pub fn new(conn: Connection, runtime: Runtime, conn_label: &str) -> Result<Self> {
        let mut editor = rustyline::Editor::new().context("Failed to initialize line editor")?;
        editor.set_helper(Some(DynoqlCompleter));

        let history_path = Self::history_path();
        if history_path.exists() {
            let _ = editor.load_history(&history_path);
        }

        Ok(Self {
            conn,
            runtime,
            conn_label: if conn_label.is_empty() {
                "(environment)".to_string()
            } else {
                redact(conn_label)
            },
            editor,
            tx: None,
            format: OutputFormat::Table,
            show_timing: true,
        })
    }

    fn history_path() -> std::path::PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".dynoql_history"))
            .unwrap_or_else(|| ".dynoql_history".into())
    }

    /// Run the interactive REPL
    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut buffer = String::new();
        let mut in_multiline = false;

        loop {
            let prompt = if in_multiline {
                format!("{}    ", "...>".dimmed())
            } else if self.tx.is_some() {
                format!("{} ", "dynoql*>".yellow().bold())
            } else {
                format!("{} ", "dynoql>".green().bold())
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() && !in_multiline {
                        continue;
                    }
                    if !in_multiline && (line == ".exit" || line == ".quit") {
                        break;
                    }

                    if !buffer.is_empty() {
                        buffer.push(' ');
                    }
                    buffer.push_str(line);

                    // Meta-commands are single line; statements end with ';'
                    let complete = buffer.starts_with('.') || buffer.trim_end().ends_with(';');
                    if complete {
                        let input = buffer.trim().to_string();
                        buffer.clear();
                        in_multiline = false;
                        let _ = self.editor.add_history_entry(input.as_str());

                        if let Err(e) = self.execute(&input) {
                            eprintln!("{} {:#}", "Error:".red().bold(), e);
                        }
                    } else {
                        in_multiline = true;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    buffer.clear();
                    in_multiline = false;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error reading line: {}", err);
                    break;
                }
            }
        }

        if let Some(tx) = self.tx.take() {
            tx.rollback()?;
            println!("{}", "Open transaction rolled back".yellow());
        }
        self.conn.close();
        println!("Goodbye!");
        self.save_history()
    }

    fn execute(&mut self, input: &str) -> Result<()> {
        if input.starts_with('.') {
            return self.execute_meta_command(input);
        }

        let statement = input.trim_end_matches(';').trim();
        if statement.is_empty() {
            return Ok(());
        }
        match TxCommand::parse(statement) {
            Some(cmd) => self.execute_tx_command(cmd),
            None => self.execute_statement(statement),
        }
    }

    fn execute_meta_command(&mut self, command: &str) -> Result<()> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            ".help" => {
                self.show_help();
                Ok(())
            }
            ".exit" | ".quit" => Ok(()),
            ".tables" => self.execute_statement("LIST TABLES"),
            ".describe" => match parts.get(1) {
                Some(table) => self.execute_statement(&format!("DESCRIBE TABLE {}", table)),
                None => {
                    println!("Usage: .describe <table>");
                    Ok(())
                }
            },
            ".format" => {
                match parts.get(1) {
                    Some(format) => self.set_format(format),
                    None => {
                        println!("Usage: .format <table|json|jsonl>");
                        println!("Current format: {:?}", self.format);
                    }
                }
                Ok(())
            }
            ".timer" => {
                match parts.get(1) {
                    Some(value) => self.set_timer(value),
                    None => {
                        println!("Usage: .timer <on|off>");
                        println!("Current: {}", if self.show_timing { "on" } else { "off" });
                    }
                }
                Ok(())
            }
            ".clear" => {
                print!("\x1B[2J\x1B[1;1H");
                Ok(())
            }
            _ => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
                println!("Type .help for available commands");
                Ok(())
            }
        }
    }

    fn execute_tx_command(&mut self, cmd: TxCommand) -> Result<()> {
        match cmd {
            TxCommand::Begin => {
                self.tx = Some(self.conn.begin()?);
                println!("Transaction started");
            }
            TxCommand::Commit => {
                let tx = self.tx.take().context("No transaction is open")?;
                let start = std::time::Instant::now();
                self.runtime.block_on(tx.commit())?;
                println!("{} Transaction committed", "✓".green());
                self.print_timing(start.elapsed(), None);
            }
            TxCommand::Rollback => {
                let tx = self.tx.take().context("No transaction is open")?;
                tx.rollback()?;
                println!("Transaction rolled back");
            }
        }
        Ok(())
    }

    fn execute_statement(&mut self, sql: &str) -> Result<()> {
        let start = std::time::Instant::now();

        let count = if crate::prefers_query(&self.conn, sql)? {
            let mut rows = self.runtime.block_on(self.conn.query(sql, &[]))?;
            crate::print_rows(&mut rows, self.format)?
        } else {
            let res = self.runtime.block_on(self.conn.execute(sql, &[]))?;
            crate::print_exec(&res)?
        };

        self.print_timing(start.elapsed(), Some(count));
        Ok(())
    }

    fn print_timing(&self, elapsed: std::time::Duration, rows: Option<usize>) {
        if !self.show_timing {
            return;
        }
        let label = match rows {
            Some(n) => format!("{} row{}", n, if n == 1 { "" } else { "s" }),
            None => "done".to_string(),
        };
        println!("\n{} ({:.2}ms)", label.dimmed(), elapsed.as_secs_f64() * 1000.0);
    }

    fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold());
        println!("\n  {}", "Meta-commands:".cyan());
        println!("    .help              Show this help message");
        println!("    .exit, .quit       Exit the shell");
        println!("    .tables            List tables");
        println!("    .describe <table>  Describe a table");
        println!("    .format <type>     Set output format (table|json|jsonl)");
        println!("    .timer <on|off>    Toggle query timing display");
        println!("    .clear             Clear the screen");

        println!("\n  {}", "Statements:".cyan());
        println!("    CREATE TABLE users WITH pk=id:string WITH rcu=1 WITH wcu=1;");
        println!("    INSERT INTO \"users\" VALUE {{'id': 'u1', 'name': 'Alice'}};");
        println!("    SELECT * FROM \"users\" WHERE id='u1' LIMIT 10;");
        println!("    UPDATE \"users\" SET age=30 WHERE id='u1';");
        println!("    CREATE GSI byName ON users WITH pk=name:string;");

        println!("\n  {}", "Transactions:".cyan());
        println!("    BEGIN; ... COMMIT;  or  BEGIN; ... ROLLBACK;");
        println!("    Statements inside a transaction are sent together at COMMIT.");

        println!("\n  {}", "Multi-line Statements:".cyan());
        println!("    Statements without a semicolon continue on the next line.");
        println!("    Use Ctrl+C to cancel, Ctrl+D to exit.");
        println!();
    }

    fn set_format(&mut self, format: &str) {
        self.format = match format.to_lowercase().as_str() {
            "table" => OutputFormat::Table,
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            _ => {
                println!("{} {}. Use: table, json, or jsonl", "Invalid format:".red(), format);
                return;
            }
        };
        println!("Output format set to: {:?}", self.format);
    }

    fn set_timer(&mut self, value: &str) {
        self.show_timing = match value.to_lowercase().as_str() {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            _ => {
                println!("{} {}. Use: on or off", "Invalid value:".red(), value);
                return;
            }
        };
        println!("Timer {}", if self.show_timing { "enabled" } else { "disabled" });
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", format!("dynoql shell v{}", env!("CARGO_PKG_VERSION")).cyan().bold());
        println!("  {}: {}", "Connection".cyan(), self.conn_label);
        println!("  Type .help for commands, end statements with ';'");
        println!();
    }

    fn save_history(&mut self) -> Result<()> {
        self.editor
            .save_history(&Self::history_path())
            .context("Failed to save history")?;
        Ok(())
    }
}

/// Hides the secret key in a connection string.
fn redact(conn: &str) -> String {
    conn.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _)) if key.trim().to_uppercase().starts_with("SECRET") => {
                format!("{}=****", key)
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_command_parse() {
        assert_eq!(TxCommand::parse("BEGIN"), Some(TxCommand::Begin));
        assert_eq!(TxCommand::parse("begin transaction"), Some(TxCommand::Begin));
        assert_eq!(TxCommand::parse("Commit"), Some(TxCommand::Commit));
        assert_eq!(TxCommand::parse("ROLLBACK WORK"), Some(TxCommand::Rollback));
        assert_eq!(TxCommand::parse("COMMIT everything now"), None);
        assert_eq!(TxCommand::parse("SELECT * FROM t"), None);
    }

    #[test]
    fn test_redact_secret() {
        assert_eq!(
            redact("Region=us-east-1;AkId=AKIA;Secret_Key=abc"),
            "Region=us-east-1;AkId=AKIA;Secret_Key=****"
        );
    }

    #[test]
    fn test_keyword_candidates() {
        let names: Vec<String> = DynoqlCompleter::candidates(KEYWORDS, "sel")
            .into_iter()
            .map(|p| p.replacement)
            .collect();
        assert_eq!(names, vec!["SELECT"]);
        assert_eq!(DynoqlCompleter::candidates(META_COMMANDS, ".ti").len(), 1);
    }
}
