//! SqlPad - CLI Client

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::{mpsc, watch};

use sqlpad::config::PlaygroundConfig;
use sqlpad::export::format_table;
use sqlpad::model::{ErrorLocation, ExecutionOutcome, SelectionScope, SourceDocument};
use sqlpad::schema::{SchemaSnapshot, SchemaState};
use sqlpad::watcher::SchemaWatcher;
use sqlpad::{logging, Session};

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
 ____        _ ____           _
/ ___|  __ _| |  _ \ __ _  __| |
\___ \ / _` | | |_) / _` |/ _` |
 ___) | (_| | |  __/ (_| | (_| |
|____/ \__, |_|_|   \__,_|\__,_|
          |_|

 Live schema and query playground
 Type '.help' for help, '.quit' to exit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit              Exit SqlPad
  .schema            Show the schema text
  .edit              Replace the schema text (finish with .end)
  .status            Show schema and query status
  .tables            List all tables
  .preview <table>   Show the first rows of a table
  .select <text>     Run only <text> on the next .run (.select alone clears)
  .buffer            Show the query buffer
  .run               Run the query buffer (or the selection)
  .export [path]     Export the last result as CSV
  .clear             Clear screen

Queries:
  Any SQL ending with ';' replaces the query buffer and runs it.

Examples:
  .edit
  CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(100));
  INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob');
  .end
  SELECT * FROM users WHERE id = 1;
"#
    );
}

/// Command line options
#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    schema: Option<PathBuf>,
    watch: bool,
    debounce_ms: Option<u64>,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    parsed.config = Some(args.next().context("--config needs a path")?.into());
                }
                "--schema" | "-s" => {
                    parsed.schema = Some(args.next().context("--schema needs a path")?.into());
                }
                "--watch" | "-w" => parsed.watch = true,
                "--debounce-ms" => {
                    let value = args.next().context("--debounce-ms needs a value")?;
                    parsed.debounce_ms = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid --debounce-ms '{}'", value))?,
                    );
                }
                other => bail!("unknown argument '{}'", other),
            }
        }

        if parsed.watch && parsed.schema.is_none() {
            bail!("--watch needs --schema <file>");
        }
        Ok(parsed)
    }
}

/// Render a schema error with the offending line and a marker under it
fn annotate(source: &SourceDocument, location: &ErrorLocation) -> String {
    let Some(line) = source.line(location.line_number()) else {
        return String::new();
    };
    let gutter = location.line_number().to_string();
    let start = location.column_number();
    let width = location.span_end(source).saturating_sub(start).max(1);

    format!(
        "  {} | {}\n  {} | {}{}\n",
        gutter,
        line,
        " ".repeat(gutter.len()),
        " ".repeat(start - 1),
        "^".repeat(width)
    )
}

/// Print a schema error with its location, if resolved
fn print_schema_error(snapshot: &SchemaSnapshot) {
    if let Some(error) = &snapshot.error {
        eprintln!("Schema error: {}", error.message);
        if let Some(location) = &error.location {
            eprintln!("  at {}", location);
            eprint!("{}", annotate(&error.source, location));
        }
    }
}

/// Print settled schema applies as they happen
async fn report_schema_changes(session: Arc<Session>) {
    let mut rx = session.subscribe_schema();
    let mut reported = 0;

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if let SchemaState::Settled { seq, outcome } = &snapshot.state {
            if *seq == reported {
                continue;
            }
            reported = *seq;
            match outcome {
                ExecutionOutcome::Success { .. } => {
                    eprintln!("\nDatabase schema updated successfully!")
                }
                ExecutionOutcome::Failure { .. } => {
                    eprintln!("\nSchema update failed.");
                    print_schema_error(&snapshot);
                }
            }
        }
    }
}

/// Print the outcome of a query run
fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Success { rows, elapsed_ms } => {
            print!("{}", format_table(rows));
            println!("Executed in {:.2} ms.", elapsed_ms);
        }
        ExecutionOutcome::Failure { message, .. } => {
            eprintln!("Query failed: {}", message);
        }
    }
}

/// Line input from the terminal thread
enum Input {
    Line(String),
    Interrupted,
    Eof,
}

/// Read lines on a dedicated thread so the runtime keeps driving the schema
/// pipeline while the prompt is open.
fn spawn_reader() -> (std::sync::mpsc::Sender<String>, mpsc::UnboundedReceiver<Input>) {
    let (prompt_tx, prompt_rx) = std::sync::mpsc::channel::<String>();
    let (line_tx, line_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Error opening terminal: {}", e);
                let _ = line_tx.send(Input::Eof);
                return;
            }
        };

        for prompt in prompt_rx {
            let input = match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(line.as_str());
                    }
                    Input::Line(line)
                }
                Err(ReadlineError::Interrupted) => Input::Interrupted,
                Err(ReadlineError::Eof) => Input::Eof,
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    Input::Eof
                }
            };
            if line_tx.send(input).is_err() {
                break;
            }
        }
    });

    (prompt_tx, line_rx)
}

/// Editor state owned by the REPL
struct Repl {
    session: Arc<Session>,
    query_buffer: String,
    selection: SelectionScope,
}

impl Repl {
    async fn run_buffer(&mut self) {
        let run = self
            .session
            .run_query(&self.query_buffer, &self.selection)
            .await;
        if self.selection.is_range() {
            println!("Executing selection: {}", run.executed_sql.trim());
        }
        print_outcome(&run.outcome);
    }

    /// Handle a dot command. Returns false when the REPL should exit.
    async fn handle_special_command(&mut self, cmd: &str) -> bool {
        let (name, rest) = match cmd.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (cmd, ""),
        };

        match name {
            ".help" => print_help(),
            ".quit" | ".exit" => return false,
            ".schema" => {
                let schema = self.session.schema_text();
                for (i, line) in schema.lines().enumerate() {
                    println!("{:>4} | {}", i + 1, line);
                }
            }
            ".status" => {
                let snapshot = self.session.schema_status();
                match &snapshot.state {
                    SchemaState::Idle => println!("Schema: idle"),
                    SchemaState::Scheduled { seq } => println!("Schema: edit #{} scheduled", seq),
                    SchemaState::Applying { seq } => println!("Schema: applying edit #{}", seq),
                    SchemaState::Settled { seq, outcome } => println!(
                        "Schema: edit #{} {}",
                        seq,
                        if outcome.is_success() { "applied" } else { "failed" }
                    ),
                }
                print_schema_error(&snapshot);
                if let Some(error) = self.session.query_error() {
                    eprintln!("Query error: {}", error.message);
                }
                if self.session.queries().is_loading() {
                    println!("Query: running");
                }
            }
            ".tables" => match self.session.browse().await {
                Ok(view) if view.tables.is_empty() => println!("No tables found."),
                Ok(view) => {
                    for table in &view.tables {
                        print!("{}", table);
                    }
                }
                Err(e) => eprintln!("Error: {}", e),
            },
            ".preview" => {
                if rest.is_empty() {
                    eprintln!("Usage: .preview <table>");
                } else {
                    match self.session.preview(rest).await {
                        Ok(view) => print!("{}", format_table(&view.preview)),
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
            }
            ".select" => {
                self.selection = SelectionScope::from_selection(rest);
                if self.selection.is_range() {
                    println!("Selection set; .run executes the selection.");
                } else {
                    println!("Selection cleared; .run executes the whole buffer.");
                }
            }
            ".buffer" => println!("{}", self.query_buffer),
            ".run" => self.run_buffer().await,
            ".export" => {
                let path = if rest.is_empty() {
                    self.session.config().export_path.clone()
                } else {
                    PathBuf::from(rest)
                };
                match self.session.export_csv(&path) {
                    Ok(true) => println!("Exported to {}", path.display()),
                    Ok(false) => println!("No results to export."),
                    Err(e) => eprintln!("Export failed: {}", e),
                }
            }
            ".clear" => {
                // Clear screen (ANSI escape code)
                print!("\x1B[2J\x1B[1;1H");
                let _ = io::stdout().flush();
            }
            other => {
                eprintln!("Unknown command: {}", other);
                eprintln!("Type '.help' for available commands.");
            }
        }
        true
    }
}

/// Main REPL loop
async fn run_repl(session: Arc<Session>) -> anyhow::Result<()> {
    let (prompt_tx, mut lines) = spawn_reader();
    let mut repl = Repl {
        query_buffer: session.config().initial_query.clone(),
        selection: SelectionScope::WholeBuffer,
        session,
    };

    print_banner();

    let mut input_buffer = String::new();
    let mut schema_edit: Option<String> = None;

    loop {
        let prompt = if schema_edit.is_some() {
            "schema> "
        } else if !input_buffer.is_empty() {
            "...> "
        } else {
            "sqlpad> "
        };
        if prompt_tx.send(prompt.to_string()).is_err() {
            break;
        }

        let line = match lines.recv().await {
            Some(Input::Line(line)) => line,
            Some(Input::Interrupted) => {
                input_buffer.clear();
                schema_edit = None;
                continue;
            }
            Some(Input::Eof) | None => break,
        };
        let trimmed = line.trim();

        // Schema editing mode
        if let Some(text) = schema_edit.as_mut() {
            if trimmed == ".end" {
                let text = schema_edit.take().unwrap_or_default();
                match repl.session.edit_schema(text) {
                    Ok(seq) => println!("Schema edit #{} submitted.", seq),
                    Err(e) => eprintln!("Error: {}", e),
                }
            } else {
                text.push_str(&line);
                text.push('\n');
            }
            continue;
        }

        // Handle special commands
        if input_buffer.is_empty() && trimmed.starts_with('.') {
            if trimmed == ".edit" {
                println!("Enter the new schema, finish with .end");
                schema_edit = Some(String::new());
                continue;
            }
            if !repl.handle_special_command(trimmed).await {
                break;
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        // Accumulate input
        input_buffer.push_str(&line);
        input_buffer.push('\n');

        // Check if statement is complete (ends with semicolon)
        if trimmed.ends_with(';') {
            repl.query_buffer = std::mem::take(&mut input_buffer);
            repl.selection = SelectionScope::WholeBuffer;
            repl.run_buffer().await;
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse(env::args().skip(1))?;

    let mut config = match &args.config {
        Some(path) => PlaygroundConfig::from_file(path)?,
        None => PlaygroundConfig::new(),
    };
    if let Some(ms) = args.debounce_ms {
        config = config.debounce_ms(ms);
    }
    let initial_schema = match &args.schema {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read schema file '{}'", path.display()))?;
            config = config.initial_schema(text.clone());
            Some(text)
        }
        None => None,
    };
    config.validate()?;
    logging::init_logging(&config.log_level)?;

    let session = Arc::new(Session::start(config)?);
    tokio::spawn(report_schema_changes(session.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_task = match (&args.schema, args.watch) {
        (Some(path), true) => {
            let mut watcher = SchemaWatcher::new(path, shutdown_rx)
                .with_initial_content(initial_schema.unwrap_or_default());
            let session = session.clone();
            Some(tokio::spawn(async move {
                watcher
                    .run(|content| session.edit_schema(content).map(|_| ()))
                    .await
            }))
        }
        _ => None,
    };

    let result = run_repl(session.clone()).await;

    let _ = shutdown_tx.send(true);
    if let Some(task) = watcher_task {
        if let Ok(Err(e)) = task.await {
            eprintln!("Schema watcher error: {}", e);
        }
    }
    result
}
