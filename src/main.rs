use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use argmatch::schema::SchemaFile;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Parse arguments against a TOML schema and print the bound values as JSON.
#[derive(Parser, Debug)]
#[command(name = "argmatch", version, about)]
struct Cli {
    /// Schema file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Parse this command line instead of the trailing arguments
    #[arg(long, value_name = "STRING", conflicts_with = "args")]
    line: Option<String>,

    /// The first token of --line is a program name
    #[arg(long, requires = "line")]
    program_name: bool,

    /// Arguments to parse, after `--`
    #[arg(last = true)]
    args: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let path = cli.schema.unwrap_or_else(SchemaFile::default_path);
    let schema = SchemaFile::load_from(&path)?;
    let (mut app, bound) = schema
        .build()
        .with_context(|| format!("building parser from '{}'", path.display()))?;

    let result = match &cli.line {
        Some(line) => app.parse_line(line, cli.program_name),
        None => app.parse(cli.args.iter().cloned()),
    };

    match result {
        Ok(()) => {
            println!("{}", serde_json::to_string_pretty(&bound.report(&app))?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_exit() => Ok(ExitCode::SUCCESS),
        Err(err) => {
            let report = json!({
                "error": err.kind(),
                "message": err.to_string(),
                "exit_code": err.exit_code(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            tracing::debug!(error = %err, "Parse failed");
            Ok(ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1)))
        }
    }
}
