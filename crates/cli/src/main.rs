mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Material script compiler.
#[derive(Parser)]
#[command(name = "mscript", version, about = "Material script compiler")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log compiler progress to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile scripts to resolved JSON trees
    Compile {
        /// Script files, compiled in order within one session
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory the input paths are relative to
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Write <stem>.json here instead of next to each input
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Print the trees to stdout instead of writing files
        #[arg(long)]
        stdout: bool,
        /// Keep abstract top-level objects in the output
        #[arg(long)]
        keep_abstract: bool,
    },

    /// Print the token stream of a script
    Tokens {
        /// Path to the script file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile {
            files,
            project_dir,
            out_dir,
            stdout,
            keep_abstract,
        } => {
            let args = commands::compile::CompileArgs {
                files,
                project_dir,
                out_dir,
                stdout,
                keep_abstract,
            };
            commands::compile::cmd_compile(&args, cli.output, cli.quiet);
        }
        Commands::Tokens { file } => {
            commands::tokens::cmd_tokens(&file, cli.output, cli.quiet);
        }
    }
}

// ──────────────────────────────────────────────
// Shared helpers
// ──────────────────────────────────────────────

/// Report an error message in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Report a compiler diagnostic. JSON output always prints it so scripted
/// callers see why the exit code is non-zero.
pub(crate) fn report_diagnostic(
    diag: &mscript_core::CompileError,
    output: OutputFormat,
    quiet: bool,
) {
    match output {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&diag.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", diag));
            eprintln!("{}", text);
        }
        OutputFormat::Text => {
            if !quiet {
                let label = if diag.is_fatal() { "error" } else { "warning" };
                eprintln!("{}: {}", label, diag);
            }
        }
    }
}
