//! Event REST — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tokio::io::BufReader;

use event_rest::transport::DEFAULT_TIMEOUT_MS;
use event_rest::{FilterConfig, ReqwestTransport, RestFilter};
use event_rest_cli::{resolve_config_path, run_pipeline};

#[derive(Parser)]
#[command(
    name = "event-rest",
    about = "Event REST — enrich NDJSON records with per-record HTTP lookups",
    version
)]
struct Cli {
    /// Path to the filter configuration (JSON).
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich records from stdin to stdout (default).
    Run {
        /// Records processed concurrently.
        #[arg(short, long, default_value_t = 4)]
        workers: usize,

        /// Per-request timeout in milliseconds.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: u64,
    },

    /// Validate the filter configuration and print a summary.
    Validate,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   event-rest completions bash > ~/.local/share/bash-completion/completions/event-rest
    ///   event-rest completions zsh > ~/.zfunc/_event-rest
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn build_filter(config: Option<&str>, timeout_ms: u64) -> anyhow::Result<RestFilter> {
    let path = resolve_config_path(config);
    tracing::info!("Config: {}", path.display());
    let config = FilterConfig::load(&path)?;
    let transport = Arc::new(ReqwestTransport::new(timeout_ms)?);
    Ok(RestFilter::new(config, transport)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let result = match cli.command.unwrap_or(Commands::Run {
        workers: 4,
        timeout_ms: DEFAULT_TIMEOUT_MS,
    }) {
        Commands::Run {
            workers,
            timeout_ms,
        } => match build_filter(cli.config.as_deref(), timeout_ms) {
            Ok(filter) => {
                let reader = BufReader::new(tokio::io::stdin());
                run_pipeline(Arc::new(filter), reader, tokio::io::stdout(), workers)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        },

        Commands::Validate => build_filter(cli.config.as_deref(), DEFAULT_TIMEOUT_MS).and_then(
            |filter| {
                let summary = serde_json::json!({
                    "valid": true,
                    "method": filter.method().as_str(),
                    "target": match filter.target() {
                        event_rest::MergeTarget::Root => String::new(),
                        event_rest::MergeTarget::Key(key) => key.clone(),
                    },
                    "fallback": filter.has_fallback(),
                    "tag_on_rest_failure": filter.failure_tag(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            },
        ),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "event-rest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    result
}
