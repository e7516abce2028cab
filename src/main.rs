use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::stream::{self, StreamExt};
use gcp_toolbox::config::Config;
use gcp_toolbox::envelope::Envelope;
use gcp_toolbox::error::ErrorKind;
use gcp_toolbox::gcp::auth::{AdcSource, CredentialResolver, CredentialSource, StaticTokenSource};
use gcp_toolbox::gcp::client::GcpClient;
use gcp_toolbox::ops::Services;
use gcp_toolbox::registry::ToolRegistry;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Typed GCP operations for agents
#[derive(Parser, Debug)]
#[command(name = "gcp-toolbox", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to <config dir>/gcp-toolbox/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service account key or ADC file
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Fixed bearer token; skips credential discovery
    #[arg(long, env = "GCP_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    /// Timeout for each provider call, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Zone/region sub-calls in flight at once
    #[arg(long, global = true)]
    max_concurrent_scopes: Option<usize>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tool catalog with argument schemas
    Tools,

    /// Invoke one tool and print its result
    Call {
        /// Tool name, e.g. list_buckets
        tool: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Read one {"tool", "arguments"} request per stdin line, answer one result per line
    Serve {
        /// Requests processed at once
        #[arg(long, default_value_t = 16)]
        concurrency: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Logs go to a file; stdout carries results only
fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcp-toolbox started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcp-toolbox").join("gcp-toolbox.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcp-toolbox").join("gcp-toolbox.log");
    }
    PathBuf::from("gcp-toolbox.log")
}

/// File config with command-line overrides applied
fn effective_config(args: &Args) -> Config {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(path) = &args.credentials {
        config.credentials_file = Some(path.clone());
    }
    if let Some(secs) = args.timeout {
        config.request_timeout_secs = secs;
    }
    if let Some(n) = args.max_concurrent_scopes {
        config.max_concurrent_scopes = n;
    }
    config
}

fn build_registry(config: &Config, access_token: Option<&str>) -> Result<ToolRegistry> {
    let source: Arc<dyn CredentialSource> = match access_token {
        Some(token) => Arc::new(StaticTokenSource::new(token)),
        None => Arc::new(AdcSource::new(
            config.credentials_file.clone(),
            config.request_timeout(),
        )),
    };

    let client = GcpClient::new(config.endpoints(), config.request_timeout())
        .context("Failed to create GCP client")?;
    let services = Services::new(Arc::new(client), config.limits());

    ToolRegistry::with_default_tools(services, Arc::new(CredentialResolver::new(source)))
        .context("Failed to register tools")
}

#[derive(Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

async fn answer(registry: &ToolRegistry, line: &str) -> Envelope {
    match serde_json::from_str::<ToolCall>(line) {
        Ok(call) => registry.invoke(&call.tool, &call.arguments).await,
        Err(e) => Envelope::error(
            ErrorKind::InvalidInput,
            format!("malformed request line: {}", e),
        ),
    }
}

async fn serve(registry: Arc<ToolRegistry>, concurrency: usize) -> Result<()> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    let requests = stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read stdin: {}", e);
                None
            },
        }
    });

    // Answers are written in request order even though requests run concurrently
    let answers = requests
        .filter(|line| futures::future::ready(!line.trim().is_empty()))
        .map(|line| {
            let registry = Arc::clone(&registry);
            async move { answer(&registry, &line).await }
        })
        .buffered(concurrency.max(1));
    tokio::pin!(answers);

    let mut stdout = tokio::io::stdout();
    while let Some(envelope) = answers.next().await {
        let mut out = serde_json::to_vec(&envelope)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = effective_config(&args);
    let registry = build_registry(&config, args.access_token.as_deref())?;

    match &args.command {
        Command::Tools => {
            let catalog: Vec<Value> = registry.descriptors().iter().map(|t| t.to_json()).collect();
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        },
        Command::Call { tool, args: raw } => {
            let arguments: Value =
                serde_json::from_str(raw).context("--args must be a JSON object")?;
            let envelope = registry.invoke(tool, &arguments).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        },
        Command::Serve { concurrency } => {
            tracing::info!("Serving tool calls on stdio");
            serve(Arc::new(registry), *concurrency).await?;
        },
    }

    Ok(())
}
