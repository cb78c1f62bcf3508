//! rehttp - send one HTTP request, retrying transient failures.
//!
//! ```text
//! rehttp -X POST --json -d '{"name":"Nori"}' https://httpbin.org/status/200,500
//! ```
//!
//! Settings come from defaults, then `--config`, then `REHTTP_*` variables,
//! then the flags below. The status line goes to stdout, followed by the body.

use clap::Parser;
use colored::Colorize;
use http::Method;
use rehttp_config::{ClientSettings, SettingsLoader, Validate};
use rehttp_transport::{CancelToken, HttpClient};
use std::io::Write;
use std::path::PathBuf;

mod error;

use error::{CliError, CliResult};

/// Send an HTTP request with retries and jittered exponential backoff
#[derive(Parser, Debug)]
#[command(name = "rehttp")]
#[command(version)]
#[command(about = "Send an HTTP request with retries and jittered exponential backoff")]
struct Args {
    /// Request URL
    url: String,

    /// HTTP method (defaults to GET, or POST when --data is given)
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Extra header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Send the body as JSON
    #[arg(long)]
    json: bool,

    /// Settings file (JSON, TOML or .env)
    #[arg(long, env = "REHTTP_CONFIG")]
    config: Option<PathBuf>,

    /// Retries allowed after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,

    /// Backoff base in milliseconds
    #[arg(long)]
    backoff_base_ms: Option<u64>,

    /// Backoff ceiling in milliseconds
    #[arg(long)]
    backoff_cap_ms: Option<u64>,

    /// Overall timeout in seconds, retries included
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log every attempt
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Args {
    fn request_method(&self) -> CliResult<Method> {
        match &self.method {
            Some(name) => Method::from_bytes(name.to_uppercase().as_bytes())
                .map_err(|_| CliError::InvalidArgument(format!("method {:?}", name))),
            None if self.data.is_some() => Ok(Method::POST),
            None => Ok(Method::GET),
        }
    }

    fn settings(&self) -> CliResult<ClientSettings> {
        let mut loader = SettingsLoader::new();
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        let mut settings = loader.load()?;

        if let Some(n) = self.max_retries {
            settings.max_additional_attempts = n;
        }
        if let Some(ms) = self.backoff_base_ms {
            settings.backoff_base_ms = ms;
        }
        if let Some(ms) = self.backoff_cap_ms {
            settings.backoff_cap_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            settings.timeout_secs = secs;
        }
        settings.validate()?;
        Ok(settings)
    }

    fn parsed_headers(&self) -> CliResult<Vec<(String, String)>> {
        self.headers.iter().map(|h| parse_header(h)).collect()
    }
}

fn parse_header(raw: &str) -> CliResult<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "header {:?} must look like `Name: value`",
            raw
        ))),
    }
}

async fn run(args: Args) -> CliResult<()> {
    let method = args.request_method()?;
    let headers = args.parsed_headers()?;
    let settings = args.settings()?;
    tracing::debug!(?settings, "Loaded settings");

    if args.json
        && let Some(data) = &args.data
    {
        serde_json::from_str::<serde_json::Value>(data)
            .map_err(|e| CliError::InvalidArgument(format!("--data is not valid JSON: {}", e)))?;
    }

    let client = HttpClient::new(settings.to_client_config())?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_interrupt.cancel()) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let mut request = client.request(method, args.url.as_str()).cancel_token(cancel);
    if args.json {
        request = request.header("Content-Type", "application/json");
    }
    for (name, value) in headers {
        request = request.header(name, value);
    }
    if let Some(data) = args.data {
        request = request.body(data);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", status)?;
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let mut log_config = rehttp_log::config().clone();
    if args.verbose {
        log_config = log_config.verbose();
    }
    if args.no_color {
        log_config.color = false;
    }
    let _ = rehttp_log::try_init_with(&log_config);

    if let Err(e) = run(args).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}
