use crate::config::ValidatorOptions;
use crate::errors::ValidationError;
use crate::logging;
use crate::spec::load_contract;
use crate::Validator;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use http::{Method, Request, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Command-line interface for the contract validator
#[derive(Parser, Debug)]
#[command(name = "brrtv")]
#[command(about = "Validate HTTP traffic against an OpenAPI contract", long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a recorded request/response exchange
    Check {
        /// Path to the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// JSON file holding the recorded exchange
        #[arg(short, long)]
        exchange: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Treat undeclared query parameters as failures
        #[arg(long, default_value_t = false)]
        strict_query: bool,
    },
    /// List the operations of a contract
    Routes {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Resolve a method and path to a path template
    Resolve {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(short, long)]
        path: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// An exchange captured from live traffic.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedExchange {
    pub request: RecordedRequest,
    #[serde(default)]
    pub response: Option<RecordedResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValues>,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValues>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// A header recorded once or repeated.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    fn values(&self) -> &[String] {
        match self {
            HeaderValues::One(v) => std::slice::from_ref(v),
            HeaderValues::Many(vs) => vs,
        }
    }
}

fn body_bytes(body: Option<&Value>) -> Result<Vec<u8>> {
    match body {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.as_bytes().to_vec()),
        Some(other) => serde_json::to_vec(other).context("failed to serialize recorded body"),
    }
}

impl RecordedExchange {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read exchange file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse exchange file {}", path.display()))
    }

    pub fn to_request(&self) -> Result<Request<Vec<u8>>> {
        let method = Method::from_bytes(self.request.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid method '{}'", self.request.method))?;
        let mut builder = Request::builder().method(method).uri(self.request.path.as_str());
        for (name, values) in &self.request.headers {
            for value in values.values() {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder
            .body(body_bytes(self.request.body.as_ref())?)
            .context("invalid recorded request")
    }

    pub fn to_response(&self) -> Result<Option<Response<Vec<u8>>>> {
        let Some(recorded) = &self.response else {
            return Ok(None);
        };
        let mut builder = Response::builder().status(recorded.status);
        for (name, values) in &recorded.headers {
            for value in values.values() {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder
            .body(body_bytes(recorded.body.as_ref())?)
            .map(Some)
            .context("invalid recorded response")
    }
}

fn write_failures(
    out: &mut dyn Write,
    format: OutputFormat,
    errors: &[ValidationError],
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, errors)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for err in errors {
                let category = err.error_category.as_ref().map_or("", |c| c.as_str());
                writeln!(out, "[{category}] {err}")?;
                if !err.how_to_fix.is_empty() {
                    writeln!(out, "    fix: {}", err.how_to_fix)?;
                }
            }
        }
    }
    Ok(())
}

/// Runs a parsed command, writing results to `out`.
///
/// Returns `Ok(false)` when validation or resolution failed.
///
/// # Errors
///
/// Fails when the contract or exchange cannot be read.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<bool> {
    match &cli.command {
        Commands::Check {
            spec,
            exchange,
            format,
            strict_query,
        } => {
            let contract = load_contract(spec)?;
            let mut options = ValidatorOptions::from_env();
            options.reject_undeclared_query_params |= *strict_query;
            let validator = Validator::with_options(contract, options);

            let recorded = RecordedExchange::from_path(exchange)?;
            let request = recorded.to_request()?;
            let (ok, errors) = match recorded.to_response()? {
                Some(response) => validator.validate_exchange(&request, &response),
                None => validator.validate_request(&request),
            };

            if ok && *format == OutputFormat::Text {
                let (method, uri) = (request.method(), request.uri());
                writeln!(out, "✅ {method} {uri} conforms to the contract")?;
            } else {
                write_failures(out, *format, &errors)?;
            }
            Ok(ok)
        }
        Commands::Routes { spec, format } => {
            let contract = load_contract(spec)?;
            let validator = Validator::new(contract);
            let lines = validator.router().route_lines();
            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut *out, &lines)?;
                    writeln!(out)?;
                }
                OutputFormat::Text => {
                    for line in &lines {
                        writeln!(out, "{line}")?;
                    }
                }
            }
            Ok(true)
        }
        Commands::Resolve {
            spec,
            method,
            path,
            format,
        } => {
            let contract = load_contract(spec)?;
            let validator = Validator::new(contract);
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid method '{method}'"))?;
            match validator.router().resolve(&method, path) {
                Ok(matched) => {
                    let params: BTreeMap<&str, &str> = matched
                        .path_params
                        .iter()
                        .map(|(k, v)| (k.as_ref(), v.as_str()))
                        .collect();
                    match format {
                        OutputFormat::Json => {
                            let report = serde_json::json!({
                                "method": method.as_str(),
                                "path": path,
                                "template": &*matched.template,
                                "operationId": matched.operation.operation_id,
                                "pathParams": params,
                            });
                            serde_json::to_writer_pretty(&mut *out, &report)?;
                            writeln!(out)?;
                        }
                        OutputFormat::Text => {
                            writeln!(out, "{method} {path} -> {}", matched.template)?;
                            for (name, value) in &params {
                                writeln!(out, "    {name} = {value}")?;
                            }
                        }
                    }
                    Ok(true)
                }
                Err(err) => {
                    write_failures(out, *format, std::slice::from_ref(&err))?;
                    Ok(false)
                }
            }
        }
    }
}

/// Entry point of the `brrtv` binary.
pub fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(cli.verbose.then_some("debug")) {
        eprintln!("warning: {e:#}");
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(&cli, &mut out) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
