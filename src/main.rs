#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use forms_client::config::Config;
use forms_client::domain::filter::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, FormFilter};
use forms_client::domain::form::FormStatus;
use forms_client::domain::posture::{AccelerometerReading, PostureClassifier};
use forms_client::{AppError, ClientBuilder, FormsClient, telemetry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::Instrument;

#[derive(Debug, Parser)]
#[command(name = "forms-cli", version, about = "Command line client for the forms backend")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with a password and persist the session
    Login {
        username: String,
        #[arg(long, env = "FORMS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show whether a usable session exists, refreshing it if needed
    Status,
    /// Query and manage forms
    #[command(subcommand)]
    Forms(FormsCommand),
    /// List form categories
    Categories,
    /// Classify posture from a file of `x,y,z` accelerometer samples (in g)
    Posture { file: PathBuf },
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::Status => "status",
            Self::Forms(FormsCommand::List(_)) => "forms list",
            Self::Forms(FormsCommand::Get { .. }) => "forms get",
            Self::Forms(FormsCommand::Delete { .. }) => "forms delete",
            Self::Categories => "categories",
            Self::Posture { .. } => "posture",
        }
    }
}

#[derive(Debug, Subcommand)]
enum FormsCommand {
    List(FilterArgs),
    Get { id: i64 },
    Delete { id: i64 },
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long)]
    category_id: Option<i64>,
    #[arg(long)]
    status: Option<FormStatus>,
    /// Lower bound on creation time (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    from: Option<OffsetDateTime>,
    /// Upper bound on creation time (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    to: Option<OffsetDateTime>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    created_by: Option<String>,
    #[arg(long)]
    min_score: Option<i32>,
    #[arg(long)]
    max_score: Option<i32>,
    #[arg(long)]
    order_by: Option<String>,
    #[arg(long)]
    desc: bool,
    #[arg(long, default_value_t = DEFAULT_PAGE)]
    page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

impl From<FilterArgs> for FormFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            category_id: args.category_id,
            status: args.status,
            from_date: args.from,
            to_date: args.to,
            title: args.title,
            created_by: args.created_by,
            min_score: args.min_score,
            max_score: args.max_score,
            order_by: args.order_by,
            descending: args.desc,
            page: args.page,
            page_size: args.page_size,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus {
    authenticated: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    expires_at: Option<OffsetDateTime>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostureReport {
    posture: forms_client::domain::posture::Posture,
    tilt_degrees: Option<f64>,
    samples: usize,
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    std::io::Write::write_all(&mut out, b"\n")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry_guard = telemetry::init_telemetry(&cli.config.telemetry)?;

    let span = tracing::info_span!("forms_cli", command = cli.command.name());
    let result = run(cli).instrument(span).await;

    if let Err(e) = &result {
        match e.downcast_ref::<AppError>() {
            Some(app_error) => {
                tracing::error!(error = %app_error, kind = ?app_error.kind(), "{}", app_error.user_message());
            }
            None => tracing::error!(error = %e, "Command failed"),
        }
    }

    telemetry_guard.shutdown();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli { config, command } = cli;
    match command {
        Command::Posture { file } => classify_posture(&file).await,
        Command::Login { username, password } => {
            let token = connect(&config).await?.auth.login(&username, &password).await?;
            emit(&SessionStatus { authenticated: true, expires_at: Some(token.expires_at) })
        }
        Command::Logout => {
            connect(&config).await?.auth.logout().await?;
            emit(&SessionStatus { authenticated: false, expires_at: None })
        }
        Command::Status => status(&connect(&config).await?).await,
        Command::Forms(FormsCommand::List(args)) => {
            emit(&connect(&config).await?.forms.query(&FormFilter::from(args)).await?)
        }
        Command::Forms(FormsCommand::Get { id }) => emit(&connect(&config).await?.forms.get(id).await?),
        Command::Forms(FormsCommand::Delete { id }) => {
            connect(&config).await?.forms.delete(id).await?;
            emit(&serde_json::json!({ "deleted": id }))
        }
        Command::Categories => emit(&connect(&config).await?.categories.list().await?),
    }
}

/// Client over the persisted session; only the network commands need one.
async fn connect(config: &Config) -> anyhow::Result<FormsClient> {
    let client = ClientBuilder::from_config(config).build()?;
    client.auth.restore_session().await?;
    Ok(client)
}

async fn status(client: &FormsClient) -> anyhow::Result<()> {
    let token = client.auth.valid_token().await;
    emit(&SessionStatus { authenticated: token.is_some(), expires_at: token.map(|t| t.expires_at) })
}

async fn classify_posture(file: &Path) -> anyhow::Result<()> {
    let contents =
        tokio::fs::read_to_string(file).await.with_context(|| format!("reading samples from {}", file.display()))?;

    let mut classifier = PostureClassifier::default();
    let mut samples = 0;
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let reading = parse_reading(line).with_context(|| format!("line {}: {line:?}", index + 1))?;
        classifier.push(reading);
        samples += 1;
    }

    emit(&PostureReport { posture: classifier.classify(), tilt_degrees: classifier.tilt_degrees(), samples })
}

fn parse_reading(line: &str) -> anyhow::Result<AccelerometerReading> {
    let values = line.split(',').map(|v| v.trim().parse::<f64>()).collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, z] => Ok(AccelerometerReading::new(*x, *y, *z)),
        _ => anyhow::bail!("expected three comma-separated values"),
    }
}
