//! Command-line front end for the user resource service.
//!
//! # Responsibility
//! - Map subcommands onto `ResourceService` operations over one SQLite file.
//! - Translate service error kinds into process exit codes.
//!
//! # Invariants
//! - Success output is the pretty-printed JSON result on stdout.
//! - Failure output goes to stderr only.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use userbase_core::db::open_db;
use userbase_core::{
    default_registry, init_logging, user_descriptor, ErrorKind, ResourceService, ServiceError,
    SqliteTable, USER_TABLE,
};

#[derive(Parser)]
#[command(name = "userbase", version, about = "User resource store")]
struct Cli {
    /// SQLite database file, created and migrated on first use
    #[arg(long, env = "USERBASE_DB")]
    db: PathBuf,

    /// Log level: trace|debug|info|warn|error|off
    #[arg(long, env = "USERBASE_LOG_LEVEL", default_value = userbase_core::default_log_level())]
    log_level: String,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, env = "USERBASE_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all users
    List,
    /// Show one user
    Get {
        /// User id
        id: String,
    },
    /// Create a user from a JSON payload
    Create {
        /// Payload, e.g. '{"email":"a@b.com"}'
        payload: String,
    },
    /// Replace a user; omitted optional fields are cleared
    Update {
        /// User id
        id: String,
        /// Full payload
        payload: String,
    },
    /// Change only the supplied fields of a user
    Patch {
        /// User id
        id: String,
        /// Partial payload
        payload: String,
    },
    /// Delete a user and print it
    Remove {
        /// User id
        id: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get { .. } => "get",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Patch { .. } => "patch",
            Self::Remove { .. } => "remove",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ServiceError>() {
            Some(service_err) => {
                report(service_err);
                ExitCode::from(exit_code(service_err.kind()))
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let table = SqliteTable::try_new(&conn, USER_TABLE).context("failed to bind users table")?;
    let service = ResourceService::new(table, &default_registry(), user_descriptor())?;

    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );
    let output = match &cli.command {
        Commands::List => Value::Array(service.find()?.into_iter().map(Value::Object).collect()),
        Commands::Get { id } => Value::Object(service.get(id)?),
        Commands::Create { payload } => Value::Object(service.create(&parse_payload(payload)?)?),
        Commands::Update { id, payload } => {
            Value::Object(service.update(id, &parse_payload(payload)?)?)
        }
        Commands::Patch { id, payload } => {
            Value::Object(service.patch(id, &parse_payload(payload)?)?)
        }
        Commands::Remove { id } => Value::Object(service.remove(id)?),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_payload(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("payload is not valid JSON")
}

fn report(err: &ServiceError) {
    match err {
        ServiceError::NotFound { code, id } => eprintln!("{code}: {id}"),
        _ => eprintln!("{}", err.code()),
    }
    for violation in err.violations() {
        eprintln!("  {violation}");
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::InvalidArgument => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Internal => 1,
    }
}
