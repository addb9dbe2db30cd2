//! mediagate: command-line front end of the media file workflow.
//!
//! Reads DATABASE_URL, MEDIA_ROOT, MEDIA_PUBLIC_PREFIX and FFPROBE_PATH from
//! the environment (or `.env`). Every command acts as the identity named by
//! `--as`; create the first one with `mediagate identity create`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediagate_cli::{output, telemetry::init_telemetry};
use mediagate_core::{AppError, Config, ErrorMetadata, Identity, LogLevel, Role};
use mediagate_db::{setup_database, PostgresRecordStore, RecordStore};
use mediagate_processing::FfprobeExtractor;
use mediagate_storage::LocalFileStore;
use mediagate_workflow::{Engine, EngineSettings, Outcome, Upload};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mediagate", about = "Media file workflow with approval")]
struct Cli {
    /// Name of the acting identity
    #[arg(long = "as", global = true, env = "MEDIAGATE_IDENTITY")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new file
    Add {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// Replace the file with the same name, or add it if there is none
    Replace {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// Delete a file, or propose its deletion
    Delete {
        /// Record UUID
        id: Uuid,
    },
    /// Approve the pending change of a record
    Apply {
        /// Record UUID
        id: Uuid,
    },
    /// Discard the pending change of a record
    Reject {
        /// Record UUID
        id: Uuid,
    },
    /// List records, newest first
    List,
    /// Identity management
    Identity {
        #[command(subcommand)]
        sub: IdentityCommands,
    },
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// Create an identity
    Create {
        name: String,
        /// privileged or standard
        #[arg(long, default_value = "standard")]
        role: Role,
        #[arg(long, env = "MEDIAGATE_CREDENTIAL", hide_env_values = true)]
        credential: String,
    },
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Print an engine result and pick the exit code for it.
fn report(result: Result<Outcome, AppError>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(outcome) => {
            print_json(&output::outcome(&outcome))?;
            Ok(if outcome.is_done() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Err(err) => {
            log_fault(&err);
            print_json(&output::fault(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn log_fault(err: &AppError) {
    let details = err.detailed_message();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error_type = err.error_type(), "{}", details),
        LogLevel::Warn => tracing::warn!(error_type = err.error_type(), "{}", details),
        LogLevel::Error => tracing::error!(error_type = err.error_type(), "{}", details),
    }
}

async fn acting_identity(
    records: &dyn RecordStore,
    name: Option<&str>,
) -> anyhow::Result<Identity> {
    let name = name.context("No acting identity: pass --as <name> or set MEDIAGATE_IDENTITY")?;
    records
        .find_identity_by_name(name)
        .await?
        .with_context(|| format!("Unknown identity: {}", name))
}

/// Cancel `token` on Ctrl-C so a waiting or uploading command stops cleanly.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}

async fn create_identity(
    records: &dyn RecordStore,
    name: &str,
    role: Role,
    credential: &str,
) -> anyhow::Result<ExitCode> {
    let identity = Identity::new(name, credential, role);
    records.create_identity(&identity).await?;
    tracing::info!(identity_id = %identity.id, name = %identity.name, "Identity created");
    print_json(&output::identity(&identity))?;
    Ok(ExitCode::SUCCESS)
}

async fn build_engine(config: &Config, records: Arc<PostgresRecordStore>) -> anyhow::Result<Engine> {
    let files = LocalFileStore::new(&config.media_root)
        .await
        .with_context(|| format!("Cannot open media root {}", config.media_root.display()))?;
    let extractor = FfprobeExtractor::new(config.ffprobe_path.as_str())?;

    Ok(Engine::with_settings(
        Arc::new(files),
        records,
        Arc::new(extractor),
        EngineSettings {
            public_prefix: config.public_prefix.clone(),
            ..EngineSettings::default()
        },
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    init_telemetry(&config);

    let pool = setup_database(&config).await?;
    let records = Arc::new(PostgresRecordStore::new(pool));

    let engine = build_engine(&config, records.clone()).await?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let result = match cli.command {
        Commands::Identity {
            sub: IdentityCommands::Create { name, role, credential },
        } => return create_identity(records.as_ref(), &name, role, &credential).await,
        Commands::List => match engine.list(&cancel).await {
            Ok(list) => {
                print_json(&output::records(&list, |key| engine.public_path(key)))?;
                return Ok(ExitCode::SUCCESS);
            }
            Err(err) => Err(err),
        },
        Commands::Add { file } => {
            let actor = acting_identity(records.as_ref(), cli.actor.as_deref()).await?;
            match Upload::from_path(&file).await {
                Ok(upload) => engine.add(upload, &actor, &cancel).await,
                Err(err) => Err(err),
            }
        }
        Commands::Replace { file } => {
            let actor = acting_identity(records.as_ref(), cli.actor.as_deref()).await?;
            match Upload::from_path(&file).await {
                Ok(upload) => engine.replace(upload, &actor, &cancel).await,
                Err(err) => Err(err),
            }
        }
        Commands::Delete { id } => {
            let actor = acting_identity(records.as_ref(), cli.actor.as_deref()).await?;
            engine.delete(id, &actor, &cancel).await
        }
        Commands::Apply { id } => {
            let actor = acting_identity(records.as_ref(), cli.actor.as_deref()).await?;
            engine.apply(id, &actor, &cancel).await
        }
        Commands::Reject { id } => {
            let actor = acting_identity(records.as_ref(), cli.actor.as_deref()).await?;
            engine.reject(id, &actor, &cancel).await
        }
    };

    report(result)
}
