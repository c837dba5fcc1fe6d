//! SharePoint services command-line client.
//!
//! Run with: `sp-services --fixture site.yaml groups --login 'DOMAIN\test.user'`
//!
//! Answers come from a replay fixture; records are printed as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sp_services::{
    FieldVersion, Group, ReplayTransport, Results, SpServices, SpServicesConfig, Transport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Query SharePoint user, group and version services.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Replay fixture with recorded responses (overrides `replay.fixture`)
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up the current user
    CurrentUser {
        /// Comma-separated field names (default: configured set)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
    /// List the groups a user belongs to
    Groups {
        /// User login name, e.g. DOMAIN\user
        #[arg(long)]
        login: String,
    },
    /// Show the version history of a list item field
    Versions {
        /// List id or name
        #[arg(long)]
        list: String,
        /// List item id
        #[arg(long)]
        item: String,
        /// Internal field name
        #[arg(long)]
        field: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays valid JSON
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting sp-services v{}", env!("CARGO_PKG_VERSION"));

    let config = if args.config.exists() {
        info!("Config file: {}", args.config.display());
        SpServicesConfig::from_file(&args.config).context("Failed to load config file")?
    } else {
        info!("Config file not found, using defaults");
        SpServicesConfig::default()
    };

    let fixture = args
        .fixture
        .clone()
        .or_else(|| config.replay.fixture.clone())
        .context("No replay fixture given; pass --fixture or set replay.fixture")?;
    let transport = ReplayTransport::from_file(&fixture)
        .with_context(|| format!("Failed to load fixture {}", fixture.display()))?
        .with_async_completion(config.replay.async_completion);
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let services = SpServices::with_config(config, Some(transport));

    let output = match args.command {
        Command::CurrentUser { fields } => {
            let names: Option<Vec<&str>> = fields
                .as_ref()
                .map(|fields| fields.iter().map(String::as_str).collect());
            let user = services
                .get_current_user(names.as_deref())
                .context("Current user lookup failed")?;
            serde_json::to_value(user)?
        }
        Command::Groups { login } => {
            let (tx, rx) = oneshot::channel();
            let dispatch = services
                .get_group_collection_from_user(
                    &login,
                    Results::<Group>::callback(move |response, status| {
                        let _ = tx.send((response, status));
                    }),
                )
                .context("Group lookup failed")?;
            info!(?dispatch, "Group lookup dispatched");
            let (response, status) = rx.await.context("Transport dropped the completion")?;
            info!(status = %status, "Group lookup completed");
            serde_json::to_value(Group::collect_from(&response)?)?
        }
        Command::Versions { list, item, field } => {
            let (tx, rx) = oneshot::channel();
            let dispatch = services
                .get_version_collection(
                    &list,
                    &item,
                    &field,
                    Results::<FieldVersion>::callback(move |response, status| {
                        let _ = tx.send((response, status));
                    }),
                )
                .context("Version lookup failed")?;
            if !dispatch.is_sent() {
                anyhow::bail!("Version lookup not sent: {:?}", dispatch);
            }
            let (response, status) = rx.await.context("Transport dropped the completion")?;
            info!(status = %status, "Version lookup completed");
            let versions = FieldVersion::collect_from(&response, &field)?;
            serde_json::Value::Array(versions.iter().map(version_json).collect())
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// A version with its derived fields alongside the raw ones.
fn version_json(version: &FieldVersion) -> serde_json::Value {
    serde_json::json!({
        "value": version.value,
        "modified": version.modified,
        "editor": version.editor,
        "modifiedEpochMillis": version.modified_epoch_millis(),
        "editorId": version.editor_id(),
        "editorDescriptor": version.editor_descriptor(),
    })
}
