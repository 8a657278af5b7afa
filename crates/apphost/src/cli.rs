use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use crate::config::load_or_create_config;
use crate::context::{decode_data, normalize_payload, UserSettings};
use crate::controls::{FormRecord, FormSnapshot, GridSnapshot, ViewReference};
use crate::error::{AppHostError, AppHostResult};
use crate::host::{AlertDialog, HostApi, NavigationError, NavigationOptions, PageInput};
use crate::launcher::{LaunchOutcome, Launcher};
use crate::storage::MemorySessionStorage;
use crate::window::Window;

const CLI_ORIGIN: &str = "https://localhost";

#[derive(Debug, Parser)]
#[command(
    name = "apphost",
    about = "Inspect app registrations and launch payloads for embedded Dynamics 365 pages",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered apps.
    Apps(ConfigArgs),

    /// Print the navigation request a launch would make.
    Encode(EncodeArgs),

    /// Decode a `data` parameter into its context and identity.
    Decode(DecodeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Directory holding apphost.json (created with defaults if missing).
    #[arg(long, default_value = ".")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// App id or name.
    #[arg(long)]
    pub app: String,

    #[arg(long)]
    pub entity: Option<String>,

    /// Selected record ids.
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<String>,

    /// Current view id of the grid.
    #[arg(long)]
    pub view: Option<String>,

    /// Record open on the form; launches from a form instead of a grid.
    #[arg(long, conflicts_with_all = ["ids", "view"])]
    pub record: Option<String>,

    #[arg(long, default_value = "")]
    pub user_id: String,

    #[arg(long, default_value = "")]
    pub user_name: String,
}

#[derive(Debug, Clone, Args)]
pub struct DecodeArgs {
    /// The percent-encoded `data` value.
    pub data: String,
}

pub async fn run_from_env() -> AppHostResult<()> {
    let cli = Cli::parse();
    run(cli).await
}

pub async fn run(cli: Cli) -> AppHostResult<()> {
    let output = match cli.command {
        Commands::Apps(args) => list_apps(&args)?,
        Commands::Encode(args) => encode(args).await?,
        Commands::Decode(args) => decode(&args)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn list_apps(args: &ConfigArgs) -> AppHostResult<Value> {
    let config = load_or_create_config(&args.config)?;
    let registry = config.registry();
    let apps: Vec<Value> = registry
        .ids()
        .iter()
        .filter_map(|id| registry.get(id))
        .map(|app| {
            json!({
                "id": app.id,
                "title": app.title,
                "resourceName": app.resource_name,
            })
        })
        .collect();
    Ok(Value::Array(apps))
}

/// Host that records the navigation instead of performing it.
struct CapturingHost {
    user: UserSettings,
    navigation: Mutex<Option<Value>>,
    alert: Mutex<Option<AlertDialog>>,
}

#[async_trait]
impl HostApi for CapturingHost {
    fn user_settings(&self) -> UserSettings {
        self.user.clone()
    }

    async fn navigate_to(
        &self,
        page: PageInput,
        options: NavigationOptions,
    ) -> Result<(), NavigationError> {
        let request = json!({ "pageInput": page, "navigationOptions": options });
        let mut navigation = self
            .navigation
            .lock()
            .map_err(|_| NavigationError::new("navigation capture poisoned"))?;
        *navigation = Some(request);
        Ok(())
    }

    async fn open_alert_dialog(&self, dialog: AlertDialog) {
        if let Ok(mut alert) = self.alert.lock() {
            *alert = Some(dialog);
        }
    }
}

async fn encode(args: EncodeArgs) -> AppHostResult<Value> {
    let config = load_or_create_config(&args.config.config)?;
    let host = Arc::new(CapturingHost {
        user: UserSettings {
            user_id: args.user_id,
            user_name: args.user_name,
            language_id: None,
        },
        navigation: Mutex::new(None),
        alert: Mutex::new(None),
    });
    let launcher = Launcher::new(
        Arc::new(config.registry()),
        config.launcher,
        host.clone(),
        Arc::new(MemorySessionStorage::new()),
        Window::top_level(CLI_ORIGIN),
    );

    let outcome = match args.record {
        Some(id) => {
            let form = FormSnapshot {
                record: Some(FormRecord {
                    entity_name: args.entity.unwrap_or_default(),
                    id,
                }),
            };
            launcher.launch_from_form(&args.app, &form).await
        }
        None => {
            let grid = GridSnapshot {
                entity_name: args.entity,
                view: args.view.map(|id| ViewReference { id, name: None }),
            };
            let selected = (!args.ids.is_empty()).then_some(args.ids.as_slice());
            launcher.launch(&args.app, None, Some(&grid), selected).await
        }
    };

    let alert = host
        .alert
        .lock()
        .ok()
        .and_then(|mut alert| alert.take())
        .map(|dialog| dialog.text);
    match outcome {
        LaunchOutcome::Navigated { .. } => host
            .navigation
            .lock()
            .map_err(|_| AppHostError::Internal("navigation capture poisoned".to_string()))?
            .take()
            .ok_or_else(|| AppHostError::Internal("no navigation recorded".to_string())),
        LaunchOutcome::UnknownApp { app_id } => Err(AppHostError::InvalidInput(
            alert.unwrap_or_else(|| format!("unknown app: {app_id}")),
        )),
        LaunchOutcome::NavigationFailed { message, .. } => {
            Err(AppHostError::Internal(alert.unwrap_or(message)))
        }
    }
}

fn decode(args: &DecodeArgs) -> AppHostResult<Value> {
    let payload = decode_data(&args.data)?;
    let normalized = normalize_payload(&payload);
    let identity = normalized.identity.map(|identity| {
        json!({ "userName": identity.user_name, "userGuid": identity.user_guid })
    });
    Ok(json!({
        "context": normalized.context,
        "identity": identity,
    }))
}
