use addressimo_admin::{
    AdminConfig, DetailController, DetailViewState, GenericApiService, ListController,
    ListViewState, PageLocation, ResourceRecord,
};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "addressimo-admin")]
#[command(about = "List, view, create, update and delete addressimo id objects")]
pub struct AdminCli {
    /// Page location the admin would be served from (overrides ADDRESSIMO_ADMIN_LOCATION)
    #[arg(long, global = true)]
    pub location: Option<String>,
    /// Host treated as local development (overrides ADDRESSIMO_ADMIN_LOOPBACK_HOST)
    #[arg(long, global = true)]
    pub loopback_host: Option<String>,
    /// API port used when the location is the loopback host (overrides ADDRESSIMO_ADMIN_DEV_PORT)
    #[arg(long, global = true)]
    pub dev_port: Option<u16>,
    /// Render the view state as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all id object ids
    List,
    /// Show one id object (defaults to the `id` query parameter of --location)
    Show { id: Option<String> },
    /// Create a new id object
    Create(EditArgs),
    /// Load an id object, apply edits and save it
    Update {
        id: String,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// Delete an id object
    Delete { id: String },
    /// Delete the private key of an id object
    DeletePrivkey { id: String },
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// Field assignment; VALUE is parsed as JSON, falling back to a plain string
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    /// Full JSON object merged into the record before the --set assignments
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,
}

impl EditArgs {
    fn apply(&self, controller: &mut DetailController) -> Result<()> {
        if let Some(raw) = &self.data {
            let value: Value = serde_json::from_str(raw).context("--data must be valid JSON")?;
            let Ok(patch) = ResourceRecord::try_from(value) else {
                bail!("--data must be a JSON object");
            };
            let mut data = controller.state().data;
            data.merge(patch);
            controller.set_data(data);
        }
        for assignment in &self.set {
            let (key, value) = parse_assignment(assignment)?;
            controller.set_field(key, value);
        }
        Ok(())
    }
}

/// What a command leaves behind for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    List(ListViewState),
    Detail(DetailViewState),
}

impl View {
    #[must_use]
    pub fn has_error(&self) -> bool {
        match self {
            Self::List(state) => state.error_message.is_some(),
            Self::Detail(state) => state.error_message.is_some(),
        }
    }
}

pub fn resolve_config(cli: &AdminCli) -> Result<AdminConfig> {
    let mut config = AdminConfig::from_env().context("invalid admin environment")?;
    if let Some(location) = &cli.location {
        config.location = PageLocation::parse(location).context("invalid --location")?;
    }
    if let Some(loopback_host) = &cli.loopback_host {
        config.policy.loopback_host = loopback_host.trim().to_string();
    }
    if let Some(dev_port) = cli.dev_port {
        if dev_port == 0 {
            bail!("--dev-port must be between 1 and 65535");
        }
        config.policy.dev_port = dev_port;
    }
    Ok(config)
}

/// Exit status for a view that ended in an error.
pub const EXIT_VIEW_ERROR: u8 = 1;
/// Exit status for invalid arguments or configuration.
pub const EXIT_INVALID_INVOCATION: u8 = 2;

/// Resolves configuration and runs the command.
pub async fn execute(cli: &AdminCli) -> Result<View> {
    let config = resolve_config(cli)?;
    run(cli, &config).await
}

#[must_use]
pub fn exit_status(outcome: &Result<View>) -> u8 {
    match outcome {
        Ok(view) if view.has_error() => EXIT_VIEW_ERROR,
        Ok(_) => 0,
        Err(_) => EXIT_INVALID_INVOCATION,
    }
}

pub async fn run(cli: &AdminCli, config: &AdminConfig) -> Result<View> {
    let api = GenericApiService::with_reqwest(config.resolver());
    tracing::debug!(?config, "admin target configured");

    let view = match &cli.command {
        Commands::List => View::List(ListController::open(api).await.state()),
        Commands::Show { id } => {
            let id = id
                .as_deref()
                .or_else(|| config.location.query_param("id"));
            View::Detail(DetailController::open(api, id).await.state())
        }
        Commands::Create(edit) => {
            let mut controller = DetailController::new(api);
            edit.apply(&mut controller)?;
            controller.save().await;
            View::Detail(controller.state())
        }
        Commands::Update { id, edit } => {
            let mut controller = DetailController::open(api, Some(id.as_str())).await;
            if controller.state().error_message.is_none() {
                edit.apply(&mut controller)?;
                controller.save().await;
            }
            View::Detail(controller.state())
        }
        Commands::Delete { id } => {
            let mut controller = controller_for(api, id)?;
            controller.delete_resource().await;
            View::Detail(controller.state())
        }
        Commands::DeletePrivkey { id } => {
            let mut controller = controller_for(api, id)?;
            controller.delete_private_key().await;
            View::Detail(controller.state())
        }
    };
    Ok(view)
}

fn controller_for(api: GenericApiService, id: &str) -> Result<DetailController> {
    let id = id.trim();
    if id.is_empty() {
        bail!("id must not be empty");
    }
    let mut controller = DetailController::new(api);
    controller.set_field("id", Value::String(id.to_string()));
    Ok(controller)
}

pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got `{raw}`");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("missing field name in `{raw}`");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub fn render(view: &View, json: bool) -> Result<String> {
    if json {
        let encoded = match view {
            View::List(state) => serde_json::to_string_pretty(state)?,
            View::Detail(state) => serde_json::to_string_pretty(state)?,
        };
        return Ok(encoded);
    }

    let mut lines = Vec::new();
    match view {
        View::List(state) => {
            push_error(&mut lines, state.error_message.as_deref());
            if let Some(keys) = &state.keys {
                if keys.is_empty() {
                    lines.push("(no id objects)".to_string());
                }
                lines.extend(keys.iter().cloned());
            }
        }
        View::Detail(state) => {
            if let Some(message) = &state.message {
                lines.push(format!("message: {message}"));
            }
            push_error(&mut lines, state.error_message.as_deref());
            for (key, value) in state.data.display_fields() {
                lines.push(format!("{key}: {}", display_value(value)));
            }
        }
    }
    Ok(lines.join("\n"))
}

fn push_error(lines: &mut Vec<String>, error_message: Option<&str>) {
    if let Some(error) = error_message {
        lines.push(format!("error: {error}"));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}
