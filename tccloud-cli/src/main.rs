use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use tccloud_core::provider::Provider;
use tccloud_core::resource::{Resource, ResourceId, State, Value};
use tccloud_core::schema::{ResourceSchema, SchemaKind};
use tccloud_provider_tencentcloud::TencentCloudProvider;
use tccloud_provider_tencentcloud::config::{
    ENV_DOMAIN, ENV_PROTOCOL, ENV_REGION, ENV_REQUEST_TIMEOUT, ENV_SECRET_ID, ENV_SECRET_KEY,
    ENV_SECURITY_TOKEN,
};
use tccloud_provider_tencentcloud::schemas;

#[derive(Parser)]
#[command(name = "tccloud")]
#[command(about = "Manage Tencent Cloud resources from JSON declarations", long_about = None)]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    /// Print sensitive attributes instead of masking them
    #[arg(long, global = true)]
    show_sensitive: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Provider arguments; each falls back to its `TENCENTCLOUD_*` variable
#[derive(Args)]
struct ProviderArgs {
    #[arg(long, global = true, env = ENV_SECRET_ID, hide_env_values = true)]
    secret_id: Option<String>,

    #[arg(long, global = true, env = ENV_SECRET_KEY, hide_env_values = true)]
    secret_key: Option<String>,

    #[arg(long, global = true, env = ENV_SECURITY_TOKEN, hide_env_values = true)]
    security_token: Option<String>,

    #[arg(long, global = true, env = ENV_REGION)]
    region: Option<String>,

    /// HTTP or HTTPS
    #[arg(long, global = true, env = ENV_PROTOCOL)]
    protocol: Option<String>,

    #[arg(long, global = true, env = ENV_DOMAIN)]
    domain: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = ENV_REQUEST_TIMEOUT)]
    request_timeout: Option<i64>,

    /// Send every request to this base URL instead of the regional hosts
    #[arg(long, global = true, hide = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported types, or describe the schema of one
    Schema {
        /// Resource or data source type
        resource_type: Option<String>,
    },
    /// Check a declaration against its schema without calling the cloud
    Validate {
        /// Path to the JSON declaration
        file: PathBuf,
    },
    /// Create the declared resource
    Create {
        /// Path to the JSON declaration
        file: PathBuf,
    },
    /// Read the current state of a resource
    Read {
        resource_type: String,
        identifier: String,
    },
    /// Bring an existing resource in line with a declaration
    Update {
        resource_type: String,
        identifier: String,
        /// Path to the JSON declaration
        file: PathBuf,

        /// State printed by `create --show-sensitive`; carries write-only values
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Delete a resource
    Delete {
        resource_type: String,
        identifier: String,

        /// State printed by `create`; supplies write-only values such as `force_delete`
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Run a data source query
    Data {
        /// Path to the JSON declaration
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let output = Output {
        show_sensitive: cli.show_sensitive,
    };

    let result = match cli.command {
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Validate { file } => run_validate(&file),
        Commands::Create { file } => run_create(&cli.provider, output, &file).await,
        Commands::Read {
            resource_type,
            identifier,
        } => run_read(&cli.provider, output, &resource_type, &identifier).await,
        Commands::Update {
            resource_type,
            identifier,
            file,
            state,
        } => {
            run_update(
                &cli.provider,
                output,
                &resource_type,
                &identifier,
                &file,
                state.as_deref(),
            )
            .await
        }
        Commands::Delete {
            resource_type,
            identifier,
            state,
        } => run_delete(&cli.provider, &resource_type, &identifier, state.as_deref()).await,
        Commands::Data { file } => run_data(&cli.provider, output, &file).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_provider(args: &ProviderArgs) -> Result<TencentCloudProvider, String> {
    let mut attributes = HashMap::new();
    let strings = [
        ("secret_id", &args.secret_id),
        ("secret_key", &args.secret_key),
        ("security_token", &args.security_token),
        ("region", &args.region),
        ("protocol", &args.protocol),
        ("domain", &args.domain),
        ("endpoint", &args.endpoint),
    ];
    for (key, value) in strings {
        if let Some(value) = value {
            attributes.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    if let Some(timeout) = args.request_timeout {
        attributes.insert("request_timeout".to_string(), Value::Int(timeout));
    }

    TencentCloudProvider::from_attributes(&attributes).map_err(|e| e.to_string())
}

/// A declaration file: `{"type": ..., "name": ..., "attributes": {...}}`
fn load_resource(path: &Path) -> Result<Resource, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_resource(&content).map_err(|e| format!("{}: {}", path.display(), e))
}

fn parse_resource(content: &str) -> Result<Resource, String> {
    let document: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;

    let resource_type = document
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("missing \"type\"")?;
    let name = document
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(resource_type);

    let mut resource = Resource::new(resource_type, name);
    resource.attributes = attributes_of(document.get("attributes"))?;
    resource.read_only = schemas::resource_schema(resource_type).is_none()
        && schemas::data_source_schema(resource_type).is_some();
    Ok(resource)
}

fn attributes_of(object: Option<&serde_json::Value>) -> Result<HashMap<String, Value>, String> {
    let Some(object) = object else {
        return Ok(HashMap::new());
    };
    let object = object.as_object().ok_or("\"attributes\" must be an object")?;

    let mut attributes = HashMap::new();
    for (key, value) in object {
        if let Some(value) = Value::from_json(value) {
            attributes.insert(key.clone(), value);
        }
    }
    Ok(attributes)
}

/// A state file as printed by `create`: attributes plus the identifier under `id`
fn load_state(path: &Path, id: ResourceId) -> Result<State, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("{}: invalid JSON: {}", path.display(), e))?;

    let mut attributes = attributes_of(Some(&document))?;
    let identifier = match attributes.remove("id") {
        Some(Value::String(identifier)) => identifier,
        _ => return Err(format!("{}: missing \"id\"", path.display())),
    };
    Ok(State::existing(id, attributes).with_identifier(identifier))
}

/// Add the write-only attributes of a saved state that a fresh read lacks
fn with_saved_write_only(mut state: State, saved: &State) -> State {
    if let Some(schema) = schemas::resource_schema(&state.id.resource_type) {
        schema.carry_write_only(&mut state.attributes, &saved.attributes);
    }
    state
}

fn lookup_schema(resource_type: &str) -> Result<ResourceSchema, String> {
    schemas::resource_schema(resource_type)
        .or_else(|| schemas::data_source_schema(resource_type))
        .ok_or_else(|| format!("Unknown resource type: {}", resource_type))
}

#[derive(Clone, Copy)]
struct Output {
    show_sensitive: bool,
}

impl Output {
    fn print_state(self, state: &State) -> Result<(), String> {
        let shown = match lookup_schema(&state.id.resource_type) {
            Ok(schema) if !self.show_sensitive => State {
                attributes: schema.redact(&state.attributes),
                ..state.clone()
            },
            _ => state.clone(),
        };
        let rendered = serde_json::to_string_pretty(&shown.to_json()).map_err(|e| e.to_string())?;
        println!("{}", rendered);
        Ok(())
    }
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let Some(resource_type) = resource_type else {
        let mut all = schemas::all_schemas();
        all.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        for schema in all {
            let kind = match schema.kind {
                SchemaKind::Resource => "resource",
                SchemaKind::DataSource => "data",
            };
            println!("{:<10} {}", kind.dimmed(), schema.resource_type);
        }
        return Ok(());
    };

    let schema = lookup_schema(resource_type)?;
    println!("{}", schema.resource_type.bold());
    if let Some(description) = &schema.description {
        println!("{}", description);
    }
    println!();

    let mut attributes: Vec<_> = schema.attributes.values().collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
    for attr in attributes {
        let mut flags = Vec::new();
        if attr.required {
            flags.push("required");
        } else if attr.computed && !attr.optional {
            flags.push("computed");
        } else {
            flags.push("optional");
        }
        if attr.force_new {
            flags.push("force_new");
        }
        if attr.sensitive {
            flags.push("sensitive");
        }
        if attr.write_only {
            flags.push("write_only");
        }
        println!(
            "  {} {} [{}]",
            attr.name.cyan(),
            attr.attr_type,
            flags.join(", ")
        );
        if let Some(description) = &attr.description {
            println!("      {}", description.dimmed());
        }
    }
    Ok(())
}

fn run_validate(path: &Path) -> Result<(), String> {
    let resource = load_resource(path)?;
    let schema = lookup_schema(&resource.id.resource_type)?;

    match schema.validate(&resource.attributes) {
        Ok(()) => {
            println!(
                "{} {}.{}",
                "✓".green(),
                resource.id.resource_type,
                resource.id.name
            );
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("  {} {}", "✗".red(), error);
            }
            Err(format!("{} validation error(s)", errors.len()))
        }
    }
}

async fn run_create(args: &ProviderArgs, output: Output, path: &Path) -> Result<(), String> {
    let resource = load_resource(path)?;
    if resource.is_data_source() {
        return Err(format!(
            "{} is a data source; use `tccloud data`",
            resource.id.resource_type
        ));
    }
    let provider = build_provider(args)?;

    let state = provider.create(&resource).await.map_err(|e| e.to_string())?;
    output.print_state(&state)
}

async fn run_read(
    args: &ProviderArgs,
    output: Output,
    resource_type: &str,
    identifier: &str,
) -> Result<(), String> {
    let provider = build_provider(args)?;
    let id = ResourceId::new(resource_type, resource_type);

    let state = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| e.to_string())?;
    if !state.exists {
        return Err(format!("{} {} not found", resource_type, identifier));
    }
    output.print_state(&state)
}

async fn run_update(
    args: &ProviderArgs,
    output: Output,
    resource_type: &str,
    identifier: &str,
    path: &Path,
    state_path: Option<&Path>,
) -> Result<(), String> {
    let resource = load_resource(path)?;
    if resource.id.resource_type != resource_type {
        return Err(format!(
            "{} declares {}, not {}",
            path.display(),
            resource.id.resource_type,
            resource_type
        ));
    }
    let provider = build_provider(args)?;

    let from = match state_path {
        Some(state_path) => load_state(state_path, resource.id.clone())?,
        None => provider
            .read(&resource.id, Some(identifier))
            .await
            .map_err(|e| e.to_string())?,
    };
    if !from.exists {
        return Err(format!(
            "{} {} not found",
            resource.id.resource_type, identifier
        ));
    }

    let state = provider
        .update(&resource.id, identifier, &from, &resource)
        .await
        .map_err(|e| e.to_string())?;
    output.print_state(&state)
}

async fn run_delete(
    args: &ProviderArgs,
    resource_type: &str,
    identifier: &str,
    state_path: Option<&Path>,
) -> Result<(), String> {
    let id = ResourceId::new(resource_type, resource_type);
    let saved = state_path
        .map(|state_path| load_state(state_path, id.clone()))
        .transpose()?;
    let provider = build_provider(args)?;

    let from = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| e.to_string())?;
    if !from.exists {
        println!("{} {} is already gone", resource_type, identifier);
        return Ok(());
    }
    let from = match &saved {
        Some(saved) => with_saved_write_only(from, saved),
        None => from,
    };

    provider
        .delete(&id, identifier, &from)
        .await
        .map_err(|e| e.to_string())?;
    println!("{} {} {}", "Deleted".green().bold(), resource_type, identifier);
    Ok(())
}

async fn run_data(args: &ProviderArgs, output: Output, path: &Path) -> Result<(), String> {
    let mut resource = load_resource(path)?;
    if schemas::data_source_schema(&resource.id.resource_type).is_none() {
        return Err(format!(
            "Unknown data source: {}",
            resource.id.resource_type
        ));
    }
    resource.read_only = true;
    let provider = build_provider(args)?;

    let state = provider
        .read_data_source(&resource)
        .await
        .map_err(|e| e.to_string())?;
    output.print_state(&state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource() {
        let resource = parse_resource(
            r#"{"type": "vpc", "name": "main", "attributes": {"name": "main", "cidr_block": "10.0.0.0/16", "is_multicast": false}}"#,
        )
        .unwrap();

        assert_eq!(resource.id, ResourceId::new("vpc", "main"));
        assert!(!resource.is_data_source());
        assert_eq!(
            resource.attributes.get("cidr_block"),
            Some(&Value::String("10.0.0.0/16".to_string()))
        );
        assert_eq!(resource.attributes.get("is_multicast"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_parse_data_source_declaration() {
        let resource =
            parse_resource(r#"{"type": "vpc_instances", "attributes": {"name": "main"}}"#).unwrap();

        assert!(resource.is_data_source());
        assert_eq!(resource.id.name, "vpc_instances");
    }

    #[test]
    fn test_parse_resource_rejects_bad_documents() {
        assert!(parse_resource("not json").is_err());
        assert!(parse_resource(r#"{"name": "x"}"#).is_err());
        assert!(parse_resource(r#"{"type": "vpc", "attributes": []}"#).is_err());
    }

    #[test]
    fn test_null_attributes_are_dropped() {
        let resource =
            parse_resource(r#"{"type": "vpc", "attributes": {"name": "a", "tags": null}}"#).unwrap();
        assert!(!resource.attributes.contains_key("tags"));
    }

    #[test]
    fn test_load_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"id": "app-1:tcaplus-2", "description": "x", "reserved_volume": 0}"#,
        )
        .unwrap();

        let state = load_state(&path, ResourceId::new("tcaplus_table", "t")).unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("app-1:tcaplus-2"));
        assert!(!state.attributes.contains_key("id"));
        assert_eq!(state.attributes.get("reserved_volume"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_load_state_requires_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"name": "x"}"#).unwrap();

        assert!(load_state(&path, ResourceId::new("vpc", "v")).is_err());
    }

    #[test]
    fn test_saved_state_supplies_force_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.json");
        fs::write(
            &path,
            r#"{"id": "disk-1", "storage_name": "old-name", "force_delete": true}"#,
        )
        .unwrap();
        let id = ResourceId::new("cbs_storage", "cbs_storage");
        let saved = load_state(&path, id.clone()).unwrap();

        let mut attrs = HashMap::new();
        attrs.insert("storage_name".to_string(), Value::String("data".to_string()));
        let read = State::existing(id, attrs).with_identifier("disk-1");

        let from = with_saved_write_only(read, &saved);
        assert_eq!(from.attributes.get("force_delete"), Some(&Value::Bool(true)));
        assert_eq!(
            from.attributes.get("storage_name"),
            Some(&Value::String("data".to_string()))
        );
    }

    #[test]
    fn test_lookup_schema() {
        assert!(lookup_schema("vpc").is_ok());
        assert!(lookup_schema("cbs_snapshots").is_ok());
        assert!(lookup_schema("s3_bucket").is_err());
    }
}
