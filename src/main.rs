use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use nested_params::demo::{self, DemoSchemas};
use nested_params::form::{self, FieldNamer};
use nested_params::{AttributeSet, Entity, NestedParamsConfig, Record, SaveGuard, Session};
use serde_json::{Value as Json, json};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nested-params")]
#[command(about = "Apply nested params to the demo project graph")]
struct Cli {
    /// JSON file overriding the naming conventions
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed a project, apply a params document to it and save
    Apply {
        #[arg(long)]
        params: PathBuf,
        /// The params file holds `name=value` form lines instead of JSON
        #[arg(long)]
        form: bool,
        /// Fail on validation errors instead of reporting them
        #[arg(long)]
        strict: bool,
    },
    /// Print the form field names for the seeded project
    Fields,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let session = Session::in_memory();
    let schemas = demo::schemas();
    let project = demo::seed_project(&session, &schemas)
        .await
        .context("failed to seed the demo project")?;

    match cli.command {
        Command::Apply {
            params,
            form,
            strict,
        } => apply(&session, &schemas, project, &params, form, strict, &config).await,
        Command::Fields => {
            print_fields(&project, &config);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<NestedParamsConfig> {
    let Some(path) = path else {
        return Ok(NestedParamsConfig::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(NestedParamsConfig::from_json(&raw)?)
}

async fn apply(
    session: &Session,
    schemas: &DemoSchemas,
    mut project: Record,
    path: &Path,
    form: bool,
    strict: bool,
    config: &NestedParamsConfig,
) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let document = if form {
        let pairs: Vec<(&str, &str)> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split_once('=').unwrap_or((line, "")))
            .collect();
        form::decode_fields(pairs)?
    } else {
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    };
    let document = unwrap_root(document, schemas.project.name());

    let params = AttributeSet::from_json(&document, &schemas.project, config)?;
    project.assign_attributes(&params, config)?;

    let guard = SaveGuard::new(session);
    let outcome = if strict {
        guard.save_strict(&mut project).await?;
        None
    } else {
        Some(guard.attempt(&mut project, true).await)
    };

    let id = project
        .id()
        .ok_or_else(|| anyhow!("seeded project lost its id"))?;
    let stored = Record::find(session, schemas.project.clone(), id).await?;

    let report = json!({
        "state": outcome.as_ref().map_or("COMMITTED".to_string(), |o| o.state.to_string()),
        "error": outcome.and_then(|o| o.error).map(|e| e.to_string()),
        "errors": project.errors().full_messages(),
        "project": project.to_json(),
        "stored": stored.to_json(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Accepts both `{"name": ..}` and `{"project": {"name": ..}}`.
fn unwrap_root(document: Json, root: &str) -> Json {
    match document {
        Json::Object(mut map) if map.len() == 1 && map.get(root).is_some_and(Json::is_object) => {
            map.remove(root).unwrap_or(Json::Null)
        }
        other => other,
    }
}

fn print_fields(project: &Record, config: &NestedParamsConfig) {
    let namer = FieldNamer::with_config(project.model_name(), config.clone());
    println!("{}", namer.field("name"));
    println!("{}", namer.for_one("author").field("name"));
    for association in ["tasks", "tags"] {
        for child in namer.for_many(association, project.children(association)) {
            println!("{}", child.field("name"));
        }
    }
}
