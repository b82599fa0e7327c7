mod config;
mod registry;
mod report;
mod sink;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use schemaseed_core::{Error as CoreError, redact_connection_string};
use schemaseed_generate::GeneratorRegistry;
use schemaseed_plan::{
    PlanError, SeedConfig, ValidationReport, config_json_schema, create_seed_plan,
};
use schemaseed_runner::{
    EffectReport, SeedError, SeedOptions, SqlAdapter, run_seed_documents, run_seed_sql,
};
use thiserror::Error;
use uuid::Uuid;

use config::{RunFlags, format_validation, load_config, load_schema};
use registry::{
    RunContext, RunOptions, RunPaths, init_console_logging, init_run_logging, schema_fingerprint,
    start_run, write_report,
};
use sink::JsonlSink;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("seed error: {0}")]
    Seed(#[from] SeedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration:\n{}", format_validation(.0))]
    Validation(ValidationReport),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("seed run failed with {0} error(s); see the report above")]
    RunFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "schemaseed", version, about = "Deterministic seed data for relational and document stores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the insertion order and cycle resolutions for a schema.
    Plan(PlanArgs),
    /// Seed every entity of a schema into JSONL files.
    Seed(SeedArgs),
    /// Seed the document collections of a config into JSONL files.
    Documents(DocumentsArgs),
    /// Print the JSON Schema of the config file.
    ConfigSchema,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Path to schema.json.
    #[arg(long)]
    schema: PathBuf,
    /// Optional config file (TOML or JSON) for include/exclude filters.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Treat cycles as resolvable through deferred constraints.
    #[arg(long, default_value_t = false)]
    deferrable: bool,
    /// Print the plan as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Path to schema.json.
    #[arg(long)]
    schema: PathBuf,
    /// Config file (TOML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory receiving one `<entity>.jsonl` per entity.
    #[arg(long, default_value = "seed-out")]
    out: PathBuf,
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args, Debug)]
struct DocumentsArgs {
    /// Config file (TOML or JSON) with a `documents` section.
    #[arg(long)]
    config: PathBuf,
    /// Directory receiving one `<collection>.jsonl` per collection.
    #[arg(long, default_value = "seed-out")]
    out: PathBuf,
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Print the first N generated rows per entity (sensitive fields redacted).
    #[arg(long, value_name = "N")]
    preview: Option<usize>,
    /// Print the report as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Seed(args) => run_seed(args).await,
        Command::Documents(args) => run_documents(args).await,
        Command::ConfigSchema => {
            println!("{}", serde_json::to_string_pretty(&config_json_schema())?);
            Ok(())
        }
    }
}

fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let (schema, _) = load_schema(&args.schema)?;
    let mut config = load_config(args.config.as_deref(), Some(&schema))?.config;
    args.flags.apply(&mut config)?;

    let options = SeedOptions::from_config(&config)?;
    let plan = create_seed_plan(&schema, &options.plan_options(), args.deferrable)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", report::render_plan(&plan));
    }
    Ok(())
}

async fn run_seed(args: SeedArgs) -> Result<(), CliError> {
    let SeedArgs {
        schema: schema_path,
        config: config_path,
        out,
        output,
        flags,
    } = args;

    let (schema, schema_bytes) = load_schema(&schema_path)?;
    let mut config = load_config(config_path.as_deref(), Some(&schema))?.config;
    flags.apply(&mut config)?;

    let mut options = SeedOptions::from_config(&config)?;
    options.preview_rows = output.preview.unwrap_or(0);

    let paths = begin_run(
        "seed",
        &config,
        &output,
        &out,
        config.connection.as_deref(),
        Some(schema_fingerprint(&schema_bytes)),
    )?;

    let mut sink = JsonlSink::new(&out)
        .with_schema(schema.clone())
        .with_target(config.connection.clone());
    let plan = create_seed_plan(
        &schema,
        &options.plan_options(),
        sink.capabilities().deferrable_constraints,
    )?;
    tracing::info!(
        event = "plan_created",
        entities = plan.insert_order.len(),
        cycles = plan.resolutions.len()
    );

    let report = run_seed_sql(
        &mut sink,
        &schema,
        &plan,
        options,
        GeneratorRegistry::with_builtins(),
    )
    .await?;

    finish_run(&paths, &report, &output)
}

async fn run_documents(args: DocumentsArgs) -> Result<(), CliError> {
    let DocumentsArgs {
        config: config_path,
        out,
        output,
        flags,
    } = args;

    let mut config = load_config(Some(config_path.as_path()), None)?.config;
    flags.apply(&mut config)?;
    let documents = config.documents.clone().ok_or_else(|| {
        CliError::InvalidConfig("config has no `documents` section".to_string())
    })?;

    let mut options = SeedOptions::from_config(&config)?;
    options.preview_rows = output.preview.unwrap_or(0);

    let target = documents.uri.clone().or_else(|| config.connection.clone());
    let paths = begin_run("documents", &config, &output, &out, target.as_deref(), None)?;

    let mut sink = JsonlSink::new(&out).with_target(target);
    let report = run_seed_documents(
        &mut sink,
        &documents,
        options,
        GeneratorRegistry::with_builtins(),
    )
    .await?;

    finish_run(&paths, &report, &output)
}

fn begin_run(
    command: &str,
    config: &SeedConfig,
    output: &OutputArgs,
    out_dir: &Path,
    target: Option<&str>,
    schema_fingerprint: Option<String>,
) -> Result<RunPaths, CliError> {
    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: command.to_string(),
        run_dir: output.run_dir.clone(),
        options: RunOptions {
            seed: config.seed.as_ref().map(ToString::to_string),
            rows: config.rows.clone().unwrap_or_default(),
            batch_size: config.batch_size(),
            dry_run: config.dry_run,
            truncate: config.truncate,
            allow_production: config.allow_production,
            include_parents: config.include_parents,
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            out_dir: out_dir.to_path_buf(),
        },
        connection: target.map(redact_connection_string),
        schema_fingerprint,
    };

    let paths = start_run(&run_ctx)?;
    init_run_logging(&paths.logs_path)?;
    tracing::info!(event = "run_started", run_id = %run_id, command = %command);
    Ok(paths)
}

fn finish_run(paths: &RunPaths, report: &EffectReport, output: &OutputArgs) -> Result<(), CliError> {
    write_report(paths, report)?;
    tracing::info!(
        event = "run_finished",
        status = if report.success { "success" } else { "failed" },
        duration_ms = report.duration_ms,
        report = %paths.report_path.display()
    );

    if output.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        if output.preview.is_some() {
            print!("{}", report::render_previews(report));
        }
        print!("{}", report::render_report(report));
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::RunFailed(report.errors.len()))
    }
}
