use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use provider_schema_core::{ModuleMap, PackageSpec, ReferenceRewrite, rewrite_reference, validate_package};
use provider_schema_registry::{ComposeManifest, RuntimeInformation};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "schema-compose")]
#[command(about = "Compose provider package schemas from contributor fragments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compose a package schema from a YAML config and JSON fragment files.
    Compose(ComposeArgs),
    /// Validate one or more package schema JSON files.
    Validate(ValidateArgs),
    /// Rewrite a single schema reference under a package and module map.
    RewriteRef(RewriteRefArgs),
}

#[derive(Debug, Args)]
struct ComposeArgs {
    /// Path to the compose config YAML.
    #[arg(long)]
    config: PathBuf,
    /// Package name the composed schema is published under.
    #[arg(long)]
    name: String,
    /// Package version.
    #[arg(long)]
    version: String,
    /// Output file (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Pretty-print the composed schema.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Package schema JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct RewriteRefArgs {
    /// Package name to re-home the reference under.
    #[arg(long)]
    package: String,
    /// Module remapping in `old=new` form; may be repeated.
    #[arg(long = "map", value_parser = parse_module_mapping)]
    mappings: Vec<(String, String)>,
    /// The reference to rewrite, e.g. `#/types/aws:vpc:Subnet`.
    reference: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compose(args) => run_compose(args),
        Command::Validate(args) => run_validate(args),
        Command::RewriteRef(args) => run_rewrite_ref(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_compose(args: ComposeArgs) -> Result<(), String> {
    let manifest = ComposeManifest::load(&args.config)
        .map_err(|err| format!("Failed to load '{}': {err}", args.config.display()))?;
    let base_dir = args
        .config
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    debug!(config = %args.config.display(), base_dir = %base_dir.display(), "Loaded compose config");

    let registry = manifest
        .into_builder(base_dir)
        .map_err(|err| format!("Failed to load fragments: {err}"))?
        .build();
    let info = RuntimeInformation::new(args.name, args.version);
    let schema = registry.get_schema(&info).map_err(|err| err.to_string())?;

    for diagnostic in registry.diagnostics() {
        eprintln!("warning: {diagnostic}");
    }

    let raw = if args.pretty {
        let package: PackageSpec = serde_json::from_str(&schema)
            .map_err(|err| format!("Failed to re-read composed schema: {err}"))?;
        serde_json::to_string_pretty(&package)
            .map_err(|err| format!("Failed to serialize composed schema: {err}"))?
    } else {
        schema.to_string()
    };

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|err| {
                        format!(
                            "Failed to create output directory '{}': {err}",
                            parent.display()
                        )
                    })?;
                }
            }
            fs::write(path, raw)
                .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
            println!(
                "Composed package '{}' into '{}'.",
                info.package_name,
                path.display()
            );
        }
        None => println!("{raw}"),
    }

    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut invalid = 0usize;

    for path in &args.inputs {
        let raw = fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
        let package: PackageSpec = serde_json::from_str(&raw)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display()))?;

        let errors = validate_package(&package);
        if errors.is_empty() {
            continue;
        }
        invalid += 1;
        eprintln!("{}: {} problem(s)", path.display(), errors.len());
        for err in &errors {
            eprintln!("  - {err}");
        }
    }

    if invalid > 0 {
        return Err(format!("{invalid} schema file(s) failed validation"));
    }

    println!("Validated {} package schema file(s).", args.inputs.len());
    Ok(())
}

fn run_rewrite_ref(args: RewriteRefArgs) -> Result<(), String> {
    let modules: ModuleMap = args.mappings.into_iter().collect();

    match rewrite_reference(&args.reference, &args.package, &modules) {
        ReferenceRewrite::External | ReferenceRewrite::Untargeted => println!("{}", args.reference),
        ReferenceRewrite::Internal(rewritten) => println!("{rewritten}"),
        ReferenceRewrite::Malformed(err) => {
            eprintln!(
                "warning: left malformed reference '{}' unchanged: {err}",
                args.reference
            );
            println!("{}", args.reference);
        }
    }

    Ok(())
}

fn parse_module_mapping(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(format!("expected 'old=new', got '{raw}'")),
    }
}
