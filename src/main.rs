//! envrelay CLI - resolve the environment handed to a sandboxed child process
//!
//! Run `envrelay --help` for usage information.

use clap::{Args, Parser, Subcommand};
use envrelay::config::{Config, LogFormat, LoggingConfig, DEFAULT_CONFIG_TEMPLATE};
use envrelay::passthrough::DynamicOutcome;
use envrelay::source::{EnvFileSource, JsonSnapshotSource, ProcessEnvSource, SourceLoader};
use envrelay::{EnvResolver, EnvrelayError, ResolvedEnv, SourceConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "envrelay",
    about = "Decide which secrets and settings reach a sandboxed child process",
    version
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the configuration snapshot comes from (process environment by default)
#[derive(Args)]
struct SourceArgs {
    /// Read the snapshot from a dotenv-style file
    #[arg(long, conflicts_with = "json")]
    env_file: Option<PathBuf>,

    /// Read the snapshot from a JSON object file
    #[arg(long)]
    json: Option<PathBuf>,
}

impl SourceArgs {
    fn loader(&self) -> Box<dyn SourceLoader> {
        match (&self.env_file, &self.json) {
            (Some(path), _) => Box::new(EnvFileSource::new(path)),
            (None, Some(path)) => Box::new(JsonSnapshotSource::new(path)),
            (None, None) => Box::new(ProcessEnvSource::new()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved child environment
    Resolve {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (env, json, keys)
        #[arg(short, long, default_value = "env")]
        format: String,
    },

    /// Show what happened to every source key (never prints values)
    Explain {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Only show keys that were dropped
        #[arg(long)]
        dropped: bool,
    },

    /// Classify a key name against the dynamic passthrough rules
    Check {
        /// Variable name to classify
        key: String,
    },

    /// Print the effective passthrough rules
    Rules,

    /// Run a command with only the resolved environment
    Exec {
        #[command(flatten)]
        source: SourceArgs,

        /// Do not carry PATH over from the current process
        #[arg(long)]
        no_path: bool,

        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).await?;

    init_logging(&config.logging, cli.verbose);

    let resolver = EnvResolver::from_config(&config);

    match cli.command {
        Commands::Resolve { source, format } => {
            resolve(&resolver, &source, &format).await?;
        }
        Commands::Explain {
            source,
            format,
            dropped,
        } => {
            explain(&resolver, &source, &format, dropped).await?;
        }
        Commands::Check { key } => {
            check_key(&resolver, &key);
        }
        Commands::Rules => {
            show_rules(&resolver);
        }
        Commands::Exec {
            source,
            no_path,
            command,
        } => {
            return exec(&resolver, &source, no_path, command).await;
        }
        Commands::Init { force } => {
            init_config(force).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the given config file, or the default one when it exists
async fn load_config(path: Option<&Path>) -> Result<Config, EnvrelayError> {
    if let Some(config_path) = path {
        return Ok(Config::load(config_path).await?);
    }

    let default_path = Config::default_path();
    if default_path.exists() {
        Ok(Config::load(&default_path).await?)
    } else {
        Ok(Config::default())
    }
}

/// Logs go to stderr so stdout stays clean for resolved output
fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        1 => EnvFilter::from_default_env().add_directive(Level::DEBUG.into()),
        _ => EnvFilter::from_default_env().add_directive(Level::TRACE.into()),
    };

    let (pretty, json) = match logging.format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

async fn load_snapshot(source: &SourceArgs) -> Result<SourceConfig, EnvrelayError> {
    let loader = source.loader();
    let snapshot = loader.load().await?;
    info!(source = %loader.describe(), entries = snapshot.len(), "loaded snapshot");
    Ok(snapshot)
}

async fn load_and_resolve(
    resolver: &EnvResolver,
    source: &SourceArgs,
) -> Result<ResolvedEnv, EnvrelayError> {
    let snapshot = load_snapshot(source).await?;
    Ok(resolver.resolve(&snapshot))
}

async fn resolve(
    resolver: &EnvResolver,
    source: &SourceArgs,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !matches!(format, "env" | "json" | "keys") {
        return Err(format!("Unknown format: {}", format).into());
    }

    let env = load_and_resolve(resolver, source).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&env)?);
        }
        "keys" => {
            for key in env.keys() {
                println!("{}", key);
            }
        }
        _ => {
            print!("{}", env.to_env_lines());
        }
    }

    Ok(())
}

async fn explain(
    resolver: &EnvResolver,
    source: &SourceArgs,
    format: &str,
    dropped_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !matches!(format, "table" | "json") {
        return Err(format!("Unknown format: {}", format).into());
    }

    let snapshot = load_snapshot(source).await?;
    let mut report = resolver.explain(&snapshot);

    if dropped_only {
        report.keys.retain(|k| !k.is_forwarded());
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            if report.keys.is_empty() {
                println!("No source keys");
                return Ok(());
            }

            println!("{:<32} {:<14} {}", "SOURCE KEY", "DYNAMIC", "FORWARDED AS");
            println!("{}", "-".repeat(80));
            for key in &report.keys {
                let targets = key.forwarded_as();
                let targets = if targets.is_empty() {
                    "-".to_string()
                } else {
                    targets.join(", ")
                };
                println!("{:<32} {:<14} {}", key.key, key.dynamic.to_string(), targets);
            }
            println!(
                "\n{} source keys, {} forwarded variables",
                report.keys.len(),
                report.env.len()
            );
        }
    }

    Ok(())
}

fn check_key(resolver: &EnvResolver, key: &str) {
    let report = resolver.check(key);
    let rules = resolver.passthrough_rules();

    if !report.explicit_targets.is_empty() {
        println!(
            "{}: explicit rule, forwarded as {}",
            key,
            report.explicit_targets.join(" | ")
        );
    }

    match report.dynamic {
        DynamicOutcome::AlreadySet => {
            println!("{}: always claimed by the explicit phase", key)
        }
        DynamicOutcome::Blocklisted => println!("{}: blocklisted for dynamic passthrough", key),
        DynamicOutcome::Forwarded => {
            let mut reasons = Vec::new();
            if rules.has_dynamic_prefix(key) {
                reasons.push("prefix");
            }
            if rules.has_dynamic_suffix(key) {
                reasons.push("suffix");
            }
            println!(
                "{}: forwarded dynamically when set and unclaimed ({} match)",
                key,
                reasons.join(" + ")
            );
        }
        _ => println!("{}: not forwarded dynamically", key),
    }
}

fn show_rules(resolver: &EnvResolver) {
    let rules = resolver.passthrough_rules();

    println!("Dynamic prefixes:");
    for prefix in rules.prefixes() {
        println!("  {}*", prefix);
    }
    println!("Dynamic suffixes:");
    for suffix in rules.suffixes() {
        println!("  *{}", suffix);
    }
    println!("Blocklist:");
    for pattern in rules.blocklist() {
        println!("  {}", pattern);
    }

    let extra = resolver.explicit_rules().extra_mappings();
    if !extra.is_empty() {
        println!("Configured mappings:");
        for mapping in extra {
            println!("  {} -> {}", mapping.from, mapping.to);
        }
    }
}

async fn exec(
    resolver: &EnvResolver,
    source: &SourceArgs,
    no_path: bool,
    command: Vec<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let env = load_and_resolve(resolver, source).await?;

    let Some((program, args)) = command.split_first() else {
        return Err("No command given".into());
    };

    let mut child = tokio::process::Command::new(program);
    child.args(args).env_clear().envs(env.iter());

    if !no_path && !env.contains_key("PATH") {
        if let Some(path) = std::env::var_os("PATH") {
            child.env("PATH", path);
        }
    }

    info!(program = %program, vars = env.len(), "spawning child");
    let status = child.status().await?;

    match status.code() {
        Some(code) => Ok(ExitCode::from(u8::try_from(code).unwrap_or(1))),
        None => {
            warn!("child terminated by signal");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn init_config(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        return Err(format!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_path.display()
        )
        .into());
    }

    // Create config directory
    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE).await?;

    println!("Configuration initialized at {}", config_path.display());
    println!("\nNext steps:");
    println!("1. Review passthrough rules: envrelay rules");
    println!("2. Preview the child environment: envrelay explain --env-file worker.env");
    println!("3. Run a process: envrelay exec --env-file worker.env -- your-command");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_source() -> SourceArgs {
        SourceArgs {
            env_file: None,
            json: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_formats_are_rejected() {
        let resolver = EnvResolver::new();

        let err = explain(&resolver, &process_source(), "xml", false).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown format: xml");

        let err = resolve(&resolver, &process_source(), "yaml").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown format: yaml");
    }

    #[tokio::test]
    async fn test_missing_snapshot_surfaces_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = SourceArgs {
            env_file: Some(dir.path().join("missing.env")),
            json: None,
        };

        let err = load_snapshot(&args).await.unwrap_err();
        assert!(matches!(err, EnvrelayError::Source(_)));
    }

    #[tokio::test]
    async fn test_missing_config_surfaces_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = load_config(Some(path.as_path())).await.unwrap_err();
        assert!(matches!(err, EnvrelayError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_cli_parses_source_flags() {
        let args = ["envrelay", "explain", "--json", "b.json", "--dropped"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Explain { source, dropped, .. } => {
                assert!(dropped);
                assert_eq!(source.json, Some(PathBuf::from("b.json")));
            }
            _ => panic!("expected explain"),
        }

        let args = ["envrelay", "resolve", "--env-file", "a.env", "--json", "b.json"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
