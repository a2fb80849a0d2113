//! Layered Config CLI
//!
//! Entry point for the `layercfg` command-line tool.

use clap::{Parser, Subcommand};
use config_tree::level::{DEFAULT_READ_LEVEL, DEFAULT_WRITE_LEVEL};
use layered_config::{ConfigEngine, ConfigLevel, LevelManifest};
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layercfg")]
#[command(about = "Inspect and edit layered configuration", version)]
struct Cli {
    /// Level manifest (TOML) naming the document of each level
    #[arg(long, short = 'm', global = true)]
    manifest: Option<PathBuf>,

    /// Global defaults document
    #[arg(long, global = true)]
    global: Option<PathBuf>,

    /// Theme overlay document
    #[arg(long, global = true)]
    theme: Option<PathBuf>,

    /// User overrides document
    #[arg(long, global = true)]
    user: Option<PathBuf>,

    /// Project overrides document
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration or the document of one level
    Show {
        /// Level to print (merged, global, theme_overlay, user, project)
        #[arg(long, short = 'l', default_value = "merged")]
        level: ConfigLevel,
    },

    /// Print the value at a dot path
    Get {
        /// Dot path, e.g. window.size.width
        key: String,

        /// Level to read from
        #[arg(long, short = 'l', default_value_t = DEFAULT_READ_LEVEL)]
        level: ConfigLevel,
    },

    /// Set a value at a dot path and write the level document back
    Set {
        /// Dot path, e.g. window.size.width
        key: String,

        /// JSON value; anything that is not valid JSON is taken as a string
        value: String,

        /// Level to write to
        #[arg(long, short = 'l', default_value_t = DEFAULT_WRITE_LEVEL)]
        level: ConfigLevel,
    },

    /// Remove a value from one level and write the level document back
    Unset {
        /// Dot path, e.g. window.size.width
        key: String,

        /// Level to remove the value from
        #[arg(long, short = 'l', default_value_t = DEFAULT_WRITE_LEVEL)]
        level: ConfigLevel,
    },

    /// List the levels that define a dot path
    Which {
        /// Dot path, e.g. window.size.width
        key: String,
    },

    /// Print the state flags and where each level was loaded from
    State {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "layered_config=debug,info"
    } else {
        "layered_config=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let manifest = build_manifest(&cli);
    let mut engine = ConfigEngine::new();
    let errors = manifest.apply(&mut engine);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("Error loading config: {}", e);
        }
        process::exit(1);
    }

    match cli.command {
        Commands::Show { level } => run_show(&engine, level),
        Commands::Get { key, level } => run_get(&engine, &key, level),
        Commands::Set { key, value, level } => run_set(&mut engine, &manifest, &key, &value, level),
        Commands::Unset { key, level } => run_unset(&mut engine, &manifest, &key, level),
        Commands::Which { key } => run_which(&engine, &key),
        Commands::State { json } => run_state(&engine, json),
    }
}

/// Manifest file (if any) with per-level flags taking precedence.
fn build_manifest(cli: &Cli) -> LevelManifest {
    let mut manifest = match &cli.manifest {
        Some(path) => match LevelManifest::load(path) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("Error loading manifest: {}", e);
                process::exit(1);
            }
        },
        None => LevelManifest::default(),
    };

    let flags = [
        (ConfigLevel::Global, &cli.global),
        (ConfigLevel::ThemeOverlay, &cli.theme),
        (ConfigLevel::User, &cli.user),
        (ConfigLevel::Project, &cli.project),
    ];
    for (level, path) in flags {
        if let Some(path) = path {
            manifest.set_path(level, path.clone());
        }
    }
    manifest
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_show(engine: &ConfigEngine, level: ConfigLevel) {
    if level.is_merged() {
        print_json(&engine.config());
        return;
    }
    match engine.level_document(level) {
        Ok(doc) => print_json(&doc),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_get(engine: &ConfigEngine, key: &str, level: ConfigLevel) {
    match engine.lookup_property(key, level) {
        Ok(value) => print_json(&value),
        Err(e) if e.is_not_found() => {
            eprintln!("{} is not set at level {}", key, level);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_set(engine: &mut ConfigEngine, manifest: &LevelManifest, key: &str, raw: &str, level: ConfigLevel) {
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

    if let Err(e) = engine.set_property(key, value, level) {
        eprintln!("Error [{}]: {}", e.code(), e);
        process::exit(1);
    }
    persist(engine, manifest, level);
}

fn run_unset(engine: &mut ConfigEngine, manifest: &LevelManifest, key: &str, level: ConfigLevel) {
    match engine.unset_property(key, level) {
        Ok(true) => persist(engine, manifest, level),
        Ok(false) => eprintln!("{} is not set at level {}", key, level),
        Err(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            process::exit(1);
        }
    }
}

fn persist(engine: &mut ConfigEngine, manifest: &LevelManifest, level: ConfigLevel) {
    let Some(path) = manifest.path_for(level) else {
        eprintln!("Error: no document path configured for level {}", level);
        process::exit(1);
    };
    if let Err(e) = engine.write_config(path, level) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    println!("Wrote {} config to {}", level, path.display());
}

fn run_which(engine: &ConfigEngine, key: &str) {
    match engine.provenance(key) {
        Ok(levels) if levels.is_empty() => {
            eprintln!("{} is not set at any level", key);
            process::exit(2);
        }
        Ok(levels) => {
            for level in levels {
                let value = engine.get_property(key, level).unwrap_or(Value::Null);
                println!("{:<14} {}", level, value);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_state(engine: &ConfigEngine, json: bool) {
    if json {
        let sources: serde_json::Map<String, Value> = ConfigLevel::REAL
            .iter()
            .filter_map(|&level| {
                let source = engine.source(level)?;
                let value = serde_json::to_value(source).ok()?;
                Some((level.to_string(), value))
            })
            .collect();
        print_json(&serde_json::json!({
            "state": engine.state().bits(),
            "flags": engine.state().to_string(),
            "error": engine.error_string(),
            "sources": sources,
        }));
        return;
    }

    println!("State: {}", engine.state());
    for level in ConfigLevel::REAL {
        let status = match (engine.is_loaded(level), engine.is_modified(level)) {
            (true, true) => "loaded, modified",
            (true, false) => "loaded",
            (false, true) => "modified",
            (false, false) => "-",
        };
        match engine.source(level).and_then(|s| s.path.as_deref()) {
            Some(path) => println!("  {:<14} {:<17} {}", level, status, path),
            None => println!("  {:<14} {}", level, status),
        }
    }
}
