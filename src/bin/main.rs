//! overlay CLI - Inspect entity override rewriting
//!
//! Usage:
//!   overlay rewrite <query.json> [--config <overlay.toml>] [--dialect <dialect>] [--show-original]
//!   overlay check [--config <overlay.toml>]
//!
//! Examples:
//!   overlay rewrite demos/node_listing.json --config demos/overlay.toml
//!   overlay rewrite demos/node_listing.json --config demos/overlay.toml --dialect mysql --show-original
//!   overlay check --config demos/overlay.toml

use clap::{Parser, Subcommand, ValueEnum};
use overlay::config::Settings;
use overlay::rewrite::{Reaction, ReactionOutcome};
use overlay::sql::{Dialect, SelectQuery};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "overlay")]
#[command(about = "overlay - Rewrite select queries to read entity override data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a JSON query and print the compiled SQL
    Rewrite {
        /// Path to the query JSON file
        file: PathBuf,

        /// Settings file (defaults to OVERLAY_CONFIG, ./overlay.toml, then the user config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQL dialect to generate
        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,

        /// Also print the query before rewriting
        #[arg(long)]
        show_original: bool,
    },

    /// Validate settings and list configured entities
    Check {
        /// Settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Mysql,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rewrite {
            file,
            config,
            dialect,
            show_original,
        } => cmd_rewrite(file, config, dialect.into(), show_original),
        Commands::Check { config } => cmd_check(config),
    }
}

fn load_settings(config: Option<PathBuf>) -> Result<Settings, ExitCode> {
    let result = match &config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    result.map_err(|e| {
        eprintln!("Settings error: {}", e);
        ExitCode::FAILURE
    })
}

fn cmd_rewrite(
    file: PathBuf,
    config: Option<PathBuf>,
    dialect: Dialect,
    show_original: bool,
) -> ExitCode {
    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    // Read the query
    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let mut query: SelectQuery = match serde_json::from_str(&source) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("Invalid query JSON in '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let (reaction, provider) = match (settings.reaction(), settings.overrides.provider()) {
        (Ok(reaction), Ok(provider)) => (reaction, provider),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Settings error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if show_original {
        println!("-- original ({})", dialect);
        println!("{}", query.to_sql(dialect));
        println!();
    }

    match reaction.react(&mut query, &provider) {
        ReactionOutcome::OptedOut => {
            println!("-- query carries '{}', left unchanged", reaction.no_alter_tag());
        }
        ReactionOutcome::NoEntities => {
            println!("-- no configured entity tables in query, left unchanged");
        }
        ReactionOutcome::Rewritten { entities } => {
            println!("-- rewritten for: {}", entities.join(", "));
        }
    }
    println!("{}", query.to_sql(dialect));

    ExitCode::SUCCESS
}

fn cmd_check(config: Option<PathBuf>) -> ExitCode {
    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let provider = match settings.overrides.provider() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Settings error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Opt-out tag: {}", settings.no_alter_tag);
    println!("Entities ({}):", settings.entities.len());
    for entity in &settings.entities {
        let source = match provider.source(&entity.base_table) {
            overlay::sql::TableSource::Table(table) => table,
            overlay::sql::TableSource::Subquery(_) => "(subquery)".to_string(),
        };
        println!(
            "  {} (id: {}, revision id: {})",
            entity.base_table, entity.base_id, entity.revision_id
        );
        if let Some(revision) = &entity.revision_table {
            let fields: Vec<&str> = entity.revision_fields.iter().map(String::as_str).collect();
            println!("    revision table: {} [{}]", revision, fields.join(", "));
        }
        println!("    overrides: {} as {}", source, entity.override_alias());
    }

    if settings.overrides.property_map.is_empty() {
        println!("Property map: (empty, revision redirection only)");
    } else {
        println!("Property map:");
        for (column, override_column) in &settings.overrides.property_map {
            println!("  {} -> {}", column, override_column);
        }
    }

    ExitCode::SUCCESS
}
