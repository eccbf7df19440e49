//! edm-paths CLI
//!
//! Command-line interface for enumerating resource paths from an entity
//! data model document.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use edm_paths::{
    enumerate_paths, load_model, Settings, DEFAULT_NAVIGATION_PROPERTY_DEPTH,
};

#[derive(Parser)]
#[command(name = "edm-paths")]
#[command(about = "Enumerate resource paths from an entity data model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every resource path of a model
    List {
        /// Model document (JSON)
        model: PathBuf,

        /// Output as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Show each path's kind next to it
        #[arg(long)]
        kind: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Show the parameter mapping of every path
    Params {
        /// Model document (JSON)
        model: PathBuf,

        /// Output as JSON (for automation)
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// Render keys as their own segments instead of parenthesized
    #[arg(long)]
    key_as_segment: bool,

    /// Maximum navigation property recursion depth
    #[arg(long, default_value_t = DEFAULT_NAVIGATION_PROPERTY_DEPTH)]
    depth: usize,

    /// Count key segments against the depth budget
    #[arg(long)]
    count_key_depth: bool,

    /// Prefix single-key parameter names with the entity type name
    #[arg(long)]
    prefix_type_name: bool,

    /// Render bound operations without namespace qualification
    #[arg(long)]
    unqualified_calls: bool,

    /// Render escape-flagged functions with the ':/' separator
    #[arg(long)]
    escape_function_calls: bool,

    /// Render the namespace alias in type-cast segments
    #[arg(long)]
    alias_type_casts: bool,

    /// Only expose cast-based operation paths allowed by a derived-type
    /// constraint
    #[arg(long)]
    require_derived_type_constraint: bool,

    /// Emit alternate-key entity paths
    #[arg(long)]
    alternate_keys: bool,

    /// Static prefix prepended to every path
    #[arg(long)]
    path_prefix: Option<String>,

    /// Skip navigation property paths
    #[arg(long)]
    no_navigation: bool,

    /// Skip bound operation paths
    #[arg(long)]
    no_operations: bool,

    /// Skip operation import paths
    #[arg(long)]
    no_operation_imports: bool,
}

impl SettingsArgs {
    fn to_settings(&self) -> Settings {
        let mut settings = Settings::new()
            .navigation_depth(self.depth)
            .count_key_segment_as_depth(self.count_key_depth)
            .key_as_segment(self.key_as_segment)
            .prefix_type_name_before_key(self.prefix_type_name)
            .unqualified_call(self.unqualified_calls)
            .uri_escape_function_call(self.escape_function_calls)
            .alias_for_type_casts(self.alias_type_casts)
            .require_derived_types_constraint(self.require_derived_type_constraint)
            .alternate_key_paths(self.alternate_keys);
        if let Some(prefix) = &self.path_prefix {
            settings = settings.path_prefix(prefix.clone());
        }
        if self.no_navigation {
            settings = settings.without_navigation_paths();
        }
        if self.no_operations {
            settings = settings.without_operation_paths();
        }
        if self.no_operation_imports {
            settings = settings.without_operation_import_paths();
        }
        settings
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List {
            model,
            json,
            kind,
            output,
            settings,
        } => run_list(&model, json, kind, output, &settings.to_settings()),

        Commands::Params {
            model,
            json,
            settings,
        } => run_params(&model, json, &settings.to_settings()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_and_enumerate(
    model_path: &PathBuf,
    settings: &Settings,
) -> Result<Vec<edm_paths::Path>, u8> {
    let model = load_model(model_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    enumerate_paths(&model, settings).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn run_list(
    model_path: &PathBuf,
    json: bool,
    kind: bool,
    output: Option<PathBuf>,
    settings: &Settings,
) -> Result<(), u8> {
    let paths = load_and_enumerate(model_path, settings)?;

    let rendered = if json {
        let entries: Vec<serde_json::Value> = paths
            .iter()
            .map(|p| {
                serde_json::json!({
                    "path": p.canonical_name(settings),
                    "kind": p.kind(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&entries).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?
    } else {
        let mut lines = Vec::with_capacity(paths.len());
        for path in &paths {
            if kind {
                lines.push(format!(
                    "{:<20} {}",
                    format!("{:?}", path.kind()),
                    path.canonical_name(settings)
                ));
            } else {
                lines.push(path.canonical_name(settings));
            }
        }
        lines.join("\n")
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn run_params(model_path: &PathBuf, json: bool, settings: &Settings) -> Result<(), u8> {
    let paths = load_and_enumerate(model_path, settings)?;

    if json {
        let entries: Vec<serde_json::Value> = paths
            .iter()
            .map(|p| {
                serde_json::json!({
                    "path": p.canonical_name(settings),
                    "parameters": p.parameter_mappings(settings),
                })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&entries).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        for path in &paths {
            let mappings = path.parameter_mappings(settings);
            if mappings.is_empty() {
                continue;
            }
            println!("{}", path.canonical_name(settings));
            for mapping in mappings {
                println!("  {} -> {{{}}}", mapping.source, mapping.template);
            }
        }
    }

    Ok(())
}
