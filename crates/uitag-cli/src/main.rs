mod commands;
mod reader;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use reader::{read_project_config, read_tag_files, TagFile};
use uitag_core::{
    assemble, parse_tag, resolve_field, resolve_global, validate, validate_tags, Diagnostic,
    DiagnosticSeverity, ParsedUIConfig,
};

#[derive(Parser)]
#[command(
    name = "uitag",
    version,
    about = "UI tag compiler: parse, validate and preview backend UI tag configuration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TagKind {
    /// Key/value map as parsed
    Raw,
    /// Resolved field configuration
    Field,
    /// Resolved model (UIConfig) configuration
    Model,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a single tag string and print it as JSON
    Tag {
        /// Tag string, e.g. "label:用户名;required;search"
        tag: String,

        /// What to print
        #[arg(long = "as", value_enum, default_value = "raw")]
        kind: TagKind,
    },

    /// Assemble tag files (<model>.tags.json) and output configuration JSON
    Parse {
        /// Input path (file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate tag files and report diagnostics
    Validate {
        /// Input path (file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Lint tag files for quality issues
    Lint {
        /// Input path (file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format: human (default), json or sarif
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Evaluate a {{ }} expression or a button condition
    Eval {
        /// Expression, e.g. "{{ formData.type === 'admin' }}"
        expression: String,

        /// Context object (inline JSON or file); the row when --condition is set
        #[arg(long)]
        context: Option<String>,

        /// Evaluate as a button condition (fail-open, boolean result)
        #[arg(long)]
        condition: bool,
    },

    /// Render data rows as table cells
    Render {
        /// Tag file of the model
        path: PathBuf,

        /// Data rows (inline JSON array or file)
        #[arg(long)]
        rows: String,

        /// Output format: human (default, tab-separated) or json
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// List the buttons a user may use on a row
    Buttons {
        /// Tag file of the model
        path: PathBuf,

        /// Permission identifiers (inline JSON array or file)
        #[arg(long)]
        permissions: String,

        /// Row the conditions are evaluated against (inline JSON or file)
        #[arg(long)]
        row: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tag { tag, kind } => run_tag(&tag, kind),
        Commands::Parse { path, output } => {
            run_parse(&path, output.as_deref()).map(|json| output.is_none().then_some(json))
        }
        Commands::Validate { path, format } => match run_validate(&path, &format) {
            Ok((output, error_count)) => {
                println!("{output}");
                if error_count > 0 {
                    process::exit(1);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        },
        Commands::Lint { path, format } => commands::lint::run_lint(&path, &format).map(Some),
        Commands::Eval {
            expression,
            context,
            condition,
        } => commands::eval::run_eval(&expression, context.as_deref(), condition).map(Some),
        Commands::Render { path, rows, format } => {
            commands::render::run_render(&path, &rows, &format).map(Some)
        }
        Commands::Buttons {
            path,
            permissions,
            row,
        } => commands::render::run_buttons(&path, &permissions, row.as_deref()).map(Some),
    };

    match result {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization error: {e}"))
}

/// Read tag files and assemble one configuration per file.
pub fn build_configs(input_path: &Path) -> Result<Vec<(TagFile, ParsedUIConfig)>, String> {
    let files = read_tag_files(input_path)?;

    if files.is_empty() {
        return Err(format!(
            "No tag files (*.tags.json) found at: {}",
            input_path.display()
        ));
    }

    Ok(files
        .into_iter()
        .map(|f| {
            let config = assemble(&f.model, &f.rows);
            (f, config)
        })
        .collect())
}

/// Exactly one model, for the commands that work on a single tag file.
pub fn build_single_config(input_path: &Path) -> Result<ParsedUIConfig, String> {
    let mut configs = build_configs(input_path)?;
    if configs.len() != 1 {
        return Err(format!(
            "Expected a single tag file, found {} at: {}",
            configs.len(),
            input_path.display()
        ));
    }
    Ok(configs.remove(0).1)
}

fn run_tag(tag: &str, kind: TagKind) -> Result<Option<String>, String> {
    let map = parse_tag(tag);
    let json = match kind {
        TagKind::Raw => to_json(&map)?,
        TagKind::Field => to_json(&resolve_field(&map))?,
        TagKind::Model => to_json(&resolve_global(&map))?,
    };
    Ok(Some(json))
}

fn run_parse(input_path: &Path, output_file: Option<&Path>) -> Result<String, String> {
    let configs: Vec<ParsedUIConfig> = build_configs(input_path)?
        .into_iter()
        .map(|(_, config)| config)
        .collect();
    let json = if configs.len() == 1 {
        to_json(&configs[0])?
    } else {
        to_json(&configs)?
    };

    if let Some(out_path) = output_file {
        std::fs::write(out_path, &json)
            .map_err(|e| format!("Failed to write {}: {e}", out_path.display()))?;
        eprintln!("Written to {}", out_path.display());
    }

    Ok(json)
}

fn run_validate(input_path: &Path, format: &str) -> Result<(String, usize), String> {
    let configs = build_configs(input_path)?;
    let file_count = configs.len();

    let mut located: Vec<(&str, Diagnostic)> = Vec::new();
    for (file, config) in &configs {
        let tags = validate_tags(&file.model, &file.rows);
        let semantic = validate(config);
        located.extend(
            semantic
                .errors
                .into_iter()
                .chain(tags.warnings)
                .chain(semantic.warnings)
                .map(|d| (file.path.as_str(), d)),
        );
    }

    let error_count = located
        .iter()
        .filter(|(_, d)| d.severity == DiagnosticSeverity::Error)
        .count();
    let warning_count = located.len() - error_count;

    if format == "json" {
        let diagnostics: Vec<&Diagnostic> = located.iter().map(|(_, d)| d).collect();
        let output = serde_json::json!({
            "diagnostics": diagnostics,
            "summary": {
                "errors": error_count,
                "warnings": warning_count,
                "files": file_count,
            }
        });
        return Ok((to_json(&output)?, error_count));
    }

    // Human-readable format
    let mut lines: Vec<String> = Vec::new();

    for (path, d) in &located {
        let severity = match d.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        };
        let target = match &d.field {
            Some(field) => format!("{}.{field}", d.model),
            None => d.model.clone(),
        };
        lines.push(format!(
            "{path}: {severity}[{}] {target}: {}",
            d.code, d.message
        ));
    }

    let error_word = if error_count == 1 { "error" } else { "errors" };
    let warning_word = if warning_count == 1 {
        "warning"
    } else {
        "warnings"
    };
    let file_word = if file_count == 1 { "file" } else { "files" };
    lines.push(format!(
        "{error_count} {error_word}, {warning_count} {warning_word} in {file_count} {file_word}."
    ));

    Ok((lines.join("\n"), error_count))
}

/// Project configuration for the input, or defaults.
pub fn project_config(input_path: &Path) -> reader::UiTagConfig {
    read_project_config(input_path).unwrap_or_default()
}
