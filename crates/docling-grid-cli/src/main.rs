#![allow(
    clippy::needless_pass_by_value, // clap hands over owned values
    clippy::fn_params_excessive_bools, // CLI commands have many boolean flags
)]

//! Docling Grid CLI - ruled table extraction
//!
//! Reads page primitives (ruling segments, rectangles, text fragments) as JSON
//! and writes the reconstructed tables as Markdown, JSON or CSV.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use docling_grid::{
    CsvSerializer, Diagnostic, ExtractedTable, GridConfig, HeaderDetection, JsonOptions,
    JsonSerializer, MarkdownOptions, MarkdownSerializer, PageInput, TableExtractor,
};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".docling-grid.toml";

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Default `log` filter; `RUST_LOG` still wins
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }

    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum OutputFormat {
    /// Markdown pipe tables (default)
    Markdown,
    /// JSON array of table objects
    Json,
    /// CSV, one block per table
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum HeaderMode {
    Auto,
    Always,
    Never,
}

impl From<HeaderMode> for HeaderDetection {
    fn from(mode: HeaderMode) -> Self {
        match mode {
            HeaderMode::Auto => Self::Auto,
            HeaderMode::Always => Self::Always,
            HeaderMode::Never => Self::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "docling-grid",
    about = "Extract ruled tables from page geometry",
    long_about = "Extract ruled tables from page geometry.\n\
                  \n\
                  Input is JSON with the line segments, rectangles and text fragments of\n\
                  each page, either {\"pages\": [...]} or a bare array of pages.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract tables from a page primitives file
    #[command(long_about = "Extract ruled tables from a page primitives file.\n\
                      \n\
                      Examples:\n\
                        docling-grid extract pages.json\n\
                        docling-grid extract pages.json -f json -o tables.json\n\
                        cat pages.json | docling-grid extract - -f csv")]
    Extract {
        /// Input JSON file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Configuration file, applied over the discovered ones
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Merge tolerance for ruling segments (page units)
        #[arg(long, value_name = "EPSILON")]
        line_merge_tolerance: Option<f64>,

        /// Minimum rows for a region to count as a table
        #[arg(long, value_name = "N")]
        min_rows: Option<usize>,

        /// Minimum columns for a region to count as a table
        #[arg(long, value_name = "N")]
        min_cols: Option<usize>,

        /// Header row detection
        #[arg(long, value_enum)]
        header: Option<HeaderMode>,

        /// Compact JSON output (no pretty-printing)
        #[arg(long)]
        compact: bool,

        /// Precede each Markdown table with a page/table comment
        #[arg(long)]
        table_comments: bool,

        /// Print every diagnostic to stderr
        #[arg(long)]
        diagnostics: bool,

        /// Skip pages with invalid geometry instead of failing
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Manage configuration files
    #[command(long_about = "Manage docling-grid configuration files.\n\
                      \n\
                      Settings come from ~/.docling-grid.toml, then ./.docling-grid.toml,\n\
                      then command-line flags.")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Create a .docling-grid.toml with the default settings
    Init {
        /// Create in the home directory instead of the current directory
        #[arg(long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display the effective configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Show the configuration file locations
    Path,
}

/// Input document: `{"pages": [...]}` or a bare array of pages
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputDocument {
    Wrapped { pages: Vec<PageInput> },
    Bare(Vec<PageInput>),
}

impl InputDocument {
    /// Pages with missing page numbers filled in from their position
    fn into_pages(self) -> Vec<PageInput> {
        let mut pages = match self {
            Self::Wrapped { pages } | Self::Bare(pages) => pages,
        };
        for (idx, page) in pages.iter_mut().enumerate() {
            if page.page_number == 0 {
                page.page_number = idx + 1;
            }
        }
        pages
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

fn project_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

fn read_toml_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Merge user config, project config and `explicit`, later files winning per key.
fn load_config(explicit: Option<&Path>) -> Result<GridConfig> {
    let mut merged = toml::Table::new();

    let discovered = user_config_path()
        .into_iter()
        .chain(std::iter::once(project_config_path()))
        .filter(|path| path.exists());
    for path in discovered {
        log::debug!("Loading config from {}", path.display());
        merged.extend(read_toml_table(&path)?);
    }
    if let Some(path) = explicit {
        merged.extend(read_toml_table(path)?);
    }

    let config: GridConfig = toml::Value::Table(merged)
        .try_into()
        .context("Invalid configuration value")?;
    Ok(config)
}

fn read_pages(input: &Path) -> Result<Vec<PageInput>> {
    let content = if input == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("Failed to read input file: {}", input.display()))?
    };
    let document: InputDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse page primitives from {}", input.display()))?;
    Ok(document.into_pages())
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    if diagnostic.is_warning() {
        eprintln!("{} {diagnostic}", "Warning:".yellow().bold());
    } else {
        eprintln!("{} {diagnostic}", "Note:".cyan().bold());
    }
}

#[allow(clippy::too_many_arguments)]
fn extract_command(
    input: PathBuf,
    output: Option<PathBuf>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
    line_merge_tolerance: Option<f64>,
    min_rows: Option<usize>,
    min_cols: Option<usize>,
    header: Option<HeaderMode>,
    compact: bool,
    table_comments: bool,
    diagnostics: bool,
    continue_on_error: bool,
    verbosity: Verbosity,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(value) = line_merge_tolerance {
        config.line_merge_tolerance = value;
    }
    if let Some(value) = min_rows {
        config.min_rows = value;
    }
    if let Some(value) = min_cols {
        config.min_cols = value;
    }
    if let Some(mode) = header {
        config.header_detection = mode.into();
    }

    let extractor = TableExtractor::new(config).context("Configuration rejected")?;
    let pages = read_pages(&input)?;

    let mut tables: Vec<ExtractedTable> = Vec::new();
    let mut failed_pages = 0usize;
    for (page, result) in pages.iter().zip(extractor.extract_pages(&pages)) {
        match result {
            Ok(page_result) => {
                if diagnostics {
                    page_result.diagnostics.iter().for_each(print_diagnostic);
                }
                tables.extend(page_result.tables);
            }
            Err(e) if continue_on_error => {
                failed_pages += 1;
                eprintln!("{} {e}", "Skipped:".yellow().bold());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Extraction failed on page {}", page.page_number));
            }
        }
    }

    let rendered = match format {
        OutputFormat::Markdown => {
            let serializer = MarkdownSerializer::with_options(MarkdownOptions {
                table_comments,
                ..MarkdownOptions::default()
            });
            let mut markdown = serializer.serialize_tables(&tables);
            if !markdown.is_empty() {
                markdown.push('\n');
            }
            markdown
        }
        OutputFormat::Json => {
            let serializer = JsonSerializer::with_options(JsonOptions {
                pretty: !compact,
                ..JsonOptions::default()
            });
            let mut json = serializer.serialize_tables(&tables)?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => CsvSerializer::new().serialize_tables(&tables)?,
    };

    match &output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        }
        None => print!("{rendered}"),
    }

    if verbosity.should_show_output() {
        let destination = output
            .as_ref()
            .map(|path| format!(" to {}", path.display()))
            .unwrap_or_default();
        eprintln!(
            "{} {} table(s) from {} page(s){destination}",
            "Extracted".green().bold(),
            tables.len(),
            pages.len() - failed_pages
        );
    }
    Ok(())
}

fn config_command(action: ConfigAction, verbosity: Verbosity) -> Result<()> {
    match action {
        ConfigAction::Init { global, force } => config_init(global, force, verbosity),
        ConfigAction::Show { json } => config_show(json),
        ConfigAction::Path => {
            config_path();
            Ok(())
        }
    }
}

/// Write the default configuration
fn config_init(global: bool, force: bool, verbosity: Verbosity) -> Result<()> {
    let config_path = if global {
        user_config_path().context("Could not determine home directory")?
    } else {
        project_config_path()
    };

    if config_path.exists() && !force {
        eprintln!("{} Use --force to overwrite", "Hint:".cyan().bold());
        bail!(
            "Configuration file already exists: {}",
            config_path.display()
        );
    }

    let content = format!(
        "# docling-grid configuration\n# Tolerances are in page units.\n\n{}",
        GridConfig::default().to_toml_string()?
    );
    fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    if verbosity.should_show_output() {
        eprintln!(
            "{} {}",
            "Created".green().bold(),
            config_path.display()
        );
    }
    Ok(())
}

fn config_show(json_output: bool) -> Result<()> {
    let config = load_config(None)?;
    config.validate().context("Configuration rejected")?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", config.to_toml_string()?);
    }
    Ok(())
}

fn config_path() {
    let describe = |path: &Path| {
        if path.exists() {
            format!("{} {}", path.display(), "(found)".green())
        } else {
            format!("{} {}", path.display(), "(not found)".dimmed())
        }
    };
    match user_config_path() {
        Some(path) => println!("user:    {}", describe(&path)),
        None => println!("user:    {}", "(no home directory)".dimmed()),
    }
    println!("project: {}", describe(&project_config_path()));
}

fn main() {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    let result = match args.command {
        Commands::Extract {
            input,
            output,
            format,
            config,
            line_merge_tolerance,
            min_rows,
            min_cols,
            header,
            compact,
            table_comments,
            diagnostics,
            continue_on_error,
        } => extract_command(
            input,
            output,
            format,
            config,
            line_merge_tolerance,
            min_rows,
            min_cols,
            header,
            compact,
            table_comments,
            diagnostics,
            continue_on_error,
            verbosity,
        ),
        Commands::Config { action } => config_command(action, verbosity),
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}
