use clap::{Parser, Subcommand};
use planar_load::batch::{self, LoadSummary};
use planar_load::config::{self, CONFIG_FILE_NAME, LoaderConfig};
use planar_load::{FileSelector, ImageCorrector, SelectionRequest, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "planar-load")]
#[command(about = "Select, orient and background-correct 2-D detector frames")]
#[command(long_about = "\
Select, orient and background-correct 2-D detector frames

Frames are picked from the source directory by name:

  1. keep every entry matching ANY --include pattern
  2. drop every entry matching ANY --exclude pattern
  3. if --filename patterns are given, keep only entries matching ANY of them

Each selected frame is then decoded, flipped (horizontal, then vertical),
clipped at zero, and has the background frame subtracted.

Settings come from planar-load.toml in the working directory (or --config),
with command-line flags taking precedence.

Run 'planar-load gen-config' to print a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./planar-load.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the detector frames
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Include pattern (repeatable; replaces the configured list)
    #[arg(long = "include", global = true)]
    include: Vec<String>,

    /// Exclude pattern (repeatable; replaces the configured list)
    #[arg(long = "exclude", global = true)]
    exclude: Vec<String>,

    /// Allow-list pattern (repeatable; replaces the configured list)
    #[arg(long = "filename", global = true)]
    filenames: Vec<String>,

    /// Background frame to subtract
    #[arg(long, global = true)]
    background: Option<PathBuf>,

    /// Reverse column order of every frame
    #[arg(long, global = true)]
    flip_horizontal: bool,

    /// Reverse row order of every frame
    #[arg(long, global = true)]
    flip_vertical: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct LoadArgs {
    /// Write a JSON summary of every frame to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the selected file names, sorted
    List,
    /// Load and correct every selected frame, printing per-frame statistics
    Load(LoadArgs),
    /// Validate config and background without loading frames
    Check,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match &cli.command {
        Command::List => {
            let config = resolve_config(&cli)?;
            let names = FileSelector::new(&config).list_files(&SelectionRequest::default())?;
            output::print_selection(&config.source_dir, &names);
        }
        Command::Load(args) => {
            let config = resolve_config(&cli)?;
            init_thread_pool(&config.processing);
            let corrector = ImageCorrector::from_config(&config)?;
            let names = FileSelector::new(&config).list_files(&SelectionRequest::default())?;

            let outcomes = batch::summarize_each(&corrector, &names);
            output::print_load_outcomes(&outcomes);

            let summary = LoadSummary::new(&corrector, config.source_dir.clone(), &outcomes);
            if let Some(path) = &args.summary {
                std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
            }
            if summary.failed > 0 {
                let message =
                    format!("{} of {} frames failed to load", summary.failed, names.len());
                return Err(message.into());
            }
        }
        Command::Check => {
            let config = resolve_config(&cli)?;
            let corrector = ImageCorrector::from_config(&config)?;
            let selected = FileSelector::new(&config).select_files(&SelectionRequest::default())?;
            output::print_check(&config, corrector.background_status(), selected.len());
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Stock defaults, then the config file, then command-line flags.
fn resolve_config(cli: &Cli) -> Result<LoaderConfig, config::ConfigError> {
    let file = cli.config.clone().or_else(|| {
        let default = Path::new(CONFIG_FILE_NAME);
        default.exists().then(|| default.to_path_buf())
    });
    config::load_config(file.as_deref(), cli_overrides(cli))
}

/// Build a TOML overlay from whichever flags were actually given.
fn cli_overrides(cli: &Cli) -> Option<toml::Value> {
    let mut root = toml::Table::new();
    let mut selection = toml::Table::new();
    let mut orientation = toml::Table::new();

    let path_value = |p: &Path| toml::Value::String(p.to_string_lossy().into_owned());
    let list_value = |items: &[String]| {
        toml::Value::Array(items.iter().cloned().map(toml::Value::String).collect())
    };

    if let Some(source) = &cli.source {
        root.insert("source_dir".into(), path_value(source.as_path()));
    }
    if let Some(background) = &cli.background {
        root.insert("background_file".into(), path_value(background.as_path()));
    }
    if !cli.include.is_empty() {
        selection.insert("include".into(), list_value(cli.include.as_slice()));
    }
    if !cli.exclude.is_empty() {
        selection.insert("exclude".into(), list_value(cli.exclude.as_slice()));
    }
    if !cli.filenames.is_empty() {
        selection.insert("filenames".into(), list_value(cli.filenames.as_slice()));
    }
    if cli.flip_horizontal {
        orientation.insert("flip_horizontal".into(), toml::Value::Boolean(true));
    }
    if cli.flip_vertical {
        orientation.insert("flip_vertical".into(), toml::Value::Boolean(true));
    }

    if !selection.is_empty() {
        root.insert("selection".into(), toml::Value::Table(selection));
    }
    if !orientation.is_empty() {
        root.insert("orientation".into(), toml::Value::Table(orientation));
    }
    (!root.is_empty()).then_some(toml::Value::Table(root))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
