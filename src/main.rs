//! Fiber Plot - focal-plane fiber diagnostics
//!
//! CLI commands:
//! - show: Open the figure viewer
//! - render: Write the figures as PNG files
//! - list: List configured datasets
//! - summary: Print per-group fiber counts

mod config;
mod dataset;
mod encode;
mod export;
mod figure;
mod gui;
mod histogram;
mod logging;
mod palette;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use config::{Config, Environment};
use dataset::Dataset;
use figure::Figure;

#[derive(Parser)]
#[command(name = "fiber_plot")]
#[command(about = "Focal-plane fiber position and non-telecentricity plots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to fiber_plot.yaml config
    #[arg(short, long, default_value = "fiber_plot.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the three figures in a native window
    Show(DatasetArgs),

    /// Write the three figures as PNG files
    Render {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Output directory (defaults to FIBER_PLOT_OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List configured datasets
    List,

    /// Print fiber counts per group
    Summary(DatasetArgs),
}

#[derive(Args)]
struct DatasetArgs {
    /// Dataset id from the config
    #[arg(short, long)]
    dataset: Option<String>,

    /// CSV file to load directly
    #[arg(short, long, conflicts_with = "dataset")]
    input: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env = Environment::load();

    logging::init_logging(&env.log_dir)?;
    tracing::info!("Fiber Plot starting up");
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        Config::default()
    };
    tracing::info!(
        "Config loaded: {} datasets, {} groups",
        config.datasets.len(),
        config.groups.len()
    );

    match cli.command {
        Commands::Show(args) => {
            let (name, data) = load_dataset(&config, &env, &args)?;
            let figures = build_figures(&config, &data)?;
            gui::run_viewer(figures, name)?;
        }

        Commands::Render { dataset, output } => {
            let (name, data) = load_dataset(&config, &env, &dataset)?;
            let figures = build_figures(&config, &data)?;
            let output = output.unwrap_or_else(|| env.output_dir.clone());
            let written = export::render_all(&figures, &output, &name)?;
            for path in written {
                println!("  {}", path.display());
            }
        }

        Commands::List => {
            list_datasets(&config, &env);
        }

        Commands::Summary(args) => {
            let (name, data) = load_dataset(&config, &env, &args)?;
            print_summary(&config, &name, &data)?;
        }
    }

    Ok(())
}

/// Resolve `--input` / `--dataset` / `default_dataset` and load it
fn load_dataset(
    config: &Config,
    env: &Environment,
    args: &DatasetArgs,
) -> anyhow::Result<(String, Dataset)> {
    let (name, path) = if let Some(input) = &args.input {
        (input.display().to_string(), input.clone())
    } else {
        let id = args
            .dataset
            .as_deref()
            .or(config.default_dataset.as_deref())
            .ok_or_else(|| {
                anyhow::anyhow!("No dataset given: use --input, --dataset or default_dataset")
            })?;
        let source = config
            .get_dataset(id)
            .ok_or_else(|| anyhow::anyhow!("Dataset not found: {}", id))?;
        (source.name.clone(), env.resolve(&source.path))
    };

    let data =
        Dataset::load(&path).with_context(|| format!("Failed to load dataset '{}'", name))?;
    if data.is_empty() {
        tracing::warn!("Dataset '{}' has no fibers", name);
    }
    Ok((name, data))
}

/// Encode the dataset into the three figures, in display order
fn build_figures(config: &Config, data: &Dataset) -> anyhow::Result<Vec<Figure>> {
    let palette = config.palette()?;
    let scale = config.color_scale()?;
    let scatter = config.scatter_options()?;
    let bins = config.bin_spec()?;
    if palette.is_empty() {
        tracing::warn!("No group colors configured, every fiber uses the fallback color");
    } else {
        tracing::debug!("Palette has {} groups", palette.len());
    }

    Ok(vec![
        encode::group_scatter(data, &palette, &scatter),
        encode::telecentricity_scatter(data, &scale, &scatter),
        encode::telecentricity_histogram(data, &palette, &bins),
    ])
}

/// List configured datasets
fn list_datasets(config: &Config, env: &Environment) {
    println!("Available datasets ({}):", config.datasets.len());
    println!();

    for source in &config.datasets {
        let path = env.resolve(&source.path);
        let marker = if config.default_dataset.as_deref() == Some(source.id.as_str()) {
            " (default)"
        } else {
            ""
        };
        let status = if path.exists() { "" } else { " [missing]" };
        println!("  - {} [{}]{} -> {}{}", source.name, source.id, marker, path.display(), status);
    }
}

fn print_summary(config: &Config, name: &str, data: &Dataset) -> anyhow::Result<()> {
    let palette = config.palette()?;

    println!("{}: {} fibers", name, data.len());
    for (id, count) in data.group_counts(&palette) {
        println!("  Group {} ({}): {}", id, palette.color_of(id).to_hex(), count);
    }

    let unlisted = data.unlisted_count(&palette);
    if unlisted > 0 {
        println!("  Unregistered groups: {} ({})", unlisted, palette.fallback().to_hex());
    }

    if let Some((lo, hi)) = data.tele_range() {
        println!("  Non-telecentricity: {:.4} .. {:.4} degree", lo, hi);
    }
    Ok(())
}
